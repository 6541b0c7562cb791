use clap::{Parser, Subcommand};

/// Prepares county-level COVID-19 data and computes the series displayed by the dashboard.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Command,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, global = true, takes_value = false)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Merges the raw time series with the population data.
    Prepare(PrepareArgs),
    /// Extracts the county populations from the census workbook.
    Population(PopulationArgs),
    /// Computes the series of some locations.
    Query(QueryArgs),
    /// Checks that a location catalog matches the merged table.
    Catalog(CatalogArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct PrepareArgs {
    /// (file path) The raw time series in CSV format, with the columns date, county, state, cases, deaths.
    #[clap(short, long, value_parser)]
    pub timeseries: String,

    /// (file path) The population data in CSV format, with the columns county, state, population.
    #[clap(short, long, value_parser)]
    pub population: String,

    /// (file path) Where to write the merged table.
    #[clap(short, long, value_parser)]
    pub out: String,

    /// (file path, optional) Where to write the location catalog.
    #[clap(short, long, value_parser)]
    pub catalog: Option<String>,

    /// (drop, warn or reject, default warn) What to do with the rows that have no population.
    #[clap(long, value_parser)]
    pub unmatched: Option<String>,

    /// (ignore, warn or reject, default warn) What to do when a cumulative total decreases.
    #[clap(long, value_parser)]
    pub monotonic: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct PopulationArgs {
    /// (file path) The census workbook with the annual county population estimates.
    #[clap(short, long, value_parser)]
    pub input: String,

    /// (default: first worksheet) The name of the worksheet to use.
    #[clap(long, value_parser)]
    pub worksheet: Option<String>,

    /// (file path) Where to write the population data in CSV format.
    #[clap(short, long, value_parser)]
    pub out: String,
}

#[derive(Parser, Debug, Clone)]
pub struct QueryArgs {
    /// (file path, optional) A query described in JSON format. The other flags override its values.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) The merged table.
    #[clap(short, long, value_parser)]
    pub table: Option<String>,

    /// (repeatable) A location, written as "County, State". Repeated locations are only plotted once.
    #[clap(short, long = "location", value_parser)]
    pub locations: Vec<String>,

    /// (default "total cases") The measurement to plot, for instance "new cases (7 day average)".
    #[clap(short, long, value_parser)]
    pub measurement: Option<String>,

    /// ("none" or "per 100,000", default none) The normalization of the values.
    #[clap(short, long, value_parser)]
    pub normalization: Option<String>,

    /// ("all" or "two weeks", default all) The timespan to display.
    #[clap(long, value_parser)]
    pub timespan: Option<String>,

    /// (date YYYY-MM-DD, default: the current day) The day the query is made, used by the two weeks timespan.
    #[clap(long, value_parser)]
    pub today: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the series will be written in JSON format to the given
    /// location. Setting this option overrides the path that may be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) A reference file containing the expected series in JSON format. If provided, covid_dash will
    /// check that the computed output matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct CatalogArgs {
    /// (file path) The merged table.
    #[clap(short, long, value_parser)]
    pub table: String,

    /// (file path) The location catalog to check.
    #[clap(short, long, value_parser)]
    pub catalog: String,
}
