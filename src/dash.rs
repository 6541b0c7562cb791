pub mod config_reader;
pub mod io_csv;
pub mod io_excel;
pub mod output;

use log::{debug, info, warn};

use county_series::prepare::prepare;
use county_series::selection::SelectedLocations;
use county_series::*;
use snafu::{prelude::*, Snafu};

use chrono::NaiveDate;

use crate::args::{CatalogArgs, PopulationArgs, PrepareArgs, QueryArgs};
use crate::dash::config_reader::*;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DashError {
    #[snafu(display("Cannot read {path}"))]
    SourceUnavailable { source: csv::Error, path: String },
    #[snafu(display("Cannot read a record of {path}"))]
    CsvRecord { source: csv::Error, path: String },
    #[snafu(display("Cannot write {path}"))]
    WritingCsv { source: csv::Error, path: String },
    #[snafu(display("{path}: missing column {column:?}"))]
    SchemaMismatch { path: String, column: String },
    #[snafu(display("{path}: line {lineno}: cannot read {column} from {content:?}"))]
    ParseField {
        path: String,
        lineno: u64,
        column: String,
        content: String,
    },

    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("No worksheet found in {path}"))]
    EmptyExcel { path: String },

    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON in {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error writing {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },

    #[snafu(context(false), display("{source}"))]
    Series { source: SeriesError },

    #[snafu(display("Difference detected between computed series and reference {path}"))]
    ReferenceMismatch { path: String },
    #[snafu(display(
        "Catalog {path} is out of date: {missing} locations missing, {stale} stale entries"
    ))]
    CatalogOutOfDate {
        path: String,
        missing: usize,
        stale: usize,
    },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type DashResult<T> = Result<T, DashError>;

pub fn run_prepare(args: &PrepareArgs) -> DashResult<()> {
    let unmatched: UnmatchedPolicy = match &args.unmatched {
        Some(s) => s.parse()?,
        None => UnmatchedPolicy::default(),
    };
    let monotonic: MonotonicPolicy = match &args.monotonic {
        Some(s) => s.parse()?,
        None => MonotonicPolicy::default(),
    };

    info!("Attempting to read time series {:?}", args.timeseries);
    let reports = io_csv::read_case_reports(&args.timeseries)?;
    info!("Attempting to read population {:?}", args.population);
    let population = io_csv::read_population(&args.population)?;

    let outcome = prepare(reports, population, unmatched)?;
    if !outcome.unmatched.is_empty() {
        info!(
            "{} rows dropped: no population for {} locations",
            outcome.dropped_rows,
            outcome.unmatched.len()
        );
    }

    // Validates the merged rows before anything is written.
    let table = CountyTable::from_rows(outcome.rows, monotonic)?;

    io_csv::write_table(&args.out, table.rows())?;
    info!("Wrote {} rows to {:?}", table.len(), args.out);
    if let Some(catalog_path) = &args.catalog {
        let catalog = table.catalog();
        io_csv::write_catalog(catalog_path, &catalog)?;
        info!("Wrote {} locations to {:?}", catalog.len(), catalog_path);
    }
    Ok(())
}

pub fn run_population(args: &PopulationArgs) -> DashResult<()> {
    info!("Attempting to read census workbook {:?}", args.input);
    let records = io_excel::read_census_workbook(&args.input, args.worksheet.as_deref())?;
    io_csv::write_population(&args.out, &records)?;
    info!("Wrote {} populations to {:?}", records.len(), args.out);
    Ok(())
}

pub fn run_catalog(args: &CatalogArgs) -> DashResult<()> {
    let table = load_table(&args.table)?;
    let catalog = io_csv::read_catalog(&args.catalog)?;
    let drift = catalog_drift(&table, &catalog);
    for entry in drift.missing.iter() {
        warn!("Missing from the catalog: {}", entry);
    }
    for entry in drift.stale.iter() {
        warn!("Not in the table: {}", entry);
    }
    ensure!(
        drift.is_empty(),
        CatalogOutOfDateSnafu {
            path: args.catalog.clone(),
            missing: drift.missing.len(),
            stale: drift.stale.len(),
        }
    );
    info!("Catalog {:?} matches the table", args.catalog);
    Ok(())
}

/// The query once the configuration and the flags are reconciled.
#[derive(Debug, Clone)]
pub struct QuerySettings {
    pub table: String,
    pub selection: Selection,
    pub today: NaiveDate,
    pub out: Option<String>,
}

fn parse_or<T>(value: Option<&String>, default: T) -> DashResult<T>
where
    T: std::str::FromStr<Err = SeriesError>,
{
    match value {
        Some(s) => Ok(s.parse()?),
        None => Ok(default),
    }
}

pub fn query_settings(args: &QueryArgs) -> DashResult<QuerySettings> {
    let config: QueryConfig = match &args.config {
        Some(path) => read_query_config(path)?,
        None => QueryConfig::default(),
    };
    debug!("query_settings: config: {:?}", config);

    let table = match args.table.clone().or(config.table) {
        Some(t) => t,
        None => whatever!("No table provided: use --table or the table field of the configuration"),
    };

    // The flags replace the locations of the configuration.
    let displays = if args.locations.is_empty() {
        config.locations
    } else {
        args.locations.clone()
    };
    let mut locations = SelectedLocations::new();
    for display in displays.iter() {
        if !locations.add_display(display)? {
            warn!("Location {:?} selected more than once", display);
        }
    }
    ensure_whatever!(!locations.is_empty(), "No location selected");

    let selection = Selection {
        locations: locations.into_vec(),
        measurement: parse_or(
            args.measurement.as_ref().or(config.measurement.as_ref()),
            Measurement::TotalCases,
        )?,
        normalization: parse_or(
            args.normalization.as_ref().or(config.normalization.as_ref()),
            Normalization::None,
        )?,
        timespan: parse_or(
            args.timespan.as_ref().or(config.timespan.as_ref()),
            Timespan::All,
        )?,
    };

    let today = match args.today.as_ref().or(config.today.as_ref()) {
        Some(s) => s.parse::<NaiveDate>().ok().context(ParseFieldSnafu {
            path: "--today",
            lineno: 0u64,
            column: "today",
            content: s.clone(),
        })?,
        None => chrono::Local::now().date_naive(),
    };

    Ok(QuerySettings {
        table,
        selection,
        today,
        out: args.out.clone().or(config.output_path),
    })
}

fn load_table(path: &str) -> DashResult<CountyTable> {
    info!("Attempting to read table {:?}", path);
    let rows = io_csv::read_table(path)?;
    // The table was checked when it was prepared.
    Ok(CountyTable::from_rows(rows, MonotonicPolicy::Ignore)?)
}

pub fn run_query(args: &QueryArgs) -> DashResult<()> {
    let settings = query_settings(args)?;
    info!("settings: {:?}", settings);
    let table = load_table(&settings.table)?;

    let results = compute_selection(&table, &settings.selection, settings.today);
    for r in results.iter() {
        if let Err(e) = &r.points {
            warn!("{}", e);
        }
    }

    let summary = output::build_summary_js(&settings.selection, settings.today, &results);
    let pretty = output::write_summary(settings.out.as_deref(), &summary)?;

    // The reference summary, if provided for comparison
    if let Some(reference_path) = &args.reference {
        output::check_reference(reference_path, &pretty)?;
    }
    Ok(())
}

pub fn is_stdout(out: Option<&str>) -> bool {
    matches!(out, None | Some("stdout") | Some(""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value as JSValue;
    use std::fs;

    fn testdata(name: &str) -> String {
        format!("{}/testdata/{}", env!("CARGO_MANIFEST_DIR"), name)
    }

    fn scratch(name: &str) -> String {
        let dir = std::env::temp_dir().join("covid_dash_tests");
        fs::create_dir_all(&dir).unwrap();
        dir.join(name).display().to_string()
    }

    fn query_args() -> QueryArgs {
        QueryArgs {
            config: Some(testdata("query.json")),
            table: None,
            locations: vec![],
            measurement: None,
            normalization: None,
            timespan: None,
            today: None,
            out: None,
            reference: None,
        }
    }

    #[test]
    fn prepare_merges_and_writes_catalog() {
        let out = scratch("prepared.csv");
        let catalog = scratch("prepared_catalog.csv");
        run_prepare(&PrepareArgs {
            timeseries: testdata("us-counties.csv"),
            population: testdata("county_populations.csv"),
            out: out.clone(),
            catalog: Some(catalog.clone()),
            unmatched: Some("warn".to_string()),
            monotonic: Some("reject".to_string()),
        })
        .unwrap();

        let rows = io_csv::read_table(&out).unwrap();
        // The two rows of "Unknown, Texas" have no population.
        assert_eq!(rows.len(), 23);
        let nyc: Vec<&TimeSeriesRow> = rows
            .iter()
            .filter(|r| r.county == "New York City")
            .collect();
        assert_eq!(nyc.len(), 3);
        assert!(nyc.iter().all(|r| r.population == NYC_POPULATION));

        assert_eq!(
            io_csv::read_catalog(&catalog).unwrap(),
            vec![
                "King, Washington".to_string(),
                "New York City, New York".to_string(),
                "Travis, Texas".to_string(),
            ]
        );
    }

    #[test]
    fn prepare_can_reject_unmatched_rows() {
        let res = run_prepare(&PrepareArgs {
            timeseries: testdata("us-counties.csv"),
            population: testdata("county_populations.csv"),
            out: scratch("rejected.csv"),
            catalog: None,
            unmatched: Some("reject".to_string()),
            monotonic: None,
        });
        assert!(matches!(
            res,
            Err(DashError::Series {
                source: SeriesError::UnmatchedLocations {
                    count: 1,
                    dropped_rows: 2,
                    ..
                }
            })
        ));
    }

    #[test]
    fn missing_input_is_unavailable() {
        let res = run_prepare(&PrepareArgs {
            timeseries: testdata("does-not-exist.csv"),
            population: testdata("county_populations.csv"),
            out: scratch("never.csv"),
            catalog: None,
            unmatched: None,
            monotonic: None,
        });
        assert!(matches!(res, Err(DashError::SourceUnavailable { .. })));
    }

    #[test]
    fn missing_column_is_a_schema_mismatch() {
        let res = io_csv::read_case_reports(&testdata("no_deaths.csv"));
        match res {
            Err(DashError::SchemaMismatch { column, .. }) => assert_eq!(column, "deaths"),
            x => panic!("unexpected result {:?}", x),
        }
    }

    #[test]
    fn settings_merge_config_and_flags() {
        let settings = query_settings(&query_args()).unwrap();
        assert_eq!(settings.table, testdata("clean_covid_data.csv"));
        assert_eq!(settings.selection.measurement, Measurement::NewCasesAvg7);
        assert_eq!(settings.selection.timespan, Timespan::Last14Days);
        // The duplicated location is only selected once.
        assert_eq!(settings.selection.locations.len(), 3);
        assert_eq!(settings.today, NaiveDate::from_ymd_opt(2020, 3, 23).unwrap());

        let mut args = query_args();
        args.measurement = Some("total_deaths".to_string());
        args.locations = vec!["King, Washington".to_string()];
        let settings = query_settings(&args).unwrap();
        assert_eq!(settings.selection.measurement, Measurement::TotalDeaths);
        assert_eq!(
            settings.selection.locations,
            vec![LocationKey::new("King", "Washington")]
        );
    }

    #[test]
    fn bad_selection_values_are_reported() {
        let mut args = query_args();
        args.timespan = Some("forever".to_string());
        assert!(matches!(
            query_settings(&args),
            Err(DashError::Series {
                source: SeriesError::InvalidSelection { .. }
            })
        ));
    }

    #[test]
    fn query_writes_series_and_checks_reference() {
        let out = scratch("travis_nyc.json");
        let mut args = query_args();
        args.out = Some(out.clone());
        run_query(&args).unwrap();

        let js: JSValue = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(js["config"]["yAxisLabel"], "new cases (7 day average) (per 100,000)");
        let series = js["series"].as_array().unwrap();
        assert_eq!(series.len(), 3);

        assert_eq!(series[0]["location"], "Travis, Texas");
        assert_eq!(series[0]["color"], "#1f77b4");
        let points = series[0]["points"].as_array().unwrap();
        assert_eq!(points.len(), 10);
        assert_eq!(points[0]["date"], "2020-03-13");
        assert!(points[5]["value"].is_null());
        let expected = 19.0 / 7.0 / 1_273_954.0 * 100_000.0;
        assert!((points[6]["value"].as_f64().unwrap() - expected).abs() < 1e-9);

        assert_eq!(series[1]["color"], "gray");
        assert_eq!(series[2]["location"], "Nowhere, Texas");
        assert!(series[2]["error"].as_str().unwrap().contains("not a valid county name"));

        // Checking against its own output succeeds.
        let mut args = query_args();
        args.out = Some(scratch("travis_nyc_again.json"));
        args.reference = Some(out.clone());
        run_query(&args).unwrap();

        // A different normalization does not match.
        args.normalization = Some("none".to_string());
        assert!(matches!(
            run_query(&args),
            Err(DashError::ReferenceMismatch { .. })
        ));
    }

    #[test]
    fn catalog_drift_is_an_error() {
        let res = run_catalog(&CatalogArgs {
            table: testdata("clean_covid_data.csv"),
            catalog: testdata("county_state_list.csv"),
        });
        match res {
            Err(DashError::CatalogOutOfDate { missing, stale, .. }) => {
                assert_eq!(missing, 1);
                assert_eq!(stale, 1);
            }
            x => panic!("unexpected result {:?}", x),
        }
    }
}
