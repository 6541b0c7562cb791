// ********* Input data structures ***********

use std::fmt::Display;
use std::str::FromStr;

use chrono::NaiveDate;
use snafu::prelude::*;

/// The reporting unit that aggregates the five boroughs of New York City.
///
/// County-level population tables do not carry it, so its population is
/// supplied by hand (2019 estimate).
pub const NYC_COUNTY: &str = "New York City";
pub const NYC_STATE: &str = "New York";
pub const NYC_POPULATION: u64 = 8_336_817;

/// Number of observations in the trailing window of the rolling averages.
pub const ROLLING_WINDOW: usize = 7;

/// A (county, state) pair, the unit of granularity of all the series.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd)]
pub struct LocationKey {
    pub county: String,
    pub state: String,
}

impl LocationKey {
    pub fn new(county: &str, state: &str) -> LocationKey {
        LocationKey {
            county: county.to_string(),
            state: state.to_string(),
        }
    }

    pub fn new_york_city() -> LocationKey {
        LocationKey::new(NYC_COUNTY, NYC_STATE)
    }

    pub fn is_new_york_city(&self) -> bool {
        self.county == NYC_COUNTY && self.state == NYC_STATE
    }
}

/// The display form used by the location picker: `"Travis, Texas"`.
impl Display for LocationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.county, self.state)
    }
}

impl FromStr for LocationKey {
    type Err = SeriesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::selection::parse_location(s)
    }
}

/// One row of the merged table.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct TimeSeriesRow {
    pub date: NaiveDate,
    pub county: String,
    pub state: String,
    pub total_cases: u64,
    pub total_deaths: u64,
    pub population: u64,
}

impl TimeSeriesRow {
    pub fn location(&self) -> LocationKey {
        LocationKey::new(&self.county, &self.state)
    }
}

/// A cumulative column of the table.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum Cumulative {
    Cases,
    Deaths,
}

impl Display for Cumulative {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cumulative::Cases => write!(f, "total cases"),
            Cumulative::Deaths => write!(f, "total deaths"),
        }
    }
}

// ********* Selection **********

/// The quantity to plot.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum Measurement {
    TotalCases,
    TotalDeaths,
    NewCases,
    NewCasesAvg7,
    NewDeaths,
    NewDeathsAvg7,
}

impl Measurement {
    pub const ALL: [Measurement; 6] = [
        Measurement::TotalCases,
        Measurement::TotalDeaths,
        Measurement::NewCases,
        Measurement::NewCasesAvg7,
        Measurement::NewDeaths,
        Measurement::NewDeathsAvg7,
    ];

    /// The label shown in the measurement picker.
    pub fn label(&self) -> &'static str {
        match self {
            Measurement::TotalCases => "total cases",
            Measurement::TotalDeaths => "total deaths",
            Measurement::NewCases => "new cases",
            Measurement::NewCasesAvg7 => "new cases (7 day average)",
            Measurement::NewDeaths => "new deaths",
            Measurement::NewDeathsAvg7 => "new deaths (7 day average)",
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Measurement::TotalCases => "total_cases",
            Measurement::TotalDeaths => "total_deaths",
            Measurement::NewCases => "new_cases",
            Measurement::NewCasesAvg7 => "new_cases_avg7",
            Measurement::NewDeaths => "new_deaths",
            Measurement::NewDeathsAvg7 => "new_deaths_avg7",
        }
    }

    /// The cumulative column this measurement is computed from.
    pub fn source(&self) -> Cumulative {
        match self {
            Measurement::TotalCases | Measurement::NewCases | Measurement::NewCasesAvg7 => {
                Cumulative::Cases
            }
            Measurement::TotalDeaths | Measurement::NewDeaths | Measurement::NewDeathsAvg7 => {
                Cumulative::Deaths
            }
        }
    }

    pub fn is_derived(&self) -> bool {
        !matches!(self, Measurement::TotalCases | Measurement::TotalDeaths)
    }

    pub fn is_rolling_average(&self) -> bool {
        matches!(self, Measurement::NewCasesAvg7 | Measurement::NewDeathsAvg7)
    }
}

impl FromStr for Measurement {
    type Err = SeriesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Measurement::ALL
            .iter()
            .find(|m| m.label().eq_ignore_ascii_case(s) || m.key().eq_ignore_ascii_case(s))
            .copied()
            .context(InvalidSelectionSnafu {
                field: "measurement",
                value: s,
            })
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum Normalization {
    None,
    Per100k,
}

impl Normalization {
    pub fn label(&self) -> &'static str {
        match self {
            Normalization::None => "none",
            Normalization::Per100k => "per 100,000",
        }
    }

    /// Scales a value given the population of its location.
    pub fn apply(&self, value: f64, population: u64) -> f64 {
        match self {
            Normalization::None => value,
            Normalization::Per100k => value / population as f64 * 100_000.0,
        }
    }
}

impl FromStr for Normalization {
    type Err = SeriesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(Normalization::None),
            "per 100,000" | "per_100k" | "per100k" => Ok(Normalization::Per100k),
            x => InvalidSelectionSnafu {
                field: "normalization",
                value: x,
            }
            .fail(),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum Timespan {
    All,
    /// The fourteen days ending yesterday, both ends included.
    Last14Days,
}

impl Timespan {
    pub fn label(&self) -> &'static str {
        match self {
            Timespan::All => "all",
            Timespan::Last14Days => "two weeks",
        }
    }

    /// The inclusive date window to keep, relative to `today`.
    /// `None` means no filtering.
    pub fn window(&self, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
        match self {
            Timespan::All => None,
            Timespan::Last14Days => {
                let yesterday = today - chrono::Duration::days(1);
                Some((yesterday - chrono::Duration::days(13), yesterday))
            }
        }
    }
}

impl FromStr for Timespan {
    type Err = SeriesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(Timespan::All),
            "two weeks" | "last_14_days" | "14d" => Ok(Timespan::Last14Days),
            x => InvalidSelectionSnafu {
                field: "timespan",
                value: x,
            }
            .fail(),
        }
    }
}

/// The parameters of one query. Rebuilt on every interaction.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Selection {
    pub locations: Vec<LocationKey>,
    pub measurement: Measurement,
    pub normalization: Normalization,
    pub timespan: Timespan,
}

impl Selection {
    pub fn value_label(&self) -> String {
        match self.normalization {
            Normalization::None => self.measurement.label().to_string(),
            Normalization::Per100k => format!("{} (per 100,000)", self.measurement.label()),
        }
    }
}

// ********* Policies **********

/// What to do with time series rows that have no population entry.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub enum UnmatchedPolicy {
    Drop,
    #[default]
    Warn,
    Reject,
}

impl FromStr for UnmatchedPolicy {
    type Err = SeriesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "drop" => Ok(UnmatchedPolicy::Drop),
            "warn" => Ok(UnmatchedPolicy::Warn),
            "reject" => Ok(UnmatchedPolicy::Reject),
            x => InvalidSelectionSnafu {
                field: "unmatched policy",
                value: x,
            }
            .fail(),
        }
    }
}

/// What to do when a cumulative total decreases from one day to the next.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub enum MonotonicPolicy {
    Ignore,
    #[default]
    Warn,
    Reject,
}

impl FromStr for MonotonicPolicy {
    type Err = SeriesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ignore" => Ok(MonotonicPolicy::Ignore),
            "warn" => Ok(MonotonicPolicy::Warn),
            "reject" => Ok(MonotonicPolicy::Reject),
            x => InvalidSelectionSnafu {
                field: "monotonic policy",
                value: x,
            }
            .fail(),
        }
    }
}

// ******** Output data structures *********

/// One point of a computed series.
///
/// `value` is `None` for the rolling averages over the first
/// `ROLLING_WINDOW - 1` observations of a location.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

/// A decrease of a cumulative total between two consecutive observations.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct MonotonicViolation {
    pub location: LocationKey,
    pub date: NaiveDate,
    pub column: Cumulative,
    pub previous: u64,
    pub current: u64,
}

/// Why a location could not be found in the table.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum UnknownReason {
    CountyNotFound,
    StateNotFound,
    NotReportedTogether,
}

impl Display for UnknownReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnknownReason::CountyNotFound => write!(f, "not a valid county name"),
            UnknownReason::StateNotFound => write!(f, "not a valid state"),
            UnknownReason::NotReportedTogether => write!(f, "county is not in state"),
        }
    }
}

/// Errors raised while assembling the table or computing a series.
#[derive(Debug, Snafu, PartialEq, Clone)]
#[snafu(visibility(pub(crate)))]
pub enum SeriesError {
    #[snafu(display("Unknown location {location}: {reason}"))]
    UnknownLocation {
        #[snafu(implicit(false))]
        location: LocationKey,
        reason: UnknownReason,
    },

    #[snafu(display("Duplicate row for {location} on {date}"))]
    DuplicateRow {
        #[snafu(implicit(false))]
        location: LocationKey,
        date: NaiveDate,
    },

    #[snafu(display("No {column} for {location} on {date}"))]
    MissingCount {
        #[snafu(implicit(false))]
        location: LocationKey,
        date: NaiveDate,
        column: Cumulative,
    },

    #[snafu(display("Population of {location} is both {first} and {second}"))]
    InconsistentPopulation {
        #[snafu(implicit(false))]
        location: LocationKey,
        first: u64,
        second: u64,
    },

    #[snafu(display("Population of {location} must be positive"))]
    NonPositivePopulation {
        #[snafu(implicit(false))]
        location: LocationKey,
    },

    #[snafu(display("Population source lists {location} more than once"))]
    DuplicatePopulation {
        #[snafu(implicit(false))]
        location: LocationKey,
    },

    #[snafu(display(
        "{dropped_rows} rows from {count} locations have no population entry (first: {first})"
    ))]
    UnmatchedLocations {
        count: usize,
        dropped_rows: usize,
        first: LocationKey,
    },

    #[snafu(display("{column} of {location} decreased on {date}: {previous} -> {current}"))]
    NonMonotonic {
        #[snafu(implicit(false))]
        location: LocationKey,
        date: NaiveDate,
        column: Cumulative,
        previous: u64,
        current: u64,
    },

    #[snafu(display("Invalid {field}: {value:?}"))]
    InvalidSelection { field: String, value: String },
}
