mod config;
pub mod builder;
pub mod manual;
pub mod palette;
pub mod prepare;
pub mod selection;

use chrono::NaiveDate;
use log::{debug, info};
use snafu::prelude::*;

use std::collections::{BTreeMap, HashSet};

pub use crate::config::*;

// **** Private structures ****

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
struct DailyTotals {
    date: NaiveDate,
    total_cases: u64,
    total_deaths: u64,
}

impl DailyTotals {
    fn total(&self, column: Cumulative) -> u64 {
        match column {
            Cumulative::Cases => self.total_cases,
            Cumulative::Deaths => self.total_deaths,
        }
    }
}

// Invariant: days are strictly increasing in date and never empty.
#[derive(Eq, PartialEq, Debug, Clone)]
struct LocationHistory {
    population: u64,
    days: Vec<DailyTotals>,
}

/// The merged table, indexed by location.
///
/// Read-only once built. Construct it with [`builder::TableBuilder`] or
/// [`CountyTable::from_rows`].
#[derive(Debug, Clone)]
pub struct CountyTable {
    rows: Vec<TimeSeriesRow>,
    histories: BTreeMap<LocationKey, LocationHistory>,
    counties: HashSet<String>,
    states: HashSet<String>,
}

impl CountyTable {
    /// Builds a table from merged rows, checking the cumulative totals
    /// according to `policy`.
    pub fn from_rows(
        rows: Vec<TimeSeriesRow>,
        policy: MonotonicPolicy,
    ) -> Result<CountyTable, SeriesError> {
        let mut builder = builder::TableBuilder::new(policy);
        builder.add_rows(rows)?;
        builder.build()
    }

    // The rows must have been checked for duplicates and population
    // consistency already.
    pub(crate) fn assemble(mut rows: Vec<TimeSeriesRow>) -> CountyTable {
        rows.sort_by(|a, b| {
            (a.date, &a.state, &a.county).cmp(&(b.date, &b.state, &b.county))
        });
        let mut histories: BTreeMap<LocationKey, LocationHistory> = BTreeMap::new();
        let mut counties: HashSet<String> = HashSet::new();
        let mut states: HashSet<String> = HashSet::new();
        // Rows are sorted by date, so each history is built in date order.
        for row in rows.iter() {
            counties.insert(row.county.clone());
            states.insert(row.state.clone());
            histories
                .entry(row.location())
                .or_insert_with(|| LocationHistory {
                    population: row.population,
                    days: Vec::new(),
                })
                .days
                .push(DailyTotals {
                    date: row.date,
                    total_cases: row.total_cases,
                    total_deaths: row.total_deaths,
                });
        }
        debug!(
            "assemble: {} rows, {} locations",
            rows.len(),
            histories.len()
        );
        CountyTable {
            rows,
            histories,
            counties,
            states,
        }
    }

    /// All the rows, sorted by date then state then county.
    pub fn rows(&self) -> &[TimeSeriesRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The distinct locations, in (county, state) order.
    pub fn locations(&self) -> impl Iterator<Item = &LocationKey> {
        self.histories.keys()
    }

    pub fn population(&self, location: &LocationKey) -> Result<u64, SeriesError> {
        self.history(location).map(|h| h.population)
    }

    /// The display strings of all the locations, sorted. This is the
    /// content expected in the location catalog.
    pub fn catalog(&self) -> Vec<String> {
        let mut res: Vec<String> = self.histories.keys().map(|k| k.to_string()).collect();
        res.sort();
        res
    }

    /// Looks up a location, telling apart an unknown county, an unknown
    /// state, and a county and state that never appear together.
    fn history(&self, location: &LocationKey) -> Result<&LocationHistory, SeriesError> {
        ensure!(
            self.counties.contains(&location.county),
            UnknownLocationSnafu {
                location: location.clone(),
                reason: UnknownReason::CountyNotFound,
            }
        );
        ensure!(
            self.states.contains(&location.state),
            UnknownLocationSnafu {
                location: location.clone(),
                reason: UnknownReason::StateNotFound,
            }
        );
        self.histories
            .get(location)
            .context(UnknownLocationSnafu {
                location: location.clone(),
                reason: UnknownReason::NotReportedTogether,
            })
    }

    /// Every place where a cumulative total decreases from one observation
    /// to the next, by location then date.
    pub fn monotonic_violations(&self) -> Vec<MonotonicViolation> {
        let mut res: Vec<MonotonicViolation> = Vec::new();
        for (location, history) in self.histories.iter() {
            for pair in history.days.windows(2) {
                for column in [Cumulative::Cases, Cumulative::Deaths] {
                    let (previous, current) = (pair[0].total(column), pair[1].total(column));
                    if current < previous {
                        res.push(MonotonicViolation {
                            location: location.clone(),
                            date: pair[1].date,
                            column,
                            previous,
                            current,
                        });
                    }
                }
            }
        }
        res
    }
}

/// The daily increments of a cumulative series.
///
/// The first observation is counted entirely as new.
pub fn new_per_day(totals: &[u64]) -> Vec<f64> {
    let mut res: Vec<f64> = Vec::with_capacity(totals.len());
    for (idx, total) in totals.iter().enumerate() {
        if idx == 0 {
            res.push(*total as f64);
        } else {
            res.push(*total as f64 - totals[idx - 1] as f64);
        }
    }
    res
}

/// The trailing mean over `window` observations. Undefined until `window`
/// observations are available. Nothing is defined over an empty window.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    values
        .iter()
        .enumerate()
        .map(|(idx, _)| {
            if window == 0 || idx + 1 < window {
                None
            } else {
                let sum: f64 = values[idx + 1 - window..=idx].iter().sum();
                Some(sum / window as f64)
            }
        })
        .collect()
}

// Computes the measurement over the whole history of a location.
fn derive_values(days: &[DailyTotals], measurement: Measurement) -> Vec<Option<f64>> {
    let totals: Vec<u64> = days.iter().map(|d| d.total(measurement.source())).collect();
    match measurement {
        Measurement::TotalCases | Measurement::TotalDeaths => {
            totals.iter().map(|t| Some(*t as f64)).collect()
        }
        Measurement::NewCases | Measurement::NewDeaths => {
            new_per_day(&totals).into_iter().map(Some).collect()
        }
        Measurement::NewCasesAvg7 | Measurement::NewDeathsAvg7 => {
            rolling_mean(&new_per_day(&totals), ROLLING_WINDOW)
        }
    }
}

/// Computes the series of one location.
///
/// Derived measurements are computed over the full history of the location
/// before the timespan is applied.
///
/// Arguments:
/// * `table` the merged table
/// * `location` the location, which must be present in the table
/// * `today` the reference day for the timespan
pub fn compute_series(
    table: &CountyTable,
    location: &LocationKey,
    measurement: Measurement,
    normalization: Normalization,
    timespan: Timespan,
    today: NaiveDate,
) -> Result<Vec<SeriesPoint>, SeriesError> {
    let history = table.history(location)?;
    let values = derive_values(&history.days, measurement);
    let window = timespan.window(today);

    let points: Vec<SeriesPoint> = history
        .days
        .iter()
        .zip(values)
        .filter(|(day, _)| match window {
            Some((start, end)) => day.date >= start && day.date <= end,
            None => true,
        })
        .map(|(day, value)| SeriesPoint {
            date: day.date,
            value: value.map(|v| normalization.apply(v, history.population)),
        })
        .collect();

    info!(
        "compute_series: {}: {} ({}, {}): {} of {} days",
        location,
        measurement.label(),
        normalization.label(),
        timespan.label(),
        points.len(),
        history.days.len()
    );
    Ok(points)
}

/// The computed series of one selected location.
#[derive(PartialEq, Debug, Clone)]
pub struct LocationSeries {
    pub location: LocationKey,
    pub color: &'static str,
    pub points: Result<Vec<SeriesPoint>, SeriesError>,
}

/// Computes the series of all the selected locations, in selection order.
///
/// A location missing from the table gets an error in its own entry and
/// does not prevent the other locations from being computed.
pub fn compute_selection(
    table: &CountyTable,
    selection: &Selection,
    today: NaiveDate,
) -> Vec<LocationSeries> {
    info!(
        "compute_selection: {} locations, {}",
        selection.locations.len(),
        selection.value_label()
    );
    let colors = palette::assign_colors(&selection.locations);
    selection
        .locations
        .iter()
        .zip(colors)
        .map(|(location, color)| LocationSeries {
            location: location.clone(),
            color,
            points: compute_series(
                table,
                location,
                selection.measurement,
                selection.normalization,
                selection.timespan,
                today,
            ),
        })
        .collect()
}

/// Differences between the table and a location catalog.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct CatalogDrift {
    /// Locations of the table absent from the catalog.
    pub missing: Vec<String>,
    /// Catalog entries without any row in the table.
    pub stale: Vec<String>,
}

impl CatalogDrift {
    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.stale.is_empty()
    }
}

pub fn catalog_drift(table: &CountyTable, catalog: &[String]) -> CatalogDrift {
    let expected: HashSet<String> = table.catalog().into_iter().collect();
    let listed: HashSet<&str> = catalog.iter().map(|s| s.as_str()).collect();
    let mut missing: Vec<String> = expected
        .iter()
        .filter(|s| !listed.contains(s.as_str()))
        .cloned()
        .collect();
    missing.sort();
    let mut stale: Vec<String> = catalog
        .iter()
        .filter(|s| !expected.contains(s.as_str()))
        .cloned()
        .collect();
    stale.sort();
    stale.dedup();
    CatalogDrift { missing, stale }
}
