//! Joins the raw case reports with the population table.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;
use log::{debug, info, warn};
use snafu::prelude::*;

use crate::config::*;

/// One row of the raw time series, as published by the upstream feed.
///
/// The feed leaves some counts blank, mostly for places without a
/// population entry. A blank count is only an error on a row that is kept.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct CaseReport {
    pub date: NaiveDate,
    pub county: String,
    pub state: String,
    pub cases: Option<u64>,
    pub deaths: Option<u64>,
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct PopulationRecord {
    pub county: String,
    pub state: String,
    pub population: u64,
}

impl PopulationRecord {
    pub fn location(&self) -> LocationKey {
        LocationKey::new(&self.county, &self.state)
    }
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct MergeOutcome {
    /// The merged rows, sorted by date then state then county.
    pub rows: Vec<TimeSeriesRow>,
    /// The locations without population, with the number of rows dropped
    /// for each of them.
    pub unmatched: Vec<(LocationKey, usize)>,
    pub dropped_rows: usize,
}

/// Adds the New York City aggregate to the population records, unless the
/// source already has it.
pub fn with_new_york_city(mut records: Vec<PopulationRecord>) -> Vec<PopulationRecord> {
    let nyc = LocationKey::new_york_city();
    if records.iter().any(|r| r.location() == nyc) {
        debug!("with_new_york_city: population source already lists {}", nyc);
    } else {
        records.push(PopulationRecord {
            county: NYC_COUNTY.to_string(),
            state: NYC_STATE.to_string(),
            population: NYC_POPULATION,
        });
    }
    records
}

fn population_index(
    records: &[PopulationRecord],
) -> Result<HashMap<LocationKey, u64>, SeriesError> {
    let mut res: HashMap<LocationKey, u64> = HashMap::with_capacity(records.len());
    for r in records.iter() {
        let location = r.location();
        ensure!(
            r.population > 0,
            NonPositivePopulationSnafu {
                location: location.clone()
            }
        );
        ensure!(
            res.insert(location.clone(), r.population).is_none(),
            DuplicatePopulationSnafu { location }
        );
    }
    Ok(res)
}

/// Merges the case reports with the population records.
///
/// The synthetic New York City entry is added to the population records
/// before the join. Reports whose location has no population entry are
/// handled according to `policy`.
pub fn prepare(
    reports: Vec<CaseReport>,
    population: Vec<PopulationRecord>,
    policy: UnmatchedPolicy,
) -> Result<MergeOutcome, SeriesError> {
    info!(
        "prepare: {} case reports, {} population records, unmatched policy {:?}",
        reports.len(),
        population.len(),
        policy
    );
    let populations = population_index(&with_new_york_city(population))?;

    let mut rows: Vec<TimeSeriesRow> = Vec::with_capacity(reports.len());
    let mut keys: HashSet<(NaiveDate, LocationKey)> = HashSet::with_capacity(reports.len());
    let mut unmatched: BTreeMap<LocationKey, usize> = BTreeMap::new();
    for report in reports {
        let location = LocationKey::new(&report.county, &report.state);
        let population = match populations.get(&location) {
            Some(p) => *p,
            None => {
                *unmatched.entry(location).or_insert(0) += 1;
                continue;
            }
        };
        ensure!(
            keys.insert((report.date, location.clone())),
            DuplicateRowSnafu {
                location,
                date: report.date
            }
        );
        let total_cases = report.cases.context(MissingCountSnafu {
            location: location.clone(),
            date: report.date,
            column: Cumulative::Cases,
        })?;
        let total_deaths = report.deaths.context(MissingCountSnafu {
            location,
            date: report.date,
            column: Cumulative::Deaths,
        })?;
        rows.push(TimeSeriesRow {
            date: report.date,
            county: report.county,
            state: report.state,
            total_cases,
            total_deaths,
            population,
        });
    }

    let dropped_rows: usize = unmatched.values().sum();
    if let Some(first) = unmatched.keys().next() {
        match policy {
            UnmatchedPolicy::Reject => {
                return UnmatchedLocationsSnafu {
                    count: unmatched.len(),
                    dropped_rows,
                    first: first.clone(),
                }
                .fail();
            }
            UnmatchedPolicy::Warn => {
                for (location, count) in unmatched.iter() {
                    warn!(
                        "prepare: no population for {}: dropping {} rows",
                        location, count
                    );
                }
            }
            UnmatchedPolicy::Drop => {}
        }
    }

    rows.sort_by(|a, b| (a.date, &a.state, &a.county).cmp(&(b.date, &b.state, &b.county)));
    info!(
        "prepare: {} merged rows, {} rows dropped from {} locations",
        rows.len(),
        dropped_rows,
        unmatched.len()
    );
    Ok(MergeOutcome {
        rows,
        unmatched: unmatched.into_iter().collect(),
        dropped_rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(d: u32, county: &str, state: &str, cases: u64, deaths: u64) -> CaseReport {
        CaseReport {
            date: NaiveDate::from_ymd_opt(2020, 3, d).unwrap(),
            county: county.to_string(),
            state: state.to_string(),
            cases: Some(cases),
            deaths: Some(deaths),
        }
    }

    fn pop(county: &str, state: &str, population: u64) -> PopulationRecord {
        PopulationRecord {
            county: county.to_string(),
            state: state.to_string(),
            population,
        }
    }

    fn sample_reports() -> Vec<CaseReport> {
        vec![
            report(2, "Travis", "Texas", 3, 0),
            report(1, "Travis", "Texas", 1, 0),
            report(1, "New York City", "New York", 20, 1),
            report(1, "Unknown", "Texas", 5, 0),
            report(2, "Unknown", "Texas", 6, 0),
        ]
    }

    #[test]
    fn joins_on_location_and_renames_columns() {
        let outcome = prepare(
            sample_reports(),
            vec![pop("Travis", "Texas", 1_273_954)],
            UnmatchedPolicy::Drop,
        )
        .unwrap();
        assert_eq!(outcome.rows.len(), 3);
        let first = &outcome.rows[0];
        assert_eq!(first.county, "New York City");
        assert_eq!(first.population, NYC_POPULATION);
        assert_eq!(first.total_cases, 20);
        assert_eq!(first.total_deaths, 1);
        assert_eq!(outcome.rows[1].county, "Travis");
        assert_eq!(outcome.rows[2].total_cases, 3);
        assert!(outcome.rows.windows(2).all(|w| w[0].date <= w[1].date));
    }

    #[test]
    fn unmatched_rows_are_recorded() {
        let outcome = prepare(
            sample_reports(),
            vec![pop("Travis", "Texas", 1_273_954)],
            UnmatchedPolicy::Warn,
        )
        .unwrap();
        assert_eq!(outcome.dropped_rows, 2);
        assert_eq!(
            outcome.unmatched,
            vec![(LocationKey::new("Unknown", "Texas"), 2)]
        );
    }

    #[test]
    fn unmatched_rows_can_be_rejected() {
        let res = prepare(
            sample_reports(),
            vec![pop("Travis", "Texas", 1_273_954)],
            UnmatchedPolicy::Reject,
        );
        assert_eq!(
            res,
            Err(SeriesError::UnmatchedLocations {
                count: 1,
                dropped_rows: 2,
                first: LocationKey::new("Unknown", "Texas"),
            })
        );
    }

    #[test]
    fn existing_new_york_city_population_is_kept() {
        let records = with_new_york_city(vec![pop("New York City", "New York", 8_000_000)]);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].population, 8_000_000);

        let records = with_new_york_city(vec![]);
        assert_eq!(records, vec![pop(NYC_COUNTY, NYC_STATE, NYC_POPULATION)]);
    }

    #[test]
    fn population_must_be_unique_and_positive() {
        let res = prepare(
            sample_reports(),
            vec![pop("Travis", "Texas", 1), pop("Travis", "Texas", 2)],
            UnmatchedPolicy::Drop,
        );
        assert_eq!(
            res,
            Err(SeriesError::DuplicatePopulation {
                location: LocationKey::new("Travis", "Texas")
            })
        );
        let res = prepare(
            sample_reports(),
            vec![pop("Travis", "Texas", 0)],
            UnmatchedPolicy::Drop,
        );
        assert!(matches!(res, Err(SeriesError::NonPositivePopulation { .. })));
    }

    #[test]
    fn blank_counts_only_matter_on_kept_rows() {
        let mut reports = sample_reports();
        reports[3].deaths = None;
        let outcome = prepare(
            reports.clone(),
            vec![pop("Travis", "Texas", 1_273_954)],
            UnmatchedPolicy::Warn,
        )
        .unwrap();
        assert_eq!(outcome.rows.len(), 3);
        assert_eq!(outcome.dropped_rows, 2);

        reports[0].cases = None;
        let res = prepare(
            reports,
            vec![pop("Travis", "Texas", 1_273_954)],
            UnmatchedPolicy::Warn,
        );
        assert_eq!(
            res,
            Err(SeriesError::MissingCount {
                location: LocationKey::new("Travis", "Texas"),
                date: NaiveDate::from_ymd_opt(2020, 3, 2).unwrap(),
                column: Cumulative::Cases,
            })
        );
    }

    #[test]
    fn duplicate_reports_are_rejected() {
        let mut reports = sample_reports();
        reports.push(report(2, "Travis", "Texas", 4, 0));
        let res = prepare(
            reports,
            vec![pop("Travis", "Texas", 1_273_954)],
            UnmatchedPolicy::Drop,
        );
        assert!(matches!(res, Err(SeriesError::DuplicateRow { .. })));
    }
}
