use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use log::{debug, warn};
use snafu::prelude::*;

pub use crate::config::*;
use crate::CountyTable;

/// A builder for assembling the merged table row by row.
///
/// Rows may be added in any order. Each row is checked on insertion: a
/// (date, county, state) key may only appear once, and all the rows of a
/// location must carry the same positive population. The cumulative totals
/// are checked when the table is built, following the [`MonotonicPolicy`].
///
/// ```
/// use chrono::NaiveDate;
/// use county_series::builder::TableBuilder;
/// use county_series::{MonotonicPolicy, SeriesError, TimeSeriesRow};
///
/// let mut builder = TableBuilder::new(MonotonicPolicy::Warn);
/// builder.add_row(TimeSeriesRow {
///     date: NaiveDate::from_ymd_opt(2020, 3, 13).unwrap(),
///     county: "Travis".to_string(),
///     state: "Texas".to_string(),
///     total_cases: 2,
///     total_deaths: 0,
///     population: 1_273_954,
/// })?;
/// let table = builder.build()?;
/// assert_eq!(table.catalog(), vec!["Travis, Texas".to_string()]);
///
/// # Ok::<(), SeriesError>(())
/// ```
pub struct TableBuilder {
    pub(crate) _policy: MonotonicPolicy,
    pub(crate) _rows: Vec<TimeSeriesRow>,
    pub(crate) _keys: HashSet<(NaiveDate, LocationKey)>,
    pub(crate) _populations: HashMap<LocationKey, u64>,
}

impl TableBuilder {
    pub fn new(policy: MonotonicPolicy) -> TableBuilder {
        TableBuilder {
            _policy: policy,
            _rows: Vec::new(),
            _keys: HashSet::new(),
            _populations: HashMap::new(),
        }
    }

    pub fn add_row(&mut self, row: TimeSeriesRow) -> Result<(), SeriesError> {
        let location = row.location();
        ensure!(
            row.population > 0,
            NonPositivePopulationSnafu {
                location: location.clone()
            }
        );
        match self._populations.get(&location) {
            Some(first) if *first != row.population => {
                return InconsistentPopulationSnafu {
                    location,
                    first: *first,
                    second: row.population,
                }
                .fail();
            }
            Some(_) => {}
            None => {
                self._populations.insert(location.clone(), row.population);
            }
        }
        ensure!(
            self._keys.insert((row.date, location.clone())),
            DuplicateRowSnafu {
                location,
                date: row.date
            }
        );
        self._rows.push(row);
        Ok(())
    }

    pub fn add_rows<I>(&mut self, rows: I) -> Result<(), SeriesError>
    where
        I: IntoIterator<Item = TimeSeriesRow>,
    {
        for row in rows {
            self.add_row(row)?;
        }
        Ok(())
    }

    pub fn build(self) -> Result<CountyTable, SeriesError> {
        debug!(
            "build: {} rows, {} locations, policy {:?}",
            self._rows.len(),
            self._populations.len(),
            self._policy
        );
        let table = CountyTable::assemble(self._rows);
        if self._policy == MonotonicPolicy::Ignore {
            return Ok(table);
        }
        let violations = table.monotonic_violations();
        if let Some(v) = violations.first() {
            if self._policy == MonotonicPolicy::Reject {
                return NonMonotonicSnafu {
                    location: v.location.clone(),
                    date: v.date,
                    column: v.column,
                    previous: v.previous,
                    current: v.current,
                }
                .fail();
            }
            warn!(
                "build: {} decreases found in cumulative totals",
                violations.len()
            );
            for v in violations.iter() {
                warn!(
                    "build: {} of {} decreased on {}: {} -> {}",
                    v.column, v.location, v.date, v.previous, v.current
                );
            }
        }
        Ok(table)
    }
}
