// Reading the census workbook of annual county population estimates.

use calamine::{open_workbook, DataType, Reader, Xlsx};
use county_series::prepare::PopulationRecord;
use log::debug;
use snafu::prelude::*;

use crate::dash::*;

// Layout of the workbook, zero-based. The header is on row 3, row 4 holds
// the national total and the last rows are footnotes.
const FIRST_DATA_ROW: usize = 5;
const FOOTER_ROWS: usize = 6;
const NAME_COLUMN: usize = 0;
// Column M: the 2019 estimate.
const POPULATION_COLUMN: usize = 12;

pub fn read_census_workbook(
    path: &str,
    worksheet: Option<&str>,
) -> DashResult<Vec<PopulationRecord>> {
    let wrange = get_range(path, worksheet)?;
    let rows: Vec<&[DataType]> = wrange.rows().collect();
    parse_census_rows(path, &rows)
}

fn get_range(path: &str, worksheet: Option<&str>) -> DashResult<calamine::Range<DataType>> {
    debug!("get_range: path: {:?} worksheet: {:?}", path, worksheet);
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;
    let wrange = match worksheet {
        // A worksheet name was provided, use it.
        Some(name) => workbook.worksheet_range(name),
        None => workbook.worksheet_range_at(0),
    };
    wrange
        .context(EmptyExcelSnafu { path })?
        .context(OpeningExcelSnafu { path })
}

/// Splits `.Autauga County, Alabama` into its county and state.
///
/// Returns `None` for the names that are not counties.
pub fn split_county_name(name: &str) -> Option<(String, String)> {
    let (county, state) = name.split_once("County,")?;
    let county = county.trim_matches(|c| c == ' ' || c == '.');
    let state = state.trim_matches(' ');
    if county.is_empty() || state.is_empty() {
        None
    } else {
        Some((county.to_string(), state.to_string()))
    }
}

pub fn parse_census_rows(path: &str, rows: &[&[DataType]]) -> DashResult<Vec<PopulationRecord>> {
    let end = rows.len().saturating_sub(FOOTER_ROWS);
    let mut res: Vec<PopulationRecord> = Vec::new();
    let mut skipped: usize = 0;
    for (idx, row) in rows.iter().enumerate().take(end).skip(FIRST_DATA_ROW) {
        let split = match row.get(NAME_COLUMN) {
            Some(DataType::String(s)) => split_county_name(s),
            _ => None,
        };
        let (county, state) = match split {
            Some(x) => x,
            None => {
                debug!("parse_census_rows: row {}: skipping {:?}", idx + 1, row.get(NAME_COLUMN));
                skipped += 1;
                continue;
            }
        };
        let cell = row.get(POPULATION_COLUMN);
        let population: u64 = match cell {
            Some(DataType::Int(i)) if *i > 0 => *i as u64,
            Some(DataType::Float(f)) if *f > 0.0 && f.fract() == 0.0 => *f as u64,
            _ => {
                return ParseFieldSnafu {
                    path,
                    lineno: (idx + 1) as u64,
                    column: "population",
                    content: format!("{:?}", cell),
                }
                .fail();
            }
        };
        res.push(PopulationRecord {
            county,
            state,
            population,
        });
    }
    debug!(
        "parse_census_rows: {} counties, {} rows skipped",
        res.len(),
        skipped
    );
    Ok(res)
}
