// Primitives for reading and writing the CSV files.

use std::fs::File;
use std::str::FromStr;

use chrono::NaiveDate;
use county_series::prepare::{CaseReport, PopulationRecord};
use county_series::TimeSeriesRow;
use csv::StringRecord;
use log::debug;
use snafu::prelude::*;

use crate::dash::*;

const TIMESERIES_COLUMNS: [&str; 5] = ["date", "county", "state", "cases", "deaths"];
const POPULATION_COLUMNS: [&str; 3] = ["county", "state", "population"];
const TABLE_COLUMNS: [&str; 6] = [
    "date",
    "county",
    "state",
    "total_cases",
    "total_deaths",
    "population",
];
const CATALOG_COLUMNS: [&str; 1] = ["location"];

/// The fields of one record, looked up by the position of their column in
/// the list of expected columns.
struct Fields<'a> {
    path: &'a str,
    lineno: u64,
    columns: &'a [&'a str],
    indexes: &'a [usize],
    record: &'a StringRecord,
}

impl<'a> Fields<'a> {
    fn get(&self, pos: usize) -> &'a str {
        self.record.get(self.indexes[pos]).unwrap_or("")
    }

    fn parse<T: FromStr>(&self, pos: usize) -> DashResult<T> {
        let content = self.get(pos);
        content.parse::<T>().ok().context(ParseFieldSnafu {
            path: self.path,
            lineno: self.lineno,
            column: self.columns[pos],
            content,
        })
    }

    // A blank field is `None`, anything else must parse.
    fn parse_opt<T: FromStr>(&self, pos: usize) -> DashResult<Option<T>> {
        if self.get(pos).is_empty() {
            Ok(None)
        } else {
            self.parse(pos).map(Some)
        }
    }
}

fn open(path: &str) -> DashResult<csv::Reader<File>> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .context(SourceUnavailableSnafu { path })
}

fn column_indexes(path: &str, header: &StringRecord, columns: &[&str]) -> DashResult<Vec<usize>> {
    columns
        .iter()
        .map(|c| {
            header
                .iter()
                .position(|h| h == *c)
                .context(SchemaMismatchSnafu { path, column: *c })
        })
        .collect()
}

fn read_records<T, F>(path: &str, columns: &[&str], read_one: F) -> DashResult<Vec<T>>
where
    F: Fn(&Fields) -> DashResult<T>,
{
    let mut rdr = open(path)?;
    let header = rdr
        .headers()
        .context(SourceUnavailableSnafu { path })?
        .clone();
    debug!("read_records: {:?}: header: {:?}", path, header);
    let indexes = column_indexes(path, &header, columns)?;

    let mut res: Vec<T> = Vec::new();
    for (idx, record_r) in rdr.records().enumerate() {
        let record = record_r.context(CsvRecordSnafu { path })?;
        // The header is on the first line.
        let lineno = record.position().map(|p| p.line()).unwrap_or(idx as u64 + 2);
        let fields = Fields {
            path,
            lineno,
            columns,
            indexes: &indexes,
            record: &record,
        };
        res.push(read_one(&fields)?);
    }
    debug!("read_records: {:?}: {} records", path, res.len());
    Ok(res)
}

/// Reads the raw time series. The counts are renamed to cumulative totals
/// later on, by the preparation.
pub fn read_case_reports(path: &str) -> DashResult<Vec<CaseReport>> {
    read_records(path, &TIMESERIES_COLUMNS, |f| {
        Ok(CaseReport {
            date: f.parse::<NaiveDate>(0)?,
            county: f.get(1).to_string(),
            state: f.get(2).to_string(),
            cases: f.parse_opt(3)?,
            deaths: f.parse_opt(4)?,
        })
    })
}

pub fn read_population(path: &str) -> DashResult<Vec<PopulationRecord>> {
    read_records(path, &POPULATION_COLUMNS, |f| {
        Ok(PopulationRecord {
            county: f.get(0).to_string(),
            state: f.get(1).to_string(),
            population: f.parse(2)?,
        })
    })
}

pub fn read_table(path: &str) -> DashResult<Vec<TimeSeriesRow>> {
    read_records(path, &TABLE_COLUMNS, |f| {
        Ok(TimeSeriesRow {
            date: f.parse::<NaiveDate>(0)?,
            county: f.get(1).to_string(),
            state: f.get(2).to_string(),
            total_cases: f.parse(3)?,
            total_deaths: f.parse(4)?,
            population: f.parse(5)?,
        })
    })
}

pub fn read_catalog(path: &str) -> DashResult<Vec<String>> {
    read_records(path, &CATALOG_COLUMNS, |f| Ok(f.get(0).to_string()))
}

fn write_records<I>(path: &str, columns: &[&str], records: I) -> DashResult<()>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut wtr = csv::Writer::from_path(path).context(WritingCsvSnafu { path })?;
    wtr.write_record(columns).context(WritingCsvSnafu { path })?;
    for record in records {
        wtr.write_record(&record).context(WritingCsvSnafu { path })?;
    }
    wtr.flush().context(WritingOutputSnafu { path })?;
    Ok(())
}

pub fn write_table(path: &str, rows: &[TimeSeriesRow]) -> DashResult<()> {
    write_records(
        path,
        &TABLE_COLUMNS,
        rows.iter().map(|r| {
            vec![
                r.date.format("%Y-%m-%d").to_string(),
                r.county.clone(),
                r.state.clone(),
                r.total_cases.to_string(),
                r.total_deaths.to_string(),
                r.population.to_string(),
            ]
        }),
    )
}

pub fn write_population(path: &str, records: &[PopulationRecord]) -> DashResult<()> {
    write_records(
        path,
        &POPULATION_COLUMNS,
        records
            .iter()
            .map(|r| vec![r.county.clone(), r.state.clone(), r.population.to_string()]),
    )
}

pub fn write_catalog(path: &str, entries: &[String]) -> DashResult<()> {
    write_records(path, &CATALOG_COLUMNS, entries.iter().map(|e| vec![e.clone()]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_the_raw_time_series() {
        let path = format!("{}/testdata/us-counties.csv", env!("CARGO_MANIFEST_DIR"));
        let reports = read_case_reports(&path).unwrap();
        assert_eq!(reports.len(), 25);
        assert_eq!(
            reports[0],
            CaseReport {
                date: NaiveDate::from_ymd_opt(2020, 3, 13).unwrap(),
                county: "Travis".to_string(),
                state: "Texas".to_string(),
                cases: Some(2),
                deaths: Some(0),
            }
        );
        // The rows of "Unknown, Texas" have no deaths.
        assert!(reports
            .iter()
            .filter(|r| r.county == "Unknown")
            .all(|r| r.deaths.is_none()));
    }

    #[test]
    fn bad_fields_report_their_line() {
        let path = format!("{}/testdata/bad_population.csv", env!("CARGO_MANIFEST_DIR"));
        match read_population(&path) {
            Err(DashError::ParseField {
                lineno,
                column,
                content,
                ..
            }) => {
                assert_eq!(lineno, 3);
                assert_eq!(column, "population");
                assert_eq!(content, "many");
            }
            x => panic!("unexpected result {:?}", x),
        }
    }

    #[test]
    fn written_tables_can_be_read_back() {
        let dir = std::env::temp_dir().join("covid_dash_tests");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("written_table.csv").display().to_string();
        let rows = vec![TimeSeriesRow {
            date: NaiveDate::from_ymd_opt(2020, 3, 1).unwrap(),
            county: "Doña Ana".to_string(),
            state: "New Mexico".to_string(),
            total_cases: 1,
            total_deaths: 0,
            population: 218_195,
        }];
        write_table(&path, &rows).unwrap();
        assert_eq!(read_table(&path).unwrap(), rows);
    }
}
