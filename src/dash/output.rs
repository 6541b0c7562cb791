use std::fs;

use chrono::NaiveDate;
use county_series::{LocationSeries, Selection, SeriesPoint};
use log::{info, warn};
use serde_json::json;
use serde_json::Value as JSValue;
use snafu::prelude::*;
use text_diff::print_diff;

use crate::dash::*;

fn points_to_json(points: &[SeriesPoint]) -> Vec<JSValue> {
    points
        .iter()
        .map(|p| json!({"date": p.date.format("%Y-%m-%d").to_string(), "value": p.value}))
        .collect()
}

/// Assembles the summary handed to the chart: one line per location, with
/// its color, or the reason it cannot be drawn.
pub fn build_summary_js(
    selection: &Selection,
    today: NaiveDate,
    results: &[LocationSeries],
) -> JSValue {
    let series: Vec<JSValue> = results
        .iter()
        .map(|r| match &r.points {
            Ok(points) => json!({
                "location": r.location.to_string(),
                "color": r.color,
                "points": points_to_json(points),
            }),
            Err(e) => json!({
                "location": r.location.to_string(),
                "color": r.color,
                "error": e.to_string(),
            }),
        })
        .collect();
    json!({
        "config": {
            "measurement": selection.measurement.label(),
            "normalization": selection.normalization.label(),
            "timespan": selection.timespan.label(),
            "today": today.format("%Y-%m-%d").to_string(),
            "yAxisLabel": selection.value_label(),
        },
        "series": series,
    })
}

/// Writes the summary to a file or to the standard output, and returns
/// its pretty-printed form.
pub fn write_summary(out: Option<&str>, summary: &JSValue) -> DashResult<String> {
    let pretty = serde_json::to_string_pretty(summary).context(ParsingJsonSnafu {
        path: out.unwrap_or("stdout"),
    })?;
    match out {
        Some(path) if !is_stdout(out) => {
            fs::write(path, &pretty).context(WritingOutputSnafu { path })?;
            info!("Wrote series to {:?}", path);
        }
        _ => {
            println!("{}", pretty);
        }
    }
    Ok(pretty)
}

/// Compares the computed summary with a reference file.
pub fn check_reference(path: &str, pretty: &str) -> DashResult<()> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let reference: JSValue =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    let pretty_reference =
        serde_json::to_string_pretty(&reference).context(ParsingJsonSnafu { path })?;
    if pretty_reference != pretty {
        warn!("Found differences with the reference {:?}", path);
        print_diff(pretty_reference.as_str(), pretty, "\n");
        return ReferenceMismatchSnafu { path }.fail();
    }
    info!("Computed series match the reference {:?}", path);
    Ok(())
}
