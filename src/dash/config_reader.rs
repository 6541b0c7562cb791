use crate::dash::*;

use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use std::fs;
use std::path::Path;

/// A query described in JSON format. All the fields are optional, the
/// command line flags fill in or override them.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryConfig {
    pub table: Option<String>,
    #[serde(default)]
    pub locations: Vec<String>,
    pub measurement: Option<String>,
    pub normalization: Option<String>,
    pub timespan: Option<String>,
    pub today: Option<String>,
    #[serde(rename = "outputPath")]
    pub output_path: Option<String>,
}

/// Reads a query configuration. Relative paths are resolved against the
/// directory of the configuration file.
pub fn read_query_config(path: &str) -> DashResult<QueryConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let mut config: QueryConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    let root = Path::new(path).parent().unwrap_or_else(|| Path::new(""));
    config.table = config.table.map(|p| resolve(root, &p));
    config.output_path = config
        .output_path
        .map(|p| if is_stdout(Some(&p)) { p } else { resolve(root, &p) });
    Ok(config)
}

fn resolve(root: &Path, p: &str) -> String {
    if Path::new(p).is_absolute() {
        p.to_string()
    } else {
        root.join(p).display().to_string()
    }
}
