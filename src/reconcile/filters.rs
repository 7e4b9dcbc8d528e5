use tracing::{info, warn};

use crate::error::PipelineError;
use crate::record::Record;

/// Keep rows whose `column` is exactly `"1"`. When no row carries the column
/// the filter is skipped and a warning recorded.
pub fn publishable(
    rows: Vec<Record>,
    column: &str,
    warnings: &mut Vec<PipelineError>,
) -> Vec<Record> {
    if !rows.iter().any(|r| r.contains_column(column)) {
        let skipped = PipelineError::MissingExpectedColumn(column.to_string());
        warn!("{}", skipped);
        warnings.push(skipped);
        return rows;
    }

    let before = rows.len();
    let kept: Vec<Record> = rows
        .into_iter()
        .filter(|r| r.get(column) == Some("1"))
        .collect();
    info!("Publication filter '{}' == '1': kept {} of {}", column, kept.len(), before);
    kept
}

/// Drop rows where both comment columns are absent or blank.
pub fn with_comments(rows: Vec<Record>, quality: &str, teacher: &str) -> Vec<Record> {
    let before = rows.len();
    let kept: Vec<Record> = rows
        .into_iter()
        .filter(|r| !is_blank(r.get(quality)) || !is_blank(r.get(teacher)))
        .collect();
    info!("Rows without comments dropped: {}", before - kept.len());
    kept
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}
