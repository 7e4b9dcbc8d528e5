use std::io;
use std::path::Path;

use tracing::{debug, info};

use crate::error::PipelineError;
use crate::record::{union_columns, Record};

/// Write `rows` as CSV: header is the union of columns in first-seen order,
/// missing values are empty cells. The file is replaced atomically.
pub fn write_table(path: &Path, rows: &[Record]) -> Result<(), PipelineError> {
    let columns = union_columns(rows);
    let tmp = path.with_extension("tmp");

    let write = || -> Result<(), csv::Error> {
        let mut writer = csv::Writer::from_path(&tmp)?;
        if !columns.is_empty() {
            writer.write_record(&columns)?;
            for row in rows {
                writer.write_record(columns.iter().map(|c| row.get(c).unwrap_or("")))?;
            }
        }
        writer.flush()?;
        Ok(())
    };
    let result = write()
        .map_err(|e| PipelineError::persistence(path, e))
        .and_then(|()| {
            std::fs::rename(&tmp, path).map_err(|e| PipelineError::persistence(path, e))
        });
    if result.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    result?;

    debug!("Wrote {} rows x {} columns to {:?}", rows.len(), columns.len(), path);
    Ok(())
}

/// Read a CSV written by [`write_table`]. Empty cells come back as absent
/// columns.
pub fn read_table(path: &Path) -> Result<Vec<Record>, csv::Error> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let mut rows: Vec<Record> = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(
            headers
                .iter()
                .zip(record.iter())
                .filter(|(_, v)| !v.is_empty())
                .collect(),
        );
    }
    Ok(rows)
}

/// Delete a report left over from an earlier run.
pub fn remove_stale(path: &Path) -> Result<(), PipelineError> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            info!("Removed previous report {:?}", path);
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(PipelineError::persistence(path, e)),
    }
}
