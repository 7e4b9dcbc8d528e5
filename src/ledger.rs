use std::path::{Path, PathBuf};

use crate::config::{LedgerBackend, LedgerSettings};
use crate::db::SqliteLedger;
use crate::error::PipelineError;
use crate::record::Record;
use crate::report;

/// Persistence for the cumulative ledger. The whole ledger is read once and
/// written back whole.
pub trait LedgerStore {
    fn location(&self) -> &Path;

    /// `Ok(None)` when no ledger has been written yet.
    fn load(&self) -> Result<Option<Vec<Record>>, PipelineError>;

    fn save(&self, rows: &[Record]) -> Result<(), PipelineError>;
}

impl<S: LedgerStore + ?Sized> LedgerStore for Box<S> {
    fn location(&self) -> &Path {
        (**self).location()
    }

    fn load(&self) -> Result<Option<Vec<Record>>, PipelineError> {
        (**self).load()
    }

    fn save(&self, rows: &[Record]) -> Result<(), PipelineError> {
        (**self).save(rows)
    }
}

pub fn open(settings: &LedgerSettings) -> Box<dyn LedgerStore> {
    match settings.backend {
        LedgerBackend::Csv => Box::new(CsvLedger::new(&settings.path)),
        LedgerBackend::Sqlite => Box::new(SqliteLedger::new(&settings.path)),
    }
}

/// Ledger kept as a CSV file with the union of all columns.
pub struct CsvLedger {
    path: PathBuf,
}

impl CsvLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl LedgerStore for CsvLedger {
    fn location(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Option<Vec<Record>>, PipelineError> {
        if !self.path.exists() {
            return Ok(None);
        }
        report::read_table(&self.path)
            .map(Some)
            .map_err(|e| PipelineError::ledger_unavailable(&self.path, e))
    }

    fn save(&self, rows: &[Record]) -> Result<(), PipelineError> {
        report::write_table(&self.path, rows)
    }
}
