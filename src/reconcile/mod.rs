pub mod filters;
pub mod normalize;

use std::collections::HashSet;

use tracing::{info, warn};

use crate::config::Columns;
use crate::error::PipelineError;
use crate::ledger::LedgerStore;
use crate::record::{Record, ReviewBlock};

/// Outcome of one reconciliation pass.
#[derive(Debug)]
pub struct Reconciliation {
    /// Flattened rows that survived both filters.
    pub batch: Vec<Record>,
    /// Rows of `batch` not present in the previous ledger, in batch order.
    pub new_rows: Vec<Record>,
    /// Previous ledger followed by `new_rows`.
    pub ledger: Vec<Record>,
    pub previous_len: usize,
    /// Conditions that were absorbed along the way.
    pub warnings: Vec<PipelineError>,
}

impl Reconciliation {
    pub fn has_new_rows(&self) -> bool {
        !self.new_rows.is_empty()
    }
}

/// One row per participant: normalized course info overlaid with the
/// participant's fields. Blocks without participants contribute nothing.
pub fn flatten(blocks: &[ReviewBlock], columns: &Columns) -> Vec<Record> {
    let mut rows = Vec::new();
    for block in blocks.iter().filter(|b| !b.participants.is_empty()) {
        let info = normalize::normalize_course_info(&block.course_info, columns);
        for participant in &block.participants {
            let mut row = info.clone();
            row.overlay(participant);
            rows.push(row);
        }
    }
    rows
}

/// Publication filter followed by the empty-comment filter.
pub fn filter_rows(
    rows: Vec<Record>,
    columns: &Columns,
    warnings: &mut Vec<PipelineError>,
) -> Vec<Record> {
    let rows = filters::publishable(rows, &columns.permission, warnings);
    filters::with_comments(rows, &columns.quality_comment, &columns.teacher_comment)
}

/// Rows of `batch` absent from `ledger`, first occurrence only, batch order.
pub fn diff(batch: &[Record], ledger: &[Record]) -> Vec<Record> {
    let mut seen: HashSet<&Record> = ledger.iter().collect();
    batch
        .iter()
        .filter(|row| seen.insert(*row))
        .cloned()
        .collect()
}

/// `ledger` without duplicates, followed by rows of `batch` not yet in it.
pub fn accumulate(ledger: Vec<Record>, batch: &[Record]) -> Vec<Record> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(ledger.len() + batch.len());
    for row in ledger.into_iter().chain(batch.iter().cloned()) {
        if !seen.contains(&row) {
            seen.insert(row.clone());
            out.push(row);
        }
    }
    out
}

/// The whole computation against an already loaded ledger.
pub fn reconcile_rows(
    blocks: &[ReviewBlock],
    columns: &Columns,
    ledger: Vec<Record>,
    mut warnings: Vec<PipelineError>,
) -> Reconciliation {
    let flat = flatten(blocks, columns);
    let flat_len = flat.len();
    let batch = filter_rows(flat, columns, &mut warnings);
    info!("Rows: {} extracted, {} after filters", flat_len, batch.len());

    let new_rows = diff(&batch, &ledger);
    let ledger = accumulate(ledger, &batch);
    let previous_len = ledger.len() - new_rows.len();

    Reconciliation {
        batch,
        new_rows,
        ledger,
        previous_len,
        warnings,
    }
}

/// Owns the ledger's read-modify-write cycle for one run.
pub struct Reconciler<S> {
    store: S,
    columns: Columns,
}

impl<S: LedgerStore> Reconciler<S> {
    pub fn new(store: S, columns: Columns) -> Self {
        Self { store, columns }
    }

    /// Load the ledger (missing or unreadable means empty) and reconcile
    /// `blocks` against it. `warnings` carries what extraction already
    /// absorbed. Nothing is written.
    pub fn reconcile(
        &self,
        blocks: &[ReviewBlock],
        mut warnings: Vec<PipelineError>,
    ) -> Reconciliation {
        let ledger = match self.store.load() {
            Ok(Some(rows)) => {
                info!("Ledger {:?}: {} rows", self.store.location(), rows.len());
                rows
            }
            Ok(None) => {
                let absent = PipelineError::ledger_unavailable(
                    self.store.location(),
                    "no ledger yet, starting empty",
                );
                info!("{}", absent);
                warnings.push(absent);
                Vec::new()
            }
            Err(e) => {
                warn!("{}; treating it as empty", e);
                warnings.push(e);
                Vec::new()
            }
        };
        reconcile_rows(blocks, &self.columns, ledger, warnings)
    }

    /// Persist the updated ledger. Skipped when the run added nothing, so
    /// an unreadable ledger is not overwritten by an empty one.
    pub fn commit(&self, outcome: &Reconciliation) -> Result<bool, PipelineError> {
        if !outcome.has_new_rows() {
            info!("Ledger unchanged, not rewritten");
            return Ok(false);
        }
        self.store.save(&outcome.ledger)?;
        info!(
            "Ledger {:?} saved: {} rows ({} new)",
            self.store.location(),
            outcome.ledger.len(),
            outcome.new_rows.len()
        );
        Ok(true)
    }
}

// ── Tests ──
