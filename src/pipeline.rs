use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{DateTime, Local};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::Settings;
use crate::error::PipelineError;
use crate::ledger;
use crate::notify::Notifier;
use crate::parser::{self, Extractor};
use crate::reconcile::Reconciler;
use crate::record::{Record, ReviewBlock};
use crate::report;

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Local>,
    pub documents: usize,
    pub blocks: usize,
    pub batch_rows: usize,
    pub new_rows: usize,
    pub ledger_rows: usize,
    /// Set only when a report was written.
    pub report: Option<PathBuf>,
    pub warnings: Vec<String>,
    pub dry_run: bool,
}

impl RunSummary {
    pub fn print(&self) {
        println!("Started:     {}", self.started_at.format("%Y-%m-%d %H:%M:%S"));
        println!("Documents:   {}", self.documents);
        println!("Blocks:      {}", self.blocks);
        println!("Batch rows:  {}", self.batch_rows);
        println!("New rows:    {}", self.new_rows);
        println!("Ledger rows: {}", self.ledger_rows);
        match &self.report {
            Some(path) => println!("Report:      {}", path.display()),
            None => println!("Report:      none"),
        }
        if self.dry_run {
            println!("(dry run, nothing written)");
        }
        for warning in &self.warnings {
            println!("  warning: {}", warning);
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Blocks from every document, plus what made documents contribute nothing.
pub struct Extraction {
    pub blocks: Vec<ReviewBlock>,
    pub warnings: Vec<PipelineError>,
}

/// Extract every document in order. Documents that cannot be loaded or parsed
/// are skipped and their errors collected; the remaining blocks are
/// concatenated.
pub fn extract_documents(
    extractor: &Extractor,
    inputs: &[PathBuf],
    encoding: &str,
) -> Result<Extraction> {
    let pb = ProgressBar::new(inputs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let mut blocks = Vec::new();
    let mut warnings = Vec::new();
    for path in inputs {
        pb.set_message(path.display().to_string());
        match parser::load_document(path, encoding) {
            Ok(html) => {
                let found = extractor.extract(&html, &mut warnings);
                info!("{:?}: {} review blocks", path, found.len());
                blocks.extend(found);
            }
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                warn!("{:?} skipped: {}", path, e);
                warnings.push(e);
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();
    Ok(Extraction { blocks, warnings })
}

/// Extract, reconcile against the ledger, write the snapshot and report,
/// update the ledger, then notify. `dry_run` stops after reconciliation.
pub async fn run(
    settings: &Settings,
    inputs: &[PathBuf],
    notifier: &Notifier,
    dry_run: bool,
) -> Result<RunSummary> {
    let started_at = Local::now();
    let extractor = Extractor::new(
        &settings.markers,
        settings.columns.clone(),
        settings.isolation,
    )?;

    if !dry_run {
        report::remove_stale(&settings.report_file)?;
    }

    let Extraction { blocks, warnings } =
        extract_documents(&extractor, inputs, &settings.encoding)?;
    let reconciler = Reconciler::new(ledger::open(&settings.ledger), settings.columns.clone());
    let outcome = reconciler.reconcile(&blocks, warnings);
    info!(
        "{} new rows against {} already reported",
        outcome.new_rows.len(),
        outcome.previous_len
    );

    let mut summary = RunSummary {
        started_at,
        documents: inputs.len(),
        blocks: blocks.len(),
        batch_rows: outcome.batch.len(),
        new_rows: outcome.new_rows.len(),
        ledger_rows: outcome.ledger.len(),
        report: None,
        warnings: outcome.warnings.iter().map(|w| w.to_string()).collect(),
        dry_run,
    };
    if dry_run {
        return Ok(summary);
    }

    report::write_table(&settings.snapshot_file, &outcome.batch)?;

    if outcome.has_new_rows() {
        report::write_table(&settings.report_file, &outcome.new_rows)?;
        info!(
            "Report {:?}: {} new rows",
            settings.report_file,
            outcome.new_rows.len()
        );
        summary.report = Some(settings.report_file.clone());
    } else {
        info!("No new reviews");
    }

    reconciler.commit(&outcome)?;

    if let Some(path) = summary.report.as_deref() {
        notify_report(notifier, path, &outcome.new_rows, &settings.recipients).await?;
    }
    Ok(summary)
}

async fn notify_report(
    notifier: &Notifier,
    report: &Path,
    rows: &[Record],
    recipients: &[String],
) -> Result<()> {
    if recipients.is_empty() {
        warn!("No recipients configured");
    }
    notifier.notify(report, rows, recipients).await
}

// ── Tests ──
