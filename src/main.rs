mod config;
mod db;
mod error;
mod fetch;
mod ledger;
mod notify;
mod parser;
mod pipeline;
mod reconcile;
mod record;
mod report;
#[cfg(test)]
mod testing;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use crate::config::Settings;
use crate::ledger::LedgerStore;
use crate::notify::Notifier;

#[derive(Parser)]
#[command(name = "review_tracker", about = "Course review extractor and incremental reporter")]
struct Cli {
    /// Settings file (default: review_tracker.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the review page to the document path
    Fetch {
        /// Page URL (default: source_url from settings)
        #[arg(long)]
        url: Option<String>,
        /// Output file (default: document from settings)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print extracted review blocks as JSON
    Extract {
        /// Documents to read (default: document from settings)
        inputs: Vec<PathBuf>,
    },
    /// Extract, reconcile with the ledger, write reports and notify
    Run {
        /// Documents to read (default: document from settings)
        inputs: Vec<PathBuf>,
        /// Download the review page first
        #[arg(long, conflicts_with = "dry_run")]
        fetch: bool,
        /// Reconcile and print the summary without writing anything
        #[arg(long)]
        dry_run: bool,
        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show ledger statistics
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;
    info!("Started at {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));

    let result = match cli.command {
        Commands::Fetch { url, output } => {
            settings.ensure_dirs()?;
            let output = output.unwrap_or_else(|| settings.document.clone());
            let bytes = fetch_page(&settings, url.as_deref(), &output).await?;
            println!("Saved {} bytes to {}", bytes, output.display());
            Ok(())
        }
        Commands::Extract { inputs } => {
            let inputs = inputs_or_default(inputs, &settings);
            let extractor = parser::Extractor::new(
                &settings.markers,
                settings.columns.clone(),
                settings.isolation,
            )?;
            let extraction = pipeline::extract_documents(&extractor, &inputs, &settings.encoding)?;
            println!("{}", serde_json::to_string_pretty(&extraction.blocks)?);
            Ok(())
        }
        Commands::Run {
            inputs,
            fetch: fetch_first,
            dry_run,
            json,
        } => {
            if !dry_run {
                settings.ensure_dirs()?;
            }
            if fetch_first {
                fetch_page(&settings, None, &settings.document).await?;
            }
            let inputs = inputs_or_default(inputs, &settings);
            let notifier = Notifier::from_settings(&settings, fetch::client()?);
            let summary = pipeline::run(&settings, &inputs, &notifier, dry_run).await?;
            if json {
                println!("{}", summary.to_json()?);
            } else {
                summary.print();
            }
            Ok(())
        }
        Commands::Stats => {
            let store = ledger::open(&settings.ledger);
            match store.load()? {
                None => println!("No ledger at {}", store.location().display()),
                Some(rows) => {
                    let columns = record::union_columns(&rows);
                    println!("Ledger:  {}", store.location().display());
                    println!("Backend: {:?}", settings.ledger.backend);
                    println!("Rows:    {}", rows.len());
                    println!("Columns: {}", columns.len());
                    for column in &columns {
                        let filled = rows
                            .iter()
                            .filter(|r| r.get(column).is_some_and(|v| !v.is_empty()))
                            .count();
                        println!("  {:<36} {:>6}", column, filled);
                    }
                }
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

async fn fetch_page(
    settings: &Settings,
    url: Option<&str>,
    output: &std::path::Path,
) -> anyhow::Result<usize> {
    let url = url
        .or(settings.source_url.as_deref())
        .context("No URL given and source_url is not configured")?;
    fetch::fetch_document(&fetch::client()?, url, output).await
}

fn inputs_or_default(inputs: Vec<PathBuf>, settings: &Settings) -> Vec<PathBuf> {
    if inputs.is_empty() {
        vec![settings.document.clone()]
    } else {
        inputs
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
