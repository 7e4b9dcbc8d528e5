use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::info;

use crate::config::Settings;
use crate::record::Record;

pub const SUBJECT: &str = "New course reviews";

#[derive(Debug, Serialize)]
struct Notification<'a> {
    subject: &'a str,
    recipients: &'a [String],
    report: &'a Path,
    count: usize,
    /// The report's rows, so a relay can deliver them without the file.
    rows: &'a [Record],
}

/// Announces a freshly written report.
pub enum Notifier {
    /// Log the announcement only.
    Log,
    /// POST a JSON announcement to a webhook (mail relay, chat hook).
    Webhook { client: reqwest::Client, url: String },
}

impl Notifier {
    pub fn from_settings(settings: &Settings, client: reqwest::Client) -> Self {
        match &settings.webhook_url {
            Some(url) => Notifier::Webhook {
                client,
                url: url.clone(),
            },
            None => Notifier::Log,
        }
    }

    pub async fn notify(
        &self,
        report: &Path,
        rows: &[Record],
        recipients: &[String],
    ) -> Result<()> {
        let message = Notification {
            subject: SUBJECT,
            recipients,
            report,
            count: rows.len(),
            rows,
        };

        match self {
            Notifier::Log => {
                info!(
                    "{}: {} rows in {:?} for {}",
                    SUBJECT,
                    rows.len(),
                    report,
                    recipients.join(", ")
                );
            }
            Notifier::Webhook { client, url } => {
                let status = client
                    .post(url)
                    .json(&message)
                    .send()
                    .await
                    .with_context(|| format!("Failed to reach webhook {}", url))?
                    .status();
                if !status.is_success() {
                    bail!("Webhook {} rejected notification: status {}", url, status);
                }
                info!("Notified {} recipients via webhook", recipients.len());
            }
        }
        Ok(())
    }
}
