use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::info;

use crate::error::PipelineError;

const TIMEOUT_SECS: u64 = 60;

pub fn client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(TIMEOUT_SECS))
        .user_agent(concat!("review_tracker/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")
}

/// Download the portal page and store its raw bytes at `output`. Decoding
/// happens when the document is loaded.
pub async fn fetch_document(client: &reqwest::Client, url: &str, output: &Path) -> Result<usize> {
    info!("Fetching review page: {}", url);
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to fetch {}", url))?;

    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        bail!("Failed to fetch review page: status {}", status);
    }

    let bytes = response.bytes().await.context("Failed to read response body")?;
    if bytes.is_empty() {
        bail!("Fetched review page is empty");
    }

    std::fs::write(output, &bytes).map_err(|e| PipelineError::persistence(output, e))?;
    info!("Saved {} bytes to {:?}", bytes.len(), output);
    Ok(bytes.len())
}
