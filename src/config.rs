use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

const DEFAULT_CONFIG: &str = "review_tracker";
const ENV_PREFIX: &str = "REVIEWS";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Portal page to download with `fetch`.
    pub source_url: Option<String>,
    pub document: PathBuf,
    /// WHATWG label understood by `encoding_rs`.
    pub encoding: String,
    pub report_file: PathBuf,
    pub snapshot_file: PathBuf,
    pub ledger: LedgerSettings,
    pub recipients: Vec<String>,
    pub webhook_url: Option<String>,
    pub isolation: FailureIsolation,
    pub markers: Markers,
    pub columns: Columns,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source_url: None,
            document: PathBuf::from("data/input/temp.html"),
            encoding: "windows-1251".into(),
            report_file: PathBuf::from("data/reports/new_reviews.csv"),
            snapshot_file: PathBuf::from("data/reports/latest_batch.csv"),
            ledger: LedgerSettings::default(),
            recipients: Vec::new(),
            webhook_url: None,
            isolation: FailureIsolation::Document,
            markers: Markers::default(),
            columns: Columns::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LedgerSettings {
    pub backend: LedgerBackend,
    pub path: PathBuf,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            backend: LedgerBackend::Csv,
            path: PathBuf::from("data/reports/all_reports.csv"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerBackend {
    Csv,
    Sqlite,
}

/// Granularity at which a structural failure discards extracted data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureIsolation {
    /// The whole document yields nothing.
    Document,
    /// Only the failing review block is dropped.
    Block,
}

/// CSS selectors locating the portal's review widgets.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Markers {
    pub review_element: String,
    pub header_block: String,
    pub date: String,
    pub course_name: String,
    pub trainer_name: String,
    pub table: String,
    pub table_head: String,
    pub data_row: String,
    pub upload_form: String,
    /// Attribute of a data row holding the participant id.
    pub row_id_attribute: String,
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            review_element: "div.rewiev-el".into(),
            header_block: "div.rewiev-el-head".into(),
            date: "div.rewiev-el__date".into(),
            course_name: "div.rewiev-el__name".into(),
            trainer_name: "div.teacher-name-val".into(),
            table: "table.table".into(),
            table_head: "thead".into(),
            data_row: "tr.userData".into(),
            upload_form: "form.upload-cert-form".into(),
            row_id_attribute: "data-id".into(),
        }
    }
}

/// Column names: the synthetic and course-level keys we produce, and the
/// portal header labels the filters look for.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Columns {
    pub user_id: String,
    pub date: String,
    pub course: String,
    pub trainer: String,
    pub score: String,
    pub permission: String,
    pub quality_comment: String,
    pub teacher_comment: String,
    pub certificate_url: String,
}

impl Default for Columns {
    fn default() -> Self {
        Self {
            user_id: "User ID".into(),
            date: "Date".into(),
            course: "Course".into(),
            trainer: "Trainer".into(),
            score: "Оценка".into(),
            permission: "Разрешение на публикацию".into(),
            quality_comment: "Качество курса комментарий".into(),
            teacher_comment: "Работа преподавателя комментарий".into(),
            certificate_url: "URL Удостоверения".into(),
        }
    }
}

impl Settings {
    /// Load `review_tracker.toml` (or `path`) and `REVIEWS_*` overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => File::from(p).required(true),
            None => File::with_name(DEFAULT_CONFIG).required(false),
        };
        let env = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("recipients")
            .try_parsing(true);

        Config::builder()
            .add_source(file)
            .add_source(env)
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")
    }

    /// Create parent directories of every configured file.
    pub fn ensure_dirs(&self) -> Result<()> {
        for file in [
            &self.document,
            &self.report_file,
            &self.snapshot_file,
            &self.ledger.path,
        ] {
            if let Some(dir) = file.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create {:?}", dir))?;
            }
        }
        Ok(())
    }
}
