pub mod header;
pub mod table;

use std::io;
use std::path::Path;

use encoding_rs::Encoding;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, error, warn};

use crate::config::{Columns, FailureIsolation, Markers};
use crate::error::PipelineError;
use crate::record::ReviewBlock;

pub const MISSING_VALUE: &str = "N/A";
pub const UNKNOWN_TRAINER: &str = "Unknown";
pub const UPLOAD_FORM_PLACEHOLDER: &str = "upload form present, no URL";

/// Compiled form of [`Markers`].
pub struct Selectors {
    pub review_element: Selector,
    pub header_block: Selector,
    pub date: Selector,
    pub course_name: Selector,
    pub trainer_name: Selector,
    pub table: Selector,
    pub table_head: Selector,
    pub row: Selector,
    pub header_cell: Selector,
    pub data_row: Selector,
    pub cell: Selector,
    pub upload_form: Selector,
    pub row_id_attribute: String,
}

impl Selectors {
    pub fn compile(markers: &Markers) -> Result<Self, PipelineError> {
        Ok(Self {
            review_element: compile(&markers.review_element)?,
            header_block: compile(&markers.header_block)?,
            date: compile(&markers.date)?,
            course_name: compile(&markers.course_name)?,
            trainer_name: compile(&markers.trainer_name)?,
            table: compile(&markers.table)?,
            table_head: compile(&markers.table_head)?,
            row: compile("tr")?,
            header_cell: compile("th")?,
            data_row: compile(&markers.data_row)?,
            cell: compile("td")?,
            upload_form: compile(&markers.upload_form)?,
            row_id_attribute: markers.row_id_attribute.clone(),
        })
    }
}

fn compile(css: &str) -> Result<Selector, PipelineError> {
    Selector::parse(css).map_err(|e| PipelineError::InvalidSelector {
        selector: css.to_string(),
        reason: e.to_string(),
    })
}

/// Turns portal HTML into review blocks. Holds no state besides its
/// compiled configuration.
pub struct Extractor {
    selectors: Selectors,
    columns: Columns,
    isolation: FailureIsolation,
}

impl Extractor {
    pub fn new(
        markers: &Markers,
        columns: Columns,
        isolation: FailureIsolation,
    ) -> Result<Self, PipelineError> {
        Ok(Self {
            selectors: Selectors::compile(markers)?,
            columns,
            isolation,
        })
    }

    /// Best-effort extraction, the entry point for callers. A structural
    /// failure is logged, pushed to `warnings`, and yields no blocks.
    pub fn extract(&self, html: &str, warnings: &mut Vec<PipelineError>) -> Vec<ReviewBlock> {
        self.try_extract(html).unwrap_or_else(|e| {
            error!("Extraction failed, document skipped: {}", e);
            warnings.push(e);
            Vec::new()
        })
    }

    /// Like [`extract`](Self::extract) but returns the structural failure.
    /// Under block isolation only the failing block is dropped and this never
    /// fails.
    pub fn try_extract(&self, html: &str) -> Result<Vec<ReviewBlock>, PipelineError> {
        let document = Html::parse_document(html);
        let elements: Vec<ElementRef> = document.select(&self.selectors.review_element).collect();

        if elements.is_empty() {
            warn!("No review elements found in document");
            return Ok(Vec::new());
        }
        debug!("Found {} review elements", elements.len());

        match self.isolation {
            FailureIsolation::Document => elements
                .into_iter()
                .map(|el| self.extract_block(el))
                .collect(),
            FailureIsolation::Block => Ok(elements
                .into_iter()
                .enumerate()
                .filter_map(|(i, el)| match self.extract_block(el) {
                    Ok(block) => Some(block),
                    Err(e) => {
                        warn!("Review block {} skipped: {}", i, e);
                        None
                    }
                })
                .collect()),
        }
    }

    fn extract_block(&self, element: ElementRef) -> Result<ReviewBlock, PipelineError> {
        let course_info = header::course_info(element, &self.selectors, &self.columns);
        let participants = table::participants(element, &self.selectors, &self.columns)?;
        Ok(ReviewBlock {
            course_info,
            participants,
        })
    }
}

/// Read a document and decode it with the WHATWG `encoding` label.
pub fn load_document(path: &Path, encoding: &str) -> Result<String, PipelineError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(PipelineError::DocumentNotFound(path.to_path_buf()))
        }
        Err(e) => {
            return Err(PipelineError::StructuralParseFailure(format!(
                "cannot read {}: {}",
                path.display(),
                e
            )))
        }
    };

    let decoder = Encoding::for_label(encoding.as_bytes()).ok_or_else(|| PipelineError::Decode {
        path: path.to_path_buf(),
        encoding: encoding.to_string(),
    })?;
    let (text, used, had_errors) = decoder.decode(&bytes);
    if had_errors {
        warn!(
            "Malformed {} sequences in {:?} were replaced",
            used.name(),
            path
        );
    }
    Ok(text.into_owned())
}

/// Text of an element: every text node trimmed, empty ones dropped, the rest
/// concatenated.
pub fn text_of(element: ElementRef) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor(isolation: FailureIsolation) -> Extractor {
        Extractor::new(&Markers::default(), Columns::default(), isolation).unwrap()
    }

    fn fixture() -> String {
        std::fs::read_to_string("tests/fixtures/reviews.html").unwrap()
    }

    const NO_THEAD: &str = r#"
        <div class="rewiev-el">
          <div class="rewiev-el-head"><div class="rewiev-el__name">Broken</div></div>
          <table class="table"><tr class="userData" data-id="9"><td></td><td>x</td></tr></table>
        </div>"#;

    const GOOD: &str = r#"
        <div class="rewiev-el">
          <div class="rewiev-el-head"><div class="rewiev-el__name">Good</div></div>
          <table class="table">
            <thead><tr><th>#</th><th>Name</th></tr></thead>
            <tbody><tr class="userData" data-id="5"><td></td><td>Ann</td></tr></tbody>
          </table>
        </div>"#;

    #[test]
    fn no_review_elements() {
        let mut warnings = Vec::new();
        let blocks = extractor(FailureIsolation::Document).extract(
            "<html><body><div class=\"review\">nothing</div></body></html>",
            &mut warnings,
        );
        assert!(blocks.is_empty());
        assert!(warnings.is_empty());
    }

    #[test]
    fn empty_document() {
        assert!(extractor(FailureIsolation::Document)
            .extract("", &mut Vec::new())
            .is_empty());
    }

    #[test]
    fn fixture_blocks() {
        let blocks = extractor(FailureIsolation::Document)
            .try_extract(&fixture())
            .unwrap();
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].participants.len(), 3);
        assert!(blocks[1].participants.is_empty());
        assert!(blocks[2].participants.is_empty());
    }

    #[test]
    fn fixture_course_info() {
        let blocks = extractor(FailureIsolation::Document).extract(&fixture(), &mut Vec::new());
        let info = &blocks[0].course_info;
        assert_eq!(info.get("Date"), Some("15.03.2024"));
        assert!(info.get("Course").unwrap().starts_with("ITIL 4"));
        assert_eq!(info.get("Trainer"), Some("Иванов И.И."));

        assert_eq!(blocks[1].course_info.get("Trainer"), Some(UNKNOWN_TRAINER));

        let bare = &blocks[2].course_info;
        assert_eq!(bare.get("Date"), Some(MISSING_VALUE));
        assert_eq!(bare.get("Course"), Some(MISSING_VALUE));
        assert_eq!(bare.get("Trainer"), Some(UNKNOWN_TRAINER));
    }

    #[test]
    fn missing_thead_fails_whole_document() {
        let html = format!("{GOOD}{NO_THEAD}");
        let ex = extractor(FailureIsolation::Document);
        assert!(matches!(
            ex.try_extract(&html),
            Err(PipelineError::StructuralParseFailure(_))
        ));
        let mut warnings = Vec::new();
        assert!(ex.extract(&html, &mut warnings).is_empty());
        assert!(matches!(
            warnings.as_slice(),
            [PipelineError::StructuralParseFailure(_)]
        ));
    }

    #[test]
    fn missing_thead_drops_only_block_under_block_isolation() {
        let html = format!("{GOOD}{NO_THEAD}");
        let blocks = extractor(FailureIsolation::Block).try_extract(&html).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].course_info.get("Course"), Some("Good"));
        assert_eq!(blocks[0].participants[0].get("Name"), Some("Ann"));
    }

    #[test]
    fn invalid_marker_is_rejected() {
        let markers = Markers {
            data_row: "tr..userData".into(),
            ..Markers::default()
        };
        let result = Extractor::new(&markers, Columns::default(), FailureIsolation::Document);
        assert!(matches!(result, Err(PipelineError::InvalidSelector { .. })));
    }

    #[test]
    fn load_missing_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.html");
        assert!(matches!(
            load_document(&path, "windows-1251"),
            Err(PipelineError::DocumentNotFound(p)) if p == path
        ));
    }

    #[test]
    fn load_windows_1251_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");
        let (bytes, _, _) = encoding_rs::WINDOWS_1251.encode("<p>Тренер</p>");
        std::fs::write(&path, &bytes).unwrap();
        assert_eq!(load_document(&path, "windows-1251").unwrap(), "<p>Тренер</p>");
    }

    #[test]
    fn load_unknown_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");
        std::fs::write(&path, "<p></p>").unwrap();
        assert!(matches!(
            load_document(&path, "klingon"),
            Err(PipelineError::Decode { .. })
        ));
    }

    #[test]
    fn text_of_trims_each_node() {
        let html = Html::parse_fragment("<div>  a <span> b </span>\n c </div>");
        let sel = Selector::parse("div").unwrap();
        let div = html.select(&sel).next().unwrap();
        assert_eq!(text_of(div), "abc");
    }
}
