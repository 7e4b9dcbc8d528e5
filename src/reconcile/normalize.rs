use std::sync::LazyLock;

use regex::Regex;

use crate::config::Columns;
use crate::record::Record;

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static DECIMAL_COMMA_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+,\d+").unwrap());
static SCORE_TAIL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[,/].*$").unwrap());

/// Collapse whitespace runs (newlines included) to one space and trim.
pub fn collapse_whitespace(value: &str) -> String {
    WHITESPACE_RE.replace_all(value, " ").trim().to_string()
}

/// `"4,5 / 5"` → `"4"`; values without a decimal comma pass through.
pub fn normalize_score(value: &str) -> String {
    let value = collapse_whitespace(value);
    if DECIMAL_COMMA_RE.is_match(&value) {
        SCORE_TAIL_RE.replace(&value, "").trim().to_string()
    } else {
        value
    }
}

/// Normalized copy of a block's course metadata.
pub fn normalize_course_info(info: &Record, columns: &Columns) -> Record {
    let mut out = info.clone();
    for (column, value) in out.iter_mut() {
        *value = if column == columns.score {
            normalize_score(value)
        } else {
            collapse_whitespace(value)
        };
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_newlines_and_runs() {
        assert_eq!(collapse_whitespace("  ITIL 4\n\t   Foundation  "), "ITIL 4 Foundation");
    }

    #[test]
    fn score_truncation() {
        assert_eq!(normalize_score("4,5 / 5"), "4");
        assert_eq!(normalize_score("4,5"), "4");
        assert_eq!(normalize_score("5"), "5");
        assert_eq!(normalize_score("5 / 5"), "5 / 5");
    }

    #[test]
    fn idempotent() {
        let columns = Columns::default();
        let inputs = ["4,5 / 5", "  a \n b ", "5", "", "x,1,2/3", " 3 , 7 "];
        for input in inputs {
            let info: Record = [
                (columns.score.as_str(), input),
                (columns.course.as_str(), input),
            ]
            .into_iter()
            .collect();
            let once = normalize_course_info(&info, &columns);
            let twice = normalize_course_info(&once, &columns);
            let a: Vec<_> = once.iter().collect();
            let b: Vec<_> = twice.iter().collect();
            assert_eq!(a, b, "input {:?}", input);
        }
    }

    #[test]
    fn score_rule_only_on_score_column() {
        let columns = Columns::default();
        let info: Record = [
            (columns.course.as_str(), "Course 4,5"),
            (columns.score.as_str(), "4,5 / 5"),
        ]
        .into_iter()
        .collect();
        let out = normalize_course_info(&info, &columns);
        assert_eq!(out.get(&columns.course), Some("Course 4,5"));
        assert_eq!(out.get(&columns.score), Some("4"));
    }
}
