use scraper::{ElementRef, Selector};

use super::{text_of, Selectors, MISSING_VALUE, UNKNOWN_TRAINER};
use crate::config::Columns;
use crate::record::Record;

/// Date, course and trainer from the block's header. A missing header or
/// sub-field yields its sentinel; the keys are always present.
pub fn course_info(element: ElementRef, selectors: &Selectors, columns: &Columns) -> Record {
    let head = element.select(&selectors.header_block).next();
    let field = |sel: &Selector| {
        head.and_then(|h| h.select(sel).next())
            .map(text_of)
    };

    let mut info = Record::new();
    info.insert(
        columns.date.as_str(),
        field(&selectors.date).unwrap_or_else(|| MISSING_VALUE.to_string()),
    );
    info.insert(
        columns.course.as_str(),
        field(&selectors.course_name).unwrap_or_else(|| MISSING_VALUE.to_string()),
    );
    info.insert(
        columns.trainer.as_str(),
        field(&selectors.trainer_name).unwrap_or_else(|| UNKNOWN_TRAINER.to_string()),
    );
    info
}
