use scraper::ElementRef;

use super::{text_of, Selectors, MISSING_VALUE, UPLOAD_FORM_PLACEHOLDER};
use crate::config::Columns;
use crate::error::PipelineError;
use crate::record::Record;

/// Participant rows of the block's data table.
///
/// No table, or a header row without any labelled column, gives no rows. A
/// table without a `thead` is a structural failure.
pub fn participants(
    element: ElementRef,
    selectors: &Selectors,
    columns: &Columns,
) -> Result<Vec<Record>, PipelineError> {
    let Some(table) = element.select(&selectors.table).next() else {
        return Ok(Vec::new());
    };
    let head = table.select(&selectors.table_head).next().ok_or_else(|| {
        PipelineError::StructuralParseFailure("data table has no header section".into())
    })?;

    let headers = headers(head, selectors, columns);
    // only the synthetic id column: nothing to read
    if headers.len() < 2 {
        return Ok(Vec::new());
    }

    Ok(table
        .select(&selectors.data_row)
        .map(|row| participant(row, &headers, selectors, columns))
        .collect())
}

/// Column names from the first header row. The first cell is always the id
/// column; other cells without text get no slot.
pub fn headers(head: ElementRef, selectors: &Selectors, columns: &Columns) -> Vec<String> {
    let Some(row) = head.select(&selectors.row).next() else {
        return Vec::new();
    };

    let mut headers = Vec::new();
    for (i, th) in row.select(&selectors.header_cell).enumerate() {
        if i == 0 {
            headers.push(columns.user_id.clone());
            continue;
        }
        let text = text_of(th);
        if !text.is_empty() {
            headers.push(text);
        }
    }
    headers
}

/// One data row. The id comes from the row attribute; cell `i` (from 1, cell
/// 0 is the icon) fills header `i` until the headers run out.
fn participant(
    row: ElementRef,
    headers: &[String],
    selectors: &Selectors,
    columns: &Columns,
) -> Record {
    let mut record = Record::new();
    let id = row
        .value()
        .attr(&selectors.row_id_attribute)
        .unwrap_or(MISSING_VALUE);
    record.insert(headers[0].as_str(), id);

    for (i, cell) in row
        .select(&selectors.cell)
        .enumerate()
        .skip(1)
        .take_while(|(i, _)| *i < headers.len())
    {
        let header = &headers[i];
        let value = if *header == columns.certificate_url
            && cell.select(&selectors.upload_form).next().is_some()
        {
            UPLOAD_FORM_PLACEHOLDER.to_string()
        } else {
            text_of(cell)
        };
        record.insert(header.as_str(), value);
    }
    record
}
