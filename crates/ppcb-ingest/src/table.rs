//! Comma-delimited text with `"` quoting. Nothing else: no alternate
//! delimiters or quote characters, and a byte-order mark is kept as content.

use ppcb_core::RawRow;

use crate::IngestError;

/// Header list plus the data rows zipped against it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

pub fn parse(text: &str) -> Vec<RawRow> {
    parse_table(text).rows
}

pub fn parse_bytes(bytes: &[u8]) -> Result<Vec<RawRow>, IngestError> {
    decode(bytes).map(parse)
}

/// UTF-8 validation for raw source bytes; the only way parsing can fail.
pub fn decode(bytes: &[u8]) -> Result<&str, IngestError> {
    std::str::from_utf8(bytes).map_err(|e| IngestError::InvalidUtf8 {
        valid_up_to: e.valid_up_to(),
    })
}

pub fn parse_table(text: &str) -> Table {
    let mut records = split_records(text).into_iter();
    let Some(header_cells) = records.next() else {
        return Table::default();
    };
    let headers: Vec<String> = header_cells
        .into_iter()
        .map(|h| h.trim().to_string())
        .collect();
    let rows = records
        .filter_map(|cells| zip_row(&headers, cells))
        .collect();
    Table { headers, rows }
}

/// Missing trailing cells become empty strings and extra cells are dropped.
/// Blank rows are judged on the zipped values, so content that only lives in
/// an extra cell does not keep a row alive.
fn zip_row(headers: &[String], cells: Vec<String>) -> Option<RawRow> {
    let mut cells = cells.into_iter();
    let mut row = RawRow::new();
    for header in headers {
        row.insert(header.clone(), cells.next().unwrap_or_default());
    }
    if row.values().all(|v| v.trim().is_empty()) {
        return None;
    }
    Some(row)
}

fn split_records(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
            continue;
        }
        match c {
            '"' => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }
    records
}
