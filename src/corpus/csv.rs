//! Delimited corpus file parsing
//!
//! A small RFC-4180 style reader: comma-separated fields, `"` quoting with
//! `""` escapes, quoted fields may contain separators and newlines. The
//! corpus files carry free-text interview answers, so quoting support is
//! not optional.

use crate::error::{IprepError, Result};

/// Parse an entire delimited file into rows of fields.
///
/// Empty lines between records are skipped. A lone trailing newline does
/// not produce an empty record.
pub fn parse(input: &str) -> Result<Vec<Vec<String>>> {
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    // True once the current record has any content (field text or a comma),
    // so blank lines don't emit empty records.
    let mut record_started = false;

    let mut chars = input.chars().peekable();
    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                }
                _ => field.push(ch),
            }
            continue;
        }

        match ch {
            '"' => {
                in_quotes = true;
                record_started = true;
            }
            ',' => {
                row.push(std::mem::take(&mut field));
                record_started = true;
            }
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                flush_record(&mut rows, &mut row, &mut field, &mut record_started);
            }
            '\n' => {
                flush_record(&mut rows, &mut row, &mut field, &mut record_started);
            }
            _ => {
                field.push(ch);
                record_started = true;
            }
        }
    }

    if in_quotes {
        return Err(IprepError::Corpus(
            "unterminated quoted field at end of input".to_string(),
        ));
    }
    flush_record(&mut rows, &mut row, &mut field, &mut record_started);

    Ok(rows)
}

fn flush_record(
    rows: &mut Vec<Vec<String>>,
    row: &mut Vec<String>,
    field: &mut String,
    record_started: &mut bool,
) {
    if !*record_started && row.is_empty() {
        return;
    }
    row.push(std::mem::take(field));
    rows.push(std::mem::take(row));
    *record_started = false;
}

/// Map a header row to column positions, failing on any missing column.
pub fn header_positions(header: &[String], required: &[&str]) -> Result<Vec<usize>> {
    required
        .iter()
        .map(|name| {
            header
                .iter()
                .position(|col| col.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| IprepError::Corpus(format!("missing corpus column: {name}")))
        })
        .collect()
}
