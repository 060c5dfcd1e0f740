//! Row adapter (`.csv`).
//!
//! The first record is a header and is never translated. Fields below it
//! are emitted column by column, so a batch tends to hold values of the
//! same column together. Write-back replaces translated fields in place and
//! keeps the header and the content of every other field. Records are
//! re-serialised by the csv writer, so quoting may differ from the source.

use std::path::Path;

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use log::info;

use super::model::{Extraction, Locator, TextUnit, Translations};
use crate::errors::DocumentError;

struct Table {
    header: Option<StringRecord>,
    rows: Vec<Vec<String>>,
}

fn read_table(path: &Path) -> Result<Table, DocumentError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| DocumentError::unreadable(path, e))?;

    let header = reader
        .headers()
        .map_err(|e| DocumentError::unreadable(path, e))?
        .clone();
    let header = (!header.is_empty()).then_some(header);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| DocumentError::unreadable(path, e))?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(Table { header, rows })
}

/// Extract every non-blank field below the header, column-major
pub fn extract(path: &Path) -> Result<Extraction, DocumentError> {
    let table = read_table(path)?;
    let width = table.rows.iter().map(Vec::len).max().unwrap_or(0);

    let mut units = Vec::new();
    for column in 0..width {
        for (row, fields) in table.rows.iter().enumerate() {
            match fields.get(column) {
                Some(field) if !field.trim().is_empty() => {
                    units.push(TextUnit::new(field.as_str(), Locator::Field { column, row }));
                }
                _ => {}
            }
        }
    }

    info!("Extracted {} fields from {:?}", units.len(), path);
    Ok(Extraction {
        units,
        images: Vec::new(),
    })
}

/// Rewrite the table at `output` with translated fields replaced
pub fn reinsert(source: &Path, output: &Path, translations: &Translations) -> Result<(), DocumentError> {
    let mut table = read_table(source).map_err(DocumentError::into_write_failure)?;

    for (locator, text) in translations.iter() {
        let slot = match locator {
            Locator::Field { column, row } => table.rows.get_mut(*row).and_then(|fields| fields.get_mut(*column)),
            _ => None,
        };
        match slot {
            Some(field) => *field = text.to_string(),
            None => return Err(DocumentError::UnresolvedLocator { locator: locator.clone() }),
        }
    }

    let fail = |e: csv::Error| DocumentError::write_failure(output, e);
    let mut writer = WriterBuilder::new().flexible(true).from_path(output).map_err(fail)?;
    if let Some(header) = &table.header {
        writer.write_record(header).map_err(fail)?;
    }
    for fields in &table.rows {
        writer.write_record(fields).map_err(fail)?;
    }
    writer.flush().map_err(|e| DocumentError::write_failure(output, e))
}
