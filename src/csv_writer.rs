//! CSV output for extracted records.
//!
//! One fixed-header table per run, written after the whole batch so a run
//! that extracts nothing leaves no file behind.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use crate::config::FieldSpec;
use crate::runner::ExtractedRecord;

/// Writes the header and one row per record, columns in field-table order.
///
/// Values are whitelist-restricted upstream, so rows need no quoting.
pub fn write_records(
    path: &Path,
    fields: &[FieldSpec],
    records: &[ExtractedRecord],
) -> Result<()> {
    let mut file = File::create(path).context("Failed to create CSV file")?;

    let header: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
    writeln!(file, "{}", header.join(",")).context("Failed to write CSV header")?;

    for record in records {
        let row: Vec<&str> = fields
            .iter()
            .map(|f| record.value(&f.name).unwrap_or(""))
            .collect();
        writeln!(file, "{}", row.join(",")).context("Failed to write CSV row")?;
    }

    Ok(())
}
