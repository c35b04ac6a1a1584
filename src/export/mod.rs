//! CSV export of a scrape run's result set.

use crate::models::CompanyRecord;
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Serialize records with one header row of field names. Absent values
/// become empty fields, never zeroes, so the export is lossless for
/// everything that was actually scraped.
pub fn write_csv<W: Write>(records: &[CompanyRecord], writer: W) -> Result<()> {
    let mut w = csv::Writer::from_writer(writer);
    for record in records {
        w.serialize(record).context("Failed to serialize record")?;
    }
    w.flush().context("Failed to flush CSV output")?;
    Ok(())
}

pub fn write_csv_file(records: &[CompanyRecord], path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Could not create {:?}", path))?;
    write_csv(records, file)?;
    info!("Wrote {} records to {:?}", records.len(), path);
    Ok(())
}
