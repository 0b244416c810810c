//! Conversion of record sets between JSON and tabular representations.

use crate::models::PaperRecord;

/// CSV column order. Fixed regardless of where the data came from.
pub const CSV_HEADER: [&str; 5] = ["ID", "Title", "Authors", "Journal", "Publication Date"];

/// Errors from rendering a record set
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Render records as a CSV table.
///
/// The header row is always written, even for an empty record set, and no
/// column is ever suppressed for being empty across all records.
pub fn to_csv(records: &[PaperRecord]) -> Result<Vec<u8>, ExportError> {
    let mut buf = Vec::new();
    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(&mut buf);
        writer.write_record(CSV_HEADER)?;
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;
    }
    Ok(buf)
}

/// Render records as a pretty-printed JSON array.
pub fn to_json(records: &[PaperRecord]) -> Result<Vec<u8>, ExportError> {
    Ok(serde_json::to_vec_pretty(records)?)
}
