//! CSV statement export.
//!
//! Expected header (extra columns are ignored, names are case-sensitive):
//!   date,description,debit,credit
//!   2024-01-05,POS deposit,,15000
//!   2024-01-06,Fuel,"5,000",

use tracing::debug;

use crate::error::{IngestError, Result};
use crate::extract::Extraction;
use crate::raw::{clean_cell, CsvFields, RawRow};

pub const REQUIRED_COLUMNS: [&str; 4] = ["date", "description", "debit", "credit"];

/// Read a CSV export. Fails only when the header row is unusable.
pub fn extract_csv(bytes: &[u8]) -> Result<Extraction> {
    let text = String::from_utf8_lossy(bytes);
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = rdr.headers()?.clone();
    let position = |name: &str| headers.iter().position(|h| h == name);

    let mut missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| position(c).is_none())
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        missing.sort();
        return Err(IngestError::MissingCsvColumns(missing));
    }

    let [date_idx, desc_idx, debit_idx, credit_idx] =
        REQUIRED_COLUMNS.map(|c| position(c).unwrap_or_default());

    let mut out = Extraction::default();
    for (line, result) in rdr.records().enumerate() {
        out.stats.rows_seen += 1;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                debug!(line = line + 2, error = %e, "unreadable CSV record skipped");
                out.stats.incomplete_rows += 1;
                continue;
            }
        };

        let fields = CsvFields {
            date: clean_cell(record.get(date_idx)),
            description: clean_cell(record.get(desc_idx)),
            debit: record.get(debit_idx).map(str::to_string),
            credit: record.get(credit_idx).map(str::to_string),
        };

        if fields.date.is_none() || fields.description.is_none() {
            debug!(line = line + 2, "CSV row without date or description skipped");
            out.stats.incomplete_rows += 1;
            continue;
        }

        out.push(RawRow::Csv(fields));
    }

    Ok(out)
}
