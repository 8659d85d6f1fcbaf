//! Single entry point for turning an uploaded statement into normalized entries.

use serde::Serialize;
use taxmate_core::{Direction, NormalizedEntry};
use tracing::{info, warn};

use crate::error::{IngestError, Result};
use crate::layout::PdfLayout;
use crate::normalize::normalize;
use crate::parsers::{csv_export, pdf_table, pdf_text};
use crate::raw::RawRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SourceFormat {
    Csv,
    Pdf,
}

impl SourceFormat {
    /// Pick the format from the uploaded file's extension.
    pub fn from_file_name(name: &str) -> Result<Self> {
        let lower = name.trim().to_ascii_lowercase();
        if lower.ends_with(".csv") {
            Ok(SourceFormat::Csv)
        } else if lower.ends_with(".pdf") {
            Ok(SourceFormat::Pdf)
        } else {
            Err(IngestError::UnsupportedFileType(name.to_string()))
        }
    }

    /// Provenance label sent with the import request
    pub fn source_label(&self) -> &'static str {
        match self {
            SourceFormat::Csv => "CSV upload",
            SourceFormat::Pdf => "PDF upload",
        }
    }
}

/// Counters describing what happened to every row looked at
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionStats {
    pub rows_seen: usize,
    pub header_rows: usize,
    pub short_rows: usize,
    /// Blank rows and rows missing a date (or a CSV description)
    pub incomplete_rows: usize,
    pub no_movement_rows: usize,
    /// Money cells that held text and were read as 0.0
    pub parse_warnings: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PdfPreview {
    pub date: String,
    pub reference: String,
    pub value_date: String,
    pub debit: f64,
    pub credit: f64,
    pub balance: String,
    pub remarks: String,
    pub mapped_direction: Direction,
    pub mapped_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CsvPreview {
    pub date: String,
    pub description: String,
    pub debit: f64,
    pub credit: f64,
    pub mapped_direction: Direction,
    pub mapped_amount: f64,
}

/// What the user sees before importing, in the source's own vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PreviewRow {
    Pdf(PdfPreview),
    Csv(CsvPreview),
}

impl PreviewRow {
    fn new(row: &RawRow, entry: &NormalizedEntry) -> Self {
        let movement = row.movement();
        let text = |s: Option<&str>| s.unwrap_or_default().to_string();
        match row {
            RawRow::Pdf(_) => PreviewRow::Pdf(PdfPreview {
                date: entry.date.clone(),
                reference: text(row.reference()),
                value_date: text(row.value_date()),
                debit: movement.debit.value,
                credit: movement.credit.value,
                balance: text(row.balance()),
                remarks: text(row.remarks()),
                mapped_direction: entry.direction,
                mapped_amount: entry.amount,
            }),
            RawRow::Csv(_) => PreviewRow::Csv(CsvPreview {
                date: entry.date.clone(),
                description: entry.description.clone(),
                debit: movement.debit.value,
                credit: movement.credit.value,
                mapped_direction: entry.direction,
                mapped_amount: entry.amount,
            }),
        }
    }
}

/// Entries for the import service plus a parallel preview, same order and length.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Extraction {
    pub entries: Vec<NormalizedEntry>,
    pub preview: Vec<PreviewRow>,
    pub stats: ExtractionStats,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Accept a row that passed the format's own filters.
    pub(crate) fn push(&mut self, row: RawRow) {
        self.stats.parse_warnings += row.movement().parse_warnings();
        match normalize(&row) {
            Some(entry) => {
                self.preview.push(PreviewRow::new(&row, &entry));
                self.entries.push(entry);
            }
            None => self.stats.no_movement_rows += 1,
        }
    }
}

/// Extract and normalize every usable row of a statement.
///
/// Only container-level problems fail; bad rows are coerced or dropped and
/// show up in [`ExtractionStats`]. An empty result is not an error.
pub fn extract(bytes: &[u8], format: SourceFormat, layout: &PdfLayout) -> Result<Extraction> {
    let extraction = match format {
        SourceFormat::Csv => csv_export::extract_csv(bytes)?,
        SourceFormat::Pdf => {
            let pages = pdf_text::read_pages(bytes, layout)?;
            pdf_table::extract_tables(&pages, layout)
        }
    };

    let s = &extraction.stats;
    info!(
        format = ?format,
        rows_seen = s.rows_seen,
        accepted = extraction.len(),
        parse_warnings = s.parse_warnings,
        "statement extracted"
    );
    if extraction.is_empty() {
        warn!(format = ?format, "no usable rows found in statement");
    }
    Ok(extraction)
}

/// Resolve the format from `file_name`, then [`extract`].
pub fn extract_file(file_name: &str, bytes: &[u8], layout: &PdfLayout) -> Result<(SourceFormat, Extraction)> {
    let format = SourceFormat::from_file_name(file_name)?;
    Ok((format, extract(bytes, format, layout)?))
}
