use thiserror::Error;

/// Whole-file failures. Row-level problems never surface here.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Unsupported file type: {0}. Please upload a CSV or PDF.")]
    UnsupportedFileType(String),

    #[error(
        "CSV is missing required columns: {}. Make sure the header row includes: date, description, debit, credit.",
        .0.join(", ")
    )]
    MissingCsvColumns(Vec<String>),

    #[error("Could not read CSV header: {0}")]
    Csv(#[from] csv::Error),

    #[error("Could not parse PDF statement: {0}")]
    Pdf(String),
}

pub type Result<T> = std::result::Result<T, IngestError>;
