//! taxmate-ingest: statement extraction (CSV exports, tabular PDFs) and row normalization.

pub mod amount;
pub mod error;
pub mod extract;
pub mod layout;
pub mod normalize;
pub mod parsers;
pub mod raw;

pub use error::IngestError;
pub use extract::{extract, extract_file, Extraction, ExtractionStats, PreviewRow, SourceFormat};
pub use layout::{PdfColumns, PdfLayout};
pub use normalize::normalize;
pub use raw::{CsvFields, PdfCells, RawRow};
