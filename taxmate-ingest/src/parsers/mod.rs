//! Format-specific statement readers.

pub mod csv_export;
pub mod pdf_table;
pub mod pdf_text;
