//! Column layout of a tabular PDF statement.
//!
//! The defaults describe a GTBank-style table:
//! `Trans Date | Reference | Value Date | Debit | Credit | Balance | Remarks`.

use serde::{Deserialize, Serialize};

use crate::raw::{clean_cell, PdfCells};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfLayout {
    /// A row is a header when its joined cells contain every marker
    pub header_markers: Vec<String>,
    /// Rows with fewer cells cannot hold date/reference/value-date/debit/credit
    pub min_cells: usize,
    /// Horizontal gap between glyphs, in multiples of the font size, that starts a new cell
    pub column_gap: f64,
    pub columns: PdfColumns,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfColumns {
    pub date: usize,
    pub reference: usize,
    pub value_date: usize,
    pub debit: usize,
    pub credit: usize,
    pub balance: usize,
    pub remarks: usize,
}

impl Default for PdfLayout {
    fn default() -> Self {
        Self {
            header_markers: vec!["Trans".to_string(), "Debit".to_string()],
            min_cells: 5,
            column_gap: 0.8,
            columns: PdfColumns::default(),
        }
    }
}

impl Default for PdfColumns {
    fn default() -> Self {
        Self {
            date: 0,
            reference: 1,
            value_date: 2,
            debit: 3,
            credit: 4,
            balance: 5,
            remarks: 6,
        }
    }
}

impl PdfLayout {
    /// Header check on already-split cells.
    pub fn is_header(&self, cells: &[Option<String>]) -> bool {
        let joined = cells
            .iter()
            .map(|c| c.as_deref().unwrap_or(""))
            .collect::<Vec<_>>()
            .join(" ");
        self.is_header_text(&joined)
    }

    /// Header check on a line of text.
    pub fn is_header_text(&self, text: &str) -> bool {
        !self.header_markers.is_empty() && self.header_markers.iter().all(|m| text.contains(m.as_str()))
    }

    /// Pick the semantic cells out of a row by position; `None` if the row is too short.
    pub fn map_cells(&self, cells: &[Option<String>]) -> Option<PdfCells> {
        if cells.len() < self.min_cells {
            return None;
        }
        let at = |i: usize| clean_cell(cells.get(i).and_then(|c| c.as_deref()));
        let c = &self.columns;
        Some(PdfCells {
            date: at(c.date),
            reference: at(c.reference),
            value_date: at(c.value_date),
            debit: at(c.debit),
            credit: at(c.credit),
            balance: at(c.balance),
            remarks: at(c.remarks),
        })
    }
}
