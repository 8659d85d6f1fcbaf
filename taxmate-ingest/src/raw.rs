//! Format-specific raw rows behind one type.
//!
//! The normalizer only ever talks to the named accessors, so it does not
//! care whether a row came from a PDF table or a CSV record.

use crate::amount::{parse_amount, ParsedAmount};

/// Cells of one PDF table row, already picked out by column position
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PdfCells {
    pub date: Option<String>,
    pub reference: Option<String>,
    pub value_date: Option<String>,
    pub debit: Option<String>,
    pub credit: Option<String>,
    pub balance: Option<String>,
    pub remarks: Option<String>,
}

/// The required fields of one CSV record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvFields {
    pub date: Option<String>,
    pub description: Option<String>,
    pub debit: Option<String>,
    pub credit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawRow {
    Pdf(PdfCells),
    Csv(CsvFields),
}

/// Debit and credit as read from a row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Movement {
    pub debit: ParsedAmount,
    pub credit: ParsedAmount,
}

impl Movement {
    pub fn parse_warnings(&self) -> usize {
        usize::from(self.debit.coerced) + usize::from(self.credit.coerced)
    }
}

impl RawRow {
    pub fn date(&self) -> Option<&str> {
        match self {
            RawRow::Pdf(c) => c.date.as_deref(),
            RawRow::Csv(f) => f.date.as_deref(),
        }
    }

    pub fn reference(&self) -> Option<&str> {
        match self {
            RawRow::Pdf(c) => c.reference.as_deref(),
            RawRow::Csv(_) => None,
        }
    }

    pub fn value_date(&self) -> Option<&str> {
        match self {
            RawRow::Pdf(c) => c.value_date.as_deref(),
            RawRow::Csv(_) => None,
        }
    }

    pub fn debit(&self) -> Option<&str> {
        match self {
            RawRow::Pdf(c) => c.debit.as_deref(),
            RawRow::Csv(f) => f.debit.as_deref(),
        }
    }

    pub fn credit(&self) -> Option<&str> {
        match self {
            RawRow::Pdf(c) => c.credit.as_deref(),
            RawRow::Csv(f) => f.credit.as_deref(),
        }
    }

    pub fn balance(&self) -> Option<&str> {
        match self {
            RawRow::Pdf(c) => c.balance.as_deref(),
            RawRow::Csv(_) => None,
        }
    }

    /// Free text about the movement. A CSV's `description` column plays this role.
    pub fn remarks(&self) -> Option<&str> {
        match self {
            RawRow::Pdf(c) => c.remarks.as_deref(),
            RawRow::Csv(f) => f.description.as_deref(),
        }
    }

    pub fn movement(&self) -> Movement {
        Movement {
            debit: parse_amount(self.debit()),
            credit: parse_amount(self.credit()),
        }
    }
}

/// Trim a cell, treating whitespace-only as absent.
pub(crate) fn clean_cell(cell: Option<&str>) -> Option<String> {
    cell.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
