//! Row normalizer: raw row -> canonical [`NormalizedEntry`].

use taxmate_core::{Direction, NormalizedEntry};

use crate::raw::RawRow;

/// Normalize one raw row.
///
/// Credit wins over debit. A row that moves no money yields `None`, even
/// though extractors are expected to have filtered those already.
pub fn normalize(row: &RawRow) -> Option<NormalizedEntry> {
    let movement = row.movement();
    let (direction, amount) = if movement.credit.value > 0.0 {
        (Direction::Income, movement.credit.value)
    } else if movement.debit.value > 0.0 {
        (Direction::Expense, movement.debit.value)
    } else {
        return None;
    };

    Some(NormalizedEntry {
        date: row.date().unwrap_or_default().trim().to_string(),
        description: compose_description(row.reference(), row.remarks()),
        amount,
        direction,
        reference: non_empty(row.reference()),
        counterparty: None,
    })
}

/// Join reference and remarks with a single space, skipping blanks.
pub fn compose_description(reference: Option<&str>, remarks: Option<&str>) -> String {
    [reference, remarks]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}
