//! Best-effort numeric parsing for statement money columns.
//!
//! Statements routinely carry stray text in numeric columns. A cell that
//! cannot be read becomes 0.0 and is flagged as coerced; it never fails the row.

/// Result of reading one money cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParsedAmount {
    pub value: f64,
    /// The cell had text that was not a number and was read as 0.0
    pub coerced: bool,
}

impl ParsedAmount {
    const ZERO: ParsedAmount = ParsedAmount {
        value: 0.0,
        coerced: false,
    };
}

/// Strip thousands separators and parse; blank is 0.0.
pub fn parse_amount(raw: Option<&str>) -> ParsedAmount {
    let cleaned = match raw {
        Some(s) => s.replace(',', ""),
        None => return ParsedAmount::ZERO,
    };
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return ParsedAmount::ZERO;
    }
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => ParsedAmount {
            value: v,
            coerced: false,
        },
        _ => ParsedAmount {
            value: 0.0,
            coerced: true,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thousands_separators() {
        assert_eq!(parse_amount(Some("15,000.50")).value, 15000.5);
        assert_eq!(parse_amount(Some(" 1,234,567 ")).value, 1234567.0);
    }

    #[test]
    fn test_blank_is_zero_without_warning() {
        assert_eq!(parse_amount(None), ParsedAmount { value: 0.0, coerced: false });
        assert_eq!(parse_amount(Some("   ")), ParsedAmount { value: 0.0, coerced: false });
    }

    #[test]
    fn test_garbage_is_zero_with_warning() {
        for raw in ["Subtotal", "N/A", "1.2.3", "NaN", "inf", "-"] {
            let p = parse_amount(Some(raw));
            assert_eq!(p.value, 0.0, "{raw}");
            assert!(p.coerced, "{raw}");
        }
    }
}
