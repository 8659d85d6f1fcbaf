//! Canonical transaction types shared by ingestion and review

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Money in or money out
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Direction {
    #[serde(rename = "INCOME")]
    Income,
    #[serde(rename = "EXPENSE")]
    Expense,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Income => "INCOME",
            Direction::Expense => "EXPENSE",
        }
    }

    /// Read a direction suggested by the import service.
    /// Anything unrecognised (or missing) falls back to `Income`.
    pub fn from_suggestion(raw: Option<&str>) -> Direction {
        raw.and_then(|s| s.parse().ok()).unwrap_or(Direction::Income)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INCOME" => Ok(Direction::Income),
            "EXPENSE" => Ok(Direction::Expense),
            other => Err(format!("unknown direction '{other}' (expected INCOME or EXPENSE)")),
        }
    }
}

/// The closed category vocabulary a hustle transaction can be filed under
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Sales,
    Stock,
    Fuel,
    DataAirtime,
    Rent,
    Equipment,
    Transport,
    Food,
    Misc,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::Sales,
        Category::Stock,
        Category::Fuel,
        Category::DataAirtime,
        Category::Rent,
        Category::Equipment,
        Category::Transport,
        Category::Food,
        Category::Misc,
    ];

    /// Where anything outside the vocabulary ends up
    pub const CATCH_ALL: Category = Category::Misc;

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Sales => "SALES",
            Category::Stock => "STOCK",
            Category::Fuel => "FUEL",
            Category::DataAirtime => "DATA_AIRTIME",
            Category::Rent => "RENT",
            Category::Equipment => "EQUIPMENT",
            Category::Transport => "TRANSPORT",
            Category::Food => "FOOD",
            Category::Misc => "MISC",
        }
    }

    /// Exact, case-sensitive membership test against the vocabulary.
    pub fn lookup(label: &str) -> Option<Category> {
        Category::ALL.into_iter().find(|c| c.as_str() == label)
    }

    /// Coerce an untrusted suggestion into the vocabulary.
    ///
    /// Never rejects: unknown or missing labels become [`Category::CATCH_ALL`].
    pub fn coerce(suggested: Option<&str>) -> Category {
        suggested
            .and_then(Category::lookup)
            .unwrap_or(Category::CATCH_ALL)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    /// User input is matched case-insensitively; suggestions go through [`Category::coerce`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Category::lookup(&upper).ok_or_else(|| {
            let allowed: Vec<&str> = Category::ALL.iter().map(|c| c.as_str()).collect();
            format!("unknown category '{}' (expected one of {})", s.trim(), allowed.join(", "))
        })
    }
}

/// A statement line in its canonical pre-submission shape.
///
/// Only built for rows that actually move money; `amount` is always > 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedEntry {
    /// Date token exactly as it appeared on the statement
    pub date: String,
    pub description: String,
    pub amount: f64,
    pub direction: Direction,
    pub reference: Option<String>,
    pub counterparty: Option<String>,
}
