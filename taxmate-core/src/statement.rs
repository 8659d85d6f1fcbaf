//! Statement builder: the import request we send, and the statement that comes back.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::types::{Category, Direction, NormalizedEntry};

/// Body of `POST /me/hustles/{id}/statements/import`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    /// Upload channel, e.g. "CSV upload"
    pub source: String,
    pub file_name: String,
    pub rows: Vec<NormalizedEntry>,
}

/// Assemble the import payload. Pure data assembly, no I/O.
pub fn build_import_payload(
    entries: Vec<NormalizedEntry>,
    source_label: &str,
    file_name: &str,
) -> ImportRequest {
    ImportRequest {
        source: source_label.to_string(),
        file_name: file_name.to_string(),
        rows: entries,
    }
}

/// A statement after the import service has stored it and suggested classifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statement {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub rows: Vec<ImportedRow>,
}

/// One stored statement line with the service's suggestions. Read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedRow {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub date_raw: Option<String>,
    #[serde(default)]
    pub description_raw: Option<String>,
    /// Number or numeric string, depending on the backend
    #[serde(default)]
    pub amount_raw: Option<Value>,
    #[serde(default)]
    pub direction_suggested: Option<String>,
    /// Untrusted: must go through [`Category::coerce`] before use
    #[serde(default)]
    pub category_suggested: Option<String>,
    /// Number or numeric string; anything else reads as absent
    #[serde(default, deserialize_with = "lenient_number")]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub source: Option<String>,
}

impl ImportedRow {
    /// Amount for display; anything unreadable shows as 0.0.
    pub fn amount(&self) -> f64 {
        self.amount_raw.as_ref().and_then(number_from_value).unwrap_or(0.0)
    }

    pub fn suggested_direction(&self) -> Direction {
        Direction::from_suggestion(self.direction_suggested.as_deref())
    }

    pub fn suggested_category(&self) -> Category {
        Category::coerce(self.category_suggested.as_deref())
    }
}

/// The rows endpoint answers with either a bare list or `{rows: [...]}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RowsResponse {
    Wrapped { rows: Vec<ImportedRow> },
    Bare(Vec<ImportedRow>),
}

impl RowsResponse {
    pub fn into_rows(self) -> Vec<ImportedRow> {
        match self {
            RowsResponse::Wrapped { rows } | RowsResponse::Bare(rows) => rows,
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Int(n) => n.to_string(),
        Id::Float(f) => f.to_string(),
    })
}

fn number_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.replace(',', "").trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(number_from_value(&Value::deserialize(deserializer)?))
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<ImportedRow>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<ImportedRow>>::deserialize(deserializer)?.unwrap_or_default())
}
