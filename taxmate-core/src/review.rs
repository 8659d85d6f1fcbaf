//! Review/confirm engine.
//!
//! A [`ReviewSession`] holds at most one imported statement together with the
//! user's per-row decisions, and walks it through
//! `NoStatement -> Loaded -> Committing -> Committed | Failed`.
//! The session never talks to the network: `begin_commit` hands out the
//! confirm payload and `complete_commit` takes the service's answer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::service::ServiceError;
use crate::statement::{ImportedRow, Statement};
use crate::types::{Category, Direction};

/// The user's mutable verdict on one imported row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewDecision {
    pub imported_row_id: String,
    pub include: bool,
    pub final_type: Direction,
    pub final_category: Category,
    pub note: Option<String>,
}

impl ReviewDecision {
    /// Default decision: included, with the service's suggestion coerced into the vocabulary.
    pub fn from_suggestion(row: &ImportedRow) -> Self {
        Self {
            imported_row_id: row.id.clone(),
            include: true,
            final_type: row.suggested_direction(),
            final_category: row.suggested_category(),
            note: None,
        }
    }

    fn apply(&mut self, edit: &DecisionEdit) {
        if let Some(include) = edit.include {
            self.include = include;
        }
        if let Some(t) = edit.final_type {
            self.final_type = t;
        }
        if let Some(c) = edit.final_category {
            self.final_category = c;
        }
        if let Some(note) = &edit.note {
            self.note = note.as_ref().map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        }
    }
}

/// A partial change to a decision; `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecisionEdit {
    pub include: Option<bool>,
    pub final_type: Option<Direction>,
    pub final_category: Option<Category>,
    /// `Some(None)` clears the note
    pub note: Option<Option<String>>,
}

impl DecisionEdit {
    pub fn is_empty(&self) -> bool {
        self == &DecisionEdit::default()
    }
}

/// Body of `POST /me/hustles/{h}/statements/{s}/confirm`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmRequest {
    pub items: Vec<ConfirmItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmItem {
    pub imported_transaction_id: String,
    pub final_type: Direction,
    pub final_category: Category,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmResponse {
    #[serde(default)]
    pub created_count: u64,
}

/// A loaded statement and one decision per row, in row order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub statement: Statement,
    pub decisions: Vec<ReviewDecision>,
    pub loaded_at: DateTime<Utc>,
}

/// One line of the review table
#[derive(Debug, Clone, Copy)]
pub struct ReviewLine<'a> {
    pub row: &'a ImportedRow,
    pub decision: &'a ReviewDecision,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReviewSummary {
    pub rows: usize,
    pub selected: usize,
    pub income_total: f64,
    pub expense_total: f64,
}

impl Review {
    pub fn new(statement: Statement) -> Self {
        let decisions = statement.rows.iter().map(ReviewDecision::from_suggestion).collect();
        Self {
            statement,
            decisions,
            loaded_at: Utc::now(),
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = ReviewLine<'_>> {
        self.statement
            .rows
            .iter()
            .zip(&self.decisions)
            .map(|(row, decision)| ReviewLine { row, decision })
    }

    pub fn decision(&self, row_id: &str) -> Option<&ReviewDecision> {
        self.decisions.iter().find(|d| d.imported_row_id == row_id)
    }

    fn edit(&mut self, row_id: &str, edit: &DecisionEdit) -> Result<(), EditError> {
        let decision = self
            .decisions
            .iter_mut()
            .find(|d| d.imported_row_id == row_id)
            .ok_or_else(|| EditError::UnknownRow(row_id.to_string()))?;
        decision.apply(edit);
        Ok(())
    }

    /// Only included rows, reduced to what the confirm service needs.
    pub fn confirm_request(&self) -> ConfirmRequest {
        let items = self
            .decisions
            .iter()
            .filter(|d| d.include)
            .map(|d| ConfirmItem {
                imported_transaction_id: d.imported_row_id.clone(),
                final_type: d.final_type,
                final_category: d.final_category,
                note: d.note.clone(),
            })
            .collect();
        ConfirmRequest { items }
    }

    pub fn summary(&self) -> ReviewSummary {
        let mut s = ReviewSummary {
            rows: self.decisions.len(),
            ..ReviewSummary::default()
        };
        for line in self.lines().filter(|l| l.decision.include) {
            s.selected += 1;
            match line.decision.final_type {
                Direction::Income => s.income_total += line.row.amount(),
                Direction::Expense => s.expense_total += line.row.amount(),
            }
        }
        s
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("no imported row with id {0}")]
    UnknownRow(String),
    #[error("the session is not open for edits ({0})")]
    NotEditable(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommitRefused {
    #[error("No rows selected for import.")]
    NothingSelected,
    #[error("no statement is loaded")]
    NoStatement,
    #[error("a commit is already in progress")]
    AlreadyCommitting,
    #[error("this statement has already been committed")]
    AlreadyCommitted,
}

/// Per-user review session with an explicit lifecycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ReviewSession {
    #[default]
    NoStatement,
    Loaded {
        review: Review,
    },
    Committing {
        review: Review,
    },
    Committed {
        review: Review,
        created_count: u64,
    },
    Failed {
        review: Review,
        error: ServiceError,
    },
}

impl ReviewSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state_name(&self) -> &'static str {
        match self {
            ReviewSession::NoStatement => "no_statement",
            ReviewSession::Loaded { .. } => "loaded",
            ReviewSession::Committing { .. } => "committing",
            ReviewSession::Committed { .. } => "committed",
            ReviewSession::Failed { .. } => "failed",
        }
    }

    /// Load a freshly imported statement, replacing whatever was here.
    pub fn load(&mut self, statement: Statement) {
        *self = ReviewSession::Loaded {
            review: Review::new(statement),
        };
    }

    pub fn review(&self) -> Option<&Review> {
        match self {
            ReviewSession::NoStatement => None,
            ReviewSession::Loaded { review }
            | ReviewSession::Committing { review }
            | ReviewSession::Committed { review, .. }
            | ReviewSession::Failed { review, .. } => Some(review),
        }
    }

    /// The last confirm failure, if the session is sitting in `Failed`.
    pub fn last_error(&self) -> Option<&ServiceError> {
        match self {
            ReviewSession::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Edit one row's decision. A failed session goes back to `Loaded`.
    pub fn edit(&mut self, row_id: &str, edit: &DecisionEdit) -> Result<(), EditError> {
        match self {
            ReviewSession::Loaded { review } => review.edit(row_id, edit),
            ReviewSession::Failed { review, .. } => {
                review.edit(row_id, edit)?;
                let review = review.clone();
                *self = ReviewSession::Loaded { review };
                Ok(())
            }
            other => Err(EditError::NotEditable(other.state_name())),
        }
    }

    /// Start a commit and hand back the payload to send.
    ///
    /// Refused locally, with the session untouched, when no row is included.
    pub fn begin_commit(&mut self) -> Result<ConfirmRequest, CommitRefused> {
        let review = match std::mem::take(self) {
            ReviewSession::Loaded { review } | ReviewSession::Failed { review, .. } => review,
            ReviewSession::NoStatement => return Err(CommitRefused::NoStatement),
            state @ ReviewSession::Committing { .. } => {
                *self = state;
                return Err(CommitRefused::AlreadyCommitting);
            }
            state @ ReviewSession::Committed { .. } => {
                *self = state;
                return Err(CommitRefused::AlreadyCommitted);
            }
        };

        let request = review.confirm_request();
        if request.items.is_empty() {
            *self = ReviewSession::Loaded { review };
            return Err(CommitRefused::NothingSelected);
        }
        *self = ReviewSession::Committing { review };
        Ok(request)
    }

    /// Record the confirm service's answer for an in-flight commit.
    ///
    /// Returns the created count, or the error that left the session in `Failed`
    /// with every decision intact.
    pub fn complete_commit(
        &mut self,
        outcome: Result<ConfirmResponse, ServiceError>,
    ) -> Result<u64, ServiceError> {
        let review = match std::mem::take(self) {
            ReviewSession::Committing { review } => review,
            state => {
                let name = state.state_name();
                *self = state;
                return Err(ServiceError::new(format!("no commit in progress (session is {name})")));
            }
        };

        match outcome {
            Ok(resp) => {
                *self = ReviewSession::Committed {
                    review,
                    created_count: resp.created_count,
                };
                Ok(resp.created_count)
            }
            Err(error) => {
                *self = ReviewSession::Failed {
                    review,
                    error: error.clone(),
                };
                Err(error)
            }
        }
    }

    /// A session persisted mid-commit has an unknown outcome; reopen it for review.
    pub fn recover_interrupted(&mut self) -> bool {
        if let ReviewSession::Committing { review } = self {
            let review = review.clone();
            *self = ReviewSession::Loaded { review };
            return true;
        }
        false
    }

    /// End the session, dropping the statement and every decision.
    /// Returns whether there was anything to drop.
    pub fn discard(&mut self) -> bool {
        !matches!(std::mem::take(self), ReviewSession::NoStatement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn statement() -> Statement {
        serde_json::from_value(json!({
            "id": "st-1",
            "source": "CSV upload",
            "fileName": "jan.csv",
            "rows": [
                {"id": "r1", "dateRaw": "2024-01-05", "descriptionRaw": "POS deposit",
                 "amountRaw": 15000, "directionSuggested": "INCOME", "categorySuggested": "SALES",
                 "confidence": 0.9, "source": "rules"},
                {"id": "r2", "dateRaw": "2024-01-06", "descriptionRaw": "Fuel",
                 "amountRaw": "5000", "directionSuggested": "EXPENSE", "categorySuggested": "PETROL",
                 "confidence": 0.4, "source": "rules"},
                {"id": "r3", "dateRaw": "2024-01-07", "descriptionRaw": "Airtime",
                 "amountRaw": 1000}
            ]
        }))
        .unwrap()
    }

    fn loaded() -> ReviewSession {
        let mut s = ReviewSession::new();
        s.load(statement());
        s
    }

    #[test]
    fn test_load_defaults_one_decision_per_row() {
        let s = loaded();
        let review = s.review().unwrap();
        assert_eq!(s.state_name(), "loaded");
        assert_eq!(review.decisions.len(), 3);
        assert!(review.decisions.iter().all(|d| d.include));

        assert_eq!(review.decisions[0].final_type, Direction::Income);
        assert_eq!(review.decisions[0].final_category, Category::Sales);
        // unsupported suggestion falls back to the catch-all
        assert_eq!(review.decisions[1].final_type, Direction::Expense);
        assert_eq!(review.decisions[1].final_category, Category::Misc);
        // no suggestion at all
        assert_eq!(review.decisions[2].final_type, Direction::Income);
        assert_eq!(review.decisions[2].final_category, Category::Misc);
    }

    #[test]
    fn test_edits_are_independent_per_row() {
        let mut s = loaded();
        s.edit(
            "r2",
            &DecisionEdit {
                final_category: Some(Category::Fuel),
                note: Some(Some("  generator  ".to_string())),
                ..DecisionEdit::default()
            },
        )
        .unwrap();
        s.edit("r3", &DecisionEdit { include: Some(false), ..DecisionEdit::default() })
            .unwrap();
        s.edit("r3", &DecisionEdit { include: Some(true), ..DecisionEdit::default() })
            .unwrap();
        s.edit("r3", &DecisionEdit { final_type: Some(Direction::Expense), ..DecisionEdit::default() })
            .unwrap();

        let review = s.review().unwrap();
        assert_eq!(review.decision("r1").unwrap(), &ReviewDecision::from_suggestion(&review.statement.rows[0]));
        let r2 = review.decision("r2").unwrap();
        assert_eq!(r2.final_category, Category::Fuel);
        assert_eq!(r2.note.as_deref(), Some("generator"));
        let r3 = review.decision("r3").unwrap();
        assert!(r3.include);
        assert_eq!(r3.final_type, Direction::Expense);
    }

    #[test]
    fn test_edit_unknown_row() {
        let mut s = loaded();
        let err = s.edit("nope", &DecisionEdit::default()).unwrap_err();
        assert_eq!(err, EditError::UnknownRow("nope".to_string()));
    }

    #[test]
    fn test_clearing_note() {
        let mut s = loaded();
        s.edit("r1", &DecisionEdit { note: Some(Some("x".into())), ..Default::default() }).unwrap();
        s.edit("r1", &DecisionEdit { note: Some(None), ..Default::default() }).unwrap();
        assert_eq!(s.review().unwrap().decision("r1").unwrap().note, None);
    }

    #[test]
    fn test_commit_payload_contains_only_included_rows() {
        let mut s = loaded();
        s.edit(
            "r1",
            &DecisionEdit {
                final_type: Some(Direction::Expense),
                final_category: Some(Category::Fuel),
                ..Default::default()
            },
        )
        .unwrap();
        s.edit("r2", &DecisionEdit { include: Some(false), ..Default::default() }).unwrap();
        s.edit("r3", &DecisionEdit { include: Some(false), ..Default::default() }).unwrap();

        let req = s.begin_commit().unwrap();
        assert_eq!(s.state_name(), "committing");
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"items": [{
                "importedTransactionId": "r1",
                "finalType": "EXPENSE",
                "finalCategory": "FUEL",
                "note": null
            }]})
        );
    }

    #[test]
    fn test_commit_with_nothing_selected_is_refused_locally() {
        let mut s = loaded();
        for id in ["r1", "r2", "r3"] {
            s.edit(id, &DecisionEdit { include: Some(false), ..Default::default() }).unwrap();
        }
        let before = s.clone();
        assert_eq!(s.begin_commit().unwrap_err(), CommitRefused::NothingSelected);
        assert_eq!(s, before);
    }

    #[test]
    fn test_commit_refused_without_statement() {
        let mut s = ReviewSession::new();
        assert_eq!(s.begin_commit().unwrap_err(), CommitRefused::NoStatement);
        assert_eq!(s, ReviewSession::NoStatement);
    }

    #[test]
    fn test_discard_ends_session() {
        let mut s = loaded();
        s.edit("r1", &DecisionEdit { note: Some(Some("keep".into())), ..Default::default() })
            .unwrap();
        assert!(s.discard());
        assert_eq!(s, ReviewSession::NoStatement);
        assert!(s.review().is_none());
        assert!(!s.discard());
        assert_eq!(s.begin_commit().unwrap_err(), CommitRefused::NoStatement);

        let mut failed = loaded();
        failed.begin_commit().unwrap();
        failed.complete_commit(Err(ServiceError::new("down"))).unwrap_err();
        assert!(failed.discard());
        assert!(failed.last_error().is_none());
    }

    #[test]
    fn test_successful_commit() {
        let mut s = loaded();
        s.begin_commit().unwrap();
        let created = s.complete_commit(Ok(ConfirmResponse { created_count: 3 })).unwrap();
        assert_eq!(created, 3);
        assert!(matches!(s, ReviewSession::Committed { created_count: 3, .. }));

        assert_eq!(s.begin_commit().unwrap_err(), CommitRefused::AlreadyCommitted);
        assert!(matches!(
            s.edit("r1", &DecisionEdit::default()),
            Err(EditError::NotEditable("committed"))
        ));
    }

    #[test]
    fn test_failed_commit_keeps_decisions_for_retry() {
        let mut s = loaded();
        s.edit("r2", &DecisionEdit { final_category: Some(Category::Fuel), ..Default::default() })
            .unwrap();
        let decisions = s.review().unwrap().decisions.clone();

        s.begin_commit().unwrap();
        assert_eq!(s.begin_commit().unwrap_err(), CommitRefused::AlreadyCommitting);
        let err = s
            .complete_commit(Err(ServiceError::new("Statement already confirmed")))
            .unwrap_err();
        assert_eq!(err.error, "Statement already confirmed");
        assert_eq!(s.state_name(), "failed");
        assert_eq!(s.last_error().unwrap().error, "Statement already confirmed");
        assert_eq!(s.review().unwrap().decisions, decisions);

        // retry straight away
        let req = s.begin_commit().unwrap();
        assert_eq!(req.items.len(), 3);
        s.complete_commit(Ok(ConfirmResponse { created_count: 3 })).unwrap();
        assert_eq!(s.state_name(), "committed");
    }

    #[test]
    fn test_editing_failed_session_returns_to_loaded() {
        let mut s = loaded();
        s.begin_commit().unwrap();
        let _ = s.complete_commit(Err(ServiceError::new("timeout")));
        s.edit("r1", &DecisionEdit { include: Some(false), ..Default::default() }).unwrap();
        assert_eq!(s.state_name(), "loaded");
        assert!(!s.review().unwrap().decision("r1").unwrap().include);
    }

    #[test]
    fn test_complete_without_commit_in_flight() {
        let mut s = loaded();
        let err = s.complete_commit(Ok(ConfirmResponse::default())).unwrap_err();
        assert!(err.error.contains("no commit in progress"));
        assert_eq!(s.state_name(), "loaded");
    }

    #[test]
    fn test_load_replaces_previous_session() {
        let mut s = loaded();
        s.begin_commit().unwrap();
        s.complete_commit(Ok(ConfirmResponse { created_count: 3 })).unwrap();

        let mut next = statement();
        next.id = "st-2".to_string();
        next.rows.truncate(1);
        s.load(next);
        assert_eq!(s.state_name(), "loaded");
        assert_eq!(s.review().unwrap().statement.id, "st-2");
        assert_eq!(s.review().unwrap().decisions.len(), 1);
    }

    #[test]
    fn test_summary_totals_selected_rows() {
        let mut s = loaded();
        s.edit("r2", &DecisionEdit { include: Some(false), ..Default::default() }).unwrap();
        let summary = s.review().unwrap().summary();
        assert_eq!(summary.rows, 3);
        assert_eq!(summary.selected, 2);
        assert_eq!(summary.income_total, 16000.0);
        assert_eq!(summary.expense_total, 0.0);
    }

    #[test]
    fn test_session_round_trips_through_json() {
        let mut s = loaded();
        s.begin_commit().unwrap();
        let _ = s.complete_commit(Err(ServiceError::new("boom")));
        let text = serde_json::to_string(&s).unwrap();
        let back: ReviewSession = serde_json::from_str(&text).unwrap();
        assert_eq!(back, s);
        assert!(text.contains("\"state\":\"failed\""));
    }

    #[test]
    fn test_recover_interrupted_commit() {
        let mut s = loaded();
        s.begin_commit().unwrap();
        assert!(s.recover_interrupted());
        assert_eq!(s.state_name(), "loaded");
        assert!(!s.recover_interrupted());
    }
}
