//! taxmate-core: canonical statement types, the import payload builder and the review/confirm engine

pub mod review;
pub mod service;
pub mod statement;
pub mod types;

pub use review::{
    CommitRefused, ConfirmItem, ConfirmRequest, ConfirmResponse, DecisionEdit, EditError, Review,
    ReviewDecision, ReviewLine, ReviewSession, ReviewSummary,
};
pub use service::ServiceError;
pub use statement::{build_import_payload, ImportRequest, ImportedRow, RowsResponse, Statement};
pub use types::{Category, Direction, NormalizedEntry};
