//! Error types for the workspace core.
//!
//! Only genuinely exceptional conditions are represented here. Malformed filter input is not an
//! error at all (the predicate is skipped), and the session controller turns the recoverable
//! variants into user-visible notices instead of propagating them.

use cohort_types::TextError;

#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("workspace not found: {0}")]
    NotFound(String),
    #[error("row not found: {0}")]
    RowNotFound(String),
    #[error("failed to read from store: {0}")]
    StoreRead(std::io::Error),
    #[error("failed to write to store: {0}")]
    StoreWrite(std::io::Error),
    #[error("failed to serialize workspaces: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize workspaces: {0}")]
    Deserialization(serde_json::Error),
    #[error("ingestion failed: {0}")]
    Ingestion(#[from] IngestionError),
    #[error("failed to write export: {0}")]
    Export(std::io::Error),
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        state: &'static str,
        action: &'static str,
    },
    #[error("invalid text: {0}")]
    Text(#[from] TextError),
}

pub type WorkspaceResult<T> = std::result::Result<T, WorkspaceError>;

/// Failure reported by an ingestion collaborator.
#[derive(Debug, thiserror::Error)]
pub enum IngestionError {
    #[error("data source rejected the request: {0}")]
    Rejected(String),
    #[error("data source I/O error: {0}")]
    Io(#[from] std::io::Error),
}
