//! Identifier utilities for research workspaces.
//!
//! Workspaces are keyed by a *time-prefixed* identifier so that ids sort in creation order and
//! never collide within a process, even when two workspaces are created in the same millisecond.
//!
//! ## Canonical UUID form
//! - Length: 32
//! - Characters: `0-9` and `a-f` only
//! - Example: `550e8400e29b41d4a716446655440000`
//!
//! This is the same value you would get from `Uuid::new_v4().simple().to_string()`.
//! Non-canonical values (uppercase, hyphenated, wrong length, non-hex) are rejected by
//! [`CanonicalUuid::parse`].
//!
//! ## Timestamp identifiers
//! Format: `YYYYMMDDTHHMMSS.mmmZ-<canonical_uuid>`
//!
//! A [`TimestampIdGenerator`] remembers the last id it issued and bumps the timestamp by one
//! millisecond when the clock has not advanced, so ids from one generator are strictly
//! increasing.

mod service;

pub use service::{CanonicalUuid, TimestampId, TimestampIdGenerator};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;
