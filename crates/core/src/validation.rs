//! Input validation utilities.
//!
//! This module contains functions for validating user inputs to ensure they meet
//! safety and correctness requirements before being used in operations.

use crate::{WorkspaceError, WorkspaceResult};

/// Validates that a store key is safe to use as a file name.
///
/// The file-backed store maps each key to `<data_dir>/<key>.json`, so keys must not be able to
/// escape the data directory:
/// - Rejects empty or whitespace-only strings
/// - Bounds the length to avoid pathological inputs
/// - Restricts characters to ASCII alphanumerics, `-` and `_`
///
/// # Errors
///
/// Returns a `WorkspaceError::InvalidInput` if the key is invalid.
pub fn validate_store_key(key: &str) -> WorkspaceResult<()> {
    const MAX_KEY_LEN: usize = 128;

    if key.trim().is_empty() {
        return Err(WorkspaceError::InvalidInput("store key cannot be empty".into()));
    }

    if key.len() > MAX_KEY_LEN {
        return Err(WorkspaceError::InvalidInput(format!(
            "store key exceeds maximum length of {} characters",
            MAX_KEY_LEN
        )));
    }

    let ok = key
        .bytes()
        .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'-' | b'_'));

    if !ok {
        return Err(WorkspaceError::InvalidInput(
            "store key contains invalid characters (only alphanumeric, '-', '_' allowed)".into(),
        ));
    }

    Ok(())
}
