//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into the session. The core never reads process-wide environment variables itself; the
//! binary reads them and hands the raw values to the parsing helpers here.

use crate::constants::{DEFAULT_DATA_DIR, DEFAULT_INITIAL_ROW_COUNT, EXPORTS_DIR_NAME};
use crate::{WorkspaceError, WorkspaceResult};
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    export_dir: PathBuf,
    initial_row_count: usize,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `WorkspaceError::InvalidInput` if `initial_row_count` is zero or either directory
    /// path is empty.
    pub fn new(
        data_dir: PathBuf,
        export_dir: PathBuf,
        initial_row_count: usize,
    ) -> WorkspaceResult<Self> {
        if data_dir.as_os_str().is_empty() {
            return Err(WorkspaceError::InvalidInput(
                "data_dir cannot be empty".into(),
            ));
        }
        if export_dir.as_os_str().is_empty() {
            return Err(WorkspaceError::InvalidInput(
                "export_dir cannot be empty".into(),
            ));
        }
        if initial_row_count == 0 {
            return Err(WorkspaceError::InvalidInput(
                "initial_row_count must be at least 1".into(),
            ));
        }

        Ok(Self {
            data_dir,
            export_dir,
            initial_row_count,
        })
    }

    /// Configuration rooted at `data_dir` with every other value defaulted.
    pub fn with_data_dir(data_dir: PathBuf) -> WorkspaceResult<Self> {
        let export_dir = data_dir.join(EXPORTS_DIR_NAME);
        Self::new(data_dir, export_dir, DEFAULT_INITIAL_ROW_COUNT)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    pub fn initial_row_count(&self) -> usize {
        self.initial_row_count
    }
}

/// Trim an optional raw value, treating blank as absent.
fn non_blank_value(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Resolve the data directory from an optional raw value.
///
/// If `value` is `None` or blank, returns [`DEFAULT_DATA_DIR`].
pub fn data_dir_from_env_value(value: Option<String>) -> PathBuf {
    non_blank_value(value)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

/// Resolve the export directory from an optional raw value.
///
/// If `value` is `None` or blank, exports go to `<data_dir>/exports`.
pub fn export_dir_from_env_value(value: Option<String>, data_dir: &Path) -> PathBuf {
    non_blank_value(value)
        .map(PathBuf::from)
        .unwrap_or_else(|| data_dir.join(EXPORTS_DIR_NAME))
}

/// Parse the initial ingestion row count from an optional raw value.
///
/// If `value` is `None` or blank, returns [`DEFAULT_INITIAL_ROW_COUNT`].
///
/// # Errors
///
/// Returns `WorkspaceError::InvalidInput` if the value is not a positive integer.
pub fn initial_row_count_from_env_value(value: Option<String>) -> WorkspaceResult<usize> {
    let Some(raw) = non_blank_value(value) else {
        return Ok(DEFAULT_INITIAL_ROW_COUNT);
    };

    match raw.parse::<usize>() {
        Ok(count) if count > 0 => Ok(count),
        _ => Err(WorkspaceError::InvalidInput(format!(
            "initial row count must be a positive integer, got '{}'",
            raw
        ))),
    }
}
