//! Constants used throughout the cohort core crate.
//!
//! Storage keys, defaults and user-visible literals live here so that the repository, filter
//! engine and session controller agree on them.

/// Key under which the whole workspace collection is persisted.
pub const WORKSPACES_STORE_KEY: &str = "research_workspaces";

/// Key that receives an unreadable workspace collection before it is replaced.
pub const WORKSPACES_BACKUP_KEY: &str = "research_workspaces-unreadable";

/// Name given to a workspace submitted without one.
pub const DEFAULT_WORKSPACE_NAME: &str = "Untitled Workspace";

/// Gender filter value meaning "no gender constraint".
pub const ALL_GENDERS: &str = "All";

/// Rows requested from ingestion when a workspace becomes active.
pub const DEFAULT_INITIAL_ROW_COUNT: usize = 50;

/// Default directory for the file-backed store when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "cohort_data";

/// Sub-directory of the data directory used for exports by default.
pub const EXPORTS_DIR_NAME: &str = "exports";

/// File stem used for exports when no workspace is active.
pub const DEFAULT_EXPORT_STEM: &str = "data";

/// Prefix of generated row identifiers (`P001`, `P002`, ...).
pub const ROW_ID_PREFIX: &str = "P";

/// Prefix of generated medical record numbers (`MRN001`, ...).
pub const MRN_PREFIX: &str = "MRN";
