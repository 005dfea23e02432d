//! The export collaborator.
//!
//! The session hands the filtered view, unmodified, to an [`Exporter`] under a name built by
//! [`export_file_name`]. Formats other than JSON are left to other implementations.

use crate::constants::DEFAULT_EXPORT_STEM;
use crate::row::DataRow;
use crate::{WorkspaceError, WorkspaceResult};
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

pub trait Exporter {
    /// File extension this exporter writes, without the dot.
    fn extension(&self) -> &str;

    /// Writes `rows` under `file_name` and returns where they went.
    fn export(&self, file_name: &str, rows: &[DataRow]) -> WorkspaceResult<PathBuf>;
}

/// Builds `<workspace-name-or-"data">-<YYYY-MM-DD>.<ext>`.
///
/// Path separators in the workspace name are replaced with `_`.
pub fn export_file_name(workspace_name: Option<&str>, date: NaiveDate, ext: &str) -> String {
    let stem = workspace_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| name.replace(['/', '\\'], "_"))
        .unwrap_or_else(|| DEFAULT_EXPORT_STEM.to_string());

    format!("{}-{}.{}", stem, date.format("%Y-%m-%d"), ext)
}

/// Writes rows as a pretty-printed JSON array into a directory.
#[derive(Clone, Debug)]
pub struct JsonExporter {
    dir: PathBuf,
}

impl JsonExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl Exporter for JsonExporter {
    fn extension(&self) -> &str {
        "json"
    }

    fn export(&self, file_name: &str, rows: &[DataRow]) -> WorkspaceResult<PathBuf> {
        let json = serde_json::to_string_pretty(rows).map_err(WorkspaceError::Serialization)?;
        fs::create_dir_all(&self.dir).map_err(WorkspaceError::Export)?;

        let path = self.dir.join(file_name);
        fs::write(&path, json).map_err(WorkspaceError::Export)?;

        tracing::info!("exported {} rows to {}", rows.len(), path.display());
        Ok(path)
    }
}
