//! # Cohort Core
//!
//! Core logic for building research cohorts from patient-encounter records.
//!
//! - **Record Store** ([`records`]): the session's editable rows
//! - **Filter Engine** ([`filter`]): pure, order-preserving filtering by a [`FilterSpec`]
//! - **Statistics Aggregator** ([`statistics`]): summaries of the filtered view
//! - **Workspace Repository** ([`repositories::workspaces`]): saved workspaces, persisted through
//!   a [`KeyValueStore`]
//! - **Session Controller** ([`session`]): the state machine tying the above together
//!
//! **No presentation concerns**: rendering, prompts and argument parsing belong in `cohort-cli`.

pub mod config;
pub mod constants;
pub mod error;
pub mod export;
pub mod filter;
pub mod format;
pub mod ingestion;
pub mod records;
pub mod repositories;
pub mod row;
pub mod session;
pub mod statistics;
pub mod storage;
pub mod validation;
pub mod workspace;

pub use config::CoreConfig;
pub use error::{IngestionError, WorkspaceError, WorkspaceResult};
pub use export::{export_file_name, Exporter, JsonExporter};
pub use filter::{CodeType, FilterField, FilterSpec};
pub use ingestion::{IngestionMode, IngestionRequest, IngestionTicket, MockRowSource, RowSource};
pub use records::RecordStore;
pub use repositories::workspaces::WorkspaceRepository;
pub use row::{Bmi, DataRow, RowPatch};
pub use session::{Notice, NoticeKind, Session, SessionObserver, SessionState, SessionView};
pub use statistics::{summarize, AgeStats, StatisticsSummary};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use workspace::{FormField, Workspace, WorkspaceForm};

pub use cohort_types::NonEmptyText;
pub use cohort_uuid::TimestampId;
