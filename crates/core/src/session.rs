//! The Session Controller.
//!
//! A [`Session`] owns the Record Store and the Workspace Repository and moves between three
//! states:
//!
//! ```text
//! Inactive --begin_create--> Configuring --submit_form--> Active
//!    ^                           |                          |  \
//!    +-----------back------------+                          |   select_workspace (reload)
//!    +-----------back / delete active workspace-------------+
//! ```
//!
//! Every intent runs to completion synchronously. After any change to the active filter or the
//! Record Store the filtered view and statistics are recomputed and observers are notified.
//!
//! Recoverable failures (unknown ids, ingestion failures, persistence failures, intents that do
//! not apply in the current state) never surface as errors: they become [`Notice`]s that the
//! presentation layer drains with [`Session::take_notices`].
//!
//! ## Ingestion
//!
//! At most one ingestion request is outstanding. Entering `Active` issues a replace request that
//! supersedes any earlier one. [`Session::connect_source`] issues an append request and is
//! ignored while another request is pending. Leaving `Active` cancels the pending request, so a
//! late completion cannot repopulate the store.

use crate::config::CoreConfig;
use crate::error::IngestionError;
use crate::export::{export_file_name, Exporter};
use crate::filter::{self, FilterField};
use crate::ingestion::{IngestionMode, IngestionRequest, IngestionTicket, RowSource};
use crate::records::RecordStore;
use crate::repositories::workspaces::WorkspaceRepository;
use crate::row::{DataRow, RowPatch};
use crate::statistics::{summarize, StatisticsSummary};
use crate::storage::KeyValueStore;
use crate::workspace::{FormField, Workspace, WorkspaceForm};
use crate::WorkspaceError;
use chrono::NaiveDate;
use cohort_types::NonEmptyText;
use cohort_uuid::TimestampId;
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

/// Where the session is in its lifecycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// No active workspace; the Record Store is empty.
    Inactive,
    /// A creation form is being filled in.
    Configuring(WorkspaceForm),
    /// A workspace is current. Holds the working copy, which may have unsaved edits.
    Active(Workspace),
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Inactive => "inactive",
            SessionState::Configuring(_) => "configuring",
            SessionState::Active(_) => "active",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeKind {
    NotFound,
    IngestionFailed,
    IngestionIgnored,
    PersistenceFailed,
    ExportFailed,
    InvalidInput,
    InvalidAction,
}

/// A non-fatal, user-visible message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Read-only derived state handed to observers.
#[derive(Clone, Copy, Debug)]
pub struct SessionView<'a> {
    pub workspace: Option<&'a Workspace>,
    pub rows: &'a [DataRow],
    pub summary: Option<&'a StatisticsSummary>,
}

/// Presentation-layer hook, called after every recomputation of the view.
pub trait SessionObserver {
    fn view_changed(&self, view: &SessionView<'_>);
}

pub struct Session<S> {
    repository: WorkspaceRepository<S>,
    initial_row_count: usize,
    state: SessionState,
    records: RecordStore,
    filtered: Vec<DataRow>,
    summary: Option<StatisticsSummary>,
    selection: BTreeSet<String>,
    pending: Option<IngestionRequest>,
    generation: u64,
    notices: Vec<Notice>,
    observers: Vec<Box<dyn SessionObserver>>,
}

impl<S: KeyValueStore> Session<S> {
    pub fn new(repository: WorkspaceRepository<S>, cfg: &CoreConfig) -> Self {
        Self {
            repository,
            initial_row_count: cfg.initial_row_count(),
            state: SessionState::Inactive,
            records: RecordStore::new(),
            filtered: Vec::new(),
            summary: None,
            selection: BTreeSet::new(),
            pending: None,
            generation: 0,
            notices: Vec::new(),
            observers: Vec::new(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn active_workspace(&self) -> Option<&Workspace> {
        match &self.state {
            SessionState::Active(workspace) => Some(workspace),
            _ => None,
        }
    }

    pub fn list_workspaces(&self) -> &[Workspace] {
        self.repository.list()
    }

    /// All rows in the Record Store, unfiltered.
    pub fn records(&self) -> &[DataRow] {
        self.records.rows()
    }

    /// Rows matching the active workspace's filter.
    pub fn filtered_rows(&self) -> &[DataRow] {
        &self.filtered
    }

    /// Statistics over the filtered view; `None` when it is empty.
    pub fn summary(&self) -> Option<&StatisticsSummary> {
        self.summary.as_ref()
    }

    pub fn selection(&self) -> &BTreeSet<String> {
        &self.selection
    }

    pub fn pending_ingestion(&self) -> Option<IngestionRequest> {
        self.pending
    }

    pub fn view(&self) -> SessionView<'_> {
        SessionView {
            workspace: self.active_workspace(),
            rows: &self.filtered,
            summary: self.summary.as_ref(),
        }
    }

    /// Drains the notices raised since the last call.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn subscribe(&mut self, observer: Box<dyn SessionObserver>) {
        observer.view_changed(&self.view());
        self.observers.push(observer);
    }

    /// `Inactive -> Configuring` with an empty form.
    pub fn begin_create(&mut self) {
        match self.state {
            SessionState::Inactive => {
                tracing::debug!("session: inactive -> configuring");
                self.state = SessionState::Configuring(WorkspaceForm::default());
            }
            SessionState::Configuring(_) => {}
            SessionState::Active(_) => self.reject("create a workspace"),
        }
    }

    pub fn set_form_field(&mut self, field: FormField, value: impl Into<String>) {
        match &mut self.state {
            SessionState::Configuring(form) => form.set(field, value),
            _ => self.reject("edit the creation form"),
        }
    }

    /// `Configuring -> Active`: saves the form as a new workspace and activates it.
    ///
    /// Returns the ingestion request that will populate the Record Store. On failure the session
    /// stays in `Configuring` with the form intact.
    pub fn submit_form(&mut self) -> Option<IngestionRequest> {
        let SessionState::Configuring(form) = &self.state else {
            self.reject("submit the creation form");
            return None;
        };

        let filters = form.filters();
        let name = match form.name() {
            Ok(name) => name,
            Err(e) => {
                self.notice(NoticeKind::InvalidInput, WorkspaceError::from(e));
                return None;
            }
        };

        match self.repository.create(name, filters) {
            Ok(workspace) => Some(self.activate(workspace)),
            Err(e) => {
                self.notice(NoticeKind::PersistenceFailed, e);
                None
            }
        }
    }

    /// Makes a saved workspace current, discarding the rows of any previously active one.
    pub fn select_workspace(&mut self, id: &TimestampId) -> Option<IngestionRequest> {
        match self.repository.load(id) {
            Ok(workspace) => Some(self.activate(workspace)),
            Err(e) => {
                self.notice(NoticeKind::NotFound, e);
                None
            }
        }
    }

    /// Leaves the current state for `Inactive`.
    pub fn back(&mut self) {
        match self.state {
            SessionState::Inactive => {}
            SessionState::Configuring(_) => {
                tracing::debug!("session: configuring -> inactive");
                self.state = SessionState::Inactive;
            }
            SessionState::Active(_) => self.deactivate(),
        }
    }

    /// Deletes a saved workspace. Deleting the active one deactivates the session.
    pub fn delete_workspace(&mut self, id: &TimestampId) -> bool {
        if let Err(e) = self.repository.delete(id) {
            let kind = match e {
                WorkspaceError::NotFound(_) => NoticeKind::NotFound,
                _ => NoticeKind::PersistenceFailed,
            };
            self.notice(kind, e);
            return false;
        }

        if self.active_workspace().is_some_and(|ws| ws.id == *id) {
            self.deactivate();
        }
        true
    }

    /// Edits one filter field of the active workspace. Not persisted until saved.
    pub fn set_filter_field(&mut self, field: FilterField, value: &str) {
        let SessionState::Active(workspace) = &mut self.state else {
            self.reject("edit filters");
            return;
        };
        workspace.filters.set(field, value);
        self.refresh();
    }

    /// Renames the active workspace. Not persisted until saved.
    pub fn rename_workspace(&mut self, name: &str) {
        let name = match NonEmptyText::new(name) {
            Ok(name) => name,
            Err(e) => {
                self.notice(NoticeKind::InvalidInput, WorkspaceError::from(e));
                return;
            }
        };
        let SessionState::Active(workspace) = &mut self.state else {
            self.reject("rename a workspace");
            return;
        };
        workspace.name = name;
        self.refresh();
    }

    /// Persists the active workspace's current name and filters.
    pub fn save_workspace(&mut self) -> bool {
        let Some(workspace) = self.active_workspace().cloned() else {
            self.reject("save a workspace");
            return false;
        };

        match self.repository.update(workspace) {
            Ok(()) => true,
            Err(e) => {
                let kind = match e {
                    WorkspaceError::NotFound(_) => NoticeKind::NotFound,
                    _ => NoticeKind::PersistenceFailed,
                };
                self.notice(kind, e);
                false
            }
        }
    }

    /// Appends a blank row dated `today`. Returns its id.
    pub fn add_row(&mut self, today: NaiveDate) -> Option<String> {
        if self.active_workspace().is_none() {
            self.reject("add a row");
            return None;
        }
        let id = self.records.add_row(today).id.clone();
        tracing::debug!("added row {id}");
        self.refresh();
        Some(id)
    }

    /// Removes every row whose id is listed and clears the selection.
    pub fn delete_rows<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) -> usize {
        if self.active_workspace().is_none() {
            self.reject("delete rows");
            return 0;
        }
        let removed = self.records.delete(ids);
        self.selection.clear();
        tracing::debug!("deleted {removed} rows");
        self.refresh();
        removed
    }

    /// Replaces the selection. Ids not in the Record Store are dropped.
    pub fn select_rows<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) {
        self.selection = ids
            .into_iter()
            .filter(|id| self.records.contains(id))
            .map(str::to_string)
            .collect();
    }

    pub fn delete_selected_rows(&mut self) -> usize {
        let selection = std::mem::take(&mut self.selection);
        self.delete_rows(selection.iter().map(String::as_str))
    }

    /// Applies an inline edit to one row.
    pub fn edit_row(&mut self, id: &str, patch: RowPatch) -> bool {
        if self.active_workspace().is_none() {
            self.reject("edit rows");
            return false;
        }
        match self.records.update(id, patch) {
            Ok(()) => {
                self.refresh();
                true
            }
            Err(e) => {
                self.notice(NoticeKind::NotFound, e);
                false
            }
        }
    }

    /// Requests `count` more rows to append to the Record Store.
    pub fn connect_source(&mut self, count: usize) -> Option<IngestionRequest> {
        if self.active_workspace().is_none() {
            self.reject("connect a data source");
            return None;
        }
        if self.pending.is_some() {
            self.notice(
                NoticeKind::IngestionIgnored,
                "a data request is already in progress",
            );
            return None;
        }
        Some(self.start_ingestion(IngestionMode::Append, count))
    }

    /// Applies the outcome of an ingestion request.
    ///
    /// Returns `false` if the completion was stale (superseded or cancelled) and dropped. A
    /// failure leaves the Record Store untouched and raises a notice.
    pub fn complete_ingestion(
        &mut self,
        ticket: IngestionTicket,
        result: Result<Vec<DataRow>, IngestionError>,
    ) -> bool {
        let request = match self.pending {
            Some(request) if request.ticket == ticket => request,
            _ => {
                tracing::debug!("discarding stale ingestion completion {:?}", ticket);
                return false;
            }
        };
        self.pending = None;

        match result {
            Ok(rows) => {
                tracing::debug!("ingested {} rows ({:?})", rows.len(), request.mode);
                match request.mode {
                    IngestionMode::Replace => self.records.replace(rows),
                    IngestionMode::Append => self.records.append_all(rows),
                }
                self.selection.retain(|id| self.records.contains(id));
                self.refresh();
            }
            Err(e) => self.notice(NoticeKind::IngestionFailed, WorkspaceError::from(e)),
        }
        true
    }

    /// Fulfils `request` from `source` and applies the result.
    pub async fn ingest(&mut self, source: &dyn RowSource, request: IngestionRequest) -> bool {
        let result = source.request_rows(request.count).await;
        self.complete_ingestion(request.ticket, result)
    }

    /// Hands the filtered view to `exporter`. Returns the written path.
    pub fn export(&mut self, exporter: &dyn Exporter, today: NaiveDate) -> Option<PathBuf> {
        let name = self.active_workspace().map(|ws| ws.name.as_str());
        let file_name = export_file_name(name, today, exporter.extension());

        match exporter.export(&file_name, &self.filtered) {
            Ok(path) => Some(path),
            Err(e) => {
                self.notice(NoticeKind::ExportFailed, e);
                None
            }
        }
    }

    fn activate(&mut self, workspace: Workspace) -> IngestionRequest {
        tracing::debug!(
            "session: {} -> active ({})",
            self.state.name(),
            workspace.id
        );
        self.state = SessionState::Active(workspace);
        self.records.clear();
        self.selection.clear();
        let request = self.start_ingestion(IngestionMode::Replace, self.initial_row_count);
        self.refresh();
        request
    }

    fn deactivate(&mut self) {
        tracing::debug!("session: active -> inactive");
        self.state = SessionState::Inactive;
        self.records.clear();
        self.selection.clear();
        self.pending = None;
        self.refresh();
    }

    fn start_ingestion(&mut self, mode: IngestionMode, count: usize) -> IngestionRequest {
        self.generation += 1;
        let request = IngestionRequest {
            ticket: IngestionTicket::new(self.generation),
            count,
            mode,
        };
        if let Some(superseded) = self.pending.replace(request) {
            tracing::debug!("ingestion {:?} superseded", superseded.ticket);
        }
        request
    }

    fn refresh(&mut self) {
        let spec = self.active_workspace().map(|ws| &ws.filters);
        self.filtered = filter::apply(self.records.rows(), spec);
        self.summary = summarize(&self.filtered);

        let view = self.view();
        for observer in &self.observers {
            observer.view_changed(&view);
        }
    }

    fn reject(&mut self, action: &'static str) {
        let e = WorkspaceError::InvalidTransition {
            state: self.state.name(),
            action,
        };
        self.notice(NoticeKind::InvalidAction, e);
    }

    fn notice(&mut self, kind: NoticeKind, message: impl fmt::Display) {
        let message = message.to_string();
        tracing::warn!("{message}");
        self.notices.push(Notice { kind, message });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::JsonExporter;
    use crate::ingestion::MockRowSource;
    use crate::row::tests::sample_row;
    use crate::storage::MemoryStore;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tempfile::TempDir;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 17).expect("valid date")
    }

    fn session() -> Session<MemoryStore> {
        let cfg = CoreConfig::with_data_dir(PathBuf::from("unused")).expect("valid config");
        Session::new(WorkspaceRepository::open(MemoryStore::new()), &cfg)
    }

    /// Creates and activates a workspace, then fulfils its ingestion with `rows`.
    fn active_session(rows: Vec<DataRow>) -> Session<MemoryStore> {
        let mut session = session();
        session.begin_create();
        session.set_form_field(FormField::WorkspaceName, "Test cohort");
        let request = session.submit_form().expect("submit should activate");
        assert!(session.complete_ingestion(request.ticket, Ok(rows)));
        session
    }

    fn five_rows() -> Vec<DataRow> {
        ["P001", "P002", "P003", "P004", "P005"]
            .into_iter()
            .map(sample_row)
            .collect()
    }

    #[test]
    fn test_create_flow_reaches_active() {
        let mut session = session();
        assert_eq!(session.state(), &SessionState::Inactive);

        session.begin_create();
        assert_eq!(session.state().name(), "configuring");
        assert!(session.records().is_empty());

        session.set_form_field(FormField::WorkspaceName, "Asthma cohort");
        session.set_form_field(FormField::NamedCondition, "asthma");
        let request = session.submit_form().expect("should activate");

        assert_eq!(request.count, 50);
        assert_eq!(request.mode, IngestionMode::Replace);
        let active = session.active_workspace().expect("active");
        assert_eq!(active.name.as_str(), "Asthma cohort");
        assert_eq!(active.filters.condition.as_deref(), Some("asthma"));
        assert_eq!(session.list_workspaces().len(), 1);
        assert!(session.take_notices().is_empty());
    }

    #[test]
    fn test_blank_form_creates_untitled_workspace() {
        let mut session = session();
        session.begin_create();
        session.submit_form().expect("should activate");
        assert_eq!(
            session.active_workspace().expect("active").name.as_str(),
            "Untitled Workspace"
        );
    }

    #[test]
    fn test_back_from_configuring_discards_form() {
        let mut session = session();
        session.begin_create();
        session.set_form_field(FormField::WorkspaceName, "Draft");
        session.back();

        assert_eq!(session.state(), &SessionState::Inactive);
        assert!(session.list_workspaces().is_empty());
    }

    #[test]
    fn test_back_from_active_empties_view() {
        let mut session = active_session(five_rows());
        assert_eq!(session.filtered_rows().len(), 5);

        session.back();
        assert_eq!(session.state(), &SessionState::Inactive);
        assert!(session.records().is_empty());
        assert!(session.filtered_rows().is_empty());
        assert!(session.summary().is_none());
        assert_eq!(session.list_workspaces().len(), 1, "workspace stays saved");
    }

    #[test]
    fn test_add_then_delete_row_restores_view() {
        let mut session = active_session(five_rows());
        let before = session.filtered_rows().to_vec();

        let id = session.add_row(today()).expect("row added");
        assert_eq!(session.records().len(), 6);
        assert!(before.iter().all(|row| row.id != id));

        session.select_rows(["P001"]);
        assert_eq!(session.delete_rows([id.as_str()]), 1);
        assert_eq!(session.filtered_rows(), before.as_slice());
        assert!(session.selection().is_empty(), "delete clears selection");
    }

    #[test]
    fn test_deleting_active_workspace_deactivates() {
        let mut session = active_session(five_rows());
        let id = session.active_workspace().expect("active").id.clone();
        assert!(session.summary().is_some());

        assert!(session.delete_workspace(&id));

        assert_eq!(session.state(), &SessionState::Inactive);
        assert!(session.filtered_rows().is_empty());
        assert!(session.summary().is_none());
        assert!(session.list_workspaces().is_empty());
    }

    #[test]
    fn test_deleting_other_workspace_keeps_active() {
        let mut session = active_session(five_rows());
        session.back();
        session.begin_create();
        session.set_form_field(FormField::WorkspaceName, "Second");
        let request = session.submit_form().expect("activate second");
        session.complete_ingestion(request.ticket, Ok(five_rows()));

        let first = session.list_workspaces()[0].id.clone();
        assert!(session.delete_workspace(&first));
        assert_eq!(
            session.active_workspace().expect("still active").name.as_str(),
            "Second"
        );
        assert_eq!(session.filtered_rows().len(), 5);
    }

    #[test]
    fn test_unknown_workspace_ids_raise_notices() {
        let mut session = session();
        let ghost: TimestampId = "20240101T000000.000Z-0123456789abcdef0123456789abcdef"
            .parse()
            .expect("valid id");

        assert!(session.select_workspace(&ghost).is_none());
        assert!(!session.delete_workspace(&ghost));
        assert_eq!(session.state(), &SessionState::Inactive);

        let notices = session.take_notices();
        assert_eq!(notices.len(), 2);
        assert!(notices.iter().all(|n| n.kind == NoticeKind::NotFound));
        assert!(session.take_notices().is_empty(), "notices are drained");
    }

    #[test]
    fn test_filter_edits_recompute_view() {
        let mut rows = five_rows();
        rows[0].age = 20;
        rows[1].age = 40;
        rows[2].age = 60;
        rows[3].age = 41;
        rows[4].age = 70;
        let mut session = active_session(rows);

        session.set_filter_field(FilterField::AgeRange, "30-50");
        let ids: Vec<&str> = session.filtered_rows().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["P002", "P004"]);
        let summary = session.summary().expect("non-empty");
        assert_eq!(summary.total_records, 2);
        assert_eq!(summary.age_stats.min, 40);
        assert_eq!(summary.age_stats.max, 41);

        session.set_filter_field(FilterField::AgeRange, "90-99");
        assert!(session.filtered_rows().is_empty());
        assert!(session.summary().is_none());
    }

    #[test]
    fn test_save_and_reselect_keeps_filters() {
        let mut session = active_session(five_rows());
        let id = session.active_workspace().expect("active").id.clone();

        session.set_filter_field(FilterField::Gender, "Male");
        session.rename_workspace("Men only");
        assert!(session.save_workspace());

        session.back();
        session.select_workspace(&id).expect("reload");
        let ws = session.active_workspace().expect("active");
        assert_eq!(ws.name.as_str(), "Men only");
        assert_eq!(ws.filters.gender.as_deref(), Some("Male"));
    }

    #[test]
    fn test_unsaved_filter_edits_are_dropped_on_reselect() {
        let mut session = active_session(five_rows());
        let id = session.active_workspace().expect("active").id.clone();

        session.set_filter_field(FilterField::Condition, "copd");
        session.select_workspace(&id).expect("reload");
        assert_eq!(
            session.active_workspace().expect("active").filters.condition,
            None
        );
    }

    #[test]
    fn test_rename_rejects_blank_name() {
        let mut session = active_session(five_rows());
        session.rename_workspace("   ");
        assert_eq!(
            session.active_workspace().expect("active").name.as_str(),
            "Test cohort"
        );
        assert_eq!(session.take_notices()[0].kind, NoticeKind::InvalidInput);
    }

    #[test]
    fn test_row_intents_require_active_workspace() {
        let mut session = session();
        assert!(session.add_row(today()).is_none());
        assert_eq!(session.delete_rows(["P001"]), 0);
        assert!(!session.edit_row("P001", RowPatch::default()));
        assert!(session.connect_source(10).is_none());

        let notices = session.take_notices();
        assert_eq!(notices.len(), 4);
        assert!(notices.iter().all(|n| n.kind == NoticeKind::InvalidAction));
    }

    #[test]
    fn test_edit_row_updates_view_and_reports_unknown_rows() {
        let mut session = active_session(five_rows());
        session.set_filter_field(FilterField::Condition, "asthma");
        assert!(session.filtered_rows().is_empty());

        let patch = RowPatch {
            diagnosis: Some("Asthma".into()),
            ..RowPatch::default()
        };
        assert!(session.edit_row("P003", patch.clone()));
        assert_eq!(session.filtered_rows().len(), 1);

        assert!(!session.edit_row("P999", patch));
        assert_eq!(session.take_notices()[0].kind, NoticeKind::NotFound);
    }

    #[test]
    fn test_select_and_delete_selected_rows() {
        let mut session = active_session(five_rows());
        session.select_rows(["P002", "P004", "P404"]);
        assert_eq!(session.selection().len(), 2);

        assert_eq!(session.delete_selected_rows(), 2);
        let ids: Vec<&str> = session.records().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["P001", "P003", "P005"]);
        assert!(session.selection().is_empty());
    }

    #[test]
    fn test_stale_completion_after_back_is_discarded() {
        let mut session = session();
        session.begin_create();
        let request = session.submit_form().expect("activate");

        session.back();
        assert!(!session.complete_ingestion(request.ticket, Ok(five_rows())));
        assert!(session.records().is_empty());
        assert_eq!(session.state(), &SessionState::Inactive);
    }

    #[test]
    fn test_reactivation_supersedes_pending_request() {
        let mut session = session();
        session.begin_create();
        let first = session.submit_form().expect("activate");
        let id = session.active_workspace().expect("active").id.clone();

        let second = session.select_workspace(&id).expect("reload");
        assert_ne!(first.ticket, second.ticket);

        assert!(!session.complete_ingestion(first.ticket, Ok(five_rows())));
        assert!(session.records().is_empty());
        assert!(session.complete_ingestion(second.ticket, Ok(vec![sample_row("P001")])));
        assert_eq!(session.records().len(), 1);
    }

    #[test]
    fn test_ingestion_failure_keeps_prior_rows() {
        let mut session = active_session(five_rows());
        let request = session.connect_source(10).expect("append request");

        let failed = session.complete_ingestion(
            request.ticket,
            Err(IngestionError::Rejected("fhir endpoint offline".into())),
        );

        assert!(failed);
        assert_eq!(session.records().len(), 5);
        assert!(session.pending_ingestion().is_none());
        let notices = session.take_notices();
        assert_eq!(notices[0].kind, NoticeKind::IngestionFailed);
        assert!(notices[0].message.contains("fhir endpoint offline"));
    }

    #[test]
    fn test_duplicate_connect_is_ignored() {
        let mut session = active_session(five_rows());
        let first = session.connect_source(3).expect("first request");
        assert!(session.connect_source(3).is_none());
        assert_eq!(session.take_notices()[0].kind, NoticeKind::IngestionIgnored);

        assert!(session.complete_ingestion(first.ticket, Ok(five_rows())));
        let ids: BTreeSet<&str> = session.records().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(session.records().len(), 10);
        assert_eq!(ids.len(), 10, "appended rows are re-keyed");
    }

    #[tokio::test]
    async fn test_ingest_from_mock_source() {
        let mut session = session();
        let source = MockRowSource::seeded(3);

        session.begin_create();
        session.set_form_field(FormField::Gender, "Female");
        let request = session.submit_form().expect("activate");
        assert!(session.ingest(&source, request).await);

        assert_eq!(session.records().len(), 50);
        assert!(session.filtered_rows().iter().all(|r| r.gender == "Female"));
        if let Some(summary) = session.summary() {
            assert_eq!(summary.total_records, session.filtered_rows().len());
        }

        let more = session.connect_source(20).expect("append");
        assert!(session.ingest(&source, more).await);
        assert_eq!(session.records().len(), 70);
    }

    #[test]
    fn test_observers_see_every_recompute() {
        struct Recorder(Rc<RefCell<Vec<usize>>>);

        impl SessionObserver for Recorder {
            fn view_changed(&self, view: &SessionView<'_>) {
                self.0.borrow_mut().push(view.rows.len());
            }
        }

        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut session = session();
        session.subscribe(Box::new(Recorder(Rc::clone(&seen))));

        session.begin_create();
        let request = session.submit_form().expect("activate");
        session.complete_ingestion(request.ticket, Ok(five_rows()));
        session.add_row(today());
        session.back();

        assert_eq!(*seen.borrow(), vec![0, 0, 5, 6, 0]);
    }

    #[test]
    fn test_export_uses_filtered_view_and_workspace_name() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let exporter = JsonExporter::new(temp_dir.path());
        let mut rows = five_rows();
        rows[0].gender = "Male".into();
        let mut session = active_session(rows);
        session.set_filter_field(FilterField::Gender, "Male");

        let path = session.export(&exporter, today()).expect("exported");
        assert_eq!(
            path.file_name().and_then(|n| n.to_str()),
            Some("Test cohort-2026-10-17.json")
        );
        let written: Vec<DataRow> =
            serde_json::from_str(&std::fs::read_to_string(&path).expect("file exists"))
                .expect("valid rows");
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].id, "P001");
    }
}
