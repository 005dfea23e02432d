//! The Workspace Repository.
//!
//! Holds the saved workspace collection and persists it under a single store key. Every mutation
//! rewrites the whole collection; there is no incremental append.
//!
//! ## Failure handling
//!
//! - A missing key, an unreadable store or corrupt JSON all load as an empty collection. The
//!   problem is logged and the session starts normally.
//! - Corrupt JSON is copied to [`WORKSPACES_BACKUP_KEY`] first, since the next save overwrites
//!   the collection key.
//! - If a write fails, the mutation is rolled back in memory before the error is returned, so the
//!   in-memory collection always matches what was last persisted.
//!
//! Single writer only: two processes sharing a store will overwrite each other.

use crate::constants::{WORKSPACES_BACKUP_KEY, WORKSPACES_STORE_KEY};
use crate::filter::FilterSpec;
use crate::storage::KeyValueStore;
use crate::workspace::Workspace;
use crate::{WorkspaceError, WorkspaceResult};
use cohort_types::NonEmptyText;
use cohort_uuid::{TimestampId, TimestampIdGenerator};

#[derive(Debug)]
pub struct WorkspaceRepository<S> {
    store: S,
    workspaces: Vec<Workspace>,
    ids: TimestampIdGenerator,
}

impl<S: KeyValueStore> WorkspaceRepository<S> {
    /// Opens the repository, reading the saved collection from `store`.
    ///
    /// Never fails: see the module docs for how unreadable data is handled.
    pub fn open(mut store: S) -> Self {
        let workspaces = read_collection(&mut store);
        let mut ids = TimestampIdGenerator::new();
        for workspace in &workspaces {
            ids.observe(&workspace.id);
        }
        tracing::debug!("loaded {} saved workspaces", workspaces.len());

        Self {
            store,
            workspaces,
            ids,
        }
    }

    /// All saved workspaces in creation order.
    pub fn list(&self) -> &[Workspace] {
        &self.workspaces
    }

    pub fn get(&self, id: &TimestampId) -> Option<&Workspace> {
        self.workspaces.iter().find(|ws| ws.id == *id)
    }

    /// Returns a copy of the workspace with `id`.
    ///
    /// # Errors
    ///
    /// Returns `WorkspaceError::NotFound` if no saved workspace has that id.
    pub fn load(&self, id: &TimestampId) -> WorkspaceResult<Workspace> {
        self.get(id)
            .cloned()
            .ok_or_else(|| WorkspaceError::NotFound(id.to_string()))
    }

    /// Creates a workspace with a fresh id and `createdAt`, appends it and persists.
    ///
    /// # Errors
    ///
    /// Returns a store or serialization error if the collection could not be written. The new
    /// workspace is not kept in that case.
    pub fn create(&mut self, name: NonEmptyText, filters: FilterSpec) -> WorkspaceResult<Workspace> {
        let workspace = Workspace::new(self.ids.next_id(), name, filters);
        self.workspaces.push(workspace.clone());

        if let Err(e) = self.persist() {
            self.workspaces.pop();
            return Err(e);
        }

        tracing::info!("created workspace {} ({})", workspace.id, workspace.name);
        Ok(workspace)
    }

    /// Replaces the saved workspace with the same id, keeping its position.
    ///
    /// # Errors
    ///
    /// Returns `WorkspaceError::NotFound` if the id is unknown, or a store error if the write
    /// fails (the previous version is restored).
    pub fn update(&mut self, workspace: Workspace) -> WorkspaceResult<()> {
        let index = self.position(&workspace.id)?;
        let previous = std::mem::replace(&mut self.workspaces[index], workspace);

        if let Err(e) = self.persist() {
            self.workspaces[index] = previous;
            return Err(e);
        }

        tracing::info!("saved workspace {}", self.workspaces[index].id);
        Ok(())
    }

    /// Removes the workspace with `id` and returns it.
    ///
    /// # Errors
    ///
    /// Returns `WorkspaceError::NotFound` if the id is unknown, or a store error if the write
    /// fails (the workspace is reinstated).
    pub fn delete(&mut self, id: &TimestampId) -> WorkspaceResult<Workspace> {
        let index = self.position(id)?;
        let removed = self.workspaces.remove(index);

        if let Err(e) = self.persist() {
            self.workspaces.insert(index, removed);
            return Err(e);
        }

        tracing::info!("deleted workspace {}", removed.id);
        Ok(removed)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn position(&self, id: &TimestampId) -> WorkspaceResult<usize> {
        self.workspaces
            .iter()
            .position(|ws| ws.id == *id)
            .ok_or_else(|| WorkspaceError::NotFound(id.to_string()))
    }

    fn persist(&mut self) -> WorkspaceResult<()> {
        let json = serde_json::to_string(&self.workspaces).map_err(WorkspaceError::Serialization)?;
        self.store.write(WORKSPACES_STORE_KEY, &json)
    }
}

fn read_collection<S: KeyValueStore>(store: &mut S) -> Vec<Workspace> {
    let raw = match store.read(WORKSPACES_STORE_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            tracing::warn!("could not read saved workspaces, starting empty: {e}");
            return Vec::new();
        }
    };

    if raw.trim().is_empty() {
        return Vec::new();
    }

    match serde_json::from_str::<Vec<Workspace>>(&raw) {
        Ok(workspaces) => workspaces,
        Err(e) => {
            let e = WorkspaceError::Deserialization(e);
            match store.write(WORKSPACES_BACKUP_KEY, &raw) {
                Ok(()) => tracing::warn!(
                    "saved workspaces are corrupt, starting empty; previous data kept under \
                     '{WORKSPACES_BACKUP_KEY}': {e}"
                ),
                Err(backup) => tracing::warn!(
                    "saved workspaces are corrupt, starting empty; they will be replaced on the \
                     next save and could not be backed up ({backup}): {e}"
                ),
            }
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileStore, MemoryStore};
    use std::io;
    use tempfile::TempDir;

    /// Store whose writes can be made to fail.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_writes: bool,
    }

    impl KeyValueStore for FlakyStore {
        fn read(&self, key: &str) -> WorkspaceResult<Option<String>> {
            self.inner.read(key)
        }

        fn write(&mut self, key: &str, value: &str) -> WorkspaceResult<()> {
            if self.fail_writes {
                return Err(WorkspaceError::StoreWrite(io::Error::other("disk full")));
            }
            self.inner.write(key, value)
        }
    }

    fn name(s: &str) -> NonEmptyText {
        NonEmptyText::new(s).expect("valid name")
    }

    fn asthma_filters() -> FilterSpec {
        FilterSpec {
            age_range: Some("18-65".into()),
            gender: Some("Female".into()),
            start_year: Some("2020".into()),
            end_year: Some("2024".into()),
            condition: Some("Asthma".into()),
            ..FilterSpec::default()
        }
    }

    #[test]
    fn test_missing_store_is_empty_collection() {
        let repo = WorkspaceRepository::open(MemoryStore::new());
        assert!(repo.list().is_empty());
    }

    #[test]
    fn test_corrupt_store_degrades_to_empty() {
        for raw in ["not json", "{\"an\":\"object\"}", "[{\"id\":42}]", "   "] {
            let repo = WorkspaceRepository::open(MemoryStore::with_entry(WORKSPACES_STORE_KEY, raw));
            assert!(repo.list().is_empty(), "'{raw}' should load as empty");
        }
    }

    #[test]
    fn test_corrupt_store_is_kept_before_next_save() {
        let corrupt = r#"[{"name":"Old cohort","filters":{"gender":"Female"}"#;
        let mut repo =
            WorkspaceRepository::open(MemoryStore::with_entry(WORKSPACES_STORE_KEY, corrupt));
        assert!(repo.list().is_empty());

        repo.create(name("Fresh"), FilterSpec::default())
            .expect("create should succeed");

        let backup = repo.store().read(WORKSPACES_BACKUP_KEY).expect("read");
        assert_eq!(backup.as_deref(), Some(corrupt));
        let current = repo
            .store()
            .read(WORKSPACES_STORE_KEY)
            .expect("read")
            .expect("written");
        assert!(current.contains("Fresh"));
    }

    #[test]
    fn test_missing_store_writes_no_backup() {
        let repo = WorkspaceRepository::open(MemoryStore::new());
        assert_eq!(repo.store().read(WORKSPACES_BACKUP_KEY).expect("read"), None);
    }

    #[test]
    fn test_persist_then_reload_round_trips() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = FileStore::new(temp_dir.path());

        let mut repo = WorkspaceRepository::open(store.clone());
        repo.create(name("Asthma cohort"), asthma_filters())
            .expect("create should succeed");
        repo.create(name("Everyone"), FilterSpec::default())
            .expect("create should succeed");
        let saved = repo.list().to_vec();

        let reloaded = WorkspaceRepository::open(store);
        assert_eq!(reloaded.list(), saved.as_slice());
    }

    #[test]
    fn test_create_assigns_unique_increasing_ids() {
        let mut repo = WorkspaceRepository::open(MemoryStore::new());
        let a = repo.create(name("A"), FilterSpec::default()).expect("create A");
        let b = repo.create(name("B"), FilterSpec::default()).expect("create B");

        assert_ne!(a.id, b.id);
        assert!(a.id < b.id);
        assert!(a.created_at <= b.created_at);
        assert_eq!(repo.list().len(), 2);
    }

    #[test]
    fn test_ids_stay_unique_after_reload() {
        let mut first = WorkspaceRepository::open(MemoryStore::new());
        let a = first.create(name("A"), FilterSpec::default()).expect("create A");
        let store = first.store().clone();

        let mut second = WorkspaceRepository::open(store);
        let b = second.create(name("B"), FilterSpec::default()).expect("create B");
        assert!(b.id > a.id);
    }

    #[test]
    fn test_update_replaces_in_place() {
        let mut repo = WorkspaceRepository::open(MemoryStore::new());
        let a = repo.create(name("A"), FilterSpec::default()).expect("create A");
        repo.create(name("B"), FilterSpec::default()).expect("create B");

        let mut edited = a.clone();
        edited.filters = asthma_filters();
        repo.update(edited.clone()).expect("update should succeed");

        assert_eq!(repo.list()[0], edited);
        assert_eq!(repo.list().len(), 2);

        let reloaded = WorkspaceRepository::open(repo.store().clone());
        assert_eq!(reloaded.load(&a.id).expect("saved"), edited);
    }

    #[test]
    fn test_unknown_ids_are_not_found() {
        let mut repo = WorkspaceRepository::open(MemoryStore::new());
        let ghost = Workspace::new(
            TimestampIdGenerator::new().next_id(),
            name("Ghost"),
            FilterSpec::default(),
        );

        assert!(matches!(
            repo.update(ghost.clone()),
            Err(WorkspaceError::NotFound(_))
        ));
        assert!(matches!(
            repo.delete(&ghost.id),
            Err(WorkspaceError::NotFound(_))
        ));
        assert!(matches!(repo.load(&ghost.id), Err(WorkspaceError::NotFound(_))));
    }

    #[test]
    fn test_delete_removes_and_persists() {
        let mut repo = WorkspaceRepository::open(MemoryStore::new());
        let a = repo.create(name("A"), FilterSpec::default()).expect("create A");
        let b = repo.create(name("B"), FilterSpec::default()).expect("create B");

        let removed = repo.delete(&a.id).expect("delete should succeed");
        assert_eq!(removed.id, a.id);

        let reloaded = WorkspaceRepository::open(repo.store().clone());
        assert_eq!(reloaded.list(), std::slice::from_ref(&b));
    }

    #[test]
    fn test_failed_write_rolls_back() {
        let mut repo = WorkspaceRepository::open(FlakyStore::default());
        let a = repo.create(name("A"), FilterSpec::default()).expect("create A");

        repo.store.fail_writes = true;

        assert!(repo.create(name("B"), FilterSpec::default()).is_err());
        assert_eq!(repo.list(), std::slice::from_ref(&a));

        let mut edited = a.clone();
        edited.name = name("Renamed");
        assert!(repo.update(edited).is_err());
        assert_eq!(repo.list()[0].name.as_str(), "A");

        assert!(repo.delete(&a.id).is_err());
        assert_eq!(repo.list(), std::slice::from_ref(&a));
    }

    #[test]
    fn test_stored_json_uses_documented_field_names() {
        let mut repo = WorkspaceRepository::open(MemoryStore::new());
        repo.create(name("Asthma cohort"), asthma_filters())
            .expect("create should succeed");

        let raw = repo
            .store()
            .read(WORKSPACES_STORE_KEY)
            .expect("read")
            .expect("written");
        let json: serde_json::Value = serde_json::from_str(&raw).expect("valid json");
        let first = &json[0];
        assert_eq!(first["name"], "Asthma cohort");
        assert_eq!(first["filters"]["ageRange"], "18-65");
        assert_eq!(first["filters"]["startYear"], "2020");
        assert!(first["createdAt"].is_string());
        assert!(first["id"].is_string());
    }
}
