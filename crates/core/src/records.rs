//! The Record Store: the live, ordered collection of rows under edit.
//!
//! Row ids are unique within the store at all times. Ids handed out by [`RecordStore::add_row`]
//! come from a counter that only moves forward, so an id deleted earlier in the session is never
//! issued again. Incoming ids only advance the counter when their number fits in a `u32`; the
//! counter itself is a `u64`, so it cannot overflow however large an ingested id is.

use crate::constants::{MRN_PREFIX, ROW_ID_PREFIX};
use crate::row::{DataRow, RowPatch};
use crate::{WorkspaceError, WorkspaceResult};
use chrono::NaiveDate;
use std::collections::HashSet;

#[derive(Clone, Debug, Default)]
pub struct RecordStore {
    rows: Vec<DataRow>,
    next_seq: u64,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[DataRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&DataRow> {
        self.rows.iter().find(|row| row.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Appends one row, re-keying it if its id is already taken.
    ///
    /// Returns the id the row was stored under.
    pub fn append(&mut self, mut row: DataRow) -> String {
        if row.id.trim().is_empty() || self.contains(&row.id) {
            let fresh = self.issue_id();
            tracing::debug!("re-keyed incoming row {:?} as {}", row.id, fresh);
            row.id = fresh;
        } else {
            self.observe_id(&row.id);
        }
        let id = row.id.clone();
        self.rows.push(row);
        id
    }

    /// Appends rows in order. See [`RecordStore::append`].
    pub fn append_all(&mut self, rows: impl IntoIterator<Item = DataRow>) {
        for row in rows {
            self.append(row);
        }
    }

    /// Replaces the whole content. The id counter is kept, so fresh ids stay unique.
    pub fn replace(&mut self, rows: impl IntoIterator<Item = DataRow>) {
        self.rows.clear();
        self.append_all(rows);
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    /// Appends a blank row with the next sequential display id (`P001`, `P002`, ...).
    pub fn add_row(&mut self, encounter_date: NaiveDate) -> &DataRow {
        let seq = self.issue_seq();
        let row = DataRow::blank(
            format_seq(ROW_ID_PREFIX, seq),
            format_seq(MRN_PREFIX, seq),
            encounter_date,
        );
        self.rows.push(row);
        &self.rows[self.rows.len() - 1]
    }

    /// Removes every row whose id is in `ids`, preserving the order of the rest.
    ///
    /// Returns the number of rows removed.
    pub fn delete<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) -> usize {
        let doomed: HashSet<&str> = ids.into_iter().collect();
        let before = self.rows.len();
        self.rows.retain(|row| !doomed.contains(row.id.as_str()));
        before - self.rows.len()
    }

    /// Applies a partial edit to the row with `id`.
    ///
    /// # Errors
    ///
    /// Returns `WorkspaceError::RowNotFound` if no row has that id.
    pub fn update(&mut self, id: &str, patch: RowPatch) -> WorkspaceResult<()> {
        let row = self
            .rows
            .iter_mut()
            .find(|row| row.id == id)
            .ok_or_else(|| WorkspaceError::RowNotFound(id.to_string()))?;
        row.apply(patch);
        Ok(())
    }

    fn issue_id(&mut self) -> String {
        format_seq(ROW_ID_PREFIX, self.issue_seq())
    }

    /// Next sequence number whose display id is not already in the store.
    fn issue_seq(&mut self) -> u64 {
        loop {
            let seq = self.take_seq();
            if !self.contains(&format_seq(ROW_ID_PREFIX, seq)) {
                return seq;
            }
        }
    }

    fn take_seq(&mut self) -> u64 {
        let seq = self.next_seq.max(1);
        self.next_seq = seq.saturating_add(1);
        seq
    }

    fn observe_id(&mut self, id: &str) {
        if let Some(seq) = parse_seq(id) {
            self.next_seq = self.next_seq.max(u64::from(seq) + 1);
        }
    }
}

fn format_seq(prefix: &str, seq: u64) -> String {
    format!("{}{:03}", prefix, seq)
}

/// Sequence number of an id like `P042`. Numbers beyond `u32` are not tracked.
fn parse_seq(id: &str) -> Option<u32> {
    id.strip_prefix(ROW_ID_PREFIX)?.parse().ok()
}
