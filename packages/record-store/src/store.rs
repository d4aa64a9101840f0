use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use crate::error::StoreError;
use crate::record::{Fields, Record, RecordId};

/// In-memory record collection.
///
/// The record list and the id counter sit behind one lock so an id is never
/// handed out twice and readers never see a half-applied mutation.
#[derive(Debug)]
pub struct RecordStore {
    inner: RwLock<StoreState>,
}

#[derive(Debug)]
struct StoreState {
    records: Vec<Record>,
    next_id: RecordId,
}

impl StoreState {
    fn position(&self, id: RecordId) -> Option<usize> {
        self.records.iter().position(|r| r.id == id)
    }
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreState {
                records: Vec::new(),
                next_id: 1,
            }),
        }
    }

    // Every operation leaves the state consistent before it can panic, so a
    // poisoned lock is still safe to use.
    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// All records in insertion order.
    pub fn list_all(&self) -> Vec<Record> {
        self.read().records.clone()
    }

    pub fn get(&self, id: RecordId) -> Result<Record, StoreError> {
        let state = self.read();
        state
            .position(id)
            .map(|idx| state.records[idx].clone())
            .ok_or(StoreError::NotFound(id))
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.read().position(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().records.is_empty()
    }

    /// The id the next `insert` will assign.
    pub fn next_id(&self) -> RecordId {
        self.read().next_id
    }

    pub fn insert(&self, fields: Fields) -> Record {
        let mut state = self.write();
        let id = state.next_id;
        state.next_id += 1;

        let record = Record::new(id, fields);
        state.records.push(record.clone());
        debug!(id, "Record inserted");
        record
    }

    /// Replaces the whole attribute set of `id`. Attributes absent from
    /// `fields` are dropped; this is not a merge.
    pub fn update(&self, id: RecordId, fields: Fields) -> Result<Record, StoreError> {
        let mut state = self.write();
        let idx = state.position(id).ok_or(StoreError::NotFound(id))?;

        let record = Record::new(id, fields);
        state.records[idx] = record.clone();
        debug!(id, "Record replaced");
        Ok(record)
    }

    pub fn delete(&self, id: RecordId) -> Result<Record, StoreError> {
        let mut state = self.write();
        let idx = state.position(id).ok_or(StoreError::NotFound(id))?;
        let removed = state.records.remove(idx);
        debug!(id, "Record deleted");
        Ok(removed)
    }
}
