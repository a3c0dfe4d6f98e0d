use crate::state::record::StateRecord;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Storage capability shared by every store and store decorator.
///
/// Implementations are composed by wrapping: decorators hold the store they
/// forward to, and only the innermost store keeps data. `list()` order is
/// unspecified.
pub trait StateStore: Send + Sync {
    /// Record an observation
    fn set(&self, record: StateRecord);

    /// Snapshot of everything currently held
    fn list(&self) -> Vec<StateRecord>;

    /// Number of records `list()` would return
    fn len(&self) -> usize {
        self.list().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Keeps the latest record per entity id
#[derive(Default)]
pub struct LastValueStore {
    state: RwLock<HashMap<String, StateRecord>>,
}

impl LastValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for LastValueStore {
    fn set(&self, record: StateRecord) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.insert(record.entity_id.clone(), record);
    }

    fn list(&self) -> Vec<StateRecord> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.values().cloned().collect()
    }

    fn len(&self) -> usize {
        self.state.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}
