use crate::state::record::StateRecord;
use crate::state::store::StateStore;
use anyhow::{bail, Result};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Fixed-capacity circular buffer of records for one entity
struct Ring {
    slots: Vec<Option<StateRecord>>,
    /// Next slot to write; once the ring is full this is also the oldest entry
    cursor: usize,
}

impl Ring {
    fn new(size: usize) -> Self {
        Self {
            slots: vec![None; size],
            cursor: 0,
        }
    }

    fn push(&mut self, record: StateRecord) {
        self.slots[self.cursor] = Some(record);
        self.cursor = (self.cursor + 1) % self.slots.len();
    }

    /// Occupied slots, oldest first
    fn iter(&self) -> impl Iterator<Item = &StateRecord> {
        let (newer, older) = self.slots.split_at(self.cursor);
        older.iter().chain(newer.iter()).flatten()
    }
}

/// Keeps the last `size` records per entity id.
///
/// A ring is created lazily the first time an entity is written; once full,
/// each write silently replaces that entity's oldest record.
pub struct RingHistoryStore {
    state: RwLock<HashMap<String, Ring>>,
    size: usize,
}

impl RingHistoryStore {
    /// Create a store retaining `size` records per entity.
    ///
    /// Returns an error when `size` is zero.
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            bail!("ring history size must be greater than zero");
        }

        Ok(Self {
            state: RwLock::new(HashMap::new()),
            size,
        })
    }
}

impl StateStore for RingHistoryStore {
    fn set(&self, record: StateRecord) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state
            .entry(record.entity_id.clone())
            .or_insert_with(|| Ring::new(self.size))
            .push(record);
    }

    fn list(&self) -> Vec<StateRecord> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.values().flat_map(Ring::iter).cloned().collect()
    }
}
