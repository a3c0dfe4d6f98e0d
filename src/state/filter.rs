use crate::state::record::StateRecord;
use crate::state::store::StateStore;
use std::sync::Arc;
use tracing::debug;

/// Drops records without a usable position before they reach the wrapped store.
///
/// A record passes when it carries numeric `latitude` and `longitude`
/// attributes and is not explicitly marked `position: false`.
pub struct ValidityFilter {
    inner: Arc<dyn StateStore>,
}

impl ValidityFilter {
    pub fn new(inner: Arc<dyn StateStore>) -> Self {
        Self { inner }
    }
}

impl StateStore for ValidityFilter {
    fn set(&self, record: StateRecord) {
        if record.number_attribute("latitude").is_none()
            || record.number_attribute("longitude").is_none()
        {
            debug!(entity_id = %record.entity_id, "Missing coordinates, dropping state");
            return;
        }

        if record.bool_attribute("position") == Some(false) {
            debug!(entity_id = %record.entity_id, "Position is invalid, dropping state");
            return;
        }

        self.inner.set(record);
    }

    fn list(&self) -> Vec<StateRecord> {
        self.inner.list()
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}
