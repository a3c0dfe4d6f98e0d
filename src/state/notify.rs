use crate::state::record::StateRecord;
use crate::state::store::StateStore;
use std::sync::Arc;

/// Callback invoked with every record written through a [`ChangeNotifier`]
pub type StateObserver = Arc<dyn Fn(&StateRecord) + Send + Sync>;

/// Forwards writes to the wrapped store, then reports them to an observer.
///
/// The observer fires for every `set`, including records the wrapped store
/// drops (e.g. a [`ValidityFilter`](crate::state::ValidityFilter) placed
/// inside the notifier). Live subscribers therefore see unfiltered updates
/// while the snapshot only holds accepted records.
pub struct ChangeNotifier {
    inner: Arc<dyn StateStore>,
    observer: StateObserver,
}

impl ChangeNotifier {
    pub fn new(inner: Arc<dyn StateStore>, observer: StateObserver) -> Self {
        Self { inner, observer }
    }
}

impl StateStore for ChangeNotifier {
    fn set(&self, record: StateRecord) {
        self.inner.set(record.clone());
        (self.observer)(&record);
    }

    fn list(&self) -> Vec<StateRecord> {
        self.inner.list()
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}
