// State records and the composable store chain

mod filter;
mod notify;
mod record;
mod ring;
mod store;

pub use filter::ValidityFilter;
pub use notify::{ChangeNotifier, StateObserver};
pub use record::{AttributeValue, StateRecord};
pub use ring::RingHistoryStore;
pub use store::{LastValueStore, StateStore};

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

/// Compose the store chain used by the service.
///
/// Outermost first: `ChangeNotifier(ValidityFilter?(LastValueStore | RingHistoryStore))`.
/// `ring_size == 0` selects the last-value store; the filter is only inserted
/// when `filter` is set.
pub fn build_store(
    ring_size: usize,
    filter: bool,
    observer: StateObserver,
) -> Result<Arc<dyn StateStore>> {
    let mut store: Arc<dyn StateStore> = if ring_size > 0 {
        Arc::new(RingHistoryStore::new(ring_size)?)
    } else {
        Arc::new(LastValueStore::new())
    };

    if filter {
        store = Arc::new(ValidityFilter::new(store));
    }

    info!(ring_size = ring_size, filter = filter, "State store configured");

    Ok(Arc::new(ChangeNotifier::new(store, observer)))
}
