use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;

use crate::SeriesId;

/// Per-series engine state, created lazily on a series' first sample
///
/// Lookup and insertion go through a sharded concurrent map; the shard lock
/// is released before the series' own mutex is taken, so slow sink I/O for
/// one series never stalls unrelated series.
pub(crate) struct SeriesStates<T> {
    states: DashMap<SeriesId, Arc<Mutex<T>>>,
}

impl<T> SeriesStates<T> {
    pub(crate) fn new() -> Self {
        Self {
            states: DashMap::new(),
        }
    }

    /// State of `id`, or `None` after seeding a fresh state with `init`
    pub(crate) fn existing_or_seed(
        &self,
        id: SeriesId,
        init: impl FnOnce() -> T,
    ) -> Option<Arc<Mutex<T>>> {
        match self.states.entry(id) {
            Entry::Occupied(entry) => Some(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                entry.insert(Arc::new(Mutex::new(init())));
                None
            }
        }
    }

    pub(crate) fn remove(&self, id: SeriesId) -> bool {
        self.states.remove(&id).is_some()
    }

    pub(crate) fn clear(&self) {
        self.states.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.states.len()
    }
}
