use crate::models::ShortLink;
use dashmap::{mapref::entry::Entry, DashMap};
use std::sync::Arc;

/// Thread-safe in-memory store mapping short_code -> link record.
///
/// Backed by a DashMap so lookups of different codes proceed in parallel and
/// no caller ever holds a lock across calls. Records are shared as `Arc`s;
/// their counters are updated in place by the lifecycle engine.
#[derive(Clone, Debug)]
pub struct LinkStore {
    inner: Arc<DashMap<String, Arc<ShortLink>>>,
}

impl LinkStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
        }
    }

    /// Insert or overwrite a record, unconditionally.
    pub fn put(&self, short_code: impl Into<String>, link: Arc<ShortLink>) {
        self.inner.insert(short_code.into(), link);
    }

    /// Insert only if no record holds the code yet. Returns `false` when the
    /// code was taken in the meantime.
    pub fn insert_new(&self, link: Arc<ShortLink>) -> bool {
        match self.inner.entry(link.short_code.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(link);
                true
            }
        }
    }

    pub fn get(&self, short_code: &str) -> Option<Arc<ShortLink>> {
        self.inner.get(short_code).map(|v| Arc::clone(v.value()))
    }

    /// Remove whatever record holds the code. Missing codes are a no-op.
    pub fn remove(&self, short_code: &str) -> Option<Arc<ShortLink>> {
        self.inner.remove(short_code).map(|(_, link)| link)
    }

    /// Remove `link` only if it is still the record stored under its code, so
    /// a stale handle never evicts a newer record that reused the code.
    pub fn remove_record(&self, link: &Arc<ShortLink>) -> bool {
        self.inner
            .remove_if(&link.short_code, |_, stored| Arc::ptr_eq(stored, link))
            .is_some()
    }

    pub fn exists(&self, short_code: &str) -> bool {
        self.inner.contains_key(short_code)
    }

    /// Weakly consistent snapshot of every record, in no particular order.
    pub fn list_all(&self) -> Vec<Arc<ShortLink>> {
        self.inner
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Number of records currently stored.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Default for LinkStore {
    fn default() -> Self {
        Self::new()
    }
}
