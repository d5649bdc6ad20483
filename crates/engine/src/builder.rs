//! Store configuration
//!
//! ```ignore
//! let store = LazyStore::<f64>::builder()
//!     .name("snapshot-options")
//!     .literal("box_size", 100.0)
//!     .dependent("half_box", |s| Ok(s.get("box_size")? / 2.0))
//!     .build();
//! ```

use crate::store::LazyStore;
use lazystore_core::{Lookup, MutationPolicy, Payload, WriteOnce};
use lazystore_storage::EntryTable;
use std::marker::PhantomData;

/// Builder for a [`LazyStore`].
///
/// Every entry added here starts `Defined`; nothing is evaluated until the
/// built store is read. Adding a key twice keeps the later payload.
pub struct LazyStoreBuilder<V, P = WriteOnce> {
    name: Option<String>,
    table: EntryTable<V>,
    policy: PhantomData<fn() -> P>,
}

impl<V, P: MutationPolicy> LazyStoreBuilder<V, P> {
    /// Create a builder with no entries
    pub fn new() -> Self {
        Self {
            name: None,
            table: EntryTable::new(),
            policy: PhantomData,
        }
    }

    /// Name the store; the name appears in log events and `Debug` output
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Add a literal value
    pub fn literal(self, key: impl Into<String>, value: V) -> Self {
        self.payload(key, Payload::Literal(value))
    }

    /// Add a zero-argument producer
    pub fn producer<F>(self, key: impl Into<String>, f: F) -> Self
    where
        F: Fn() -> anyhow::Result<V> + Send + Sync + 'static,
    {
        self.payload(key, Payload::producer(f))
    }

    /// Add a producer that reads other entries
    pub fn dependent<F>(self, key: impl Into<String>, f: F) -> Self
    where
        F: Fn(&dyn Lookup<V>) -> anyhow::Result<V> + Send + Sync + 'static,
    {
        self.payload(key, Payload::dependent(f))
    }

    /// Add an arbitrary payload
    pub fn payload(mut self, key: impl Into<String>, payload: Payload<V>) -> Self {
        self.table.raw_insert(key, payload);
        self
    }

    /// Add every pair from `entries`
    pub fn entries<K, I>(mut self, entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Payload<V>)>,
    {
        for (key, payload) in entries {
            self.table.raw_insert(key, payload);
        }
        self
    }

    /// Build the store
    pub fn build(self) -> LazyStore<V, P> {
        LazyStore::from_table(self.name, self.table)
    }
}

impl<V, P: MutationPolicy> Default for LazyStoreBuilder<V, P> {
    fn default() -> Self {
        Self::new()
    }
}
