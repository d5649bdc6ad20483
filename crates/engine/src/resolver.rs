//! Read handle for dependent producers
//!
//! A dependent producer is handed a [`Resolver`] onto the store evaluating
//! it, as a `&dyn Lookup<V>`. The handle can read and evaluate entries but
//! cannot write them, so a producer cannot redefine the entries it depends
//! on.

use crate::store::LazyStore;
use lazystore_core::{Lookup, MutationPolicy, Result};

/// Read/evaluate view of a [`LazyStore`]
pub struct Resolver<'a, V, P> {
    store: &'a LazyStore<V, P>,
}

impl<'a, V, P> Resolver<'a, V, P> {
    pub(crate) fn new(store: &'a LazyStore<V, P>) -> Self {
        Self { store }
    }
}

impl<V: Clone, P: MutationPolicy> Lookup<V> for Resolver<'_, V, P> {
    fn get(&self, key: &str) -> Result<V> {
        self.store.get(key)
    }

    fn contains(&self, key: &str) -> bool {
        self.store.contains(key)
    }

    fn keys(&self) -> Vec<String> {
        self.store.keys()
    }

    fn len(&self) -> usize {
        self.store.len()
    }
}
