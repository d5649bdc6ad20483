//! Traits at the seams between layers
//!
//! - [`MutationPolicy`]: decides whether a write may replace an entry
//! - [`Lookup`]: the restricted read handle handed to dependent producers

use crate::error::Result;
use crate::state::EntryState;

/// Write permissions for a store.
///
/// The policy is a type parameter, so the choice is fixed when the store is
/// constructed and costs nothing at runtime.
pub trait MutationPolicy: Send + Sync + 'static {
    /// Name used in logs and `Debug` output
    const NAME: &'static str;

    /// Whether `set`/`delete` may touch an entry currently in `state`
    fn permits_write(state: EntryState) -> bool;
}

/// Entries freeze once the evaluation engine has touched them.
///
/// Writes to `Evaluating`, `Evaluated` or `Error` entries fail with
/// `ConstantRedefinition`; never-read entries stay writable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOnce;

impl MutationPolicy for WriteOnce {
    const NAME: &'static str = "write-once";

    fn permits_write(state: EntryState) -> bool {
        !state.is_frozen()
    }
}

/// Writes always succeed and reset the entry to `Defined`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Mutable;

impl MutationPolicy for Mutable {
    const NAME: &'static str = "mutable";

    fn permits_write(_state: EntryState) -> bool {
        true
    }
}

/// Read/evaluate access to a store.
///
/// Dependent producers receive a `&dyn Lookup<V>` onto the store that is
/// evaluating them. Lookups re-enter the store's guard on the same thread, so
/// a producer may read any other key. Reading its own key (directly or
/// through a chain of producers) yields `CircularReference`.
pub trait Lookup<V> {
    /// Resolve a key, evaluating it if needed
    fn get(&self, key: &str) -> Result<V>;

    /// Check membership without evaluating
    fn contains(&self, key: &str) -> bool;

    /// Snapshot of the key set
    fn keys(&self) -> Vec<String>;

    /// Number of entries
    fn len(&self) -> usize;

    /// Check if there are no entries
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
