//! Entry table
//!
//! # Invariants
//!
//! - Every key has exactly one entry, and every entry exactly one state.
//!   Insertion and removal handle payload and state as a unit.
//! - `Evaluated` entries hold `Literal` or `Resolved` payloads; `Error`
//!   entries hold `Failed` payloads. Only [`EntryTable::complete`] writes
//!   outcomes, and it writes payload and state together.
//! - Each write stamps the entry with a fresh generation, so completing an
//!   evaluation can tell whether its entry was rewritten in the meantime.
//!   The evaluation's outcome is stored either way.

use lazystore_core::{EntryState, Failure, Payload};
use std::collections::btree_map;
use std::collections::BTreeMap;

/// A key's payload and evaluation state
#[derive(Debug, Clone)]
pub struct Entry<V> {
    payload: Payload<V>,
    state: EntryState,
    generation: u64,
}

impl<V> Entry<V> {
    fn defined(payload: Payload<V>, generation: u64) -> Self {
        Self {
            payload,
            state: EntryState::Defined,
            generation,
        }
    }

    /// Current payload
    pub fn payload(&self) -> &Payload<V> {
        &self.payload
    }

    /// Current state
    pub fn state(&self) -> EntryState {
        self.state
    }

    /// Generation stamped by the last write
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Outcome of [`EntryTable::complete`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The outcome replaced the producer
    Memoized,
    /// The entry was rewritten while evaluating; the outcome replaced the
    /// newer payload
    Replaced,
    /// The entry was removed while evaluating; the outcome re-inserted it
    Restored,
}

/// Ordered key → entry map
#[derive(Debug, Clone)]
pub struct EntryTable<V> {
    entries: BTreeMap<String, Entry<V>>,
    next_generation: u64,
}

impl<V> EntryTable<V> {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_generation: 1,
        }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check membership
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Snapshot of the keys, in order
    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Look up an entry
    pub fn entry(&self, key: &str) -> Option<&Entry<V>> {
        self.entries.get(key)
    }

    /// State of a key, if present
    pub fn state(&self, key: &str) -> Option<EntryState> {
        self.entries.get(key).map(Entry::state)
    }

    /// Snapshot of every key's state, in key order
    pub fn states(&self) -> Vec<(String, EntryState)> {
        self.entries
            .iter()
            .map(|(k, e)| (k.clone(), e.state))
            .collect()
    }

    /// Iterate entries in key order
    pub fn iter(&self) -> btree_map::Iter<'_, String, Entry<V>> {
        self.entries.iter()
    }

    /// Insert (or replace) an entry in the `Defined` state.
    ///
    /// No evaluation and no policy check; callers decide whether the write
    /// is allowed. Returns the generation stamped on the new entry.
    pub fn raw_insert(&mut self, key: impl Into<String>, payload: Payload<V>) -> u64 {
        let generation = self.next_generation;
        self.next_generation += 1;
        self.entries
            .insert(key.into(), Entry::defined(payload, generation));
        generation
    }

    /// Remove an entry, payload and state together
    pub fn remove(&mut self, key: &str) -> Option<Entry<V>> {
        self.entries.remove(key)
    }

    /// Settle a `Defined` entry whose payload needs no invocation.
    ///
    /// Literal and resolved payloads move to `Evaluated`; a stored failure
    /// moves to `Error`. Returns false if the entry is absent, not
    /// `Defined`, or callable.
    pub fn settle(&mut self, key: &str) -> bool {
        match self.entries.get_mut(key) {
            Some(e) if e.state == EntryState::Defined && !e.payload.is_callable() => {
                e.state = match e.payload {
                    Payload::Failed(_) => EntryState::Error,
                    _ => EntryState::Evaluated,
                };
                true
            }
            _ => false,
        }
    }

    /// Move a `Defined` entry to `Evaluating`.
    ///
    /// Returns the generation the evaluation runs under, or `None` if the
    /// entry is absent or not `Defined`.
    pub fn begin_evaluation(&mut self, key: &str) -> Option<u64> {
        match self.entries.get_mut(key) {
            Some(e) if e.state == EntryState::Defined => {
                e.state = EntryState::Evaluating;
                Some(e.generation)
            }
            _ => None,
        }
    }

    /// Store the outcome of an evaluation started under `generation`.
    ///
    /// Success stores `Resolved` + `Evaluated`; failure stores `Failed` +
    /// `Error`. The outcome is always stored under `key`: it replaces an
    /// entry rewritten while the producer ran and restores one the producer
    /// removed. The returned [`Completion`] says which happened.
    pub fn complete(
        &mut self,
        key: &str,
        generation: u64,
        outcome: std::result::Result<V, Failure>,
    ) -> Completion {
        let (payload, state) = match outcome {
            Ok(value) => (Payload::Resolved(value), EntryState::Evaluated),
            Err(failure) => (Payload::Failed(failure), EntryState::Error),
        };
        match self.entries.get_mut(key) {
            Some(entry) => {
                let completion = if entry.generation == generation {
                    Completion::Memoized
                } else {
                    Completion::Replaced
                };
                entry.payload = payload;
                entry.state = state;
                completion
            }
            None => {
                let generation = self.next_generation;
                self.next_generation += 1;
                self.entries.insert(
                    key.to_owned(),
                    Entry {
                        payload,
                        state,
                        generation,
                    },
                );
                Completion::Restored
            }
        }
    }
}

impl<V> Default for EntryTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Into<String>, V> FromIterator<(K, Payload<V>)> for EntryTable<V> {
    fn from_iter<I: IntoIterator<Item = (K, Payload<V>)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (key, payload) in iter {
            table.raw_insert(key, payload);
        }
        table
    }
}
