//! The lazy store
//!
//! ## Access protocol
//!
//! `get(key)` runs entirely inside the store's evaluation guard:
//!
//! ```text
//! 1. enter guard (re-entrant on this thread)
//! 2. absent            → NotFound
//!    Evaluating        → CircularReference
//!    Error             → replay the captured failure
//!    Evaluated         → memoized value
//!    Defined, literal  → mark Evaluated, return it
//!    Defined, producer → mark Evaluating, invoke, memoize outcome
//! 3. exit guard
//! ```
//!
//! Holding the guard across the producer call is what makes evaluation
//! at-most-once: no other thread can observe `Defined` while a producer
//! runs. The producer itself may re-enter the store on the same thread.
//!
//! ## Cycles
//!
//! A producer that reaches its own key sees `Evaluating` and gets
//! `CircularReference`. If it propagates that error, the entry is captured
//! as failed like any other producer error, and every later read replays
//! `CircularReference`.

use crate::builder::LazyStoreBuilder;
use crate::resolver::Resolver;
use lazystore_concurrency::{EvaluationGuard, Section};
use lazystore_core::{
    DependentProducer, EntryState, Error, Failure, Lookup, Mutable, MutationPolicy, Payload,
    Producer, Result, WriteOnce,
};
use lazystore_storage::{Completion, EntryTable};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Label used in log events for stores built without a name
const UNNAMED: &str = "lazy-store";

/// Thread-safe lazily evaluated key/value store.
///
/// Values are supplied as literals or producers and resolved on first
/// [`get`](LazyStore::get). The policy parameter `P` decides whether entries
/// may be rewritten after they have been read; the default, [`WriteOnce`],
/// freezes them.
///
/// # Example
///
/// ```ignore
/// use lazystore::prelude::*;
///
/// let store: LazyStore<i32> = LazyStore::builder()
///     .literal("x", 5)
///     .producer("y", || Ok(10))
///     .dependent("z", |s| Ok(s.get("x")? + s.get("y")?))
///     .build();
///
/// assert_eq!(store.get("z")?, 15);
/// assert!(store.set("z", 0).unwrap_err().is_constant_redefinition());
/// ```
pub struct LazyStore<V, P = WriteOnce> {
    name: Option<String>,
    guard: EvaluationGuard<EntryTable<V>>,
    policy: PhantomData<fn() -> P>,
}

/// A lazy store whose entries can be rewritten after evaluation
pub type MutableLazyStore<V> = LazyStore<V, Mutable>;

/// What a read decided while holding the table borrow
enum Plan<V> {
    Ready(V),
    Invoke(Invocation<V>, u64),
}

enum Invocation<V> {
    Plain(Producer<V>),
    Dependent(DependentProducer<V>),
}

impl<V> Invocation<V> {
    fn kind(&self) -> &'static str {
        match self {
            Invocation::Plain(_) => "producer",
            Invocation::Dependent(_) => "dependent",
        }
    }
}

/// Settles an in-flight evaluation if the producer unwinds.
///
/// Without it a panicking producer would leave its entry `Evaluating`
/// forever.
struct InFlight<'s, 'g, V> {
    section: &'s Section<'g, EntryTable<V>>,
    key: &'s str,
    generation: u64,
    finished: bool,
}

impl<V> Drop for InFlight<'_, '_, V> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        warn!(key = self.key, "producer panicked");
        let failure = Failure::new(anyhow::anyhow!("producer for \"{}\" panicked", self.key));
        self.section
            .write(|table| table.complete(self.key, self.generation, Err(failure)));
    }
}

impl<V, P: MutationPolicy> LazyStore<V, P> {
    /// Create an empty store
    pub fn new() -> Self {
        Self::from_table(None, EntryTable::new())
    }

    /// Create a store seeded with `entries`, all in the `Defined` state.
    ///
    /// The store owns its entries; later changes to the caller's collection
    /// do not reach it. A repeated key keeps its last payload.
    pub fn from_entries<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Payload<V>)>,
    {
        Self::from_table(None, entries.into_iter().collect())
    }

    /// Start configuring a store
    pub fn builder() -> LazyStoreBuilder<V, P> {
        LazyStoreBuilder::new()
    }

    pub(crate) fn from_table(name: Option<String>, table: EntryTable<V>) -> Self {
        Self {
            name,
            guard: EvaluationGuard::new(table),
            policy: PhantomData,
        }
    }

    /// Name given at construction, if any
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Name of the mutation policy
    pub fn policy(&self) -> &'static str {
        P::NAME
    }

    fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(UNNAMED)
    }

    // =========================================================================
    // Container operations (no evaluation)
    // =========================================================================

    /// Number of entries
    pub fn len(&self) -> usize {
        self.guard.enter().read(EntryTable::len)
    }

    /// Check if the store has no entries
    pub fn is_empty(&self) -> bool {
        self.guard.enter().read(EntryTable::is_empty)
    }

    /// Check membership without evaluating
    pub fn contains(&self, key: &str) -> bool {
        self.guard.enter().read(|table| table.contains(key))
    }

    /// Point-in-time snapshot of the keys, in order
    pub fn keys(&self) -> Vec<String> {
        self.guard.enter().read(EntryTable::keys)
    }

    /// Current state of a key
    pub fn state(&self, key: &str) -> Option<EntryState> {
        self.guard.enter().read(|table| table.state(key))
    }

    /// Point-in-time snapshot of every key's state, in key order
    pub fn states(&self) -> Vec<(String, EntryState)> {
        self.guard.enter().read(EntryTable::states)
    }

    // =========================================================================
    // Writes (governed by the policy)
    // =========================================================================

    /// Define or redefine a key with a literal or payload.
    ///
    /// The entry is reset to `Defined`. Fails with `ConstantRedefinition` if
    /// the policy forbids writing the entry in its current state.
    pub fn set(&self, key: impl Into<String>, payload: impl Into<Payload<V>>) -> Result<()> {
        let key = key.into();
        let payload = payload.into();
        let section = self.guard.enter();
        section.write(|table| {
            self.check_writable(table, &key)?;
            debug!(store = self.label(), key = key.as_str(), kind = payload.kind(), "define");
            table.raw_insert(key, payload);
            Ok(())
        })
    }

    /// Define a key with a zero-argument producer
    pub fn set_producer<F>(&self, key: impl Into<String>, f: F) -> Result<()>
    where
        F: Fn() -> anyhow::Result<V> + Send + Sync + 'static,
    {
        self.set(key, Payload::producer(f))
    }

    /// Define a key with a producer that reads other entries
    pub fn set_dependent<F>(&self, key: impl Into<String>, f: F) -> Result<()>
    where
        F: Fn(&dyn Lookup<V>) -> anyhow::Result<V> + Send + Sync + 'static,
    {
        self.set(key, Payload::dependent(f))
    }

    /// Remove a key, payload and state together.
    ///
    /// Fails with `NotFound` for an absent key and `ConstantRedefinition` if
    /// the policy forbids it.
    pub fn delete(&self, key: &str) -> Result<()> {
        let section = self.guard.enter();
        section.write(|table| {
            if !table.contains(key) {
                return Err(Error::NotFound(key.to_owned()));
            }
            self.check_writable(table, key)?;
            table.remove(key);
            debug!(store = self.label(), key, "delete");
            Ok(())
        })
    }

    /// Apply `set` for each pair in order.
    ///
    /// Stops at the first rejected write; earlier writes stay applied.
    pub fn update<K, I>(&self, entries: I) -> Result<()>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Payload<V>)>,
    {
        let _section = self.guard.enter();
        for (key, payload) in entries {
            self.set(key, payload)?;
        }
        Ok(())
    }

    /// Delete every key in key order.
    ///
    /// A write-once store stops at the first frozen entry.
    pub fn clear(&self) -> Result<()> {
        let section = self.guard.enter();
        for key in section.read(EntryTable::keys) {
            self.delete(&key)?;
        }
        Ok(())
    }

    fn check_writable(&self, table: &EntryTable<V>, key: &str) -> Result<()> {
        match table.state(key) {
            Some(state) if !P::permits_write(state) => {
                warn!(
                    store = self.label(),
                    key,
                    state = state.as_str(),
                    policy = P::NAME,
                    "write rejected"
                );
                Err(Error::ConstantRedefinition(key.to_owned()))
            }
            _ => Ok(()),
        }
    }
}

impl<V: Clone, P: MutationPolicy> LazyStore<V, P> {
    // =========================================================================
    // Access protocol
    // =========================================================================

    /// Resolve a key, evaluating its producer on first access.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the key is absent
    /// - `CircularReference` if the key is already being evaluated on this
    ///   thread's call stack
    /// - the captured failure if the producer raised, now or on an earlier
    ///   read; the producer is never invoked again
    pub fn get(&self, key: &str) -> Result<V> {
        let section = self.guard.enter();
        let (invocation, generation) = match section.write(|table| plan_read(table, key))? {
            Plan::Ready(value) => {
                trace!(store = self.label(), key, "hit");
                return Ok(value);
            }
            Plan::Invoke(invocation, generation) => (invocation, generation),
        };

        debug!(
            store = self.label(),
            key,
            kind = invocation.kind(),
            depth = section.depth(),
            "invoking producer"
        );
        let mut in_flight = InFlight {
            section: &section,
            key,
            generation,
            finished: false,
        };
        let outcome = match &invocation {
            Invocation::Plain(producer) => producer(),
            Invocation::Dependent(producer) => producer(&Resolver::new(self)),
        };
        in_flight.finished = true;

        let outcome = outcome.map_err(Failure::new);
        let completion = section.write(|table| table.complete(key, generation, outcome.clone()));
        match completion {
            Completion::Memoized => {}
            Completion::Replaced => warn!(
                store = self.label(),
                key, "entry rewritten during evaluation, replaced by result"
            ),
            Completion::Restored => warn!(
                store = self.label(),
                key, "entry removed during evaluation, restored with result"
            ),
        }

        outcome.map_err(|failure| {
            debug!(store = self.label(), key, error = %failure, "producer failed");
            Error::from_failure(key, failure)
        })
    }

    /// Resolve a key, or return `default` if the key is absent.
    ///
    /// Only a missing `key` itself yields the default; a `NotFound` raised
    /// by one of its dependencies, and every other error, propagates.
    pub fn get_or(&self, key: &str, default: V) -> Result<V> {
        match self.get(key) {
            Err(Error::NotFound(missing)) if missing == key => Ok(default),
            other => other,
        }
    }

    /// Evaluate every key in key order.
    ///
    /// Returns the first error encountered; entries evaluated before it keep
    /// their memoized values.
    pub fn evaluate_all(&self) -> Result<Vec<(String, V)>> {
        let section = self.guard.enter();
        section
            .read(EntryTable::keys)
            .into_iter()
            .map(|key| {
                let value = self.get(&key)?;
                Ok((key, value))
            })
            .collect()
    }
}

/// Decide how to answer a read, making the state transition that goes with
/// the decision.
fn plan_read<V: Clone>(table: &mut EntryTable<V>, key: &str) -> Result<Plan<V>> {
    let entry = table
        .entry(key)
        .ok_or_else(|| Error::NotFound(key.to_owned()))?;

    let invocation = match (entry.state(), entry.payload()) {
        (EntryState::Evaluating, _) => return Err(Error::CircularReference(key.to_owned())),
        (EntryState::Defined, payload) if !payload.is_callable() => None,
        (_, Payload::Failed(failure)) => return Err(Error::from_failure(key, failure.clone())),
        (_, Payload::Literal(value) | Payload::Resolved(value)) => {
            return Ok(Plan::Ready(value.clone()))
        }
        (_, Payload::Producer(p)) => Some(Invocation::Plain(Arc::clone(p))),
        (_, Payload::Dependent(p)) => Some(Invocation::Dependent(Arc::clone(p))),
    };

    match invocation {
        None => {
            // Nothing to invoke: settle in place, then answer from the
            // settled entry.
            table.settle(key);
            plan_read(table, key)
        }
        Some(invocation) => {
            // Callable payloads are only ever Defined or Evaluating, and
            // Evaluating was answered above.
            let generation = table
                .begin_evaluation(key)
                .ok_or_else(|| Error::CircularReference(key.to_owned()))?;
            Ok(Plan::Invoke(invocation, generation))
        }
    }
}

impl<V, P: MutationPolicy> Default for LazyStore<V, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Into<String>, V, P: MutationPolicy> FromIterator<(K, Payload<V>)> for LazyStore<V, P> {
    fn from_iter<I: IntoIterator<Item = (K, Payload<V>)>>(iter: I) -> Self {
        Self::from_entries(iter)
    }
}

impl<V: Clone, P: MutationPolicy> Lookup<V> for LazyStore<V, P> {
    fn get(&self, key: &str) -> Result<V> {
        LazyStore::get(self, key)
    }

    fn contains(&self, key: &str) -> bool {
        LazyStore::contains(self, key)
    }

    fn keys(&self) -> Vec<String> {
        LazyStore::keys(self)
    }

    fn len(&self) -> usize {
        LazyStore::len(self)
    }
}

/// Renders the payloads currently stored. Nothing is evaluated: producers
/// that have not run print as `<producer>`.
impl<V: fmt::Debug, P: MutationPolicy> fmt::Display for LazyStore<V, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let section = self.guard.enter();
        section.read(|table| {
            f.write_str("{")?;
            for (i, (key, entry)) in table.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{:?}: {}", key, entry.payload())?;
            }
            f.write_str("}")
        })
    }
}

impl<V: fmt::Debug, P: MutationPolicy> fmt::Debug for LazyStore<V, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let section = self.guard.enter();
        section.read(|table| {
            f.debug_struct("LazyStore")
                .field("name", &self.name)
                .field("policy", &P::NAME)
                .field("entries", &DebugEntries(table))
                .finish()
        })
    }
}

struct DebugEntries<'a, V>(&'a EntryTable<V>);

impl<V: fmt::Debug> fmt::Debug for DebugEntries<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.0.iter().map(|(k, e)| (k, (e.state(), e.payload()))))
            .finish()
    }
}
