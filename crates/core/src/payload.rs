//! Entry payloads
//!
//! A payload is decided when the value is supplied: a literal, a producer
//! taking no arguments, or a dependent producer that receives a [`Lookup`]
//! handle onto the store evaluating it. Once evaluated, the producer is
//! replaced by its memoized outcome (`Resolved` or `Failed`).

use crate::error::Failure;
use crate::traits::Lookup;
use std::fmt;
use std::sync::Arc;

/// A zero-argument producer
pub type Producer<V> = Arc<dyn Fn() -> anyhow::Result<V> + Send + Sync>;

/// A producer that may read other entries of the store evaluating it
pub type DependentProducer<V> = Arc<dyn Fn(&dyn Lookup<V>) -> anyhow::Result<V> + Send + Sync>;

/// Stored payload of an entry
#[derive(Clone)]
pub enum Payload<V> {
    /// An immediately usable value
    Literal(V),
    /// Invoked with no arguments on first read
    Producer(Producer<V>),
    /// Invoked with a read handle onto the store on first read
    Dependent(DependentProducer<V>),
    /// Memoized output of a producer
    Resolved(V),
    /// Memoized failure of a producer
    Failed(Failure),
}

impl<V> Payload<V> {
    /// Wrap a literal value
    pub fn literal(value: V) -> Self {
        Payload::Literal(value)
    }

    /// Wrap a zero-argument producer
    pub fn producer<F>(f: F) -> Self
    where
        F: Fn() -> anyhow::Result<V> + Send + Sync + 'static,
    {
        Payload::Producer(Arc::new(f))
    }

    /// Wrap a producer that reads other entries
    pub fn dependent<F>(f: F) -> Self
    where
        F: Fn(&dyn Lookup<V>) -> anyhow::Result<V> + Send + Sync + 'static,
    {
        Payload::Dependent(Arc::new(f))
    }

    /// True for payloads the store must invoke to obtain a value
    pub fn is_callable(&self) -> bool {
        matches!(self, Payload::Producer(_) | Payload::Dependent(_))
    }

    /// The value, for literal and resolved payloads
    pub fn value(&self) -> Option<&V> {
        match self {
            Payload::Literal(v) | Payload::Resolved(v) => Some(v),
            _ => None,
        }
    }

    /// Short name of the variant
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Literal(_) => "literal",
            Payload::Producer(_) => "producer",
            Payload::Dependent(_) => "dependent",
            Payload::Resolved(_) => "resolved",
            Payload::Failed(_) => "failed",
        }
    }
}

impl<V> From<V> for Payload<V> {
    fn from(value: V) -> Self {
        Payload::Literal(value)
    }
}

impl<V: fmt::Debug> fmt::Debug for Payload<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Literal(v) => f.debug_tuple("Literal").field(v).finish(),
            Payload::Producer(_) => f.write_str("Producer(<fn>)"),
            Payload::Dependent(_) => f.write_str("Dependent(<fn>)"),
            Payload::Resolved(v) => f.debug_tuple("Resolved").field(v).finish(),
            Payload::Failed(failure) => f.debug_tuple("Failed").field(failure).finish(),
        }
    }
}

/// Renders what is currently stored, without evaluating anything
impl<V: fmt::Debug> fmt::Display for Payload<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Literal(v) | Payload::Resolved(v) => write!(f, "{:?}", v),
            Payload::Producer(_) | Payload::Dependent(_) => f.write_str("<producer>"),
            Payload::Failed(failure) => write!(f, "<error: {}>", failure),
        }
    }
}
