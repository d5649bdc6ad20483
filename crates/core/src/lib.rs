//! Core types for the lazy store
//!
//! This crate defines the vocabulary shared by every layer:
//! - EntryState: the per-entry evaluation state machine
//! - Payload: literal values, producers, and their memoized outcomes
//! - Failure: a captured producer error, replayed on every read
//! - Error: the unified error type for all store operations
//! - Traits: MutationPolicy (write permissions) and Lookup (read handle)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod payload;
pub mod state;
pub mod traits;

pub use error::{Error, Failure, Result};
pub use payload::{DependentProducer, Payload, Producer};
pub use state::EntryState;
pub use traits::{Lookup, Mutable, MutationPolicy, WriteOnce};
