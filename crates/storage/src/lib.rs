//! Storage layer for the lazy store
//!
//! This crate holds the key space:
//! - Entry: payload + state + generation, kept together so the value/state
//!   pairing can never drift
//! - EntryTable: ordered map of entries with the state transitions the
//!   evaluation engine is allowed to make
//!
//! The table does no locking of its own; the engine only touches it from
//! inside the evaluation guard.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod table;

pub use table::{Completion, Entry, EntryTable};
