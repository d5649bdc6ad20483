//! Concurrency layer for the lazy store
//!
//! This crate provides the single guard that serializes every store
//! operation:
//! - EvaluationGuard: re-entrant on the owning thread, exclusive across threads
//! - Section: a held guard, handing out short scoped borrows of the state

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod guard;

pub use guard::{EvaluationGuard, Section};
