//! Evaluation engine for the lazy store
//!
//! This crate ties the layers together:
//! - LazyStore: the access protocol (at-most-once evaluation, cycle
//!   detection, failure replay) and container operations
//! - Resolver: the read handle dependent producers receive
//! - LazyStoreBuilder: store configuration and seeding
//!
//! Write permissions come from the store's [`MutationPolicy`] parameter:
//! [`LazyStore`] freezes entries once read, [`MutableLazyStore`] does not.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builder;
pub mod resolver;
pub mod store;

pub use builder::LazyStoreBuilder;
pub use resolver::Resolver;
pub use store::{LazyStore, MutableLazyStore};

pub use lazystore_core::{Mutable, MutationPolicy, WriteOnce};
