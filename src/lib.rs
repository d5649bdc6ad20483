//! # Lazystore
//!
//! Thread-safe, lazily evaluated key/value store.
//!
//! Each entry is supplied as a literal or as a producer. A producer runs on
//! the first read of its key and its result (or failure) is memoized, so it
//! runs at most once no matter how many threads read the key. Dependent
//! producers receive a read handle onto the store and may look up other
//! keys; a key whose evaluation reaches itself fails with
//! `CircularReference` instead of recursing.
//!
//! ## Quick Start
//!
//! ```ignore
//! use lazystore::prelude::*;
//!
//! let options: LazyStore<f64> = LazyStore::builder()
//!     .literal("box_size", 100.0)
//!     .producer("softening", || Ok(0.05))
//!     .dependent("half_box", |s| Ok(s.get("box_size")? / 2.0))
//!     .build();
//!
//! assert_eq!(options.get("half_box")?, 50.0);
//! ```
//!
//! ## Mutation Policies
//!
//! - [`LazyStore`] - write-once: an entry freezes once it has been read
//! - [`MutableLazyStore`] - writes always succeed and reset the entry
//!
//! ## Errors
//!
//! All operations return [`Result`]. See [`Error`] for the taxonomy.

#![warn(missing_docs)]

pub mod prelude;

// Re-export main entry points
pub use lazystore_engine::{LazyStore, LazyStoreBuilder, MutableLazyStore, Resolver};

// Error handling
pub use lazystore_core::{Error, Failure, Result};

// Core types
pub use lazystore_core::{
    DependentProducer, EntryState, Lookup, Mutable, MutationPolicy, Payload, Producer, WriteOnce,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
