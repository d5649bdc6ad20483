//! Convenient imports for Lazystore.
//!
//! ```ignore
//! use lazystore::prelude::*;
//!
//! let store = MutableLazyStore::<i32>::new();
//! store.set_producer("answer", || Ok(42))?;
//! ```

// Stores
pub use crate::{LazyStore, LazyStoreBuilder, MutableLazyStore};

// Error handling
pub use crate::{Error, Failure, Result};

// Core types
pub use crate::{EntryState, Lookup, Payload};

// Producers return anyhow results
pub use anyhow::{anyhow, bail};
