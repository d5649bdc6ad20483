//! Error types for the lazy store
//!
//! ## Taxonomy
//!
//! | Variant | Raised when |
//! |---------|-------------|
//! | NotFound | The key was never defined, or was deleted |
//! | CircularReference | A key's evaluation re-entered itself |
//! | ConstantRedefinition | A write-once store rejected a write to a frozen entry |
//! | Evaluation | A producer raised; replayed on every later read |
//!
//! No error is ever retried by the store. A failed entry stays failed until a
//! write resets it (mutable stores) or the store is rebuilt.

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Result type for lazy store operations
pub type Result<T> = std::result::Result<T, Error>;

/// All lazy store errors.
///
/// Errors are cheap to clone: a captured producer failure is shared, not
/// copied, so every read of a failed entry hands out the same [`Failure`].
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Requested key is not in the store
    #[error("not found: {0}")]
    NotFound(String),

    /// Evaluation of the key depends on itself
    #[error("value of \"{0}\" depends on itself")]
    CircularReference(String),

    /// Write rejected because the entry has already been evaluated
    #[error("\"{0}\" is immutable")]
    ConstantRedefinition(String),

    /// A producer raised while evaluating the key
    #[error("evaluation of \"{key}\" failed: {failure}")]
    Evaluation {
        /// Key whose producer failed
        key: String,
        /// The captured failure
        #[source]
        failure: Failure,
    },
}

impl Error {
    /// Surface a captured failure for `key`.
    ///
    /// A failure that is itself a store error (a nested lookup raised
    /// `NotFound` or `CircularReference` and the producer propagated it)
    /// surfaces as that store error, unchanged. Anything else, including a
    /// store error the producer wrapped in context, surfaces as
    /// [`Error::Evaluation`] carrying the same shared failure.
    pub fn from_failure(key: &str, failure: Failure) -> Self {
        if let Some(inner) = outermost::<Error>(failure.error()) {
            return inner.clone();
        }
        Error::Evaluation {
            key: key.to_owned(),
            failure,
        }
    }

    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Check if this is a circular reference error.
    pub fn is_circular_reference(&self) -> bool {
        matches!(self, Error::CircularReference(_))
    }

    /// Check if this is a rejected write.
    pub fn is_constant_redefinition(&self) -> bool {
        matches!(self, Error::ConstantRedefinition(_))
    }

    /// Check if this is a replayed producer failure.
    pub fn is_evaluation(&self) -> bool {
        matches!(self, Error::Evaluation { .. })
    }

    /// The key the error is about
    pub fn key(&self) -> &str {
        match self {
            Error::NotFound(key)
            | Error::CircularReference(key)
            | Error::ConstantRedefinition(key) => key,
            Error::Evaluation { key, .. } => key,
        }
    }

    /// The captured producer failure, if this is an evaluation error
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Error::Evaluation { failure, .. } => Some(failure),
            _ => None,
        }
    }
}

/// View the outermost layer of `error` as `E`.
///
/// Unlike `anyhow::Error::downcast_ref`, this does not look beneath context
/// layers.
fn outermost<E: std::error::Error + 'static>(error: &anyhow::Error) -> Option<&E> {
    error.chain().next().and_then(|e| e.downcast_ref::<E>())
}

/// A producer failure captured by the store.
///
/// Wraps the producer's `anyhow::Error` behind an `Arc`. Clones share the
/// same allocation, which is what makes a replayed failure identical to the
/// one first raised (see [`Failure::ptr_eq`]).
#[derive(Clone)]
pub struct Failure {
    inner: Arc<anyhow::Error>,
}

impl Failure {
    /// Capture a producer error.
    ///
    /// Re-capturing an error that already wraps a `Failure` reuses it.
    pub fn new(error: anyhow::Error) -> Self {
        if let Some(existing) = outermost::<Failure>(&error) {
            return existing.clone();
        }
        Self {
            inner: Arc::new(error),
        }
    }

    /// True if both handles point at the same captured error
    pub fn ptr_eq(&self, other: &Failure) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// The underlying producer error
    pub fn error(&self) -> &anyhow::Error {
        &self.inner
    }

    /// Attempt to view the captured error as a concrete type
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        self.inner.downcast_ref::<E>()
    }
}

impl From<anyhow::Error> for Failure {
    fn from(error: anyhow::Error) -> Self {
        Failure::new(error)
    }
}

impl fmt::Debug for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Failure").field(&*self.inner).finish()
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.inner, f)
    }
}

impl std::error::Error for Failure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner.source()
    }
}
