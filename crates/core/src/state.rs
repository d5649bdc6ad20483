//! Entry evaluation states
//!
//! Every key in a store carries exactly one of these states:
//!
//! ```text
//! Defined ──(literal read)──────────────────────► Evaluated
//!    │
//!    └──(producer read)──► Evaluating ──(ok)────► Evaluated
//!                              │
//!                              └──────(raised)──► Error
//! ```
//!
//! `Evaluating` only exists while a producer is running on some call stack.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Evaluation state of a single entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryState {
    /// Written but never read
    Defined,
    /// A producer for this entry is currently running
    Evaluating,
    /// The payload holds a final value
    Evaluated,
    /// The payload holds a captured producer failure
    Error,
}

impl EntryState {
    /// True once the evaluation engine has touched the entry.
    ///
    /// Write-once stores reject writes to frozen entries.
    pub fn is_frozen(self) -> bool {
        !matches!(self, EntryState::Defined)
    }

    /// Lower-case name, as used in logs and serialized snapshots
    pub fn as_str(self) -> &'static str {
        match self {
            EntryState::Defined => "defined",
            EntryState::Evaluating => "evaluating",
            EntryState::Evaluated => "evaluated",
            EntryState::Error => "error",
        }
    }
}

impl fmt::Display for EntryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
