//! Re-entrant evaluation guard
//!
//! The whole key space sits behind one `parking_lot::ReentrantMutex`. A
//! thread that holds the guard may enter it again, which is what lets a
//! producer running inside `get` read other keys of the same store. Other
//! threads block until the outermost section on the owning thread ends.
//!
//! ## Borrow discipline
//!
//! A re-entrant mutex only hands out shared access, so the state lives in a
//! `RefCell`. Borrows are confined to the closures passed to
//! [`Section::read`] and [`Section::write`]. Those closures must not call
//! back into the store: a producer is always invoked between two borrows,
//! never inside one, so a re-entrant lookup never finds the cell borrowed.
//!
//! ```text
//! get("a")
//!   enter ─ write{ Defined → Evaluating } ─ producer() ─ write{ memoize } ─ exit
//!                                              │
//!                                              └─ get("b")
//!                                                   enter (same thread, no block)
//!                                                   write{ … } … exit
//! ```

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use std::cell::{Cell, RefCell};

/// Store-wide re-entrant guard around `T`
pub struct EvaluationGuard<T> {
    lock: ReentrantMutex<Slot<T>>,
}

struct Slot<T> {
    state: RefCell<T>,
    /// Sections currently open on the owning thread
    depth: Cell<usize>,
}

impl<T> EvaluationGuard<T> {
    /// Wrap `state`
    pub fn new(state: T) -> Self {
        Self {
            lock: ReentrantMutex::new(Slot {
                state: RefCell::new(state),
                depth: Cell::new(0),
            }),
        }
    }

    /// Open a critical section.
    ///
    /// Blocks while another thread holds the guard. Never blocks on a guard
    /// already held by the current thread.
    pub fn enter(&self) -> Section<'_, T> {
        let held = self.lock.lock();
        held.depth.set(held.depth.get() + 1);
        Section { held }
    }
}

/// An open critical section
///
/// The guard is released when the outermost section on the thread drops.
pub struct Section<'a, T> {
    held: ReentrantMutexGuard<'a, Slot<T>>,
}

impl<T> Section<'_, T> {
    /// Run `f` with shared access to the state
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.held.state.borrow())
    }

    /// Run `f` with exclusive access to the state
    pub fn write<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.held.state.borrow_mut())
    }

    /// Number of sections open on this thread, including this one.
    ///
    /// Greater than one inside a producer that re-entered the store.
    pub fn depth(&self) -> usize {
        self.held.depth.get()
    }
}

impl<T> Drop for Section<'_, T> {
    fn drop(&mut self) {
        self.held.depth.set(self.held.depth.get() - 1);
    }
}
