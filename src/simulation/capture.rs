// src/simulation/capture.rs

//! Operation journal and its suspension guard.
//!
//! While a [`record`] scope is open on the current thread, every operation
//! applied through [`engine::apply_operation`](super::engine::apply_operation)
//! is appended to a journal. Measurement code applies bookkeeping rotations
//! to scratch copies of the state; it wraps that work in [`suspend`] so those
//! rotations never show up as program operations.

use crate::operations::Operation;
use std::cell::{Cell, RefCell};

thread_local! {
    static JOURNAL: RefCell<Option<Vec<Operation>>> = const { RefCell::new(None) };
    static SUSPENDED: Cell<bool> = const { Cell::new(false) };
}

/// Runs `f` with recording enabled and returns its value together with every
/// operation applied while it ran.
///
/// Scopes nest: an inner `record` collects its own operations and the outer
/// journal is restored afterwards.
pub fn record<T>(f: impl FnOnce() -> T) -> (T, Vec<Operation>) {
    let outer = JOURNAL.with(|journal| journal.replace(Some(Vec::new())));
    let scope = JournalScope { outer };
    let value = f();
    let operations = JOURNAL.with(|journal| journal.borrow_mut().take()).unwrap_or_default();
    drop(scope);
    (value, operations)
}

/// True if applied operations are currently being journaled.
pub fn is_recording() -> bool {
    !SUSPENDED.with(Cell::get) && JOURNAL.with(|journal| journal.borrow().is_some())
}

/// Suspends journaling until the returned guard is dropped.
#[must_use = "journaling resumes as soon as the guard is dropped"]
pub fn suspend() -> Suspended {
    let previous = SUSPENDED.with(|flag| flag.replace(true));
    Suspended { previous }
}

/// Guard returned by [`suspend`]. Restores the previous state on drop,
/// including when the suspended computation returns an error or unwinds.
#[derive(Debug)]
pub struct Suspended {
    previous: bool,
}

impl Drop for Suspended {
    fn drop(&mut self) {
        SUSPENDED.with(|flag| flag.set(self.previous));
    }
}

pub(crate) fn observe(op: &Operation) {
    if SUSPENDED.with(Cell::get) {
        return;
    }
    JOURNAL.with(|journal| {
        if let Some(ops) = journal.borrow_mut().as_mut() {
            ops.push(op.clone());
        }
    });
}

struct JournalScope {
    outer: Option<Vec<Operation>>,
}

impl Drop for JournalScope {
    fn drop(&mut self) {
        let outer = self.outer.take();
        JOURNAL.with(|journal| *journal.borrow_mut() = outer);
    }
}
