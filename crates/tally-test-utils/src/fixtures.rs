//! Reusable allocation-failure fixtures.
//!
//! - [`FailingBackend`]: a [`GlobalAlloc`] over [`System`] that refuses
//!   requests once its budget is spent.
//! - [`FailSwitch`]: the test-side handle that sets the budget.

use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;
use std::ptr;
use std::rc::Rc;

/// Backend allocator that fails deterministically.
///
/// With no budget set every request is forwarded to [`System`]. With a
/// budget of `n`, the next `n` requests succeed and every later one
/// returns null until [`FailSwitch::heal`] is called. Frees are always
/// forwarded.
pub struct FailingBackend {
    budget: Rc<Cell<Option<usize>>>,
}

/// Controls the budget of a [`FailingBackend`] after it has been moved
/// into an allocator.
#[derive(Clone)]
pub struct FailSwitch {
    budget: Rc<Cell<Option<usize>>>,
}

impl FailingBackend {
    /// Create an unlimited backend and its switch.
    pub fn new() -> (Self, FailSwitch) {
        let budget = Rc::new(Cell::new(None));
        (
            Self {
                budget: Rc::clone(&budget),
            },
            FailSwitch { budget },
        )
    }
}

impl FailSwitch {
    /// Allow `n` more allocations, then fail.
    pub fn fail_after(&self, n: usize) {
        self.budget.set(Some(n));
    }

    /// Fail every allocation from now on.
    pub fn fail_now(&self) {
        self.fail_after(0);
    }

    /// Remove the budget; every allocation succeeds again.
    pub fn heal(&self) {
        self.budget.set(None);
    }

    /// Allocations still allowed, or `None` if unlimited.
    pub fn remaining(&self) -> Option<usize> {
        self.budget.get()
    }
}

// SAFETY: delegates to `System` for all actual work; refusing a request
// by returning null is permitted by the `GlobalAlloc` contract.
unsafe impl GlobalAlloc for FailingBackend {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        match self.budget.get() {
            Some(0) => return ptr::null_mut(),
            Some(n) => self.budget.set(Some(n - 1)),
            None => {}
        }
        // SAFETY: caller upholds the `GlobalAlloc::alloc` contract.
        unsafe { System.alloc(layout) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        // SAFETY: every non-null pointer we return came from `System`.
        unsafe { System.dealloc(ptr, layout) }
    }
}
