//! Test utilities and instrumented element types for Tally development.
//!
//! Provides a lifecycle-counting element type ([`Probe`], created by a
//! [`ProbeTracker`]), a failure-injecting backend allocator
//! ([`FailingBackend`]), [`init_test_logging`] for tests that want to
//! see allocator and container events, and [`capture_logs`] for tests
//! that assert on them.

#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

pub use fixtures::{FailSwitch, FailingBackend};

use std::cell::{Cell, RefCell};
use std::fmt;
use std::io;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::util::SubscriberInitExt;

/// Install a `tracing` subscriber that writes through the test harness.
///
/// Honours `RUST_LOG` (for example `RUST_LOG=tally=debug`). Safe to call
/// from every test; only the first call installs anything.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl io::Write for SharedBuf {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` with a thread-local subscriber recording every event at
/// `TRACE` and above, and return its result with the formatted output.
pub fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, String) {
    let buf = SharedBuf::default();
    let writer = buf.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_max_level(LevelFilter::TRACE)
        .with_ansi(false)
        .finish();
    let result = {
        let _guard = subscriber.set_default();
        f()
    };
    let bytes = buf
        .0
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone();
    (result, String::from_utf8_lossy(&bytes).into_owned())
}

#[derive(Default)]
struct Counts {
    created: Cell<usize>,
    clones: Cell<usize>,
    drops: Cell<usize>,
    drop_order: RefCell<Vec<u32>>,
}

/// Hands out [`Probe`]s and counts what happens to them.
///
/// Every probe created by a tracker, and every clone of one, reports its
/// drop back here, so a test can check that a container neither leaks
/// nor double-drops elements.
#[derive(Clone, Default)]
pub struct ProbeTracker {
    counts: Rc<Counts>,
}

impl ProbeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tracked probe carrying `value`.
    pub fn probe(&self, value: u32) -> Probe {
        self.counts.created.set(self.counts.created.get() + 1);
        Probe {
            value,
            counts: Some(Rc::clone(&self.counts)),
        }
    }

    /// Probes created through [`probe`](Self::probe).
    pub fn created(&self) -> usize {
        self.counts.created.get()
    }

    /// Clones made of tracked probes.
    pub fn clones(&self) -> usize {
        self.counts.clones.get()
    }

    /// Tracked probes dropped so far.
    pub fn drops(&self) -> usize {
        self.counts.drops.get()
    }

    /// Tracked probes currently alive.
    pub fn live(&self) -> usize {
        self.created() + self.clones() - self.drops()
    }

    /// Values of dropped probes, in drop order.
    pub fn drop_order(&self) -> Vec<u32> {
        self.counts.drop_order.borrow().clone()
    }
}

/// Element type that records clones and drops with its tracker.
///
/// Equality compares values only. `Probe::default()` is untracked and
/// carries value 0.
#[derive(Default)]
pub struct Probe {
    value: u32,
    counts: Option<Rc<Counts>>,
}

impl Probe {
    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn set_value(&mut self, value: u32) {
        self.value = value;
    }

    pub fn is_tracked(&self) -> bool {
        self.counts.is_some()
    }
}

impl Clone for Probe {
    fn clone(&self) -> Self {
        if let Some(counts) = &self.counts {
            counts.clones.set(counts.clones.get() + 1);
        }
        Self {
            value: self.value,
            counts: self.counts.clone(),
        }
    }
}

impl Drop for Probe {
    fn drop(&mut self) {
        if let Some(counts) = &self.counts {
            counts.drops.set(counts.drops.get() + 1);
            counts.drop_order.borrow_mut().push(self.value);
        }
    }
}

impl PartialEq for Probe {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for Probe {}

impl fmt::Debug for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Probe({})", self.value)
    }
}
