//! Fault injection for the journal backend.
//!
//! [`FlakyBackend`] wraps another backend and rejects appends or flushes
//! when told to through its [`FaultSwitch`]. The switch stays with the test after the
//! backend has been handed to an engine.

use metarev_storage::{StorageBackend, StorageError, StorageResult};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

const DISARMED: usize = usize::MAX;

#[derive(Debug)]
struct FaultState {
    reject_all: AtomicBool,
    reject_flush: AtomicBool,
    countdown: AtomicUsize,
    rejected: AtomicUsize,
}

impl Default for FaultState {
    fn default() -> Self {
        Self {
            reject_all: AtomicBool::new(false),
            reject_flush: AtomicBool::new(false),
            countdown: AtomicUsize::new(DISARMED),
            rejected: AtomicUsize::new(0),
        }
    }
}

/// Remote control for a [`FlakyBackend`].
#[derive(Debug, Clone, Default)]
pub struct FaultSwitch {
    state: Arc<FaultState>,
}

impl FaultSwitch {
    /// Rejects every append until [`FaultSwitch::heal`] is called.
    pub fn reject_appends(&self) {
        self.state.reject_all.store(true, Ordering::SeqCst);
    }

    /// Lets appends land but fails every flush until healed.
    pub fn reject_flushes(&self) {
        self.state.reject_flush.store(true, Ordering::SeqCst);
    }

    /// Lets `skip` appends through, then rejects exactly one.
    pub fn fail_once_after(&self, skip: usize) {
        self.state.countdown.store(skip, Ordering::SeqCst);
    }

    /// Clears every armed fault.
    pub fn heal(&self) {
        self.state.reject_all.store(false, Ordering::SeqCst);
        self.state.reject_flush.store(false, Ordering::SeqCst);
        self.state.countdown.store(DISARMED, Ordering::SeqCst);
    }

    /// Number of appends rejected so far.
    pub fn rejected(&self) -> usize {
        self.state.rejected.load(Ordering::SeqCst)
    }

    fn should_fail(&self) -> bool {
        if self.state.reject_all.load(Ordering::SeqCst) {
            return true;
        }
        let previous = self
            .state
            .countdown
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| match n {
                DISARMED => None,
                0 => Some(DISARMED),
                n => Some(n - 1),
            });
        previous == Ok(0)
    }
}

/// A backend whose appends or flushes fail on demand.
pub struct FlakyBackend {
    inner: Box<dyn StorageBackend>,
    switch: FaultSwitch,
}

impl FlakyBackend {
    /// Wraps `inner` with all faults disarmed.
    pub fn new(inner: Box<dyn StorageBackend>) -> Self {
        Self {
            inner,
            switch: FaultSwitch::default(),
        }
    }

    /// Returns a handle controlling this backend.
    pub fn switch(&self) -> FaultSwitch {
        self.switch.clone()
    }
}

impl StorageBackend for FlakyBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        self.inner.read_at(offset, len)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        if self.switch.should_fail() {
            self.switch.state.rejected.fetch_add(1, Ordering::SeqCst);
            return Err(StorageError::WriteRejected("injected append failure".into()));
        }
        self.inner.append(data)
    }

    fn flush(&mut self) -> StorageResult<()> {
        if self.switch.state.reject_flush.load(Ordering::SeqCst) {
            return Err(StorageError::WriteRejected("injected flush failure".into()));
        }
        self.inner.flush()
    }

    fn size(&self) -> StorageResult<u64> {
        self.inner.size()
    }

    fn sync(&mut self) -> StorageResult<()> {
        self.inner.sync()
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        self.inner.truncate(new_size)
    }
}
