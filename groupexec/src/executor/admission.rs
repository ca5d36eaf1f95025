//! Per-node admission control.
//!
//! Each [`GroupPath`](super::GroupPath) node owns one [`AdmissionSemaphore`].
//! Jobs interact with a node in one of two modes:
//!
//! - **Exclusive** (writer): the job's own group is this node. At most
//!   `quota` exclusive holders are admitted at once.
//! - **Transit** (reader): the job's group is a strict descendant of this
//!   node. Transit is free and unbounded unless an exclusive holder is active
//!   or waiting here, in which case it blocks until the node has no writers.
//!
//! A writer only becomes active once every transit holder has left, so an
//! active writer at a node excludes all activity below it.
//!
//! All waits are uninterruptible: there is no timeout and no cancellation
//! token. A thread blocked in admission stays blocked until capacity frees.

use parking_lot::{Condvar, Mutex};
use std::fmt;

#[derive(Debug)]
struct AdmissionState {
    quota: usize,
    readers: usize,
    active_writers: usize,
    waiting_writers: usize,
}

/// Reader/writer admission monitor bound to one group path node.
pub struct AdmissionSemaphore {
    state: Mutex<AdmissionState>,
    changed: Condvar,
}

impl AdmissionSemaphore {
    /// Creates a node admitting at most `quota` concurrent exclusive holders.
    ///
    /// A quota of zero is raised to one; configuration validation rejects it
    /// before a node is ever built.
    pub fn new(quota: usize) -> Self {
        Self {
            state: Mutex::new(AdmissionState {
                quota: quota.max(1),
                readers: 0,
                active_writers: 0,
                waiting_writers: 0,
            }),
            changed: Condvar::new(),
        }
    }

    /// Blocks until this job may hold the node exclusively.
    pub fn enter_exclusive(&self) {
        let mut state = self.state.lock();
        state.waiting_writers += 1;
        while state.active_writers >= state.quota || state.readers > 0 {
            self.changed.wait(&mut state);
        }
        state.waiting_writers -= 1;
        state.active_writers += 1;
    }

    pub fn exit_exclusive(&self) {
        let mut state = self.state.lock();
        debug_assert!(state.active_writers > 0, "exit_exclusive without holder");
        state.active_writers = state.active_writers.saturating_sub(1);
        drop(state);
        self.changed.notify_all();
    }

    /// Blocks while any writer is active or waiting at this node.
    pub fn enter_transit(&self) {
        let mut state = self.state.lock();
        while state.active_writers > 0 || state.waiting_writers > 0 {
            self.changed.wait(&mut state);
        }
        state.readers += 1;
    }

    pub fn exit_transit(&self) {
        let mut state = self.state.lock();
        debug_assert!(state.readers > 0, "exit_transit without holder");
        state.readers = state.readers.saturating_sub(1);
        let wake = state.readers == 0 && state.waiting_writers > 0;
        drop(state);
        if wake {
            self.changed.notify_all();
        }
    }

    /// Configured maximum of concurrent exclusive holders.
    pub fn quota(&self) -> usize {
        self.state.lock().quota
    }

    /// Replaces the exclusive quota. Current holders are never evicted; a
    /// lower quota only holds back new writers until enough have left.
    pub fn set_quota(&self, quota: usize) {
        self.state.lock().quota = quota.max(1);
        self.changed.notify_all();
    }

    /// Current transit holders.
    pub fn readers(&self) -> usize {
        self.state.lock().readers
    }

    /// Current exclusive holders.
    pub fn writers(&self) -> usize {
        self.state.lock().active_writers
    }

    /// Writers blocked waiting for admission.
    pub fn waiting_writers(&self) -> usize {
        self.state.lock().waiting_writers
    }
}

impl fmt::Debug for AdmissionSemaphore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("AdmissionSemaphore")
            .field("quota", &state.quota)
            .field("readers", &state.readers)
            .field("writers", &state.active_writers)
            .field("waiting_writers", &state.waiting_writers)
            .finish()
    }
}
