//! Lookup of known jobs by id.
//!
//! Standalone jobs are keyed one per id; a later submission with the same id
//! replaces the earlier entry. Grouped jobs sharing an id queue up in
//! submission order and lookups return the oldest one.
//!
//! Removal is identity-checked: a finishing job only removes its own entry,
//! never a newer job that reused its id.

use super::job::{same_job, JobId, SharedJob};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::VecDeque;

#[derive(Default)]
pub struct JobIndex {
    standalone: DashMap<JobId, SharedJob>,
    grouped: DashMap<JobId, VecDeque<SharedJob>>,
}

impl JobIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_standalone(&self, id: JobId, job: SharedJob) {
        self.standalone.insert(id, job);
    }

    /// Removes the standalone entry for `id` if it still refers to `job`.
    pub fn remove_standalone_if_same(&self, id: &JobId, job: &SharedJob) -> bool {
        self.standalone
            .remove_if(id, |_, current| same_job(current, job))
            .is_some()
    }

    /// Appends `job` to the FIFO for `id`.
    pub fn push_grouped(&self, id: JobId, job: SharedJob) {
        self.grouped.entry(id).or_default().push_back(job);
    }

    /// Pops the head of the FIFO for `id` if the head is `job`.
    ///
    /// Runs when a grouped job finishes; at most one instance is removed, so
    /// a second call for the same job is a no-op.
    pub fn pop_grouped_if_head(&self, id: &JobId, job: &SharedJob) -> bool {
        match self.grouped.entry(id.clone()) {
            Entry::Occupied(mut entry) => {
                let is_head = entry
                    .get()
                    .front()
                    .is_some_and(|head| same_job(head, job));
                if is_head {
                    entry.get_mut().pop_front();
                    if entry.get().is_empty() {
                        entry.remove();
                    }
                }
                is_head
            }
            Entry::Vacant(_) => false,
        }
    }

    /// Removes `job` from the FIFO for `id` wherever it sits.
    ///
    /// Used to roll back a submission that never reached a worker.
    pub fn remove_grouped_instance(&self, id: &JobId, job: &SharedJob) -> bool {
        match self.grouped.entry(id.clone()) {
            Entry::Occupied(mut entry) => {
                let queue = entry.get_mut();
                let before = queue.len();
                if let Some(position) = queue.iter().position(|queued| same_job(queued, job)) {
                    queue.remove(position);
                }
                let removed = queue.len() < before;
                if entry.get().is_empty() {
                    entry.remove();
                }
                removed
            }
            Entry::Vacant(_) => false,
        }
    }

    /// Returns the job known under `id`.
    ///
    /// Standalone entries win over grouped ones; for grouped ids the oldest
    /// pending job is returned.
    pub fn get(&self, id: &JobId) -> Option<SharedJob> {
        if let Some(job) = self.standalone.get(id) {
            return Some(job.value().clone());
        }
        self.grouped
            .get(id)
            .and_then(|queue| queue.value().front().cloned())
    }

    pub fn contains(&self, id: &JobId) -> bool {
        self.standalone.contains_key(id) || self.grouped.contains_key(id)
    }

    pub fn standalone_len(&self) -> usize {
        self.standalone.len()
    }

    /// Number of grouped jobs across all ids.
    pub fn grouped_len(&self) -> usize {
        self.grouped.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.standalone.is_empty() && self.grouped.is_empty()
    }
}

impl std::fmt::Debug for JobIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobIndex")
            .field("standalone", &self.standalone_len())
            .field("grouped", &self.grouped_len())
            .finish()
    }
}
