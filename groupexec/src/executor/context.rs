//! Job execution context.
//!
//! The [`JobContext`] is handed to [`Job::run`](super::Job::run). It carries
//! the cancellation token of the pool the job runs on, which is cancelled when
//! the executor is disposed. Jobs are never preempted; a long-running body is
//! expected to poll `is_cancelled()` and return.

use super::path::GroupPath;
use tokio_util::sync::CancellationToken;

/// Execution context passed to a running job.
#[derive(Clone, Debug)]
pub struct JobContext {
    group_path: Option<GroupPath>,
    thread_name: String,
    cancellation_token: CancellationToken,
}

impl JobContext {
    pub(crate) fn new(
        group_path: Option<GroupPath>,
        thread_name: String,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            group_path,
            thread_name,
            cancellation_token,
        }
    }

    /// Returns true once the executor has been disposed.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    /// Returns the group the job was admitted under, `None` for standalone jobs.
    pub fn group_path(&self) -> Option<&GroupPath> {
        self.group_path.as_ref()
    }

    /// Name of the pool thread running the job.
    pub fn thread_name(&self) -> &str {
        &self.thread_name
    }

    /// Returns a clone of the cancellation token, for handing to sub-work.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }
}
