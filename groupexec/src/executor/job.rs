//! Job trait and related types.
//!
//! A job is a unit of blocking work. It may carry an identifier (used to look
//! it up while it is known to the executor) and a [`GroupPath`] that decides
//! which concurrency quota it runs under.
//!
//! # Example
//!
//! ```
//! use groupexec::executor::{GroupPath, Job, JobContext, JobId, Request};
//!
//! struct IndexJob {
//!     request: Request,
//!     group: GroupPath,
//! }
//!
//! impl Job for IndexJob {
//!     fn request(&self) -> &Request { &self.request }
//!     fn group_path(&self) -> Option<GroupPath> { Some(self.group.clone()) }
//!     fn name(&self) -> &str { "IndexJob" }
//!     fn run(&self, ctx: &JobContext) {
//!         if ctx.is_cancelled() {
//!             return;
//!         }
//!         // ... index ...
//!     }
//! }
//!
//! let job = IndexJob {
//!     request: Request::new().with_id(JobId::new(["index", "site-A"])),
//!     group: GroupPath::new(["site-A", "indexing"]),
//! };
//! assert_eq!(job.request().id().unwrap().to_string(), "index/site-A");
//! ```

use super::context::JobContext;
use super::path::GroupPath;
use std::fmt;
use std::sync::Arc;

/// Identifier of a job: an ordered list of segments.
///
/// Ids are lookup keys, not globally unique. Several grouped jobs may share
/// an id; the executor keeps them in submission order.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct JobId(Vec<String>);

impl JobId {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Debug for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JobId({})", self)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(vec![s.to_string()])
    }
}

impl From<Vec<String>> for JobId {
    fn from(segments: Vec<String>) -> Self {
        Self(segments)
    }
}

/// The request a job was created from.
///
/// The executor only reads the id; everything else about a request belongs
/// to the job implementation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Request {
    id: Option<JobId>,
}

impl Request {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: impl Into<JobId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn id(&self) -> Option<&JobId> {
        self.id.as_ref()
    }
}

/// A unit of work submitted to the [`JobExecutor`](super::JobExecutor).
///
/// # Lifecycle
///
/// 1. The caller builds the job and submits it with `JobExecutor::execute()`
/// 2. Standalone jobs (no group path) get a dedicated thread immediately
/// 3. Grouped jobs wait in their group's pool, then for admission along
///    their path (see [`LockTree`](super::LockTree))
/// 4. `run()` is called exactly once on a pool thread
/// 5. Locks and index entries are released whether `run()` returns or panics
///
/// Status reporting is the job's own business; the executor never inspects
/// or mutates it.
pub trait Job: Send + Sync + 'static {
    /// Returns the request this job serves.
    fn request(&self) -> &Request;

    /// Returns the group this job runs under, or `None` for a standalone job.
    fn group_path(&self) -> Option<GroupPath> {
        None
    }

    /// Human-readable name for logs and telemetry.
    fn name(&self) -> &str {
        "job"
    }

    /// Executes the job body on a pool thread.
    ///
    /// Long-running bodies should poll [`JobContext::is_cancelled`] and
    /// return early once the executor has been disposed.
    fn run(&self, ctx: &JobContext);
}

/// Shared handle to a submitted job.
pub type SharedJob = Arc<dyn Job>;

/// Returns true if both handles point at the same job instance.
///
/// Compares allocation addresses only, so two handles to one job compare
/// equal even if they were coerced through different vtables.
pub fn same_job(a: &SharedJob, b: &SharedJob) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop(Request);

    impl Job for Noop {
        fn request(&self) -> &Request {
            &self.0
        }

        fn run(&self, _ctx: &JobContext) {}
    }

    #[test]
    fn test_job_id_display() {
        let id = JobId::new(["refactor", "space", "page"]);
        assert_eq!(id.to_string(), "refactor/space/page");
        assert_eq!(format!("{:?}", id), "JobId(refactor/space/page)");
    }

    #[test]
    fn test_request_without_id() {
        let request = Request::new();
        assert!(request.id().is_none());
    }

    #[test]
    fn test_default_job_is_standalone() {
        let job = Noop(Request::new().with_id("x"));
        assert!(job.group_path().is_none());
        assert_eq!(job.name(), "job");
        assert_eq!(job.request().id(), Some(&JobId::from("x")));
    }

    #[test]
    fn test_same_job_is_instance_identity() {
        let a: SharedJob = Arc::new(Noop(Request::new().with_id("x")));
        let b: SharedJob = Arc::new(Noop(Request::new().with_id("x")));
        let a2 = Arc::clone(&a);

        assert!(same_job(&a, &a2));
        assert!(!same_job(&a, &b));
    }
}
