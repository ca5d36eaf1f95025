//! Hierarchical grouped job executor.
//!
//! Runs blocking jobs on OS threads. Jobs that name a [`GroupPath`] share a
//! bounded pool per path and are admitted through a tree of per-path locks;
//! jobs without one each get a dedicated thread.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       JobExecutor                            │
//! │  execute / get_job / get_current_jobs / dispose              │
//! ├──────────────────────────────┬──────────────────────────────┤
//! │  GroupedPool (one per path)  │  SinglePool                  │
//! │  bounded WorkerPool          │  unbounded WorkerPool        │
//! │  hooks: LockChain lock/unlock│  hook: index cleanup         │
//! ├──────────────────────────────┴──────────────────────────────┤
//! │  LockTree: AdmissionSemaphore per path   JobIndex: id → job  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Admission
//!
//! A job at `a/b` passes through `<root>` and `a` in transit mode and then
//! holds `a/b` exclusively. Consequences:
//!
//! - at most `pool_size(P)` jobs with path exactly `P` run at once
//! - a job at `P` never runs alongside a job at a descendant of `P`
//! - jobs at unrelated paths never wait for each other
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use groupexec::config::{GroupConfiguration, StaticGroupConfigurations};
//! use groupexec::executor::{
//!     ExecutorConfig, GroupPath, Job, JobContext, JobExecutor, JobId, Request,
//! };
//!
//! struct Reindex {
//!     request: Request,
//!     group: GroupPath,
//! }
//!
//! impl Job for Reindex {
//!     fn request(&self) -> &Request { &self.request }
//!     fn group_path(&self) -> Option<GroupPath> { Some(self.group.clone()) }
//!     fn run(&self, _ctx: &JobContext) {}
//! }
//!
//! let groups = StaticGroupConfigurations::new()
//!     .with_group(GroupPath::new(["wiki"]), GroupConfiguration::with_pool_size(2));
//! let executor = JobExecutor::new(ExecutorConfig::default(), Arc::new(groups));
//!
//! executor
//!     .execute(Arc::new(Reindex {
//!         request: Request::new().with_id(JobId::new(["reindex", "wiki"])),
//!         group: GroupPath::new(["wiki"]),
//!     }))
//!     .unwrap();
//!
//! executor.dispose();
//! ```

mod admission;
mod config;
mod context;
mod core;
mod error;
mod grouped;
mod index;
mod job;
mod lock_tree;
mod path;
mod single;
mod telemetry;
mod worker_pool;

// Paths and jobs
pub use job::{same_job, Job, JobId, Request, SharedJob};
pub use path::{GroupPath, PATH_SEPARATOR};

// Context
pub use context::JobContext;

// Admission
pub use admission::AdmissionSemaphore;
pub use lock_tree::{LockChain, LockTree};

// Pools
pub use grouped::GroupedPool;
pub use single::{SinglePool, STANDALONE_POOL_NAME};
pub use worker_pool::{
    AcquireHook, PoolStatus, ReleaseHook, RunOutcome, WorkerPool, WorkerPoolConfig,
};

// Bookkeeping
pub use index::JobIndex;

// Executor
pub use config::ExecutorConfig;
pub use core::JobExecutor;
pub use error::ExecutorError;

// Telemetry
pub use telemetry::{
    MultiplexTelemetrySink, NullTelemetrySink, TelemetryEvent, TelemetrySink, TracingTelemetrySink,
};
