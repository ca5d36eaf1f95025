//! Job executor core.
//!
//! [`JobExecutor`] routes each submitted job to a pool:
//!
//! - no group path: the [`SinglePool`], one thread per job
//! - group path `P`: the [`GroupedPool`] for `P`, created on first use from
//!   `P`'s configuration
//!
//! It owns every piece of shared state (pool registry, lock tree, job index)
//! and tears it down in [`dispose`](JobExecutor::dispose).

use super::config::ExecutorConfig;
use super::error::ExecutorError;
use super::grouped::GroupedPool;
use super::index::JobIndex;
use super::job::{JobId, SharedJob};
use super::lock_tree::LockTree;
use super::path::GroupPath;
use super::single::SinglePool;
use super::telemetry::{NullTelemetrySink, TelemetryEvent, TelemetrySink};
use super::worker_pool::PoolStatus;
use crate::config::GroupConfigurationSource;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

// =============================================================================
// Job Executor
// =============================================================================

/// Hierarchical grouped job executor.
///
/// Submission is fire-and-forget: [`execute`](Self::execute) returns once a
/// pool owns the job. A grouped job may then still wait for a worker and
/// for admission along its path.
pub struct JobExecutor {
    config: ExecutorConfig,

    /// Per-path settings, read when a path is seen for the first time.
    configurations: Arc<dyn GroupConfigurationSource>,

    /// Admission nodes for every path a pool exists for, plus ancestors.
    lock_tree: LockTree,

    /// Jobs by id.
    index: Arc<JobIndex>,

    /// Grouped pools by exact path.
    pools: DashMap<GroupPath, Arc<GroupedPool>>,

    standalone: SinglePool,

    telemetry: Arc<dyn TelemetrySink>,

    /// Read-held by `execute` for routing and submission, write-held by
    /// `dispose`.
    disposed: RwLock<bool>,
}

impl JobExecutor {
    /// Creates a new job executor.
    pub fn new(
        config: ExecutorConfig,
        configurations: Arc<dyn GroupConfigurationSource>,
    ) -> Self {
        Self::with_telemetry(config, configurations, Arc::new(NullTelemetrySink))
    }

    /// Creates a new job executor with a telemetry sink.
    pub fn with_telemetry(
        config: ExecutorConfig,
        configurations: Arc<dyn GroupConfigurationSource>,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        let index = Arc::new(JobIndex::new());
        let standalone = SinglePool::new(
            config.standalone_keep_alive,
            config.standalone_priority,
            Arc::clone(&index),
            Arc::clone(&telemetry),
        );

        Self {
            lock_tree: LockTree::new(Arc::clone(&configurations)),
            configurations,
            index,
            pools: DashMap::new(),
            standalone,
            telemetry,
            disposed: RwLock::new(false),
            config,
        }
    }

    /// Submits `job` for execution.
    ///
    /// # Errors
    ///
    /// - [`ExecutorError::Disposed`] after [`dispose`](Self::dispose); nothing
    ///   is touched.
    /// - [`ExecutorError::Configuration`] if the job's group settings cannot
    ///   be resolved; nothing is registered.
    /// - [`ExecutorError::Rejected`] if the pool refused the job; its id
    ///   registration has been rolled back.
    pub fn execute(&self, job: SharedJob) -> Result<(), ExecutorError> {
        let disposed = self.disposed.read();
        if *disposed {
            return Err(ExecutorError::Disposed);
        }

        let path = job.group_path();
        let job_id = job.request().id().cloned();
        let name = job.name().to_string();

        let result = match &path {
            None => self.standalone.submit(job),
            Some(path) => self
                .grouped_pool(path)
                .and_then(|pool| pool.submit(job)),
        };
        drop(disposed);

        match &result {
            Ok(()) => {
                self.telemetry.emit(TelemetryEvent::JobSubmitted { job_id, name, path });
            }
            Err(ExecutorError::Rejected { reason, .. }) => {
                self.telemetry.emit(TelemetryEvent::JobRejected {
                    job_id,
                    path,
                    reason: reason.clone(),
                });
            }
            Err(e) => {
                warn!(job = %name, job_id = ?job_id, path = ?path, error = %e, "Job not submitted");
            }
        }
        result
    }

    /// Returns the pool for `path`, building it on first use.
    fn grouped_pool(&self, path: &GroupPath) -> Result<Arc<GroupedPool>, ExecutorError> {
        if let Some(pool) = self.pools.get(path) {
            return Ok(Arc::clone(pool.value()));
        }

        let configuration = self.configurations.configuration(path)?;
        let chain = self.lock_tree.chain_with(path, &configuration)?;

        let pool = match self.pools.entry(path.clone()) {
            Entry::Occupied(entry) => Arc::clone(entry.get()),
            Entry::Vacant(entry) => {
                let pool = Arc::new(GroupedPool::new(
                    path.clone(),
                    configuration,
                    chain,
                    Arc::clone(&self.index),
                    Arc::clone(&self.telemetry),
                ));
                entry.insert(Arc::clone(&pool));
                self.telemetry.emit(TelemetryEvent::PoolCreated {
                    path: path.clone(),
                    pool_size: configuration.pool_size,
                    priority: configuration.priority,
                    keep_alive: configuration.keep_alive,
                });
                pool
            }
        };
        Ok(pool)
    }

    /// Returns the job known under `id`.
    ///
    /// A standalone job wins; otherwise the oldest grouped job with that id
    /// that has not finished yet.
    pub fn get_job(&self, id: &JobId) -> Option<SharedJob> {
        self.index.get(id)
    }

    /// Jobs currently running with group path exactly `path`.
    pub fn get_current_jobs(&self, path: &GroupPath) -> Vec<SharedJob> {
        self.pools
            .get(path)
            .map(|pool| pool.value().running_jobs())
            .unwrap_or_default()
    }

    /// One of the jobs currently running with group path exactly `path`.
    pub fn get_current_job(&self, path: &GroupPath) -> Option<SharedJob> {
        self.get_current_jobs(path).into_iter().next()
    }

    /// Shuts every pool down.
    ///
    /// Subsequent [`execute`](Self::execute) calls fail with
    /// [`ExecutorError::Disposed`]. Queued jobs that never started are
    /// dropped along with their index entries. Running jobs see their
    /// context cancelled but are not interrupted. Idempotent.
    pub fn dispose(&self) {
        let mut disposed = self.disposed.write();
        if *disposed {
            return;
        }
        *disposed = true;

        let mut drained_jobs = self.standalone.shutdown_now();
        let pools: Vec<Arc<GroupedPool>> = self
            .pools
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        for pool in &pools {
            drained_jobs += pool.shutdown_now();
        }

        info!(pools = pools.len(), drained_jobs, "Job executor disposed");
        self.telemetry.emit(TelemetryEvent::ExecutorDisposed {
            pools: pools.len(),
            drained_jobs,
        });
    }

    pub fn is_disposed(&self) -> bool {
        *self.disposed.read()
    }

    /// Waits up to `timeout` for every worker thread to exit.
    ///
    /// Workers exit after their pool is disposed or after idling for their
    /// keep-alive. Returns false if threads are still alive at the deadline.
    pub fn await_termination(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let remaining = || {
            deadline.map_or(Duration::MAX, |deadline| {
                deadline.saturating_duration_since(Instant::now())
            })
        };

        if !self.standalone.await_termination(remaining()) {
            return false;
        }
        let pools: Vec<Arc<GroupedPool>> = self
            .pools
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        pools.iter().all(|pool| {
            let terminated = pool.await_termination(remaining());
            if !terminated {
                debug!(path = %pool.path(), status = ?pool.status(), "Pool still has workers");
            }
            terminated
        })
    }

    /// Status of the pool for exactly `path`, if one has been created.
    pub fn pool_status(&self, path: &GroupPath) -> Option<PoolStatus> {
        self.pools.get(path).map(|pool| pool.value().status())
    }

    pub fn standalone_status(&self) -> PoolStatus {
        self.standalone.status()
    }

    /// Paths that have a grouped pool, sorted.
    pub fn group_paths(&self) -> Vec<GroupPath> {
        let mut paths: Vec<GroupPath> = self.pools.iter().map(|entry| entry.key().clone()).collect();
        paths.sort();
        paths
    }

    pub fn lock_tree(&self) -> &LockTree {
        &self.lock_tree
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }
}

impl Drop for JobExecutor {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for JobExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobExecutor")
            .field("pools", &self.pools.len())
            .field("index", &self.index)
            .field("standalone", &self.standalone.status())
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}
