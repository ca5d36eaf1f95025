//! Bounded pool for the jobs of one group path.
//!
//! A [`GroupedPool`] wraps a [`WorkerPool`] sized from the path's
//! configuration and injects the lock-tree protocol into its hooks: workers
//! lock the path's [`LockChain`] before the body runs and unlock it after,
//! whether the body returned or panicked.

use super::error::ExecutorError;
use super::index::JobIndex;
use super::job::{same_job, SharedJob};
use super::lock_tree::LockChain;
use super::path::GroupPath;
use super::telemetry::TelemetrySink;
use super::worker_pool::{PoolStatus, RunOutcome, WorkerPool, WorkerPoolConfig};
use crate::config::GroupConfiguration;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

pub struct GroupedPool {
    path: GroupPath,
    configuration: GroupConfiguration,
    index: Arc<JobIndex>,
    running: Arc<Mutex<Vec<SharedJob>>>,
    /// Serializes id-queue insertion with hand-off so that a group's id
    /// queues follow submission order.
    submit_lock: Mutex<()>,
    pool: WorkerPool,
}

impl GroupedPool {
    pub fn new(
        path: GroupPath,
        configuration: GroupConfiguration,
        chain: LockChain,
        index: Arc<JobIndex>,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        let running: Arc<Mutex<Vec<SharedJob>>> = Arc::new(Mutex::new(Vec::new()));

        let acquire_chain = chain.clone();
        let acquire_running = Arc::clone(&running);
        let on_acquire = Box::new(move |job: &SharedJob| {
            acquire_chain.lock();
            trace!(path = %acquire_chain.path(), job = job.name(), "Admitted");
            acquire_running.lock().push(Arc::clone(job));
        });

        let release_running = Arc::clone(&running);
        let release_index = Arc::clone(&index);
        let on_release = Box::new(move |job: &SharedJob, _outcome: &RunOutcome| {
            chain.unlock();
            release_running.lock().retain(|running| !same_job(running, job));
            if let Some(id) = job.request().id() {
                if !release_index.pop_grouped_if_head(id, job) {
                    // Finished ahead of an older job with the same id.
                    release_index.remove_grouped_instance(id, job);
                }
            }
        });

        let pool = WorkerPool::new(
            WorkerPoolConfig {
                name: path.to_string(),
                max_threads: Some(configuration.pool_size),
                keep_alive: configuration.keep_alive,
                priority: configuration.priority,
                group_path: Some(path.clone()),
            },
            on_acquire,
            on_release,
            telemetry,
        );

        Self {
            path,
            configuration,
            index,
            running,
            submit_lock: Mutex::new(()),
            pool,
        }
    }

    pub fn path(&self) -> &GroupPath {
        &self.path
    }

    /// Configuration this pool was built with.
    pub fn configuration(&self) -> &GroupConfiguration {
        &self.configuration
    }

    /// Registers `job` under its id and hands it to the pool.
    ///
    /// If the pool refuses the job, the id registration is rolled back
    /// before the error is returned.
    pub fn submit(&self, job: SharedJob) -> Result<(), ExecutorError> {
        let _guard = self.submit_lock.lock();
        let id = job.request().id().cloned();

        if let Some(id) = &id {
            self.index.push_grouped(id.clone(), Arc::clone(&job));
        }

        match self.pool.submit(Arc::clone(&job)) {
            Ok(()) => Ok(()),
            Err(e) => {
                if let Some(id) = &id {
                    self.index.remove_grouped_instance(id, &job);
                }
                debug!(path = %self.path, error = %e, "Rolled back rejected job");
                Err(e)
            }
        }
    }

    /// Snapshot of the admitted jobs currently running under this exact path.
    pub fn running_jobs(&self) -> Vec<SharedJob> {
        self.running.lock().clone()
    }

    pub fn status(&self) -> PoolStatus {
        self.pool.status()
    }

    /// Shuts the pool down and forgets queued jobs that never started.
    ///
    /// Returns how many queued jobs were dropped.
    pub fn shutdown_now(&self) -> usize {
        let _guard = self.submit_lock.lock();
        let drained = self.pool.shutdown_now();
        for job in &drained {
            if let Some(id) = job.request().id() {
                self.index.remove_grouped_instance(id, job);
            }
        }
        drained.len()
    }

    pub fn await_termination(&self, timeout: Duration) -> bool {
        self.pool.await_termination(timeout)
    }
}

impl std::fmt::Debug for GroupedPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupedPool")
            .field("path", &self.path)
            .field("pool_size", &self.configuration.pool_size)
            .field("status", &self.pool.status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticGroupConfigurations;
    use crate::executor::context::JobContext;
    use crate::executor::job::{Job, JobId, Request};
    use crate::executor::lock_tree::LockTree;
    use crate::executor::telemetry::NullTelemetrySink;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Instant;

    const WAIT: Duration = Duration::from_secs(5);

    struct GateJob {
        request: Request,
        started: mpsc::Sender<()>,
        gate: Mutex<Option<mpsc::Receiver<()>>>,
    }

    impl Job for GateJob {
        fn request(&self) -> &Request {
            &self.request
        }

        fn run(&self, _ctx: &JobContext) {
            let _ = self.started.send(());
            if let Some(gate) = self.gate.lock().take() {
                let _ = gate.recv();
            }
        }
    }

    fn gate_job(id: &str, started: &mpsc::Sender<()>) -> (SharedJob, mpsc::Sender<()>) {
        let (release, gate) = mpsc::channel();
        let job: SharedJob = Arc::new(GateJob {
            request: Request::new().with_id(id),
            started: started.clone(),
            gate: Mutex::new(Some(gate)),
        });
        (job, release)
    }

    fn grouped_pool(pool_size: usize) -> (GroupedPool, Arc<JobIndex>) {
        let path: GroupPath = "a".parse().unwrap();
        let configuration = GroupConfiguration::with_pool_size(pool_size);
        let configurations =
            StaticGroupConfigurations::new().with_group(path.clone(), configuration);
        let tree = LockTree::new(Arc::new(configurations));
        let chain = tree.chain(&path).unwrap();
        let index = Arc::new(JobIndex::new());
        let pool = GroupedPool::new(
            path,
            configuration,
            chain,
            Arc::clone(&index),
            Arc::new(NullTelemetrySink),
        );
        (pool, index)
    }

    fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + WAIT;
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        condition()
    }

    #[test]
    fn test_running_jobs_and_cleanup() {
        let (pool, index) = grouped_pool(1);
        let (started_tx, started_rx) = mpsc::channel();
        let (job, release) = gate_job("x", &started_tx);

        pool.submit(Arc::clone(&job)).unwrap();
        started_rx.recv_timeout(WAIT).unwrap();

        let running = pool.running_jobs();
        assert_eq!(running.len(), 1);
        assert!(same_job(&running[0], &job));
        assert!(index.contains(&JobId::from("x")));

        release.send(()).unwrap();
        assert!(wait_for(|| pool.running_jobs().is_empty()));
        assert!(wait_for(|| index.is_empty()));
        pool.shutdown_now();
    }

    #[test]
    fn test_out_of_order_finish_cleans_index() {
        let (pool, index) = grouped_pool(2);
        let (started_tx, started_rx) = mpsc::channel();
        let (older, release_older) = gate_job("x", &started_tx);
        let (newer, release_newer) = gate_job("x", &started_tx);

        pool.submit(Arc::clone(&older)).unwrap();
        pool.submit(Arc::clone(&newer)).unwrap();
        started_rx.recv_timeout(WAIT).unwrap();
        started_rx.recv_timeout(WAIT).unwrap();

        release_newer.send(()).unwrap();
        assert!(wait_for(|| index.grouped_len() == 1));
        assert!(same_job(&index.get(&JobId::from("x")).unwrap(), &older));

        release_older.send(()).unwrap();
        assert!(wait_for(|| index.is_empty()));
        pool.shutdown_now();
    }

    #[test]
    fn test_rejected_submission_rolls_back_index() {
        let (pool, index) = grouped_pool(1);
        pool.shutdown_now();

        let (started_tx, _started_rx) = mpsc::channel();
        let (job, _release) = gate_job("x", &started_tx);
        let err = pool.submit(job).unwrap_err();

        assert!(matches!(err, ExecutorError::Rejected { .. }));
        assert!(index.is_empty());
    }

    #[test]
    fn test_shutdown_drops_queued_ids() {
        let (pool, index) = grouped_pool(1);
        let (started_tx, started_rx) = mpsc::channel();
        let (running, release) = gate_job("running", &started_tx);
        let (queued, _never) = gate_job("queued", &started_tx);

        pool.submit(running).unwrap();
        started_rx.recv_timeout(WAIT).unwrap();
        pool.submit(queued).unwrap();
        assert!(index.contains(&JobId::from("queued")));

        assert_eq!(pool.shutdown_now(), 1);
        assert!(!index.contains(&JobId::from("queued")));

        release.send(()).unwrap();
        assert!(pool.await_termination(WAIT));
        assert!(index.is_empty());
    }
}
