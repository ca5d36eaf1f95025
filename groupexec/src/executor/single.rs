//! Unbounded pool for standalone jobs.
//!
//! Jobs without a group path each get their own thread: the pool has no
//! upper bound and never queues beyond its idle workers. No admission
//! control applies.

use super::error::ExecutorError;
use super::index::JobIndex;
use super::job::SharedJob;
use super::telemetry::TelemetrySink;
use super::worker_pool::{PoolStatus, RunOutcome, WorkerPool, WorkerPoolConfig};
use std::sync::Arc;
use std::time::Duration;

/// Thread name prefix of standalone workers.
pub const STANDALONE_POOL_NAME: &str = "standalone-job";

pub struct SinglePool {
    index: Arc<JobIndex>,
    pool: WorkerPool,
}

impl SinglePool {
    pub fn new(
        keep_alive: Duration,
        priority: i32,
        index: Arc<JobIndex>,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        let release_index = Arc::clone(&index);
        let on_release = Box::new(move |job: &SharedJob, _outcome: &RunOutcome| {
            if let Some(id) = job.request().id() {
                release_index.remove_standalone_if_same(id, job);
            }
        });

        let pool = WorkerPool::new(
            WorkerPoolConfig {
                name: STANDALONE_POOL_NAME.to_string(),
                max_threads: None,
                keep_alive,
                priority,
                group_path: None,
            },
            Box::new(|_: &SharedJob| {}),
            on_release,
            telemetry,
        );

        Self { index, pool }
    }

    /// Indexes `job` under its id and starts it on a dedicated thread.
    ///
    /// The index entry is removed again if no thread could take the job.
    pub fn submit(&self, job: SharedJob) -> Result<(), ExecutorError> {
        let id = job.request().id().cloned();
        if let Some(id) = &id {
            self.index.insert_standalone(id.clone(), Arc::clone(&job));
        }

        self.pool.submit(Arc::clone(&job)).inspect_err(|_| {
            if let Some(id) = &id {
                self.index.remove_standalone_if_same(id, &job);
            }
        })
    }

    pub fn status(&self) -> PoolStatus {
        self.pool.status()
    }

    pub fn shutdown_now(&self) -> usize {
        let drained = self.pool.shutdown_now();
        for job in &drained {
            if let Some(id) = job.request().id() {
                self.index.remove_standalone_if_same(id, job);
            }
        }
        drained.len()
    }

    pub fn await_termination(&self, timeout: Duration) -> bool {
        self.pool.await_termination(timeout)
    }
}

impl std::fmt::Debug for SinglePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinglePool")
            .field("status", &self.pool.status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NORM_PRIORITY;
    use crate::executor::context::JobContext;
    use crate::executor::job::{same_job, Job, JobId, Request};
    use crate::executor::telemetry::NullTelemetrySink;
    use parking_lot::Mutex;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Instant;

    const WAIT: Duration = Duration::from_secs(5);

    struct GateJob {
        request: Request,
        started: mpsc::Sender<String>,
        gate: Mutex<Option<mpsc::Receiver<()>>>,
    }

    impl Job for GateJob {
        fn request(&self) -> &Request {
            &self.request
        }

        fn run(&self, ctx: &JobContext) {
            let _ = self.started.send(ctx.thread_name().to_string());
            if let Some(gate) = self.gate.lock().take() {
                let _ = gate.recv();
            }
        }
    }

    fn gate_job(id: &str, started: &mpsc::Sender<String>) -> (SharedJob, mpsc::Sender<()>) {
        let (release, gate) = mpsc::channel();
        let job: SharedJob = Arc::new(GateJob {
            request: Request::new().with_id(id),
            started: started.clone(),
            gate: Mutex::new(Some(gate)),
        });
        (job, release)
    }

    fn single_pool() -> (SinglePool, Arc<JobIndex>) {
        let index = Arc::new(JobIndex::new());
        let pool = SinglePool::new(
            Duration::from_secs(60),
            NORM_PRIORITY,
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
    fn test_each_job_gets_own_thread() {
        let (pool, _) = single_pool();
        let (started_tx, started_rx) = mpsc::channel();
        let (a, release_a) = gate_job("a", &started_tx);
        let (b, release_b) = gate_job("b", &started_tx);

        pool.submit(a).unwrap();
        pool.submit(b).unwrap();

        let mut names = vec![
            started_rx.recv_timeout(WAIT).unwrap(),
            started_rx.recv_timeout(WAIT).unwrap(),
        ];
        names.sort();
        assert_eq!(names, vec!["standalone-job-0", "standalone-job-1"]);

        release_a.send(()).unwrap();
        release_b.send(()).unwrap();
        pool.shutdown_now();
        assert!(pool.await_termination(WAIT));
    }

    #[test]
    fn test_finished_job_does_not_evict_replacement() {
        let (pool, index) = single_pool();
        let (started_tx, started_rx) = mpsc::channel();
        let (first, release_first) = gate_job("x", &started_tx);
        let (second, release_second) = gate_job("x", &started_tx);
        let id = JobId::from("x");

        pool.submit(Arc::clone(&first)).unwrap();
        pool.submit(Arc::clone(&second)).unwrap();
        started_rx.recv_timeout(WAIT).unwrap();
        started_rx.recv_timeout(WAIT).unwrap();
        assert!(same_job(&index.get(&id).unwrap(), &second));

        release_first.send(()).unwrap();
        assert!(wait_for(|| pool.status().active == 1));
        assert!(same_job(&index.get(&id).unwrap(), &second));

        release_second.send(()).unwrap();
        assert!(wait_for(|| index.is_empty()));
        pool.shutdown_now();
    }

    #[test]
    fn test_rejected_after_shutdown_leaves_no_entry() {
        let (pool, index) = single_pool();
        pool.shutdown_now();

        let (started_tx, _started_rx) = mpsc::channel();
        let (job, _release) = gate_job("x", &started_tx);
        assert!(pool.submit(job).is_err());
        assert!(index.is_empty());
    }
}
