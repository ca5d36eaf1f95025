//! Thread pool with acquire/release hooks.
//!
//! [`WorkerPool`] runs jobs on dedicated OS threads. It backs both the
//! bounded per-group pools and the unbounded standalone pool:
//!
//! ```text
//!   submit(job)
//!       │
//!       ├── idle worker available?  ──► hand job to it
//!       ├── threads < max_threads?  ──► spawn "<name>-<n>" with job
//!       └── otherwise               ──► FIFO queue (bounded pools only)
//!
//!   worker thread
//!       on_acquire(job) ─► job.run(ctx) ─► on_release(job, outcome)
//!       then take next queued job, or idle for keep_alive and exit
//! ```
//!
//! There are no core threads: every worker exits after `keep_alive` without
//! work. An unbounded pool never queues beyond its idle workers, so every
//! accepted job either reaches a waiting thread or gets a new one.

use super::context::JobContext;
use super::error::ExecutorError;
use super::job::SharedJob;
use super::path::GroupPath;
use super::telemetry::{TelemetryEvent, TelemetrySink};
use crate::config::NORM_PRIORITY;
use parking_lot::{Condvar, Mutex};
use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};

/// Nice value change per priority step away from normal.
#[cfg(target_os = "linux")]
const NICE_PER_PRIORITY_STEP: i32 = 2;

/// Called on the worker thread before the job body, may block.
pub type AcquireHook = Box<dyn Fn(&SharedJob) + Send + Sync>;

/// Called on the worker thread after the job body, whatever its outcome.
pub type ReleaseHook = Box<dyn Fn(&SharedJob, &RunOutcome) + Send + Sync>;

/// Settings for one worker pool.
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    /// Prefix of worker thread names.
    pub name: String,
    /// Maximum concurrent worker threads, `None` for unbounded.
    pub max_threads: Option<usize>,
    /// Idle time after which a worker exits.
    pub keep_alive: Duration,
    /// Worker thread priority, 1..=10.
    pub priority: i32,
    /// Group path reported to jobs via [`JobContext`].
    pub group_path: Option<GroupPath>,
}

/// How a job body ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    /// Time spent in the body, excluding admission.
    pub duration: Duration,
    pub panicked: bool,
}

/// Point-in-time counters for a pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStatus {
    /// Live worker threads.
    pub threads: usize,
    /// Workers waiting for work.
    pub idle: usize,
    /// Jobs taken by a worker (waiting for admission or running).
    pub active: usize,
    /// Jobs waiting for a free worker.
    pub queued: usize,
}

#[derive(Default)]
struct PoolState {
    queue: VecDeque<SharedJob>,
    threads: usize,
    idle: usize,
    active: usize,
    next_thread_id: usize,
    shutdown: bool,
}

struct PoolShared {
    config: WorkerPoolConfig,
    state: Mutex<PoolState>,
    work_available: Condvar,
    terminated: Condvar,
    on_acquire: AcquireHook,
    on_release: ReleaseHook,
    telemetry: Arc<dyn TelemetrySink>,
    cancellation: CancellationToken,
}

/// OS-thread pool parameterized by acquire/release hooks.
pub struct WorkerPool {
    shared: Arc<PoolShared>,
}

impl WorkerPool {
    pub fn new(
        config: WorkerPoolConfig,
        on_acquire: AcquireHook,
        on_release: ReleaseHook,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        Self {
            shared: Arc::new(PoolShared {
                config,
                state: Mutex::new(PoolState::default()),
                work_available: Condvar::new(),
                terminated: Condvar::new(),
                on_acquire,
                on_release,
                telemetry,
                cancellation: CancellationToken::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.shared.config.name
    }

    pub fn config(&self) -> &WorkerPoolConfig {
        &self.shared.config
    }

    /// Hands `job` to a worker thread.
    ///
    /// Returns once the job is owned by the pool; it does not wait for the
    /// job to be admitted or to run.
    pub fn submit(&self, job: SharedJob) -> Result<(), ExecutorError> {
        let mut state = self.shared.state.lock();
        if state.shutdown {
            return Err(self.rejected("pool is shut down".to_string()));
        }

        if state.idle > state.queue.len() {
            state.queue.push_back(job);
            drop(state);
            self.shared.work_available.notify_one();
            return Ok(());
        }

        let below_max = self
            .shared
            .config
            .max_threads
            .map_or(true, |max| state.threads < max);
        if !below_max {
            state.queue.push_back(job);
            trace!(pool = %self.name(), queued = state.queue.len(), "Job queued");
            return Ok(());
        }

        let thread_name = format!("{}-{}", self.shared.config.name, state.next_thread_id);
        state.next_thread_id += 1;
        state.threads += 1;
        state.active += 1;

        let shared = Arc::clone(&self.shared);
        let worker_name = thread_name.clone();
        let spawned = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || worker_loop(shared, job, worker_name));

        match spawned {
            Ok(_) => {
                debug!(pool = %self.name(), thread = %thread_name, threads = state.threads, "Worker started");
                Ok(())
            }
            Err(e) => {
                state.threads -= 1;
                state.active -= 1;
                Err(self.rejected(format!("failed to spawn worker thread: {}", e)))
            }
        }
    }

    /// Stops accepting jobs and cancels running ones.
    ///
    /// Queued jobs that never reached a worker are removed and returned.
    /// Running jobs see [`JobContext::is_cancelled`] turn true; threads
    /// blocked in admission stay blocked until admitted.
    pub fn shutdown_now(&self) -> Vec<SharedJob> {
        let drained: Vec<SharedJob> = {
            let mut state = self.shared.state.lock();
            state.shutdown = true;
            state.queue.drain(..).collect()
        };
        self.shared.cancellation.cancel();
        self.shared.work_available.notify_all();
        debug!(pool = %self.name(), drained = drained.len(), "Pool shut down");
        drained
    }

    pub fn is_shutdown(&self) -> bool {
        self.shared.state.lock().shutdown
    }

    /// Waits up to `timeout` for every worker thread to exit.
    ///
    /// A timeout too large to express as a deadline waits without one.
    pub fn await_termination(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.shared.state.lock();
        while state.threads > 0 {
            match deadline {
                Some(deadline) => {
                    if self
                        .shared
                        .terminated
                        .wait_until(&mut state, deadline)
                        .timed_out()
                    {
                        return state.threads == 0;
                    }
                }
                None => self.shared.terminated.wait(&mut state),
            }
        }
        true
    }

    pub fn status(&self) -> PoolStatus {
        let state = self.shared.state.lock();
        PoolStatus {
            threads: state.threads,
            idle: state.idle,
            active: state.active,
            queued: state.queue.len(),
        }
    }

    fn rejected(&self, reason: String) -> ExecutorError {
        ExecutorError::Rejected {
            pool: self.shared.config.name.clone(),
            reason,
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("name", &self.shared.config.name)
            .field("status", &self.status())
            .finish()
    }
}

// =============================================================================
// Worker thread
// =============================================================================

fn worker_loop(shared: Arc<PoolShared>, first: SharedJob, thread_name: String) {
    apply_thread_priority(shared.config.priority, &thread_name);

    let mut next = Some(first);
    while let Some(job) = next.take().or_else(|| shared.next_job()) {
        shared.run_job(&job, &thread_name);
        shared.state.lock().active -= 1;
    }
    trace!(thread = %thread_name, "Worker exiting");
}

impl PoolShared {
    /// Takes the next queued job, idling up to `keep_alive`.
    ///
    /// Returns `None` when the worker should exit; the thread count has
    /// already been decremented in that case.
    fn next_job(&self) -> Option<SharedJob> {
        let mut state = self.state.lock();
        let deadline = Instant::now().checked_add(self.config.keep_alive);

        loop {
            if let Some(job) = state.queue.pop_front() {
                state.active += 1;
                return Some(job);
            }
            if state.shutdown {
                break;
            }

            state.idle += 1;
            let timed_out = match deadline {
                Some(deadline) => self
                    .work_available
                    .wait_until(&mut state, deadline)
                    .timed_out(),
                None => {
                    self.work_available.wait(&mut state);
                    false
                }
            };
            state.idle -= 1;

            if timed_out && state.queue.is_empty() {
                break;
            }
        }

        state.threads -= 1;
        if state.threads == 0 {
            self.terminated.notify_all();
        }
        None
    }

    fn run_job(&self, job: &SharedJob, thread_name: &str) {
        (self.on_acquire)(job);

        let job_id = job.request().id().cloned();
        self.emit(
            TelemetryEvent::JobStarted {
                job_id: job_id.clone(),
                path: self.config.group_path.clone(),
                thread: thread_name.to_string(),
            },
            thread_name,
        );

        let ctx = JobContext::new(
            self.config.group_path.clone(),
            thread_name.to_string(),
            self.cancellation.clone(),
        );
        let started = Instant::now();
        let result = panic::catch_unwind(AssertUnwindSafe(|| job.run(&ctx)));
        let outcome = RunOutcome {
            duration: started.elapsed(),
            panicked: result.is_err(),
        };

        if let Err(payload) = result {
            error!(
                thread = %thread_name,
                job = job.name(),
                job_id = ?job_id,
                panic = %panic_message(payload.as_ref()),
                "Job panicked"
            );
        }

        let released = panic::catch_unwind(AssertUnwindSafe(|| (self.on_release)(job, &outcome)));
        if let Err(payload) = released {
            error!(
                thread = %thread_name,
                job = job.name(),
                panic = %panic_message(payload.as_ref()),
                "Release hook panicked"
            );
        }

        self.emit(
            TelemetryEvent::JobFinished {
                job_id,
                path: self.config.group_path.clone(),
                duration: outcome.duration,
                panicked: outcome.panicked,
            },
            thread_name,
        );
    }

    /// Forwards `event` to the sink. A panicking sink is logged, never
    /// allowed to unwind through the worker and skip release.
    fn emit(&self, event: TelemetryEvent, thread_name: &str) {
        let event_type = event.event_type();
        let emitted = panic::catch_unwind(AssertUnwindSafe(|| self.telemetry.emit(event)));
        if let Err(payload) = emitted {
            error!(
                thread = %thread_name,
                event = event_type,
                panic = %panic_message(payload.as_ref()),
                "Telemetry sink panicked"
            );
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Maps a 1..=10 priority onto the calling thread's nice value.
///
/// Below-normal priorities raise the nice value, which any thread may do.
/// Above-normal priorities need privileges; failure is logged and ignored.
#[cfg(target_os = "linux")]
fn apply_thread_priority(priority: i32, thread_name: &str) {
    if priority == NORM_PRIORITY {
        return;
    }
    let nice = (NORM_PRIORITY - priority) * NICE_PER_PRIORITY_STEP;

    // SAFETY: gettid has no preconditions and always succeeds.
    let tid = unsafe { libc::syscall(libc::SYS_gettid) } as libc::id_t;
    // SAFETY: on Linux PRIO_PROCESS with a thread id only affects that thread.
    let result = unsafe { libc::setpriority(libc::PRIO_PROCESS, tid, nice) };

    if result != 0 {
        debug!(
            thread = %thread_name,
            priority = priority,
            nice = nice,
            error = %std::io::Error::last_os_error(),
            "Could not apply worker thread priority"
        );
    }
}

#[cfg(not(target_os = "linux"))]
fn apply_thread_priority(priority: i32, thread_name: &str) {
    if priority != NORM_PRIORITY {
        trace!(
            thread = %thread_name,
            priority = priority,
            "Thread priority not supported on this platform"
        );
    }
}
