//! Telemetry for executor observability.
//!
//! Pools and the executor emit structured events via a sink abstraction. The
//! executor doesn't know how events are consumed; consumers (logging, metrics,
//! UI) decide how to present or aggregate them.
//!
//! # Example
//!
//! ```
//! use groupexec::executor::{TelemetryEvent, TelemetrySink};
//!
//! struct LoggingSink;
//!
//! impl TelemetrySink for LoggingSink {
//!     fn emit(&self, event: TelemetryEvent) {
//!         tracing::info!(?event, "Executor event");
//!     }
//! }
//! ```

use super::job::JobId;
use super::path::GroupPath;
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// Telemetry Events
// =============================================================================

/// Events emitted during job execution.
#[derive(Clone, Debug)]
pub enum TelemetryEvent {
    /// A worker pool was created for a group path seen for the first time.
    PoolCreated {
        path: GroupPath,
        pool_size: usize,
        priority: i32,
        keep_alive: Duration,
    },

    /// A job was accepted by a pool.
    JobSubmitted {
        job_id: Option<JobId>,
        name: String,
        path: Option<GroupPath>,
    },

    /// A pool refused a job; the caller received the error.
    JobRejected {
        job_id: Option<JobId>,
        path: Option<GroupPath>,
        reason: String,
    },

    /// A job was admitted and its body is about to run.
    JobStarted {
        job_id: Option<JobId>,
        path: Option<GroupPath>,
        thread: String,
    },

    /// A job body returned or panicked, and its locks were released.
    JobFinished {
        job_id: Option<JobId>,
        path: Option<GroupPath>,
        duration: Duration,
        panicked: bool,
    },

    /// The executor was disposed.
    ExecutorDisposed { pools: usize, drained_jobs: usize },
}

impl TelemetryEvent {
    /// Returns the job ID associated with this event, if any.
    pub fn job_id(&self) -> Option<&JobId> {
        match self {
            Self::JobSubmitted { job_id, .. }
            | Self::JobRejected { job_id, .. }
            | Self::JobStarted { job_id, .. }
            | Self::JobFinished { job_id, .. } => job_id.as_ref(),
            Self::PoolCreated { .. } | Self::ExecutorDisposed { .. } => None,
        }
    }

    /// Returns a short name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::PoolCreated { .. } => "pool_created",
            Self::JobSubmitted { .. } => "job_submitted",
            Self::JobRejected { .. } => "job_rejected",
            Self::JobStarted { .. } => "job_started",
            Self::JobFinished { .. } => "job_finished",
            Self::ExecutorDisposed { .. } => "executor_disposed",
        }
    }
}

// =============================================================================
// Telemetry Sink Trait
// =============================================================================

/// Sink for telemetry events.
///
/// Events are emitted from submitting threads and from pool worker threads
/// concurrently. `emit` runs on the worker's thread between admission and the
/// job body, so it should be fast and non-blocking.
pub trait TelemetrySink: Send + Sync {
    fn emit(&self, event: TelemetryEvent);
}

// =============================================================================
// Built-in Sink Implementations
// =============================================================================

/// No-op sink for when telemetry is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTelemetrySink;

impl TelemetrySink for NullTelemetrySink {
    fn emit(&self, _event: TelemetryEvent) {}
}

/// Sink that logs events using the `tracing` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTelemetrySink;

impl TelemetrySink for TracingTelemetrySink {
    fn emit(&self, event: TelemetryEvent) {
        match &event {
            TelemetryEvent::PoolCreated {
                path,
                pool_size,
                priority,
                keep_alive,
            } => {
                tracing::info!(
                    path = %path,
                    pool_size = pool_size,
                    priority = priority,
                    keep_alive_ms = keep_alive.as_millis(),
                    "Group pool created"
                );
            }
            TelemetryEvent::JobSubmitted { job_id, name, path } => {
                tracing::debug!(
                    job_id = ?job_id,
                    name = %name,
                    path = ?path,
                    "Job submitted"
                );
            }
            TelemetryEvent::JobRejected {
                job_id,
                path,
                reason,
            } => {
                tracing::warn!(
                    job_id = ?job_id,
                    path = ?path,
                    reason = %reason,
                    "Job rejected"
                );
            }
            TelemetryEvent::JobStarted {
                job_id,
                path,
                thread,
            } => {
                tracing::debug!(job_id = ?job_id, path = ?path, thread = %thread, "Job started");
            }
            TelemetryEvent::JobFinished {
                job_id,
                path,
                duration,
                panicked,
            } => {
                tracing::debug!(
                    job_id = ?job_id,
                    path = ?path,
                    duration_ms = duration.as_millis(),
                    panicked = panicked,
                    "Job finished"
                );
            }
            TelemetryEvent::ExecutorDisposed {
                pools,
                drained_jobs,
            } => {
                tracing::info!(pools = pools, drained_jobs = drained_jobs, "Executor disposed");
            }
        }
    }
}

/// Sink that forwards events to multiple sinks.
pub struct MultiplexTelemetrySink {
    sinks: Vec<Arc<dyn TelemetrySink>>,
}

impl MultiplexTelemetrySink {
    pub fn new(sinks: Vec<Arc<dyn TelemetrySink>>) -> Self {
        Self { sinks }
    }

    pub fn add_sink(&mut self, sink: Arc<dyn TelemetrySink>) {
        self.sinks.push(sink);
    }
}

impl TelemetrySink for MultiplexTelemetrySink {
    fn emit(&self, event: TelemetryEvent) {
        for sink in &self.sinks {
            sink.emit(event.clone());
        }
    }
}

impl std::fmt::Debug for MultiplexTelemetrySink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiplexTelemetrySink")
            .field("sink_count", &self.sinks.len())
            .finish()
    }
}
