//! Executor error types.

use crate::config::ConfigError;
use thiserror::Error;

/// Errors returned synchronously by [`JobExecutor::execute`](super::JobExecutor::execute).
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// The executor was disposed. Terminal; retrying will not help.
    #[error("job executor has been disposed")]
    Disposed,

    /// A pool refused the job (shutting down, or no thread could be started).
    /// Bookkeeping for the job has been rolled back; the caller may retry.
    #[error("pool {pool} rejected job: {reason}")]
    Rejected { pool: String, reason: String },

    /// The job's group settings could not be resolved. Nothing was registered.
    #[error("group configuration error: {0}")]
    Configuration(#[from] ConfigError),
}

impl ExecutorError {
    /// Returns true if submitting the same job again may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            ExecutorError::Disposed.to_string(),
            "job executor has been disposed"
        );
        let rejected = ExecutorError::Rejected {
            pool: "a/b".to_string(),
            reason: "pool is shut down".to_string(),
        };
        assert_eq!(rejected.to_string(), "pool a/b rejected job: pool is shut down");
    }

    #[test]
    fn test_retryable() {
        assert!(!ExecutorError::Disposed.is_retryable());
        assert!(ExecutorError::Rejected {
            pool: "p".to_string(),
            reason: "r".to_string(),
        }
        .is_retryable());
        let config = ConfigError::InvalidGroup {
            path: "a".to_string(),
            reason: "bad".to_string(),
        };
        assert!(!ExecutorError::from(config).is_retryable());
    }
}
