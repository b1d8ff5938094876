use std::path::{Path, PathBuf};
use std::time::Duration;

use render_bridge_core::{CoreError, EnvelopeStyle, JobId, JobKind};

/// Errors from the filesystem side of the bridge.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The shared directories could not be read or written (permission
    /// denied, disk full, missing mount). Never retried.
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Envelope encoding/decoding or id validation failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A configuration value could not be parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The job belongs to the other envelope family than this client's worker.
    #[error("Job kind '{kind}' uses the {expected} envelope but this bridge speaks {style}")]
    StyleMismatch {
        kind: JobKind,
        expected: EnvelopeStyle,
        style: EnvelopeStyle,
    },

    /// The worker resolved the job with a failure status.
    #[error("Render job {job_id} failed: {message}")]
    JobFailed {
        job_id: JobId,
        message: String,
        /// Worker-side traceback, if any.
        detail: Option<String>,
    },

    /// No result appeared before the wait deadline. The job may still
    /// complete later.
    #[error("Render job {job_id} timed out after {}s", .timeout.as_secs_f64())]
    TimedOut { job_id: JobId, timeout: Duration },
}

impl BridgeError {
    pub(crate) fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }

    pub fn is_job_failure(&self) -> bool {
        matches!(self, Self::JobFailed { .. })
    }
}
