use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::error::BridgeError;

/// Advisory check of the worker's heartbeat file.
///
/// The worker touches the file periodically; the client only reads its
/// modification time. Never consulted inside `wait`, since a worker may
/// come up while a job is already queued.
#[derive(Debug, Clone)]
pub struct LivenessProbe {
    heartbeat_path: PathBuf,
    stale_after: Duration,
}

impl LivenessProbe {
    pub fn new(heartbeat_path: impl Into<PathBuf>, stale_after: Duration) -> Self {
        Self {
            heartbeat_path: heartbeat_path.into(),
            stale_after,
        }
    }

    pub fn heartbeat_path(&self) -> &Path {
        &self.heartbeat_path
    }

    /// Age of the last heartbeat, or `None` if there is no heartbeat file.
    ///
    /// A modification time in the future (clock skew across the mount)
    /// counts as a fresh heartbeat.
    pub async fn heartbeat_age(&self) -> Result<Option<Duration>, BridgeError> {
        let metadata = match tokio::fs::metadata(&self.heartbeat_path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(BridgeError::io(&self.heartbeat_path, e)),
        };
        let modified = metadata
            .modified()
            .map_err(|e| BridgeError::io(&self.heartbeat_path, e))?;
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);
        Ok(Some(age))
    }

    /// Whether the heartbeat exists and is younger than the staleness window.
    ///
    /// Unreadable heartbeats count as absent.
    pub async fn is_worker_alive(&self) -> bool {
        match self.heartbeat_age().await {
            Ok(Some(age)) if age < self.stale_after => true,
            Ok(Some(age)) => {
                tracing::warn!(
                    path = %self.heartbeat_path.display(),
                    age_secs = age.as_secs(),
                    "Worker heartbeat is stale",
                );
                false
            }
            Ok(None) => {
                tracing::debug!(path = %self.heartbeat_path.display(), "No worker heartbeat");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read worker heartbeat");
                false
            }
        }
    }
}
