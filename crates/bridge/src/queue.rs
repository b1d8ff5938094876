//! Write side of the bridge: the queue directory.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use render_bridge_core::{JobDescriptor, JobId};

use crate::error::BridgeError;
use crate::layout::JOB_EXTENSION;

/// Publishes jobs into the queue directory.
///
/// Each job is written to a hidden temp file and renamed into place, so a
/// worker scanning the directory only ever sees complete job files.
#[derive(Debug, Clone)]
pub struct QueueStore {
    dir: PathBuf,
}

impl QueueStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn job_path(&self, job_id: &JobId) -> PathBuf {
        self.dir.join(format!("{job_id}.{JOB_EXTENSION}"))
    }

    /// Create the queue directory if it does not exist yet.
    pub async fn ensure_dir(&self) -> Result<(), BridgeError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| BridgeError::io(&self.dir, e))
    }

    /// Publish a job under its id.
    ///
    /// The file is complete on disk when this returns. Publishing an id
    /// that is already queued replaces the earlier job.
    pub async fn publish(&self, job: &JobDescriptor) -> Result<JobId, BridgeError> {
        let job_id = job.job_id();
        let bytes = job.to_json()?;
        let path = self.job_path(job_id);
        let tmp = self.dir.join(format!(".{job_id}.{JOB_EXTENSION}.tmp"));

        write_synced(&tmp, &bytes).await?;

        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(BridgeError::io(&path, e));
        }

        tracing::info!(
            job_id = %job_id,
            kind = %job.kind(),
            path = %path.display(),
            "Published render job",
        );
        Ok(job_id.clone())
    }

    /// Ids of the jobs currently in the queue, sorted.
    ///
    /// Observational only; a worker may consume entries at any time.
    pub async fn list_pending(&self) -> Result<Vec<JobId>, BridgeError> {
        let mut ids = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ids),
            Err(e) => return Err(BridgeError::io(&self.dir, e)),
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| BridgeError::io(&self.dir, e))?
        {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(stem) = name.strip_suffix(".json") else {
                continue;
            };
            // Hidden entries are in-flight temp files or probes.
            if let Ok(id) = JobId::parse(stem) {
                ids.push(id);
            }
        }

        ids.sort();
        Ok(ids)
    }
}

/// Write `bytes` to `path` and flush them to disk.
pub(crate) async fn write_synced(path: &Path, bytes: &[u8]) -> Result<(), BridgeError> {
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| BridgeError::io(path, e))?;
    file.write_all(bytes)
        .await
        .map_err(|e| BridgeError::io(path, e))?;
    file.sync_all().await.map_err(|e| BridgeError::io(path, e))
}
