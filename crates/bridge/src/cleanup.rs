//! Best-effort reclamation of job files.
//!
//! Nothing here fails: every path that cannot be removed is logged and
//! recorded in the returned [`CleanupReport`]. Already-absent paths are
//! not errors, so every operation is idempotent.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::Serialize;

use render_bridge_core::{EnvelopeStyle, JobId};

use crate::layout::BridgeLayout;

/// What a cleanup pass removed and what it had to leave behind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub removed: Vec<PathBuf>,
    /// Swallowed failures, one message per path.
    pub errors: Vec<String>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    fn record(&mut self, path: &Path, outcome: std::io::Result<()>) {
        match outcome {
            Ok(()) => self.removed.push(path.to_path_buf()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Cleanup failed");
                self.errors.push(format!("{}: {e}", path.display()));
            }
        }
    }
}

/// Remove the queue file, result file and artifacts of one job.
pub(crate) async fn cleanup_job(layout: &BridgeLayout, job_id: &JobId) -> CleanupReport {
    let mut report = CleanupReport::default();

    let mut files = vec![layout.job_path(job_id), layout.result_path(job_id)];
    if layout.style() == EnvelopeStyle::Nested {
        files.push(layout.conventional_image_path(job_id));
    }
    for path in files {
        let outcome = tokio::fs::remove_file(&path).await;
        report.record(&path, outcome);
    }

    let dir = layout.artifact_dir(job_id);
    let outcome = tokio::fs::remove_dir_all(&dir).await;
    report.record(&dir, outcome);

    tracing::info!(
        job_id = %job_id,
        removed = report.removed.len(),
        errors = report.errors.len(),
        "Cleaned up render job",
    );
    report
}

/// Remove artifact directories and result/image files in the output
/// directory whose modification time is older than `max_age`.
///
/// Queue entries are left alone: a job the worker has not consumed yet
/// stays published.
pub(crate) async fn sweep_stale(layout: &BridgeLayout, max_age: Duration) -> CleanupReport {
    let mut report = CleanupReport::default();
    let dir = layout.output_dir();
    let Some(cutoff) = SystemTime::now().checked_sub(max_age) else {
        return report;
    };

    let mut entries = match tokio::fs::read_dir(&dir).await {
        Ok(entries) => entries,
        Err(e) => {
            report.record(&dir, Err(e));
            return report;
        }
    };

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                report.record(&dir, Err(e));
                break;
            }
        };
        let path = entry.path();
        let metadata = match entry.metadata().await {
            Ok(metadata) => metadata,
            Err(e) => {
                report.record(&path, Err(e));
                continue;
            }
        };
        let is_stale = metadata.modified().map(|m| m < cutoff).unwrap_or(false);
        if !is_stale {
            continue;
        }

        if metadata.is_dir() {
            let outcome = tokio::fs::remove_dir_all(&path).await;
            report.record(&path, outcome);
        } else if is_reclaimable_file(&path) {
            let outcome = tokio::fs::remove_file(&path).await;
            report.record(&path, outcome);
        }
    }

    tracing::info!(
        dir = %dir.display(),
        max_age_secs = max_age.as_secs(),
        removed = report.removed.len(),
        errors = report.errors.len(),
        "Swept stale render output",
    );
    report
}

fn is_reclaimable_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("json") | Some("png")
    )
}
