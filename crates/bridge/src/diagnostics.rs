//! Scene diagnostics layered on the scripted-run job.
//!
//! The analysis script runs inside the worker and prints its report to the
//! shared worker log between two sentinel lines; the report is recovered
//! from there with [`DiagnosticReport::from_log`]. Only the part of the log
//! written after the job was submitted is searched; a log that shrank in the
//! meantime was rotated and is searched whole.

use std::path::PathBuf;

use render_bridge_core::builders::{JobBuilder, ScriptedRun};
use render_bridge_core::diagnostics::DiagnosticReport;
use render_bridge_core::JobId;

use crate::client::BridgeClient;
use crate::error::BridgeError;
use crate::queue;

/// Armature/animation checks run by [`BridgeClient::diagnose`].
pub const DEFAULT_DIAGNOSTIC_SCRIPT: &str = include_str!("../assets/diagnose_animation.py");

impl BridgeClient {
    /// Run the built-in animation diagnostics against a scene file.
    pub async fn diagnose(
        &self,
        blend_file: impl Into<String>,
    ) -> Result<DiagnosticReport, BridgeError> {
        self.diagnose_with_script(blend_file, DEFAULT_DIAGNOSTIC_SCRIPT)
            .await
    }

    /// Run a caller-supplied analysis script against a scene file.
    ///
    /// The script must print its JSON report between the diagnostic
    /// markers. A worker failure or timeout is an error; a missing or
    /// unparsable report yields [`DiagnosticReport::unparsed`]. The script
    /// and the job's files are removed afterwards whatever the outcome.
    pub async fn diagnose_with_script(
        &self,
        blend_file: impl Into<String>,
        script: &str,
    ) -> Result<DiagnosticReport, BridgeError> {
        let job_id = JobId::generate();
        let script_path = self.diagnostic_script_path(&job_id);

        queue::write_synced(&script_path, script.as_bytes()).await?;
        let log_offset = self.log_len().await;

        let job = ScriptedRun::new(blend_file, script_path.to_string_lossy())
            .build_with_id(job_id.clone());
        let outcome = self.run(&job, self.config().timeouts.diagnostics).await;

        if let Err(e) = tokio::fs::remove_file(&script_path).await {
            tracing::warn!(path = %script_path.display(), error = %e, "Failed to remove diagnostic script");
        }

        let report = match outcome {
            Ok(_) => Ok(self.read_report(log_offset).await),
            Err(e) => Err(e),
        };
        self.cleanup(&job_id).await;
        report
    }

    fn diagnostic_script_path(&self, job_id: &JobId) -> PathBuf {
        self.layout().queue_dir().join(format!("_diagnostic_{job_id}.py"))
    }

    /// Current size of the worker log; zero when it does not exist yet.
    async fn log_len(&self) -> u64 {
        tokio::fs::metadata(self.layout().log_path())
            .await
            .map(|m| m.len())
            .unwrap_or(0)
    }

    async fn read_report(&self, offset: u64) -> DiagnosticReport {
        let log_path = self.layout().log_path();
        match tokio::fs::read(&log_path).await {
            Ok(bytes) => {
                let appended = appended_since(&bytes, offset).unwrap_or_else(|| {
                    tracing::debug!(path = %log_path.display(), "Worker log rotated, reading all of it");
                    &bytes[..]
                });
                let report = DiagnosticReport::from_log(&String::from_utf8_lossy(appended));
                tracing::info!(
                    status = %report.status,
                    issues = report.issues.len(),
                    warnings = report.warnings.len(),
                    "Diagnostics complete",
                );
                report
            }
            Err(e) => {
                tracing::warn!(path = %log_path.display(), error = %e, "Worker log unavailable");
                DiagnosticReport::unparsed()
            }
        }
    }
}

/// Bytes written after `offset`, or `None` when the log is now shorter.
fn appended_since(log: &[u8], offset: u64) -> Option<&[u8]> {
    let offset = usize::try_from(offset).ok()?;
    log.get(offset..)
}
