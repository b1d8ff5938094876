//! Job outcomes and their two wire encodings.
//!
//! The worker only ever writes a terminal status. `Pending`, `Running` and
//! `Timeout` are inferred on the client side and never persisted by it.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::ids::JobId;
use crate::kind::EnvelopeStyle;

/// Status of a job as observed by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Complete,
    Failed,
    Timeout,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed | Self::Timeout)
    }

    /// Map a status string written by either worker family.
    ///
    /// Anything unrecognised is treated as a failure so that it can never
    /// be mistaken for success. That includes `timeout`: only the client's
    /// own deadline produces [`JobStatus::Timeout`].
    pub fn from_wire(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "complete" | "completed" | "success" => Self::Complete,
            "failed" | "error" => Self::Failed,
            "pending" => Self::Pending,
            "running" | "rendering" => Self::Running,
            _ => Self::Failed,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Complete => "complete",
            Self::Failed => "failed",
            Self::Timeout => "timeout",
        }
    }
}

/// Outcome of one job.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultDescriptor {
    pub job_id: JobId,
    pub status: JobStatus,
    /// Artifact paths relative to the output directory. Only meaningful on success.
    pub output_files: Vec<String>,
    pub preview_files: Vec<String>,
    pub render_time_seconds: f64,
    pub error_message: Option<String>,
    /// Worker-side traceback or other detail.
    pub error_detail: Option<String>,
    pub tool_version: Option<String>,
    pub gpu: Option<String>,
}

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize)]
struct FlatResultEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    job_id: Option<JobId>,
    status: String,
    #[serde(default)]
    output_files: Vec<String>,
    #[serde(default)]
    preview_files: Vec<String>,
    #[serde(default)]
    render_time_seconds: f64,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    error_traceback: Option<String>,
    #[serde(default, alias = "tool_version")]
    blender_version: Option<String>,
    #[serde(default)]
    gpu_used: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct NestedResultEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    job_id: Option<JobId>,
    status: String,
    #[serde(default)]
    render_time_seconds: f64,
    #[serde(default)]
    gpu_name: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ResultDescriptor {
    /// Empty descriptor with the given status.
    pub fn new(job_id: JobId, status: JobStatus) -> Self {
        Self {
            job_id,
            status,
            output_files: Vec::new(),
            preview_files: Vec::new(),
            render_time_seconds: 0.0,
            error_message: None,
            error_detail: None,
            tool_version: None,
            gpu: None,
        }
    }

    /// Client-synthesised outcome for a wait whose deadline elapsed.
    pub fn timed_out(job_id: JobId, timeout: Duration) -> Self {
        let message = format!(
            "Render job {job_id} timed out after {}s",
            timeout.as_secs_f64()
        );
        Self {
            error_message: Some(message),
            ..Self::new(job_id, JobStatus::Timeout)
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Complete
    }

    pub fn is_failure(&self) -> bool {
        self.status == JobStatus::Failed
    }

    pub fn is_timeout(&self) -> bool {
        self.status == JobStatus::Timeout
    }

    /// Decode a result file written for `job_id`.
    ///
    /// A flat result naming a different job is rejected. The nested family
    /// does not carry its id; its single artifact is `<job_id>.png`.
    pub fn decode(style: EnvelopeStyle, job_id: &JobId, bytes: &[u8]) -> Result<Self, CoreError> {
        match style {
            EnvelopeStyle::Flat => {
                let wire: FlatResultEnvelope = serde_json::from_slice(bytes)?;
                if let Some(written) = &wire.job_id {
                    if written != job_id {
                        return Err(CoreError::Validation(format!(
                            "Result file for {job_id} names job {written}"
                        )));
                    }
                }
                Ok(Self {
                    job_id: job_id.clone(),
                    status: JobStatus::from_wire(&wire.status),
                    output_files: wire.output_files,
                    preview_files: wire.preview_files,
                    render_time_seconds: wire.render_time_seconds,
                    error_message: wire.error_message,
                    error_detail: wire.error_traceback,
                    tool_version: wire.blender_version,
                    gpu: wire.gpu_used,
                })
            }
            EnvelopeStyle::Nested => {
                let wire: NestedResultEnvelope = serde_json::from_slice(bytes)?;
                let status = JobStatus::from_wire(&wire.status);
                let mut result = Self {
                    render_time_seconds: wire.render_time_seconds,
                    gpu: wire.gpu_name,
                    ..Self::new(job_id.clone(), status)
                };
                match status {
                    JobStatus::Complete => {
                        result.output_files = vec![conventional_image_name(job_id)];
                    }
                    JobStatus::Failed => {
                        result.error_message = Some(
                            wire.error
                                .filter(|e| !e.is_empty())
                                .unwrap_or_else(|| "Unknown error".to_string()),
                        );
                    }
                    _ => result.error_message = wire.error,
                }
                Ok(result)
            }
        }
    }

    /// Encode in the family's wire shape (what a worker would write).
    pub fn encode(&self, style: EnvelopeStyle) -> Result<Vec<u8>, CoreError> {
        let bytes = match style {
            EnvelopeStyle::Flat => serde_json::to_vec_pretty(&FlatResultEnvelope {
                job_id: Some(self.job_id.clone()),
                status: self.status.as_str().to_string(),
                output_files: self.output_files.clone(),
                preview_files: self.preview_files.clone(),
                render_time_seconds: self.render_time_seconds,
                error_message: self.error_message.clone(),
                error_traceback: self.error_detail.clone(),
                blender_version: self.tool_version.clone(),
                gpu_used: self.gpu.clone(),
            })?,
            EnvelopeStyle::Nested => {
                let status = if self.is_success() { "success" } else { "error" };
                serde_json::to_vec_pretty(&NestedResultEnvelope {
                    job_id: None,
                    status: status.to_string(),
                    render_time_seconds: self.render_time_seconds,
                    gpu_name: self.gpu.clone(),
                    error: self.error_message.clone(),
                })?
            }
        };
        Ok(bytes)
    }
}

/// File name of the single image a nested-family worker produces.
pub fn conventional_image_name(job_id: &JobId) -> String {
    format!("{job_id}.png")
}
