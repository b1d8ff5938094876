//! Paths of everything shared with the worker.
//!
//! ```text
//! <base>/<namespace>/
//!     queue/<job_id>.json            job, written once by the client
//!     output/<job_id>.result.json    result (flat family)
//!     output/<job_id>_result.json    result (nested family)
//!     output/<job_id>.png            single image (nested family)
//!     output/<job_id>/...            per-job artifacts
//!     heartbeat                      mtime refreshed by the worker
//!     render-watcher.log             worker log, read by diagnostics
//! ```

use std::path::{Path, PathBuf};

use render_bridge_core::result::conventional_image_name;
use render_bridge_core::{EnvelopeStyle, JobId};

use crate::config::BridgeConfig;

pub const QUEUE_DIR: &str = "queue";
pub const OUTPUT_DIR: &str = "output";
pub const HEARTBEAT_FILE: &str = "heartbeat";

/// Extension of job files in the queue directory.
pub const JOB_EXTENSION: &str = "json";

/// Result file suffix per envelope family.
pub fn result_suffix(style: EnvelopeStyle) -> &'static str {
    match style {
        EnvelopeStyle::Flat => ".result.json",
        EnvelopeStyle::Nested => "_result.json",
    }
}

#[derive(Debug, Clone)]
pub struct BridgeLayout {
    root: PathBuf,
    style: EnvelopeStyle,
    log_file_name: String,
}

impl BridgeLayout {
    pub fn new(config: &BridgeConfig) -> Self {
        Self {
            root: config.base_dir.join(&config.namespace),
            style: config.style,
            log_file_name: config.log_file_name.clone(),
        }
    }

    /// The namespace directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn style(&self) -> EnvelopeStyle {
        self.style
    }

    pub fn queue_dir(&self) -> PathBuf {
        self.root.join(QUEUE_DIR)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join(OUTPUT_DIR)
    }

    pub fn heartbeat_path(&self) -> PathBuf {
        self.root.join(HEARTBEAT_FILE)
    }

    pub fn log_path(&self) -> PathBuf {
        self.root.join(&self.log_file_name)
    }

    pub fn job_path(&self, job_id: &JobId) -> PathBuf {
        self.queue_dir().join(format!("{job_id}.{JOB_EXTENSION}"))
    }

    pub fn result_path(&self, job_id: &JobId) -> PathBuf {
        self.output_dir()
            .join(format!("{job_id}{}", result_suffix(self.style)))
    }

    /// Dedicated artifact directory of a job.
    pub fn artifact_dir(&self, job_id: &JobId) -> PathBuf {
        self.output_dir().join(job_id.as_str())
    }

    /// The single image a nested-family worker writes next to its result.
    pub fn conventional_image_path(&self, job_id: &JobId) -> PathBuf {
        self.output_dir().join(conventional_image_name(job_id))
    }
}
