//! Submit, wait, classify, clean up.
//!
//! For one job the client observes `unresolved` until a terminal result
//! file appears, then `resolved` as success or failure. A wait whose
//! deadline passes first yields a synthesised timeout outcome; nothing is
//! written for it and a later wait on the same id may still resolve.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::time::Instant;

use render_bridge_core::builders::{
    AnimationCapture, AnimationRender, BiomeShowcase, JobBuilder, RenderBlend, ScriptedRun,
    SingleAsset,
};
use render_bridge_core::{EnvelopeStyle, JobDescriptor, JobId, JobStatus, ResultDescriptor};

use crate::cleanup::{self, CleanupReport};
use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::layout::BridgeLayout;
use crate::liveness::LivenessProbe;
use crate::output::{FrameSequence, OutputStore};
use crate::queue::{self, QueueStore};

/// File written and removed again by [`BridgeClient::probe_writable`].
const PROBE_FILE_NAME: &str = "_bridge_test.tmp";

const UNKNOWN_FAILURE: &str = "Worker reported failure without a message";

/// Client side of one bridge namespace.
#[derive(Debug, Clone)]
pub struct BridgeClient {
    config: BridgeConfig,
    layout: BridgeLayout,
    queue: QueueStore,
    output: OutputStore,
    liveness: LivenessProbe,
}

impl BridgeClient {
    /// Build a client without touching the filesystem.
    pub fn new(config: BridgeConfig) -> Self {
        let layout = BridgeLayout::new(&config);
        let queue = QueueStore::new(layout.queue_dir());
        let output = OutputStore::new(&config);
        let liveness = LivenessProbe::new(layout.heartbeat_path(), config.heartbeat_stale_after);
        Self {
            config,
            layout,
            queue,
            output,
            liveness,
        }
    }

    /// Build a client and create the queue and output directories.
    pub async fn open(config: BridgeConfig) -> Result<Self, BridgeError> {
        let client = Self::new(config);
        client.queue.ensure_dir().await?;
        let output_dir = client.layout.output_dir();
        tokio::fs::create_dir_all(&output_dir)
            .await
            .map_err(|e| BridgeError::io(&output_dir, e))?;

        tracing::debug!(
            root = %client.layout.root().display(),
            style = %client.config.style,
            "Opened render bridge",
        );
        Ok(client)
    }

    /// [`Self::open`] with configuration from the environment.
    pub async fn from_env(style: EnvelopeStyle) -> Result<Self, BridgeError> {
        Self::open(BridgeConfig::from_env(style)?).await
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn layout(&self) -> &BridgeLayout {
        &self.layout
    }

    pub fn queue(&self) -> &QueueStore {
        &self.queue
    }

    pub fn output(&self) -> &OutputStore {
        &self.output
    }

    pub fn style(&self) -> EnvelopeStyle {
        self.config.style
    }

    // -----------------------------------------------------------------------
    // Core protocol
    // -----------------------------------------------------------------------

    /// Hand a job to the worker. Does not wait.
    pub async fn submit(&self, job: &JobDescriptor) -> Result<JobId, BridgeError> {
        if job.style() != self.config.style {
            return Err(BridgeError::StyleMismatch {
                kind: job.kind(),
                expected: job.style(),
                style: self.config.style,
            });
        }
        self.queue.publish(job).await
    }

    /// Single non-blocking check for a terminal result.
    pub async fn poll(&self, job_id: &JobId) -> Result<Option<ResultDescriptor>, BridgeError> {
        self.poll_before(job_id, None).await
    }

    async fn poll_before(
        &self,
        job_id: &JobId,
        deadline: Option<Instant>,
    ) -> Result<Option<ResultDescriptor>, BridgeError> {
        if !self.output.exists(job_id).await? {
            return Ok(None);
        }
        self.output.read_before(job_id, deadline).await
    }

    /// Poll until a result appears or `timeout` elapses.
    ///
    /// A worker-reported failure is returned as a result with
    /// [`JobStatus::Failed`]; an elapsed deadline as one with
    /// [`JobStatus::Timeout`]. Callers must branch on the status.
    ///
    /// Returns within `timeout + poll_interval` plus the time of one file
    /// read: torn-write retries stop at the deadline. A `timeout` too large
    /// to add to the current instant waits without a deadline.
    pub async fn wait(
        &self,
        job_id: &JobId,
        timeout: Duration,
    ) -> Result<ResultDescriptor, BridgeError> {
        let started = Instant::now();
        let deadline = started.checked_add(timeout);

        loop {
            if let Some(result) = self.poll_before(job_id, deadline).await? {
                tracing::info!(
                    job_id = %job_id,
                    status = result.status.as_str(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Render job resolved",
                );
                return Ok(result);
            }

            let Some(deadline) = deadline else {
                tokio::time::sleep(self.config.poll_interval).await;
                continue;
            };

            let remaining = deadline.saturating_duration_since(Instant::now());
            tokio::time::sleep(self.config.poll_interval.min(remaining)).await;

            if Instant::now() >= deadline {
                // One last look so a result landing during the final sleep is not lost.
                if let Some(result) = self.poll_before(job_id, Some(deadline)).await? {
                    return Ok(result);
                }
                tracing::warn!(
                    job_id = %job_id,
                    timeout_secs = timeout.as_secs_f64(),
                    "Render job timed out",
                );
                return Ok(ResultDescriptor::timed_out(job_id.clone(), timeout));
            }

            tracing::debug!(job_id = %job_id, "Render job not resolved yet");
        }
    }

    /// Submit, wait and turn anything but success into an error.
    pub async fn run(
        &self,
        job: &JobDescriptor,
        timeout: Duration,
    ) -> Result<ResultDescriptor, BridgeError> {
        let job_id = self.submit(job).await?;
        let result = self.wait(&job_id, timeout).await?;
        classify(result, timeout)
    }

    async fn run_kind<B: JobBuilder>(&self, builder: B) -> Result<ResultDescriptor, BridgeError> {
        let timeout = self.config.timeouts.for_kind(B::KIND);
        self.run(&builder.build(), timeout).await
    }

    // -----------------------------------------------------------------------
    // Per-kind convenience
    // -----------------------------------------------------------------------

    pub async fn render_blend(&self, job: RenderBlend) -> Result<ResultDescriptor, BridgeError> {
        self.run_kind(job).await
    }

    pub async fn run_script(&self, job: ScriptedRun) -> Result<ResultDescriptor, BridgeError> {
        self.run_kind(job).await
    }

    /// Frames end up under `<job_id>/frames/`; see [`Self::frame_sequence`].
    pub async fn render_animation(
        &self,
        job: AnimationRender,
    ) -> Result<ResultDescriptor, BridgeError> {
        self.run_kind(job).await
    }

    pub async fn render_biome_showcase(
        &self,
        job: BiomeShowcase,
    ) -> Result<ResultDescriptor, BridgeError> {
        self.run_kind(job).await
    }

    pub async fn render_single_asset(
        &self,
        job: SingleAsset,
    ) -> Result<ResultDescriptor, BridgeError> {
        self.run_kind(job).await
    }

    pub async fn capture_animation(
        &self,
        job: AnimationCapture,
    ) -> Result<ResultDescriptor, BridgeError> {
        self.run_kind(job).await
    }

    // -----------------------------------------------------------------------
    // Housekeeping and inspection
    // -----------------------------------------------------------------------

    /// Advisory: is the worker's heartbeat fresh?
    pub async fn is_worker_alive(&self) -> bool {
        self.liveness.is_worker_alive().await
    }

    /// Remove everything tied to `job_id`. Never called implicitly.
    pub async fn cleanup(&self, job_id: &JobId) -> CleanupReport {
        cleanup::cleanup_job(&self.layout, job_id).await
    }

    /// Reclaim output older than `max_age`.
    pub async fn sweep_stale(&self, max_age: Duration) -> CleanupReport {
        cleanup::sweep_stale(&self.layout, max_age).await
    }

    pub async fn list_pending(&self) -> Result<Vec<JobId>, BridgeError> {
        self.queue.list_pending().await
    }

    pub async fn list_completed(&self) -> Result<Vec<JobId>, BridgeError> {
        self.output.list_completed().await
    }

    pub fn artifact_path(&self, job_id: &JobId, relative_name: impl AsRef<Path>) -> PathBuf {
        self.output.artifact_path(job_id, relative_name)
    }

    pub async fn frame_sequence(
        &self,
        job_id: &JobId,
    ) -> Result<Option<FrameSequence>, BridgeError> {
        self.output.frame_sequence(job_id).await
    }

    /// Advisory availability check: both directories exist and a probe
    /// file can be written to and removed from the queue directory.
    pub async fn probe_writable(&self) -> bool {
        for dir in [self.layout.queue_dir(), self.layout.output_dir()] {
            if !tokio::fs::try_exists(&dir).await.unwrap_or(false) {
                tracing::debug!(dir = %dir.display(), "Bridge directory missing");
                return false;
            }
        }

        let probe = self.layout.queue_dir().join(PROBE_FILE_NAME);
        if let Err(e) = queue::write_synced(&probe, b"").await {
            tracing::warn!(error = %e, "Bridge directory not writable");
            return false;
        }
        match tokio::fs::remove_file(&probe).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(path = %probe.display(), error = %e, "Failed to remove bridge probe");
                false
            }
        }
    }
}

/// Map a resolved result onto success or a distinguishable error.
fn classify(result: ResultDescriptor, timeout: Duration) -> Result<ResultDescriptor, BridgeError> {
    match result.status {
        JobStatus::Complete => Ok(result),
        JobStatus::Timeout => Err(BridgeError::TimedOut {
            job_id: result.job_id,
            timeout,
        }),
        JobStatus::Failed | JobStatus::Pending | JobStatus::Running => {
            Err(BridgeError::JobFailed {
                job_id: result.job_id,
                message: result
                    .error_message
                    .unwrap_or_else(|| UNKNOWN_FAILURE.to_string()),
                detail: result.error_detail,
            })
        }
    }
}
