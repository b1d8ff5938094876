//! Read side of the bridge: the output directory.
//!
//! The worker is supposed to publish results with a rename, but it may
//! also write in place. A reader can then observe a result file that exists
//! but is empty or holds a truncated prefix of the JSON. Such reads are
//! retried a bounded number of times and otherwise reported as "not yet
//! available"; only genuine I/O failures surface as errors.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use render_bridge_core::{CoreError, EnvelopeStyle, JobId, JobStatus, ResultDescriptor};

use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::layout::{result_suffix, BridgeLayout};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Subdirectory of an animation job's artifact directory holding its frames.
pub const FRAMES_DIR: &str = "frames";
const FRAME_PREFIX: &str = "frame_";
const FRAME_EXTENSION: &str = ".png";

/// Rendered frames of an animation job, in frame order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameSequence {
    pub frames: Vec<PathBuf>,
    pub first_frame: u32,
    pub last_frame: u32,
}

impl FrameSequence {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

fn expired(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|d| Instant::now() >= d)
}

/// Outcome of a single read attempt.
enum Attempt {
    Ready(ResultDescriptor),
    Torn(&'static str),
}

#[derive(Debug, Clone)]
pub struct OutputStore {
    layout: BridgeLayout,
    read_retries: u32,
    read_retry_delay: Duration,
}

impl OutputStore {
    pub fn new(config: &BridgeConfig) -> Self {
        Self {
            layout: BridgeLayout::new(config),
            read_retries: config.read_retries,
            read_retry_delay: config.read_retry_delay,
        }
    }

    pub fn dir(&self) -> PathBuf {
        self.layout.output_dir()
    }

    pub fn style(&self) -> EnvelopeStyle {
        self.layout.style()
    }

    pub fn result_path(&self, job_id: &JobId) -> PathBuf {
        self.layout.result_path(job_id)
    }

    /// Whether a result file exists at all, without reading it.
    pub async fn exists(&self, job_id: &JobId) -> Result<bool, BridgeError> {
        let path = self.result_path(job_id);
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| BridgeError::io(&path, e))
    }

    /// Read and classify the result of `job_id`.
    ///
    /// Returns `Ok(None)` while the result is absent, torn, or reports a
    /// non-terminal status. An empty or unparsable file is re-read up to
    /// `read_retries` more times, sleeping `read_retry_delay` in between.
    pub async fn read(&self, job_id: &JobId) -> Result<Option<ResultDescriptor>, BridgeError> {
        self.read_before(job_id, None).await
    }

    /// [`Self::read`], but no retry starts once `deadline` has passed and
    /// the retry sleep never runs past it.
    pub(crate) async fn read_before(
        &self,
        job_id: &JobId,
        deadline: Option<Instant>,
    ) -> Result<Option<ResultDescriptor>, BridgeError> {
        let path = self.result_path(job_id);
        let mut attempt = 0;

        loop {
            let bytes = match tokio::fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
                Err(e) => return Err(BridgeError::io(&path, e)),
            };

            match self.decode(job_id, &bytes)? {
                Attempt::Ready(result) => return self.finish(result).await,
                Attempt::Torn(reason) if attempt < self.read_retries && !expired(deadline) => {
                    attempt += 1;
                    tracing::debug!(
                        job_id = %job_id,
                        attempt,
                        reason,
                        "Result file not fully written, retrying",
                    );
                    let delay = match deadline {
                        Some(d) => self
                            .read_retry_delay
                            .min(d.saturating_duration_since(Instant::now())),
                        None => self.read_retry_delay,
                    };
                    tokio::time::sleep(delay).await;
                }
                Attempt::Torn(reason) => {
                    tracing::warn!(
                        job_id = %job_id,
                        attempts = attempt + 1,
                        reason,
                        path = %path.display(),
                        "Result file still unreadable, treating as not ready",
                    );
                    return Ok(None);
                }
            }
        }
    }

    fn decode(&self, job_id: &JobId, bytes: &[u8]) -> Result<Attempt, BridgeError> {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Attempt::Torn("empty"));
        }
        match ResultDescriptor::decode(self.style(), job_id, bytes) {
            Ok(result) => Ok(Attempt::Ready(result)),
            Err(CoreError::Envelope(_)) => Ok(Attempt::Torn("malformed")),
            Err(e) => Err(e.into()),
        }
    }

    /// Drop non-terminal results and check the nested family's image.
    async fn finish(
        &self,
        mut result: ResultDescriptor,
    ) -> Result<Option<ResultDescriptor>, BridgeError> {
        if !result.status.is_terminal() {
            tracing::debug!(
                job_id = %result.job_id,
                status = result.status.as_str(),
                "Result not terminal yet",
            );
            return Ok(None);
        }

        if self.style() == EnvelopeStyle::Nested && result.is_success() {
            let image = self.layout.conventional_image_path(&result.job_id);
            let present = tokio::fs::try_exists(&image)
                .await
                .map_err(|e| BridgeError::io(&image, e))?;
            if !present {
                tracing::warn!(
                    job_id = %result.job_id,
                    path = %image.display(),
                    "Worker reported success but the image is missing",
                );
                result.status = JobStatus::Failed;
                result.output_files.clear();
                result.error_message = Some(format!(
                    "Render reported success but {} was not produced",
                    image.display()
                ));
            }
        }

        Ok(Some(result))
    }

    /// Path of a named artifact in the job's output directory.
    ///
    /// Pure path join; the file may not exist.
    pub fn artifact_path(&self, job_id: &JobId, relative_name: impl AsRef<Path>) -> PathBuf {
        self.layout.artifact_dir(job_id).join(relative_name)
    }

    /// Ids that currently have a result file, sorted.
    pub async fn list_completed(&self) -> Result<Vec<JobId>, BridgeError> {
        let dir = self.dir();
        let suffix = result_suffix(self.style());
        let mut ids = Vec::new();

        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ids),
            Err(e) => return Err(BridgeError::io(&dir, e)),
        };
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| BridgeError::io(&dir, e))?
        {
            let name = entry.file_name();
            let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(suffix)) else {
                continue;
            };
            if let Ok(id) = JobId::parse(stem) {
                ids.push(id);
            }
        }

        ids.sort();
        Ok(ids)
    }

    /// Frames of an animation job (`<job_id>/frames/frame_NNNN.png`).
    ///
    /// `None` when the job produced no frames.
    pub async fn frame_sequence(&self, job_id: &JobId) -> Result<Option<FrameSequence>, BridgeError> {
        let dir = self.layout.artifact_dir(job_id).join(FRAMES_DIR);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(BridgeError::io(&dir, e)),
        };

        let mut numbered = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| BridgeError::io(&dir, e))?
        {
            let name = entry.file_name();
            if let Some(number) = name.to_str().and_then(parse_frame_number) {
                numbered.push((number, entry.path()));
            }
        }

        numbered.sort();
        let (Some(first), Some(last)) = (numbered.first(), numbered.last()) else {
            return Ok(None);
        };
        let (first_frame, last_frame) = (first.0, last.0);

        Ok(Some(FrameSequence {
            frames: numbered.into_iter().map(|(_, path)| path).collect(),
            first_frame,
            last_frame,
        }))
    }
}

/// `frame_0012.png` -> `12`.
fn parse_frame_number(name: &str) -> Option<u32> {
    name.strip_prefix(FRAME_PREFIX)?
        .strip_suffix(FRAME_EXTENSION)?
        .parse()
        .ok()
}
