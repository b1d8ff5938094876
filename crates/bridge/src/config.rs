use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use render_bridge_core::{EnvelopeStyle, JobKind};

use crate::error::BridgeError;

/// Env var selecting the shared base directory.
pub const ENV_BASE_DIR: &str = "RENDER_BRIDGE_BASE";
pub const ENV_NAMESPACE: &str = "RENDER_BRIDGE_NAMESPACE";
pub const ENV_POLL_INTERVAL_MS: &str = "RENDER_BRIDGE_POLL_INTERVAL_MS";
pub const ENV_READ_RETRIES: &str = "RENDER_BRIDGE_READ_RETRIES";
pub const ENV_READ_RETRY_DELAY_MS: &str = "RENDER_BRIDGE_READ_RETRY_DELAY_MS";
pub const ENV_HEARTBEAT_STALE_SECS: &str = "RENDER_BRIDGE_HEARTBEAT_STALE_SECS";

/// Directory under the base shared with the scene-file render worker.
pub const FLAT_NAMESPACE: &str = "render-bridge";
/// Directory under the base shared with the engine scene-capture worker.
pub const NESTED_NAMESPACE: &str = "godot-bridge";

pub const DEFAULT_READ_RETRIES: u32 = 5;
pub const DEFAULT_READ_RETRY_DELAY: Duration = Duration::from_millis(200);
pub const DEFAULT_HEARTBEAT_STALE_AFTER: Duration = Duration::from_secs(10);
pub const DEFAULT_LOG_FILE_NAME: &str = "render-watcher.log";

/// Default wait timeout per job kind, plus the diagnostics path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindTimeouts {
    /// Single-frame renders and exports.
    pub render: Duration,
    pub scripted: Duration,
    /// Per-frame worker cost dominates, so this is the longest.
    pub animation: Duration,
    pub diagnostics: Duration,
    pub showcase: Duration,
    pub single_asset: Duration,
    pub animation_capture: Duration,
}

impl Default for KindTimeouts {
    fn default() -> Self {
        Self {
            render: Duration::from_secs(120),
            scripted: Duration::from_secs(300),
            animation: Duration::from_secs(600),
            diagnostics: Duration::from_secs(60),
            showcase: Duration::from_secs(120),
            single_asset: Duration::from_secs(120),
            animation_capture: Duration::from_secs(600),
        }
    }
}

impl KindTimeouts {
    pub fn for_kind(&self, kind: JobKind) -> Duration {
        match kind {
            JobKind::RenderBlend => self.render,
            JobKind::ScriptedRun => self.scripted,
            JobKind::AnimationRender => self.animation,
            JobKind::BiomeShowcase => self.showcase,
            JobKind::SingleAsset => self.single_asset,
            JobKind::AnimationCapture => self.animation_capture,
        }
    }
}

/// Everything a [`BridgeClient`](crate::BridgeClient) needs to know about
/// the shared directories and its polling policy.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Directory holding the namespace directories.
    pub base_dir: PathBuf,
    /// Namespace directory under `base_dir`.
    pub namespace: String,
    /// Envelope family spoken by the worker on the other side.
    pub style: EnvelopeStyle,
    /// Sleep between polls inside `wait`.
    pub poll_interval: Duration,
    /// Extra attempts when a result file is empty or torn.
    pub read_retries: u32,
    pub read_retry_delay: Duration,
    /// Heartbeat age beyond which the worker counts as absent.
    pub heartbeat_stale_after: Duration,
    /// Worker log read by diagnostics, relative to the namespace directory.
    pub log_file_name: String,
    pub timeouts: KindTimeouts,
}

impl BridgeConfig {
    /// Defaults for the given envelope family rooted at `base_dir`.
    pub fn new(style: EnvelopeStyle, base_dir: impl Into<PathBuf>) -> Self {
        let (namespace, poll_interval) = match style {
            EnvelopeStyle::Flat => (FLAT_NAMESPACE, Duration::from_millis(1000)),
            EnvelopeStyle::Nested => (NESTED_NAMESPACE, Duration::from_millis(500)),
        };
        Self {
            base_dir: base_dir.into(),
            namespace: namespace.to_string(),
            style,
            poll_interval,
            read_retries: DEFAULT_READ_RETRIES,
            read_retry_delay: DEFAULT_READ_RETRY_DELAY,
            heartbeat_stale_after: DEFAULT_HEARTBEAT_STALE_AFTER,
            log_file_name: DEFAULT_LOG_FILE_NAME.to_string(),
            timeouts: KindTimeouts::default(),
        }
    }

    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                              | Default                          |
    /// |--------------------------------------|----------------------------------|
    /// | `RENDER_BRIDGE_BASE`                 | directory of the executable      |
    /// | `RENDER_BRIDGE_NAMESPACE`            | `render-bridge` / `godot-bridge` |
    /// | `RENDER_BRIDGE_POLL_INTERVAL_MS`     | `1000` flat, `500` nested        |
    /// | `RENDER_BRIDGE_READ_RETRIES`         | `5`                              |
    /// | `RENDER_BRIDGE_READ_RETRY_DELAY_MS`  | `200`                            |
    /// | `RENDER_BRIDGE_HEARTBEAT_STALE_SECS` | `10`                             |
    pub fn from_env(style: EnvelopeStyle) -> Result<Self, BridgeError> {
        Self::from_lookup(style, |key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env`] with an arbitrary variable source.
    pub fn from_lookup<F>(style: EnvelopeStyle, lookup: F) -> Result<Self, BridgeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_dir = lookup(ENV_BASE_DIR)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_base_dir);

        let mut config = Self::new(style, base_dir);

        if let Some(namespace) = lookup(ENV_NAMESPACE).filter(|v| !v.trim().is_empty()) {
            config.namespace = namespace;
        }
        if let Some(ms) = parse_var::<u64>(&lookup, ENV_POLL_INTERVAL_MS)? {
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(retries) = parse_var::<u32>(&lookup, ENV_READ_RETRIES)? {
            config.read_retries = retries;
        }
        if let Some(ms) = parse_var::<u64>(&lookup, ENV_READ_RETRY_DELAY_MS)? {
            config.read_retry_delay = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, ENV_HEARTBEAT_STALE_SECS)? {
            config.heartbeat_stale_after = Duration::from_secs(secs);
        }

        if config.poll_interval.is_zero() {
            return Err(BridgeError::Config(format!(
                "{ENV_POLL_INTERVAL_MS} must be greater than zero"
            )));
        }

        Ok(config)
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, BridgeError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|e| BridgeError::Config(format!("{key} must be a valid number, got '{raw}': {e}")))
}

/// Directory of the running executable, falling back to the working directory.
pub fn default_base_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."))
}
