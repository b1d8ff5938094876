#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

use render_bridge::{BridgeClient, BridgeConfig, EnvelopeStyle, JobId};
use tempfile::TempDir;

/// Install a test subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "render_bridge=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

/// Config rooted in `base` with intervals short enough for tests.
pub fn test_config(style: EnvelopeStyle, base: &Path) -> BridgeConfig {
    BridgeConfig {
        poll_interval: Duration::from_millis(50),
        read_retries: 5,
        read_retry_delay: Duration::from_millis(100),
        ..BridgeConfig::new(style, base)
    }
}

/// A client with its directories created inside a fresh temp dir.
///
/// The `TempDir` must be kept alive for as long as the client is used.
pub async fn test_client(style: EnvelopeStyle) -> (TempDir, BridgeClient) {
    init_tracing();
    let dir = tempfile::tempdir().expect("tempdir");
    let client = BridgeClient::open(test_config(style, dir.path()))
        .await
        .expect("open bridge");
    (dir, client)
}

pub fn job_id(raw: &str) -> JobId {
    JobId::parse(raw).expect("valid job id")
}

/// Write a result file the way a worker would, in place.
pub async fn write_result(client: &BridgeClient, job_id: &JobId, body: &[u8]) {
    let path = client.output().result_path(job_id);
    tokio::fs::write(&path, body).await.expect("write result");
}

/// Create an empty file (or directory) at `path`, including parents.
pub async fn touch(path: &Path) {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.expect("create parent");
    }
    tokio::fs::write(path, b"").await.expect("touch");
}

/// Push the modification time of a file or directory `age` into the past.
pub fn age_file(path: &Path, age: Duration) {
    let file = std::fs::File::open(path).expect("open for mtime");
    let then = std::time::SystemTime::now() - age;
    file.set_modified(then).expect("set mtime");
}
