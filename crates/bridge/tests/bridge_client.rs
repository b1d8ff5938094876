//! Submit/poll/wait/cleanup against a real directory tree, with the test
//! playing the worker.

mod common;

use std::time::{Duration, Instant};

use assert_matches::assert_matches;

use render_bridge::builders::{BiomeShowcase, JobBuilder, RenderBlend, ScriptedRun};
use render_bridge::{
    BridgeClient, BridgeConfig, BridgeError, EnvelopeStyle, JobDescriptor, JobStatus,
};

use common::{job_id, test_client, test_config, write_result};

// ---------------------------------------------------------------------------
// Test: poll before and after the worker resolves a job
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failed_result_is_observed_and_cleaned_up() {
    let (_dir, client) = test_client(EnvelopeStyle::Flat).await;
    let id = job_id("abc123");

    let job = RenderBlend::new("/scenes/tree.blend").build_with_id(id.clone());
    assert_eq!(client.submit(&job).await.expect("submit"), id);
    assert!(client.poll(&id).await.expect("poll").is_none());

    // The flat family writes its fields at the top level, beside the id.
    let bytes = tokio::fs::read(client.layout().job_path(&id))
        .await
        .expect("queued file");
    let wire: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
    assert_eq!(wire["job_id"], "abc123");
    assert_eq!(wire["blend_file"], "/scenes/tree.blend");
    assert_eq!(wire["render_engine"], "BLENDER_EEVEE");
    assert!(wire.get("params").is_none());
    assert!(wire.get("job_type").is_none());

    write_result(
        &client,
        &id,
        br#"{"job_id":"abc123","status":"failed","error_message":"boom"}"#,
    )
    .await;

    let result = client.poll(&id).await.expect("poll").expect("resolved");
    assert_eq!(result.status, JobStatus::Failed);
    assert_eq!(result.error_message.as_deref(), Some("boom"));

    let report = client.cleanup(&id).await;
    assert!(report.is_clean());
    assert!(!client.layout().job_path(&id).exists());
    assert!(!client.output().result_path(&id).exists());
}

#[tokio::test]
async fn queued_file_is_the_submitted_job() {
    let (_dir, client) = test_client(EnvelopeStyle::Nested).await;
    let job = BiomeShowcase::new("tundra").build();
    let id = client.submit(&job).await.expect("submit");

    let bytes = tokio::fs::read(client.layout().job_path(&id))
        .await
        .expect("queued file");
    let queued = JobDescriptor::from_json(EnvelopeStyle::Nested, &bytes).expect("decode");
    assert_eq!(queued, job);
    assert_eq!(client.list_pending().await.expect("list"), vec![id]);
}

// ---------------------------------------------------------------------------
// Test: wait outcomes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn wait_returns_success_written_mid_wait() {
    let (_dir, client) = test_client(EnvelopeStyle::Flat).await;
    let id = client
        .submit(&RenderBlend::new("/a.blend").build_with_id(job_id("mid1")))
        .await
        .expect("submit");

    let worker = {
        let client = client.clone();
        let id = id.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(150)).await;
            write_result(
                &client,
                &id,
                br#"{"job_id":"mid1","status":"complete","output_files":["mid1/model.glb"]}"#,
            )
            .await;
        })
    };

    let result = client.wait(&id, Duration::from_secs(5)).await.expect("wait");
    worker.await.expect("worker task");
    assert!(result.is_success());
    assert_eq!(result.output_files, vec!["mid1/model.glb"]);
}

#[tokio::test]
async fn failure_with_outputs_is_never_success() {
    let (_dir, client) = test_client(EnvelopeStyle::Flat).await;
    let id = job_id("fail1");
    write_result(
        &client,
        &id,
        br#"{"job_id":"fail1","status":"failed","output_files":["fail1/half.glb"],
             "error_message":"GPU lost","error_traceback":"Traceback (most recent call last)"}"#,
    )
    .await;

    let result = client.wait(&id, Duration::from_secs(1)).await.expect("wait");
    assert!(result.is_failure());
    assert!(!result.is_success());

    let err = client
        .run(
            &RenderBlend::new("/a.blend").build_with_id(id.clone()),
            Duration::from_secs(1),
        )
        .await
        .expect_err("worker failure");
    assert_matches!(
        err,
        BridgeError::JobFailed { message, detail: Some(_), .. } if message == "GPU lost"
    );
}

#[tokio::test]
async fn timeout_fires_within_one_poll_interval() {
    let (_dir, client) = test_client(EnvelopeStyle::Flat).await;
    let id = client
        .submit(&RenderBlend::new("/a.blend").build())
        .await
        .expect("submit");
    let timeout = Duration::from_millis(300);

    let started = Instant::now();
    let result = client.wait(&id, timeout).await.expect("wait");
    let elapsed = started.elapsed();

    assert_eq!(result.status, JobStatus::Timeout);
    assert!(!result.is_failure());
    assert!(elapsed >= timeout, "returned early: {elapsed:?}");
    // One poll interval plus scheduling slack.
    let ceiling = timeout + client.config().poll_interval + Duration::from_millis(200);
    assert!(elapsed <= ceiling, "returned late: {elapsed:?}");

    // The job stays queued for the worker.
    assert!(client.layout().job_path(&id).exists());
}

#[tokio::test]
async fn run_reports_timeout_as_its_own_error() {
    let (_dir, client) = test_client(EnvelopeStyle::Flat).await;
    let err = client
        .run(&RenderBlend::new("/a.blend").build(), Duration::from_millis(100))
        .await
        .expect_err("timeout");
    assert!(err.is_timeout());
    assert!(!err.is_job_failure());
}

#[tokio::test]
async fn rewait_after_timeout_picks_up_late_result() {
    let (_dir, client) = test_client(EnvelopeStyle::Flat).await;
    let id = client
        .submit(&RenderBlend::new("/a.blend").build_with_id(job_id("late1")))
        .await
        .expect("submit");

    let first = client.wait(&id, Duration::from_millis(100)).await.expect("wait");
    assert!(first.is_timeout());

    write_result(&client, &id, br#"{"job_id":"late1","status":"complete"}"#).await;
    let second = client.wait(&id, Duration::from_secs(1)).await.expect("wait");
    assert!(second.is_success());
}

#[tokio::test]
async fn wait_without_deadline_returns_existing_result() {
    let (_dir, client) = test_client(EnvelopeStyle::Flat).await;
    let id = job_id("big1");
    write_result(&client, &id, br#"{"job_id":"big1","status":"complete"}"#).await;

    let result = client.wait(&id, Duration::MAX).await.expect("wait");
    assert!(result.is_success());
}

#[tokio::test]
async fn torn_result_does_not_hold_wait_past_its_deadline() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = BridgeConfig {
        read_retries: 50,
        read_retry_delay: Duration::from_millis(100),
        ..test_config(EnvelopeStyle::Flat, dir.path())
    };
    let client = BridgeClient::open(config).await.expect("open bridge");
    let id = job_id("torn1");
    write_result(&client, &id, b"").await;

    let timeout = Duration::from_millis(300);
    let started = Instant::now();
    let result = client.wait(&id, timeout).await.expect("wait");
    let elapsed = started.elapsed();

    assert!(result.is_timeout());
    let ceiling = timeout + client.config().poll_interval + Duration::from_millis(300);
    assert!(elapsed <= ceiling, "returned late: {elapsed:?}");
}

#[tokio::test]
async fn worker_timeout_status_is_a_job_failure() {
    let (_dir, client) = test_client(EnvelopeStyle::Flat).await;
    let id = job_id("wto1");
    write_result(
        &client,
        &id,
        br#"{"job_id":"wto1","status":"timeout","error_message":"render exceeded 600s"}"#,
    )
    .await;

    let result = client.poll(&id).await.expect("poll").expect("resolved");
    assert_eq!(result.status, JobStatus::Failed);

    let err = client
        .run(&RenderBlend::new("/a.blend").build_with_id(id), Duration::from_secs(1))
        .await
        .expect_err("worker failure");
    assert!(!err.is_timeout());
    assert_matches!(err, BridgeError::JobFailed { message, .. } if message == "render exceeded 600s");
}

#[tokio::test]
async fn running_status_keeps_the_job_unresolved() {
    let (_dir, client) = test_client(EnvelopeStyle::Flat).await;
    let id = job_id("run1");
    write_result(&client, &id, br#"{"job_id":"run1","status":"running"}"#).await;

    assert!(client.poll(&id).await.expect("poll").is_none());
    let result = client.wait(&id, Duration::from_millis(100)).await.expect("wait");
    assert!(result.is_timeout());
}

// ---------------------------------------------------------------------------
// Test: submission guards
// ---------------------------------------------------------------------------

#[tokio::test]
async fn job_of_the_other_family_is_rejected() {
    let (_dir, client) = test_client(EnvelopeStyle::Flat).await;
    let err = client
        .submit(&BiomeShowcase::new("tundra").build())
        .await
        .expect_err("style mismatch");
    assert_matches!(
        err,
        BridgeError::StyleMismatch { expected: EnvelopeStyle::Nested, style: EnvelopeStyle::Flat, .. }
    );
    assert!(client.list_pending().await.expect("list").is_empty());
}

#[tokio::test]
async fn queue_in_unwritable_location_is_an_infrastructure_error() {
    let (_dir, client) = test_client(EnvelopeStyle::Flat).await;
    // Replace the queue directory with a plain file.
    let queue_dir = client.layout().queue_dir();
    tokio::fs::remove_dir_all(&queue_dir).await.expect("remove queue");
    tokio::fs::write(&queue_dir, b"").await.expect("block queue");

    let err = client
        .submit(&ScriptedRun::new("/a.blend", "/s.py").build())
        .await
        .expect_err("io error");
    assert_matches!(err, BridgeError::Io { .. });
    assert!(!client.probe_writable().await);
}

// ---------------------------------------------------------------------------
// Test: cleanup
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cleanup_is_idempotent_and_removes_artifacts() {
    let (_dir, client) = test_client(EnvelopeStyle::Flat).await;
    let id = client
        .submit(&RenderBlend::new("/a.blend").build_with_id(job_id("cl1")))
        .await
        .expect("submit");
    write_result(&client, &id, br#"{"job_id":"cl1","status":"complete"}"#).await;
    common::touch(&client.artifact_path(&id, "previews/front.png")).await;

    let first = client.cleanup(&id).await;
    assert!(first.is_clean());
    assert_eq!(first.removed.len(), 3);
    assert!(!client.layout().artifact_dir(&id).exists());

    let second = client.cleanup(&id).await;
    assert!(second.is_clean());
    assert!(second.removed.is_empty());
}

#[tokio::test]
async fn nested_cleanup_also_removes_the_image() {
    let (_dir, client) = test_client(EnvelopeStyle::Nested).await;
    let id = client
        .submit(&BiomeShowcase::new("tundra").build_with_id(job_id("img1")))
        .await
        .expect("submit");
    let image = client.layout().conventional_image_path(&id);
    common::touch(&image).await;
    write_result(&client, &id, br#"{"status":"success","render_time_seconds":1.0}"#).await;

    let result = client.poll(&id).await.expect("poll").expect("resolved");
    assert!(result.is_success());

    client.cleanup(&id).await;
    assert!(!image.exists());
    assert!(!client.output().result_path(&id).exists());
}

#[tokio::test]
async fn probe_writable_leaves_no_trace() {
    let (_dir, client) = test_client(EnvelopeStyle::Nested).await;
    assert!(client.probe_writable().await);
    let mut entries = std::fs::read_dir(client.layout().queue_dir()).expect("read_dir");
    assert!(entries.next().is_none());
}
