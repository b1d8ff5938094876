//! Diagnostics end to end, with a task standing in for the render worker.

mod common;

use std::path::PathBuf;
use std::time::Duration;

use tokio::task::JoinHandle;

use render_bridge::builders::FIELD_SCRIPT;
use render_bridge::diagnostics::DEFAULT_DIAGNOSTIC_SCRIPT;
use render_bridge::{
    BridgeClient, BridgeError, DiagnosticReport, EnvelopeStyle, JobDescriptor, JobKind,
};

use common::{test_client, write_result};

const REPORT: &str = r#"{
  "status": "error",
  "issues": ["Armature 'Rig' is in REST position"],
  "warnings": [],
  "armatures": [{"name": "Rig", "pose_position": "REST", "bone_count": 42}],
  "meshes": [{"name": "Body", "vertex_count": 5120}],
  "actions": [{"name": "Walk", "frame_start": 1.0, "frame_end": 24.0}],
  "vertex_deformation_test": null
}"#;

/// What the fake worker saw of the job it picked up.
struct Observed {
    kind: JobKind,
    script_path: PathBuf,
    script: String,
}

/// Wait for one queued job, then append `log` to the worker log and resolve
/// the job with `result`.
fn fake_worker(client: &BridgeClient, log: String, result: &'static str) -> JoinHandle<Observed> {
    let client = client.clone();
    tokio::spawn(async move {
        let job_id = loop {
            if let Some(id) = client.list_pending().await.expect("list").into_iter().next() {
                break id;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        };
        let bytes = tokio::fs::read(client.layout().job_path(&job_id))
            .await
            .expect("job file");
        let job = JobDescriptor::from_json(EnvelopeStyle::Flat, &bytes).expect("job");
        let script_path = PathBuf::from(
            job.parameter(FIELD_SCRIPT)
                .and_then(|v| v.as_str())
                .expect("script path"),
        );
        let script = tokio::fs::read_to_string(&script_path)
            .await
            .expect("script present while the job runs");

        let mut existing = tokio::fs::read_to_string(client.layout().log_path())
            .await
            .unwrap_or_default();
        existing.push_str(&log);
        tokio::fs::write(client.layout().log_path(), existing)
            .await
            .expect("log");

        let body = result.replace("{id}", job_id.as_str());
        write_result(&client, &job_id, body.as_bytes()).await;

        Observed {
            kind: job.kind(),
            script_path,
            script,
        }
    })
}

fn fenced(body: &str) -> String {
    format!(
        "Blender 4.1.0\n=== DIAGNOSTIC_JSON_START ===\n{body}\n=== DIAGNOSTIC_JSON_END ===\nBlender quit\n"
    )
}

#[tokio::test]
async fn report_is_recovered_from_the_worker_log() {
    let (_dir, client) = test_client(EnvelopeStyle::Flat).await;
    let worker = fake_worker(
        &client,
        fenced(REPORT),
        r#"{"job_id":"{id}","status":"complete"}"#,
    );

    let report = client.diagnose("/scenes/wolf.blend").await.expect("diagnose");
    let observed = worker.await.expect("worker");

    assert_eq!(observed.kind, JobKind::ScriptedRun);
    assert_eq!(observed.script, DEFAULT_DIAGNOSTIC_SCRIPT);
    assert!(!observed.script_path.exists(), "script left behind");

    assert_eq!(report.status, "error");
    assert_eq!(report.issues.len(), 1);
    assert_eq!(report.armatures[0]["bone_count"], 42);
    assert!(client.list_pending().await.expect("list").is_empty());
    assert!(client.list_completed().await.expect("list").is_empty());
}

#[tokio::test]
async fn log_without_markers_fails_soft() {
    let (_dir, client) = test_client(EnvelopeStyle::Flat).await;
    let worker = fake_worker(
        &client,
        "Traceback: bpy not available\n".to_string(),
        r#"{"job_id":"{id}","status":"complete"}"#,
    );

    let report = client
        .diagnose_with_script("/scenes/wolf.blend", "print('hello')")
        .await
        .expect("diagnose");
    let observed = worker.await.expect("worker");

    assert_eq!(observed.script, "print('hello')");
    assert!(!report.is_ok());
    assert_eq!(report.issues, vec!["Could not parse diagnostic output from log"]);
}

#[tokio::test]
async fn worker_failure_is_surfaced_and_script_removed() {
    let (_dir, client) = test_client(EnvelopeStyle::Flat).await;
    let worker = fake_worker(
        &client,
        String::new(),
        r#"{"job_id":"{id}","status":"failed","error_message":"blend file not found"}"#,
    );

    let err = client
        .diagnose("/missing.blend")
        .await
        .expect_err("worker failure");
    let observed = worker.await.expect("worker");

    assert!(err.is_job_failure());
    assert!(matches!(err, BridgeError::JobFailed { message, .. } if message == "blend file not found"));
    assert!(!observed.script_path.exists());
}

#[tokio::test]
async fn report_from_an_earlier_run_is_not_reused() {
    let (_dir, client) = test_client(EnvelopeStyle::Flat).await;
    tokio::fs::write(client.layout().log_path(), fenced(r#"{"status":"ok"}"#))
        .await
        .expect("seed log");
    let worker = fake_worker(
        &client,
        "Traceback: KeyError 'Armature'\n".to_string(),
        r#"{"job_id":"{id}","status":"complete"}"#,
    );

    let report = client.diagnose("/scenes/broken.blend").await.expect("diagnose");
    worker.await.expect("worker");

    assert_eq!(report, DiagnosticReport::unparsed());
}
