//! Job lifecycle tests: create, dispatch through a launcher, poll.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use toolhub_core::config::MergePdfsConfig;
use toolhub_core::error::ErrorKind;
use toolhub_core::types::id::JobId;
use toolhub_database::{JobStore, MemoryJobStore};
use toolhub_entity::blob::NewBlob;
use toolhub_entity::job::update::NO_ERROR_OUTPUT;
use toolhub_storage::{BlobStore, MemoryBlobStore};
use toolhub_worker::commands::MergePdfsHandler;
use toolhub_worker::executor::{CommandContext, CommandHandler, HandlerError, HandlerRegistry};
use toolhub_worker::{CommandExecutor, Dispatcher, InProcessLauncher, SubprocessLauncher};

#[derive(Debug)]
struct FakeMerge;

#[async_trait]
impl CommandHandler for FakeMerge {
    fn name(&self) -> &str {
        "MergePdfs"
    }

    async fn handle(&self, ctx: CommandContext<'_>) -> Result<Value, HandlerError> {
        let count = ctx
            .arguments
            .get("file_ids")
            .and_then(Value::as_array)
            .map(Vec::len)
            .ok_or_else(|| HandlerError::Validation("file_ids must be a list".into()))?;
        Ok(json!({ "output_id": "b3", "input_count": count }))
    }
}

#[derive(Debug)]
struct Crashing;

#[async_trait]
impl CommandHandler for Crashing {
    fn name(&self) -> &str {
        "Crash"
    }

    async fn handle(&self, _ctx: CommandContext<'_>) -> Result<Value, HandlerError> {
        Err(HandlerError::Failed("merge tool crashed".into()))
    }
}

struct Harness {
    jobs: Arc<MemoryJobStore>,
    blobs: Arc<MemoryBlobStore>,
    dispatcher: Dispatcher,
}

fn in_process(registry: HandlerRegistry) -> Harness {
    let jobs = Arc::new(MemoryJobStore::new());
    let blobs = Arc::new(MemoryBlobStore::new());
    let executor = Arc::new(CommandExecutor::new(
        registry,
        jobs.clone() as Arc<dyn JobStore>,
        blobs.clone() as Arc<dyn BlobStore>,
    ));
    let dispatcher = Dispatcher::new(
        jobs.clone() as Arc<dyn JobStore>,
        Arc::new(InProcessLauncher::new(executor)),
    );
    Harness {
        jobs,
        blobs,
        dispatcher,
    }
}

fn fake_registry() -> HandlerRegistry {
    HandlerRegistry::new()
        .with(Arc::new(FakeMerge))
        .with(Arc::new(Crashing))
}

/// Dispatcher whose executor is `sh -c <script>`; the job ID arrives as `$0`.
fn shell(script: &str, timeout: Duration) -> (Arc<MemoryJobStore>, Dispatcher) {
    let jobs = Arc::new(MemoryJobStore::new());
    let launcher = SubprocessLauncher::new("sh").args(["-c", script]);
    let dispatcher = Dispatcher::new(jobs.clone() as Arc<dyn JobStore>, Arc::new(launcher))
        .with_timeout(timeout);
    (jobs, dispatcher)
}

fn args(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

async fn assert_invariant(jobs: &MemoryJobStore) {
    for job in jobs.find_all().await.unwrap() {
        assert_eq!(
            job.exit_state == -1,
            job.completed_at.is_none(),
            "job {} has exit_state {} and completed_at {:?}",
            job.id,
            job.exit_state,
            job.completed_at
        );
    }
}

#[tokio::test]
async fn test_merge_scenario_reports_output_id() {
    let h = in_process(fake_registry());
    let id = h
        .dispatcher
        .create_job("MergePdfs", args(json!({ "file_ids": ["b1", "b2"] })))
        .await
        .unwrap();

    let created = h.dispatcher.get_status(&id.to_string()).await.unwrap();
    assert_eq!(created.exit_state, -1);
    assert!(created.started_at.is_none());

    let result = h.dispatcher.dispatch(id).await.unwrap();
    assert_eq!(result.exit_state, 0);

    let job = h.dispatcher.get_status(&id.to_string()).await.unwrap();
    assert_eq!(job.exit_state, 0);
    assert!(job.stdout.as_deref().unwrap().contains("\"b3\""));
    assert!(job.stderr.is_none());
    assert!(job.started_at.is_some());
    assert!(job.completed_at.is_some());
    assert_invariant(&h.jobs).await;
}

#[tokio::test]
async fn test_handler_failure_records_exit_one() {
    let h = in_process(fake_registry());
    let id = h.dispatcher.create_job("Crash", Map::new()).await.unwrap();

    let result = h.dispatcher.dispatch(id).await.unwrap();
    assert_eq!(result.exit_state, 1);
    assert!(result.stdout.is_none());
    assert!(
        result
            .stderr
            .as_deref()
            .unwrap()
            .starts_with("Command failed: merge tool crashed")
    );
    assert!(result.completed_at.is_some());
    assert_invariant(&h.jobs).await;
}

#[tokio::test]
async fn test_unknown_command_is_rejected_with_exit_three() {
    let h = in_process(fake_registry());
    let id = h.dispatcher.create_job("NoSuchTool", Map::new()).await.unwrap();

    let result = h.dispatcher.dispatch(id).await.unwrap();
    assert_eq!(result.exit_state, 3);
    assert!(result.stderr.as_deref().unwrap().contains("Unknown command"));
    assert_invariant(&h.jobs).await;
}

#[tokio::test]
async fn test_spawn_failure_records_dispatch_failure() {
    let jobs = Arc::new(MemoryJobStore::new());
    let dispatcher = Dispatcher::new(
        jobs.clone() as Arc<dyn JobStore>,
        Arc::new(SubprocessLauncher::new("/nonexistent/toolhub-exec")),
    );
    let id = dispatcher.create_job("MergePdfs", Map::new()).await.unwrap();

    let result = dispatcher.dispatch(id).await.unwrap();
    assert_eq!(result.exit_state, 2);
    assert!(
        result
            .stderr
            .as_deref()
            .unwrap()
            .starts_with("Process management error")
    );
    assert!(result.completed_at.is_some());
    assert_invariant(&jobs).await;
}

#[tokio::test]
async fn test_nonzero_exit_overwrites_with_captured_stderr() {
    let (jobs, dispatcher) = shell("echo 'qpdf: bad page' >&2; exit 3", Duration::from_secs(10));
    let id = dispatcher.create_job("MergePdfs", Map::new()).await.unwrap();

    let result = dispatcher.dispatch(id).await.unwrap();
    assert_eq!(result.exit_state, 3);
    assert_eq!(result.stderr.as_deref().map(str::trim), Some("qpdf: bad page"));
    assert_invariant(&jobs).await;
}

#[tokio::test]
async fn test_silent_failure_gets_placeholder_stderr() {
    let (jobs, dispatcher) = shell("exit 5", Duration::from_secs(10));
    let id = dispatcher.create_job("MergePdfs", Map::new()).await.unwrap();

    let result = dispatcher.dispatch(id).await.unwrap();
    assert_eq!(result.exit_state, 5);
    assert_eq!(result.stderr.as_deref(), Some(NO_ERROR_OUTPUT));
    assert_invariant(&jobs).await;
}

#[tokio::test]
async fn test_clean_exit_without_result_is_dispatch_failure() {
    let (jobs, dispatcher) = shell("exit 0", Duration::from_secs(10));
    let id = dispatcher.create_job("MergePdfs", Map::new()).await.unwrap();

    let result = dispatcher.dispatch(id).await.unwrap();
    assert_eq!(result.exit_state, 2);
    assert!(result.completed_at.is_some());
    assert_invariant(&jobs).await;
}

#[tokio::test]
async fn test_timeout_kills_executor() {
    let (jobs, dispatcher) = shell("sleep 30", Duration::from_millis(200));
    let id = dispatcher.create_job("MergePdfs", Map::new()).await.unwrap();

    let result = dispatcher.dispatch(id).await.unwrap();
    assert_eq!(result.exit_state, 2);
    assert!(result.stderr.as_deref().unwrap().contains("timed out"));
    assert_invariant(&jobs).await;
}

#[tokio::test]
async fn test_signal_termination_is_dispatch_failure() {
    let (jobs, dispatcher) = shell("kill -9 $$", Duration::from_secs(10));
    let id = dispatcher.create_job("MergePdfs", Map::new()).await.unwrap();

    let result = dispatcher.dispatch(id).await.unwrap();
    assert_eq!(result.exit_state, 2);
    assert!(result.stderr.as_deref().unwrap().contains("signal"));
    assert_invariant(&jobs).await;
}

#[tokio::test]
async fn test_get_status_of_unknown_id_is_not_found() {
    let h = in_process(fake_registry());

    let err = h.dispatcher.get_status("nonexistent").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    let err = h
        .dispatcher
        .get_status(&JobId::new().to_string())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_dispatch_unknown_id_is_not_found() {
    let h = in_process(fake_registry());
    let err = h.dispatcher.dispatch(JobId::new()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
    assert!(h.jobs.is_empty());
}

#[tokio::test]
async fn test_second_dispatch_is_conflict_and_leaves_record() {
    let h = in_process(fake_registry());
    let id = h
        .dispatcher
        .create_job("MergePdfs", args(json!({ "file_ids": ["b1", "b2"] })))
        .await
        .unwrap();
    h.dispatcher.dispatch(id).await.unwrap();
    let before = h.jobs.find_one(id).await.unwrap().unwrap();

    let err = h.dispatcher.dispatch(id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);
    assert_eq!(h.jobs.find_one(id).await.unwrap().unwrap(), before);
}

#[tokio::test]
async fn test_create_job_rejects_empty_name() {
    let h = in_process(fake_registry());
    let err = h.dispatcher.create_job("  ", Map::new()).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    assert!(h.jobs.is_empty());
}

#[tokio::test]
async fn test_submit_runs_in_background() {
    let h = in_process(fake_registry());
    let id = h
        .dispatcher
        .submit("MergePdfs", args(json!({ "file_ids": ["b1", "b2"] })))
        .await
        .unwrap();

    let mut job = h.dispatcher.get_status(&id.to_string()).await.unwrap();
    for _ in 0..100 {
        if job.is_terminal() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        job = h.dispatcher.get_status(&id.to_string()).await.unwrap();
    }
    assert_eq!(job.exit_state, 0);
}

fn concat_tool() -> MergePdfsConfig {
    MergePdfsConfig {
        program: "sh".into(),
        args: vec![
            "-c".into(),
            "cat \"$@\" > \"$0\"".into(),
            "{output}".into(),
            "{inputs}".into(),
        ],
        timeout_seconds: 10,
    }
}

#[tokio::test]
async fn test_merge_pdfs_stores_output_blob() {
    let temp = tempfile::tempdir().unwrap();
    let registry = HandlerRegistry::new().with(Arc::new(MergePdfsHandler::new(
        concat_tool(),
        temp.path().to_path_buf(),
    )));
    let h = in_process(registry);

    let a = h
        .blobs
        .store(NewBlob::new("a.pdf", b"%PDF-A".to_vec()).content_type("application/pdf"))
        .await
        .unwrap();
    let b = h
        .blobs
        .store(NewBlob::new("b.pdf", b"%PDF-B".to_vec()).content_type("application/pdf"))
        .await
        .unwrap();

    let id = h
        .dispatcher
        .create_job(
            "MergePdfs",
            args(json!({
                "file_ids": [a.to_string(), b.to_string()],
                "user_id": "u1",
                "user_email": "u1@example.com",
            })),
        )
        .await
        .unwrap();

    let result = h.dispatcher.dispatch(id).await.unwrap();
    assert_eq!(result.exit_state, 0, "stderr: {:?}", result.stderr);

    let output: Value = serde_json::from_str(result.stdout.as_deref().unwrap()).unwrap();
    assert_eq!(output["input_count"], 2);
    assert_eq!(output["filename"], "merged.pdf");

    let output_id = output["output_id"].as_str().unwrap().parse().unwrap();
    let merged = h.blobs.fetch(output_id).await.unwrap().unwrap();
    assert_eq!(merged.content.as_ref(), b"%PDF-A%PDF-B");
    assert_eq!(merged.meta.content_type.as_deref(), Some("application/pdf"));
    assert_eq!(merged.meta.metadata["purpose"], "merge_output");
    assert_eq!(merged.meta.metadata["source_job_id"], id.to_string());
    assert_eq!(merged.meta.metadata["user_id"], "u1");

    assert!(!temp.path().join("merge").join(id.to_string()).exists());
}

#[tokio::test]
async fn test_merge_pdfs_missing_input_fails() {
    let temp = tempfile::tempdir().unwrap();
    let registry = HandlerRegistry::new().with(Arc::new(MergePdfsHandler::new(
        concat_tool(),
        temp.path().to_path_buf(),
    )));
    let h = in_process(registry);

    let present = h
        .blobs
        .store(NewBlob::new("a.pdf", b"%PDF-A".to_vec()))
        .await
        .unwrap();
    let missing = toolhub_core::types::id::BlobId::new();

    let id = h
        .dispatcher
        .create_job(
            "MergePdfs",
            args(json!({ "file_ids": [present.to_string(), missing.to_string()] })),
        )
        .await
        .unwrap();

    let result = h.dispatcher.dispatch(id).await.unwrap();
    assert_eq!(result.exit_state, 1);
    let stderr = result.stderr.unwrap();
    assert!(stderr.contains(&missing.to_string()));
    assert!(stderr.contains("not found"));
    assert_eq!(h.blobs.len(), 1);
}

#[tokio::test]
async fn test_merge_pdfs_validates_arguments() {
    let temp = tempfile::tempdir().unwrap();
    let registry = HandlerRegistry::new().with(Arc::new(MergePdfsHandler::new(
        concat_tool(),
        temp.path().to_path_buf(),
    )));
    let h = in_process(registry);

    let id = h
        .dispatcher
        .create_job("MergePdfs", args(json!({ "file_ids": ["only-one"] })))
        .await
        .unwrap();

    let result = h.dispatcher.dispatch(id).await.unwrap();
    assert_eq!(result.exit_state, 1);
    assert!(result.stderr.unwrap().contains("Invalid arguments"));
}
