use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::batch::BatchSequencer;
use crate::config::Config;
use crate::error::{ClipBatchError, Result};
use crate::events::EventSender;
use crate::invocation::{InvocationBuilder, InvocationContext};
use crate::library::{self, VideoEntry};
use crate::media::{MediaExecutor, MediaExecutorFactory};
use crate::messages::MessageCatalog;
use crate::paths;
use crate::report::{ResultReporter, TransformResponse};
use crate::request::{OperationKind, OperationSpec, TransformRequest};
use crate::runner::JobRunner;

/// Request entry point: validate, resolve directories, build, run, report.
pub struct Workflow {
    config: Config,
    executor: Arc<dyn MediaExecutor>,
    messages: MessageCatalog,
}

impl Workflow {
    pub fn new(config: Config) -> Result<Self> {
        let executor = MediaExecutorFactory::create_executor(config.media.clone());
        let messages = match &config.messages.catalog_path {
            Some(path) => MessageCatalog::from_file(path)?,
            None => MessageCatalog::new(),
        };

        Ok(Self::with_executor(config, executor, messages))
    }

    pub fn with_executor(
        config: Config,
        executor: Arc<dyn MediaExecutor>,
        messages: MessageCatalog,
    ) -> Self {
        Self {
            config,
            executor,
            messages,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Check that the configured ffmpeg binary runs
    pub fn check_availability(&self) -> Result<()> {
        self.executor.check_availability()
    }

    pub async fn version_info(&self) -> Result<String> {
        self.executor.get_version_info().await
    }

    /// List the videos in a folder, using the configured extension
    pub async fn list_videos<P: AsRef<Path>>(&self, dir: P) -> Result<Vec<VideoEntry>> {
        library::list_videos(dir, &self.config.library.extension).await
    }

    /// Parse and handle a JSON request. Input that does not parse is answered
    /// with an invalid-request response like any other rejected request.
    pub async fn handle_json(&self, raw: &str, events: Option<EventSender>) -> TransformResponse {
        match serde_json::from_str::<TransformRequest>(raw) {
            Ok(request) => self.handle(request, events).await,
            Err(e) => {
                let err = ClipBatchError::from(e);
                warn!("Malformed request rejected: {}", err);
                ResultReporter::malformed(&self.messages, operation_hint(raw), &err)
            }
        }
    }

    /// Handle one request. Every failure is folded into the response.
    pub async fn handle(
        &self,
        request: TransformRequest,
        events: Option<EventSender>,
    ) -> TransformResponse {
        let operation = request.operation;
        info!(
            "Handling {} request for {} item(s)",
            operation,
            request.items.len()
        );

        match self.execute(&request, events).await {
            Ok(response) => response,
            Err(e) => {
                warn!("{} request rejected: {}", operation, e);
                ResultReporter::new(&self.messages, operation).rejected(&e)
            }
        }
    }

    async fn execute(
        &self,
        request: &TransformRequest,
        events: Option<EventSender>,
    ) -> Result<TransformResponse> {
        let operation = request.operation;
        // nothing touches the disk before validation passes
        let spec = request.validate(&self.config)?;

        let resolved = paths::resolve(
            request.source_directory.as_deref(),
            request.output_directory.as_deref(),
            operation.label(),
        )
        .await?;

        let ctx = InvocationContext::new(resolved);
        let builder = InvocationBuilder::new(self.config.media.clone());
        let runner = JobRunner::new(self.executor.clone()).with_events(events);
        let reporter = ResultReporter::new(&self.messages, operation);

        let response = match spec {
            OperationSpec::Merge => {
                let invocation = builder.merge(&ctx, &request.items)?;
                reporter.job(runner.run(invocation).await, &ctx.output_dir)
            }
            OperationSpec::Trim { .. } => {
                let invocation = builder.for_item(&ctx, &spec, &request.items[0])?;
                reporter.job(runner.run(invocation).await, &ctx.output_dir)
            }
            OperationSpec::Speedup { .. } | OperationSpec::Timelapse { .. } => {
                let result = BatchSequencer::new(&runner)
                    .run_batch(&request.items, &ctx.output_dir, |item| {
                        builder.for_item(&ctx, &spec, item)
                    })
                    .await?;
                reporter.batch(result)
            }
        };

        Ok(response)
    }
}

/// Operation named by a request that failed to parse, if it names a valid one
fn operation_hint(raw: &str) -> Option<OperationKind> {
    let value: serde_json::Value = serde_json::from_str(raw).ok()?;
    serde_json::from_value(value.get("operation")?.clone()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::events::JobEvent;
    use crate::report::{BatchResponse, FailureResponse, JobResponse};
    use crate::runner::testing::FakeExecutor;
    use serde_json::Number;

    fn workflow(executor: Arc<FakeExecutor>) -> Workflow {
        Workflow::with_executor(Config::default(), executor, MessageCatalog::new())
    }

    fn request(operation: OperationKind, dir: &Path, items: &[&str]) -> TransformRequest {
        TransformRequest::new(
            operation,
            dir,
            items.iter().map(|s| s.to_string()).collect(),
        )
    }

    fn expect_batch(response: TransformResponse) -> BatchResponse {
        match response {
            TransformResponse::Batch(batch) => batch,
            other => panic!("expected batch response, got {:?}", other),
        }
    }

    fn expect_job(response: TransformResponse) -> JobResponse {
        match response {
            TransformResponse::Job(job) => job,
            other => panic!("expected job response, got {:?}", other),
        }
    }

    fn expect_failure(response: TransformResponse) -> FailureResponse {
        match response {
            TransformResponse::Failure(failure) => failure,
            other => panic!("expected failure response, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timelapse_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let executor = Arc::new(FakeExecutor::default());
        let mut req = request(OperationKind::Timelapse, dir.path(), &["a.mp4", "b.mp4"]);
        req.parameters.target_fps = Some(Number::from(30));

        let batch = expect_batch(workflow(executor.clone()).handle(req, None).await);

        assert_eq!(batch.processed_count, 2);
        assert_eq!(batch.results.len(), 2);
        for (result, original) in batch.results.iter().zip(["a.mp4", "b.mp4"]) {
            assert_eq!(result.original, original);
            assert!(result.output.starts_with("timelapse-30fps-"));
            assert!(result.output.ends_with(original));
            assert_eq!(result.output_path.parent(), Some(batch.output_directory.as_path()));
        }
        assert_eq!(batch.output_directory, dir.path().join("timelapse_output"));
        assert!(batch.output_directory.is_dir());
        assert_eq!(executor.runs().len(), 2);
    }

    #[tokio::test]
    async fn test_merge_end_to_end_cleans_up_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let executor = Arc::new(FakeExecutor::default());
        let req = request(OperationKind::Merge, dir.path(), &["b.mp4", "a.mp4"]);

        let job = expect_job(workflow(executor.clone()).handle(req, None).await);

        assert!(job.output_file_name.starts_with("merged-"));
        assert!(job.output_file_name.ends_with(".mp4"));
        assert_eq!(job.output_directory, dir.path().join("merged_output"));

        let seen = executor.runs()[0].list_contents.clone().unwrap();
        let expected = format!(
            "file '{}'\nfile '{}'",
            dir.path().join("b.mp4").display(),
            dir.path().join("a.mp4").display()
        );
        assert_eq!(seen, expected);

        let leftovers: Vec<_> = std::fs::read_dir(&job.output_directory)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("videolist"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_trim_default_window_and_tool_failure() {
        let dir = tempfile::tempdir().unwrap();
        let executor = Arc::new(FakeExecutor::failing_on(&["short.mp4"]));
        let req = request(OperationKind::Trim, dir.path(), &["short.mp4"]);

        let failure = expect_failure(workflow(executor.clone()).handle(req, None).await);
        assert_eq!(failure.error_kind, ErrorKind::ToolExecutionFailure);
        assert_eq!(failure.error_message, "Trimming failed");
        assert!(failure.partial_results.is_none());

        let args = executor.runs()[0].command.args.clone();
        let ss = args.iter().position(|a| a == "-ss").unwrap();
        let t = args.iter().position(|a| a == "-t").unwrap();
        assert_eq!(args[ss + 1], "0");
        assert_eq!(args[t + 1], "30");
    }

    #[tokio::test]
    async fn test_speedup_invalid_factor_starts_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let executor = Arc::new(FakeExecutor::default());
        let mut req = request(OperationKind::Speedup, dir.path(), &["a.mp4"]);
        req.parameters.speed_factor = Some(Number::from(3));

        let failure = expect_failure(workflow(executor.clone()).handle(req, None).await);
        assert_eq!(failure.error_kind, ErrorKind::InvalidRequest);
        assert_eq!(failure.partial_results, Some(Vec::new()));
        assert!(executor.runs().is_empty());
        // rejected before the output directory is created
        assert!(!dir.path().join("speedup_output").exists());
    }

    #[tokio::test]
    async fn test_speedup_partial_failure() {
        let dir = tempfile::tempdir().unwrap();
        let executor = Arc::new(FakeExecutor::failing_on(&["b.mp4"]));
        let mut req = request(OperationKind::Speedup, dir.path(), &["a.mp4", "b.mp4", "c.mp4"]);
        req.parameters.speed_factor = Some(Number::from(8));

        let failure = expect_failure(workflow(executor.clone()).handle(req, None).await);
        assert_eq!(failure.error_kind, ErrorKind::ToolExecutionFailure);
        assert_eq!(failure.failed_item.as_deref(), Some("b.mp4"));
        assert!(failure.details.contains("b.mp4"));
        let partial = failure.partial_results.unwrap();
        assert_eq!(partial.len(), 1);
        assert!(partial[0].output.starts_with("8x-"));
        assert_eq!(executor.runs().len(), 2);
    }

    #[tokio::test]
    async fn test_json_parameters_of_wrong_type_are_invalid_requests() {
        let dir = tempfile::tempdir().unwrap();
        let executor = Arc::new(FakeExecutor::default());
        let workflow = workflow(executor.clone());
        let folder = serde_json::to_string(dir.path()).unwrap();

        for factor in ["2.5", "\"4\""] {
            let raw = format!(
                r#"{{"operation": "speedup", "folder": {}, "videos": ["a.mp4"],
                     "speedFactor": {}}}"#,
                folder, factor
            );
            let failure = expect_failure(workflow.handle_json(&raw, None).await);
            assert_eq!(failure.error_kind, ErrorKind::InvalidRequest, "speedFactor {}", factor);
            assert_eq!(failure.error_message, "The request is invalid");
            assert_eq!(failure.partial_results, Some(Vec::new()));
        }
        assert!(executor.runs().is_empty());
        assert!(!dir.path().join("speedup_output").exists());
    }

    #[tokio::test]
    async fn test_unparseable_json_is_invalid_request() {
        let executor = Arc::new(FakeExecutor::default());
        let failure = expect_failure(workflow(executor).handle_json("{\"operation\":", None).await);
        assert_eq!(failure.error_kind, ErrorKind::InvalidRequest);
        assert!(failure.details.contains("Malformed JSON"));
        assert!(failure.partial_results.is_none());
    }

    #[tokio::test]
    async fn test_json_request_runs() {
        let dir = tempfile::tempdir().unwrap();
        let executor = Arc::new(FakeExecutor::default());
        let raw = format!(
            r#"{{"operation": "timelapse", "folder": {}, "videos": ["a.mp4"], "targetFps": 30}}"#,
            serde_json::to_string(dir.path()).unwrap()
        );

        let batch = expect_batch(workflow(executor).handle_json(&raw, None).await);
        assert_eq!(batch.processed_count, 1);
    }

    #[tokio::test]
    async fn test_merge_item_with_newline_starts_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let executor = Arc::new(FakeExecutor::default());
        let req = request(OperationKind::Merge, dir.path(), &["x.mp4\nfile b.mp4", "b.mp4"]);

        let failure = expect_failure(workflow(executor.clone()).handle(req, None).await);
        assert_eq!(failure.error_kind, ErrorKind::InvalidRequest);
        assert!(executor.runs().is_empty());
        assert!(!dir.path().join("merged_output").exists());
    }

    #[tokio::test]
    async fn test_custom_output_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("exports");
        let executor = Arc::new(FakeExecutor::default());
        let mut req = request(OperationKind::Speedup, dir.path(), &["a.mp4"]);
        req.parameters.speed_factor = Some(Number::from(2));
        req.output_directory = Some(out.clone());

        let batch = expect_batch(workflow(executor).handle(req, None).await);
        assert_eq!(batch.output_directory, out);
        assert!(out.is_dir());
    }

    #[tokio::test]
    async fn test_missing_source_directory() {
        let executor = Arc::new(FakeExecutor::default());
        let mut req = request(OperationKind::Merge, Path::new("/unused"), &["a.mp4", "b.mp4"]);
        req.source_directory = None;

        let failure = expect_failure(workflow(executor).handle(req, None).await);
        assert_eq!(failure.error_kind, ErrorKind::InvalidRequest);
    }

    #[tokio::test]
    async fn test_events_follow_each_job() {
        let dir = tempfile::tempdir().unwrap();
        let executor = Arc::new(FakeExecutor::default());
        let (tx, mut rx) = crate::events::channel();
        let mut req = request(OperationKind::Timelapse, dir.path(), &["a.mp4", "b.mp4"]);
        req.parameters.target_fps = Some(Number::from(24));

        expect_batch(workflow(executor).handle(req, Some(tx)).await);

        let mut started = 0;
        let mut completed = 0;
        while let Ok(event) = rx.try_recv() {
            match event {
                JobEvent::Started { .. } => started += 1,
                JobEvent::Completed { .. } => completed += 1,
                JobEvent::Progress { percent, .. } => assert!((0.0..=100.0).contains(&percent)),
                JobEvent::Failed { .. } => panic!("no job should fail"),
            }
        }
        assert_eq!(started, 2);
        assert_eq!(completed, 2);
    }

    #[tokio::test]
    async fn test_list_videos_uses_configured_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.mp4"), b"x").unwrap();
        std::fs::write(dir.path().join("b.mkv"), b"x").unwrap();

        let executor = Arc::new(FakeExecutor::default());
        let videos = workflow(executor).list_videos(dir.path()).await.unwrap();
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].name, "a.mp4");
    }
}
