use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};

use bytes::Bytes;
use toolbox_core::{ErrorKind, JobRequest, OutputFormat, Stage, TransformParams};
use toolbox_engine::{
    JobChannel, NullProgressSink, ProgressSink, StageReporter, TransformError, TransformExecutor,
    TransformOutput, WorkerCategory, WorkerChannel,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(toolbox_logging::initialize_for_tests);
}

fn request(job_id: u64, input: &'static [u8]) -> JobRequest {
    JobRequest {
        job_id,
        input_name: "input.png".to_string(),
        input: Bytes::from_static(input),
        params: TransformParams::Convert {
            target: OutputFormat::Png,
            quality: 1.0,
        },
    }
}

fn echo(request: &JobRequest) -> TransformOutput {
    TransformOutput {
        bytes: request.input.to_vec(),
        format: OutputFormat::Png,
        width: 1,
        height: 1,
    }
}

/// Panics on the input `boom`, echoes anything else.
struct Fragile;

impl TransformExecutor for Fragile {
    fn execute(
        &self,
        request: &JobRequest,
        progress: &dyn ProgressSink,
    ) -> Result<TransformOutput, TransformError> {
        StageReporter::new(request.job_id, progress).report(10, Stage::Loading, "start");
        if request.input.as_ref() == b"boom" {
            panic!("executor crashed");
        }
        Ok(echo(request))
    }
}

/// Fails to warm up the first time only.
struct SlowStarter {
    warm_ups: AtomicUsize,
}

impl TransformExecutor for SlowStarter {
    fn warm_up(&self, _category: WorkerCategory) -> Result<(), TransformError> {
        if self.warm_ups.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(TransformError::Initialization("codec tables missing".into()));
        }
        Ok(())
    }

    fn execute(
        &self,
        request: &JobRequest,
        _progress: &dyn ProgressSink,
    ) -> Result<TransformOutput, TransformError> {
        Ok(echo(request))
    }
}

/// Reports progress out of order.
struct Jittery;

impl TransformExecutor for Jittery {
    fn execute(
        &self,
        request: &JobRequest,
        progress: &dyn ProgressSink,
    ) -> Result<TransformOutput, TransformError> {
        let reporter = StageReporter::new(request.job_id, progress);
        for percent in [10, 40, 20, 60, 60, 50, 100] {
            reporter.report(percent, Stage::Processing, "working");
        }
        Ok(echo(request))
    }
}

#[tokio::test]
async fn crashed_worker_reports_transport_lost_and_is_recreated() {
    init_logging();
    let channel = WorkerChannel::new(Arc::new(Fragile));

    let lost = channel.send(request(1, b"boom"), &NullProgressSink).await;
    assert_eq!(lost.job_id, Some(1));
    assert_eq!(lost.error_kind(), Some(ErrorKind::TransportLost));
    assert_eq!(channel.context_count(), 0);

    let recovered = channel.send(request(2, b"fine"), &NullProgressSink).await;
    assert!(recovered.is_success());
    assert_eq!(recovered.output().unwrap().bytes, Bytes::from_static(b"fine"));
    assert_eq!(channel.context_count(), 1);
}

#[tokio::test]
async fn failed_warm_up_is_initialization_failure_then_retried() {
    init_logging();
    let channel = WorkerChannel::new(Arc::new(SlowStarter {
        warm_ups: AtomicUsize::new(0),
    }));

    let failed = channel.send(request(1, b"a"), &NullProgressSink).await;
    assert_eq!(failed.error_kind(), Some(ErrorKind::InitializationFailure));
    assert_eq!(channel.context_count(), 0);

    let ok = channel.send(request(2, b"b"), &NullProgressSink).await;
    assert!(ok.is_success());
}

#[tokio::test]
async fn contexts_are_reused_per_category() {
    init_logging();
    let channel = WorkerChannel::new(Arc::new(Fragile));
    for job_id in 1..=3 {
        let result = channel.send(request(job_id, b"x"), &NullProgressSink).await;
        assert!(result.is_success());
    }
    assert_eq!(channel.context_count(), 1);

    let mut vector = request(4, b"x");
    vector.params = TransformParams::Rasterize {
        target: OutputFormat::Png,
        width: None,
        height: None,
        quality: 1.0,
    };
    assert!(channel.send(vector, &NullProgressSink).await.is_success());
    assert_eq!(channel.context_count(), 2);
}

#[tokio::test]
async fn regressing_progress_is_dropped() {
    init_logging();
    let channel = WorkerChannel::new(Arc::new(Jittery));
    let seen = std::sync::Mutex::new(Vec::new());
    let sink = |event: toolbox_core::ProgressEvent| seen.lock().unwrap().push(event.percent);

    let result = channel.send(request(9, b"x"), &sink).await;
    assert!(result.is_success());
    assert_eq!(seen.into_inner().unwrap(), vec![10, 40, 60, 60, 100]);
}
