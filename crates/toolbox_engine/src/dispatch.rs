use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use toolbox_core::{
    ErrorKind, JobFailure, JobId, JobRequest, JobResult, OutputFormat, ProgressEvent, ToolSpec,
    TransformKind, TransformParams,
};
use toolbox_logging::{toolbox_debug, toolbox_info, toolbox_warn};

use crate::progress::ProgressSink;
use crate::worker::{JobChannel, WorkerChannel};

/// Programmer errors; expected failures travel inside [`JobResult`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("tool {tool_id} cannot run {kind} transforms")]
    UnsupportedKind { tool_id: String, kind: TransformKind },
}

/// A job that passed admission and owns a fresh id.
#[derive(Debug)]
pub struct DispatchedJob {
    request: JobRequest,
    token: CancellationToken,
}

impl DispatchedJob {
    pub fn job_id(&self) -> JobId {
        self.request.job_id
    }

    /// Cancelling this token makes the job's callbacks inert. The worker still
    /// runs the job to completion.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

#[derive(Debug)]
pub enum Admission {
    Accepted(DispatchedJob),
    /// Refused before a job existed; no id was consumed.
    Rejected(JobFailure),
}

/// Entry point for running transforms.
pub struct Dispatcher {
    channel: Arc<dyn JobChannel>,
    next_job_id: AtomicU64,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(Arc::new(WorkerChannel::default()))
    }
}

impl Dispatcher {
    pub fn new(channel: Arc<dyn JobChannel>) -> Self {
        Self {
            channel,
            next_job_id: AtomicU64::new(1),
        }
    }

    /// Checks `input` against the tool's limits and, if it fits, allocates a
    /// job for it.
    pub fn admit(
        &self,
        tool: &ToolSpec,
        input_name: &str,
        input: Bytes,
        params: TransformParams,
    ) -> Result<Admission, DispatchError> {
        let kind = params.kind();
        if !tool.kind.supports(kind) {
            return Err(DispatchError::UnsupportedKind {
                tool_id: tool.tool_id.clone(),
                kind,
            });
        }

        let size = input.len() as u64;
        if size == 0 {
            return Ok(Admission::Rejected(JobFailure::new(
                ErrorKind::SizeExceeded,
                format!("{input_name} is empty"),
            )));
        }
        if size > tool.max_file_size_bytes() {
            toolbox_warn!(
                "Rejected {} ({} bytes) for {}: limit {} MB",
                input_name,
                size,
                tool.tool_id,
                tool.max_file_size_mb
            );
            return Ok(Admission::Rejected(JobFailure::new(
                ErrorKind::SizeExceeded,
                format!(
                    "{input_name} is {:.1} MB, the limit is {} MB",
                    size as f64 / (1024.0 * 1024.0),
                    tool.max_file_size_mb
                ),
            )));
        }

        let job_id = self.next_job_id.fetch_add(1, Ordering::Relaxed);
        toolbox_info!("Job {} admitted: {} {} ({} bytes)", job_id, kind, input_name, size);
        Ok(Admission::Accepted(DispatchedJob {
            request: JobRequest {
                job_id,
                input_name: input_name.to_string(),
                input,
                params,
            },
            token: CancellationToken::new(),
        }))
    }

    /// Runs an admitted job. Progress reaches `progress` only while the job's
    /// token is live.
    pub async fn run(&self, job: DispatchedJob, progress: &dyn ProgressSink) -> JobResult {
        let DispatchedJob { request, token } = job;
        let job_id = request.job_id;
        let gated = GatedSink {
            token: &token,
            inner: progress,
        };
        let result = self.channel.send(request, &gated).await;
        if token.is_cancelled() {
            toolbox_debug!("Job {} finished after being superseded", job_id);
        } else if let Err(failure) = &result.outcome {
            toolbox_warn!("Job {} failed: {}", job_id, failure);
        } else {
            toolbox_info!("Job {} completed", job_id);
        }
        result
    }

    /// Admits and runs in one step. Oversized input resolves to a rejected
    /// result rather than an error.
    pub async fn dispatch(
        &self,
        tool: &ToolSpec,
        input_name: &str,
        input: Bytes,
        params: TransformParams,
        progress: &dyn ProgressSink,
    ) -> Result<JobResult, DispatchError> {
        match self.admit(tool, input_name, input, params)? {
            Admission::Accepted(job) => Ok(self.run(job, progress).await),
            Admission::Rejected(failure) => Ok(JobResult::rejected(failure)),
        }
    }

    pub async fn convert(
        &self,
        tool: &ToolSpec,
        input_name: &str,
        input: Bytes,
        target: OutputFormat,
        quality: f32,
        progress: &dyn ProgressSink,
    ) -> Result<JobResult, DispatchError> {
        let params = TransformParams::Convert { target, quality };
        self.dispatch(tool, input_name, input, params, progress).await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn resize(
        &self,
        tool: &ToolSpec,
        input_name: &str,
        input: Bytes,
        width: u32,
        height: u32,
        format: Option<OutputFormat>,
        quality: f32,
        progress: &dyn ProgressSink,
    ) -> Result<JobResult, DispatchError> {
        let params = TransformParams::Resize {
            width,
            height,
            format,
            quality,
        };
        self.dispatch(tool, input_name, input, params, progress).await
    }

    pub async fn compress(
        &self,
        tool: &ToolSpec,
        input_name: &str,
        input: Bytes,
        quality: f32,
        progress: &dyn ProgressSink,
    ) -> Result<JobResult, DispatchError> {
        let params = TransformParams::Compress { quality };
        self.dispatch(tool, input_name, input, params, progress).await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn rasterize(
        &self,
        tool: &ToolSpec,
        input_name: &str,
        input: Bytes,
        target: OutputFormat,
        width: Option<u32>,
        height: Option<u32>,
        quality: f32,
        progress: &dyn ProgressSink,
    ) -> Result<JobResult, DispatchError> {
        let params = TransformParams::Rasterize {
            target,
            width,
            height,
            quality,
        };
        self.dispatch(tool, input_name, input, params, progress).await
    }
}

struct GatedSink<'a> {
    token: &'a CancellationToken,
    inner: &'a dyn ProgressSink,
}

impl ProgressSink for GatedSink<'_> {
    fn emit(&self, event: ProgressEvent) {
        if !self.token.is_cancelled() {
            self.inner.emit(event);
        }
    }
}
