use std::collections::HashMap;
use std::io;
use std::sync::{mpsc, Arc, Mutex, PoisonError};

use bytes::Bytes;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;
use toolbox_core::{
    CompletedRun, Effect, ErrorKind, Generation, JobFailure, JobId, Msg, ObjectUrl, Preview,
    ProgressEvent, ResultSummary, SelectedFile, ToolSpec, TransformParams,
};
use toolbox_engine::{probe_preview, Admission, Dispatcher};
use toolbox_logging::{toolbox_debug, toolbox_error, toolbox_info};

use super::blobs::BlobStore;

const FALLBACK_MIME: &str = "application/octet-stream";

type Inflight = Arc<Mutex<HashMap<JobId, CancellationToken>>>;

/// Executes core effects against the engine and the blob store, answering
/// with messages on `msg_tx`.
pub struct EffectRunner {
    runtime: Runtime,
    dispatcher: Arc<Dispatcher>,
    blobs: Arc<BlobStore>,
    tool: ToolSpec,
    msg_tx: mpsc::Sender<Msg>,
    inflight: Inflight,
}

impl EffectRunner {
    pub fn new(
        tool: ToolSpec,
        dispatcher: Arc<Dispatcher>,
        blobs: Arc<BlobStore>,
        msg_tx: mpsc::Sender<Msg>,
    ) -> io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("toolbox-dispatch")
            .build()?;
        Ok(Self {
            runtime,
            dispatcher,
            blobs,
            tool,
            msg_tx,
            inflight: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// Reads a selected file for preview. No worker is involved.
    pub fn load_file(&self, name: &str, bytes: Bytes) -> Msg {
        match probe_preview(name, &bytes) {
            Ok(info) => {
                let mime_type = info.mime_type.as_deref().unwrap_or(FALLBACK_MIME);
                let url = self.blobs.create(bytes.clone(), mime_type);
                let mut file = SelectedFile::new(name, bytes);
                if let Some(mime_type) = info.mime_type {
                    file = file.with_mime_type(mime_type);
                }
                toolbox_info!("Loaded {} ({}x{})", name, info.width, info.height);
                Msg::FileLoaded {
                    file,
                    preview: Preview {
                        url,
                        width: info.width,
                        height: info.height,
                    },
                }
            }
            Err(err) => Msg::FileLoadFailed {
                file_name: name.to_string(),
                message: err.to_string(),
            },
        }
    }

    pub fn run(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::StartJob {
                    generation,
                    file,
                    params,
                } => self.start_job(generation, file, params),
                Effect::SupersedeJob { job_id } => self.supersede(job_id),
                Effect::RevokeObjectUrl { url } => self.revoke(&url),
            }
        }
    }

    /// Makes every in-flight job inert.
    pub fn shutdown(&self) {
        let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        for (job_id, token) in inflight.drain() {
            toolbox_debug!("Cancelling job {} on shutdown", job_id);
            token.cancel();
        }
    }

    fn start_job(&self, generation: Generation, file: SelectedFile, params: TransformParams) {
        let admission = match self
            .dispatcher
            .admit(&self.tool, &file.name, file.bytes, params)
        {
            Ok(admission) => admission,
            Err(err) => {
                toolbox_error!("Cannot start job: {}", err);
                self.send(Msg::JobRejected {
                    generation,
                    failure: JobFailure::new(ErrorKind::Unexpected, err.to_string()),
                });
                return;
            }
        };
        let job = match admission {
            Admission::Accepted(job) => job,
            Admission::Rejected(failure) => {
                self.send(Msg::JobRejected {
                    generation,
                    failure,
                });
                return;
            }
        };

        let job_id = job.job_id();
        let token = job.token();
        self.inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(job_id, token.clone());
        self.send(Msg::JobAccepted { generation, job_id });

        let dispatcher = Arc::clone(&self.dispatcher);
        let blobs = Arc::clone(&self.blobs);
        let inflight = Arc::clone(&self.inflight);
        let msg_tx = self.msg_tx.clone();
        self.runtime.spawn(async move {
            let progress_tx = msg_tx.clone();
            let sink = move |event: ProgressEvent| {
                let _ = progress_tx.send(Msg::JobProgress(event));
            };
            let result = dispatcher.run(job, &sink).await;

            // Cancellation happens under this lock, so a result URL either
            // exists before the job is superseded or never.
            let mut inflight = inflight.lock().unwrap_or_else(PoisonError::into_inner);
            inflight.remove(&job_id);
            if token.is_cancelled() {
                toolbox_debug!("Dropping result of superseded job {}", job_id);
                return;
            }
            let outcome = result.outcome.map(|output| CompletedRun {
                result_url: blobs.create(output.bytes.clone(), &output.mime_type),
                summary: ResultSummary::from(&output),
            });
            let _ = msg_tx.send(Msg::JobDone { job_id, outcome });
        });
    }

    fn supersede(&self, job_id: JobId) {
        let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(token) = inflight.remove(&job_id) {
            toolbox_debug!("Superseding job {}", job_id);
            token.cancel();
        }
    }

    fn revoke(&self, url: &ObjectUrl) {
        self.blobs.revoke(url);
    }

    fn send(&self, msg: Msg) {
        let _ = self.msg_tx.send(msg);
    }
}
