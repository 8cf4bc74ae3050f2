use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread;

use async_trait::async_trait;
use tokio::sync::mpsc as reply;
use toolbox_core::{ErrorKind, JobFailure, JobOutput, JobRequest, JobResult, ProgressEvent};
use toolbox_logging::{toolbox_debug, toolbox_info, toolbox_warn};

use crate::executor::{ImageExecutor, TransformExecutor};
use crate::filename::output_file_name;
use crate::progress::ProgressSink;
use crate::{TransformError, TransformOutput, WorkerCategory};

/// Carries one job to a worker and back.
///
/// At most one result is returned per request; progress handed to `progress`
/// always precedes it and never decreases.
#[async_trait]
pub trait JobChannel: Send + Sync {
    async fn send(&self, request: JobRequest, progress: &dyn ProgressSink) -> JobResult;
}

enum WorkerCommand {
    Run {
        request: JobRequest,
        reply: reply::UnboundedSender<WorkerMessage>,
    },
}

enum WorkerMessage {
    Progress(ProgressEvent),
    Done(Result<TransformOutput, TransformError>),
}

struct WorkerContext {
    id: u64,
    tx: mpsc::Sender<WorkerCommand>,
}

/// Job channel backed by lazily spawned worker threads, one per
/// [`WorkerCategory`].
///
/// A context that dies or fails to start is dropped from the pool and
/// re-created on the next job of its category.
pub struct WorkerChannel {
    executor: Arc<dyn TransformExecutor>,
    pool: Mutex<HashMap<WorkerCategory, WorkerContext>>,
    next_context_id: AtomicU64,
}

impl Default for WorkerChannel {
    fn default() -> Self {
        Self::new(Arc::new(ImageExecutor::new()))
    }
}

impl WorkerChannel {
    pub fn new(executor: Arc<dyn TransformExecutor>) -> Self {
        Self {
            executor,
            pool: Mutex::new(HashMap::new()),
            next_context_id: AtomicU64::new(1),
        }
    }

    /// Number of live worker contexts.
    pub fn context_count(&self) -> usize {
        self.pool
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Hands the request to the category's context, spawning it if needed.
    /// Returns the id of the context that accepted the job.
    fn post(
        &self,
        category: WorkerCategory,
        request: JobRequest,
        reply: reply::UnboundedSender<WorkerMessage>,
    ) -> Result<u64, JobFailure> {
        let mut pool = self.pool.lock().unwrap_or_else(PoisonError::into_inner);
        let mut command = WorkerCommand::Run { request, reply };

        // A context whose thread already exited refuses the command; replace it once.
        for _ in 0..2 {
            if !pool.contains_key(&category) {
                let context = self.spawn(category)?;
                pool.insert(category, context);
            }
            let Some(context) = pool.get(&category) else {
                break;
            };
            match context.tx.send(command) {
                Ok(()) => return Ok(context.id),
                Err(mpsc::SendError(returned)) => {
                    toolbox_warn!("{} worker {} is gone, replacing it", category, context.id);
                    pool.remove(&category);
                    command = returned;
                }
            }
        }
        Err(JobFailure::new(
            ErrorKind::TransportLost,
            format!("{category} worker could not accept the job"),
        ))
    }

    fn spawn(&self, category: WorkerCategory) -> Result<WorkerContext, JobFailure> {
        let id = self.next_context_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel();
        let executor = Arc::clone(&self.executor);
        thread::Builder::new()
            .name(format!("{}-{id}", category.thread_name()))
            .spawn(move || worker_main(category, executor.as_ref(), rx))
            .map_err(|err| {
                JobFailure::new(
                    ErrorKind::InitializationFailure,
                    format!("could not start {category} worker: {err}"),
                )
            })?;
        toolbox_info!("Started {} worker {}", category, id);
        Ok(WorkerContext { id, tx })
    }

    /// Drops the context if it is still the one identified by `context_id`.
    fn discard(&self, category: WorkerCategory, context_id: u64) {
        let mut pool = self.pool.lock().unwrap_or_else(PoisonError::into_inner);
        if pool.get(&category).is_some_and(|ctx| ctx.id == context_id) {
            pool.remove(&category);
            toolbox_warn!("Discarded {} worker {}", category, context_id);
        }
    }
}

#[async_trait]
impl JobChannel for WorkerChannel {
    async fn send(&self, request: JobRequest, progress: &dyn ProgressSink) -> JobResult {
        let job_id = request.job_id;
        let category = WorkerCategory::for_kind(request.kind());
        let input_name = request.input_name.clone();
        let original_size = request.input.len() as u64;

        let (reply_tx, mut reply_rx) = reply::unbounded_channel();
        let context_id = match self.post(category, request, reply_tx) {
            Ok(id) => id,
            Err(failure) => return JobResult::failed(job_id, failure),
        };
        toolbox_debug!("job {} posted to {} worker {}", job_id, category, context_id);

        let mut last_percent = 0u8;
        loop {
            match reply_rx.recv().await {
                Some(WorkerMessage::Progress(event)) => {
                    if event.percent < last_percent {
                        continue;
                    }
                    last_percent = event.percent;
                    progress.emit(event);
                }
                Some(WorkerMessage::Done(Ok(output))) => {
                    let file_name = output_file_name(&input_name, output.format);
                    return JobResult::succeeded(
                        job_id,
                        JobOutput {
                            mime_type: output.format.mime_type().to_string(),
                            original_size,
                            converted_size: output.bytes.len() as u64,
                            width: Some(output.width),
                            height: Some(output.height),
                            bytes: output.bytes.into(),
                            file_name,
                        },
                    );
                }
                Some(WorkerMessage::Done(Err(err))) => {
                    if matches!(err, TransformError::Initialization(_)) {
                        self.discard(category, context_id);
                    }
                    return JobResult::failed(job_id, err.into());
                }
                None => {
                    self.discard(category, context_id);
                    return JobResult::failed(
                        job_id,
                        JobFailure::new(
                            ErrorKind::TransportLost,
                            format!("{category} worker stopped before answering"),
                        ),
                    );
                }
            }
        }
    }
}

struct ReplySink<'a> {
    reply: &'a reply::UnboundedSender<WorkerMessage>,
}

impl ProgressSink for ReplySink<'_> {
    fn emit(&self, event: ProgressEvent) {
        let _ = self.reply.send(WorkerMessage::Progress(event));
    }
}

fn worker_main(
    category: WorkerCategory,
    executor: &dyn TransformExecutor,
    rx: mpsc::Receiver<WorkerCommand>,
) {
    let ready = executor.warm_up(category);
    if let Err(err) = &ready {
        toolbox_warn!("{} worker failed to warm up: {}", category, err);
    }

    while let Ok(command) = rx.recv() {
        match command {
            WorkerCommand::Run { request, reply } => {
                let _scope = toolbox_logging::enter_job(request.job_id);
                let outcome = match &ready {
                    Ok(()) => executor.execute(&request, &ReplySink { reply: &reply }),
                    Err(err) => Err(err.clone()),
                };
                if let Err(err) = &outcome {
                    toolbox_debug!("transform failed: {}", err);
                }
                let _ = reply.send(WorkerMessage::Done(outcome));
            }
        }
    }
    toolbox_debug!("{} worker exiting", category);
}
