use toolbox_core::{JobId, ProgressEvent, Stage};

/// Receiver of progress events for one job.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn emit(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn emit(&self, _event: ProgressEvent) {}
}

/// Stamps events with a job id for executors.
pub struct StageReporter<'a> {
    job_id: JobId,
    sink: &'a dyn ProgressSink,
}

impl<'a> StageReporter<'a> {
    pub fn new(job_id: JobId, sink: &'a dyn ProgressSink) -> Self {
        Self { job_id, sink }
    }

    pub fn report(&self, percent: u8, stage: Stage, message: impl Into<String>) {
        self.sink
            .emit(ProgressEvent::new(self.job_id, percent, stage, message));
    }
}
