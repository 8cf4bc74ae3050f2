use crate::{
    CompletedRun, Generation, JobFailure, JobId, Preview, ProgressEvent, SelectedFile,
    TransformParams,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// A file was read and its preview URL created.
    FileLoaded { file: SelectedFile, preview: Preview },
    /// The selected file could not be decoded for preview.
    FileLoadFailed { file_name: String, message: String },
    /// User asked to run the tool with these parameters.
    StartClicked(TransformParams),
    /// The dispatcher created a job for the start issued at `generation`.
    JobAccepted { generation: Generation, job_id: JobId },
    /// The dispatcher refused the start issued at `generation`.
    JobRejected {
        generation: Generation,
        failure: JobFailure,
    },
    /// Progress relayed from the worker.
    JobProgress(ProgressEvent),
    /// Terminal outcome; on success the result URL is already created.
    JobDone {
        job_id: JobId,
        outcome: Result<CompletedRun, JobFailure>,
    },
    /// User closed the error panel.
    ErrorDismissed,
    /// User clicked Reset.
    ResetClicked,
    /// The tool UI is being torn down.
    Unmounted,
    /// UI/render tick to coalesce rendering.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}
