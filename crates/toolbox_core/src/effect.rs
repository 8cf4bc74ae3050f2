use crate::{Generation, JobId, ObjectUrl, SelectedFile, TransformParams};

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Dispatch a transform; the runner answers with `JobAccepted` or
    /// `JobRejected` carrying the same generation.
    StartJob {
        generation: Generation,
        file: SelectedFile,
        params: TransformParams,
    },
    /// Make the job's callbacks inert. The worker is left to finish.
    SupersedeJob { job_id: JobId },
    RevokeObjectUrl { url: ObjectUrl },
}
