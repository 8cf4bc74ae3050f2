use std::fmt;

use bytes::Bytes;

use crate::view_model::ToolViewModel;
use crate::{
    Effect, ErrorKind, Generation, JobFailure, JobId, JobOutput, ProgressEvent, ResourceLedger,
    Stage, TransformParams, UrlRole,
};

/// Browser-style handle to an in-memory blob, e.g. `blob:toolbox/3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectUrl(String);

impl ObjectUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A user-selected file held in memory for the lifetime of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub mime_type: Option<String>,
    pub bytes: Bytes,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime_type: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    pub url: ObjectUrl,
    pub width: u32,
    pub height: u32,
}

/// Everything about a finished job except the bytes, which live behind the
/// result URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSummary {
    pub file_name: String,
    pub mime_type: String,
    pub original_size: u64,
    pub converted_size: u64,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl From<&JobOutput> for ResultSummary {
    fn from(output: &JobOutput) -> Self {
        Self {
            file_name: output.file_name.clone(),
            mime_type: output.mime_type.clone(),
            original_size: output.original_size,
            converted_size: output.converted_size,
            width: output.width,
            height: output.height,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedRun {
    pub result_url: ObjectUrl,
    pub summary: ResultSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Progress {
    pub percent: u8,
    pub stage: Option<Stage>,
    pub message: String,
}

/// The job a `Processing` state is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobSlot {
    /// Start issued at this generation, job id not known yet.
    Pending(Generation),
    Active(JobId),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Loaded {
        preview: Preview,
    },
    Processing {
        preview: Preview,
        progress: Progress,
        job: JobSlot,
    },
    Complete {
        preview: Preview,
        run: CompletedRun,
    },
    Error {
        message: String,
        kind: Option<ErrorKind>,
        preview: Option<Preview>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    #[default]
    Idle,
    Loaded,
    Processing,
    Complete,
    Error,
}

impl SessionState {
    pub fn phase(&self) -> Phase {
        match self {
            SessionState::Idle => Phase::Idle,
            SessionState::Loaded { .. } => Phase::Loaded,
            SessionState::Processing { .. } => Phase::Processing,
            SessionState::Complete { .. } => Phase::Complete,
            SessionState::Error { .. } => Phase::Error,
        }
    }

    pub fn preview(&self) -> Option<&Preview> {
        match self {
            SessionState::Idle => None,
            SessionState::Loaded { preview }
            | SessionState::Processing { preview, .. }
            | SessionState::Complete { preview, .. } => Some(preview),
            SessionState::Error { preview, .. } => preview.as_ref(),
        }
    }
}

/// One tool's session: the selected file, the current state and every
/// object URL those own.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ToolSession {
    state: SessionState,
    file: Option<SelectedFile>,
    generation: Generation,
    ledger: ResourceLedger,
    dirty: bool,
}

impl ToolSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn file(&self) -> Option<&SelectedFile> {
        self.file.as_ref()
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Job whose callbacks the session currently honours.
    pub fn active_job(&self) -> Option<JobId> {
        match self.state {
            SessionState::Processing {
                job: JobSlot::Active(job_id),
                ..
            } => Some(job_id),
            _ => None,
        }
    }

    /// Number of object URLs the session still owns.
    pub fn outstanding_urls(&self) -> usize {
        self.ledger.outstanding()
    }

    pub fn owns_url(&self, url: &crate::ObjectUrl) -> bool {
        self.ledger.holds(url)
    }

    pub fn view(&self) -> ToolViewModel {
        ToolViewModel::from_session(self)
    }

    /// Returns whether the session changed since the last call and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn load_file(&mut self, file: SelectedFile, preview: Preview) -> Vec<Effect> {
        let effects = self.retire_all();
        self.ledger
            .acquire(self.generation, UrlRole::Preview, preview.url.clone());
        self.state = SessionState::Loaded { preview };
        self.file = Some(file);
        self.dirty = true;
        effects
    }

    pub(crate) fn fail_load(&mut self, file_name: &str, message: &str) -> Vec<Effect> {
        let effects = self.retire_all();
        self.state = SessionState::Error {
            message: format!("{file_name}: {message}"),
            kind: Some(ErrorKind::DecodeFailure),
            preview: None,
        };
        self.dirty = true;
        effects
    }

    pub(crate) fn start(&mut self, params: TransformParams) -> Vec<Effect> {
        let Some(file) = self.file.clone() else {
            return Vec::new();
        };

        let mut effects = Vec::new();
        let preview = match std::mem::take(&mut self.state) {
            SessionState::Loaded { preview } => preview,
            SessionState::Error {
                preview: Some(preview),
                ..
            } => preview,
            SessionState::Complete { preview, .. } => {
                effects.extend(self.release(UrlRole::Result));
                preview
            }
            SessionState::Processing { preview, job, .. } => {
                // A pending start is superseded once its acceptance arrives stale.
                if let JobSlot::Active(job_id) = job {
                    effects.push(Effect::SupersedeJob { job_id });
                }
                preview
            }
            other => {
                self.state = other;
                return Vec::new();
            }
        };

        self.generation += 1;
        self.state = SessionState::Processing {
            preview,
            progress: Progress {
                percent: 0,
                stage: None,
                message: "Queued".to_string(),
            },
            job: JobSlot::Pending(self.generation),
        };
        self.dirty = true;
        effects.push(Effect::StartJob {
            generation: self.generation,
            file,
            params,
        });
        effects
    }

    pub(crate) fn accept_job(&mut self, generation: Generation, job_id: JobId) -> Vec<Effect> {
        match &mut self.state {
            SessionState::Processing { job, .. } if *job == JobSlot::Pending(generation) => {
                *job = JobSlot::Active(job_id);
                Vec::new()
            }
            _ => vec![Effect::SupersedeJob { job_id }],
        }
    }

    pub(crate) fn reject_job(&mut self, generation: Generation, failure: JobFailure) {
        match std::mem::take(&mut self.state) {
            SessionState::Processing {
                preview,
                job: JobSlot::Pending(pending),
                ..
            } if pending == generation => {
                self.state = SessionState::Error {
                    message: failure.to_string(),
                    kind: Some(failure.kind),
                    preview: Some(preview),
                };
                self.dirty = true;
            }
            other => self.state = other,
        }
    }

    pub(crate) fn apply_progress(&mut self, event: ProgressEvent) {
        if let SessionState::Processing {
            progress,
            job: JobSlot::Active(job_id),
            ..
        } = &mut self.state
        {
            if *job_id != event.job_id || event.percent < progress.percent {
                return;
            }
            progress.percent = event.percent;
            progress.stage = Some(event.stage);
            progress.message = event.message;
            self.dirty = true;
        }
    }

    pub(crate) fn finish_job(
        &mut self,
        job_id: JobId,
        outcome: Result<CompletedRun, JobFailure>,
    ) -> Vec<Effect> {
        match std::mem::take(&mut self.state) {
            SessionState::Processing {
                preview,
                job: JobSlot::Active(active),
                ..
            } if active == job_id => {
                self.state = match outcome {
                    Ok(run) => {
                        self.ledger.acquire(
                            self.generation,
                            UrlRole::Result,
                            run.result_url.clone(),
                        );
                        SessionState::Complete { preview, run }
                    }
                    Err(failure) => SessionState::Error {
                        message: failure.to_string(),
                        kind: Some(failure.kind),
                        preview: Some(preview),
                    },
                };
                self.dirty = true;
                Vec::new()
            }
            other => {
                self.state = other;
                // Nobody will ever reference a stale result; hand it straight back.
                match outcome {
                    Ok(run) => vec![Effect::RevokeObjectUrl {
                        url: run.result_url,
                    }],
                    Err(_) => Vec::new(),
                }
            }
        }
    }

    pub(crate) fn dismiss_error(&mut self) -> Vec<Effect> {
        match std::mem::take(&mut self.state) {
            SessionState::Error {
                preview: Some(preview),
                ..
            } => {
                self.state = SessionState::Loaded { preview };
                self.dirty = true;
                Vec::new()
            }
            SessionState::Error { preview: None, .. } => {
                let effects = self.retire_all();
                self.dirty = true;
                effects
            }
            other => {
                self.state = other;
                Vec::new()
            }
        }
    }

    pub(crate) fn reset(&mut self) -> Vec<Effect> {
        self.retire_all()
    }

    fn release(&mut self, role: UrlRole) -> Vec<Effect> {
        self.ledger
            .release_role(role)
            .into_iter()
            .map(|url| Effect::RevokeObjectUrl { url })
            .collect()
    }

    /// Returns to `Idle`, releasing everything the current state owns.
    fn retire_all(&mut self) -> Vec<Effect> {
        let already_idle = matches!(self.state, SessionState::Idle)
            && self.file.is_none()
            && self.ledger.outstanding() == 0;
        if already_idle {
            return Vec::new();
        }

        let mut effects = Vec::new();
        if let Some(job_id) = self.active_job() {
            effects.push(Effect::SupersedeJob { job_id });
        }
        effects.extend(
            self.ledger
                .release_all()
                .into_iter()
                .map(|url| Effect::RevokeObjectUrl { url }),
        );
        self.state = SessionState::Idle;
        self.file = None;
        self.generation += 1;
        self.dirty = true;
        effects
    }
}
