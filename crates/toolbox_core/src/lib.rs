//! Toolbox core: pure tool-session state machine, resource ledger and the job
//! protocol shared with the engine.
mod dimensions;
mod effect;
mod ledger;
mod msg;
mod protocol;
mod state;
mod tool;
mod update;
mod view_model;

pub use dimensions::{clamp_quality, to_pixels, AspectRatio, ResizeTarget, DEFAULT_QUALITY};
pub use effect::Effect;
pub use ledger::{Generation, ResourceLedger, UrlRole};
pub use msg::Msg;
pub use protocol::{
    ErrorKind, JobFailure, JobId, JobOutput, JobRequest, JobResult, OutputFormat, ProgressEvent,
    Stage, TransformKind, TransformParams,
};
pub use state::{
    CompletedRun, JobSlot, ObjectUrl, Phase, Preview, Progress, ResultSummary, SelectedFile,
    SessionState, ToolSession,
};
pub use tool::{ToolKind, ToolRegistry, ToolSpec};
pub use update::update;
pub use view_model::ToolViewModel;
