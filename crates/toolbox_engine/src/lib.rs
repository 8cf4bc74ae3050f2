//! Toolbox engine: transform executors, the worker channel that runs them off
//! the caller's thread, and the dispatch facade the UI talks to.
mod dispatch;
mod executor;
mod filename;
mod persist;
mod preview;
mod progress;
mod raster;
mod types;
mod vector;
mod worker;

pub use dispatch::{Admission, DispatchError, DispatchedJob, Dispatcher};
pub use executor::{ImageExecutor, TransformExecutor};
pub use filename::output_file_name;
pub use persist::{ensure_output_dir, ArtifactWriter, Collision, PersistError, SavedArtifact};
pub use preview::{probe_preview, PreviewInfo};
pub use progress::{NullProgressSink, ProgressSink, StageReporter};
pub use raster::MAX_DIMENSION;
pub use types::{TransformError, TransformOutput, WorkerCategory};
pub use worker::{JobChannel, WorkerChannel};
