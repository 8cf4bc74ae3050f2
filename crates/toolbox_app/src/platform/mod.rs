mod app;
mod blobs;
mod effects;
mod logging;
mod registry;
mod session;

pub use app::{run_app, Cli};
pub use blobs::{Blob, BlobStore};
pub use effects::EffectRunner;
pub use logging::LogDestination;
pub use registry::{load_registry, parse_registry, render_registry, RegistryError};
pub use session::SessionDriver;
