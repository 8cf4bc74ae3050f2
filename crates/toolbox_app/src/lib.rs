//! Toolbox app: drives tool sessions against the engine and exposes the
//! `toolbox` command-line front end.
pub mod platform;
