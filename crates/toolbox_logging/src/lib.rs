#![deny(missing_docs)]
//! Shared logging utilities for the toolbox workspace.
//!
//! This crate provides the `toolbox_*` logging macros used across the
//! codebase, a job scope that prefixes log lines emitted while a worker runs a
//! job, and a minimal test initializer for the global logger.

use std::cell::Cell;

#[doc(hidden)]
pub use log;

thread_local! {
    /// Job currently being executed on this thread, if any.
    static CURRENT_JOB: Cell<Option<u64>> = const { Cell::new(None) };
}

/// Returns the job id scoped on the current thread.
pub fn current_job() -> Option<u64> {
    CURRENT_JOB.with(|v| v.get())
}

/// Scopes `job_id` on the current thread until the returned guard is dropped.
///
/// Scopes nest: dropping the guard restores whatever job was scoped before.
pub fn enter_job(job_id: u64) -> JobScope {
    let previous = CURRENT_JOB.with(|v| v.replace(Some(job_id)));
    JobScope { previous }
}

/// Guard returned by [`enter_job`].
#[must_use = "the job scope ends when the guard is dropped"]
pub struct JobScope {
    previous: Option<u64>,
}

impl Drop for JobScope {
    fn drop(&mut self) {
        CURRENT_JOB.with(|v| v.set(self.previous));
    }
}

/// Prefix prepended by the logging macros.
#[doc(hidden)]
pub fn job_prefix() -> String {
    match current_job() {
        Some(job_id) => format!("[job {job_id}] "),
        None => String::new(),
    }
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! toolbox_trace {
    ($($arg:tt)*) => {{
        $crate::log::trace!("{}{}", $crate::job_prefix(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! toolbox_debug {
    ($($arg:tt)*) => {{
        $crate::log::debug!("{}{}", $crate::job_prefix(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! toolbox_info {
    ($($arg:tt)*) => {{
        $crate::log::info!("{}{}", $crate::job_prefix(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! toolbox_warn {
    ($($arg:tt)*) => {{
        $crate::log::warn!("{}{}", $crate::job_prefix(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! toolbox_error {
    ($($arg:tt)*) => {{
        $crate::log::error!("{}{}", $crate::job_prefix(), format_args!($($arg)*));
    }};
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Another test may already have installed a logger.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_scope_sets_and_restores_prefix() {
        assert_eq!(job_prefix(), "");
        {
            let _outer = enter_job(3);
            assert_eq!(job_prefix(), "[job 3] ");
            {
                let _inner = enter_job(4);
                assert_eq!(current_job(), Some(4));
            }
            assert_eq!(current_job(), Some(3));
        }
        assert_eq!(current_job(), None);
    }
}
