use std::fmt;

use toolbox_core::{ErrorKind, JobFailure, OutputFormat, TransformKind};

/// Worker contexts are pooled per category; every kind in a category shares
/// one thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerCategory {
    Raster,
    Vector,
}

impl WorkerCategory {
    pub fn for_kind(kind: TransformKind) -> Self {
        match kind {
            TransformKind::Convert | TransformKind::Resize | TransformKind::Compress => {
                WorkerCategory::Raster
            }
            TransformKind::Rasterize => WorkerCategory::Vector,
        }
    }

    pub(crate) fn thread_name(self) -> &'static str {
        match self {
            WorkerCategory::Raster => "toolbox-raster",
            WorkerCategory::Vector => "toolbox-vector",
        }
    }
}

impl fmt::Display for WorkerCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerCategory::Raster => write!(f, "raster"),
            WorkerCategory::Vector => write!(f, "vector"),
        }
    }
}

/// Encoded bytes produced by an executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOutput {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    #[error("could not decode input: {0}")]
    Decode(String),
    #[error("could not encode {format}: {message}")]
    Encode {
        format: OutputFormat,
        message: String,
    },
    #[error("worker failed to start: {0}")]
    Initialization(String),
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),
}

impl TransformError {
    pub(crate) fn encode(format: OutputFormat, message: impl Into<String>) -> Self {
        TransformError::Encode {
            format,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            TransformError::Decode(_) => ErrorKind::DecodeFailure,
            TransformError::Encode { .. } => ErrorKind::EncodeFailure,
            TransformError::Initialization(_) => ErrorKind::InitializationFailure,
            TransformError::InvalidParameters(_) => ErrorKind::Unexpected,
        }
    }
}

impl From<TransformError> for JobFailure {
    fn from(err: TransformError) -> Self {
        JobFailure::new(err.kind(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rasterize_runs_on_vector_worker() {
        assert_eq!(
            WorkerCategory::for_kind(TransformKind::Rasterize),
            WorkerCategory::Vector
        );
        assert_eq!(
            WorkerCategory::for_kind(TransformKind::Compress),
            WorkerCategory::Raster
        );
    }

    #[test]
    fn errors_map_to_failure_kinds() {
        let failure: JobFailure = TransformError::encode(OutputFormat::Avif, "missing").into();
        assert_eq!(failure.kind, ErrorKind::EncodeFailure);
        assert!(failure.message.contains("avif"));
        assert_eq!(
            TransformError::InvalidParameters("zero width".into()).kind(),
            ErrorKind::Unexpected
        );
    }
}
