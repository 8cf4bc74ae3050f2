use std::fmt;

use bytes::Bytes;

pub type JobId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Loading,
    Processing,
    Encoding,
    Finalizing,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Loading => "loading",
            Stage::Processing => "processing",
            Stage::Encoding => "encoding",
            Stage::Finalizing => "finalizing",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub job_id: JobId,
    pub percent: u8,
    pub stage: Stage,
    pub message: String,
}

impl ProgressEvent {
    /// Builds an event, clamping `percent` into `0..=100`.
    pub fn new(job_id: JobId, percent: u8, stage: Stage, message: impl Into<String>) -> Self {
        Self {
            job_id,
            percent: percent.min(100),
            stage,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    SizeExceeded,
    InitializationFailure,
    TransportLost,
    DecodeFailure,
    EncodeFailure,
    Unexpected,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::SizeExceeded => write!(f, "file is too large"),
            ErrorKind::InitializationFailure => write!(f, "processing worker failed to start"),
            ErrorKind::TransportLost => write!(f, "processing worker stopped responding"),
            ErrorKind::DecodeFailure => write!(f, "file could not be read"),
            ErrorKind::EncodeFailure => write!(f, "output could not be written"),
            ErrorKind::Unexpected => write!(f, "unexpected error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl JobFailure {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for JobFailure {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Png,
    Jpeg,
    Webp,
    Bmp,
    Gif,
    Ico,
    Tiff,
    Avif,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 8] = [
        OutputFormat::Png,
        OutputFormat::Jpeg,
        OutputFormat::Webp,
        OutputFormat::Bmp,
        OutputFormat::Gif,
        OutputFormat::Ico,
        OutputFormat::Tiff,
        OutputFormat::Avif,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Webp => "webp",
            OutputFormat::Bmp => "bmp",
            OutputFormat::Gif => "gif",
            OutputFormat::Ico => "ico",
            OutputFormat::Tiff => "tiff",
            OutputFormat::Avif => "avif",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Webp => "image/webp",
            OutputFormat::Bmp => "image/bmp",
            OutputFormat::Gif => "image/gif",
            OutputFormat::Ico => "image/x-icon",
            OutputFormat::Tiff => "image/tiff",
            OutputFormat::Avif => "image/avif",
        }
    }

    /// Whether the format can store an alpha channel. Images headed for a
    /// format without one are flattened before encoding.
    pub fn supports_alpha(self) -> bool {
        !matches!(self, OutputFormat::Jpeg | OutputFormat::Bmp)
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim().trim_start_matches('.');
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(OutputFormat::Png),
            "jpg" | "jpeg" | "jpe" => Some(OutputFormat::Jpeg),
            "webp" => Some(OutputFormat::Webp),
            "bmp" => Some(OutputFormat::Bmp),
            "gif" => Some(OutputFormat::Gif),
            "ico" => Some(OutputFormat::Ico),
            "tif" | "tiff" => Some(OutputFormat::Tiff),
            "avif" => Some(OutputFormat::Avif),
            _ => None,
        }
    }

    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or(mime).trim();
        Self::ALL
            .into_iter()
            .find(|format| format.mime_type().eq_ignore_ascii_case(essence))
            .or_else(|| match essence.to_ascii_lowercase().as_str() {
                "image/jpg" => Some(OutputFormat::Jpeg),
                "image/vnd.microsoft.icon" => Some(OutputFormat::Ico),
                _ => None,
            })
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformKind {
    Convert,
    Resize,
    Compress,
    Rasterize,
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransformKind::Convert => "convert",
            TransformKind::Resize => "resize",
            TransformKind::Compress => "compress",
            TransformKind::Rasterize => "rasterize",
        };
        f.write_str(label)
    }
}

/// Closed parameter set, one variant per transform kind.
///
/// Quality values are nominally in `0.0..=1.0`; executors clamp them.
#[derive(Debug, Clone, PartialEq)]
pub enum TransformParams {
    Convert {
        target: OutputFormat,
        quality: f32,
    },
    Resize {
        width: u32,
        height: u32,
        format: Option<OutputFormat>,
        quality: f32,
    },
    Compress {
        quality: f32,
    },
    Rasterize {
        target: OutputFormat,
        width: Option<u32>,
        height: Option<u32>,
        quality: f32,
    },
}

impl TransformParams {
    pub fn kind(&self) -> TransformKind {
        match self {
            TransformParams::Convert { .. } => TransformKind::Convert,
            TransformParams::Resize { .. } => TransformKind::Resize,
            TransformParams::Compress { .. } => TransformKind::Compress,
            TransformParams::Rasterize { .. } => TransformKind::Rasterize,
        }
    }

    pub fn quality(&self) -> f32 {
        let raw = match self {
            TransformParams::Convert { quality, .. }
            | TransformParams::Resize { quality, .. }
            | TransformParams::Compress { quality }
            | TransformParams::Rasterize { quality, .. } => *quality,
        };
        crate::clamp_quality(raw)
    }
}

/// One transform request, immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRequest {
    pub job_id: JobId,
    pub input_name: String,
    pub input: Bytes,
    pub params: TransformParams,
}

impl JobRequest {
    pub fn kind(&self) -> TransformKind {
        self.params.kind()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutput {
    pub bytes: Bytes,
    pub mime_type: String,
    pub original_size: u64,
    pub converted_size: u64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub file_name: String,
}

/// Terminal result of a dispatch.
///
/// `job_id` is `None` only when the input was rejected before a job was
/// created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobResult {
    pub job_id: Option<JobId>,
    pub outcome: Result<JobOutput, JobFailure>,
}

impl JobResult {
    pub fn succeeded(job_id: JobId, output: JobOutput) -> Self {
        Self {
            job_id: Some(job_id),
            outcome: Ok(output),
        }
    }

    pub fn failed(job_id: JobId, failure: JobFailure) -> Self {
        Self {
            job_id: Some(job_id),
            outcome: Err(failure),
        }
    }

    pub fn rejected(failure: JobFailure) -> Self {
        Self {
            job_id: None,
            outcome: Err(failure),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn output(&self) -> Option<&JobOutput> {
        self.outcome.as_ref().ok()
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.outcome.as_ref().err().map(|failure| failure.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_percent_is_clamped() {
        let event = ProgressEvent::new(1, 140, Stage::Finalizing, "done");
        assert_eq!(event.percent, 100);
    }

    #[test]
    fn formats_parse_from_extension_and_mime() {
        assert_eq!(OutputFormat::from_extension(".JPEG"), Some(OutputFormat::Jpeg));
        assert_eq!(OutputFormat::from_extension("svg"), None);
        assert_eq!(OutputFormat::from_mime("image/webp"), Some(OutputFormat::Webp));
        assert_eq!(
            OutputFormat::from_mime("image/jpg; charset=binary"),
            Some(OutputFormat::Jpeg)
        );
    }

    #[test]
    fn alpha_support_matches_format() {
        assert!(!OutputFormat::Jpeg.supports_alpha());
        assert!(!OutputFormat::Bmp.supports_alpha());
        assert!(OutputFormat::Png.supports_alpha());
    }

    #[test]
    fn params_kind_and_quality_clamp() {
        let params = TransformParams::Convert {
            target: OutputFormat::Jpeg,
            quality: 1.7,
        };
        assert_eq!(params.kind(), TransformKind::Convert);
        assert_eq!(params.quality(), 1.0);
    }

    #[test]
    fn result_success_tracks_output_presence() {
        let failed = JobResult::rejected(JobFailure::new(ErrorKind::SizeExceeded, "too big"));
        assert!(!failed.is_success());
        assert!(failed.output().is_none());
        assert_eq!(failed.error_kind(), Some(ErrorKind::SizeExceeded));
    }
}
