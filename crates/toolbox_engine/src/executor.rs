use image::DynamicImage;
use toolbox_core::{JobRequest, OutputFormat, Stage, TransformParams};
use toolbox_logging::toolbox_debug;

use crate::progress::{ProgressSink, StageReporter};
use crate::{raster, vector, TransformError, TransformOutput, WorkerCategory};

/// A transform routine run inside a worker context.
///
/// Implementations must not touch shared state; everything they need comes
/// with the request.
pub trait TransformExecutor: Send + Sync {
    /// Runs once when a worker context for `category` starts. An error makes
    /// every job sent to that context fail with `InitializationFailure`.
    fn warm_up(&self, _category: WorkerCategory) -> Result<(), TransformError> {
        Ok(())
    }

    fn execute(
        &self,
        request: &JobRequest,
        progress: &dyn ProgressSink,
    ) -> Result<TransformOutput, TransformError>;
}

/// Image transforms backed by `image` (raster) and `resvg` (vector).
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageExecutor;

impl ImageExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl TransformExecutor for ImageExecutor {
    fn execute(
        &self,
        request: &JobRequest,
        progress: &dyn ProgressSink,
    ) -> Result<TransformOutput, TransformError> {
        let progress = StageReporter::new(request.job_id, progress);
        let quality = request.params.quality();
        progress.report(5, Stage::Loading, "Reading input");

        match &request.params {
            TransformParams::Convert { target, .. } => {
                let (image, source) = raster::decode(&request.input)?;
                toolbox_debug!("convert {:?} -> {}", source, target);
                progress.report(35, Stage::Processing, "Preparing pixels");
                finish(&image, *target, quality, &progress)
            }
            TransformParams::Resize {
                width,
                height,
                format,
                ..
            } => {
                let (image, source) = raster::decode(&request.input)?;
                progress.report(
                    35,
                    Stage::Processing,
                    format!("Resizing to {width}x{height}"),
                );
                let resized = raster::resize(&image, *width, *height)?;
                let target = format.or(source).unwrap_or(OutputFormat::Png);
                finish(&resized, target, quality, &progress)
            }
            TransformParams::Compress { .. } => {
                let (image, source) = raster::decode(&request.input)?;
                let target = source
                    .filter(|format| raster::can_encode(*format))
                    .unwrap_or(OutputFormat::Png);
                progress.report(35, Stage::Processing, "Preparing pixels");
                finish(&image, target, quality, &progress)
            }
            TransformParams::Rasterize {
                target,
                width,
                height,
                ..
            } => {
                let rendered = vector::rasterize(&request.input, *width, *height)?;
                progress.report(35, Stage::Processing, "Rendering vector image");
                finish(&DynamicImage::ImageRgba8(rendered), *target, quality, &progress)
            }
        }
    }
}

fn finish(
    image: &DynamicImage,
    target: OutputFormat,
    quality: f32,
    progress: &StageReporter<'_>,
) -> Result<TransformOutput, TransformError> {
    progress.report(70, Stage::Encoding, format!("Encoding {target}"));
    let bytes = raster::encode(image, target, quality)?;
    progress.report(95, Stage::Finalizing, "Packaging result");
    let output = TransformOutput {
        bytes,
        format: target,
        width: image.width(),
        height: image.height(),
    };
    progress.report(100, Stage::Finalizing, "Done");
    Ok(output)
}
