use image::RgbaImage;
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg::{Options, Tree};
use toolbox_core::{to_pixels, AspectRatio};

use crate::raster::MAX_DIMENSION;
use crate::TransformError;

/// Cheap content sniff; parsing decides for real.
pub fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(1024)];
    let text = String::from_utf8_lossy(head);
    let trimmed = text.trim_start_matches('\u{feff}').trim_start();
    trimmed.starts_with("<svg")
        || ((trimmed.starts_with("<?xml") || trimmed.starts_with("<!DOCTYPE svg"))
            && text.contains("<svg"))
}

fn parse(bytes: &[u8]) -> Result<Tree, TransformError> {
    Tree::from_data(bytes, &Options::default())
        .map_err(|err| TransformError::Decode(format!("invalid SVG: {err}")))
}

/// Intrinsic size of an SVG document, rounded to whole pixels.
pub fn intrinsic_size(bytes: &[u8]) -> Result<(u32, u32), TransformError> {
    let size = parse(bytes)?.size();
    Ok((
        to_pixels(f64::from(size.width())),
        to_pixels(f64::from(size.height())),
    ))
}

/// Renders an SVG document. A single given edge keeps the document's aspect
/// ratio; neither uses the intrinsic size.
pub fn rasterize(
    bytes: &[u8],
    width: Option<u32>,
    height: Option<u32>,
) -> Result<RgbaImage, TransformError> {
    let tree = parse(bytes)?;
    let size = tree.size();
    let ratio = AspectRatio::from_f32(size.width(), size.height());

    let (target_w, target_h) = match (width, height, ratio) {
        (Some(w), Some(h), _) => (w, h),
        (Some(w), None, Some(ratio)) => (w, ratio.height_for_width(w)),
        (None, Some(h), Some(ratio)) => (ratio.width_for_height(h), h),
        _ => (
            to_pixels(f64::from(size.width())),
            to_pixels(f64::from(size.height())),
        ),
    };
    if target_w == 0 || target_h == 0 || target_w > MAX_DIMENSION || target_h > MAX_DIMENSION {
        return Err(TransformError::InvalidParameters(format!(
            "render size {target_w}x{target_h} is outside 1..={MAX_DIMENSION} px"
        )));
    }

    let mut pixmap = Pixmap::new(target_w, target_h).ok_or_else(|| {
        TransformError::InvalidParameters(format!("cannot allocate {target_w}x{target_h} surface"))
    })?;
    let transform = Transform::from_scale(
        target_w as f32 / size.width(),
        target_h as f32 / size.height(),
    );
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    let mut straight = Vec::with_capacity(pixmap.data().len());
    for pixel in pixmap.pixels() {
        let color = pixel.demultiply();
        straight.extend_from_slice(&[color.red(), color.green(), color.blue(), color.alpha()]);
    }
    RgbaImage::from_raw(target_w, target_h, straight)
        .ok_or_else(|| TransformError::Decode("rendered surface has an unexpected size".into()))
}
