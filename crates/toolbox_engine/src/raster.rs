use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader, RgbImage, RgbaImage};
use toolbox_core::OutputFormat;

use crate::TransformError;

/// Largest edge a resize may produce.
pub const MAX_DIMENSION: u32 = 16_384;

/// ICO entries cannot exceed this edge length.
const ICO_MAX_DIMENSION: u32 = 256;

/// Decodes raster bytes, sniffing the format from content.
pub fn decode(bytes: &[u8]) -> Result<(DynamicImage, Option<OutputFormat>), TransformError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|err| TransformError::Decode(err.to_string()))?;
    let Some(format) = reader.format() else {
        return Err(TransformError::Decode("unrecognised image data".into()));
    };
    let image = reader
        .decode()
        .map_err(|err| TransformError::Decode(err.to_string()))?;
    Ok((image, output_format_of(format)))
}

pub fn output_format_of(format: ImageFormat) -> Option<OutputFormat> {
    match format {
        ImageFormat::Png => Some(OutputFormat::Png),
        ImageFormat::Jpeg => Some(OutputFormat::Jpeg),
        ImageFormat::WebP => Some(OutputFormat::Webp),
        ImageFormat::Bmp => Some(OutputFormat::Bmp),
        ImageFormat::Gif => Some(OutputFormat::Gif),
        ImageFormat::Ico => Some(OutputFormat::Ico),
        ImageFormat::Tiff => Some(OutputFormat::Tiff),
        ImageFormat::Avif => Some(OutputFormat::Avif),
        _ => None,
    }
}

/// Whether this build can produce `format`.
pub fn can_encode(format: OutputFormat) -> bool {
    !matches!(format, OutputFormat::Avif)
}

/// Maps a `0.0..=1.0` quality onto the JPEG encoder's `1..=100` scale.
pub fn jpeg_quality(quality: f32) -> u8 {
    let scaled = (toolbox_core::clamp_quality(quality) * 100.0).round() as u8;
    scaled.clamp(1, 100)
}

/// Composites `image` over opaque white, dropping the alpha channel.
pub fn flatten_onto_white(image: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let image::Rgba([r, g, b, a]) = *image.get_pixel(x, y);
        let blend = |channel: u8| -> u8 {
            let alpha = u32::from(a);
            ((u32::from(channel) * alpha + 255 * (255 - alpha) + 127) / 255) as u8
        };
        image::Rgb([blend(r), blend(g), blend(b)])
    })
}

pub fn resize(
    image: &DynamicImage,
    width: u32,
    height: u32,
) -> Result<DynamicImage, TransformError> {
    if width == 0 || height == 0 {
        return Err(TransformError::InvalidParameters(format!(
            "target size {width}x{height} has an empty edge"
        )));
    }
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(TransformError::InvalidParameters(format!(
            "target size {width}x{height} exceeds {MAX_DIMENSION} px"
        )));
    }
    Ok(image.resize_exact(width, height, FilterType::Triangle))
}

/// Encodes `image` as `format`. Formats without alpha are flattened first.
pub fn encode(
    image: &DynamicImage,
    format: OutputFormat,
    quality: f32,
) -> Result<Vec<u8>, TransformError> {
    let image_format = match format {
        OutputFormat::Png => ImageFormat::Png,
        OutputFormat::Jpeg => ImageFormat::Jpeg,
        OutputFormat::Webp => ImageFormat::WebP,
        OutputFormat::Bmp => ImageFormat::Bmp,
        OutputFormat::Gif => ImageFormat::Gif,
        OutputFormat::Ico => ImageFormat::Ico,
        OutputFormat::Tiff => ImageFormat::Tiff,
        OutputFormat::Avif => {
            return Err(TransformError::encode(
                format,
                "encoder not available in this build",
            ))
        }
    };
    if format == OutputFormat::Ico
        && (image.width() > ICO_MAX_DIMENSION || image.height() > ICO_MAX_DIMENSION)
    {
        return Err(TransformError::encode(
            format,
            format!(
                "{}x{} exceeds the {ICO_MAX_DIMENSION} px icon limit",
                image.width(),
                image.height()
            ),
        ));
    }

    let pixels = if format.supports_alpha() {
        DynamicImage::ImageRgba8(image.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(flatten_onto_white(&image.to_rgba8()))
    };

    let mut buffer = Vec::new();
    if format == OutputFormat::Jpeg {
        let encoder = JpegEncoder::new_with_quality(&mut buffer, jpeg_quality(quality));
        pixels
            .write_with_encoder(encoder)
            .map_err(|err| TransformError::encode(format, err.to_string()))?;
    } else {
        pixels
            .write_to(&mut Cursor::new(&mut buffer), image_format)
            .map_err(|err| TransformError::encode(format, err.to_string()))?;
    }
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
            if (x + y) % 2 == 0 {
                image::Rgba([255, 0, 0, 255])
            } else {
                image::Rgba([0, 0, 255, 0])
            }
        }))
    }

    #[test]
    fn transparent_pixels_flatten_to_white() {
        let flat = flatten_onto_white(&checker(2, 1).to_rgba8());
        assert_eq!(flat.get_pixel(0, 0).0, [255, 0, 0]);
        assert_eq!(flat.get_pixel(1, 0).0, [255, 255, 255]);
    }

    #[test]
    fn half_alpha_blends_toward_white() {
        let image = RgbaImage::from_pixel(1, 1, image::Rgba([0, 0, 0, 128]));
        let flat = flatten_onto_white(&image);
        assert_eq!(flat.get_pixel(0, 0).0, [127, 127, 127]);
    }

    #[test]
    fn jpeg_quality_scale() {
        assert_eq!(jpeg_quality(0.92), 92);
        assert_eq!(jpeg_quality(0.0), 1);
        assert_eq!(jpeg_quality(3.0), 100);
    }

    #[test]
    fn png_round_trip_keeps_dimensions() {
        let bytes = encode(&checker(8, 6), OutputFormat::Png, 1.0).unwrap();
        let (decoded, format) = decode(&bytes).unwrap();
        assert_eq!(format, Some(OutputFormat::Png));
        assert_eq!((decoded.width(), decoded.height()), (8, 6));
    }

    #[test]
    fn text_is_not_an_image() {
        let err = decode(b"just some notes\n").unwrap_err();
        assert!(matches!(err, TransformError::Decode(_)));
    }

    #[test]
    fn avif_and_large_icons_fail_to_encode() {
        let avif = encode(&checker(4, 4), OutputFormat::Avif, 0.8).unwrap_err();
        assert!(matches!(avif, TransformError::Encode { .. }));
        let ico = encode(&checker(300, 10), OutputFormat::Ico, 0.8).unwrap_err();
        assert!(matches!(ico, TransformError::Encode { .. }));
    }

    #[test]
    fn resize_rejects_empty_and_oversized_targets() {
        let image = checker(4, 4);
        assert!(resize(&image, 0, 4).is_err());
        assert!(resize(&image, MAX_DIMENSION + 1, 4).is_err());
        let resized = resize(&image, 2, 3).unwrap();
        assert_eq!((resized.width(), resized.height()), (2, 3));
    }
}
