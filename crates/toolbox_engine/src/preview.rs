use crate::{raster, vector, TransformError};

const SVG_MIME: &str = "image/svg+xml";

/// What the UI needs to show a selected file before any job runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewInfo {
    pub width: u32,
    pub height: u32,
    pub mime_type: Option<String>,
}

/// Decodes a selected file far enough to show it: SVG documents are parsed,
/// raster images are decoded in full so corrupt pixel data is caught here.
pub fn probe_preview(name: &str, bytes: &[u8]) -> Result<PreviewInfo, TransformError> {
    let named_svg = name
        .rsplit_once('.')
        .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case("svg"));
    if named_svg || vector::looks_like_svg(bytes) {
        let (width, height) = vector::intrinsic_size(bytes)?;
        return Ok(PreviewInfo {
            width,
            height,
            mime_type: Some(SVG_MIME.to_string()),
        });
    }

    let (image, format) = raster::decode(bytes)?;
    Ok(PreviewInfo {
        width: image.width(),
        height: image.height(),
        mime_type: format.map(|format| format.mime_type().to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probes_svg_by_content() {
        let svg = br#"<svg xmlns="http://www.w3.org/2000/svg" width="12" height="7"/>"#;
        let info = probe_preview("drawing", svg).unwrap();
        assert_eq!((info.width, info.height), (12, 7));
        assert_eq!(info.mime_type.as_deref(), Some("image/svg+xml"));
    }

    #[test]
    fn rejects_plain_text() {
        assert!(probe_preview("notes.txt", b"hello there").is_err());
    }

    #[test]
    fn rejects_png_with_truncated_pixel_data() {
        let image = image::RgbaImage::from_fn(64, 64, |x, y| {
            image::Rgba([(x * 4) as u8, (y * 4) as u8, 90, 255])
        });
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgba8(image)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes.truncate(bytes.len() - 30);

        let err = probe_preview("broken.png", &bytes).unwrap_err();
        assert!(matches!(err, TransformError::Decode(_)));
    }
}
