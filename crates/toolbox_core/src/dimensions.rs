//! Dimension and quality arithmetic shared by the UI layer and executors.

/// Quality used when the caller supplies something that is not a number.
pub const DEFAULT_QUALITY: f32 = 0.92;

/// Clamps a quality value into `0.0..=1.0`.
pub fn clamp_quality(quality: f32) -> f32 {
    if quality.is_nan() {
        DEFAULT_QUALITY
    } else {
        quality.clamp(0.0, 1.0)
    }
}

/// Width divided by height of a source image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AspectRatio(f64);

impl AspectRatio {
    pub fn of(width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        Some(Self(f64::from(width) / f64::from(height)))
    }

    pub fn from_f32(width: f32, height: f32) -> Option<Self> {
        if !(width > 0.0 && height > 0.0) {
            return None;
        }
        Some(Self(f64::from(width) / f64::from(height)))
    }

    /// `round(width / ratio)`, never below one pixel.
    pub fn height_for_width(self, width: u32) -> u32 {
        to_pixels(f64::from(width) / self.0)
    }

    /// `round(height * ratio)`, never below one pixel.
    pub fn width_for_height(self, height: u32) -> u32 {
        to_pixels(f64::from(height) * self.0)
    }
}

/// How the caller asked for the output to be sized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResizeTarget {
    Exact { width: u32, height: u32 },
    /// Width given, height follows the aspect ratio.
    Width(u32),
    /// Height given, width follows the aspect ratio.
    Height(u32),
    Percent(f64),
}

impl ResizeTarget {
    /// Integer target dimensions for a source of `width` x `height`.
    ///
    /// Returns `None` when the source or the request is degenerate.
    pub fn resolve(self, width: u32, height: u32) -> Option<(u32, u32)> {
        let ratio = AspectRatio::of(width, height)?;
        match self {
            ResizeTarget::Exact { width, height } if width > 0 && height > 0 => {
                Some((width, height))
            }
            ResizeTarget::Exact { .. } => None,
            ResizeTarget::Width(0) | ResizeTarget::Height(0) => None,
            ResizeTarget::Width(w) => Some((w, ratio.height_for_width(w))),
            ResizeTarget::Height(h) => Some((ratio.width_for_height(h), h)),
            ResizeTarget::Percent(pct) if pct.is_finite() && pct > 0.0 => {
                let scale = pct / 100.0;
                Some((
                    to_pixels(f64::from(width) * scale),
                    to_pixels(f64::from(height) * scale),
                ))
            }
            ResizeTarget::Percent(_) => None,
        }
    }
}

/// Nearest whole pixel, at least one.
pub fn to_pixels(value: f64) -> u32 {
    if !value.is_finite() || value < 1.0 {
        return 1;
    }
    value.round().min(f64::from(u32::MAX)) as u32
}
