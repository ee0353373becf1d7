//! Figure Abstraction - What the Exporter Renders
//!
//! Any type that can report its physical size and draw itself to a pixel
//! buffer or a vector document can be exported.

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Renderer-specific key/value options (merged settings params + per-call extras)
pub type RenderOptions = BTreeMap<String, String>;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct RenderError(pub String);

impl RenderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Png,
    Svg,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Svg => "svg",
        }
    }

    pub fn is_raster(&self) -> bool {
        matches!(self, ExportFormat::Png)
    }
}

pub trait Figure {
    /// Physical size as `[width, height]` in inches
    fn size_inches(&self) -> [f64; 2];

    fn set_size_inches(&mut self, size: [f64; 2]);

    /// Tighten margins before a vector export. Most figures have nothing to do.
    fn tight_layout(&mut self) {}

    fn render_raster(&self, dpi: u32, options: &RenderOptions) -> Result<RgbaImage, RenderError>;

    fn render_vector(&self, options: &RenderOptions) -> Result<Vec<u8>, RenderError>;
}

/// Largest raster side in pixels
pub const MAX_RASTER_SIDE: u32 = 1 << 16;

/// Pixel size of a figure at `dpi`, never smaller than 1x1
pub fn pixel_dimensions(size_inches: [f64; 2], dpi: u32) -> (u32, u32) {
    let to_px = |inches: f64| (inches * dpi as f64).round().max(1.0) as u32;
    (to_px(size_inches[0]), to_px(size_inches[1]))
}

/// Pixel size at `dpi`, or an error when either side exceeds `MAX_RASTER_SIDE`
pub fn checked_pixel_dimensions(size_inches: [f64; 2], dpi: u32) -> Result<(u32, u32), RenderError> {
    let (width, height) = pixel_dimensions(size_inches, dpi);
    if width > MAX_RASTER_SIDE || height > MAX_RASTER_SIDE {
        return Err(RenderError::new(format!(
            "Image size of {}x{} pixels is too large, each side must be at most {}",
            width, height, MAX_RASTER_SIDE
        )));
    }
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_dimensions() {
        assert_eq!(pixel_dimensions([4.0, 3.0], 400), (1600, 1200));
        assert_eq!(pixel_dimensions([8.0, 6.0], 100), (800, 600));
        assert_eq!(pixel_dimensions([0.333, 0.5], 10), (3, 5));
        assert_eq!(pixel_dimensions([0.0, 0.01], 10), (1, 1));
    }

    #[test]
    fn test_checked_pixel_dimensions_caps_sides() {
        assert_eq!(checked_pixel_dimensions([4.0, 3.0], 400).unwrap(), (1600, 1200));
        assert_eq!(checked_pixel_dimensions([1.0, 1.0], MAX_RASTER_SIDE).unwrap(), (65536, 65536));
        assert!(checked_pixel_dimensions([1.0, 1.0], MAX_RASTER_SIDE + 1).is_err());
        assert!(checked_pixel_dimensions([4.0, 3.0], 100_000).is_err());
        assert!(checked_pixel_dimensions([1.0, 1.0], u32::MAX).is_err());
    }

    #[test]
    fn test_format_extensions() {
        assert_eq!(ExportFormat::Png.extension(), "png");
        assert_eq!(ExportFormat::Svg.extension(), "svg");
        assert!(ExportFormat::Png.is_raster());
        assert!(!ExportFormat::Svg.is_raster());
    }
}
