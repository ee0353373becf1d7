//! Figure Exporter - Single Entry Point
//!
//! Validation (basename, size preset, resolution) happens before anything
//! touches the figure or the disk. The hash is always taken from the PNG
//! that was just written, never from a separate render.

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder, RgbaImage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::{ExportConfig, Size};
use crate::display::{DisplayData, DisplayImage, FileLink, Output};
use crate::figure::{checked_pixel_dimensions, pixel_dimensions, ExportFormat, Figure, RenderError};
use crate::hashing::pixel_hash;
use crate::settings::{RenderSettings, SettingsGuard};

/// Display pixels per inch of figure size
pub const DISPLAY_SCALE: f64 = 100.0;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Unknown size: {0}")]
    UnknownSize(String),

    #[error("Invalid basename: {0:?}")]
    InvalidBasename(String),

    #[error("Invalid resolution: {0} dpi")]
    InvalidResolution(u32),

    #[error("Invalid grid: {0}")]
    InvalidGrid(String),

    #[error("Invalid request: {0}")]
    Config(#[from] serde_json::Error),

    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Encoding error at {}: {source}", .path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Hashing error at {}: {source}", .path.display())]
    Hash {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Configuration,
    Io,
    Hashing,
}

impl ExportError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ExportError::UnknownSize(_)
            | ExportError::InvalidBasename(_)
            | ExportError::InvalidResolution(_)
            | ExportError::InvalidGrid(_)
            | ExportError::Config(_) => ErrorCategory::Configuration,
            ExportError::Io { .. } | ExportError::Render(_) | ExportError::Encode { .. } => {
                ErrorCategory::Io
            }
            ExportError::Hash { .. } => ErrorCategory::Hashing,
        }
    }

    fn io(path: &Path) -> impl FnOnce(std::io::Error) -> ExportError + '_ {
        move |source| ExportError::Io { path: path.to_path_buf(), source }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PngCompression {
    #[default]
    Default,
    Fast,
    Best,
}

impl PngCompression {
    #[allow(deprecated)]
    fn codec(&self) -> CompressionType {
        match self {
            PngCompression::Default => CompressionType::Default,
            PngCompression::Fast => CompressionType::Fast,
            PngCompression::Best => CompressionType::Best,
        }
    }
}

/// Per-call save options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveOptions {
    /// Falls back to `ExportConfig::dpi`
    #[serde(default)]
    pub dpi: Option<u32>,
    #[serde(default)]
    pub compression: PngCompression,
    /// Renderer-specific keys, passed through to the figure
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRequest {
    pub basename: String,
    pub resize: Option<Size>,
    pub options: SaveOptions,
}

/// Wire form of `ExportRequest`; preset names resolve after parsing
#[derive(Deserialize)]
struct RawExportRequest {
    basename: String,
    #[serde(default = "default_resize")]
    resize: Option<String>,
    #[serde(default)]
    options: SaveOptions,
}

fn default_resize() -> Option<String> {
    Some(Size::Small.name().to_string())
}

impl ExportRequest {
    pub fn new(basename: impl Into<String>) -> Self {
        Self {
            basename: basename.into(),
            resize: Some(Size::Small),
            options: SaveOptions::default(),
        }
    }

    pub fn resize(mut self, size: Option<Size>) -> Self {
        self.resize = size;
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.options.dpi = Some(dpi);
        self
    }

    pub fn compression(mut self, compression: PngCompression) -> Self {
        self.options.compression = compression;
        self
    }

    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.extra.insert(key.into(), value.into());
        self
    }

    pub fn from_json(payload: &str) -> Result<Self, ExportError> {
        let raw: RawExportRequest = serde_json::from_str(payload)?;
        let resize = raw.resize.map(|name| name.parse::<Size>()).transpose()?;
        Ok(Self {
            basename: raw.basename,
            resize,
            options: raw.options,
        })
    }
}

/// Composite result: the image to show and a hash-stamped link to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportOutput {
    pub image: DisplayImage,
    pub link: FileLink,
    pub files: Vec<PathBuf>,
}

impl ExportOutput {
    pub fn hash(&self) -> &str {
        &self.link.hash
    }

    /// Describe a PNG that already exists on disk, shown at its pixel size
    pub fn from_png(path: &Path) -> Result<Self, ExportError> {
        let (width, height) = image::image_dimensions(path).map_err(|source| ExportError::Hash {
            path: path.to_path_buf(),
            source,
        })?;
        let hash = pixel_hash(path)?;
        Ok(Self {
            image: DisplayImage { path: path.to_path_buf(), width, height },
            link: FileLink { path: path.to_path_buf(), hash },
            files: vec![path.to_path_buf()],
        })
    }

    pub fn into_output(self) -> Output {
        let mut out = Output::new();
        out.append_display_data(DisplayData::Image(self.image));
        out.append_display_data(DisplayData::Link(self.link));
        out
    }
}

/// The export helper - immutable config plus scoped render settings
pub struct FigureExporter {
    config: ExportConfig,
    pub(crate) settings: RenderSettings,
}

impl FigureExporter {
    pub fn new(config: ExportConfig) -> Self {
        Self {
            config,
            settings: RenderSettings::default(),
        }
    }

    pub fn with_render_settings(config: ExportConfig, settings: RenderSettings) -> Self {
        Self { config, settings }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Apply `overrides` until the returned guard drops
    pub fn scoped(&mut self, overrides: &RenderSettings) -> SettingsGuard<'_> {
        SettingsGuard::new(self, overrides)
    }

    pub fn with_settings<R>(
        &mut self,
        overrides: &RenderSettings,
        f: impl FnOnce(&mut FigureExporter) -> R,
    ) -> R {
        let mut guard = self.scoped(overrides);
        f(&mut *guard)
    }

    /// Resize, save every configured format and hash the written PNG
    ///
    /// Mutates `figure` when `request.resize` is set. Existing files at the
    /// target paths are overwritten.
    pub fn export(
        &self,
        figure: &mut dyn Figure,
        request: &ExportRequest,
    ) -> Result<ExportOutput, ExportError> {
        validate_basename(&request.basename)?;

        let dpi = request.options.dpi.unwrap_or(self.config.dpi);
        if dpi == 0 {
            return Err(ExportError::InvalidResolution(dpi));
        }

        let size = match request.resize {
            Some(preset) => self.config.size(preset),
            None => figure.size_inches(),
        };
        checked_pixel_dimensions(size, dpi)?;

        if request.resize.is_some() {
            figure.set_size_inches(size);
        }

        let backend = self.settings.backend;
        if backend.writes_vector() {
            figure.tight_layout();
        }

        let img_dir = &self.config.img_dir;
        fs::create_dir_all(img_dir).map_err(ExportError::io(img_dir))?;

        let options = self.settings.render_options(&request.options.extra);
        let mut files = vec![];
        let mut png_path = None;

        for format in backend.formats() {
            let path = self.config.path_for(&request.basename, format.extension());
            match format {
                ExportFormat::Png => {
                    let image = figure.render_raster(dpi, &options)?;
                    write_png(&path, &image, request.options.compression)?;
                    png_path = Some(path.clone());
                }
                ExportFormat::Svg => {
                    let document = figure.render_vector(&options)?;
                    fs::write(&path, document).map_err(ExportError::io(&path))?;
                }
            }
            tracing::debug!(path = %path.display(), ?format, "wrote figure");
            files.push(path);
        }

        let png_path = match png_path {
            Some(path) => path,
            None => self.config.path_for(&request.basename, ExportFormat::Png.extension()),
        };
        let hash = pixel_hash(&png_path)?;

        let [w, h] = figure.size_inches();
        let image = DisplayImage {
            path: png_path.clone(),
            width: (w * DISPLAY_SCALE) as u32,
            height: (h * DISPLAY_SCALE) as u32,
        };

        let (px_w, px_h) = pixel_dimensions([w, h], dpi);
        tracing::info!(
            basename = %request.basename,
            dpi,
            width_px = px_w,
            height_px = px_h,
            %hash,
            "exported figure"
        );

        Ok(ExportOutput {
            image,
            link: FileLink { path: png_path, hash },
            files,
        })
    }
}

impl Default for FigureExporter {
    fn default() -> Self {
        Self::new(ExportConfig::default())
    }
}

fn validate_basename(basename: &str) -> Result<(), ExportError> {
    let bad = basename.trim().is_empty()
        || basename.contains(&['/', '\\'][..])
        || basename == "."
        || basename == "..";
    if bad {
        return Err(ExportError::InvalidBasename(basename.to_string()));
    }
    Ok(())
}

fn write_png(path: &Path, image: &RgbaImage, compression: PngCompression) -> Result<(), ExportError> {
    let file = File::create(path).map_err(ExportError::io(path))?;
    let mut writer = BufWriter::new(file);
    PngEncoder::new_with_quality(&mut writer, compression.codec(), FilterType::Adaptive)
        .write_image(image.as_raw(), image.width(), image.height(), ExtendedColorType::Rgba8)
        .map_err(|source| ExportError::Encode { path: path.to_path_buf(), source })?;
    writer.flush().map_err(ExportError::io(path))
}
