//! figtools Core - Figure Export Helper
//!
//! Render a figure to disk, fingerprint the raster by its decoded pixels and
//! hand back a displayable image plus a hash-stamped link.
//!
//! # Guarantees
//! 1. Nothing is written until the request is known to be valid
//! 2. The hash always comes from the PNG just written
//! 3. The hash depends on pixels, not on file bytes
//! 4. Scoped render settings are restored on every exit path

pub mod config;
pub mod figure;
pub mod plot;
pub mod settings;
pub mod hashing;
pub mod display;
pub mod grid;
pub mod exporter;

pub use config::{ExportConfig, Size};
pub use figure::{Figure, ExportFormat, RenderError, RenderOptions};
pub use plot::{LineFigure, Series};
pub use settings::{Backend, RenderSettings, SettingsGuard};
pub use hashing::{pixel_hash, pixel_hash_image, sha256_hex};
pub use display::{DisplayData, DisplayImage, FileLink, Output};
pub use grid::img_grid;
pub use exporter::{
    ErrorCategory, ExportError, ExportOutput, ExportRequest, FigureExporter, PngCompression,
    SaveOptions,
};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
