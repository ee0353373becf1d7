//! Render Settings - Scoped, Always Restored
//!
//! Settings are swapped in for the lifetime of a `SettingsGuard` and the
//! previous values come back when the guard drops, including on early
//! return and unwinding.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};

use crate::exporter::FigureExporter;
use crate::figure::{ExportFormat, RenderOptions};

/// Which outputs an export writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Raster only
    Raster,
    /// Raster plus a vector document for typesetting
    #[default]
    Vector,
}

impl Backend {
    pub fn formats(&self) -> &'static [ExportFormat] {
        match self {
            Backend::Raster => &[ExportFormat::Png],
            Backend::Vector => &[ExportFormat::Png, ExportFormat::Svg],
        }
    }

    pub fn writes_vector(&self) -> bool {
        self.formats().iter().any(|f| !f.is_raster())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RenderSettings {
    #[serde(default)]
    pub backend: Backend,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

impl RenderSettings {
    pub fn new(backend: Backend) -> Self {
        Self { backend, params: BTreeMap::new() }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Overlay `overrides` onto these settings; override params win
    pub fn merged(&self, overrides: &RenderSettings) -> RenderSettings {
        let mut params = self.params.clone();
        params.extend(overrides.params.iter().map(|(k, v)| (k.clone(), v.clone())));
        RenderSettings { backend: overrides.backend, params }
    }

    /// Options handed to the figure: params first, then per-call extras
    pub fn render_options(&self, extra: &BTreeMap<String, String>) -> RenderOptions {
        let mut options = self.params.clone();
        options.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        options
    }
}

/// Restores the exporter's previous settings on drop
pub struct SettingsGuard<'a> {
    exporter: &'a mut FigureExporter,
    previous: Option<RenderSettings>,
}

impl<'a> SettingsGuard<'a> {
    pub(crate) fn new(exporter: &'a mut FigureExporter, overrides: &RenderSettings) -> Self {
        let applied = exporter.settings.merged(overrides);
        let previous = std::mem::replace(&mut exporter.settings, applied);
        tracing::debug!(backend = ?exporter.settings.backend, "entered render settings scope");
        Self { exporter, previous: Some(previous) }
    }
}

impl Deref for SettingsGuard<'_> {
    type Target = FigureExporter;

    fn deref(&self) -> &Self::Target {
        self.exporter
    }
}

impl DerefMut for SettingsGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.exporter
    }
}

impl Drop for SettingsGuard<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            self.exporter.settings = previous;
            tracing::debug!(backend = ?self.exporter.settings.backend, "restored render settings");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExportConfig;

    #[test]
    fn test_backend_formats() {
        assert_eq!(Backend::Raster.formats(), &[ExportFormat::Png]);
        assert_eq!(Backend::Vector.formats(), &[ExportFormat::Png, ExportFormat::Svg]);
        assert!(Backend::default().writes_vector());
        assert!(!Backend::Raster.writes_vector());
    }

    #[test]
    fn test_merge_overrides_win() {
        let base = RenderSettings::default().param("background", "#ffffff").param("line_width", "2");
        let over = RenderSettings::new(Backend::Raster).param("line_width", "4");
        let merged = base.merged(&over);

        assert_eq!(merged.backend, Backend::Raster);
        assert_eq!(merged.params["background"], "#ffffff");
        assert_eq!(merged.params["line_width"], "4");
    }

    #[test]
    fn test_render_options_extra_wins() {
        let settings = RenderSettings::default().param("background", "#ffffff");
        let mut extra = BTreeMap::new();
        extra.insert("background".to_string(), "#000000".to_string());
        let options = settings.render_options(&extra);
        assert_eq!(options["background"], "#000000");
    }

    #[test]
    fn test_guard_restores_on_drop() {
        let mut exporter = FigureExporter::new(ExportConfig::default());
        {
            let guard = exporter.scoped(&RenderSettings::new(Backend::Raster).param("k", "v"));
            assert_eq!(guard.settings().backend, Backend::Raster);
            assert_eq!(guard.settings().params["k"], "v");
        }
        assert_eq!(exporter.settings(), &RenderSettings::default());
    }

    #[test]
    fn test_guard_restores_after_panic() {
        let mut exporter = FigureExporter::new(ExportConfig::default());
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = exporter.scoped(&RenderSettings::new(Backend::Raster));
            panic!("render blew up");
        }));
        assert!(result.is_err());
        assert_eq!(exporter.settings().backend, Backend::Vector);
    }
}
