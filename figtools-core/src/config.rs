//! Export Configuration - Set Once, Read Everywhere

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::exporter::ExportError;

/// Named figure size preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Size {
    Small,
    Large,
}

impl Size {
    pub fn all() -> &'static [Size] {
        &[Size::Small, Size::Large]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Size::Small => "small",
            Size::Large => "large",
        }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Size {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "small" => Ok(Size::Small),
            "large" => Ok(Size::Large),
            _ => Err(ExportError::UnknownSize(s.to_string())),
        }
    }
}

/// Immutable settings shared by every export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_img_dir")]
    pub img_dir: PathBuf,
    #[serde(default = "default_size_small")]
    pub size_small: [f64; 2],
    #[serde(default = "default_size_large")]
    pub size_large: [f64; 2],
    #[serde(default = "default_dpi")]
    pub dpi: u32,
}

fn default_img_dir() -> PathBuf { PathBuf::from("img") }
fn default_size_small() -> [f64; 2] { [4.0, 3.0] }
fn default_size_large() -> [f64; 2] { [8.0, 6.0] }
fn default_dpi() -> u32 { 400 }

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            img_dir: default_img_dir(),
            size_small: default_size_small(),
            size_large: default_size_large(),
            dpi: default_dpi(),
        }
    }
}

impl ExportConfig {
    /// Load from a JSON file; absent keys keep their defaults
    pub fn load(path: &Path) -> Result<Self, ExportError> {
        let content = fs::read_to_string(path).map_err(|source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn with_img_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.img_dir = dir.into();
        self
    }

    /// Width and height in inches for a preset
    pub fn size(&self, preset: Size) -> [f64; 2] {
        match preset {
            Size::Small => self.size_small,
            Size::Large => self.size_large,
        }
    }

    pub fn path_for(&self, basename: &str, extension: &str) -> PathBuf {
        self.img_dir.join(format!("{}.{}", basename, extension))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = ExportConfig::default();
        assert_eq!(cfg.img_dir, PathBuf::from("img"));
        assert_eq!(cfg.size(Size::Small), [4.0, 3.0]);
        assert_eq!(cfg.size(Size::Large), [8.0, 6.0]);
        assert_eq!(cfg.dpi, 400);
    }

    #[test]
    fn test_size_parse() {
        assert_eq!("small".parse::<Size>().unwrap(), Size::Small);
        assert_eq!(" LARGE ".parse::<Size>().unwrap(), Size::Large);

        let err = "medium".parse::<Size>().unwrap_err();
        assert!(matches!(err, ExportError::UnknownSize(ref s) if s == "medium"));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let cfg: ExportConfig = serde_json::from_str(r#"{"dpi": 150}"#).unwrap();
        assert_eq!(cfg.dpi, 150);
        assert_eq!(cfg.img_dir, PathBuf::from("img"));
        assert_eq!(cfg.size_small, [4.0, 3.0]);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("figtools.json");
        fs::write(&path, r#"{"img_dir": "figures", "size_large": [10.0, 5.0]}"#).unwrap();

        let cfg = ExportConfig::load(&path).unwrap();
        assert_eq!(cfg.img_dir, PathBuf::from("figures"));
        assert_eq!(cfg.size(Size::Large), [10.0, 5.0]);
        assert_eq!(cfg.path_for("plot1", "png"), PathBuf::from("figures/plot1.png"));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = ExportConfig::load(Path::new("/nonexistent/figtools.json")).unwrap_err();
        assert!(matches!(err, ExportError::Io { .. }));
    }
}
