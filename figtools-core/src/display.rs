//! Display Payloads
//!
//! Image and link payloads a notebook frontend (or any HTML page) can show.
//! `Output` collects payloads in order and renders them as one unit.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::exporter::ExportError;

pub const MIME_PNG: &str = "image/png";
pub const MIME_HTML: &str = "text/html";

/// Bytes escaped in the path part of an href; `/` separates segments
const HREF_PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`');

/// Raster image shown at a fixed display size
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayImage {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

impl DisplayImage {
    /// Base64 of the file on disk
    pub fn encoded(&self) -> Result<String, ExportError> {
        let bytes = fs::read(&self.path).map_err(|source| ExportError::Io {
            path: self.path.clone(),
            source,
        })?;
        Ok(STANDARD.encode(bytes))
    }

    pub fn to_html(&self) -> Result<String, ExportError> {
        Ok(format!(
            r#"<img src="data:{};base64,{}" width="{}" height="{}" />"#,
            MIME_PNG,
            self.encoded()?,
            self.width,
            self.height
        ))
    }

    pub fn mime_bundle(&self) -> Result<BTreeMap<String, String>, ExportError> {
        let mut bundle = BTreeMap::new();
        bundle.insert(MIME_PNG.to_string(), self.encoded()?);
        Ok(bundle)
    }
}

/// Link to an exported file, stamped with its pixel hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileLink {
    pub path: PathBuf,
    pub hash: String,
}

impl FileLink {
    pub fn href(&self) -> String {
        let path = url_path(&self.path);
        format!("{}?{}", utf8_percent_encode(&path, HREF_PATH), self.hash)
    }

    pub fn label(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| url_path(&self.path))
    }

    pub fn to_html(&self) -> String {
        format!(
            r#"<a href="{}" target="_blank">[{}]</a>"#,
            escape_html(&self.href()),
            escape_html(&self.label())
        )
    }

    pub fn mime_bundle(&self) -> BTreeMap<String, String> {
        let mut bundle = BTreeMap::new();
        bundle.insert(MIME_HTML.to_string(), self.to_html());
        bundle
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DisplayData {
    Image(DisplayImage),
    Link(FileLink),
    Html { html: String },
}

impl DisplayData {
    pub fn to_html(&self) -> Result<String, ExportError> {
        match self {
            DisplayData::Image(img) => img.to_html(),
            DisplayData::Link(link) => Ok(link.to_html()),
            DisplayData::Html { html } => Ok(html.clone()),
        }
    }

    pub fn mime_bundle(&self) -> Result<BTreeMap<String, String>, ExportError> {
        match self {
            DisplayData::Image(img) => img.mime_bundle(),
            DisplayData::Link(link) => Ok(link.mime_bundle()),
            DisplayData::Html { html } => {
                let mut bundle = BTreeMap::new();
                bundle.insert(MIME_HTML.to_string(), html.clone());
                Ok(bundle)
            }
        }
    }
}

/// Ordered collection of display payloads shown as one output
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub outputs: Vec<DisplayData>,
}

impl Output {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_display_data(&mut self, data: DisplayData) {
        self.outputs.push(data);
    }

    pub fn to_html(&self) -> Result<String, ExportError> {
        let parts = self
            .outputs
            .iter()
            .map(DisplayData::to_html)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(parts.join("<br/>"))
    }

    pub fn mime_bundles(&self) -> Result<Vec<BTreeMap<String, String>>, ExportError> {
        self.outputs.iter().map(DisplayData::mime_bundle).collect()
    }
}

fn url_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

pub(crate) fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link() -> FileLink {
        FileLink {
            path: PathBuf::from("img").join("plot1.png"),
            hash: "abc123".to_string(),
        }
    }

    #[test]
    fn test_href_has_hash_suffix() {
        assert_eq!(link().href(), "img/plot1.png?abc123");
    }

    #[test]
    fn test_href_escapes_path_part() {
        let l = FileLink {
            path: PathBuf::from("my figs").join("plot?#1%.png"),
            hash: "abc123".to_string(),
        };
        assert_eq!(l.href(), "my%20figs/plot%3F%231%25.png?abc123");
        let binding = l.href();
        let (path, hash) = binding.rsplit_once('?').unwrap();
        assert!(!path.contains(&['?', '#', ' '][..]));
        assert_eq!(hash, "abc123");
        assert_eq!(l.label(), "plot?#1%.png");
    }

    #[test]
    fn test_href_encodes_non_ascii() {
        let l = FileLink { path: PathBuf::from("img/größe.png"), hash: "h".into() };
        assert_eq!(l.href(), "img/gr%C3%B6%C3%9Fe.png?h");
    }

    #[test]
    fn test_link_html() {
        assert_eq!(
            link().to_html(),
            r#"<a href="img/plot1.png?abc123" target="_blank">[plot1.png]</a>"#
        );
    }

    #[test]
    fn test_link_html_escaped() {
        let l = FileLink { path: PathBuf::from("a&b\".png"), hash: "h".into() };
        assert_eq!(
            l.to_html(),
            r#"<a href="a&amp;b%22.png?h" target="_blank">[a&amp;b&quot;.png]</a>"#
        );
    }

    #[test]
    fn test_image_html_embeds_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.png");
        fs::write(&path, b"\x89PNG").unwrap();

        let img = DisplayImage { path, width: 400, height: 300 };
        let html = img.to_html().unwrap();
        assert!(html.starts_with(r#"<img src="data:image/png;base64,iVBORw==""#));
        assert!(html.contains(r#"width="400" height="300""#));
        assert_eq!(img.mime_bundle().unwrap()[MIME_PNG], "iVBORw==");
    }

    #[test]
    fn test_missing_image_is_io_error() {
        let img = DisplayImage { path: PathBuf::from("/nonexistent/x.png"), width: 1, height: 1 };
        assert!(matches!(img.to_html(), Err(ExportError::Io { .. })));
    }

    #[test]
    fn test_output_joins_payloads_in_order() {
        let mut out = Output::new();
        out.append_display_data(DisplayData::Html { html: "<b>first</b>".into() });
        out.append_display_data(DisplayData::Link(link()));

        let html = out.to_html().unwrap();
        assert!(html.starts_with("<b>first</b><br/><a "));

        let bundles = out.mime_bundles().unwrap();
        assert_eq!(bundles.len(), 2);
        assert!(bundles[1][MIME_HTML].contains("abc123"));
    }

    #[test]
    fn test_display_data_serializes_tagged() {
        let json = serde_json::to_value(DisplayData::Link(link())).unwrap();
        assert_eq!(json["type"], "link");
        assert_eq!(json["hash"], "abc123");
    }
}
