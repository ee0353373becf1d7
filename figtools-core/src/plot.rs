//! Line Figures on plotters
//!
//! `LineFigure` draws one or more polylines on shared axes. The same drawing
//! code runs against the bitmap backend (raster export) and the SVG backend
//! (vector export). Text is never drawn, so no font stack is needed.

use image::{DynamicImage, RgbImage, RgbaImage};
use plotters::coord::Shift;
use plotters::prelude::*;
use serde::{Deserialize, Serialize};

use crate::figure::{checked_pixel_dimensions, pixel_dimensions, Figure, RenderError, RenderOptions};

/// SVG user units per inch
const SVG_UNITS_PER_INCH: u32 = 72;

const GRID_DIVISIONS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub points: Vec<[f64; 2]>,
    #[serde(default = "default_color")]
    pub color: [u8; 3],
    #[serde(default = "default_line_width")]
    pub line_width: u32,
}

fn default_color() -> [u8; 3] { [31, 119, 180] }
fn default_line_width() -> u32 { 2 }

impl Series {
    pub fn new(points: Vec<[f64; 2]>) -> Self {
        Self {
            points,
            color: default_color(),
            line_width: default_line_width(),
        }
    }

    pub fn from_xy(xs: &[f64], ys: &[f64]) -> Self {
        Self::new(xs.iter().zip(ys).map(|(x, y)| [*x, *y]).collect())
    }

    pub fn color(mut self, color: [u8; 3]) -> Self {
        self.color = color;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineFigure {
    #[serde(default = "default_size")]
    pub size: [f64; 2],
    #[serde(default)]
    pub series: Vec<Series>,
    #[serde(default = "default_background")]
    pub background: [u8; 3],
    #[serde(default = "default_true")]
    pub grid: bool,
}

fn default_size() -> [f64; 2] { [6.4, 4.8] }
fn default_background() -> [u8; 3] { [255, 255, 255] }
fn default_true() -> bool { true }

impl Default for LineFigure {
    fn default() -> Self {
        Self {
            size: default_size(),
            series: vec![],
            background: default_background(),
            grid: true,
        }
    }
}

/// Drawing parameters after applying render options
struct Style {
    background: RGBColor,
    line_width: Option<u32>,
}

impl Style {
    fn resolve(figure: &LineFigure, options: &RenderOptions) -> Result<Self, RenderError> {
        let background = match options.get("background") {
            Some(hex) => parse_hex_color(hex)?,
            None => figure.background,
        };
        let line_width = options
            .get("line_width")
            .map(|v| {
                v.trim()
                    .parse::<u32>()
                    .map_err(|_| RenderError::new(format!("Invalid line_width: {}", v)))
            })
            .transpose()?;

        Ok(Self {
            background: RGBColor(background[0], background[1], background[2]),
            line_width,
        })
    }
}

fn parse_hex_color(value: &str) -> Result<[u8; 3], RenderError> {
    let hex = value.trim().trim_start_matches('#');
    let invalid = || RenderError::new(format!("Invalid color: {}", value));
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(invalid());
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
    Ok([channel(0)?, channel(2)?, channel(4)?])
}

/// Data range padded by 5%, widened when all values coincide
fn padded_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<(f64, f64)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })?;
    if hi - lo < f64::EPSILON {
        return Some((lo - 0.5, hi + 0.5));
    }
    let pad = 0.05 * (hi - lo);
    Some((lo - pad, hi + pad))
}

impl LineFigure {
    pub fn new(size: [f64; 2]) -> Self {
        Self { size, ..Self::default() }
    }

    pub fn with_series(mut self, series: Series) -> Self {
        self.series.push(series);
        self
    }

    fn points(&self) -> impl Iterator<Item = &[f64; 2]> {
        self.series.iter().flat_map(|s| s.points.iter())
    }

    fn draw<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, Shift>,
        style: &Style,
        units_per_inch: f64,
    ) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
        root.fill(&style.background)?;

        let x_range = padded_range(self.points().map(|p| p[0]));
        let y_range = padded_range(self.points().map(|p| p[1]));
        let ((x0, x1), (y0, y1)) = match (x_range, y_range) {
            (Some(x), Some(y)) => (x, y),
            _ => return root.present(),
        };

        let scale = (units_per_inch / 100.0).max(0.01);
        let margin = (units_per_inch * 0.15).round() as u32;

        let mut chart = ChartBuilder::on(root)
            .margin(margin)
            .build_cartesian_2d(x0..x1, y0..y1)?;

        if self.grid {
            let grid_style = RGBColor(220, 220, 220).stroke_width(1);
            for i in 1..GRID_DIVISIONS {
                let t = i as f64 / GRID_DIVISIONS as f64;
                let x = x0 + t * (x1 - x0);
                let y = y0 + t * (y1 - y0);
                chart.draw_series(LineSeries::new(vec![(x, y0), (x, y1)], grid_style))?;
                chart.draw_series(LineSeries::new(vec![(x0, y), (x1, y)], grid_style))?;
            }
        }

        chart
            .plotting_area()
            .draw(&Rectangle::new([(x0, y0), (x1, y1)], BLACK.stroke_width(1)))?;

        for series in &self.series {
            let width = style.line_width.unwrap_or(series.line_width);
            let width = ((width as f64 * scale).round() as u32).max(1);
            let color = RGBColor(series.color[0], series.color[1], series.color[2]);
            chart.draw_series(LineSeries::new(
                series
                    .points
                    .iter()
                    .filter(|p| p[0].is_finite() && p[1].is_finite())
                    .map(|p| (p[0], p[1])),
                color.stroke_width(width),
            ))?;
        }

        root.present()
    }
}

impl Figure for LineFigure {
    fn size_inches(&self) -> [f64; 2] {
        self.size
    }

    fn set_size_inches(&mut self, size: [f64; 2]) {
        self.size = size;
    }

    fn render_raster(&self, dpi: u32, options: &RenderOptions) -> Result<RgbaImage, RenderError> {
        let style = Style::resolve(self, options)?;
        let (width, height) = checked_pixel_dimensions(self.size, dpi)?;
        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(3))
            .ok_or_else(|| RenderError::new("Bitmap buffer size overflows"))?;
        let mut buffer = vec![0u8; len];
        {
            let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
            self.draw(&root, &style, dpi as f64)
                .map_err(|e| RenderError::new(e.to_string()))?;
        }
        let rgb = RgbImage::from_raw(width, height, buffer)
            .ok_or_else(|| RenderError::new("Bitmap buffer does not match figure size"))?;
        Ok(DynamicImage::ImageRgb8(rgb).to_rgba8())
    }

    fn render_vector(&self, options: &RenderOptions) -> Result<Vec<u8>, RenderError> {
        let style = Style::resolve(self, options)?;
        let (width, height) = pixel_dimensions(self.size, SVG_UNITS_PER_INCH);
        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (width, height)).into_drawing_area();
            self.draw(&root, &style, SVG_UNITS_PER_INCH as f64)
                .map_err(|e| RenderError::new(e.to_string()))?;
        }
        Ok(svg.into_bytes())
    }
}
