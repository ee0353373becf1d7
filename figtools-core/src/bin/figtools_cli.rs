//! figtools CLI - Export figures from the shell
//!
//! Commands: render, hash, grid
//! Outputs JSON (or HTML for grid) to stdout, logs to stderr
//! Returns 2 on configuration errors, 1 on any other failure

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use figtools_core::{
    img_grid, pixel_hash, Backend, ErrorCategory, ExportConfig, ExportError, ExportOutput,
    ExportRequest, FigureExporter, LineFigure, PngCompression, RenderSettings, Size,
    ENGINE_VERSION,
};

#[derive(Parser)]
#[command(name = "figtools-cli")]
#[command(about = "figtools CLI - render, save and fingerprint figures")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON config file (img_dir, size_small, size_large, dpi)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a figure description to PNG (and SVG)
    Render {
        /// JSON file describing a LineFigure
        #[arg(short, long)]
        figure: PathBuf,

        /// Output file stem
        #[arg(short, long)]
        name: String,

        /// Size preset (small, large); omit with --keep-size
        #[arg(short, long, default_value = "small")]
        size: String,

        /// Keep the figure's own size
        #[arg(long, conflicts_with = "size")]
        keep_size: bool,

        #[arg(long)]
        dpi: Option<u32>,

        /// Output directory, overrides the config file
        #[arg(long)]
        img_dir: Option<PathBuf>,

        /// Write the PNG only
        #[arg(long)]
        raster_only: bool,

        #[arg(long, value_parser = parse_compression, default_value = "default")]
        compression: PngCompression,
    },

    /// Print the pixel hash of a PNG
    Hash {
        path: PathBuf,
    },

    /// Print an HTML table of PNGs with hash-stamped links
    Grid {
        #[arg(long, default_value_t = 3)]
        columns: usize,

        /// Cell image width in px
        #[arg(long, default_value_t = 300)]
        width: u32,

        paths: Vec<PathBuf>,
    },
}

fn parse_compression(s: &str) -> Result<PngCompression, String> {
    serde_json::from_value(serde_json::Value::String(s.to_ascii_lowercase()))
        .map_err(|_| format!("unknown compression: {} (default, fast, best)", s))
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match ExportConfig::load(path) {
            Ok(c) => c,
            Err(e) => return fail(&e),
        },
        None => ExportConfig::default(),
    };

    let result = match cli.command {
        Commands::Render { figure, name, size, keep_size, dpi, img_dir, raster_only, compression } => {
            render(config, &figure, name, &size, keep_size, dpi, img_dir, raster_only, compression)
        }
        Commands::Hash { path } => pixel_hash(&path).map(|hash| {
            serde_json::json!({ "path": path, "hash": hash }).to_string()
        }),
        Commands::Grid { columns, width, paths } => paths
            .iter()
            .map(|p| ExportOutput::from_png(p))
            .collect::<Result<Vec<_>, _>>()
            .and_then(|outputs| img_grid(&outputs, columns, width)),
    };

    match result {
        Ok(text) => {
            println!("{}", text);
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

#[allow(clippy::too_many_arguments)]
fn render(
    config: ExportConfig,
    figure_path: &Path,
    name: String,
    size: &str,
    keep_size: bool,
    dpi: Option<u32>,
    img_dir: Option<PathBuf>,
    raster_only: bool,
    compression: PngCompression,
) -> Result<String, ExportError> {
    // Resolve the preset before reading anything else
    let resize = if keep_size { None } else { Some(size.parse::<Size>()?) };

    let content = fs::read_to_string(figure_path).map_err(|source| ExportError::Io {
        path: figure_path.to_path_buf(),
        source,
    })?;
    let mut figure: LineFigure = serde_json::from_str(&content)?;

    let config = match img_dir {
        Some(dir) => config.with_img_dir(dir),
        None => config,
    };
    let backend = if raster_only { Backend::Raster } else { Backend::Vector };
    let exporter = FigureExporter::with_render_settings(config, RenderSettings::new(backend));

    let mut request = ExportRequest::new(name).resize(resize).compression(compression);
    if let Some(dpi) = dpi {
        request = request.dpi(dpi);
    }

    let output = exporter.export(&mut figure, &request)?;
    let json = serde_json::json!({
        "success": true,
        "engine_version": ENGINE_VERSION,
        "href": output.link.href(),
        "output": output,
    });
    Ok(serde_json::to_string_pretty(&json)?)
}

fn fail(e: &ExportError) -> ExitCode {
    tracing::error!(error = %e, "figtools command failed");
    let category = e.category();
    let output = serde_json::json!({
        "success": false,
        "category": category,
        "error": e.to_string(),
    });
    println!("{}", output);
    match category {
        ErrorCategory::Configuration => ExitCode::from(2),
        _ => ExitCode::FAILURE,
    }
}
