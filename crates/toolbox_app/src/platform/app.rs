use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::Utc;
use clap::Parser;
use serde::Serialize;
use toolbox_core::{
    Msg, OutputFormat, Phase, ResizeTarget, ToolKind, ToolSpec, ToolViewModel, TransformParams,
    DEFAULT_QUALITY,
};
use toolbox_engine::{ArtifactWriter, Collision, Dispatcher};
use toolbox_logging::{toolbox_info, toolbox_warn};

use super::blobs::BlobStore;
use super::logging::{self, LogDestination};
use super::registry;
use super::session::SessionDriver;

/// Convert, resize, compress or rasterize one image file.
#[derive(Debug, Clone, Parser)]
#[command(name = "toolbox", version, about)]
pub struct Cli {
    /// File to transform.
    pub input: Option<PathBuf>,
    /// Tool id from the registry.
    #[arg(long, default_value = "image-converter")]
    pub tool: String,
    /// Target format as a file extension (png, jpg, webp, ...).
    #[arg(long)]
    pub format: Option<String>,
    /// Lossy quality between 0 and 1.
    #[arg(long, default_value_t = DEFAULT_QUALITY)]
    pub quality: f32,
    #[arg(long)]
    pub width: Option<u32>,
    #[arg(long)]
    pub height: Option<u32>,
    /// Scale both edges by this percentage.
    #[arg(long)]
    pub percent: Option<f64>,
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,
    /// Save as `name (1).ext` instead of replacing an existing file.
    #[arg(long)]
    pub keep_existing: bool,
    /// RON tool registry; the built-in tools are used when absent.
    #[arg(long)]
    pub registry: Option<PathBuf>,
    /// Print the tool registry and exit.
    #[arg(long)]
    pub list_tools: bool,
    #[arg(long, value_enum, default_value_t = LogDestination::Terminal)]
    pub log: LogDestination,
    #[arg(short, long)]
    pub verbose: bool,
    /// Write a JSON run report to this path.
    #[arg(long)]
    pub json: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct RunReport<'a> {
    tool: &'a str,
    input: String,
    output: String,
    mime_type: String,
    original_size: Option<u64>,
    converted_size: Option<u64>,
    savings_percent: Option<f64>,
    width: Option<u32>,
    height: Option<u32>,
    finished_at: String,
}

pub fn run_app(cli: Cli) -> anyhow::Result<()> {
    logging::initialize(cli.log, cli.verbose);

    let registry = registry::load_registry(cli.registry.as_deref())?;
    if cli.list_tools {
        println!("{}", registry::render_registry(&registry)?);
        return Ok(());
    }

    let input = cli
        .input
        .as_deref()
        .context("an input file is required unless --list-tools is given")?;
    let tool = registry
        .get(&cli.tool)
        .with_context(|| format!("unknown tool {:?}", cli.tool))?
        .clone();
    let name = input
        .file_name()
        .and_then(OsStr::to_str)
        .unwrap_or("input")
        .to_string();
    if !tool.accepts(&name) {
        toolbox_warn!("{} is not among the formats {} lists", name, tool.tool_id);
    }
    let bytes = fs::read(input).with_context(|| format!("reading {}", input.display()))?;

    let blobs = Arc::new(BlobStore::new());
    let dispatcher = Arc::new(Dispatcher::default());
    let mut driver = SessionDriver::new(tool.clone(), dispatcher, Arc::clone(&blobs))
        .context("starting the dispatch runtime")?;

    driver.select(&name, bytes);
    let view = driver.view();
    if let Some(error) = view.error {
        bail!("{error}");
    }

    let params = build_params(&tool, &cli, view.preview_size)?;
    driver.dispatch(Msg::StartClicked(params));
    driver.settle(None);

    let view = driver.view();
    if view.phase != Phase::Complete {
        bail!(
            "{}",
            view.error
                .unwrap_or_else(|| "transform did not complete".to_string())
        );
    }
    let bytes = driver.result_bytes().context("result blob is missing")?;
    let file_name = view
        .download_name
        .clone()
        .context("result has no file name")?;
    let collision = if cli.keep_existing {
        Collision::KeepBoth
    } else {
        Collision::Replace
    };
    let saved = ArtifactWriter::new(cli.output_dir.clone())
        .with_collision(collision)
        .save(&file_name, &bytes)?;
    println!("{}", summary_line(&view, &saved.path));

    if let Some(report_path) = &cli.json {
        write_report(report_path, &tool, input, &saved.path, &view)?;
    }

    driver.dispatch(Msg::ResetClicked);
    drop(driver);
    toolbox_info!(
        "Object URLs created {} revoked {}",
        blobs.created(),
        blobs.revoked()
    );
    Ok(())
}

pub(crate) fn build_params(
    tool: &ToolSpec,
    cli: &Cli,
    source_size: Option<(u32, u32)>,
) -> anyhow::Result<TransformParams> {
    let format = cli.format.as_deref().map(parse_format).transpose()?;
    let quality = cli.quality;

    let params = match tool.kind {
        ToolKind::ImageConverter => TransformParams::Convert {
            target: format.context("--format is required for conversion")?,
            quality,
        },
        ToolKind::ImageResizer => {
            let (width, height) = source_size.context("source size is unknown")?;
            let (width, height) = resize_target(cli)?
                .resolve(width, height)
                .context("resize target must be positive")?;
            TransformParams::Resize {
                width,
                height,
                format,
                quality,
            }
        }
        ToolKind::ImageCompressor => TransformParams::Compress { quality },
        ToolKind::SvgRasterizer => TransformParams::Rasterize {
            target: format.unwrap_or(OutputFormat::Png),
            width: cli.width,
            height: cli.height,
            quality,
        },
    };
    Ok(params)
}

fn parse_format(value: &str) -> anyhow::Result<OutputFormat> {
    OutputFormat::from_extension(value)
        .or_else(|| OutputFormat::from_mime(value))
        .with_context(|| format!("unknown output format {value:?}"))
}

fn resize_target(cli: &Cli) -> anyhow::Result<ResizeTarget> {
    let target = match (cli.width, cli.height, cli.percent) {
        (Some(width), Some(height), None) => ResizeTarget::Exact { width, height },
        (Some(width), None, None) => ResizeTarget::Width(width),
        (None, Some(height), None) => ResizeTarget::Height(height),
        (None, None, Some(percent)) => ResizeTarget::Percent(percent),
        (None, None, None) => bail!("resizing needs --width, --height or --percent"),
        _ => bail!("--percent cannot be combined with --width or --height"),
    };
    Ok(target)
}

fn summary_line(view: &ToolViewModel, written: &Path) -> String {
    let mut line = format!("Wrote {}", written.display());
    if let Some((width, height)) = view.output_size {
        line.push_str(&format!(" ({width}x{height})"));
    }
    if let Some(savings) = view.savings_percent() {
        line.push_str(&format!(", {savings:.1}% smaller"));
    }
    line
}

fn write_report(
    path: &Path,
    tool: &ToolSpec,
    input: &Path,
    written: &Path,
    view: &ToolViewModel,
) -> anyhow::Result<()> {
    let report = RunReport {
        tool: &tool.tool_id,
        input: input.display().to_string(),
        output: written.display().to_string(),
        mime_type: view.mime_type.clone().unwrap_or_default(),
        original_size: view.original_size,
        converted_size: view.converted_size,
        savings_percent: view.savings_percent(),
        width: view.output_size.map(|(width, _)| width),
        height: view.output_size.map(|(_, height)| height),
        finished_at: Utc::now().to_rfc3339(),
    };
    let content = serde_json::to_string_pretty(&report)?;
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let file_name = path
        .file_name()
        .and_then(OsStr::to_str)
        .context("report path has no file name")?;
    ArtifactWriter::new(dir.to_path_buf()).save(file_name, content.as_bytes())?;
    Ok(())
}
