use crate::catalog::{AppState, DetectionFilter, Filters, PathEntry, SortColumn, find_path, parse_catalog};
use crate::config::{Config, load_config};
use crate::layout::{Layout, compute_layout};
use crate::layout_dump::write_layout_dump;
use crate::render::{render_svg, write_output};
#[cfg(feature = "png")]
use crate::render::write_output_png;
use crate::shell::{container_id, mount_visualization};
use crate::theme::Theme;
use crate::visualization::Visualization;
use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "pathviz",
    version,
    about = "Render IAM attack-path visualizations (graph text or structured JSON) to SVG, PNG or HTML"
)]
pub struct Args {
    /// Input file (graph text, structured JSON, or a paths.json catalog) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout for text formats if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config JSON/JSON5 file
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Path id to render from a catalog; also names the HTML container
    #[arg(short = 'p', long = "path")]
    pub path: Option<String>,

    /// Use the fullscreen container id
    #[arg(long = "fullscreen")]
    pub fullscreen: bool,

    /// Color theme (overrides the config file)
    #[arg(long = "theme", value_enum)]
    pub theme: Option<ThemeName>,

    /// Width
    #[arg(short = 'w', long = "width")]
    pub width: Option<f32>,

    /// Height
    #[arg(short = 'H', long = "height")]
    pub height: Option<f32>,

    /// Page width used for the legend collapse and list view rules
    #[arg(long = "viewportWidth")]
    pub viewport_width: Option<f32>,

    /// List catalog entries instead of rendering
    #[arg(long = "list")]
    pub list: bool,

    #[arg(long = "search", requires = "list")]
    pub search: Option<String>,

    #[arg(long = "category", requires = "list")]
    pub category: Option<String>,

    #[arg(long = "service", requires = "list")]
    pub service: Option<String>,

    /// Detection tool name, or 'none' for uncovered paths
    #[arg(long = "detection", requires = "list")]
    pub detection: Option<String>,

    /// Sort column; repeat to toggle direction
    #[arg(long = "sort", value_enum, requires = "list")]
    pub sort: Vec<SortColumn>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Svg,
    Png,
    Html,
    Layout,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeName {
    Light,
    Dark,
}

enum Input {
    Catalog(Vec<PathEntry>),
    Single(Visualization),
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    let config = apply_overrides(load_config(args.config.as_deref())?, &args);

    let source = read_input(args.input.as_deref())?;
    match classify_input(&source)? {
        Input::Catalog(paths) if args.list => list_paths(paths, &args, &config),
        Input::Catalog(paths) => {
            let id = args
                .path
                .as_deref()
                .context("--path is required when the input is a catalog")?;
            let entry = find_path(&paths, id).with_context(|| format!("unknown path id {id}"))?;
            let visualization = entry
                .attack_visualization
                .as_ref()
                .with_context(|| format!("path {id} has no attack visualization"))?;
            render(visualization, id, &config, &args)
        }
        Input::Single(_) if args.list => bail!("--list requires a paths.json catalog as input"),
        Input::Single(visualization) => {
            let id = args.path.as_deref().unwrap_or("diagram");
            render(&visualization, id, &config, &args)
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn apply_overrides(mut config: Config, args: &Args) -> Config {
    if let Some(theme) = args.theme {
        config = config.with_theme(match theme {
            ThemeName::Light => Theme::light(),
            ThemeName::Dark => Theme::dark(),
        });
    }
    if let Some(width) = args.width {
        config.render.width = width;
    }
    if let Some(height) = args.height {
        config.render.height = height;
    }
    if let Some(viewport_width) = args.viewport_width {
        config.shell.viewport_width = viewport_width;
    }
    config
}

fn render(visualization: &Visualization, path_id: &str, config: &Config, args: &Args) -> Result<()> {
    match args.output_format {
        OutputFormat::Html => {
            let mount =
                mount_visualization(container_id(path_id, args.fullscreen), visualization, config);
            write_output(&mount.to_html(), args.output.as_deref())
        }
        OutputFormat::Layout => {
            write_layout_dump(args.output.as_deref(), &layout_for(visualization, config)?)
        }
        OutputFormat::Svg => {
            let svg = svg_for(visualization, config)?;
            write_output(&svg, args.output.as_deref())
        }
        OutputFormat::Png => {
            let output = ensure_output(&args.output, "png")?;
            let svg = svg_for(visualization, config)?;
            write_png(&svg, &output, config)
        }
    }
}

fn layout_for(visualization: &Visualization, config: &Config) -> Result<Layout> {
    let graph = visualization.to_graph(&config.theme)?;
    Ok(compute_layout(&graph, &config.theme, &config.layout))
}

fn svg_for(visualization: &Visualization, config: &Config) -> Result<String> {
    let layout = layout_for(visualization, config)?;
    Ok(render_svg(
        &layout,
        &config.theme,
        &config.layout,
        &config.render,
    )?)
}

#[cfg(feature = "png")]
fn write_png(svg: &str, output: &Path, config: &Config) -> Result<()> {
    write_output_png(svg, output, &config.render)
}

#[cfg(not(feature = "png"))]
fn write_png(_svg: &str, _output: &Path, _config: &Config) -> Result<()> {
    bail!("PNG output requires the `png` feature")
}

fn list_paths(paths: Vec<PathEntry>, args: &Args, config: &Config) -> Result<()> {
    let total = paths.len();
    let filters = Filters {
        search: args.search.clone().unwrap_or_default(),
        category: args.category.clone(),
        service: args.service.clone(),
        detection: args.detection.as_deref().and_then(DetectionFilter::parse),
    };
    let state = args
        .sort
        .iter()
        .fold(AppState::new(paths, &config.shell).with_filters(filters), |state, column| {
            state.toggle_sort(*column)
        });
    let visible = state.visible();
    let mut listing = String::new();
    for path in &visible {
        listing.push_str(&listing_row(path));
    }
    listing.push_str(&format!("{} of {} paths\n", visible.len(), total));
    write_output(&listing, args.output.as_deref())
}

/// Tab-separated id, name, category, services and required permissions.
fn listing_row(path: &PathEntry) -> String {
    let required = path
        .permissions
        .as_ref()
        .map(|permissions| {
            permissions
                .required()
                .iter()
                .map(|permission| permission.permission.as_str())
                .collect::<Vec<_>>()
                .join(",")
        })
        .unwrap_or_default();
    format!(
        "{}\t{}\t{}\t{}\t{}\n",
        path.id,
        path.name,
        path.category,
        path.services.join(","),
        required
    )
}

/// A JSON array is a catalog; everything else is a single visualization.
fn classify_input(source: &str) -> Result<Input> {
    if source.trim_start().starts_with('[') {
        return Ok(Input::Catalog(parse_catalog(source)?));
    }
    Ok(Input::Single(Visualization::from_source(source)))
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path != Path::new("-") {
            return std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()));
        }
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!("Output path required for {} output", ext))
}
