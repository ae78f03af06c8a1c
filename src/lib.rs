pub mod adapter;
pub mod catalog;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod details;
pub mod error;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod markdown;
pub mod parser;
pub mod render;
pub mod shell;
pub mod text_metrics;
pub mod theme;
pub mod visualization;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::Config;
pub use error::{VizError, VizResult};
pub use shell::{Diagram, Mount, ShellEvent, render_attack_visualization};
pub use visualization::Visualization;

use layout::compute_layout;
use render::render_svg;
use theme::Theme;

/// Options for the one-call entry points used by embedders.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub config: Config,
}

impl RenderOptions {
    pub fn dark() -> Self {
        Self {
            config: Config::default().with_theme(Theme::dark()),
        }
    }

    pub fn light() -> Self {
        Self {
            config: Config::default().with_theme(Theme::light()),
        }
    }
}

/// Renders legacy graph text or structured JSON to a standalone SVG.
pub fn render_with_options(input: &str, options: RenderOptions) -> VizResult<String> {
    let config = options.config;
    let graph = Visualization::from_source(input).to_graph(&config.theme)?;
    let layout = compute_layout(&graph, &config.theme, &config.layout);
    render_svg(&layout, &config.theme, &config.layout, &config.render)
}

/// Renders the mountable HTML fragment for a path. Never fails: invalid input
/// yields the inline error fragment.
pub fn render_html_with_options(
    path_id: &str,
    input: &str,
    fullscreen: bool,
    options: RenderOptions,
) -> String {
    shell::mount_visualization(
        shell::container_id(path_id, fullscreen),
        &Visualization::from_source(input),
        &options.config,
    )
    .to_html()
}
