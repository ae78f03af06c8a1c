use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Horizontal distance between node centers on one level.
    pub node_spacing: f32,
    /// Vertical distance between levels.
    pub level_separation: f32,
    pub node_min_width: f32,
    pub node_max_width: f32,
    pub node_margin: f32,
    pub font_size: f32,
    pub edge_font_size: f32,
    pub label_line_height: f32,
    pub fit_padding: f32,
    /// Measure labels with the built-in width table instead of system fonts.
    pub fast_text_metrics: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_spacing: 250.0,
            level_separation: 120.0,
            node_min_width: 120.0,
            node_max_width: 200.0,
            node_margin: 10.0,
            font_size: 14.0,
            edge_font_size: 12.0,
            label_line_height: 1.4,
            fit_padding: 40.0,
            fast_text_metrics: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
    pub background: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            background: Theme::default().background,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellConfig {
    pub zoom_in_step: f32,
    pub zoom_out_step: f32,
    /// Page widths at or below this start with a collapsed legend.
    pub narrow_viewport_width: f32,
    /// Width of the page hosting the diagram.
    pub viewport_width: f32,
    pub tooltip_width: f32,
    pub tooltip_inset: f32,
    pub edge_hit_tolerance: f32,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            zoom_in_step: 1.2,
            zoom_out_step: 0.8,
            narrow_viewport_width: 768.0,
            viewport_width: 1280.0,
            tooltip_width: 320.0,
            tooltip_inset: 10.0,
            edge_hit_tolerance: 6.0,
        }
    }
}

impl ShellConfig {
    pub fn is_narrow(&self) -> bool {
        self.viewport_width <= self.narrow_viewport_width
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
    pub shell: ShellConfig,
}

impl Config {
    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.render.background = theme.background.clone();
        self.theme = theme;
        self
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    layout: Option<LayoutConfigFile>,
    render: Option<RenderConfigFile>,
    shell: Option<ShellConfigFile>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    node_text_color: Option<String>,
    edge_text_color: Option<String>,
    edge_label_background: Option<String>,
    line_color: Option<String>,
    conditional_line_color: Option<String>,
    highlight_color: Option<String>,
    background: Option<String>,
    principal_color: Option<String>,
    resource_color: Option<String>,
    payload_color: Option<String>,
    outcome_color: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutConfigFile {
    node_spacing: Option<f32>,
    level_separation: Option<f32>,
    node_min_width: Option<f32>,
    node_max_width: Option<f32>,
    node_margin: Option<f32>,
    font_size: Option<f32>,
    edge_font_size: Option<f32>,
    label_line_height: Option<f32>,
    fit_padding: Option<f32>,
    fast_text_metrics: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenderConfigFile {
    width: Option<f32>,
    height: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShellConfigFile {
    zoom_in_step: Option<f32>,
    zoom_out_step: Option<f32>,
    narrow_viewport_width: Option<f32>,
    viewport_width: Option<f32>,
    tooltip_width: Option<f32>,
    tooltip_inset: Option<f32>,
    edge_hit_tolerance: Option<f32>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parses a config document. Strict JSON first, then JSON5 for hand-edited files.
pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let parsed: ConfigFile = match serde_json::from_str(contents) {
        Ok(parsed) => parsed,
        Err(json_err) => json5::from_str(contents).map_err(|json5_err| {
            anyhow::anyhow!("invalid config: {json_err} (json5: {json5_err})")
        })?,
    };

    let mut config = Config::default();
    if let Some(name) = parsed.theme.as_deref() {
        let theme =
            Theme::by_name(name).ok_or_else(|| anyhow::anyhow!("unknown theme `{name}`"))?;
        config = config.with_theme(theme);
    }

    if let Some(vars) = parsed.theme_variables {
        let theme = &mut config.theme;
        if let Some(v) = vars.font_family {
            theme.font_family = v;
        }
        if let Some(v) = vars.node_text_color {
            theme.node_text_color = v;
        }
        if let Some(v) = vars.edge_text_color {
            theme.edge_text_color = v;
        }
        if let Some(v) = vars.edge_label_background {
            theme.edge_label_background = v;
        }
        if let Some(v) = vars.line_color {
            theme.line_color = v;
        }
        if let Some(v) = vars.conditional_line_color {
            theme.conditional_line_color = v;
        }
        if let Some(v) = vars.highlight_color {
            theme.highlight_color = v;
        }
        if let Some(v) = vars.background {
            theme.background = v;
        }
        if let Some(v) = vars.principal_color {
            theme.principal_color = v;
        }
        if let Some(v) = vars.resource_color {
            theme.resource_color = v;
        }
        if let Some(v) = vars.payload_color {
            theme.payload_color = v;
        }
        if let Some(v) = vars.outcome_color {
            theme.outcome_color = v;
        }
    }

    if let Some(layout) = parsed.layout {
        if let Some(v) = layout.node_spacing {
            config.layout.node_spacing = v;
        }
        if let Some(v) = layout.level_separation {
            config.layout.level_separation = v;
        }
        if let Some(v) = layout.node_min_width {
            config.layout.node_min_width = v;
        }
        if let Some(v) = layout.node_max_width {
            config.layout.node_max_width = v;
        }
        if let Some(v) = layout.node_margin {
            config.layout.node_margin = v;
        }
        if let Some(v) = layout.font_size {
            config.layout.font_size = v;
        }
        if let Some(v) = layout.edge_font_size {
            config.layout.edge_font_size = v;
        }
        if let Some(v) = layout.label_line_height {
            config.layout.label_line_height = v;
        }
        if let Some(v) = layout.fit_padding {
            config.layout.fit_padding = v;
        }
        if let Some(v) = layout.fast_text_metrics {
            config.layout.fast_text_metrics = v;
        }
    }
    if config.layout.node_max_width < config.layout.node_min_width {
        anyhow::bail!(
            "layout.nodeMaxWidth ({}) is below layout.nodeMinWidth ({})",
            config.layout.node_max_width,
            config.layout.node_min_width
        );
    }

    if let Some(render) = parsed.render {
        if let Some(v) = render.width {
            config.render.width = v;
        }
        if let Some(v) = render.height {
            config.render.height = v;
        }
    }

    if let Some(shell) = parsed.shell {
        if let Some(v) = shell.zoom_in_step {
            config.shell.zoom_in_step = v;
        }
        if let Some(v) = shell.zoom_out_step {
            config.shell.zoom_out_step = v;
        }
        if let Some(v) = shell.narrow_viewport_width {
            config.shell.narrow_viewport_width = v;
        }
        if let Some(v) = shell.viewport_width {
            config.shell.viewport_width = v;
        }
        if let Some(v) = shell.tooltip_width {
            config.shell.tooltip_width = v;
        }
        if let Some(v) = shell.tooltip_inset {
            config.shell.tooltip_inset = v;
        }
        if let Some(v) = shell.edge_hit_tolerance {
            config.shell.edge_hit_tolerance = v;
        }
    }

    config.render.background = config.theme.background.clone();

    Ok(config)
}
