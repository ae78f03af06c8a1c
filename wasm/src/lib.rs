use attack_path_viz::{RenderOptions, render_html_with_options, render_with_options};
use serde::Deserialize;
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VizRenderOptions {
    theme: Option<String>,
    font_family: Option<String>,
    font_size: Option<f32>,
    width: Option<f32>,
    height: Option<f32>,
    viewport_width: Option<f32>,
}

fn build_render_options(options: VizRenderOptions) -> RenderOptions {
    let mut render_options = if options.theme.as_deref() == Some("light") {
        RenderOptions::light()
    } else {
        RenderOptions::dark()
    };
    let config = &mut render_options.config;

    if let Some(font_family) = options.font_family {
        config.theme.font_family = font_family;
    }
    if let Some(font_size) = options.font_size {
        config.layout.font_size = font_size;
    }
    if let Some(width) = options.width {
        config.render.width = width;
    }
    if let Some(height) = options.height {
        config.render.height = height;
    }
    if let Some(viewport_width) = options.viewport_width {
        config.shell.viewport_width = viewport_width;
    }

    render_options
}

fn parse_options(options_json: Option<String>) -> Result<VizRenderOptions, serde_json::Error> {
    match options_json {
        Some(raw_options) => serde_json::from_str(&raw_options),
        None => Ok(VizRenderOptions::default()),
    }
}

/// Bad options never fail an HTML render; they are reported to the console and
/// replaced by the defaults.
fn options_or_default(options_json: Option<String>) -> VizRenderOptions {
    parse_options(options_json).unwrap_or_else(|error| {
        warn_console(&format!("attack-path-viz: ignoring invalid render options: {error}"));
        VizRenderOptions::default()
    })
}

#[cfg(target_arch = "wasm32")]
fn warn_console(message: &str) {
    web_sys::console::warn_1(&JsValue::from_str(message));
}

#[cfg(not(target_arch = "wasm32"))]
fn warn_console(message: &str) {
    eprintln!("{message}");
}

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
}

/// Standalone SVG for graph text or structured JSON.
#[wasm_bindgen]
pub fn render_attack_svg(input: &str, options_json: Option<String>) -> Result<String, JsValue> {
    let options = parse_options(options_json).map_err(|error| JsValue::from_str(&error.to_string()))?;
    render_with_options(input, build_render_options(options))
        .map_err(|error| JsValue::from_str(&error.to_string()))
}

/// Container markup for a path's diagram. Invalid input produces the inline
/// error fragment instead of throwing; options that fail to parse are logged
/// to the console and the defaults are used.
#[wasm_bindgen]
pub fn render_attack_html(
    path_id: &str,
    input: &str,
    fullscreen: bool,
    options_json: Option<String>,
) -> String {
    let options = options_or_default(options_json);
    render_html_with_options(path_id, input, fullscreen, build_render_options(options))
}
