use crate::config::{LayoutConfig, RenderConfig};
use crate::error::VizResult;
use crate::layout::{Bounds, EdgeLayout, Layout, NodeLayout, TextBlock};
use crate::theme::Theme;
use anyhow::Result;
use std::path::Path;

const EDGE_LABEL_PAD_X: f32 = 6.0;
const EDGE_LABEL_PAD_Y: f32 = 3.0;
const TOOLTIP_LINE_CHARS: usize = 48;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl ViewBox {
    pub fn from_bounds(bounds: &Bounds) -> Self {
        Self {
            x: bounds.min_x,
            y: bounds.min_y,
            width: bounds.width().max(1.0),
            height: bounds.height().max(1.0),
        }
    }
}

/// Header and markdown body of a detail tooltip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tooltip {
    pub title: String,
    pub description: String,
}

/// Drawing capability the diagram is rendered through. Graph parsing and
/// layout never depend on a concrete surface.
pub trait View {
    type Output;

    fn begin(&mut self, view_box: ViewBox, theme: &Theme) -> VizResult<()>;
    fn edge(&mut self, edge: &EdgeLayout, theme: &Theme) -> VizResult<()>;
    fn node(&mut self, node: &NodeLayout, theme: &Theme) -> VizResult<()>;
    fn tooltip(&mut self, tooltip: &Tooltip, theme: &Theme) -> VizResult<()>;
    fn finish(self) -> VizResult<Self::Output>;
}

/// Drives a view: edges first so node boxes sit on top, then the tooltip.
pub fn draw<V: View>(
    layout: &Layout,
    view_box: ViewBox,
    tooltip: Option<&Tooltip>,
    theme: &Theme,
    mut view: V,
) -> VizResult<V::Output> {
    view.begin(view_box, theme)?;
    for edge in &layout.edges {
        view.edge(edge, theme)?;
    }
    for node in &layout.nodes {
        view.node(node, theme)?;
    }
    if let Some(tooltip) = tooltip {
        view.tooltip(tooltip, theme)?;
    }
    view.finish()
}

/// Standalone SVG document.
pub struct SvgView {
    svg: String,
    font_size: f32,
    edge_font_size: f32,
    line_height: f32,
    width: f32,
    height: f32,
    background: String,
    view_box: Option<ViewBox>,
    standalone: bool,
}

impl SvgView {
    pub fn new(layout_config: &LayoutConfig, render_config: &RenderConfig) -> Self {
        Self {
            svg: String::new(),
            font_size: layout_config.font_size,
            edge_font_size: layout_config.edge_font_size,
            line_height: layout_config.label_line_height,
            width: render_config.width,
            height: render_config.height,
            background: render_config.background.clone(),
            view_box: None,
            standalone: true,
        }
    }

    /// Inline variant for embedding in HTML: no XML namespace, sized by CSS.
    pub fn inline(layout_config: &LayoutConfig, render_config: &RenderConfig) -> Self {
        Self {
            standalone: false,
            ..Self::new(layout_config, render_config)
        }
    }
}

impl View for SvgView {
    type Output = String;

    fn begin(&mut self, view_box: ViewBox, theme: &Theme) -> VizResult<()> {
        let ViewBox {
            x,
            y,
            width,
            height,
        } = view_box;
        if self.standalone {
            self.svg.push_str(&format!(
                "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{}\" height=\"{}\" viewBox=\"{x:.2} {y:.2} {width:.2} {height:.2}\">",
                self.width, self.height
            ));
        } else {
            self.svg.push_str(&format!(
                "<svg class=\"viz-canvas\" width=\"100%\" height=\"100%\" viewBox=\"{x:.2} {y:.2} {width:.2} {height:.2}\" preserveAspectRatio=\"xMidYMid meet\">",
            ));
        }
        self.svg.push_str(&format!(
            "<rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{width:.2}\" height=\"{height:.2}\" fill=\"{}\"/>",
            self.background
        ));
        self.svg.push_str("<defs>");
        for (id, color) in [
            ("arrow", theme.line_color.as_str()),
            ("arrow-conditional", theme.conditional_line_color.as_str()),
        ] {
            self.svg.push_str(&format!(
                "<marker id=\"{id}\" viewBox=\"0 0 10 10\" refX=\"10\" refY=\"5\" markerWidth=\"7\" markerHeight=\"7\" orient=\"auto-start-reverse\"><path d=\"M 0 0 L 10 5 L 0 10 z\" fill=\"{color}\"/></marker>",
            ));
        }
        self.svg.push_str("</defs>");
        self.view_box = Some(view_box);
        Ok(())
    }

    fn edge(&mut self, edge: &EdgeLayout, theme: &Theme) -> VizResult<()> {
        let [p0, p1, p2, p3] = edge.curve;
        let (color, dash, marker) = if edge.is_conditional() {
            (
                theme.conditional_line_color.as_str(),
                format!(" stroke-dasharray=\"{}\"", theme.conditional_dasharray),
                "arrow-conditional",
            )
        } else {
            (theme.line_color.as_str(), String::new(), "arrow")
        };
        self.svg.push_str(&format!(
            "<path class=\"viz-edge\" data-edge-id=\"{}\" d=\"M {:.2} {:.2} C {:.2} {:.2}, {:.2} {:.2}, {:.2} {:.2}\" fill=\"none\" stroke=\"{color}\" stroke-width=\"2\"{dash} marker-end=\"url(#{marker})\"/>",
            escape_xml(&edge.id),
            p0.0,
            p0.1,
            p1.0,
            p1.1,
            p2.0,
            p2.1,
            p3.0,
            p3.1,
        ));

        let Some(label) = edge.label.as_ref() else {
            return Ok(());
        };
        let (x, y) = edge.label_anchor;
        let rect_w = label.width + 2.0 * EDGE_LABEL_PAD_X;
        let rect_h = label.height + 2.0 * EDGE_LABEL_PAD_Y;
        self.svg.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{rect_w:.2}\" height=\"{rect_h:.2}\" rx=\"3\" ry=\"3\" fill=\"{}\"/>",
            x - rect_w / 2.0,
            y - rect_h / 2.0,
            theme.edge_label_background
        ));
        let text = text_block_svg(
            x,
            y,
            label,
            self.edge_font_size,
            self.line_height,
            &theme.font_family,
            &theme.edge_text_color,
        );
        self.svg.push_str(&text);
        Ok(())
    }

    fn node(&mut self, node: &NodeLayout, theme: &Theme) -> VizResult<()> {
        self.svg.push_str(&format!(
            "<g class=\"viz-node viz-node-{}\" data-node-id=\"{}\">",
            node.kind.as_str(),
            escape_xml(&node.id)
        ));
        self.svg.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"4\" ry=\"4\" fill=\"{}\" stroke=\"{}\" stroke-width=\"2\"/>",
            node.left(),
            node.top(),
            node.width,
            node.height,
            node.fill,
            node.border
        ));
        let text = text_block_svg(
            node.x,
            node.y,
            &node.label,
            self.font_size,
            self.line_height,
            &theme.font_family,
            &theme.node_text_color,
        );
        self.svg.push_str(&text);
        self.svg.push_str("</g>");
        Ok(())
    }

    fn tooltip(&mut self, tooltip: &Tooltip, theme: &Theme) -> VizResult<()> {
        let view_box = self.view_box.unwrap_or(ViewBox {
            x: 0.0,
            y: 0.0,
            width: self.width,
            height: self.height,
        });
        let lines = wrap_plain(&tooltip.description, TOOLTIP_LINE_CHARS);
        let line_h = self.edge_font_size * self.line_height;
        let height = (lines.len() as f32 + 1.0) * line_h + 16.0;
        let width = (TOOLTIP_LINE_CHARS as f32 * self.edge_font_size * 0.55).min(view_box.width);
        let x = view_box.x + 10.0;
        let y = view_box.y + view_box.height - height - 10.0;
        self.svg.push_str(&format!(
            "<g class=\"viz-tooltip\"><rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{width:.2}\" height=\"{height:.2}\" rx=\"6\" ry=\"6\" fill=\"{}\" stroke=\"{}\"/>",
            theme.tooltip_background, theme.highlight_color
        ));
        self.svg.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" font-family=\"{}\" font-size=\"{}\" font-weight=\"bold\" fill=\"{}\">{}</text>",
            x + 8.0,
            y + 8.0 + self.edge_font_size,
            theme.font_family,
            self.edge_font_size,
            theme.tooltip_text_color,
            escape_xml(&tooltip.title)
        ));
        for (idx, line) in lines.iter().enumerate() {
            self.svg.push_str(&format!(
                "<text x=\"{:.2}\" y=\"{:.2}\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
                x + 8.0,
                y + 8.0 + self.edge_font_size + (idx as f32 + 1.0) * line_h,
                theme.font_family,
                self.edge_font_size,
                theme.tooltip_text_color,
                escape_xml(line)
            ));
        }
        self.svg.push_str("</g>");
        Ok(())
    }

    fn finish(mut self) -> VizResult<String> {
        self.svg.push_str("</svg>");
        Ok(self.svg)
    }
}

/// Renders the whole diagram, fit to its contents, as a standalone SVG.
pub fn render_svg(
    layout: &Layout,
    theme: &Theme,
    layout_config: &LayoutConfig,
    render_config: &RenderConfig,
) -> VizResult<String> {
    let view_box = ViewBox::from_bounds(&layout.bounds.padded(layout_config.fit_padding));
    draw(
        layout,
        view_box,
        None,
        theme,
        SvgView::new(layout_config, render_config),
    )
}

fn text_block_svg(
    x: f32,
    y: f32,
    label: &TextBlock,
    font_size: f32,
    line_height: f32,
    font_family: &str,
    fill: &str,
) -> String {
    let step = font_size * line_height;
    // Baseline of the first line so that the block is vertically centered on y.
    let start_y = y - label.height / 2.0 + step / 2.0 + font_size * 0.35;
    let mut text = format!(
        "<text x=\"{x:.2}\" y=\"{start_y:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{font_size}\" fill=\"{fill}\">",
        escape_xml(font_family)
    );
    for (idx, line) in label.lines.iter().enumerate() {
        let dy = if idx == 0 { 0.0 } else { step };
        text.push_str(&format!(
            "<tspan x=\"{x:.2}\" dy=\"{dy:.2}\">{}</tspan>",
            escape_xml(line)
        ));
    }
    text.push_str("</text>");
    text
}

fn wrap_plain(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for raw in text.lines() {
        let mut current = String::new();
        for word in raw.split_whitespace() {
            if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > max_chars {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        lines.push(current);
    }
    lines
}

/// Writes rendered text (SVG, HTML) to `output`, or stdout when none is given.
pub fn write_output(text: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, text)?;
        }
        None => {
            print!("{}", text);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = "Arial".to_string();
    opt.fontdb_mut().load_system_fonts();
    opt.default_size = usvg::Size::from_wh(render_cfg.width, render_cfg.height)
        .ok_or_else(|| anyhow::anyhow!("invalid render size {}x{}", render_cfg.width, render_cfg.height))?;

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

pub(crate) fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::layout::compute_layout;
    use crate::visualization::Visualization;
    use serde_json::json;

    fn layout_for(value: serde_json::Value) -> (Layout, Config) {
        let config = Config::default();
        let graph = Visualization::from_value(&value)
            .to_graph(&config.theme)
            .unwrap();
        (compute_layout(&graph, &config.theme, &config.layout), config)
    }

    #[derive(Default)]
    struct RecordingView {
        calls: Vec<String>,
    }

    impl View for RecordingView {
        type Output = Vec<String>;

        fn begin(&mut self, _view_box: ViewBox, _theme: &Theme) -> VizResult<()> {
            self.calls.push("begin".to_string());
            Ok(())
        }
        fn edge(&mut self, edge: &EdgeLayout, _theme: &Theme) -> VizResult<()> {
            self.calls.push(format!("edge:{}", edge.id));
            Ok(())
        }
        fn node(&mut self, node: &NodeLayout, _theme: &Theme) -> VizResult<()> {
            self.calls.push(format!("node:{}", node.id));
            Ok(())
        }
        fn tooltip(&mut self, tooltip: &Tooltip, _theme: &Theme) -> VizResult<()> {
            self.calls.push(format!("tooltip:{}", tooltip.title));
            Ok(())
        }
        fn finish(self) -> VizResult<Vec<String>> {
            Ok(self.calls)
        }
    }

    #[test]
    fn draw_visits_edges_before_nodes() {
        let (layout, config) = layout_for(json!("A[User] --> B[Role]"));
        let tooltip = Tooltip {
            title: "User".to_string(),
            description: "the caller".to_string(),
        };
        let calls = draw(
            &layout,
            ViewBox::from_bounds(&layout.bounds),
            Some(&tooltip),
            &config.theme,
            RecordingView::default(),
        )
        .unwrap();
        assert_eq!(
            calls,
            vec!["begin", "edge:edge-0", "node:A", "node:B", "tooltip:User"]
        );
    }

    #[test]
    fn render_svg_basic() {
        let (layout, config) = layout_for(json!("graph LR\nA[Alpha] -->|go| B[Beta]"));
        let svg = render_svg(&layout, &config.theme, &config.layout, &config.render).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("Alpha"));
        assert!(svg.contains(">go<"));
    }

    #[test]
    fn conditional_edges_are_dashed_and_unlabeled() {
        let (layout, config) = layout_for(json!({
            "nodes": [
                {"id": "A", "label": "User", "type": "principal"},
                {"id": "B", "label": "Admin", "type": "outcome"}
            ],
            "edges": [{"from": "A", "to": "B", "label": "maybe", "condition": "MFA disabled"}]
        }));
        let svg = render_svg(&layout, &config.theme, &config.layout, &config.render).unwrap();
        assert!(svg.contains("stroke-dasharray=\"5,5\""));
        assert!(svg.contains("url(#arrow-conditional)"));
        assert!(!svg.contains("maybe"));
    }

    #[test]
    fn labels_are_escaped() {
        let (layout, config) = layout_for(json!("A[a & b] --> B[<b>]"));
        let svg = render_svg(&layout, &config.theme, &config.layout, &config.render).unwrap();
        assert!(svg.contains("a &amp; b"));
        assert!(svg.contains("&lt;b&gt;"));
    }
}
