//! Interaction shell around a laid-out diagram: zoom and pan, click-to-inspect
//! tooltips, the legend, and the mount point that contains render failures.

use crate::config::Config;
use crate::error::{VizError, VizResult};
use crate::layout::{Bounds, EdgeLayout, Layout, NodeLayout, compute_layout, move_node};
use crate::markdown::{escape_html, render_markdown};
use crate::render::{SvgView, Tooltip, View, ViewBox, draw, escape_xml};
use crate::theme::{OUTCOME_DEAD_END_COLOR, OUTCOME_PARTIAL_COLOR, Theme};
use crate::visualization::Visualization;
use serde_json::Value;

pub const ERROR_MESSAGE: &str = "Error rendering visualization";

/// Mount-point id for a path's diagram. The fullscreen copy is prefixed so both
/// can exist on one page.
pub fn container_id(path_id: &str, fullscreen: bool) -> String {
    if fullscreen {
        format!("attack-viz-fullscreen-{path_id}")
    } else {
        format!("attack-viz-{path_id}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Container size in screen pixels.
    pub width: f32,
    pub height: f32,
    pub scale: f32,
    /// World point shown at the middle of the container.
    pub center: (f32, f32),
    fit_scale: f32,
    fit_center: (f32, f32),
}

impl Viewport {
    /// A view that shows all of `bounds` inside a `width` x `height` container.
    pub fn fit(bounds: &Bounds, width: f32, height: f32) -> Self {
        let width = width.max(1.0);
        let height = height.max(1.0);
        let scale = (width / bounds.width().max(1.0)).min(height / bounds.height().max(1.0));
        let center = bounds.center();
        Self {
            width,
            height,
            scale,
            center,
            fit_scale: scale,
            fit_center: center,
        }
    }

    pub fn zoom_by(&mut self, factor: f32) {
        if factor.is_finite() && factor > 0.0 {
            self.scale *= factor;
        }
    }

    pub fn reset(&mut self) {
        self.scale = self.fit_scale;
        self.center = self.fit_center;
    }

    /// Drags the view by a screen-space delta.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        self.center.0 -= dx / self.scale;
        self.center.1 -= dy / self.scale;
    }

    pub fn to_world(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.center.0 + (x - self.width / 2.0) / self.scale,
            self.center.1 + (y - self.height / 2.0) / self.scale,
        )
    }

    pub fn view_box(&self) -> ViewBox {
        let width = self.width / self.scale;
        let height = self.height / self.scale;
        ViewBox {
            x: self.center.0 - width / 2.0,
            y: self.center.1 - height / 2.0,
            width,
            height,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShellEvent {
    ZoomIn,
    ZoomOut,
    ResetZoom,
    /// Mouse wheel. Ignored so the page keeps scrolling.
    Wheel { delta: f32 },
    /// Click on the drawing surface, in container coordinates.
    Click { x: f32, y: f32 },
    /// Click landing inside the open tooltip.
    ClickTooltip,
    CloseTooltip,
    ToggleLegend,
    Pan { dx: f32, dy: f32 },
    DragNode { id: String, dx: f32, dy: f32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hit {
    Node(String),
    Edge(String),
    Background,
}

#[derive(Debug, Clone)]
pub struct Diagram {
    layout: Layout,
    config: Config,
    viewport: Viewport,
    tooltip: Option<Tooltip>,
    legend_collapsed: bool,
}

impl Diagram {
    pub fn build(visualization: &Visualization, config: &Config) -> VizResult<Self> {
        let graph = visualization.to_graph(&config.theme)?;
        let layout = compute_layout(&graph, &config.theme, &config.layout);
        Ok(Self::from_layout(layout, config))
    }

    pub fn from_layout(layout: Layout, config: &Config) -> Self {
        let fit_bounds = layout.bounds.padded(config.layout.fit_padding);
        let viewport = Viewport::fit(&fit_bounds, config.render.width, config.render.height);
        Self {
            layout,
            config: config.clone(),
            viewport,
            tooltip: None,
            legend_collapsed: config.shell.is_narrow(),
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn tooltip(&self) -> Option<&Tooltip> {
        self.tooltip.as_ref()
    }

    pub fn legend_collapsed(&self) -> bool {
        self.legend_collapsed
    }

    /// Applies one interaction. Returns true when the diagram needs a redraw.
    pub fn handle(&mut self, event: ShellEvent) -> bool {
        match event {
            ShellEvent::ZoomIn => {
                self.viewport.zoom_by(self.config.shell.zoom_in_step);
                true
            }
            ShellEvent::ZoomOut => {
                self.viewport.zoom_by(self.config.shell.zoom_out_step);
                true
            }
            ShellEvent::ResetZoom => {
                self.viewport.reset();
                true
            }
            ShellEvent::Wheel { .. } => false,
            ShellEvent::Click { x, y } => {
                // Any click outside the tooltip closes it before a new one may open.
                let closed = self.tooltip.take().is_some();
                let opened = match self.hit_test(x, y) {
                    Hit::Node(id) => self.layout.node(&id).and_then(node_tooltip),
                    Hit::Edge(id) => self.layout.edge(&id).and_then(edge_tooltip),
                    Hit::Background => None,
                };
                let changed = closed || opened.is_some();
                self.tooltip = opened;
                changed
            }
            ShellEvent::ClickTooltip => false,
            ShellEvent::CloseTooltip => self.tooltip.take().is_some(),
            ShellEvent::ToggleLegend => {
                if self.config.shell.is_narrow() {
                    self.legend_collapsed = !self.legend_collapsed;
                    true
                } else {
                    false
                }
            }
            ShellEvent::Pan { dx, dy } => {
                self.viewport.pan(dx, dy);
                true
            }
            ShellEvent::DragNode { id, dx, dy } => {
                let scale = self.viewport.scale;
                move_node(&mut self.layout, &id, dx / scale, dy / scale)
            }
        }
    }

    /// Topmost node under the point wins; edges are matched within a
    /// screen-space tolerance.
    pub fn hit_test(&self, x: f32, y: f32) -> Hit {
        let (wx, wy) = self.viewport.to_world(x, y);
        if let Some(node) = self.layout.nodes.iter().rev().find(|node| node.contains(wx, wy)) {
            return Hit::Node(node.id.clone());
        }
        let tolerance = self.config.shell.edge_hit_tolerance / self.viewport.scale;
        self.layout
            .edges
            .iter()
            .map(|edge| (edge, edge.distance_to(wx, wy)))
            .filter(|(_, distance)| *distance <= tolerance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(edge, _)| Hit::Edge(edge.id.clone()))
            .unwrap_or(Hit::Background)
    }

    /// Standalone SVG of the current view, including the open tooltip.
    pub fn render_svg(&self) -> VizResult<String> {
        draw(
            &self.layout,
            self.viewport.view_box(),
            self.tooltip.as_ref(),
            &self.config.theme,
            SvgView::new(&self.config.layout, &self.config.render),
        )
    }

    /// HTML fragment for the container: canvas, zoom controls, legend, tooltip.
    pub fn render_html(&self, container_id: &str) -> VizResult<String> {
        let view = HtmlView::new(container_id, self.legend_collapsed, &self.config);
        draw(
            &self.layout,
            self.viewport.view_box(),
            self.tooltip.as_ref(),
            &self.config.theme,
            view,
        )
    }
}

fn node_tooltip(node: &NodeLayout) -> Option<Tooltip> {
    if node.description.is_empty() {
        return None;
    }
    Some(Tooltip {
        title: node.raw_label.clone(),
        description: node.description.clone(),
    })
}

fn edge_tooltip(edge: &EdgeLayout) -> Option<Tooltip> {
    if edge.description.is_empty() {
        return None;
    }
    Some(Tooltip {
        title: edge.tooltip_title().to_string(),
        description: edge.description.clone(),
    })
}

/// Container fragment: the inline SVG plus the overlay controls.
pub struct HtmlView {
    container_id: String,
    legend_collapsed: bool,
    svg: SvgView,
    legend_html: String,
    tooltip_html: Option<String>,
    tooltip_inset: f32,
    tooltip_width: f32,
}

impl HtmlView {
    pub fn new(container_id: &str, legend_collapsed: bool, config: &Config) -> Self {
        Self {
            container_id: container_id.to_string(),
            legend_collapsed,
            svg: SvgView::inline(&config.layout, &config.render),
            legend_html: legend_html(legend_collapsed, &config.theme),
            tooltip_html: None,
            tooltip_inset: config.shell.tooltip_inset,
            tooltip_width: config.shell.tooltip_width,
        }
    }
}

impl View for HtmlView {
    type Output = String;

    fn begin(&mut self, view_box: ViewBox, theme: &Theme) -> VizResult<()> {
        self.svg.begin(view_box, theme)
    }

    fn edge(&mut self, edge: &EdgeLayout, theme: &Theme) -> VizResult<()> {
        self.svg.edge(edge, theme)
    }

    fn node(&mut self, node: &NodeLayout, theme: &Theme) -> VizResult<()> {
        self.svg.node(node, theme)
    }

    fn tooltip(&mut self, tooltip: &Tooltip, _theme: &Theme) -> VizResult<()> {
        if self.tooltip_html.is_some() {
            return Err(VizError::Draw("only one tooltip may be open".to_string()));
        }
        let inset = self.tooltip_inset;
        self.tooltip_html = Some(format!(
            "<div class=\"viz-tooltip\" style=\"position: absolute; left: {inset}px; bottom: {inset}px; top: auto; max-width: {}px;\"><div class=\"viz-tooltip-header\">{}</div><div class=\"viz-tooltip-body\">{}</div><div class=\"viz-tooltip-close\">&times;</div></div>",
            self.tooltip_width,
            escape_html(&tooltip.title),
            render_markdown(&tooltip.description)
        ));
        Ok(())
    }

    fn finish(self) -> VizResult<String> {
        let svg = self.svg.finish()?;
        let mut html = format!(
            "<div id=\"{}\" class=\"attack-viz\" style=\"position: relative;\">",
            escape_xml(&self.container_id)
        );
        html.push_str(&svg);
        html.push_str(ZOOM_CONTROLS_HTML);
        html.push_str(&self.legend_html);
        if let Some(tooltip) = self.tooltip_html {
            html.push_str(&tooltip);
        }
        html.push_str("</div>");
        Ok(html)
    }
}

const ZOOM_CONTROLS_HTML: &str = "<div class=\"viz-zoom-controls\"><button class=\"viz-zoom-btn viz-zoom-in\" title=\"Zoom In\">+</button><button class=\"viz-zoom-btn viz-zoom-out\" title=\"Zoom Out\">\u{2212}</button><button class=\"viz-zoom-btn viz-zoom-reset\" title=\"Reset Zoom\">\u{2299}</button></div>";

fn legend_html(collapsed: bool, theme: &Theme) -> String {
    let class = if collapsed {
        "viz-legend collapsed"
    } else {
        "viz-legend"
    };
    let swatch =
        |color: &str| format!("<div class=\"viz-legend-box\" style=\"background-color: {color};\"></div>");
    let mut html = format!("<div class=\"{class}\"><div class=\"viz-legend-title\">Legend</div>");
    html.push_str("<div class=\"viz-legend-section\"><div class=\"viz-legend-subtitle\">Node Types</div>");
    for (color, text) in [
        (theme.principal_color.as_str(), "Principal (Users/Roles)"),
        (theme.resource_color.as_str(), "Resource"),
        (theme.payload_color.as_str(), "Payload (Attacker Actions)"),
    ] {
        html.push_str(&format!(
            "<div class=\"viz-legend-item\">{}<span>{text}</span></div>",
            swatch(color)
        ));
    }
    html.push_str(&format!(
        "<div class=\"viz-legend-item\">{}{}{}<span>Outcomes</span></div></div>",
        swatch(&theme.outcome_color),
        swatch(OUTCOME_PARTIAL_COLOR),
        swatch(OUTCOME_DEAD_END_COLOR)
    ));
    html.push_str("<div class=\"viz-legend-section\"><div class=\"viz-legend-subtitle\">Edge Types</div>");
    html.push_str(&format!(
        "<div class=\"viz-legend-item\"><svg width=\"40\" height=\"2\"><line x1=\"0\" y1=\"1\" x2=\"40\" y2=\"1\" stroke=\"{}\" stroke-width=\"2\"/></svg><span>Transitive Actions</span></div>",
        theme.line_color
    ));
    html.push_str(&format!(
        "<div class=\"viz-legend-item\"><svg width=\"40\" height=\"2\"><line x1=\"0\" y1=\"1\" x2=\"40\" y2=\"1\" stroke=\"{}\" stroke-width=\"2\" stroke-dasharray=\"{}\"/></svg><span>Potential Outcomes</span></div>",
        theme.conditional_line_color, theme.conditional_dasharray
    ));
    html.push_str("</div></div>");
    html
}

#[derive(Debug, Clone)]
pub enum MountContent {
    Diagram(Box<Diagram>),
    Error(String),
}

/// What ends up inside one container: a live diagram or the inline error.
#[derive(Debug, Clone)]
pub struct Mount {
    pub container_id: String,
    pub content: MountContent,
    error_color: String,
}

impl Mount {
    pub fn is_error(&self) -> bool {
        matches!(self.content, MountContent::Error(_))
    }

    pub fn diagram_mut(&mut self) -> Option<&mut Diagram> {
        match &mut self.content {
            MountContent::Diagram(diagram) => Some(diagram),
            MountContent::Error(_) => None,
        }
    }

    /// Container markup. A failure while drawing replaces the whole diagram
    /// with the inline error; no partial output is returned.
    pub fn to_html(&self) -> String {
        let MountContent::Diagram(diagram) = &self.content else {
            return error_html(&self.container_id, &self.error_color);
        };
        diagram
            .render_html(&self.container_id)
            .unwrap_or_else(|err| {
                tracing::warn!(container = %self.container_id, error = %err, "visualization draw failed");
                error_html(&self.container_id, &self.error_color)
            })
    }
}

fn error_html(container_id: &str, color: &str) -> String {
    format!(
        "<div id=\"{}\" class=\"attack-viz\"><p style=\"color: {color};\">{ERROR_MESSAGE}</p></div>",
        escape_xml(container_id)
    )
}

/// Builds a diagram for an already-resolved visualization. Never fails: errors
/// become an error mount.
pub fn mount_visualization(container_id: String, visualization: &Visualization, config: &Config) -> Mount {
    let content = match Diagram::build(visualization, config) {
        Ok(diagram) => MountContent::Diagram(Box::new(diagram)),
        Err(err) => {
            tracing::warn!(container = %container_id, error = %err, "visualization could not be built");
            MountContent::Error(err.to_string())
        }
    };
    Mount {
        container_id,
        content,
        error_color: config.theme.error_color.clone(),
    }
}

/// Render entry point for raw visualization JSON (a legacy string or a
/// structured object). Never fails.
pub fn render_attack_visualization(path_id: &str, input: &Value, config: &Config) -> Mount {
    mount_visualization(
        container_id(path_id, false),
        &Visualization::from_value(input),
        config,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn end_to_end_input() -> Value {
        json!({
            "nodes": [
                {"id": "A", "label": "User", "type": "principal", "description": "The **starting** principal"},
                {"id": "B", "label": "Policy", "type": "resource"},
                {"id": "C", "label": "Admin", "type": "outcome"}
            ],
            "edges": [
                {"from": "A", "to": "B", "label": "modifies", "description": "Creates a new `default` version"},
                {"from": "B", "to": "C", "label": "grants"}
            ]
        })
    }

    fn diagram() -> Diagram {
        let mount = render_attack_visualization("iam-001", &end_to_end_input(), &Config::default());
        match mount.content {
            MountContent::Diagram(diagram) => *diagram,
            MountContent::Error(err) => panic!("unexpected error: {err}"),
        }
    }

    fn screen_of(diagram: &Diagram, wx: f32, wy: f32) -> (f32, f32) {
        let vp = diagram.viewport();
        (
            (wx - vp.center.0) * vp.scale + vp.width / 2.0,
            (wy - vp.center.1) * vp.scale + vp.height / 2.0,
        )
    }

    #[test]
    fn container_ids_do_not_collide() {
        assert_eq!(container_id("iam-001", false), "attack-viz-iam-001");
        assert_eq!(container_id("iam-001", true), "attack-viz-fullscreen-iam-001");
    }

    #[test]
    fn invalid_inputs_mount_inline_error() {
        for input in [json!({}), Value::Null, json!(12), json!({"nodes": []})] {
            let mount = render_attack_visualization("x-001", &input, &Config::default());
            assert!(mount.is_error());
            let html = mount.to_html();
            assert!(html.contains(ERROR_MESSAGE));
            assert!(!html.contains("<svg"));
        }
    }

    #[test]
    fn dangling_edge_mounts_inline_error() {
        let input = json!({
            "nodes": [{"id": "A", "label": "User", "type": "principal"}],
            "edges": [{"from": "A", "to": "B"}]
        });
        let mount = render_attack_visualization("x-002", &input, &Config::default());
        assert!(mount.is_error());
    }

    #[test]
    fn numeric_ids_mount_a_diagram() {
        let input = json!({
            "nodes": [
                {"id": 1, "label": "User", "type": "principal"},
                {"id": 2, "label": "Role", "type": "resource"}
            ],
            "edges": [{"from": 1, "to": 2, "label": "assumes"}]
        });
        let mount = render_attack_visualization("x-003", &input, &Config::default());
        assert!(!mount.is_error());
        assert!(mount.to_html().contains("data-node-id=\"2\""));
    }

    #[test]
    fn zoom_steps_and_reset() {
        let mut diagram = diagram();
        let fit = diagram.viewport().scale;
        assert!(diagram.handle(ShellEvent::ZoomIn));
        assert!((diagram.viewport().scale - fit * 1.2).abs() < 1e-4);
        assert!(diagram.handle(ShellEvent::ZoomOut));
        assert!((diagram.viewport().scale - fit * 1.2 * 0.8).abs() < 1e-4);
        diagram.handle(ShellEvent::Pan { dx: 30.0, dy: 0.0 });
        assert!(diagram.handle(ShellEvent::ResetZoom));
        assert_eq!(diagram.viewport().scale, fit);
        let (cx, cy) = diagram.layout().bounds.center();
        assert!((diagram.viewport().center.0 - cx).abs() < 1e-3);
        assert!((diagram.viewport().center.1 - cy).abs() < 1e-3);
    }

    #[test]
    fn wheel_does_not_zoom() {
        let mut diagram = diagram();
        let before = *diagram.viewport();
        assert!(!diagram.handle(ShellEvent::Wheel { delta: -120.0 }));
        assert_eq!(*diagram.viewport(), before);
    }

    #[test]
    fn clicking_node_with_description_opens_tooltip() {
        let mut diagram = diagram();
        let a = diagram.layout().node("A").unwrap().clone();
        let (x, y) = screen_of(&diagram, a.x, a.y);
        assert!(diagram.handle(ShellEvent::Click { x, y }));
        let tooltip = diagram.tooltip().unwrap();
        assert_eq!(tooltip.title, "User");
        let html = diagram.render_html("attack-viz-iam-001").unwrap();
        assert_eq!(html.matches("class=\"viz-tooltip\"").count(), 1);
        assert!(html.contains("<strong>starting</strong>"));
    }

    #[test]
    fn clicking_node_without_description_closes_tooltip() {
        let mut diagram = diagram();
        let a = diagram.layout().node("A").unwrap().clone();
        let b = diagram.layout().node("B").unwrap().clone();
        let (ax, ay) = screen_of(&diagram, a.x, a.y);
        diagram.handle(ShellEvent::Click { x: ax, y: ay });
        assert!(!diagram.handle(ShellEvent::ClickTooltip));
        assert!(diagram.tooltip().is_some());
        let (bx, by) = screen_of(&diagram, b.x, b.y);
        assert!(diagram.handle(ShellEvent::Click { x: bx, y: by }));
        assert!(diagram.tooltip().is_none());
    }

    #[test]
    fn clicking_edge_uses_original_label() {
        let mut diagram = diagram();
        let edge = diagram.layout().edge("edge-0").unwrap().clone();
        let (mx, my) = edge.point_at(0.25);
        let (x, y) = screen_of(&diagram, mx, my);
        assert_eq!(diagram.hit_test(x, y), Hit::Edge("edge-0".to_string()));
        diagram.handle(ShellEvent::Click { x, y });
        assert_eq!(diagram.tooltip().unwrap().title, "modifies");
    }

    #[test]
    fn standalone_svg_follows_zoom_and_tooltip() {
        let mut diagram = diagram();
        let fitted = diagram.render_svg().unwrap();
        diagram.handle(ShellEvent::ZoomIn);
        let a = diagram.layout().node("A").unwrap().clone();
        let (x, y) = screen_of(&diagram, a.x, a.y);
        diagram.handle(ShellEvent::Click { x, y });
        let zoomed = diagram.render_svg().unwrap();
        assert_ne!(fitted, zoomed);
        assert!(zoomed.contains("<g class=\"viz-tooltip\">"));
        assert!(zoomed.starts_with("<svg xmlns"));
    }

    #[test]
    fn legend_collapses_on_narrow_pages_only() {
        let mut config = Config::default();
        config.shell.viewport_width = 600.0;
        let mount = render_attack_visualization("iam-001", &end_to_end_input(), &config);
        assert!(mount.to_html().contains("viz-legend collapsed"));
        let MountContent::Diagram(mut narrow) = mount.content else {
            panic!("expected diagram");
        };
        assert!(narrow.legend_collapsed());
        assert!(narrow.handle(ShellEvent::ToggleLegend));
        assert!(!narrow.legend_collapsed());

        let mut wide = diagram();
        assert!(!wide.legend_collapsed());
        assert!(!wide.handle(ShellEvent::ToggleLegend));
        assert!(!wide.legend_collapsed());
    }

    #[test]
    fn html_contains_controls_and_legend() {
        let mount = render_attack_visualization("iam-001", &end_to_end_input(), &Config::default());
        let html = mount.to_html();
        assert!(html.starts_with("<div id=\"attack-viz-iam-001\""));
        assert!(html.contains("viz-zoom-in"));
        assert!(html.contains("viz-zoom-reset"));
        assert!(html.contains("Potential Outcomes"));
        assert!(html.contains("<svg class=\"viz-canvas\""));
    }

    #[test]
    fn dragging_node_scales_by_zoom() {
        let mut diagram = diagram();
        let scale = diagram.viewport().scale;
        assert!(diagram.handle(ShellEvent::DragNode {
            id: "C".to_string(),
            dx: 10.0 * scale,
            dy: 0.0,
        }));
        assert!((diagram.layout().node("C").unwrap().x - 10.0).abs() < 1e-3);
        assert_eq!(diagram.layout().node("B").unwrap().x, 0.0);
    }
}
