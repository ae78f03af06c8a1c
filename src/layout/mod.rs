//! Hierarchical layout: BFS levels, then rows centered under the previous row.
//!
//! Positions are final once computed; nothing downstream reflows them.

mod levels;
mod text;
pub(crate) mod types;

pub use levels::LevelAssignment;
pub use types::*;

use crate::config::LayoutConfig;
use crate::ir::{Graph, GraphEdge};
use crate::theme::Theme;
use levels::assign_levels;
use std::collections::HashMap;
use text::measure_label;

const SELF_LOOP_REACH: f32 = 40.0;

pub fn compute_layout(graph: &Graph, theme: &Theme, config: &LayoutConfig) -> Layout {
    let assignment = assign_levels(graph);
    let positions = place_levels(&assignment.levels, config);

    let label_width = (config.node_max_width - 2.0 * config.node_margin).max(1.0);
    let mut nodes: Vec<NodeLayout> = Vec::with_capacity(graph.nodes.len());
    for node in &graph.nodes {
        let label = measure_label(&node.label, config.font_size, label_width, theme, config);
        let width = (label.width + 2.0 * config.node_margin)
            .clamp(config.node_min_width, config.node_max_width);
        let height = label.height + 2.0 * config.node_margin;
        let (x, y) = positions.get(node.id.as_str()).copied().unwrap_or((0.0, 0.0));
        nodes.push(NodeLayout {
            id: node.id.clone(),
            kind: node.kind,
            label,
            raw_label: node.label.clone(),
            description: node.description.clone(),
            fill: node.fill.clone(),
            border: node.border.clone(),
            level: assignment.level_of.get(&node.id).copied().unwrap_or(0),
            fallback: assignment.fallback.contains(&node.id),
            x,
            y,
            width,
            height,
        });
    }

    let mut layout = Layout {
        nodes,
        edges: Vec::new(),
        levels: assignment.levels,
        bounds: Bounds::empty(),
    };
    layout.edges = graph
        .edges
        .iter()
        .filter_map(|edge| route_edge(edge, &layout, theme, config))
        .collect();
    layout.bounds = node_bounds(&layout.nodes);

    tracing::debug!(
        nodes = layout.nodes.len(),
        edges = layout.edges.len(),
        levels = layout.levels.len(),
        "computed hierarchical layout"
    );
    layout
}

/// Row `i` sits at `i * level_separation`. Each row is spread at `node_spacing`
/// around the midpoint of the previous row's horizontal extent; the first row
/// is centered on x = 0.
fn place_levels<'a>(
    levels: &'a [Vec<String>],
    config: &LayoutConfig,
) -> HashMap<&'a str, (f32, f32)> {
    let mut positions: HashMap<&str, (f32, f32)> = HashMap::new();
    let mut center_x = 0.0_f32;
    for (level_idx, ids) in levels.iter().enumerate() {
        if ids.is_empty() {
            continue;
        }
        let y = level_idx as f32 * config.level_separation;
        let row_width = (ids.len() - 1) as f32 * config.node_spacing;
        let start_x = center_x - row_width / 2.0;
        let mut min_x = f32::INFINITY;
        let mut max_x = f32::NEG_INFINITY;
        for (idx, id) in ids.iter().enumerate() {
            let x = start_x + idx as f32 * config.node_spacing;
            min_x = min_x.min(x);
            max_x = max_x.max(x);
            positions.insert(id.as_str(), (x, y));
        }
        center_x = (min_x + max_x) / 2.0;
    }
    positions
}

fn route_edge(
    edge: &GraphEdge,
    layout: &Layout,
    theme: &Theme,
    config: &LayoutConfig,
) -> Option<EdgeLayout> {
    let source = layout.node(&edge.from)?;
    let target = layout.node(&edge.to)?;
    let curve = edge_curve(source, target);

    let label = edge.label.as_deref().map(|text| {
        measure_label(
            text,
            config.edge_font_size,
            config.node_max_width,
            theme,
            config,
        )
    });
    let mut routed = EdgeLayout {
        id: edge.id.clone(),
        from: edge.from.clone(),
        to: edge.to.clone(),
        label,
        original_label: edge.original_label.clone(),
        description: edge.description.clone(),
        style: edge.style,
        curve,
        label_anchor: (0.0, 0.0),
    };
    routed.label_anchor = routed.point_at(0.5);
    Some(routed)
}

/// Vertical Bézier between box edges; same-row edges run side to side.
fn edge_curve(source: &NodeLayout, target: &NodeLayout) -> [(f32, f32); 4] {
    if source.id == target.id {
        let x = source.right();
        return [
            (x, source.y - source.height / 4.0),
            (x + SELF_LOOP_REACH, source.top() - SELF_LOOP_REACH / 2.0),
            (x + SELF_LOOP_REACH, source.bottom() + SELF_LOOP_REACH / 2.0),
            (x, source.y + source.height / 4.0),
        ];
    }
    if (target.y - source.y).abs() < f32::EPSILON {
        let (start, end) = if target.x >= source.x {
            ((source.right(), source.y), (target.left(), target.y))
        } else {
            ((source.left(), source.y), (target.right(), target.y))
        };
        let dx = (end.0 - start.0) * 0.5;
        return [start, (start.0 + dx, start.1), (end.0 - dx, end.1), end];
    }
    let (start, end) = if target.y > source.y {
        ((source.x, source.bottom()), (target.x, target.top()))
    } else {
        ((source.x, source.top()), (target.x, target.bottom()))
    };
    let dy = (end.1 - start.1) * 0.5;
    [start, (start.0, start.1 + dy), (end.0, end.1 - dy), end]
}

/// Moves one node by an explicit drag and re-routes the edges touching it.
/// Returns false when the id is unknown.
pub fn move_node(layout: &mut Layout, id: &str, dx: f32, dy: f32) -> bool {
    let Some(node) = layout.node_mut(id) else {
        return false;
    };
    node.x += dx;
    node.y += dy;

    let nodes = &layout.nodes;
    for edge in layout.edges.iter_mut() {
        if edge.from != id && edge.to != id {
            continue;
        }
        let source = nodes.iter().find(|node| node.id == edge.from);
        let target = nodes.iter().find(|node| node.id == edge.to);
        if let (Some(source), Some(target)) = (source, target) {
            edge.curve = edge_curve(source, target);
            edge.label_anchor = edge.point_at(0.5);
        }
    }
    layout.bounds = node_bounds(&layout.nodes);
    true
}

fn node_bounds(nodes: &[NodeLayout]) -> Bounds {
    if nodes.is_empty() {
        return Bounds::empty();
    }
    nodes.iter().fold(
        Bounds {
            min_x: f32::INFINITY,
            min_y: f32::INFINITY,
            max_x: f32::NEG_INFINITY,
            max_y: f32::NEG_INFINITY,
        },
        |acc, node| Bounds {
            min_x: acc.min_x.min(node.left()),
            min_y: acc.min_y.min(node.top()),
            max_x: acc.max_x.max(node.right()),
            max_y: acc.max_y.max(node.bottom()),
        },
    )
}
