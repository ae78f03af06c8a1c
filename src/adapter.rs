use crate::ir::{EdgeStyle, Graph, GraphEdge, GraphNode, NodeKind};
use crate::theme::{OUTCOME_DEAD_END_COLOR, OUTCOME_PARTIAL_COLOR, Theme, darker_color};
use crate::visualization::{StructuredEdge, StructuredGraph, StructuredNode};

/// Normalizes a structured visualization into the canonical graph, applying
/// the per-kind palette and the conditional-edge styling.
pub fn adapt_structured(structured: &StructuredGraph, theme: &Theme) -> Graph {
    let nodes: Vec<GraphNode> = structured
        .nodes
        .iter()
        .map(|node| adapt_node(node, theme))
        .collect();
    let edges: Vec<GraphEdge> = structured
        .edges
        .iter()
        .enumerate()
        .map(|(idx, edge)| adapt_edge(idx, edge))
        .collect();

    let conditional = edges.iter().filter(|edge| edge.is_conditional()).count();
    tracing::debug!(
        nodes = nodes.len(),
        edges = edges.len(),
        conditional,
        "adapted structured visualization"
    );
    Graph { nodes, edges }
}

fn adapt_node(node: &StructuredNode, theme: &Theme) -> GraphNode {
    let kind = NodeKind::from_type(&node.kind);
    let explicit = node
        .color
        .as_deref()
        .map(str::trim)
        .filter(|color| !color.is_empty());
    let fill = match explicit {
        Some(color) => color.to_string(),
        None => outcome_override(kind, &node.label)
            .unwrap_or_else(|| theme.kind_color(kind))
            .to_string(),
    };
    GraphNode {
        id: node.id.clone(),
        label: node.label.clone(),
        kind,
        description: node.description.clone().unwrap_or_default(),
        border: darker_color(&fill),
        fill,
    }
}

/// Outcome nodes are recolored by label: dead ends gray, partial results yellow.
fn outcome_override(kind: NodeKind, label: &str) -> Option<&'static str> {
    if kind != NodeKind::Outcome {
        return None;
    }
    if label.contains("No ") || label.contains("Dead") {
        Some(OUTCOME_DEAD_END_COLOR)
    } else if label.contains("Check") || label.contains("Some") {
        Some(OUTCOME_PARTIAL_COLOR)
    } else {
        None
    }
}

fn adapt_edge(idx: usize, edge: &StructuredEdge) -> GraphEdge {
    let style = if edge.is_conditional() {
        EdgeStyle::Conditional
    } else {
        EdgeStyle::Transitive
    };
    let label = match style {
        EdgeStyle::Conditional => None,
        EdgeStyle::Transitive => edge.label.clone().filter(|label| !label.is_empty()),
    };
    GraphEdge {
        id: format!("edge-{idx}"),
        from: edge.from.clone(),
        to: edge.to.clone(),
        label,
        original_label: edge.label.clone(),
        description: edge.description.clone().unwrap_or_default(),
        style,
    }
}
