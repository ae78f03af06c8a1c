use crate::error::{VizError, VizResult};
use std::collections::HashSet;

/// Semantic role of a node in an attack visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Principal,
    Resource,
    Payload,
    Outcome,
    /// Legacy text nodes and unrecognized `type` values.
    Unknown,
}

impl NodeKind {
    pub fn from_type(token: &str) -> Self {
        match token.trim() {
            "principal" => Self::Principal,
            "resource" => Self::Resource,
            // `action` is the deprecated spelling of `payload`.
            "payload" | "action" => Self::Payload,
            "outcome" => Self::Outcome,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Principal => "principal",
            Self::Resource => "resource",
            Self::Payload => "payload",
            Self::Outcome => "outcome",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeStyle {
    /// Deterministic step: solid, labeled.
    Transitive,
    /// Branch or possible outcome: dashed, muted, never labeled.
    Conditional,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub kind: NodeKind,
    pub description: String,
    pub fill: String,
    pub border: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphEdge {
    pub id: String,
    pub from: String,
    pub to: String,
    /// Text drawn on the edge. Always `None` for conditional edges.
    pub label: Option<String>,
    /// Label as supplied by the input, kept for tooltips.
    pub original_label: Option<String>,
    pub description: String,
    pub style: EdgeStyle,
}

impl GraphEdge {
    pub fn is_conditional(&self) -> bool {
        self.style == EdgeStyle::Conditional
    }

    /// Tooltip header: the supplied label wins over the visible one.
    pub fn tooltip_title(&self) -> &str {
        self.original_label
            .as_deref()
            .filter(|label| !label.is_empty())
            .or(self.label.as_deref().filter(|label| !label.is_empty()))
            .unwrap_or("Edge Details")
    }
}

/// Normalized node/edge list shared by both input formats.
///
/// Node order is input order; the layout engine depends on it for tie-breaking.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    /// Checks that node ids are unique and that every edge endpoint exists.
    pub fn validate(&self) -> VizResult<()> {
        let mut seen: HashSet<&str> = HashSet::with_capacity(self.nodes.len());
        for node in &self.nodes {
            if !seen.insert(node.id.as_str()) {
                return Err(VizError::DuplicateNode(node.id.clone()));
            }
        }
        for (idx, edge) in self.edges.iter().enumerate() {
            for id in [&edge.from, &edge.to] {
                if !seen.contains(id.as_str()) {
                    return Err(VizError::UnknownNode {
                        edge: idx,
                        id: id.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str) -> GraphNode {
        GraphNode {
            id: id.to_string(),
            label: id.to_string(),
            kind: NodeKind::Unknown,
            description: String::new(),
            fill: "#e8f4f8".to_string(),
            border: "#a2aaad".to_string(),
        }
    }

    fn edge(from: &str, to: &str) -> GraphEdge {
        GraphEdge {
            id: String::new(),
            from: from.to_string(),
            to: to.to_string(),
            label: None,
            original_label: None,
            description: String::new(),
            style: EdgeStyle::Transitive,
        }
    }

    #[test]
    fn action_is_alias_of_payload() {
        assert_eq!(NodeKind::from_type("action"), NodeKind::Payload);
        assert_eq!(NodeKind::from_type("payload"), NodeKind::Payload);
        assert_eq!(NodeKind::from_type("gadget"), NodeKind::Unknown);
    }

    #[test]
    fn validate_rejects_dangling_edge() {
        let graph = Graph {
            nodes: vec![node("A")],
            edges: vec![edge("A", "B")],
        };
        assert_eq!(
            graph.validate(),
            Err(VizError::UnknownNode {
                edge: 0,
                id: "B".to_string()
            })
        );
    }

    #[test]
    fn validate_rejects_duplicate_ids() {
        let graph = Graph {
            nodes: vec![node("A"), node("A")],
            edges: Vec::new(),
        };
        assert_eq!(graph.validate(), Err(VizError::DuplicateNode("A".to_string())));
    }

    #[test]
    fn edge_tooltip_prefers_original_label() {
        let mut conditional = edge("A", "B");
        conditional.style = EdgeStyle::Conditional;
        conditional.original_label = Some("if allowed".to_string());
        assert_eq!(conditional.tooltip_title(), "if allowed");
        assert_eq!(edge("A", "B").tooltip_title(), "Edge Details");
    }
}
