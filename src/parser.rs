//! Line-oriented parser for the legacy graph text embedded in older catalog
//! entries (`graph LR`, `style X fill:#...`, `A[label] -->|edge| B[label]`).
//!
//! The grammar is lenient: a line matching none of the known forms is dropped.

use crate::ir::{EdgeStyle, Graph, GraphEdge, GraphNode, NodeKind};
use crate::theme::{DEFAULT_NODE_COLOR, darker_color};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

static HEADER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:graph|flowchart)(?:\s|$)").unwrap());
static STYLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"style\s+(\w+)\s+fill:(#[0-9a-fA-F]+)").unwrap());
static EDGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?P<from>\w+)(?:\[(?P<from_label>[^\]]+)\])?\s*-->(?:\|(?P<label>[^|]+)\|)?\s*(?P<to>\w+)\[(?P<to_label>[^\]]+)\]",
    )
    .unwrap()
});

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line<'a> {
    Header,
    Style { id: &'a str, fill: &'a str },
    Edge(EdgeLine<'a>),
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct EdgeLine<'a> {
    from: &'a str,
    from_label: Option<&'a str>,
    label: Option<&'a str>,
    to: &'a str,
    to_label: &'a str,
}

fn classify_line(line: &str) -> Line<'_> {
    if HEADER_RE.is_match(line) {
        return Line::Header;
    }
    if line.starts_with("style ") {
        return match STYLE_RE.captures(line) {
            Some(caps) => match (caps.get(1), caps.get(2)) {
                (Some(id), Some(fill)) => Line::Style {
                    id: id.as_str(),
                    fill: fill.as_str(),
                },
                _ => Line::Skipped,
            },
            None => Line::Skipped,
        };
    }
    let Some(caps) = EDGE_RE.captures(line) else {
        return Line::Skipped;
    };
    let (Some(from), Some(to), Some(to_label)) =
        (caps.name("from"), caps.name("to"), caps.name("to_label"))
    else {
        return Line::Skipped;
    };
    Line::Edge(EdgeLine {
        from: from.as_str(),
        from_label: caps.name("from_label").map(|m| m.as_str().trim()),
        label: caps
            .name("label")
            .map(|m| m.as_str().trim())
            .filter(|label| !label.is_empty()),
        to: to.as_str(),
        to_label: to_label.as_str().trim(),
    })
}

/// Parses legacy graph text into the canonical graph.
///
/// Nodes are introduced by the first line that mentions their id. The target
/// always carries a bracketed label; the source may omit it only when its id
/// is already known, otherwise the line is dropped. Style fills apply to a node
/// only when its style line precedes its introduction.
pub fn parse_graph_text(input: &str) -> Graph {
    let mut graph = Graph::new();
    let mut introduced: HashSet<String> = HashSet::new();
    let mut styles: HashMap<String, String> = HashMap::new();
    let mut skipped = 0usize;

    for raw_line in input.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with("%%") {
            continue;
        }
        match classify_line(line) {
            Line::Header => {}
            Line::Style { id, fill } => {
                styles.insert(id.to_string(), fill.to_string());
            }
            Line::Edge(edge) => {
                match edge.from_label {
                    Some(label) => {
                        introduce_node(&mut graph, &mut introduced, &styles, edge.from, label)
                    }
                    None if !introduced.contains(edge.from) => {
                        skipped += 1;
                        continue;
                    }
                    None => {}
                }
                introduce_node(&mut graph, &mut introduced, &styles, edge.to, edge.to_label);
                let label = edge.label.map(str::to_string);
                graph.edges.push(GraphEdge {
                    id: format!("edge-{}", graph.edges.len()),
                    from: edge.from.to_string(),
                    to: edge.to.to_string(),
                    label: label.clone(),
                    original_label: label,
                    description: String::new(),
                    style: EdgeStyle::Transitive,
                });
            }
            Line::Skipped => skipped += 1,
        }
    }

    tracing::debug!(
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        skipped,
        "parsed legacy graph text"
    );
    graph
}

fn introduce_node(
    graph: &mut Graph,
    introduced: &mut HashSet<String>,
    styles: &HashMap<String, String>,
    id: &str,
    label: &str,
) {
    if introduced.contains(id) {
        return;
    }
    let fill = styles
        .get(id)
        .cloned()
        .unwrap_or_else(|| DEFAULT_NODE_COLOR.to_string());
    graph.nodes.push(GraphNode {
        id: id.to_string(),
        label: label.to_string(),
        kind: NodeKind::Unknown,
        description: String::new(),
        border: darker_color(&fill),
        fill,
    });
    introduced.insert(id.to_string());
}
