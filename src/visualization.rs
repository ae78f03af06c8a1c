//! Input shapes for attack visualizations.
//!
//! Catalog entries carry either legacy graph text or a structured node/edge
//! object. The shape is sniffed exactly once, when the JSON is loaded, and the
//! rest of the crate works with [`Visualization`] only.

use crate::adapter::adapt_structured;
use crate::error::{VizError, VizResult};
use crate::ir::Graph;
use crate::parser::parse_graph_text;
use crate::theme::Theme;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredNode {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub label: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredEdge {
    #[serde(deserialize_with = "id_string")]
    pub from: String,
    #[serde(deserialize_with = "id_string")]
    pub to: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub branch: Option<Value>,
    #[serde(default)]
    pub condition: Option<Value>,
}

/// Catalog YAML leaves ids like `1` unquoted; a bare number names the same node
/// as its decimal string.
fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Number(number) => number.to_string(),
    })
}

impl StructuredEdge {
    /// An edge is conditional when either `branch` or `condition` is set to a
    /// truthy value (`true`, a non-empty string, a non-zero number, any object).
    pub fn is_conditional(&self) -> bool {
        self.branch.as_ref().is_some_and(is_truthy) || self.condition.as_ref().is_some_and(is_truthy)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredGraph {
    pub nodes: Vec<StructuredNode>,
    pub edges: Vec<StructuredEdge>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Visualization {
    Legacy(String),
    Structured(StructuredGraph),
    /// Neither shape; the reason is reported when a render is attempted.
    Unrecognized(String),
}

impl Visualization {
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(text) => Self::Legacy(text.clone()),
            Value::Object(map) if map.contains_key("nodes") && map.contains_key("edges") => {
                match serde_json::from_value::<StructuredGraph>(value.clone()) {
                    Ok(graph) => Self::Structured(graph),
                    Err(err) => Self::Unrecognized(err.to_string()),
                }
            }
            Value::Null => Self::Unrecognized("no visualization data".to_string()),
            _ => Self::Unrecognized(
                "expected graph text or an object with `nodes` and `edges`".to_string(),
            ),
        }
    }

    /// Reads raw input: JSON (a string or a structured object) when it parses
    /// as such, otherwise the text itself is treated as legacy graph text.
    pub fn from_source(source: &str) -> Self {
        let trimmed = source.trim_start();
        if trimmed.starts_with('{') || trimmed.starts_with('"') {
            if let Ok(value) = serde_json::from_str::<Value>(source) {
                return Self::from_value(&value);
            }
        }
        Self::Legacy(source.to_string())
    }

    /// Normalizes either shape into the canonical [`Graph`] and validates it.
    pub fn to_graph(&self, theme: &Theme) -> VizResult<Graph> {
        let graph = match self {
            Self::Legacy(text) => parse_graph_text(text),
            Self::Structured(structured) => adapt_structured(structured, theme),
            Self::Unrecognized(reason) => return Err(VizError::InvalidFormat(reason.clone())),
        };
        graph.validate()?;
        Ok(graph)
    }
}

impl<'de> Deserialize<'de> for Visualization {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(num) => num.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sniffs_shape_once() {
        assert!(matches!(
            Visualization::from_value(&json!("graph LR\nA[x] --> B[y]")),
            Visualization::Legacy(_)
        ));
        assert!(matches!(
            Visualization::from_value(&json!({"nodes": [], "edges": []})),
            Visualization::Structured(_)
        ));
        assert!(matches!(
            Visualization::from_value(&json!({})),
            Visualization::Unrecognized(_)
        ));
        assert!(matches!(
            Visualization::from_value(&Value::Null),
            Visualization::Unrecognized(_)
        ));
    }

    #[test]
    fn source_text_is_json_or_legacy() {
        assert!(matches!(
            Visualization::from_source("A[x] --> B[y]"),
            Visualization::Legacy(_)
        ));
        assert!(matches!(
            Visualization::from_source(r#"{"nodes": [], "edges": []}"#),
            Visualization::Structured(_)
        ));
        assert_eq!(
            Visualization::from_source(r#""A[x] --> B[y]""#),
            Visualization::Legacy("A[x] --> B[y]".to_string())
        );
        assert!(matches!(
            Visualization::from_source("{}"),
            Visualization::Unrecognized(_)
        ));
    }

    #[test]
    fn unrecognized_shape_is_invalid_format() {
        let viz = Visualization::from_value(&json!({"nodes": []}));
        let err = viz.to_graph(&Theme::dark()).unwrap_err();
        assert!(matches!(err, VizError::InvalidFormat(_)));
    }

    #[test]
    fn structured_edges_must_reference_known_nodes() {
        let viz = Visualization::from_value(&json!({
            "nodes": [{"id": "A", "label": "User", "type": "principal"}],
            "edges": [{"from": "A", "to": "Z"}]
        }));
        let err = viz.to_graph(&Theme::dark()).unwrap_err();
        assert_eq!(
            err,
            VizError::UnknownNode {
                edge: 0,
                id: "Z".to_string()
            }
        );
    }

    #[test]
    fn numeric_ids_name_nodes() {
        let viz = Visualization::from_value(&json!({
            "nodes": [
                {"id": 1, "label": "User", "type": "principal"},
                {"id": "2", "label": "Role", "type": "resource"}
            ],
            "edges": [{"from": 1, "to": 2, "label": "assumes"}]
        }));
        let graph = viz.to_graph(&Theme::dark()).unwrap();
        assert_eq!(graph.nodes[0].id, "1");
        assert_eq!(graph.edges[0].from, "1");
        assert_eq!(graph.edges[0].to, "2");

        let viz = Visualization::from_value(&json!({
            "nodes": [{"id": true, "label": "User", "type": "principal"}],
            "edges": []
        }));
        assert!(matches!(viz, Visualization::Unrecognized(_)));
    }

    #[test]
    fn branch_and_condition_truthiness() {
        let edge: StructuredEdge =
            serde_json::from_value(json!({"from": "A", "to": "B", "condition": "has MFA"})).unwrap();
        assert!(edge.is_conditional());
        let edge: StructuredEdge =
            serde_json::from_value(json!({"from": "A", "to": "B", "branch": false})).unwrap();
        assert!(!edge.is_conditional());
        let edge: StructuredEdge =
            serde_json::from_value(json!({"from": "A", "to": "B", "condition": ""})).unwrap();
        assert!(!edge.is_conditional());
    }

    #[test]
    fn deserializes_leniently_inside_larger_documents() {
        #[derive(Deserialize)]
        struct Holder {
            viz: Visualization,
        }
        let holder: Holder = serde_json::from_value(json!({"viz": 42})).unwrap();
        assert!(matches!(holder.viz, Visualization::Unrecognized(_)));
    }
}
