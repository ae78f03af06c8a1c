use crate::ir::NodeKind;
use serde::{Deserialize, Serialize};

pub const DEFAULT_NODE_COLOR: &str = "#e8f4f8";
pub const OUTCOME_DEAD_END_COLOR: &str = "#cccccc";
pub const OUTCOME_PARTIAL_COLOR: &str = "#ffeb99";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub name: String,
    pub font_family: String,
    pub node_text_color: String,
    pub edge_text_color: String,
    pub edge_label_background: String,
    pub line_color: String,
    pub conditional_line_color: String,
    pub conditional_dasharray: String,
    pub highlight_color: String,
    pub background: String,
    pub principal_color: String,
    pub resource_color: String,
    pub payload_color: String,
    pub outcome_color: String,
    pub tooltip_background: String,
    pub tooltip_text_color: String,
    pub error_color: String,
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            name: "dark".to_string(),
            font_family: "Arial".to_string(),
            node_text_color: "#232f3e".to_string(),
            edge_text_color: "#FFFFFF".to_string(),
            edge_label_background: "rgba(26,26,36,0.9)".to_string(),
            line_color: "#848484".to_string(),
            conditional_line_color: "#999".to_string(),
            conditional_dasharray: "5,5".to_string(),
            highlight_color: "#ff9900".to_string(),
            background: "#1a1a24".to_string(),
            principal_color: "#ff9999".to_string(),
            resource_color: "#ffcc99".to_string(),
            payload_color: "#99ccff".to_string(),
            outcome_color: "#99ff99".to_string(),
            tooltip_background: "#232f3e".to_string(),
            tooltip_text_color: "#FFFFFF".to_string(),
            error_color: "#d13212".to_string(),
        }
    }

    pub fn light() -> Self {
        Self {
            name: "light".to_string(),
            edge_text_color: "#666".to_string(),
            edge_label_background: "rgba(255,255,255,0.9)".to_string(),
            background: "#FFFFFF".to_string(),
            tooltip_background: "#FFFFFF".to_string(),
            tooltip_text_color: "#232f3e".to_string(),
            ..Self::dark()
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "light" => Some(Self::light()),
            "dark" => Some(Self::dark()),
            _ => None,
        }
    }

    /// Type-default fill for a node kind, before any outcome sub-coloring.
    pub fn kind_color(&self, kind: NodeKind) -> &str {
        match kind {
            NodeKind::Principal => &self.principal_color,
            NodeKind::Resource => &self.resource_color,
            NodeKind::Payload => &self.payload_color,
            NodeKind::Outcome => &self.outcome_color,
            NodeKind::Unknown => DEFAULT_NODE_COLOR,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

/// Darkens a `#rrggbb` color to 70% per channel. Other inputs are returned unchanged.
pub fn darker_color(color: &str) -> String {
    let Some((r, g, b)) = parse_hex_rgb(color) else {
        return color.to_string();
    };
    let scale = |channel: u8| (f32::from(channel) * 0.7).floor() as u8;
    format!("#{:02x}{:02x}{:02x}", scale(r), scale(g), scale(b))
}

fn parse_hex_rgb(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.trim().trim_start_matches('#');
    if !hex.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return None;
    }
    let expanded: String = match hex.len() {
        3 => hex.chars().flat_map(|ch| [ch, ch]).collect(),
        6 => hex.to_string(),
        _ => return None,
    };
    let r = u8::from_str_radix(&expanded[0..2], 16).ok()?;
    let g = u8::from_str_radix(&expanded[2..4], 16).ok()?;
    let b = u8::from_str_radix(&expanded[4..6], 16).ok()?;
    Some((r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn darkens_each_channel() {
        assert_eq!(darker_color("#ff9999"), "#b26b6b");
        assert_eq!(darker_color("#000000"), "#000000");
        assert_eq!(darker_color("#999"), "#6b6b6b");
    }

    #[test]
    fn leaves_non_hex_colors_alone() {
        assert_eq!(darker_color("red"), "red");
    }

    #[test]
    fn light_theme_keeps_node_palette() {
        let light = Theme::light();
        let dark = Theme::dark();
        assert_eq!(light.principal_color, dark.principal_color);
        assert_eq!(light.edge_text_color, "#666");
        assert_eq!(dark.edge_text_color, "#FFFFFF");
    }
}
