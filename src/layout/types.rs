use crate::ir::{EdgeStyle, NodeKind};

#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub lines: Vec<String>,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone)]
pub struct NodeLayout {
    pub id: String,
    pub kind: NodeKind,
    pub label: TextBlock,
    pub raw_label: String,
    pub description: String,
    pub fill: String,
    pub border: String,
    pub level: usize,
    /// True when the node was unreachable from every root and got a fallback level.
    pub fallback: bool,
    /// Center of the node box.
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl NodeLayout {
    pub fn contains(&self, x: f32, y: f32) -> bool {
        (x - self.x).abs() <= self.width / 2.0 && (y - self.y).abs() <= self.height / 2.0
    }

    pub fn top(&self) -> f32 {
        self.y - self.height / 2.0
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height / 2.0
    }

    pub fn left(&self) -> f32 {
        self.x - self.width / 2.0
    }

    pub fn right(&self) -> f32 {
        self.x + self.width / 2.0
    }
}

#[derive(Debug, Clone)]
pub struct EdgeLayout {
    pub id: String,
    pub from: String,
    pub to: String,
    pub label: Option<TextBlock>,
    pub original_label: Option<String>,
    pub description: String,
    pub style: EdgeStyle,
    /// Cubic Bézier: start, two control points, end.
    pub curve: [(f32, f32); 4],
    pub label_anchor: (f32, f32),
}

impl EdgeLayout {
    pub fn is_conditional(&self) -> bool {
        self.style == EdgeStyle::Conditional
    }

    pub fn point_at(&self, t: f32) -> (f32, f32) {
        let [p0, p1, p2, p3] = self.curve;
        let u = 1.0 - t;
        let a = u * u * u;
        let b = 3.0 * u * u * t;
        let c = 3.0 * u * t * t;
        let d = t * t * t;
        (
            a * p0.0 + b * p1.0 + c * p2.0 + d * p3.0,
            a * p0.1 + b * p1.1 + c * p2.1 + d * p3.1,
        )
    }

    /// Distance from a point to the curve, sampled along its length.
    pub fn distance_to(&self, x: f32, y: f32) -> f32 {
        const SAMPLES: usize = 24;
        let mut best = f32::INFINITY;
        let mut prev = self.point_at(0.0);
        for step in 1..=SAMPLES {
            let next = self.point_at(step as f32 / SAMPLES as f32);
            best = best.min(segment_distance((x, y), prev, next));
            prev = next;
        }
        best
    }

    pub fn tooltip_title(&self) -> &str {
        self.original_label
            .as_deref()
            .filter(|label| !label.is_empty())
            .or(self.label.as_ref().and_then(|block| block.lines.first()).map(String::as_str))
            .unwrap_or("Edge Details")
    }
}

fn segment_distance(p: (f32, f32), a: (f32, f32), b: (f32, f32)) -> f32 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq <= f32::EPSILON {
        0.0
    } else {
        (((p.0 - a.0) * dx + (p.1 - a.1) * dy) / len_sq).clamp(0.0, 1.0)
    };
    let (cx, cy) = (a.0 + t * dx, a.1 + t * dy);
    ((p.0 - cx).powi(2) + (p.1 - cy).powi(2)).sqrt()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Bounds {
    pub fn empty() -> Self {
        Self {
            min_x: 0.0,
            min_y: 0.0,
            max_x: 0.0,
            max_y: 0.0,
        }
    }

    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> (f32, f32) {
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    pub fn padded(&self, pad: f32) -> Self {
        Self {
            min_x: self.min_x - pad,
            min_y: self.min_y - pad,
            max_x: self.max_x + pad,
            max_y: self.max_y + pad,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Layout {
    /// Nodes in input order.
    pub nodes: Vec<NodeLayout>,
    pub edges: Vec<EdgeLayout>,
    /// Node ids per level, in placement order.
    pub levels: Vec<Vec<String>>,
    pub bounds: Bounds,
}

impl Layout {
    pub fn node(&self, id: &str) -> Option<&NodeLayout> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut NodeLayout> {
        self.nodes.iter_mut().find(|node| node.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&EdgeLayout> {
        self.edges.iter().find(|edge| edge.id == id)
    }
}
