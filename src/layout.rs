//! Declarative layout tree for the certificate canvas.
//!
//! A `Layout` is purely derived output: the composer builds it fresh for every
//! render request and the SVG renderer consumes it exactly once. Nothing here
//! is mutated after composition.

use crate::blob::EmbeddableBlob;

pub const CANVAS_WIDTH: f64 = 1080.0;
/// Fixed canvas height. Derives from scaling a reference physical document
/// size (1123 x 5398/8560) to width 1080. The raster export rounds this to
/// 681 integer pixels; keep the fractional constant as-is.
pub const CANVAS_HEIGHT: f64 = 681.0560747664;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.w / 2.0, self.y + self.h / 2.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub [u8; 3]);

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.0[0], self.0[1], self.0[2])
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    pub offset: f64,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Fill {
    Solid(Color),
    /// CSS-style gradient angle in degrees (0 = up, 90 = right).
    LinearGradient { angle_deg: f64, stops: Vec<GradientStop> },
}

impl Fill {
    pub fn gradient(angle_deg: f64, colors: &[Color]) -> Fill {
        let n = colors.len().max(2) - 1;
        let stops = colors
            .iter()
            .enumerate()
            .map(|(i, &color)| GradientStop { offset: i as f64 / n as f64, color })
            .collect();
        Fill::LinearGradient { angle_deg, stops }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clip {
    None,
    /// Clip to the largest circle inscribed in the node's rect.
    Circle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontFamily {
    Serif,
    Sans,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAnchor {
    Start,
    End,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub family: FontFamily,
    pub size: f64,
    pub weight: u16,
    pub color: Color,
    pub letter_spacing: f64,
    pub anchor: TextAnchor,
}

impl TextStyle {
    pub fn new(family: FontFamily, size: f64, weight: u16, color: Color) -> Self {
        Self {
            family,
            size,
            weight,
            color,
            letter_spacing: 0.0,
            anchor: TextAnchor::Start,
        }
    }

    pub fn letter_spacing(mut self, spacing: f64) -> Self {
        self.letter_spacing = spacing;
        self
    }

    pub fn anchored_end(mut self) -> Self {
        self.anchor = TextAnchor::End;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Container {
        fill: Option<Fill>,
        radius: f64,
        children: Vec<Node>,
    },
    Image {
        blob: EmbeddableBlob,
        clip: Clip,
    },
    Text {
        content: String,
        style: TextStyle,
        /// When set, the renderer shrinks the font size until the run fits.
        max_width: Option<f64>,
    },
}

/// One positioned node. All coordinates are absolute canvas units, including
/// for container children; containers group paint order, not coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub rect: Rect,
    /// Rotation in degrees around the rect center. 0 = none.
    pub rotate: f64,
    pub kind: NodeKind,
}

impl Node {
    pub fn container(rect: Rect, fill: Option<Fill>, children: Vec<Node>) -> Node {
        Node {
            rect,
            rotate: 0.0,
            kind: NodeKind::Container { fill, radius: 0.0, children },
        }
    }

    pub fn image(rect: Rect, blob: EmbeddableBlob) -> Node {
        Node {
            rect,
            rotate: 0.0,
            kind: NodeKind::Image { blob, clip: Clip::None },
        }
    }

    pub fn circle_image(rect: Rect, blob: EmbeddableBlob) -> Node {
        Node {
            rect,
            rotate: 0.0,
            kind: NodeKind::Image { blob, clip: Clip::Circle },
        }
    }

    pub fn text(rect: Rect, content: impl Into<String>, style: TextStyle) -> Node {
        Node {
            rect,
            rotate: 0.0,
            kind: NodeKind::Text { content: content.into(), style, max_width: None },
        }
    }

    pub fn rotated(mut self, degrees: f64) -> Node {
        self.rotate = degrees;
        self
    }

    pub fn rounded(mut self, corner_radius: f64) -> Node {
        if let NodeKind::Container { radius, .. } = &mut self.kind {
            *radius = corner_radius;
        }
        self
    }

    pub fn fitted(mut self, width: f64) -> Node {
        if let NodeKind::Text { max_width, .. } = &mut self.kind {
            *max_width = Some(width);
        }
        self
    }
}

/// Ordered tree of positioned nodes on a fixed canvas. Paint order is
/// document order (first node painted first).
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub width: f64,
    pub height: f64,
    pub nodes: Vec<Node>,
}

impl Layout {
    pub fn canvas(nodes: Vec<Node>) -> Layout {
        Layout {
            width: CANVAS_WIDTH,
            height: CANVAS_HEIGHT,
            nodes,
        }
    }

    /// All text contents in paint order, descending into containers.
    pub fn texts(&self) -> Vec<&str> {
        fn walk<'a>(nodes: &'a [Node], out: &mut Vec<&'a str>) {
            for n in nodes {
                match &n.kind {
                    NodeKind::Text { content, .. } => out.push(content.as_str()),
                    NodeKind::Container { children, .. } => walk(children, out),
                    NodeKind::Image { .. } => {}
                }
            }
        }
        let mut out = Vec::new();
        walk(&self.nodes, &mut out);
        out
    }

    pub fn contains_text(&self, needle: &str) -> bool {
        self.texts().iter().any(|t| *t == needle)
    }

    pub fn image_count(&self) -> usize {
        fn walk(nodes: &[Node]) -> usize {
            nodes
                .iter()
                .map(|n| match &n.kind {
                    NodeKind::Image { .. } => 1,
                    NodeKind::Container { children, .. } => walk(children),
                    NodeKind::Text { .. } => 0,
                })
                .sum()
        }
        walk(&self.nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_formats_as_hex() {
        assert_eq!(Color([0x74, 0x70, 0x5E]).to_string(), "#74705E");
    }

    #[test]
    fn gradient_stops_span_zero_to_one() {
        let f = Fill::gradient(135.0, &[Color([0; 3]), Color([128; 3]), Color([255; 3])]);
        let Fill::LinearGradient { stops, .. } = f else {
            panic!("expected gradient")
        };
        assert_eq!(stops.len(), 3);
        assert_eq!(stops[0].offset, 0.0);
        assert_eq!(stops[1].offset, 0.5);
        assert_eq!(stops[2].offset, 1.0);
    }

    #[test]
    fn texts_walks_nested_containers() {
        let style = TextStyle::new(FontFamily::Serif, 16.0, 400, Color([0; 3]));
        let layout = Layout::canvas(vec![Node::container(
            Rect::new(0.0, 0.0, 10.0, 10.0),
            None,
            vec![Node::text(Rect::new(0.0, 0.0, 5.0, 5.0), "inner", style)],
        )]);
        assert!(layout.contains_text("inner"));
    }
}
