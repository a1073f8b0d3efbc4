//! Layout-to-SVG renderer. Walks the composed node tree and emits a
//! self-contained SVG document: image blobs become data URIs, fonts are
//! embedded via `@font-face`, gradients and circular clips become defs.
//!
//! Text fitting happens here, not in the composer: a text node that declares
//! a max width is measured against the loaded font and its size shrunk until
//! the run fits.

use std::fmt::Write;

use rusttype::{point, Font, Scale};
use thiserror::Error;

use crate::assets::FontSet;
use crate::layout::{Fill, FontFamily, Layout, Node, NodeKind, TextAnchor, TextStyle};
use crate::util;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("svg write failed: {0}")]
    Write(#[from] std::fmt::Error),
}

const MIN_TEXT_SIZE: f64 = 10.0;

pub fn render_svg(layout: &Layout, fonts: &FontSet) -> Result<String, RenderError> {
    let mut r = Renderer {
        defs: String::new(),
        body: String::new(),
        next_id: 0,
        fonts,
    };
    r.nodes(&layout.nodes)?;

    let mut out = String::with_capacity(r.defs.len() + r.body.len() + 1024);
    write!(
        out,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">",
        w = layout.width,
        h = layout.height
    )?;
    let faces = font_faces(fonts)?;
    if !faces.is_empty() {
        write!(out, "<style>{faces}</style>")?;
    }
    if !r.defs.is_empty() {
        write!(out, "<defs>{}</defs>", r.defs)?;
    }
    out.push_str(&r.body);
    out.push_str("</svg>");
    Ok(out)
}

fn font_faces(fonts: &FontSet) -> Result<String, RenderError> {
    let mut css = String::new();
    let mut face = |family: &str, bytes: &[u8]| -> Result<(), RenderError> {
        write!(
            css,
            "@font-face{{font-family:\"{family}\";src:url({}) format(\"truetype\");}}",
            util::to_data_uri("font/ttf", bytes)
        )?;
        Ok(())
    };
    if let Some(serif) = &fonts.serif {
        face("Noto Serif JP", &serif.bytes)?;
    }
    if let Some(sans) = &fonts.sans {
        face("Noto Sans JP", &sans.bytes)?;
    }
    Ok(css)
}

struct Renderer<'a> {
    defs: String,
    body: String,
    next_id: usize,
    fonts: &'a FontSet,
}

impl Renderer<'_> {
    fn fresh_id(&mut self, prefix: &str) -> String {
        let id = format!("{prefix}{}", self.next_id);
        self.next_id += 1;
        id
    }

    fn nodes(&mut self, nodes: &[Node]) -> Result<(), RenderError> {
        for node in nodes {
            self.node(node)?;
        }
        Ok(())
    }

    fn node(&mut self, node: &Node) -> Result<(), RenderError> {
        let transform = rotation_attr(node);
        match &node.kind {
            NodeKind::Container { fill, radius, children } => {
                if fill.is_some() || !children.is_empty() {
                    write!(self.body, "<g{transform}>")?;
                    if let Some(fill) = fill {
                        let paint = self.paint(fill)?;
                        write!(
                            self.body,
                            "<rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\"",
                            node.rect.x, node.rect.y, node.rect.w, node.rect.h
                        )?;
                        if *radius > 0.0 {
                            write!(self.body, " rx=\"{radius}\"")?;
                        }
                        write!(self.body, " fill=\"{paint}\"/>")?;
                    }
                    self.nodes(children)?;
                    self.body.push_str("</g>");
                }
            }
            NodeKind::Image { blob, clip } => {
                let clip_attr = match clip {
                    crate::layout::Clip::None => String::new(),
                    crate::layout::Clip::Circle => {
                        let id = self.fresh_id("clip");
                        let (cx, cy) = node.rect.center();
                        let r = node.rect.w.min(node.rect.h) / 2.0;
                        write!(
                            self.defs,
                            "<clipPath id=\"{id}\"><circle cx=\"{cx}\" cy=\"{cy}\" r=\"{r}\"/></clipPath>"
                        )?;
                        format!(" clip-path=\"url(#{id})\"")
                    }
                };
                write!(
                    self.body,
                    "<image x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" preserveAspectRatio=\"xMidYMid slice\" href=\"{}\"{clip_attr}{transform}/>",
                    node.rect.x,
                    node.rect.y,
                    node.rect.w,
                    node.rect.h,
                    blob.data_uri()
                )?;
            }
            NodeKind::Text { content, style, max_width } => {
                let size = self.fitted_size(content, style, *max_width);
                let x = match style.anchor {
                    TextAnchor::Start => node.rect.x,
                    TextAnchor::End => node.rect.x + node.rect.w,
                };
                // Baseline centered in the declared line box.
                let y = node.rect.y + node.rect.h / 2.0 + size * 0.35;
                write!(
                    self.body,
                    "<text x=\"{x}\" y=\"{y}\" font-family=\"{}\" font-size=\"{size}\" font-weight=\"{}\" fill=\"{}\"",
                    family_css(style.family),
                    style.weight,
                    style.color
                )?;
                if style.letter_spacing != 0.0 {
                    write!(self.body, " letter-spacing=\"{}\"", style.letter_spacing)?;
                }
                if style.anchor == TextAnchor::End {
                    self.body.push_str(" text-anchor=\"end\"");
                }
                write!(self.body, "{transform}>{}</text>", util::xml_escape(content))?;
            }
        }
        Ok(())
    }

    /// Shrink the declared size until the run fits its max width. Requires a
    /// loaded font to measure against; without one the declared size stands.
    fn fitted_size(&self, content: &str, style: &TextStyle, max_width: Option<f64>) -> f64 {
        let Some(max_width) = max_width else {
            return style.size;
        };
        let Some(font) = self.measuring_font(style.family) else {
            return style.size;
        };
        let width = text_width(font, style.size as f32, content, style.letter_spacing as f32);
        if width as f64 <= max_width {
            return style.size;
        }
        (style.size * max_width / width as f64).max(MIN_TEXT_SIZE)
    }

    fn measuring_font(&self, family: FontFamily) -> Option<&Font<'static>> {
        let loaded = match family {
            FontFamily::Serif => self.fonts.serif.as_ref(),
            FontFamily::Sans => self.fonts.sans.as_ref(),
        };
        loaded.map(|f| f.font.as_ref())
    }

    fn paint(&mut self, fill: &Fill) -> Result<String, RenderError> {
        match fill {
            Fill::Solid(color) => Ok(color.to_string()),
            Fill::LinearGradient { angle_deg, stops } => {
                let id = self.fresh_id("grad");
                let (x1, y1, x2, y2) = gradient_line(*angle_deg);
                write!(
                    self.defs,
                    "<linearGradient id=\"{id}\" x1=\"{x1}\" y1=\"{y1}\" x2=\"{x2}\" y2=\"{y2}\">"
                )?;
                for stop in stops {
                    write!(
                        self.defs,
                        "<stop offset=\"{}\" stop-color=\"{}\"/>",
                        stop.offset, stop.color
                    )?;
                }
                self.defs.push_str("</linearGradient>");
                Ok(format!("url(#{id})"))
            }
        }
    }
}

fn rotation_attr(node: &Node) -> String {
    if node.rotate == 0.0 {
        return String::new();
    }
    let (cx, cy) = node.rect.center();
    format!(" transform=\"rotate({} {cx} {cy})\"", node.rotate)
}

fn family_css(family: FontFamily) -> &'static str {
    match family {
        FontFamily::Serif => "Noto Serif JP, serif",
        FontFamily::Sans => "Noto Sans JP, sans-serif",
    }
}

/// CSS gradient angle (0 = up, clockwise) to an SVG gradient line in
/// objectBoundingBox units, running through the box center.
fn gradient_line(angle_deg: f64) -> (f64, f64, f64, f64) {
    let rad = angle_deg.to_radians();
    let dx = rad.sin() / 2.0;
    let dy = -rad.cos() / 2.0;
    (0.5 - dx, 0.5 - dy, 0.5 + dx, 0.5 + dy)
}

/// Rendered advance width of a run, including letter spacing between glyphs.
fn text_width(font: &Font<'static>, px: f32, text: &str, letter_spacing: f32) -> f32 {
    if text.is_empty() {
        return 0.0;
    }
    let scale = Scale::uniform(px);
    let v_metrics = font.v_metrics(scale);
    let glyphs: Vec<_> = font.layout(text, scale, point(0.0, v_metrics.ascent)).collect();
    let mut width: f32 = 0.0;
    for (i, g) in glyphs.iter().enumerate() {
        if let Some(bb) = g.pixel_bounding_box() {
            width = width.max(bb.max.x as f32);
        }
        if i + 1 < glyphs.len() {
            width += letter_spacing;
        }
    }
    width
}
