//! Bounding-box measurement of a live scene.
//!
//! A browser answers `getBBox()` from its layout engine; headlessly the answer comes from a
//! [`SceneMeasurer`]. The default [`GeometryMeasurer`] reads shape attributes and estimates text
//! extents through a [`TextMeasurer`]. Tests can swap in a measurer returning fixed boxes.

use crate::geom::{AffineTransform, Bounds, parse_length, parse_points, path_bounds};
use crate::scene::{NodeId, Scene};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextStyle {
    pub font_size: f64,
    pub anchor: TextAnchor,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: 16.0,
            anchor: TextAnchor::Start,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextAnchor {
    #[default]
    Start,
    Middle,
    End,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TextMetrics {
    pub width: f64,
    pub height: f64,
    /// Distance from the top of the box to the first baseline.
    pub ascent: f64,
}

pub trait TextMeasurer {
    fn measure(&self, text: &str, style: &TextStyle) -> TextMetrics;
}

#[derive(Debug, Clone, Default)]
pub struct DeterministicTextMeasurer {
    pub char_width_factor: f64,
    pub line_height_factor: f64,
    pub ascent_factor: f64,
}

impl TextMeasurer for DeterministicTextMeasurer {
    fn measure(&self, text: &str, style: &TextStyle) -> TextMetrics {
        let or = |v: f64, d: f64| if v == 0.0 { d } else { v };
        let char_width_factor = or(self.char_width_factor, 0.6);
        let line_height_factor = or(self.line_height_factor, 1.2);
        let ascent_factor = or(self.ascent_factor, 0.8);

        let font_size = style.font_size.max(1.0);
        let lines = text.lines().collect::<Vec<_>>();
        let line_count = lines.len().max(1);
        let max_chars = lines
            .iter()
            .map(|l| l.trim().chars().count())
            .max()
            .unwrap_or(0);

        TextMetrics {
            width: max_chars as f64 * font_size * char_width_factor,
            height: line_count as f64 * font_size * line_height_factor,
            ascent: font_size * ascent_factor,
        }
    }
}

pub trait SceneMeasurer {
    /// Bounds of the element's own geometry in its user space, ignoring children and the
    /// element's own `transform`. `None` for containers and non-rendered elements.
    fn shape_bounds(&self, scene: &Scene, node: NodeId) -> Option<Bounds>;

    /// Mirrors SVG `getBBox()`: own geometry plus every rendered descendant mapped through the
    /// descendants' transforms, in the element's local coordinates.
    fn bbox(&self, scene: &Scene, node: NodeId) -> Option<Bounds> {
        let mut acc = self.shape_bounds(scene, node).filter(non_degenerate);
        // Text geometry is measured as a whole; nested tspans do not add to it.
        if scene.tag(node) == Some("text") {
            return acc;
        }
        for &child in scene.children(node) {
            if !scene.is_element(child) || !is_rendered(scene, child) {
                continue;
            }
            let Some(b) = self.bbox(scene, child) else {
                continue;
            };
            let b = match scene.attr(child, "transform") {
                Some(t) => b.transformed(&AffineTransform::parse_list(t)),
                None => b,
            };
            acc = Some(acc.map_or(b, |a| a.union(b)));
        }
        acc
    }
}

/// Zero-area geometry does not grow a bounding box.
fn non_degenerate(b: &Bounds) -> bool {
    b.is_finite() && (b.width().abs() >= 1e-9 || b.height().abs() >= 1e-9)
}

const NON_RENDERED: &[&str] = &[
    "defs", "style", "title", "desc", "metadata", "clipPath", "mask", "marker", "symbol",
    "pattern", "linearGradient", "radialGradient", "filter", "script",
];

fn is_rendered(scene: &Scene, node: NodeId) -> bool {
    if scene.tag(node).is_some_and(|t| NON_RENDERED.contains(&t)) {
        return false;
    }
    scene.attr(node, "display") != Some("none")
        && scene.style_property(node, "display") != Some("none")
}

#[derive(Clone)]
pub struct GeometryMeasurer {
    pub text_measurer: Arc<dyn TextMeasurer + Send + Sync>,
}

impl Default for GeometryMeasurer {
    fn default() -> Self {
        Self {
            text_measurer: Arc::new(DeterministicTextMeasurer::default()),
        }
    }
}

impl std::fmt::Debug for GeometryMeasurer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeometryMeasurer").finish_non_exhaustive()
    }
}

impl GeometryMeasurer {
    fn num(scene: &Scene, node: NodeId, name: &str) -> f64 {
        scene
            .attr(node, name)
            .and_then(parse_length)
            .unwrap_or(0.0)
    }

    fn text_style(scene: &Scene, node: NodeId) -> TextStyle {
        // Font size and anchor are inherited.
        let mut style = TextStyle::default();
        let inherited = |name: &str| {
            scene.ancestors(node).find_map(|n| {
                scene
                    .style_property(n, name)
                    .or_else(|| scene.attr(n, name))
            })
        };
        if let Some(size) = inherited("font-size").and_then(parse_length) {
            style.font_size = size;
        }
        style.anchor = match inherited("text-anchor") {
            Some("middle") => TextAnchor::Middle,
            Some("end") => TextAnchor::End,
            _ => TextAnchor::Start,
        };
        style
    }

    fn text_bounds(&self, scene: &Scene, node: NodeId) -> Option<Bounds> {
        let text = scene.text_content(node);
        if text.trim().is_empty() {
            return None;
        }
        let style = Self::text_style(scene, node);
        let m = self.text_measurer.measure(&text, &style);
        let x = Self::num(scene, node, "x");
        let y = Self::num(scene, node, "y");
        let left = match style.anchor {
            TextAnchor::Start => x,
            TextAnchor::Middle => x - m.width / 2.0,
            TextAnchor::End => x - m.width,
        };
        Some(Bounds::new(left, y - m.ascent, m.width, m.height))
    }
}

impl SceneMeasurer for GeometryMeasurer {
    fn shape_bounds(&self, scene: &Scene, node: NodeId) -> Option<Bounds> {
        let num = |name: &str| Self::num(scene, node, name);
        match scene.tag(node)? {
            "rect" | "image" | "use" | "foreignObject" => {
                let (w, h) = (num("width"), num("height"));
                (w > 0.0 && h > 0.0).then(|| Bounds::new(num("x"), num("y"), w, h))
            }
            "circle" => {
                let r = num("r");
                (r > 0.0).then(|| Bounds::new(num("cx") - r, num("cy") - r, 2.0 * r, 2.0 * r))
            }
            "ellipse" => {
                let (rx, ry) = (num("rx"), num("ry"));
                (rx > 0.0 && ry > 0.0)
                    .then(|| Bounds::new(num("cx") - rx, num("cy") - ry, 2.0 * rx, 2.0 * ry))
            }
            "line" => Bounds::from_points([(num("x1"), num("y1")), (num("x2"), num("y2"))]),
            "polyline" | "polygon" => {
                Bounds::from_points(parse_points(scene.attr(node, "points")?))
            }
            "path" => path_bounds(scene.attr(node, "d")?),
            "text" => self.text_bounds(scene, node),
            _ => None,
        }
    }
}
