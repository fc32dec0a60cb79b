//! Navigation arrows towards adjacent voltage levels.
//!
//! The metadata only says which nodes lead to another voltage level; where to draw the arrow is
//! inferred from the rendered anchors. Placement is two passes: first the vertical extent of
//! every voltage level's anchors, then one arrow per anchor just outside that extent.

use crate::config::ViewerConfig;
use crate::geom::parse_translate;
use crate::metadata::{DiagramMetadata, Direction, NodeMetadata};
use crate::scene::{NodeId, Scene};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrowPlacement {
    pub element_id: String,
    pub voltage_level_id: String,
    pub next_voltage_level_id: String,
    pub direction: Direction,
    /// Arrow center, in the coordinates of the anchor element's parent.
    pub center: (f64, f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerticalExtent {
    pub lowest_y: f64,
    pub highest_y: f64,
}

/// An arrow to synthesize next to `anchor`.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedArrow {
    pub anchor: NodeId,
    pub placement: ArrowPlacement,
}

/// Elements of a synthesized arrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrowGlyph {
    pub group: NodeId,
    /// Circular hover backdrop.
    pub backdrop: NodeId,
    pub glyph: NodeId,
}

struct Candidate<'a> {
    node: &'a NodeMetadata,
    element: NodeId,
    anchor: (f64, f64),
}

/// Nodes leading to a voltage level absent from this diagram, resolved to their anchors.
fn candidates<'a>(
    metadata: &'a DiagramMetadata,
    scene: &Scene,
    index: &FxHashMap<&str, NodeId>,
) -> Vec<Candidate<'a>> {
    let present: FxHashSet<&str> = metadata.voltage_level_ids().into_iter().collect();
    let mut out = Vec::new();
    for node in &metadata.nodes {
        let next = node.next_voltage_level_id.as_str();
        if next.is_empty() || present.contains(next) {
            continue;
        }
        let Some(&element) = index.get(node.id.as_str()) else {
            tracing::trace!(id = %node.id, "navigation anchor not found in markup");
            continue;
        };
        let Some(anchor) = scene.attr(element, "transform").and_then(parse_translate) else {
            tracing::trace!(id = %node.id, "navigation anchor has no translate transform");
            continue;
        };
        out.push(Candidate {
            node,
            element,
            anchor,
        });
    }
    out
}

/// Vertical extent of each voltage level's anchors, keyed by voltage level id.
fn extents(candidates: &[Candidate<'_>]) -> BTreeMap<String, VerticalExtent> {
    let mut out: BTreeMap<String, VerticalExtent> = BTreeMap::new();
    for c in candidates {
        let y = c.anchor.1;
        out.entry(c.node.voltage_level_id.clone())
            .and_modify(|e| {
                e.lowest_y = e.lowest_y.min(y);
                e.highest_y = e.highest_y.max(y);
            })
            .or_insert(VerticalExtent {
                lowest_y: y,
                highest_y: y,
            });
    }
    out
}

pub fn voltage_level_extents(
    metadata: &DiagramMetadata,
    scene: &Scene,
) -> BTreeMap<String, VerticalExtent> {
    let index = scene.id_index();
    extents(&candidates(metadata, scene, &index))
}

pub fn plan_arrows(
    metadata: &DiagramMetadata,
    scene: &Scene,
    config: &ViewerConfig,
) -> Vec<PlannedArrow> {
    let index = scene.id_index();
    let candidates = candidates(metadata, scene, &index);
    let extents = extents(&candidates);

    candidates
        .iter()
        .filter_map(|c| {
            let extent = extents.get(&c.node.voltage_level_id)?;
            let (x, _) = c.anchor;
            let center = match c.node.direction {
                Direction::Top => (
                    x - config.arrow_offset_x,
                    extent.lowest_y - config.arrow_offset_y,
                ),
                Direction::Bottom | Direction::Undefined => (
                    x + config.arrow_offset_x,
                    extent.highest_y + config.arrow_offset_y,
                ),
            };
            Some(PlannedArrow {
                anchor: c.element,
                placement: ArrowPlacement {
                    element_id: c.node.id.clone(),
                    voltage_level_id: c.node.voltage_level_id.clone(),
                    next_voltage_level_id: c.node.next_voltage_level_id.clone(),
                    direction: c.node.direction,
                    center,
                },
            })
        })
        .collect()
}

/// Draws the arrow as the next sibling of its anchor. The glyph points up; arrows of
/// non-`TOP` anchors are turned around.
pub fn insert_arrow(
    scene: &mut Scene,
    anchor: NodeId,
    placement: &ArrowPlacement,
    config: &ViewerConfig,
) -> ArrowGlyph {
    let s = config.arrow_size;
    let half = s / 2.0;
    let (cx, cy) = placement.center;

    let group = scene.create_element("g");
    scene.set_attr(group, "id", format!("{}-arrow", placement.element_id));
    scene.set_attr(group, "class", config.arrow_class.clone());
    let mut transform = format!("translate({},{})", cx - half, cy - half);
    if placement.direction != Direction::Top {
        transform.push_str(&format!(" rotate(180,{half},{half})"));
    }
    scene.set_attr(group, "transform", transform);
    scene.set_style_property(group, "cursor", "pointer");

    let backdrop = scene.create_element("circle");
    scene.set_attr(backdrop, "class", format!("{}-hover", config.arrow_class));
    scene.set_attr(backdrop, "cx", half.to_string());
    scene.set_attr(backdrop, "cy", half.to_string());
    scene.set_attr(backdrop, "r", half.to_string());
    scene.append_child(group, backdrop);

    let u = s / 44.0;
    let glyph = scene.create_element("path");
    scene.set_attr(glyph, "class", format!("{}-glyph", config.arrow_class));
    scene.set_attr(
        glyph,
        "d",
        format!(
            "M{} {} L{} {} H{} V{} H{} V{} H{} Z",
            22.0 * u,
            8.0 * u,
            34.0 * u,
            22.0 * u,
            26.0 * u,
            36.0 * u,
            18.0 * u,
            22.0 * u,
            10.0 * u,
        ),
    );
    scene.append_child(group, glyph);

    let arrow = ArrowGlyph {
        group,
        backdrop,
        glyph,
    };
    set_arrow_hover(scene, &arrow, false, "");
    scene.insert_after(anchor, group);
    arrow
}

/// Hover inverts the arrow the same way feeder labels are highlighted: the circular backdrop
/// turns `currentColor` and the glyph drawn over it takes the highlight color. Leaving restores
/// an unfilled backdrop under a `currentColor` glyph.
pub fn set_arrow_hover(scene: &mut Scene, arrow: &ArrowGlyph, hovered: bool, highlight: &str) {
    if hovered {
        scene.set_style_property(arrow.backdrop, "fill", "currentColor");
        scene.set_style_property(arrow.glyph, "fill", highlight);
    } else {
        scene.set_style_property(arrow.backdrop, "fill", "none");
        scene.set_style_property(arrow.glyph, "fill", "currentColor");
    }
}
