//! Feeder labels: hover highlight and context-menu trigger.

use crate::config::ViewerConfig;
use crate::geom::parse_length;
use crate::measure::SceneMeasurer;
use crate::metadata::DiagramMetadata;
use crate::scene::{NodeId, Scene};

#[derive(Debug, Clone, PartialEq)]
pub struct FeederBinding {
    /// Label text element; hover and context-menu events target it.
    pub label: NodeId,
    pub element: NodeId,
    pub element_id: String,
    pub equipment_id: String,
    pub component_type: Option<String>,
    /// Highlight rectangle while hovered.
    pub backdrop: Option<NodeId>,
}

impl FeederBinding {
    pub fn is_highlighted(&self) -> bool {
        self.backdrop.is_some()
    }

    /// Puts a rounded backdrop behind the label and recolors the label text. Does nothing when
    /// a backdrop already exists or the label has no measurable geometry.
    pub fn show_highlight(
        &mut self,
        scene: &mut Scene,
        measurer: &dyn SceneMeasurer,
        config: &ViewerConfig,
        color: &str,
    ) {
        if self.backdrop.is_some() {
            return;
        }
        let Some(bounds) = measurer.bbox(scene, self.label) else {
            tracing::trace!(id = %self.element_id, "feeder label has no geometry");
            return;
        };
        let pad = css_padding(scene, self.label) + config.label_padding;

        let rect = scene.create_element("rect");
        scene.set_attr(rect, "class", config.highlight_class.clone());
        scene.set_attr(rect, "x", (bounds.min_x - pad).to_string());
        scene.set_attr(rect, "y", (bounds.min_y - pad).to_string());
        scene.set_attr(rect, "width", (bounds.width() + 2.0 * pad).to_string());
        scene.set_attr(rect, "height", (bounds.height() + 2.0 * pad).to_string());
        scene.set_attr(rect, "rx", config.label_padding.to_string());
        scene.set_attr(rect, "ry", config.label_padding.to_string());
        if let Some(transform) = scene.attr(self.label, "transform").map(str::to_owned) {
            scene.set_attr(rect, "transform", transform);
        }
        scene.set_style_property(rect, "fill", "currentColor");
        scene.insert_before(self.label, rect);

        scene.set_style_property(self.label, "fill", color);
        self.backdrop = Some(rect);
    }

    pub fn hide_highlight(&mut self, scene: &mut Scene) {
        if let Some(rect) = self.backdrop.take() {
            scene.remove(rect);
        }
        scene.remove_style_property(self.label, "fill");
    }
}

/// First length of the label's inline `padding`, or 0.
fn css_padding(scene: &Scene, label: NodeId) -> f64 {
    scene
        .style_property(label, "padding")
        .and_then(|p| p.split_whitespace().next())
        .and_then(parse_length)
        .unwrap_or(0.0)
}

/// Resolves feeder nodes to their elements and label text. Feeders without an element or
/// without a label are skipped.
pub fn bind_feeders(
    metadata: &DiagramMetadata,
    scene: &Scene,
    config: &ViewerConfig,
) -> Vec<FeederBinding> {
    let index = scene.id_index();
    let mut out = Vec::new();
    for node in metadata.nodes.iter().filter(|n| n.is_feeder()) {
        let Some(&element) = index.get(node.id.as_str()) else {
            tracing::trace!(id = %node.id, "feeder not found in markup");
            continue;
        };
        let label = scene.descendants(element).find(|&n| {
            scene.tag(n) == Some("text") && scene.has_class(n, &config.label_class)
        });
        let Some(label) = label else {
            tracing::trace!(id = %node.id, "feeder has no label");
            continue;
        };
        out.push(FeederBinding {
            label,
            element,
            element_id: node.id.clone(),
            equipment_id: node.equipment_id.clone(),
            component_type: node.component_type.clone(),
            backdrop: None,
        });
    }
    out
}
