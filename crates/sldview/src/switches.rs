//! Breakers, disconnectors and load-break switches: click to request an open/close toggle.

use crate::geom::parse_translate;
use crate::interaction::{ClickTracker, PointerEvent};
use crate::metadata::DiagramMetadata;
use crate::scene::{NodeId, Scene};

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchBinding {
    pub element: NodeId,
    pub element_id: String,
    pub equipment_id: String,
    /// State reported by the metadata; never updated locally.
    pub open: bool,
    pub tracker: ClickTracker,
}

impl SwitchBinding {
    /// Returns the requested open state when `event` completes a click.
    pub fn handle(&mut self, event: &PointerEvent) -> Option<bool> {
        self.tracker.handle(event).then_some(!self.open)
    }
}

/// Resolves switch nodes to their elements and marks them clickable. Nodes without an element
/// or without a `translate(...)` anchor are skipped.
pub fn bind_switches(metadata: &DiagramMetadata, scene: &mut Scene) -> Vec<SwitchBinding> {
    let index = scene.id_index();
    let mut resolved = Vec::new();
    for node in metadata.nodes.iter().filter(|n| n.is_switch()) {
        let Some(&element) = index.get(node.id.as_str()) else {
            tracing::trace!(id = %node.id, "switch not found in markup");
            continue;
        };
        if scene
            .attr(element, "transform")
            .and_then(parse_translate)
            .is_none()
        {
            tracing::trace!(id = %node.id, "switch has no translate transform");
            continue;
        }
        resolved.push(SwitchBinding {
            element,
            element_id: node.id.clone(),
            equipment_id: node.equipment_id.clone(),
            open: node.open,
            tracker: ClickTracker::default(),
        });
    }

    for b in &resolved {
        scene.set_style_property(b.element, "cursor", "pointer");
    }
    resolved
}
