//! Metadata document shipped alongside the diagram markup.
//!
//! Only `nodes` drives the viewer; the remaining sections are kept as opaque JSON so that a
//! document can be loaded, handed around and serialized again without loss.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramMetadata {
    #[serde(default)]
    pub nodes: Vec<NodeMetadata>,
    #[serde(default)]
    pub components: Value,
    #[serde(default)]
    pub wires: Value,
    #[serde(default)]
    pub lines: Value,
    #[serde(default)]
    pub arrows: Value,
    #[serde(default)]
    pub layout_params: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMetadata {
    pub id: String,
    #[serde(default, alias = "vid")]
    pub voltage_level_id: String,
    #[serde(default, alias = "nextVId")]
    pub next_voltage_level_id: String,
    #[serde(default)]
    pub component_type: Option<String>,
    #[serde(default)]
    pub open: bool,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default, alias = "vlabel")]
    pub has_voltage_label: bool,
    #[serde(default)]
    pub equipment_id: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Top,
    Bottom,
    #[default]
    #[serde(other)]
    Undefined,
}

/// Interaction category of a node, derived from its `componentType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    Switch,
    Feeder,
    Other,
}

pub const SWITCH_COMPONENT_TYPES: &[&str] = &["BREAKER", "DISCONNECTOR", "LOAD_BREAK_SWITCH"];

pub const FEEDER_COMPONENT_TYPES: &[&str] = &[
    "LINE",
    "LOAD",
    "BATTERY",
    "DANGLING_LINE",
    "GENERATOR",
    "VSC_CONVERTER_STATION",
    "LCC_CONVERTER_STATION",
    "HVDC_LINE",
    "CAPACITOR",
    "INDUCTOR",
    "STATIC_VAR_COMPENSATOR",
    "TWO_WINDINGS_TRANSFORMER",
    "TWO_WINDINGS_TRANSFORMER_LEG",
    "THREE_WINDINGS_TRANSFORMER",
    "THREE_WINDINGS_TRANSFORMER_LEG",
    "PHASE_SHIFT_TRANSFORMER",
];

impl ComponentKind {
    pub fn classify(component_type: Option<&str>) -> Self {
        match component_type {
            Some(t) if SWITCH_COMPONENT_TYPES.contains(&t) => ComponentKind::Switch,
            Some(t) if FEEDER_COMPONENT_TYPES.contains(&t) => ComponentKind::Feeder,
            _ => ComponentKind::Other,
        }
    }
}

impl NodeMetadata {
    pub fn kind(&self) -> ComponentKind {
        ComponentKind::classify(self.component_type.as_deref())
    }

    pub fn is_switch(&self) -> bool {
        self.kind() == ComponentKind::Switch
    }

    /// Feeders are only interactive when scoped to a voltage level.
    pub fn is_feeder(&self) -> bool {
        !self.voltage_level_id.is_empty() && self.kind() == ComponentKind::Feeder
    }
}

impl DiagramMetadata {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Distinct, non-empty voltage level ids present among the nodes, in first-seen order.
    pub fn voltage_level_ids(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for n in &self.nodes {
            let vl = n.voltage_level_id.as_str();
            if !vl.is_empty() && !out.contains(&vl) {
                out.push(vl);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nodes_accept_long_and_short_field_names() {
        let meta = DiagramMetadata::from_value(json!({
            "nodes": [
                {
                    "id": "n1",
                    "voltageLevelId": "VL1",
                    "nextVoltageLevelId": "VL2",
                    "componentType": "LINE",
                    "direction": "TOP",
                    "equipmentId": "L1"
                },
                {
                    "id": "n2",
                    "vid": "VL1",
                    "nextVId": "VL3",
                    "componentType": "BREAKER",
                    "open": true,
                    "direction": "BOTTOM",
                    "vlabel": true,
                    "equipmentId": "B1"
                },
                { "id": "n3", "direction": "UNDEFINED" }
            ],
            "layoutParams": { "verticalSpaceBus": 25 }
        }))
        .expect("metadata");

        let [n1, n2, n3] = meta.nodes.as_slice() else {
            panic!("expected three nodes");
        };
        assert_eq!(n1.next_voltage_level_id, "VL2");
        assert_eq!(n1.direction, Direction::Top);
        assert!(n1.is_feeder());
        assert_eq!(n2.voltage_level_id, "VL1");
        assert_eq!(n2.next_voltage_level_id, "VL3");
        assert!(n2.open && n2.has_voltage_label && n2.is_switch());
        assert_eq!(n3.direction, Direction::Undefined);
        assert_eq!(n3.kind(), ComponentKind::Other);
        assert_eq!(meta.layout_params["verticalSpaceBus"], 25);
        assert!(meta.wires.is_null());
        assert_eq!(meta.voltage_level_ids(), vec!["VL1"]);
    }

    #[test]
    fn feeder_types_need_a_voltage_level() {
        let node = NodeMetadata {
            id: "g".to_string(),
            component_type: Some("GENERATOR".to_string()),
            ..Default::default()
        };
        assert_eq!(node.kind(), ComponentKind::Feeder);
        assert!(!node.is_feeder());
    }
}
