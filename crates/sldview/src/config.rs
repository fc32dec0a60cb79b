use crate::error::Result;
use crate::measure::{GeometryMeasurer, SceneMeasurer};
use crate::viewport::SizeConstraints;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Tunables of the viewer.
///
/// The arrow offsets and paddings are tied to the 44x44 navigation arrow glyph; change them
/// together with `arrow_size` if a different glyph is used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewerConfig {
    /// Padding added on every side of the measured content box.
    pub bbox_margin: f64,
    /// Horizontal distance between a feeder anchor and its arrow center.
    pub arrow_offset_x: f64,
    /// Vertical distance between a voltage level's feeder extent and the arrow centers.
    pub arrow_offset_y: f64,
    pub arrow_size: f64,
    /// Fixed padding around a hovered feeder label, added to the label's own CSS padding.
    pub label_padding: f64,
    pub label_class: String,
    pub arrow_class: String,
    pub highlight_class: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            bbox_margin: 20.0,
            arrow_offset_x: 22.0,
            arrow_offset_y: 65.0,
            arrow_size: 44.0,
            label_padding: 4.0,
            label_class: "sld-label".to_string(),
            arrow_class: "sld-arrow".to_string(),
            highlight_class: "sld-label-highlight".to_string(),
        }
    }
}

impl ViewerConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

#[derive(Clone)]
pub struct ViewerOptions {
    /// Diagram flavor; only `"voltage-level"` changes behavior (tighter zoom range).
    pub svg_type: String,
    pub constraints: SizeConstraints,
    /// CSS color used by hover and selection affordances.
    pub selection_color: String,
    pub config: ViewerConfig,
    /// Answers bounding-box queries against the live scene.
    pub measurer: Arc<dyn SceneMeasurer + Send + Sync>,
}

impl std::fmt::Debug for ViewerOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewerOptions")
            .field("svg_type", &self.svg_type)
            .field("constraints", &self.constraints)
            .field("selection_color", &self.selection_color)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            svg_type: crate::viewport::VOLTAGE_LEVEL_SVG_TYPE.to_string(),
            constraints: SizeConstraints::default(),
            selection_color: "#f44336".to_string(),
            config: ViewerConfig::default(),
            measurer: Arc::new(GeometryMeasurer::default()),
        }
    }
}
