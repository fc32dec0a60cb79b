#![forbid(unsafe_code)]

//! Headless single-line-diagram viewer.
//!
//! `sldview` takes server-rendered SVG markup plus the structured metadata document describing
//! its nodes, materializes the markup into an owned scene graph and turns it into an interactive
//! diagram:
//! - the natural bounding box is measured and a bounded viewport (surface size + view box) is
//!   derived from it, zoomed to the top-left corner when the content overflows
//! - navigation arrows towards adjacent voltage levels are synthesized from element transforms
//! - switches request open/close toggles on click, feeder labels expose a context-menu trigger
//!
//! There is no browser: pointer events are fed through [`DiagramViewer::dispatch`] and the
//! resulting scene can be serialized back to markup at any time.

pub mod config;
pub mod container;
pub mod error;
pub mod feeders;
pub mod geom;
pub mod interaction;
pub mod measure;
pub mod metadata;
pub mod navigation;
pub mod scene;
pub mod switches;
pub mod viewer;
pub mod viewport;

pub use config::{ViewerConfig, ViewerOptions};
pub use container::{Container, Cursor};
pub use error::{Error, Result};
pub use geom::{AffineTransform, Bounds, parse_translate};
pub use interaction::{EventOutcome, MouseButton, PointerEvent, PointerEventKind};
pub use measure::{DeterministicTextMeasurer, GeometryMeasurer, SceneMeasurer, TextMeasurer};
pub use metadata::{ComponentKind, DiagramMetadata, Direction, NodeMetadata};
pub use navigation::ArrowPlacement;
pub use scene::{NodeId, Scene};
pub use viewer::{
    BreakerCallback, DiagramViewer, FeederCallback, Interaction, InteractionKind,
    NextVoltageLevelCallback, ViewerCallbacks,
};
pub use viewport::{SizeConstraints, ViewBox, Viewport, ZoomRange};
