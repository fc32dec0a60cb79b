//! The diagram viewer: initialization pipeline, viewport accessors and event dispatch.

use crate::config::ViewerOptions;
use crate::container::{Container, Cursor};
use crate::error::{Error, Result};
use crate::feeders::{FeederBinding, bind_feeders};
use crate::interaction::{ClickTracker, EventOutcome, MouseButton, PointerEvent, PointerEventKind};
use crate::metadata::DiagramMetadata;
use crate::navigation::{ArrowGlyph, ArrowPlacement, insert_arrow, plan_arrows, set_arrow_hover};
use crate::scene::{NodeId, Scene};
use crate::switches::{SwitchBinding, bind_switches};
use crate::viewport::{ViewBox, Viewport, ZoomRange, clamp_dimension};
use rustc_hash::FxHashMap;
use serde::Serialize;

/// Receives the id of the voltage level an arrow leads to.
pub type NextVoltageLevelCallback = Box<dyn FnMut(&str)>;
/// Receives `(equipment_id, requested_open_state, element)`.
pub type BreakerCallback = Box<dyn FnMut(&str, bool, NodeId)>;
/// Receives `(equipment_id, component_type, element_id, client_x, client_y)`.
pub type FeederCallback = Box<dyn FnMut(&str, Option<&str>, &str, f64, f64)>;

/// Caller hooks. A missing callback disables its whole feature category.
#[derive(Default)]
pub struct ViewerCallbacks {
    pub on_next_voltage_level: Option<NextVoltageLevelCallback>,
    pub on_breaker: Option<BreakerCallback>,
    pub on_feeder: Option<FeederCallback>,
}

impl ViewerCallbacks {
    pub fn with_next_voltage_level(mut self, f: impl FnMut(&str) + 'static) -> Self {
        self.on_next_voltage_level = Some(Box::new(f));
        self
    }

    pub fn with_breaker(mut self, f: impl FnMut(&str, bool, NodeId) + 'static) -> Self {
        self.on_breaker = Some(Box::new(f));
        self
    }

    pub fn with_feeder(
        mut self,
        f: impl FnMut(&str, Option<&str>, &str, f64, f64) + 'static,
    ) -> Self {
        self.on_feeder = Some(Box::new(f));
        self
    }
}

impl std::fmt::Debug for ViewerCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewerCallbacks")
            .field("on_next_voltage_level", &self.on_next_voltage_level.is_some())
            .field("on_breaker", &self.on_breaker.is_some())
            .field("on_feeder", &self.on_feeder.is_some())
            .finish()
    }
}

#[derive(Debug)]
struct ArrowBinding {
    element_id: String,
    glyph: ArrowGlyph,
    next_voltage_level_id: String,
    tracker: ClickTracker,
}

#[derive(Debug)]
enum Binding {
    Switch(SwitchBinding),
    Arrow(ArrowBinding),
    Feeder(FeederBinding),
}

/// Kind of an interactive element wired by the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum InteractionKind {
    Switch,
    Arrow,
    Feeder,
}

/// An interactive element wired by the last initialization.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    pub kind: InteractionKind,
    /// Id of the switch or feeder element, or of the synthesized arrow group.
    pub element_id: String,
    #[serde(skip)]
    pub target: NodeId,
}

impl Binding {
    fn interaction(&self, target: NodeId) -> Interaction {
        let (kind, element_id) = match self {
            Binding::Switch(s) => (InteractionKind::Switch, &s.element_id),
            Binding::Arrow(a) => (InteractionKind::Arrow, &a.element_id),
            Binding::Feeder(f) => (InteractionKind::Feeder, &f.element_id),
        };
        Interaction {
            kind,
            element_id: element_id.clone(),
            target,
        }
    }

    fn tracker_mut(&mut self) -> Option<&mut ClickTracker> {
        match self {
            Binding::Switch(s) => Some(&mut s.tracker),
            Binding::Arrow(a) => Some(&mut a.tracker),
            Binding::Feeder(_) => None,
        }
    }
}

/// Interactive single-line diagram bound to a [`Container`].
///
/// Every change of content or metadata re-runs the whole initialization; there is no partial
/// update path.
pub struct DiagramViewer {
    container: Option<Container>,
    svg_content: String,
    metadata: DiagramMetadata,
    options: ViewerOptions,
    callbacks: ViewerCallbacks,
    viewport: Option<Viewport>,
    arrows: Vec<ArrowPlacement>,
    /// Interactive elements keyed by the node events are targeted at.
    bindings: FxHashMap<NodeId, Binding>,
    /// Last pointer position of an active pan gesture.
    pan: Option<(f64, f64)>,
}

impl std::fmt::Debug for DiagramViewer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagramViewer")
            .field("container", &self.container)
            .field("options", &self.options)
            .field("callbacks", &self.callbacks)
            .field("viewport", &self.viewport)
            .field("arrows", &self.arrows)
            .field("bindings", &self.bindings.len())
            .finish_non_exhaustive()
    }
}

impl DiagramViewer {
    /// Creates the viewer and initializes it right away. Initialization failures are logged and
    /// leave the viewer uninitialized; see [`DiagramViewer::is_initialized`].
    pub fn new(
        container: Option<Container>,
        svg_content: impl Into<String>,
        metadata: DiagramMetadata,
        options: ViewerOptions,
        callbacks: ViewerCallbacks,
    ) -> Self {
        let mut viewer = Self {
            container,
            svg_content: svg_content.into(),
            metadata,
            options,
            callbacks,
            viewport: None,
            arrows: Vec::new(),
            bindings: FxHashMap::default(),
            pan: None,
        };
        viewer.initialize();
        viewer
    }

    /// Runs the initialization pipeline, reporting whether a diagram was produced.
    pub fn initialize(&mut self) -> bool {
        match self.try_initialize() {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!(%err, "diagram not initialized");
                false
            }
        }
    }

    pub fn reinitialize(&mut self) -> bool {
        self.initialize()
    }

    /// Like [`DiagramViewer::initialize`] but reports why nothing was produced.
    ///
    /// A failure after the markup was injected leaves that markup in the container, without
    /// viewport or interactions.
    ///
    /// A missing container or empty content leaves the current diagram and its interactions
    /// untouched.
    pub fn try_initialize(&mut self) -> Result<()> {
        if self.container.is_none() {
            return Err(Error::MissingContainer);
        }
        if self.svg_content.trim().is_empty() {
            return Err(Error::EmptyContent);
        }
        self.reset_state();
        let result = self.build();
        if result.is_err() {
            self.reset_state();
        }
        result
    }

    fn reset_state(&mut self) {
        self.viewport = None;
        self.arrows.clear();
        self.bindings.clear();
        self.pan = None;
    }

    fn build(&mut self) -> Result<()> {
        let container = self.container.as_mut().ok_or(Error::MissingContainer)?;
        if self.svg_content.trim().is_empty() {
            return Err(Error::EmptyContent);
        }
        let content = container.inject(&self.svg_content)?;
        let config = &self.options.config;

        let scene = container.scene_mut().ok_or(Error::MissingContainer)?;
        // Arrows first: they are part of the measured content.
        if self.callbacks.on_next_voltage_level.is_some() {
            for planned in plan_arrows(&self.metadata, scene, config) {
                let glyph = insert_arrow(scene, planned.anchor, &planned.placement, config);
                tracing::trace!(
                    id = %planned.placement.element_id,
                    next = %planned.placement.next_voltage_level_id,
                    "navigation arrow inserted"
                );
                self.bindings.insert(
                    glyph.group,
                    Binding::Arrow(ArrowBinding {
                        element_id: format!("{}-arrow", planned.placement.element_id),
                        glyph,
                        next_voltage_level_id: planned.placement.next_voltage_level_id.clone(),
                        tracker: ClickTracker::default(),
                    }),
                );
                self.arrows.push(planned.placement);
            }
        }

        let bounds = self
            .options
            .measurer
            .bbox(scene, content)
            .ok_or(Error::EmptyBounds)?;
        let natural = ViewBox::around(&bounds, config.bbox_margin);
        let zoom_range = ZoomRange::for_svg_type(&self.options.svg_type);
        let viewport = Viewport::fit(natural, &self.options.constraints, zoom_range);
        write_viewport(scene, &viewport);
        for name in ["width", "height", "viewBox"] {
            scene.remove_attr(content, name);
        }

        container.set_cursor(Cursor::Default);

        let scene = container.scene_mut().ok_or(Error::MissingContainer)?;
        if self.callbacks.on_breaker.is_some() {
            for switch in bind_switches(&self.metadata, scene) {
                self.bindings
                    .entry(switch.element)
                    .or_insert(Binding::Switch(switch));
            }
        }
        if self.callbacks.on_feeder.is_some() {
            for feeder in bind_feeders(&self.metadata, scene, config) {
                self.bindings
                    .entry(feeder.label)
                    .or_insert(Binding::Feeder(feeder));
            }
        }

        tracing::debug!(
            width = viewport.width,
            height = viewport.height,
            view_box = %viewport.view_box,
            arrows = self.arrows.len(),
            bindings = self.bindings.len(),
            "diagram initialized"
        );
        self.viewport = Some(viewport);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.viewport.is_some()
    }

    /// Binds a new container and initializes against it.
    pub fn attach(&mut self, container: Container) -> bool {
        self.container = Some(container);
        self.initialize()
    }

    /// Releases the container, leaving the viewer uninitialized.
    pub fn detach(&mut self) -> Option<Container> {
        self.reset_state();
        self.container.take()
    }

    /// Swaps the container without re-initializing; state bound to the previous container is
    /// dropped. Returns the previous container.
    pub fn set_container(&mut self, container: Option<Container>) -> Option<Container> {
        self.reset_state();
        std::mem::replace(&mut self.container, container)
    }

    pub fn set_svg_content(&mut self, svg_content: impl Into<String>) -> bool {
        self.svg_content = svg_content.into();
        self.initialize()
    }

    pub fn set_metadata(&mut self, metadata: DiagramMetadata) -> bool {
        self.metadata = metadata;
        self.initialize()
    }

    pub fn container(&self) -> Option<&Container> {
        self.container.as_ref()
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.container.as_ref().and_then(Container::scene)
    }

    pub fn svg_content(&self) -> &str {
        &self.svg_content
    }

    pub fn metadata(&self) -> &DiagramMetadata {
        &self.metadata
    }

    pub fn options(&self) -> &ViewerOptions {
        &self.options
    }

    /// Navigation arrows synthesized by the last initialization.
    pub fn arrows(&self) -> &[ArrowPlacement] {
        &self.arrows
    }

    /// Interactive elements, in the order their target nodes were created.
    pub fn interactions(&self) -> Vec<Interaction> {
        let mut out = self
            .bindings
            .iter()
            .map(|(target, b)| b.interaction(*target))
            .collect::<Vec<_>>();
        out.sort_by_key(|i| i.target);
        out
    }

    pub fn viewport(&self) -> Option<&Viewport> {
        self.viewport.as_ref()
    }

    pub fn zoom_range(&self) -> ZoomRange {
        ZoomRange::for_svg_type(&self.options.svg_type)
    }

    pub fn width(&self) -> Option<f64> {
        self.viewport.as_ref().map(|v| v.width)
    }

    pub fn height(&self) -> Option<f64> {
        self.viewport.as_ref().map(|v| v.height)
    }

    pub fn view_box(&self) -> Option<ViewBox> {
        self.viewport.as_ref().map(|v| v.view_box)
    }

    /// Resizes the surface, kept within the configured size constraints.
    pub fn set_width(&mut self, width: f64) {
        let c = self.options.constraints;
        let width = clamp_dimension(width, c.min_width, c.max_width);
        self.update_viewport(|v| v.width = width);
    }

    /// Resizes the surface, kept within the configured size constraints.
    pub fn set_height(&mut self, height: f64) {
        let c = self.options.constraints;
        let height = clamp_dimension(height, c.min_height, c.max_height);
        self.update_viewport(|v| v.height = height);
    }

    pub fn set_view_box(&mut self, view_box: ViewBox) {
        self.update_viewport(|v| v.view_box = view_box);
    }

    /// Programmatic zoom around a content point; not limited by the zoom range.
    pub fn zoom_to(&mut self, level: f64, anchor: (f64, f64)) {
        self.update_viewport(|v| v.zoom_to(level, anchor));
    }

    /// Interactive wheel zoom around a surface point.
    pub fn wheel(&mut self, delta_y: f64, client_x: f64, client_y: f64) {
        self.update_viewport(|v| v.zoom_by_wheel(delta_y, (client_x, client_y)));
    }

    /// Pans by a surface-pixel delta.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.update_viewport(|v| v.pan_by_client(dx, dy));
    }

    /// Restores the view box computed at initialization.
    pub fn reset_view(&mut self) {
        self.update_viewport(Viewport::reset);
    }

    fn update_viewport(&mut self, f: impl FnOnce(&mut Viewport)) {
        let Some(viewport) = self.viewport.as_mut() else {
            return;
        };
        f(viewport);
        if let Some(scene) = self.container.as_mut().and_then(Container::scene_mut) {
            write_viewport(scene, viewport);
        }
    }

    /// Dispatches `event` to the element with the given `id` attribute.
    pub fn dispatch_by_id(&mut self, id: &str, event: PointerEvent) -> Option<EventOutcome> {
        let target = self.scene()?.element_by_id(id)?;
        Some(self.dispatch(target, event))
    }

    /// Delivers a pointer event aimed at `target`.
    ///
    /// Enter/leave reach the nearest interactive ancestor-or-self of the target. Other events
    /// reach every interactive ancestor-or-self, innermost first, then the pan layer.
    pub fn dispatch(&mut self, target: NodeId, event: PointerEvent) -> EventOutcome {
        let mut outcome = EventOutcome::default();
        let Some(scene) = self.container.as_mut().and_then(Container::scene_mut) else {
            return outcome;
        };
        if !scene.contains(target) {
            return outcome;
        }
        let path = scene
            .ancestors(target)
            .filter(|n| self.bindings.contains_key(n))
            .collect::<Vec<_>>();

        match event.kind {
            PointerEventKind::Enter | PointerEventKind::Leave => {
                if let Some(binding) = path.first().and_then(|n| self.bindings.get_mut(n)) {
                    deliver(
                        binding,
                        &event,
                        scene,
                        &self.options,
                        &mut self.callbacks,
                        &mut outcome,
                    );
                }
                return outcome;
            }
            PointerEventKind::Move => {
                // Any movement turns a pending press into a drag, wherever the pointer is.
                for binding in self.bindings.values_mut() {
                    if let Some(tracker) = binding.tracker_mut() {
                        tracker.handle(&event);
                    }
                }
            }
            PointerEventKind::Up => {
                for (node, binding) in self.bindings.iter_mut() {
                    if path.contains(node) {
                        continue;
                    }
                    if let Some(tracker) = binding.tracker_mut() {
                        tracker.reset();
                    }
                }
                for node in &path {
                    if let Some(binding) = self.bindings.get_mut(node) {
                        deliver(
                            binding,
                            &event,
                            scene,
                            &self.options,
                            &mut self.callbacks,
                            &mut outcome,
                        );
                    }
                }
            }
            PointerEventKind::Down | PointerEventKind::ContextMenu => {
                for node in &path {
                    if let Some(binding) = self.bindings.get_mut(node) {
                        deliver(
                            binding,
                            &event,
                            scene,
                            &self.options,
                            &mut self.callbacks,
                            &mut outcome,
                        );
                    }
                }
            }
        }

        self.pan_layer(&event);
        outcome
    }

    fn pan_layer(&mut self, event: &PointerEvent) {
        if self.viewport.is_none() {
            return;
        }
        match event.kind {
            PointerEventKind::Down if event.button == MouseButton::Primary => {
                self.pan = Some((event.client_x, event.client_y));
                if let Some(container) = self.container.as_mut() {
                    container.set_cursor(Cursor::Move);
                }
            }
            PointerEventKind::Move => {
                let Some((x, y)) = self.pan else {
                    return;
                };
                self.pan = Some((event.client_x, event.client_y));
                self.pan_by(event.client_x - x, event.client_y - y);
            }
            PointerEventKind::Up => {
                if self.pan.take().is_none() {
                    return;
                }
                if let Some(container) = self.container.as_mut() {
                    container.set_cursor(Cursor::Default);
                }
            }
            _ => {}
        }
    }
}

fn write_viewport(scene: &mut Scene, viewport: &Viewport) {
    let surface = scene.root();
    scene.set_attr(surface, "width", viewport.width.to_string());
    scene.set_attr(surface, "height", viewport.height.to_string());
    scene.set_attr(surface, "viewBox", viewport.view_box.to_string());
}

fn deliver(
    binding: &mut Binding,
    event: &PointerEvent,
    scene: &mut Scene,
    options: &ViewerOptions,
    callbacks: &mut ViewerCallbacks,
    outcome: &mut EventOutcome,
) {
    match binding {
        Binding::Switch(switch) => {
            let Some(requested) = switch.handle(event) else {
                return;
            };
            if let Some(cb) = callbacks.on_breaker.as_mut() {
                tracing::debug!(
                    equipment = %switch.equipment_id,
                    open = requested,
                    "switch toggle requested"
                );
                cb(&switch.equipment_id, requested, switch.element);
                outcome.callbacks_fired += 1;
            }
        }
        Binding::Arrow(arrow) => match event.kind {
            PointerEventKind::Enter => {
                set_arrow_hover(scene, &arrow.glyph, true, &options.selection_color);
            }
            PointerEventKind::Leave => {
                set_arrow_hover(scene, &arrow.glyph, false, &options.selection_color);
            }
            _ => {
                if !arrow.tracker.handle(event) {
                    return;
                }
                if let Some(cb) = callbacks.on_next_voltage_level.as_mut() {
                    tracing::debug!(next = %arrow.next_voltage_level_id, "navigation requested");
                    cb(&arrow.next_voltage_level_id);
                    outcome.callbacks_fired += 1;
                }
            }
        },
        Binding::Feeder(feeder) => match event.kind {
            PointerEventKind::Enter => feeder.show_highlight(
                scene,
                options.measurer.as_ref(),
                &options.config,
                &options.selection_color,
            ),
            PointerEventKind::Leave => feeder.hide_highlight(scene),
            PointerEventKind::ContextMenu => {
                outcome.default_prevented = true;
                if let Some(cb) = callbacks.on_feeder.as_mut() {
                    tracing::debug!(equipment = %feeder.equipment_id, "feeder menu requested");
                    cb(
                        &feeder.equipment_id,
                        feeder.component_type.as_deref(),
                        &feeder.element_id,
                        event.client_x,
                        event.client_y,
                    );
                    outcome.callbacks_fired += 1;
                }
            }
            _ => {}
        },
    }
}
