use sldview::geom::parse_length;
use sldview::{
    Bounds, Container, Cursor, DiagramMetadata, DiagramViewer, Error, InteractionKind, NodeId,
    PointerEvent, Scene, SceneMeasurer, SizeConstraints, ViewBox, ViewerCallbacks, ViewerConfig,
    ViewerOptions,
};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

/// Rects report their attributes; text is 8 units per char, 10 high, sitting on its baseline.
struct BoxMeasurer;

impl SceneMeasurer for BoxMeasurer {
    fn shape_bounds(&self, scene: &Scene, node: NodeId) -> Option<Bounds> {
        let num = |name: &str| scene.attr(node, name).and_then(parse_length).unwrap_or(0.0);
        match scene.tag(node)? {
            "rect" => Some(Bounds::new(num("x"), num("y"), num("width"), num("height"))),
            "text" => {
                let chars = scene.text_content(node).chars().count() as f64;
                Some(Bounds::new(num("x"), num("y") - 10.0, chars * 8.0, 10.0))
            }
            _ => None,
        }
    }
}

const SCENARIO_SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="999" height="999" viewBox="0 0 999 999">
  <rect x="0" y="0" width="400" height="300"/>
  <g id="A" transform="translate(50,50)"><rect width="10" height="10"/></g>
  <g id="B" transform="translate(100,100)">
    <rect width="10" height="40"/>
    <text class="sld-label" x="12" y="20">LN1</text>
  </g>
</svg>"#;

const SCENARIO_METADATA: &str = r#"{
  "nodes": [
    { "id": "A", "componentType": "BREAKER", "equipmentId": "BRK1", "open": true },
    { "id": "B", "componentType": "LINE", "equipmentId": "LN1", "voltageLevelId": "VL1" }
  ]
}"#;

fn options() -> ViewerOptions {
    ViewerOptions {
        constraints: SizeConstraints::new(100.0, 100.0, 1000.0, 1000.0),
        selection_color: "red".to_string(),
        measurer: Arc::new(BoxMeasurer),
        ..Default::default()
    }
}

type Breakers = Rc<RefCell<Vec<(String, bool, NodeId)>>>;
type Feeders = Rc<RefCell<Vec<(String, Option<String>, String, f64, f64)>>>;
type Navigations = Rc<RefCell<Vec<String>>>;

struct Recorder {
    breakers: Breakers,
    feeders: Feeders,
    navigations: Navigations,
}

impl Recorder {
    fn new() -> Self {
        Self {
            breakers: Rc::default(),
            feeders: Rc::default(),
            navigations: Rc::default(),
        }
    }

    fn callbacks(&self) -> ViewerCallbacks {
        let breakers = Rc::clone(&self.breakers);
        let feeders = Rc::clone(&self.feeders);
        let navigations = Rc::clone(&self.navigations);
        ViewerCallbacks::default()
            .with_breaker(move |eq, open, el| {
                breakers.borrow_mut().push((eq.to_string(), open, el))
            })
            .with_feeder(move |eq, ty, id, x, y| {
                feeders.borrow_mut().push((
                    eq.to_string(),
                    ty.map(str::to_string),
                    id.to_string(),
                    x,
                    y,
                ))
            })
            .with_next_voltage_level(move |vl| {
                navigations.borrow_mut().push(vl.to_string())
            })
    }
}

fn scenario_viewer(recorder: &Recorder) -> DiagramViewer {
    let metadata = DiagramMetadata::from_json(SCENARIO_METADATA).expect("metadata");
    DiagramViewer::new(
        Some(Container::new()),
        SCENARIO_SVG,
        metadata,
        options(),
        recorder.callbacks(),
    )
}

fn element(viewer: &DiagramViewer, id: &str) -> NodeId {
    viewer
        .scene()
        .and_then(|s| s.element_by_id(id))
        .unwrap_or_else(|| panic!("element {id}"))
}

#[test]
fn scenario_viewport_matches_padded_content() {
    let recorder = Recorder::new();
    let viewer = scenario_viewer(&recorder);
    assert!(viewer.is_initialized());
    assert_eq!(viewer.width(), Some(440.0));
    assert_eq!(viewer.height(), Some(340.0));
    assert_eq!(
        viewer.view_box(),
        Some(ViewBox::new(-20.0, -20.0, 440.0, 340.0))
    );

    let container = viewer.container().expect("container");
    let scene = container.scene().expect("scene");
    let surface = container.surface().expect("surface");
    assert_eq!(scene.attr(surface, "viewBox"), Some("-20 -20 440 340"));
    assert_eq!(scene.attr(surface, "width"), Some("440"));

    let content = container.content().expect("content");
    for name in ["width", "height", "viewBox"] {
        assert_eq!(scene.attr(content, name), None, "{name} should be stripped");
    }
    assert_eq!(container.cursor(), Cursor::Default);

    let wired = viewer
        .interactions()
        .into_iter()
        .map(|i| (i.kind, i.element_id))
        .collect::<Vec<_>>();
    assert_eq!(
        wired,
        vec![
            (InteractionKind::Switch, "A".to_string()),
            (InteractionKind::Feeder, "B".to_string()),
        ]
    );
}

#[test]
fn scenario_breaker_click_requests_toggle() {
    let recorder = Recorder::new();
    let mut viewer = scenario_viewer(&recorder);
    let a = element(&viewer, "A");
    let rect = viewer.scene().expect("scene").children(a)[0];

    viewer.dispatch(rect, PointerEvent::down(60.0, 60.0));
    let outcome = viewer.dispatch(rect, PointerEvent::up(60.0, 60.0));
    assert_eq!(outcome.callbacks_fired, 1);
    assert_eq!(
        recorder.breakers.borrow().as_slice(),
        &[("BRK1".to_string(), false, a)]
    );
    assert_eq!(
        viewer.scene().expect("scene").style_property(a, "cursor"),
        Some("pointer")
    );
}

#[test]
fn scenario_feeder_hover_and_context_menu() {
    let recorder = Recorder::new();
    let mut viewer = scenario_viewer(&recorder);
    let label = viewer
        .scene()
        .and_then(|s| {
            let b = s.element_by_id("B")?;
            s.descendants(b).find(|&n| s.tag(n) == Some("text"))
        })
        .expect("label");

    viewer.dispatch(label, PointerEvent::enter());
    {
        let scene = viewer.scene().expect("scene");
        let parent = scene.parent(label).expect("parent");
        let siblings = scene.children(parent);
        let pos = siblings.iter().position(|&n| n == label).expect("label");
        let rect = siblings[pos - 1];
        assert_eq!(scene.tag(rect), Some("rect"));
        assert!(scene.has_class(rect, "sld-label-highlight"));
        // Label box (12,10)-(36,20) grown by 4 on every side.
        assert_eq!(scene.attr(rect, "x"), Some("8"));
        assert_eq!(scene.attr(rect, "y"), Some("6"));
        assert_eq!(scene.attr(rect, "width"), Some("32"));
        assert_eq!(scene.attr(rect, "height"), Some("18"));
        assert_eq!(scene.style_property(label, "fill"), Some("red"));
    }

    let outcome = viewer.dispatch(label, PointerEvent::context_menu(321.0, 123.0));
    assert!(outcome.default_prevented);
    assert_eq!(outcome.callbacks_fired, 1);
    assert_eq!(
        recorder.feeders.borrow().as_slice(),
        &[(
            "LN1".to_string(),
            Some("LINE".to_string()),
            "B".to_string(),
            321.0,
            123.0
        )]
    );

    viewer.dispatch(label, PointerEvent::leave());
    let scene = viewer.scene().expect("scene");
    let parent = scene.parent(label).expect("parent");
    assert!(
        scene
            .children(parent)
            .iter()
            .all(|&n| scene.tag(n) != Some("rect") || !scene.has_class(n, "sld-label-highlight"))
    );
    assert_eq!(scene.style_property(label, "fill"), None);
}

#[test]
fn dragging_never_clicks() {
    let recorder = Recorder::new();
    let mut viewer = scenario_viewer(&recorder);
    let a = element(&viewer, "A");

    viewer.dispatch(a, PointerEvent::down(60.0, 60.0));
    assert_eq!(
        viewer.container().expect("container").cursor(),
        Cursor::Move
    );
    viewer.dispatch(a, PointerEvent::moved(70.0, 60.0));
    let outcome = viewer.dispatch(a, PointerEvent::up(70.0, 60.0));
    assert_eq!(outcome.callbacks_fired, 0);
    assert!(recorder.breakers.borrow().is_empty());

    // The drag panned the view instead.
    assert_eq!(
        viewer.view_box(),
        Some(ViewBox::new(-30.0, -20.0, 440.0, 340.0))
    );
    assert_eq!(
        viewer.container().expect("container").cursor(),
        Cursor::Default
    );

    // Press on one element, release on another: no click either.
    let b = element(&viewer, "B");
    viewer.dispatch(a, PointerEvent::down(60.0, 60.0));
    viewer.dispatch(b, PointerEvent::up(60.0, 60.0));
    viewer.dispatch(a, PointerEvent::up(60.0, 60.0));
    assert!(recorder.breakers.borrow().is_empty());
}

#[test]
fn secondary_button_never_clicks() {
    let recorder = Recorder::new();
    let mut viewer = scenario_viewer(&recorder);
    let a = element(&viewer, "A");
    let secondary = sldview::MouseButton::Secondary;
    viewer.dispatch(a, PointerEvent::down(0.0, 0.0).with_button(secondary));
    viewer.dispatch(a, PointerEvent::up(0.0, 0.0).with_button(secondary));
    assert!(recorder.breakers.borrow().is_empty());
}

#[test]
fn reinitialization_is_idempotent() {
    let recorder = Recorder::new();
    let metadata = DiagramMetadata::from_json(
        r#"{ "nodes": [
            { "id": "F1", "voltageLevelId": "VL1", "nextVoltageLevelId": "VL2",
              "componentType": "LINE", "direction": "TOP" }
        ] }"#,
    )
    .expect("metadata");
    let svg = r#"<svg><rect width="200" height="200"/><g id="F1" transform="translate(100,100)"/></svg>"#;
    let mut viewer = DiagramViewer::new(
        Some(Container::new()),
        svg,
        metadata,
        options(),
        recorder.callbacks(),
    );
    let first = viewer.container().expect("container").markup();
    let view_box = viewer.view_box();
    assert_eq!(viewer.arrows().len(), 1);

    assert!(viewer.reinitialize());
    assert!(viewer.reinitialize());
    assert_eq!(viewer.container().expect("container").markup(), first);
    assert_eq!(viewer.view_box(), view_box);
    assert_eq!(viewer.arrows().len(), 1);
    assert_eq!(first.matches("F1-arrow").count(), 1);
}

#[test]
fn arrows_navigate_and_skip_self_loops() {
    let recorder = Recorder::new();
    let metadata = DiagramMetadata::from_json(
        r#"{ "nodes": [
            { "id": "T", "vid": "VL1", "nextVId": "VL2", "componentType": "LINE", "direction": "TOP" },
            { "id": "S", "vid": "VL1", "nextVId": "VL3", "componentType": "LINE", "direction": "BOTTOM" },
            { "id": "L", "vid": "VL3", "nextVId": "VL1", "componentType": "LINE", "direction": "TOP" }
        ] }"#,
    )
    .expect("metadata");
    let svg = r#"<svg>
        <rect width="400" height="400"/>
        <g id="T" transform="translate(100,100)"/>
        <g id="S" transform="translate(200,300)"/>
        <g id="L" transform="translate(300,100)"/>
    </svg>"#;
    let mut viewer = DiagramViewer::new(
        Some(Container::new()),
        svg,
        metadata,
        options(),
        recorder.callbacks(),
    );

    // VL3 is drawn here, so S leads nowhere new; L points back at VL1.
    let ids = viewer
        .arrows()
        .iter()
        .map(|a| a.element_id.as_str())
        .collect::<Vec<_>>();
    assert_eq!(ids, vec!["T"]);
    assert_eq!(viewer.arrows()[0].center, (78.0, 35.0));

    let group = element(&viewer, "T-arrow");
    let glyph = *viewer
        .scene()
        .expect("scene")
        .children(group)
        .last()
        .expect("glyph");

    viewer.dispatch(glyph, PointerEvent::enter());
    assert_eq!(
        viewer.scene().expect("scene").style_property(glyph, "fill"),
        Some("red")
    );
    viewer.dispatch(glyph, PointerEvent::leave());
    assert_eq!(
        viewer.scene().expect("scene").style_property(glyph, "fill"),
        Some("currentColor")
    );

    viewer.dispatch(glyph, PointerEvent::down(0.0, 0.0));
    viewer.dispatch(glyph, PointerEvent::up(0.0, 0.0));
    assert_eq!(recorder.navigations.borrow().as_slice(), &["VL2".to_string()]);
}

#[test]
fn arrows_ignore_drags_and_secondary_presses() {
    let recorder = Recorder::new();
    let metadata = DiagramMetadata::from_json(
        r#"{ "nodes": [
            { "id": "T", "vid": "VL1", "nextVId": "VL2", "componentType": "LINE", "direction": "TOP" }
        ] }"#,
    )
    .expect("metadata");
    let mut viewer = DiagramViewer::new(
        Some(Container::new()),
        r#"<svg><rect width="400" height="400"/><g id="T" transform="translate(100,100)"/></svg>"#,
        metadata,
        options(),
        recorder.callbacks(),
    );
    let group = element(&viewer, "T-arrow");

    viewer.dispatch(group, PointerEvent::down(10.0, 10.0));
    viewer.dispatch(group, PointerEvent::moved(30.0, 10.0));
    let outcome = viewer.dispatch(group, PointerEvent::up(30.0, 10.0));
    assert_eq!(outcome.callbacks_fired, 0);
    assert!(recorder.navigations.borrow().is_empty());

    let secondary = sldview::MouseButton::Secondary;
    viewer.dispatch(group, PointerEvent::down(10.0, 10.0).with_button(secondary));
    viewer.dispatch(group, PointerEvent::up(10.0, 10.0).with_button(secondary));
    assert!(recorder.navigations.borrow().is_empty());

    viewer.dispatch(group, PointerEvent::down(10.0, 10.0));
    viewer.dispatch(group, PointerEvent::up(10.0, 10.0));
    assert_eq!(recorder.navigations.borrow().as_slice(), &["VL2".to_string()]);
}

#[test]
fn surface_setters_respect_constraints() {
    let recorder = Recorder::new();
    let mut viewer = scenario_viewer(&recorder);
    viewer.set_width(5000.0);
    viewer.set_height(1.0);
    assert_eq!(viewer.width(), Some(1000.0));
    assert_eq!(viewer.height(), Some(100.0));

    viewer.set_width(640.0);
    assert_eq!(viewer.width(), Some(640.0));
    let markup = viewer.container().expect("container").markup();
    assert!(markup.contains(r#"width="640""#), "{markup}");
}

#[test]
fn empty_content_keeps_the_current_diagram() {
    let recorder = Recorder::new();
    let mut viewer = scenario_viewer(&recorder);
    let view_box = viewer.view_box();

    assert!(!viewer.set_svg_content(""));
    assert!(viewer.is_initialized());
    assert_eq!(viewer.view_box(), view_box);

    let a = element(&viewer, "A");
    viewer.dispatch(a, PointerEvent::down(60.0, 60.0));
    viewer.dispatch(a, PointerEvent::up(60.0, 60.0));
    assert_eq!(recorder.breakers.borrow().len(), 1);
    assert_eq!(recorder.breakers.borrow()[0].0, "BRK1");
}

#[test]
fn missing_callbacks_omit_features() {
    let metadata = DiagramMetadata::from_json(SCENARIO_METADATA).expect("metadata");
    let mut viewer = DiagramViewer::new(
        Some(Container::new()),
        SCENARIO_SVG,
        metadata,
        options(),
        ViewerCallbacks::default(),
    );
    assert!(viewer.is_initialized());
    let a = element(&viewer, "A");
    assert_eq!(
        viewer.scene().expect("scene").style_property(a, "cursor"),
        None
    );
    let b = element(&viewer, "B");
    let outcome = viewer.dispatch(b, PointerEvent::context_menu(1.0, 1.0));
    assert!(!outcome.default_prevented);
}

#[test]
fn surface_size_stays_within_constraints() {
    let recorder = Recorder::new();
    let sizes = [1.0, 50.0, 99.0, 100.0, 640.0, 1000.0, 1001.0, 5000.0];
    let constraints = [(100.0, 100.0, 1000.0, 1000.0), (10.0, 300.0, 300.0, 800.0)];
    for &(min_w, min_h, max_w, max_h) in &constraints {
        for &w in &sizes {
            for &h in &sizes {
                let svg = format!(r#"<svg><rect width="{w}" height="{h}"/></svg>"#);
                let viewer = DiagramViewer::new(
                    Some(Container::new()),
                    svg,
                    DiagramMetadata::default(),
                    ViewerOptions {
                        constraints: SizeConstraints::new(min_w, min_h, max_w, max_h),
                        ..options()
                    },
                    recorder.callbacks(),
                );
                let (width, height) = (
                    viewer.width().expect("width"),
                    viewer.height().expect("height"),
                );
                assert!((min_w..=max_w).contains(&width), "{w}x{h} -> width {width}");
                assert!((min_h..=max_h).contains(&height), "{w}x{h} -> height {height}");
            }
        }
    }
}

#[test]
fn oversized_content_zooms_out_from_the_top_left() {
    let recorder = Recorder::new();
    let viewer = DiagramViewer::new(
        Some(Container::new()),
        r#"<svg><rect width="2000" height="1000"/></svg>"#,
        DiagramMetadata::default(),
        ViewerOptions {
            constraints: SizeConstraints::new(100.0, 100.0, 800.0, 700.0),
            config: ViewerConfig {
                bbox_margin: 0.0,
                ..Default::default()
            },
            ..options()
        },
        recorder.callbacks(),
    );
    let viewport = viewer.viewport().expect("viewport");
    assert_eq!((viewport.width, viewport.height), (800.0, 700.0));
    assert_eq!(viewport.view_box, ViewBox::new(0.0, 0.0, 2000.0, 1750.0));
    assert!((viewport.zoom() - 0.4).abs() < 1e-9);

    // 0.4 is below the voltage-level minimum; zooming out must not jump in to 0.5.
    let mut viewer = viewer;
    viewer.wheel(100.0, 0.0, 0.0);
    assert!((viewer.viewport().expect("viewport").zoom() - 0.4).abs() < 1e-9);
    viewer.wheel(-100.0, 0.0, 0.0);
    assert!(viewer.viewport().expect("viewport").zoom() > 0.4);
}

#[test]
fn zoom_range_depends_on_svg_type() {
    let recorder = Recorder::new();
    let build = |svg_type: &str| {
        DiagramViewer::new(
            Some(Container::new()),
            r#"<svg><rect width="400" height="400"/></svg>"#,
            DiagramMetadata::default(),
            ViewerOptions {
                svg_type: svg_type.to_string(),
                ..options()
            },
            recorder.callbacks(),
        )
    };

    let mut vl = build("voltage-level");
    assert_eq!((vl.zoom_range().min, vl.zoom_range().max), (0.5, 10.0));
    for _ in 0..40 {
        vl.wheel(100.0, 0.0, 0.0);
    }
    assert!((vl.viewport().expect("viewport").zoom() - 0.5).abs() < 1e-9);

    let mut sub = build("substation");
    assert_eq!((sub.zoom_range().min, sub.zoom_range().max), (0.1, 10.0));
    for _ in 0..80 {
        sub.wheel(100.0, 0.0, 0.0);
    }
    assert!((sub.viewport().expect("viewport").zoom() - 0.1).abs() < 1e-9);

    // Programmatic zoom ignores the range.
    sub.zoom_to(0.05, (0.0, 0.0));
    assert!((sub.viewport().expect("viewport").zoom() - 0.05).abs() < 1e-9);
    sub.reset_view();
    assert!((sub.viewport().expect("viewport").zoom() - 1.0).abs() < 1e-9);
}

#[test]
fn preconditions_fail_quietly() {
    let recorder = Recorder::new();
    let mut viewer = DiagramViewer::new(
        None,
        SCENARIO_SVG,
        DiagramMetadata::default(),
        options(),
        recorder.callbacks(),
    );
    assert!(!viewer.is_initialized());
    assert!(matches!(viewer.try_initialize(), Err(Error::MissingContainer)));

    assert!(viewer.attach(Container::new()));
    assert!(!viewer.set_svg_content(""));
    assert!(matches!(viewer.try_initialize(), Err(Error::EmptyContent)));

    assert!(!viewer.set_svg_content("<svg"));
    assert!(matches!(
        viewer.try_initialize(),
        Err(Error::Markup(_) | Error::NoRootElement)
    ));
    assert!(viewer.container().expect("container").is_empty());
    assert_eq!(viewer.width(), None);

    let detached = viewer.detach().expect("container");
    assert!(detached.is_empty());
    assert!(!viewer.is_initialized());
}
