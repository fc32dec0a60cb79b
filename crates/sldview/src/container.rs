use crate::error::Result;
use crate::scene::{NodeId, Scene};

const SVG_NS: &str = "http://www.w3.org/2000/svg";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Cursor {
    #[default]
    Default,
    Move,
}

impl Cursor {
    pub fn as_str(self) -> &'static str {
        match self {
            Cursor::Default => "default",
            Cursor::Move => "move",
        }
    }
}

impl std::fmt::Display for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rendering surface a viewer draws into.
///
/// Holds at most one live scene: an outer `<svg>` surface element owned by the viewer, with the
/// injected diagram markup mounted as its only child.
#[derive(Debug, Clone, Default)]
pub struct Container {
    scene: Option<Scene>,
    content: Option<NodeId>,
    cursor: Cursor,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces whatever the container shows with `markup`.
    ///
    /// The previous scene is dropped before parsing, so a failed injection leaves the container
    /// empty rather than showing stale content.
    pub fn inject(&mut self, markup: &str) -> Result<NodeId> {
        self.clear();
        let mut scene = Scene::new("svg");
        let surface = scene.root();
        scene.set_attr(surface, "xmlns", SVG_NS);
        let content = scene.mount(surface, markup)?;
        self.scene = Some(scene);
        self.content = Some(content);
        Ok(content)
    }

    pub fn clear(&mut self) {
        self.scene = None;
        self.content = None;
        self.cursor = Cursor::Default;
    }

    pub fn is_empty(&self) -> bool {
        self.scene.is_none()
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    pub fn scene_mut(&mut self) -> Option<&mut Scene> {
        self.scene.as_mut()
    }

    /// Outer surface element carrying the viewer-owned size and view box.
    pub fn surface(&self) -> Option<NodeId> {
        self.scene.as_ref().map(Scene::root)
    }

    /// Root element of the injected markup.
    pub fn content(&self) -> Option<NodeId> {
        self.content
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn set_cursor(&mut self, cursor: Cursor) {
        self.cursor = cursor;
        if let Some(scene) = self.scene.as_mut() {
            let surface = scene.root();
            scene.set_style_property(surface, "cursor", cursor.as_str());
        }
    }

    /// Serialized surface, or an empty string when nothing is shown.
    pub fn markup(&self) -> String {
        self.scene
            .as_ref()
            .map(Scene::to_markup)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn inject_mounts_markup_under_surface() {
        let mut c = Container::new();
        let content = c
            .inject(r#"<svg xmlns="http://www.w3.org/2000/svg"><rect id="r"/></svg>"#)
            .expect("inject");
        let scene = c.scene().expect("scene");
        assert_eq!(scene.parent(content), c.surface());
        assert!(scene.element_by_id("r").is_some());
        assert!(c.markup().starts_with("<svg xmlns="));
    }

    #[test]
    fn failed_injection_leaves_container_empty() {
        let mut c = Container::new();
        c.inject("<svg><g/></svg>").expect("inject");
        assert!(!c.is_empty());

        let err = c.inject("").expect_err("empty markup");
        assert!(matches!(err, Error::EmptyContent));
        assert!(c.is_empty());
        assert_eq!(c.markup(), "");
    }

    #[test]
    fn cursor_is_mirrored_on_surface_style() {
        let mut c = Container::new();
        c.inject("<svg/>").expect("inject");
        c.set_cursor(Cursor::Move);
        let scene = c.scene().expect("scene");
        assert_eq!(scene.style_property(scene.root(), "cursor"), Some("move"));
        assert_eq!(c.cursor().to_string(), "move");
    }
}
