//! Owned, mutable SVG element tree.
//!
//! Nodes live in an arena and are addressed by [`NodeId`]. Removing a node detaches its subtree;
//! the slots are never reused, so stale ids keep pointing at detached nodes instead of at
//! unrelated elements.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use std::fmt::Write as _;

const XLINK_NS: &str = "http://www.w3.org/1999/xlink";
const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
enum NodeKind {
    Element {
        name: String,
        attrs: IndexMap<String, String>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct Scene {
    nodes: Vec<NodeData>,
    root: NodeId,
}

impl Scene {
    /// Creates a scene holding a single, empty root element.
    pub fn new(root_tag: &str) -> Self {
        let mut scene = Self {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        scene.root = scene.create_element(root_tag);
        scene
    }

    /// Parses standalone markup; its document element becomes the scene root.
    pub fn parse(markup: &str) -> Result<Self> {
        let doc = parse_document(markup)?;
        let mut scene = Self {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        scene.root = scene.import(doc.root_element(), true);
        Ok(scene)
    }

    /// Parses `markup` and appends its document element under `parent`.
    pub fn mount(&mut self, parent: NodeId, markup: &str) -> Result<NodeId> {
        let doc = parse_document(markup)?;
        let id = self.import(doc.root_element(), true);
        self.append_child(parent, id);
        Ok(id)
    }

    fn import(&mut self, node: roxmltree::Node<'_, '_>, declare_namespaces: bool) -> NodeId {
        let mut attrs = IndexMap::new();
        if declare_namespaces {
            for ns in node.namespaces() {
                match ns.name() {
                    Some("xml") => {}
                    Some(prefix) => {
                        attrs.insert(format!("xmlns:{prefix}"), ns.uri().to_string());
                    }
                    None => {
                        attrs.insert("xmlns".to_string(), ns.uri().to_string());
                    }
                }
            }
        }
        for a in node.attributes() {
            let name = match a.namespace() {
                Some(XLINK_NS) => format!("xlink:{}", a.name()),
                Some(XML_NS) => format!("xml:{}", a.name()),
                _ => a.name().to_string(),
            };
            attrs.insert(name, a.value().to_string());
        }

        let name = node.tag_name().name();
        // Spacing between text runs is content; elsewhere it is indentation.
        let keep_blank_text = matches!(name, "text" | "tspan");
        let id = self.push(NodeKind::Element {
            name: name.to_string(),
            attrs,
        });
        for child in node.children() {
            let child_id = if child.is_element() {
                self.import(child, false)
            } else if child.is_text() {
                let text = child.text().unwrap_or_default();
                if text.trim().is_empty() && !keep_blank_text {
                    continue;
                }
                self.push(NodeKind::Text(text.to_string()))
            } else {
                continue;
            };
            self.append_child(id, child_id);
        }
        id
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Whether `id` was allocated by this scene.
    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Pre-order traversal of `id` and everything below it.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            scene: self,
            stack: vec![id],
        }
    }

    /// Walks from `id` up to the root, `id` included.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(id), |n| self.parent(*n))
    }

    /// Whether `id` is still reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.ancestors(id).last() == Some(self.root)
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].kind, NodeKind::Element { .. })
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Element { name, .. } => Some(name.as_str()),
            NodeKind::Text(_) => None,
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Element { attrs, .. } => attrs.get(name).map(String::as_str),
            NodeKind::Text(_) => None,
        }
    }

    pub fn attrs(&self, id: NodeId) -> impl Iterator<Item = (&str, &str)> {
        let attrs = match &self.nodes[id.0].kind {
            NodeKind::Element { attrs, .. } => Some(attrs),
            NodeKind::Text(_) => None,
        };
        attrs
            .into_iter()
            .flat_map(|a| a.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        if let NodeKind::Element { attrs, .. } = &mut self.nodes[id.0].kind {
            attrs.insert(name.to_string(), value.into());
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Option<String> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Element { attrs, .. } => attrs.shift_remove(name),
            NodeKind::Text(_) => None,
        }
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attr(id, "class")
            .is_some_and(|c| c.split_whitespace().any(|c| c == class))
    }

    pub fn style_property(&self, id: NodeId, property: &str) -> Option<&str> {
        let style = self.attr(id, "style")?;
        parse_style(style)
            .into_iter()
            .find(|(k, _)| *k == property)
            .map(|(_, v)| v)
    }

    pub fn set_style_property(&mut self, id: NodeId, property: &str, value: &str) {
        let mut decls = self
            .attr(id, "style")
            .map(parse_style)
            .unwrap_or_default()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<IndexMap<_, _>>();
        decls.insert(property.to_string(), value.to_string());
        self.set_attr(id, "style", format_style(&decls));
    }

    pub fn remove_style_property(&mut self, id: NodeId, property: &str) {
        let Some(style) = self.attr(id, "style") else {
            return;
        };
        let decls = parse_style(style)
            .into_iter()
            .filter(|(k, _)| *k != property)
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<IndexMap<_, _>>();
        if decls.is_empty() {
            self.remove_attr(id, "style");
        } else {
            self.set_attr(id, "style", format_style(&decls));
        }
    }

    /// Creates a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeKind::Element {
            name: tag.to_string(),
            attrs: IndexMap::new(),
        })
    }

    /// Creates a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Text(text.to_string()))
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Inserts `node` as the previous sibling of `reference`. No-op when `reference` is the root.
    pub fn insert_before(&mut self, reference: NodeId, node: NodeId) {
        self.insert_sibling(reference, node, 0);
    }

    /// Inserts `node` as the next sibling of `reference`. No-op when `reference` is the root.
    pub fn insert_after(&mut self, reference: NodeId, node: NodeId) {
        self.insert_sibling(reference, node, 1);
    }

    fn insert_sibling(&mut self, reference: NodeId, node: NodeId, offset: usize) {
        let Some(parent) = self.parent(reference) else {
            return;
        };
        self.detach(node);
        let siblings = &mut self.nodes[parent.0].children;
        let Some(pos) = siblings.iter().position(|c| *c == reference) else {
            return;
        };
        siblings.insert(pos + offset, node);
        self.nodes[node.0].parent = Some(parent);
    }

    /// Detaches `id` (and its subtree) from the tree.
    pub fn remove(&mut self, id: NodeId) {
        self.detach(id);
    }

    pub fn clear_children(&mut self, id: NodeId) {
        for child in std::mem::take(&mut self.nodes[id.0].children) {
            self.nodes[child.0].parent = None;
        }
    }

    fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != id);
        }
    }

    /// Concatenated text of all text nodes below `id`.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for n in self.descendants(id) {
            if let NodeKind::Text(t) = &self.nodes[n.0].kind {
                out.push_str(t);
            }
        }
        out
    }

    /// First attached element carrying `id="..."`, in document order.
    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .find(|n| self.attr(*n, "id") == Some(id))
    }

    /// Snapshot of `id` attribute → element for the attached tree. Duplicate ids keep the
    /// first element in document order.
    pub fn id_index(&self) -> FxHashMap<&str, NodeId> {
        let mut index = FxHashMap::default();
        for n in self.descendants(self.root) {
            if let Some(id) = self.attr(n, "id") {
                index.entry(id).or_insert(n);
            }
        }
        index
    }

    pub fn to_markup(&self) -> String {
        self.markup_of(self.root)
    }

    pub fn markup_of(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_markup(id, &mut out);
        out
    }

    fn write_markup(&self, id: NodeId, out: &mut String) {
        match &self.nodes[id.0].kind {
            NodeKind::Text(t) => out.push_str(&escape_text(t)),
            NodeKind::Element { name, attrs } => {
                out.push('<');
                out.push_str(name);
                for (k, v) in attrs {
                    let _ = write!(out, r#" {k}="{}""#, escape_attr(v));
                }
                let children = &self.nodes[id.0].children;
                if children.is_empty() {
                    out.push_str("/>");
                    return;
                }
                out.push('>');
                for child in children {
                    self.write_markup(*child, out);
                }
                let _ = write!(out, "</{name}>");
            }
        }
    }
}

pub struct Descendants<'a> {
    scene: &'a Scene,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.scene.children(id).iter().rev().copied());
        Some(id)
    }
}

fn parse_document(markup: &str) -> Result<roxmltree::Document<'_>> {
    if markup.trim().is_empty() {
        return Err(Error::EmptyContent);
    }
    let opts = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..Default::default()
    };
    roxmltree::Document::parse_with_options(markup, opts).map_err(|e| match e {
        roxmltree::Error::NoRootNode => Error::NoRootElement,
        e => Error::Markup(e),
    })
}

fn parse_style(style: &str) -> Vec<(&str, &str)> {
    style
        .split(';')
        .filter_map(|decl| {
            let (k, v) = decl.split_once(':')?;
            let k = k.trim();
            (!k.is_empty()).then(|| (k, v.trim()))
        })
        .collect()
}

fn format_style(decls: &IndexMap<String, String>) -> String {
    decls
        .iter()
        .map(|(k, v)| format!("{k}: {v}"))
        .collect::<Vec<_>>()
        .join("; ")
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}
