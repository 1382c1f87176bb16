//! The host document the inspector runs against.
//!
//! This is an arena model of a rendered page: elements with tags, attribute
//! bags, viewport rectangles, and optional shadow subtrees. It exists so the
//! resolution engine has a concrete hit-testing and ancestry surface to walk;
//! agents reach it only through [`crate::agent::InspectAgent`], which keeps
//! the algorithms host-agnostic and lets tests assemble arbitrary pages.

pub mod events;

use std::collections::BTreeMap;

pub use events::{DomEvent, EventHub, EventKind, KeyPress, ListenerId, PointerButton};

use crate::geometry::{BoxSizing, Point, Rect, Size};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementId(u32);

impl ElementId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Default)]
struct ElementNode {
    tag: String,
    attributes: BTreeMap<String, String>,
    /// Attribute values moved out of the visible bag by the sweeper.
    hidden_props: BTreeMap<String, String>,
    classes: Vec<String>,
    rect: Option<Rect>,
    box_sizing: Option<BoxSizing>,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
    /// Set on a shadow host, pointing at its shadow root node.
    shadow_root: Option<ElementId>,
    /// Set on a shadow root node, pointing back at its host.
    shadow_host: Option<ElementId>,
    detached: bool,
}

/// One rendered page: element arena plus viewport/scroll state.
pub struct Document {
    nodes: Vec<ElementNode>,
    document_element: ElementId,
    body: ElementId,
    viewport: Size,
    scroll: Point,
    mutation_seq: u64,
}

impl Document {
    pub fn new(viewport: Size) -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            document_element: ElementId(0),
            body: ElementId(0),
            viewport,
            scroll: Point::default(),
            mutation_seq: 0,
        };
        let html = doc.create_element("html");
        let body = doc.create_element("body");
        doc.document_element = html;
        doc.body = body;
        doc.append_child(html, body);
        doc
    }

    pub fn document_element(&self) -> ElementId {
        self.document_element
    }

    pub fn body(&self) -> ElementId {
        self.body
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    pub fn scroll_offset(&self) -> Point {
        self.scroll
    }

    pub fn set_scroll_offset(&mut self, scroll: Point) {
        self.scroll = scroll;
    }

    /// Monotonic counter bumped on attribute and tree mutations; the
    /// attribute sweeper polls it in place of a mutation observer.
    pub fn mutation_seq(&self) -> u64 {
        self.mutation_seq
    }

    fn node(&self, id: ElementId) -> &ElementNode {
        &self.nodes[id.index()]
    }

    fn node_mut(&mut self, id: ElementId) -> &mut ElementNode {
        self.mutation_seq += 1;
        &mut self.nodes[id.index()]
    }

    pub fn create_element(&mut self, tag: &str) -> ElementId {
        let id = ElementId(self.nodes.len() as u32);
        self.nodes.push(ElementNode {
            tag: tag.to_ascii_lowercase(),
            ..ElementNode::default()
        });
        id
    }

    pub fn append_child(&mut self, parent: ElementId, child: ElementId) {
        self.node_mut(child).parent = Some(parent);
        self.node_mut(child).detached = false;
        self.node_mut(parent).children.push(child);
    }

    /// Detach an element and its whole subtree from the document.
    pub fn remove(&mut self, id: ElementId) {
        if let Some(parent) = self.node(id).parent {
            let parent_node = self.node_mut(parent);
            parent_node.children.retain(|child| *child != id);
        }
        self.node_mut(id).parent = None;
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            self.node_mut(current).detached = true;
            stack.extend(self.node(current).children.iter().copied());
            if let Some(root) = self.node(current).shadow_root {
                stack.push(root);
            }
        }
    }

    /// Attach an encapsulated subtree to `host`, returning the shadow root.
    pub fn attach_shadow(&mut self, host: ElementId) -> ElementId {
        let root = self.create_element("#shadow-root");
        self.node_mut(root).shadow_host = Some(host);
        self.node_mut(host).shadow_root = Some(root);
        root
    }

    pub fn shadow_root_of(&self, host: ElementId) -> Option<ElementId> {
        self.node(host).shadow_root
    }

    pub fn tag(&self, id: ElementId) -> &str {
        &self.node(id).tag
    }

    pub fn is_connected(&self, id: ElementId) -> bool {
        !self.node(id).detached
    }

    pub fn set_rect(&mut self, id: ElementId, rect: Rect) {
        self.nodes[id.index()].rect = Some(rect);
    }

    pub fn set_box_sizing(&mut self, id: ElementId, sizing: BoxSizing) {
        self.nodes[id.index()].box_sizing = Some(sizing);
    }

    pub fn rect_of(&self, id: ElementId) -> Option<Rect> {
        self.node(id).rect
    }

    pub fn box_sizing_of(&self, id: ElementId) -> Option<BoxSizing> {
        self.node(id).box_sizing
    }

    pub fn set_attribute(&mut self, id: ElementId, name: &str, value: &str) {
        self.node_mut(id)
            .attributes
            .insert(name.to_owned(), value.to_owned());
    }

    pub fn attribute(&self, id: ElementId, name: &str) -> Option<&str> {
        self.node(id).attributes.get(name).map(String::as_str)
    }

    pub fn remove_attribute(&mut self, id: ElementId, name: &str) {
        self.node_mut(id).attributes.remove(name);
    }

    pub fn has_attribute(&self, id: ElementId, name: &str) -> bool {
        self.node(id).attributes.contains_key(name)
    }

    /// Move a visible attribute into the out-of-band property bag, keeping
    /// its value reachable without advertising it in the markup.
    pub fn stash_attribute(&mut self, id: ElementId, name: &str) {
        if let Some(value) = self.node_mut(id).attributes.remove(name) {
            self.nodes[id.index()]
                .hidden_props
                .insert(name.to_owned(), value);
        }
    }

    pub fn hidden_prop(&self, id: ElementId, name: &str) -> Option<&str> {
        self.node(id).hidden_props.get(name).map(String::as_str)
    }

    pub fn set_id_attr(&mut self, id: ElementId, value: &str) {
        self.set_attribute(id, "id", value);
    }

    pub fn id_attr(&self, id: ElementId) -> Option<&str> {
        self.attribute(id, "id")
    }

    pub fn add_class(&mut self, id: ElementId, class: &str) {
        self.node_mut(id).classes.push(class.to_owned());
    }

    pub fn class_list(&self, id: ElementId) -> &[String] {
        &self.node(id).classes
    }

    /// Structural parent within the same tree; `None` at a tree root
    /// (including shadow roots — crossing the boundary requires `host_of`).
    pub fn parent_element(&self, id: ElementId) -> Option<ElementId> {
        self.node(id).parent
    }

    pub fn host_of(&self, id: ElementId) -> Option<ElementId> {
        self.node(id).shadow_host
    }

    /// Light-tree ancestry check, inclusive of `ancestor` itself.
    pub fn contains(&self, ancestor: ElementId, node: ElementId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.node(id).parent;
        }
        false
    }

    /// Whether the element lives inside any shadow subtree.
    pub fn in_shadow_tree(&self, id: ElementId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if self.node(node).shadow_host.is_some() {
                return true;
            }
            current = self.node(node).parent;
        }
        false
    }

    /// The element as seen from the document scope: shadow-internal nodes
    /// retarget to their (outermost) shadow host.
    pub fn retarget_to_light(&self, id: ElementId) -> ElementId {
        let mut current = id;
        loop {
            let mut cursor = current;
            let mut crossed = None;
            loop {
                if let Some(host) = self.node(cursor).shadow_host {
                    crossed = Some(host);
                    break;
                }
                match self.node(cursor).parent {
                    Some(parent) => cursor = parent,
                    None => break,
                }
            }
            match crossed {
                Some(host) => current = host,
                None => return current,
            }
        }
    }

    /// Full event propagation path from `id` to the document root, crossing
    /// shadow boundaries through their hosts. Innermost element first.
    pub fn composed_path(&self, id: ElementId) -> Vec<ElementId> {
        let mut path = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current {
            path.push(node);
            current = match self.node(node).parent {
                Some(parent) => Some(parent),
                None => self.node(node).shadow_host,
            };
        }
        path
    }

    /// All visual elements under the point, topmost first. Later-painted
    /// (later in tree order) elements stack above earlier ones; shadow
    /// content paints with its host and retargets to it.
    pub fn elements_from_point(&self, point: Point) -> Vec<ElementId> {
        let mut hits = Vec::new();
        self.collect_hits(self.document_element, point, &mut hits);
        hits.reverse();

        let mut seen = Vec::new();
        let mut result = Vec::new();
        for hit in hits {
            let light = self.retarget_to_light(hit);
            if !seen.contains(&light) {
                seen.push(light);
                result.push(light);
            }
        }
        result
    }

    pub fn element_from_point(&self, point: Point) -> Option<ElementId> {
        self.elements_from_point(point).into_iter().next()
    }

    /// Topmost hit without shadow retargeting: the actual innermost node,
    /// even when it lives inside a shadow subtree.
    pub fn element_from_point_composed(&self, point: Point) -> Option<ElementId> {
        let mut hits = Vec::new();
        self.collect_hits(self.document_element, point, &mut hits);
        hits.pop()
    }

    fn collect_hits(&self, id: ElementId, point: Point, hits: &mut Vec<ElementId>) {
        let node = self.node(id);
        if node.detached {
            return;
        }
        if let Some(rect) = node.rect {
            if rect.contains(point) {
                hits.push(id);
            }
        }
        for child in &node.children {
            self.collect_hits(*child, point, hits);
        }
        if let Some(root) = node.shadow_root {
            self.collect_hits(root, point, hits);
        }
    }

    /// Connected elements currently carrying the named attribute.
    pub fn elements_with_attribute(&self, name: &str) -> Vec<ElementId> {
        (0..self.nodes.len() as u32)
            .map(ElementId)
            .filter(|id| {
                let node = self.node(*id);
                !node.detached && node.attributes.contains_key(name)
            })
            .collect()
    }
}
