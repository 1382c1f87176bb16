//! Human-friendly resolution: from a hit element to the node worth showing.
//!
//! A raw hit is usually a host leaf (`span`, `div`) deep inside wrappers.
//! These walks pick the node a person actually authored: the wrapping
//! component when it renders exactly one child, the nearest node that has
//! both a name and a source location, and a `"tag in <Component>"` title.

use crate::code_info::{CodeInfo, code_info_for_node};
use crate::dom::{Document, ElementId};
use crate::tree::{InstanceTree, NodeId, NodeKind};

/// Resolution result for one element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementInspect {
    /// The node source lookups should start from.
    pub node: Option<NodeId>,
    pub name: String,
    pub title: String,
}

fn child_count(tree: &InstanceTree, parent: NodeId) -> usize {
    tree.children(parent).len()
}

/// Pick the node source lookups start from, given a base (usually host) node.
///
/// The direct parent replaces the base when it is a component (not a host
/// tag) rendering only this one child; otherwise the base stands. Either
/// way, the walk then continues upward to the first node carrying a source
/// location, falling back to the starting pick when none does.
pub fn reference_node(doc: &Document, tree: &InstanceTree, base: NodeId) -> Option<NodeId> {
    let direct_parent = tree.direct_parent(base)?;

    let parent_is_host = tree.kind(direct_parent) == NodeKind::HostComponent;
    let only_one_child = child_count(tree, direct_parent) == 1;

    let origin = if !parent_is_host && only_one_child {
        direct_parent
    } else {
        base
    };

    let mut current = Some(origin);
    while let Some(node) = current {
        if code_info_for_node(doc, tree, node).is_some() {
            return Some(node);
        }
        current = if tree.is_root_sentinel(node) {
            None
        } else {
            Some(tree.parent(node))
        };
    }
    Some(origin)
}

/// Find a node upward that has both a name and a source location. A
/// synthetic wrapper run above the current node is collapsed, except that a
/// forward-ref wrapper inside the run replaces the current node (its name is
/// the one the author gave). Falls back to the first named node seen.
pub fn named_node(doc: &Document, tree: &InstanceTree, base: NodeId) -> Option<NodeId> {
    let mut current = Some(base);
    let mut first_named: Option<NodeId> = None;

    while let Some(mut node) = current {
        let mut parent = step_up(tree, node);
        let mut forward_parent = None;
        while let Some(candidate) = parent {
            if !tree.kind(candidate).is_synthetic() {
                break;
            }
            if tree.kind(candidate) == NodeKind::ForwardRef {
                forward_parent = Some(candidate);
            }
            parent = step_up(tree, candidate);
        }

        if let Some(forward) = forward_parent {
            node = forward;
        }

        if tree.name(node).is_some() {
            if first_named.is_none() {
                first_named = Some(node);
            }
            if code_info_for_node(doc, tree, node).is_some() {
                return Some(node);
            }
        }

        current = parent;
    }

    first_named
}

fn step_up(tree: &InstanceTree, node: NodeId) -> Option<NodeId> {
    if tree.is_root_sentinel(node) {
        None
    } else {
        Some(tree.parent(node))
    }
}

/// Source location for an element: resolved through its reference node.
pub fn element_code_info(
    doc: &Document,
    tree: &InstanceTree,
    element: ElementId,
) -> Option<CodeInfo> {
    let base = tree.node_for_element(doc, element)?;
    let reference = reference_node(doc, tree, base)?;
    code_info_for_node(doc, tree, reference)
}

/// Name and title for an element, plus the node follow-up lookups should
/// use. The title reads `"tag in <Component>"` unless the best name is the
/// tag itself.
pub fn element_inspect(doc: &Document, tree: &InstanceTree, element: ElementId) -> ElementInspect {
    let node_name = doc.tag(element).to_owned();

    let base = tree.node_for_element(doc, element);
    let reference = base.and_then(|node| reference_node(doc, tree, node));
    let named = reference.and_then(|node| named_node(doc, tree, node));

    let mut component_name = named.and_then(|node| tree.name(node).map(str::to_owned));
    if component_name.as_deref() == Some(node_name.as_str()) {
        component_name = named
            .and_then(|node| step_up(tree, node))
            .and_then(|parent| tree.name(parent).map(str::to_owned));
    }

    let title = match component_name.as_deref() {
        Some(name) if name != node_name => format!("{node_name} in <{name}>"),
        _ => node_name.clone(),
    };

    ElementInspect {
        node: reference,
        name: component_name.unwrap_or(node_name),
        title,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Size;
    use crate::trace::TRACE_SOURCE;

    fn doc() -> Document {
        Document::new(Size {
            width: 800.0,
            height: 600.0,
        })
    }

    /// Title renders an h1 (with a span inside) through two consumers.
    /// Title carries debug metadata; the h1 carries a trace attribute.
    fn titled_page() -> (Document, InstanceTree, ElementId, ElementId, NodeId) {
        let mut doc = doc();
        let body = doc.body();
        let h1 = doc.create_element("h1");
        let span = doc.create_element("span");
        doc.append_child(body, h1);
        doc.append_child(h1, span);
        doc.set_attribute(h1, TRACE_SOURCE, "src/title.tsx:12:1:h1");

        let mut tree = InstanceTree::new(None);
        let title = tree.add_component("Title", tree.root());
        tree.set_debug_source(
            title,
            crate::tree::DebugSource {
                file_name: "src/title.tsx".to_owned(),
                line_number: 3,
                column_number: None,
            },
        );
        let consumer_a = tree.add_node(NodeKind::ContextConsumer, None, title);
        let consumer_b = tree.add_node(NodeKind::ContextConsumer, None, consumer_a);
        let host = tree.add_host("h1", consumer_b, h1);
        tree.add_host("span", host, span);

        (doc, tree, h1, span, title)
    }

    #[test]
    fn reference_promotes_single_child_component_parent() {
        let (doc, tree, h1, _, title) = titled_page();
        let base = tree.node_for_element(&doc, h1).unwrap();
        // the consumers collapse; Title has one child and is no host tag
        assert_eq!(reference_node(&doc, &tree, base), Some(title));
    }

    #[test]
    fn promoted_reference_uses_component_source_over_host_attribute() {
        let (doc, tree, h1, _, _) = titled_page();
        let info = element_code_info(&doc, &tree, h1).unwrap();
        assert_eq!(info.line_number, 3);
    }

    #[test]
    fn host_parented_base_walks_up_to_first_source() {
        let (doc, tree, _, span, _) = titled_page();
        // span's direct parent is the h1 host: no promotion, so the walk
        // climbs until it finds the h1's trace attribute
        let info = element_code_info(&doc, &tree, span).unwrap();
        assert_eq!(info.line_number, 12);
    }

    #[test]
    fn inspect_title_names_the_wrapping_component() {
        let (doc, tree, h1, _, _) = titled_page();
        let inspect = element_inspect(&doc, &tree, h1);
        assert_eq!(inspect.title, "h1 in <Title>");
        assert_eq!(inspect.name, "Title");
    }

    #[test]
    fn forward_ref_wrapper_lends_its_name() {
        let mut doc = doc();
        let body = doc.body();
        let button = doc.create_element("button");
        doc.append_child(body, button);

        let mut tree = InstanceTree::new(None);
        let app = tree.add_component("App", tree.root());
        let forward = tree.add_node(NodeKind::ForwardRef, Some("FancyButton"), app);
        let anon = tree.add_node(NodeKind::FunctionComponent, None, forward);
        tree.add_host("button", anon, button);

        let named = named_node(&doc, &tree, anon);
        assert_eq!(named, Some(forward));
        assert_eq!(tree.name(forward), Some("FancyButton"));
    }

    #[test]
    fn inspect_falls_back_to_tag_without_tree() {
        let mut doc = doc();
        let body = doc.body();
        let el = doc.create_element("div");
        doc.append_child(body, el);

        let tree = InstanceTree::new(None);
        let inspect = element_inspect(&doc, &tree, el);
        assert_eq!(inspect.title, "div");
        assert_eq!(inspect.name, "div");
        assert_eq!(inspect.node, None);
    }
}
