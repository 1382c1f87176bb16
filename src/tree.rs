//! Component instance tree: the renderer's private record of what produced
//! each host element.
//!
//! The resolution engine never sees this structure directly; the default
//! agent walks it and exposes only chain items. Nodes form an arena keyed by
//! [`NodeId`], with the root carrying a self-referential parent sentinel so
//! upward walks terminate without a special root flag.

use std::collections::BTreeMap;

use crate::dom::{Document, ElementId};

/// Closed enumeration of instance-node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    FunctionComponent,
    ClassComponent,
    IncompleteClassComponent,
    HostRoot,
    HostPortal,
    HostComponent,
    HostText,
    Fragment,
    Mode,
    ContextConsumer,
    ContextProvider,
    ForwardRef,
    Profiler,
    Suspense,
    SuspenseList,
    Memo,
    SimpleMemo,
    Lazy,
    Scope,
    Offscreen,
    LegacyHidden,
    Cache,
    TracingMarker,
}

struct KindSpec {
    kind: NodeKind,
    /// Badge text shown next to a chain item, when the kind has one.
    tag_label: Option<&'static str>,
    /// Wrapper nodes skipped when walking to a direct parent.
    synthetic: bool,
}

const KIND_TABLE: &[KindSpec] = &[
    KindSpec { kind: NodeKind::FunctionComponent, tag_label: None, synthetic: false },
    KindSpec { kind: NodeKind::ClassComponent, tag_label: None, synthetic: false },
    KindSpec { kind: NodeKind::IncompleteClassComponent, tag_label: None, synthetic: false },
    KindSpec { kind: NodeKind::HostRoot, tag_label: None, synthetic: false },
    KindSpec { kind: NodeKind::HostPortal, tag_label: None, synthetic: false },
    KindSpec { kind: NodeKind::HostComponent, tag_label: None, synthetic: false },
    KindSpec { kind: NodeKind::HostText, tag_label: None, synthetic: false },
    KindSpec { kind: NodeKind::Fragment, tag_label: Some("Fragment"), synthetic: false },
    KindSpec { kind: NodeKind::Mode, tag_label: None, synthetic: false },
    KindSpec { kind: NodeKind::ContextConsumer, tag_label: Some("Consumer"), synthetic: true },
    KindSpec { kind: NodeKind::ContextProvider, tag_label: Some("Provider"), synthetic: true },
    KindSpec { kind: NodeKind::ForwardRef, tag_label: Some("ForwardRef"), synthetic: true },
    KindSpec { kind: NodeKind::Profiler, tag_label: Some("Profiler"), synthetic: false },
    KindSpec { kind: NodeKind::Suspense, tag_label: Some("Suspense"), synthetic: false },
    KindSpec { kind: NodeKind::SuspenseList, tag_label: Some("SuspenseList"), synthetic: false },
    KindSpec { kind: NodeKind::Memo, tag_label: Some("Memo"), synthetic: true },
    KindSpec { kind: NodeKind::SimpleMemo, tag_label: Some("Memo"), synthetic: true },
    KindSpec { kind: NodeKind::Lazy, tag_label: Some("Lazy"), synthetic: true },
    KindSpec { kind: NodeKind::Scope, tag_label: Some("Scope"), synthetic: false },
    KindSpec { kind: NodeKind::Offscreen, tag_label: Some("Offscreen"), synthetic: false },
    KindSpec { kind: NodeKind::LegacyHidden, tag_label: None, synthetic: false },
    KindSpec { kind: NodeKind::Cache, tag_label: Some("Cache"), synthetic: false },
    KindSpec { kind: NodeKind::TracingMarker, tag_label: Some("TracingMarker"), synthetic: false },
];

fn spec_of(kind: NodeKind) -> &'static KindSpec {
    KIND_TABLE
        .iter()
        .find(|spec| spec.kind == kind)
        .unwrap_or(&KIND_TABLE[0])
}

impl NodeKind {
    pub fn tag_label(self) -> Option<&'static str> {
        spec_of(self).tag_label
    }

    /// Wrapper kinds that never appear as a "direct parent".
    pub fn is_synthetic(self) -> bool {
        spec_of(self).synthetic
    }
}

/// Build-time source position recorded by the renderer's debug metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugSource {
    pub file_name: String,
    pub line_number: u32,
    pub column_number: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

struct TreeNode {
    kind: NodeKind,
    /// Resolved type name: component name, host tag, context name, or the
    /// profiler id, depending on kind.
    name: Option<String>,
    debug_source: Option<DebugSource>,
    parent: NodeId,
    /// Instantiating node, when debug metadata recorded one.
    owner: Option<NodeId>,
    /// Host element this node rendered, for host-kind nodes.
    element: Option<ElementId>,
    /// For `HostRoot`: the outer document element the subtree mounts into.
    container: Option<ElementId>,
}

/// Arena of instance nodes for one mounted subtree.
pub struct InstanceTree {
    nodes: Vec<TreeNode>,
    root: NodeId,
    by_element: BTreeMap<ElementId, NodeId>,
}

impl InstanceTree {
    /// A new tree whose root is a `HostRoot` mounted into `container`.
    /// The root is its own parent; upward walks stop there.
    pub fn new(container: Option<ElementId>) -> Self {
        let root = NodeId(0);
        Self {
            nodes: vec![TreeNode {
                kind: NodeKind::HostRoot,
                name: None,
                debug_source: None,
                parent: root,
                owner: None,
                element: None,
                container,
            }],
            root,
            by_element: BTreeMap::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn add_node(&mut self, kind: NodeKind, name: Option<&str>, parent: NodeId) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(TreeNode {
            kind,
            name: name.map(str::to_owned),
            debug_source: None,
            parent,
            owner: None,
            element: None,
            container: None,
        });
        id
    }

    pub fn add_component(&mut self, name: &str, parent: NodeId) -> NodeId {
        self.add_node(NodeKind::FunctionComponent, Some(name), parent)
    }

    pub fn add_host(&mut self, tag: &str, parent: NodeId, element: ElementId) -> NodeId {
        let id = self.add_node(NodeKind::HostComponent, Some(tag), parent);
        self.bind_element(id, element);
        id
    }

    pub fn bind_element(&mut self, id: NodeId, element: ElementId) {
        self.nodes[id.0 as usize].element = Some(element);
        self.by_element.insert(element, id);
    }

    pub fn set_debug_source(&mut self, id: NodeId, source: DebugSource) {
        self.nodes[id.0 as usize].debug_source = Some(source);
    }

    pub fn set_owner(&mut self, id: NodeId, owner: NodeId) {
        self.nodes[id.0 as usize].owner = Some(owner);
    }

    fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id.0 as usize]
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.node(id).kind
    }

    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.node(id).name.as_deref()
    }

    pub fn debug_source(&self, id: NodeId) -> Option<&DebugSource> {
        self.node(id).debug_source.as_ref()
    }

    pub fn element(&self, id: NodeId) -> Option<ElementId> {
        self.node(id).element
    }

    pub fn container(&self, id: NodeId) -> Option<ElementId> {
        self.node(id).container
    }

    pub fn owner(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).owner
    }

    /// Raw parent link. At the root this returns the root itself.
    pub fn parent(&self, id: NodeId) -> NodeId {
        self.node(id).parent
    }

    pub fn is_root_sentinel(&self, id: NodeId) -> bool {
        self.node(id).parent == id
    }

    /// Direct children of a node, in insertion order.
    pub fn children(&self, parent: NodeId) -> Vec<NodeId> {
        (0..self.nodes.len() as u32)
            .map(NodeId)
            .filter(|id| *id != parent && self.node(*id).parent == parent)
            .collect()
    }

    /// The node bound to exactly `element`, no upward walk.
    pub fn node_bound_to(&self, element: ElementId) -> Option<NodeId> {
        self.by_element.get(&element).copied()
    }

    /// The node bound to `element`, walking up the document tree when the
    /// element itself has no binding (text wrappers, style hosts).
    pub fn node_for_element(&self, doc: &Document, element: ElementId) -> Option<NodeId> {
        let mut current = Some(element);
        while let Some(el) = current {
            if let Some(id) = self.by_element.get(&el) {
                return Some(*id);
            }
            current = doc.parent_element(el);
        }
        None
    }

    /// Upward walk by parent links, starting node included; ends at the
    /// root sentinel.
    pub fn render_chain(&self, from: NodeId) -> RenderChain<'_> {
        RenderChain {
            tree: self,
            current: Some(from),
        }
    }

    /// Upward walk preferring owner links over parent links, starting node
    /// included. This follows "who wrote the markup" rather than "who sits
    /// above it at runtime".
    pub fn source_chain(&self, from: NodeId) -> SourceChain<'_> {
        SourceChain {
            tree: self,
            current: Some(from),
        }
    }

    /// First non-synthetic ancestor by parent links, or `None` when nothing
    /// but wrappers sit above the node.
    pub fn direct_parent(&self, child: NodeId) -> Option<NodeId> {
        let mut current = self.parent_step(child)?;
        loop {
            if !self.kind(current).is_synthetic() {
                return Some(current);
            }
            current = self.parent_step(current)?;
        }
    }

    fn parent_step(&self, id: NodeId) -> Option<NodeId> {
        if self.is_root_sentinel(id) {
            None
        } else {
            Some(self.node(id).parent)
        }
    }

    /// The display name a user would recognize for the node, resolved from
    /// the kind table plus the recorded type name.
    pub fn display_name(&self, id: NodeId) -> Option<String> {
        let node = self.node(id);
        match node.kind {
            NodeKind::FunctionComponent
            | NodeKind::ClassComponent
            | NodeKind::IncompleteClassComponent
            | NodeKind::ForwardRef
            | NodeKind::Memo
            | NodeKind::SimpleMemo => Some(
                node.name
                    .clone()
                    .unwrap_or_else(|| "(anonymous)".to_owned()),
            ),
            NodeKind::HostComponent | NodeKind::Profiler => node.name.clone(),
            NodeKind::ContextProvider => Some(format!(
                "{}.Provider",
                node.name.as_deref().unwrap_or("Context")
            )),
            NodeKind::ContextConsumer => Some(format!(
                "{}.Consumer",
                node.name.as_deref().unwrap_or("Context")
            )),
            NodeKind::Lazy => Some("Lazy".to_owned()),
            NodeKind::Suspense => Some("Suspense".to_owned()),
            NodeKind::SuspenseList => Some("SuspenseList".to_owned()),
            NodeKind::LegacyHidden => Some("LegacyHidden".to_owned()),
            NodeKind::Offscreen => Some("Offscreen".to_owned()),
            NodeKind::Scope => Some("Scope".to_owned()),
            NodeKind::Cache => Some("Cache".to_owned()),
            NodeKind::TracingMarker => Some("TracingMarker".to_owned()),
            NodeKind::HostRoot
            | NodeKind::HostPortal
            | NodeKind::HostText
            | NodeKind::Fragment
            | NodeKind::Mode => None,
        }
    }
}

pub struct RenderChain<'a> {
    tree: &'a InstanceTree,
    current: Option<NodeId>,
}

impl Iterator for RenderChain<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.current?;
        self.current = self.tree.parent_step(id);
        Some(id)
    }
}

pub struct SourceChain<'a> {
    tree: &'a InstanceTree,
    current: Option<NodeId>,
}

impl Iterator for SourceChain<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.current?;
        self.current = match self.tree.owner(id) {
            Some(owner) if owner == id => None,
            Some(owner) => Some(owner),
            None => self.tree.parent_step(id),
        };
        Some(id)
    }
}
