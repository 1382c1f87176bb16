//! Default agent for the document renderer.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::{Rc, Weak};

use crate::agent::element_tags::element_tags;
use crate::agent::{AgentCallbacks, AgentElement, IndicateParams, InspectAgent, NameInfo};
use crate::chain::{ChainNext, InspectChain, InspectChainItem, TagItem};
use crate::code_info::{CodeInfo, code_info_for_node, path_with_line};
use crate::dom::{ElementId, EventHub, EventKind};
use crate::gateway::{
    DEFAULT_PREVENT_EVENTS, PointerHandlers, PointerListenerGuard, setup_pointer_listener,
};
use crate::geometry::Pointer;
use crate::overlay::Overlay;
use crate::resolve::{element_code_info, element_inspect};
use crate::tree::{InstanceTree, NodeId, NodeKind};

fn wrap(element: ElementId) -> AgentElement {
    Rc::new(element)
}

/// Downcast an agent element back to a document element.
pub fn dom_element(element: &AgentElement) -> Option<ElementId> {
    element.downcast_ref::<ElementId>().copied()
}

/// Inspection agent over one document plus the instance tree mounted in it.
///
/// Several agents may share one document (an embedded widget rendering into
/// a subtree of the outer app); each claims only the elements its own tree
/// can resolve, which is what routes a chain hand-off to the right agent.
pub struct DomInspectAgent {
    weak: Weak<DomInspectAgent>,
    hub: Rc<EventHub>,
    tree: Rc<RefCell<InstanceTree>>,
    overlay: RefCell<Option<Overlay>>,
    listener: RefCell<Option<PointerListenerGuard>>,
    prevent_events: Vec<EventKind>,
}

impl DomInspectAgent {
    pub fn new(hub: Rc<EventHub>, tree: Rc<RefCell<InstanceTree>>) -> Rc<Self> {
        Self::with_prevent_events(hub, tree, DEFAULT_PREVENT_EVENTS.to_vec())
    }

    /// Adjust the swallowed-event list if the defaults conflict with the
    /// host application's interaction.
    pub fn with_prevent_events(
        hub: Rc<EventHub>,
        tree: Rc<RefCell<InstanceTree>>,
        prevent_events: Vec<EventKind>,
    ) -> Rc<Self> {
        Rc::new_cyclic(|weak| Self {
            weak: weak.clone(),
            hub,
            tree,
            overlay: RefCell::new(None),
            listener: RefCell::new(None),
            prevent_events,
        })
    }

    pub fn tree(&self) -> Rc<RefCell<InstanceTree>> {
        Rc::clone(&self.tree)
    }

    pub fn overlay_indication(&self) -> Option<crate::overlay::Indication> {
        self.overlay.borrow().as_ref().and_then(Overlay::current)
    }
}

impl InspectAgent for DomInspectAgent {
    fn activate(&self, callbacks: AgentCallbacks) {
        self.deactivate();
        *self.overlay.borrow_mut() = Some(Overlay::new(self.hub.document()));

        let AgentCallbacks {
            mut on_hover,
            mut on_pointer_down,
            mut on_click,
        } = callbacks;
        let handlers = PointerHandlers {
            on_hover: Some(Box::new(move |element, pointer| {
                on_hover(wrap(element), pointer);
            })),
            on_pointer_down: Some(Box::new(move |element, pointer| {
                on_pointer_down(element.map(wrap), pointer)
            })),
            on_click: Some(Box::new(move |element, pointer| {
                on_click(element.map(wrap), pointer)
            })),
        };
        let guard = setup_pointer_listener(&self.hub, handlers, &self.prevent_events);
        *self.listener.borrow_mut() = Some(guard);
        tracing::debug!("agent activated");
    }

    fn deactivate(&self) {
        self.overlay.borrow_mut().take();
        self.listener.borrow_mut().take();
    }

    fn is_agent_element(&self, element: &AgentElement) -> bool {
        let Some(element) = dom_element(element) else {
            return false;
        };
        let doc = self.hub.document();
        let doc = doc.borrow();
        self.tree.borrow().node_for_element(&doc, element).is_some()
    }

    fn top_element_from_pointer(&self, pointer: Pointer) -> Option<AgentElement> {
        let doc = self.hub.document();
        let element = doc.borrow().element_from_point(pointer.point())?;
        Some(wrap(element))
    }

    /// One element per visual layer: a hit that is an ancestor of a higher
    /// hit is a backdrop, not a layer of its own.
    fn top_elements_from_pointer(&self, pointer: Pointer) -> Vec<AgentElement> {
        let doc = self.hub.document();
        let doc = doc.borrow();
        let elements = doc.elements_from_point(pointer.point());

        let mut parents: BTreeSet<ElementId> = BTreeSet::new();
        parents.insert(doc.document_element());
        parents.insert(doc.body());
        for element in &elements {
            let mut parent = doc.parent_element(*element);
            while let Some(current) = parent {
                if !parents.insert(current) {
                    break;
                }
                parent = doc.parent_element(current);
            }
        }

        elements
            .into_iter()
            .filter(|element| !parents.contains(element))
            .map(wrap)
            .collect()
    }

    fn render_chain(&self, element: AgentElement) -> Box<dyn InspectChain> {
        Box::new(DomRenderChain {
            agent: self.weak.clone(),
            cursor: dom_element(&element),
            nodes: None,
        })
    }

    fn source_chain(&self, element: AgentElement) -> Box<dyn InspectChain> {
        let ids = match dom_element(&element) {
            Some(el) => {
                let doc = self.hub.document();
                let doc = doc.borrow();
                let tree = self.tree.borrow();
                tree.node_for_element(&doc, el)
                    .map(|node| tree.source_chain(node).collect())
                    .unwrap_or_default()
            }
            None => Vec::new(),
        };
        Box::new(NodeChain::new(self.weak.clone(), ids))
    }

    fn name_info(&self, element: &AgentElement) -> Option<NameInfo> {
        let element = dom_element(element)?;
        let doc = self.hub.document();
        let doc = doc.borrow();
        let inspect = element_inspect(&doc, &self.tree.borrow(), element);
        Some(NameInfo {
            name: inspect.name,
            title: inspect.title,
        })
    }

    fn find_code_info(&self, element: &AgentElement) -> Option<CodeInfo> {
        let element = dom_element(element)?;
        let doc = self.hub.document();
        let doc = doc.borrow();
        element_code_info(&doc, &self.tree.borrow(), element)
    }

    fn indicate(&self, params: IndicateParams) {
        let Some(element) = dom_element(&params.element) else {
            return;
        };
        // deactivated agents may still be asked to indicate a chain item
        if self.overlay.borrow().is_none() {
            *self.overlay.borrow_mut() = Some(Overlay::new(self.hub.document()));
        }
        let code_info = params
            .code_info
            .or_else(|| self.find_code_info(&params.element));
        if let Some(overlay) = self.overlay.borrow().as_ref() {
            overlay.inspect(element, params.title, path_with_line(code_info.as_ref()));
        }
    }

    fn remove_indicate(&self) {
        if let Some(overlay) = self.overlay.borrow().as_ref() {
            overlay.hide();
        }
    }
}

/// Render-order chain: plain document links climb until an element bound to
/// an instance node, then the node walk takes over.
struct DomRenderChain {
    agent: Weak<DomInspectAgent>,
    cursor: Option<ElementId>,
    nodes: Option<NodeChain>,
}

impl InspectChain for DomRenderChain {
    fn next_link(&mut self) -> ChainNext {
        loop {
            if let Some(nodes) = &mut self.nodes {
                return nodes.next_link();
            }
            let Some(agent) = self.agent.upgrade() else {
                return ChainNext::Done(None);
            };
            let Some(element) = self.cursor else {
                return ChainNext::Done(None);
            };

            let doc = agent.hub.document();
            let doc = doc.borrow();
            let tree = agent.tree.borrow();
            if let Some(node) = tree.node_bound_to(element) {
                let ids: Vec<NodeId> = tree.render_chain(node).collect();
                drop(tree);
                self.nodes = Some(NodeChain::new(self.agent.clone(), ids));
                continue;
            }

            self.cursor = doc.parent_element(element);
            let item = InspectChainItem {
                agent: Rc::clone(&agent) as Rc<dyn InspectAgent>,
                element: Some(wrap(element)),
                title: doc.tag(element).to_owned(),
                subtitle: None,
                tags: element_tags(&doc, element),
                code_info: None,
            };
            return ChainNext::Item(item);
        }
    }
}

/// Walk over pre-collected instance nodes. Links with neither a display
/// name nor tags are dropped; elementless links inherit the nearest element
/// already passed. Ends with the root's container as continuation when the
/// walk reached a mounted root.
struct NodeChain {
    agent: Weak<DomInspectAgent>,
    nodes: std::vec::IntoIter<NodeId>,
    last_element: Option<ElementId>,
    last_node: Option<NodeId>,
}

impl NodeChain {
    fn new(agent: Weak<DomInspectAgent>, ids: Vec<NodeId>) -> Self {
        Self {
            agent,
            nodes: ids.into_iter(),
            last_element: None,
            last_node: None,
        }
    }
}

impl InspectChain for NodeChain {
    fn next_link(&mut self) -> ChainNext {
        let Some(agent) = self.agent.upgrade() else {
            return ChainNext::Done(None);
        };
        let doc = agent.hub.document();
        let doc = doc.borrow();
        let tree = agent.tree.borrow();

        for node in self.nodes.by_ref() {
            self.last_node = Some(node);

            let display_name = tree.display_name(node);
            let own_element = tree.element(node);
            let code_info = code_info_for_node(&doc, &tree, node);

            let mut tags = own_element
                .map(|el| element_tags(&doc, el))
                .unwrap_or_default();
            if let Some(label) = tree.kind(node).tag_label() {
                tags.push(TagItem::label(label));
            }

            if own_element.is_some() {
                self.last_element = own_element;
            }
            let element = own_element.or(self.last_element);

            if display_name.is_none() && tags.is_empty() {
                continue;
            }

            return ChainNext::Item(InspectChainItem {
                agent: Rc::clone(&agent) as Rc<dyn InspectAgent>,
                element: element.map(wrap),
                title: display_name.unwrap_or_default(),
                subtitle: path_with_line(code_info.as_ref()),
                tags,
                code_info,
            });
        }

        match self.last_node {
            Some(node) if tree.kind(node) == NodeKind::HostRoot => {
                ChainNext::Done(tree.container(node).map(wrap))
            }
            _ => ChainNext::Done(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{ChainKind, ElementsChain};
    use crate::dom::Document;
    use crate::geometry::{Rect, Size};
    use crate::trace::TRACE_SOURCE;

    fn new_doc() -> Rc<RefCell<Document>> {
        Rc::new(RefCell::new(Document::new(Size {
            width: 800.0,
            height: 600.0,
        })))
    }

    fn collect(mut chain: Box<dyn InspectChain>) -> (Vec<InspectChainItem>, Option<AgentElement>) {
        let mut items = Vec::new();
        loop {
            match chain.next_link() {
                ChainNext::Item(item) => items.push(item),
                ChainNext::Done(continuation) => return (items, continuation),
            }
        }
    }

    /// body > section#mount > (tree: App > div.card > span), with an extra
    /// unbound em under the span.
    fn mounted_page() -> (Rc<EventHub>, Rc<DomInspectAgent>, ElementId, ElementId) {
        let doc = new_doc();
        let (mount, card, span, em) = {
            let mut doc = doc.borrow_mut();
            let body = doc.body();
            let mount = doc.create_element("section");
            let card = doc.create_element("div");
            let span = doc.create_element("span");
            let em = doc.create_element("em");
            doc.append_child(body, mount);
            doc.append_child(mount, card);
            doc.append_child(card, span);
            doc.append_child(span, em);
            doc.set_id_attr(card, "card");
            doc.set_attribute(card, TRACE_SOURCE, "src/card.tsx:5:1:div");
            (mount, card, span, em)
        };
        let hub = EventHub::new(doc);

        let mut tree = InstanceTree::new(Some(mount));
        let app = tree.add_component("App", tree.root());
        tree.set_debug_source(
            app,
            crate::tree::DebugSource {
                file_name: "src/app.tsx".to_owned(),
                line_number: 2,
                column_number: None,
            },
        );
        let card_host = tree.add_host("div", app, card);
        tree.add_host("span", card_host, span);

        let agent = DomInspectAgent::new(Rc::clone(&hub), Rc::new(RefCell::new(tree)));
        (hub, agent, card, em)
    }

    #[test]
    fn render_chain_prefixes_unbound_elements() {
        let (_hub, agent, _card, em) = mounted_page();
        let (items, continuation) = collect(agent.render_chain(wrap(em)));

        // em is unbound: a plain document link comes first
        assert_eq!(items[0].title, "em");
        let titles: Vec<&str> = items.iter().map(|item| item.title.as_str()).collect();
        assert!(titles.contains(&"App"));
        assert!(titles.contains(&"div"));
        // the root is mounted: continuation carries the mount element
        assert!(continuation.is_some());
    }

    #[test]
    fn source_chain_drops_nameless_links() {
        let (_hub, agent, card, _em) = mounted_page();
        let (items, _) = collect(agent.source_chain(wrap(card)));

        let titles: Vec<&str> = items.iter().map(|item| item.title.as_str()).collect();
        assert_eq!(titles, vec!["div", "App"]);
        // the div link carries its id badge and trace subtitle
        assert_eq!(items[0].tags[0].label, "#card");
        assert_eq!(items[0].subtitle.as_deref(), Some("src/card.tsx:5"));
    }

    #[test]
    fn composed_chain_crosses_into_outer_agent() {
        // outer tree renders the section the inner tree mounts into
        let doc = new_doc();
        let (mount, leaf) = {
            let mut doc = doc.borrow_mut();
            let body = doc.body();
            let mount = doc.create_element("section");
            let leaf = doc.create_element("p");
            doc.append_child(body, mount);
            doc.append_child(mount, leaf);
            (mount, leaf)
        };
        let hub = EventHub::new(doc);

        let mut outer = InstanceTree::new(None);
        let shell = outer.add_component("Shell", outer.root());
        outer.add_host("section", shell, mount);

        let mut inner = InstanceTree::new(Some(mount));
        let widget = inner.add_component("Widget", inner.root());
        inner.add_host("p", widget, leaf);

        let outer_agent = DomInspectAgent::new(Rc::clone(&hub), Rc::new(RefCell::new(outer)));
        let inner_agent = DomInspectAgent::new(Rc::clone(&hub), Rc::new(RefCell::new(inner)));

        let agents: Vec<Rc<dyn InspectAgent>> = vec![inner_agent.clone(), outer_agent.clone()];
        let start: Rc<dyn InspectAgent> = inner_agent;
        let titles: Vec<String> =
            ElementsChain::new(agents, &start, wrap(leaf), ChainKind::Render)
                .map(|item| item.title)
                .collect();

        assert_eq!(titles, vec!["p", "Widget", "section", "Shell"]);
    }

    #[test]
    fn top_elements_collapse_ancestor_hits() {
        let doc = new_doc();
        let (under, over) = {
            let mut doc = doc.borrow_mut();
            let body = doc.body();
            let under = doc.create_element("div");
            let inner = doc.create_element("span");
            let over = doc.create_element("dialog");
            doc.append_child(body, under);
            doc.append_child(under, inner);
            doc.append_child(body, over);
            doc.set_rect(under, Rect::new(0.0, 0.0, 200.0, 200.0));
            doc.set_rect(inner, Rect::new(0.0, 0.0, 200.0, 200.0));
            doc.set_rect(over, Rect::new(0.0, 0.0, 100.0, 100.0));
            (under, over)
        };
        let hub = EventHub::new(doc);
        let agent = DomInspectAgent::new(hub, Rc::new(RefCell::new(InstanceTree::new(None))));

        let layers = agent.top_elements_from_pointer(Pointer::new(10.0, 10.0));
        let ids: Vec<ElementId> = layers.iter().filter_map(dom_element).collect();
        // dialog is its own layer; span is the top of the page layer;
        // div is only an ancestor backdrop
        assert!(ids.contains(&over));
        assert!(!ids.contains(&under));
    }

    #[test]
    fn indicate_resolves_code_info_lazily() {
        let (_hub, agent, card, _em) = mounted_page();
        agent.indicate(IndicateParams {
            element: wrap(card),
            code_info: None,
            pointer: None,
            name: None,
            title: Some("div in <App>".to_owned()),
        });
        // the card's reference is App (single-child component parent), so
        // the resolved source is App's, not the card's own attribute
        let indication = agent.overlay_indication().unwrap();
        assert_eq!(indication.info.as_deref(), Some("src/app.tsx:2"));

        agent.remove_indicate();
        assert!(agent.overlay_indication().is_none());
    }
}
