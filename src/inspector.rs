//! Activation state machine.
//!
//! The inspector owns the mode the whole engine is in: inactive, actively
//! inspecting (agents activated, hover indicates, click resolves-and-opens),
//! or inspecting with the context panel open. It also carries the ambient
//! concerns that exist even while inactive: the last-pointer recorder, the
//! hotkey toggle and the trace-attribute sweeper.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::{Duration, Instant};

use crate::agent::{AgentCallbacks, AgentElement, IndicateParams, InspectAgent, NameInfo};
use crate::chain::{ChainKind, ElementsChain, InspectChainItem};
use crate::code_info::CodeInfo;
use crate::dom::{Document, DomEvent, EventHub, EventKind, KeyPress, ListenerId};
use crate::editor::{LAUNCH_EDITOR_ENDPOINT, TrustedEditor, goto_server_editor};
use crate::geometry::{Pointer, Size};
use crate::panel::{InspectContextPanel, PanelShowParams};
use crate::trace::TRACE_SOURCE;

/// A toggle key combination matched against `KeyDown` events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hotkey {
    pub code: String,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Hotkey {
    pub fn toggle_default() -> Self {
        Self {
            code: "KeyC".to_owned(),
            ctrl: true,
            shift: true,
            alt: true,
            meta: false,
        }
    }

    fn matches(&self, key: &KeyPress) -> bool {
        key.code == self.code
            && key.ctrl == self.ctrl
            && key.shift == self.shift
            && key.alt == self.alt
            && key.meta == self.meta
    }
}

fn is_plain_escape(key: &KeyPress) -> bool {
    key.code == "Escape" && !key.ctrl && !key.shift && !key.alt && !key.meta
}

/// Hover notification to the embedding application.
pub struct HoverReport {
    pub element: AgentElement,
    pub name: Option<String>,
    pub code_info: Option<CodeInfo>,
}

/// Click notification; `editor` is set when the user picked one explicitly
/// in the context panel.
pub struct ClickReport {
    pub element: AgentElement,
    pub name: Option<String>,
    pub code_info: Option<CodeInfo>,
    pub editor: Option<TrustedEditor>,
}

/// Host-supplied callbacks. `editor_transport` receives the launch GET url;
/// without one the request is only logged. Supplying `on_inspect_element`
/// replaces the default open-editor click action.
#[derive(Default)]
pub struct InspectorCallbacks {
    pub on_active_change: Option<Box<dyn FnMut(bool)>>,
    pub on_hover_element: Option<Box<dyn FnMut(&HoverReport)>>,
    pub on_click_element: Option<Box<dyn FnMut(&ClickReport)>>,
    pub on_inspect_element: Option<Box<dyn FnMut(&ClickReport)>>,
    pub editor_transport: Option<Box<dyn FnMut(&str)>>,
}

pub struct InspectorOptions {
    /// Toggle combination; `None` disables hotkey toggling entirely.
    pub hotkey: Option<Hotkey>,
    /// Controlled mode: activation calls only request a transition through
    /// `on_active_change`; actual state follows [`Inspector::sync_controlled_active`].
    pub controlled: bool,
    /// Strip trace attributes from live elements (debounced) into the
    /// out-of-band bag, keeping the rendered markup clean.
    pub hide_trace_attributes: bool,
    pub launch_editor_endpoint: String,
    /// Measured size the context panel opens with.
    pub panel_size: Size,
}

impl Default for InspectorOptions {
    fn default() -> Self {
        Self {
            hotkey: Some(Hotkey::toggle_default()),
            controlled: false,
            hide_trace_attributes: true,
            launch_editor_endpoint: LAUNCH_EDITOR_ENDPOINT.to_owned(),
            panel_size: Size {
                width: 320.0,
                height: 420.0,
            },
        }
    }
}

/// One stacked layer under the context-menu pointer; chains are built from
/// it lazily, per request.
struct PanelLayer {
    agent: Rc<dyn InspectAgent>,
    element: AgentElement,
}

pub struct Inspector {
    weak: Weak<Inspector>,
    hub: Rc<EventHub>,
    agents: Vec<Rc<dyn InspectAgent>>,
    options: InspectorOptions,
    callbacks: RefCell<InspectorCallbacks>,

    active: Cell<bool>,
    /// Agent owning the current indicator; swapped on cross-agent hover.
    current: RefCell<Option<Rc<dyn InspectAgent>>>,
    last_pointer: Cell<Option<Pointer>>,

    recorder: Cell<Option<ListenerId>>,
    key_listener: Cell<Option<ListenerId>>,
    context_menu: Cell<Option<ListenerId>>,

    panel: RefCell<Option<Rc<InspectContextPanel>>>,
    layers: RefCell<Vec<PanelLayer>>,
    sweeper: Option<AttributeSweeper>,
}

impl Inspector {
    pub fn new(
        hub: Rc<EventHub>,
        agents: Vec<Rc<dyn InspectAgent>>,
        options: InspectorOptions,
        callbacks: InspectorCallbacks,
    ) -> Rc<Self> {
        let sweeper = options
            .hide_trace_attributes
            .then(|| AttributeSweeper::new(hub.document(), Duration::from_secs(1)));

        let inspector = Rc::new_cyclic(|weak| Self {
            weak: weak.clone(),
            hub: Rc::clone(&hub),
            agents,
            options,
            callbacks: RefCell::new(callbacks),
            active: Cell::new(false),
            current: RefCell::new(None),
            last_pointer: Cell::new(None),
            recorder: Cell::new(None),
            key_listener: Cell::new(None),
            context_menu: Cell::new(None),
            panel: RefCell::new(None),
            layers: RefCell::new(Vec::new()),
            sweeper,
        });

        let weak = inspector.weak.clone();
        let id = hub.add_listener(EventKind::PointerMove, true, move |event| {
            if let (Some(inspector), Some(pointer)) = (weak.upgrade(), event.pointer) {
                inspector.last_pointer.set(Some(pointer));
            }
        });
        inspector.recorder.set(Some(id));

        let weak = inspector.weak.clone();
        let id = hub.add_listener(EventKind::KeyDown, true, move |event| {
            if let Some(inspector) = weak.upgrade() {
                inspector.on_key_down(event);
            }
        });
        inspector.key_listener.set(Some(id));

        inspector
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    pub fn panel_is_open(&self) -> bool {
        self.panel.borrow().is_some()
    }

    /// The open context panel, for hosts that render and wire its content.
    pub fn panel(&self) -> Option<Rc<InspectContextPanel>> {
        self.panel.borrow().clone()
    }

    /// Request activation. Uncontrolled mode applies it immediately;
    /// controlled mode only notifies and waits for the controlled value.
    pub fn activate(&self) {
        self.request_active(true);
    }

    /// Request deactivation; same controlled/uncontrolled split as
    /// [`Inspector::activate`].
    pub fn deactivate(&self) {
        self.request_active(false);
    }

    /// Apply the externally-owned active value (controlled mode), or force
    /// the state directly.
    pub fn sync_controlled_active(&self, active: bool) {
        self.set_active(active);
    }

    /// Drive the debounced trace-attribute sweeper; the host calls this from
    /// its timer source.
    pub fn tick(&self, now: Instant) {
        if let Some(sweeper) = &self.sweeper {
            sweeper.tick(now);
        }
    }

    fn request_active(&self, active: bool) {
        if let Some(callback) = self.callbacks.borrow_mut().on_active_change.as_mut() {
            callback(active);
        }
        if !self.options.controlled {
            self.set_active(active);
        }
    }

    fn set_active(&self, active: bool) {
        if self.active.replace(active) == active {
            return;
        }
        if active {
            self.start_inspecting();
        } else {
            self.stop_inspecting();
        }
    }

    fn on_key_down(&self, event: &mut DomEvent) {
        let Some(key) = event.key.clone() else {
            return;
        };
        if self.active.get() && is_plain_escape(&key) {
            event.prevent_default();
            event.stop_immediate_propagation();
            self.deactivate();
            return;
        }
        if let Some(hotkey) = &self.options.hotkey {
            if hotkey.matches(&key) {
                event.prevent_default();
                event.stop_immediate_propagation();
                if self.active.get() {
                    self.deactivate();
                } else {
                    self.activate();
                }
            }
        }
    }

    fn start_inspecting(&self) {
        for agent in &self.agents {
            let hover_weak = self.weak.clone();
            let hover_agent = Rc::clone(agent);
            let down_weak = self.weak.clone();
            let down_agent = Rc::clone(agent);
            let click_weak = self.weak.clone();
            let click_agent = Rc::clone(agent);
            agent.activate(AgentCallbacks {
                on_hover: Box::new(move |element, pointer| {
                    if let Some(inspector) = hover_weak.upgrade() {
                        inspector.handle_hover(&hover_agent, element, Some(pointer), None, None);
                    }
                }),
                on_pointer_down: Box::new(move |element, pointer| {
                    down_weak.upgrade().is_some_and(|inspector| {
                        inspector.handle_pointer_down(&down_agent, element, pointer)
                    })
                }),
                on_click: Box::new(move |element, _pointer| {
                    click_weak.upgrade().is_some_and(|inspector| {
                        inspector.handle_click(&click_agent, element, None, None, None)
                    })
                }),
            });
        }

        let weak = self.weak.clone();
        let id = self.hub.add_listener(EventKind::ContextMenu, true, move |event| {
            if let Some(inspector) = weak.upgrade() {
                inspector.on_context_menu(event);
            }
        });
        self.context_menu.set(Some(id));

        // a pointer recorded while inactive seeds the first indication
        if let Some(pointer) = self.last_pointer.get() {
            for agent in &self.agents {
                if let Some(element) = agent.top_element_from_pointer(pointer) {
                    self.handle_hover(agent, element, Some(pointer), None, None);
                    break;
                }
            }
        }
        tracing::debug!("inspection started");
    }

    fn stop_inspecting(&self) {
        if let Some(agent) = self.current.borrow_mut().take() {
            agent.remove_indicate();
        }
        for agent in &self.agents {
            agent.deactivate();
        }
        if let Some(panel) = self.panel.borrow_mut().take() {
            panel.remove();
        }
        self.layers.borrow_mut().clear();
        if let Some(id) = self.context_menu.take() {
            self.hub.remove_listener(id);
        }
        tracing::debug!("inspection stopped");
    }

    fn handle_hover(
        &self,
        agent: &Rc<dyn InspectAgent>,
        element: AgentElement,
        pointer: Option<Pointer>,
        name_info: Option<NameInfo>,
        code_info: Option<CodeInfo>,
    ) {
        {
            let mut current = self.current.borrow_mut();
            let same = current.as_ref().is_some_and(|cur| Rc::ptr_eq(cur, agent));
            if !same {
                if let Some(previous) = current.take() {
                    previous.remove_indicate();
                }
                *current = Some(Rc::clone(agent));
            }
        }

        let name_info = name_info.or_else(|| agent.name_info(&element));
        let name = name_info.as_ref().map(|info| info.name.clone());
        agent.indicate(IndicateParams {
            element: Rc::clone(&element),
            code_info: code_info.clone(),
            pointer,
            name: name.clone(),
            title: name_info.map(|info| info.title),
        });

        if self.callbacks.borrow().on_hover_element.is_none() {
            return;
        }
        let code_info = code_info.or_else(|| agent.find_code_info(&element));
        let report = HoverReport {
            element,
            name,
            code_info,
        };
        if let Some(callback) = self.callbacks.borrow_mut().on_hover_element.as_mut() {
            callback(&report);
        }
    }

    fn handle_pointer_down(
        &self,
        agent: &Rc<dyn InspectAgent>,
        element: Option<AgentElement>,
        pointer: Pointer,
    ) -> bool {
        if !self.owns_indicator(agent) {
            return false;
        }
        if let Some(element) = element {
            self.handle_hover(agent, element, Some(pointer), None, None);
        }
        true
    }

    /// Resolve the clicked element, stop inspecting, notify, and run the
    /// default open-editor action unless intercepted. Returns whether the
    /// event belongs to this engine and must be consumed.
    fn handle_click(
        &self,
        agent: &Rc<dyn InspectAgent>,
        element: Option<AgentElement>,
        name_info: Option<NameInfo>,
        code_info: Option<CodeInfo>,
        editor: Option<TrustedEditor>,
    ) -> bool {
        if !self.owns_indicator(agent) {
            return false;
        }
        agent.remove_indicate();
        let Some(element) = element else {
            return true;
        };

        let name_info = name_info.or_else(|| agent.name_info(&element));
        let code_info = code_info.or_else(|| agent.find_code_info(&element));

        self.deactivate();

        let report = ClickReport {
            element,
            name: name_info.map(|info| info.name),
            code_info,
            editor,
        };
        if let Some(callback) = self.callbacks.borrow_mut().on_click_element.as_mut() {
            callback(&report);
        }

        let Some(code_info) = report.code_info.as_ref() else {
            tracing::debug!("no source location resolved, skipping editor launch");
            return true;
        };
        let intercepted = self.callbacks.borrow().on_inspect_element.is_some();
        if intercepted {
            if let Some(callback) = self.callbacks.borrow_mut().on_inspect_element.as_mut() {
                callback(&report);
            }
            return true;
        }

        if let Some(url) = goto_server_editor(code_info, editor, &self.options.launch_editor_endpoint)
        {
            let mut callbacks = self.callbacks.borrow_mut();
            match callbacks.editor_transport.as_mut() {
                Some(transport) => transport(&url),
                None => tracing::debug!(url, "editor launch request"),
            }
        }
        true
    }

    fn owns_indicator(&self, agent: &Rc<dyn InspectAgent>) -> bool {
        self.current
            .borrow()
            .as_ref()
            .is_some_and(|current| Rc::ptr_eq(current, agent))
    }

    /// Open the context panel at the pointer: agents pause, their stacked
    /// top elements become lazy chain layers. Ignored while a panel exists.
    fn on_context_menu(&self, event: &mut DomEvent) {
        if self.panel.borrow().is_some() {
            return;
        }
        event.prevent_default();
        event.stop_immediate_propagation();

        for agent in &self.agents {
            agent.deactivate();
        }
        if let Some(agent) = self.current.borrow_mut().take() {
            agent.remove_indicate();
        }

        let pointer = event
            .pointer
            .or_else(|| self.last_pointer.get())
            .unwrap_or_default();
        let mut layers = Vec::new();
        for agent in &self.agents {
            for element in agent.top_elements_from_pointer(pointer) {
                layers.push(PanelLayer {
                    agent: Rc::clone(agent),
                    element,
                });
            }
        }
        tracing::debug!(layers = layers.len(), "context panel opening");
        *self.layers.borrow_mut() = layers;

        let panel = InspectContextPanel::new(Rc::clone(&self.hub));
        let weak = self.weak.clone();
        panel.show(PanelShowParams {
            pointer: pointer.point(),
            panel_size: self.options.panel_size,
            on_click_outside: Some(Rc::new(move || {
                if let Some(inspector) = weak.upgrade() {
                    inspector.deactivate();
                }
            })),
        });
        *self.panel.borrow_mut() = Some(panel);
    }

    pub fn layer_count(&self) -> usize {
        self.layers.borrow().len()
    }

    /// Runtime-structure chain of one panel layer, built lazily.
    pub fn render_chain_of_layer(&self, index: usize) -> Option<ElementsChain> {
        self.chain_of_layer(index, ChainKind::Render)
    }

    /// Source-structure chain of one panel layer, built lazily.
    pub fn source_chain_of_layer(&self, index: usize) -> Option<ElementsChain> {
        self.chain_of_layer(index, ChainKind::Source)
    }

    fn chain_of_layer(&self, index: usize, kind: ChainKind) -> Option<ElementsChain> {
        let layers = self.layers.borrow();
        let layer = layers.get(index)?;
        Some(ElementsChain::new(
            self.agents.clone(),
            &layer.agent,
            Rc::clone(&layer.element),
            kind,
        ))
    }

    /// Hovering a panel list item re-indicates through the item's agent;
    /// an itemless hover clears the indicator.
    pub fn hover_panel_item(&self, item: Option<&InspectChainItem>) {
        let Some((item, element)) = item.and_then(|item| {
            item.element
                .as_ref()
                .map(|element| (item, Rc::clone(element)))
        }) else {
            if let Some(agent) = self.current.borrow_mut().take() {
                agent.remove_indicate();
            }
            return;
        };
        let name_info = NameInfo {
            name: item.title.clone(),
            title: item.title.clone(),
        };
        self.handle_hover(
            &item.agent,
            element,
            None,
            Some(name_info),
            item.code_info.clone(),
        );
    }

    /// Clicking a panel list item behaves like clicking the element on the
    /// page, after re-parenting indicator ownership to the item's agent.
    pub fn click_panel_item(&self, item: &InspectChainItem, editor: Option<TrustedEditor>) {
        let Some(element) = item.element.as_ref().map(Rc::clone) else {
            return;
        };
        {
            let mut current = self.current.borrow_mut();
            let same = current
                .as_ref()
                .is_some_and(|cur| Rc::ptr_eq(cur, &item.agent));
            if !same {
                if let Some(previous) = current.take() {
                    previous.remove_indicate();
                }
                *current = Some(Rc::clone(&item.agent));
            }
        }
        let name_info = NameInfo {
            name: item.title.clone(),
            title: item.title.clone(),
        };
        self.handle_click(
            &item.agent,
            Some(element),
            Some(name_info),
            item.code_info.clone(),
            editor,
        );
    }
}

impl Drop for Inspector {
    fn drop(&mut self) {
        for id in [
            self.recorder.take(),
            self.key_listener.take(),
            self.context_menu.take(),
        ]
        .into_iter()
        .flatten()
        {
            self.hub.remove_listener(id);
        }
        for agent in &self.agents {
            agent.deactivate();
        }
        if let Some(panel) = self.panel.borrow_mut().take() {
            panel.remove();
        }
    }
}

/// Debounced sweep that moves trace attributes off live elements into the
/// out-of-band bag. Time is injected; the owner polls [`AttributeSweeper::tick`].
pub struct AttributeSweeper {
    doc: Rc<RefCell<Document>>,
    debounce: Duration,
    seen_seq: Cell<u64>,
    deadline: Cell<Option<Instant>>,
}

impl AttributeSweeper {
    pub fn new(doc: Rc<RefCell<Document>>, debounce: Duration) -> Self {
        let seen_seq = doc.borrow().mutation_seq();
        Self {
            doc,
            debounce,
            seen_seq: Cell::new(seen_seq),
            deadline: Cell::new(None),
        }
    }

    pub fn tick(&self, now: Instant) {
        let seq = self.doc.borrow().mutation_seq();
        if seq != self.seen_seq.get() {
            // another mutation restarts the debounce window
            self.seen_seq.set(seq);
            self.deadline.set(Some(now + self.debounce));
            return;
        }
        let Some(deadline) = self.deadline.get() else {
            return;
        };
        if now < deadline {
            return;
        }
        self.deadline.set(None);
        self.sweep();
    }

    fn sweep(&self) {
        let mut doc = self.doc.borrow_mut();
        let elements = doc.elements_with_attribute(TRACE_SOURCE);
        for element in &elements {
            doc.stash_attribute(*element, TRACE_SOURCE);
        }
        if !elements.is_empty() {
            tracing::debug!(count = elements.len(), "trace attributes stashed");
        }
        // stashing itself mutates; absorb it so the window does not re-arm
        self.seen_seq.set(doc.mutation_seq());
    }
}
