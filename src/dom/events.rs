//! Event plumbing: typed events, capture/bubble listener registry, shadow
//! retargeting.
//!
//! All listeners register against the document (window level); the phase flag
//! only decides ordering, which is what the engine relies on: capture-phase
//! gateways run before any bubble-phase handler and can swallow the event
//! outright with [`DomEvent::stop_immediate_propagation`].

use std::cell::RefCell;
use std::rc::Rc;

use crate::dom::{Document, ElementId};
use crate::geometry::Pointer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Click,
    MouseDown,
    MouseUp,
    MouseOver,
    MouseOut,
    PointerDown,
    PointerUp,
    PointerMove,
    PointerOver,
    PointerOut,
    PointerCancel,
    ContextMenu,
    KeyDown,
    Blur,
    Resize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerButton {
    #[default]
    Primary,
    Auxiliary,
    Secondary,
}

/// Keyboard state for a `KeyDown` event. `code` follows the physical-key
/// naming scheme (`KeyC`, `Escape`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyPress {
    pub code: String,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
}

impl KeyPress {
    pub fn code(code: &str) -> Self {
        Self {
            code: code.to_owned(),
            ..Self::default()
        }
    }
}

/// One dispatched event. `target` is the document-scope view of the hit
/// element (shadow-internal nodes retargeted to their host); `path` is the
/// full composed propagation path, innermost actual node first.
#[derive(Debug, Clone)]
pub struct DomEvent {
    pub kind: EventKind,
    pub target: Option<ElementId>,
    pub path: Vec<ElementId>,
    pub pointer: Option<Pointer>,
    pub button: PointerButton,
    pub key: Option<KeyPress>,
    default_prevented: bool,
    propagation_stopped: bool,
    immediate_stopped: bool,
}

impl DomEvent {
    pub fn simple(kind: EventKind) -> Self {
        Self {
            kind,
            target: None,
            path: Vec::new(),
            pointer: None,
            button: PointerButton::Primary,
            key: None,
            default_prevented: false,
            propagation_stopped: false,
            immediate_stopped: false,
        }
    }

    pub fn pointer(kind: EventKind, pointer: Pointer) -> Self {
        Self {
            pointer: Some(pointer),
            ..Self::simple(kind)
        }
    }

    pub fn pointer_with_button(kind: EventKind, pointer: Pointer, button: PointerButton) -> Self {
        Self {
            button,
            ..Self::pointer(kind, pointer)
        }
    }

    pub fn key(kind: EventKind, key: KeyPress) -> Self {
        Self {
            key: Some(key),
            ..Self::simple(kind)
        }
    }

    /// Innermost actual node under the event, shadow internals included.
    pub fn composed_target(&self) -> Option<ElementId> {
        self.path.first().copied()
    }

    pub fn composed_path(&self) -> &[ElementId] {
        &self.path
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    /// Stops the event cold: no later listener runs, not even in the same
    /// phase.
    pub fn stop_immediate_propagation(&mut self) {
        self.propagation_stopped = true;
        self.immediate_stopped = true;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Handler = RefCell<Box<dyn FnMut(&mut DomEvent)>>;

struct ListenerEntry {
    id: ListenerId,
    kind: EventKind,
    capture: bool,
    handler: Handler,
}

/// Document-level listener registry and dispatcher.
///
/// The hub owns the document handle; handlers receive only the event, so a
/// handler that needs the document clones the `Rc` up front. The listener
/// list is snapshotted per dispatch, which lets handlers register and
/// unregister listeners (their own included) mid-dispatch.
pub struct EventHub {
    doc: Rc<RefCell<Document>>,
    listeners: RefCell<Vec<Rc<ListenerEntry>>>,
    next_id: std::cell::Cell<u64>,
}

impl EventHub {
    pub fn new(doc: Rc<RefCell<Document>>) -> Rc<Self> {
        Rc::new(Self {
            doc,
            listeners: RefCell::new(Vec::new()),
            next_id: std::cell::Cell::new(0),
        })
    }

    pub fn document(&self) -> Rc<RefCell<Document>> {
        Rc::clone(&self.doc)
    }

    pub fn add_listener(
        &self,
        kind: EventKind,
        capture: bool,
        handler: impl FnMut(&mut DomEvent) + 'static,
    ) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.listeners.borrow_mut().push(Rc::new(ListenerEntry {
            id,
            kind,
            capture,
            handler: RefCell::new(Box::new(handler)),
        }));
        id
    }

    pub fn remove_listener(&self, id: ListenerId) {
        self.listeners.borrow_mut().retain(|entry| entry.id != id);
    }

    /// Dispatch with hit-testing: resolves the event target from its pointer
    /// position before running listeners.
    pub fn dispatch_at_pointer(&self, mut event: DomEvent) -> DomEvent {
        if let Some(pointer) = event.pointer {
            let doc = self.doc.borrow();
            if let Some(inner) = doc.element_from_point_composed(pointer.point()) {
                event.path = doc.composed_path(inner);
                event.target = Some(doc.retarget_to_light(inner));
            }
        }
        drop_and_dispatch(self, event)
    }

    /// Dispatch against an explicit target element.
    pub fn dispatch_to(&self, mut event: DomEvent, target: ElementId) -> DomEvent {
        {
            let doc = self.doc.borrow();
            event.path = doc.composed_path(target);
            event.target = Some(doc.retarget_to_light(target));
        }
        drop_and_dispatch(self, event)
    }

    /// Dispatch a targetless (window-level) event, e.g. keydown or blur.
    pub fn dispatch(&self, event: DomEvent) -> DomEvent {
        drop_and_dispatch(self, event)
    }

    fn run(&self, event: &mut DomEvent) {
        let snapshot: Vec<Rc<ListenerEntry>> = self.listeners.borrow().clone();
        for phase_capture in [true, false] {
            for entry in &snapshot {
                if entry.kind != event.kind || entry.capture != phase_capture {
                    continue;
                }
                // removed mid-dispatch: skip
                let live = self
                    .listeners
                    .borrow()
                    .iter()
                    .any(|current| current.id == entry.id);
                if !live {
                    continue;
                }
                (entry.handler.borrow_mut())(event);
                if event.immediate_stopped {
                    return;
                }
            }
            if event.propagation_stopped {
                return;
            }
        }
    }
}

fn drop_and_dispatch(hub: &EventHub, mut event: DomEvent) -> DomEvent {
    hub.run(&mut event);
    event
}
