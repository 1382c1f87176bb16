//! Capture-phase pointer gateway.
//!
//! While inspection is active the engine must see pointer traffic before the
//! application does, and must keep interaction side effects from leaking into
//! the page. The gateway registers capture listeners for the four events the
//! engine consumes and swallows a configurable set of companion events
//! outright.

use std::rc::{Rc, Weak};

use crate::dom::{DomEvent, ElementId, EventHub, EventKind, ListenerId};
use crate::geometry::Pointer;

/// Companion events suppressed while the gateway is installed. Click,
/// mousedown, pointerdown and pointerover are never listed here; the gateway
/// always handles those itself.
pub const DEFAULT_PREVENT_EVENTS: [EventKind; 5] = [
    EventKind::MouseUp,
    EventKind::PointerUp,
    EventKind::MouseOver,
    EventKind::MouseOut,
    EventKind::PointerOut,
];

/// Callbacks invoked from the capture phase. Hover only fires with a hit
/// element and is always swallowed; down/click report misses too and are
/// swallowed only when the handler returns `true`, so an engine that is not
/// the one responsible for the element can let the event pass.
#[derive(Default)]
pub struct PointerHandlers {
    pub on_hover: Option<Box<dyn FnMut(ElementId, Pointer)>>,
    pub on_pointer_down: Option<Box<dyn FnMut(Option<ElementId>, Pointer) -> bool>>,
    pub on_click: Option<Box<dyn FnMut(Option<ElementId>, Pointer) -> bool>>,
}

/// Install the gateway; listeners live until the returned guard drops.
pub fn setup_pointer_listener(
    hub: &Rc<EventHub>,
    handlers: PointerHandlers,
    prevent_events: &[EventKind],
) -> PointerListenerGuard {
    let mut ids = Vec::new();

    if let Some(mut on_click) = handlers.on_click {
        ids.push(hub.add_listener(EventKind::Click, true, move |event| {
            if on_click(event.target, event.pointer.unwrap_or_default()) {
                consume(event);
            }
        }));
    }
    if let Some(on_pointer_down) = handlers.on_pointer_down {
        let shared = Rc::new(std::cell::RefCell::new(on_pointer_down));
        for kind in [EventKind::MouseDown, EventKind::PointerDown] {
            let shared = Rc::clone(&shared);
            ids.push(hub.add_listener(kind, true, move |event| {
                if (shared.borrow_mut())(event.target, event.pointer.unwrap_or_default()) {
                    consume(event);
                }
            }));
        }
    }
    if let Some(mut on_hover) = handlers.on_hover {
        ids.push(hub.add_listener(EventKind::PointerOver, true, move |event| {
            swallow(event);
            if let Some(element) = event.target {
                on_hover(element, event.pointer.unwrap_or_default());
            }
        }));
    }
    for kind in prevent_events {
        ids.push(hub.add_listener(*kind, true, swallow));
    }

    PointerListenerGuard {
        hub: Rc::downgrade(hub),
        ids,
    }
}

fn swallow(event: &mut DomEvent) {
    event.prevent_default();
    event.stop_propagation();
}

fn consume(event: &mut DomEvent) {
    event.prevent_default();
    event.stop_immediate_propagation();
}

/// Keeps the gateway listeners registered; dropping it detaches them all.
pub struct PointerListenerGuard {
    hub: Weak<EventHub>,
    ids: Vec<ListenerId>,
}

impl Drop for PointerListenerGuard {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            for id in self.ids.drain(..) {
                hub.remove_listener(id);
            }
        }
    }
}
