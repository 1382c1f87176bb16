//! Context panel: the floating inspection menu.
//!
//! The panel is a shadow-hosted box the engine places near the triggering
//! pointer, then lets the user drag by its header and resize by eight
//! edge/corner handles. Interaction runs as sessions: a pointerdown on a
//! handle starts one, every pointermove is swallowed and applied, and the
//! first terminator event ends it. A primary-button press outside the panel
//! swallows the whole down/up/click triplet and dismisses.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::dom::{DomEvent, ElementId, EventHub, EventKind, ListenerId, PointerButton};
use crate::geometry::{self, Point, Pointer, Rect, Size};

pub const PANEL_TAG: &str = "inspect-context-panel";

/// Marks the element a drag session may start from.
pub const DRAGGABLE_ATTR: &str = "data-draggable-block";
/// Marks a resize handle; a direction attribute sits next to it.
pub const RESIZE_HANDLER_ATTR: &str = "data-resize-handler";

const EDGE_THICKNESS: f64 = 4.0;
const CORNER_SIZE: f64 = 8.0;
const HEADER_HEIGHT: f64 = 32.0;
/// Virtual box around the opening pointer the panel is placed against.
const POINTER_PADDING: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SizeLimit {
    pub min_width: Option<f64>,
    pub min_height: Option<f64>,
    pub max_width: Option<f64>,
    pub max_height: Option<f64>,
}

pub const PANEL_SIZE_LIMIT: SizeLimit = SizeLimit {
    min_width: Some(160.0),
    min_height: Some(160.0),
    max_width: Some(800.0),
    max_height: Some(800.0),
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeDirection {
    Top,
    Right,
    Bottom,
    Left,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl ResizeDirection {
    pub const ALL: [ResizeDirection; 8] = [
        ResizeDirection::Top,
        ResizeDirection::Right,
        ResizeDirection::Bottom,
        ResizeDirection::Left,
        ResizeDirection::TopLeft,
        ResizeDirection::TopRight,
        ResizeDirection::BottomLeft,
        ResizeDirection::BottomRight,
    ];

    pub fn attr(self) -> &'static str {
        match self {
            ResizeDirection::Top => "data-resize-border-top",
            ResizeDirection::Right => "data-resize-border-right",
            ResizeDirection::Bottom => "data-resize-border-bottom",
            ResizeDirection::Left => "data-resize-border-left",
            ResizeDirection::TopLeft => "data-resize-corner-top-left",
            ResizeDirection::TopRight => "data-resize-corner-top-right",
            ResizeDirection::BottomLeft => "data-resize-corner-bottom-left",
            ResizeDirection::BottomRight => "data-resize-corner-bottom-right",
        }
    }

    pub fn cursor(self) -> &'static str {
        match self {
            ResizeDirection::Top | ResizeDirection::Bottom => "ns-resize",
            ResizeDirection::Left | ResizeDirection::Right => "ew-resize",
            ResizeDirection::TopLeft | ResizeDirection::BottomRight => "nwse-resize",
            ResizeDirection::TopRight | ResizeDirection::BottomLeft => "nesw-resize",
        }
    }

    /// How pointer movement maps to a size change, per axis.
    fn size_ratio(self) -> (f64, f64) {
        match self {
            ResizeDirection::Left => (-1.0, 0.0),
            ResizeDirection::Top => (0.0, -1.0),
            ResizeDirection::Right => (1.0, 0.0),
            ResizeDirection::Bottom => (0.0, 1.0),
            ResizeDirection::TopLeft => (-1.0, -1.0),
            ResizeDirection::TopRight => (1.0, -1.0),
            ResizeDirection::BottomLeft => (-1.0, 1.0),
            ResizeDirection::BottomRight => (1.0, 1.0),
        }
    }

    /// How much of the size delta shifts the origin. Only start-side edges
    /// move the origin; the opposite edge stays fixed.
    fn position_ratio(self) -> Option<(f64, f64)> {
        let (sx, sy) = self.size_ratio();
        if sx != -1.0 && sy != -1.0 {
            return None;
        }
        Some((
            if sx == -1.0 { 1.0 } else { 0.0 },
            if sy == -1.0 { 1.0 } else { 0.0 },
        ))
    }
}

fn clamp_size(limit: &SizeLimit, mut width: f64, mut height: f64) -> (f64, f64) {
    if let Some(min) = limit.min_width {
        width = width.max(min);
    }
    if let Some(min) = limit.min_height {
        height = height.max(min);
    }
    if let Some(max) = limit.max_width {
        width = width.min(max);
    }
    if let Some(max) = limit.max_height {
        height = height.min(max);
    }
    (width, height)
}

/// Apply one resize step: cumulative pointer `movement` against the rect the
/// session started from. Clamps to `limit`, then moves the origin by the
/// clamped delta when a start-side edge drags.
pub fn apply_resize(
    start: Rect,
    direction: ResizeDirection,
    movement: Point,
    limit: &SizeLimit,
) -> Rect {
    let (sx, sy) = direction.size_ratio();
    let (width, height) = clamp_size(
        limit,
        start.width + movement.x * sx,
        start.height + movement.y * sy,
    );

    let delta_x = start.width - width;
    let delta_y = start.height - height;

    let (x, y) = match direction.position_ratio() {
        Some((px, py)) => (start.x + delta_x * px, start.y + delta_y * py),
        None => (start.x, start.y),
    };
    Rect::new(x, y, width, height)
}

/// Apply one drag step: the position the session started from plus the raw
/// cumulative pointer delta. No clamping; the panel may leave the viewport.
pub fn apply_drag(start: Point, down: Pointer, current: Pointer) -> Point {
    Point {
        x: current.client_x - down.client_x + start.x,
        y: current.client_y - down.client_y + start.y,
    }
}

pub struct PanelShowParams {
    /// Pointer position the panel opens from.
    pub pointer: Point,
    /// Measured size of the panel content.
    pub panel_size: Size,
    pub on_click_outside: Option<Rc<dyn Fn()>>,
}

enum Session {
    Drag {
        down: Pointer,
        start: Point,
    },
    Resize {
        down: Pointer,
        start: Rect,
        direction: ResizeDirection,
    },
}

pub struct InspectContextPanel {
    weak: Weak<InspectContextPanel>,
    hub: Rc<EventHub>,
    host: ElementId,
    container: ElementId,
    header: ElementId,
    handles: Vec<(ElementId, ResizeDirection)>,
    size_limit: SizeLimit,

    visible: Cell<bool>,
    position: Cell<Option<Point>>,
    size: Cell<Option<Size>>,

    session: RefCell<Option<Session>>,
    session_listeners: RefCell<Vec<ListenerId>>,
    session_started: Cell<bool>,

    trigger_listener: Cell<Option<ListenerId>>,
    outside_listeners: RefCell<Vec<ListenerId>>,
    outside_armed: Cell<bool>,
    on_click_outside: RefCell<Vec<Rc<dyn Fn()>>>,
}

impl InspectContextPanel {
    /// Create the panel host under `body` with its shadow content.
    pub fn new(hub: Rc<EventHub>) -> Rc<Self> {
        let doc_rc = hub.document();
        let (host, container, header, handles) = {
            let mut doc = doc_rc.borrow_mut();
            let body = doc.body();
            let host = doc.create_element(PANEL_TAG);
            doc.append_child(body, host);
            let shadow = doc.attach_shadow(host);

            let container = doc.create_element("div");
            doc.append_child(shadow, container);

            let header = doc.create_element("div");
            doc.set_attribute(header, DRAGGABLE_ATTR, "");
            doc.append_child(container, header);

            let mut handles = Vec::new();
            for direction in ResizeDirection::ALL {
                let handle = doc.create_element("div");
                doc.set_attribute(handle, RESIZE_HANDLER_ATTR, "");
                doc.set_attribute(handle, direction.attr(), "");
                doc.append_child(container, handle);
                handles.push((handle, direction));
            }
            (host, container, header, handles)
        };

        let panel = Rc::new_cyclic(|weak| Self {
            weak: weak.clone(),
            hub: Rc::clone(&hub),
            host,
            container,
            header,
            handles,
            size_limit: PANEL_SIZE_LIMIT,
            visible: Cell::new(false),
            position: Cell::new(None),
            size: Cell::new(None),
            session: RefCell::new(None),
            session_listeners: RefCell::new(Vec::new()),
            session_started: Cell::new(false),
            trigger_listener: Cell::new(None),
            outside_listeners: RefCell::new(Vec::new()),
            outside_armed: Cell::new(false),
            on_click_outside: RefCell::new(Vec::new()),
        });

        let weak = panel.weak.clone();
        let id = hub.add_listener(EventKind::PointerDown, false, move |event| {
            if let Some(panel) = weak.upgrade() {
                panel.resize_or_drag_trigger(event);
            }
        });
        panel.trigger_listener.set(Some(id));

        panel
    }

    pub fn layout(&self) -> Option<Rect> {
        let position = self.position.get()?;
        let size = self.size.get()?;
        Some(Rect::new(position.x, position.y, size.width, size.height))
    }

    pub fn is_visible(&self) -> bool {
        self.visible.get()
    }

    pub fn host(&self) -> ElementId {
        self.host
    }

    pub fn header(&self) -> ElementId {
        self.header
    }

    pub fn handle(&self, direction: ResizeDirection) -> Option<ElementId> {
        self.handles
            .iter()
            .find(|(_, dir)| *dir == direction)
            .map(|(handle, _)| *handle)
    }

    /// Place and show the panel near the opening pointer: a 4px virtual box
    /// around the cursor anchors the same placement used for tips.
    pub fn show(&self, params: PanelShowParams) {
        let anchor = Rect::new(
            params.pointer.x - POINTER_PADDING,
            params.pointer.y - POINTER_PADDING,
            POINTER_PADDING,
            POINTER_PADDING,
        );
        let space = {
            let doc = self.hub.document();
            let doc = doc.borrow();
            geometry::view_space_box(&doc)
        };
        let position = geometry::restraint_tip_position(anchor, space, params.panel_size);
        self.position.set(Some(position));
        self.size.set(Some(params.panel_size));
        self.visible.set(true);
        self.sync_layout();

        if let Some(callback) = params.on_click_outside {
            self.on_click_outside.borrow_mut().push(callback);
            self.listen_click_outside();
        }
        tracing::debug!(?position, "context panel shown");
    }

    /// Hide the panel and tear down its listeners. Idempotent.
    pub fn hide(&self) {
        self.end_session();
        for id in self.outside_listeners.borrow_mut().drain(..) {
            self.hub.remove_listener(id);
        }
        self.outside_armed.set(false);
        self.on_click_outside.borrow_mut().clear();
        self.visible.set(false);
        self.position.set(None);
        self.size.set(None);
        self.sync_layout();
    }

    /// Detach the panel from the document entirely.
    pub fn remove(&self) {
        self.hide();
        if let Some(id) = self.trigger_listener.take() {
            self.hub.remove_listener(id);
        }
        let doc = self.hub.document();
        doc.borrow_mut().remove(self.host);
    }

    /// Mirror the logical layout into element rects so hit testing sees the
    /// panel, its header, and its handles.
    fn sync_layout(&self) {
        let doc = self.hub.document();
        let mut doc = doc.borrow_mut();
        let rect = match (self.visible.get(), self.layout()) {
            (true, Some(rect)) => rect,
            _ => {
                doc.set_rect(self.host, Rect::default());
                doc.set_rect(self.container, Rect::default());
                doc.set_rect(self.header, Rect::default());
                for (handle, _) in &self.handles {
                    doc.set_rect(*handle, Rect::default());
                }
                return;
            }
        };

        doc.set_rect(self.host, rect);
        doc.set_rect(self.container, rect);
        doc.set_rect(
            self.header,
            Rect::new(rect.x, rect.y, rect.width, HEADER_HEIGHT),
        );
        for (handle, direction) in &self.handles {
            doc.set_rect(*handle, handle_rect(rect, *direction));
        }
    }

    /// Route a pointerdown on the panel into a drag or resize session.
    pub fn resize_or_drag_trigger(&self, event: &mut DomEvent) {
        if !self.visible.get() || event.button != PointerButton::Primary {
            return;
        }
        let Some(target) = event.composed_target() else {
            return;
        };
        let pointer = event.pointer.unwrap_or_default();

        if let Some(direction) = self.handle_direction(target) {
            event.stop_propagation();
            event.prevent_default();
            self.start_resize(pointer, direction);
            return;
        }

        let is_draggable = {
            let doc = self.hub.document();
            let doc = doc.borrow();
            doc.has_attribute(target, DRAGGABLE_ATTR)
        };
        if is_draggable {
            event.stop_propagation();
            event.prevent_default();
            self.start_drag(pointer);
        }
    }

    fn handle_direction(&self, target: ElementId) -> Option<ResizeDirection> {
        self.handles
            .iter()
            .find(|(handle, _)| *handle == target)
            .map(|(_, direction)| *direction)
    }

    fn start_drag(&self, down: Pointer) {
        let Some(start) = self.position.get() else {
            return;
        };
        *self.session.borrow_mut() = Some(Session::Drag { down, start });
        self.begin_session();
    }

    fn start_resize(&self, down: Pointer, direction: ResizeDirection) {
        let Some(start) = self.layout() else {
            return;
        };
        *self.session.borrow_mut() = Some(Session::Resize {
            down,
            start,
            direction,
        });
        self.begin_session();
    }

    /// Register the session's move listener and its terminators. They are
    /// registered only now, so the pointerdown that started the session is
    /// not seen by its own terminator.
    fn begin_session(&self) {
        self.end_session_listeners();
        self.session_started.set(false);

        let mut ids = Vec::new();
        let weak = self.weak.clone();
        ids.push(
            self.hub
                .add_listener(EventKind::PointerMove, true, move |event| {
                    if let Some(panel) = weak.upgrade() {
                        panel.on_session_move(event);
                    }
                }),
        );
        for kind in [
            EventKind::PointerDown,
            EventKind::PointerCancel,
            EventKind::ContextMenu,
            EventKind::PointerUp,
            EventKind::Blur,
        ] {
            let weak = self.weak.clone();
            ids.push(self.hub.add_listener(kind, true, move |_| {
                if let Some(panel) = weak.upgrade() {
                    panel.end_session();
                }
            }));
        }
        *self.session_listeners.borrow_mut() = ids;
    }

    fn on_session_move(&self, event: &mut DomEvent) {
        event.prevent_default();
        event.stop_immediate_propagation();
        let pointer = event.pointer.unwrap_or_default();

        if !self.session_started.replace(true) {
            let attr = match *self.session.borrow() {
                Some(Session::Drag { .. }) => "data-dragging",
                Some(Session::Resize { .. }) => "data-resizing",
                None => return,
            };
            let doc = self.hub.document();
            doc.borrow_mut().set_attribute(self.container, attr, "");
        }

        let updated = match *self.session.borrow() {
            Some(Session::Drag { down, start }) => {
                self.position.set(Some(apply_drag(start, down, pointer)));
                true
            }
            Some(Session::Resize {
                down,
                start,
                direction,
            }) => {
                let movement = Point {
                    x: pointer.client_x - down.client_x,
                    y: pointer.client_y - down.client_y,
                };
                let rect = apply_resize(start, direction, movement, &self.size_limit);
                self.position.set(Some(rect.origin()));
                self.size.set(Some(rect.size()));
                true
            }
            None => false,
        };
        if updated {
            self.sync_layout();
        }
    }

    fn end_session(&self) {
        self.end_session_listeners();
        if self.session.borrow_mut().take().is_some() {
            let doc = self.hub.document();
            let mut doc = doc.borrow_mut();
            doc.remove_attribute(self.container, "data-dragging");
            doc.remove_attribute(self.container, "data-resizing");
        }
    }

    fn end_session_listeners(&self) {
        for id in self.session_listeners.borrow_mut().drain(..) {
            self.hub.remove_listener(id);
        }
    }

    /// A primary press outside the panel swallows pointerdown, pointerup and
    /// click, then fires the dismiss callbacks on the click.
    fn listen_click_outside(&self) {
        if !self.outside_listeners.borrow().is_empty() {
            return;
        }
        let mut ids = Vec::new();

        let weak = self.weak.clone();
        ids.push(
            self.hub
                .add_listener(EventKind::PointerDown, true, move |event| {
                    let Some(panel) = weak.upgrade() else {
                        return;
                    };
                    if event.button != PointerButton::Primary {
                        return;
                    }
                    if event.composed_path().contains(&panel.host) {
                        return;
                    }
                    swallow(event);
                    panel.outside_armed.set(true);
                }),
        );

        let weak = self.weak.clone();
        ids.push(
            self.hub
                .add_listener(EventKind::PointerUp, true, move |event| {
                    if let Some(panel) = weak.upgrade() {
                        if panel.outside_armed.get() {
                            swallow(event);
                        }
                    }
                }),
        );

        let weak = self.weak.clone();
        ids.push(self.hub.add_listener(EventKind::Click, true, move |event| {
            let Some(panel) = weak.upgrade() else {
                return;
            };
            if !panel.outside_armed.replace(false) {
                return;
            }
            swallow(event);
            let callbacks: Vec<Rc<dyn Fn()>> = panel.on_click_outside.borrow().clone();
            for callback in callbacks {
                callback();
            }
        }));

        *self.outside_listeners.borrow_mut() = ids;
    }
}

fn swallow(event: &mut DomEvent) {
    event.prevent_default();
    event.stop_immediate_propagation();
}

fn handle_rect(rect: Rect, direction: ResizeDirection) -> Rect {
    let Rect {
        x,
        y,
        width,
        height,
    } = rect;
    match direction {
        ResizeDirection::Top => Rect::new(
            x + CORNER_SIZE,
            y,
            width - 2.0 * CORNER_SIZE,
            EDGE_THICKNESS,
        ),
        ResizeDirection::Bottom => Rect::new(
            x + CORNER_SIZE,
            y + height - EDGE_THICKNESS,
            width - 2.0 * CORNER_SIZE,
            EDGE_THICKNESS,
        ),
        ResizeDirection::Left => Rect::new(
            x,
            y + CORNER_SIZE,
            EDGE_THICKNESS,
            height - 2.0 * CORNER_SIZE,
        ),
        ResizeDirection::Right => Rect::new(
            x + width - EDGE_THICKNESS,
            y + CORNER_SIZE,
            EDGE_THICKNESS,
            height - 2.0 * CORNER_SIZE,
        ),
        ResizeDirection::TopLeft => Rect::new(x, y, CORNER_SIZE, CORNER_SIZE),
        ResizeDirection::TopRight => Rect::new(x + width - CORNER_SIZE, y, CORNER_SIZE, CORNER_SIZE),
        ResizeDirection::BottomLeft => {
            Rect::new(x, y + height - CORNER_SIZE, CORNER_SIZE, CORNER_SIZE)
        }
        ResizeDirection::BottomRight => Rect::new(
            x + width - CORNER_SIZE,
            y + height - CORNER_SIZE,
            CORNER_SIZE,
            CORNER_SIZE,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_LIMIT: SizeLimit = SizeLimit {
        min_width: None,
        min_height: None,
        max_width: None,
        max_height: None,
    };

    fn start() -> Rect {
        Rect::new(100.0, 100.0, 300.0, 200.0)
    }

    #[test]
    fn resize_right_grows_in_place() {
        let rect = apply_resize(
            start(),
            ResizeDirection::Right,
            Point { x: 50.0, y: 999.0 },
            &NO_LIMIT,
        );
        assert_eq!(rect, Rect::new(100.0, 100.0, 350.0, 200.0));
    }

    #[test]
    fn resize_left_keeps_right_edge_fixed() {
        let rect = apply_resize(
            start(),
            ResizeDirection::Left,
            Point { x: 50.0, y: 0.0 },
            &NO_LIMIT,
        );
        // dragging rightward shrinks and shifts the origin by the same amount
        assert_eq!(rect, Rect::new(150.0, 100.0, 250.0, 200.0));
        assert_eq!(rect.right(), start().right());
    }

    #[test]
    fn resize_top_keeps_bottom_edge_fixed() {
        let rect = apply_resize(
            start(),
            ResizeDirection::Top,
            Point { x: 0.0, y: -30.0 },
            &NO_LIMIT,
        );
        assert_eq!(rect, Rect::new(100.0, 70.0, 300.0, 230.0));
        assert_eq!(rect.bottom(), start().bottom());
    }

    #[test]
    fn resize_corners_pin_the_origin_rules() {
        let square = Rect::new(0.0, 0.0, 100.0, 100.0);
        let rect = apply_resize(
            square,
            ResizeDirection::BottomRight,
            Point { x: 20.0, y: 20.0 },
            &NO_LIMIT,
        );
        assert_eq!(rect, Rect::new(0.0, 0.0, 120.0, 120.0));

        let rect = apply_resize(
            square,
            ResizeDirection::TopLeft,
            Point { x: 20.0, y: 20.0 },
            &NO_LIMIT,
        );
        assert_eq!(rect, Rect::new(20.0, 20.0, 80.0, 80.0));
    }

    #[test]
    fn resize_corner_moves_both_axes() {
        let rect = apply_resize(
            start(),
            ResizeDirection::TopLeft,
            Point { x: 20.0, y: 10.0 },
            &NO_LIMIT,
        );
        assert_eq!(rect, Rect::new(120.0, 110.0, 280.0, 190.0));

        let rect = apply_resize(
            start(),
            ResizeDirection::BottomRight,
            Point { x: 20.0, y: 10.0 },
            &NO_LIMIT,
        );
        assert_eq!(rect, Rect::new(100.0, 100.0, 320.0, 210.0));
    }

    #[test]
    fn resize_clamp_still_fixes_opposite_edge() {
        let rect = apply_resize(
            start(),
            ResizeDirection::Left,
            Point { x: 200.0, y: 0.0 },
            &PANEL_SIZE_LIMIT,
        );
        // width clamps at 160, so the origin shifts by the clamped 140
        assert_eq!(rect, Rect::new(240.0, 100.0, 160.0, 200.0));
        assert_eq!(rect.right(), start().right());
    }

    #[test]
    fn drag_applies_raw_cumulative_delta() {
        let position = apply_drag(
            Point { x: 100.0, y: 100.0 },
            Pointer::new(50.0, 50.0),
            Pointer::new(70.0, 80.0),
        );
        assert_eq!(position, Point { x: 120.0, y: 130.0 });

        // negative deltas move the other way, equally unclamped
        let position = apply_drag(
            Point { x: 10.0, y: 20.0 },
            Pointer::new(100.0, 100.0),
            Pointer::new(130.0, 90.0),
        );
        assert_eq!(position, Point { x: 40.0, y: 10.0 });
    }
}
