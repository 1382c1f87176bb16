//! Highlight indicator state.
//!
//! The overlay tracks what is currently highlighted: the target's box
//! geometry plus the name and source text shown in its tip. Rendering is the
//! embedder's concern; this module only owns the state and the tip placement
//! math.

use std::cell::RefCell;
use std::rc::Rc;

use crate::dom::{Document, ElementId};
use crate::geometry::{self, BoxSizing, Point, Rect, Size};

/// Snapshot of one highlighted element.
#[derive(Debug, Clone, PartialEq)]
pub struct Indication {
    pub element: ElementId,
    pub rect: Rect,
    pub box_sizing: BoxSizing,
    /// Display name shown in the tip.
    pub title: Option<String>,
    /// Source text shown in the tip, `path:line` form.
    pub info: Option<String>,
}

pub struct Overlay {
    doc: Rc<RefCell<Document>>,
    current: RefCell<Option<Indication>>,
}

impl Overlay {
    pub fn new(doc: Rc<RefCell<Document>>) -> Self {
        Self {
            doc,
            current: RefCell::new(None),
        }
    }

    /// Highlight `element`, replacing any previous indication.
    pub fn inspect(&self, element: ElementId, title: Option<String>, info: Option<String>) {
        let doc = self.doc.borrow();
        let indication = Indication {
            element,
            rect: geometry::bounding_rect(&doc, element),
            box_sizing: geometry::box_sizing(&doc, element),
            title,
            info,
        };
        tracing::debug!(?indication.rect, title = ?indication.title, "overlay inspect");
        *self.current.borrow_mut() = Some(indication);
    }

    /// Idempotent.
    pub fn hide(&self) {
        self.current.borrow_mut().take();
    }

    pub fn current(&self) -> Option<Indication> {
        self.current.borrow().clone()
    }

    pub fn is_visible(&self) -> bool {
        self.current.borrow().is_some()
    }

    /// Where a tip of `tip_size` should sit for the current indication,
    /// constrained to the viewport space box.
    pub fn tip_position(&self, tip_size: Size) -> Option<Point> {
        let indication = self.current.borrow().clone()?;
        let doc = self.doc.borrow();
        let space = geometry::view_space_box(&doc);
        Some(geometry::restraint_tip_position(
            indication.rect,
            space,
            tip_size,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Size;

    #[test]
    fn inspect_then_hide_round_trip() {
        let mut doc = Document::new(Size {
            width: 800.0,
            height: 600.0,
        });
        let body = doc.body();
        let el = doc.create_element("div");
        doc.append_child(body, el);
        doc.set_rect(el, Rect::new(10.0, 10.0, 50.0, 20.0));
        doc.set_rect(doc.document_element(), Rect::new(0.0, 0.0, 800.0, 600.0));

        let overlay = Overlay::new(Rc::new(RefCell::new(doc)));
        overlay.inspect(el, Some("Card".to_owned()), Some("src/card.tsx:4".to_owned()));
        assert!(overlay.is_visible());

        let current = overlay.current().unwrap();
        assert_eq!(current.rect, Rect::new(10.0, 10.0, 50.0, 20.0));

        let tip = overlay
            .tip_position(Size {
                width: 100.0,
                height: 40.0,
            })
            .unwrap();
        // directly below the element with the 4px gap
        assert_eq!(tip, Point { x: 10.0, y: 34.0 });

        overlay.hide();
        overlay.hide();
        assert!(!overlay.is_visible());
        assert_eq!(overlay.tip_position(Size::default()), None);
    }
}
