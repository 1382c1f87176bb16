//! Rectangle math shared by the highlight overlay and the context panel.
//!
//! Everything here is pure: boxes in, boxes out. The only state these
//! functions ever read is the document snapshot they are handed.

use crate::dom::{Document, ElementId};

/// Viewport-relative coordinate, as produced per input event.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pointer {
    pub client_x: f64,
    pub client_y: f64,
}

impl Pointer {
    pub fn new(client_x: f64, client_y: f64) -> Self {
        Self { client_x, client_y }
    }

    pub fn point(&self) -> Point {
        Point {
            x: self.client_x,
            y: self.client_y,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn origin(&self) -> Point {
        Point {
            x: self.x,
            y: self.y,
        }
    }

    pub fn size(&self) -> Size {
        Size {
            width: self.width,
            height: self.height,
        }
    }

    pub fn contains(&self, point: Point) -> bool {
        if self.width <= 0.0 || self.height <= 0.0 {
            return false;
        }
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }
}

/// Resolved border/padding/margin widths in integer pixels, one value per
/// side. Non-visual nodes report all zeroes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoxSizing {
    pub border_top: i32,
    pub border_right: i32,
    pub border_bottom: i32,
    pub border_left: i32,
    pub padding_top: i32,
    pub padding_right: i32,
    pub padding_bottom: i32,
    pub padding_left: i32,
    pub margin_top: i32,
    pub margin_right: i32,
    pub margin_bottom: i32,
    pub margin_left: i32,
}

/// Viewport-relative bounding box of an element; zero rect when the element
/// is missing or not a visual node.
pub fn bounding_rect(doc: &Document, element: ElementId) -> Rect {
    doc.rect_of(element).unwrap_or_default()
}

/// Resolved box sizing of an element; all-zero when not a visual node.
pub fn box_sizing(doc: &Document, element: ElementId) -> BoxSizing {
    doc.box_sizing_of(element).unwrap_or_default()
}

/// The scrollable viewport box in document coordinates: the document box
/// origin shifted by the current scroll offset, sized to the viewport.
pub fn view_space_box(doc: &Document) -> Rect {
    let document_box = bounding_rect(doc, doc.document_element());
    let scroll = doc.scroll_offset();
    let viewport = doc.viewport();
    Rect {
        x: document_box.x + scroll.x,
        y: document_box.y + scroll.y,
        width: viewport.width,
        height: viewport.height,
    }
}

/// Gap between the target's box and the floating tip.
const TIP_OFFSET: f64 = 4.0;
/// Margin kept between the tip and the space box edges when shifting inward.
const SHIFT_PADDING: f64 = 4.0;

/// Position a floating rectangle (tooltip or panel) against a target box,
/// constrained within `space_box`.
///
/// Placement precedence:
/// 1. directly below the target, left-aligned, with a fixed 4px gap;
/// 2. vertical-only flip to above the target when the tip would overflow the
///    bottom of the space box (whichever side overflows less wins a tie for
///    the original below placement);
/// 3. any residual overflow is shifted inward to leave a 4px margin, and a
///    tip larger than the space box sits flush against the padded start edge.
pub fn restraint_tip_position(element_box: Rect, space_box: Rect, tip_size: Size) -> Point {
    let below = element_box.bottom() + TIP_OFFSET;
    let above = element_box.y - TIP_OFFSET - tip_size.height;

    let overflow_below = (below + tip_size.height) - space_box.bottom();
    let mut y = below;
    if overflow_below > 0.0 {
        let overflow_above = space_box.y - above;
        if overflow_above <= 0.0 || overflow_above < overflow_below {
            y = above;
        }
    }

    let x = element_box.x;

    Point {
        x: shift_into(x, space_box.x, space_box.right(), tip_size.width),
        y: shift_into(y, space_box.y, space_box.bottom(), tip_size.height),
    }
}

fn shift_into(position: f64, space_start: f64, space_end: f64, length: f64) -> f64 {
    let min = space_start + SHIFT_PADDING;
    let max = space_end - length - SHIFT_PADDING;
    if max < min {
        // floating box larger than the space box: flush to the padded edge
        return min;
    }
    position.clamp(min, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ITEM: f64 = 50.0;
    const GAP: f64 = 4.0;

    fn space() -> Rect {
        Rect::new(0.0, 0.0, 200.0, 300.0)
    }

    fn tip() -> Size {
        Size {
            width: 100.0,
            height: 48.0,
        }
    }

    fn item_at(x: f64, y: f64) -> Rect {
        Rect::new(x, y, ITEM, ITEM)
    }

    fn place(element_box: Rect) -> Point {
        restraint_tip_position(element_box, space(), tip())
    }

    #[test]
    fn common_corners() {
        let space = space();
        let tip = tip();
        let cases = [
            // top-left corner
            (item_at(0.0, 0.0), Point { x: GAP, y: ITEM + GAP }),
            // top-right corner
            (
                item_at(space.width - ITEM, 0.0),
                Point {
                    x: space.right() - tip.width - GAP,
                    y: ITEM + GAP,
                },
            ),
            // bottom-left corner
            (
                item_at(0.0, space.height - ITEM),
                Point {
                    x: GAP,
                    y: space.bottom() - ITEM - tip.height - GAP,
                },
            ),
            // bottom-right corner
            (
                item_at(space.width - ITEM, space.height - ITEM),
                Point {
                    x: space.right() - tip.width - GAP,
                    y: space.bottom() - ITEM - tip.height - GAP,
                },
            ),
            // center
            (
                item_at((space.width - ITEM) / 2.0, (space.height - ITEM) / 2.0),
                Point {
                    x: (space.width - ITEM) / 2.0,
                    y: (space.height - ITEM) / 2.0 + ITEM + GAP,
                },
            ),
            // right of center but not flush against the space right edge
            (
                item_at(space.width - ITEM * 1.5, (space.height - ITEM) / 2.0),
                Point {
                    x: space.right() - tip.width - GAP,
                    y: (space.height - ITEM) / 2.0 + ITEM + GAP,
                },
            ),
        ];

        for (index, (element_box, expected)) in cases.iter().enumerate() {
            assert_eq!(place(*element_box), *expected, "case[{index}]");
        }
    }

    #[test]
    fn outside_space() {
        let space = space();
        let tip = tip();
        let cases = [
            // above the space entirely
            (item_at(0.0, -2.0 * ITEM), Point { x: GAP, y: GAP }),
            // below the space entirely
            (
                item_at(space.width - ITEM, space.height + 2.0 * ITEM),
                Point {
                    x: space.right() - tip.width - GAP,
                    y: space.height - tip.height - GAP,
                },
            ),
            // left of the space entirely
            (
                item_at(-2.0 * ITEM, space.height - ITEM),
                Point {
                    x: GAP,
                    y: space.bottom() - ITEM - tip.height - GAP,
                },
            ),
            // right of the space entirely
            (
                item_at(space.width + 2.0 * ITEM, space.height - ITEM),
                Point {
                    x: space.right() - tip.width - GAP,
                    y: space.bottom() - ITEM - tip.height - GAP,
                },
            ),
        ];

        for (index, (element_box, expected)) in cases.iter().enumerate() {
            assert_eq!(place(*element_box), *expected, "case[{index}]");
        }
    }

    #[test]
    fn tip_wider_than_space() {
        let space = space();
        let wide_tip = Size {
            width: 300.0,
            height: 48.0,
        };
        let element_box = item_at((space.width - ITEM) / 2.0, (space.height - ITEM) / 2.0);
        let result = restraint_tip_position(element_box, space, wide_tip);
        assert_eq!(
            result,
            Point {
                x: GAP,
                y: (space.height - ITEM) / 2.0 + ITEM + GAP,
            }
        );
    }

    #[test]
    fn element_larger_than_space() {
        let space = space();
        let tip = tip();
        let clamped = Point {
            x: GAP,
            y: space.height - tip.height - GAP,
        };
        // target covering the space box exactly
        assert_eq!(
            restraint_tip_position(Rect::new(0.0, 0.0, space.width, space.height), space, tip),
            clamped
        );
        // target overflowing the space box on every side
        assert_eq!(
            restraint_tip_position(
                Rect::new(-20.0, -20.0, space.width + 40.0, space.height + 40.0),
                space,
                tip
            ),
            clamped
        );
    }

    #[test]
    fn rect_contains_excludes_far_edges() {
        let rect = Rect::new(1.0, 1.0, 3.0, 3.0);
        assert!(rect.contains(Point { x: 1.0, y: 1.0 }));
        assert!(!rect.contains(Point { x: 4.0, y: 1.0 }));
        assert!(!Rect::new(0.0, 0.0, 0.0, 5.0).contains(Point { x: 0.0, y: 0.0 }));
    }
}
