//! Id/class badges for chain items.

use crate::chain::TagItem;
use crate::dom::{Document, ElementId};

/// Theme token for attribute badges; consumers map it to a color.
pub const TAG_BACKGROUND: &str = "tag-gray-1";

/// Badges describing the element itself: `#id` first, then the class list
/// joined as a single `.a.b.c` badge.
pub fn element_tags(doc: &Document, element: ElementId) -> Vec<TagItem> {
    let mut tags = Vec::new();

    if let Some(id) = doc.id_attr(element) {
        if !id.is_empty() {
            tags.push(TagItem::badge(format!("#{id}"), TAG_BACKGROUND));
        }
    }

    let classes = doc.class_list(element);
    if !classes.is_empty() {
        let mut label = String::new();
        for class in classes {
            label.push('.');
            label.push_str(class);
        }
        tags.push(TagItem::badge(label, TAG_BACKGROUND));
    }

    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Size;

    #[test]
    fn id_then_joined_classes() {
        let mut doc = Document::new(Size {
            width: 800.0,
            height: 600.0,
        });
        let el = doc.create_element("div");
        doc.set_id_attr(el, "root");
        doc.add_class(el, "card");
        doc.add_class(el, "wide");

        let tags = element_tags(&doc, el);
        let labels: Vec<&str> = tags.iter().map(|tag| tag.label.as_str()).collect();
        assert_eq!(labels, vec!["#root", ".card.wide"]);
    }

    #[test]
    fn bare_element_has_no_tags() {
        let mut doc = Document::new(Size {
            width: 800.0,
            height: 600.0,
        });
        let el = doc.create_element("div");
        assert!(element_tags(&doc, el).is_empty());
    }
}
