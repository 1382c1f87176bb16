//! Source-location resolution for instance nodes.
//!
//! Two independent sources feed a [`CodeInfo`]: debug metadata recorded by
//! the renderer at build time, and the trace attribute stamped on the host
//! element by the build plugin. When both exist the attribute wins per
//! overlapping field.

use crate::dom::Document;
use crate::trace::{TRACE_SOURCE, Trace};
use crate::tree::{InstanceTree, NodeId};

/// Resolved source location of a rendered element.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CodeInfo {
    /// 1-based line.
    pub line_number: u32,
    /// 1-based column.
    pub column_number: u32,
    /// Path relative to the dev-server working directory, when a build step
    /// recorded one explicitly.
    pub relative_path: Option<String>,
    /// Path as recorded by the build tool; may itself be project-relative.
    pub absolute_path: Option<String>,
}

impl CodeInfo {
    /// Display path: the relative path when present, else the recorded one.
    pub fn path(&self) -> Option<&str> {
        self.relative_path
            .as_deref()
            .or(self.absolute_path.as_deref())
    }
}

/// `path` or `path:line`, the subtitle text shown in chain items.
pub fn path_with_line(code_info: Option<&CodeInfo>) -> Option<String> {
    let info = code_info?;
    let path = info.path()?;
    Some(format!("{}:{}", path, info.line_number))
}

/// Some build tools record file names wrapped in angle brackets
/// (`</app/file.tsx>`); strip them.
fn strip_angle_brackets(file_name: &str) -> &str {
    if file_name.len() >= 2 && file_name.starts_with('<') && file_name.ends_with('>') {
        &file_name[1..file_name.len() - 1]
    } else {
        file_name
    }
}

/// Location from the renderer's debug metadata. Checks the node itself,
/// then exactly two owner hops; anything further is resolved through the
/// normal upward walk instead.
pub fn from_debug_source(tree: &InstanceTree, node: NodeId) -> Option<CodeInfo> {
    let source = tree
        .debug_source(node)
        .or_else(|| tree.owner(node).and_then(|owner| tree.debug_source(owner)))
        .or_else(|| {
            tree.owner(node)
                .and_then(|owner| tree.owner(owner))
                .and_then(|owner| tree.debug_source(owner))
        })?;

    if source.file_name.is_empty() || source.line_number == 0 {
        return None;
    }
    Some(CodeInfo {
        line_number: source.line_number,
        column_number: source.column_number.unwrap_or(1),
        relative_path: None,
        absolute_path: Some(strip_angle_brackets(&source.file_name).to_owned()),
    })
}

/// Location from the trace attribute on the node's host element. The
/// attribute sweeper may have moved the value out of the visible bag, so
/// both stores are consulted.
pub fn from_trace_attribute(doc: &Document, tree: &InstanceTree, node: NodeId) -> Option<CodeInfo> {
    let element = tree.element(node)?;
    let value = doc
        .attribute(element, TRACE_SOURCE)
        .or_else(|| doc.hidden_prop(element, TRACE_SOURCE))?;
    let trace = Trace::parse(value).ok()?;
    Some(CodeInfo {
        line_number: trace.line,
        column_number: trace.column,
        relative_path: None,
        absolute_path: Some(strip_angle_brackets(&trace.file_name).to_owned()),
    })
}

/// Merged location for a node: debug metadata first, trace attribute layered
/// on top so its fields win where both sources answer.
pub fn code_info_for_node(
    doc: &Document,
    tree: &InstanceTree,
    node: NodeId,
) -> Option<CodeInfo> {
    let debug = from_debug_source(tree, node);
    let attribute = from_trace_attribute(doc, tree, node);
    match (debug, attribute) {
        (None, None) => None,
        (Some(info), None) | (None, Some(info)) => Some(info),
        (Some(debug), Some(attribute)) => Some(CodeInfo {
            line_number: attribute.line_number,
            column_number: attribute.column_number,
            relative_path: attribute.relative_path.or(debug.relative_path),
            absolute_path: attribute.absolute_path.or(debug.absolute_path),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Size;
    use crate::tree::DebugSource;

    fn doc() -> Document {
        Document::new(Size {
            width: 800.0,
            height: 600.0,
        })
    }

    #[test]
    fn debug_source_checks_two_owner_hops_only() {
        let mut tree = InstanceTree::new(None);
        let a = tree.add_component("A", tree.root());
        let b = tree.add_component("B", a);
        let c = tree.add_component("C", b);
        let d = tree.add_component("D", c);

        tree.set_owner(d, c);
        tree.set_owner(c, b);
        tree.set_owner(b, a);
        tree.set_debug_source(
            a,
            DebugSource {
                file_name: "/app/a.tsx".to_owned(),
                line_number: 1,
                column_number: None,
            },
        );

        // a is three owner hops from d: out of reach
        assert_eq!(from_debug_source(&tree, d), None);
        // but only two from c
        let info = from_debug_source(&tree, c).unwrap();
        assert_eq!(info.absolute_path.as_deref(), Some("/app/a.tsx"));
        assert_eq!(info.column_number, 1);
    }

    #[test]
    fn angle_bracket_file_names_are_unwrapped() {
        let mut tree = InstanceTree::new(None);
        let a = tree.add_component("A", tree.root());
        tree.set_debug_source(
            a,
            DebugSource {
                file_name: "</app/weird.tsx>".to_owned(),
                line_number: 9,
                column_number: Some(3),
            },
        );
        let info = from_debug_source(&tree, a).unwrap();
        assert_eq!(info.absolute_path.as_deref(), Some("/app/weird.tsx"));
    }

    #[test]
    fn attribute_source_wins_on_merge() {
        let mut doc = doc();
        let body = doc.body();
        let el = doc.create_element("h1");
        doc.append_child(body, el);
        doc.set_attribute(el, TRACE_SOURCE, "src/title.tsx:12:5:h1");

        let mut tree = InstanceTree::new(None);
        let app = tree.add_component("App", tree.root());
        let host = tree.add_host("h1", app, el);
        tree.set_debug_source(
            host,
            DebugSource {
                file_name: "/abs/title.tsx".to_owned(),
                line_number: 99,
                column_number: Some(1),
            },
        );

        let info = code_info_for_node(&doc, &tree, host).unwrap();
        assert_eq!(info.line_number, 12);
        assert_eq!(info.column_number, 5);
        assert_eq!(info.absolute_path.as_deref(), Some("src/title.tsx"));
    }

    #[test]
    fn swept_attribute_still_resolves() {
        let mut doc = doc();
        let body = doc.body();
        let el = doc.create_element("div");
        doc.append_child(body, el);
        doc.set_attribute(el, TRACE_SOURCE, "src/card.tsx:4:2:div");
        doc.stash_attribute(el, TRACE_SOURCE);

        let mut tree = InstanceTree::new(None);
        let app = tree.add_component("App", tree.root());
        let host = tree.add_host("div", app, el);

        let info = from_trace_attribute(&doc, &tree, host).unwrap();
        assert_eq!(info.line_number, 4);
    }

    #[test]
    fn path_with_line_prefers_relative() {
        let info = CodeInfo {
            line_number: 7,
            column_number: 1,
            relative_path: Some("src/a.tsx".to_owned()),
            absolute_path: Some("/app/src/a.tsx".to_owned()),
        };
        assert_eq!(path_with_line(Some(&info)).as_deref(), Some("src/a.tsx:7"));
        assert_eq!(path_with_line(None), None);
    }
}
