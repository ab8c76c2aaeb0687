//! Serializer for the outline grammar.
//!
//! ```text
//! Mind Map generated by mmd-core
//! > __version__=`1.1`
//! ---
//!
//! # Root
//! > collapsed=`true`
//!
//! - NOTE
//! <pre>some note</pre>
//!
//! ## Child
//! ```

use std::fmt::Write;

use crate::{
    codec::{
        escape::{escape_markdown, format_attributes},
        lexer::{Lexer, TokenKind},
    },
    model::map::{MapState, TopicId},
};

/// Writes the header and the tree reachable from the root.
pub(crate) fn write_map(state: &MapState, head_line: &str) -> String {
    let mut out = String::new();
    write_header(state, head_line, &mut out);
    if let Some(root) = state.root {
        write_topic(state, root, 1, &mut out);
    }
    out
}

fn write_header(state: &MapState, head_line: &str, out: &mut String) {
    let head = head_line.lines().next().unwrap_or_default().trim();
    let is_plain_text = Lexer::new(head)
        .next()
        .is_none_or(|token| token.kind == TokenKind::UnknownLine);
    if is_plain_text {
        out.push_str(head);
    } else {
        tracing::debug!("Head line {head:?} would be read back as content, escaping it");
        out.push_str(&escape_markdown(head));
    }
    out.push('\n');
    if !state.attributes.is_empty() {
        out.push_str("> ");
        out.push_str(&format_attributes(&state.attributes));
        out.push('\n');
    }
    out.push_str("---\n");
}

/// Writes the subtree of `id`, its heading at `level`.
pub(crate) fn write_topic(state: &MapState, id: TopicId, level: usize, out: &mut String) {
    let Some(node) = state.node(id) else {
        return;
    };
    out.push('\n');
    for _ in 0..level {
        out.push('#');
    }
    out.push(' ');
    out.push_str(&escape_markdown(&node.text));
    out.push('\n');

    if !node.attributes.is_empty() {
        out.push_str("> ");
        out.push_str(&format_attributes(&node.attributes));
        out.push_str("\n\n");
    }

    for (ty, extra) in node.extras.iter() {
        // Writing into a String cannot fail.
        let _ = write!(out, "- {ty}\n{}\n\n", extra.encode());
    }

    for child in node.children.iter() {
        write_topic(state, *child, level + 1, out);
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{
        extra::Extra,
        map::{MindMap, FORMAT_VERSION},
        uri::MapUri,
    };

    #[test]
    fn test_document_shape() {
        let map = MindMap::with_root("Root");
        let root = map.root().unwrap();
        root.set_attribute("collapsed", Some("true"));
        root.set_extra([
            Extra::Note("some note".into()),
            Extra::Link(MapUri::parse("https://example.com").unwrap()),
        ]);
        root.make_child("Child", None).unwrap();

        let expected = format!(
            "Mind Map generated by mmd-core\n> __version__=`{FORMAT_VERSION}`\n---\n\n# Root\n> collapsed=`true`\n\n- LINK\n<pre>https://example.com/</pre>\n\n- NOTE\n<pre>some note</pre>\n\n## Child\n"
        );
        assert_eq!(map.write(), expected);
    }

    #[test]
    fn test_empty_document_writes_header_only() {
        let map = MindMap::new();
        map.set_attribute("__version__", None);
        assert_eq!(map.write(), "Mind Map generated by mmd-core\n---\n");
    }

    #[test]
    fn test_head_line_cannot_become_content() {
        let map = MindMap::with_root("r");
        let config = crate::config::MindMapConfig {
            head_line: "# Fake heading".to_string(),
            ..Default::default()
        };
        let text = map.write_with(&config);
        assert!(text.starts_with("\\# Fake heading\n"));
        let parsed = MindMap::parse(&text).unwrap();
        assert_eq!(parsed.topics().len(), 1);
        assert_eq!(parsed.root().unwrap().text(), "r");
    }
}
