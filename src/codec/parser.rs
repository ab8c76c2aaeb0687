//! Builds a topic tree from the token stream.
//!
//! Headings carry their depth as a run of `#`. The builder tracks the current topic and its depth
//! and attaches each new heading as a child, a sibling or a child of an ancestor. Content that
//! does not fit the grammar is skipped with a log line; parsing itself cannot fail.

use crate::{
    codec::{
        escape::{parse_attributes, unescape_markdown},
        lexer::{Lexer, Token, TokenKind},
    },
    model::{
        extra::{Extra, ExtraType},
        map::{MapState, TopicId},
    },
};

struct TreeBuilder<'s> {
    state: &'s mut MapState,
    current: Option<TopicId>,
    depth: usize,
    pending: Option<ExtraType>,
}

impl<'s> TreeBuilder<'s> {
    fn new(state: &'s mut MapState) -> TreeBuilder<'s> {
        TreeBuilder {
            state,
            current: None,
            depth: 0,
            pending: None,
        }
    }

    fn accept(&mut self, token: &Token<'_>) {
        match token.kind {
            TokenKind::Topic => self.topic(token),
            TokenKind::Attribute => {
                self.pending = None;
                match self.current {
                    Some(id) => {
                        if let Some(node) = self.state.node_mut(id) {
                            parse_attributes(token.text, &mut node.attributes);
                        }
                    }
                    None => parse_attributes(token.text, &mut self.state.attributes),
                }
            }
            TokenKind::ExtraType => {
                let name = token.extra_type_name().unwrap_or_default();
                self.pending = match name.parse::<ExtraType>() {
                    Ok(ty) => Some(ty),
                    Err(err) => {
                        tracing::debug!("Line {}: {err}", token.line);
                        None
                    }
                };
            }
            TokenKind::ExtraText => {
                if let (Some(ty), Some(id)) = (self.pending.take(), self.current) {
                    match Extra::decode(ty, token.extra_body()) {
                        Ok(extra) => {
                            if let Some(node) = self.state.node_mut(id) {
                                node.extras.insert(ty, extra);
                            }
                        }
                        Err(err) => {
                            tracing::error!("Line {}: can't decode {ty} extra: {err}", token.line)
                        }
                    }
                } else {
                    tracing::debug!("Line {}: extra text without a pending type", token.line);
                }
            }
            TokenKind::UnknownLine => {
                if self.pending.take().is_some() {
                    tracing::debug!("Line {}: dropping pending extra type", token.line);
                }
            }
            TokenKind::HeadDelimiter | TokenKind::Whitespace => {}
        }
    }

    fn topic(&mut self, token: &Token<'_>) {
        let depth = token.topic_depth();
        let text = unescape_markdown(token.topic_text());

        let parent = match self.current {
            _ if depth == self.depth + 1 => self.current,
            Some(current) if depth == self.depth => self.state.parent_of(current),
            Some(current) if depth < self.depth => {
                self.state.find_parent_for_depth(current, self.depth - depth)
            }
            _ => {
                tracing::debug!(
                    "Line {}: heading depth {depth} skips levels below {}, dropped",
                    token.line,
                    self.depth
                );
                return;
            }
        };

        let id = self.state.create_topic(parent, text);
        self.current = Some(id);
        self.depth = depth;
    }

    fn finish(self) -> Option<TopicId> {
        let current = self.current?;
        let root = self.state.root_of(current);
        self.state.root = Some(root);
        let dropped = self.state.retain_reachable(root);
        if !dropped.is_empty() {
            tracing::debug!("Dropped {} topics not reachable from the root", dropped.len());
        }
        Some(root)
    }
}

/// Parses `source` into `state`, returning the new root or `None` when the text has no topics.
pub(crate) fn parse_into(state: &mut MapState, source: &str) -> Option<TopicId> {
    let mut builder = TreeBuilder::new(state);
    for token in Lexer::new(source) {
        builder.accept(&token);
    }
    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{model::map::MindMap, MindMapError};

    fn outline(map: &MindMap) -> Vec<(usize, String)> {
        map.topics()
            .iter()
            .map(|t| (t.topic_level(), t.text()))
            .collect()
    }

    #[test]
    fn test_depth_changes() {
        let map =
            MindMap::parse("# root\n## a\n### a1\n### a2\n## b\n### b1\n#### b11\n## c\n").unwrap();
        assert_eq!(
            outline(&map),
            vec![
                (0, "root".to_string()),
                (1, "a".to_string()),
                (2, "a1".to_string()),
                (2, "a2".to_string()),
                (1, "b".to_string()),
                (2, "b1".to_string()),
                (3, "b11".to_string()),
                (1, "c".to_string()),
            ]
        );
    }

    #[test]
    fn test_last_root_wins() {
        let map = MindMap::parse("# A\n## B\n## C\n# D\n").unwrap();
        let root = map.root().unwrap();
        assert_eq!(root.text(), "D");
        assert!(!root.has_children());
        assert_eq!(map.topics().len(), 1);
    }

    #[test]
    fn test_depth_gap_drops_heading() {
        let map = MindMap::parse("# root\n### too deep\n## child\n").unwrap();
        assert_eq!(
            outline(&map),
            vec![(0, "root".to_string()), (1, "child".to_string())]
        );
    }

    #[test]
    fn test_leading_depth_gap_drops_headings() {
        assert!(matches!(
            MindMap::parse("## A\n### B\n"),
            Err(MindMapError::EmptyDocument)
        ));
        let map = MindMap::parse("### lost\n# root\n## child\n").unwrap();
        assert_eq!(
            outline(&map),
            vec![(0, "root".to_string()), (1, "child".to_string())]
        );
    }

    #[test]
    fn test_pending_type_carries_over_headings() {
        let map = MindMap::parse("# A\n- NOTE\n## B\n<pre>n</pre>\n").unwrap();
        let root = map.root().unwrap();
        assert_eq!(root.extra(ExtraType::Note), None);
        assert_eq!(
            root.children()[0].extra(ExtraType::Note),
            Some(Extra::Note("n".into()))
        );
    }

    #[test]
    fn test_document_attributes_before_first_topic() {
        let map = MindMap::parse("Mind Map\n> __version__=`1.1`,showJumps=`true`\n---\n# root\n")
            .unwrap();
        assert_eq!(map.attribute("__version__").as_deref(), Some("1.1"));
        assert_eq!(map.attribute("showJumps").as_deref(), Some("true"));
        assert!(map.root().unwrap().attributes().is_empty());
    }

    #[test]
    fn test_extras_need_pending_type() {
        let source = "# root\n- NOTE\n<pre>note</pre>\n<pre>orphan</pre>\n- BOGUS\n<pre>x</pre>\n- LINE\njunk\n<pre>lost</pre>\n- LINK\n<pre>not a url</pre>\n";
        let map = MindMap::parse(source).unwrap();
        let root = map.root().unwrap();
        assert_eq!(root.extra(ExtraType::Note), Some(Extra::Note("note".into())));
        assert_eq!(root.number_of_extras(), 1);
    }

    #[test]
    fn test_blank_lines_keep_pending_type() {
        let map = MindMap::parse("# root\n- LINE\n\n<pre>kept</pre>\n").unwrap();
        assert_eq!(
            map.root().unwrap().extra(ExtraType::Line),
            Some(Extra::Line("kept".into()))
        );
    }

    #[test]
    fn test_no_topics() {
        assert!(MindMap::parse("").is_err());
        assert!(MindMap::parse("Mind Map\n> a=`b`\n---\n- NOTE\n<pre>x</pre>\n").is_err());
    }
}
