//! The textual outline format.
//!
//! A document is a head line, an optional line of document attributes and a `---` delimiter,
//! followed by one heading per topic. Heading depth (the number of leading `#`) encodes nesting.
//! Each heading may be followed by an attribute line and by extras, each a `- TYPE` line plus a
//! `<pre>` block.
//!
//! ## Components
//!
//! - [`lexer`] - splits text into [`Token`]s, never fails
//! - `parser` - rebuilds the tree from tokens, reached through [`MindMap::parse`](crate::MindMap::parse)
//! - `writer` - depth-first serializer, reached through [`MindMap::write`](crate::MindMap::write)
//! - [`escape`] - heading, extra body and attribute value encodings
//!
//! Parsing tolerates damage: unknown lines, unknown extra types, undecodable extra bodies and
//! headings that skip depth levels are dropped and logged, and the rest of the document is kept.

pub mod escape;
pub mod lexer;
pub(crate) mod parser;
pub(crate) mod writer;

pub use lexer::{tokenize, Lexer, Token, TokenKind};
