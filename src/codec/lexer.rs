//! Line oriented token scanner for the outline grammar.
//!
//! The scanner never fails: anything it does not recognise comes out as
//! [TokenKind::UnknownLine] and is left to the parser to ignore.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::extra::{PRE_CLOSE, PRE_OPEN};

static HEAD_DELIMITER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-{3,}\s*$").expect("head delimiter regex is valid"));
static EXTRA_TYPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-\s+(\S+)\s*$").expect("extra type regex is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// `---`
    HeadDelimiter,
    /// `> key=`value`,...`
    Attribute,
    /// `#`-prefixed heading.
    Topic,
    /// `- NAME`
    ExtraType,
    /// `<pre>...</pre>`, possibly spanning lines.
    ExtraText,
    /// Blank line.
    Whitespace,
    UnknownLine,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// Source text with leading whitespace and the line terminator removed.
    pub text: &'a str,
    /// 1-based line the token starts on.
    pub line: usize,
}

impl<'a> Token<'a> {
    /// Number of leading `#` of a heading.
    pub fn topic_depth(&self) -> usize {
        self.text.bytes().take_while(|b| *b == b'#').count()
    }

    /// Heading text after the depth marker, trimmed and still escaped.
    pub fn topic_text(&self) -> &'a str {
        self.text[self.topic_depth()..].trim()
    }

    pub fn extra_type_name(&self) -> Option<&'a str> {
        EXTRA_TYPE
            .captures(self.text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }

    /// Content between `<pre>` and `</pre>`, still escaped.
    pub fn extra_body(&self) -> &'a str {
        self.text
            .strip_prefix(PRE_OPEN)
            .and_then(|rest| rest.strip_suffix(PRE_CLOSE))
            .unwrap_or("")
    }
}

pub struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Lexer<'a> {
        Lexer {
            source,
            pos: 0,
            line: 1,
        }
    }

    /// Splits the next line off the source: (line without terminator, offset of the next line).
    fn next_line(&self) -> (&'a str, usize) {
        let rest = &self.source[self.pos..];
        let (line, consumed) = match rest.find('\n') {
            Some(end) => (&rest[..end], end + 1),
            None => (rest, rest.len()),
        };
        (line.strip_suffix('\r').unwrap_or(line), self.pos + consumed)
    }

    /// Tries to read a `<pre>` block starting at byte `start`. On success returns the token text
    /// and the offset of the line following the closing tag.
    fn pre_block(&self, start: usize) -> Option<(&'a str, usize)> {
        let close = self.source[start..].find(PRE_CLOSE)? + start + PRE_CLOSE.len();
        let text = &self.source[start..close];
        let next = match self.source[close..].find('\n') {
            Some(end) => close + end + 1,
            None => self.source.len(),
        };
        let trailing = self.source[close..next].trim();
        if !trailing.is_empty() {
            tracing::debug!("Ignoring text after </pre>: {trailing:?}");
        }
        Some((text, next))
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        if self.pos >= self.source.len() {
            return None;
        }
        let line = self.line;
        let (raw, next) = self.next_line();
        let text = raw.trim_start();

        let kind = if text.is_empty() {
            TokenKind::Whitespace
        } else if text.starts_with('#') {
            TokenKind::Topic
        } else if text.starts_with('>') {
            TokenKind::Attribute
        } else if HEAD_DELIMITER.is_match(text) {
            TokenKind::HeadDelimiter
        } else if EXTRA_TYPE.is_match(text) {
            TokenKind::ExtraType
        } else if text.starts_with(PRE_OPEN) {
            let start = self.pos + (raw.len() - text.len());
            match self.pre_block(start) {
                Some((block, after)) => {
                    let consumed = &self.source[self.pos..after];
                    self.line += consumed.matches('\n').count();
                    self.pos = after;
                    return Some(Token {
                        kind: TokenKind::ExtraText,
                        text: block,
                        line,
                    });
                }
                None => TokenKind::UnknownLine,
            }
        } else {
            TokenKind::UnknownLine
        };

        self.pos = next;
        self.line += 1;
        Some(Token {
            kind,
            text: text.trim_end(),
            line,
        })
    }
}

pub fn tokenize(source: &str) -> Vec<Token<'_>> {
    Lexer::new(source).collect()
}
