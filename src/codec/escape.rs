//! Text escaping for the outline grammar.
//!
//! Three encodings live here:
//!
//! - heading text, escaped markdown style so that a heading can never be confused with a depth
//!   marker, an attribute line or an extra marker;
//! - extra bodies, HTML escaped so that a `<pre>` block can never contain its own terminator;
//! - attribute values, wrapped in backtick code fences with line breaks held as numeric entities.
//!
//! Every `escape_*` function has an exact inverse: `unescape_x(&escape_x(s)) == s` for all `s`.

use std::collections::BTreeMap;

const MD_ESCAPED_CHARS: &str = "\\`*_[]{}()#<>+-.!&";
const LINE_BREAK: &str = "<br/>";
const MAX_ENTITY_LEN: usize = 12;

fn push_numeric_entity(out: &mut String, c: char) {
    out.push_str("&#");
    out.push_str(&(c as u32).to_string());
    out.push(';');
}

/// Decodes an entity at the start of `text` (which must start with `&`). Returns the character
/// and the number of bytes consumed.
fn decode_entity(text: &str, allow_named: bool) -> Option<(char, usize)> {
    let (semi, _) = text
        .char_indices()
        .take(MAX_ENTITY_LEN)
        .find(|(_, c)| *c == ';')?;
    let body = &text[1..semi];
    let decoded = if let Some(hex) = body
        .strip_prefix("#x")
        .or_else(|| body.strip_prefix("#X"))
    {
        u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
    } else if let Some(dec) = body.strip_prefix('#') {
        dec.parse::<u32>().ok().and_then(char::from_u32)
    } else if allow_named {
        match body {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some('\u{a0}'),
            _ => None,
        }
    } else {
        None
    };
    decoded.map(|c| (c, semi + 1))
}

/// Escapes topic text for a heading line.
///
/// Newlines become `<br/>`, markdown specials get a backslash, and control characters plus any
/// leading or trailing whitespace become numeric entities so the heading survives trimming.
pub fn escape_markdown(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let lead = chars.iter().take_while(|c| c.is_whitespace()).count();
    let trail_start = if lead == chars.len() {
        chars.len()
    } else {
        chars.len() - chars.iter().rev().take_while(|c| c.is_whitespace()).count()
    };

    let mut out = String::with_capacity(text.len() * 2);
    for (idx, c) in chars.into_iter().enumerate() {
        if c == '\n' {
            out.push_str(LINE_BREAK);
        } else if c.is_control() || idx < lead || idx >= trail_start {
            push_numeric_entity(&mut out, c);
        } else {
            if MD_ESCAPED_CHARS.contains(c) {
                out.push('\\');
            }
            out.push(c);
        }
    }
    out
}

/// Inverse of [escape_markdown]. Hand-written headings are accepted too: unknown entities and
/// stray markup are kept as literal text.
pub fn unescape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(c) = rest.chars().next() {
        match c {
            '\\' => {
                match rest[1..].chars().next() {
                    Some(escaped) => {
                        out.push(escaped);
                        rest = &rest[1 + escaped.len_utf8()..];
                    }
                    None => {
                        out.push('\\');
                        rest = "";
                    }
                }
                continue;
            }
            '<' if rest.starts_with(LINE_BREAK) => {
                out.push('\n');
                rest = &rest[LINE_BREAK.len()..];
                continue;
            }
            '&' => {
                if let Some((decoded, consumed)) = decode_entity(rest, false) {
                    out.push(decoded);
                    rest = &rest[consumed..];
                    continue;
                }
            }
            _ => {}
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }
    out
}

/// Escapes an extra body for a `<pre>` block.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 4);
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\r' => push_numeric_entity(&mut out, c),
            _ => out.push(c),
        }
    }
    out
}

/// Inverse of [escape_html]. Raw CRLF line endings (files edited on Windows) are folded to `\n`
/// first; the escaper never emits a raw `\r`.
pub fn unescape_html(text: &str) -> String {
    let text = text.replace("\r\n", "\n");
    let mut out = String::with_capacity(text.len());
    let mut rest = text.as_str();
    while let Some(c) = rest.chars().next() {
        if c == '&' {
            if let Some((decoded, consumed)) = decode_entity(rest, true) {
                out.push(decoded);
                rest = &rest[consumed..];
                continue;
            }
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }
    out
}

fn longest_backtick_run(text: &str) -> usize {
    text.split(|c: char| c != '`').map(str::len).max().unwrap_or(0)
}

/// Wraps a value in a backtick fence one longer than any backtick run inside it. Values that
/// start or end with a backtick, or that start and end with a space, are padded with one space on
/// each side (stripped again by the reader). Empty values are written bare.
pub fn code_fence(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }
    let fence = "`".repeat(longest_backtick_run(value) + 1);
    let pad = value.starts_with('`')
        || value.ends_with('`')
        || (value.starts_with(' ') && value.ends_with(' ') && !value.chars().all(|c| c == ' '));
    if pad {
        format!("{fence} {value} {fence}")
    } else {
        format!("{fence}{value}{fence}")
    }
}

fn strip_fence_padding(content: &str) -> &str {
    if content.len() >= 2
        && content.starts_with(' ')
        && content.ends_with(' ')
        && !content.chars().all(|c| c == ' ')
    {
        &content[1..content.len() - 1]
    } else {
        content
    }
}

/// Finds a backtick run of exactly `len` in `text`, returning its byte offset.
fn find_closing_fence(text: &str, len: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut idx = 0;
    while idx < bytes.len() {
        if bytes[idx] == b'`' {
            let start = idx;
            while idx < bytes.len() && bytes[idx] == b'`' {
                idx += 1;
            }
            if idx - start == len {
                return Some(start);
            }
        } else {
            idx += 1;
        }
    }
    None
}

/// Whether `name` can be written as an attribute key and read back unchanged.
pub fn is_valid_attribute_name(name: &str) -> bool {
    !name.is_empty()
        && name.trim() == name
        && !name.contains(['=', ',', '`'])
        && !name.chars().any(char::is_control)
}

/// Line breaks become `&#10;`/`&#13;`. An `&` that would otherwise read back as a numeric entity
/// is written as `&#38;`.
fn escape_attribute_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for (idx, c) in value.char_indices() {
        match c {
            '\n' | '\r' => push_numeric_entity(&mut out, c),
            '&' if decode_entity(&value[idx..], false).is_some() => {
                push_numeric_entity(&mut out, c)
            }
            _ => out.push(c),
        }
    }
    out
}

fn unescape_attribute_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(c) = rest.chars().next() {
        if c == '&' {
            if let Some((decoded, consumed)) = decode_entity(rest, false) {
                out.push(decoded);
                rest = &rest[consumed..];
                continue;
            }
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }
    out
}

/// Formats attributes as `` key=`value`,key2=`value2` `` in key order.
pub fn format_attributes(attributes: &BTreeMap<String, String>) -> String {
    attributes
        .iter()
        .map(|(key, value)| {
            if !is_valid_attribute_name(key) {
                tracing::warn!("Attribute name {key:?} will not read back unchanged");
            }
            format!("{key}={}", code_fence(&escape_attribute_value(value)))
        })
        .collect::<Vec<String>>()
        .join(",")
}

/// Parses the body of an attribute line (with or without its leading `>`) into `into`.
///
/// Unfenced values run to the next comma. Parsing stops at the first malformed pair; pairs read
/// before it are kept.
pub fn parse_attributes(line: &str, into: &mut BTreeMap<String, String>) {
    let body = line.trim();
    let mut rest = body.strip_prefix('>').unwrap_or(body);
    loop {
        rest = rest.trim_start_matches(|c: char| c == ',' || c.is_whitespace());
        if rest.is_empty() {
            break;
        }
        let Some(eq) = rest.find('=') else {
            tracing::debug!("Attribute text without '=': {rest:?}");
            break;
        };
        let key = rest[..eq].trim().to_string();
        rest = rest[eq + 1..].trim_start();

        let fence = rest.bytes().take_while(|b| *b == b'`').count();
        let value = if fence == 0 {
            let end = rest.find(',').unwrap_or(rest.len());
            let value = unescape_attribute_value(rest[..end].trim());
            rest = &rest[end..];
            value
        } else {
            match find_closing_fence(&rest[fence..], fence) {
                Some(close) => {
                    let content = &rest[fence..fence + close];
                    let value = unescape_attribute_value(strip_fence_padding(content));
                    rest = &rest[fence + close + fence..];
                    value
                }
                None => {
                    tracing::debug!("Unterminated attribute value for key '{key}'");
                    break;
                }
            }
        };

        if key.is_empty() {
            tracing::debug!("Dropping attribute value with empty key");
        } else {
            into.insert(key, value);
        }
    }
}
