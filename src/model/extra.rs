//! Typed side-attachments of a topic.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    codec::escape::{escape_html, unescape_html},
    error::MindMapError,
    model::uri::MapUri,
};

pub(crate) const PRE_OPEN: &str = "<pre>";
pub(crate) const PRE_CLOSE: &str = "</pre>";

/// The closed set of extra kinds. The declaration order is the serialization order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExtraType {
    File,
    Link,
    Note,
    Topic,
    Line,
}

impl ExtraType {
    pub const ALL: [ExtraType; 5] = [
        ExtraType::File,
        ExtraType::Link,
        ExtraType::Note,
        ExtraType::Topic,
        ExtraType::Line,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExtraType::File => "FILE",
            ExtraType::Link => "LINK",
            ExtraType::Note => "NOTE",
            ExtraType::Topic => "TOPIC",
            ExtraType::Line => "LINE",
        }
    }

    /// Decodes the unescaped body of a `<pre>` block into an extra of this type.
    pub fn parse_value(&self, text: &str) -> Result<Extra, MindMapError> {
        match self {
            ExtraType::File => Ok(Extra::File(MapUri::parse(text)?)),
            ExtraType::Link => Ok(Extra::Link(MapUri::parse_absolute(text)?)),
            ExtraType::Note => Ok(Extra::Note(text.to_string())),
            ExtraType::Topic => {
                let uid = text.trim();
                if uid.is_empty() {
                    Err(MindMapError::Codec("empty topic link".to_string()))
                } else {
                    Ok(Extra::Topic(uid.to_string()))
                }
            }
            ExtraType::Line => Ok(Extra::Line(text.to_string())),
        }
    }
}

impl fmt::Display for ExtraType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExtraType {
    type Err = MindMapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExtraType::ALL
            .into_iter()
            .find(|ty| ty.as_str() == s)
            .ok_or_else(|| MindMapError::UnknownExtraType(s.to_string()))
    }
}

/// One attachment. A topic holds at most one extra per [ExtraType].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Extra {
    File(MapUri),
    /// Always an absolute URL.
    Link(MapUri),
    Note(String),
    /// Stable link identifier of the target topic.
    Topic(String),
    Line(String),
}

impl Extra {
    pub fn extra_type(&self) -> ExtraType {
        match self {
            Extra::File(_) => ExtraType::File,
            Extra::Link(_) => ExtraType::Link,
            Extra::Note(_) => ExtraType::Note,
            Extra::Topic(_) => ExtraType::Topic,
            Extra::Line(_) => ExtraType::Line,
        }
    }

    /// The value as plain text, the way it is stored inside the `<pre>` block.
    pub fn as_text(&self) -> &str {
        match self {
            Extra::File(uri) | Extra::Link(uri) => uri.as_str(),
            Extra::Note(text) | Extra::Topic(text) | Extra::Line(text) => text,
        }
    }

    pub fn as_file(&self) -> Option<&MapUri> {
        match self {
            Extra::File(uri) => Some(uri),
            _ => None,
        }
    }

    pub fn as_link(&self) -> Option<&MapUri> {
        match self {
            Extra::Link(uri) => Some(uri),
            _ => None,
        }
    }

    pub fn as_note(&self) -> Option<&str> {
        match self {
            Extra::Note(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_topic_uid(&self) -> Option<&str> {
        match self {
            Extra::Topic(uid) => Some(uid),
            _ => None,
        }
    }

    pub fn as_line(&self) -> Option<&str> {
        match self {
            Extra::Line(text) => Some(text),
            _ => None,
        }
    }

    /// `<pre>escaped value</pre>`
    pub fn encode(&self) -> String {
        format!("{PRE_OPEN}{}{PRE_CLOSE}", escape_html(self.as_text()))
    }

    /// Inverse of [Extra::encode]. `content` is the text between the `<pre>` tags, still escaped.
    pub fn decode(ty: ExtraType, content: &str) -> Result<Extra, MindMapError> {
        ty.parse_value(&unescape_html(content))
    }
}

impl fmt::Display for Extra {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.extra_type(), self.as_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extra_type_names_are_exact() {
        for ty in ExtraType::ALL {
            assert_eq!(ty.as_str().parse::<ExtraType>(), Ok(ty));
        }
        assert_eq!(
            "note".parse::<ExtraType>(),
            Err(MindMapError::UnknownExtraType("note".to_string()))
        );
        assert!("IMAGE".parse::<ExtraType>().is_err());
    }

    #[test]
    fn test_type_order_matches_serialization_order() {
        let mut shuffled = vec![
            ExtraType::Line,
            ExtraType::Note,
            ExtraType::File,
            ExtraType::Topic,
            ExtraType::Link,
        ];
        shuffled.sort();
        assert_eq!(shuffled, ExtraType::ALL.to_vec());
    }

    #[test]
    fn test_note_keeps_whitespace() {
        let note = Extra::Note("  first\n\n  <second> & \"third\"\n".to_string());
        let encoded = note.encode();
        assert!(encoded.starts_with(PRE_OPEN));
        assert!(encoded.ends_with(PRE_CLOSE));
        let body = &encoded[PRE_OPEN.len()..encoded.len() - PRE_CLOSE.len()];
        assert_eq!(Extra::decode(ExtraType::Note, body), Ok(note));
    }

    #[test]
    fn test_trimmed_kinds() {
        assert_eq!(
            Extra::decode(ExtraType::Topic, "  abc123 \n"),
            Ok(Extra::Topic("abc123".to_string()))
        );
        assert_eq!(
            Extra::decode(ExtraType::File, " docs/a.txt "),
            Ok(Extra::File(MapUri::parse("docs/a.txt").unwrap()))
        );
        assert!(Extra::decode(ExtraType::Topic, "   ").is_err());
        assert!(Extra::decode(ExtraType::File, "").is_err());
        assert!(Extra::decode(ExtraType::Link, "").is_err());
    }

    #[test]
    fn test_link_requires_absolute_url() {
        let link = Extra::decode(ExtraType::Link, "https://example.com/?a=1&amp;b=2").unwrap();
        assert_eq!(
            link.as_link().map(MapUri::as_str),
            Some("https://example.com/?a=1&b=2")
        );
        assert!(link.as_file().is_none());
        assert!(Extra::decode(ExtraType::Link, "relative/path").is_err());
    }
}
