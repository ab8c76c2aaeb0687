use std::{fmt, io, path::StripPrefixError};

use serde::{Deserialize, Serialize};
use serde_json::Error as JsonError;
use thiserror::Error;
use url::ParseError as UrlParseError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum MindMapError {
    #[error("Mind map codec error: {0}")]
    Codec(String),
    #[error("Document contains no topics")]
    EmptyDocument,
    #[error("Invalid URI: {0}")]
    InvalidUri(String),
    #[error("File System error: {0}")]
    Io(String),
    #[error("Item Not Found: {0}")]
    NotFound(String),
    #[error("You do not have permission to access this resource")]
    PermissionDenied,
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
    #[error("Unknown extra type: '{0}'")]
    UnknownExtraType(String),
}

impl From<StripPrefixError> for MindMapError {
    fn from(src: StripPrefixError) -> MindMapError {
        MindMapError::NotFound(format!("Strip prefix failed for path. Error: {src}"))
    }
}

impl From<toml::de::Error> for MindMapError {
    fn from(src: toml::de::Error) -> MindMapError {
        MindMapError::Serialization(format!("Toml deserialization error: {src}"))
    }
}

impl From<toml::ser::Error> for MindMapError {
    fn from(src: toml::ser::Error) -> MindMapError {
        MindMapError::Serialization(format!("Toml serialization error: {src}"))
    }
}

impl From<JsonError> for MindMapError {
    fn from(src: JsonError) -> MindMapError {
        MindMapError::Serialization(format!("JSON (de)serialization error: {src}"))
    }
}

impl From<UrlParseError> for MindMapError {
    fn from(src: UrlParseError) -> MindMapError {
        MindMapError::InvalidUri(format!("{src}"))
    }
}

impl From<io::Error> for MindMapError {
    fn from(x: io::Error) -> Self {
        match x.kind() {
            io::ErrorKind::NotFound => MindMapError::NotFound(format!("{x}")),
            io::ErrorKind::PermissionDenied => MindMapError::PermissionDenied,
            _ => MindMapError::Io(format!("IOError: {}", x.kind())),
        }
    }
}

impl From<fmt::Error> for MindMapError {
    fn from(x: fmt::Error) -> Self {
        MindMapError::Codec(format!("{x}"))
    }
}
