//! [`MapUri`]: the value carried by FILE and LINK extras.
//!
//! A mind map refers to files either through absolute URIs (`file:///...`, `https://...`) or
//! through paths relative to the folder the document lives in. The relative form is kept verbatim
//! so it survives moving the whole folder; it is only resolved against a base folder when two
//! references have to be compared.
//!
//! All comparisons are lexical. Nothing in here touches the filesystem, so these helpers are safe
//! to call while the document lock is held.

use std::{
    fmt,
    path::{Component, Path, PathBuf},
};

use url::Url;

use crate::error::MindMapError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum UriKind {
    Absolute(Url),
    Relative(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MapUri(UriKind);

impl MapUri {
    /// Parses an absolute URI or, failing that, a relative path. Backslashes in relative paths are
    /// normalized to `/`.
    pub fn parse(text: &str) -> Result<MapUri, MindMapError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(MindMapError::InvalidUri("empty URI".to_string()));
        }
        match Url::parse(text) {
            Ok(url) => Ok(MapUri(UriKind::Absolute(url))),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                Ok(MapUri(UriKind::Relative(text.replace('\\', "/"))))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Like [MapUri::parse] but rejects anything that is not an absolute URL.
    pub fn parse_absolute(text: &str) -> Result<MapUri, MindMapError> {
        let text = text.trim();
        Ok(MapUri(UriKind::Absolute(Url::parse(text)?)))
    }

    /// Builds a reference to `file`. When `base` is given and `file` lies inside it, the result is
    /// relative to `base`; otherwise absolute files become `file://` URIs.
    pub fn from_file(base: Option<&Path>, file: &Path) -> Result<MapUri, MindMapError> {
        let file = normalize_path(file);
        if let Some(base) = base.map(normalize_path) {
            if file.starts_with(&base) {
                let relative = file.strip_prefix(&base)?;
                let text = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<String>>()
                    .join("/");
                if text.is_empty() {
                    return Err(MindMapError::InvalidUri(format!(
                        "{file:?} is the base folder itself"
                    )));
                }
                return Ok(MapUri(UriKind::Relative(text)));
            }
        }
        if file.is_absolute() {
            Url::from_file_path(&file)
                .map(|url| MapUri(UriKind::Absolute(url)))
                .map_err(|_| MindMapError::InvalidUri(format!("{file:?}")))
        } else {
            MapUri::parse(&file.to_string_lossy())
        }
    }

    pub fn is_absolute(&self) -> bool {
        matches!(self.0, UriKind::Absolute(_))
    }

    pub fn as_url(&self) -> Option<&Url> {
        match &self.0 {
            UriKind::Absolute(url) => Some(url),
            UriKind::Relative(_) => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match &self.0 {
            UriKind::Absolute(url) => url.as_str(),
            UriKind::Relative(path) => path,
        }
    }

    /// Resolves the reference to a local file path. Non-`file` absolute URIs have no local file.
    pub fn as_file(&self, base: &Path) -> Option<PathBuf> {
        match &self.0 {
            UriKind::Absolute(url) if url.scheme() == "file" => {
                url.to_file_path().ok().map(|p| normalize_path(&p))
            }
            UriKind::Absolute(_) => None,
            UriKind::Relative(path) => {
                let mut resolved = base.to_path_buf();
                for segment in strip_query(path).split('/').filter(|s| !s.is_empty()) {
                    resolved.push(segment);
                }
                Some(normalize_path(&resolved))
            }
        }
    }

    pub fn is_same(&self, base: &Path, other: &MapUri) -> bool {
        match (self.as_file(base), other.as_file(base)) {
            (Some(this_file), Some(that_file)) => this_file == that_file,
            _ => self == other,
        }
    }

    /// True when this reference points at `other` or at something inside the folder `other`
    /// points at.
    pub fn is_same_or_has_parent(&self, base: &Path, other: &MapUri) -> bool {
        match (self.as_file(base), other.as_file(base)) {
            (Some(this_file), Some(that_file)) => this_file.starts_with(&that_file),
            _ => self == other,
        }
    }

    pub fn extension(&self) -> Option<String> {
        let path = match &self.0 {
            UriKind::Absolute(url) => url.path(),
            UriKind::Relative(path) => strip_query(path),
        };
        let name = path.rsplit('/').next()?;
        match name.rfind('.') {
            Some(idx) if idx > 0 && idx + 1 < name.len() => Some(name[idx + 1..].to_string()),
            _ => None,
        }
    }

    pub fn is_mmd_file(&self) -> bool {
        self.extension()
            .map(|ext| ext.eq_ignore_ascii_case("mmd"))
            .unwrap_or(false)
    }
}

impl fmt::Display for MapUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn strip_query(path: &str) -> &str {
    path.split(['?', '#']).next().unwrap_or(path)
}

/// Lexically removes `.` and resolves `..` against preceding normal components.
pub(crate) fn normalize_path(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = matches!(result.components().next_back(), Some(Component::Normal(_)));
                if can_pop {
                    result.pop();
                } else if !result.has_root() {
                    result.push("..");
                }
            }
            other => result.push(other.as_os_str()),
        }
    }
    result
}
