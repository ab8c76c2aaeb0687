//! Shared test utilities for integration tests.
//!
//! Import from integration test files as:
//! ```ignore
//! mod common;
//! ```

use mmd_core::{Extra, MapUri, MindMap, Topic};
use std::path::PathBuf;
use tempfile::TempDir;

/// A small document exercising every extra kind:
///
/// ```text
/// Project
///   Design         (NOTE, attribute)
///     Parser       (FILE docs/parser.md)
///     Writer       (LINE)
///   Links          (LINK)
///   Backref        (TOPIC -> Parser)
/// ```
#[allow(dead_code)]
pub fn sample_map() -> MindMap {
    let map = MindMap::with_root("Project");
    let root = map.root().unwrap();

    let design = root.make_child("Design", None).unwrap();
    design.set_attribute("collapsed", Some("false"));
    design.set_extra([Extra::Note("Keep it simple.\n\n  Indented line".to_string())]);

    let parser = design.make_child("Parser", None).unwrap();
    parser.set_extra([Extra::File(MapUri::parse("docs/parser.md").unwrap())]);
    let writer = design.make_child("Writer", None).unwrap();
    writer.set_extra([Extra::Line("raw <line> & more".to_string())]);

    let links = root.make_child("Links", None).unwrap();
    links.set_extra([Extra::Link(
        MapUri::parse_absolute("https://example.com/docs?page=1&lang=en").unwrap(),
    )]);

    let backref = root.make_child("Backref", None).unwrap();
    let link = map.make_link_to(&parser).unwrap();
    backref.set_extra([link]);
    map
}

/// Finds the first topic with the given text.
#[allow(dead_code)]
pub fn by_text(map: &MindMap, text: &str) -> Topic {
    map.topics()
        .into_iter()
        .find(|t| t.text() == text)
        .unwrap_or_else(|| panic!("no topic named {text:?}"))
}

/// Text, level, attributes and extras of every topic in pre-order, for structural comparison.
#[allow(dead_code)]
pub fn shape(map: &MindMap) -> Vec<String> {
    map.topics()
        .iter()
        .map(|t| {
            format!(
                "{}|{}|{:?}|{:?}",
                t.topic_level(),
                t.text(),
                t.attributes(),
                t.extras()
            )
        })
        .collect()
}

/// Creates `<temp_dir>/maps` with a `docs/parser.md` file referenced by [sample_map].
#[allow(dead_code)]
pub fn create_map_folder(temp_dir: &TempDir) -> PathBuf {
    let folder = temp_dir.path().join("maps");
    std::fs::create_dir_all(folder.join("docs")).unwrap();
    std::fs::write(folder.join("docs").join("parser.md"), "# Parser\n").unwrap();
    folder
}
