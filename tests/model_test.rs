use mmd_core::{
    config::{ConfigProvider, MindMapConfig, TomlConfigProvider},
    Extra, ExtraType, MapUri, MindMap, Topic,
};
use std::{path::Path, sync::Arc, thread};
use test_log::test;

mod common;
use common::{by_text, create_map_folder, sample_map, shape};

#[test]
fn parallel_edits_keep_the_tree_consistent() {
    let map = MindMap::with_root("root");
    let root = map.root().unwrap();
    let lanes: Vec<Topic> = (0..4)
        .map(|idx| root.make_child(format!("lane {idx}"), None).unwrap())
        .collect();

    let handles: Vec<_> = lanes
        .iter()
        .cloned()
        .enumerate()
        .map(|(idx, lane)| {
            let map = map.clone();
            thread::spawn(move || {
                for step in 0..50 {
                    let child = lane.make_child(format!("{idx}-{step}"), None).unwrap();
                    if step % 2 == 0 {
                        child.make_first();
                    }
                    if step % 5 == 0 {
                        let root = map.root().unwrap();
                        assert!(child.move_to_new_parent(Some(&root)));
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let topics = map.topics();
    assert_eq!(topics.len(), 1 + 4 + 4 * 50);
    for topic in topics.iter().skip(1) {
        let parent = topic.parent().unwrap();
        assert!(parent.children().contains(topic));
    }
    assert_eq!(root.child_count(), 4 + 4 * 10);
}

#[test]
fn held_lock_makes_a_sequence_atomic() {
    let map = MindMap::with_root("root");
    let root = map.root().unwrap();
    root.make_child("a", None).unwrap();
    root.make_child("b", None).unwrap();

    let observer = {
        let map = map.clone();
        thread::spawn(move || {
            for _ in 0..200 {
                let root = map.root().unwrap();
                let _lock = map.lock();
                let names: Vec<String> = root.children().iter().map(Topic::text).collect();
                assert!(
                    names == ["a", "b"] || names == ["b", "a"],
                    "observed a half-finished swap: {names:?}"
                );
            }
        })
    };

    // Swapping the texts takes two writes; the observer must never see both topics carrying
    // the same name.
    for _ in 0..200 {
        let _lock = map.lock();
        let (first, last) = (root.first().unwrap(), root.last().unwrap());
        let (first_text, last_text) = (first.text(), last.text());
        first.set_text(last_text);
        last.set_text(first_text);
    }
    observer.join().unwrap();
}

#[test]
fn predicates_may_call_back_into_the_model() {
    let map = sample_map();
    let design = by_text(&map, "Design");
    let has_extra_below: &dyn Fn(&Topic) -> bool =
        &|t| t.number_of_extras() > 0 && t.parent().is_some_and(|p| p.is_root());
    assert_eq!(design.find_next(Some(has_extra_below)).unwrap().text(), "Links");

    let backref = by_text(&map, "Backref");
    let links_to_parser: &dyn Fn(&Topic) -> bool = &|t| {
        t.extra(ExtraType::Topic)
            .and_then(|link| t.map().find_topic_for_extra(&link))
            .is_some()
    };
    assert_eq!(backref.find_prev(Some(links_to_parser)), None);
    assert_eq!(
        design.find_next(Some(links_to_parser)).unwrap().text(),
        "Backref"
    );
}

#[test]
fn copy_between_documents() {
    let source = sample_map();
    let target = MindMap::with_root("inbox");
    let inbox = target.root().unwrap();

    let design = by_text(&source, "Design");
    let copy = design.make_copy(&target, Some(&inbox)).unwrap();
    assert_eq!(copy.parent(), Some(inbox.clone()));
    assert_eq!(copy.child_count(), 2);
    assert_eq!(copy.extras(), design.extras());

    // The copied link id resolves inside the target document.
    let parser_copy = by_text(&target, "Parser");
    let uid = parser_copy
        .attribute(mmd_core::model::TOPIC_LINK_UID_ATTR)
        .unwrap();
    assert_eq!(target.find_topic_for_link(&uid), Some(parser_copy));
    assert_ne!(
        source.find_topic_for_link(&uid),
        target.find_topic_for_link(&uid)
    );

    // Editing the copy leaves the source alone.
    copy.set_text("Design (copy)");
    assert_eq!(design.text(), "Design");
}

#[test]
fn whole_document_copy_matches_source() {
    let source = sample_map();
    let copy = source.make_copy();
    assert_eq!(shape(&copy), shape(&source));
    by_text(&copy, "Design").delete();
    assert_eq!(source.topics().len(), 6);
    assert_eq!(copy.topics().len(), 3);
}

#[test]
fn deleting_a_link_target_clears_the_links() {
    let map = sample_map();
    let parser = by_text(&map, "Parser");
    let backref = by_text(&map, "Backref");
    assert!(backref.extra(ExtraType::Topic).is_some());

    assert!(map.remove_topic(&parser));
    assert!(parser.is_detached());
    assert!(backref.extra(ExtraType::Topic).is_none());
    assert!(!parser.move_to_new_parent(Some(&backref)));
    assert!(parser.parent().is_none());
    assert!(parser.children().is_empty());
}

#[test]
fn file_links_follow_the_base_folder() {
    let dir = tempfile::tempdir().unwrap();
    let folder = create_map_folder(&dir);
    let map = sample_map();
    let parser_doc = MapUri::from_file(Some(&folder), &folder.join("docs/parser.md")).unwrap();
    assert_eq!(parser_doc.as_str(), "docs/parser.md");
    assert!(parser_doc
        .as_file(&folder)
        .is_some_and(|file| file.exists()));

    assert!(map.does_contain_file_link(&folder, &parser_doc));
    let renamed = MapUri::parse("docs/parsing.md").unwrap();
    assert!(map.replace_all_links_to_file(&folder, &parser_doc, &renamed));
    assert!(!map.does_contain_file_link(&folder, &parser_doc));

    let docs = MapUri::parse("docs").unwrap();
    assert!(map.delete_all_links_to_file(&folder, &docs));
    assert!(by_text(&map, "Parser").extra(ExtraType::File).is_none());
    assert!(!map.delete_all_links_to_file(&folder, &docs));
}

#[test]
fn absolute_file_links_compare_with_relative_ones() {
    let base = Path::new("/srv/maps");
    let map = MindMap::with_root("root");
    let root = map.root().unwrap();
    root.set_extra([Extra::File(
        MapUri::parse("file:///srv/maps/notes/todo.txt").unwrap(),
    )]);
    assert!(map.does_contain_file_link(base, &MapUri::parse("notes/todo.txt").unwrap()));
    assert!(map.does_contain_file_link(base, &MapUri::parse("notes/../notes/todo.txt").unwrap()));
    assert!(!map.does_contain_file_link(base, &MapUri::parse("notes").unwrap()));
}

#[test]
fn configured_head_line_is_written() {
    let dir = tempfile::tempdir().unwrap();
    let provider = TomlConfigProvider::new(dir.path().join("mmd.toml"));
    provider
        .store(&MindMapConfig {
            head_line: "Team roadmap".to_string(),
            base_folder: None,
        })
        .unwrap();

    let config = provider.load().unwrap();
    let map = sample_map();
    let text = map.write_with(&config);
    assert!(text.starts_with("Team roadmap\n> __version__=`1.1`\n---\n"));
    assert_eq!(shape(&MindMap::parse(&text).unwrap()), shape(&map));
}

#[test]
fn controller_decides_what_can_be_lost() {
    let map = MindMap::with_root("root")
        .with_controller(Arc::new(|_: &MindMap, topic: &Topic| topic.attribute("pinned").is_none()));
    let root = map.root().unwrap();
    let empty = root.make_child("", None).unwrap();
    let pinned = empty.make_child(" ", None).unwrap();
    assert!(pinned.can_be_lost());
    assert!(empty.can_be_lost());

    pinned.set_attribute("pinned", Some("yes"));
    assert!(!pinned.can_be_lost());
    assert!(!empty.can_be_lost());

    map.set_controller(None);
    assert!(map.controller().is_none());
    pinned.set_attribute("pinned", None);
    assert!(!pinned.can_be_lost());
}
