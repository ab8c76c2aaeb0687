//! # mmd-core
//!
//! The document model and text format behind a mind-mapping tool.
//!
//! ## Overview
//!
//! A [`MindMap`] owns a tree of [`Topic`]s. Every topic carries display text, string attributes
//! and typed [`Extra`] attachments (a file, a URL, a note, a link to another topic, a raw line).
//! Documents are serialized to and parsed from a markdown-flavored outline format that is
//! readable and diffable as plain text.
//!
//! ### Key Features
//!
//! - **Thread-safe tree**: one reentrant lock per document; every mutation is atomic and
//!   [`MindMap::lock`] groups several of them
//! - **Safe mutations**: moves that would create a cycle, and edits through stale handles, are
//!   rejected with a `false`/`None` instead of corrupting the tree
//! - **Lossless round trips**: `parse(write(map))` reproduces text, attributes, extras and order
//! - **Damage tolerant parsing**: malformed lines are skipped and logged, never fatal
//! - **Stable cross-links**: TOPIC extras point at a persisted identifier, not at memory
//!
//! ## Architecture
//!
//! - **[`model`]**: [`MindMap`], [`Topic`], [`Extra`], [`MapUri`]
//! - **[`codec`]**: token scanner, parser, writer and the escaping rules of the format
//! - **[`config`]**: TOML-backed settings ([`config::MindMapConfig`])
//!
//! ## Quick Start
//!
//! ```rust
//! use mmd_core::{Extra, ExtraType, MindMap};
//!
//! let map = MindMap::with_root("Plans");
//! let root = map.root().expect("map has a root");
//! let travel = root.make_child("Travel", None).expect("root is attached");
//! travel.set_extra([Extra::Note("Book the train\nPack light".to_string())]);
//! travel.set_attribute("fillColor", Some("#a0d0ff"));
//!
//! let text = map.write();
//! let parsed = MindMap::parse(&text)?;
//! let travel = &parsed.root().expect("parsed root").children()[0];
//! assert_eq!(travel.text(), "Travel");
//! assert_eq!(
//!     travel.extra(ExtraType::Note).and_then(|e| e.as_note().map(str::to_string)),
//!     Some("Book the train\nPack light".to_string())
//! );
//! # Ok::<(), mmd_core::MindMapError>(())
//! ```
//!
//! ### Linking topics
//!
//! ```rust
//! use mmd_core::MindMap;
//!
//! let map = MindMap::with_root("root");
//! let root = map.root().expect("map has a root");
//! let source = root.make_child("source", None).expect("root is attached");
//! let target = root.make_child("target", None).expect("root is attached");
//!
//! let link = map.make_link_to(&target).expect("target is attached");
//! source.set_extra([link.clone()]);
//! assert_eq!(map.find_topic_for_extra(&link), Some(target));
//! ```
//!
//! ## Logging
//!
//! The crate logs through `tracing`. Skipped input is reported at `debug`, rejected model
//! operations at `warn` and undecodable extras at `error`.

pub mod codec;
pub mod config;
pub mod error;
pub mod model;

pub use error::*;
pub use model::{Extra, ExtraType, MapUri, MindMap, MindMapController, Topic, TopicId};
