//! MindMap: the document that owns a topic tree.
//!
//! All topics of a document live in one arena ([MapState]) keyed by [TopicId]. Children are owned
//! through ordered id lists, parents are plain ids, so there is no reference cycle anywhere.
//!
//! The arena sits behind a single [ReentrantMutex]. Every public operation on the document or on
//! one of its [Topic] handles acquires it for the whole operation. Because the mutex is
//! reentrant, a caller can hold [MindMap::lock] across several operations to make them atomic with
//! respect to other threads.
//!
//! Interior access goes through [MindMap::read_state] and [MindMap::write_state]. Those closures
//! must never call back into public API: callbacks (predicates, the controller) are always run
//! between two state accesses, with the lock held but no borrow outstanding.

use std::{
    any::Any,
    cell::RefCell,
    collections::{BTreeMap, HashMap, HashSet},
    fmt,
    fs::{read_to_string, write},
    path::Path,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard, RwLock};

use crate::{
    codec::{escape::is_valid_attribute_name, parser, writer},
    config::MindMapConfig,
    error::MindMapError,
    model::{
        extra::{Extra, ExtraType},
        topic::Topic,
        uri::MapUri,
    },
};

/// Version written into the `__version__` document attribute of new documents.
pub const FORMAT_VERSION: &str = "1.1";
pub const VERSION_ATTR: &str = "__version__";
/// Attribute holding the stable identifier that TOPIC extras point at.
pub const TOPIC_LINK_UID_ATTR: &str = "topicLinkUID";

static LOCAL_UID_GENERATOR: AtomicU64 = AtomicU64::new(1);

/// Process-local topic identity. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TopicId(u64);

impl TopicId {
    fn next() -> TopicId {
        TopicId(LOCAL_UID_GENERATOR.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Caller-private per-topic value. Not serialized, not copied, not guarded by the document lock.
pub type Payload = Arc<dyn Any + Send + Sync>;

/// Policy hooks supplied by the editor shell.
pub trait MindMapController: Send + Sync {
    /// Whether an empty topic may be dropped without asking the user.
    fn can_be_deleted_silently(&self, map: &MindMap, topic: &Topic) -> bool;
}

impl<F> MindMapController for F
where
    F: Fn(&MindMap, &Topic) -> bool + Send + Sync,
{
    fn can_be_deleted_silently(&self, map: &MindMap, topic: &Topic) -> bool {
        self(map, topic)
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct TopicNode {
    pub text: String,
    pub parent: Option<TopicId>,
    pub children: Vec<TopicId>,
    pub attributes: BTreeMap<String, String>,
    pub extras: BTreeMap<ExtraType, Extra>,
}

/// Content of a subtree without identities, used to move content between documents without
/// holding two document locks at once.
#[derive(Debug, Clone)]
pub(crate) struct TopicSnapshot {
    pub text: String,
    pub attributes: BTreeMap<String, String>,
    pub extras: BTreeMap<ExtraType, Extra>,
    pub children: Vec<TopicSnapshot>,
}

impl TopicSnapshot {
    pub fn remove_attribute_recursive(&mut self, name: &str) {
        self.attributes.remove(name);
        for child in self.children.iter_mut() {
            child.remove_attribute_recursive(name);
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct MapState {
    pub nodes: HashMap<TopicId, TopicNode>,
    pub root: Option<TopicId>,
    pub attributes: BTreeMap<String, String>,
    link_index: HashMap<String, TopicId>,
}

impl MapState {
    pub fn node(&self, id: TopicId) -> Option<&TopicNode> {
        self.nodes.get(&id)
    }

    pub fn node_mut(&mut self, id: TopicId) -> Option<&mut TopicNode> {
        self.nodes.get_mut(&id)
    }

    pub fn contains(&self, id: TopicId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn parent_of(&self, id: TopicId) -> Option<TopicId> {
        self.node(id).and_then(|node| node.parent)
    }

    pub fn children_of(&self, id: TopicId) -> &[TopicId] {
        self.node(id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    /// Creates a topic appended as the last child of `parent`, or parentless when `parent` is
    /// `None` or unknown.
    pub fn create_topic(&mut self, parent: Option<TopicId>, text: String) -> TopicId {
        let id = TopicId::next();
        let parent = parent.filter(|p| self.contains(*p));
        self.nodes.insert(
            id,
            TopicNode {
                text,
                parent,
                ..Default::default()
            },
        );
        if let Some(parent_node) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent_node.children.push(id);
        }
        id
    }

    /// Position of `id` among its parent's children.
    pub fn index_in_parent(&self, id: TopicId) -> Option<(TopicId, usize)> {
        let parent = self.parent_of(id)?;
        let index = self.children_of(parent).iter().position(|c| *c == id)?;
        Some((parent, index))
    }

    /// True when `id` is `ancestor` or lies below it.
    pub fn is_in_subtree(&self, ancestor: TopicId, id: TopicId) -> bool {
        if !self.contains(id) {
            return false;
        }
        let mut current = Some(id);
        while let Some(cur) = current {
            if cur == ancestor {
                return true;
            }
            current = self.parent_of(cur);
        }
        false
    }

    /// Walks `depth` links above the parent of `id` (`0` returns the parent).
    pub fn find_parent_for_depth(&self, id: TopicId, mut depth: usize) -> Option<TopicId> {
        let mut result = self.parent_of(id);
        while depth > 0 {
            result = result.and_then(|r| self.parent_of(r));
            if result.is_none() {
                break;
            }
            depth -= 1;
        }
        result
    }

    pub fn root_of(&self, id: TopicId) -> TopicId {
        let mut result = id;
        while let Some(parent) = self.parent_of(result) {
            result = parent;
        }
        result
    }

    pub fn level_of(&self, id: TopicId) -> usize {
        let mut level = 0;
        let mut current = self.parent_of(id);
        while let Some(cur) = current {
            level += 1;
            current = self.parent_of(cur);
        }
        level
    }

    /// Ids from the root down to `id`, inclusive.
    pub fn path_of(&self, id: TopicId) -> Vec<TopicId> {
        let mut path = vec![id];
        let mut current = self.parent_of(id);
        while let Some(cur) = current {
            path.push(cur);
            current = self.parent_of(cur);
        }
        path.reverse();
        path
    }

    /// Pre-order ids of the subtree rooted at `id`.
    pub fn subtree(&self, id: TopicId) -> Vec<TopicId> {
        let mut result = Vec::new();
        if !self.contains(id) {
            return result;
        }
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            result.push(cur);
            stack.extend(self.children_of(cur).iter().rev().copied());
        }
        result
    }

    pub fn is_attached(&self, id: TopicId) -> bool {
        self.contains(id) && Some(self.root_of(id)) == self.root
    }

    /// Removes `id` from its parent's child list. The node's own parent link is left to the
    /// caller.
    pub fn detach(&mut self, id: TopicId) {
        if let Some(parent) = self.parent_of(id) {
            if let Some(parent_node) = self.nodes.get_mut(&parent) {
                parent_node.children.retain(|c| *c != id);
            }
        }
    }

    /// Detaches `id` and drops it together with its descendants. Returns the dropped ids.
    pub fn remove_subtree(&mut self, id: TopicId) -> Vec<TopicId> {
        let removed = self.subtree(id);
        self.detach(id);
        for rid in removed.iter() {
            self.nodes.remove(rid);
        }
        if self.root.is_some_and(|root| removed.contains(&root)) {
            self.root = None;
        }
        let removed_set: HashSet<TopicId> = removed.iter().copied().collect();
        self.link_index.retain(|_, target| !removed_set.contains(target));
        removed
    }

    /// Drops every node that is not part of the subtree of `root`. Returns the dropped ids.
    pub fn retain_reachable(&mut self, root: TopicId) -> Vec<TopicId> {
        let keep: HashSet<TopicId> = self.subtree(root).into_iter().collect();
        let removed: Vec<TopicId> = self
            .nodes
            .keys()
            .filter(|id| !keep.contains(id))
            .copied()
            .collect();
        for rid in removed.iter() {
            self.nodes.remove(rid);
        }
        self.rebuild_link_index();
        removed
    }

    /// Sets (`Some`) or removes (`None`) an attribute. Returns whether the stored value changed.
    pub fn set_attribute(&mut self, id: TopicId, name: &str, value: Option<String>) -> bool {
        let Some(node) = self.nodes.get_mut(&id) else {
            return false;
        };
        match value {
            Some(value) => {
                let previous = node.attributes.insert(name.to_string(), value.clone());
                let changed = previous.as_deref() != Some(value.as_str());
                if name == TOPIC_LINK_UID_ATTR {
                    self.index_link(value, id);
                }
                changed
            }
            None => node.attributes.remove(name).is_some(),
        }
    }

    pub fn index_link(&mut self, uid: String, id: TopicId) {
        let stale = match self.link_index.get(&uid) {
            Some(existing) => !self.is_valid_link_target(&uid, *existing),
            None => true,
        };
        if stale {
            self.link_index.insert(uid, id);
        }
    }

    fn is_valid_link_target(&self, uid: &str, id: TopicId) -> bool {
        self.node(id)
            .and_then(|node| node.attributes.get(TOPIC_LINK_UID_ATTR))
            .is_some_and(|value| value == uid)
            && self.is_attached(id)
    }

    /// Resolves a stable link id through the index, falling back to a pre-order search of the
    /// tree when the indexed entry is missing or stale.
    pub fn find_topic_for_link(&mut self, uid: &str) -> Option<TopicId> {
        if let Some(id) = self.link_index.get(uid).copied() {
            if self.is_valid_link_target(uid, id) {
                return Some(id);
            }
        }
        let found = self.root.and_then(|root| {
            self.subtree(root).into_iter().find(|id| {
                node_attribute(&self.nodes, *id, TOPIC_LINK_UID_ATTR) == Some(uid)
            })
        });
        match found {
            Some(id) => {
                self.link_index.insert(uid.to_string(), id);
            }
            None => {
                self.link_index.remove(uid);
            }
        }
        found
    }

    pub fn rebuild_link_index(&mut self) {
        self.link_index.clear();
        let Some(root) = self.root else {
            return;
        };
        for id in self.subtree(root) {
            if let Some(uid) = node_attribute(&self.nodes, id, TOPIC_LINK_UID_ATTR) {
                self.link_index.entry(uid.to_string()).or_insert(id);
            }
        }
    }

    pub fn snapshot(&self, id: TopicId) -> Option<TopicSnapshot> {
        let node = self.node(id)?;
        Some(TopicSnapshot {
            text: node.text.clone(),
            attributes: node.attributes.clone(),
            extras: node.extras.clone(),
            children: node
                .children
                .iter()
                .filter_map(|c| self.snapshot(*c))
                .collect(),
        })
    }

    /// Rebuilds a snapshot under `parent` with fresh identities.
    pub fn graft(&mut self, snapshot: TopicSnapshot, parent: Option<TopicId>) -> TopicId {
        let TopicSnapshot {
            text,
            attributes,
            extras,
            children,
        } = snapshot;
        let id = self.create_topic(parent, text);
        let link_uid = attributes.get(TOPIC_LINK_UID_ATTR).cloned();
        if let Some(node) = self.nodes.get_mut(&id) {
            node.attributes = attributes;
            node.extras = extras;
        }
        for child in children {
            self.graft(child, Some(id));
        }
        if let Some(uid) = link_uid {
            self.index_link(uid, id);
        }
        id
    }
}

fn node_attribute<'a>(
    nodes: &'a HashMap<TopicId, TopicNode>,
    id: TopicId,
    name: &str,
) -> Option<&'a str> {
    nodes
        .get(&id)
        .and_then(|node| node.attributes.get(name))
        .map(String::as_str)
}

struct MapInner {
    state: ReentrantMutex<RefCell<MapState>>,
    controller: RwLock<Option<Arc<dyn MindMapController>>>,
    payloads: Mutex<HashMap<TopicId, Payload>>,
}

/// Scoped hold on the document lock. Operations issued while it is alive run atomically with
/// respect to other threads.
pub struct MapLock<'a> {
    _guard: ReentrantMutexGuard<'a, RefCell<MapState>>,
}

/// A mind map document. Cloning yields another handle to the same document.
#[derive(Clone)]
pub struct MindMap(Arc<MapInner>);

impl PartialEq for MindMap {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for MindMap {}

impl Default for MindMap {
    fn default() -> MindMap {
        MindMap::new()
    }
}

impl fmt::Debug for MindMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.try_read_state(|state| (state.nodes.len(), state.root)) {
            Some((count, root)) => write!(f, "MindMap({count} topics, root: {root:?})"),
            None => write!(f, "MindMap(<busy>)"),
        }
    }
}

impl MindMap {
    /// An empty document (no root) carrying the current format version.
    pub fn new() -> MindMap {
        let mut state = MapState::default();
        state
            .attributes
            .insert(VERSION_ATTR.to_string(), FORMAT_VERSION.to_string());
        MindMap(Arc::new(MapInner {
            state: ReentrantMutex::new(RefCell::new(state)),
            controller: RwLock::new(None),
            payloads: Mutex::new(HashMap::new()),
        }))
    }

    /// A document with a root topic holding `text`.
    pub fn with_root(text: impl Into<String>) -> MindMap {
        let map = MindMap::new();
        let text = text.into();
        map.write_state(|state| {
            let root = state.create_topic(None, text);
            state.root = Some(root);
        });
        map
    }

    pub fn with_controller(self, controller: Arc<dyn MindMapController>) -> MindMap {
        self.set_controller(Some(controller));
        self
    }

    pub fn set_controller(&self, controller: Option<Arc<dyn MindMapController>>) {
        *self.0.controller.write() = controller;
    }

    pub fn controller(&self) -> Option<Arc<dyn MindMapController>> {
        self.0.controller.read().clone()
    }

    /// Acquires the document lock until the returned guard is dropped.
    pub fn lock(&self) -> MapLock<'_> {
        MapLock {
            _guard: self.0.state.lock(),
        }
    }

    pub(crate) fn read_state<R>(&self, f: impl FnOnce(&MapState) -> R) -> R {
        let guard = self.0.state.lock();
        let state = guard.borrow();
        f(&state)
    }

    pub(crate) fn write_state<R>(&self, f: impl FnOnce(&mut MapState) -> R) -> R {
        let guard = self.0.state.lock();
        let mut state = guard.borrow_mut();
        f(&mut state)
    }

    pub(crate) fn try_read_state<R>(&self, f: impl FnOnce(&MapState) -> R) -> Option<R> {
        let guard = self.0.state.lock();
        let result = guard.try_borrow().ok().map(|state| f(&state));
        result
    }

    pub(crate) fn handle(&self, id: TopicId) -> Topic {
        Topic::from_parts(self.clone(), id)
    }

    pub(crate) fn payload(&self, id: TopicId) -> Option<Payload> {
        self.0.payloads.lock().get(&id).cloned()
    }

    pub(crate) fn set_payload(&self, id: TopicId, payload: Option<Payload>) {
        let mut payloads = self.0.payloads.lock();
        match payload {
            Some(payload) => {
                payloads.insert(id, payload);
            }
            None => {
                payloads.remove(&id);
            }
        }
    }

    pub(crate) fn purge_payloads(&self, ids: &[TopicId]) {
        if ids.is_empty() {
            return;
        }
        let mut payloads = self.0.payloads.lock();
        for id in ids {
            payloads.remove(id);
        }
    }

    pub fn root(&self) -> Option<Topic> {
        self.read_state(|state| state.root)
            .map(|id| self.handle(id))
    }

    /// Makes a parentless topic of this document the root. The previous tree is dropped.
    /// `None` clears the document.
    pub fn set_root(&self, topic: Option<&Topic>) -> bool {
        let new_root = match topic {
            Some(topic) if topic.map() != self => {
                tracing::warn!("Refusing to use a topic of another document as root");
                return false;
            }
            Some(topic) => Some(topic.uid()),
            None => None,
        };
        let removed = self.write_state(|state| {
            if let Some(id) = new_root {
                if state.node(id).is_none_or(|node| node.parent.is_some()) {
                    return None;
                }
            }
            let removed = match state.root {
                Some(old) if Some(old) != new_root => state.remove_subtree(old),
                _ => Vec::new(),
            };
            state.root = new_root;
            state.rebuild_link_index();
            Some(removed)
        });
        match removed {
            Some(removed) => {
                self.purge_payloads(&removed);
                true
            }
            None => false,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.read_state(|state| state.attributes.get(name).cloned())
    }

    pub fn attributes(&self) -> BTreeMap<String, String> {
        self.read_state(|state| state.attributes.clone())
    }

    /// Sets (`Some`) or removes (`None`) a document attribute. Returns whether anything changed.
    /// Names that cannot be written as an attribute key are refused.
    pub fn set_attribute(&self, name: &str, value: Option<&str>) -> bool {
        if value.is_some() && !is_valid_attribute_name(name) {
            tracing::warn!("Refusing document attribute name {name:?}");
            return false;
        }
        self.write_state(|state| match value {
            Some(value) => state
                .attributes
                .insert(name.to_string(), value.to_string())
                .is_none_or(|previous| previous != value),
            None => state.attributes.remove(name).is_some(),
        })
    }

    /// Parses a document from its outline text.
    ///
    /// Malformed lines are dropped. Input without a single topic heading yields
    /// [MindMapError::EmptyDocument].
    #[tracing::instrument(skip_all)]
    pub fn parse(text: &str) -> Result<MindMap, MindMapError> {
        let map = MindMap::new();
        let root = map.write_state(|state| {
            state.attributes.clear();
            parser::parse_into(state, text)
        });
        match root {
            Some(root) => {
                tracing::debug!("Parsed mind map with root {root}");
                Ok(map)
            }
            None => Err(MindMapError::EmptyDocument),
        }
    }

    /// Serializes the document with the default configuration.
    pub fn write(&self) -> String {
        self.write_with(&MindMapConfig::default())
    }

    #[tracing::instrument(skip_all)]
    pub fn write_with(&self, config: &MindMapConfig) -> String {
        self.read_state(|state| writer::write_map(state, &config.head_line))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<MindMap, MindMapError> {
        tracing::debug!("Reading {:?}", path.as_ref());
        let content = read_to_string(path)?;
        MindMap::parse(&content)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), MindMapError> {
        let text = self.write();
        tracing::debug!("Writing {} bytes to {:?}", text.len(), path.as_ref());
        Ok(write(path, text)?)
    }

    /// Pre-order list of the topics reachable from the root.
    pub fn topics(&self) -> Vec<Topic> {
        let ids = self.read_state(|state| {
            state
                .root
                .map(|root| state.subtree(root))
                .unwrap_or_default()
        });
        ids.into_iter().map(|id| self.handle(id)).collect()
    }

    /// Resolves a stable link identifier. Returns `None` when no attached topic carries it.
    pub fn find_topic_for_link(&self, uid: &str) -> Option<Topic> {
        self.write_state(|state| state.find_topic_for_link(uid))
            .map(|id| self.handle(id))
    }

    /// Resolves the target of a TOPIC extra; other extras resolve to `None`.
    pub fn find_topic_for_extra(&self, extra: &Extra) -> Option<Topic> {
        match extra {
            Extra::Topic(uid) => self.find_topic_for_link(uid),
            _ => None,
        }
    }

    /// Returns a TOPIC extra pointing at `topic`, assigning it a stable identifier first when it
    /// has none.
    pub fn make_link_to(&self, topic: &Topic) -> Option<Extra> {
        if topic.map() != self {
            return None;
        }
        let id = topic.uid();
        self.write_state(|state| {
            let existing = state
                .node(id)?
                .attributes
                .get(TOPIC_LINK_UID_ATTR)
                .cloned();
            let uid = match existing {
                Some(uid) => uid,
                None => {
                    let uid = uuid::Uuid::new_v4().simple().to_string();
                    state.set_attribute(id, TOPIC_LINK_UID_ATTR, Some(uid.clone()));
                    uid
                }
            };
            Some(Extra::Topic(uid))
        })
    }

    /// Deletes `topic` and strips every TOPIC extra in the document that pointed into the
    /// deleted subtree.
    pub fn remove_topic(&self, topic: &Topic) -> bool {
        if topic.map() != self {
            return false;
        }
        let id = topic.uid();
        let removed = self.write_state(|state| {
            state.parent_of(id)?;
            let uids: HashSet<String> = state
                .subtree(id)
                .into_iter()
                .filter_map(|sid| {
                    node_attribute(&state.nodes, sid, TOPIC_LINK_UID_ATTR).map(str::to_string)
                })
                .collect();
            if !uids.is_empty() {
                let ids: Vec<TopicId> = state.nodes.keys().copied().collect();
                for nid in ids {
                    if let Some(node) = state.node_mut(nid) {
                        let points_inside = matches!(
                            node.extras.get(&ExtraType::Topic),
                            Some(Extra::Topic(uid)) if uids.contains(uid)
                        );
                        if points_inside {
                            node.extras.remove(&ExtraType::Topic);
                        }
                    }
                }
            }
            Some(state.remove_subtree(id))
        });
        match removed {
            Some(removed) => {
                self.purge_payloads(&removed);
                true
            }
            None => false,
        }
    }

    /// Copies `topic` as the last child of its own parent. Stable link identifiers are not
    /// copied. The root cannot be cloned.
    pub fn clone_topic(&self, topic: &Topic, full_tree: bool) -> Option<Topic> {
        if topic.map() != self {
            return None;
        }
        let id = topic.uid();
        self.write_state(|state| {
            let parent = state.parent_of(id)?;
            let mut snapshot = state.snapshot(id)?;
            if !full_tree {
                snapshot.children.clear();
            }
            snapshot.remove_attribute_recursive(TOPIC_LINK_UID_ATTR);
            Some(state.graft(snapshot, Some(parent)))
        })
        .map(|id| self.handle(id))
    }

    /// Deep copy into a new document with fresh identities. The controller is shared.
    pub fn make_copy(&self) -> MindMap {
        let (attributes, snapshot) = self.read_state(|state| {
            (
                state.attributes.clone(),
                state.root.and_then(|root| state.snapshot(root)),
            )
        });
        let copy = MindMap::new();
        copy.set_controller(self.controller());
        copy.write_state(|state| {
            state.attributes = attributes;
            if let Some(snapshot) = snapshot {
                let root = state.graft(snapshot, None);
                state.root = Some(root);
            }
        });
        copy
    }

    /// Inverse of [Topic::position_path]: a leading element for the root, then child indices.
    pub fn find_for_position_path(&self, positions: &[usize]) -> Option<Topic> {
        let (_, steps) = positions.split_first()?;
        self.read_state(|state| {
            let mut current = state.root?;
            for index in steps {
                current = *state.children_of(current).get(*index)?;
            }
            Some(current)
        })
        .map(|id| self.handle(id))
    }

    pub fn does_contain_file_link(&self, base_folder: &Path, file: &MapUri) -> bool {
        self.root()
            .is_some_and(|root| root.does_contain_file_link(base_folder, file))
    }

    pub fn delete_all_links_to_file(&self, base_folder: &Path, file: &MapUri) -> bool {
        self.root()
            .is_some_and(|root| root.delete_link_to_file_if_presented(base_folder, file))
    }

    pub fn replace_all_links_to_file(
        &self,
        base_folder: &Path,
        old_file: &MapUri,
        new_file: &MapUri,
    ) -> bool {
        self.root().is_some_and(|root| {
            root.replace_link_to_file_if_presented(base_folder, old_file, new_file)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_map_carries_version() {
        let map = MindMap::new();
        assert!(map.root().is_none());
        assert_eq!(map.attribute(VERSION_ATTR).as_deref(), Some(FORMAT_VERSION));
    }

    #[test]
    fn test_topic_ids_are_monotonic() {
        let a = TopicId::next();
        let b = TopicId::next();
        assert!(b > a);
    }

    #[test]
    fn test_link_index_follows_attribute_changes() {
        let map = MindMap::with_root("root");
        let root = map.root().unwrap();
        let target = root.make_child("target", None).unwrap();

        let link = map.make_link_to(&target).unwrap();
        let Extra::Topic(uid) = &link else {
            panic!("expected a topic link, got {link:?}");
        };
        assert_eq!(map.find_topic_for_extra(&link), Some(target.clone()));

        // Re-pointing the attribute invalidates the index entry.
        target.set_attribute(TOPIC_LINK_UID_ATTR, Some("other"));
        assert!(map.find_topic_for_link(uid).is_none());
        assert_eq!(map.find_topic_for_link("other"), Some(target.clone()));

        // Calling make_link_to again keeps the existing identifier.
        assert_eq!(map.make_link_to(&target), Some(Extra::Topic("other".into())));
    }

    #[test]
    fn test_remove_topic_strips_links_into_subtree() {
        let map = MindMap::with_root("root");
        let root = map.root().unwrap();
        let a = root.make_child("a", None).unwrap();
        let a_child = a.make_child("a child", None).unwrap();
        let b = root.make_child("b", None).unwrap();

        let link = map.make_link_to(&a_child).unwrap();
        b.set_extra([link.clone()]);
        root.set_extra([link]);

        assert!(map.remove_topic(&a));
        assert!(a.is_detached());
        assert!(a_child.is_detached());
        assert!(b.extra(ExtraType::Topic).is_none());
        assert!(root.extra(ExtraType::Topic).is_none());
        assert!(!map.remove_topic(&root));
    }

    #[test]
    fn test_clone_topic_drops_link_ids() {
        let map = MindMap::with_root("root");
        let root = map.root().unwrap();
        let a = root.make_child("a", None).unwrap();
        a.make_child("a1", None).unwrap();
        map.make_link_to(&a).unwrap();

        let full = map.clone_topic(&a, true).unwrap();
        assert_ne!(full, a);
        assert_eq!(full.text(), "a");
        assert_eq!(full.child_count(), 1);
        assert!(full.attribute(TOPIC_LINK_UID_ATTR).is_none());
        assert!(root.is_last_child(&full));

        let shallow = map.clone_topic(&a, false).unwrap();
        assert_eq!(shallow.child_count(), 0);
        assert!(map.clone_topic(&root, true).is_none());
    }

    #[test]
    fn test_position_path_lookup() {
        let map = MindMap::with_root("root");
        let root = map.root().unwrap();
        root.make_child("a", None).unwrap();
        let b = root.make_child("b", None).unwrap();
        let b2 = b.make_child("b1", None).unwrap();

        assert_eq!(b2.position_path(), vec![0, 1, 0]);
        assert_eq!(map.find_for_position_path(&[0, 1, 0]), Some(b2));
        assert_eq!(map.find_for_position_path(&[0]), Some(root));
        assert!(map.find_for_position_path(&[0, 5]).is_none());
        assert!(map.find_for_position_path(&[]).is_none());
    }

    #[test]
    fn test_set_root_replaces_tree() {
        let map = MindMap::with_root("old");
        let old = map.root().unwrap();
        let child = old.make_child("child", None).unwrap();

        let floating = Topic::new(&map, None, "new");
        assert_eq!(map.root(), Some(old.clone()));
        assert!(!map.set_root(Some(&child)));
        assert!(map.set_root(Some(&floating)));
        assert_eq!(map.root(), Some(floating));
        assert!(old.is_detached());
        assert!(child.is_detached());
    }

    #[test]
    fn test_make_copy_uses_fresh_identities() {
        let map = MindMap::with_root("root");
        let root = map.root().unwrap();
        root.make_child("a", None).unwrap();
        map.set_attribute("showJumps", Some("true"));

        let copy = map.make_copy();
        assert_ne!(copy, map);
        assert_eq!(copy.attribute("showJumps").as_deref(), Some("true"));
        let originals = map.topics();
        for topic in copy.topics() {
            assert!(!originals.contains(&topic));
        }
        assert_eq!(copy.write(), map.write());
    }
}
