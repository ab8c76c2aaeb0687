//! [Topic]: a handle to one node of a [MindMap] tree.
//!
//! A handle is the document plus the node's [TopicId]. Every operation takes the document lock,
//! so a handle can be shared freely between threads. Once the node leaves the document (it was
//! deleted, or its tree was replaced) the handle is *detached*: reads return empty values and
//! mutators return `false` or `None`.

use std::{
    collections::BTreeMap,
    fmt,
    hash::{Hash, Hasher},
    path::Path,
};

use crate::{
    codec::{escape::is_valid_attribute_name, writer},
    model::{
        extra::{Extra, ExtraType},
        map::{MindMap, MindMapController, Payload, TopicId, TOPIC_LINK_UID_ATTR},
        uri::MapUri,
    },
};

#[derive(Clone)]
pub struct Topic {
    map: MindMap,
    uid: TopicId,
}

impl PartialEq for Topic {
    fn eq(&self, other: &Self) -> bool {
        self.uid == other.uid
    }
}

impl Eq for Topic {}

impl Hash for Topic {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.uid.hash(state);
    }
}

impl fmt::Debug for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self
            .map
            .try_read_state(|state| state.node(self.uid).map(|node| node.text.clone()))
            .flatten();
        f.debug_struct("Topic")
            .field("uid", &self.uid)
            .field("text", &text)
            .finish()
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self
            .map
            .try_read_state(|state| state.node(self.uid).map(|node| node.text.clone()))
            .flatten()
            .unwrap_or_default();
        write!(f, "Topic({}, '{}')", self.uid, text)
    }
}

impl Topic {
    /// Creates a topic in `map`, appended as the last child of `parent`. A parentless topic
    /// becomes the root when the document has none.
    pub fn new(map: &MindMap, parent: Option<&Topic>, text: impl Into<String>) -> Topic {
        let parent_id = match parent {
            Some(parent) if parent.map != *map => {
                tracing::warn!("Parent {} belongs to another document, ignoring it", parent.uid);
                None
            }
            Some(parent) => Some(parent.uid),
            None => None,
        };
        let text = text.into();
        let id = map.write_state(|state| {
            let parent_id = parent_id.filter(|p| state.contains(*p));
            let id = state.create_topic(parent_id, text);
            if parent_id.is_none() && state.root.is_none() {
                state.root = Some(id);
            }
            id
        });
        Topic::from_parts(map.clone(), id)
    }

    pub(crate) fn from_parts(map: MindMap, uid: TopicId) -> Topic {
        Topic { map, uid }
    }

    pub fn uid(&self) -> TopicId {
        self.uid
    }

    pub fn map(&self) -> &MindMap {
        &self.map
    }

    pub fn is_detached(&self) -> bool {
        !self.map.read_state(|state| state.contains(self.uid))
    }

    fn handles(&self, ids: impl IntoIterator<Item = TopicId>) -> Vec<Topic> {
        ids.into_iter().map(|id| self.map.handle(id)).collect()
    }

    pub fn text(&self) -> String {
        self.map.read_state(|state| {
            state
                .node(self.uid)
                .map(|node| node.text.clone())
                .unwrap_or_default()
        })
    }

    pub fn set_text(&self, text: impl Into<String>) -> bool {
        let text = text.into();
        self.map.write_state(|state| match state.node_mut(self.uid) {
            Some(node) => {
                node.text = text;
                true
            }
            None => false,
        })
    }

    pub fn parent(&self) -> Option<Topic> {
        self.map
            .read_state(|state| state.parent_of(self.uid))
            .map(|id| self.map.handle(id))
    }

    pub fn children(&self) -> Vec<Topic> {
        let ids = self
            .map
            .read_state(|state| state.children_of(self.uid).to_vec());
        self.handles(ids)
    }

    pub fn child_count(&self) -> usize {
        self.map
            .read_state(|state| state.children_of(self.uid).len())
    }

    pub fn has_children(&self) -> bool {
        self.child_count() > 0
    }

    pub fn first(&self) -> Option<Topic> {
        self.map
            .read_state(|state| state.children_of(self.uid).first().copied())
            .map(|id| self.map.handle(id))
    }

    pub fn last(&self) -> Option<Topic> {
        self.map
            .read_state(|state| state.children_of(self.uid).last().copied())
            .map(|id| self.map.handle(id))
    }

    /// True for a live topic without a parent.
    pub fn is_root(&self) -> bool {
        self.map.read_state(|state| {
            state
                .node(self.uid)
                .is_some_and(|node| node.parent.is_none())
        })
    }

    pub fn is_first_child(&self, topic: &Topic) -> bool {
        self.first().is_some_and(|first| first == *topic)
    }

    pub fn is_last_child(&self, topic: &Topic) -> bool {
        self.last().is_some_and(|last| last == *topic)
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.map.read_state(|state| {
            state
                .node(self.uid)
                .and_then(|node| node.attributes.get(name).cloned())
        })
    }

    pub fn attributes(&self) -> BTreeMap<String, String> {
        self.map.read_state(|state| {
            state
                .node(self.uid)
                .map(|node| node.attributes.clone())
                .unwrap_or_default()
        })
    }

    /// Sets (`Some`) or removes (`None`) an attribute. Returns whether the stored value changed.
    /// Names that cannot be written as an attribute key are refused.
    pub fn set_attribute(&self, name: &str, value: Option<&str>) -> bool {
        if value.is_some() && !is_valid_attribute_name(name) {
            tracing::warn!("Refusing attribute name {name:?}");
            return false;
        }
        self.map.write_state(|state| {
            state.set_attribute(self.uid, name, value.map(str::to_string))
        })
    }

    pub fn extra(&self, ty: ExtraType) -> Option<Extra> {
        self.map.read_state(|state| {
            state
                .node(self.uid)
                .and_then(|node| node.extras.get(&ty).cloned())
        })
    }

    /// All extras in serialization order.
    pub fn extras(&self) -> BTreeMap<ExtraType, Extra> {
        self.map.read_state(|state| {
            state
                .node(self.uid)
                .map(|node| node.extras.clone())
                .unwrap_or_default()
        })
    }

    pub fn number_of_extras(&self) -> usize {
        self.map.read_state(|state| {
            state
                .node(self.uid)
                .map(|node| node.extras.len())
                .unwrap_or(0)
        })
    }

    /// Stores each extra under its type, replacing any existing extra of that type.
    pub fn set_extra(&self, extras: impl IntoIterator<Item = Extra>) -> bool {
        self.map.write_state(|state| {
            let Some(node) = state.node_mut(self.uid) else {
                return false;
            };
            for extra in extras {
                node.extras.insert(extra.extra_type(), extra);
            }
            true
        })
    }

    /// Removes the extras of the given types. Returns whether anything was removed.
    pub fn remove_extra(&self, types: &[ExtraType]) -> bool {
        self.map.write_state(|state| {
            let Some(node) = state.node_mut(self.uid) else {
                return false;
            };
            types
                .iter()
                .fold(false, |removed, ty| node.extras.remove(ty).is_some() || removed)
        })
    }

    /// Like [Topic::remove_extra], except an empty slice clears every extra.
    pub fn remove_extras(&self, types: &[ExtraType]) -> bool {
        if !types.is_empty() {
            return self.remove_extra(types);
        }
        self.map.write_state(|state| {
            let Some(node) = state.node_mut(self.uid) else {
                return false;
            };
            let changed = !node.extras.is_empty();
            node.extras.clear();
            changed
        })
    }

    pub fn payload(&self) -> Option<Payload> {
        self.map.payload(self.uid)
    }

    /// Payloads are dropped when the topic leaves the document.
    pub fn set_payload(&self, payload: Option<Payload>) -> bool {
        if self.is_detached() {
            return false;
        }
        self.map.set_payload(self.uid, payload);
        true
    }

    /// True when `topic` is this topic or lies in its subtree.
    pub fn contain_topic(&self, topic: &Topic) -> bool {
        topic.map == self.map
            && self
                .map
                .read_state(|state| state.is_in_subtree(self.uid, topic.uid))
    }

    /// True when `topic` is a strict ancestor of this topic.
    pub fn has_ancestor(&self, topic: &Topic) -> bool {
        topic.map == self.map
            && self.map.read_state(|state| {
                state
                    .parent_of(self.uid)
                    .is_some_and(|parent| state.is_in_subtree(topic.uid, parent))
            })
    }

    /// The ancestor reached by walking `depth` links above the parent; `0` yields the parent.
    pub fn find_parent_for_depth(&self, depth: usize) -> Option<Topic> {
        self.map
            .read_state(|state| state.find_parent_for_depth(self.uid, depth))
            .map(|id| self.map.handle(id))
    }

    pub fn root(&self) -> Topic {
        let id = self.map.read_state(|state| state.root_of(self.uid));
        self.map.handle(id)
    }

    /// Distance from the root; the root is level 0.
    pub fn topic_level(&self) -> usize {
        self.map.read_state(|state| state.level_of(self.uid))
    }

    /// Topics from the root down to this one, inclusive.
    pub fn path(&self) -> Vec<Topic> {
        let ids = self.map.read_state(|state| {
            if state.contains(self.uid) {
                state.path_of(self.uid)
            } else {
                Vec::new()
            }
        });
        self.handles(ids)
    }

    /// A leading `0` for the root followed by the child index taken at each step.
    pub fn position_path(&self) -> Vec<usize> {
        self.map.read_state(|state| {
            if !state.contains(self.uid) {
                return Vec::new();
            }
            let path = state.path_of(self.uid);
            let mut positions = Vec::with_capacity(path.len());
            positions.push(0);
            for id in path.iter().skip(1) {
                let index = state.index_in_parent(*id).map(|(_, idx)| idx).unwrap_or(0);
                positions.push(index);
            }
            positions
        })
    }

    /// Whether this topic and its whole subtree are empty and the controller lets them go
    /// silently. Without a controller nothing can be lost.
    pub fn can_be_lost(&self) -> bool {
        let _lock = self.map.lock();
        match self.map.controller() {
            Some(controller) => self.can_be_lost_with(controller.as_ref()),
            None => false,
        }
    }

    fn can_be_lost_with(&self, controller: &dyn MindMapController) -> bool {
        let node = self.map.read_state(|state| {
            state.node(self.uid).map(|node| {
                (
                    node.text.trim().is_empty() && node.extras.is_empty(),
                    node.children.clone(),
                )
            })
        });
        let Some((blank, children)) = node else {
            return false;
        };
        blank
            && controller.can_be_deleted_silently(&self.map, self)
            && children
                .into_iter()
                .all(|child| self.map.handle(child).can_be_lost_with(controller))
    }

    fn siblings_around(&self) -> Option<(Vec<TopicId>, Vec<TopicId>)> {
        self.map.read_state(|state| {
            let (parent, index) = state.index_in_parent(self.uid)?;
            let children = state.children_of(parent);
            Some((children[..index].to_vec(), children[index + 1..].to_vec()))
        })
    }

    /// First following sibling accepted by `predicate` (any sibling when `None`).
    pub fn find_next(&self, predicate: Option<&dyn Fn(&Topic) -> bool>) -> Option<Topic> {
        let _lock = self.map.lock();
        let (_, after) = self.siblings_around()?;
        after
            .into_iter()
            .map(|id| self.map.handle(id))
            .find(|topic| predicate.is_none_or(|accept| accept(topic)))
    }

    /// Nearest preceding sibling accepted by `predicate` (any sibling when `None`).
    pub fn find_prev(&self, predicate: Option<&dyn Fn(&Topic) -> bool>) -> Option<Topic> {
        let _lock = self.map.lock();
        let (before, _) = self.siblings_around()?;
        before
            .into_iter()
            .rev()
            .map(|id| self.map.handle(id))
            .find(|topic| predicate.is_none_or(|accept| accept(topic)))
    }

    /// First value of `name` found walking strictly upward from the parent.
    pub fn find_attribute_in_ancestors(&self, name: &str) -> Option<String> {
        self.map.read_state(|state| {
            let mut current = state.parent_of(self.uid);
            while let Some(id) = current {
                let node = state.node(id)?;
                if let Some(value) = node.attributes.get(name) {
                    return Some(value.clone());
                }
                current = node.parent;
            }
            None
        })
    }

    /// Pre-order search of the subtree, this topic included.
    pub fn find_for_attribute(&self, name: &str, value: &str) -> Option<Topic> {
        self.map
            .read_state(|state| {
                state.subtree(self.uid).into_iter().find(|id| {
                    state
                        .node(*id)
                        .and_then(|node| node.attributes.get(name))
                        .is_some_and(|found| found == value)
                })
            })
            .map(|id| self.map.handle(id))
    }

    /// Appends a child. When `after` is one of the current children the new topic is placed
    /// right after it instead.
    pub fn make_child(&self, text: impl Into<String>, after: Option<&Topic>) -> Option<Topic> {
        let text = text.into();
        let after = after.filter(|after| after.map == self.map).map(|after| after.uid);
        self.map
            .write_state(|state| {
                if !state.contains(self.uid) {
                    return None;
                }
                let id = state.create_topic(Some(self.uid), text);
                if let (Some(after), Some(node)) = (after, state.node_mut(self.uid)) {
                    if let Some(pos) = node.children.iter().position(|c| *c == after) {
                        node.children.pop();
                        node.children.insert(pos + 1, id);
                    }
                }
                Some(id)
            })
            .map(|id| self.map.handle(id))
    }

    pub fn move_before(&self, sibling: &Topic) -> bool {
        self.move_next_to(sibling, false)
    }

    pub fn move_after(&self, sibling: &Topic) -> bool {
        self.move_next_to(sibling, true)
    }

    fn move_next_to(&self, sibling: &Topic, after: bool) -> bool {
        if sibling.map != self.map || sibling.uid == self.uid {
            return false;
        }
        self.map.write_state(|state| {
            let Some((parent, from)) = state.index_in_parent(self.uid) else {
                return false;
            };
            let Some((sibling_parent, to)) = state.index_in_parent(sibling.uid) else {
                return false;
            };
            if parent != sibling_parent {
                return false;
            }
            let mut target = if after { to + 1 } else { to };
            if from < target {
                target -= 1;
            }
            move_within(state.node_mut(parent), from, target)
        })
    }

    pub fn make_first(&self) -> bool {
        self.map.write_state(|state| {
            let Some((parent, from)) = state.index_in_parent(self.uid) else {
                return false;
            };
            move_within(state.node_mut(parent), from, 0)
        })
    }

    pub fn make_last(&self) -> bool {
        self.map.write_state(|state| {
            let Some((parent, from)) = state.index_in_parent(self.uid) else {
                return false;
            };
            let last = state.children_of(parent).len() - 1;
            move_within(state.node_mut(parent), from, last)
        })
    }

    /// Re-parents this topic as the last child of `new_parent`. Rejected for the document root,
    /// for targets inside this subtree, for the current parent and for foreign or detached
    /// targets.
    pub fn move_to_new_parent(&self, new_parent: Option<&Topic>) -> bool {
        let Some(new_parent) = new_parent else {
            return false;
        };
        if new_parent.map != self.map {
            tracing::warn!("Cannot move {} into another document", self.uid);
            return false;
        }
        if new_parent.uid == self.uid {
            return false;
        }
        let (id, target) = (self.uid, new_parent.uid);
        self.map.write_state(|state| {
            if !state.contains(id) || !state.contains(target) || state.root == Some(id) {
                return false;
            }
            if state.parent_of(id) == Some(target) {
                return false;
            }
            if state.is_in_subtree(id, target) {
                tracing::warn!("Refusing to move {id} below its own descendant {target}");
                return false;
            }
            state.detach(id);
            if let Some(node) = state.node_mut(id) {
                node.parent = Some(target);
            }
            if let Some(parent) = state.node_mut(target) {
                parent.children.push(id);
            }
            true
        })
    }

    /// Removes this topic and its subtree from the document. The document root cannot be deleted;
    /// a parentless topic outside the tree can.
    pub fn delete(&self) -> bool {
        let removed = self.map.write_state(|state| {
            if !state.contains(self.uid) || state.root == Some(self.uid) {
                return None;
            }
            Some(state.remove_subtree(self.uid))
        });
        match removed {
            Some(removed) => {
                self.map.purge_payloads(&removed);
                true
            }
            None => false,
        }
    }

    /// Deep copy into `target` with fresh identities, appended under `parent` (or parentless,
    /// becoming the root of an empty `target`). Returns the copy's root.
    pub fn make_copy(&self, target: &MindMap, parent: Option<&Topic>) -> Option<Topic> {
        let parent_id = match parent {
            Some(parent) if parent.map != *target => {
                tracing::warn!("Copy parent {} is not part of the target document", parent.uid);
                return None;
            }
            Some(parent) => Some(parent.uid),
            None => None,
        };
        let snapshot = self.map.read_state(|state| state.snapshot(self.uid))?;
        target
            .write_state(|state| {
                if parent_id.is_some_and(|p| !state.contains(p)) {
                    return None;
                }
                let id = state.graft(snapshot, parent_id);
                if parent_id.is_none() && state.root.is_none() {
                    state.root = Some(id);
                }
                Some(id)
            })
            .map(|id| target.handle(id))
    }

    /// Runs `f` on every node of the subtree and reports whether any call changed something.
    fn update_subtree(&self, mut f: impl FnMut(&mut crate::model::map::TopicNode) -> bool) -> bool {
        self.map.write_state(|state| {
            let mut changed = false;
            for id in state.subtree(self.uid) {
                if let Some(node) = state.node_mut(id) {
                    changed |= f(node);
                }
            }
            changed
        })
    }

    pub fn remove_extra_from_subtree(&self, types: &[ExtraType]) -> bool {
        self.update_subtree(|node| {
            types
                .iter()
                .fold(false, |removed, ty| node.extras.remove(ty).is_some() || removed)
        })
    }

    pub fn remove_attribute_from_subtree(&self, names: &[&str]) -> bool {
        self.update_subtree(|node| {
            names
                .iter()
                .fold(false, |removed, name| node.attributes.remove(*name).is_some() || removed)
        })
    }

    /// Drops TOPIC extras in this subtree that point at `target`. A target without a stable
    /// link identifier has no links to drop.
    pub fn remove_all_links_to(&self, target: &Topic) -> bool {
        // A target in another document is read under its own lock, never while holding this one.
        let _lock = (target.map == self.map).then(|| self.map.lock());
        let Some(uid) = target.attribute(TOPIC_LINK_UID_ATTR) else {
            return false;
        };
        self.update_subtree(|node| {
            let points_at_target = node
                .extras
                .get(&ExtraType::Topic)
                .and_then(Extra::as_topic_uid)
                .is_some_and(|linked| linked == uid);
            if points_at_target {
                node.extras.remove(&ExtraType::Topic);
            }
            points_at_target
        })
    }

    /// Drops FILE extras pointing at `file` or at anything inside it.
    pub fn delete_link_to_file_if_presented(&self, base_folder: &Path, file: &MapUri) -> bool {
        self.update_subtree(|node| {
            let matches = node
                .extras
                .get(&ExtraType::File)
                .and_then(Extra::as_file)
                .is_some_and(|linked| linked.is_same_or_has_parent(base_folder, file));
            if matches {
                node.extras.remove(&ExtraType::File);
            }
            matches
        })
    }

    pub fn replace_link_to_file_if_presented(
        &self,
        base_folder: &Path,
        old_file: &MapUri,
        new_file: &MapUri,
    ) -> bool {
        self.update_subtree(|node| {
            let matches = node
                .extras
                .get(&ExtraType::File)
                .and_then(Extra::as_file)
                .is_some_and(|linked| linked.is_same(base_folder, old_file));
            if matches {
                node.extras
                    .insert(ExtraType::File, Extra::File(new_file.clone()));
            }
            matches
        })
    }

    pub fn does_contain_file_link(&self, base_folder: &Path, file: &MapUri) -> bool {
        self.map.read_state(|state| {
            state.subtree(self.uid).into_iter().any(|id| {
                state
                    .node(id)
                    .and_then(|node| node.extras.get(&ExtraType::File))
                    .and_then(Extra::as_file)
                    .is_some_and(|linked| linked.is_same(base_folder, file))
            })
        })
    }

    /// Serializes this subtree, headings starting at the topic's own depth.
    pub fn write(&self) -> String {
        self.map.read_state(|state| {
            let mut out = String::new();
            if state.contains(self.uid) {
                let level = state.level_of(self.uid) + 1;
                writer::write_topic(state, self.uid, level, &mut out);
            }
            out
        })
    }
}

fn move_within(
    parent: Option<&mut crate::model::map::TopicNode>,
    from: usize,
    to: usize,
) -> bool {
    let Some(parent) = parent else {
        return false;
    };
    if from == to || from >= parent.children.len() || to >= parent.children.len() {
        return false;
    }
    let id = parent.children.remove(from);
    parent.children.insert(to, id);
    true
}
