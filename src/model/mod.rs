//! The document model: [`MindMap`] documents, [`Topic`] handles and their [`Extra`] attachments.

pub mod extra;
pub mod map;
pub mod topic;
pub mod uri;

pub use extra::{Extra, ExtraType};
pub use map::{
    MapLock, MindMap, MindMapController, Payload, TopicId, FORMAT_VERSION, TOPIC_LINK_UID_ATTR,
    VERSION_ATTR,
};
pub use topic::Topic;
pub use uri::MapUri;
