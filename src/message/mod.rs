//! The unit of output: one line's worth of command, parameters, tags and
//! source, plus the per-message serialization cache.

mod cache;
mod param;
mod selection;
mod source;
mod tags;
mod types;

pub use cache::SerializationCache;
pub use param::Param;
pub use selection::TagSelection;
pub use source::{MessageSource, SourceUser};
pub use tags::{MAX_TAGS, TagContext, TagData, TagEntry, TagHandle, TagMap};
pub use types::{Message, MessageList, SharedMessage};
