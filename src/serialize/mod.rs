//! Turning messages into wire bytes and wire lines into messages.

mod rfc;

pub use rfc::{RFC_SERIALIZER_SERVICE, RfcSerializer};

use crate::event::Recipient;
use crate::message::{Message, MessageSource, Param, TagMap, TagSelection};
use crate::registry::ComponentId;
use crate::state::Connection;
use crate::tags::TagArbiter;
use bytes::Bytes;
use slirc_wire::ParseError;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SERIALIZER_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one serializer instance, used as half of the cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SerializerId(u64);

impl SerializerId {
    pub fn next() -> Self {
        Self(NEXT_SERIALIZER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SerializerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A line received from a client, with its tags already arbitrated.
#[derive(Debug, Clone, Default)]
pub struct ParseOutput {
    pub source: Option<String>,
    pub command: String,
    pub params: Vec<String>,
    pub tags: TagMap,
}

impl ParseOutput {
    /// Rebuild an outgoing message from the parsed line (e.g. for relaying).
    pub fn into_message(self) -> Message {
        let source = match &self.source {
            Some(source) => MessageSource::literal(source),
            None => MessageSource::none(),
        };
        let mut message = Message::with_source(source, &self.command);
        for param in self.params {
            message.push_param(Param::Owned(param));
        }
        message.add_tags(&self.tags);
        message
    }
}

/// A wire format.
pub trait Serializer: Send + Sync {
    fn id(&self) -> SerializerId;

    fn name(&self) -> &str;

    /// Component that provided the serializer. Connections drop it when
    /// that component unloads.
    fn owner(&self) -> ComponentId;

    /// Encode `message` showing only the tags in `selection`. Includes the
    /// line terminator.
    fn serialize(&self, message: &Message, selection: TagSelection) -> Bytes;

    /// Decode one line from `sender`. Tags nobody accepts are dropped.
    fn parse(&self, sender: &Connection, line: &str) -> Result<ParseOutput, ParseError>;
}

/// Bytes for `message` as `recipient` should see them: tags are populated
/// (once), the recipient's selection is computed, and the cache is
/// consulted.
pub fn serialize_for(
    serializer: &dyn Serializer,
    arbiter: &TagArbiter,
    recipient: &Recipient<'_>,
    message: &mut Message,
) -> Bytes {
    arbiter.populate(message);
    let selection = arbiter.select_for(recipient, message);
    message.get_serialized(serializer, selection)
}
