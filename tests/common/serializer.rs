//! Serializer that counts encode calls.

use bytes::Bytes;
use slirc_wire::ParseError;
use slircd_switchboard::Switchboard;
use slircd_switchboard::message::{Message, TagSelection};
use slircd_switchboard::registry::ComponentId;
use slircd_switchboard::serialize::{ParseOutput, RfcSerializer, Serializer, SerializerId};
use slircd_switchboard::state::Connection;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Delegates to [`RfcSerializer`] and counts `serialize` calls.
pub struct RecordingSerializer {
    inner: RfcSerializer,
    calls: AtomicUsize,
}

impl RecordingSerializer {
    pub fn new(switchboard: &Switchboard, owner: ComponentId) -> Self {
        Self {
            inner: RfcSerializer::new(
                owner,
                switchboard.limits().clone(),
                switchboard.arbiter().clone(),
            ),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Serializer for RecordingSerializer {
    fn id(&self) -> SerializerId {
        self.inner.id()
    }

    fn name(&self) -> &str {
        "recording"
    }

    fn owner(&self) -> ComponentId {
        self.inner.owner()
    }

    fn serialize(&self, message: &Message, selection: TagSelection) -> Bytes {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.serialize(message, selection)
    }

    fn parse(&self, sender: &Connection, line: &str) -> Result<ParseOutput, ParseError> {
        self.inner.parse(sender, line)
    }
}
