//! RFC 1459 / IRCv3 line format.

use super::{ParseOutput, Serializer, SerializerId};
use crate::config::LimitsConfig;
use crate::error::RegistryError;
use crate::message::{Message, TagMap, TagSelection};
use crate::registry::{Component, ComponentId};
use crate::state::Connection;
use crate::switchboard::Switchboard;
use crate::tags::TagArbiter;
use bytes::Bytes;
use slirc_wire::{LineBuilder, ParseError, RawLine, TagIter, unescape_tag_value};
use std::sync::Arc;
use tracing::{debug, warn};

/// Service name new connections look their serializer up under.
pub const RFC_SERIALIZER_SERVICE: &str = "serializer/rfc";

pub struct RfcSerializer {
    id: SerializerId,
    owner: ComponentId,
    limits: LimitsConfig,
    arbiter: TagArbiter,
}

impl RfcSerializer {
    pub fn new(owner: ComponentId, limits: LimitsConfig, arbiter: TagArbiter) -> Self {
        Self {
            id: SerializerId::next(),
            owner,
            limits,
            arbiter,
        }
    }

    /// Create the serializer for `owner` and publish it as the default.
    pub fn install(switchboard: &Switchboard, owner: &Arc<Component>) -> Result<Arc<Self>, RegistryError> {
        let serializer = Arc::new(Self::new(
            owner.id(),
            switchboard.limits().clone(),
            switchboard.arbiter().clone(),
        ));
        switchboard.services().register::<dyn Serializer>(
            RFC_SERIALIZER_SERVICE,
            owner.id(),
            Arc::clone(&serializer) as Arc<dyn Serializer>,
        )?;
        Ok(serializer)
    }
}

impl Serializer for RfcSerializer {
    fn id(&self) -> SerializerId {
        self.id
    }

    fn name(&self) -> &str {
        "rfc"
    }

    fn owner(&self) -> ComponentId {
        self.owner
    }

    fn serialize(&self, message: &Message, selection: TagSelection) -> Bytes {
        let mut line = LineBuilder::new(
            self.limits.max_line_length,
            self.limits.max_server_tags_length,
        );

        for entry in message.tags().iter() {
            if !selection.is_selected(entry.handle()) {
                continue;
            }
            let value = entry.data().value.as_str();
            if !line.tag(entry.name(), (!value.is_empty()).then_some(value)) {
                debug!(tag = %entry.name(), command = %message.command(), "tag over budget, left off");
            }
        }

        if let Some(source) = message.source().wire_source() {
            line.source(source);
        }
        line.command(message.command());
        for param in message.params() {
            match param.as_str() {
                Some(param) => line.param(param),
                None => {
                    warn!(command = %message.command(), "unfilled placeholder parameter");
                    line.param("*");
                }
            }
        }
        line.finish()
    }

    fn parse(&self, sender: &Connection, line: &str) -> Result<ParseOutput, ParseError> {
        let raw = RawLine::parse_bounded(
            line,
            self.limits.max_client_tags_length,
            self.limits.max_line_length,
        )?;

        let mut tags = TagMap::new();
        if let Some(section) = raw.tags {
            for (key, value) in TagIter::new(section) {
                let value = value.map(unescape_tag_value).unwrap_or_default();
                self.arbiter.process_incoming(sender, key, value, &mut tags);
            }
        }

        Ok(ParseOutput {
            source: raw.source.map(str::to_string),
            command: raw.command.to_string(),
            params: raw.params.iter().map(|p| p.to_string()).collect(),
            tags,
        })
    }
}
