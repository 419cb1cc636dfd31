use super::{TAG_PROVIDER_EVENT, TagProvider};
use crate::caps::Capability;
use crate::error::RegistryError;
use crate::event::Recipient;
use crate::message::TagData;
use crate::registry::{Component, DEFAULT_PRIORITY, Decision};
use crate::state::Connection;
use crate::switchboard::Switchboard;
use std::sync::Arc;

/// `message-tags`: accepts `+`-prefixed client-only tags from clients that
/// negotiated the capability, and relays them only to clients that did too.
pub struct ClientTags {
    cap: Capability,
}

impl ClientTags {
    pub fn install(switchboard: &Switchboard, owner: &Arc<Component>) -> Result<Arc<Self>, RegistryError> {
        let provider = Arc::new(Self {
            cap: Capability::new(switchboard, owner, "message-tags"),
        });
        switchboard.hub().subscribe::<dyn TagProvider>(
            TAG_PROVIDER_EVENT,
            owner,
            "message-tags",
            DEFAULT_PRIORITY,
            Arc::clone(&provider) as Arc<dyn TagProvider>,
        )?;
        Ok(provider)
    }

    pub fn capability(&self) -> &Capability {
        &self.cap
    }
}

impl TagProvider for ClientTags {
    fn on_process_tag(&self, sender: &Connection, name: &str, _value: &mut String) -> Decision {
        if !name.starts_with('+') {
            return Decision::Passthru;
        }
        if self.cap.get(sender) {
            Decision::Allow
        } else {
            Decision::Deny
        }
    }

    fn should_send_tag(&self, recipient: &Recipient<'_>, _tag: &TagData) -> bool {
        self.cap.get(recipient.conn())
    }
}
