use super::{TAG_PROVIDER_EVENT, TagProvider, TagProviderRef};
use crate::caps::Capability;
use crate::error::RegistryError;
use crate::event::Recipient;
use crate::message::{Message, TagData};
use crate::registry::{Component, DEFAULT_PRIORITY};
use crate::switchboard::Switchboard;
use std::sync::Arc;

/// Stamps every outgoing message with `time` and shows it to clients that
/// enabled `server-time`.
pub struct ServerTimeTags {
    cap: Capability,
}

impl ServerTimeTags {
    pub fn install(switchboard: &Switchboard, owner: &Arc<Component>) -> Result<Arc<Self>, RegistryError> {
        let provider = Arc::new(Self {
            cap: Capability::new(switchboard, owner, "server-time"),
        });
        switchboard.hub().subscribe::<dyn TagProvider>(
            TAG_PROVIDER_EVENT,
            owner,
            "server-time",
            DEFAULT_PRIORITY,
            Arc::clone(&provider) as Arc<dyn TagProvider>,
        )?;
        Ok(provider)
    }

    pub fn capability(&self) -> &Capability {
        &self.cap
    }
}

impl TagProvider for ServerTimeTags {
    fn on_populate_tags(&self, this: &TagProviderRef, message: &mut Message) {
        message.add_tag("time", this, slirc_wire::format_server_time(), None);
    }

    fn should_send_tag(&self, recipient: &Recipient<'_>, _tag: &TagData) -> bool {
        self.cap.get(recipient.conn())
    }
}
