//! Message-tag providers.
//!
//! A provider does up to three things: attach tags to outgoing messages,
//! vote on tags arriving from clients, and decide per recipient whether each
//! of its tags is shown. Providers subscribe to [`TAG_PROVIDER_EVENT`]; the
//! [`TagArbiter`] drives them.

mod client;
mod server_time;

pub use client::ClientTags;
pub use server_time::ServerTimeTags;

use crate::event::Recipient;
use crate::message::{Message, TagData, TagMap, TagSelection};
use crate::registry::{Decision, EventProvider, Listener};
use crate::state::Connection;
use tracing::debug;

/// Event name tag providers subscribe under.
pub const TAG_PROVIDER_EVENT: &str = "event/messagetag";

/// A subscribed tag provider. Tags keep one of these so visibility is asked
/// of the provider that attached them.
pub type TagProviderRef = Listener<dyn TagProvider>;

pub trait TagProvider: Send + Sync {
    /// Attach tags to an outgoing message. Runs once per message; `this` is
    /// the provider's own subscription, for use with
    /// [`Message::add_tag`].
    fn on_populate_tags(&self, this: &TagProviderRef, message: &mut Message) {
        let _ = (this, message);
    }

    /// Vote on a tag received from `sender`. May rewrite the value.
    fn on_process_tag(&self, sender: &Connection, name: &str, value: &mut String) -> Decision {
        let _ = (sender, name, value);
        Decision::Passthru
    }

    /// Whether `recipient` should see `tag`.
    fn should_send_tag(&self, recipient: &Recipient<'_>, tag: &TagData) -> bool;
}

/// Runs the tag providers over messages.
#[derive(Debug, Clone)]
pub struct TagArbiter {
    providers: EventProvider<dyn TagProvider>,
}

impl TagArbiter {
    pub fn new(providers: EventProvider<dyn TagProvider>) -> Self {
        Self { providers }
    }

    /// Let every provider attach tags, once per message.
    pub fn populate(&self, message: &mut Message) {
        if message.tags_populated() {
            return;
        }
        message.mark_tags_populated();
        self.providers.fire_all(|provider| provider.on_populate_tags(provider, message));
    }

    /// Arbitrate one incoming tag. The first provider to answer decides;
    /// nobody answering means the tag is dropped. Accepted tags are inserted
    /// into `tags` bound to the accepting provider.
    pub fn process_incoming(
        &self,
        sender: &Connection,
        name: &str,
        value: String,
        tags: &mut TagMap,
    ) -> bool {
        if name.is_empty() {
            crate::metrics::record_tag_rejected();
            return false;
        }

        let mut value = value;
        let decision = self
            .providers
            .decide(|provider| provider.on_process_tag(sender, name, &mut value));

        match decision {
            Some((provider, Decision::Allow)) => tags.insert(name, TagData::new(&provider, value)).is_some(),
            _ => {
                debug!(conn = %sender.id(), tag = %name, "incoming tag rejected");
                crate::metrics::record_tag_rejected();
                false
            }
        }
    }

    /// Which of `message`'s tags `recipient` sees. Tags whose provider is
    /// unloading are never shown.
    pub fn select_for(&self, recipient: &Recipient<'_>, message: &Message) -> TagSelection {
        let mut selection = TagSelection::default();
        for entry in message.tags().iter() {
            let data = entry.data();
            if data.provider.is_live() && data.provider.should_send_tag(recipient, data) {
                selection.select(entry.handle());
            }
        }
        selection
    }
}
