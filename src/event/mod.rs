//! Events: one occurrence, its messages, and the hook chain that may rewrite
//! them per recipient.

mod recipient;

pub use recipient::Recipient;

use crate::error::DeliveryError;
use crate::message::{Message, MessageList, SharedMessage};
use crate::registry::{Decision, EventProvider};
use tracing::error;

/// Hooks subscribed to an event's provider.
pub trait EventHook: Send + Sync {
    /// Runs once per [`Event`], before the first recipient.
    fn on_event_init(&self, event: &mut Event) {
        let _ = event;
    }

    /// Runs per recipient, in priority order. `Deny` suppresses delivery to
    /// this recipient, `Allow` delivers `messages` as they stand without
    /// asking later hooks, `Passthru` moves on.
    fn on_pre_event_send(
        &self,
        recipient: &Recipient<'_>,
        event: &Event,
        messages: &mut MessageList,
    ) -> Decision {
        let _ = (recipient, event, messages);
        Decision::Passthru
    }
}

/// One occurrence to deliver.
pub struct Event {
    provider: EventProvider<dyn EventHook>,
    messages: MessageList,
    initialized: bool,
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("provider", &self.provider.name())
            .field("messages", &self.messages.len())
            .field("initialized", &self.initialized)
            .finish()
    }
}

impl Event {
    pub fn new(provider: EventProvider<dyn EventHook>, message: Message) -> Self {
        Self::from_shared(provider, vec![SharedMessage::new(message)])
    }

    pub fn with_messages(provider: EventProvider<dyn EventHook>, messages: Vec<Message>) -> Self {
        Self::from_shared(provider, messages.into_iter().map(SharedMessage::new).collect())
    }

    pub fn from_shared(provider: EventProvider<dyn EventHook>, messages: MessageList) -> Self {
        Self {
            provider,
            messages,
            initialized: false,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        self.provider.name()
    }

    #[inline]
    pub fn provider(&self) -> &EventProvider<dyn EventHook> {
        &self.provider
    }

    /// The messages every recipient gets unless a hook intervenes.
    #[inline]
    pub fn messages(&self) -> &MessageList {
        &self.messages
    }

    pub fn messages_mut(&mut self) -> &mut MessageList {
        &mut self.messages
    }

    pub fn push_message(&mut self, message: Message) {
        self.messages.push(SharedMessage::new(message));
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Run `on_event_init` hooks if they have not run yet.
    pub(crate) fn ensure_initialized(&mut self) {
        if self.initialized {
            return;
        }
        self.initialized = true;
        let provider = self.provider.clone();
        provider.fire_all(|hook| hook.on_event_init(self));
    }

    /// Run the per-recipient hook chain. `Ok(None)` means a hook denied
    /// delivery.
    pub(crate) fn messages_for(
        &self,
        recipient: &Recipient<'_>,
    ) -> Result<Option<MessageList>, DeliveryError> {
        let mut list = self.messages.clone();
        let decision = self
            .provider
            .first_decision(|hook| hook.on_pre_event_send(recipient, self, &mut list));

        if decision == Decision::Deny {
            return Ok(None);
        }
        if list.is_empty() {
            error!(
                event = %self.name(),
                conn = %recipient.conn().id(),
                "hook chain left an empty message list, nothing delivered"
            );
            return Err(DeliveryError::EmptyMessageList {
                event: self.name().to_string(),
            });
        }
        Ok(Some(list))
    }
}
