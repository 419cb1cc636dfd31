//! Error types for the switchboard.
//!
//! Most failures in this layer degrade silently (a dropped tag, a
//! capability that never registers). The errors below are
//! the ones a caller can act on: registration conflicts while wiring
//! components together, and per-recipient delivery failures that are logged
//! and counted without affecting other recipients.

use crate::state::ConnId;
use thiserror::Error;

// ============================================================================
// Registry Errors (component / service / event wiring)
// ============================================================================

/// Errors raised while loading components or registering services and
/// listeners.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("component already loaded: {0}")]
    AlreadyLoaded(String),

    #[error("component not loaded: {0}")]
    NotLoaded(String),

    #[error("component is unloading: {0}")]
    Dying(String),

    #[error("service already registered: {0}")]
    ServiceExists(String),

    #[error("event {0} is registered with a different listener type")]
    ListenerTypeMismatch(String),
}

impl RegistryError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AlreadyLoaded(_) => "already_loaded",
            Self::NotLoaded(_) => "not_loaded",
            Self::Dying(_) => "dying",
            Self::ServiceExists(_) => "service_exists",
            Self::ListenerTypeMismatch(_) => "listener_type_mismatch",
        }
    }
}

// ============================================================================
// Delivery Errors (per-recipient send path)
// ============================================================================

/// Errors from delivering an event to a single recipient.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The connection has no serializer attached (not yet negotiated, or
    /// its serializer was unloaded).
    #[error("connection {0} has no serializer")]
    NoSerializer(ConnId),

    /// The outbound queue is full; the connection is flagged for disconnect.
    #[error("sendq exceeded for connection {0}")]
    SendQueueFull(ConnId),

    /// The writer side of the connection has gone away.
    #[error("connection {0} is closed")]
    Closed(ConnId),

    /// A hook left the message list empty without denying delivery.
    #[error("hook chain for {event} left an empty message list")]
    EmptyMessageList { event: String },
}

impl DeliveryError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NoSerializer(_) => "no_serializer",
            Self::SendQueueFull(_) => "sendq_full",
            Self::Closed(_) => "closed",
            Self::EmptyMessageList { .. } => "empty_message_list",
        }
    }
}
