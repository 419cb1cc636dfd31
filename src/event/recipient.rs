use super::Event;
use crate::error::DeliveryError;
use crate::state::Connection;
use crate::switchboard::Switchboard;
use std::sync::Arc;

/// The connection an event is currently being delivered to, plus the
/// switchboard so hooks and tag providers can send framing of their own.
#[derive(Clone, Copy)]
pub struct Recipient<'a> {
    switchboard: &'a Switchboard,
    conn: &'a Arc<Connection>,
}

impl<'a> Recipient<'a> {
    pub fn new(switchboard: &'a Switchboard, conn: &'a Arc<Connection>) -> Self {
        Self { switchboard, conn }
    }

    #[inline]
    pub fn conn(&self) -> &'a Arc<Connection> {
        self.conn
    }

    #[inline]
    pub fn switchboard(&self) -> &'a Switchboard {
        self.switchboard
    }

    /// Deliver another event to this same connection.
    pub fn send(&self, event: &mut Event) -> Result<usize, DeliveryError> {
        self.switchboard.send(self.conn, event)
    }
}

impl std::fmt::Debug for Recipient<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recipient").field("conn", &self.conn.id()).finish()
    }
}
