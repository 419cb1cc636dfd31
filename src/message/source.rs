use crate::state::{ConnId, Connection};
use std::sync::Arc;

/// The user a message originates from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUser {
    pub id: ConnId,
    pub mask: Arc<str>,
}

/// Who a message is from.
///
/// The user reference drives side-effect suppression; the literal, when
/// set, is what appears on the wire (e.g. a server name, or a spoofed
/// mask for a message relayed on a user's behalf).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageSource {
    user: Option<SourceUser>,
    literal: Option<Arc<str>>,
}

impl MessageSource {
    /// No prefix on the wire.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn user(conn: &Connection) -> Self {
        Self {
            user: Some(SourceUser {
                id: conn.id(),
                mask: Arc::from(conn.mask()),
            }),
            literal: None,
        }
    }

    pub fn literal(source: &str) -> Self {
        Self {
            user: None,
            literal: Some(Arc::from(source)),
        }
    }

    /// Attributed to `conn` but shown on the wire as `literal`.
    pub fn user_as(conn: &Connection, literal: &str) -> Self {
        Self {
            literal: Some(Arc::from(literal)),
            ..Self::user(conn)
        }
    }

    /// The `:source` prefix text.
    pub fn wire_source(&self) -> Option<&str> {
        self.literal
            .as_deref()
            .or_else(|| self.user.as_ref().map(|u| &*u.mask))
    }

    pub fn source_user(&self) -> Option<&SourceUser> {
        self.user.as_ref()
    }

    pub fn origin_id(&self) -> Option<ConnId> {
        self.user.as_ref().map(|u| u.id)
    }
}
