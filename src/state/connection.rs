//! A connected client as seen by the delivery layer.

use crate::error::DeliveryError;
use crate::registry::ComponentId;
use crate::serialize::Serializer;
use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Stable connection identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnId(pub u64);

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Key for an integer extension value, owned by the component that created
/// it. Values are purged when that component unloads.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExtKey {
    name: Arc<str>,
    owner: ComponentId,
}

impl ExtKey {
    pub fn new(name: &str, owner: ComponentId) -> Self {
        Self {
            name: Arc::from(name),
            owner,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn owner(&self) -> ComponentId {
        self.owner
    }
}

#[derive(Debug, Clone, Copy)]
struct ExtSlot {
    owner: ComponentId,
    value: u64,
}

/// Per-connection state the switchboard needs: identity, extension values,
/// the serializer slot and the outbound queue.
pub struct Connection {
    id: ConnId,
    nick: RwLock<String>,
    user: String,
    host: String,
    ext: Mutex<HashMap<Arc<str>, ExtSlot>>,
    serializer: RwLock<Option<Arc<dyn Serializer>>>,
    outbound: mpsc::Sender<Bytes>,
    sendq_exceeded: AtomicBool,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("mask", &self.mask())
            .finish_non_exhaustive()
    }
}

impl Connection {
    pub fn new(
        id: ConnId,
        nick: &str,
        user: &str,
        host: &str,
        outbound: mpsc::Sender<Bytes>,
    ) -> Self {
        Self {
            id,
            nick: RwLock::new(nick.to_string()),
            user: user.to_string(),
            host: host.to_string(),
            ext: Mutex::new(HashMap::new()),
            serializer: RwLock::new(None),
            outbound,
            sendq_exceeded: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn id(&self) -> ConnId {
        self.id
    }

    pub fn nick(&self) -> String {
        self.nick.read().clone()
    }

    pub fn set_nick(&self, nick: &str) {
        *self.nick.write() = nick.to_string();
    }

    /// `nick!user@host`.
    pub fn mask(&self) -> String {
        format!("{}!{}@{}", self.nick.read(), self.user, self.host)
    }

    // === Extension storage ===

    pub fn ext_get(&self, key: &ExtKey) -> Option<u64> {
        self.ext
            .lock()
            .get(key.name())
            .filter(|slot| slot.owner == key.owner())
            .map(|slot| slot.value)
    }

    pub fn ext_set(&self, key: &ExtKey, value: u64) {
        self.ext.lock().insert(
            Arc::clone(&key.name),
            ExtSlot {
                owner: key.owner(),
                value,
            },
        );
    }

    pub fn ext_unset(&self, key: &ExtKey) -> Option<u64> {
        let mut ext = self.ext.lock();
        match ext.get(key.name()) {
            Some(slot) if slot.owner == key.owner() => ext.remove(key.name()).map(|s| s.value),
            _ => None,
        }
    }

    /// Read-modify-write under the connection's lock. `None` from `f` unsets
    /// the value. Returns the stored value afterwards.
    pub fn ext_update<F>(&self, key: &ExtKey, f: F) -> Option<u64>
    where
        F: FnOnce(Option<u64>) -> Option<u64>,
    {
        let mut ext = self.ext.lock();
        let current = ext
            .get(key.name())
            .filter(|slot| slot.owner == key.owner())
            .map(|slot| slot.value);
        match f(current) {
            Some(value) => {
                ext.insert(
                    Arc::clone(&key.name),
                    ExtSlot {
                        owner: key.owner(),
                        value,
                    },
                );
                Some(value)
            }
            None => {
                if ext.get(key.name()).is_some_and(|slot| slot.owner == key.owner()) {
                    ext.remove(key.name());
                }
                None
            }
        }
    }

    /// Drop every extension value owned by `owner`, and the serializer if
    /// `owner` provided it.
    pub fn purge_owner(&self, owner: ComponentId) -> usize {
        let removed = {
            let mut ext = self.ext.lock();
            let before = ext.len();
            ext.retain(|_, slot| slot.owner != owner);
            before - ext.len()
        };

        let mut serializer = self.serializer.write();
        if serializer.as_ref().is_some_and(|s| s.owner() == owner) {
            *serializer = None;
        }
        removed
    }

    // === Serializer slot ===

    pub fn serializer(&self) -> Option<Arc<dyn Serializer>> {
        self.serializer.read().clone()
    }

    pub fn set_serializer(&self, serializer: Option<Arc<dyn Serializer>>) {
        *self.serializer.write() = serializer;
    }

    // === Outbound queue ===

    /// Queue one line without waiting. A full queue flags the connection as
    /// SendQ-exceeded; the line is dropped either way.
    pub fn write(&self, line: Bytes) -> Result<(), DeliveryError> {
        match self.outbound.try_send(line) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                if !self.sendq_exceeded.swap(true, Ordering::AcqRel) {
                    tracing::warn!(conn = %self.id, "SendQ exceeded");
                }
                Err(DeliveryError::SendQueueFull(self.id))
            }
            Err(TrySendError::Closed(_)) => Err(DeliveryError::Closed(self.id)),
        }
    }

    pub fn is_sendq_exceeded(&self) -> bool {
        self.sendq_exceeded.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }
}
