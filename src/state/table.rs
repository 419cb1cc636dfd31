//! Table of live connections.

use super::connection::{ConnId, Connection};
use super::dashmap_ext::DashMapExt;
use crate::registry::ComponentId;
use bytes::Bytes;
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

pub struct ConnectionTable {
    connections: DashMap<ConnId, Arc<Connection>>,
    next_id: AtomicU64,
    sendq: usize,
}

impl ConnectionTable {
    /// `sendq` is the outbound queue capacity given to new connections.
    pub fn new(sendq: usize) -> Self {
        Self {
            connections: DashMap::new(),
            next_id: AtomicU64::new(1),
            sendq: sendq.max(1),
        }
    }

    /// Create and register a connection. The receiver is the writer side's
    /// end of the outbound queue.
    pub fn create(&self, nick: &str, user: &str, host: &str) -> (Arc<Connection>, mpsc::Receiver<Bytes>) {
        let id = ConnId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(self.sendq);
        let conn = Arc::new(Connection::new(id, nick, user, host, tx));
        self.connections.insert(id, Arc::clone(&conn));
        (conn, rx)
    }

    pub fn get(&self, id: ConnId) -> Option<Arc<Connection>> {
        self.connections.get_cloned(&id)
    }

    pub fn remove(&self, id: ConnId) -> Option<Arc<Connection>> {
        self.connections.remove(&id).map(|(_, c)| c)
    }

    /// Snapshot of every connection, ordered by id.
    pub fn all(&self) -> Vec<Arc<Connection>> {
        let mut all = self.connections.values_cloned();
        all.sort_by_key(|c| c.id());
        all
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Purge `owner`'s extension values and serializer from every connection.
    pub fn purge_owner(&self, owner: ComponentId) -> usize {
        self.all().iter().map(|c| c.purge_owner(owner)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ExtKey;

    #[test]
    fn test_create_assigns_increasing_ids() {
        let table = ConnectionTable::new(4);
        let (a, _ra) = table.create("a", "a", "h");
        let (b, _rb) = table.create("b", "b", "h");
        assert!(a.id() < b.id());
        assert_eq!(table.len(), 2);
        assert_eq!(table.all().iter().map(|c| c.id()).collect::<Vec<_>>(), vec![a.id(), b.id()]);
    }

    #[test]
    fn test_remove_drops_entry() {
        let table = ConnectionTable::new(4);
        let (a, _ra) = table.create("a", "a", "h");
        assert!(table.remove(a.id()).is_some());
        assert!(table.get(a.id()).is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn test_purge_owner_sweeps_all_connections() {
        let table = ConnectionTable::new(4);
        let (a, _ra) = table.create("a", "a", "h");
        let (b, _rb) = table.create("b", "b", "h");
        let key = ExtKey::new("capbits", ComponentId(42));
        a.ext_set(&key, 1);
        b.ext_set(&key, 2);
        assert_eq!(table.purge_owner(ComponentId(42)), 2);
        assert_eq!(a.ext_get(&key), None);
    }
}
