use super::selection::TagSelection;
use crate::serialize::SerializerId;
use bytes::Bytes;

/// Serialized forms of one message.
///
/// Keyed by `(serializer, selection)`; looked up by linear scan.
#[derive(Debug, Clone, Default)]
pub struct SerializationCache {
    entries: Vec<(SerializerId, TagSelection, Bytes)>,
}

impl SerializationCache {
    pub fn get(&self, serializer: SerializerId, selection: TagSelection) -> Option<Bytes> {
        self.entries
            .iter()
            .find(|(id, sel, _)| *id == serializer && *sel == selection)
            .map(|(_, _, bytes)| bytes.clone())
    }

    pub fn insert(&mut self, serializer: SerializerId, selection: TagSelection, bytes: Bytes) {
        self.entries.push((serializer, selection, bytes));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
