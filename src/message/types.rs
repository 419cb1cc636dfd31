use super::cache::SerializationCache;
use super::param::Param;
use super::selection::TagSelection;
use super::source::MessageSource;
use super::tags::{TagContext, TagData, TagHandle, TagMap};
use crate::serialize::Serializer;
use crate::tags::TagProviderRef;
use bytes::Bytes;
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

/// One outgoing line before serialization.
///
/// Every mutator that changes what would be written invalidates the cache.
#[derive(Debug, Clone)]
pub struct Message {
    command: String,
    params: Vec<Param>,
    tags: TagMap,
    source: MessageSource,
    side_effect: bool,
    tags_populated: bool,
    cache: SerializationCache,
}

impl Message {
    pub fn new(command: &str) -> Self {
        Self::with_source(MessageSource::none(), command)
    }

    pub fn with_source(source: MessageSource, command: &str) -> Self {
        Self {
            command: command.to_string(),
            params: Vec::new(),
            tags: TagMap::new(),
            source,
            side_effect: false,
            tags_populated: false,
            cache: SerializationCache::default(),
        }
    }

    /// Builder-style [`push_param`](Self::push_param).
    pub fn param(mut self, param: impl Into<Param>) -> Self {
        self.push_param(param);
        self
    }

    // === Command / source ===

    #[inline]
    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn set_command(&mut self, command: &str) {
        self.command = command.to_string();
        self.invalidate_cache();
    }

    #[inline]
    pub fn source(&self) -> &MessageSource {
        &self.source
    }

    pub fn set_source(&mut self, source: MessageSource) {
        self.source = source;
        self.invalidate_cache();
    }

    // === Params ===

    #[inline]
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn param_str(&self, index: usize) -> Option<&str> {
        self.params.get(index).and_then(Param::as_str)
    }

    pub fn push_param(&mut self, param: impl Into<Param>) {
        self.params.push(param.into());
        self.invalidate_cache();
    }

    pub fn push_shared(&mut self, param: &Arc<str>) {
        self.push_param(Param::Shared(Arc::clone(param)));
    }

    /// Reserve a parameter slot; returns its index for
    /// [`replace_param`](Self::replace_param).
    pub fn push_placeholder(&mut self) -> usize {
        self.params.push(Param::Placeholder);
        self.invalidate_cache();
        self.params.len() - 1
    }

    /// Overwrite the parameter at `index`. Returns false if out of range.
    pub fn replace_param(&mut self, index: usize, param: impl Into<Param>) -> bool {
        match self.params.get_mut(index) {
            Some(slot) => {
                *slot = param.into();
                self.invalidate_cache();
                true
            }
            None => false,
        }
    }

    // === Tags ===

    #[inline]
    pub fn tags(&self) -> &TagMap {
        &self.tags
    }

    /// Attach a tag on behalf of `provider`. First writer wins: a duplicate
    /// name is a silent no-op returning `None`.
    pub fn add_tag(
        &mut self,
        name: &str,
        provider: &TagProviderRef,
        value: impl Into<String>,
        context: Option<TagContext>,
    ) -> Option<TagHandle> {
        let mut data = TagData::new(provider, value);
        data.context = context;
        let handle = self.tags.insert(name, data)?;
        self.invalidate_cache();
        Some(handle)
    }

    /// Merge tags from `other` without overwriting.
    pub fn add_tags(&mut self, other: &TagMap) {
        if self.tags.merge_from(other) > 0 {
            self.invalidate_cache();
        }
    }

    /// Replace the value of an existing tag.
    pub fn set_tag_value(&mut self, name: &str, value: impl Into<String>) -> bool {
        match self.tags.get_mut(name) {
            Some(data) => {
                data.value = value.into();
                self.invalidate_cache();
                true
            }
            None => false,
        }
    }

    /// Drop all params and tags. Tags will be populated again on next send.
    pub fn clear(&mut self) {
        self.params.clear();
        self.tags.clear();
        self.tags_populated = false;
        self.invalidate_cache();
    }

    // === Flags ===

    #[inline]
    pub fn is_side_effect(&self) -> bool {
        self.side_effect
    }

    /// Side-effect messages are not delivered back to their source user.
    pub fn set_side_effect(&mut self, side_effect: bool) {
        self.side_effect = side_effect;
    }

    #[inline]
    pub fn tags_populated(&self) -> bool {
        self.tags_populated
    }

    pub(crate) fn mark_tags_populated(&mut self) {
        self.tags_populated = true;
    }

    // === Serialization ===

    /// Serialized bytes for `(serializer, selection)`, from cache when
    /// possible. The returned `Bytes` is an independent handle.
    pub fn get_serialized(&mut self, serializer: &dyn Serializer, selection: TagSelection) -> Bytes {
        if let Some(bytes) = self.cache.get(serializer.id(), selection) {
            crate::metrics::record_cache(true);
            return bytes;
        }
        crate::metrics::record_cache(false);
        let bytes = serializer.serialize(self, selection);
        self.cache.insert(serializer.id(), selection, bytes.clone());
        bytes
    }

    pub fn invalidate_cache(&mut self) {
        self.cache.clear();
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
}

/// A message shared between an event and whatever else needs it (a batch
/// keeps its framing messages this way).
#[derive(Debug, Clone)]
pub struct SharedMessage(Arc<Mutex<Message>>);

impl SharedMessage {
    pub fn new(message: Message) -> Self {
        Self(Arc::new(Mutex::new(message)))
    }

    pub fn lock(&self) -> MutexGuard<'_, Message> {
        self.0.lock()
    }

    pub fn ptr_eq(&self, other: &SharedMessage) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<Message> for SharedMessage {
    fn from(message: Message) -> Self {
        Self::new(message)
    }
}

/// What a hook chain may rewrite per recipient.
pub type MessageList = Vec<SharedMessage>;
