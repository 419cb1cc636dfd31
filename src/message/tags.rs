use crate::tags::TagProviderRef;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Upper bound on tags per message; matches the width of a
/// [`TagSelection`](super::TagSelection).
pub const MAX_TAGS: usize = 64;

/// Opaque provider-specific data riding along with a tag.
pub type TagContext = Arc<dyn Any + Send + Sync>;

/// Stable index of a tag within its map, assigned at insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TagHandle(u8);

impl TagHandle {
    #[inline]
    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

/// A tag's value together with the provider that decides who sees it.
#[derive(Clone)]
pub struct TagData {
    pub provider: TagProviderRef,
    pub value: String,
    pub context: Option<TagContext>,
}

impl TagData {
    pub fn new(provider: &TagProviderRef, value: impl Into<String>) -> Self {
        Self {
            provider: provider.clone(),
            value: value.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: TagContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Downcast the context to a concrete type.
    pub fn context_as<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.context.as_deref().and_then(|c| c.downcast_ref::<T>())
    }
}

impl fmt::Debug for TagData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagData")
            .field("provider", &self.provider.identity())
            .field("value", &self.value)
            .field("context", &self.context.is_some())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct TagEntry {
    name: String,
    handle: TagHandle,
    data: TagData,
}

impl TagEntry {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn handle(&self) -> TagHandle {
        self.handle
    }

    #[inline]
    pub fn data(&self) -> &TagData {
        &self.data
    }
}

/// Insertion-ordered tags with unique names.
///
/// Tags are never removed one at a time, so a handle always equals the
/// entry's insertion position.
#[derive(Debug, Clone, Default)]
pub struct TagMap {
    entries: Vec<TagEntry>,
}

impl TagMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tag. A duplicate name or a full map leaves the map untouched
    /// and returns `None`.
    pub fn insert(&mut self, name: &str, data: TagData) -> Option<TagHandle> {
        if self.contains(name) {
            return None;
        }
        let index = self.entries.len();
        if index >= MAX_TAGS {
            tracing::debug!(tag = %name, "tag map full, dropping tag");
            return None;
        }
        let handle = TagHandle(u8::try_from(index).ok()?);
        self.entries.push(TagEntry {
            name: name.to_string(),
            handle,
            data,
        });
        Some(handle)
    }

    pub fn get(&self, name: &str) -> Option<&TagData> {
        self.entries.iter().find(|e| e.name == name).map(|e| &e.data)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut TagData> {
        self.entries
            .iter_mut()
            .find(|e| e.name == name)
            .map(|e| &mut e.data)
    }

    pub fn handle_of(&self, name: &str) -> Option<TagHandle> {
        self.entries.iter().find(|e| e.name == name).map(|e| e.handle)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TagEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy in every tag from `other` whose name is not already present.
    /// Returns how many were added.
    pub fn merge_from(&mut self, other: &TagMap) -> usize {
        other
            .iter()
            .filter(|e| self.insert(&e.name, e.data.clone()).is_some())
            .count()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
