//! Priority-ordered publish/subscribe.
//!
//! Every named event owns one [`SubscriberList`], created on first use by
//! whichever side arrives first: the component that fires the event or one
//! that listens to it. Lists are ordered by `(priority, identity)` so dispatch
//! order is deterministic. Dispatch iterates a snapshot of `Arc` clones and
//! re-checks the owner's dying flag per listener, so concurrent unloads never
//! invalidate an in-progress iteration.

use super::component::{Component, ComponentId};
use crate::error::RegistryError;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::any::Any;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Lower runs first.
pub type Priority = i32;

pub const DEFAULT_PRIORITY: Priority = 100;

/// Answer from a listener that may short-circuit dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Decision {
    Allow,
    Deny,
    #[default]
    Passthru,
}

/// One subscription: a handler plus the component that owns it.
pub struct Listener<L: ?Sized> {
    handler: Arc<L>,
    owner: Arc<Component>,
    priority: Priority,
    identity: Arc<str>,
}

impl<L: ?Sized> Listener<L> {
    pub fn new(handler: Arc<L>, owner: Arc<Component>, identity: &str, priority: Priority) -> Self {
        Self {
            handler,
            owner,
            priority,
            identity: Arc::from(identity),
        }
    }

    #[inline]
    pub fn handler(&self) -> &Arc<L> {
        &self.handler
    }

    #[inline]
    pub fn owner(&self) -> &Arc<Component> {
        &self.owner
    }

    #[inline]
    pub fn priority(&self) -> Priority {
        self.priority
    }

    #[inline]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// False once the owning component has started unloading.
    #[inline]
    pub fn is_live(&self) -> bool {
        !self.owner.is_dying()
    }

    /// Same handler instance (vtable ignored).
    pub fn same_handler(&self, other: &Listener<L>) -> bool {
        Arc::as_ptr(&self.handler).cast::<()>() == Arc::as_ptr(&other.handler).cast::<()>()
    }

    fn sort_key(&self) -> (Priority, &str) {
        (self.priority, &self.identity)
    }
}

impl<L: ?Sized> Clone for Listener<L> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            owner: Arc::clone(&self.owner),
            priority: self.priority,
            identity: Arc::clone(&self.identity),
        }
    }
}

impl<L: ?Sized> Deref for Listener<L> {
    type Target = L;

    fn deref(&self) -> &L {
        &self.handler
    }
}

impl<L: ?Sized> fmt::Debug for Listener<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("identity", &self.identity)
            .field("owner", &self.owner.name())
            .field("priority", &self.priority)
            .finish()
    }
}

/// Ordered subscribers for one event.
pub struct SubscriberList<L: ?Sized> {
    entries: RwLock<Vec<Listener<L>>>,
}

impl<L: ?Sized> Default for SubscriberList<L> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }
}

impl<L: ?Sized> SubscriberList<L> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert in `(priority, identity)` order. An existing entry with the same
    /// identity is replaced.
    pub fn insert(&self, listener: Listener<L>) {
        let mut entries = self.entries.write();
        entries.retain(|l| l.identity() != listener.identity());
        let pos = entries
            .iter()
            .position(|l| l.sort_key() > listener.sort_key())
            .unwrap_or(entries.len());
        entries.insert(pos, listener);
    }

    pub fn remove_identity(&self, identity: &str) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|l| l.identity() != identity);
        entries.len() != before
    }

    pub fn remove_owner(&self, owner: ComponentId) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|l| l.owner().id() != owner);
        before - entries.len()
    }

    /// Clone the current ordering. The lock is released before returning.
    pub fn snapshot(&self) -> Vec<Listener<L>> {
        self.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// Typed handle on one event's subscriber list.
pub struct EventProvider<L: ?Sized> {
    name: Arc<str>,
    list: Arc<SubscriberList<L>>,
}

impl<L: ?Sized> Clone for EventProvider<L> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            list: Arc::clone(&self.list),
        }
    }
}

impl<L: ?Sized> fmt::Debug for EventProvider<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventProvider")
            .field("name", &self.name)
            .field("subscribers", &self.list.len())
            .finish()
    }
}

impl<L: ?Sized> EventProvider<L> {
    /// A provider not attached to any hub. Mostly useful in tests.
    pub fn detached(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            list: Arc::new(SubscriberList::new()),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Live subscribers in dispatch order.
    pub fn subscribers(&self) -> Vec<Listener<L>> {
        let mut snapshot = self.list.snapshot();
        snapshot.retain(Listener::is_live);
        snapshot
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Invoke every live listener in order.
    pub fn fire_all<F>(&self, mut f: F)
    where
        F: FnMut(&Listener<L>),
    {
        for listener in self.list.snapshot() {
            if listener.is_live() {
                f(&listener);
            }
        }
    }

    /// Invoke listeners in order until one answers something other than
    /// `Passthru`; returns that listener and its answer.
    pub fn decide<F>(&self, mut f: F) -> Option<(Listener<L>, Decision)>
    where
        F: FnMut(&Listener<L>) -> Decision,
    {
        for listener in self.list.snapshot() {
            if !listener.is_live() {
                continue;
            }
            match f(&listener) {
                Decision::Passthru => continue,
                decision => return Some((listener, decision)),
            }
        }
        None
    }

    /// [`decide`](Self::decide) without the listener; `Passthru` when nobody
    /// answers.
    pub fn first_decision<F>(&self, f: F) -> Decision
    where
        F: FnMut(&Listener<L>) -> Decision,
    {
        self.decide(f).map_or(Decision::Passthru, |(_, d)| d)
    }
}

trait ErasedList: Send + Sync {
    fn remove_owner(&self, owner: ComponentId) -> usize;
    fn remove_identity(&self, identity: &str) -> bool;
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<L: ?Sized + Send + Sync + 'static> ErasedList for SubscriberList<L> {
    fn remove_owner(&self, owner: ComponentId) -> usize {
        SubscriberList::remove_owner(self, owner)
    }

    fn remove_identity(&self, identity: &str) -> bool {
        SubscriberList::remove_identity(self, identity)
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// All named subscriber lists.
#[derive(Default)]
pub struct EventHub {
    lists: DashMap<Arc<str>, Arc<dyn ErasedList>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Typed provider for `name`, creating the list on first use.
    ///
    /// Fails if the name is already bound to a different listener type.
    pub fn provider<L>(&self, name: &str) -> Result<EventProvider<L>, RegistryError>
    where
        L: ?Sized + Send + Sync + 'static,
    {
        let erased = Arc::clone(
            self.lists
                .entry(Arc::from(name))
                .or_insert_with(|| Arc::new(SubscriberList::<L>::new()))
                .value(),
        );
        let list = erased
            .into_any()
            .downcast::<SubscriberList<L>>()
            .map_err(|_| RegistryError::ListenerTypeMismatch(name.to_string()))?;
        Ok(EventProvider {
            name: Arc::from(name),
            list,
        })
    }

    /// Add `handler` to `name`'s list on behalf of `owner`.
    pub fn subscribe<L>(
        &self,
        name: &str,
        owner: &Arc<Component>,
        identity: &str,
        priority: Priority,
        handler: Arc<L>,
    ) -> Result<Listener<L>, RegistryError>
    where
        L: ?Sized + Send + Sync + 'static,
    {
        if owner.is_dying() {
            return Err(RegistryError::Dying(owner.name().to_string()));
        }
        let provider = self.provider::<L>(name)?;
        let listener = Listener::new(handler, Arc::clone(owner), identity, priority);
        provider.list.insert(listener.clone());
        tracing::debug!(
            event = %name,
            identity = %identity,
            owner = %owner.name(),
            priority,
            "listener subscribed"
        );
        Ok(listener)
    }

    pub fn unsubscribe(&self, name: &str, identity: &str) -> bool {
        self.lists
            .get(name)
            .map(|l| Arc::clone(l.value()))
            .is_some_and(|l| l.remove_identity(identity))
    }

    /// Drop every listener owned by `owner` from every list.
    pub fn remove_owner(&self, owner: ComponentId) -> usize {
        let lists: Vec<_> = self.lists.iter().map(|e| Arc::clone(e.value())).collect();
        lists.iter().map(|l| l.remove_owner(owner)).sum()
    }
}
