//! Loadable components.
//!
//! A component owns everything it registers: listeners, services,
//! capabilities, per-connection extension values and serializers. Unloading
//! it tears all of that down in one pass (see `Switchboard::unload_component`).

use crate::error::RegistryError;
use crate::switchboard::Switchboard;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Event name under which [`ComponentListener`]s subscribe.
pub const COMPONENT_EVENT: &str = "event/component";

static NEXT_COMPONENT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique component identity. A reload under the same name gets a
/// fresh id, so stale owner references never match the new instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub u64);

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A loaded component.
#[derive(Debug)]
pub struct Component {
    id: ComponentId,
    name: Arc<str>,
    dying: AtomicBool,
}

impl Component {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            id: ComponentId(NEXT_COMPONENT_ID.fetch_add(1, Ordering::Relaxed)),
            name: Arc::from(name),
            dying: AtomicBool::new(false),
        })
    }

    #[inline]
    pub fn id(&self) -> ComponentId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True once unloading has begun. Dispatch skips listeners of dying
    /// components even if they are still present in a snapshot.
    #[inline]
    pub fn is_dying(&self) -> bool {
        self.dying.load(Ordering::Acquire)
    }

    pub(crate) fn mark_dying(&self) {
        self.dying.store(true, Ordering::Release);
    }
}

/// Receives notice that a component is about to be unloaded.
///
/// Called before the component is marked dying, so managers can still send
/// through the component's own listeners (e.g. batch end framing).
pub trait ComponentListener: Send + Sync {
    fn on_component_unload(&self, switchboard: &Switchboard, component: &Component);
}

/// Name → component table.
#[derive(Default)]
pub struct ComponentRegistry {
    loaded: DashMap<Arc<str>, Arc<Component>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new component under `name`.
    pub fn load(&self, name: &str) -> Result<Arc<Component>, RegistryError> {
        match self.loaded.entry(Arc::from(name)) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(RegistryError::AlreadyLoaded(name.to_string()))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                let component = Component::new(name);
                slot.insert(Arc::clone(&component));
                Ok(component)
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<Component>> {
        self.loaded.get(name).map(|c| Arc::clone(c.value()))
    }

    pub(crate) fn remove(&self, name: &str) -> Option<Arc<Component>> {
        self.loaded.remove(name).map(|(_, c)| c)
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.contains_key(name)
    }

    /// Names of every loaded component, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.loaded.iter().map(|e| e.key().to_string()).collect();
        names.sort();
        names
    }
}
