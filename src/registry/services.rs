//! String-keyed service locator with late binding.
//!
//! Capabilities find their manager and tag providers find the batch manager
//! through here. A component that needs a service it does not own registers
//! a watcher instead of holding a reference, so the service can be unloaded
//! and reloaded underneath it.

use super::component::ComponentId;
use crate::error::RegistryError;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::any::Any;
use std::sync::Arc;

type AnyService = Arc<dyn Any + Send + Sync>;
type WatchFn = Arc<dyn Fn(Option<&AnyService>) + Send + Sync>;

struct ServiceEntry {
    owner: ComponentId,
    /// Always an `Arc<Arc<T>>` erased, so unsized `T` round-trips.
    value: AnyService,
}

struct Watcher {
    name: Arc<str>,
    owner: ComponentId,
    callback: WatchFn,
}

#[derive(Default)]
pub struct ServiceRegistry {
    services: DashMap<Arc<str>, ServiceEntry>,
    watchers: Mutex<Vec<Watcher>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `service` under `name`. Watchers of `name` are told.
    pub fn register<T>(&self, name: &str, owner: ComponentId, service: Arc<T>) -> Result<(), RegistryError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let value: AnyService = Arc::new(service);
        match self.services.entry(Arc::from(name)) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(RegistryError::ServiceExists(name.to_string()));
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(ServiceEntry {
                    owner,
                    value: Arc::clone(&value),
                });
            }
        }
        tracing::debug!(service = %name, owner = %owner, "service registered");
        self.notify(name, Some(&value));
        Ok(())
    }

    pub fn get<T>(&self, name: &str) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let value = self.services.get(name).map(|e| Arc::clone(&e.value))?;
        value.downcast_ref::<Arc<T>>().cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }

    /// Withdraw `name`. Watchers are told with `None`.
    pub fn unregister(&self, name: &str) -> bool {
        if self.services.remove(name).is_none() {
            return false;
        }
        tracing::debug!(service = %name, "service unregistered");
        self.notify(name, None);
        true
    }

    /// Call `callback` now if `name` is present, and again on every later
    /// register (`Some`) or unregister (`None`). The watch is dropped when
    /// `owner` unloads.
    pub fn watch<T, F>(&self, name: &str, owner: ComponentId, callback: F)
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(Option<Arc<T>>) + Send + Sync + 'static,
    {
        let callback: WatchFn = Arc::new(move |value: Option<&AnyService>| match value {
            Some(value) => match value.downcast_ref::<Arc<T>>() {
                Some(service) => callback(Some(Arc::clone(service))),
                None => tracing::warn!("watched service has an unexpected type"),
            },
            None => callback(None),
        });

        self.watchers.lock().push(Watcher {
            name: Arc::from(name),
            owner,
            callback: Arc::clone(&callback),
        });

        let current = self.services.get(name).map(|e| Arc::clone(&e.value));
        if let Some(current) = current {
            callback(Some(&current));
        }
    }

    /// Drop `owner`'s watchers, then withdraw its services (telling the
    /// remaining watchers). Returns how many services were withdrawn.
    pub fn remove_owner(&self, owner: ComponentId) -> usize {
        self.watchers.lock().retain(|w| w.owner != owner);

        let owned: Vec<Arc<str>> = self
            .services
            .iter()
            .filter(|e| e.value().owner == owner)
            .map(|e| Arc::clone(e.key()))
            .collect();
        owned.iter().filter(|name| self.unregister(name)).count()
    }

    fn notify(&self, name: &str, value: Option<&AnyService>) {
        // Callbacks may re-enter the registry, so run them unlocked.
        let callbacks: Vec<WatchFn> = self
            .watchers
            .lock()
            .iter()
            .filter(|w| &*w.name == name)
            .map(|w| Arc::clone(&w.callback))
            .collect();
        for callback in callbacks {
            callback(value);
        }
    }
}
