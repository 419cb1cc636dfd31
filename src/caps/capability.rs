use super::manager::{CAP_MANAGER_SERVICE, CapManager};
use crate::registry::Component;
use crate::state::Connection;
use crate::switchboard::Switchboard;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

pub(super) struct CapSlot {
    pub(super) manager: Weak<CapManager>,
    pub(super) bit: Option<u8>,
}

struct CapInner {
    name: String,
    owner: Arc<Component>,
    value: RwLock<Option<String>>,
    active: AtomicBool,
    slot: Mutex<CapSlot>,
}

/// A negotiable capability.
///
/// Cloning yields another handle to the same capability.
#[derive(Clone)]
pub struct Capability {
    inner: Arc<CapInner>,
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capability")
            .field("name", &self.inner.name)
            .field("owner", &self.inner.owner.name())
            .field("bit", &self.bit())
            .finish()
    }
}

impl Capability {
    /// Create an active capability owned by `owner` and bind it to the
    /// capability manager, now or whenever one is loaded.
    pub fn new(switchboard: &Switchboard, owner: &Arc<Component>, name: &str) -> Self {
        let cap = Self {
            inner: Arc::new(CapInner {
                name: name.to_string(),
                owner: Arc::clone(owner),
                value: RwLock::new(None),
                active: AtomicBool::new(true),
                slot: Mutex::new(CapSlot {
                    manager: Weak::new(),
                    bit: None,
                }),
            }),
        };

        let weak = Arc::downgrade(&cap.inner);
        switchboard
            .services()
            .watch::<CapManager, _>(CAP_MANAGER_SERVICE, owner.id(), move |manager| {
                let (Some(manager), Some(inner)) = (manager, weak.upgrade()) else {
                    return;
                };
                inner.slot.lock().manager = Arc::downgrade(&manager);
                manager.add_cap(&Capability { inner });
            });
        cap
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    #[inline]
    pub fn owner(&self) -> &Arc<Component> {
        &self.inner.owner
    }

    /// Value advertised after `=` in `CAP LS 302`.
    pub fn value(&self) -> Option<String> {
        self.inner.value.read().clone()
    }

    pub fn set_value(&self, value: Option<&str>) {
        *self.inner.value.write() = value.map(str::to_string);
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::Acquire)
    }

    /// Activate or deactivate. Deactivating frees the bit and turns the
    /// capability off for every connection.
    pub fn set_active(&self, active: bool) {
        if self.inner.active.swap(active, Ordering::AcqRel) == active {
            return;
        }
        let manager = self.inner.slot.lock().manager.upgrade();
        if let Some(manager) = manager {
            if active {
                manager.add_cap(self);
            } else {
                manager.del_cap(self);
            }
        }
    }

    /// Active, holding a bit, and attached to a live manager.
    pub fn is_registered(&self) -> bool {
        self.live_bit().is_some()
    }

    /// The allocated bit while registered.
    pub fn bit(&self) -> Option<u8> {
        self.live_bit().map(|(_, bit)| bit)
    }

    /// Whether `conn` has this capability enabled.
    pub fn get(&self, conn: &Connection) -> bool {
        match self.live_bit() {
            Some((manager, bit)) => conn
                .ext_get(manager.ext_key())
                .is_some_and(|bits| bits & (1u64 << bit) != 0),
            None => false,
        }
    }

    /// Turn this capability on or off for `conn`. No effect while
    /// unregistered.
    pub fn set(&self, conn: &Connection, enabled: bool) {
        let Some((manager, bit)) = self.live_bit() else {
            return;
        };
        conn.ext_update(manager.ext_key(), |bits| {
            let bits = bits.unwrap_or(0);
            Some(if enabled {
                bits | 1u64 << bit
            } else {
                bits & !(1u64 << bit)
            })
        });
    }

    pub(super) fn same(&self, other: &Capability) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(super) fn slot(&self) -> parking_lot::MutexGuard<'_, CapSlot> {
        self.inner.slot.lock()
    }

    fn live_bit(&self) -> Option<(Arc<CapManager>, u8)> {
        if !self.is_active() {
            return None;
        }
        let slot = self.inner.slot.lock();
        let bit = slot.bit?;
        let manager = slot.manager.upgrade()?;
        if manager.owner().is_dying() {
            return None;
        }
        Some((manager, bit))
    }
}
