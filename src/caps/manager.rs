use super::capability::Capability;
use crate::error::RegistryError;
use crate::registry::{
    COMPONENT_EVENT, Component, ComponentListener, DEFAULT_PRIORITY, EventProvider,
};
use crate::state::{Connection, ConnectionTable, ExtKey};
use crate::switchboard::Switchboard;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

/// Service name the manager registers under.
pub const CAP_MANAGER_SERVICE: &str = "cap/manager";

/// Event name for [`CapListener`]s.
pub const CAP_EVENT: &str = "event/cap";

/// Capabilities registered at once; bit 63 is reserved for the protocol flag.
pub const MAX_CAPS: u8 = 63;

const CAP_BITS_MASK: u64 = (1u64 << MAX_CAPS) - 1;
const PROTOCOL_302_BIT: u64 = 1u64 << MAX_CAPS;

/// How a connection negotiated capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// Never sent `CAP LS` or `CAP REQ`.
    Unnegotiated,
    /// `CAP LS` without a version, or below 302.
    Legacy,
    /// `CAP LS 302` or later.
    V302,
}

/// Notified when a capability gains or loses its bit (feeds `CAP NEW` /
/// `CAP DEL` for cap-notify clients).
pub trait CapListener: Send + Sync {
    fn on_cap_change(&self, cap: &Capability, added: bool);
}

#[derive(Default)]
struct CapTable {
    caps: Vec<Capability>,
    used: u64,
    starved: VecDeque<Capability>,
}

/// Allocates capability bits and holds per-connection capability state.
pub struct CapManager {
    me: Weak<CapManager>,
    owner: Arc<Component>,
    ext: ExtKey,
    table: Mutex<CapTable>,
    connections: Arc<ConnectionTable>,
    events: EventProvider<dyn CapListener>,
}

impl CapManager {
    /// Create the manager for `owner` and publish it. Capabilities that were
    /// created before this point bind to it through their service watch.
    pub fn install(switchboard: &Switchboard, owner: &Arc<Component>) -> Result<Arc<Self>, RegistryError> {
        let events = switchboard.hub().provider::<dyn CapListener>(CAP_EVENT)?;
        let manager = Arc::new_cyclic(|me| Self {
            me: me.clone(),
            owner: Arc::clone(owner),
            ext: ExtKey::new("capbits", owner.id()),
            table: Mutex::new(CapTable::default()),
            connections: Arc::clone(switchboard.connections()),
            events,
        });

        switchboard.hub().subscribe::<dyn ComponentListener>(
            COMPONENT_EVENT,
            owner,
            CAP_MANAGER_SERVICE,
            DEFAULT_PRIORITY,
            Arc::clone(&manager) as Arc<dyn ComponentListener>,
        )?;
        switchboard
            .services()
            .register::<CapManager>(CAP_MANAGER_SERVICE, owner.id(), Arc::clone(&manager))?;
        Ok(manager)
    }

    #[inline]
    pub fn owner(&self) -> &Arc<Component> {
        &self.owner
    }

    #[inline]
    pub fn ext_key(&self) -> &ExtKey {
        &self.ext
    }

    /// Give `cap` the lowest free bit. With none free the capability waits
    /// until another is removed.
    pub fn add_cap(&self, cap: &Capability) {
        if cap.owner().is_dying() {
            return;
        }
        cap.slot().manager = self.me.clone();
        if !cap.is_active() {
            return;
        }

        let bit = {
            let mut table = self.table.lock();
            if table.caps.iter().chain(table.starved.iter()).any(|c| c.same(cap)) {
                return;
            }
            if table.caps.iter().any(|c| c.name() == cap.name()) {
                warn!(cap = %cap.name(), "capability name already registered");
                return;
            }

            let free = !table.used & CAP_BITS_MASK;
            let mut slot = cap.slot();
            if free == 0 {
                slot.bit = None;
                drop(slot);
                table.starved.push_back(cap.clone());
                warn!(cap = %cap.name(), "no free capability bits, capability parked");
                return;
            }

            let bit = free.trailing_zeros() as u8;
            slot.bit = Some(bit);
            drop(slot);
            table.used |= 1u64 << bit;
            table.caps.push(cap.clone());
            crate::metrics::set_capability_bits(table.caps.len());
            bit
        };

        debug!(cap = %cap.name(), bit, "capability registered");
        self.events.fire_all(|l| l.on_cap_change(cap, true));
    }

    /// Free `cap`'s bit and clear it on every connection.
    pub fn del_cap(&self, cap: &Capability) {
        let bit = {
            let mut table = self.table.lock();
            table.starved.retain(|c| !c.same(cap));
            let Some(pos) = table.caps.iter().position(|c| c.same(cap)) else {
                return;
            };
            table.caps.remove(pos);
            let bit = cap.slot().bit.take();
            if let Some(bit) = bit {
                table.used &= !(1u64 << bit);
            }
            crate::metrics::set_capability_bits(table.caps.len());
            bit
        };

        if let Some(bit) = bit {
            let mask = !(1u64 << bit);
            for conn in self.connections.all() {
                conn.ext_update(&self.ext, |bits| bits.map(|b| b & mask));
            }
        }
        debug!(cap = %cap.name(), ?bit, "capability unregistered");
        self.events.fire_all(|l| l.on_cap_change(cap, false));
        self.retry_starved();
    }

    fn retry_starved(&self) {
        let pending = self.table.lock().starved.len();
        for _ in 0..pending {
            let cap = {
                let mut table = self.table.lock();
                if !table.used & CAP_BITS_MASK == 0 {
                    return;
                }
                let Some(cap) = table.starved.pop_front() else {
                    return;
                };
                if table.caps.iter().any(|c| c.name() == cap.name()) {
                    debug!(cap = %cap.name(), "parked capability name still taken");
                    table.starved.push_back(cap);
                    continue;
                }
                cap
            };
            self.add_cap(&cap);
        }
    }

    /// A registered capability by name.
    pub fn find(&self, name: &str) -> Option<Capability> {
        self.table.lock().caps.iter().find(|c| c.name() == name).cloned()
    }

    /// Registered capabilities, sorted by name.
    pub fn capabilities(&self) -> Vec<Capability> {
        let mut caps = self.table.lock().caps.clone();
        caps.sort_by(|a, b| a.name().cmp(b.name()));
        caps
    }

    pub fn bits_in_use(&self) -> u32 {
        self.table.lock().used.count_ones()
    }

    pub fn starved_count(&self) -> usize {
        self.table.lock().starved.len()
    }

    pub fn protocol(&self, conn: &Connection) -> Protocol {
        match conn.ext_get(&self.ext) {
            None => Protocol::Unnegotiated,
            Some(bits) if bits & PROTOCOL_302_BIT != 0 => Protocol::V302,
            Some(_) => Protocol::Legacy,
        }
    }

    pub fn set_protocol(&self, conn: &Connection, protocol: Protocol) {
        match protocol {
            Protocol::Unnegotiated => {
                conn.ext_unset(&self.ext);
            }
            Protocol::Legacy => {
                conn.ext_update(&self.ext, |bits| Some(bits.unwrap_or(0) & !PROTOCOL_302_BIT));
            }
            Protocol::V302 => {
                conn.ext_update(&self.ext, |bits| Some(bits.unwrap_or(0) | PROTOCOL_302_BIT));
            }
        }
    }
}

impl ComponentListener for CapManager {
    fn on_component_unload(&self, _switchboard: &Switchboard, component: &Component) {
        if component.id() == self.owner.id() {
            // Capabilities notice on their own once this manager is gone.
            return;
        }
        let owned: Vec<Capability> = {
            let table = self.table.lock();
            table
                .caps
                .iter()
                .chain(table.starved.iter())
                .filter(|c| c.owner().id() == component.id())
                .cloned()
                .collect()
        };
        for cap in owned {
            self.del_cap(&cap);
        }
    }
}
