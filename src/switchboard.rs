//! The switchboard: explicit context threaded through the delivery pipeline.
//!
//! Owns the component registry, the event hub, the service registry and the
//! connection table, and implements per-recipient delivery.

use crate::config::{Config, LimitsConfig};
use crate::error::{DeliveryError, RegistryError};
use crate::event::{Event, EventHook, Recipient};
use crate::registry::{
    COMPONENT_EVENT, Component, ComponentId, ComponentListener, ComponentRegistry, EventHub, EventProvider,
    ServiceRegistry,
};
use crate::serialize::{RFC_SERIALIZER_SERVICE, Serializer, serialize_for};
use crate::state::{ConnId, Connection, ConnectionTable};
use crate::tags::{TAG_PROVIDER_EVENT, TagArbiter, TagProvider};
use crate::telemetry::spans;
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Owner of the switchboard's own watches. Component ids start at 1.
const SWITCHBOARD_OWNER: ComponentId = ComponentId(0);

/// Event name for [`ConnectionListener`]s.
pub const CONNECTION_EVENT: &str = "event/connection";

/// Notified about connection lifecycle.
pub trait ConnectionListener: Send + Sync {
    /// The connection is leaving; it is still in the table.
    fn on_disconnect(&self, switchboard: &Switchboard, conn: &Arc<Connection>);
}

/// Outcome of a fan-out.
#[derive(Debug, Default)]
pub struct DeliveryReport {
    /// Recipients that received at least one line.
    pub delivered: usize,
    /// Total lines queued.
    pub lines: usize,
    /// Per-recipient failures; the others were unaffected.
    pub failures: Vec<(ConnId, DeliveryError)>,
}

pub struct Switchboard {
    server_name: String,
    limits: LimitsConfig,
    components: ComponentRegistry,
    hub: EventHub,
    services: ServiceRegistry,
    connections: Arc<ConnectionTable>,
    arbiter: TagArbiter,
}

impl Switchboard {
    pub fn new(config: &Config) -> Result<Self, RegistryError> {
        let hub = EventHub::new();
        let arbiter = TagArbiter::new(hub.provider::<dyn TagProvider>(TAG_PROVIDER_EVENT)?);
        let switchboard = Self {
            server_name: config.server.name.clone(),
            limits: config.limits.clone(),
            components: ComponentRegistry::new(),
            hub,
            services: ServiceRegistry::new(),
            connections: Arc::new(ConnectionTable::new(config.limits.sendq_messages)),
            arbiter,
        };

        // A reloaded serializer goes back to connections left without one.
        let connections = Arc::clone(&switchboard.connections);
        switchboard.services.watch::<dyn Serializer, _>(
            RFC_SERIALIZER_SERVICE,
            SWITCHBOARD_OWNER,
            move |serializer| {
                let Some(serializer) = serializer else {
                    return;
                };
                let mut attached = 0usize;
                for conn in connections.all() {
                    if conn.serializer().is_none() {
                        conn.set_serializer(Some(Arc::clone(&serializer)));
                        attached += 1;
                    }
                }
                if attached > 0 {
                    debug!(attached, "serializer attached to waiting connections");
                }
            },
        );
        Ok(switchboard)
    }

    #[inline]
    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    #[inline]
    pub fn limits(&self) -> &LimitsConfig {
        &self.limits
    }

    #[inline]
    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    #[inline]
    pub fn hub(&self) -> &EventHub {
        &self.hub
    }

    #[inline]
    pub fn services(&self) -> &ServiceRegistry {
        &self.services
    }

    #[inline]
    pub fn connections(&self) -> &Arc<ConnectionTable> {
        &self.connections
    }

    #[inline]
    pub fn arbiter(&self) -> &TagArbiter {
        &self.arbiter
    }

    /// Hook provider for events named `name`.
    pub fn event_provider(&self, name: &str) -> Result<EventProvider<dyn EventHook>, RegistryError> {
        self.hub.provider::<dyn EventHook>(name)
    }

    /// Convenience: an event named `name` carrying `message`.
    pub fn event(&self, name: &str, message: crate::message::Message) -> Result<Event, RegistryError> {
        Ok(Event::new(self.event_provider(name)?, message))
    }

    // === Components ===

    pub fn load_component(&self, name: &str) -> Result<Arc<Component>, RegistryError> {
        let _span = spans::component("load", name).entered();
        let component = self.components.load(name)?;
        info!(component = %name, id = %component.id(), "component loaded");
        Ok(component)
    }

    /// Unload `name`: listeners are told first, then the component is marked
    /// dying and everything it owns is removed.
    pub fn unload_component(&self, name: &str) -> Result<(), RegistryError> {
        let _span = spans::component("unload", name).entered();
        let component = self
            .components
            .get(name)
            .ok_or_else(|| RegistryError::NotLoaded(name.to_string()))?;
        if component.is_dying() {
            return Err(RegistryError::Dying(name.to_string()));
        }

        self.hub
            .provider::<dyn ComponentListener>(COMPONENT_EVENT)?
            .fire_all(|l| l.on_component_unload(self, &component));

        component.mark_dying();
        let listeners = self.hub.remove_owner(component.id());
        let services = self.services.remove_owner(component.id());
        let ext = self.connections.purge_owner(component.id());
        self.components.remove(name);

        info!(
            component = %name,
            listeners,
            services,
            ext_values = ext,
            "component unloaded"
        );
        Ok(())
    }

    // === Connections ===

    /// Register a connection and give it the default serializer if one is
    /// loaded. The receiver feeds the connection's writer task.
    pub fn connect(&self, nick: &str, user: &str, host: &str) -> (Arc<Connection>, mpsc::Receiver<Bytes>) {
        let (conn, rx) = self.connections.create(nick, user, host);
        conn.set_serializer(self.services.get::<dyn Serializer>(RFC_SERIALIZER_SERVICE));
        debug!(conn = %conn.id(), mask = %conn.mask(), "connection registered");
        (conn, rx)
    }

    /// Tell [`ConnectionListener`]s, then drop the connection.
    pub fn disconnect(&self, id: ConnId) -> Option<Arc<Connection>> {
        let conn = self.connections.get(id)?;
        match self.hub.provider::<dyn ConnectionListener>(CONNECTION_EVENT) {
            Ok(listeners) => listeners.fire_all(|l| l.on_disconnect(self, &conn)),
            Err(e) => tracing::error!(error = %e, "connection listeners unavailable"),
        }
        self.connections.remove(id);
        debug!(conn = %id, "connection removed");
        Some(conn)
    }

    // === Delivery ===

    /// Deliver `event` to one connection. Returns the number of lines
    /// queued; zero when a hook denied delivery or every message was a side
    /// effect of this connection.
    pub fn send(&self, conn: &Arc<Connection>, event: &mut Event) -> Result<usize, DeliveryError> {
        let _span = spans::delivery(event.name(), conn.id().0).entered();
        event.ensure_initialized();

        let serializer = conn
            .serializer()
            .ok_or(DeliveryError::NoSerializer(conn.id()))?;
        let recipient = Recipient::new(self, conn);
        let Some(messages) = event.messages_for(&recipient)? else {
            crate::metrics::record_vetoed();
            return Ok(0);
        };

        let mut sent = 0;
        for shared in &messages {
            let line = {
                let mut message = shared.lock();
                if message.is_side_effect() && message.source().origin_id() == Some(conn.id()) {
                    continue;
                }
                serialize_for(serializer.as_ref(), &self.arbiter, &recipient, &mut message)
            };
            conn.write(line)?;
            sent += 1;
        }
        crate::metrics::record_lines_sent(sent);
        Ok(sent)
    }

    /// Deliver `event` to each of `recipients`. One recipient's failure does
    /// not affect the rest.
    pub fn broadcast(&self, recipients: &[Arc<Connection>], event: &mut Event) -> DeliveryReport {
        let _span = spans::broadcast(event.name(), recipients.len()).entered();
        let mut report = DeliveryReport::default();
        for conn in recipients {
            match self.send(conn, event) {
                Ok(0) => {}
                Ok(lines) => {
                    report.delivered += 1;
                    report.lines += lines;
                }
                Err(e) => {
                    debug!(conn = %conn.id(), error = %e, "delivery failed");
                    crate::metrics::record_delivery_error(e.error_code());
                    report.failures.push((conn.id(), e));
                }
            }
        }
        report
    }
}
