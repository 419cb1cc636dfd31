use super::{Batch, Running};
use crate::caps::Capability;
use crate::error::RegistryError;
use crate::event::{Event, EventHook, Recipient};
use crate::message::{Message, MessageSource, TagData};
use crate::registry::{
    COMPONENT_EVENT, Component, ComponentListener, DEFAULT_PRIORITY, EventProvider,
};
use crate::state::{Connection, ExtKey};
use crate::switchboard::{CONNECTION_EVENT, ConnectionListener, Switchboard};
use crate::tags::{TAG_PROVIDER_EVENT, TagProvider, TagProviderRef};
use parking_lot::Mutex;
use std::sync::{Arc, OnceLock, Weak};
use tracing::{debug, warn};

/// Service name the manager registers under.
pub const BATCH_MANAGER_SERVICE: &str = "batch/manager";

/// Event provider for the `BATCH` framing lines.
pub const BATCH_EVENT: &str = "event/BATCH";

/// Batches running at once. Ids are bit positions in a `u64`.
pub const MAX_BATCHES: u32 = 63;

/// Assigns batch ids and tracks which connections have seen which batch
/// start.
pub struct BatchManager {
    owner: Arc<Component>,
    server_name: Arc<str>,
    cap: Capability,
    ext: ExtKey,
    active: Mutex<Vec<Batch>>,
    tag_provider: OnceLock<TagProviderRef>,
    event: EventProvider<dyn EventHook>,
}

impl BatchManager {
    pub fn install(switchboard: &Switchboard, owner: &Arc<Component>) -> Result<Arc<Self>, RegistryError> {
        let hub = switchboard.hub();
        let manager = Arc::new(Self {
            owner: Arc::clone(owner),
            server_name: Arc::from(switchboard.server_name()),
            cap: Capability::new(switchboard, owner, "batch"),
            ext: ExtKey::new("batchbits", owner.id()),
            active: Mutex::new(Vec::new()),
            tag_provider: OnceLock::new(),
            event: hub.provider::<dyn EventHook>(BATCH_EVENT)?,
        });

        let provider = hub.subscribe::<dyn TagProvider>(
            TAG_PROVIDER_EVENT,
            owner,
            "batch",
            DEFAULT_PRIORITY,
            Arc::new(BatchTagProvider {
                manager: Arc::downgrade(&manager),
            }) as Arc<dyn TagProvider>,
        )?;
        let _ = manager.tag_provider.set(provider);

        hub.subscribe::<dyn ConnectionListener>(
            CONNECTION_EVENT,
            owner,
            BATCH_MANAGER_SERVICE,
            DEFAULT_PRIORITY,
            Arc::clone(&manager) as Arc<dyn ConnectionListener>,
        )?;
        hub.subscribe::<dyn ComponentListener>(
            COMPONENT_EVENT,
            owner,
            BATCH_MANAGER_SERVICE,
            DEFAULT_PRIORITY,
            Arc::clone(&manager) as Arc<dyn ComponentListener>,
        )?;
        switchboard
            .services()
            .register::<BatchManager>(BATCH_MANAGER_SERVICE, owner.id(), Arc::clone(&manager))?;
        Ok(manager)
    }

    /// The `batch` capability.
    pub fn capability(&self) -> &Capability {
        &self.cap
    }

    pub fn running_count(&self) -> usize {
        self.active.lock().len()
    }

    /// Start `batch`. Does nothing if the `batch` capability is not
    /// registered, the batch is already running, or no id is free; check
    /// [`Batch::is_running`] afterwards.
    pub fn start(&self, batch: &Batch) {
        if !self.cap.is_registered() {
            debug!(kind = %batch.kind(), "batch capability not registered, batch not started");
            return;
        }
        let Some(tag_provider) = self.tag_provider.get().cloned() else {
            return;
        };

        let mut active = self.active.lock();
        if batch.is_running() {
            return;
        }
        let id = active
            .iter()
            .filter_map(Batch::id)
            .max()
            .map_or(0, |highest| highest + 1);
        if id >= MAX_BATCHES {
            debug!(kind = %batch.kind(), "no free batch id, batch not started");
            return;
        }

        let reference: Arc<str> = Arc::from(slirc_wire::batch_reference(id));
        let source = MessageSource::literal(&self.server_name);

        let mut start = Message::with_source(source.clone(), "BATCH")
            .param(format!("+{reference}"))
            .param(batch.kind());
        for param in batch.params() {
            start.push_param(param.as_str());
        }
        let end = Message::with_source(source, "BATCH").param(format!("-{reference}"));

        *batch.state() = Some(Running {
            id,
            reference: Arc::clone(&reference),
            start: Arc::new(Mutex::new(Event::new(self.event.clone(), start))),
            end: Arc::new(Mutex::new(Event::new(self.event.clone(), end))),
            recipients: Vec::new(),
            tag_provider,
        });
        active.push(batch.clone());
        crate::metrics::set_running_batches(active.len());
        debug!(kind = %batch.kind(), id, reference = %reference, "batch started");
    }

    /// End `batch`: send `BATCH -ref` to every connection that was sent the
    /// start line, clear their bit and free the id.
    pub fn end(&self, switchboard: &Switchboard, batch: &Batch) {
        let running = {
            let mut active = self.active.lock();
            let Some(pos) = active.iter().position(|b| b.same(batch)) else {
                return;
            };
            active.remove(pos);
            crate::metrics::set_running_batches(active.len());
            batch.state().take()
        };
        let Some(running) = running else {
            return;
        };

        let bit = 1u64 << running.id;
        let mut end = running.end.lock();
        for conn in &running.recipients {
            conn.ext_update(&self.ext, |bits| bits.map(|b| b & !bit).filter(|b| *b != 0));
            if let Err(e) = switchboard.send(conn, &mut end) {
                debug!(conn = %conn.id(), error = %e, "batch end not delivered");
            }
        }
        debug!(
            kind = %batch.kind(),
            reference = %running.reference,
            recipients = running.recipients.len(),
            "batch ended"
        );
    }

    /// Called while selecting tags for `recipient`: the first time, sends
    /// the start line and remembers the connection. False if the batch is no
    /// longer running.
    fn ensure_started(&self, recipient: &Recipient<'_>, batch: &Batch) -> bool {
        let conn = recipient.conn();
        let start = {
            let mut state = batch.state();
            let Some(running) = state.as_mut() else {
                return false;
            };
            let bit = 1u64 << running.id;
            let mut first = false;
            conn.ext_update(&self.ext, |bits| {
                let bits = bits.unwrap_or(0);
                first = bits & bit == 0;
                Some(bits | bit)
            });
            if !first {
                return true;
            }
            running.recipients.push(Arc::clone(conn));
            Arc::clone(&running.start)
        };

        let mut start = start.lock();
        if let Err(e) = recipient.send(&mut start) {
            warn!(conn = %conn.id(), error = %e, "batch start not delivered");
        }
        true
    }
}

impl ConnectionListener for BatchManager {
    fn on_disconnect(&self, _switchboard: &Switchboard, conn: &Arc<Connection>) {
        let active = self.active.lock().clone();
        for batch in active {
            if let Some(running) = batch.state().as_mut() {
                running.recipients.retain(|c| c.id() != conn.id());
            }
        }
    }
}

impl ComponentListener for BatchManager {
    fn on_component_unload(&self, switchboard: &Switchboard, component: &Component) {
        if component.id() != self.owner.id() {
            return;
        }
        let active = self.active.lock().clone();
        for batch in active {
            self.end(switchboard, &batch);
        }
    }
}

/// Shows the `batch` tag to clients with the capability, sending each the
/// start line on first sight.
struct BatchTagProvider {
    manager: Weak<BatchManager>,
}

impl TagProvider for BatchTagProvider {
    fn should_send_tag(&self, recipient: &Recipient<'_>, tag: &TagData) -> bool {
        let Some(manager) = self.manager.upgrade() else {
            return false;
        };
        if !manager.cap.get(recipient.conn()) {
            return false;
        }
        match tag.context_as::<Batch>() {
            Some(batch) => manager.ensure_started(recipient, batch),
            None => false,
        }
    }
}
