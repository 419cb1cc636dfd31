//! IRCv3 batches.
//!
//! A [`Batch`] is created stopped, started through the [`BatchManager`]
//! (which assigns its id and reference tag), filled with messages via
//! [`Batch::add_to_batch`], and ended. Framing is lazy: a recipient only
//! receives `BATCH +ref` right before the first batched message it is shown,
//! and only those recipients receive `BATCH -ref`.

mod manager;

pub use manager::{BATCH_EVENT, BATCH_MANAGER_SERVICE, BatchManager, MAX_BATCHES};

use crate::event::Event;
use crate::message::{Message, TagContext};
use crate::state::Connection;
use crate::tags::TagProviderRef;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

pub(crate) struct Running {
    pub(crate) id: u32,
    pub(crate) reference: Arc<str>,
    pub(crate) start: Arc<Mutex<Event>>,
    pub(crate) end: Arc<Mutex<Event>>,
    pub(crate) recipients: Vec<Arc<Connection>>,
    pub(crate) tag_provider: TagProviderRef,
}

struct BatchShared {
    kind: String,
    params: Vec<String>,
    state: Mutex<Option<Running>>,
}

/// A batch of messages. Cloning yields another handle to the same batch.
#[derive(Clone)]
pub struct Batch {
    shared: Arc<BatchShared>,
}

impl fmt::Debug for Batch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Batch")
            .field("kind", &self.shared.kind)
            .field("reference", &self.reference())
            .finish()
    }
}

impl Batch {
    /// A stopped batch of type `kind` (e.g. `netjoin`, `chathistory`) with
    /// extra parameters for the start line.
    pub fn new(kind: &str, params: &[&str]) -> Self {
        Self {
            shared: Arc::new(BatchShared {
                kind: kind.to_string(),
                params: params.iter().map(|p| p.to_string()).collect(),
                state: Mutex::new(None),
            }),
        }
    }

    pub fn kind(&self) -> &str {
        &self.shared.kind
    }

    pub fn params(&self) -> &[String] {
        &self.shared.params
    }

    pub fn is_running(&self) -> bool {
        self.shared.state.lock().is_some()
    }

    pub fn id(&self) -> Option<u32> {
        self.shared.state.lock().as_ref().map(|r| r.id)
    }

    /// The reference tag while running.
    pub fn reference(&self) -> Option<Arc<str>> {
        self.shared.state.lock().as_ref().map(|r| Arc::clone(&r.reference))
    }

    /// Recipients that have been sent the start line so far.
    pub fn recipient_count(&self) -> usize {
        self.shared.state.lock().as_ref().map_or(0, |r| r.recipients.len())
    }

    /// Tag `message` as part of this batch. False if the batch is not
    /// running or the message already belongs to a batch.
    pub fn add_to_batch(&self, message: &mut Message) -> bool {
        let state = self.shared.state.lock();
        let Some(running) = state.as_ref() else {
            return false;
        };
        let context: TagContext = Arc::new(self.clone());
        message
            .add_tag(
                "batch",
                &running.tag_provider,
                running.reference.to_string(),
                Some(context),
            )
            .is_some()
    }

    /// Make this batch a child of `parent`: both framing lines carry the
    /// parent's batch tag. Both batches must be running.
    pub fn nest_in(&self, parent: &Batch) -> bool {
        let framing = {
            let state = self.shared.state.lock();
            state
                .as_ref()
                .map(|r| (Arc::clone(&r.start), Arc::clone(&r.end)))
        };
        let Some((start, end)) = framing else {
            return false;
        };
        if !parent.is_running() || parent.same(self) {
            return false;
        }

        let mut nested = true;
        for event in [start, end] {
            let event = event.lock();
            for message in event.messages() {
                nested &= parent.add_to_batch(&mut message.lock());
            }
        }
        nested
    }

    pub(crate) fn same(&self, other: &Batch) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    pub(crate) fn state(&self) -> parking_lot::MutexGuard<'_, Option<Running>> {
        self.shared.state.lock()
    }
}
