//! Client capability negotiation.
//!
//! Each active capability holds one bit out of 63 in the manager's table.
//! Per-connection state is a single `u64` extension value on the connection:
//! bits 0..=62 are capabilities, bit 63 records that the client negotiated
//! with `CAP LS 302`. A connection with no value at all has not negotiated.
//!
//! # Architecture
//!
//! 1. **[`Capability`]** - a named feature owned by some component. It finds
//!    the manager through the service registry and re-binds if the manager
//!    is reloaded.
//!
//! 2. **[`CapManager`]** - the bit allocator. Registered under
//!    [`CAP_MANAGER_SERVICE`].
//!
//! 3. **negotiation** - `CAP LS` / `CAP REQ` helpers on the manager.

mod capability;
mod manager;
mod negotiation;

pub use capability::Capability;
pub use manager::{CAP_EVENT, CAP_MANAGER_SERVICE, CapListener, CapManager, MAX_CAPS, Protocol};
pub use negotiation::{CapReply, parse_request};
