//! Message composition and per-recipient delivery for an IRC server.
//!
//! One occurrence becomes an [`event::Event`] holding one or more
//! [`message::Message`]s. For each recipient the event's hook chain may
//! rewrite or veto the messages, tag providers decide which tags the
//! recipient sees (emitting batch framing on the way), and the recipient's
//! serializer turns the result into bytes, cached per
//! `(serializer, tag selection)`.
//!
//! ```no_run
//! use slircd_switchboard::{bootstrap, config::Config, message::Message, switchboard::Switchboard};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let switchboard = Switchboard::new(&Config::default())?;
//! bootstrap::load_core(&switchboard)?;
//!
//! let (alice, _rx) = switchboard.connect("alice", "a", "example.net");
//! let mut event = switchboard.event("event/PING", Message::new("PING").param("tok"))?;
//! switchboard.send(&alice, &mut event)?;
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod bootstrap;
pub mod caps;
pub mod config;
pub mod error;
pub mod event;
pub mod message;
pub mod metrics;
pub mod registry;
pub mod serialize;
pub mod state;
pub mod switchboard;
pub mod tags;
pub mod telemetry;

pub use error::{DeliveryError, RegistryError};
pub use switchboard::{DeliveryReport, Switchboard};
