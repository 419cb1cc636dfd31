//! Connection state.
//!
//! Contains the connection table and the per-connection extension storage
//! that capability and batch bitmasks live in.

mod connection;
mod dashmap_ext;
mod table;

pub use connection::{ConnId, Connection, ExtKey};
pub use dashmap_ext::DashMapExt;
pub use table::ConnectionTable;
