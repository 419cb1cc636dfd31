//! Component lifecycle, event subscriber lists and the service locator.
//!
//! - [`component`]: named loadable units with a dying flag
//! - [`events`]: priority-ordered subscriber lists and typed providers
//! - [`services`]: string-keyed services with late-binding watchers

pub mod component;
pub mod events;
pub mod services;

pub use component::{COMPONENT_EVENT, Component, ComponentId, ComponentListener, ComponentRegistry};
pub use events::{
    DEFAULT_PRIORITY, Decision, EventHub, EventProvider, Listener, Priority, SubscriberList,
};
pub use services::ServiceRegistry;
