//! Installs the built-in components.

use crate::batch::BatchManager;
use crate::caps::CapManager;
use crate::error::RegistryError;
use crate::serialize::RfcSerializer;
use crate::switchboard::Switchboard;
use crate::tags::{ClientTags, ServerTimeTags};

/// Component names used by [`load_core`].
pub const CORE_SERIALIZER: &str = "core_serializer";
pub const CORE_CAP: &str = "core_cap";
pub const CORE_BATCH: &str = "core_batch";
pub const CORE_SERVER_TIME: &str = "core_servertime";
pub const CORE_MESSAGE_TAGS: &str = "core_messagetags";

/// Load the RFC serializer, the capability manager, the batch manager and
/// the `server-time` / `message-tags` providers, each as its own component
/// so any of them can be unloaded and reloaded independently.
pub fn load_core(switchboard: &Switchboard) -> Result<(), RegistryError> {
    let component = switchboard.load_component(CORE_SERIALIZER)?;
    RfcSerializer::install(switchboard, &component)?;

    let component = switchboard.load_component(CORE_CAP)?;
    CapManager::install(switchboard, &component)?;

    let component = switchboard.load_component(CORE_BATCH)?;
    BatchManager::install(switchboard, &component)?;

    let component = switchboard.load_component(CORE_SERVER_TIME)?;
    ServerTimeTags::install(switchboard, &component)?;

    let component = switchboard.load_component(CORE_MESSAGE_TAGS)?;
    ClientTags::install(switchboard, &component)?;

    Ok(())
}
