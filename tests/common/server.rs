//! In-process switchboard for integration testing.

use super::client::TestClient;
use slircd_switchboard::batch::{BATCH_MANAGER_SERVICE, BatchManager};
use slircd_switchboard::bootstrap;
use slircd_switchboard::caps::{CAP_MANAGER_SERVICE, CapManager, CapReply};
use slircd_switchboard::config::Config;
use slircd_switchboard::event::Event;
use slircd_switchboard::message::Message;
use slircd_switchboard::registry::Component;
use slircd_switchboard::Switchboard;
use std::ops::Deref;
use std::sync::Arc;

pub const SERVER_NAME: &str = "irc.test";

/// A test switchboard.
pub struct TestServer {
    switchboard: Switchboard,
}

#[allow(dead_code)]
impl TestServer {
    /// Switchboard with every core component loaded.
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: Config) -> Self {
        let server = Self::bare_with_config(config);
        bootstrap::load_core(&server).expect("core components load");
        server
    }

    /// Switchboard with nothing loaded.
    pub fn bare() -> Self {
        Self::bare_with_config(test_config())
    }

    fn bare_with_config(config: Config) -> Self {
        Self {
            switchboard: Switchboard::new(&config).expect("switchboard"),
        }
    }

    pub fn client(&self, nick: &str) -> TestClient {
        let (conn, rx) = self.connect(nick, nick, "test.host");
        TestClient::new(conn, rx)
    }

    /// Client with `caps` requested (panics on NAK).
    pub fn client_with(&self, nick: &str, caps: &str) -> TestClient {
        let client = self.client(nick);
        match self.caps().request(&client, caps) {
            CapReply::Ack(_) => client,
            CapReply::Nak(nak) => panic!("CAP REQ {caps} refused: {nak}"),
        }
    }

    pub fn caps(&self) -> Arc<CapManager> {
        self.services()
            .get::<CapManager>(CAP_MANAGER_SERVICE)
            .expect("cap manager loaded")
    }

    pub fn batches(&self) -> Arc<BatchManager> {
        self.services()
            .get::<BatchManager>(BATCH_MANAGER_SERVICE)
            .expect("batch manager loaded")
    }

    pub fn component(&self, name: &str) -> Arc<Component> {
        self.load_component(name).expect("component loads")
    }

    pub fn make_event(&self, name: &str, message: Message) -> Event {
        self.event(name, message).expect("event provider")
    }
}

impl Deref for TestServer {
    type Target = Switchboard;

    fn deref(&self) -> &Switchboard {
        &self.switchboard
    }
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.server.name = SERVER_NAME.to_string();
    config
}
