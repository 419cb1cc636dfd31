//! Test client.
//!
//! Wraps a connection and the receiving end of its outbound queue.

use bytes::Bytes;
use slircd_switchboard::state::Connection;
use std::ops::Deref;
use std::sync::Arc;
use tokio::sync::mpsc;

/// A test client.
pub struct TestClient {
    pub conn: Arc<Connection>,
    rx: mpsc::Receiver<Bytes>,
}

impl TestClient {
    pub fn new(conn: Arc<Connection>, rx: mpsc::Receiver<Bytes>) -> Self {
        Self { conn, rx }
    }

    /// Everything queued so far, one string per line without CRLF.
    pub fn drain(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(line) = self.rx.try_recv() {
            assert!(line.ends_with(b"\r\n"), "line missing CRLF: {line:?}");
            let text = String::from_utf8(line.to_vec()).expect("utf-8 line");
            lines.push(text.trim_end_matches("\r\n").to_string());
        }
        lines
    }

    /// Raw bytes of everything queued so far.
    #[allow(dead_code)]
    pub fn drain_raw(&mut self) -> Vec<Bytes> {
        let mut lines = Vec::new();
        while let Ok(line) = self.rx.try_recv() {
            lines.push(line);
        }
        lines
    }
}

impl Deref for TestClient {
    type Target = Arc<Connection>;

    fn deref(&self) -> &Arc<Connection> {
        &self.conn
    }
}
