//! CAP LS / REQ helpers.

use super::capability::Capability;
use super::manager::{CapManager, Protocol};
use crate::state::Connection;

/// Outcome of a `CAP REQ`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapReply {
    /// Every change was applied; carries the normalized request.
    Ack(String),
    /// Nothing was applied; carries the request as received.
    Nak(String),
}

/// Split a `CAP REQ` argument into `(enable, name)` pairs. A leading `-`
/// disables; any `=value` suffix is ignored.
pub fn parse_request(requested: &str) -> Vec<(bool, &str)> {
    requested
        .split_whitespace()
        .map(|token| {
            let (enable, name) = match token.strip_prefix('-') {
                Some(name) => (false, name),
                None => (true, token),
            };
            (enable, name.split('=').next().unwrap_or(name))
        })
        .collect()
}

impl CapManager {
    /// Capabilities to advertise for `CAP LS [version]`, sorted. Records the
    /// protocol the client used; values are only shown to 302 clients.
    pub fn ls(&self, conn: &Connection, version: Option<u32>) -> Vec<String> {
        if version.is_some_and(|v| v >= 302) {
            self.set_protocol(conn, Protocol::V302);
        } else if self.protocol(conn) == Protocol::Unnegotiated {
            self.set_protocol(conn, Protocol::Legacy);
        }

        let show_values = self.protocol(conn) == Protocol::V302;
        self.capabilities()
            .iter()
            .map(|cap| match cap.value() {
                Some(value) if show_values && !value.is_empty() => {
                    format!("{}={}", cap.name(), value)
                }
                _ => cap.name().to_string(),
            })
            .collect()
    }

    /// Apply a `CAP REQ`. All-or-nothing: any unknown name NAKs the whole
    /// request and changes nothing.
    pub fn request(&self, conn: &Connection, requested: &str) -> CapReply {
        let changes = parse_request(requested);
        if changes.is_empty() {
            return CapReply::Nak(requested.trim().to_string());
        }

        let mut resolved: Vec<(bool, Capability)> = Vec::with_capacity(changes.len());
        for (enable, name) in &changes {
            match self.find(name) {
                Some(cap) if cap.is_registered() => resolved.push((*enable, cap)),
                _ => return CapReply::Nak(requested.trim().to_string()),
            }
        }

        if self.protocol(conn) == Protocol::Unnegotiated {
            self.set_protocol(conn, Protocol::Legacy);
        }
        for (enable, cap) in &resolved {
            cap.set(conn, *enable);
        }

        let normalized: Vec<String> = changes
            .iter()
            .map(|(enable, name)| {
                if *enable {
                    (*name).to_string()
                } else {
                    format!("-{name}")
                }
            })
            .collect();
        CapReply::Ack(normalized.join(" "))
    }

    /// Names of the capabilities `conn` has enabled, sorted.
    pub fn enabled(&self, conn: &Connection) -> Vec<String> {
        self.capabilities()
            .iter()
            .filter(|cap| cap.get(conn))
            .map(|cap| cap.name().to_string())
            .collect()
    }
}
