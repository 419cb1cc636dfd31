//! Wire and queue limits configuration.

use serde::Deserialize;

/// Limits read by the serializer and the outbound queues.
///
/// These are read-only inputs to the delivery path; nothing in the
/// switchboard adjusts them at runtime.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Maximum length of the untagged part of a line, CRLF included
    /// (default: 512).
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,
    /// Maximum length of a tag section accepted from a client, excluding the
    /// leading `@` and trailing space (default: 4094).
    #[serde(default = "default_max_client_tags_length")]
    pub max_client_tags_length: usize,
    /// Maximum length of a tag section the server emits (default: 8191).
    /// Tags that would overflow it are left off the line.
    #[serde(default = "default_max_server_tags_length")]
    pub max_server_tags_length: usize,
    /// Outbound queue capacity per connection, in lines (default: 512).
    /// A full queue marks the connection SendQ-exceeded.
    #[serde(default = "default_sendq_messages")]
    pub sendq_messages: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_line_length: default_max_line_length(),
            max_client_tags_length: default_max_client_tags_length(),
            max_server_tags_length: default_max_server_tags_length(),
            sendq_messages: default_sendq_messages(),
        }
    }
}

fn default_max_line_length() -> usize {
    slirc_wire::DEFAULT_LINE_LENGTH
}

fn default_max_client_tags_length() -> usize {
    slirc_wire::MAX_CLIENT_TAGS_LENGTH
}

fn default_max_server_tags_length() -> usize {
    slirc_wire::MAX_SERVER_TAGS_LENGTH
}

fn default_sendq_messages() -> usize {
    512
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values_are_correct() {
        let limits = LimitsConfig::default();
        assert_eq!(limits.max_line_length, 512);
        assert_eq!(limits.max_client_tags_length, 4094);
        assert_eq!(limits.max_server_tags_length, 8191);
        assert_eq!(limits.sendq_messages, 512);
    }

    #[test]
    fn test_partial_section_fills_defaults() {
        let limits: LimitsConfig = toml::from_str("max_line_length = 1024").unwrap();
        assert_eq!(limits.max_line_length, 1024);
        assert_eq!(limits.sendq_messages, 512);
    }
}
