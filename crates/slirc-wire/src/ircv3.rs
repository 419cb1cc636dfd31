//! IRCv3 helpers: server-time stamps and batch reference tags.

use chrono::{SecondsFormat, Utc};

/// Current time as an IRCv3 server-time value, e.g. `2023-01-01T12:00:00.000Z`.
pub fn format_server_time() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Format Unix seconds as a server-time value.
pub fn format_timestamp(unix_secs: i64) -> String {
    match chrono::DateTime::from_timestamp(unix_secs, 0) {
        Some(datetime) => datetime.to_rfc3339_opts(SecondsFormat::Millis, true),
        None => "1970-01-01T00:00:00.000Z".to_string(),
    }
}

/// Reference tag for a batch id: the id in lowercase base36.
///
/// References only need to be unique among batches open at the same time,
/// and ids are unique among running batches.
pub fn batch_reference(id: u32) -> String {
    if id == 0 {
        return "0".to_string();
    }

    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut value = id;
    let mut buf = Vec::with_capacity(7);
    while value > 0 {
        buf.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    buf.reverse();
    String::from_utf8(buf).unwrap_or_default()
}
