//! # slirc-wire
//!
//! The byte-level half of the IRC client protocol: everything needed to turn
//! a structured line into `@tags :source COMMAND params\r\n` and back again.
//!
//! - [`tags`]: IRCv3 tag value escaping
//! - [`line`]: zero-copy line parsing built on nom
//! - [`encode`]: bounded line building into [`bytes::Bytes`]
//! - [`ircv3`]: server-time formatting and batch reference encoding
//!
//! ```rust
//! use slirc_wire::{LineBuilder, RawLine};
//!
//! let mut builder = LineBuilder::new(512, 8191);
//! builder.tag("time", Some("2024-01-01T00:00:00.000Z"));
//! builder.source("nick!user@host");
//! builder.command("PRIVMSG");
//! builder.param("#rust");
//! builder.param("hello there");
//! let bytes = builder.finish();
//!
//! let text = std::str::from_utf8(&bytes).unwrap();
//! let line = RawLine::parse(text).unwrap();
//! assert_eq!(line.command, "PRIVMSG");
//! assert_eq!(line.params.as_slice(), &["#rust", "hello there"]);
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod encode;
pub mod error;
pub mod ircv3;
pub mod line;
pub mod tags;

pub use self::encode::LineBuilder;
pub use self::error::ParseError;
pub use self::ircv3::{batch_reference, format_server_time, format_timestamp};
pub use self::line::{RawLine, MAX_PARAMS};
pub use self::tags::{escape_tag_value, unescape_tag_value, TagIter};

/// Default RFC 1459 line limit, CRLF included.
pub const DEFAULT_LINE_LENGTH: usize = 512;

/// Longest tag section (without the `@` and trailing space) a client may send.
pub const MAX_CLIENT_TAGS_LENGTH: usize = 4094;

/// Longest tag section the server will emit.
pub const MAX_SERVER_TAGS_LENGTH: usize = 8191;
