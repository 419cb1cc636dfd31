//! Bounded IRC line encoder.
//!
//! The tag section and the body are budgeted separately, the way IRCv3
//! message-tags does: tags get their own allowance and the classic line limit
//! applies to `[:source] COMMAND params` plus CRLF.

use bytes::{BufMut, Bytes, BytesMut};

use crate::tags::{escape_tag_value, escaped_len};

/// Incrementally builds one wire line.
#[derive(Debug)]
pub struct LineBuilder {
    max_body: usize,
    max_tags: usize,
    tags: String,
    body: String,
    pending: Option<String>,
}

impl LineBuilder {
    /// `max_body` includes the CRLF terminator; `max_tags` bounds the tag
    /// section excluding the leading `@` and the separating space.
    pub fn new(max_body: usize, max_tags: usize) -> Self {
        Self {
            max_body,
            max_tags,
            tags: String::new(),
            body: String::with_capacity(max_body),
            pending: None,
        }
    }

    /// Append a tag. Returns false (and writes nothing) when the tag would
    /// push the section over its budget.
    pub fn tag(&mut self, key: &str, value: Option<&str>) -> bool {
        let separator = usize::from(!self.tags.is_empty());
        let needed = separator + key.len() + value.map_or(0, |v| 1 + escaped_len(v));
        if self.tags.len() + needed > self.max_tags {
            return false;
        }

        if separator == 1 {
            self.tags.push(';');
        }
        self.tags.push_str(key);
        if let Some(value) = value {
            self.tags.push('=');
            // Writing into a String cannot fail.
            let _ = escape_tag_value(&mut self.tags, value);
        }
        true
    }

    /// Set the `:source` prefix. Must be called before [`command`](Self::command).
    pub fn source(&mut self, source: &str) {
        self.body.push(':');
        self.body.push_str(source);
        self.body.push(' ');
    }

    /// Write the command name.
    pub fn command(&mut self, command: &str) {
        self.body.push_str(command);
    }

    /// Queue a parameter. The final parameter is written with a `:` prefix
    /// when it is empty, contains a space or starts with `:`.
    pub fn param(&mut self, param: &str) {
        if let Some(previous) = self.pending.take() {
            self.body.push(' ');
            self.body.push_str(&previous);
        }
        self.pending = Some(param.to_owned());
    }

    /// Length of the tag section written so far.
    pub fn tags_len(&self) -> usize {
        self.tags.len()
    }

    /// Finish the line: flush the last parameter, truncate the body to the
    /// line limit and append CRLF.
    pub fn finish(mut self) -> Bytes {
        if let Some(last) = self.pending.take() {
            self.body.push(' ');
            if last.is_empty() || last.contains(' ') || last.starts_with(':') {
                self.body.push(':');
            }
            self.body.push_str(&last);
        }

        let limit = self.max_body.saturating_sub(2);
        if self.body.len() > limit {
            let mut cut = limit;
            while !self.body.is_char_boundary(cut) {
                cut -= 1;
            }
            self.body.truncate(cut);
        }

        let tag_part = if self.tags.is_empty() {
            0
        } else {
            self.tags.len() + 2
        };
        let mut out = BytesMut::with_capacity(tag_part + self.body.len() + 2);
        if !self.tags.is_empty() {
            out.put_u8(b'@');
            out.put_slice(self.tags.as_bytes());
            out.put_u8(b' ');
        }
        out.put_slice(self.body.as_bytes());
        out.put_slice(b"\r\n");
        out.freeze()
    }
}
