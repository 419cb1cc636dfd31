//! IRCv3 message tag escaping and tag-section splitting.

use std::fmt::{Result as FmtResult, Write};

/// Escape a tag value for the wire.
///
/// `;`, space, `\`, CR and LF are the only characters that need escaping.
pub fn escape_tag_value(f: &mut dyn Write, value: &str) -> FmtResult {
    for c in value.chars() {
        match c {
            ';' => f.write_str("\\:")?,
            ' ' => f.write_str("\\s")?,
            '\\' => f.write_str("\\\\")?,
            '\r' => f.write_str("\\r")?,
            '\n' => f.write_str("\\n")?,
            c => f.write_char(c)?,
        }
    }
    Ok(())
}

/// Length of `value` once escaped, without building the escaped string.
pub fn escaped_len(value: &str) -> usize {
    value
        .chars()
        .map(|c| match c {
            ';' | ' ' | '\\' | '\r' | '\n' => 2,
            c => c.len_utf8(),
        })
        .sum()
}

/// Reverse [`escape_tag_value`].
///
/// Unknown escapes drop the backslash; a trailing lone backslash is dropped.
pub fn unescape_tag_value(value: &str) -> String {
    let mut unescaped = String::with_capacity(value.len());
    let mut iter = value.chars();
    while let Some(c) = iter.next() {
        let r = if c == '\\' {
            match iter.next() {
                Some(':') => ';',
                Some('s') => ' ',
                Some('\\') => '\\',
                Some('r') => '\r',
                Some('n') => '\n',
                Some(c) => c,
                None => break,
            }
        } else {
            c
        };
        unescaped.push(r);
    }
    unescaped
}

/// Iterator over the `key[=value]` items of a raw tag section.
///
/// Yields the key and the *escaped* value; values are only unescaped once a
/// tag has been accepted, so rejected tags cost nothing.
#[derive(Debug, Clone)]
pub struct TagIter<'a> {
    rest: &'a str,
}

impl<'a> TagIter<'a> {
    /// Iterate the tag section (without the leading `@`).
    pub fn new(section: &'a str) -> Self {
        Self { rest: section }
    }
}

impl<'a> Iterator for TagIter<'a> {
    type Item = (&'a str, Option<&'a str>);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.rest.is_empty() {
                return None;
            }
            let (item, rest) = match self.rest.find(';') {
                Some(idx) => (&self.rest[..idx], &self.rest[idx + 1..]),
                None => (self.rest, ""),
            };
            self.rest = rest;
            if item.is_empty() {
                continue;
            }
            let mut parts = item.splitn(2, '=');
            let key = parts.next().unwrap_or("");
            let value = parts.next();
            return Some((key, value));
        }
    }
}
