//! Zero-copy IRC line parser built on nom.
//!
//! ```text
//! [@tags] [:source] <command> [params...] [:trailing]
//! ```

use nom::{
    bytes::complete::{take_until, take_while1},
    character::complete::{char, space0},
    combinator::opt,
    error::ErrorKind,
    sequence::preceded,
    IResult,
};
use smallvec::SmallVec;

use crate::error::ParseError;

/// RFC 2812 caps a line at 15 parameters.
pub const MAX_PARAMS: usize = 15;

/// A parsed line borrowing from the input buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine<'a> {
    /// Raw tag section (without `@`), values still escaped.
    pub tags: Option<&'a str>,
    /// Raw source (without `:`).
    pub source: Option<&'a str>,
    /// Command name: letters, or exactly three digits.
    pub command: &'a str,
    /// Parameters, trailing included.
    pub params: SmallVec<[&'a str; MAX_PARAMS]>,
}

fn parse_tags(input: &str) -> IResult<&str, &str> {
    preceded(char('@'), take_until(" "))(input)
}

fn parse_source(input: &str) -> IResult<&str, &str> {
    preceded(char(':'), take_while1(|c| c != ' '))(input)
}

fn parse_command(input: &str) -> IResult<&str, &str> {
    let (rest, cmd) = take_while1(|c: char| c.is_ascii_alphanumeric())(input)?;

    let is_all_letters = cmd.chars().all(|c| c.is_ascii_alphabetic());
    let is_three_digits = cmd.len() == 3 && cmd.chars().all(|c| c.is_ascii_digit());

    if is_all_letters || is_three_digits {
        Ok((rest, cmd))
    } else {
        Err(nom::Err::Error(nom::error::Error::new(
            input,
            ErrorKind::AlphaNumeric,
        )))
    }
}

/// Split the parameter list. Runs of spaces count as one separator; a `:`
/// introduces the trailing parameter, which keeps its spaces.
fn parse_params(input: &str) -> SmallVec<[&str; MAX_PARAMS]> {
    let mut params = SmallVec::new();
    let mut rest = input;

    while rest.starts_with(' ') {
        if params.len() >= MAX_PARAMS {
            break;
        }
        rest = rest.trim_start_matches(' ');
        if rest.is_empty() {
            break;
        }

        if let Some(trailing) = rest.strip_prefix(':') {
            params.push(trailing);
            break;
        }

        let end = rest.find(' ').unwrap_or(rest.len());
        params.push(&rest[..end]);
        rest = &rest[end..];
    }

    params
}

fn parse_line(input: &str) -> IResult<&str, RawLine<'_>> {
    let (input, tags) = opt(parse_tags)(input)?;
    let (input, _) = space0(input)?;
    let (input, source) = opt(parse_source)(input)?;
    let (input, _) = space0(input)?;
    let (input, command) = parse_command(input)?;
    let params = parse_params(input);

    Ok((
        "",
        RawLine {
            tags,
            source,
            command,
            params,
        },
    ))
}

/// Strip any trailing CR/LF characters.
fn strip_terminator(input: &str) -> &str {
    input.trim_end_matches(['\r', '\n'])
}

impl<'a> RawLine<'a> {
    /// Parse one line. A trailing CRLF (or bare LF) is ignored.
    pub fn parse(input: &'a str) -> Result<Self, ParseError> {
        let line = strip_terminator(input);
        if line.is_empty() {
            return Err(ParseError::EmptyLine);
        }

        match parse_line(line) {
            Ok((_, parsed)) => Ok(parsed),
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(ParseError::Malformed {
                position: line.len() - e.input.len(),
                kind: e.code,
            }),
            Err(nom::Err::Incomplete(_)) => Err(ParseError::Malformed {
                position: line.len(),
                kind: ErrorKind::Eof,
            }),
        }
    }

    /// Parse one line, enforcing the tag-section and body length limits
    /// before looking at the grammar.
    ///
    /// `max_body` counts the terminator, so a 512 limit admits 510 bytes of
    /// content.
    pub fn parse_bounded(
        input: &'a str,
        max_tags: usize,
        max_body: usize,
    ) -> Result<Self, ParseError> {
        let line = strip_terminator(input);
        let body = match line.strip_prefix('@') {
            Some(tagged) => {
                let tags_len = tagged.find(' ').unwrap_or(tagged.len());
                if tags_len > max_tags {
                    return Err(ParseError::TagsTooLong {
                        length: tags_len,
                        limit: max_tags,
                    });
                }
                tagged[tags_len..].trim_start_matches(' ')
            }
            None => line,
        };

        let body_limit = max_body.saturating_sub(2);
        if body.len() > body_limit {
            return Err(ParseError::LineTooLong {
                length: body.len(),
                limit: body_limit,
            });
        }

        Self::parse(line)
    }
}
