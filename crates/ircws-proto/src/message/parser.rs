//! nom grammar for one IRC line.
//!
//! ```text
//! [@tags] [:prefix] <command> [params...] [:trailing]
//! ```
//!
//! Tags are recognised and skipped; nothing in this crate consumes them.

use nom::{
    bytes::complete::{take_until, take_while1},
    character::complete::{char, space0},
    combinator::opt,
    error::ErrorKind,
    sequence::preceded,
    IResult,
};
use smallvec::SmallVec;

use crate::error::MessageParseError;

/// RFC 2812 caps a message at 15 parameters.
pub(crate) const MAX_PARAMS: usize = 15;

fn parse_tags(input: &str) -> IResult<&str, &str> {
    preceded(char('@'), take_until(" "))(input)
}

fn parse_prefix(input: &str) -> IResult<&str, &str> {
    preceded(char(':'), take_while1(|c| c != ' '))(input)
}

/// `1*letter / 3digit`
fn parse_command(input: &str) -> IResult<&str, &str> {
    let (rest, cmd) = take_while1(|c: char| c.is_ascii_alphanumeric())(input)?;

    let is_all_letters = cmd.bytes().all(|b| b.is_ascii_alphabetic());
    let is_numeric = cmd.len() == 3 && cmd.bytes().all(|b| b.is_ascii_digit());
    let terminated = rest.is_empty() || rest.starts_with([' ', '\r', '\n']);

    if (is_all_letters || is_numeric) && terminated {
        Ok((rest, cmd))
    } else {
        Err(nom::Err::Error(nom::error::Error::new(
            input,
            ErrorKind::AlphaNumeric,
        )))
    }
}

/// Middle parameters are space separated (runs of spaces collapse); the
/// first parameter starting with `:` swallows the rest of the line.
fn parse_params(input: &str) -> SmallVec<[&str; MAX_PARAMS]> {
    let mut params = SmallVec::new();
    let mut rest = input;

    while rest.starts_with(' ') {
        if params.len() >= MAX_PARAMS {
            break;
        }

        rest = rest.trim_start_matches(' ');
        if rest.is_empty() || rest.starts_with(['\r', '\n']) {
            break;
        }

        if let Some(trailing) = rest.strip_prefix(':') {
            let end = trailing.find(['\r', '\n']).unwrap_or(trailing.len());
            params.push(&trailing[..end]);
            break;
        }

        let end = rest.find([' ', '\r', '\n']).unwrap_or(rest.len());
        params.push(&rest[..end]);
        rest = &rest[end..];
    }

    params
}

/// Borrowed view of a parsed line.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ParsedLine<'a> {
    pub prefix: Option<&'a str>,
    pub command: &'a str,
    pub params: SmallVec<[&'a str; MAX_PARAMS]>,
}

fn parse_line(input: &str) -> IResult<&str, (Option<&str>, &str)> {
    let (input, _) = opt(parse_tags)(input)?;
    let (input, _) = space0(input)?;
    let (input, prefix) = opt(parse_prefix)(input)?;
    let (input, _) = space0(input)?;
    let (input, command) = parse_command(input)?;
    Ok((input, (prefix, command)))
}

impl<'a> ParsedLine<'a> {
    pub fn parse(input: &'a str) -> Result<Self, MessageParseError> {
        let body = input.trim_end_matches(['\r', '\n']);
        if body.trim().is_empty() {
            return Err(MessageParseError::EmptyMessage);
        }

        let without_tags = match body.strip_prefix('@') {
            Some(tagged) => tagged.split_once(' ').map_or("", |(_, rest)| rest),
            None => body,
        };
        if without_tags.trim_start().starts_with(": ") || without_tags.trim_start() == ":" {
            return Err(MessageParseError::EmptyPrefix);
        }

        match parse_line(body) {
            Ok((rest, (prefix, command))) => Ok(ParsedLine {
                prefix,
                command,
                params: parse_params(rest),
            }),
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                Err(MessageParseError::InvalidCommand {
                    position: body.len() - e.input.len(),
                })
            }
            Err(nom::Err::Incomplete(_)) => Err(MessageParseError::InvalidCommand {
                position: body.len(),
            }),
        }
    }
}
