//! nom-based line tokenizer.
//!
//! Splits a raw server line into its prefix, command word and parameters.
//! Message tags are recognised so they can be skipped; nothing downstream
//! consumes them.

use nom::{
    bytes::complete::{take_till, take_while1},
    character::complete::{char, space0},
    combinator::opt,
    error::ErrorKind,
    sequence::preceded,
    IResult,
};
use smallvec::SmallVec;

use crate::error::MessageParseError;

/// RFC 2812 caps a message at 15 parameters.
const MAX_PARAMS: usize = 15;

/// A tokenized line borrowing from the input.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ParsedLine<'a> {
    pub prefix: Option<&'a str>,
    pub command: &'a str,
    pub params: SmallVec<[&'a str; MAX_PARAMS]>,
}

fn tags(input: &str) -> IResult<&str, &str> {
    preceded(char('@'), take_till(|c| c == ' '))(input)
}

fn prefix(input: &str) -> IResult<&str, &str> {
    preceded(char(':'), take_while1(|c| c != ' '))(input)
}

fn command(input: &str) -> IResult<&str, &str> {
    let (rest, word) = take_while1(|c: char| c.is_ascii_alphanumeric())(input)?;

    let letters = word.chars().all(|c| c.is_ascii_alphabetic());
    let numeric = word.len() == 3 && word.chars().all(|c| c.is_ascii_digit());
    if letters || numeric {
        Ok((rest, word))
    } else {
        Err(nom::Err::Error(nom::error::Error::new(
            input,
            ErrorKind::AlphaNumeric,
        )))
    }
}

/// Collect middle parameters and the optional trailing one.
///
/// Runs of spaces count as a single separator.
fn params(mut rest: &str) -> SmallVec<[&str; MAX_PARAMS]> {
    let mut out = SmallVec::new();

    loop {
        let trimmed = rest.trim_start_matches(' ');
        if trimmed.len() == rest.len() && !out.is_empty() {
            // no separator after the previous parameter
            break;
        }
        rest = trimmed;
        if rest.is_empty() || out.len() >= MAX_PARAMS {
            break;
        }

        if let Some(trailing) = rest.strip_prefix(':') {
            out.push(trailing);
            break;
        }

        let end = rest.find(' ').unwrap_or(rest.len());
        out.push(&rest[..end]);
        rest = &rest[end..];
    }

    out
}

fn line(input: &str) -> IResult<&str, ParsedLine<'_>> {
    let (input, _) = opt(tags)(input)?;
    let (input, _) = space0(input)?;
    let (input, prefix) = opt(prefix)(input)?;
    let (input, _) = space0(input)?;
    let (input, command) = command(input)?;

    Ok((
        "",
        ParsedLine {
            prefix,
            command,
            params: params(input),
        },
    ))
}

impl<'a> ParsedLine<'a> {
    /// Tokenize a line. Trailing CR/LF are ignored.
    pub fn parse(input: &'a str) -> Result<Self, MessageParseError> {
        let trimmed = input.trim_end_matches(['\r', '\n']);
        if trimmed.trim().is_empty() {
            return Err(MessageParseError::EmptyMessage);
        }

        match line(trimmed) {
            Ok((_, parsed)) => Ok(parsed),
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                Err(MessageParseError::InvalidCommand {
                    position: trimmed.len() - e.input.len(),
                })
            }
            Err(nom::Err::Incomplete(_)) => Err(MessageParseError::InvalidCommand {
                position: trimmed.len(),
            }),
        }
    }
}
