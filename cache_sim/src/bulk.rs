use std::{io, path::PathBuf};

use nom::{
    branch::alt,
    character::complete::{i32, multispace0, multispace1},
    combinator::{eof, peek},
    IResult,
};
use thiserror::Error;

use crate::memory::Word;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("error opening file {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed number at byte {at}; {loaded} numbers loaded into RAM before it")]
    Malformed { loaded: usize, at: usize },
}

impl LoadError {
    /// words that made it into memory despite the failure.
    pub fn loaded(&self) -> usize {
        match self {
            LoadError::Unreadable { .. } => 0,
            LoadError::Malformed { loaded, .. } => *loaded,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParsedWords {
    pub words: Vec<Word>,
    /// byte offset of the first token that is not an integer.
    pub malformed_at: Option<usize>,
}

fn word(input: &str) -> IResult<&str, Word> {
    let (input, _) = multispace0(input)?;
    let (input, v) = i32(input)?;
    // `12ab` must not read as 12
    let (input, _) = peek(alt((multispace1, eof)))(input)?;
    Ok((input, v))
}

/// reads integers left to right until the end of input, the first malformed token,
/// or `limit` words; whatever follows the `limit`-th word is never looked at.
pub fn parse_words(src: &str, limit: usize) -> ParsedWords {
    let mut words = Vec::new();
    let mut input = src;
    loop {
        if words.len() >= limit {
            break ParsedWords {
                words,
                malformed_at: None,
            };
        }
        match word(input) {
            Ok((rest, v)) => {
                words.push(v);
                input = rest;
            }
            Err(_) => {
                let rest = input.trim_start();
                let malformed_at = (!rest.is_empty()).then(|| src.len() - rest.len());
                break ParsedWords {
                    words,
                    malformed_at,
                };
            }
        }
    }
}
