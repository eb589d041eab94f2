use nom::{error::VerboseError, IResult};
use thiserror::Error;

use super::{
    keyword::Keyword,
    literal::Literal,
    symbol::{Delimiter, Operator},
};

pub type ParserResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Keywords
    Keyword(Keyword),
    // Identifiers
    Identifier(String),
    // Literals
    Literal(Literal),
    // Symbols
    Operator(Operator),
    Delimiter(Delimiter),
    // Formatting
    Whitespace,
    Newline,
    Comment(String),
}

#[derive(Debug, Clone)]
pub struct TokenSpan {
    pub token: Token,
    pub line: usize,
    pub column: usize,
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("unexpected character at line {line}, column {column}: {fragment:?}")]
pub struct TokenizeError {
    pub line: usize,
    pub column: usize,
    pub fragment: String,
}
