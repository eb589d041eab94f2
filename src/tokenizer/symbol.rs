//! Operator and delimiter tokens.
//!
//! Multi-character operators are matched before their single-character
//! prefixes (`==` before `=`, `<=` before `<`) so the longest match wins.

use core::fmt;

use nom::{branch::alt, bytes::complete::tag, combinator::value, error::context};

use super::token::{ParserResult, Token};

#[derive(Debug, Clone, Copy, PartialEq, strum::EnumString, strum::Display, strum::AsRefStr)]
pub enum Operator {
    /// Equality comparison operator (`==`)
    #[strum(serialize = "==")]
    EqualEqual,
    /// Inequality comparison operator (`!=`)
    #[strum(serialize = "!=")]
    NotEqual,
    /// Less than or equal comparison operator (`<=`)
    #[strum(serialize = "<=")]
    LessEqual,
    /// Greater than or equal comparison operator (`>=`)
    #[strum(serialize = ">=")]
    GreaterEqual,
    /// Logical AND operator (`&&`)
    #[strum(serialize = "&&")]
    And,
    /// Logical OR operator (`||`)
    #[strum(serialize = "||")]
    Or,
    /// Less than comparison operator (`<`)
    #[strum(serialize = "<")]
    Less,
    /// Greater than comparison operator (`>`)
    #[strum(serialize = ">")]
    Greater,
    /// Addition operator (`+`)
    #[strum(serialize = "+")]
    Plus,
    /// Subtraction operator (`-`)
    #[strum(serialize = "-")]
    Minus,
    /// Multiplication operator (`*`)
    #[strum(serialize = "*")]
    Star,
    /// Division operator (`/`)
    #[strum(serialize = "/")]
    Slash,
    /// Remainder operator (`%`)
    #[strum(serialize = "%")]
    Percent,
    /// Logical NOT operator (`!`)
    #[strum(serialize = "!")]
    Not,
    /// Assignment operator (`=`)
    #[strum(serialize = "=")]
    Assign,
    /// Member access operator (`.`)
    #[strum(serialize = ".")]
    Dot,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Delimiter {
    OpenBrace,
    CloseBrace,
    OpenParen,
    CloseParen,
    OpenBracket,
    CloseBracket,
    Comma,
    Colon,
    Semicolon,
}

impl Delimiter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Delimiter::OpenBrace => "{",
            Delimiter::CloseBrace => "}",
            Delimiter::OpenParen => "(",
            Delimiter::CloseParen => ")",
            Delimiter::OpenBracket => "[",
            Delimiter::CloseBracket => "]",
            Delimiter::Comma => ",",
            Delimiter::Colon => ":",
            Delimiter::Semicolon => ";",
        }
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub fn operator(input: &str) -> ParserResult<Token> {
    context(
        "operator",
        alt((
            value(Operator::EqualEqual, tag("==")),
            value(Operator::NotEqual, tag("!=")),
            value(Operator::LessEqual, tag("<=")),
            value(Operator::GreaterEqual, tag(">=")),
            value(Operator::And, tag("&&")),
            value(Operator::Or, tag("||")),
            value(Operator::Less, tag("<")),
            value(Operator::Greater, tag(">")),
            value(Operator::Plus, tag("+")),
            value(Operator::Minus, tag("-")),
            value(Operator::Star, tag("*")),
            value(Operator::Slash, tag("/")),
            value(Operator::Percent, tag("%")),
            value(Operator::Not, tag("!")),
            value(Operator::Assign, tag("=")),
            value(Operator::Dot, tag(".")),
        )),
    )(input)
    .map(|(rest, op)| (rest, Token::Operator(op)))
}

pub fn delimiter(input: &str) -> ParserResult<Token> {
    context(
        "delimiter",
        alt((
            value(Delimiter::OpenBrace, tag("{")),
            value(Delimiter::CloseBrace, tag("}")),
            value(Delimiter::OpenParen, tag("(")),
            value(Delimiter::CloseParen, tag(")")),
            value(Delimiter::OpenBracket, tag("[")),
            value(Delimiter::CloseBracket, tag("]")),
            value(Delimiter::Comma, tag(",")),
            value(Delimiter::Colon, tag(":")),
            value(Delimiter::Semicolon, tag(";")),
        )),
    )(input)
    .map(|(rest, d)| (rest, Token::Delimiter(d)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longest_match_wins() {
        let (rest, token) = operator("== 1").unwrap();
        assert_eq!(token, Token::Operator(Operator::EqualEqual));
        assert_eq!(rest, " 1");

        let (rest, token) = operator("=1").unwrap();
        assert_eq!(token, Token::Operator(Operator::Assign));
        assert_eq!(rest, "1");

        let (_, token) = operator("<=").unwrap();
        assert_eq!(token, Token::Operator(Operator::LessEqual));
    }

    #[test]
    fn test_delimiters() {
        for (input, expected) in [
            ("{", Delimiter::OpenBrace),
            ("}", Delimiter::CloseBrace),
            ("[", Delimiter::OpenBracket),
            (";", Delimiter::Semicolon),
        ] {
            let (_, token) = delimiter(input).unwrap();
            assert_eq!(token, Token::Delimiter(expected));
        }
    }
}
