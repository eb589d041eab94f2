use nom::{
    branch::alt,
    bytes::complete::take_while1,
    character::complete::{char, digit1},
    combinator::{map, map_res, recognize, value},
    error::context,
    multi::many0,
    sequence::{delimited, preceded, tuple},
};

use super::token::{ParserResult, Token};

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i64),
    Float(f64),
    String(String),
}

fn parse_escape(input: &str) -> ParserResult<char> {
    preceded(
        char('\\'),
        alt((
            value('\n', char('n')),
            value('\t', char('t')),
            value('"', char('"')),
            value('\\', char('\\')),
        )),
    )(input)
}

fn parse_string_part(input: &str) -> ParserResult<String> {
    alt((
        map(parse_escape, |c| c.to_string()),
        map(
            take_while1(|c| c != '"' && c != '\\' && c != '\n'),
            |s: &str| s.to_string(),
        ),
    ))(input)
}

fn parse_string_literal(input: &str) -> ParserResult<Literal> {
    context(
        "string literal",
        map(
            delimited(char('"'), many0(parse_string_part), char('"')),
            |parts| Literal::String(parts.concat()),
        ),
    )(input)
}

// Leading minus is left to the parser as a unary operator so that `a-1`
// tokenizes as three tokens.
fn parse_float_literal(input: &str) -> ParserResult<Literal> {
    context(
        "float literal",
        map_res(
            recognize(tuple((digit1, char('.'), digit1))),
            |s: &str| s.parse::<f64>().map(Literal::Float),
        ),
    )(input)
}

fn parse_integer_literal(input: &str) -> ParserResult<Literal> {
    context(
        "integer literal",
        map_res(digit1, |s: &str| s.parse::<i64>().map(Literal::Integer)),
    )(input)
}

pub fn parse_literal(input: &str) -> ParserResult<Token> {
    context(
        "literal",
        alt((
            parse_string_literal,
            parse_float_literal,
            parse_integer_literal,
        )),
    )(input)
    .map(|(rest, lit)| (rest, Token::Literal(lit)))
}
