//! Tokenizer for snippet source text.
//!
//! Snippets are tokenized with per-category nom parsers before parsing.
//! Keywords are recognized through the identifier parser so that an
//! identifier like `index` is never split at the `in` keyword.

pub mod keyword;
pub mod literal;
pub mod symbol;
pub mod token;

pub use keyword::Keyword;
pub use literal::Literal;
pub use symbol::{Delimiter, Operator};
pub use token::{Token, TokenSpan, TokenizeError};

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    combinator::{map, recognize},
    error::context,
    sequence::{pair, preceded},
};

use token::ParserResult;

// Parser for identifiers and keywords
fn identifier(input: &str) -> ParserResult<Token> {
    let (input, id) = recognize(pair(
        take_while1(|c: char| c.is_alphabetic() || c == '_'),
        take_while(|c: char| c.is_alphanumeric() || c == '_'),
    ))(input)?;

    if let Ok(kw) = id.parse::<Keyword>() {
        return Ok((input, Token::Keyword(kw)));
    }

    Ok((input, Token::Identifier(id.to_string())))
}

// Parser for spaces and tabs; newlines are their own token because they
// separate statements.
fn whitespace(input: &str) -> ParserResult<Token> {
    let (input, _) = take_while1(|c| c == ' ' || c == '\t' || c == '\r')(input)?;
    Ok((input, Token::Whitespace))
}

fn newline(input: &str) -> ParserResult<Token> {
    map(tag("\n"), |_| Token::Newline)(input)
}

// Parser for comments (`#` to end of line)
fn comment(input: &str) -> ParserResult<Token> {
    let (input, text) = preceded(tag("#"), take_while(|c| c != '\n'))(input)?;
    Ok((input, Token::Comment(text.trim().to_string())))
}

// Main tokenizer function
pub fn tokenize(input: &str) -> Result<Vec<TokenSpan>, TokenizeError> {
    let mut tokens = Vec::new();
    let mut current_line = 1;
    let mut current_column = 1;
    let mut remaining = input;

    while !remaining.is_empty() {
        let result = context(
            "token",
            alt((
                comment,
                identifier,
                literal::parse_literal,
                symbol::operator,
                symbol::delimiter,
                whitespace,
                newline,
            )),
        )(remaining);

        match result {
            Ok((rest, token)) => {
                let token_length = remaining.len() - rest.len();
                let span = TokenSpan {
                    token: token.clone(),
                    line: current_line,
                    column: current_column,
                };

                if token == Token::Newline {
                    current_line += 1;
                    current_column = 1;
                } else {
                    current_column += token_length;
                }

                tokens.push(span);
                remaining = rest;
            }
            Err(_) => {
                return Err(TokenizeError {
                    line: current_line,
                    column: current_column,
                    fragment: remaining.chars().take(10).collect(),
                })
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(input: &str) -> Vec<Token> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .filter(|t| !matches!(t, Token::Whitespace))
            .collect()
    }

    #[test]
    fn test_assignment_tokens() {
        assert_eq!(
            kinds("x = 1"),
            vec![
                Token::Identifier("x".to_string()),
                Token::Operator(Operator::Assign),
                Token::Literal(Literal::Integer(1)),
            ]
        );
    }

    #[test]
    fn test_keyword_vs_identifier_prefix() {
        // `index` starts with the `in` keyword but is one identifier
        assert_eq!(kinds("index"), vec![Token::Identifier("index".to_string())]);
        assert_eq!(
            kinds("for x in xs"),
            vec![
                Token::Keyword(Keyword::For),
                Token::Identifier("x".to_string()),
                Token::Keyword(Keyword::In),
                Token::Identifier("xs".to_string()),
            ]
        );
    }

    #[test]
    fn test_comment_and_newline() {
        assert_eq!(
            kinds("x = 1 # bind x\ny = 2"),
            vec![
                Token::Identifier("x".to_string()),
                Token::Operator(Operator::Assign),
                Token::Literal(Literal::Integer(1)),
                Token::Comment("bind x".to_string()),
                Token::Newline,
                Token::Identifier("y".to_string()),
                Token::Operator(Operator::Assign),
                Token::Literal(Literal::Integer(2)),
            ]
        );
    }

    #[test]
    fn test_module_call_tokens() {
        assert_eq!(
            kinds("math.sqrt(2)"),
            vec![
                Token::Identifier("math".to_string()),
                Token::Operator(Operator::Dot),
                Token::Identifier("sqrt".to_string()),
                Token::Delimiter(Delimiter::OpenParen),
                Token::Literal(Literal::Integer(2)),
                Token::Delimiter(Delimiter::CloseParen),
            ]
        );
    }

    #[test]
    fn test_subtraction_is_three_tokens() {
        assert_eq!(
            kinds("a-1"),
            vec![
                Token::Identifier("a".to_string()),
                Token::Operator(Operator::Minus),
                Token::Literal(Literal::Integer(1)),
            ]
        );
    }

    #[test]
    fn test_position_tracking() {
        let spans = tokenize("x = 1\ny = 2").unwrap();
        let y = spans
            .iter()
            .find(|s| s.token == Token::Identifier("y".to_string()))
            .unwrap();
        assert_eq!(y.line, 2);
        assert_eq!(y.column, 1);
    }

    #[test]
    fn test_unexpected_character() {
        let err = tokenize("x = 1 @").unwrap_err();
        assert_eq!(err.line, 1);
        assert_eq!(err.fragment, "@");
    }
}
