//! Recursive-descent parser over the token stream.
//!
//! Statements are separated by newlines or semicolons; blocks are brace
//! delimited. Inside parentheses, brackets and map literals newlines are
//! insignificant.

use thiserror::Error;

use crate::ast::{BinaryOperator, Expr, Literal, Program, Stmt, StmtKind, UnaryOperator};
use crate::tokenizer::{self, Delimiter, Keyword, Operator, Token, TokenSpan};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("unexpected {found} at line {line}, column {column}, expected {expected}")]
    UnexpectedToken {
        line: usize,
        column: usize,
        found: String,
        expected: String,
    },
    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEnd { expected: String },
    #[error("{target} is not callable at line {line}")]
    NotCallable { target: String, line: usize },
}

/// Tokenize and parse a snippet in one step.
pub fn parse_source(source: &str) -> Result<Program, crate::error::CrucibleError> {
    let tokens = tokenizer::tokenize(source)?;
    Ok(Parser::new(tokens).parse_program()?)
}

pub struct Parser {
    tokens: Vec<TokenSpan>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<TokenSpan>) -> Self {
        let tokens = tokens
            .into_iter()
            .filter(|s| !matches!(s.token, Token::Whitespace | Token::Comment(_)))
            .collect();
        Self { tokens, pos: 0 }
    }

    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut statements = Vec::new();
        self.skip_separators();
        while !self.at_end() {
            statements.push(self.parse_statement()?);
            self.expect_statement_end()?;
        }
        Ok(Program { statements })
    }

    // ── statements ──────────────────────────────────────────

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        let line = self.current_line();
        let kind = match self.peek_token() {
            Some(Token::Keyword(Keyword::If)) => self.parse_if()?,
            Some(Token::Keyword(Keyword::While)) => self.parse_while()?,
            Some(Token::Keyword(Keyword::For)) => self.parse_for()?,
            Some(Token::Keyword(Keyword::Break)) => {
                self.advance();
                StmtKind::Break
            }
            Some(Token::Keyword(Keyword::Continue)) => {
                self.advance();
                StmtKind::Continue
            }
            Some(Token::Identifier(_)) if self.peek_is_assignment() => {
                let name = self.expect_identifier("variable name")?;
                self.expect_operator(Operator::Assign)?;
                let value = self.parse_expression()?;
                StmtKind::Assignment { name, value }
            }
            Some(_) => StmtKind::Expression(self.parse_expression()?),
            None => {
                return Err(ParseError::UnexpectedEnd {
                    expected: "statement".to_string(),
                })
            }
        };
        Ok(Stmt { line, kind })
    }

    fn parse_if(&mut self) -> Result<StmtKind, ParseError> {
        self.advance(); // if
        let condition = self.parse_expression()?;
        let then_block = self.parse_block()?;
        let else_block = if matches!(self.peek_token(), Some(Token::Keyword(Keyword::Else))) {
            self.advance();
            // `else if` chains nest as a one-statement else block
            if matches!(self.peek_token(), Some(Token::Keyword(Keyword::If))) {
                let line = self.current_line();
                let kind = self.parse_if()?;
                Some(vec![Stmt { line, kind }])
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };
        Ok(StmtKind::If {
            condition,
            then_block,
            else_block,
        })
    }

    fn parse_while(&mut self) -> Result<StmtKind, ParseError> {
        self.advance(); // while
        let condition = self.parse_expression()?;
        let body = self.parse_block()?;
        Ok(StmtKind::While { condition, body })
    }

    fn parse_for(&mut self) -> Result<StmtKind, ParseError> {
        self.advance(); // for
        let binding = self.expect_identifier("loop variable")?;
        match self.peek_token() {
            Some(Token::Keyword(Keyword::In)) => self.advance(),
            _ => return Err(self.unexpected("`in`")),
        };
        let iterable = self.parse_expression()?;
        let body = self.parse_block()?;
        Ok(StmtKind::For {
            binding,
            iterable,
            body,
        })
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect_delimiter(Delimiter::OpenBrace)?;
        let mut statements = Vec::new();
        self.skip_separators();
        while !matches!(
            self.peek_token(),
            Some(Token::Delimiter(Delimiter::CloseBrace))
        ) {
            if self.at_end() {
                return Err(ParseError::UnexpectedEnd {
                    expected: "`}`".to_string(),
                });
            }
            statements.push(self.parse_statement()?);
            self.skip_separators();
        }
        self.expect_delimiter(Delimiter::CloseBrace)?;
        Ok(statements)
    }

    // ── expressions, by precedence ──────────────────────────

    fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        while self.eat_operator(Operator::Or) {
            let right = self.parse_and()?;
            left = binary(BinaryOperator::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_equality()?;
        while self.eat_operator(Operator::And) {
            let right = self.parse_equality()?;
            left = binary(BinaryOperator::And, left, right);
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_comparison()?;
        loop {
            let op = if self.eat_operator(Operator::EqualEqual) {
                BinaryOperator::Equal
            } else if self.eat_operator(Operator::NotEqual) {
                BinaryOperator::NotEqual
            } else {
                break;
            };
            let right = self.parse_comparison()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_additive()?;
        loop {
            let op = if self.eat_operator(Operator::Less) {
                BinaryOperator::LessThan
            } else if self.eat_operator(Operator::LessEqual) {
                BinaryOperator::LessThanEqual
            } else if self.eat_operator(Operator::Greater) {
                BinaryOperator::GreaterThan
            } else if self.eat_operator(Operator::GreaterEqual) {
                BinaryOperator::GreaterThanEqual
            } else {
                break;
            };
            let right = self.parse_additive()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = if self.eat_operator(Operator::Plus) {
                BinaryOperator::Add
            } else if self.eat_operator(Operator::Minus) {
                BinaryOperator::Subtract
            } else {
                break;
            };
            let right = self.parse_multiplicative()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = if self.eat_operator(Operator::Star) {
                BinaryOperator::Multiply
            } else if self.eat_operator(Operator::Slash) {
                BinaryOperator::Divide
            } else if self.eat_operator(Operator::Percent) {
                BinaryOperator::Modulo
            } else {
                break;
            };
            let right = self.parse_unary()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if self.eat_operator(Operator::Minus) {
            let operand = self.parse_unary()?;
            return Ok(Expr::UnaryOp {
                op: UnaryOperator::Negate,
                operand: Box::new(operand),
            });
        }
        if self.eat_operator(Operator::Not) {
            let operand = self.parse_unary()?;
            return Ok(Expr::UnaryOp {
                op: UnaryOperator::Not,
                operand: Box::new(operand),
            });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.eat_operator(Operator::Dot) {
                let name = self.expect_identifier("attribute name")?;
                if matches!(
                    self.peek_token(),
                    Some(Token::Delimiter(Delimiter::OpenParen))
                ) {
                    let line = self.current_line();
                    let arguments = self.parse_call_arguments()?;
                    match expr {
                        Expr::Variable(module) => {
                            expr = Expr::ModuleCall {
                                module,
                                function: name,
                                arguments,
                            };
                        }
                        _ => {
                            return Err(ParseError::NotCallable {
                                target: format!(".{}", name),
                                line,
                            })
                        }
                    }
                } else {
                    expr = Expr::Field {
                        target: Box::new(expr),
                        name,
                    };
                }
            } else if matches!(
                self.peek_token(),
                Some(Token::Delimiter(Delimiter::OpenParen))
            ) {
                let line = self.current_line();
                let arguments = self.parse_call_arguments()?;
                match expr {
                    Expr::Variable(function) => {
                        expr = Expr::FunctionCall {
                            function,
                            arguments,
                        };
                    }
                    other => {
                        return Err(ParseError::NotCallable {
                            target: format!("{:?}", other),
                            line,
                        })
                    }
                }
            } else if matches!(
                self.peek_token(),
                Some(Token::Delimiter(Delimiter::OpenBracket))
            ) {
                self.advance();
                self.skip_newlines();
                let index = self.parse_expression()?;
                self.skip_newlines();
                self.expect_delimiter(Delimiter::CloseBracket)?;
                expr = Expr::Index {
                    target: Box::new(expr),
                    index: Box::new(index),
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match self.peek_token().cloned() {
            Some(Token::Literal(lit)) => {
                self.advance();
                Ok(Expr::Literal(match lit {
                    tokenizer::Literal::Integer(i) => Literal::Integer(i),
                    tokenizer::Literal::Float(f) => Literal::Float(f),
                    tokenizer::Literal::String(s) => Literal::String(s),
                }))
            }
            Some(Token::Keyword(Keyword::True)) => {
                self.advance();
                Ok(Expr::Literal(Literal::Boolean(true)))
            }
            Some(Token::Keyword(Keyword::False)) => {
                self.advance();
                Ok(Expr::Literal(Literal::Boolean(false)))
            }
            Some(Token::Keyword(Keyword::Null)) => {
                self.advance();
                Ok(Expr::Literal(Literal::Null))
            }
            Some(Token::Identifier(name)) => {
                self.advance();
                Ok(Expr::Variable(name))
            }
            Some(Token::Delimiter(Delimiter::OpenParen)) => {
                self.advance();
                self.skip_newlines();
                let expr = self.parse_expression()?;
                self.skip_newlines();
                self.expect_delimiter(Delimiter::CloseParen)?;
                Ok(expr)
            }
            Some(Token::Delimiter(Delimiter::OpenBracket)) => self.parse_list_literal(),
            Some(Token::Delimiter(Delimiter::OpenBrace)) => self.parse_map_literal(),
            _ => Err(self.unexpected("expression")),
        }
    }

    fn parse_list_literal(&mut self) -> Result<Expr, ParseError> {
        self.advance(); // [
        let mut items = Vec::new();
        self.skip_newlines();
        while !matches!(
            self.peek_token(),
            Some(Token::Delimiter(Delimiter::CloseBracket))
        ) {
            items.push(self.parse_expression()?);
            self.skip_newlines();
            if !self.eat_delimiter(Delimiter::Comma) {
                break;
            }
            self.skip_newlines();
        }
        self.expect_delimiter(Delimiter::CloseBracket)?;
        Ok(Expr::List(items))
    }

    fn parse_map_literal(&mut self) -> Result<Expr, ParseError> {
        self.advance(); // {
        let mut entries = Vec::new();
        self.skip_newlines();
        while !matches!(
            self.peek_token(),
            Some(Token::Delimiter(Delimiter::CloseBrace))
        ) {
            let key = match self.peek_token().cloned() {
                Some(Token::Literal(tokenizer::Literal::String(s))) => {
                    self.advance();
                    s
                }
                _ => return Err(self.unexpected("string key")),
            };
            self.expect_delimiter(Delimiter::Colon)?;
            self.skip_newlines();
            let value = self.parse_expression()?;
            entries.push((key, value));
            self.skip_newlines();
            if !self.eat_delimiter(Delimiter::Comma) {
                break;
            }
            self.skip_newlines();
        }
        self.expect_delimiter(Delimiter::CloseBrace)?;
        Ok(Expr::Map(entries))
    }

    fn parse_call_arguments(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect_delimiter(Delimiter::OpenParen)?;
        let mut arguments = Vec::new();
        self.skip_newlines();
        while !matches!(
            self.peek_token(),
            Some(Token::Delimiter(Delimiter::CloseParen))
        ) {
            arguments.push(self.parse_expression()?);
            self.skip_newlines();
            if !self.eat_delimiter(Delimiter::Comma) {
                break;
            }
            self.skip_newlines();
        }
        self.expect_delimiter(Delimiter::CloseParen)?;
        Ok(arguments)
    }

    // ── token-stream helpers ────────────────────────────────

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&TokenSpan> {
        self.tokens.get(self.pos)
    }

    fn peek_token(&self) -> Option<&Token> {
        self.peek().map(|s| &s.token)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn current_line(&self) -> usize {
        self.peek().map(|s| s.line).unwrap_or_else(|| {
            self.tokens.last().map(|s| s.line).unwrap_or(1)
        })
    }

    fn peek_is_assignment(&self) -> bool {
        matches!(
            self.tokens.get(self.pos + 1).map(|s| &s.token),
            Some(Token::Operator(Operator::Assign))
        )
    }

    fn eat_operator(&mut self, op: Operator) -> bool {
        if matches!(self.peek_token(), Some(Token::Operator(found)) if *found == op) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_delimiter(&mut self, delim: Delimiter) -> bool {
        if matches!(self.peek_token(), Some(Token::Delimiter(found)) if *found == delim) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_operator(&mut self, op: Operator) -> Result<(), ParseError> {
        if self.eat_operator(op) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("`{}`", op)))
        }
    }

    fn expect_delimiter(&mut self, delim: Delimiter) -> Result<(), ParseError> {
        if self.eat_delimiter(delim) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("`{}`", delim)))
        }
    }

    fn expect_identifier(&mut self, expected: &str) -> Result<String, ParseError> {
        match self.peek_token().cloned() {
            Some(Token::Identifier(name)) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    /// Skip newlines and semicolons between statements.
    fn skip_separators(&mut self) {
        while matches!(
            self.peek_token(),
            Some(Token::Newline) | Some(Token::Delimiter(Delimiter::Semicolon))
        ) {
            self.advance();
        }
    }

    fn skip_newlines(&mut self) {
        while matches!(self.peek_token(), Some(Token::Newline)) {
            self.advance();
        }
    }

    fn expect_statement_end(&mut self) -> Result<(), ParseError> {
        if self.at_end() {
            return Ok(());
        }
        match self.peek_token() {
            Some(Token::Newline) | Some(Token::Delimiter(Delimiter::Semicolon)) => {
                self.skip_separators();
                Ok(())
            }
            // a closing brace ends the surrounding block, not an error here
            Some(Token::Delimiter(Delimiter::CloseBrace)) => Ok(()),
            _ => Err(self.unexpected("end of statement")),
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.peek() {
            Some(span) => ParseError::UnexpectedToken {
                line: span.line,
                column: span.column,
                found: format!("{:?}", span.token),
                expected: expected.to_string(),
            },
            None => ParseError::UnexpectedEnd {
                expected: expected.to_string(),
            },
        }
    }
}

fn binary(op: BinaryOperator, left: Expr, right: Expr) -> Expr {
    Expr::BinaryOp {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> Program {
        parse_source(source).unwrap()
    }

    #[test]
    fn test_assignment_statement() {
        let program = parse("x = 1 + 2");
        assert_eq!(program.statements.len(), 1);
        assert_eq!(
            program.statements[0].kind,
            StmtKind::Assignment {
                name: "x".to_string(),
                value: Expr::BinaryOp {
                    op: BinaryOperator::Add,
                    left: Box::new(Expr::Literal(Literal::Integer(1))),
                    right: Box::new(Expr::Literal(Literal::Integer(2))),
                },
            }
        );
    }

    #[test]
    fn test_semicolon_separated_statements() {
        let program = parse("x = 1; y = 2");
        assert_eq!(program.statements.len(), 2);
        assert_eq!(program.statements[0].line, 1);
    }

    #[test]
    fn test_precedence() {
        let program = parse("r = 1 + 2 * 3");
        let StmtKind::Assignment { value, .. } = &program.statements[0].kind else {
            panic!("expected assignment");
        };
        assert_eq!(
            *value,
            Expr::BinaryOp {
                op: BinaryOperator::Add,
                left: Box::new(Expr::Literal(Literal::Integer(1))),
                right: Box::new(Expr::BinaryOp {
                    op: BinaryOperator::Multiply,
                    left: Box::new(Expr::Literal(Literal::Integer(2))),
                    right: Box::new(Expr::Literal(Literal::Integer(3))),
                }),
            }
        );
    }

    #[test]
    fn test_module_call_and_field() {
        let program = parse("r = math.sqrt(2) + math.pi");
        let StmtKind::Assignment { value, .. } = &program.statements[0].kind else {
            panic!("expected assignment");
        };
        let Expr::BinaryOp { left, right, .. } = value else {
            panic!("expected binary op");
        };
        assert_eq!(
            **left,
            Expr::ModuleCall {
                module: "math".to_string(),
                function: "sqrt".to_string(),
                arguments: vec![Expr::Literal(Literal::Integer(2))],
            }
        );
        assert_eq!(
            **right,
            Expr::Field {
                target: Box::new(Expr::Variable("math".to_string())),
                name: "pi".to_string(),
            }
        );
    }

    #[test]
    fn test_if_else_and_while() {
        let program = parse("if x > 0 { y = 1 } else { y = 2 }\nwhile true { break }");
        assert_eq!(program.statements.len(), 2);
        assert!(matches!(program.statements[0].kind, StmtKind::If { .. }));
        let StmtKind::While { body, .. } = &program.statements[1].kind else {
            panic!("expected while");
        };
        assert_eq!(body[0].kind, StmtKind::Break);
    }

    #[test]
    fn test_for_over_list_literal() {
        let program = parse("for v in [1, 2, 3] { total = total + v }");
        let StmtKind::For {
            binding, iterable, ..
        } = &program.statements[0].kind
        else {
            panic!("expected for");
        };
        assert_eq!(binding, "v");
        assert_eq!(
            *iterable,
            Expr::List(vec![
                Expr::Literal(Literal::Integer(1)),
                Expr::Literal(Literal::Integer(2)),
                Expr::Literal(Literal::Integer(3)),
            ])
        );
    }

    #[test]
    fn test_map_literal_and_index() {
        let program = parse(r#"v = {"a": 1, "b": 2}["a"]"#);
        let StmtKind::Assignment { value, .. } = &program.statements[0].kind else {
            panic!("expected assignment");
        };
        assert!(matches!(value, Expr::Index { .. }));
    }

    #[test]
    fn test_multiline_list() {
        let program = parse("xs = [\n  1,\n  2,\n]");
        assert_eq!(program.statements.len(), 1);
    }

    #[test]
    fn test_unary_minus() {
        let program = parse("x = -3 + 1");
        let StmtKind::Assignment { value, .. } = &program.statements[0].kind else {
            panic!("expected assignment");
        };
        assert!(matches!(
            value,
            Expr::BinaryOp {
                op: BinaryOperator::Add,
                ..
            }
        ));
    }

    #[test]
    fn test_error_reports_position() {
        let err = parse_source("x = = 2").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("line 1"), "got: {}", msg);
    }

    #[test]
    fn test_line_numbers_on_statements() {
        let program = parse("x = 1\n\ny = 2");
        assert_eq!(program.statements[0].line, 1);
        assert_eq!(program.statements[1].line, 3);
    }
}
