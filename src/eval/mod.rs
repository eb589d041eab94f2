//! Synchronous tree-walking evaluator.
//!
//! The whole evaluation of a snippet runs inside one blocking worker, so
//! unlike the coordinator everything here is synchronous. Statement-level
//! failures are tagged with the source line of the innermost statement.

pub mod builtins;
pub mod context;
pub mod expression;
pub mod statement;

pub use context::{EvalContext, Module, NativeFn};

use thiserror::Error;

use crate::ast::Program;
use crate::error::CrucibleResult;
use crate::parser;
use statement::{StatementEvaluator, StatementResult};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("undefined variable `{0}`")]
    UndefinedVariable(String),
    #[error("undefined function `{0}`")]
    UndefinedFunction(String),
    #[error("undefined module `{0}`")]
    UndefinedModule(String),
    #[error("`{module}` has no member `{name}`")]
    UnknownAttribute { module: String, name: String },
    #[error("no such key {0:?}")]
    KeyNotFound(String),
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: i64, len: usize },
    #[error("division by zero")]
    DivisionByZero,
    #[error("integer overflow")]
    IntegerOverflow,
    #[error("{function} expects {expected} argument(s), got {got}")]
    BadArity {
        function: String,
        expected: String,
        got: usize,
    },
    #[error("expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
    #[error("{source}\n  at line {line}")]
    At {
        line: usize,
        #[source]
        source: Box<EvalError>,
    },
}

pub type EvalResult<T> = Result<T, EvalError>;

impl EvalError {
    /// Attach a source line; the innermost statement wins.
    pub(crate) fn at(self, line: usize) -> Self {
        match self {
            EvalError::At { .. } => self,
            other => EvalError::At {
                line,
                source: Box::new(other),
            },
        }
    }
}

/// Runs one snippet against an assembled [`EvalContext`].
pub struct Interpreter {
    ctx: EvalContext,
    statements: StatementEvaluator,
}

impl Interpreter {
    pub fn new(ctx: EvalContext) -> Self {
        Self {
            ctx,
            statements: StatementEvaluator::new(),
        }
    }

    /// Tokenize, parse and evaluate a snippet as a single unit.
    pub fn run(&mut self, source: &str) -> CrucibleResult<()> {
        let program = parser::parse_source(source)?;
        self.run_program(&program)
    }

    pub fn run_program(&mut self, program: &Program) -> CrucibleResult<()> {
        for stmt in &program.statements {
            match self.statements.eval_statement(stmt, &mut self.ctx)? {
                StatementResult::Value(_) => {}
                StatementResult::Control(_) => {
                    return Err(EvalError::InvalidOperation(
                        "break or continue outside of a loop".to_string(),
                    )
                    .at(stmt.line)
                    .into());
                }
            }
        }
        Ok(())
    }

    pub fn context(&self) -> &EvalContext {
        &self.ctx
    }

    pub fn into_context(self) -> EvalContext {
        self.ctx
    }
}
