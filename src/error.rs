use thiserror::Error;

use crate::config::ConfigError;
use crate::eval::EvalError;
use crate::parser::ParseError;
use crate::tokenizer::TokenizeError;

#[derive(Error, Debug)]
pub enum CrucibleError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Tokenize error: {0}")]
    Tokenize(#[from] TokenizeError),
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("Eval error: {0}")]
    Eval(#[from] EvalError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type CrucibleResult<T> = Result<T, CrucibleError>;

impl CrucibleError {
    pub fn internal<S: Into<String>>(message: S) -> Self {
        CrucibleError::Internal(message.into())
    }

    /// Caller-facing diagnostic for a failed snippet. Tokenize and parse
    /// failures happen before any statement runs but are still reported
    /// through the runtime-error channel.
    pub fn diagnostic(&self) -> String {
        match self {
            CrucibleError::Tokenize(e) => format!("SyntaxError: {}", e),
            CrucibleError::Parse(e) => format!("SyntaxError: {}", e),
            CrucibleError::Eval(e) => format!("RuntimeError: {}", e),
            other => format!("InternalError: {}", other),
        }
    }
}
