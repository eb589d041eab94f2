//! Sandboxed, stateful snippet-execution engine.
//!
//! Untrusted snippet source is scanned against a denylist, evaluated on
//! a blocking worker under a wall-clock timeout, and rendered into a
//! single text report. Selected variables persist per caller across
//! invocations.
//!
//! ```no_run
//! use crucible::{CallContext, Engine, EngineConfig};
//!
//! # async fn demo() {
//! let engine = Engine::new(EngineConfig::default());
//! let ctx = CallContext::for_caller("alice");
//! let report = engine.run("x = 40 + 2\nprint(x)", "x", &ctx).await;
//! println!("{report}");
//! # }
//! ```

pub mod ast;
pub mod config;
pub mod engine;
pub mod error;
pub mod eval;
pub mod namespace;
pub mod parser;
pub mod response;
pub mod store;
pub mod tokenizer;
pub mod validator;
pub mod value;

// Re-exports
pub use config::EngineConfig;
pub use engine::{CallContext, Engine, ExecFailure, ExecReport, Phase, ProgressSink, ProgressUpdate};
pub use error::{CrucibleError, CrucibleResult};
pub use store::{StateStore, VarSnapshot, ANONYMOUS_CALLER};
pub use value::Value;
