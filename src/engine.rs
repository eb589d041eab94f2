//! Request coordination: validation, namespace assembly, worker dispatch
//! with a wall-clock timeout, persistence and counter bookkeeping.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use strum_macros::{Display, EnumString};
use tokio::task;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use crate::config::EngineConfig;
use crate::eval::Interpreter;
use crate::namespace::NamespaceBuilder;
use crate::response;
use crate::store::{StateStore, ANONYMOUS_CALLER};
use crate::validator;

/// Lifecycle stage reported to a progress sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Phase {
    Validating,
    Running,
    Blocked,
    Done,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub phase: Phase,
    pub finished: bool,
}

/// Receiver for ordered status events at request transition points.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn notify(&self, update: ProgressUpdate);
}

/// Explicit per-call context: caller identity and an optional progress
/// sink. Absent identity falls back to the anonymous key.
#[derive(Clone, Default)]
pub struct CallContext {
    pub caller: Option<String>,
    pub progress: Option<Arc<dyn ProgressSink>>,
}

impl CallContext {
    pub fn for_caller(caller: impl Into<String>) -> Self {
        Self {
            caller: Some(caller.into()),
            progress: None,
        }
    }

    pub fn caller_key(&self) -> &str {
        self.caller.as_deref().unwrap_or(ANONYMOUS_CALLER)
    }

    async fn notify(&self, phase: Phase, finished: bool) {
        if let Some(sink) = &self.progress {
            sink.notify(ProgressUpdate { phase, finished }).await;
        }
    }
}

/// Terminal failure of one execution attempt. Exactly one channel is
/// populated per invocation; absence signals success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecFailure {
    /// Denylist entries found by the static validator; execution never
    /// started.
    Validation(Vec<String>),
    /// The coordinator's wait elapsed. The worker itself is not stopped.
    Timeout(Duration),
    /// The snippet raised during tokenizing, parsing or evaluation.
    Runtime(String),
}

impl fmt::Display for ExecFailure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ExecFailure::Validation(matches) => {
                write!(f, "Sandbox violation: blocked pattern(s) {}", matches.join(", "))
            }
            ExecFailure::Timeout(bound) => {
                write!(f, "Timed out after {}s", bound.as_secs())
            }
            ExecFailure::Runtime(diagnostic) => write!(f, "{}", diagnostic),
        }
    }
}

/// Outcome of one execution attempt, fully computed before rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecReport {
    pub output: String,
    pub failure: Option<ExecFailure>,
    pub saved: Vec<String>,
    pub elapsed: Duration,
    pub count: u64,
}

pub struct Engine {
    config: EngineConfig,
    store: StateStore,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            store: StateStore::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs one snippet for the caller and returns the raw report.
    ///
    /// `save_vars` is a comma-separated list of variable names to copy
    /// into the caller's persistent namespace after the attempt.
    #[instrument(skip(self, code, ctx), fields(caller = %ctx.caller_key()))]
    pub async fn execute(&self, code: &str, save_vars: &str, ctx: &CallContext) -> ExecReport {
        let caller = ctx.caller_key().to_string();
        let start = Instant::now();

        ctx.notify(Phase::Validating, false).await;
        let matches = validator::scan(code, &self.config);
        if !matches.is_empty() {
            warn!(matches = ?matches, "snippet blocked by sandbox");
            ctx.notify(Phase::Blocked, true).await;
            // blocked before any attempt; the counter stays untouched
            return ExecReport {
                output: String::new(),
                failure: Some(ExecFailure::Validation(matches)),
                saved: Vec::new(),
                elapsed: start.elapsed(),
                count: self.store.get_counter(&caller),
            };
        }

        ctx.notify(Phase::Running, false).await;
        let persisted = self.store.get_or_create_namespace(&caller);
        let output = Arc::new(Mutex::new(String::new()));
        let eval_ctx = NamespaceBuilder::new(&self.config).build(&persisted, output.clone());

        let source = code.to_string();
        let worker = task::spawn_blocking(move || {
            let mut interp = Interpreter::new(eval_ctx);
            let outcome = interp.run(&source);
            // the post-failure namespace is returned too, so variables
            // bound before a raise remain persistable
            let vars = interp.into_context().into_vars();
            (outcome.err().map(|e| e.diagnostic()), vars)
        });

        let requested = split_names(save_vars);
        let (failure, saved) = match timeout(self.config.max_execution_time(), worker).await {
            Err(_) => {
                warn!(bound = self.config.max_execution_secs, "snippet timed out");
                (
                    Some(ExecFailure::Timeout(self.config.max_execution_time())),
                    Vec::new(),
                )
            }
            Ok(Err(join_error)) => (
                Some(ExecFailure::Runtime(format!(
                    "RuntimeError: worker panicked: {}",
                    join_error
                ))),
                Vec::new(),
            ),
            Ok(Ok((diagnostic, vars))) => {
                let saved = self.store.persist(&caller, &requested, &vars);
                (diagnostic.map(ExecFailure::Runtime), saved)
            }
        };
        let elapsed = start.elapsed();
        let count = self.store.increment_counter(&caller);

        let captured = match output.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };

        match &failure {
            None => {
                info!(count, ?elapsed, "execution finished");
                ctx.notify(Phase::Done, true).await;
            }
            Some(failure) => {
                debug!(%failure, count, "execution failed");
                ctx.notify(Phase::Error, true).await;
            }
        }

        ExecReport {
            output: captured,
            failure,
            saved,
            elapsed,
            count,
        }
    }

    /// Executes and renders the formatted report in one step.
    pub async fn run(&self, code: &str, save_vars: &str, ctx: &CallContext) -> String {
        let report = self.execute(code, save_vars, ctx).await;
        let show_timing = self.store.show_timing(ctx.caller_key());
        response::render(&report, self.config.max_output_chars, show_timing)
    }

    /// Read-only snapshot of the caller's persisted variables, rendered
    /// as a fixed-width table.
    pub fn view_state(&self, ctx: &CallContext) -> String {
        response::render_snapshot(&self.store.snapshot(ctx.caller_key()))
    }

    /// Clears the caller's variables and counter; returns the number of
    /// variables removed.
    pub fn reset(&self, ctx: &CallContext) -> usize {
        let removed = self.store.reset(ctx.caller_key());
        info!(caller = %ctx.caller_key(), removed, "state reset");
        removed
    }

    /// Formatted counterpart to [`Engine::reset`].
    pub fn clear(&self, ctx: &CallContext) -> String {
        let removed = self.reset(ctx);
        format!("Cleared {} saved variable(s) and reset the counter.", removed)
    }

    pub fn set_show_timing(&self, ctx: &CallContext, show: bool) {
        self.store.set_show_timing(ctx.caller_key(), show);
    }
}

fn split_names(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_failure_display() {
        let validation = ExecFailure::Validation(vec!["os.".to_string(), "exec(".to_string()]);
        assert_eq!(
            validation.to_string(),
            "Sandbox violation: blocked pattern(s) os., exec("
        );
        let timed_out = ExecFailure::Timeout(Duration::from_secs(30));
        assert_eq!(timed_out.to_string(), "Timed out after 30s");
    }

    #[test]
    fn test_phase_serialization() {
        assert_eq!(Phase::Validating.to_string(), "validating");
        assert_eq!(Phase::Blocked.to_string(), "blocked");
        assert_eq!("error".parse::<Phase>().unwrap(), Phase::Error);
    }

    #[test]
    fn test_split_names() {
        assert_eq!(split_names("x, y ,"), vec!["x".to_string(), "y".to_string()]);
        assert!(split_names("").is_empty());
    }

    #[test]
    fn test_anonymous_fallback() {
        let ctx = CallContext::default();
        assert_eq!(ctx.caller_key(), ANONYMOUS_CALLER);
        let ctx = CallContext::for_caller("alice");
        assert_eq!(ctx.caller_key(), "alice");
    }
}
