use crate::ast::{Expr, Stmt, StmtKind};
use crate::value::Value;

use super::context::EvalContext;
use super::expression::ExpressionEvaluator;
use super::{EvalError, EvalResult};

/// 文の評価結果を表す型
#[derive(Debug, Clone)]
pub enum StatementResult {
    Value(Value),
    Control(ControlFlow),
}

#[derive(Debug, Clone)]
pub enum ControlFlow {
    Break,
    Continue,
}

pub struct StatementEvaluator {
    expression_evaluator: ExpressionEvaluator,
}

impl Default for StatementEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl StatementEvaluator {
    pub fn new() -> Self {
        Self {
            expression_evaluator: ExpressionEvaluator::new(),
        }
    }

    pub fn eval_statement(
        &self,
        stmt: &Stmt,
        ctx: &mut EvalContext,
    ) -> EvalResult<StatementResult> {
        self.eval_statement_kind(&stmt.kind, ctx)
            .map_err(|e| e.at(stmt.line))
    }

    fn eval_statement_kind(
        &self,
        kind: &StmtKind,
        ctx: &mut EvalContext,
    ) -> EvalResult<StatementResult> {
        match kind {
            StmtKind::Expression(expr) => Ok(StatementResult::Value(
                self.expression_evaluator.eval_expression(expr, ctx)?,
            )),
            StmtKind::Assignment { name, value } => {
                let value = self.expression_evaluator.eval_expression(value, ctx)?;
                ctx.set_variable(name.clone(), value);
                Ok(StatementResult::Value(Value::Null))
            }
            StmtKind::If {
                condition,
                then_block,
                else_block,
            } => self.eval_if(condition, then_block, else_block.as_deref(), ctx),
            StmtKind::While { condition, body } => self.eval_while(condition, body, ctx),
            StmtKind::For {
                binding,
                iterable,
                body,
            } => self.eval_for(binding, iterable, body, ctx),
            StmtKind::Break => Ok(StatementResult::Control(ControlFlow::Break)),
            StmtKind::Continue => Ok(StatementResult::Control(ControlFlow::Continue)),
        }
    }

    fn eval_if(
        &self,
        condition: &Expr,
        then_block: &[Stmt],
        else_block: Option<&[Stmt]>,
        ctx: &mut EvalContext,
    ) -> EvalResult<StatementResult> {
        if self.eval_condition(condition, ctx)? {
            self.eval_block(then_block, ctx)
        } else if let Some(else_block) = else_block {
            self.eval_block(else_block, ctx)
        } else {
            Ok(StatementResult::Value(Value::Null))
        }
    }

    // Runaway loops are not bounded here; the engine's wall-clock timeout
    // is the only limit.
    fn eval_while(
        &self,
        condition: &Expr,
        body: &[Stmt],
        ctx: &mut EvalContext,
    ) -> EvalResult<StatementResult> {
        while self.eval_condition(condition, ctx)? {
            match self.eval_block(body, ctx)? {
                StatementResult::Control(ControlFlow::Break) => break,
                StatementResult::Control(ControlFlow::Continue) => continue,
                StatementResult::Value(_) => {}
            }
        }
        Ok(StatementResult::Value(Value::Null))
    }

    fn eval_for(
        &self,
        binding: &str,
        iterable: &Expr,
        body: &[Stmt],
        ctx: &mut EvalContext,
    ) -> EvalResult<StatementResult> {
        let iterable = self.expression_evaluator.eval_expression(iterable, ctx)?;
        let items = match iterable {
            Value::List(items) => items,
            Value::Str(s) => s.chars().map(|c| Value::Str(c.to_string())).collect(),
            other => {
                return Err(EvalError::TypeMismatch {
                    expected: "list or str".to_string(),
                    got: other.type_name().to_string(),
                })
            }
        };
        for item in items {
            ctx.set_variable(binding.to_string(), item);
            match self.eval_block(body, ctx)? {
                StatementResult::Control(ControlFlow::Break) => break,
                StatementResult::Control(ControlFlow::Continue) => continue,
                StatementResult::Value(_) => {}
            }
        }
        Ok(StatementResult::Value(Value::Null))
    }

    /// Evaluates a block; control flow escapes to the innermost loop.
    pub fn eval_block(&self, block: &[Stmt], ctx: &mut EvalContext) -> EvalResult<StatementResult> {
        let mut last = Value::Null;
        for stmt in block {
            match self.eval_statement(stmt, ctx)? {
                StatementResult::Value(value) => last = value,
                control => return Ok(control),
            }
        }
        Ok(StatementResult::Value(last))
    }

    fn eval_condition(&self, condition: &Expr, ctx: &mut EvalContext) -> EvalResult<bool> {
        let value = self.expression_evaluator.eval_expression(condition, ctx)?;
        value.is_truthy().ok_or_else(|| EvalError::TypeMismatch {
            expected: "bool".to_string(),
            got: value.type_name().to_string(),
        })
    }
}
