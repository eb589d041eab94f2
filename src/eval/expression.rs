use std::collections::BTreeMap;

use crate::ast::{BinaryOperator, Expr, Literal, UnaryOperator};
use crate::value::Value;

use super::context::EvalContext;
use super::{EvalError, EvalResult};

pub struct ExpressionEvaluator;

impl Default for ExpressionEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpressionEvaluator {
    pub fn new() -> Self {
        Self
    }

    pub fn eval_expression(&self, expr: &Expr, ctx: &mut EvalContext) -> EvalResult<Value> {
        match expr {
            Expr::Literal(lit) => Ok(Self::eval_literal(lit)),
            Expr::Variable(name) => self.eval_variable(name, ctx),
            Expr::List(items) => {
                let mut list = Vec::with_capacity(items.len());
                for item in items {
                    list.push(self.eval_expression(item, ctx)?);
                }
                Ok(Value::List(list))
            }
            Expr::Map(entries) => {
                let mut map = BTreeMap::new();
                for (key, value) in entries {
                    map.insert(key.clone(), self.eval_expression(value, ctx)?);
                }
                Ok(Value::Map(map))
            }
            Expr::UnaryOp { op, operand } => {
                let value = self.eval_expression(operand, ctx)?;
                self.eval_unary(*op, &value)
            }
            Expr::BinaryOp { op, left, right } => {
                let left = self.eval_expression(left, ctx)?;
                let right = self.eval_expression(right, ctx)?;
                self.eval_binary_op(*op, &left, &right)
            }
            Expr::Index { target, index } => {
                let target = self.eval_expression(target, ctx)?;
                let index = self.eval_expression(index, ctx)?;
                self.eval_index(&target, &index)
            }
            Expr::FunctionCall {
                function,
                arguments,
            } => self.eval_function_call(function, arguments, ctx),
            Expr::ModuleCall {
                module,
                function,
                arguments,
            } => self.eval_module_call(module, function, arguments, ctx),
            Expr::Field { target, name } => self.eval_field(target, name, ctx),
        }
    }

    fn eval_literal(lit: &Literal) -> Value {
        match lit {
            Literal::Integer(i) => Value::Int(*i),
            Literal::Float(f) => Value::Float(*f),
            Literal::String(s) => Value::Str(s.clone()),
            Literal::Boolean(b) => Value::Bool(*b),
            Literal::Null => Value::Null,
        }
    }

    // 変数の評価
    fn eval_variable(&self, name: &str, ctx: &mut EvalContext) -> EvalResult<Value> {
        if let Some(value) = ctx.get_variable(name) {
            return Ok(value.clone());
        }
        if ctx.module(name).is_some() {
            return Err(EvalError::InvalidOperation(format!(
                "module `{}` is not a value; access members with `{}.name`",
                name, name
            )));
        }
        Err(EvalError::UndefinedVariable(name.to_string()))
    }

    /// `target.name`: key access on a map-valued expression, or a module
    /// constant when the target names an unshadowed module.
    fn eval_field(&self, target: &Expr, name: &str, ctx: &mut EvalContext) -> EvalResult<Value> {
        if let Expr::Variable(var) = target {
            // variables shadow modules
            if !ctx.has_variable(var) {
                if let Some(module) = ctx.module(var) {
                    return module.member(name);
                }
            }
        }
        let value = self.eval_expression(target, ctx)?;
        match value {
            Value::Map(entries) => entries
                .get(name)
                .cloned()
                .ok_or_else(|| EvalError::KeyNotFound(name.to_string())),
            other => Err(EvalError::TypeMismatch {
                expected: "map".to_string(),
                got: other.type_name().to_string(),
            }),
        }
    }

    fn eval_index(&self, target: &Value, index: &Value) -> EvalResult<Value> {
        match (target, index) {
            (Value::List(items), Value::Int(i)) => {
                let idx = normalize_index(*i, items.len())?;
                Ok(items[idx].clone())
            }
            (Value::Str(s), Value::Int(i)) => {
                let chars: Vec<char> = s.chars().collect();
                let idx = normalize_index(*i, chars.len())?;
                Ok(Value::Str(chars[idx].to_string()))
            }
            (Value::Map(entries), Value::Str(key)) => entries
                .get(key)
                .cloned()
                .ok_or_else(|| EvalError::KeyNotFound(key.clone())),
            (target, index) => Err(EvalError::InvalidOperation(format!(
                "cannot index {} with {}",
                target.type_name(),
                index.type_name()
            ))),
        }
    }

    // 関数呼び出しの評価
    fn eval_function_call(
        &self,
        function: &str,
        arguments: &[Expr],
        ctx: &mut EvalContext,
    ) -> EvalResult<Value> {
        let mut evaluated = Vec::with_capacity(arguments.len());
        for arg in arguments {
            evaluated.push(self.eval_expression(arg, ctx)?);
        }
        let func = ctx
            .builtin(function)
            .ok_or_else(|| EvalError::UndefinedFunction(function.to_string()))?;
        func(ctx, evaluated)
    }

    fn eval_module_call(
        &self,
        module: &str,
        function: &str,
        arguments: &[Expr],
        ctx: &mut EvalContext,
    ) -> EvalResult<Value> {
        let mut evaluated = Vec::with_capacity(arguments.len());
        for arg in arguments {
            evaluated.push(self.eval_expression(arg, ctx)?);
        }
        if ctx.has_variable(module) {
            return Err(EvalError::InvalidOperation(format!(
                "`{}` is a variable here and has no function `{}`",
                module, function
            )));
        }
        let func = ctx
            .module(module)
            .ok_or_else(|| EvalError::UndefinedModule(module.to_string()))?
            .function(function)
            .ok_or_else(|| EvalError::UnknownAttribute {
                module: module.to_string(),
                name: function.to_string(),
            })?;
        func(ctx, evaluated)
    }

    fn eval_unary(&self, op: UnaryOperator, value: &Value) -> EvalResult<Value> {
        match (op, value) {
            (UnaryOperator::Negate, Value::Int(i)) => i
                .checked_neg()
                .map(Value::Int)
                .ok_or(EvalError::IntegerOverflow),
            (UnaryOperator::Negate, Value::Float(f)) => Ok(Value::Float(-f)),
            (UnaryOperator::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
            (op, value) => Err(EvalError::InvalidOperation(format!(
                "{:?} {}",
                op,
                value.type_name()
            ))),
        }
    }

    // 二項演算の評価
    fn eval_binary_op(&self, op: BinaryOperator, left: &Value, right: &Value) -> EvalResult<Value> {
        match op {
            BinaryOperator::Add => self.eval_add(left, right),
            BinaryOperator::Subtract => self.eval_subtract(left, right),
            BinaryOperator::Multiply => self.eval_multiply(left, right),
            BinaryOperator::Divide => self.eval_divide(left, right),
            BinaryOperator::Modulo => self.eval_modulo(left, right),
            BinaryOperator::Equal => Ok(Value::Bool(left == right)),
            BinaryOperator::NotEqual => Ok(Value::Bool(left != right)),
            BinaryOperator::LessThan => self.compare_values(left, right, |o| o.is_lt()),
            BinaryOperator::GreaterThan => self.compare_values(left, right, |o| o.is_gt()),
            BinaryOperator::LessThanEqual => self.compare_values(left, right, |o| o.is_le()),
            BinaryOperator::GreaterThanEqual => self.compare_values(left, right, |o| o.is_ge()),
            BinaryOperator::And => self.eval_and(left, right),
            BinaryOperator::Or => self.eval_or(left, right),
        }
    }

    fn eval_add(&self, left: &Value, right: &Value) -> EvalResult<Value> {
        match (left, right) {
            (Value::Int(l), Value::Int(r)) => l
                .checked_add(*r)
                .map(Value::Int)
                .ok_or(EvalError::IntegerOverflow),
            (Value::Float(l), Value::Float(r)) => Ok(Value::Float(l + r)),
            (Value::Int(l), Value::Float(r)) => Ok(Value::Float(*l as f64 + r)),
            (Value::Float(l), Value::Int(r)) => Ok(Value::Float(l + *r as f64)),
            (Value::Str(l), Value::Str(r)) => Ok(Value::Str(l.clone() + r)),
            (Value::List(l), Value::List(r)) => {
                let mut joined = l.clone();
                joined.extend(r.iter().cloned());
                Ok(Value::List(joined))
            }
            _ => Err(self.type_error("+", left, right)),
        }
    }

    fn eval_subtract(&self, left: &Value, right: &Value) -> EvalResult<Value> {
        match (left, right) {
            (Value::Int(l), Value::Int(r)) => l
                .checked_sub(*r)
                .map(Value::Int)
                .ok_or(EvalError::IntegerOverflow),
            (Value::Float(l), Value::Float(r)) => Ok(Value::Float(l - r)),
            (Value::Int(l), Value::Float(r)) => Ok(Value::Float(*l as f64 - r)),
            (Value::Float(l), Value::Int(r)) => Ok(Value::Float(l - *r as f64)),
            _ => Err(self.type_error("-", left, right)),
        }
    }

    fn eval_multiply(&self, left: &Value, right: &Value) -> EvalResult<Value> {
        match (left, right) {
            (Value::Int(l), Value::Int(r)) => l
                .checked_mul(*r)
                .map(Value::Int)
                .ok_or(EvalError::IntegerOverflow),
            (Value::Float(l), Value::Float(r)) => Ok(Value::Float(l * r)),
            (Value::Int(l), Value::Float(r)) => Ok(Value::Float(*l as f64 * r)),
            (Value::Float(l), Value::Int(r)) => Ok(Value::Float(l * *r as f64)),
            _ => Err(self.type_error("*", left, right)),
        }
    }

    // Integer division yields a float, like the other dynamic languages
    // this engine hosts snippets for.
    fn eval_divide(&self, left: &Value, right: &Value) -> EvalResult<Value> {
        match (left, right) {
            (Value::Int(l), Value::Int(r)) => {
                if *r == 0 {
                    return Err(EvalError::DivisionByZero);
                }
                Ok(Value::Float(*l as f64 / *r as f64))
            }
            (Value::Float(l), Value::Float(r)) => Ok(Value::Float(l / r)),
            (Value::Int(l), Value::Float(r)) => Ok(Value::Float(*l as f64 / r)),
            (Value::Float(l), Value::Int(r)) => Ok(Value::Float(l / *r as f64)),
            _ => Err(self.type_error("/", left, right)),
        }
    }

    fn eval_modulo(&self, left: &Value, right: &Value) -> EvalResult<Value> {
        match (left, right) {
            (Value::Int(l), Value::Int(r)) => {
                if *r == 0 {
                    return Err(EvalError::DivisionByZero);
                }
                Ok(Value::Int(l.rem_euclid(*r)))
            }
            (Value::Float(l), Value::Float(r)) => Ok(Value::Float(l % r)),
            (Value::Int(l), Value::Float(r)) => Ok(Value::Float(*l as f64 % r)),
            (Value::Float(l), Value::Int(r)) => Ok(Value::Float(l % *r as f64)),
            _ => Err(self.type_error("%", left, right)),
        }
    }

    fn eval_and(&self, left: &Value, right: &Value) -> EvalResult<Value> {
        match (left, right) {
            (Value::Bool(l), Value::Bool(r)) => Ok(Value::Bool(*l && *r)),
            _ => Err(self.type_error("&&", left, right)),
        }
    }

    fn eval_or(&self, left: &Value, right: &Value) -> EvalResult<Value> {
        match (left, right) {
            (Value::Bool(l), Value::Bool(r)) => Ok(Value::Bool(*l || *r)),
            _ => Err(self.type_error("||", left, right)),
        }
    }

    // ヘルパーメソッド

    fn compare_values<F>(&self, left: &Value, right: &Value, compare: F) -> EvalResult<Value>
    where
        F: Fn(std::cmp::Ordering) -> bool,
    {
        let ordering = match (left, right) {
            (Value::Int(l), Value::Int(r)) => l.cmp(r),
            (Value::Str(l), Value::Str(r)) => l.cmp(r),
            (l, r) => match (l.as_number(), r.as_number()) {
                (Some(l), Some(r)) => l
                    .partial_cmp(&r)
                    .ok_or(EvalError::InvalidOperation("NaN comparison".to_string()))?,
                _ => return Err(self.type_error("<=>", left, right)),
            },
        };
        Ok(Value::Bool(compare(ordering)))
    }

    fn type_error(&self, op: &str, left: &Value, right: &Value) -> EvalError {
        EvalError::InvalidOperation(format!(
            "{} {} {}",
            left.type_name(),
            op,
            right.type_name()
        ))
    }
}

fn normalize_index(index: i64, len: usize) -> EvalResult<usize> {
    let idx = if index < 0 {
        index + len as i64
    } else {
        index
    };
    if idx < 0 || idx as usize >= len {
        return Err(EvalError::IndexOutOfRange { index, len });
    }
    Ok(idx as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::Module;
    use std::sync::{Arc, Mutex};

    fn setup_context() -> EvalContext {
        EvalContext::new(Arc::new(Mutex::new(String::new())))
    }

    fn eval(expr: &Expr, ctx: &mut EvalContext) -> EvalResult<Value> {
        ExpressionEvaluator::new().eval_expression(expr, ctx)
    }

    fn int(i: i64) -> Expr {
        Expr::Literal(Literal::Integer(i))
    }

    #[test]
    fn test_literal_evaluation() {
        let mut ctx = setup_context();
        assert_eq!(eval(&int(42), &mut ctx).unwrap(), Value::Int(42));
        assert_eq!(
            eval(&Expr::Literal(Literal::Float(3.5)), &mut ctx).unwrap(),
            Value::Float(3.5)
        );
        assert_eq!(
            eval(&Expr::Literal(Literal::Null), &mut ctx).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn test_variable_evaluation() {
        let mut ctx = setup_context();
        ctx.set_variable("x", Value::Int(42));
        assert_eq!(
            eval(&Expr::Variable("x".to_string()), &mut ctx).unwrap(),
            Value::Int(42)
        );
        assert!(matches!(
            eval(&Expr::Variable("missing".to_string()), &mut ctx),
            Err(EvalError::UndefinedVariable(_))
        ));
    }

    #[test]
    fn test_arithmetic() {
        let mut ctx = setup_context();
        let expr = Expr::BinaryOp {
            op: BinaryOperator::Add,
            left: Box::new(int(5)),
            right: Box::new(int(3)),
        };
        assert_eq!(eval(&expr, &mut ctx).unwrap(), Value::Int(8));

        // mixed int/float promotes to float
        let expr = Expr::BinaryOp {
            op: BinaryOperator::Add,
            left: Box::new(int(5)),
            right: Box::new(Expr::Literal(Literal::Float(3.5))),
        };
        assert_eq!(eval(&expr, &mut ctx).unwrap(), Value::Float(8.5));

        // int division yields float
        let expr = Expr::BinaryOp {
            op: BinaryOperator::Divide,
            left: Box::new(int(5)),
            right: Box::new(int(2)),
        };
        assert_eq!(eval(&expr, &mut ctx).unwrap(), Value::Float(2.5));
    }

    #[test]
    fn test_division_by_zero() {
        let mut ctx = setup_context();
        let expr = Expr::BinaryOp {
            op: BinaryOperator::Divide,
            left: Box::new(int(1)),
            right: Box::new(int(0)),
        };
        assert_eq!(eval(&expr, &mut ctx), Err(EvalError::DivisionByZero));
    }

    #[test]
    fn test_string_concat_and_compare() {
        let mut ctx = setup_context();
        let expr = Expr::BinaryOp {
            op: BinaryOperator::Add,
            left: Box::new(Expr::Literal(Literal::String("Hello ".to_string()))),
            right: Box::new(Expr::Literal(Literal::String("World".to_string()))),
        };
        assert_eq!(
            eval(&expr, &mut ctx).unwrap(),
            Value::Str("Hello World".to_string())
        );

        let expr = Expr::BinaryOp {
            op: BinaryOperator::LessThan,
            left: Box::new(Expr::Literal(Literal::String("a".to_string()))),
            right: Box::new(Expr::Literal(Literal::String("b".to_string()))),
        };
        assert_eq!(eval(&expr, &mut ctx).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_index_access() {
        let mut ctx = setup_context();
        ctx.set_variable(
            "xs",
            Value::List(vec![Value::Int(10), Value::Int(20), Value::Int(30)]),
        );
        let expr = Expr::Index {
            target: Box::new(Expr::Variable("xs".to_string())),
            index: Box::new(int(-1)),
        };
        assert_eq!(eval(&expr, &mut ctx).unwrap(), Value::Int(30));

        let expr = Expr::Index {
            target: Box::new(Expr::Variable("xs".to_string())),
            index: Box::new(int(3)),
        };
        assert!(matches!(
            eval(&expr, &mut ctx),
            Err(EvalError::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn test_module_const_and_shadowing() {
        let mut ctx = setup_context();
        ctx.add_module(Module::new("math").with_const("pi", Value::Float(std::f64::consts::PI)));

        let expr = Expr::Field {
            target: Box::new(Expr::Variable("math".to_string())),
            name: "pi".to_string(),
        };
        assert_eq!(
            eval(&expr, &mut ctx).unwrap(),
            Value::Float(std::f64::consts::PI)
        );

        // a variable shadows the module
        let mut shadow = BTreeMap::new();
        shadow.insert("pi".to_string(), Value::Int(3));
        ctx.set_variable("math", Value::Map(shadow));
        assert_eq!(eval(&expr, &mut ctx).unwrap(), Value::Int(3));
    }

    #[test]
    fn test_unknown_function() {
        let mut ctx = setup_context();
        let expr = Expr::FunctionCall {
            function: "nope".to_string(),
            arguments: vec![],
        };
        assert!(matches!(
            eval(&expr, &mut ctx),
            Err(EvalError::UndefinedFunction(_))
        ));
    }
}
