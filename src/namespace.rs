//! Per-invocation environment assembly.
//!
//! Builds the evaluation context a snippet runs against: auto-loaded
//! modules from the registry, the two injected analysis helpers, and the
//! caller's persisted variables. Modules are bound before variables, so
//! a persisted variable shadows a module of the same name.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::config::EngineConfig;
use crate::eval::builtins::{arity, as_table, quick_stats};
use crate::eval::{EvalContext, EvalError, EvalResult, Module};
use crate::value::Value;

pub struct NamespaceBuilder<'a> {
    config: &'a EngineConfig,
}

impl<'a> NamespaceBuilder<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Assembles a fresh context. Unknown auto-load names are skipped
    /// rather than failing the request; convenience imports degrade
    /// gracefully.
    pub fn build(
        &self,
        persisted: &HashMap<String, Value>,
        output: Arc<Mutex<String>>,
    ) -> EvalContext {
        let mut ctx = EvalContext::new(output);
        for name in self.config.auto_load_modules() {
            match module_by_name(&name) {
                Some(module) => ctx.add_module(module),
                None => debug!(module = %name, "skipping unknown auto-load module"),
            }
        }
        ctx.register_builtin("quick_stats", quick_stats);
        ctx.register_builtin("as_table", as_table);
        for (name, value) in persisted {
            ctx.set_variable(name.clone(), value.clone());
        }
        ctx
    }
}

fn module_by_name(name: &str) -> Option<Module> {
    match name {
        "math" => Some(math_module()),
        "strings" => Some(strings_module()),
        "seq" => Some(seq_module()),
        _ => None,
    }
}

fn number_arg(function: &str, value: &Value) -> EvalResult<f64> {
    value.as_number().ok_or_else(|| EvalError::TypeMismatch {
        expected: format!("number argument to {}", function),
        got: value.type_name().to_string(),
    })
}

fn str_arg(function: &str, value: &Value) -> EvalResult<String> {
    match value {
        Value::Str(s) => Ok(s.clone()),
        other => Err(EvalError::TypeMismatch {
            expected: format!("str argument to {}", function),
            got: other.type_name().to_string(),
        }),
    }
}

fn list_arg(function: &str, value: &Value) -> EvalResult<Vec<Value>> {
    match value {
        Value::List(items) => Ok(items.clone()),
        other => Err(EvalError::TypeMismatch {
            expected: format!("list argument to {}", function),
            got: other.type_name().to_string(),
        }),
    }
}

fn math_module() -> Module {
    Module::new("math")
        .with_const("pi", Value::Float(std::f64::consts::PI))
        .with_const("e", Value::Float(std::f64::consts::E))
        .with_func("abs", |_, args| {
            arity("math.abs", "1", args.len() == 1, args.len())?;
            match &args[0] {
                Value::Int(i) => i
                    .checked_abs()
                    .map(Value::Int)
                    .ok_or(EvalError::IntegerOverflow),
                Value::Float(f) => Ok(Value::Float(f.abs())),
                other => Err(EvalError::TypeMismatch {
                    expected: "number argument to math.abs".to_string(),
                    got: other.type_name().to_string(),
                }),
            }
        })
        .with_func("sqrt", |_, args| {
            arity("math.sqrt", "1", args.len() == 1, args.len())?;
            Ok(Value::Float(number_arg("math.sqrt", &args[0])?.sqrt()))
        })
        .with_func("floor", |_, args| {
            arity("math.floor", "1", args.len() == 1, args.len())?;
            Ok(Value::Int(number_arg("math.floor", &args[0])?.floor() as i64))
        })
        .with_func("ceil", |_, args| {
            arity("math.ceil", "1", args.len() == 1, args.len())?;
            Ok(Value::Int(number_arg("math.ceil", &args[0])?.ceil() as i64))
        })
        .with_func("pow", |_, args| {
            arity("math.pow", "2", args.len() == 2, args.len())?;
            let base = number_arg("math.pow", &args[0])?;
            let exp = number_arg("math.pow", &args[1])?;
            Ok(Value::Float(base.powf(exp)))
        })
}

fn strings_module() -> Module {
    Module::new("strings")
        .with_func("upper", |_, args| {
            arity("strings.upper", "1", args.len() == 1, args.len())?;
            Ok(Value::Str(str_arg("strings.upper", &args[0])?.to_uppercase()))
        })
        .with_func("lower", |_, args| {
            arity("strings.lower", "1", args.len() == 1, args.len())?;
            Ok(Value::Str(str_arg("strings.lower", &args[0])?.to_lowercase()))
        })
        .with_func("trim", |_, args| {
            arity("strings.trim", "1", args.len() == 1, args.len())?;
            Ok(Value::Str(
                str_arg("strings.trim", &args[0])?.trim().to_string(),
            ))
        })
        .with_func("split", |_, args| {
            arity("strings.split", "2", args.len() == 2, args.len())?;
            let text = str_arg("strings.split", &args[0])?;
            let sep = str_arg("strings.split", &args[1])?;
            Ok(Value::List(
                text.split(sep.as_str())
                    .map(|part| Value::Str(part.to_string()))
                    .collect(),
            ))
        })
        .with_func("join", |_, args| {
            arity("strings.join", "2", args.len() == 2, args.len())?;
            let items = list_arg("strings.join", &args[0])?;
            let sep = str_arg("strings.join", &args[1])?;
            let parts: Vec<String> = items.iter().map(Value::to_string).collect();
            Ok(Value::Str(parts.join(&sep)))
        })
        .with_func("contains", |_, args| {
            arity("strings.contains", "2", args.len() == 2, args.len())?;
            let text = str_arg("strings.contains", &args[0])?;
            let needle = str_arg("strings.contains", &args[1])?;
            Ok(Value::Bool(text.contains(needle.as_str())))
        })
        .with_func("replace", |_, args| {
            arity("strings.replace", "3", args.len() == 3, args.len())?;
            let text = str_arg("strings.replace", &args[0])?;
            let from = str_arg("strings.replace", &args[1])?;
            let to = str_arg("strings.replace", &args[2])?;
            Ok(Value::Str(text.replace(from.as_str(), to.as_str())))
        })
}

fn sort_values(function: &str, mut items: Vec<Value>) -> EvalResult<Vec<Value>> {
    if items.iter().all(|v| v.as_number().is_some()) {
        items.sort_by(|a, b| {
            let (a, b) = (
                a.as_number().unwrap_or(f64::NAN),
                b.as_number().unwrap_or(f64::NAN),
            );
            a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal)
        });
        return Ok(items);
    }
    if items.iter().all(|v| matches!(v, Value::Str(_))) {
        items.sort_by(|a, b| a.to_string().cmp(&b.to_string()));
        return Ok(items);
    }
    Err(EvalError::TypeMismatch {
        expected: format!("list of numbers or list of strings for {}", function),
        got: "mixed list".to_string(),
    })
}

fn seq_module() -> Module {
    Module::new("seq")
        .with_func("sort", |_, args| {
            arity("seq.sort", "1", args.len() == 1, args.len())?;
            Ok(Value::List(sort_values(
                "seq.sort",
                list_arg("seq.sort", &args[0])?,
            )?))
        })
        .with_func("reverse", |_, args| {
            arity("seq.reverse", "1", args.len() == 1, args.len())?;
            let mut items = list_arg("seq.reverse", &args[0])?;
            items.reverse();
            Ok(Value::List(items))
        })
        .with_func("min", |_, args| {
            arity("seq.min", "1", args.len() == 1, args.len())?;
            let sorted = sort_values("seq.min", list_arg("seq.min", &args[0])?)?;
            sorted.into_iter().next().ok_or_else(|| {
                EvalError::InvalidOperation("seq.min of an empty list".to_string())
            })
        })
        .with_func("max", |_, args| {
            arity("seq.max", "1", args.len() == 1, args.len())?;
            let sorted = sort_values("seq.max", list_arg("seq.max", &args[0])?)?;
            sorted.into_iter().next_back().ok_or_else(|| {
                EvalError::InvalidOperation("seq.max of an empty list".to_string())
            })
        })
        .with_func("sum", |_, args| {
            arity("seq.sum", "1", args.len() == 1, args.len())?;
            let items = list_arg("seq.sum", &args[0])?;
            let mut total = 0.0;
            let mut all_int = true;
            for item in &items {
                total += number_arg("seq.sum", item)?;
                all_int &= matches!(item, Value::Int(_));
            }
            if all_int {
                Ok(Value::Int(total as i64))
            } else {
                Ok(Value::Float(total))
            }
        })
        .with_func("unique", |_, args| {
            arity("seq.unique", "1", args.len() == 1, args.len())?;
            let items = list_arg("seq.unique", &args[0])?;
            let mut seen: Vec<Value> = Vec::new();
            for item in items {
                if !seen.contains(&item) {
                    seen.push(item);
                }
            }
            Ok(Value::List(seen))
        })
}
