//! Builtin functions available to every snippet.
//!
//! `print`, `len`, `range`, `str` and `type` are core language builtins
//! installed by [`EvalContext::new`]. The two analysis helpers
//! `quick_stats` and `as_table` are injected by the namespace builder.

use std::collections::BTreeMap;

use crate::value::Value;

use super::context::EvalContext;
use super::{EvalError, EvalResult};

pub fn install_core(ctx: &mut EvalContext) {
    ctx.register_builtin("print", print);
    ctx.register_builtin("len", len);
    ctx.register_builtin("range", range);
    ctx.register_builtin("str", str_);
    ctx.register_builtin("type", type_);
}

pub(crate) fn arity(function: &str, expected: &str, ok: bool, got: usize) -> EvalResult<()> {
    if ok {
        Ok(())
    } else {
        Err(EvalError::BadArity {
            function: function.to_string(),
            expected: expected.to_string(),
            got,
        })
    }
}

fn print(ctx: &mut EvalContext, args: Vec<Value>) -> EvalResult<Value> {
    let parts: Vec<String> = args.iter().map(Value::to_string).collect();
    ctx.write_output(&parts.join(" "));
    ctx.write_output("\n");
    Ok(Value::Null)
}

fn len(_ctx: &mut EvalContext, args: Vec<Value>) -> EvalResult<Value> {
    arity("len", "1", args.len() == 1, args.len())?;
    match &args[0] {
        Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
        Value::List(items) => Ok(Value::Int(items.len() as i64)),
        Value::Map(entries) => Ok(Value::Int(entries.len() as i64)),
        other => Err(EvalError::TypeMismatch {
            expected: "str, list or map".to_string(),
            got: other.type_name().to_string(),
        }),
    }
}

fn range(_ctx: &mut EvalContext, args: Vec<Value>) -> EvalResult<Value> {
    arity("range", "1 or 2", (1..=2).contains(&args.len()), args.len())?;
    let bound = |v: &Value| match v {
        Value::Int(i) => Ok(*i),
        other => Err(EvalError::TypeMismatch {
            expected: "int".to_string(),
            got: other.type_name().to_string(),
        }),
    };
    let (start, end) = if args.len() == 1 {
        (0, bound(&args[0])?)
    } else {
        (bound(&args[0])?, bound(&args[1])?)
    };
    Ok(Value::List((start..end).map(Value::Int).collect()))
}

fn str_(_ctx: &mut EvalContext, args: Vec<Value>) -> EvalResult<Value> {
    arity("str", "1", args.len() == 1, args.len())?;
    Ok(Value::Str(args[0].to_string()))
}

fn type_(_ctx: &mut EvalContext, args: Vec<Value>) -> EvalResult<Value> {
    arity("type", "1", args.len() == 1, args.len())?;
    Ok(Value::Str(args[0].type_name().to_string()))
}

/// `quick_stats(numbers)`: count, sum, mean, min, max and median of a
/// number list as a map. An empty input yields an empty map.
pub fn quick_stats(_ctx: &mut EvalContext, args: Vec<Value>) -> EvalResult<Value> {
    arity("quick_stats", "1", args.len() == 1, args.len())?;
    let Value::List(items) = &args[0] else {
        return Err(EvalError::TypeMismatch {
            expected: "list of numbers".to_string(),
            got: args[0].type_name().to_string(),
        });
    };
    if items.is_empty() {
        return Ok(Value::Map(BTreeMap::new()));
    }

    let mut sorted = items.clone();
    for item in &sorted {
        if item.as_number().is_none() {
            return Err(EvalError::TypeMismatch {
                expected: "list of numbers".to_string(),
                got: item.type_name().to_string(),
            });
        }
    }
    sorted.sort_by(|a, b| {
        let (a, b) = (a.as_number().unwrap_or(f64::NAN), b.as_number().unwrap_or(f64::NAN));
        a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal)
    });

    let n = sorted.len();
    let all_int = sorted.iter().all(|v| matches!(v, Value::Int(_)));
    let total: f64 = sorted.iter().filter_map(Value::as_number).sum();

    let sum = if all_int {
        Value::Int(total as i64)
    } else {
        Value::Float(total)
    };
    // standard even/odd averaging rule
    let median = if n % 2 == 1 {
        sorted[n / 2].clone()
    } else {
        let lower = sorted[n / 2 - 1].as_number().unwrap_or(f64::NAN);
        let upper = sorted[n / 2].as_number().unwrap_or(f64::NAN);
        Value::Float((lower + upper) / 2.0)
    };

    let mut stats = BTreeMap::new();
    stats.insert("count".to_string(), Value::Int(n as i64));
    stats.insert("sum".to_string(), sum);
    stats.insert("mean".to_string(), Value::Float(total / n as f64));
    stats.insert("min".to_string(), sorted[0].clone());
    stats.insert("max".to_string(), sorted[n - 1].clone());
    stats.insert("median".to_string(), median);
    Ok(Value::Map(stats))
}

/// `as_table(rows[, title])`: fixed-width table from a list of maps,
/// written to the captured output and returned. Empty input yields the
/// literal `(empty)` marker.
pub fn as_table(ctx: &mut EvalContext, args: Vec<Value>) -> EvalResult<Value> {
    arity("as_table", "1 or 2", (1..=2).contains(&args.len()), args.len())?;
    let Value::List(rows) = &args[0] else {
        return Err(EvalError::TypeMismatch {
            expected: "list of maps".to_string(),
            got: args[0].type_name().to_string(),
        });
    };
    let title = match args.get(1) {
        None => String::new(),
        Some(Value::Str(s)) => s.clone(),
        Some(other) => {
            return Err(EvalError::TypeMismatch {
                expected: "str title".to_string(),
                got: other.type_name().to_string(),
            })
        }
    };

    if rows.is_empty() {
        return Ok(Value::Str("(empty)".to_string()));
    }

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        match row {
            Value::Map(entries) => records.push(entries),
            other => {
                return Err(EvalError::TypeMismatch {
                    expected: "list of maps".to_string(),
                    got: other.type_name().to_string(),
                })
            }
        }
    }

    // column order comes from the first record's (sorted) keys
    let headers: Vec<&String> = records[0].keys().collect();
    let cell = |record: &BTreeMap<String, Value>, header: &str| {
        record.get(header).map(Value::to_string).unwrap_or_default()
    };
    let widths: Vec<usize> = headers
        .iter()
        .map(|h| {
            records
                .iter()
                .map(|r| cell(r, h).chars().count())
                .chain([h.chars().count()])
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut lines = Vec::new();
    if !title.is_empty() {
        lines.push(format!("**{}**", title));
        lines.push(String::new());
    }
    let format_row = |cells: Vec<String>| {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<width$}", c, width = w))
            .collect();
        format!("| {} |", padded.join(" | "))
    };
    lines.push(format_row(headers.iter().map(|h| h.to_string()).collect()));
    lines.push(format_row(widths.iter().map(|w| "-".repeat(*w)).collect()));
    for record in &records {
        lines.push(format_row(headers.iter().map(|h| cell(record, h)).collect()));
    }

    let table = lines.join("\n");
    ctx.write_output(&table);
    ctx.write_output("\n");
    Ok(Value::Str(table))
}
