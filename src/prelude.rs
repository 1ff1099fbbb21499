//! A minimal base package: one function per builtin, one registration
//! call per name, against the `BuiltinFn` signature.
//!
//! Kept deliberately small: just enough (`print`, `type`, `length`,
//! `head`, `tail`, `is_error`, `seq`, `map`, `sum`, `assert`, the NA
//! family, error accessors) that the evaluator, pipeline engine, and
//! registry have something real to execute against in tests and the
//! REPL. A full tabular/statistical standard library is out of scope.

use crate::eval::BuiltinCtx;
use crate::registry::BuiltinRegistry;
use crate::value::{NaKind, Value};

pub fn register_base(registry: &mut BuiltinRegistry) {
    registry.register("print", 1, false, atom_print);
    registry.register("type", 1, false, atom_type);
    registry.register("length", 1, false, atom_length);
    registry.register("head", 1, true, atom_head);
    registry.register("tail", 1, true, atom_tail);
    registry.register("is_error", 1, false, atom_is_error);
    registry.register("seq", 2, false, atom_seq);
    registry.register("map", 2, false, atom_map);
    registry.register("sum", 1, false, atom_sum);
    registry.register("assert", 1, true, atom_assert);

    registry.register("is_na", 1, false, atom_is_na);
    registry.register("na", 0, false, atom_na);
    registry.register("na_integer", 0, false, atom_na_integer);
    registry.register("na_real", 0, false, atom_na_real);
    registry.register("na_character", 0, false, atom_na_character);
    registry.register("na_bool", 0, false, atom_na_bool);

    registry.register("error_code", 1, false, atom_error_code);
    registry.register("error_message", 1, false, atom_error_message);
}

fn positional(args: &[(Option<String>, Value)], index: usize) -> Value {
    args.get(index).map(|(_, v)| v.clone()).unwrap_or(Value::Null)
}

fn atom_print(args: Vec<(Option<String>, Value)>, _ctx: &mut BuiltinCtx) -> Result<Value, Value> {
    let v = positional(&args, 0);
    println!("{v}");
    Ok(v)
}

fn atom_type(args: Vec<(Option<String>, Value)>, _ctx: &mut BuiltinCtx) -> Result<Value, Value> {
    Ok(Value::Str(positional(&args, 0).type_name().to_string()))
}

fn atom_length(args: Vec<(Option<String>, Value)>, ctx: &mut BuiltinCtx) -> Result<Value, Value> {
    match positional(&args, 0) {
        Value::List(items) => Ok(Value::Int(items.len() as i64)),
        Value::Dict(items) => Ok(Value::Int(items.len() as i64)),
        Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
        other => Err(crate::error::type_error(
            format!("length: no method for {}", other.type_name()),
            ctx.span,
        )),
    }
}

fn atom_head(args: Vec<(Option<String>, Value)>, ctx: &mut BuiltinCtx) -> Result<Value, Value> {
    let n = match args.get(1).map(|(_, v)| v) {
        Some(Value::Int(n)) => *n as usize,
        Some(_) => return Err(crate::error::type_error("head: n must be an Int".to_string(), ctx.span)),
        None => 6,
    };
    match positional(&args, 0) {
        Value::List(items) => Ok(Value::List(items.into_iter().take(n).collect())),
        other => Err(crate::error::type_error(
            format!("head: no method for {}", other.type_name()),
            ctx.span,
        )),
    }
}

fn atom_tail(args: Vec<(Option<String>, Value)>, ctx: &mut BuiltinCtx) -> Result<Value, Value> {
    let n = match args.get(1).map(|(_, v)| v) {
        Some(Value::Int(n)) => *n as usize,
        Some(_) => return Err(crate::error::type_error("tail: n must be an Int".to_string(), ctx.span)),
        None => 6,
    };
    match positional(&args, 0) {
        Value::List(items) => {
            let skip = items.len().saturating_sub(n);
            Ok(Value::List(items.into_iter().skip(skip).collect()))
        }
        other => Err(crate::error::type_error(
            format!("tail: no method for {}", other.type_name()),
            ctx.span,
        )),
    }
}

fn atom_is_error(args: Vec<(Option<String>, Value)>, _ctx: &mut BuiltinCtx) -> Result<Value, Value> {
    Ok(Value::Bool(positional(&args, 0).is_error()))
}

fn atom_seq(args: Vec<(Option<String>, Value)>, ctx: &mut BuiltinCtx) -> Result<Value, Value> {
    let (from, to) = match (&args[0].1, &args[1].1) {
        (Value::Int(a), Value::Int(b)) => (*a, *b),
        _ => return Err(crate::error::type_error("seq: from/to must be Int".to_string(), ctx.span)),
    };
    let items: im::Vector<(Option<String>, Value)> = if from <= to {
        (from..=to).map(|n| (None, Value::Int(n))).collect()
    } else {
        (to..=from).rev().map(|n| (None, Value::Int(n))).collect()
    };
    Ok(Value::List(items))
}

fn atom_map(args: Vec<(Option<String>, Value)>, ctx: &mut BuiltinCtx) -> Result<Value, Value> {
    let list = match &args[0].1 {
        Value::List(items) => items.clone(),
        other => return Err(crate::error::type_error(
            format!("map: first argument must be a List, found {}", other.type_name()),
            ctx.span,
        )),
    };
    let f = args[1].1.clone();
    let mut out = im::Vector::new();
    for (name, v) in list {
        let mapped = ctx.call(&f, vec![v]);
        if mapped.is_error() {
            return Ok(mapped);
        }
        out.push_back((name, mapped));
    }
    Ok(Value::List(out))
}

fn atom_sum(args: Vec<(Option<String>, Value)>, ctx: &mut BuiltinCtx) -> Result<Value, Value> {
    let items = match &args[0].1 {
        Value::List(items) => items.clone(),
        other => return Err(crate::error::type_error(
            format!("sum: argument must be a List, found {}", other.type_name()),
            ctx.span,
        )),
    };
    let mut int_total: i64 = 0;
    let mut float_total: f64 = 0.0;
    let mut is_float = false;
    for (_, v) in items {
        match v {
            Value::Int(n) => int_total += n,
            Value::Float(n) => {
                is_float = true;
                float_total += n;
            }
            Value::Na(_) => return Ok(Value::Na(NaKind::Generic)),
            other => {
                return Err(crate::error::type_error(
                    format!("sum: element is not numeric, found {}", other.type_name()),
                    ctx.span,
                ))
            }
        }
    }
    if is_float {
        Ok(Value::Float(float_total + int_total as f64))
    } else {
        Ok(Value::Int(int_total))
    }
}

fn atom_assert(args: Vec<(Option<String>, Value)>, ctx: &mut BuiltinCtx) -> Result<Value, Value> {
    let cond = positional(&args, 0);
    match cond.truthy(ctx.span) {
        Ok(true) => Ok(Value::Null),
        Ok(false) => {
            let message = args
                .get(1)
                .and_then(|(_, v)| v.as_str().map(str::to_string))
                .unwrap_or_else(|| "assertion failed".to_string());
            Err(crate::error::assertion_error(message, Some(ctx.span)))
        }
        Err(e) => Err(e),
    }
}

fn atom_is_na(args: Vec<(Option<String>, Value)>, _ctx: &mut BuiltinCtx) -> Result<Value, Value> {
    Ok(Value::Bool(positional(&args, 0).is_na()))
}

fn atom_na(_args: Vec<(Option<String>, Value)>, _ctx: &mut BuiltinCtx) -> Result<Value, Value> {
    Ok(Value::Na(NaKind::Generic))
}

fn atom_na_integer(_args: Vec<(Option<String>, Value)>, _ctx: &mut BuiltinCtx) -> Result<Value, Value> {
    Ok(Value::Na(NaKind::Int))
}

fn atom_na_real(_args: Vec<(Option<String>, Value)>, _ctx: &mut BuiltinCtx) -> Result<Value, Value> {
    Ok(Value::Na(NaKind::Float))
}

fn atom_na_character(_args: Vec<(Option<String>, Value)>, _ctx: &mut BuiltinCtx) -> Result<Value, Value> {
    Ok(Value::Na(NaKind::String))
}

fn atom_na_bool(_args: Vec<(Option<String>, Value)>, _ctx: &mut BuiltinCtx) -> Result<Value, Value> {
    Ok(Value::Na(NaKind::Bool))
}

fn atom_error_code(args: Vec<(Option<String>, Value)>, ctx: &mut BuiltinCtx) -> Result<Value, Value> {
    match crate::error::code_of(&positional(&args, 0)) {
        Some(code) => Ok(Value::Str(code.as_str().to_string())),
        None => Err(crate::error::type_error("error_code: not an Error value".to_string(), ctx.span)),
    }
}

fn atom_error_message(args: Vec<(Option<String>, Value)>, ctx: &mut BuiltinCtx) -> Result<Value, Value> {
    match crate::error::message_of(&positional(&args, 0)) {
        Some(msg) => Ok(Value::Str(msg.to_string())),
        None => Err(crate::error::type_error("error_message: not an Error value".to_string(), ctx.span)),
    }
}
