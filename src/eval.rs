//! The evaluator. Exposes `eval_expr`, `eval_call`, and
//! `eval_program`. Mutual recursion between expression evaluation, call
//! dispatch, and pipeline (re-)execution is kept inside this one module,
//! with [`crate::pipeline`] supplying the dependency-ordering algorithm
//! through a callback rather than calling back into this module directly.

use crate::ast::{Arg, BinOp, Expr, Program, Span, Stmt, UnOp};
use crate::diagnostics::DiagnosticSink;
use crate::env::Env;
use crate::error::{self, ErrorCode};
use crate::nse;
use crate::pipeline::{self, PipelineResult};
use crate::registry::{Builtin, BuiltinRegistry};
use crate::value::{FormulaDef, LambdaDef, Value};

/// Threaded through every recursive call: the builtin table and the
/// diagnostic sink the `:=` overwrite warning is written to.
pub struct EvalCtx<'a> {
    pub registry: &'a BuiltinRegistry,
    pub diagnostics: &'a mut dyn DiagnosticSink,
}

impl<'a> EvalCtx<'a> {
    pub fn new(registry: &'a BuiltinRegistry, diagnostics: &'a mut dyn DiagnosticSink) -> Self {
        Self {
            registry,
            diagnostics,
        }
    }
}

/// The "(named args, mutable env handle)" a builtin's native function
/// receives. `env` is the environment active at the call
/// site, needed only for the rare unbound-lambda dispatch case; builtins
/// otherwise reach the evaluator exclusively through [`BuiltinCtx::call`].
pub struct BuiltinCtx<'a, 'b> {
    pub env: &'a Env,
    pub eval: &'a mut EvalCtx<'b>,
    pub span: Span,
}

impl<'a, 'b> BuiltinCtx<'a, 'b> {
    /// The evaluator callback higher-order builtins (`map`, `filter`,
    /// `summarize`, ...) use to invoke a callable argument.
    pub fn call(&mut self, callable: &Value, args: Vec<Value>) -> Value {
        let named = args.into_iter().map(|v| (None, v)).collect();
        dispatch_call(self.env, callable.clone(), named, self.eval, self.span)
    }
}

// ---------------------------------------------------------------------
// Top-level program evaluation
// ---------------------------------------------------------------------

/// `eval_program(program, env) -> (last_value, final_env)`.
pub fn eval_program(program: &Program, env: Env, ctx: &mut EvalCtx) -> (Value, Env) {
    let mut env = env;
    let mut last = Value::Null;
    for stmt in program {
        let (value, next_env) = eval_stmt(&env, stmt, ctx);
        last = value;
        env = next_env;
    }
    (last, env)
}

fn eval_stmt(env: &Env, stmt: &Stmt, ctx: &mut EvalCtx) -> (Value, Env) {
    match stmt {
        Stmt::FirstAssign { name, value, .. } => {
            let v = eval_expr(env, value, ctx);
            if v.is_error() {
                return (v, env.clone());
            }
            match env.first_assign(name, v) {
                Ok(next) => {
                    let bound = next.find(name).cloned().unwrap_or(Value::Null);
                    (bound, next)
                }
                Err(e) => (e, env.clone()),
            }
        }
        Stmt::Overwrite { name, value, .. } => {
            let v = eval_expr(env, value, ctx);
            if v.is_error() {
                return (v, env.clone());
            }
            match env.overwrite(name, v) {
                Ok(next) => {
                    ctx.diagnostics
                        .warn(&format!("overwrote variable '{name}'"), Some(stmt.span()));
                    let bound = next.find(name).cloned().unwrap_or(Value::Null);
                    (bound, next)
                }
                Err(e) => (e, env.clone()),
            }
        }
        Stmt::Expr(expr) => (eval_expr(env, expr, ctx), env.clone()),
        Stmt::Import(..) => (Value::Null, env.clone()),
    }
}

/// Evaluates a block's statements in a local environment derived from
/// `env`; the outer `env` is never returned.
fn eval_block(env: &Env, stmts: &[Stmt], ctx: &mut EvalCtx) -> Value {
    let mut local = env.clone();
    let mut last = Value::Null;
    for stmt in stmts {
        let (value, next) = eval_stmt(&local, stmt, ctx);
        if value.is_error() {
            return value;
        }
        last = value;
        local = next;
    }
    last
}

// ---------------------------------------------------------------------
// Expression evaluation
// ---------------------------------------------------------------------

pub fn eval_expr(env: &Env, expr: &Expr, ctx: &mut EvalCtx) -> Value {
    match expr {
        Expr::Int(n, _) => Value::Int(*n),
        Expr::Float(n, _) => Value::Float(*n),
        Expr::Str(s, _) => Value::Str(s.clone()),
        Expr::Bool(b, _) => Value::Bool(*b),
        Expr::Null(_) => Value::Null,
        Expr::Na(_) => Value::Na(crate::value::NaKind::Generic),

        // Free variable: an environment binding, a registered builtin,
        // or else a fallback Symbol -- not an error; the fallback is what
        // makes NSE possible, and falling through to the registry is what
        // lets a bare builtin name evaluate to a callable `Value::Builtin`
        // instead of bottoming out as an unresolved Symbol at every call
        // site.
        Expr::Var(name, _) => env
            .find(name)
            .cloned()
            .or_else(|| ctx.registry.get(name).map(Value::Builtin))
            .unwrap_or_else(|| Value::Symbol(name.clone())),

        Expr::Column(name, _) => Value::Symbol(format!("${name}")),

        Expr::Unary { op, operand, span } => eval_unary(env, *op, operand, *span, ctx),

        Expr::Binary {
            op,
            broadcast,
            lhs,
            rhs,
            span,
        } => eval_binary(env, *op, *broadcast, lhs, rhs, *span, ctx),

        Expr::Pipe {
            unconditional,
            left,
            right,
            span,
        } => eval_pipe(env, *unconditional, left, right, *span, ctx),

        Expr::Formula { lhs, rhs, span } => eval_formula(lhs, rhs, *span),

        Expr::Call { callee, args, span } => {
            let callee_val = eval_expr(env, callee, ctx);
            eval_call(env, callee_val, args, *span, ctx)
        }

        Expr::Lambda {
            params,
            return_type,
            generics,
            variadic,
            body,
            ..
        } => Value::Lambda(std::rc::Rc::new(LambdaDef {
            params: params.clone(),
            return_type: return_type.clone(),
            generics: generics.clone(),
            variadic: *variadic,
            body: (**body).clone(),
            env: Some(env.clone()),
        })),

        Expr::If {
            cond,
            then_branch,
            else_branch,
            span,
        } => {
            let c = eval_expr(env, cond, ctx);
            if c.is_error() {
                return c;
            }
            match c.truthy(*span) {
                Ok(true) => eval_expr(env, then_branch, ctx),
                Ok(false) => eval_expr(env, else_branch, ctx),
                Err(e) => e,
            }
        }

        Expr::List(items, _) => {
            let mut out = im::Vector::new();
            for item in items {
                let v = eval_expr(env, &item.value, ctx);
                if v.is_error() {
                    return v;
                }
                out.push_back((item.name.clone(), v));
            }
            Value::List(out)
        }

        Expr::Dict(items, _) => {
            let mut out = im::Vector::new();
            for (k, v_expr) in items {
                let v = eval_expr(env, v_expr, ctx);
                if v.is_error() {
                    return v;
                }
                out.push_back((k.clone(), v));
            }
            Value::Dict(out)
        }

        Expr::Comprehension {
            element,
            var,
            source,
            cond,
            span,
        } => eval_comprehension(env, element, var, source, cond.as_deref(), *span, ctx),

        Expr::Dot { target, field, span } => {
            let v = eval_expr(env, target, ctx);
            eval_dot(v, field, *span)
        }

        Expr::Block(stmts, _) => eval_block(env, stmts, ctx),

        Expr::Pipeline(nodes, span) => eval_pipeline_def(env, nodes, *span, ctx),

        Expr::Intent(fields, span) => eval_intent(env, fields, *span, ctx),
    }
}

fn eval_unary(env: &Env, op: UnOp, operand: &Expr, span: Span, ctx: &mut EvalCtx) -> Value {
    let v = eval_expr(env, operand, ctx);
    if v.is_error() {
        return v;
    }
    if v.is_na() {
        return error::type_error(format!("cannot apply unary operator to {}", v.type_name()), span);
    }
    match (op, &v) {
        (UnOp::Not, _) => match v.truthy(span) {
            Ok(b) => Value::Bool(!b),
            Err(e) => e,
        },
        (UnOp::Neg, Value::Int(n)) => Value::Int(-n),
        (UnOp::Neg, Value::Float(n)) => Value::Float(-n),
        (UnOp::Neg, _) => error::type_error(format!("cannot negate {}", v.type_name()), span),
    }
}

fn op_symbol(op: BinOp, broadcast: bool) -> String {
    let base = match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::Mod => "%",
        BinOp::Eq => "==",
        BinOp::Ne => "!=",
        BinOp::Lt => "<",
        BinOp::Gt => ">",
        BinOp::Le => "<=",
        BinOp::Ge => ">=",
        BinOp::And => "and",
        BinOp::Or => "or",
        BinOp::BitAnd => "&",
        BinOp::BitOr => "|",
        BinOp::In => "in",
    };
    if broadcast {
        format!(".{base}")
    } else {
        base.to_string()
    }
}

fn eval_binary(
    env: &Env,
    op: BinOp,
    broadcast: bool,
    lhs: &Expr,
    rhs: &Expr,
    span: Span,
    ctx: &mut EvalCtx,
) -> Value {
    let l = eval_expr(env, lhs, ctx);
    let r = eval_expr(env, rhs, ctx);

    // Binary ops never propagate an operand error verbatim: a fresh
    // TypeError makes the failing operation visible.
    if l.is_error() || r.is_error() {
        return error::type_error(
            format!(
                "cannot apply '{}' to {} and {}",
                op_symbol(op, broadcast),
                l.type_name(),
                r.type_name()
            ),
            span,
        );
    }
    if l.is_na() || r.is_na() {
        return error::type_error(
            format!("NA is not a valid operand to '{}'", op_symbol(op, broadcast)),
            span,
        );
    }

    if broadcast {
        return error::value_error(
            format!(
                "broadcast operator '{}' has no vector-math backend registered",
                op_symbol(op, broadcast)
            ),
            Some(span),
        );
    }

    apply_binop(op, l, r, span)
}

fn numeric_promote(l: &Value, r: &Value) -> Option<(f64, f64, bool)> {
    match (l, r) {
        (Value::Int(a), Value::Int(b)) => Some((*a as f64, *b as f64, true)),
        (Value::Float(a), Value::Float(b)) => Some((*a, *b, false)),
        (Value::Int(a), Value::Float(b)) => Some((*a as f64, *b, false)),
        (Value::Float(a), Value::Int(b)) => Some((*a, *b as f64, false)),
        _ => None,
    }
}

fn apply_binop(op: BinOp, l: Value, r: Value, span: Span) -> Value {
    match op {
        BinOp::Add => match (&l, &r) {
            (Value::Str(a), Value::Str(b)) => Value::Str(format!("{a}{b}")),
            _ => match numeric_promote(&l, &r) {
                Some((a, b, both_int)) if both_int => Value::Int(a as i64 + b as i64),
                Some((a, b, _)) => Value::Float(a + b),
                None => type_err_binop(op, &l, &r, span),
            },
        },
        BinOp::Sub => match numeric_promote(&l, &r) {
            Some((a, b, true)) => Value::Int(a as i64 - b as i64),
            Some((a, b, false)) => Value::Float(a - b),
            None => type_err_binop(op, &l, &r, span),
        },
        BinOp::Mul => match numeric_promote(&l, &r) {
            Some((a, b, true)) => Value::Int(a as i64 * b as i64),
            Some((a, b, false)) => Value::Float(a * b),
            None => type_err_binop(op, &l, &r, span),
        },
        BinOp::Div => match numeric_promote(&l, &r) {
            Some((_, b, _)) if b == 0.0 => error::division_by_zero(span),
            Some((a, b, _)) => Value::Float(a / b),
            None => type_err_binop(op, &l, &r, span),
        },
        BinOp::Mod => match (&l, &r) {
            (Value::Int(a), Value::Int(b)) => {
                if *b == 0 {
                    error::division_by_zero(span)
                } else {
                    Value::Int(a.rem_euclid(*b))
                }
            }
            _ => match numeric_promote(&l, &r) {
                Some((_, b, _)) if b == 0.0 => error::division_by_zero(span),
                Some((a, b, _)) => Value::Float(a.rem_euclid(b)),
                None => type_err_binop(op, &l, &r, span),
            },
        },
        BinOp::Eq => Value::Bool(l == r),
        BinOp::Ne => Value::Bool(l != r),
        BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge => eval_order(op, &l, &r, span),
        BinOp::And => match (l.truthy(span), r.truthy(span)) {
            (Ok(a), Ok(b)) => Value::Bool(a && b),
            (Err(e), _) | (_, Err(e)) => e,
        },
        BinOp::Or => match (l.truthy(span), r.truthy(span)) {
            (Ok(a), Ok(b)) => Value::Bool(a || b),
            (Err(e), _) | (_, Err(e)) => e,
        },
        BinOp::BitAnd => match (&l, &r) {
            (Value::Bool(a), Value::Bool(b)) => Value::Bool(*a && *b),
            (Value::Int(a), Value::Int(b)) => Value::Int(a & b),
            _ => type_err_binop(op, &l, &r, span),
        },
        BinOp::BitOr => match (&l, &r) {
            (Value::Bool(a), Value::Bool(b)) => Value::Bool(*a || *b),
            (Value::Int(a), Value::Int(b)) => Value::Int(a | b),
            _ => type_err_binop(op, &l, &r, span),
        },
        BinOp::In => eval_in(&l, &r, span),
    }
}

fn type_err_binop(op: BinOp, l: &Value, r: &Value, span: Span) -> Value {
    error::type_error(
        format!(
            "cannot apply '{}' to {} and {}",
            op_symbol(op, false),
            l.type_name(),
            r.type_name()
        ),
        span,
    )
}

fn eval_order(op: BinOp, l: &Value, r: &Value, span: Span) -> Value {
    use std::cmp::Ordering;
    let ordering = if let Some((a, b, _)) = numeric_promote(l, r) {
        a.partial_cmp(&b)
    } else {
        match (l, r) {
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b).into()),
            (Value::Bool(a), Value::Bool(b)) => Some((*a as u8).cmp(&(*b as u8)).into()),
            _ => None,
        }
    };
    let Some(ord) = ordering else {
        return error::type_error(
            format!("cannot compare {} and {}", l.type_name(), r.type_name()),
            span,
        );
    };
    Value::Bool(match op {
        BinOp::Lt => ord == Ordering::Less,
        BinOp::Gt => ord == Ordering::Greater,
        BinOp::Le => ord != Ordering::Greater,
        BinOp::Ge => ord != Ordering::Less,
        _ => unreachable!(),
    })
}

fn eval_in(needle: &Value, haystack: &Value, span: Span) -> Value {
    match haystack {
        Value::List(items) => Value::Bool(items.iter().any(|(_, v)| v == needle)),
        Value::Dict(items) => match needle {
            Value::Str(key) => Value::Bool(items.iter().any(|(k, _)| k == key)),
            _ => Value::Bool(false),
        },
        _ => error::type_error(
            format!("'in' requires a List or Dict, found {}", haystack.type_name()),
            span,
        ),
    }
}

fn eval_pipe(env: &Env, unconditional: bool, left: &Expr, right: &Expr, span: Span, ctx: &mut EvalCtx) -> Value {
    let l = eval_expr(env, left, ctx);
    if l.is_error() && !unconditional {
        // `|>` short-circuits on a left-hand error.
        return l;
    }

    // `x |> f(args)` dispatches `f` with `x` prepended as the first
    // positional argument; otherwise the right side is evaluated as a
    // callable and invoked with `x` as the sole argument.
    if let Expr::Call { callee, args, span: call_span } = right {
        let callee_val = eval_expr(env, callee, ctx);
        let mut evaluated: Vec<(Option<String>, Value)> = Vec::with_capacity(args.len() + 1);
        evaluated.push((None, l));
        for raw in args {
            let rewritten = nse::rewrite_arg(raw);
            let v = eval_expr(env, rewritten.expr(), ctx);
            evaluated.push((arg_name(&rewritten), v));
        }
        return dispatch_call(env, callee_val, evaluated, ctx, *call_span);
    }

    let callee_val = eval_expr(env, right, ctx);
    dispatch_call(env, callee_val, vec![(None, l)], ctx, span)
}

fn eval_formula(lhs: &Expr, rhs: &Expr, _span: Span) -> Value {
    let response = formula_vars(lhs);
    let predictors = formula_vars(rhs);
    Value::Formula(std::rc::Rc::new(FormulaDef {
        response,
        predictors,
        lhs: lhs.clone(),
        rhs: rhs.clone(),
    }))
}

/// Walks a `+` tree of bare names, skipping the intercept literal `1`.
fn formula_vars(expr: &Expr) -> Vec<String> {
    let mut out = Vec::new();
    fn walk(expr: &Expr, out: &mut Vec<String>) {
        match expr {
            Expr::Binary {
                op: BinOp::Add,
                lhs,
                rhs,
                ..
            } => {
                walk(lhs, out);
                walk(rhs, out);
            }
            Expr::Var(name, _) => out.push(name.clone()),
            Expr::Int(1, _) => {}
            _ => {}
        }
    }
    walk(expr, &mut out);
    out
}

fn eval_comprehension(
    env: &Env,
    element: &Expr,
    var: &str,
    source: &Expr,
    cond: Option<&Expr>,
    span: Span,
    ctx: &mut EvalCtx,
) -> Value {
    let src = eval_expr(env, source, ctx);
    if src.is_error() {
        return src;
    }
    let items: Vec<Value> = match &src {
        Value::List(items) => items.iter().map(|(_, v)| v.clone()).collect(),
        _ => {
            return error::type_error(
                format!("list comprehension source must be a List, found {}", src.type_name()),
                span,
            )
        }
    };
    let mut out = im::Vector::new();
    for item in items {
        let local = env.bind(var, item);
        if let Some(c) = cond {
            let keep = eval_expr(&local, c, ctx);
            if keep.is_error() {
                return keep;
            }
            match keep.truthy(span) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => return e,
            }
        }
        let v = eval_expr(&local, element, ctx);
        if v.is_error() {
            return v;
        }
        out.push_back((None, v));
    }
    Value::List(out)
}

fn eval_intent(env: &Env, fields: &[crate::ast::IntentField], span: Span, ctx: &mut EvalCtx) -> Value {
    let mut out = im::Vector::new();
    for field in fields {
        let v = eval_expr(env, &field.value, ctx);
        if v.is_error() {
            return v;
        }
        if v.is_na() {
            return error::type_error("intent field cannot be NA".to_string(), span);
        }
        let s = match &v {
            Value::Str(s) => s.clone(),
            other => other.to_string(),
        };
        out.push_back((field.key.clone(), s));
    }
    Value::Intent(out)
}

// ---------------------------------------------------------------------
// Dot access
// ---------------------------------------------------------------------

const PARTIAL_DICT_KEY: &str = "__partial_dot_dict__";
const PARTIAL_DF_KEY: &str = "__partial_dot_df__";
const PARTIAL_PREFIX_KEY: &str = "__partial_dot_prefix__";

fn dict_get<'a>(items: &'a crate::value::ValueDict, key: &str) -> Option<&'a Value> {
    items.iter().find(|(k, _)| k == key).map(|(_, v)| v)
}

fn make_partial_dict_carrier(base: Value, prefix: String) -> Value {
    let mut out = im::Vector::new();
    out.push_back((PARTIAL_DICT_KEY.to_string(), base));
    out.push_back((PARTIAL_PREFIX_KEY.to_string(), Value::Str(prefix)));
    Value::Dict(out)
}

fn make_partial_df_carrier(df: Value, prefix: String) -> Value {
    let mut out = im::Vector::new();
    out.push_back((PARTIAL_DF_KEY.to_string(), df));
    out.push_back((PARTIAL_PREFIX_KEY.to_string(), Value::Str(prefix)));
    Value::Dict(out)
}

pub fn eval_dot(value: Value, field: &str, span: Span) -> Value {
    match value {
        Value::Error(_) => value,
        Value::Na(_) => error::type_error("cannot access a field of NA".to_string(), span),

        Value::Dict(items) => {
            if let Some(v) = dict_get(&items, field) {
                return v.clone();
            }
            // Partial-prefix carrier for a previous hop.
            if let (Some(base), Some(Value::Str(prefix))) = (
                dict_get(&items, PARTIAL_DICT_KEY),
                dict_get(&items, PARTIAL_PREFIX_KEY),
            ) {
                let new_prefix = format!("{prefix}.{field}");
                return resolve_dict_prefix(base.clone(), new_prefix, span);
            }
            if let (Some(df), Some(Value::Str(prefix))) = (
                dict_get(&items, PARTIAL_DF_KEY),
                dict_get(&items, PARTIAL_PREFIX_KEY),
            ) {
                let new_prefix = format!("{prefix}.{field}");
                return resolve_df_prefix(df.clone(), new_prefix, span);
            }
            resolve_dict_prefix(Value::Dict(items), field.to_string(), span)
        }

        Value::List(items) => items
            .iter()
            .find(|(name, _)| name.as_deref() == Some(field))
            .map(|(_, v)| v.clone())
            .unwrap_or_else(|| error::key_error(format!("no field '{field}' in list"), Some(span))),

        Value::DataFrame(handle, keys) => {
            resolve_df_prefix(Value::DataFrame(handle, keys), field.to_string(), span)
        }

        Value::Pipeline(result) => result
            .get(field)
            .cloned()
            .unwrap_or_else(|| error::key_error(format!("no pipeline node named '{field}'"), Some(span))),

        other => error::type_error(
            format!("cannot access field '{field}' on {}", other.type_name()),
            span,
        ),
    }
}

fn resolve_dict_prefix(base: Value, prefix: String, span: Span) -> Value {
    let Value::Dict(items) = &base else {
        return error::type_error("partial-prefix carrier lost its base dict".to_string(), span);
    };
    if let Some(v) = dict_get(items, &prefix) {
        return v.clone();
    }
    let has_more = items.iter().any(|(k, _)| k.starts_with(&format!("{prefix}.")));
    if has_more {
        return make_partial_dict_carrier(base, prefix);
    }
    error::key_error(format!("no key '{prefix}'"), Some(span))
}

fn resolve_df_prefix(base: Value, prefix: String, span: Span) -> Value {
    let Value::DataFrame(handle, _) = &base else {
        return error::type_error("partial-prefix carrier lost its base dataframe".to_string(), span);
    };
    if let Some(col) = handle.column(&prefix) {
        return col;
    }
    if handle.has_compound_prefix(&prefix) {
        return make_partial_df_carrier(base, prefix);
    }
    error::key_error(format!("no column '{prefix}'"), Some(span))
}

// ---------------------------------------------------------------------
// Call dispatch
// ---------------------------------------------------------------------

fn arg_name(arg: &Arg) -> Option<String> {
    match arg {
        Arg::Positional(_) => None,
        Arg::Named(n, _) => Some(n.clone()),
        Arg::DotNamed(n, _) => Some(format!(".{n}")),
        Arg::ColumnNamed(n, _) => Some(format!("${n}")),
    }
}

/// `eval_call(env, callee_value, raw_args) -> value`.
/// Applies NSE rewriting to every argument expression
/// before evaluating and dispatching.
pub fn eval_call(env: &Env, callee: Value, raw_args: &[Arg], span: Span, ctx: &mut EvalCtx) -> Value {
    let mut evaluated = Vec::with_capacity(raw_args.len());
    for raw in raw_args {
        let rewritten = nse::rewrite_arg(raw);
        let v = eval_expr(env, rewritten.expr(), ctx);
        evaluated.push((arg_name(&rewritten), v));
    }
    dispatch_call(env, callee, evaluated, ctx, span)
}

/// Dispatches an already-evaluated callee against already-evaluated
/// arguments.
pub fn dispatch_call(
    env: &Env,
    callee: Value,
    args: Vec<(Option<String>, Value)>,
    ctx: &mut EvalCtx,
    span: Span,
) -> Value {
    match callee {
        Value::Builtin(b) => call_builtin(env, &b, args, ctx, span),
        Value::Lambda(l) => call_lambda(env, &l, args, ctx, span),
        Value::Symbol(name) => {
            let resolved = env
                .find(&name)
                .cloned()
                .or_else(|| ctx.registry.get(&name).map(Value::Builtin));
            match resolved {
                Some(resolved) => dispatch_call(env, resolved, args, ctx, span),
                None => {
                    let mut candidates = env.names();
                    candidates.extend(ctx.registry.names());
                    error::name_error_unresolved(&name, &candidates, Some(span))
                }
            }
        }
        Value::Error(_) | Value::Na(_) => {
            error::type_error("cannot call Error/NA as a function".to_string(), span)
        }
        other => error::type_error(
            format!("cannot call {} as a function", other.type_name()),
            span,
        ),
    }
}

fn call_builtin(
    env: &Env,
    b: &Builtin,
    args: Vec<(Option<String>, Value)>,
    ctx: &mut EvalCtx,
    span: Span,
) -> Value {
    let ok_arity = if b.variadic {
        args.len() >= b.arity
    } else {
        args.len() == b.arity
    };
    if !ok_arity {
        return error::arity_error(
            format!(
                "'{}' expects {}{} argument(s), got {}",
                b.name,
                if b.variadic { "at least " } else { "" },
                b.arity,
                args.len()
            ),
            span,
        );
    }
    let mut bctx = BuiltinCtx { env, eval: ctx, span };
    match (b.func)(args, &mut bctx) {
        Ok(v) => v,
        Err(e) => e,
    }
}

fn call_lambda(
    caller_env: &Env,
    l: &LambdaDef,
    args: Vec<(Option<String>, Value)>,
    ctx: &mut EvalCtx,
    span: Span,
) -> Value {
    // An unbound lambda (no captured env) runs against the caller's
    // environment, not a blank one — it behaves like a closure that
    // happens to capture whatever is in scope at the call site.
    let base_env = l.env.clone().unwrap_or_else(|| caller_env.clone());
    let ok_arity = if l.variadic {
        args.len() + 1 >= l.params.len()
    } else {
        args.len() == l.params.len()
    };
    if !ok_arity {
        let names: Vec<&str> = l.params.iter().map(|p| p.name.as_str()).collect();
        return error::arity_error(
            format!(
                "lambda expects parameters ({}), got {} argument(s)",
                names.join(", "),
                args.len()
            ),
            span,
        );
    }

    let mut call_env = base_env;
    let fixed = if l.variadic { l.params.len() - 1 } else { l.params.len() };
    for (i, param) in l.params.iter().take(fixed).enumerate() {
        let value = args.get(i).map(|(_, v)| v.clone()).unwrap_or(Value::Null);
        call_env = call_env.bind(&param.name, value);
    }
    if l.variadic {
        let rest: im::Vector<(Option<String>, Value)> = args[fixed.min(args.len())..]
            .iter()
            .map(|(_, v)| (None, v.clone()))
            .collect();
        if let Some(last) = l.params.last() {
            call_env = call_env.bind(&last.name, Value::List(rest));
        }
    }

    eval_expr(&call_env, &l.body, ctx)
}

// ---------------------------------------------------------------------
// Pipeline definitions
// ---------------------------------------------------------------------

fn eval_pipeline_def(env: &Env, nodes: &[crate::ast::PipelineNode], span: Span, ctx: &mut EvalCtx) -> Value {
    let mut local = env.clone();
    let result = pipeline::build_pipeline(
        nodes,
        |name| env.find(name).cloned(),
        |name, expr| {
            let v = eval_expr(&local, expr, ctx);
            if !v.is_error() {
                local = local.bind(name, v.clone());
            }
            Ok(v)
        },
    );
    match result {
        Ok(r) => Value::Pipeline(std::rc::Rc::new(r)),
        Err(e) => set_span(e, span),
    }
}

fn set_span(value: Value, span: Span) -> Value {
    match value {
        Value::Error(mut e) => {
            if e.span.is_none() {
                e.span = Some(span);
            }
            Value::Error(e)
        }
        other => other,
    }
}

/// `pipeline_run(prev)`: dirty nodes are
/// re-evaluated against `env`, clean nodes reuse their cached value.
pub fn pipeline_run(prev: &PipelineResult, env: &Env, ctx: &mut EvalCtx) -> Value {
    let mut local = env.clone();
    let result = pipeline::rerun_pipeline(
        prev,
        |name| env.find(name).cloned(),
        |name, expr| {
            let v = eval_expr(&local, expr, ctx);
            if !v.is_error() {
                local = local.bind(name, v.clone());
            }
            Ok(v)
        },
    );
    match result {
        Ok(r) => Value::Pipeline(std::rc::Rc::new(r)),
        Err(e) => e,
    }
}

pub fn error_code(value: &Value) -> Option<ErrorCode> {
    error::code_of(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Span;
    use crate::diagnostics::{NullSink, VecSink};

    fn parse_and_eval(src: &str) -> Value {
        let program = crate::parser::parse(src).unwrap();
        let registry = BuiltinRegistry::new();
        let mut sink = NullSink;
        let mut ctx = EvalCtx::new(&registry, &mut sink);
        let (value, _) = eval_program(&program, Env::new(), &mut ctx);
        value
    }

    #[test]
    fn pipe_inserts_left_as_the_first_argument() {
        assert_eq!(parse_and_eval("5 |> \\(x) x * 2"), Value::Int(10));
    }

    #[test]
    fn error_on_pipe_left_short_circuits_without_invoking_right() {
        let v = parse_and_eval("(1 / 0) |> \\(x) x + 1");
        assert_eq!(error::code_of(&v), Some(ErrorCode::DivisionByZero));
    }

    #[test]
    fn rebinding_an_already_assigned_name_is_a_name_error() {
        let v = parse_and_eval("x = 1\nx = 2");
        assert_eq!(error::code_of(&v), Some(ErrorCode::NameError));
    }

    #[test]
    fn overwrite_emits_exactly_one_warning() {
        let program = crate::parser::parse("x = 1\nx := 2\nx").unwrap();
        let registry = BuiltinRegistry::new();
        let mut sink = VecSink::new();
        let mut ctx = EvalCtx::new(&registry, &mut sink);
        let (value, _) = eval_program(&program, Env::new(), &mut ctx);
        assert_eq!(value, Value::Int(2));
        assert_eq!(sink.warnings.len(), 1);
    }

    #[test]
    fn pipeline_nodes_resolve_regardless_of_declaration_order() {
        let v = parse_and_eval("p = pipeline { a = 1; c = a + b; b = 2 }\np.c");
        assert_eq!(v, Value::Int(3));
    }

    #[test]
    fn pipeline_with_a_dependency_cycle_is_a_value_error() {
        let v = parse_and_eval("pipeline { a = b; b = a }");
        assert_eq!(error::code_of(&v), Some(ErrorCode::ValueError));
    }

    #[test]
    fn na_plus_int_is_a_type_error() {
        let v = parse_and_eval("NA + 1");
        assert_eq!(error::code_of(&v), Some(ErrorCode::TypeError));
    }

    #[test]
    fn block_value_does_not_leak_its_binding_to_the_outer_scope() {
        let v = parse_and_eval("{ x = 1; x + 2 }\nx");
        assert_eq!(error::code_of(&v), None);
        // `x` at top level is a fallback Symbol, not the block's binding.
        assert_eq!(v, Value::Symbol("x".to_string()));
    }

    #[test]
    fn closure_captures_a_snapshot_of_its_defining_environment() {
        let v = parse_and_eval("make = \\(n) \\(x) x + n\nf = make(10)\nn = 99\nf(1)");
        assert_eq!(v, Value::Int(11));
    }

    #[test]
    fn division_always_yields_float() {
        assert_eq!(parse_and_eval("4 / 2"), Value::Float(2.0));
    }

    #[test]
    fn binary_op_error_operand_yields_fresh_type_error_not_original() {
        let v = parse_and_eval("(1/0) + 1");
        match &v {
            Value::Error(e) => {
                assert_eq!(e.code, ErrorCode::TypeError);
                assert!(!e.message.contains("division by zero"));
            }
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[test]
    fn dot_access_on_dict() {
        let v = parse_and_eval("d = [x: 1, y: 2]\nd.x");
        assert_eq!(v, Value::Int(1));
    }

    #[test]
    fn dot_access_partial_prefix_on_dict() {
        let v = parse_and_eval("d = [`Petal.Length`: 5]\nd.Petal.Length");
        assert_eq!(v, Value::Int(5));
    }

    #[test]
    fn unconditional_pipe_forwards_error() {
        let program = crate::parser::parse("(1 / 0) ?|> f(x: 1)").unwrap();
        // `?|>` still dispatches a call; without a registered `f` builtin
        // the callee resolves to an unbound Symbol NameError, but the
        // crucial behavior under test is that the division-by-zero error
        // was not short-circuited away -- it was passed along as an
        // argument instead, so the final result is *not* DivisionByZero.
        let registry = BuiltinRegistry::new();
        let mut sink = NullSink;
        let mut ctx = EvalCtx::new(&registry, &mut sink);
        let (value, _) = eval_program(&program, Env::new(), &mut ctx);
        assert_ne!(error::code_of(&value), Some(ErrorCode::DivisionByZero));
    }

    #[test]
    fn formula_collects_response_and_predictors() {
        let v = parse_and_eval("y ~ x1 + x2");
        match v {
            Value::Formula(f) => {
                assert_eq!(f.response, vec!["y".to_string()]);
                assert_eq!(f.predictors, vec!["x1".to_string(), "x2".to_string()]);
            }
            other => panic!("expected formula, got {other:?}"),
        }
    }

    #[test]
    fn if_requires_both_branches_and_na_condition_is_type_error() {
        let v = parse_and_eval("if NA 1 else 2");
        assert_eq!(error::code_of(&v), Some(ErrorCode::TypeError));
    }

    #[test]
    fn arity_mismatch_on_lambda_call() {
        let v = parse_and_eval("f = \\(x, y) x + y\nf(1)");
        assert_eq!(error::code_of(&v), Some(ErrorCode::ArityError));
    }

    #[test]
    fn purity_of_eval_leaves_env_unchanged() {
        let env = Env::new().first_assign("x", Value::Int(1)).unwrap();
        let registry = BuiltinRegistry::new();
        let mut sink = NullSink;
        let mut ctx = EvalCtx::new(&registry, &mut sink);
        let expr = crate::ast::Expr::Var("x".to_string(), Span::default());
        let _ = eval_expr(&env, &expr, &mut ctx);
        assert_eq!(env.find("x"), Some(&Value::Int(1)));
    }
}
