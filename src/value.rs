//! The runtime value model. Values are immutable once
//! constructed: "mutating" a binding produces a new [`crate::env::Env`], and
//! compound values (`List`/`Dict`/`Intent`) use `im`'s persistent vectors so
//! cloning a value is cheap structural sharing rather than a deep copy.

use std::fmt;
use std::rc::Rc;

use crate::ast::{Expr, Param, Span};
use crate::env::Env;
use crate::error::ErrorCode;
use crate::frame::DataFrameHandle;
use crate::pipeline::PipelineResult;
use crate::registry::Builtin;

/// The four typed "missing" tags plus the untyped fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NaKind {
    Generic,
    Bool,
    Int,
    Float,
    String,
}

impl NaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NaKind::Generic => "NA",
            NaKind::Bool => "NA_bool_",
            NaKind::Int => "NA_integer_",
            NaKind::Float => "NA_real_",
            NaKind::String => "NA_character_",
        }
    }
}

/// A structured error value. Carried as an ordinary `Value`
/// variant, never thrown.
#[derive(Debug, Clone)]
pub struct ErrorValue {
    pub code: ErrorCode,
    pub message: String,
    pub context: Vec<(String, Value)>,
    pub span: Option<Span>,
}

impl PartialEq for ErrorValue {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code && self.message == other.message
    }
}

/// A user-defined lambda. `env` is `None` only for lambdas
/// synthesized by builtins that intentionally reuse the caller's
/// environment (the "unset lambdas" case).
#[derive(Debug, Clone)]
pub struct LambdaDef {
    pub params: Vec<Param>,
    pub return_type: Option<String>,
    pub generics: Vec<String>,
    pub variadic: bool,
    pub body: Expr,
    pub env: Option<Env>,
}

impl PartialEq for LambdaDef {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

/// The `Formula` value produced (but never evaluated) by `~`. `lhs`/`rhs` retain the original, unparsed subtrees so a future
/// formula-algebra module can re-walk them.
#[derive(Debug, Clone, PartialEq)]
pub struct FormulaDef {
    pub response: Vec<String>,
    pub predictors: Vec<String>,
    pub lhs: Expr,
    pub rhs: Expr,
}

pub type ValueList = im::Vector<(Option<String>, Value)>;
pub type ValueDict = im::Vector<(String, Value)>;
pub type IntentFields = im::Vector<(String, String)>;

#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    /// An unresolved bare name, or a `$col` column reference token carried
    /// verbatim (including the `$`) so verbs can recognize it.
    Symbol(String),
    Na(NaKind),
    List(ValueList),
    Dict(ValueDict),
    Lambda(Rc<LambdaDef>),
    Builtin(Rc<Builtin>),
    /// Opaque tabular handle plus grouping keys; the core
    /// never constructs one, only stores and dot-accesses it.
    DataFrame(Rc<dyn DataFrameHandle>, Vec<String>),
    Pipeline(Rc<PipelineResult>),
    Formula(Rc<FormulaDef>),
    Intent(IntentFields),
    Error(Box<ErrorValue>),
    Null,
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => *a as f64 == *b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Na(a), Value::Na(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Dict(a), Value::Dict(b)) => a == b,
            (Value::Lambda(a), Value::Lambda(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => Rc::ptr_eq(a, b),
            (Value::DataFrame(a, ka), Value::DataFrame(b, kb)) => Rc::ptr_eq(a, b) && ka == kb,
            (Value::Pipeline(a), Value::Pipeline(b)) => Rc::ptr_eq(a, b),
            (Value::Formula(a), Value::Formula(b)) => a == b,
            (Value::Intent(a), Value::Intent(b)) => a == b,
            (Value::Error(a), Value::Error(b)) => a == b,
            (Value::Null, Value::Null) => true,
            _ => false,
        }
    }
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::Bool(_) => "Bool",
            Value::Str(_) => "String",
            Value::Symbol(_) => "Symbol",
            Value::Na(_) => "NA",
            Value::List(_) => "List",
            Value::Dict(_) => "Dict",
            Value::Lambda(_) => "Lambda",
            Value::Builtin(_) => "Builtin",
            Value::DataFrame(..) => "DataFrame",
            Value::Pipeline(_) => "Pipeline",
            Value::Formula(_) => "Formula",
            Value::Intent(_) => "Intent",
            Value::Error(_) => "Error",
            Value::Null => "Null",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    pub fn is_na(&self) -> bool {
        matches!(self, Value::Na(_))
    }

    /// Truthiness: `false`, `null`, integer zero, and any
    /// error are falsy; everything else is truthy. `NA` in a truthiness
    /// context is itself an error, so this returns a `Value` rather than a
    /// bare `bool`.
    pub fn truthy(&self, span: Span) -> Result<bool, Value> {
        match self {
            Value::Bool(b) => Ok(*b),
            Value::Null => Ok(false),
            Value::Int(0) => Ok(false),
            Value::Error(_) => Ok(false),
            Value::Na(_) => Err(crate::error::type_error(
                "cannot use NA in a condition".to_string(),
                span,
            )),
            _ => Ok(true),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Symbol(s) => write!(f, "{s}"),
            Value::Na(kind) => write!(f, "{}", kind.as_str()),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, (name, v)) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match name {
                        Some(n) => write!(f, "{n}: {v}")?,
                        None => write!(f, "{v}")?,
                    }
                }
                write!(f, "]")
            }
            Value::Dict(items) => {
                write!(f, "{{")?;
                for (i, (k, v)) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            Value::Lambda(_) => write!(f, "<lambda>"),
            Value::Builtin(b) => write!(f, "<builtin {}>", b.name),
            Value::DataFrame(_, keys) => write!(f, "<dataframe grouped_by={keys:?}>"),
            Value::Pipeline(_) => write!(f, "<pipeline>"),
            Value::Formula(form) => write!(
                f,
                "{} ~ {}",
                form.response.join(" + "),
                form.predictors.join(" + ")
            ),
            Value::Intent(fields) => {
                write!(f, "intent {{")?;
                for (i, (k, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v:?}")?;
                }
                write!(f, "}}")
            }
            Value::Error(e) => write!(f, "Error({:?}): {}", e.code, e.message),
            Value::Null => write!(f, "null"),
        }
    }
}

/// A small JSON-serializable summary used by `explain --json`. `Value` itself is not serialized wholesale: several variants hold
/// trait objects or captured environments that have no stable wire form,
/// which is the ordinary real-world reason to hand-roll a reporting struct
/// instead of deriving `Serialize` on the value type directly.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ValueExplanation {
    pub type_name: String,
    pub rendered: String,
    pub error_code: Option<String>,
    pub context: Vec<(String, String)>,
}

impl Value {
    pub fn explain(&self) -> ValueExplanation {
        let (error_code, context) = match self {
            Value::Error(e) => (
                Some(e.code.as_str().to_string()),
                e.context
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_string()))
                    .collect(),
            ),
            _ => (None, Vec::new()),
        };
        ValueExplanation {
            type_name: self.type_name().to_string(),
            rendered: self.to_string(),
            error_code,
            context,
        }
    }
}
