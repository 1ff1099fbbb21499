//! The expression/statement AST. Every node carries a [`Span`] so later
//! phases (evaluator, strict-mode validator, error kernel) can report
//! precise source locations without re-deriving them from the value graph.

use serde::{Deserialize, Serialize};

/// A byte-offset range into the original source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    // Optionally: line/col for richer error UX.
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// The smallest span covering both inputs.
    pub fn cover(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// A single parameter in a lambda's parameter list, with an optional type
/// annotation (validated only by the strict-mode pass).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub type_ann: Option<String>,
}

/// One field of an `intent { ... }` definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentField {
    pub key: String,
    pub value: Expr,
}

/// One named node of a `pipeline { ... }` definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineNode {
    pub name: String,
    pub expr: Expr,
}

/// One element of a list literal; `name` is a label, not a lookup key
///.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    pub name: Option<String>,
    pub value: Expr,
}

/// Call-argument forms: positional, `ident: expr` / `ident =
/// expr` (the core treats these identically), `.ident = expr` reserved for
/// verb options, and `$col = expr` reserved for column-named options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Arg {
    Positional(Expr),
    Named(String, Expr),
    DotNamed(String, Expr),
    ColumnNamed(String, Expr),
}

impl Arg {
    pub fn expr(&self) -> &Expr {
        match self {
            Arg::Positional(e) | Arg::Named(_, e) | Arg::DotNamed(_, e) | Arg::ColumnNamed(_, e) => e,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Arg::Positional(_) => None,
            Arg::Named(n, _) | Arg::DotNamed(n, _) | Arg::ColumnNamed(n, _) => Some(n.as_str()),
        }
    }
}

/// Binary operators. Comparison/arithmetic/bitwise operators carry a
/// `broadcast` flag at the `Expr::Binary` level rather than doubling the
/// enum, since the core only needs to tag them for the vector-math
/// collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
    BitAnd,
    BitOr,
    In,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Int(i64, Span),
    Float(f64, Span),
    Str(String, Span),
    Bool(bool, Span),
    Null(Span),
    /// The bare `NA` literal token; typed NA values are produced by builtin
    /// constructors outside the core.
    Na(Span),

    /// A free variable reference. Evaluates to a bound value, or falls back
    /// to a `Symbol` when unbound.
    Var(String, Span),

    /// A `$name` column reference token.
    Column(String, Span),

    Unary {
        op: UnOp,
        operand: Box<Expr>,
        span: Span,
    },

    Binary {
        op: BinOp,
        /// Set when parsed from the dotted (`.+`, `.==`, ...) form.
        broadcast: bool,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        span: Span,
    },

    Pipe {
        /// `false` for `|>` (short-circuits on a left-hand error),
        /// `true` for `?|>` (forwards the error into the callee).
        unconditional: bool,
        left: Box<Expr>,
        right: Box<Expr>,
        span: Span,
    },

    Formula {
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        span: Span,
    },

    Call {
        callee: Box<Expr>,
        args: Vec<Arg>,
        span: Span,
    },

    Lambda {
        params: Vec<Param>,
        return_type: Option<String>,
        generics: Vec<String>,
        variadic: bool,
        body: Box<Expr>,
        span: Span,
    },

    If {
        cond: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
        span: Span,
    },

    List(Vec<ListItem>, Span),
    Dict(Vec<(String, Expr)>, Span),

    /// `[elem for var in source (if cond)?]`. Not load-bearing for any
    /// invariant in; kept deliberately small (see DESIGN.md).
    Comprehension {
        element: Box<Expr>,
        var: String,
        source: Box<Expr>,
        cond: Option<Box<Expr>>,
        span: Span,
    },

    Dot {
        target: Box<Expr>,
        field: String,
        span: Span,
    },

    Block(Vec<Stmt>, Span),

    Pipeline(Vec<PipelineNode>, Span),

    Intent(Vec<IntentField>, Span),
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Int(_, s)
            | Expr::Float(_, s)
            | Expr::Str(_, s)
            | Expr::Bool(_, s)
            | Expr::Null(s)
            | Expr::Na(s)
            | Expr::Var(_, s)
            | Expr::Column(_, s)
            | Expr::Unary { span: s, .. }
            | Expr::Binary { span: s, .. }
            | Expr::Pipe { span: s, .. }
            | Expr::Formula { span: s, .. }
            | Expr::Call { span: s, .. }
            | Expr::Lambda { span: s, .. }
            | Expr::If { span: s, .. }
            | Expr::List(_, s)
            | Expr::Dict(_, s)
            | Expr::Comprehension { span: s, .. }
            | Expr::Dot { span: s, .. }
            | Expr::Block(_, s)
            | Expr::Pipeline(_, s)
            | Expr::Intent(_, s) => *s,
        }
    }

    /// True if this expression, or any subexpression reachable without
    /// crossing a nested lambda body, contains a `$col` reference. Used by
    /// the NSE pass and left here as a shared primitive
    /// since both `nse` and `pipeline` (dependency collection) need a
    /// similar walk.
    pub fn contains_column_ref(&self) -> bool {
        match self {
            Expr::Column(_, _) => true,
            Expr::Int(..)
            | Expr::Float(..)
            | Expr::Str(..)
            | Expr::Bool(..)
            | Expr::Null(_)
            | Expr::Na(_)
            | Expr::Var(..) => false,
            Expr::Unary { operand, .. } => operand.contains_column_ref(),
            Expr::Binary { lhs, rhs, .. } => lhs.contains_column_ref() || rhs.contains_column_ref(),
            Expr::Pipe { left, right, .. } => {
                left.contains_column_ref() || right.contains_column_ref()
            }
            Expr::Formula { .. } => false,
            Expr::Call { callee, args, .. } => {
                callee.contains_column_ref() || args.iter().any(|a| a.expr().contains_column_ref())
            }
            // Lambda bodies are a new NSE scope; column refs inside them are
            // not hoisted into the enclosing call's rewrite.
            Expr::Lambda { .. } => false,
            Expr::If {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                cond.contains_column_ref()
                    || then_branch.contains_column_ref()
                    || else_branch.contains_column_ref()
            }
            Expr::List(items, _) => items.iter().any(|i| i.value.contains_column_ref()),
            Expr::Dict(items, _) => items.iter().any(|(_, v)| v.contains_column_ref()),
            Expr::Comprehension {
                element,
                source,
                cond,
                ..
            } => {
                element.contains_column_ref()
                    || source.contains_column_ref()
                    || cond.as_ref().is_some_and(|c| c.contains_column_ref())
            }
            Expr::Dot { target, .. } => target.contains_column_ref(),
            Expr::Block(_, _) => false,
            Expr::Pipeline(_, _) => false,
            Expr::Intent(_, _) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    /// `name = expr`, optionally type-annotated; fails if `name` is already
    /// bound.
    FirstAssign {
        name: String,
        type_ann: Option<String>,
        value: Expr,
        span: Span,
    },
    /// `name := expr`; fails unless `name` is already bound.
    Overwrite {
        name: String,
        value: Expr,
        span: Span,
    },
    Expr(Expr),
    /// Parsed but inert in the core.
    Import(String, Span),
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::FirstAssign { span, .. } | Stmt::Overwrite { span, .. } | Stmt::Import(_, span) => {
                *span
            }
            Stmt::Expr(e) => e.span(),
        }
    }
}

pub type Program = Vec<Stmt>;
