//! Non-standard evaluation. A syntactic rewrite
//! applied once per call site before dispatch: detect, then rewrite,
//! without inspecting the callee. Kept out of `eval.rs` only because it's
//! a self-contained pass, not because it needs a different value model.

use crate::ast::{Arg, Expr, Span};

/// Rewrites one call argument before dispatch. A bare `$col` reference
/// is left alone; an expression that transitively contains one (without
/// crossing into a nested lambda/formula/block/pipeline/intent — see
/// [`Expr::contains_column_ref`]) is wrapped as `\(row) <desugared>`.
/// Everything else is returned unchanged.
pub fn rewrite_arg(arg: &Arg) -> Arg {
    let expr = arg.expr();
    if matches!(expr, Expr::Column(..)) {
        return arg.clone();
    }
    if !expr.contains_column_ref() {
        return arg.clone();
    }
    let span = expr.span();
    let body = desugar(expr);
    let wrapped = Expr::Lambda {
        params: vec![crate::ast::Param {
            name: "row".to_string(),
            type_ann: None,
        }],
        return_type: None,
        generics: Vec::new(),
        variadic: false,
        body: Box::new(body),
        span,
    };
    rebuild(arg, wrapped)
}

fn rebuild(arg: &Arg, expr: Expr) -> Arg {
    match arg {
        Arg::Positional(_) => Arg::Positional(expr),
        Arg::Named(n, _) => Arg::Named(n.clone(), expr),
        Arg::DotNamed(n, _) => Arg::DotNamed(n.clone(), expr),
        Arg::ColumnNamed(n, _) => Arg::ColumnNamed(n.clone(), expr),
    }
}

fn row_dot(field: &str, span: Span) -> Expr {
    Expr::Dot {
        target: Box::new(Expr::Var("row".to_string(), span)),
        field: field.to_string(),
        span,
    }
}

/// Replaces every `$field` with `row.field`, recursing through every node
/// type transparent to NSE and leaving opaque ones (lambda bodies,
/// formulas, blocks, pipelines, intents) byte-for-byte as given.
pub fn desugar(expr: &Expr) -> Expr {
    match expr {
        Expr::Column(name, span) => row_dot(name, *span),
        Expr::Int(..)
        | Expr::Float(..)
        | Expr::Str(..)
        | Expr::Bool(..)
        | Expr::Null(_)
        | Expr::Na(_)
        | Expr::Var(..)
        | Expr::Formula { .. }
        | Expr::Lambda { .. }
        | Expr::Block(..)
        | Expr::Pipeline(..)
        | Expr::Intent(..) => expr.clone(),
        Expr::Unary { op, operand, span } => Expr::Unary {
            op: *op,
            operand: Box::new(desugar(operand)),
            span: *span,
        },
        Expr::Binary {
            op,
            broadcast,
            lhs,
            rhs,
            span,
        } => Expr::Binary {
            op: *op,
            broadcast: *broadcast,
            lhs: Box::new(desugar(lhs)),
            rhs: Box::new(desugar(rhs)),
            span: *span,
        },
        Expr::Pipe {
            unconditional,
            left,
            right,
            span,
        } => Expr::Pipe {
            unconditional: *unconditional,
            left: Box::new(desugar(left)),
            right: Box::new(desugar(right)),
            span: *span,
        },
        Expr::Call { callee, args, span } => Expr::Call {
            callee: Box::new(desugar(callee)),
            args: args
                .iter()
                .map(|a| rebuild(a, desugar(a.expr())))
                .collect(),
            span: *span,
        },
        Expr::If {
            cond,
            then_branch,
            else_branch,
            span,
        } => Expr::If {
            cond: Box::new(desugar(cond)),
            then_branch: Box::new(desugar(then_branch)),
            else_branch: Box::new(desugar(else_branch)),
            span: *span,
        },
        Expr::List(items, span) => Expr::List(
            items
                .iter()
                .map(|i| crate::ast::ListItem {
                    name: i.name.clone(),
                    value: desugar(&i.value),
                })
                .collect(),
            *span,
        ),
        Expr::Dict(items, span) => Expr::Dict(
            items.iter().map(|(k, v)| (k.clone(), desugar(v))).collect(),
            *span,
        ),
        Expr::Comprehension {
            element,
            var,
            source,
            cond,
            span,
        } => Expr::Comprehension {
            element: Box::new(desugar(element)),
            var: var.clone(),
            source: Box::new(desugar(source)),
            cond: cond.as_ref().map(|c| Box::new(desugar(c))),
            span: *span,
        },
        Expr::Dot { target, field, span } => Expr::Dot {
            target: Box::new(desugar(target)),
            field: field.clone(),
            span: *span,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinOp, Span};

    fn dummy_span() -> Span {
        Span::new(0, 0)
    }

    #[test]
    fn bare_column_ref_is_left_alone() {
        let arg = Arg::Positional(Expr::Column("age".to_string(), dummy_span()));
        assert_eq!(rewrite_arg(&arg), arg);
    }

    #[test]
    fn column_ref_inside_expression_wraps_in_row_lambda() {
        // $age > 30
        let expr = Expr::Binary {
            op: BinOp::Gt,
            broadcast: false,
            lhs: Box::new(Expr::Column("age".to_string(), dummy_span())),
            rhs: Box::new(Expr::Int(30, dummy_span())),
            span: dummy_span(),
        };
        let arg = Arg::Positional(expr);
        let rewritten = rewrite_arg(&arg);
        match rewritten {
            Arg::Positional(Expr::Lambda { params, body, .. }) => {
                assert_eq!(params.len(), 1);
                assert_eq!(params[0].name, "row");
                match *body {
                    Expr::Binary { lhs, .. } => match *lhs {
                        Expr::Dot { field, .. } => assert_eq!(field, "age"),
                        other => panic!("expected Dot, got {other:?}"),
                    },
                    other => panic!("expected Binary, got {other:?}"),
                }
            }
            other => panic!("expected wrapped lambda, got {other:?}"),
        }
    }

    #[test]
    fn expression_without_column_ref_is_unchanged() {
        let arg = Arg::Positional(Expr::Int(5, dummy_span()));
        assert_eq!(rewrite_arg(&arg), arg);
    }
}
