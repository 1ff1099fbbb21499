//! The strict-mode validator. A pre-pass over a
//! program's top-level `name = λ` statements, run before any evaluation;
//! `repl` mode skips it entirely.

use crate::ast::{Expr, Param, Program, Span, Stmt};
use crate::error;
use crate::value::Value;

/// Runs every top-level `name = λ` through three checks (parameters fully
/// annotated, a return annotation present, generic identifiers declared),
/// stopping at the first violation. Returns `Ok(())` if every such
/// statement passes (or there are none).
pub fn validate(program: &Program) -> Result<(), Value> {
    for stmt in program {
        if let Stmt::FirstAssign { name, value, span, .. } = stmt {
            if let Expr::Lambda {
                params,
                return_type,
                generics,
                ..
            } = value
            {
                validate_lambda(name, params, return_type, generics, *span)?;
            }
        }
    }
    Ok(())
}

fn validate_lambda(
    name: &str,
    params: &[Param],
    return_type: &Option<String>,
    generics: &[String],
    span: Span,
) -> Result<(), Value> {
    for param in params {
        if param.type_ann.is_none() {
            return Err(error::value_error(
                format!(
                    "strict mode: parameter '{}' of '{name}' is missing a type annotation",
                    param.name
                ),
                Some(span),
            ));
        }
    }
    if return_type.is_none() {
        return Err(error::value_error(
            format!("strict mode: '{name}' is missing a return type annotation"),
            Some(span),
        ));
    }

    let declared: Vec<&String> = generics.iter().collect();
    for type_var in params
        .iter()
        .filter_map(|p| p.type_ann.as_deref())
        .chain(return_type.as_deref())
        .flat_map(type_variables_in)
    {
        if !declared.iter().any(|g| g.as_str() == type_var) {
            return Err(error::value_error(
                format!(
                    "strict mode: type variable '{type_var}' used in '{name}' is not declared in its generic parameter list"
                ),
                Some(span),
            ));
        }
    }
    Ok(())
}

/// Extracts every single, uppercase-leading identifier token from a type
/// annotation string.
/// Type annotations are unparsed strings in the AST, so this
/// is a plain tokenizing walk rather than a recursive descent over a type
/// grammar -- there is no such grammar in scope.
fn type_variables_in(annotation: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut chars = annotation.chars().peekable();
    while let Some(c) = chars.next() {
        if c.is_alphanumeric() || c == '_' {
            current.push(c);
        } else {
            flush_identifier(&mut current, &mut out);
        }
    }
    flush_identifier(&mut current, &mut out);
    out
}

fn flush_identifier(current: &mut String, out: &mut Vec<String>) {
    if !current.is_empty() {
        if is_bare_type_variable(current) {
            out.push(current.clone());
        }
        current.clear();
    }
}

/// A "single uppercase-leading identifier": starts with an uppercase ASCII
/// letter and is not one of the built-in type names the core recognizes
/// (those double as type annotations but are never generic parameters).
fn is_bare_type_variable(ident: &str) -> bool {
    let Some(first) = ident.chars().next() else {
        return false;
    };
    if !first.is_ascii_uppercase() {
        return false;
    }
    !matches!(
        ident,
        "Int" | "Float" | "Bool" | "String" | "Null" | "NA" | "List" | "Dict" | "Lambda" | "DataFrame" | "Error"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn fully_annotated_lambda_passes() {
        let program = parse("f = \\(x: Int) -> Int x + 1").unwrap();
        assert!(validate(&program).is_ok());
    }

    #[test]
    fn missing_param_annotation_fails() {
        let program = parse("f = \\(x) -> Int x + 1").unwrap();
        let err = validate(&program).unwrap_err();
        assert!(err.is_error());
    }

    #[test]
    fn missing_return_type_fails() {
        let program = parse("f = \\(x: Int) x + 1").unwrap();
        let err = validate(&program).unwrap_err();
        assert!(err.is_error());
    }

    #[test]
    fn undeclared_type_variable_fails() {
        let program = parse("f = \\(x: T) -> T x").unwrap();
        let err = validate(&program).unwrap_err();
        assert!(err.is_error());
    }

    #[test]
    fn declared_generic_type_variable_passes() {
        let program = parse("f = \\<T>(x: T) -> T x").unwrap();
        assert!(validate(&program).is_ok());
    }

    #[test]
    fn non_lambda_first_assign_is_ignored() {
        let program = parse("x = 5").unwrap();
        assert!(validate(&program).is_ok());
    }
}
