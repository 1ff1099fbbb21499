//! The pipeline engine. A pipeline is a block of named
//! node expressions with dependency-driven, topologically ordered
//! execution and dirty-aware re-execution. This module is deliberately
//! evaluator-agnostic: it takes an `eval_node` callback rather than
//! `use`-ing `crate::eval` directly, so the mutual recursion between
//! evaluation, call dispatch, and pipeline execution stays a single
//! explicit seam instead of a module cycle.

use std::collections::{HashMap, HashSet};

use crate::ast::{Expr, PipelineNode};
use crate::error;
use crate::value::Value;

/// `{ evaluated nodes in declaration order, node name → expression map,
/// node name → dependency list }`.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub declaration_order: Vec<String>,
    pub values: HashMap<String, Value>,
    pub exprs: HashMap<String, Expr>,
    pub deps: HashMap<String, Vec<String>>,
    /// The topological execution order actually used; re-execution walks
    /// this, not `declaration_order`.
    pub topo_order: Vec<String>,
    /// The outer-environment value of every external (non-node-name) free
    /// variable referenced anywhere in the pipeline, as observed the last
    /// time it ran. `rerun_pipeline` diffs against this, not `values`
    /// (which is keyed by node name and never holds an external variable's
    /// value at all).
    pub external_snapshot: HashMap<String, Value>,
}

impl PipelineResult {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }
}

/// Free variables of `expr`, excluding lambda parameters and block-local
/// first-assignments bound strictly within `expr` itself. Nested
/// `pipeline { ... }` node names are pipeline-local to that nested
/// definition and don't leak out, so a nested `Pipeline` node contributes
/// no free variables here — a deliberate simplification, see DESIGN.md.
pub fn free_vars(expr: &Expr) -> HashSet<String> {
    let mut out = HashSet::new();
    let mut bound = Vec::new();
    walk_free_vars(expr, &mut bound, &mut out);
    out
}

fn walk_free_vars(expr: &Expr, bound: &mut Vec<String>, out: &mut HashSet<String>) {
    match expr {
        Expr::Var(name, _) => {
            if !bound.contains(name) {
                out.insert(name.clone());
            }
        }
        Expr::Int(..)
        | Expr::Float(..)
        | Expr::Str(..)
        | Expr::Bool(..)
        | Expr::Null(_)
        | Expr::Na(_)
        | Expr::Column(..) => {}
        Expr::Unary { operand, .. } => walk_free_vars(operand, bound, out),
        Expr::Binary { lhs, rhs, .. } => {
            walk_free_vars(lhs, bound, out);
            walk_free_vars(rhs, bound, out);
        }
        Expr::Pipe { left, right, .. } => {
            walk_free_vars(left, bound, out);
            walk_free_vars(right, bound, out);
        }
        Expr::Formula { lhs, rhs, .. } => {
            walk_free_vars(lhs, bound, out);
            walk_free_vars(rhs, bound, out);
        }
        Expr::Call { callee, args, .. } => {
            walk_free_vars(callee, bound, out);
            for a in args {
                walk_free_vars(a.expr(), bound, out);
            }
        }
        Expr::Lambda { params, body, .. } => {
            let added: Vec<String> = params.iter().map(|p| p.name.clone()).collect();
            bound.extend(added.iter().cloned());
            walk_free_vars(body, bound, out);
            for _ in &added {
                bound.pop();
            }
        }
        Expr::If {
            cond,
            then_branch,
            else_branch,
            ..
        } => {
            walk_free_vars(cond, bound, out);
            walk_free_vars(then_branch, bound, out);
            walk_free_vars(else_branch, bound, out);
        }
        Expr::List(items, _) => {
            for item in items {
                walk_free_vars(&item.value, bound, out);
            }
        }
        Expr::Dict(items, _) => {
            for (_, v) in items {
                walk_free_vars(v, bound, out);
            }
        }
        Expr::Comprehension {
            element,
            var,
            source,
            cond,
            ..
        } => {
            walk_free_vars(source, bound, out);
            bound.push(var.clone());
            walk_free_vars(element, bound, out);
            if let Some(c) = cond {
                walk_free_vars(c, bound, out);
            }
            bound.pop();
        }
        Expr::Dot { target, .. } => walk_free_vars(target, bound, out),
        Expr::Block(stmts, _) => {
            let mut locals = 0;
            for stmt in stmts {
                match stmt {
                    crate::ast::Stmt::FirstAssign { name, value, .. } => {
                        walk_free_vars(value, bound, out);
                        bound.push(name.clone());
                        locals += 1;
                    }
                    crate::ast::Stmt::Overwrite { value, .. } => walk_free_vars(value, bound, out),
                    crate::ast::Stmt::Expr(e) => walk_free_vars(e, bound, out),
                    crate::ast::Stmt::Import(..) => {}
                }
            }
            for _ in 0..locals {
                bound.pop();
            }
        }
        Expr::Pipeline(..) => {}
        Expr::Intent(fields, _) => {
            for field in fields {
                walk_free_vars(&field.value, bound, out);
            }
        }
    }
}

/// Topologically sorts `nodes`, detecting cycles via in-progress DFS
/// marking. Ties are broken by declaration order.
fn topo_sort(nodes: &[PipelineNode]) -> Result<Vec<String>, Value> {
    let local_names: HashSet<String> = nodes.iter().map(|n| n.name.clone()).collect();
    let deps: HashMap<String, Vec<String>> = nodes
        .iter()
        .map(|n| {
            let mut d: Vec<String> = free_vars(&n.expr)
                .into_iter()
                .filter(|v| local_names.contains(v))
                .collect();
            d.sort();
            (n.name.clone(), d)
        })
        .collect();

    #[derive(PartialEq, Eq, Clone, Copy)]
    enum Mark {
        InProgress,
        Done,
    }
    let mut marks: HashMap<String, Mark> = HashMap::new();
    let mut order = Vec::new();

    fn visit(
        name: &str,
        deps: &HashMap<String, Vec<String>>,
        marks: &mut HashMap<String, Mark>,
        order: &mut Vec<String>,
    ) -> Result<(), Value> {
        match marks.get(name) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::InProgress) => return Err(error::pipeline_cycle_error(name, None)),
            None => {}
        }
        marks.insert(name.to_string(), Mark::InProgress);
        if let Some(ds) = deps.get(name) {
            for d in ds {
                visit(d, deps, marks, order)?;
            }
        }
        marks.insert(name.to_string(), Mark::Done);
        order.push(name.to_string());
        Ok(())
    }

    for node in nodes {
        visit(&node.name, &deps, &mut marks, &mut order)?;
    }
    Ok(order)
}

pub fn dependency_map(nodes: &[PipelineNode]) -> HashMap<String, Vec<String>> {
    let local_names: HashSet<String> = nodes.iter().map(|n| n.name.clone()).collect();
    nodes
        .iter()
        .map(|n| {
            let mut d: Vec<String> = free_vars(&n.expr)
                .into_iter()
                .filter(|v| local_names.contains(v))
                .collect();
            d.sort();
            (n.name.clone(), d)
        })
        .collect()
}

/// Builds (and fully executes) a pipeline.
/// `eval_node` evaluates one node's expression against the accumulating
/// local environment; it is the evaluator's `eval_expr` in practice.
/// `outer_lookup` reports the current value of an external (non-node-name)
/// free variable, so it can be snapshotted for a later `rerun_pipeline` to
/// diff against.
pub fn build_pipeline<E, O>(
    nodes: &[PipelineNode],
    mut outer_lookup: O,
    mut eval_node: E,
) -> Result<PipelineResult, Value>
where
    E: FnMut(&str, &Expr) -> Result<Value, Value>,
    O: FnMut(&str) -> Option<Value>,
{
    let topo_order = topo_sort(nodes)?;
    let deps = dependency_map(nodes);
    let exprs: HashMap<String, Expr> = nodes
        .iter()
        .map(|n| (n.name.clone(), n.expr.clone()))
        .collect();
    let declaration_order: Vec<String> = nodes.iter().map(|n| n.name.clone()).collect();
    let local_names: HashSet<&String> = declaration_order.iter().collect();

    let mut values = HashMap::new();
    let mut external_snapshot = HashMap::new();
    for name in &topo_order {
        let expr = &exprs[name];
        for v in free_vars(expr).into_iter().filter(|v| !local_names.contains(v)) {
            if let Some(current) = outer_lookup(&v) {
                external_snapshot.insert(v, current);
            }
        }
        let value = eval_node(name, expr)?;
        if value.is_error() {
            return Err(error::pipeline_node_error(name, &value, None));
        }
        values.insert(name.clone(), value);
    }

    Ok(PipelineResult {
        declaration_order,
        values,
        exprs,
        deps,
        topo_order,
        external_snapshot,
    })
}

/// Dirty-aware re-execution. `outer_lookup`
/// reports the *current* value of an external free variable so it can be
/// compared against the value recorded the last time this pipeline ran.
pub fn rerun_pipeline<E, O>(
    prev: &PipelineResult,
    mut outer_lookup: O,
    mut eval_node: E,
) -> Result<PipelineResult, Value>
where
    E: FnMut(&str, &Expr) -> Result<Value, Value>,
    O: FnMut(&str) -> Option<Value>,
{
    let local_names: HashSet<&String> = prev.declaration_order.iter().collect();
    let mut dirty: HashMap<String, bool> = HashMap::new();
    let mut values = prev.values.clone();
    let mut external_snapshot = prev.external_snapshot.clone();

    for name in &prev.topo_order {
        let deps = prev.deps.get(name).cloned().unwrap_or_default();
        let deps_dirty = deps.iter().any(|d| *dirty.get(d).unwrap_or(&false));

        let node_externals: Vec<String> = free_vars(&prev.exprs[name])
            .into_iter()
            .filter(|v| !local_names.contains(v))
            .collect();
        let external_changed = node_externals.iter().any(|v| match outer_lookup(v) {
            Some(current) => {
                let changed = prev.external_snapshot.get(v).map(|old| old != &current).unwrap_or(true);
                external_snapshot.insert(v.clone(), current);
                changed
            }
            None => false,
        });

        let is_dirty = deps_dirty || external_changed;
        dirty.insert(name.clone(), is_dirty);

        if is_dirty {
            let value = eval_node(name, &prev.exprs[name])?;
            if value.is_error() {
                return Err(error::pipeline_node_error(name, &value, None));
            }
            values.insert(name.clone(), value);
        }
    }

    Ok(PipelineResult {
        declaration_order: prev.declaration_order.clone(),
        values,
        exprs: prev.exprs.clone(),
        deps: prev.deps.clone(),
        topo_order: prev.topo_order.clone(),
        external_snapshot,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Span;

    fn var(name: &str) -> Expr {
        Expr::Var(name.to_string(), Span::default())
    }

    fn node(name: &str, expr: Expr) -> PipelineNode {
        PipelineNode {
            name: name.to_string(),
            expr,
        }
    }

    #[test]
    fn topo_sort_orders_dependencies_first() {
        // c = a + b; a = 1; b = 2  -> topo order must put a,b before c.
        let nodes = vec![
            node(
                "c",
                Expr::Binary {
                    op: crate::ast::BinOp::Add,
                    broadcast: false,
                    lhs: Box::new(var("a")),
                    rhs: Box::new(var("b")),
                    span: Span::default(),
                },
            ),
            node("a", Expr::Int(1, Span::default())),
            node("b", Expr::Int(2, Span::default())),
        ];
        let order = topo_sort(&nodes).unwrap();
        let pos = |n: &str| order.iter().position(|x| x == n).unwrap();
        assert!(pos("a") < pos("c"));
        assert!(pos("b") < pos("c"));
    }

    #[test]
    fn cycle_is_detected() {
        let nodes = vec![node("a", var("b")), node("b", var("a"))];
        let err = topo_sort(&nodes).unwrap_err();
        assert!(err.is_error());
    }
}
