//! Free-variable analysis for [`super::ExprKind`].
//!
//! Computed once, bottom-up, at node construction: each node's variable set
//! is the union of its children's (already-computed) sets plus, for `Var`,
//! itself. Children expose their set as an `Rc`, so building a parent's set
//! is a handful of hash-map merges, not a re-walk of the whole subtree.

use std::rc::Rc;

use rustc_hash::FxHashMap;

use super::ExprKind;
use crate::geometry::Variable;

pub(super) fn compute_variables(kind: &ExprKind) -> Rc<FxHashMap<u64, Variable>> {
    match kind {
        ExprKind::Const(_) => Rc::new(FxHashMap::default()),
        ExprKind::Var(v) => {
            let mut set = FxHashMap::default();
            set.insert(v.id(), v.clone());
            Rc::new(set)
        }
        ExprKind::Add(terms) => merge(terms.iter().map(|t| &t.variables)),
        ExprKind::Mul(factors) => merge(factors.iter().map(|f| &f.variables)),
        ExprKind::Neg(a) | ExprKind::Sq(a) | ExprKind::Sqrt(a) | ExprKind::Inverse(a) | ExprKind::Acos(a) => {
            Rc::clone(&a.variables)
        }
        ExprKind::Sub(a, b) | ExprKind::Div(a, b) => merge([&a.variables, &b.variables].into_iter()),
        ExprKind::Pow(a, _) => Rc::clone(&a.variables),
    }
}

fn merge<'a>(sets: impl Iterator<Item = &'a Rc<FxHashMap<u64, Variable>>>) -> Rc<FxHashMap<u64, Variable>> {
    let mut iter = sets.peekable();
    let Some(first) = iter.next() else {
        return Rc::new(FxHashMap::default());
    };
    if iter.peek().is_none() {
        return Rc::clone(first);
    }

    let mut merged = (**first).clone();
    for set in iter {
        for (id, var) in set.iter() {
            merged.entry(*id).or_insert_with(|| var.clone());
        }
    }
    Rc::new(merged)
}
