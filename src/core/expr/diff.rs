//! Symbolic differentiation, memoised per `(node, variable)` pair.
//!
//! Each node owns a `RefCell<FxHashMap<u64, Expr>>` keyed by variable id;
//! [`Expr::diff`] consults it before doing any work and populates it
//! afterwards, so differentiating the same node against the same variable
//! twice (common once a constraint's Jacobian is requested more than once
//! per solve iteration) costs a single hash lookup the second time.

use super::{Expr, ExprKind};
use crate::geometry::Variable;

impl Expr {
    /// The symbolic partial derivative `d(self)/d(v)`.
    ///
    /// Returns `Const(0)` immediately, without touching the memo table, for
    /// any node whose cached variable set does not contain `v` — this is
    /// the common case in a constraint Jacobian, where most rows only
    /// touch a handful of a block's many columns.
    #[must_use]
    pub fn diff(&self, v: &Variable) -> Self {
        if !self.variables.contains_key(&v.id()) {
            return Self::constant(0.0);
        }
        if let Some(cached) = self.diff_cache.borrow().get(&v.id()) {
            return cached.clone();
        }

        let result = self.diff_uncached(v);
        self.diff_cache.borrow_mut().insert(v.id(), result.clone());
        result
    }

    fn diff_uncached(&self, v: &Variable) -> Self {
        match &self.kind {
            ExprKind::Const(_) => Self::constant(0.0),
            ExprKind::Var(w) => Self::constant(if w.id() == v.id() { 1.0 } else { 0.0 }),
            ExprKind::Add(terms) => Self::add(terms.iter().map(|t| t.diff(v))),
            ExprKind::Mul(factors) => Self::add((0..factors.len()).map(|i| {
                let mut product_terms: Vec<Self> = factors
                    .iter()
                    .enumerate()
                    .filter(|&(j, _)| j != i)
                    .map(|(_, f)| (**f).clone())
                    .collect();
                product_terms.push(factors[i].diff(v));
                Self::mul(product_terms)
            })),
            ExprKind::Neg(a) => Self::neg(a.diff(v)),
            ExprKind::Sub(a, b) => Self::sub(a.diff(v), b.diff(v)),
            ExprKind::Div(a, b) => {
                let numerator = Self::sub(Self::mul([a.diff(v), (**b).clone()]), Self::mul([(**a).clone(), b.diff(v)]));
                Self::div(numerator, Self::sq((**b).clone()))
            }
            ExprKind::Pow(f, p) => {
                let lowered = Self::pow_const((**f).clone(), *p - 1.0);
                Self::mul([Self::constant(*p), lowered, f.diff(v)])
            }
            ExprKind::Sq(f) => Self::mul([Self::constant(2.0), (**f).clone(), f.diff(v)]),
            ExprKind::Sqrt(f) => Self::div(f.diff(v), Self::mul([Self::constant(2.0), self.clone()])),
            ExprKind::Inverse(f) => Self::neg(Self::div(f.diff(v), Self::sq((**f).clone()))),
            ExprKind::Acos(f) => {
                let denom = Self::sqrt(Self::sub(Self::constant(1.0), Self::sq((**f).clone())));
                Self::neg(Self::div(f.diff(v), denom))
            }
        }
    }
}
