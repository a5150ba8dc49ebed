//! Factory functions for [`super::Expr`], applying the algebraic
//! simplifications from the crate's expression layer design before a node
//! is ever constructed. Keeping every rewrite inside the builders (rather
//! than as a post-construction pass) is what keeps the resulting tree in a
//! single canonical form, which in turn is what makes structural hashing a
//! useful `==` pre-filter.

use std::rc::Rc;

use super::{Expr, ExprKind};
use crate::core::error::SchemaError;
use crate::geometry::Variable;

/// Lifts `f64`, `Variable` and `Expr` values into [`Expr`] uniformly, so
/// builders can accept a mix of literals, variables and sub-expressions.
pub trait IntoExpr {
    /// Consumes `self`, producing the equivalent expression node.
    fn into_expr(self) -> Expr;
}

impl IntoExpr for Expr {
    fn into_expr(self) -> Expr {
        self
    }
}

impl IntoExpr for &Expr {
    fn into_expr(self) -> Expr {
        self.clone()
    }
}

impl IntoExpr for f64 {
    fn into_expr(self) -> Expr {
        Expr::constant(self)
    }
}

impl IntoExpr for Variable {
    fn into_expr(self) -> Expr {
        Expr::var(self)
    }
}

impl IntoExpr for &Variable {
    fn into_expr(self) -> Expr {
        Expr::var(self.clone())
    }
}

fn as_const(e: &Expr) -> Option<f64> {
    match e.kind {
        ExprKind::Const(x) => Some(x),
        _ => None,
    }
}

/// Flattens one level of same-kind nesting: children that are themselves an
/// `Add`/`Mul` contribute their own (already-flattened) terms directly.
fn flatten(terms: Vec<Expr>, is_same_kind: fn(&ExprKind) -> Option<&[Rc<Expr>]>) -> Vec<Expr> {
    let mut out = Vec::with_capacity(terms.len());
    for term in terms {
        if let Some(inner) = is_same_kind(&term.kind) {
            out.extend(inner.iter().map(|e| (**e).clone()));
        } else {
            out.push(term);
        }
    }
    out
}

impl Expr {
    /// A literal constant.
    #[must_use]
    pub(crate) fn constant(value: f64) -> Self {
        Self::build(ExprKind::Const(value))
    }

    /// A reference to a variable's current (and future) value.
    #[must_use]
    pub(crate) fn var(variable: Variable) -> Self {
        Self::build(ExprKind::Var(variable))
    }

    /// `a + b + c + ...`. Flattens nested sums, folds the constant part,
    /// and elides a zero constant or a singleton result.
    #[must_use]
    #[allow(clippy::float_cmp, reason = "checking for the exact neutral element 0.0")]
    pub(crate) fn add<I>(terms: I) -> Self
    where
        I: IntoIterator,
        I::Item: IntoExpr,
    {
        let terms: Vec<Self> = terms.into_iter().map(IntoExpr::into_expr).collect();
        let flattened = flatten(terms, |k| match k {
            ExprKind::Add(inner) => Some(inner.as_slice()),
            _ => None,
        });

        let mut const_sum = 0.0_f64;
        let mut rest = Vec::with_capacity(flattened.len());
        for term in flattened {
            if let Some(c) = as_const(&term) {
                const_sum += c;
            } else {
                rest.push(term);
            }
        }

        if rest.is_empty() {
            return Self::constant(const_sum);
        }
        if const_sum != 0.0 {
            rest.push(Self::constant(const_sum));
        }
        if rest.len() == 1 {
            return rest.swap_remove(0);
        }

        Self::build(ExprKind::Add(rest.into_iter().map(Rc::new).collect()))
    }

    /// `a * b * c * ...`. Flattens nested products, folds the constant
    /// part, collapses to `Const(0)` if any factor is exactly zero, and
    /// elides a unit constant or a singleton result.
    #[must_use]
    #[allow(clippy::float_cmp, reason = "checking for the exact absorbing/neutral elements 0.0 and 1.0")]
    pub(crate) fn mul<I>(factors: I) -> Self
    where
        I: IntoIterator,
        I::Item: IntoExpr,
    {
        let factors: Vec<Self> = factors.into_iter().map(IntoExpr::into_expr).collect();
        let flattened = flatten(factors, |k| match k {
            ExprKind::Mul(inner) => Some(inner.as_slice()),
            _ => None,
        });

        let mut const_prod = 1.0_f64;
        let mut rest = Vec::with_capacity(flattened.len());
        for factor in flattened {
            if let Some(c) = as_const(&factor) {
                const_prod *= c;
            } else {
                rest.push(factor);
            }
        }

        if const_prod == 0.0 {
            return Self::constant(0.0);
        }
        if rest.is_empty() {
            return Self::constant(const_prod);
        }
        if const_prod != 1.0 {
            rest.insert(0, Self::constant(const_prod));
        }
        if rest.len() == 1 {
            return rest.swap_remove(0);
        }

        Self::build(ExprKind::Mul(rest.into_iter().map(Rc::new).collect()))
    }

    /// `-a`. `Neg(Neg(x))` cancels to `x`; `Neg(Mul(..))` is rewritten as
    /// `Mul(-1, ..)` so negation never nests two non-canonical levels deep.
    #[must_use]
    pub(crate) fn neg(a: impl IntoExpr) -> Self {
        let a = a.into_expr();
        match a.kind {
            ExprKind::Const(x) => Self::constant(-x),
            ExprKind::Neg(inner) => (*inner).clone(),
            ExprKind::Mul(ref factors) => {
                let mut terms: Vec<Self> = factors.iter().map(|f| (**f).clone()).collect();
                terms.push(Self::constant(-1.0));
                Self::mul(terms)
            }
            _ => Self::build(ExprKind::Neg(Rc::new(a))),
        }
    }

    /// `a - b`, folded to a constant when both sides are constant and to
    /// `a` when `b` is the zero constant.
    #[must_use]
    #[allow(clippy::float_cmp, reason = "checking for the exact neutral element 0.0")]
    pub(crate) fn sub(a: impl IntoExpr, b: impl IntoExpr) -> Self {
        let a = a.into_expr();
        let b = b.into_expr();
        match (as_const(&a), as_const(&b)) {
            (Some(x), Some(y)) => Self::constant(x - y),
            (_, Some(y)) if y == 0.0 => a,
            _ => Self::build(ExprKind::Sub(Rc::new(a), Rc::new(b))),
        }
    }

    /// `a / b`, folded to a constant when both sides are constant and to
    /// `a` when `b` is the unit constant.
    #[must_use]
    #[allow(clippy::float_cmp, reason = "checking for the exact neutral element 1.0")]
    pub(crate) fn div(a: impl IntoExpr, b: impl IntoExpr) -> Self {
        let a = a.into_expr();
        let b = b.into_expr();
        match (as_const(&a), as_const(&b)) {
            (Some(x), Some(y)) => Self::constant(x / y),
            (_, Some(y)) if y == 1.0 => a,
            _ => Self::build(ExprKind::Div(Rc::new(a), Rc::new(b))),
        }
    }

    /// `a ^ p`, `p` a constant exponent expressed as an [`IntoExpr`] (a raw
    /// `f64` is the common case). Applies the `Pow` rewrites: `p=0 -> 1`,
    /// `p=1 -> a`, `p=-1 -> Inverse(a)`, `p=0.5 -> Sqrt(a)`, `p=2 ->
    /// Sq(a)`, and flattens `Pow(Pow(a,q),p) -> Pow(a, p*q)`.
    ///
    /// # Errors
    /// Returns [`SchemaError::NonConstantExponent`] if `exponent` is not a
    /// constant expression.
    pub(crate) fn pow(a: impl IntoExpr, exponent: impl IntoExpr) -> Result<Self, SchemaError> {
        let exponent = exponent.into_expr();
        let Some(p) = as_const(&exponent) else {
            return Err(SchemaError::NonConstantExponent);
        };
        Ok(Self::pow_const(a, p))
    }

    /// `a ^ p` for a constant `f64` exponent known ahead of time (e.g. from
    /// a derivative rule, which always lowers the exponent by a constant
    /// `1.0`). Infallible, unlike [`Expr::pow`].
    #[must_use]
    #[allow(clippy::float_cmp, reason = "matching the exact rewrite exponents 0, 1, -1, 0.5, 2")]
    pub(crate) fn pow_const(a: impl IntoExpr, p: f64) -> Self {
        let a = a.into_expr();

        if let Some(x) = as_const(&a) {
            return Self::constant(x.powf(p));
        }
        if p == 0.0 {
            return Self::constant(1.0);
        }
        if p == 1.0 {
            return a;
        }
        if p == -1.0 {
            return Self::inverse(a);
        }
        if p == 0.5 {
            return Self::sqrt(a);
        }
        if p == 2.0 {
            return Self::sq(a);
        }
        if let ExprKind::Pow(ref base, q) = a.kind {
            return Self::build(ExprKind::Pow(Rc::clone(base), p * q));
        }

        Self::build(ExprKind::Pow(Rc::new(a), p))
    }

    /// `a * a`.
    #[must_use]
    pub(crate) fn sq(a: impl IntoExpr) -> Self {
        let a = a.into_expr();
        match as_const(&a) {
            Some(x) => Self::constant(x * x),
            None => Self::build(ExprKind::Sq(Rc::new(a))),
        }
    }

    /// `sqrt(a)`, domain `a >= 0`. An out-of-domain constant is left as a
    /// `Sqrt` node rather than folded to a `NaN` constant, so `value()`
    /// surfaces the domain violation instead of returning `Ok(NaN)`.
    #[must_use]
    pub(crate) fn sqrt(a: impl IntoExpr) -> Self {
        let a = a.into_expr();
        match as_const(&a) {
            Some(x) if x >= 0.0 => Self::constant(x.sqrt()),
            _ => Self::build(ExprKind::Sqrt(Rc::new(a))),
        }
    }

    /// `1 / a`. `Inverse(Inverse(x))` cancels to `x`.
    #[must_use]
    pub(crate) fn inverse(a: impl IntoExpr) -> Self {
        let a = a.into_expr();
        match a.kind {
            ExprKind::Const(x) => Self::constant(1.0 / x),
            ExprKind::Inverse(inner) => (*inner).clone(),
            _ => Self::build(ExprKind::Inverse(Rc::new(a))),
        }
    }

    /// `acos(a)`, domain `a in [-1, 1]`. An out-of-domain constant is left
    /// as an `Acos` node rather than folded to a `NaN` constant, so
    /// `value()` surfaces the domain violation instead of returning
    /// `Ok(NaN)`.
    #[must_use]
    pub(crate) fn acos(a: impl IntoExpr) -> Self {
        let a = a.into_expr();
        match as_const(&a) {
            Some(x) if (-1.0..=1.0).contains(&x) => Self::constant(x.acos()),
            _ => Self::build(ExprKind::Acos(Rc::new(a))),
        }
    }

    /// `ax*bx + ay*by`, the 2D dot product of vectors `(ax, ay)` and
    /// `(bx, by)`.
    #[must_use]
    pub(crate) fn dot_product(
        ax: impl IntoExpr,
        ay: impl IntoExpr,
        bx: impl IntoExpr,
        by: impl IntoExpr,
    ) -> Self {
        let x_term = Self::mul([ax.into_expr(), bx.into_expr()]);
        let y_term = Self::mul([ay.into_expr(), by.into_expr()]);
        Self::add([x_term, y_term])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::SchemaError;
    use crate::geometry::Variable;

    #[test]
    fn pow_rejects_a_non_constant_exponent() {
        let base = Expr::var(Variable::new(2.0));
        let exponent = Expr::var(Variable::new(3.0));
        assert_eq!(Expr::pow(base, exponent), Err(SchemaError::NonConstantExponent));
    }

    #[test]
    fn pow_with_a_constant_exponent_matches_pow_const() {
        let base = Expr::var(Variable::new(2.0));
        let via_pow = Expr::pow(base.clone(), 3.0).expect("constant exponent");
        assert_eq!(via_pow, Expr::pow_const(base, 3.0));
    }

    #[test]
    fn dot_product_matches_its_expanded_form() {
        let ax = Expr::var(Variable::new(1.0));
        let ay = Expr::var(Variable::new(2.0));
        let bx = Expr::var(Variable::new(3.0));
        let by = Expr::var(Variable::new(4.0));

        let dot = Expr::dot_product(ax.clone(), ay.clone(), bx.clone(), by.clone());
        let expanded = Expr::add([Expr::mul([ax, bx]), Expr::mul([ay, by])]);
        assert_eq!(dot, expanded);
        assert_eq!(dot.value().expect("no domain error"), 1.0 * 3.0 + 2.0 * 4.0);
    }
}
