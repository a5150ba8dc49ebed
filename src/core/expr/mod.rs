//! The symbolic expression DAG every constraint residual is built from.
//!
//! [`Expr`] is a small, closed algebra: constants, variables, flattened
//! n-ary sums and products, and a handful of unary/binary operators. Nodes
//! are immutable and reference-counted (`Rc`), so sharing a common
//! sub-expression across several constraints costs a clone of a pointer,
//! not a tree.
//!
//! Three caches live on every node, computed once at construction and
//! reused for the node's whole lifetime:
//! - a structural hash (`rustc_hash`-based), for O(1) inequality rejection
//!   before a deep structural comparison is attempted,
//! - the set of free variables appearing in the subtree,
//! - a memo table of already-computed symbolic derivatives, keyed by
//!   variable id.
//!
//! Builders fold constants and apply the small set of algebraic rewrites
//! described on each variant below; the resulting tree is always in that
//! canonical form, which is what makes the structural hash a useful
//! equality pre-filter at all.

mod analysis;
mod constructors;
mod diff;
mod evaluate;
mod hash;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::geometry::Variable;

/// The closed set of expression node kinds.
///
/// `Add`/`Mul` are n-ary and pre-flattened by their builders (no `Add`
/// directly nests an `Add` child, same for `Mul`). `Pow`'s exponent is
/// always a constant `f64`, enforced at construction by
/// [`Expr::pow`] returning a [`SchemaError`](crate::core::error::SchemaError)
/// for anything else.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ExprKind {
    /// A literal constant.
    Const(f64),
    /// A reference to a shared, mutable scalar variable.
    Var(Variable),
    /// `a + b + c + ...`, flattened, with at most one trailing constant.
    Add(Vec<Rc<Expr>>),
    /// `a * b * c * ...`, flattened, with at most one leading constant.
    Mul(Vec<Rc<Expr>>),
    /// `-a`.
    Neg(Rc<Expr>),
    /// `a - b`.
    Sub(Rc<Expr>, Rc<Expr>),
    /// `a / b`.
    Div(Rc<Expr>, Rc<Expr>),
    /// `a ^ e`, `e` a compile-time-fixed constant exponent.
    Pow(Rc<Expr>, f64),
    /// `a * a`, kept distinct from `Pow(a, 2.0)` because its derivative
    /// rule is simpler and it is by far the most common exponent in
    /// distance residuals.
    Sq(Rc<Expr>),
    /// `sqrt(a)`, domain `a >= 0`.
    Sqrt(Rc<Expr>),
    /// `1 / a`, domain `a != 0`.
    Inverse(Rc<Expr>),
    /// `acos(a)`, domain `a in [-1, 1]`.
    Acos(Rc<Expr>),
}

/// A node in the expression DAG.
///
/// Cheap to clone (an `Rc` bump); compared structurally via [`PartialEq`],
/// not by pointer identity.
#[derive(Clone)]
pub struct Expr {
    kind: ExprKind,
    structural_hash: u64,
    variables: Rc<FxHashMap<u64, Variable>>,
    diff_cache: Rc<RefCell<FxHashMap<u64, Expr>>>,
}

impl Expr {
    fn build(kind: ExprKind) -> Self {
        let structural_hash = hash::compute_expr_hash(&kind);
        let variables = analysis::compute_variables(&kind);
        Self {
            kind,
            structural_hash,
            variables,
            diff_cache: Rc::new(RefCell::new(FxHashMap::default())),
        }
    }

    /// The free variables appearing anywhere in this expression's subtree.
    ///
    /// The set is computed bottom-up once, at construction, and shared
    /// (via `Rc`) with every node that has this one as a child.
    pub fn variables(&self) -> impl Iterator<Item = &Variable> + '_ {
        self.variables.values()
    }

    /// Evaluate the partial derivative with respect to every free
    /// variable, keyed by variable id.
    ///
    /// Equivalent to calling [`Expr::diff`] once per free variable and
    /// [`Expr::value`] on each result, bundled since callers typically
    /// want the whole gradient at once.
    ///
    /// # Errors
    /// Returns the first [`NumericError`](crate::core::error::NumericError)
    /// hit while evaluating any of the partials.
    pub fn diff_values(
        &self,
    ) -> Result<FxHashMap<u64, f64>, crate::core::error::NumericError> {
        let mut out = FxHashMap::default();
        for v in self.variables.values() {
            out.insert(v.id(), self.diff(v).value()?);
        }
        Ok(out)
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Expr").field(&self.kind).finish()
    }
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        self.structural_hash == other.structural_hash && self.kind == other.kind
    }
}

impl Eq for Expr {}

impl std::hash::Hash for Expr {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.structural_hash.hash(state);
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Self::constant(value)
    }
}

impl From<Variable> for Expr {
    fn from(value: Variable) -> Self {
        Self::var(value)
    }
}

impl From<&Variable> for Expr {
    fn from(value: &Variable) -> Self {
        Self::var(value.clone())
    }
}
