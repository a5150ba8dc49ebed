//! Structural hashing for [`super::ExprKind`].
//!
//! Every node's hash is computed once, bottom-up, from its own discriminant
//! and its children's *already-computed* structural hashes (never by
//! re-walking the children), so hashing a deep tree costs O(1) work per
//! node at construction time and O(depth) work never repeats.

use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

use super::ExprKind;

/// Discriminant tags, hashed first so that e.g. `Sq(x)` and `Sqrt(x)` never
/// collide purely because they both wrap one child.
#[derive(Hash)]
enum Tag {
    Const,
    Var,
    Add,
    Mul,
    Neg,
    Sub,
    Div,
    Pow,
    Sq,
    Sqrt,
    Inverse,
    Acos,
}

pub(super) fn compute_expr_hash(kind: &ExprKind) -> u64 {
    let mut hasher = FxHasher::default();
    hash_kind(kind, &mut hasher);
    hasher.finish()
}

fn hash_kind(kind: &ExprKind, hasher: &mut FxHasher) {
    match kind {
        ExprKind::Const(x) => {
            Tag::Const.hash(hasher);
            x.to_bits().hash(hasher);
        }
        ExprKind::Var(v) => {
            Tag::Var.hash(hasher);
            v.id().hash(hasher);
        }
        ExprKind::Add(terms) => {
            Tag::Add.hash(hasher);
            terms.len().hash(hasher);
            for t in terms {
                t.structural_hash.hash(hasher);
            }
        }
        ExprKind::Mul(factors) => {
            Tag::Mul.hash(hasher);
            factors.len().hash(hasher);
            for f in factors {
                f.structural_hash.hash(hasher);
            }
        }
        ExprKind::Neg(a) => {
            Tag::Neg.hash(hasher);
            a.structural_hash.hash(hasher);
        }
        ExprKind::Sub(a, b) => {
            Tag::Sub.hash(hasher);
            a.structural_hash.hash(hasher);
            b.structural_hash.hash(hasher);
        }
        ExprKind::Div(a, b) => {
            Tag::Div.hash(hasher);
            a.structural_hash.hash(hasher);
            b.structural_hash.hash(hasher);
        }
        ExprKind::Pow(a, exp) => {
            Tag::Pow.hash(hasher);
            a.structural_hash.hash(hasher);
            exp.to_bits().hash(hasher);
        }
        ExprKind::Sq(a) => {
            Tag::Sq.hash(hasher);
            a.structural_hash.hash(hasher);
        }
        ExprKind::Sqrt(a) => {
            Tag::Sqrt.hash(hasher);
            a.structural_hash.hash(hasher);
        }
        ExprKind::Inverse(a) => {
            Tag::Inverse.hash(hasher);
            a.structural_hash.hash(hasher);
        }
        ExprKind::Acos(a) => {
            Tag::Acos.hash(hasher);
            a.structural_hash.hash(hasher);
        }
    }
}
