//! "Builder simplifications" — crate design §8, universal invariant 2:
//! the expression constructors fold constants and apply the rewrites from
//! crate design §3 eagerly, not as a later pass, so two structurally
//! different build sequences that denote the same canonical form must
//! compare equal.

use quickcheck::quickcheck;

use crate::core::expr::Expr;
use crate::geometry::Variable;

fn var(value: f64) -> Expr {
    Expr::var(Variable::new(value))
}

#[test]
fn mul_by_zero_collapses_to_the_zero_constant() {
    let x = var(3.0);
    assert_eq!(Expr::mul([Expr::constant(0.0), x]), Expr::constant(0.0));
}

#[test]
fn mul_by_one_elides_the_unit_factor() {
    let x = var(1.0);
    let y = var(2.0);
    let z = var(3.0);
    let with_one = Expr::mul([Expr::constant(1.0), x.clone(), y.clone(), z.clone()]);
    let without = Expr::mul([x, y, z]);
    assert_eq!(with_one, without);
}

#[test]
fn add_zero_is_the_identity() {
    let x = var(5.0);
    assert_eq!(Expr::add([Expr::constant(0.0), x.clone()]), x);
}

#[test]
fn add_folds_its_constant_terms_into_one() {
    let x = var(5.0);
    let scattered = Expr::add([x.clone(), Expr::constant(1.0), Expr::constant(2.0), Expr::constant(3.0)]);
    let folded = Expr::add([x, Expr::constant(6.0)]);
    assert_eq!(scattered, folded);
}

#[test]
fn double_negation_cancels() {
    let x = var(7.0);
    assert_eq!(Expr::neg(Expr::neg(x.clone())), x);
}

#[test]
fn double_inverse_cancels() {
    let x = var(4.0);
    assert_eq!(Expr::inverse(Expr::inverse(x.clone())), x);
}

#[test]
fn negating_a_product_folds_the_sign_into_its_constant_factor() {
    let x = var(2.0);
    let negated = Expr::neg(Expr::mul([Expr::constant(2.0), x.clone()]));
    let rebuilt = Expr::mul([Expr::constant(-2.0), x]);
    assert_eq!(negated, rebuilt);
}

#[test]
fn constant_only_expressions_fold_to_the_exact_value() {
    let e = Expr::add([Expr::constant(1.0), Expr::mul([Expr::constant(2.0), Expr::constant(3.0)]), Expr::constant(4.0)]);
    assert_eq!(e.value().expect("no domain error"), 11.0);
}

#[test]
fn pow_rewrites_match_their_named_special_cases() {
    let x = var(2.0);
    assert_eq!(Expr::pow_const(x.clone(), 0.0), Expr::constant(1.0));
    assert_eq!(Expr::pow_const(x.clone(), 1.0), x);
    assert_eq!(Expr::pow_const(x.clone(), -1.0), Expr::inverse(x.clone()));
    assert_eq!(Expr::pow_const(x.clone(), 0.5), Expr::sqrt(x.clone()));
    assert_eq!(Expr::pow_const(x.clone(), 2.0), Expr::sq(x));
}

quickcheck! {
    /// Folding a chain of finite constants through `add` matches plain
    /// sequential `f64` addition in the same order (the same order
    /// `Expr::add`'s builder folds its constant part in).
    fn add_constant_folding_matches_sequential_sum(a: f64, b: f64, c: f64) -> bool {
        if !(a.is_finite() && b.is_finite() && c.is_finite()) {
            return true;
        }
        let folded = Expr::add([Expr::constant(a), Expr::constant(b), Expr::constant(c)]);
        folded == Expr::constant(a + b + c)
    }

    /// Folding a chain of finite, nonzero constants through `mul` matches
    /// plain sequential `f64` multiplication in the same order.
    fn mul_constant_folding_matches_sequential_product(a: f64, b: f64) -> bool {
        if !(a.is_finite() && b.is_finite()) || a == 0.0 || b == 0.0 {
            return true;
        }
        let folded = Expr::mul([Expr::constant(a), Expr::constant(b)]);
        folded == Expr::constant(a * b)
    }

    /// `neg(neg(x))` cancels back to `x` regardless of `x`'s current
    /// value — the rewrite is purely structural.
    fn double_negation_is_always_the_identity(value: f64) -> bool {
        let x = var(value);
        Expr::neg(Expr::neg(x.clone())) == x
    }
}
