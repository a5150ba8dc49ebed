//! Numeric evaluation of [`super::Expr`].
//!
//! `value()` recurses once per call (no caching: variables mutate between
//! solver iterations, so a cached value would go stale the moment a caller
//! nudges one). Domain violations — `sqrt` of a negative number, `acos`
//! outside `[-1, 1]`, division by zero — are surfaced as a
//! [`NumericError`] rather than silently propagating `NaN`/`inf`.

use super::{Expr, ExprKind};
use crate::core::error::NumericError;

impl Expr {
    /// The current numeric value of this expression.
    ///
    /// # Errors
    /// Returns [`NumericError`] if evaluation hits a domain violation
    /// anywhere in the subtree (negative `sqrt`, out-of-range `acos`, or a
    /// zero denominator in a `Div`, `Sqrt`'s derivative, or `Inverse`).
    #[allow(clippy::float_cmp, reason = "checking for exact zero denominators, not approximate equality")]
    pub fn value(&self) -> Result<f64, NumericError> {
        match &self.kind {
            ExprKind::Const(x) => Ok(*x),
            ExprKind::Var(v) => Ok(v.value()),
            ExprKind::Add(terms) => {
                // Neumaier (improved Kahan) compensated summation.
                let mut sum = 0.0_f64;
                let mut compensation = 0.0_f64;
                for term in terms {
                    let x = term.value()?;
                    let new_sum = sum + x;
                    if sum.abs() >= x.abs() {
                        compensation += (sum - new_sum) + x;
                    } else {
                        compensation += (x - new_sum) + sum;
                    }
                    sum = new_sum;
                }
                Ok(sum + compensation)
            }
            ExprKind::Mul(factors) => {
                let mut product = 1.0_f64;
                for factor in factors {
                    product *= factor.value()?;
                }
                Ok(product)
            }
            ExprKind::Neg(a) => Ok(-a.value()?),
            ExprKind::Sub(a, b) => Ok(a.value()? - b.value()?),
            ExprKind::Div(a, b) => {
                let (a, b) = (a.value()?, b.value()?);
                if b == 0.0 {
                    return Err(NumericError::DivisionByZero);
                }
                Ok(a / b)
            }
            ExprKind::Pow(a, p) => Ok(a.value()?.powf(*p)),
            ExprKind::Sq(a) => {
                let a = a.value()?;
                Ok(a * a)
            }
            ExprKind::Sqrt(a) => {
                let a = a.value()?;
                if a < 0.0 {
                    return Err(NumericError::NegativeSqrt(a));
                }
                Ok(a.sqrt())
            }
            ExprKind::Inverse(a) => {
                let a = a.value()?;
                if a == 0.0 {
                    return Err(NumericError::DivisionByZero);
                }
                Ok(1.0 / a)
            }
            ExprKind::Acos(a) => {
                let a = a.value()?;
                if !(-1.0..=1.0).contains(&a) {
                    return Err(NumericError::AcosDomain(a));
                }
                Ok(a.acos())
            }
        }
    }
}
