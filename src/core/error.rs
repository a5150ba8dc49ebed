//! Error types for the expression layer.
//!
//! Two kinds live here, matching the taxonomy in the crate's error handling
//! design: [`SchemaError`] for malformed expression construction (caught at
//! build time, state unchanged) and [`NumericError`] for domain violations
//! discovered during evaluation (the current `value`/`diff` call fails, no
//! partial state is written back).

use std::fmt;

/// An expression was built in a way that violates a structural invariant.
///
/// Surfaced immediately to the caller; the solver's state is left unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum SchemaError {
    /// `pow(base, exponent)` was called with an exponent that is not a
    /// constant expression.
    NonConstantExponent,
    /// A new constraint's parameter schema does not match the schema
    /// already established by the block of its kind.
    ParameterSchemaMismatch {
        /// The constraint kind whose block rejected the new schema.
        kind: &'static str,
    },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonConstantExponent => {
                write!(f, "pow() requires a constant exponent")
            }
            Self::ParameterSchemaMismatch { kind } => {
                write!(f, "parameter schema mismatch in constraint kind `{kind}`")
            }
        }
    }
}

impl std::error::Error for SchemaError {}

/// A domain violation was found while evaluating an expression or one of
/// its derivatives.
///
/// The current solve (or standalone `value()`/`diff_values()` call) fails;
/// no variable is written back. Callers may retry after nudging the
/// initial guess away from the singularity.
#[derive(Debug, Clone, Copy, PartialEq)]
#[non_exhaustive]
pub enum NumericError {
    /// `sqrt(x)` was evaluated with `x < 0`.
    NegativeSqrt(f64),
    /// `acos(x)` was evaluated with `x` outside `[-1, 1]`.
    AcosDomain(f64),
    /// A division (explicit `Div`, or one hidden inside a derivative rule
    /// such as `Sqrt`'s or `Inverse`'s) had a zero denominator.
    DivisionByZero,
    /// An `Angle` constraint's line has coincident endpoints, so its
    /// direction (and therefore the angle residual) is undefined.
    DegenerateLine,
}

impl fmt::Display for NumericError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NegativeSqrt(x) => write!(f, "sqrt() of negative value {x}"),
            Self::AcosDomain(x) => write!(f, "acos() of out-of-domain value {x}"),
            Self::DivisionByZero => write!(f, "division by zero"),
            Self::DegenerateLine => write!(f, "line has coincident endpoints, direction undefined"),
        }
    }
}

impl std::error::Error for NumericError {}
