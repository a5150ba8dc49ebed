//! Core symbolic machinery shared by every constraint kind.
//!
//! - `expr` — the expression DAG (`Expr` / `ExprKind`), builders, evaluation
//!   and differentiation.
//! - `error` — the numeric and schema error types produced by this layer.

pub(crate) mod error;
pub(crate) mod expr;
