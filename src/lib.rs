#![forbid(unsafe_code)]
//! 2D parametric geometric constraint solver.
//!
//! A small CAD-sketch kernel: points and line segments carry named scalar
//! [`Variable`](geometry::Variable)s, constraints tie those variables
//! together through symbolic residual expressions, and [`Solver`](solver::Solver)
//! drives the free variables to a least-squares-minimal configuration that
//! satisfies every registered constraint.
//!
//! # Layers
//! - [`core::expr`] — a small symbolic expression DAG (`Expr`) with cached
//!   differentiation, the engine every constraint residual is built from.
//! - [`geometry`] — `Variable`, `Point`, `LineSegment`, `Polyline`.
//! - [`constraint`] — constraint kinds and their residual templates.
//! - [`solver`] — the variable index, per-kind parameter blocks, and the
//!   sequential-quadratic-programming solve loop.
//! - [`svg`] — exporting a [`svg::Scene`] to an SVG document.
//!
//! # Example
//! ```
//! use cad_constraints::geometry::{Point, Variable};
//! use cad_constraints::constraint::Constraint;
//! use cad_constraints::solver::Solver;
//!
//! let a = Point::new(Variable::new(0.0), Variable::new(0.0));
//! let b = Point::new(Variable::new(3.0), Variable::new(4.0));
//!
//! let mut solver = Solver::new();
//! solver.add_constraint(Constraint::length(a.clone(), b.clone(), 10.0)).expect("fresh id");
//!
//! let outcome = solver.solve(50);
//! assert!(outcome.converged());
//! ```

pub mod constraint;
mod core;
pub mod geometry;
pub mod solver;
pub mod svg;
mod util;

#[cfg(test)]
mod tests;

pub use crate::core::error::{NumericError, SchemaError};
pub use crate::core::expr::Expr;
pub use constraint::Constraint;
pub use geometry::{LineSegment, Point, Polyline, Variable};
pub use solver::{SolveOutcome, Solver, SolverConfig, SolverError};
