//! The variable index, per-kind constraint blocks, and the
//! sequential-quadratic-programming solve loop that ties them together.
//!
//! [`Solver`] owns every [`Variable`](crate::geometry::Variable) it has
//! seen (deduplicated by id, across every registered constraint) and one
//! [`Block`](crate::constraint::block::Block) per constraint kind that is
//! actually in use. `add_constraint`/`remove_constraint` keep three things
//! in lockstep: the variable index, the constraint's row in its kind's
//! block, and the registration map used for O(1) `AlreadyRegistered`/
//! `NotRegistered` checks — the [`IndexedMap::debug_assert_invariants`]
//! style self-check (`Solver::debug_assert_invariants`) runs after every
//! edit in debug builds to keep that lockstep honest.

mod config;
mod error;

pub use config::SolverConfig;
pub use error::SolverError;

use nalgebra::{DMatrix, DVector};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::constraint::block::Block;
use crate::constraint::{Constraint, ConstraintKind};
use crate::core::error::NumericError;
use crate::geometry::Variable;
use crate::util::IndexedMap;

struct VariableSlot {
    variable: Variable,
    /// The registered constraints referencing this variable, as a
    /// multiset with repeats (two parameter slots of one constraint both
    /// pointing at this variable counts twice).
    refs: Vec<u64>,
}

/// The result of a [`Solver::solve`] call.
///
/// Not an error type: `NotConverged` is an expected, inspectable outcome
/// (the model may simply be over-constrained or the initial guess poor),
/// not a programming mistake, so `solve` returns this plain enum rather
/// than a `Result`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[non_exhaustive]
pub enum SolveOutcome {
    /// Every row's residual settled within its kind's tolerance.
    /// Variable values have been written back.
    Converged {
        /// The largest absolute residual across every constraint row.
        residual_inf_norm: f64,
        /// How many SQP iterations were run.
        iterations: usize,
    },
    /// `max_iterations` was reached (or the KKT system went singular)
    /// without every row settling within tolerance. Variable values are
    /// written back only if [`SolverConfig::best_effort`] is set.
    NotConverged {
        /// The largest absolute residual across every constraint row, at
        /// the last point reached.
        residual_inf_norm: f64,
        /// How many SQP iterations were run.
        iterations: usize,
    },
    /// A residual or derivative hit a domain violation (negative `sqrt`,
    /// out-of-range `acos`, a degenerate `Angle` line) partway through the
    /// solve. Variable values are left unchanged.
    NumericError(NumericError),
}

impl SolveOutcome {
    /// Whether every row settled within its kind's tolerance.
    #[must_use]
    pub fn converged(&self) -> bool {
        matches!(self, Self::Converged { .. })
    }

    /// The residual infinity norm, if the solve ran at least one
    /// evaluation (`None` only for [`SolveOutcome::NumericError`]).
    #[must_use]
    pub fn residual_inf_norm(&self) -> Option<f64> {
        match self {
            Self::Converged { residual_inf_norm, .. } | Self::NotConverged { residual_inf_norm, .. } => Some(*residual_inf_norm),
            Self::NumericError(_) => None,
        }
    }

    /// How many SQP iterations were run, if any.
    #[must_use]
    pub fn iterations(&self) -> Option<usize> {
        match self {
            Self::Converged { iterations, .. } | Self::NotConverged { iterations, .. } => Some(*iterations),
            Self::NumericError(_) => None,
        }
    }
}

/// Owns the variable index and per-kind constraint blocks, and drives the
/// SQP solve that settles every registered constraint's residual.
pub struct Solver {
    variables: IndexedMap<u64, VariableSlot>,
    blocks: FxHashMap<ConstraintKind, Block>,
    registered: FxHashMap<u64, ConstraintKind>,
    config: SolverConfig,
    auto_solve: bool,
}

impl Default for Solver {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver {
    /// Creates an empty solver with [`SolverConfig::default`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(SolverConfig::default())
    }

    /// Creates an empty solver with a given configuration.
    #[must_use]
    pub fn with_config(config: SolverConfig) -> Self {
        Self {
            variables: IndexedMap::new(),
            blocks: FxHashMap::default(),
            registered: FxHashMap::default(),
            config,
            auto_solve: false,
        }
    }

    /// The current configuration.
    #[must_use]
    pub fn config(&self) -> SolverConfig {
        self.config
    }

    /// Replaces the configuration used by subsequent `solve` calls.
    pub fn set_config(&mut self, config: SolverConfig) {
        self.config = config;
    }

    /// Whether `add_constraint` automatically re-solves after registering.
    #[must_use]
    pub fn auto_solve(&self) -> bool {
        self.auto_solve
    }

    /// Enables or disables automatically re-solving on every
    /// `add_constraint`, using `self.config().max_iterations`.
    pub fn set_auto_solve(&mut self, enabled: bool) {
        self.auto_solve = enabled;
    }

    /// How many distinct variables are currently tracked.
    #[must_use]
    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    /// How many constraints are currently registered.
    #[must_use]
    pub fn constraint_count(&self) -> usize {
        self.registered.len()
    }

    /// Whether `constraint` is currently registered with this solver.
    #[must_use]
    pub fn is_registered(&self, constraint: &Constraint) -> bool {
        self.registered.contains_key(&constraint.id())
    }

    /// Registers `constraint`, allocating dense indices for any of its
    /// variables not already tracked.
    ///
    /// # Errors
    /// Returns [`SolverError::AlreadyRegistered`] if `constraint`'s id is
    /// already registered with this solver.
    ///
    /// # Panics
    /// Never, in practice: the variable index resolved inside this
    /// function is populated for every one of `constraint`'s variables
    /// immediately before it is queried.
    pub fn add_constraint(&mut self, constraint: Constraint) -> Result<(), SolverError> {
        if self.registered.contains_key(&constraint.id()) {
            return Err(SolverError::AlreadyRegistered);
        }

        for var in constraint.variables() {
            if !self.variables.contains_key(&var.id()) {
                self.variables.insert(var.id(), VariableSlot { variable: var.clone(), refs: Vec::new() });
            }
            self.variables.get_mut(&var.id()).expect("inserted above if absent").refs.push(constraint.id());
        }

        let kind = constraint.kind();
        let blocks = &mut self.blocks;
        let variables = &self.variables;
        let block = blocks.entry(kind).or_insert_with(|| Block::new_for(kind));
        block.push(constraint.clone(), |id| variables.index_of(&id).expect("variable registered above"));

        self.registered.insert(constraint.id(), kind);
        tracing::debug!(constraint_id = constraint.id(), kind = kind.name(), "constraint registered");

        #[cfg(debug_assertions)]
        self.debug_assert_invariants();

        if self.auto_solve {
            let _ = self.solve(self.config.max_iterations);
        }
        Ok(())
    }

    /// Unregisters `constraint`, evicting any variable left with no other
    /// referencing constraint and repairing every other block's row
    /// indices for the variable that had to move to fill the gap.
    ///
    /// # Errors
    /// Returns [`SolverError::NotRegistered`] if `constraint`'s id is not
    /// currently registered with this solver.
    pub fn remove_constraint(&mut self, constraint: &Constraint) -> Result<(), SolverError> {
        let Some(kind) = self.registered.remove(&constraint.id()) else {
            return Err(SolverError::NotRegistered);
        };

        if let Some(block) = self.blocks.get_mut(&kind) {
            block.fast_pop(constraint.id());
        }

        for var in constraint.variables() {
            self.release_variable_reference(var.id(), constraint.id());
        }

        tracing::debug!(constraint_id = constraint.id(), kind = kind.name(), "constraint removed");

        #[cfg(debug_assertions)]
        self.debug_assert_invariants();
        Ok(())
    }

    fn release_variable_reference(&mut self, var_id: u64, constraint_id: u64) {
        let Some(slot) = self.variables.get_mut(&var_id) else {
            return;
        };
        if let Some(pos) = slot.refs.iter().position(|&id| id == constraint_id) {
            slot.refs.swap_remove(pos);
        }
        let still_referenced = self.variables.get(&var_id).is_some_and(|slot| !slot.refs.is_empty());
        if !still_referenced {
            self.evict_variable(var_id);
        }
    }

    /// Removes a no-longer-referenced variable from the index and, if a
    /// different variable had to move into its slot, rewrites every block
    /// row that referenced the moved variable's old dense index.
    fn evict_variable(&mut self, var_id: u64) {
        let Some(popped) = self.variables.fast_pop(&var_id) else {
            return;
        };
        let Some((moved_key, new_index)) = popped.moved else {
            return;
        };
        let old_index = self.variables.len();
        let refs = self.variables.get(&moved_key).map_or_else(Vec::new, |slot| slot.refs.clone());

        let mut patched: FxHashSet<u64> = FxHashSet::default();
        for constraint_id in refs {
            if !patched.insert(constraint_id) {
                continue;
            }
            if let Some(&kind) = self.registered.get(&constraint_id) {
                if let Some(block) = self.blocks.get_mut(&kind) {
                    block.patch(constraint_id, old_index, new_index);
                }
            }
        }
    }

    fn tolerance_per_row(&self) -> Vec<f64> {
        let total: usize = self.blocks.values().map(Block::len).sum();
        let mut tol = Vec::with_capacity(total);
        for block in self.blocks.values() {
            let kind_tol = match block.kind() {
                ConstraintKind::Angle => self.config.angle_tol,
                ConstraintKind::VariableFixed | ConstraintKind::VariablesEqual | ConstraintKind::Length | ConstraintKind::Perpendicular => {
                    self.config.length_tol
                }
            };
            tol.extend(std::iter::repeat(kind_tol).take(block.len()));
        }
        tol
    }

    fn evaluate_all(&self, x: &[f64], residual: &mut [f64], jacobian: &mut DMatrix<f64>) -> Result<(), NumericError> {
        jacobian.fill(0.0);
        let mut offset = 0;
        for block in self.blocks.values() {
            block.evaluate(x, residual, jacobian, offset)?;
            offset += block.len();
        }
        Ok(())
    }

    fn write_back(&self, x: &[f64]) {
        for (i, (_, slot)) in self.variables.iter().enumerate() {
            slot.variable.set_value(x[i]);
        }
    }

    /// Solves the Newton-Lagrange KKT system for the step that minimizes
    /// `sum((x - x0)^2)` subject to the current residual's linearization,
    /// per the crate's SQP design. Returns `None` if the augmented KKT
    /// matrix is singular.
    fn newton_lagrange_step(x: &[f64], x0: &[f64], residual: &[f64], jacobian: &DMatrix<f64>, n: usize, m: usize) -> Option<Vec<f64>> {
        let dim = n + m;
        let mut a = DMatrix::<f64>::zeros(dim, dim);
        for i in 0..n {
            a[(i, i)] = 2.0;
        }
        for row in 0..m {
            for col in 0..n {
                let j = jacobian[(row, col)];
                a[(col, n + row)] = j;
                a[(n + row, col)] = j;
            }
        }

        let mut rhs = DVector::<f64>::zeros(dim);
        for i in 0..n {
            rhs[i] = -2.0 * (x[i] - x0[i]);
        }
        for row in 0..m {
            rhs[n + row] = -residual[row];
        }

        let solution = a.lu().solve(&rhs)?;
        Some(solution.rows(0, n).iter().copied().collect())
    }

    /// Runs the sequential-quadratic-programming loop described in the
    /// crate's design: a Newton-Lagrange step on the KKT system of
    /// `minimize sum((x-x0)^2)` subject to every registered constraint's
    /// residual, with step-halving when a step makes the residual's
    /// infinity norm worse. Iterates until every row's residual is within
    /// its kind's tolerance or `max_iterations` is reached.
    pub fn solve(&mut self, max_iterations: usize) -> SolveOutcome {
        let n = self.variables.len();
        let m: usize = self.blocks.values().map(Block::len).sum();

        if n == 0 || m == 0 {
            return SolveOutcome::Converged { residual_inf_norm: 0.0, iterations: 0 };
        }

        let x0: Vec<f64> = self.variables.values().map(|slot| slot.variable.value()).collect();
        let mut x = x0.clone();
        let tol = self.tolerance_per_row();

        let mut residual = vec![0.0; m];
        let mut jacobian = DMatrix::<f64>::zeros(m, n);
        let mut iterations_run = 0;
        let mut last_norm = f64::INFINITY;

        for iteration in 0..max_iterations {
            iterations_run = iteration + 1;

            if let Err(err) = self.evaluate_all(&x, &mut residual, &mut jacobian) {
                tracing::warn!(?err, "solve: numeric error evaluating residuals");
                return SolveOutcome::NumericError(err);
            }

            let inf_norm = residual.iter().fold(0.0_f64, |acc, &r| acc.max(r.abs()));
            last_norm = inf_norm;
            if self.config.verbose {
                tracing::debug!(iteration, residual_inf_norm = inf_norm, "solve iteration");
            }

            let converged = residual.iter().zip(&tol).all(|(&r, &t)| r.abs() <= t);
            if converged {
                self.write_back(&x);
                tracing::debug!(iterations = iterations_run, residual_inf_norm = inf_norm, "solve converged");
                return SolveOutcome::Converged { residual_inf_norm: inf_norm, iterations: iterations_run };
            }

            let Some(step) = Self::newton_lagrange_step(&x, &x0, &residual, &jacobian, n, m) else {
                tracing::warn!("solve: KKT system is singular");
                if self.config.best_effort {
                    self.write_back(&x);
                }
                return SolveOutcome::NotConverged { residual_inf_norm: inf_norm, iterations: iterations_run };
            };

            x = self.accept_step(&x, &step, inf_norm, m, &mut jacobian);
        }

        tracing::warn!(residual_inf_norm = last_norm, max_iterations, "solve: did not converge");
        if self.config.best_effort {
            self.write_back(&x);
        }
        SolveOutcome::NotConverged { residual_inf_norm: last_norm, iterations: iterations_run }
    }

    /// Applies `step` to `x`, halving it up to `config.max_step_halvings`
    /// times if the resulting residual's infinity norm is worse than
    /// `current_norm`. `scratch_jacobian` is reused only as evaluation
    /// scratch space; its contents are recomputed at the start of every
    /// outer solve iteration regardless.
    fn accept_step(&self, x: &[f64], step: &[f64], current_norm: f64, m: usize, scratch_jacobian: &mut DMatrix<f64>) -> Vec<f64> {
        let mut trial = x.to_vec();
        let mut trial_residual = vec![0.0; m];
        let mut scale = 1.0;

        for attempt in 0..=self.config.max_step_halvings {
            for (t, (&xi, &pi)) in trial.iter_mut().zip(x.iter().zip(step)) {
                *t = scale.mul_add(pi, xi);
            }
            let evaluated = self.evaluate_all(&trial, &mut trial_residual, scratch_jacobian);
            if let Ok(()) = evaluated {
                let trial_norm = trial_residual.iter().fold(0.0_f64, |acc, &r| acc.max(r.abs()));
                if trial_norm <= current_norm || attempt == self.config.max_step_halvings {
                    break;
                }
            }
            scale *= 0.5;
        }
        trial
    }

    #[cfg(debug_assertions)]
    fn debug_assert_invariants(&self) {
        self.variables.debug_assert_invariants();
        let total_rows: usize = self.blocks.values().map(Block::len).sum();
        debug_assert_eq!(total_rows, self.registered.len(), "block row counts disagree with the registration map");
        for (var_id, slot) in self.variables.iter() {
            debug_assert_eq!(*var_id, slot.variable.id(), "variable index key disagrees with its slot's handle");
            for constraint_id in &slot.refs {
                debug_assert!(self.registered.contains_key(constraint_id), "variable references an unregistered constraint");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    #[test]
    fn length_constraint_converges() {
        let a = Point::new(Variable::new(0.0), Variable::new(0.0));
        let b = Point::new(Variable::new(3.0), Variable::new(4.0));
        let mut solver = Solver::new();
        solver.add_constraint(Constraint::length(a.clone(), b.clone(), 10.0)).expect("fresh id");

        let outcome = solver.solve(50);
        assert!(outcome.converged());
        let dist = ((b.x.value() - a.x.value()).powi(2) + (b.y.value() - a.y.value()).powi(2)).sqrt();
        assert!((dist - 10.0).abs() < 1e-4);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let a = Point::new(Variable::new(0.0), Variable::new(0.0));
        let b = Point::new(Variable::new(1.0), Variable::new(1.0));
        let mut solver = Solver::new();
        let c = Constraint::length(a, b, 3.0);
        solver.add_constraint(c.clone()).expect("fresh id");
        assert_eq!(solver.add_constraint(c), Err(SolverError::AlreadyRegistered));
    }

    #[test]
    fn removing_unknown_constraint_errors() {
        let a = Point::new(Variable::new(0.0), Variable::new(0.0));
        let b = Point::new(Variable::new(1.0), Variable::new(1.0));
        let mut solver = Solver::new();
        let c = Constraint::length(a, b, 3.0);
        assert_eq!(solver.remove_constraint(&c), Err(SolverError::NotRegistered));
    }

    #[test]
    fn remove_constraint_evicts_orphaned_variables() {
        let a = Point::new(Variable::new(0.0), Variable::new(0.0));
        let b = Point::new(Variable::new(1.0), Variable::new(1.0));
        let mut solver = Solver::new();
        let c = Constraint::length(a, b, 3.0);
        solver.add_constraint(c.clone()).expect("fresh id");
        assert_eq!(solver.variable_count(), 4);

        solver.remove_constraint(&c).expect("registered above");
        assert_eq!(solver.variable_count(), 0);
        assert_eq!(solver.constraint_count(), 0);
    }

    #[test]
    fn remove_constraint_reindexes_surviving_rows() {
        let a = Point::new(Variable::new(0.0), Variable::new(0.0));
        let b = Point::new(Variable::new(3.0), Variable::new(0.0));
        let c = Point::new(Variable::new(0.0), Variable::new(3.0));
        let mut solver = Solver::new();

        let first = Constraint::length(a, b.clone(), 3.0);
        let second = Constraint::length(b.clone(), c.clone(), 3.0);
        solver.add_constraint(first.clone()).expect("fresh id");
        solver.add_constraint(second.clone()).expect("fresh id");

        solver.remove_constraint(&first).expect("registered above");
        assert_eq!(solver.constraint_count(), 1);

        let outcome = solver.solve(50);
        assert!(outcome.converged());
        let dist = ((c.x.value() - b.x.value()).powi(2) + (c.y.value() - b.y.value()).powi(2)).sqrt();
        assert!((dist - 3.0).abs() < 1e-4);
    }

    #[test]
    fn angle_constraint_converges() {
        let a = Point::new(Variable::new(0.0), Variable::new(0.0));
        let b = Point::new(Variable::new(1.0), Variable::new(1.0));
        let mut solver = Solver::new();
        solver.add_constraint(Constraint::fixed(a.x.clone(), 0.0)).expect("fresh id");
        solver.add_constraint(Constraint::fixed(a.y.clone(), 0.0)).expect("fresh id");
        solver.add_constraint(Constraint::length(a.clone(), b.clone(), 5.0)).expect("fresh id");
        solver.add_constraint(Constraint::angle(a, b.clone(), 0.0)).expect("fresh id");

        let outcome = solver.solve(100);
        assert!(outcome.converged());
        assert!((b.x.value() - 5.0).abs() < 1e-3);
        assert!(b.y.value().abs() < 1e-3);
    }

    #[test]
    fn empty_solver_reports_converged() {
        let mut solver = Solver::new();
        let outcome = solver.solve(10);
        assert!(outcome.converged());
        assert_eq!(outcome.iterations(), Some(0));
    }
}
