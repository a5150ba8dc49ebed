//! Solver tuning knobs, with named presets mirroring the teacher's own
//! `fast`/`precise`/`robust` shape.

/// Tuning knobs for [`super::Solver::solve`].
///
/// No `serde` derive: the teacher crate never takes on a serialization
/// dependency for its own `SolverConfig`, so neither does this one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverConfig {
    /// Maximum number of SQP iterations per `solve` call.
    pub max_iterations: usize,
    /// Convergence threshold on the residual's infinity norm for
    /// `Length`/`VariablesEqual`/`VariableFixed`/`Perpendicular` rows
    /// (length-unit residuals).
    pub length_tol: f64,
    /// Convergence threshold on the residual's infinity norm for `Angle`
    /// rows (radian-unit residuals).
    pub angle_tol: f64,
    /// How many times a step is halved if it makes the residual norm
    /// worse, before the iteration gives up and keeps the pre-step point.
    pub max_step_halvings: u32,
    /// Writes the solved values back to every `Variable` even when the
    /// solve does not converge within `max_iterations`, instead of leaving
    /// the model at its pre-solve configuration.
    pub best_effort: bool,
    /// Emits `tracing` events at `debug` for every iteration's residual
    /// norm, not just at the start/end.
    pub verbose: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            length_tol: 1e-6,
            angle_tol: 1e-6,
            max_step_halvings: 8,
            best_effort: false,
            verbose: false,
        }
    }
}

impl SolverConfig {
    /// Fewer iterations, looser tolerance: quick interactive feedback
    /// while a sketch is being dragged.
    #[must_use]
    pub fn fast() -> Self {
        Self { max_iterations: 30, length_tol: 1e-4, angle_tol: 1e-4, ..Self::default() }
    }

    /// More iterations, tighter tolerance: a final solve before export.
    #[must_use]
    pub fn precise() -> Self {
        Self { max_iterations: 300, length_tol: 1e-9, angle_tol: 1e-9, ..Self::default() }
    }

    /// More step-halvings and `best_effort` writeback, for sketches with
    /// `Angle`/`Perpendicular` constraints prone to overshoot.
    #[must_use]
    pub fn robust() -> Self {
        Self { max_iterations: 500, max_step_halvings: 16, best_effort: true, ..Self::default() }
    }
}

#[cfg(test)]
mod tests {
    use super::SolverConfig;

    #[test]
    fn presets_diverge_from_default_in_the_documented_direction() {
        let default = SolverConfig::default();
        let fast = SolverConfig::fast();
        let precise = SolverConfig::precise();
        assert!(fast.max_iterations < default.max_iterations);
        assert!(precise.max_iterations > default.max_iterations);
        assert!(precise.length_tol < default.length_tol);
    }
}
