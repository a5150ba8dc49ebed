//! "Non-convergence" — crate design §8: a triangle whose three length
//! constraints violate the triangle inequality has no feasible
//! configuration at all, so `solve` must report `NotConverged` rather
//! than settling on a spurious near-miss, and must leave the variables
//! untouched unless `best_effort` was requested.

use crate::constraint::Constraint;
use crate::geometry::{Point, Variable};
use crate::solver::{SolveOutcome, Solver, SolverConfig};

fn impossible_triangle() -> (Point, Point, Point, Vec<Constraint>) {
    let a = Point::new(Variable::new(0.0), Variable::new(0.0));
    let b = Point::new(Variable::new(1.0), Variable::new(0.0));
    let c = Point::new(Variable::new(0.0), Variable::new(1.0));

    let constraints = vec![
        Constraint::length(a.clone(), b.clone(), 1.0),
        Constraint::length(b.clone(), c.clone(), 1.0),
        Constraint::length(c.clone(), a.clone(), 10.0),
    ];
    (a, b, c, constraints)
}

#[test]
fn violated_triangle_inequality_does_not_converge_and_leaves_variables_unchanged() {
    let (a, b, c, constraints) = impossible_triangle();
    let initial: Vec<f64> = [&a, &b, &c].iter().flat_map(|p| [p.x.value(), p.y.value()]).collect();

    let mut solver = Solver::new();
    for constraint in constraints {
        solver.add_constraint(constraint).expect("fresh id");
    }

    let outcome = solver.solve(100);
    assert!(!outcome.converged(), "an impossible triangle inequality should not converge");
    assert!(matches!(outcome, SolveOutcome::NotConverged { .. }));

    let after: Vec<f64> = [&a, &b, &c].iter().flat_map(|p| [p.x.value(), p.y.value()]).collect();
    assert_eq!(initial, after, "variables must be left untouched on non-convergence");
}

#[test]
fn best_effort_writes_back_even_without_convergence() {
    let (a, b, c, constraints) = impossible_triangle();
    let initial: Vec<f64> = [&a, &b, &c].iter().flat_map(|p| [p.x.value(), p.y.value()]).collect();

    let mut solver = Solver::with_config(SolverConfig { best_effort: true, ..SolverConfig::default() });
    for constraint in constraints {
        solver.add_constraint(constraint).expect("fresh id");
    }

    let outcome = solver.solve(100);
    assert!(!outcome.converged());

    let after: Vec<f64> = [&a, &b, &c].iter().flat_map(|p| [p.x.value(), p.y.value()]).collect();
    assert_ne!(initial, after, "best_effort should write the final iterate back even without convergence");
}
