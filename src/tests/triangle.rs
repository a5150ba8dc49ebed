//! "Triangle with side and angle" — crate design §8, first end-to-end
//! scenario: two length constraints, one relative-angle constraint
//! (realized as an absolute [`Constraint::angle`] once the reference
//! side is pinned horizontal), and a horizontality constraint.

use crate::constraint::Constraint;
use crate::geometry::{Point, Variable};
use crate::solver::Solver;

#[test]
fn triangle_with_side_and_angle_converges_to_the_target_shape() {
    let a = Point::new(Variable::new(0.0), Variable::new(2.0));
    let b = Point::new(Variable::new(1.0), Variable::new(0.0));
    let c = Point::new(Variable::new(3.0), Variable::new(3.0));

    let mut solver = Solver::new();
    solver.add_constraint(Constraint::length(a.clone(), b.clone(), 2.0)).expect("fresh id");
    solver.add_constraint(Constraint::length(c.clone(), a.clone(), 3.0)).expect("fresh id");
    solver.add_constraint(Constraint::horizontal(&a, &b)).expect("fresh id");
    // With AB pinned horizontal, CA's absolute angle equals the
    // angle_between(AB, CA) the scenario asks for.
    solver.add_constraint(Constraint::angle(c.clone(), a.clone(), -30.0_f64.to_radians())).expect("fresh id");

    let outcome = solver.solve(200);
    assert!(outcome.converged(), "expected convergence, got {outcome:?}");
    assert!(outcome.residual_inf_norm().expect("converged") <= 1e-6);

    let ab = ((b.x.value() - a.x.value()).powi(2) + (b.y.value() - a.y.value()).powi(2)).sqrt();
    let ca = ((a.x.value() - c.x.value()).powi(2) + (a.y.value() - c.y.value()).powi(2)).sqrt();
    assert!((ab - 2.0).abs() < 1e-4, "|AB| = {ab}");
    assert!((ca - 3.0).abs() < 1e-4, "|CA| = {ca}");
    assert!((a.y.value() - b.y.value()).abs() < 1e-4, "AB should be horizontal");

    let angle_ca = (a.y.value() - c.y.value()).atan2(a.x.value() - c.x.value());
    assert!((angle_ca - (-30.0_f64.to_radians())).abs() < 1e-3, "angle(CA) = {angle_ca}");
}
