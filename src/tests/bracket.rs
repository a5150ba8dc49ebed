//! "Bracket" — crate design §8, second end-to-end scenario: a fixed
//! anchor point, two absolute-angle constraints, two perpendicularity
//! constraints, two length constraints and one horizontality constraint,
//! together pinning a rhombus-shaped bracket rotated 15 degrees off axis.

use crate::constraint::Constraint;
use crate::geometry::{Point, Variable};
use crate::solver::Solver;

#[test]
fn bracket_converges_with_anchor_pinned_and_dn_horizontal() {
    let a = Point::new(Variable::new(0.0), Variable::new(0.0));
    let b = Point::new(Variable::new(0.0), Variable::new(-5.0));
    let c = Point::new(Variable::new(-5.0), Variable::new(-5.0));
    let d = Point::new(Variable::new(-5.0), Variable::new(0.0));

    let mut solver = Solver::new();
    solver.add_constraint(Constraint::fixed(a.x.clone(), 0.0)).expect("fresh id");
    solver.add_constraint(Constraint::fixed(a.y.clone(), 0.0)).expect("fresh id");
    solver.add_constraint(Constraint::angle(a.clone(), b.clone(), (-105.0_f64).to_radians())).expect("fresh id");
    solver
        .add_constraint(Constraint::perpendicular(
            crate::geometry::LineSegment::new(a.clone(), b.clone()),
            crate::geometry::LineSegment::new(b.clone(), c.clone()),
        ))
        .expect("fresh id");
    solver.add_constraint(Constraint::length(b.clone(), c.clone(), 5.0)).expect("fresh id");
    solver
        .add_constraint(Constraint::perpendicular(
            crate::geometry::LineSegment::new(c.clone(), d.clone()),
            crate::geometry::LineSegment::new(d.clone(), a.clone()),
        ))
        .expect("fresh id");
    solver.add_constraint(Constraint::length(c.clone(), d.clone(), 5.0)).expect("fresh id");
    solver.add_constraint(Constraint::horizontal(&d, &a)).expect("fresh id");

    let outcome = solver.solve(500);
    assert!(outcome.converged(), "expected convergence, got {outcome:?}");

    assert!(a.x.value().abs() < 1e-4, "A.x = {}", a.x.value());
    assert!(a.y.value().abs() < 1e-4, "A.y = {}", a.y.value());
    assert!((d.y.value() - a.y.value()).abs() < 1e-4, "DA should be horizontal");

    let bc = ((c.x.value() - b.x.value()).powi(2) + (c.y.value() - b.y.value()).powi(2)).sqrt();
    let cd = ((d.x.value() - c.x.value()).powi(2) + (d.y.value() - c.y.value()).powi(2)).sqrt();
    assert!((bc - 5.0).abs() < 1e-3, "|BC| = {bc}");
    assert!((cd - 5.0).abs() < 1e-3, "|CD| = {cd}");
}
