//! "Remove-and-reindex" — crate design §8: removing the sole constraint
//! referencing a variable evicts it via `fast_pop`, which moves whatever
//! variable was last in the index into the freed slot; every block row
//! that referenced the moved variable's old dense index must be rewritten
//! to its new one, or the surviving constraints would silently evaluate
//! against the wrong variable after the removal.

use crate::constraint::Constraint;
use crate::geometry::Variable;
use crate::solver::Solver;

#[test]
fn removing_the_only_reference_to_a_variable_reindexes_every_surviving_row() {
    let v0 = Variable::new(0.0);
    let v1 = Variable::new(0.0);
    let v2 = Variable::new(0.0);
    let v3 = Variable::new(0.0);
    let v4 = Variable::new(0.0);
    let v5 = Variable::new(0.0);

    let mut solver = Solver::new();

    // v3 is referenced by exactly this one constraint; every other
    // constraint below avoids it, so v3 is the variable evicted once
    // this constraint is removed.
    let fix_v3 = Constraint::fixed(v3.clone(), 999.0);

    let fix_v0 = Constraint::fixed(v0.clone(), 2.0);
    let eq01 = Constraint::variables_equal(v1.clone(), v0.clone());
    let eq12 = Constraint::variables_equal(v2.clone(), v1.clone());
    let eq42 = Constraint::variables_equal(v4.clone(), v2.clone());
    let eq54 = Constraint::variables_equal(v5.clone(), v4.clone());
    let eq02 = Constraint::variables_equal(v0.clone(), v2.clone());
    let eq14 = Constraint::variables_equal(v1.clone(), v4.clone());
    let eq25 = Constraint::variables_equal(v2.clone(), v5.clone());
    let eq05 = Constraint::variables_equal(v0.clone(), v5.clone());

    for c in [&fix_v0, &fix_v3, &eq01, &eq12, &eq42, &eq54, &eq02, &eq14, &eq25, &eq05] {
        solver.add_constraint(c.clone()).expect("fresh id");
    }
    assert_eq!(solver.variable_count(), 6);
    assert_eq!(solver.constraint_count(), 10);

    solver.remove_constraint(&fix_v3).expect("registered above");
    assert_eq!(solver.variable_count(), 5, "v3 should have been evicted");
    assert_eq!(solver.constraint_count(), 9);
    assert!(!solver.is_registered(&fix_v3));

    // v5 was the last-inserted variable, so it is the one `fast_pop`
    // moved into v3's freed slot. If any of the equalities still touching
    // v5 (eq54, eq25, eq05) had not been repointed at v5's new index, this
    // solve would either converge to the wrong value or not converge.
    let outcome = solver.solve(50);
    assert!(outcome.converged(), "expected convergence, got {outcome:?}");

    for v in [&v0, &v1, &v2, &v4, &v5] {
        assert!((v.value() - 2.0).abs() < 1e-6, "expected 2.0, got {}", v.value());
    }
}
