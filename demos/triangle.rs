//! Runnable version of the "triangle with side and angle" scenario from
//! the crate's design notes: builds a triangle, constrains two of its
//! sides and the angle between them, solves, and exports the result to
//! `triangle.svg` in the current directory — the same `/tmp/test{i}.svg`
//! habit the original `parametric` demo scripts had, minus the
//! hardcoded `/tmp`.

use cad_constraints::constraint::Constraint;
use cad_constraints::geometry::{LineSegment, Point, Variable};
use cad_constraints::solver::Solver;
use cad_constraints::svg::Scene;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let a = Point::new(Variable::new(0.0), Variable::new(2.0));
    let b = Point::new(Variable::new(1.0), Variable::new(0.0));
    let c = Point::new(Variable::new(3.0), Variable::new(3.0));

    let mut solver = Solver::new();
    solver.add_constraint(Constraint::length(a.clone(), b.clone(), 2.0))?;
    solver.add_constraint(Constraint::length(c.clone(), a.clone(), 3.0))?;
    solver.add_constraint(Constraint::horizontal(&a, &b))?;
    solver.add_constraint(Constraint::angle(c.clone(), a.clone(), -30.0_f64.to_radians()))?;

    let outcome = solver.solve(200);
    println!("solve outcome: {outcome:?}");

    let mut scene = Scene::new();
    scene.add(a.clone());
    scene.add(b.clone());
    scene.add(c.clone());
    scene.add(LineSegment::new(a.clone(), b.clone()));
    scene.add(LineSegment::new(b, c.clone()));
    scene.add(LineSegment::new(c, a));

    let mut file = std::fs::File::create("triangle.svg")?;
    scene.export_svg(&mut file, 50.0)?;
    println!("wrote triangle.svg");
    Ok(())
}
