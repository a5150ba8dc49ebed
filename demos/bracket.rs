//! Runnable version of the "bracket" scenario from the crate's design
//! notes: an anchored point, two perpendicular corners and two equal
//! side lengths, solved and exported to `bracket.svg`.

use cad_constraints::constraint::Constraint;
use cad_constraints::geometry::{LineSegment, Point, Variable};
use cad_constraints::solver::Solver;
use cad_constraints::svg::Scene;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let a = Point::new(Variable::new(0.0), Variable::new(0.0));
    let b = Point::new(Variable::new(0.0), Variable::new(-5.0));
    let c = Point::new(Variable::new(-5.0), Variable::new(-5.0));
    let d = Point::new(Variable::new(-5.0), Variable::new(0.0));

    let mut solver = Solver::new();
    solver.add_constraint(Constraint::fixed(a.x.clone(), 0.0))?;
    solver.add_constraint(Constraint::fixed(a.y.clone(), 0.0))?;
    solver.add_constraint(Constraint::angle(a.clone(), b.clone(), (-105.0_f64).to_radians()))?;
    solver.add_constraint(Constraint::perpendicular(LineSegment::new(a.clone(), b.clone()), LineSegment::new(b.clone(), c.clone())))?;
    solver.add_constraint(Constraint::length(b.clone(), c.clone(), 5.0))?;
    solver.add_constraint(Constraint::perpendicular(LineSegment::new(c.clone(), d.clone()), LineSegment::new(d.clone(), a.clone())))?;
    solver.add_constraint(Constraint::length(c.clone(), d.clone(), 5.0))?;
    solver.add_constraint(Constraint::horizontal(&d, &a))?;

    let outcome = solver.solve(500);
    println!("solve outcome: {outcome:?}");

    let mut scene = Scene::new();
    for p in [&a, &b, &c, &d] {
        scene.add(p.clone());
    }
    scene.add(LineSegment::new(a.clone(), b.clone()));
    scene.add(LineSegment::new(b, c.clone()));
    scene.add(LineSegment::new(c, d.clone()));
    scene.add(LineSegment::new(d, a));

    let mut file = std::fs::File::create("bracket.svg")?;
    scene.export_svg(&mut file, 30.0)?;
    println!("wrote bracket.svg");
    Ok(())
}
