//! Constraint kinds and their residual templates.
//!
//! A [`Constraint`] is a tagged reference to the variables (and, for
//! [`Constraint::length`]/[`Constraint::angle`], constants) it relates.
//! Identity is by id, exactly like [`Variable`]: two constraints built from
//! the same points with the same target value are still distinct entries in
//! the solver's bookkeeping.
//!
//! Building the actual residual formula — and, for four of the five kinds,
//! its gradient — is delegated to [`template`], which composes the
//! expression layer (`core::expr`) the same way `constraints.py`'s
//! `_Equal` builds `self._expr = b - a` once and reuses it. `Angle` is the
//! one kind whose residual needs `atan2`, which has no node in the
//! expression algebra's closed set (§3 of the crate's design only lists
//! `Const`/`Var`/`Add`/`Mul`/`Neg`/`Sub`/`Div`/`Pow`/`Sq`/`Sqrt`/`Inverse`/
//! `Acos`); its gradient is hand-derived directly in [`block`] instead.

pub(crate) mod block;
mod template;

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::geometry::{LineSegment, Point, Variable};

static NEXT_CONSTRAINT_ID: AtomicU64 = AtomicU64::new(0);

/// The dispatch key a [`Constraint`] resolves to — the "responsible class"
/// of the crate's design, used as the key into the solver's per-kind
/// [`block::Block`] map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum ConstraintKind {
    VariableFixed,
    VariablesEqual,
    Length,
    Angle,
    Perpendicular,
}

impl ConstraintKind {
    pub(crate) const fn name(self) -> &'static str {
        match self {
            Self::VariableFixed => "VariableFixed",
            Self::VariablesEqual => "VariablesEqual",
            Self::Length => "Length",
            Self::Angle => "Angle",
            Self::Perpendicular => "Perpendicular",
        }
    }
}

#[derive(Clone)]
enum ConstraintData {
    VariableFixed { var: Variable, value: f64 },
    VariablesEqual { v1: Variable, v2: Variable },
    Length { line: LineSegment, length: f64 },
    Angle { line: LineSegment, angle: f64 },
    Perpendicular { line1: LineSegment, line2: LineSegment },
}

struct ConstraintInner {
    id: u64,
    data: ConstraintData,
}

/// A single geometric relation between variables — fixed value, equality,
/// length, absolute angle, or perpendicularity.
///
/// Cheap to clone (an `Rc` bump). Equality, hashing and the solver's
/// registration bookkeeping are all by id, not by the constraint's current
/// numeric target — two `Constraint::length(a, b, 3.0)` calls produce two
/// distinct registrable entries even though their parameters are equal.
#[derive(Clone)]
pub struct Constraint(Rc<ConstraintInner>);

impl Constraint {
    fn new(data: ConstraintData) -> Self {
        let id = NEXT_CONSTRAINT_ID.fetch_add(1, Ordering::Relaxed);
        Self(Rc::new(ConstraintInner { id, data }))
    }

    /// Fixes `var` to `value`: a user-requested hard equality, not an
    /// auto-generated soft constraint. Residual: `var - value`.
    #[must_use]
    pub fn fixed(var: Variable, value: f64) -> Self {
        Self::new(ConstraintData::VariableFixed { var, value })
    }

    /// Forces two variables to carry the same value. Residual: `v1 - v2`.
    #[must_use]
    pub fn variables_equal(v1: Variable, v2: Variable) -> Self {
        Self::new(ConstraintData::VariablesEqual { v1, v2 })
    }

    /// Forces `p1.x == p2.x`. Equivalent to
    /// [`Constraint::variables_equal`] on the two points' `x` coordinates.
    #[must_use]
    pub fn vertical(p1: &Point, p2: &Point) -> Self {
        Self::variables_equal(p1.x.clone(), p2.x.clone())
    }

    /// Forces `p1.y == p2.y`. Equivalent to
    /// [`Constraint::variables_equal`] on the two points' `y` coordinates.
    #[must_use]
    pub fn horizontal(p1: &Point, p2: &Point) -> Self {
        Self::variables_equal(p1.y.clone(), p2.y.clone())
    }

    /// Fixes the Euclidean distance between `a` and `b` to `length`.
    /// Residual: `hypot(bx-ax, by-ay) - length`.
    #[must_use]
    pub fn length(a: Point, b: Point, length: f64) -> Self {
        Self::new(ConstraintData::Length { line: LineSegment::new(a, b), length })
    }

    /// Fixes the absolute direction of the segment `a -> b` to `angle`
    /// radians (measured the way [`f64::atan2`] measures `atan2(dy, dx)`).
    /// Residual: `wrap(atan2(by-ay, bx-ax) - angle)`, wrapped into
    /// `(-pi, pi]`.
    #[must_use]
    pub fn angle(a: Point, b: Point, angle: f64) -> Self {
        Self::new(ConstraintData::Angle { line: LineSegment::new(a, b), angle })
    }

    /// Forces `line1` and `line2` to be perpendicular, via the
    /// length-comparison formulation (globally differentiable, unlike an
    /// `arccos`-of-dot-product form, which is undefined when either line
    /// has zero length and singular near parallel/anti-parallel).
    #[must_use]
    pub fn perpendicular(line1: LineSegment, line2: LineSegment) -> Self {
        Self::new(ConstraintData::Perpendicular { line1, line2 })
    }

    /// This constraint's process-wide unique id.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.0.id
    }

    pub(crate) fn kind(&self) -> ConstraintKind {
        match &self.0.data {
            ConstraintData::VariableFixed { .. } => ConstraintKind::VariableFixed,
            ConstraintData::VariablesEqual { .. } => ConstraintKind::VariablesEqual,
            ConstraintData::Length { .. } => ConstraintKind::Length,
            ConstraintData::Angle { .. } => ConstraintKind::Angle,
            ConstraintData::Perpendicular { .. } => ConstraintKind::Perpendicular,
        }
    }

    /// Every variable this constraint references, in schema order, with
    /// repeats if a variable fills more than one parameter slot (two
    /// segments sharing an endpoint, for instance).
    pub fn variables(&self) -> Vec<Variable> {
        match &self.0.data {
            ConstraintData::VariableFixed { var, .. } => vec![var.clone()],
            ConstraintData::VariablesEqual { v1, v2 } => vec![v1.clone(), v2.clone()],
            ConstraintData::Length { line, .. } | ConstraintData::Angle { line, .. } => {
                line.variables().cloned().collect()
            }
            ConstraintData::Perpendicular { line1, line2 } => {
                line1.variables().chain(line2.variables()).cloned().collect()
            }
        }
    }

    pub(crate) fn data(&self) -> &ConstraintData {
        &self.0.data
    }
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constraint").field("id", &self.0.id).field("kind", &self.kind().name()).finish()
    }
}

impl PartialEq for Constraint {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for Constraint {}

impl std::hash::Hash for Constraint {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Variable;

    #[test]
    fn identity_is_by_id_not_parameters() {
        let a = Point::new(Variable::new(0.0), Variable::new(0.0));
        let b = Point::new(Variable::new(1.0), Variable::new(1.0));
        let c1 = Constraint::length(a.clone(), b.clone(), 3.0);
        let c2 = Constraint::length(a, b, 3.0);
        assert_ne!(c1, c2);
    }

    #[test]
    fn length_references_both_endpoints() {
        let a = Point::new(Variable::new(0.0), Variable::new(0.0));
        let b = Point::new(Variable::new(1.0), Variable::new(1.0));
        let c = Constraint::length(a, b, 3.0);
        assert_eq!(c.variables().len(), 4);
    }
}
