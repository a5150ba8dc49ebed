//! Per-kind constraint storage and vectorised evaluation.
//!
//! A [`Block`] is one variant per [`super::ConstraintKind`], each holding a
//! parallel pair of a constraint setlist and a packed row table — the
//! crate design's "record layout matches the kind's schema" requirement,
//! realised as a plain Rust struct per kind rather than a runtime dtype
//! (there is no such thing as a runtime record layout in Rust, so each
//! kind's row type *is* its schema). Row fields that reference a solver
//! variable hold that variable's dense index into the solver's `x` vector,
//! not the `Variable` handle itself — this is what lets
//! [`super::super::solver::Solver::remove_constraint`] repair a moved
//! variable's references by rewriting a handful of `usize`s rather than
//! walking expression trees.

use nalgebra::DMatrix;

use super::template::ResidualTemplate;
use super::{Constraint, ConstraintData, ConstraintKind};
use crate::core::error::NumericError;
use crate::core::expr::Expr;
use crate::util::DynamicArray;

#[derive(Debug, Clone, Copy)]
pub(crate) struct VariableFixedRow {
    pub(crate) var: usize,
    pub(crate) value: f64,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct VariablesEqualRow {
    pub(crate) v1: usize,
    pub(crate) v2: usize,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct LengthRow {
    pub(crate) ax: usize,
    pub(crate) ay: usize,
    pub(crate) bx: usize,
    pub(crate) by: usize,
    pub(crate) length: f64,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct AngleRow {
    pub(crate) ax: usize,
    pub(crate) ay: usize,
    pub(crate) bx: usize,
    pub(crate) by: usize,
    pub(crate) angle: f64,
}

#[derive(Debug, Clone, Copy)]
#[allow(clippy::similar_names, reason = "field names mirror the two endpoints of each of the two lines")]
pub(crate) struct PerpendicularRow {
    pub(crate) ax1: usize,
    pub(crate) ay1: usize,
    pub(crate) bx1: usize,
    pub(crate) by1: usize,
    pub(crate) ax2: usize,
    pub(crate) ay2: usize,
    pub(crate) bx2: usize,
    pub(crate) by2: usize,
}

/// Builds the shared [`ResidualTemplate`] for the four kinds whose residual
/// fits the expression layer's closed node set.
fn variable_fixed_template() -> ResidualTemplate {
    ResidualTemplate::new(&["var", "value"], |s| Expr::sub(&s[0], &s[1]))
}

fn variables_equal_template() -> ResidualTemplate {
    ResidualTemplate::new(&["v1", "v2"], |s| Expr::sub(&s[0], &s[1]))
}

fn length_template() -> ResidualTemplate {
    ResidualTemplate::new(&["ax", "ay", "bx", "by", "length"], |s| {
        let dx = Expr::sub(&s[2], &s[0]);
        let dy = Expr::sub(&s[3], &s[1]);
        let dist = Expr::sqrt(Expr::add([Expr::sq(dx), Expr::sq(dy)]));
        Expr::sub(dist, &s[4])
    })
}

fn perpendicular_template() -> ResidualTemplate {
    ResidualTemplate::new(&["ax1", "ay1", "bx1", "by1", "ax2", "ay2", "bx2", "by2"], |s| {
        let dx1 = Expr::sub(&s[2], &s[0]);
        let dy1 = Expr::sub(&s[3], &s[1]);
        let dx2 = Expr::sub(&s[6], &s[4]);
        let dy2 = Expr::sub(&s[7], &s[5]);
        let diff_x = Expr::sub(dx1.clone(), dx2.clone());
        let diff_y = Expr::sub(dy1.clone(), dy2.clone());
        let lhs = Expr::sqrt(Expr::add([Expr::sq(diff_x), Expr::sq(diff_y)]));
        let len1_sq = Expr::add([Expr::sq(dx1), Expr::sq(dy1)]);
        let len2_sq = Expr::add([Expr::sq(dx2), Expr::sq(dy2)]);
        let rhs = Expr::sqrt(Expr::add([len1_sq, len2_sq]));
        Expr::sub(lhs, rhs)
    })
}

/// `atan2`'s partial derivatives have no node in the expression algebra's
/// closed set, so `Angle`'s residual and gradient are hand-derived here
/// instead of routed through a [`ResidualTemplate`].
///
/// `d(atan2(dy, dx))/d(dx) = -dy/r2`, `d/d(dy) = dx/r2`, `r2 = dx^2 + dy^2`,
/// chained through `dx = bx - ax`, `dy = by - ay`. The wrap applied to the
/// residual for reporting is piecewise-linear with derivative `1` almost
/// everywhere, so it does not change the gradient below.
///
/// # Errors
/// Returns [`NumericError::DegenerateLine`] if the segment has zero length.
fn angle_residual_and_gradient(row: AngleRow, x: &[f64]) -> Result<(f64, [f64; 4]), NumericError> {
    let (ax, ay, bx, by) = (x[row.ax], x[row.ay], x[row.bx], x[row.by]);
    let (dx, dy) = (bx - ax, by - ay);
    let r2 = dx.mul_add(dx, dy * dy);
    if r2 == 0.0 {
        return Err(NumericError::DegenerateLine);
    }
    let residual = crate::util::wrap_angle(dy.atan2(dx) - row.angle);
    let gradient = [dy / r2, -dx / r2, -dy / r2, dx / r2];
    Ok((residual, gradient))
}

/// Storage and vectorised evaluation for every constraint of one kind.
pub(crate) enum Block {
    VariableFixed { constraints: DynamicArray<Constraint>, rows: DynamicArray<VariableFixedRow>, template: ResidualTemplate },
    VariablesEqual { constraints: DynamicArray<Constraint>, rows: DynamicArray<VariablesEqualRow>, template: ResidualTemplate },
    Length { constraints: DynamicArray<Constraint>, rows: DynamicArray<LengthRow>, template: ResidualTemplate },
    Angle { constraints: DynamicArray<Constraint>, rows: DynamicArray<AngleRow> },
    Perpendicular { constraints: DynamicArray<Constraint>, rows: DynamicArray<PerpendicularRow>, template: ResidualTemplate },
}

impl Block {
    pub(crate) fn new_for(kind: ConstraintKind) -> Self {
        match kind {
            ConstraintKind::VariableFixed => Self::VariableFixed {
                constraints: DynamicArray::new(),
                rows: DynamicArray::new(),
                template: variable_fixed_template(),
            },
            ConstraintKind::VariablesEqual => Self::VariablesEqual {
                constraints: DynamicArray::new(),
                rows: DynamicArray::new(),
                template: variables_equal_template(),
            },
            ConstraintKind::Length => {
                Self::Length { constraints: DynamicArray::new(), rows: DynamicArray::new(), template: length_template() }
            }
            ConstraintKind::Angle => Self::Angle { constraints: DynamicArray::new(), rows: DynamicArray::new() },
            ConstraintKind::Perpendicular => Self::Perpendicular {
                constraints: DynamicArray::new(),
                rows: DynamicArray::new(),
                template: perpendicular_template(),
            },
        }
    }

    /// Appends `constraint`'s row, resolving each referenced variable's
    /// dense index through `index_of`. A no-op if `constraint`'s kind does
    /// not match this block — callers always route a constraint to the
    /// block matching [`Constraint::kind`], so that never happens in
    /// practice.
    #[allow(clippy::similar_names, reason = "field names mirror the two endpoints of a segment")]
    pub(crate) fn push(&mut self, constraint: Constraint, index_of: impl Fn(u64) -> usize) {
        let data = constraint.data().clone();
        match (self, data) {
            (Self::VariableFixed { constraints, rows, .. }, ConstraintData::VariableFixed { var, value }) => {
                rows.push(VariableFixedRow { var: index_of(var.id()), value });
                constraints.push(constraint);
            }
            (Self::VariablesEqual { constraints, rows, .. }, ConstraintData::VariablesEqual { v1, v2 }) => {
                rows.push(VariablesEqualRow { v1: index_of(v1.id()), v2: index_of(v2.id()) });
                constraints.push(constraint);
            }
            (Self::Length { constraints, rows, .. }, ConstraintData::Length { line, length }) => {
                rows.push(LengthRow {
                    ax: index_of(line.a.x.id()),
                    ay: index_of(line.a.y.id()),
                    bx: index_of(line.b.x.id()),
                    by: index_of(line.b.y.id()),
                    length,
                });
                constraints.push(constraint);
            }
            (Self::Angle { constraints, rows }, ConstraintData::Angle { line, angle }) => {
                rows.push(AngleRow {
                    ax: index_of(line.a.x.id()),
                    ay: index_of(line.a.y.id()),
                    bx: index_of(line.b.x.id()),
                    by: index_of(line.b.y.id()),
                    angle,
                });
                constraints.push(constraint);
            }
            (Self::Perpendicular { constraints, rows, .. }, ConstraintData::Perpendicular { line1, line2 }) => {
                rows.push(PerpendicularRow {
                    ax1: index_of(line1.a.x.id()),
                    ay1: index_of(line1.a.y.id()),
                    bx1: index_of(line1.b.x.id()),
                    by1: index_of(line1.b.y.id()),
                    ax2: index_of(line2.a.x.id()),
                    ay2: index_of(line2.a.y.id()),
                    bx2: index_of(line2.b.x.id()),
                    by2: index_of(line2.b.y.id()),
                });
                constraints.push(constraint);
            }
            _ => {}
        }
    }

    pub(crate) fn len(&self) -> usize {
        match self {
            Self::VariableFixed { constraints, .. }
            | Self::VariablesEqual { constraints, .. }
            | Self::Length { constraints, .. }
            | Self::Angle { constraints, .. }
            | Self::Perpendicular { constraints, .. } => constraints.len(),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn contains(&self, constraint_id: u64) -> bool {
        self.position(constraint_id).is_some()
    }

    fn position(&self, constraint_id: u64) -> Option<usize> {
        let constraints = match self {
            Self::VariableFixed { constraints, .. }
            | Self::VariablesEqual { constraints, .. }
            | Self::Length { constraints, .. }
            | Self::Angle { constraints, .. }
            | Self::Perpendicular { constraints, .. } => constraints,
        };
        constraints.as_slice().iter().position(|c| c.id() == constraint_id)
    }

    /// Removes the row belonging to `constraint_id` by swapping the last
    /// entry into its place, matching
    /// [`crate::util::IndexedMap::fast_pop`]'s policy. Returns whether
    /// `constraint_id` was found in this block.
    pub(crate) fn fast_pop(&mut self, constraint_id: u64) -> bool {
        let Some(index) = self.position(constraint_id) else {
            return false;
        };
        match self {
            Self::VariableFixed { constraints, rows, .. } => {
                constraints.swap_remove(index);
                rows.swap_remove(index);
            }
            Self::VariablesEqual { constraints, rows, .. } => {
                constraints.swap_remove(index);
                rows.swap_remove(index);
            }
            Self::Length { constraints, rows, .. } => {
                constraints.swap_remove(index);
                rows.swap_remove(index);
            }
            Self::Angle { constraints, rows } => {
                constraints.swap_remove(index);
                rows.swap_remove(index);
            }
            Self::Perpendicular { constraints, rows, .. } => {
                constraints.swap_remove(index);
                rows.swap_remove(index);
            }
        }
        true
    }

    /// Rewrites every row field equal to `old_index` to `new_index`, for
    /// `constraint_id`'s row specifically (other rows of the same kind are
    /// untouched). A no-op if `constraint_id` is not in this block.
    #[allow(clippy::similar_names, reason = "field names mirror the two endpoints of a segment")]
    pub(crate) fn patch(&mut self, constraint_id: u64, old_index: usize, new_index: usize) {
        let Some(index) = self.position(constraint_id) else {
            return;
        };
        match self {
            Self::VariableFixed { rows, .. } => {
                let row = &mut rows.as_mut_slice()[index];
                replace_index(&mut row.var, old_index, new_index);
            }
            Self::VariablesEqual { rows, .. } => {
                let row = &mut rows.as_mut_slice()[index];
                replace_index(&mut row.v1, old_index, new_index);
                replace_index(&mut row.v2, old_index, new_index);
            }
            Self::Length { rows, .. } => {
                let row = &mut rows.as_mut_slice()[index];
                replace_index(&mut row.ax, old_index, new_index);
                replace_index(&mut row.ay, old_index, new_index);
                replace_index(&mut row.bx, old_index, new_index);
                replace_index(&mut row.by, old_index, new_index);
            }
            Self::Angle { rows, .. } => {
                let row = &mut rows.as_mut_slice()[index];
                replace_index(&mut row.ax, old_index, new_index);
                replace_index(&mut row.ay, old_index, new_index);
                replace_index(&mut row.bx, old_index, new_index);
                replace_index(&mut row.by, old_index, new_index);
            }
            Self::Perpendicular { rows, .. } => {
                let row = &mut rows.as_mut_slice()[index];
                replace_index(&mut row.ax1, old_index, new_index);
                replace_index(&mut row.ay1, old_index, new_index);
                replace_index(&mut row.bx1, old_index, new_index);
                replace_index(&mut row.by1, old_index, new_index);
                replace_index(&mut row.ax2, old_index, new_index);
                replace_index(&mut row.ay2, old_index, new_index);
                replace_index(&mut row.bx2, old_index, new_index);
                replace_index(&mut row.by2, old_index, new_index);
            }
        }
    }

    pub(crate) fn kind(&self) -> ConstraintKind {
        match self {
            Self::VariableFixed { .. } => ConstraintKind::VariableFixed,
            Self::VariablesEqual { .. } => ConstraintKind::VariablesEqual,
            Self::Length { .. } => ConstraintKind::Length,
            Self::Angle { .. } => ConstraintKind::Angle,
            Self::Perpendicular { .. } => ConstraintKind::Perpendicular,
        }
    }

    /// Evaluates every row's residual into `residual_out[row_offset..]` and
    /// scatter-adds every row's gradient into `jacobian_out`'s matching
    /// columns (accumulating when two slots of one row alias the same
    /// global variable).
    ///
    /// # Errors
    /// Propagates the first domain violation hit by any row.
    #[allow(clippy::similar_names, reason = "field names mirror the two endpoints of a segment")]
    #[allow(clippy::too_many_lines, reason = "one evaluation arm per constraint kind, matching the block's per-kind row layout")]
    pub(crate) fn evaluate(&self, x: &[f64], residual_out: &mut [f64], jacobian_out: &mut DMatrix<f64>, row_offset: usize) -> Result<(), NumericError> {
        match self {
            Self::VariableFixed { rows, template, .. } => {
                for (i, row) in rows.as_slice().iter().enumerate() {
                    let values = [x[row.var], row.value];
                    residual_out[row_offset + i] = template.residual(&values)?;
                    let mut grad = [0.0];
                    template.gradient(&values, &mut grad)?;
                    jacobian_out[(row_offset + i, row.var)] += grad[0];
                }
            }
            Self::VariablesEqual { rows, template, .. } => {
                for (i, row) in rows.as_slice().iter().enumerate() {
                    let values = [x[row.v1], x[row.v2]];
                    residual_out[row_offset + i] = template.residual(&values)?;
                    let mut grad = [0.0, 0.0];
                    template.gradient(&values, &mut grad)?;
                    jacobian_out[(row_offset + i, row.v1)] += grad[0];
                    jacobian_out[(row_offset + i, row.v2)] += grad[1];
                }
            }
            Self::Length { rows, template, .. } => {
                for (i, row) in rows.as_slice().iter().enumerate() {
                    let values = [x[row.ax], x[row.ay], x[row.bx], x[row.by], row.length];
                    residual_out[row_offset + i] = template.residual(&values)?;
                    let mut grad = [0.0, 0.0, 0.0, 0.0];
                    template.gradient(&values, &mut grad)?;
                    jacobian_out[(row_offset + i, row.ax)] += grad[0];
                    jacobian_out[(row_offset + i, row.ay)] += grad[1];
                    jacobian_out[(row_offset + i, row.bx)] += grad[2];
                    jacobian_out[(row_offset + i, row.by)] += grad[3];
                }
            }
            Self::Angle { rows, .. } => {
                for (i, &row) in rows.as_slice().iter().enumerate() {
                    let (residual, grad) = angle_residual_and_gradient(row, x)?;
                    residual_out[row_offset + i] = residual;
                    jacobian_out[(row_offset + i, row.ax)] += grad[0];
                    jacobian_out[(row_offset + i, row.ay)] += grad[1];
                    jacobian_out[(row_offset + i, row.bx)] += grad[2];
                    jacobian_out[(row_offset + i, row.by)] += grad[3];
                }
            }
            Self::Perpendicular { rows, template, .. } => {
                for (i, row) in rows.as_slice().iter().enumerate() {
                    let values = [
                        x[row.ax1], x[row.ay1], x[row.bx1], x[row.by1], x[row.ax2], x[row.ay2], x[row.bx2], x[row.by2],
                    ];
                    residual_out[row_offset + i] = template.residual(&values)?;
                    let mut grad = [0.0; 8];
                    template.gradient(&values, &mut grad)?;
                    jacobian_out[(row_offset + i, row.ax1)] += grad[0];
                    jacobian_out[(row_offset + i, row.ay1)] += grad[1];
                    jacobian_out[(row_offset + i, row.bx1)] += grad[2];
                    jacobian_out[(row_offset + i, row.by1)] += grad[3];
                    jacobian_out[(row_offset + i, row.ax2)] += grad[4];
                    jacobian_out[(row_offset + i, row.ay2)] += grad[5];
                    jacobian_out[(row_offset + i, row.bx2)] += grad[6];
                    jacobian_out[(row_offset + i, row.by2)] += grad[7];
                }
            }
        }
        Ok(())
    }
}

fn replace_index(slot: &mut usize, old_index: usize, new_index: usize) {
    if *slot == old_index {
        *slot = new_index;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Point, Variable};

    #[test]
    fn length_block_round_trips_through_push_and_evaluate() {
        let mut block = Block::new_for(ConstraintKind::Length);
        let a = Point::new(Variable::new(0.0), Variable::new(0.0));
        let b = Point::new(Variable::new(3.0), Variable::new(0.0));
        let ids = [a.x.id(), a.y.id(), b.x.id(), b.y.id()];
        let constraint = Constraint::length(a, b, 5.0);

        block.push(constraint, |id| ids.iter().position(|&i| i == id).expect("known id"));

        let x = [0.0, 0.0, 3.0, 0.0];
        let mut residual = [0.0];
        let mut jacobian = DMatrix::<f64>::zeros(1, 4);
        block.evaluate(&x, &mut residual, &mut jacobian, 0).expect("no domain error");
        assert!((residual[0] - (-2.0)).abs() < 1e-9);
    }

    #[test]
    fn patch_only_touches_matching_old_index() {
        let mut block = Block::new_for(ConstraintKind::VariablesEqual);
        let v1 = Variable::new(1.0);
        let v2 = Variable::new(2.0);
        let v2_id = v2.id();
        let v1_id = v1.id();
        let constraint = Constraint::variables_equal(v1, v2);
        let constraint_id = constraint.id();

        block.push(constraint, |id| if id == v1_id { 0 } else if id == v2_id { 5 } else { usize::MAX });
        block.patch(constraint_id, 5, 2);

        let Block::VariablesEqual { rows, .. } = &block else {
            panic!("block built as VariablesEqual");
        };
        assert_eq!(rows.as_slice()[0].v1, 0);
        assert_eq!(rows.as_slice()[0].v2, 2);
    }
}
