//! Shared per-kind residual formulas, expressed once over placeholder
//! variables and reused for every row of a [`super::block::Block`].
//!
//! Four of the five constraint kinds (`VariableFixed`, `VariablesEqual`,
//! `Length`, `Perpendicular`) need nothing beyond the closed node set the
//! expression layer already provides, so their residual — and, via
//! [`Expr::diff`], its gradient — is built once per kind and reused by
//! writing each row's trial values into the template's placeholder cells
//! before calling `value()`. This is the direct generalisation of
//! `constraints.py`'s `_Equal`, which stores one `self._expr = b - a` per
//! *instance*; here one template serves every instance of a kind, which is
//! what makes the block's vectorised `evaluate(variable_values, params)`
//! contract (crate design §4.6) possible without rebuilding a tree per row.

use crate::core::error::NumericError;
use crate::core::expr::Expr;
use crate::geometry::Variable;

/// A residual formula over named placeholder slots, plus its
/// pre-differentiated gradient with respect to every slot.
pub(crate) struct ResidualTemplate {
    slots: Vec<Variable>,
    residual: Expr,
    gradients: Vec<Expr>,
}

impl ResidualTemplate {
    /// Builds the template by calling `build` once with fresh placeholder
    /// variables named after `slot_names`, in order.
    pub(crate) fn new(slot_names: &[&'static str], build: impl FnOnce(&[Variable]) -> Expr) -> Self {
        let slots: Vec<Variable> = slot_names.iter().map(|name| Variable::named(0.0, *name)).collect();
        let residual = build(&slots);
        let gradients: Vec<Expr> = slots.iter().map(|slot| residual.diff(slot)).collect();
        Self { slots, residual, gradients }
    }

    fn write_slots(&self, values: &[f64]) {
        for (slot, &value) in self.slots.iter().zip(values) {
            slot.set_value(value);
        }
    }

    /// Evaluates the residual at `values` (one per slot, in the order
    /// passed to [`ResidualTemplate::new`]).
    ///
    /// # Errors
    /// Propagates a domain violation hit anywhere in the residual formula.
    pub(crate) fn residual(&self, values: &[f64]) -> Result<f64, NumericError> {
        self.write_slots(values);
        self.residual.value()
    }

    /// Evaluates the gradient with respect to the first `out.len()` slots
    /// (the variable-typed ones; trailing slots, if any, hold per-row
    /// constants the Jacobian has no column for).
    ///
    /// # Errors
    /// Propagates a domain violation hit anywhere in a derivative formula.
    pub(crate) fn gradient(&self, values: &[f64], out: &mut [f64]) -> Result<(), NumericError> {
        self.write_slots(values);
        for (slot_grad, out_slot) in self.gradients.iter().zip(out.iter_mut()) {
            *out_slot = slot_grad.value()?;
        }
        Ok(())
    }
}
