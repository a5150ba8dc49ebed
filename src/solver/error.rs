//! Registration errors for [`super::Solver::add_constraint`]/
//! [`super::Solver::remove_constraint`].

use std::fmt;

/// A constraint registration request could not be honored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum SolverError {
    /// `add_constraint` was called with a constraint id already registered
    /// with this solver.
    AlreadyRegistered,
    /// `remove_constraint` was called with a constraint id this solver does
    /// not know about.
    NotRegistered,
}

impl fmt::Display for SolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyRegistered => write!(f, "constraint is already registered with this solver"),
            Self::NotRegistered => write!(f, "constraint is not registered with this solver"),
        }
    }
}

impl std::error::Error for SolverError {}
