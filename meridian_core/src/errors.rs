// meridian_core/src/errors.rs

use crate::lie::MatrixLieGroup;
use crate::types::{Direction, StateId};
use thiserror::Error;

/// The single error type of the library.
///
/// Every failure surfaces immediately to the caller; there is no internal
/// retry and no default substitution. An operation either fully succeeds with
/// dimensionally-consistent outputs or fails outright.
#[derive(Debug, Error)]
pub enum Error {
    /// A malformed fixed parameter handed to a model constructor
    /// (e.g. a non-square noise matrix).
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A Jacobian or covariance was requested for a perturbation direction
    /// that has not been derived for this model. Reported explicitly instead
    /// of silently approximating.
    #[error("{model}: {direction:?} perturbation Jacobians are not implemented")]
    UnsupportedDirection {
        model: &'static str,
        direction: Direction,
    },

    /// An operation or geometric accessor that is not defined for this
    /// Lie group (e.g. `position` on SO(3), `odot` on SE(3)).
    #[error("operation `{op}` is not defined for {group:?}")]
    UnsupportedGroup {
        op: &'static str,
        group: MatrixLieGroup,
    },

    /// A composite-state lookup with an identifier absent from the
    /// sub-state list.
    #[error("no sub-state with id {0:?}")]
    StateNotFound(StateId),

    /// A model was handed a state variant it does not operate on.
    #[error("unexpected state type, expected {0}")]
    StateTypeMismatch(&'static str),

    /// Two states that should share a layout (group, direction, sub-state
    /// list) do not, or a composite model's arity does not match its state.
    #[error("incompatible states: {0}")]
    IncompatibleStates(&'static str),

    /// A tangent or input vector of the wrong length.
    #[error("dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
