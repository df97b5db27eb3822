// meridian_core/src/states/mod.rs

use crate::errors::Result;
use crate::types::StateId;
use dyn_clone::DynClone;
use nalgebra::DVector;
use std::any::Any;
use std::fmt::Debug;

pub mod composite;
pub mod lie_group;
pub mod vector;

pub use composite::CompositeState;
pub use lie_group::{JacobianBlocks, MatrixLieGroupState};
pub use vector::VectorState;

// --- STATE TRAIT ---
// The retraction contract shared by every state variant, whether the value
// lives in a vector space or on a matrix Lie group.
pub trait State: Debug + DynClone + Send + Sync {
    /// Degrees of freedom: the dimension of the tangent space. Fixed at
    /// construction and never changes for the lifetime of the state.
    fn dof(&self) -> usize;

    /// The timestamp of the state, if any.
    fn stamp(&self) -> Option<f64>;

    /// Overwrites the timestamp.
    fn set_stamp(&mut self, stamp: Option<f64>);

    /// The opaque identifier of this state. Must be unique within a single
    /// composite state; uniqueness is otherwise not required.
    fn state_id(&self) -> Option<StateId>;

    /// Overwrites the identifier.
    fn set_state_id(&mut self, state_id: Option<StateId>);

    /// Moves the state along the manifold by a tangent vector of length
    /// `dof`, in place. `plus` with a zero vector is the identity.
    fn plus(&mut self, dx: &DVector<f64>) -> Result<()>;

    /// Returns the tangent vector `dx` such that `other.plus(dx)` recovers
    /// `self` (exactly, for exponential-map retractions).
    fn minus(&self, other: &dyn State) -> Result<DVector<f64>>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

// Generates `Clone` for `Box<dyn State>`. Concrete states derive `Clone`, so
// a boxed clone is always a fully independent deep copy of the value.
dyn_clone::clone_trait_object!(State);
