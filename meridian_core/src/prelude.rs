// meridian_core/src/prelude.rs

// --- Core Abstractions (The main contracts of the library) ---
pub use crate::errors::{Error, Result};
pub use crate::models::{MeasurementModel, ProcessModel};
pub use crate::states::State;
pub use crate::types::{Direction, StampedValue, StateId};

// --- Core Data Structures (The "nouns" of the library) ---
pub use crate::lie::MatrixLieGroup;
pub use crate::states::{CompositeState, JacobianBlocks, MatrixLieGroupState, VectorState};

// --- Concrete Model Implementations (Export common ones for convenience) ---
pub use crate::models::measurement::{
    Altitude, CompositeMeasurementModel, GlobalPosition, Gravity, RangePointToAnchor,
    RangePoseToAnchor, RangePoseToPose, RangeRelativePose,
};
pub use crate::models::process::{
    BodyFrameVelocity, CompositeProcessModel, RelativeBodyFrameVelocity, SingleIntegrator,
};
