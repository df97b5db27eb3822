// meridian_core/src/models/process/mod.rs

pub mod body_velocity;
pub mod composite;
pub mod integrator;

pub use body_velocity::{BodyFrameVelocity, RelativeBodyFrameVelocity};
pub use composite::CompositeProcessModel;
pub use integrator::SingleIntegrator;
