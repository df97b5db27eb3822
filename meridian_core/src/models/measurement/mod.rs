// meridian_core/src/models/measurement/mod.rs

use nalgebra::{DMatrix, DVector};

pub mod composite;
pub mod position;
pub mod range;

pub use composite::CompositeMeasurementModel;
pub use position::{Altitude, GlobalPosition, Gravity};
pub use range::{RangePointToAnchor, RangePoseToAnchor, RangePoseToPose, RangeRelativePose};

/// A vector viewed as a 1-row matrix, for Jacobian row assembly.
pub(crate) fn row(v: &DVector<f64>) -> DMatrix<f64> {
    DMatrix::from_row_slice(1, v.len(), v.as_slice())
}
