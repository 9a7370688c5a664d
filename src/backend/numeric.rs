use ndarray::NdFloat;
use num_traits::FromPrimitive;

use crate::error::LossGraphError;

/// Element-type bound for every tensor in the crate.
///
/// Loss formulas need transcendental functions, so only floating point
/// types qualify. Building on `ndarray::NdFloat` keeps the bound aligned
/// with what the storage layer can actually do (scalar operands,
/// display, Send + Sync) instead of re-stating each requirement at every
/// call site.
pub trait GraphFloat: NdFloat + FromPrimitive {}

impl GraphFloat for f32 {}
impl GraphFloat for f64 {}

/// Converts an `f64` constant into the tensor element type, surfacing a
/// typed error instead of panicking when the type cannot represent it.
pub fn scalar_from_f64<T: GraphFloat>(value: f64, operation: &str) -> Result<T, LossGraphError> {
    T::from_f64(value).ok_or_else(|| LossGraphError::UnsupportedElementType {
        operation: operation.to_string(),
    })
}

/// Same as [`scalar_from_f64`] for element counts.
pub fn scalar_from_usize<T: GraphFloat>(value: usize, operation: &str) -> Result<T, LossGraphError> {
    T::from_usize(value).ok_or_else(|| LossGraphError::UnsupportedElementType {
        operation: operation.to_string(),
    })
}
