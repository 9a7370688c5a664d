// Operator vocabulary for the computational graph.
// Operators are stateless trait objects; the engine owns the nodes and
// decides when compute() actually runs. Every operator also knows how to
// propagate shapes, so shape errors fire when the graph is built, not
// when it is evaluated.

use std::any::type_name;

use crate::backend::{GraphFloat, Tensor};
use crate::error::LossGraphError;

pub mod basic;
pub mod comparison;
pub mod reduction;
pub mod reshape;
pub mod scalar;
pub mod unary;

pub use basic::{Add, Div, Mul, Sub};
pub use comparison::Clamp;
pub use reduction::{Max, Mean, Sum};
pub use reshape::{BroadcastTo, Reshape, Squeeze, Unsqueeze};
pub use scalar::{AddScalar, DivScalar, MaxScalar, MulScalar, PowScalar, SubScalar};
pub use unary::{Abs, Exp, Log, Log1p, Neg, Softplus, Sqrt};

/// Interface shared by every node-producing operation.
pub trait Operator<T>: std::fmt::Debug
where
    T: GraphFloat,
{
    /// Evaluates the operation over materialized inputs.
    fn compute(&self, inputs: &[&Tensor<T>]) -> Result<Tensor<T>, LossGraphError>;

    /// Computes the output shape from the input shapes without touching
    /// any data. Called at graph-construction time for every node.
    fn infer_shape(&self, input_shapes: &[&[usize]]) -> Result<Vec<usize>, LossGraphError>;

    /// Number of inputs this operator expects.
    fn num_inputs(&self) -> usize;

    fn name(&self) -> String {
        let full_name = type_name::<Self>();
        full_name
            .rsplit("::")
            .next()
            .unwrap_or(full_name)
            .to_string()
    }

    fn clone_op(&self) -> Box<dyn Operator<T>>;
}

/// Arity check shared by the compute/infer paths of every operator.
pub(crate) fn check_arity(
    operation: &str,
    expected: usize,
    actual: usize,
) -> Result<(), LossGraphError> {
    if actual != expected {
        return Err(LossGraphError::InvalidInputCount {
            operation: operation.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}
