// Clipping. Loss formulas clip probabilities away from 0 and 1 before
// taking logarithms, and clip errors at a delta for Huber-style losses.

use crate::backend::{GraphFloat, Tensor};
use crate::error::LossGraphError;
use crate::ops::{Operator, check_arity};

/// Clamps every element into `[min, max]`.
#[derive(Debug, Clone)]
pub struct Clamp<T> {
    pub min: T,
    pub max: T,
}

impl<T> Clamp<T> {
    pub fn new(min: T, max: T) -> Self {
        Self { min, max }
    }
}

impl<T> Operator<T> for Clamp<T>
where
    T: GraphFloat,
{
    fn compute(&self, inputs: &[&Tensor<T>]) -> Result<Tensor<T>, LossGraphError> {
        check_arity(&self.name(), 1, inputs.len())?;
        if self.min > self.max {
            return Err(LossGraphError::InvalidArgument(format!(
                "clamp bounds inverted: min {} > max {}",
                self.min, self.max
            )));
        }
        Ok(inputs[0].clamp(self.min, self.max))
    }

    fn infer_shape(&self, input_shapes: &[&[usize]]) -> Result<Vec<usize>, LossGraphError> {
        check_arity(&self.name(), 1, input_shapes.len())?;
        Ok(input_shapes[0].to_vec())
    }

    fn num_inputs(&self) -> usize {
        1
    }

    fn clone_op(&self) -> Box<dyn Operator<T>> {
        Box::new(self.clone())
    }
}
