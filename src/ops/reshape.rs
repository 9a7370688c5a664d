// Shape manipulation: reshape, broadcast, and axis insertion/removal.

use crate::backend::{GraphFloat, Tensor, broadcast_shapes};
use crate::error::LossGraphError;
use crate::ops::{Operator, check_arity};

/// Reinterprets the input with a new shape of equal element count.
#[derive(Debug, Clone)]
pub struct Reshape {
    pub shape: Vec<usize>,
}

impl Reshape {
    pub fn new(shape: Vec<usize>) -> Self {
        Self { shape }
    }
}

impl<T> Operator<T> for Reshape
where
    T: GraphFloat,
{
    fn compute(&self, inputs: &[&Tensor<T>]) -> Result<Tensor<T>, LossGraphError> {
        check_arity(&Operator::<T>::name(self), 1, inputs.len())?;
        inputs[0].reshape(&self.shape)
    }

    fn infer_shape(&self, input_shapes: &[&[usize]]) -> Result<Vec<usize>, LossGraphError> {
        check_arity(&Operator::<T>::name(self), 1, input_shapes.len())?;
        let have: usize = input_shapes[0].iter().product();
        let want: usize = self.shape.iter().product();
        if have != want {
            return Err(LossGraphError::InvalidShape(format!(
                "cannot reshape {:?} into {:?}",
                input_shapes[0], self.shape
            )));
        }
        Ok(self.shape.clone())
    }

    fn num_inputs(&self) -> usize {
        1
    }

    fn clone_op(&self) -> Box<dyn Operator<T>> {
        Box::new(self.clone())
    }
}

/// Materializes the input broadcast to a target shape.
#[derive(Debug, Clone)]
pub struct BroadcastTo {
    pub shape: Vec<usize>,
}

impl BroadcastTo {
    pub fn new(shape: Vec<usize>) -> Self {
        Self { shape }
    }
}

impl<T> Operator<T> for BroadcastTo
where
    T: GraphFloat,
{
    fn compute(&self, inputs: &[&Tensor<T>]) -> Result<Tensor<T>, LossGraphError> {
        check_arity(&Operator::<T>::name(self), 1, inputs.len())?;
        inputs[0].broadcast_to(&self.shape)
    }

    fn infer_shape(&self, input_shapes: &[&[usize]]) -> Result<Vec<usize>, LossGraphError> {
        check_arity(&Operator::<T>::name(self), 1, input_shapes.len())?;
        let joint = broadcast_shapes(input_shapes[0], &self.shape, &Operator::<T>::name(self))?;
        if joint != self.shape {
            return Err(LossGraphError::BroadcastError {
                left: input_shapes[0].to_vec(),
                right: self.shape.clone(),
                operation: Operator::<T>::name(self),
            });
        }
        Ok(self.shape.clone())
    }

    fn num_inputs(&self) -> usize {
        1
    }

    fn clone_op(&self) -> Box<dyn Operator<T>> {
        Box::new(self.clone())
    }
}

/// Inserts a size-1 axis at the given position.
#[derive(Debug, Clone)]
pub struct Unsqueeze {
    pub axis: usize,
}

impl Unsqueeze {
    pub fn new(axis: usize) -> Self {
        Self { axis }
    }
}

impl<T> Operator<T> for Unsqueeze
where
    T: GraphFloat,
{
    fn compute(&self, inputs: &[&Tensor<T>]) -> Result<Tensor<T>, LossGraphError> {
        check_arity(&Operator::<T>::name(self), 1, inputs.len())?;
        inputs[0].unsqueeze(self.axis)
    }

    fn infer_shape(&self, input_shapes: &[&[usize]]) -> Result<Vec<usize>, LossGraphError> {
        check_arity(&Operator::<T>::name(self), 1, input_shapes.len())?;
        if self.axis > input_shapes[0].len() {
            return Err(LossGraphError::InvalidShape(format!(
                "unsqueeze axis {} out of range for rank {}",
                self.axis,
                input_shapes[0].len()
            )));
        }
        let mut shape = input_shapes[0].to_vec();
        shape.insert(self.axis, 1);
        Ok(shape)
    }

    fn num_inputs(&self) -> usize {
        1
    }

    fn clone_op(&self) -> Box<dyn Operator<T>> {
        Box::new(self.clone())
    }
}

/// Removes a specific size-1 axis, or every size-1 axis when built with
/// [`Squeeze::new`].
#[derive(Debug, Clone)]
pub struct Squeeze {
    pub axis: Option<usize>,
}

impl Squeeze {
    pub fn new() -> Self {
        Self { axis: None }
    }

    pub fn at_axis(axis: usize) -> Self {
        Self { axis: Some(axis) }
    }
}

impl Default for Squeeze {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Operator<T> for Squeeze
where
    T: GraphFloat,
{
    fn compute(&self, inputs: &[&Tensor<T>]) -> Result<Tensor<T>, LossGraphError> {
        check_arity(&Operator::<T>::name(self), 1, inputs.len())?;
        inputs[0].squeeze(self.axis)
    }

    fn infer_shape(&self, input_shapes: &[&[usize]]) -> Result<Vec<usize>, LossGraphError> {
        check_arity(&Operator::<T>::name(self), 1, input_shapes.len())?;
        let input = input_shapes[0];
        match self.axis {
            Some(ax) => {
                if ax >= input.len() || input[ax] != 1 {
                    return Err(LossGraphError::InvalidShape(format!(
                        "cannot squeeze axis {} of shape {:?}",
                        ax, input
                    )));
                }
                let mut shape = input.to_vec();
                shape.remove(ax);
                Ok(shape)
            }
            None => Ok(input.iter().copied().filter(|&d| d != 1).collect()),
        }
    }

    fn num_inputs(&self) -> usize {
        1
    }

    fn clone_op(&self) -> Box<dyn Operator<T>> {
        Box::new(self.clone())
    }
}
