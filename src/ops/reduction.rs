// Axis reductions. `axes: None` collapses everything to a rank-0
// scalar; otherwise only the listed axes are removed (or kept as size 1
// when `keep_dims` is set).

use crate::backend::{GraphFloat, Tensor};
use crate::error::LossGraphError;
use crate::ops::{Operator, check_arity};

/// Shape of a reduction result, shared by every reduction operator.
pub(crate) fn reduced_shape(
    input_shape: &[usize],
    axes: &Option<Vec<usize>>,
    keep_dims: bool,
    operation: &str,
) -> Result<Vec<usize>, LossGraphError> {
    match axes {
        None => Ok(if keep_dims { vec![1; input_shape.len()] } else { vec![] }),
        Some(axes) => {
            let mut sorted = axes.clone();
            sorted.sort_unstable();
            for pair in sorted.windows(2) {
                if pair[0] == pair[1] {
                    return Err(LossGraphError::InvalidShape(format!(
                        "duplicate axis {} in {}",
                        pair[0], operation
                    )));
                }
            }
            if let Some(&ax) = sorted.last() {
                if ax >= input_shape.len() {
                    return Err(LossGraphError::InvalidShape(format!(
                        "axis {} out of range for rank {} in {}",
                        ax,
                        input_shape.len(),
                        operation
                    )));
                }
            }
            let mut shape = Vec::with_capacity(input_shape.len());
            for (i, &dim) in input_shape.iter().enumerate() {
                if sorted.contains(&i) {
                    if keep_dims {
                        shape.push(1);
                    }
                } else {
                    shape.push(dim);
                }
            }
            Ok(shape)
        }
    }
}

macro_rules! reduction_operator {
    ($name:ident, $method:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone)]
        pub struct $name {
            /// Axes to reduce along. `None` reduces every element.
            pub axes: Option<Vec<usize>>,
            /// Keep reduced dimensions as size 1.
            pub keep_dims: bool,
        }

        impl $name {
            /// Reduces all elements to a scalar.
            pub fn all(keep_dims: bool) -> Self {
                Self { axes: None, keep_dims }
            }

            /// Reduces along specific axes.
            pub fn along_axes(axes: Vec<usize>, keep_dims: bool) -> Self {
                Self { axes: Some(axes), keep_dims }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::all(false)
            }
        }

        impl<T> Operator<T> for $name
        where
            T: GraphFloat,
        {
            fn compute(&self, inputs: &[&Tensor<T>]) -> Result<Tensor<T>, LossGraphError> {
                check_arity(&Operator::<T>::name(self), 1, inputs.len())?;
                inputs[0].$method(self.axes.as_deref(), self.keep_dims)
            }

            fn infer_shape(&self, input_shapes: &[&[usize]]) -> Result<Vec<usize>, LossGraphError> {
                check_arity(&Operator::<T>::name(self), 1, input_shapes.len())?;
                reduced_shape(input_shapes[0], &self.axes, self.keep_dims, &Operator::<T>::name(self))
            }

            fn num_inputs(&self) -> usize {
                1
            }

            fn clone_op(&self) -> Box<dyn Operator<T>> {
                Box::new(self.clone())
            }
        }
    };
}

reduction_operator!(Sum, sum, "Sum reduction.");
reduction_operator!(Mean, mean, "Arithmetic-mean reduction.");
reduction_operator!(Max, max, "Maximum reduction.");
