// Tensor-scalar operations. The scalar is stored inside the operator so
// the graph never needs a constant node for it.

use crate::backend::{GraphFloat, Tensor};
use crate::error::LossGraphError;
use crate::ops::{Operator, check_arity};

macro_rules! scalar_operator {
    ($name:ident, $method:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone)]
        pub struct $name<T> {
            pub value: T,
        }

        impl<T> $name<T> {
            pub fn new(value: T) -> Self {
                Self { value }
            }
        }

        impl<T> Operator<T> for $name<T>
        where
            T: GraphFloat,
        {
            fn compute(&self, inputs: &[&Tensor<T>]) -> Result<Tensor<T>, LossGraphError> {
                check_arity(&self.name(), 1, inputs.len())?;
                Ok(inputs[0].$method(self.value))
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
    };
}

scalar_operator!(AddScalar, add_scalar, "Adds a scalar to every element.");
scalar_operator!(SubScalar, sub_scalar, "Subtracts a scalar from every element.");
scalar_operator!(MulScalar, mul_scalar, "Multiplies every element by a scalar.");
scalar_operator!(DivScalar, div_scalar, "Divides every element by a scalar.");
scalar_operator!(MaxScalar, max_scalar, "Elementwise maximum against a scalar floor.");

/// Raises every element to a scalar power.
#[derive(Debug, Clone)]
pub struct PowScalar<T> {
    pub exponent: T,
}

impl<T> PowScalar<T> {
    pub fn new(exponent: T) -> Self {
        Self { exponent }
    }
}

impl<T> Operator<T> for PowScalar<T>
where
    T: GraphFloat,
{
    fn compute(&self, inputs: &[&Tensor<T>]) -> Result<Tensor<T>, LossGraphError> {
        check_arity(&self.name(), 1, inputs.len())?;
        let exponent = self.exponent;
        Ok(inputs[0].map(|x| x.powf(exponent)))
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
