// Elementwise binary arithmetic for the computational graph.
// All four operators broadcast their operands; the broadcast rule lives
// in the tensor backend and is re-checked here during shape inference.

use crate::backend::{GraphFloat, Tensor, broadcast_shapes};
use crate::error::LossGraphError;
use crate::ops::{Operator, check_arity};

macro_rules! binary_operator {
    ($name:ident, $method:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone)]
        pub struct $name;

        impl<T> Operator<T> for $name
        where
            T: GraphFloat,
        {
            fn compute(&self, inputs: &[&Tensor<T>]) -> Result<Tensor<T>, LossGraphError> {
                check_arity(&Operator::<T>::name(self), 2, inputs.len())?;
                inputs[0].$method(inputs[1])
            }

            fn infer_shape(&self, input_shapes: &[&[usize]]) -> Result<Vec<usize>, LossGraphError> {
                check_arity(&Operator::<T>::name(self), 2, input_shapes.len())?;
                broadcast_shapes(input_shapes[0], input_shapes[1], &Operator::<T>::name(self))
            }

            fn num_inputs(&self) -> usize {
                2
            }

            fn clone_op(&self) -> Box<dyn Operator<T>> {
                Box::new(self.clone())
            }
        }
    };
}

binary_operator!(Add, add, "Elementwise addition with broadcasting.");
binary_operator!(Sub, sub, "Elementwise subtraction with broadcasting.");
binary_operator!(Mul, mul, "Elementwise multiplication with broadcasting.");
binary_operator!(Div, div, "Elementwise division with broadcasting.");
