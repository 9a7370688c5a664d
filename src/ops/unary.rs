// Elementwise unary operations.

use crate::backend::{GraphFloat, Tensor};
use crate::error::LossGraphError;
use crate::ops::{Operator, check_arity};

macro_rules! unary_operator {
    ($name:ident, $doc:literal, $f:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone)]
        pub struct $name;

        impl<T> Operator<T> for $name
        where
            T: GraphFloat,
        {
            fn compute(&self, inputs: &[&Tensor<T>]) -> Result<Tensor<T>, LossGraphError> {
                check_arity(&Operator::<T>::name(self), 1, inputs.len())?;
                Ok(inputs[0].map($f))
            }

            fn infer_shape(&self, input_shapes: &[&[usize]]) -> Result<Vec<usize>, LossGraphError> {
                check_arity(&Operator::<T>::name(self), 1, input_shapes.len())?;
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

unary_operator!(Exp, "Elementwise natural exponential.", |x: T| x.exp());
unary_operator!(Log, "Elementwise natural logarithm.", |x: T| x.ln());
unary_operator!(Log1p, "Elementwise ln(1 + x), accurate near zero.", |x: T| x.ln_1p());
unary_operator!(Abs, "Elementwise absolute value.", |x: T| x.abs());
unary_operator!(Neg, "Elementwise negation.", |x: T| -x);
unary_operator!(Sqrt, "Elementwise square root.", |x: T| x.sqrt());

// softplus(x) = ln(1 + e^x), computed as max(x, 0) + ln(1 + e^-|x|) so
// the exponential argument is never positive and cannot overflow.
unary_operator!(
    Softplus,
    "Elementwise softplus, overflow-safe for large |x|.",
    |x: T| x.max(T::zero()) + (-x.abs()).exp().ln_1p()
);
