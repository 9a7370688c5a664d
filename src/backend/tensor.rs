// CPU tensor used by the graph engine.
// All elementwise arithmetic follows NumPy/PyTorch broadcasting rules;
// shape incompatibilities surface as typed errors, never panics.

use ndarray::{Array, ArrayD, Axis, IxDyn, Zip};
use rand::Rng;
use rand::distr::{Distribution, StandardUniform};
use rand_distr::StandardNormal;

use crate::backend::numeric::{GraphFloat, scalar_from_usize};
use crate::error::LossGraphError;

/// Computes the broadcast shape of two operand shapes, right-aligned as
/// in NumPy. Fails with [`LossGraphError::BroadcastError`] when any
/// aligned pair of dimensions is neither equal nor 1.
pub fn broadcast_shapes(
    left: &[usize],
    right: &[usize],
    operation: &str,
) -> Result<Vec<usize>, LossGraphError> {
    let rank = left.len().max(right.len());
    let mut shape = vec![0usize; rank];
    for i in 0..rank {
        let l = if i < rank - left.len() { 1 } else { left[i - (rank - left.len())] };
        let r = if i < rank - right.len() { 1 } else { right[i - (rank - right.len())] };
        shape[i] = if l == r || r == 1 {
            l
        } else if l == 1 {
            r
        } else {
            return Err(LossGraphError::BroadcastError {
                left: left.to_vec(),
                right: right.to_vec(),
                operation: operation.to_string(),
            });
        };
    }
    Ok(shape)
}

/// Dense CPU tensor backed by `ndarray`.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<T> {
    data: ArrayD<T>,
}

impl<T> Tensor<T>
where
    T: GraphFloat,
{
    /// Builds a tensor from a flat buffer in row-major order.
    pub fn from_vec(data: Vec<T>, shape: &[usize]) -> Result<Self, LossGraphError> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(LossGraphError::InvalidShape(format!(
                "data length {} does not match shape {:?}",
                data.len(),
                shape
            )));
        }
        let data = ArrayD::from_shape_vec(IxDyn(shape), data)
            .map_err(|e| LossGraphError::InvalidShape(e.to_string()))?;
        Ok(Self { data })
    }

    pub fn from_ndarray(data: ArrayD<T>) -> Self {
        Self { data }
    }

    pub fn zeros(shape: &[usize]) -> Self {
        Self { data: ArrayD::from_elem(IxDyn(shape), T::zero()) }
    }

    pub fn ones(shape: &[usize]) -> Self {
        Self { data: ArrayD::from_elem(IxDyn(shape), T::one()) }
    }

    pub fn full(shape: &[usize], value: T) -> Self {
        Self { data: ArrayD::from_elem(IxDyn(shape), value) }
    }

    /// Scalar (rank-0) tensor.
    pub fn scalar(value: T) -> Self {
        Self { data: ArrayD::from_elem(IxDyn(&[]), value) }
    }

    /// Standard-normal samples.
    pub fn randn(shape: &[usize]) -> Self
    where
        StandardNormal: Distribution<T>,
    {
        let mut rng = rand::rng();
        let data = ArrayD::from_shape_simple_fn(IxDyn(shape), || StandardNormal.sample(&mut rng));
        Self { data }
    }

    /// Uniform samples in `[0, 1)`.
    pub fn rand(shape: &[usize]) -> Self
    where
        StandardUniform: Distribution<T>,
    {
        let mut rng = rand::rng();
        let data = ArrayD::from_shape_simple_fn(IxDyn(shape), || rng.random());
        Self { data }
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn ndim(&self) -> usize {
        self.data.ndim()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &ArrayD<T> {
        &self.data
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.data.iter().cloned().collect()
    }

    /// First element, used to read back scalar results.
    pub fn first(&self) -> Result<T, LossGraphError> {
        self.data
            .iter()
            .next()
            .copied()
            .ok_or_else(|| LossGraphError::InvalidShape("empty tensor has no first element".into()))
    }

    // ---- elementwise binary ops (broadcasting) ----

    fn zip_with<F>(&self, other: &Self, operation: &str, f: F) -> Result<Self, LossGraphError>
    where
        F: Fn(T, T) -> T,
    {
        let shape = broadcast_shapes(self.shape(), other.shape(), operation)?;
        // broadcast() cannot fail once broadcast_shapes has succeeded
        let lhs = self.data.broadcast(IxDyn(&shape)).ok_or_else(|| {
            LossGraphError::BroadcastError {
                left: self.shape().to_vec(),
                right: shape.clone(),
                operation: operation.to_string(),
            }
        })?;
        let rhs = other.data.broadcast(IxDyn(&shape)).ok_or_else(|| {
            LossGraphError::BroadcastError {
                left: other.shape().to_vec(),
                right: shape.clone(),
                operation: operation.to_string(),
            }
        })?;
        let data = Zip::from(&lhs).and(&rhs).map_collect(|&a, &b| f(a, b));
        Ok(Self { data })
    }

    pub fn add(&self, other: &Self) -> Result<Self, LossGraphError> {
        self.zip_with(other, "add", |a, b| a + b)
    }

    pub fn sub(&self, other: &Self) -> Result<Self, LossGraphError> {
        self.zip_with(other, "sub", |a, b| a - b)
    }

    pub fn mul(&self, other: &Self) -> Result<Self, LossGraphError> {
        self.zip_with(other, "mul", |a, b| a * b)
    }

    pub fn div(&self, other: &Self) -> Result<Self, LossGraphError> {
        self.zip_with(other, "div", |a, b| a / b)
    }

    // ---- elementwise unary / scalar ops ----

    pub fn map<F>(&self, f: F) -> Self
    where
        F: Fn(T) -> T,
    {
        Self { data: self.data.mapv(f) }
    }

    pub fn add_scalar(&self, value: T) -> Self {
        self.map(|x| x + value)
    }

    pub fn sub_scalar(&self, value: T) -> Self {
        self.map(|x| x - value)
    }

    pub fn mul_scalar(&self, value: T) -> Self {
        self.map(|x| x * value)
    }

    pub fn div_scalar(&self, value: T) -> Self {
        self.map(|x| x / value)
    }

    pub fn max_scalar(&self, value: T) -> Self {
        self.map(|x| x.max(value))
    }

    /// Clamp into `[min, max]`.
    pub fn clamp(&self, min: T, max: T) -> Self {
        self.map(|x| x.max(min).min(max))
    }

    // ---- reductions ----

    fn validate_axes(&self, axes: &[usize], operation: &str) -> Result<Vec<usize>, LossGraphError> {
        let mut sorted = axes.to_vec();
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
            if ax >= self.ndim() {
                return Err(LossGraphError::InvalidShape(format!(
                    "axis {} out of range for rank {} in {}",
                    ax,
                    self.ndim(),
                    operation
                )));
            }
        }
        Ok(sorted)
    }

    /// Sum over all elements (`axes = None`) or the given axes.
    pub fn sum(&self, axes: Option<&[usize]>, keep_dims: bool) -> Result<Self, LossGraphError> {
        match axes {
            None => {
                let total = self.data.sum();
                let shape = if keep_dims { vec![1; self.ndim()] } else { vec![] };
                Ok(Self::full(&shape, total))
            }
            Some(axes) => {
                let sorted = self.validate_axes(axes, "sum")?;
                let mut out = self.data.clone();
                for &ax in sorted.iter().rev() {
                    out = out.sum_axis(Axis(ax));
                }
                if keep_dims {
                    for &ax in &sorted {
                        out = out.insert_axis(Axis(ax));
                    }
                }
                Ok(Self { data: out })
            }
        }
    }

    /// Arithmetic mean over all elements or the given axes.
    pub fn mean(&self, axes: Option<&[usize]>, keep_dims: bool) -> Result<Self, LossGraphError> {
        let count = match axes {
            None => self.len(),
            Some(axes) => {
                self.validate_axes(axes, "mean")?;
                axes.iter().map(|&ax| self.shape()[ax]).product()
            }
        };
        if count == 0 {
            return Err(LossGraphError::InvalidShape("mean over zero elements".into()));
        }
        let divisor = scalar_from_usize::<T>(count, "mean")?;
        let summed = self.sum(axes, keep_dims)?;
        Ok(summed.div_scalar(divisor))
    }

    /// Maximum over all elements or the given axes.
    pub fn max(&self, axes: Option<&[usize]>, keep_dims: bool) -> Result<Self, LossGraphError> {
        if self.is_empty() {
            return Err(LossGraphError::InvalidShape("max of empty tensor".into()));
        }
        match axes {
            None => {
                let m = self
                    .data
                    .iter()
                    .fold(T::neg_infinity(), |acc, &x| acc.max(x));
                let shape = if keep_dims { vec![1; self.ndim()] } else { vec![] };
                Ok(Self::full(&shape, m))
            }
            Some(axes) => {
                let sorted = self.validate_axes(axes, "max")?;
                let mut out = self.data.clone();
                for &ax in sorted.iter().rev() {
                    out = out.fold_axis(Axis(ax), T::neg_infinity(), |&acc, &x| acc.max(x));
                }
                if keep_dims {
                    for &ax in &sorted {
                        out = out.insert_axis(Axis(ax));
                    }
                }
                Ok(Self { data: out })
            }
        }
    }

    // ---- shape ops ----

    pub fn reshape(&self, shape: &[usize]) -> Result<Self, LossGraphError> {
        let expected: usize = shape.iter().product();
        if expected != self.len() {
            return Err(LossGraphError::InvalidShape(format!(
                "cannot reshape {:?} ({} elements) into {:?} ({} elements)",
                self.shape(),
                self.len(),
                shape,
                expected
            )));
        }
        Self::from_vec(self.to_vec(), shape)
    }

    pub fn broadcast_to(&self, shape: &[usize]) -> Result<Self, LossGraphError> {
        let data = self
            .data
            .broadcast(IxDyn(shape))
            .ok_or_else(|| LossGraphError::BroadcastError {
                left: self.shape().to_vec(),
                right: shape.to_vec(),
                operation: "broadcast_to".to_string(),
            })?
            .to_owned();
        Ok(Self { data })
    }

    pub fn unsqueeze(&self, axis: usize) -> Result<Self, LossGraphError> {
        if axis > self.ndim() {
            return Err(LossGraphError::InvalidShape(format!(
                "unsqueeze axis {} out of range for rank {}",
                axis,
                self.ndim()
            )));
        }
        Ok(Self { data: self.data.clone().insert_axis(Axis(axis)) })
    }

    /// Drops the given size-1 axis, or every size-1 axis when `None`.
    pub fn squeeze(&self, axis: Option<usize>) -> Result<Self, LossGraphError> {
        let shape = match axis {
            Some(ax) => {
                if ax >= self.ndim() {
                    return Err(LossGraphError::InvalidShape(format!(
                        "squeeze axis {} out of range for rank {}",
                        ax,
                        self.ndim()
                    )));
                }
                if self.shape()[ax] != 1 {
                    return Err(LossGraphError::InvalidShape(format!(
                        "cannot squeeze axis {} of size {}",
                        ax,
                        self.shape()[ax]
                    )));
                }
                let mut s = self.shape().to_vec();
                s.remove(ax);
                s
            }
            None => self.shape().iter().copied().filter(|&d| d != 1).collect(),
        };
        self.reshape(&shape)
    }
}

impl<T: GraphFloat> From<Array<T, IxDyn>> for Tensor<T> {
    fn from(data: Array<T, IxDyn>) -> Self {
        Self { data }
    }
}
