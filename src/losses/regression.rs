// Regression losses.

use crate::backend::GraphFloat;
use crate::error::LossGraphError;
use crate::graph::{GraphEngine, NodeId};
use crate::losses::{Loss, Reduction, functions, short_type_name, simple_loss};

simple_loss!(
    MeanSquaredError,
    functions::mean_squared_error,
    "Mean squared error: `mean((predictions - labels)^2)`.\n\n\
     The classic regression loss; outliers are penalized quadratically."
);

simple_loss!(
    MeanAbsoluteError,
    functions::mean_absolute_error,
    "Mean absolute error: `mean(|predictions - labels|)`."
);

simple_loss!(
    MeanAbsolutePercentageError,
    functions::mean_absolute_percentage_error,
    "Mean absolute percentage error: \
     `100 * mean(|labels - predictions| / max(|labels|, eps))`."
);

simple_loss!(
    MeanSquaredLogarithmicError,
    functions::mean_squared_logarithmic_error,
    "Mean squared logarithmic error: \
     `mean((log1p(predictions) - log1p(labels))^2)` with inputs floored at eps."
);

/// Logarithm of the hyperbolic cosine of the prediction error:
/// `logcosh = log((exp(x) + exp(-x)) / 2)` where `x = predictions - labels`.
///
/// Behaves like half the squared error for small `x` and like
/// `|x| - log 2` for large `x`: mostly quadratic, but one wild
/// prediction cannot dominate the batch. Computed via a softplus
/// identity so large errors do not overflow.
///
/// ```
/// use lossgraph::Tensor;
/// use lossgraph::graph::GraphEngine;
/// use lossgraph::losses::{Loss, LogCosh, Reduction};
///
/// let mut graph = GraphEngine::<f32>::new();
/// let labels = graph.create_variable(
///     Tensor::from_vec(vec![0.0, 1.0, 0.0, 0.0], &[2, 2]).unwrap(),
/// );
/// let predictions = graph.create_variable(
///     Tensor::from_vec(vec![1.0, 1.0, 0.0, 0.0], &[2, 2]).unwrap(),
/// );
///
/// let loss = LogCosh::new();
/// let result = loss.forward(&mut graph, labels, predictions, None).unwrap();
/// let value = graph.evaluate(result).unwrap().first().unwrap();
/// assert!((value - 0.108).abs() < 1e-3);
///
/// let sum = LogCosh::with_reduction(Reduction::Sum);
/// let result = sum.forward(&mut graph, labels, predictions, None).unwrap();
/// let value = graph.evaluate(result).unwrap().first().unwrap();
/// assert!((value - 0.217).abs() < 1e-3);
/// ```
#[derive(Debug, Clone)]
pub struct LogCosh {
    name: String,
    reduction: Reduction,
}

impl LogCosh {
    pub fn new() -> Self {
        Self::with_reduction(Reduction::Auto)
    }

    pub fn with_reduction(reduction: Reduction) -> Self {
        Self {
            name: short_type_name::<Self>(),
            reduction,
        }
    }

    pub fn named(name: impl Into<String>, reduction: Reduction) -> Self {
        Self {
            name: name.into(),
            reduction,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn reduction(&self) -> Reduction {
        self.reduction
    }
}

impl Default for LogCosh {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Loss<T> for LogCosh
where
    T: GraphFloat,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn reduction(&self) -> Reduction {
        self.reduction
    }

    fn unreduced(
        &self,
        graph: &mut GraphEngine<T>,
        labels: NodeId,
        predictions: NodeId,
    ) -> Result<NodeId, LossGraphError> {
        functions::log_cosh(graph, labels, predictions)
    }
}

/// Huber loss: quadratic inside `[-delta, delta]`, linear outside.
///
/// A compromise between MSE (sensitive to outliers) and MAE (constant
/// gradient near zero). The default `delta` is 1.0.
#[derive(Debug, Clone)]
pub struct Huber {
    name: String,
    reduction: Reduction,
    delta: f64,
}

impl Huber {
    pub fn new() -> Self {
        Self::with_reduction(Reduction::Auto)
    }

    pub fn with_reduction(reduction: Reduction) -> Self {
        Self::with_delta(1.0, reduction)
    }

    pub fn with_delta(delta: f64, reduction: Reduction) -> Self {
        Self {
            name: short_type_name::<Self>(),
            reduction,
            delta,
        }
    }

    pub fn named(name: impl Into<String>, delta: f64, reduction: Reduction) -> Self {
        Self {
            name: name.into(),
            reduction,
            delta,
        }
    }

    pub fn delta(&self) -> f64 {
        self.delta
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn reduction(&self) -> Reduction {
        self.reduction
    }
}

impl Default for Huber {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Loss<T> for Huber
where
    T: GraphFloat,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn reduction(&self) -> Reduction {
        self.reduction
    }

    fn unreduced(
        &self,
        graph: &mut GraphEngine<T>,
        labels: NodeId,
        predictions: NodeId,
    ) -> Result<NodeId, LossGraphError> {
        functions::huber(graph, labels, predictions, self.delta)
    }
}
