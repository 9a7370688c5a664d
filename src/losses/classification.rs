// Classification, margin, and divergence losses.

use crate::backend::GraphFloat;
use crate::error::LossGraphError;
use crate::graph::{GraphEngine, NodeId};
use crate::losses::{Loss, Reduction, functions, short_type_name, simple_loss};

simple_loss!(
    Hinge,
    functions::hinge,
    "Hinge loss: `mean(max(1 - labels * predictions, 0))`.\n\n\
     Labels are expected in {-1, 1}; {0, 1} labels are converted \
     automatically."
);

simple_loss!(
    SquaredHinge,
    functions::squared_hinge,
    "Squared hinge loss: `mean(max(1 - labels * predictions, 0)^2)`."
);

simple_loss!(
    CategoricalHinge,
    functions::categorical_hinge,
    "Categorical hinge loss: `max(neg - pos + 1, 0)` with \
     `pos = sum(labels * predictions)` and \
     `neg = max((1 - labels) * predictions)` per example."
);

simple_loss!(
    Poisson,
    functions::poisson,
    "Poisson loss: `mean(predictions - labels * log(predictions))`.\n\n\
     Suited to count data where predictions model the rate of a Poisson \
     distribution."
);

simple_loss!(
    KLDivergence,
    functions::kl_divergence,
    "Kullback-Leibler divergence: \
     `sum(labels * log(labels / predictions))` per example, with both \
     distributions clipped away from zero."
);

/// Negative cosine similarity between labels and predictions along a
/// configurable axis (default: the trailing axis).
///
/// The result lies in `[-1, 1]`; `-1` means identical direction, so
/// minimizing this loss maximizes similarity.
#[derive(Debug, Clone)]
pub struct CosineSimilarity {
    name: String,
    reduction: Reduction,
    axis: isize,
}

impl CosineSimilarity {
    pub fn new() -> Self {
        Self::with_reduction(Reduction::Auto)
    }

    pub fn with_reduction(reduction: Reduction) -> Self {
        Self::with_axis(-1, reduction)
    }

    pub fn with_axis(axis: isize, reduction: Reduction) -> Self {
        Self {
            name: short_type_name::<Self>(),
            reduction,
            axis,
        }
    }

    pub fn named(name: impl Into<String>, axis: isize, reduction: Reduction) -> Self {
        Self {
            name: name.into(),
            reduction,
            axis,
        }
    }

    pub fn axis(&self) -> isize {
        self.axis
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn reduction(&self) -> Reduction {
        self.reduction
    }
}

impl Default for CosineSimilarity {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Loss<T> for CosineSimilarity
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
        functions::cosine_similarity(graph, labels, predictions, self.axis)
    }
}

/// Binary cross-entropy between true labels and predicted
/// probabilities (or logits, when `from_logits` is set).
///
/// `label_smoothing > 0` squeezes labels towards 0.5:
/// `l * (1 - s) + s/2`.
#[derive(Debug, Clone)]
pub struct BinaryCrossentropy {
    name: String,
    reduction: Reduction,
    from_logits: bool,
    label_smoothing: f64,
}

impl BinaryCrossentropy {
    pub fn new() -> Self {
        Self::with_reduction(Reduction::Auto)
    }

    pub fn with_reduction(reduction: Reduction) -> Self {
        Self::with_options(false, 0.0, reduction)
    }

    pub fn with_options(from_logits: bool, label_smoothing: f64, reduction: Reduction) -> Self {
        Self {
            name: short_type_name::<Self>(),
            reduction,
            from_logits,
            label_smoothing,
        }
    }

    pub fn named(
        name: impl Into<String>,
        from_logits: bool,
        label_smoothing: f64,
        reduction: Reduction,
    ) -> Self {
        Self {
            name: name.into(),
            reduction,
            from_logits,
            label_smoothing,
        }
    }

    pub fn from_logits(&self) -> bool {
        self.from_logits
    }

    pub fn label_smoothing(&self) -> f64 {
        self.label_smoothing
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn reduction(&self) -> Reduction {
        self.reduction
    }
}

impl Default for BinaryCrossentropy {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Loss<T> for BinaryCrossentropy
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
        functions::binary_crossentropy(
            graph,
            labels,
            predictions,
            self.from_logits,
            self.label_smoothing,
        )
    }
}

/// Categorical cross-entropy between one-hot labels and predicted
/// class distributions (or logits, when `from_logits` is set).
///
/// `label_smoothing > 0` mixes the one-hot labels with the uniform
/// distribution: `l * (1 - s) + s / num_classes`.
#[derive(Debug, Clone)]
pub struct CategoricalCrossentropy {
    name: String,
    reduction: Reduction,
    from_logits: bool,
    label_smoothing: f64,
}

impl CategoricalCrossentropy {
    pub fn new() -> Self {
        Self::with_reduction(Reduction::Auto)
    }

    pub fn with_reduction(reduction: Reduction) -> Self {
        Self::with_options(false, 0.0, reduction)
    }

    pub fn with_options(from_logits: bool, label_smoothing: f64, reduction: Reduction) -> Self {
        Self {
            name: short_type_name::<Self>(),
            reduction,
            from_logits,
            label_smoothing,
        }
    }

    pub fn named(
        name: impl Into<String>,
        from_logits: bool,
        label_smoothing: f64,
        reduction: Reduction,
    ) -> Self {
        Self {
            name: name.into(),
            reduction,
            from_logits,
            label_smoothing,
        }
    }

    pub fn from_logits(&self) -> bool {
        self.from_logits
    }

    pub fn label_smoothing(&self) -> f64 {
        self.label_smoothing
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn reduction(&self) -> Reduction {
        self.reduction
    }
}

impl Default for CategoricalCrossentropy {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Loss<T> for CategoricalCrossentropy
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
        functions::categorical_crossentropy(
            graph,
            labels,
            predictions,
            self.from_logits,
            self.label_smoothing,
        )
    }
}
