// Loss functions over the computational graph.
//
// Every loss is a stateless value object binding a name and a reduction
// policy to one elementwise formula. Invoking it builds graph nodes and
// returns a deferred handle; nothing is computed until the caller
// evaluates the result.

use std::any::type_name;
use std::fmt;
use std::str::FromStr;

pub mod classification;
pub mod functions;
pub mod reduce;
pub mod regression;

#[cfg(test)]
mod tests;

use crate::backend::GraphFloat;
use crate::error::LossGraphError;
use crate::graph::{GraphEngine, NodeId};

pub use classification::{
    BinaryCrossentropy, CategoricalCrossentropy, CategoricalHinge, CosineSimilarity, Hinge,
    KLDivergence, Poisson, SquaredHinge,
};
pub use reduce::compute_weighted_loss;
pub use regression::{
    Huber, LogCosh, MeanAbsoluteError, MeanAbsolutePercentageError, MeanSquaredError,
    MeanSquaredLogarithmicError,
};

/// Strategy for collapsing per-example losses into the final result.
///
/// `Auto` is the default and normalizes to [`Reduction::SumOverBatchSize`]:
/// the sum of (weighted) losses divided by the number of loss elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Reduction {
    /// Let the implementation pick; currently always `SumOverBatchSize`.
    #[default]
    Auto,
    /// Return per-example (weighted) losses unchanged.
    None,
    /// Scalar sum of all (weighted) losses.
    Sum,
    /// Scalar sum divided by the loss element count.
    SumOverBatchSize,
}

impl Reduction {
    /// Normalizes `Auto` to the concrete policy it stands for.
    pub fn resolved(self) -> Self {
        match self {
            Reduction::Auto => Reduction::SumOverBatchSize,
            other => other,
        }
    }
}

impl FromStr for Reduction {
    type Err = LossGraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Reduction::Auto),
            "none" => Ok(Reduction::None),
            "sum" => Ok(Reduction::Sum),
            "sum_over_batch_size" => Ok(Reduction::SumOverBatchSize),
            _ => Err(LossGraphError::UnsupportedReduction(s.to_string())),
        }
    }
}

impl fmt::Display for Reduction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Reduction::Auto => "auto",
            Reduction::None => "none",
            Reduction::Sum => "sum",
            Reduction::SumOverBatchSize => "sum_over_batch_size",
        };
        write!(f, "{}", name)
    }
}

/// Interface shared by every loss object.
///
/// Implementors provide the per-example formula via [`Loss::unreduced`];
/// weighting and reduction are applied uniformly by [`Loss::forward`].
/// Loss objects are immutable and may be invoked repeatedly; nothing is
/// accumulated between calls.
pub trait Loss<T>
where
    T: GraphFloat,
{
    /// Display name, defaulting to the concrete type's name.
    fn name(&self) -> &str;

    fn reduction(&self) -> Reduction;

    /// Per-example loss before weighting and reduction.
    fn unreduced(
        &self,
        graph: &mut GraphEngine<T>,
        labels: NodeId,
        predictions: NodeId,
    ) -> Result<NodeId, LossGraphError>;

    /// Full invocation contract: compute the elementwise loss, apply the
    /// optional sample weight, and reduce per the configured policy.
    /// Returns a deferred handle; the graph decides when to run it.
    fn forward(
        &self,
        graph: &mut GraphEngine<T>,
        labels: NodeId,
        predictions: NodeId,
        sample_weight: Option<NodeId>,
    ) -> Result<NodeId, LossGraphError> {
        let losses = self.unreduced(graph, labels, predictions)?;
        reduce::compute_weighted_loss(graph, losses, self.reduction(), sample_weight)
    }
}

/// Unqualified type name, used as the default loss name.
pub(crate) fn short_type_name<L: ?Sized>() -> String {
    let full_name = type_name::<L>();
    full_name
        .rsplit("::")
        .next()
        .unwrap_or(full_name)
        .to_string()
}

// Generates a loss object with no knobs beyond name and reduction,
// delegating the formula to a builder in `functions`.
macro_rules! simple_loss {
    ($name:ident, $function:path, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone)]
        pub struct $name {
            name: String,
            reduction: crate::losses::Reduction,
        }

        impl $name {
            pub fn new() -> Self {
                Self::with_reduction(crate::losses::Reduction::Auto)
            }

            pub fn with_reduction(reduction: crate::losses::Reduction) -> Self {
                Self {
                    name: crate::losses::short_type_name::<Self>(),
                    reduction,
                }
            }

            pub fn named(name: impl Into<String>, reduction: crate::losses::Reduction) -> Self {
                Self { name: name.into(), reduction }
            }

            pub fn name(&self) -> &str {
                &self.name
            }

            pub fn reduction(&self) -> crate::losses::Reduction {
                self.reduction
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl<T> crate::losses::Loss<T> for $name
        where
            T: crate::backend::GraphFloat,
        {
            fn name(&self) -> &str {
                &self.name
            }

            fn reduction(&self) -> crate::losses::Reduction {
                self.reduction
            }

            fn unreduced(
                &self,
                graph: &mut crate::graph::GraphEngine<T>,
                labels: crate::graph::NodeId,
                predictions: crate::graph::NodeId,
            ) -> Result<crate::graph::NodeId, crate::error::LossGraphError> {
                $function(graph, labels, predictions)
            }
        }
    };
}

pub(crate) use simple_loss;
