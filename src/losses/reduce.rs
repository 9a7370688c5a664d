// Weighted reduction: the single place where per-example losses,
// optional sample weights, and the reduction policy meet.

use crate::backend::{GraphFloat, broadcast_shapes, scalar_from_usize};
use crate::error::LossGraphError;
use crate::graph::{GraphEngine, NodeId};
use crate::losses::Reduction;
use crate::ops::{DivScalar, Mul, Sum};

/// Applies the optional sample weight and the reduction policy to a
/// per-example loss node.
///
/// Weights must broadcast to the loss shape without expanding it: a
/// scalar, a per-example vector, or any prefix-of-ones variant thereof.
/// A weight shape that would change the loss shape is rejected at
/// construction time with [`LossGraphError::ShapeMismatch`].
pub fn compute_weighted_loss<T>(
    graph: &mut GraphEngine<T>,
    losses: NodeId,
    reduction: Reduction,
    sample_weight: Option<NodeId>,
) -> Result<NodeId, LossGraphError>
where
    T: GraphFloat,
{
    let loss_shape = graph.shape(losses)?.to_vec();

    let weighted = match sample_weight {
        Some(weight) => {
            let weight_shape = graph.shape(weight)?.to_vec();
            let joint = broadcast_shapes(&loss_shape, &weight_shape, "sample weighting")?;
            if joint != loss_shape {
                return Err(LossGraphError::ShapeMismatch {
                    expected: loss_shape,
                    actual: weight_shape,
                    operation: "sample weighting".to_string(),
                });
            }
            graph.apply_operation(Box::new(Mul), vec![losses, weight])?
        }
        None => losses,
    };

    match reduction.resolved() {
        Reduction::None => Ok(weighted),
        Reduction::Sum => graph.apply_operation(Box::new(Sum::all(false)), vec![weighted]),
        Reduction::SumOverBatchSize => {
            let count: usize = loss_shape.iter().product();
            if count == 0 {
                return Err(LossGraphError::InvalidShape(
                    "cannot average a loss with zero elements".into(),
                ));
            }
            let divisor = scalar_from_usize::<T>(count, "sum_over_batch_size")?;
            let total = graph.apply_operation(Box::new(Sum::all(false)), vec![weighted])?;
            graph.apply_operation(Box::new(DivScalar::new(divisor)), vec![total])
        }
        // resolved() never returns Auto
        Reduction::Auto => Err(LossGraphError::UnsupportedReduction("auto".to_string())),
    }
}
