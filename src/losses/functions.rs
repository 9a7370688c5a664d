// Elementwise loss builders.
//
// Each function maps (labels, predictions) to a per-example loss node:
// the formula is applied elementwise, then averaged (or summed, for the
// divergence-style losses) over the trailing axis. Loss objects wrap
// these builders; they can also be used directly when no reduction
// policy is wanted.

use crate::backend::{GraphFloat, Tensor, scalar_from_f64};
use crate::error::LossGraphError;
use crate::graph::{GraphEngine, NodeId};
use crate::ops::{
    Abs, Add, AddScalar, Clamp, Div, Exp, Log, Log1p, Max, MaxScalar, Mean, Mul, MulScalar, Neg,
    Operator, Softplus, Sqrt, Sub, SubScalar, Sum, check_arity,
};

/// Fuzz factor keeping logarithms and divisions away from zero.
pub(crate) const EPSILON: f64 = 1e-7;

fn apply<T>(
    graph: &mut GraphEngine<T>,
    op: impl Operator<T> + 'static,
    inputs: Vec<NodeId>,
) -> Result<NodeId, LossGraphError>
where
    T: GraphFloat,
{
    graph.apply_operation(Box::new(op), inputs)
}

fn epsilon<T: GraphFloat>(operation: &str) -> Result<T, LossGraphError> {
    scalar_from_f64(EPSILON, operation)
}

/// Mean over the trailing axis, turning per-element losses into
/// per-example losses. Rank-0 inputs pass through unchanged.
fn mean_last_axis<T>(graph: &mut GraphEngine<T>, node: NodeId) -> Result<NodeId, LossGraphError>
where
    T: GraphFloat,
{
    let rank = graph.shape(node)?.len();
    if rank == 0 {
        return Ok(node);
    }
    apply(graph, Mean::along_axes(vec![rank - 1], false), vec![node])
}

fn sum_last_axis<T>(graph: &mut GraphEngine<T>, node: NodeId) -> Result<NodeId, LossGraphError>
where
    T: GraphFloat,
{
    let rank = graph.shape(node)?.len();
    if rank == 0 {
        return Ok(node);
    }
    apply(graph, Sum::along_axes(vec![rank - 1], false), vec![node])
}

fn resolve_axis(axis: isize, rank: usize) -> Result<usize, LossGraphError> {
    let resolved = if axis < 0 { axis + rank as isize } else { axis };
    if resolved < 0 || resolved as usize >= rank {
        return Err(LossGraphError::InvalidShape(format!(
            "axis {} out of range for rank {}",
            axis, rank
        )));
    }
    Ok(resolved as usize)
}

/// `mean((predictions - labels)^2)` over the trailing axis.
pub fn mean_squared_error<T>(
    graph: &mut GraphEngine<T>,
    labels: NodeId,
    predictions: NodeId,
) -> Result<NodeId, LossGraphError>
where
    T: GraphFloat,
{
    let diff = apply(graph, Sub, vec![predictions, labels])?;
    let squared = apply(graph, Mul, vec![diff, diff])?;
    mean_last_axis(graph, squared)
}

/// `mean(|predictions - labels|)` over the trailing axis.
pub fn mean_absolute_error<T>(
    graph: &mut GraphEngine<T>,
    labels: NodeId,
    predictions: NodeId,
) -> Result<NodeId, LossGraphError>
where
    T: GraphFloat,
{
    let diff = apply(graph, Sub, vec![predictions, labels])?;
    let abs_diff = apply(graph, Abs, vec![diff])?;
    mean_last_axis(graph, abs_diff)
}

/// `100 * mean(|labels - predictions| / max(|labels|, eps))`.
pub fn mean_absolute_percentage_error<T>(
    graph: &mut GraphEngine<T>,
    labels: NodeId,
    predictions: NodeId,
) -> Result<NodeId, LossGraphError>
where
    T: GraphFloat,
{
    let eps = epsilon::<T>("mean_absolute_percentage_error")?;
    let diff = apply(graph, Sub, vec![labels, predictions])?;
    let abs_diff = apply(graph, Abs, vec![diff])?;
    let abs_labels = apply(graph, Abs, vec![labels])?;
    let denom = apply(graph, MaxScalar::new(eps), vec![abs_labels])?;
    let ratio = apply(graph, Div, vec![abs_diff, denom])?;
    let mean = mean_last_axis(graph, ratio)?;
    let hundred = scalar_from_f64::<T>(100.0, "mean_absolute_percentage_error")?;
    apply(graph, MulScalar::new(hundred), vec![mean])
}

/// `mean((log1p(max(predictions, eps)) - log1p(max(labels, eps)))^2)`.
pub fn mean_squared_logarithmic_error<T>(
    graph: &mut GraphEngine<T>,
    labels: NodeId,
    predictions: NodeId,
) -> Result<NodeId, LossGraphError>
where
    T: GraphFloat,
{
    let eps = epsilon::<T>("mean_squared_logarithmic_error")?;
    let safe_predictions = apply(graph, MaxScalar::new(eps), vec![predictions])?;
    let first_log = apply(graph, Log1p, vec![safe_predictions])?;
    let safe_labels = apply(graph, MaxScalar::new(eps), vec![labels])?;
    let second_log = apply(graph, Log1p, vec![safe_labels])?;
    let diff = apply(graph, Sub, vec![first_log, second_log])?;
    let squared = apply(graph, Mul, vec![diff, diff])?;
    mean_last_axis(graph, squared)
}

/// Logarithm of the hyperbolic cosine of the prediction error.
///
/// Uses the identity `log(cosh(x)) = x + softplus(-2x) - log 2`, which
/// stays finite for any representable error while `log((e^x + e^-x)/2)`
/// would overflow near `|x| > 700`.
pub fn log_cosh<T>(
    graph: &mut GraphEngine<T>,
    labels: NodeId,
    predictions: NodeId,
) -> Result<NodeId, LossGraphError>
where
    T: GraphFloat,
{
    let minus_two = scalar_from_f64::<T>(-2.0, "log_cosh")?;
    let ln_two = scalar_from_f64::<T>(std::f64::consts::LN_2, "log_cosh")?;

    let error = apply(graph, Sub, vec![predictions, labels])?;
    let scaled = apply(graph, MulScalar::new(minus_two), vec![error])?;
    let softplus = apply(graph, Softplus, vec![scaled])?;
    let shifted = apply(graph, Add, vec![error, softplus])?;
    let logcosh = apply(graph, SubScalar::new(ln_two), vec![shifted])?;
    mean_last_axis(graph, logcosh)
}

/// Huber loss: quadratic for `|error| <= delta`, linear beyond.
pub fn huber<T>(
    graph: &mut GraphEngine<T>,
    labels: NodeId,
    predictions: NodeId,
    delta: f64,
) -> Result<NodeId, LossGraphError>
where
    T: GraphFloat,
{
    if delta <= 0.0 {
        return Err(LossGraphError::InvalidArgument(format!(
            "huber delta must be positive, got {}",
            delta
        )));
    }
    let delta_t = scalar_from_f64::<T>(delta, "huber")?;
    let half = scalar_from_f64::<T>(0.5, "huber")?;

    let error = apply(graph, Sub, vec![predictions, labels])?;
    let abs_error = apply(graph, Abs, vec![error])?;
    // min(|e|, delta), written as a clamp since |e| >= 0
    let quadratic = apply(graph, Clamp::new(T::zero(), delta_t), vec![abs_error])?;
    let linear = apply(graph, Sub, vec![abs_error, quadratic])?;
    let quadratic_sq = apply(graph, Mul, vec![quadratic, quadratic])?;
    let half_sq = apply(graph, MulScalar::new(half), vec![quadratic_sq])?;
    let linear_term = apply(graph, MulScalar::new(delta_t), vec![linear])?;
    let total = apply(graph, Add, vec![half_sq, linear_term])?;
    mean_last_axis(graph, total)
}

// Rewrites {0, 1} labels to {-1, 1} for the hinge family; labels that
// already carry other values are passed through untouched. The check is
// data-dependent, so it runs at evaluation time inside an operator.
#[derive(Debug, Clone)]
struct ConvertBinaryLabels;

impl<T> Operator<T> for ConvertBinaryLabels
where
    T: GraphFloat,
{
    fn compute(&self, inputs: &[&Tensor<T>]) -> Result<Tensor<T>, LossGraphError> {
        check_arity(&Operator::<T>::name(self), 1, inputs.len())?;
        let labels = inputs[0];
        let all_binary = labels
            .data()
            .iter()
            .all(|&x| x == T::zero() || x == T::one());
        if all_binary {
            let two = T::one() + T::one();
            Ok(labels.mul_scalar(two).sub_scalar(T::one()))
        } else {
            Ok(labels.clone())
        }
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

fn hinge_margins<T>(
    graph: &mut GraphEngine<T>,
    labels: NodeId,
    predictions: NodeId,
) -> Result<NodeId, LossGraphError>
where
    T: GraphFloat,
{
    let signed = apply(graph, ConvertBinaryLabels, vec![labels])?;
    let agreement = apply(graph, Mul, vec![signed, predictions])?;
    let negated = apply(graph, Neg, vec![agreement])?;
    let margin = apply(graph, AddScalar::new(T::one()), vec![negated])?;
    apply(graph, MaxScalar::new(T::zero()), vec![margin])
}

/// `mean(max(1 - labels * predictions, 0))`; {0, 1} labels are first
/// converted to {-1, 1}.
pub fn hinge<T>(
    graph: &mut GraphEngine<T>,
    labels: NodeId,
    predictions: NodeId,
) -> Result<NodeId, LossGraphError>
where
    T: GraphFloat,
{
    let margins = hinge_margins(graph, labels, predictions)?;
    mean_last_axis(graph, margins)
}

/// `mean(max(1 - labels * predictions, 0)^2)`.
pub fn squared_hinge<T>(
    graph: &mut GraphEngine<T>,
    labels: NodeId,
    predictions: NodeId,
) -> Result<NodeId, LossGraphError>
where
    T: GraphFloat,
{
    let margins = hinge_margins(graph, labels, predictions)?;
    let squared = apply(graph, Mul, vec![margins, margins])?;
    mean_last_axis(graph, squared)
}

/// `max(neg - pos + 1, 0)` where `pos = sum(labels * predictions)` and
/// `neg = max((1 - labels) * predictions)` over the trailing axis.
pub fn categorical_hinge<T>(
    graph: &mut GraphEngine<T>,
    labels: NodeId,
    predictions: NodeId,
) -> Result<NodeId, LossGraphError>
where
    T: GraphFloat,
{
    let pos_terms = apply(graph, Mul, vec![labels, predictions])?;
    let pos = sum_last_axis(graph, pos_terms)?;

    let negated_labels = apply(graph, Neg, vec![labels])?;
    let one_minus_labels = apply(graph, AddScalar::new(T::one()), vec![negated_labels])?;
    let neg_terms = apply(graph, Mul, vec![one_minus_labels, predictions])?;
    let rank = graph.shape(neg_terms)?.len();
    let neg = if rank == 0 {
        neg_terms
    } else {
        apply(graph, Max::along_axes(vec![rank - 1], false), vec![neg_terms])?
    };

    let diff = apply(graph, Sub, vec![neg, pos])?;
    let margin = apply(graph, AddScalar::new(T::one()), vec![diff])?;
    apply(graph, MaxScalar::new(T::zero()), vec![margin])
}

/// `mean(predictions - labels * log(predictions + eps))`.
pub fn poisson<T>(
    graph: &mut GraphEngine<T>,
    labels: NodeId,
    predictions: NodeId,
) -> Result<NodeId, LossGraphError>
where
    T: GraphFloat,
{
    let eps = epsilon::<T>("poisson")?;
    let shifted = apply(graph, AddScalar::new(eps), vec![predictions])?;
    let log_predictions = apply(graph, Log, vec![shifted])?;
    let cross = apply(graph, Mul, vec![labels, log_predictions])?;
    let loss = apply(graph, Sub, vec![predictions, cross])?;
    mean_last_axis(graph, loss)
}

/// Kullback-Leibler divergence `sum(labels * log(labels / predictions))`
/// over the trailing axis, with both distributions clipped to
/// `[eps, 1]`.
pub fn kl_divergence<T>(
    graph: &mut GraphEngine<T>,
    labels: NodeId,
    predictions: NodeId,
) -> Result<NodeId, LossGraphError>
where
    T: GraphFloat,
{
    let eps = epsilon::<T>("kl_divergence")?;
    let safe_labels = apply(graph, Clamp::new(eps, T::one()), vec![labels])?;
    let safe_predictions = apply(graph, Clamp::new(eps, T::one()), vec![predictions])?;
    let ratio = apply(graph, Div, vec![safe_labels, safe_predictions])?;
    let log_ratio = apply(graph, Log, vec![ratio])?;
    let terms = apply(graph, Mul, vec![safe_labels, log_ratio])?;
    sum_last_axis(graph, terms)
}

fn l2_normalize<T>(
    graph: &mut GraphEngine<T>,
    node: NodeId,
    axis: isize,
) -> Result<NodeId, LossGraphError>
where
    T: GraphFloat,
{
    let rank = graph.shape(node)?.len();
    let ax = resolve_axis(axis, rank.max(1))?;
    let floor = scalar_from_f64::<T>(1e-12, "l2_normalize")?;

    let squared = apply(graph, Mul, vec![node, node])?;
    let sum_sq = apply(graph, Sum::along_axes(vec![ax], true), vec![squared])?;
    let floored = apply(graph, MaxScalar::new(floor), vec![sum_sq])?;
    let norm = apply(graph, Sqrt, vec![floored])?;
    apply(graph, Div, vec![node, norm])
}

/// Negative cosine similarity along `axis` (negated so that lower is
/// better, like every other loss).
pub fn cosine_similarity<T>(
    graph: &mut GraphEngine<T>,
    labels: NodeId,
    predictions: NodeId,
    axis: isize,
) -> Result<NodeId, LossGraphError>
where
    T: GraphFloat,
{
    let labels_unit = l2_normalize(graph, labels, axis)?;
    let predictions_unit = l2_normalize(graph, predictions, axis)?;
    let cross = apply(graph, Mul, vec![labels_unit, predictions_unit])?;
    let rank = graph.shape(cross)?.len();
    let ax = resolve_axis(axis, rank.max(1))?;
    let similarity = apply(graph, Sum::along_axes(vec![ax], false), vec![cross])?;
    apply(graph, Neg, vec![similarity])
}

fn smooth_binary_labels<T>(
    graph: &mut GraphEngine<T>,
    labels: NodeId,
    label_smoothing: f64,
) -> Result<NodeId, LossGraphError>
where
    T: GraphFloat,
{
    if label_smoothing == 0.0 {
        return Ok(labels);
    }
    // l * (1 - s) + s/2
    let keep = scalar_from_f64::<T>(1.0 - label_smoothing, "label smoothing")?;
    let shift = scalar_from_f64::<T>(label_smoothing * 0.5, "label smoothing")?;
    let scaled = apply(graph, MulScalar::new(keep), vec![labels])?;
    apply(graph, AddScalar::new(shift), vec![scaled])
}

/// Binary cross-entropy.
///
/// With `from_logits`, uses the overflow-safe formulation
/// `max(x, 0) - x*z + softplus(-|x|)` instead of clipping sigmoid
/// outputs; otherwise predictions are clipped to `[eps, 1 - eps]`.
pub fn binary_crossentropy<T>(
    graph: &mut GraphEngine<T>,
    labels: NodeId,
    predictions: NodeId,
    from_logits: bool,
    label_smoothing: f64,
) -> Result<NodeId, LossGraphError>
where
    T: GraphFloat,
{
    validate_smoothing(label_smoothing)?;
    let labels = smooth_binary_labels(graph, labels, label_smoothing)?;

    let per_element = if from_logits {
        let relu_x = apply(graph, MaxScalar::new(T::zero()), vec![predictions])?;
        let cross = apply(graph, Mul, vec![predictions, labels])?;
        let linear = apply(graph, Sub, vec![relu_x, cross])?;
        let abs_x = apply(graph, Abs, vec![predictions])?;
        let neg_abs = apply(graph, Neg, vec![abs_x])?;
        let softplus = apply(graph, Softplus, vec![neg_abs])?;
        apply(graph, Add, vec![linear, softplus])?
    } else {
        let eps = epsilon::<T>("binary_crossentropy")?;
        let safe = apply(graph, Clamp::new(eps, T::one() - eps), vec![predictions])?;
        let log_p = apply(graph, Log, vec![safe])?;
        let on_term = apply(graph, Mul, vec![labels, log_p])?;

        let neg_labels = apply(graph, Neg, vec![labels])?;
        let off_labels = apply(graph, AddScalar::new(T::one()), vec![neg_labels])?;
        let neg_p = apply(graph, Neg, vec![safe])?;
        let off_p = apply(graph, AddScalar::new(T::one()), vec![neg_p])?;
        let log_off = apply(graph, Log, vec![off_p])?;
        let off_term = apply(graph, Mul, vec![off_labels, log_off])?;

        let sum = apply(graph, Add, vec![on_term, off_term])?;
        apply(graph, Neg, vec![sum])?
    };
    mean_last_axis(graph, per_element)
}

/// Categorical cross-entropy over the trailing (class) axis.
///
/// With `from_logits`, applies a max-shifted log-softmax; otherwise the
/// prediction rows are renormalized to sum to one and clipped.
pub fn categorical_crossentropy<T>(
    graph: &mut GraphEngine<T>,
    labels: NodeId,
    predictions: NodeId,
    from_logits: bool,
    label_smoothing: f64,
) -> Result<NodeId, LossGraphError>
where
    T: GraphFloat,
{
    validate_smoothing(label_smoothing)?;
    let label_rank = graph.shape(labels)?.len();
    let rank = graph.shape(predictions)?.len();
    if rank == 0 || label_rank == 0 {
        return Err(LossGraphError::InvalidShape(
            "categorical crossentropy requires at least one class axis".into(),
        ));
    }
    let class_axis = rank - 1;

    let labels = if label_smoothing > 0.0 {
        let num_classes = graph.shape(labels)?[label_rank - 1];
        let keep = scalar_from_f64::<T>(1.0 - label_smoothing, "label smoothing")?;
        let shift =
            scalar_from_f64::<T>(label_smoothing / num_classes as f64, "label smoothing")?;
        let scaled = apply(graph, MulScalar::new(keep), vec![labels])?;
        apply(graph, AddScalar::new(shift), vec![scaled])?
    } else {
        labels
    };

    let log_probabilities = if from_logits {
        let max = apply(graph, Max::along_axes(vec![class_axis], true), vec![predictions])?;
        let shifted = apply(graph, Sub, vec![predictions, max])?;
        let exp = apply(graph, Exp, vec![shifted])?;
        let total = apply(graph, Sum::along_axes(vec![class_axis], true), vec![exp])?;
        let log_total = apply(graph, Log, vec![total])?;
        apply(graph, Sub, vec![shifted, log_total])?
    } else {
        let eps = epsilon::<T>("categorical_crossentropy")?;
        let total = apply(graph, Sum::along_axes(vec![class_axis], true), vec![predictions])?;
        let normalized = apply(graph, Div, vec![predictions, total])?;
        let safe = apply(graph, Clamp::new(eps, T::one()), vec![normalized])?;
        apply(graph, Log, vec![safe])?
    };

    let cross = apply(graph, Mul, vec![labels, log_probabilities])?;
    let summed = sum_last_axis(graph, cross)?;
    apply(graph, Neg, vec![summed])
}

fn validate_smoothing(label_smoothing: f64) -> Result<(), LossGraphError> {
    if !(0.0..=1.0).contains(&label_smoothing) {
        return Err(LossGraphError::InvalidArgument(format!(
            "label_smoothing must be in [0, 1], got {}",
            label_smoothing
        )));
    }
    Ok(())
}
