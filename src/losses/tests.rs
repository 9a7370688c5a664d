use std::str::FromStr;

use crate::backend::Tensor;
use crate::error::LossGraphError;
use crate::graph::{GraphEngine, NodeId};
use crate::losses::{
    BinaryCrossentropy, CategoricalCrossentropy, CategoricalHinge, CosineSimilarity, Hinge, Huber,
    KLDivergence, LogCosh, Loss, MeanAbsoluteError, MeanAbsolutePercentageError, MeanSquaredError,
    MeanSquaredLogarithmicError, Poisson, Reduction, SquaredHinge,
};

fn variable(graph: &mut GraphEngine<f64>, data: &[f64], shape: &[usize]) -> NodeId {
    graph.create_variable(Tensor::from_vec(data.to_vec(), shape).unwrap())
}

// Evaluates a loss forward pass and returns the scalar result.
fn scalar_loss(
    loss: &impl Loss<f64>,
    labels: (&[f64], &[usize]),
    predictions: (&[f64], &[usize]),
    weights: Option<(&[f64], &[usize])>,
) -> f64 {
    let mut graph = GraphEngine::new();
    let l = variable(&mut graph, labels.0, labels.1);
    let p = variable(&mut graph, predictions.0, predictions.1);
    let w = weights.map(|(data, shape)| variable(&mut graph, data, shape));
    let result = loss.forward(&mut graph, l, p, w).unwrap();
    graph.evaluate(result).unwrap().first().unwrap()
}

fn approx_eq(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance
}

const LABELS: [f64; 4] = [0.0, 1.0, 0.0, 0.0];
const PREDICTIONS: [f64; 4] = [1.0, 1.0, 0.0, 0.0];

#[test]
fn log_cosh_auto_reduction() {
    let value = scalar_loss(
        &LogCosh::new(),
        (&LABELS, &[2, 2]),
        (&PREDICTIONS, &[2, 2]),
        None,
    );
    assert!(approx_eq(value, 0.108, 1e-3), "got {}", value);
}

#[test]
fn log_cosh_sum_reduction() {
    let value = scalar_loss(
        &LogCosh::with_reduction(Reduction::Sum),
        (&LABELS, &[2, 2]),
        (&PREDICTIONS, &[2, 2]),
        None,
    );
    assert!(approx_eq(value, 0.217, 1e-3), "got {}", value);
}

#[test]
fn log_cosh_none_reduction_keeps_per_example_losses() {
    let mut graph = GraphEngine::new();
    let l = variable(&mut graph, &LABELS, &[2, 2]);
    let p = variable(&mut graph, &PREDICTIONS, &[2, 2]);
    let loss = LogCosh::with_reduction(Reduction::None);
    let result = loss.forward(&mut graph, l, p, None).unwrap();

    assert_eq!(graph.shape(result).unwrap(), &[2]);
    let values = graph.evaluate(result).unwrap().to_vec();
    assert!(approx_eq(values[0], 0.217, 1e-3), "got {:?}", values);
    assert!(approx_eq(values[1], 0.0, 1e-9), "got {:?}", values);
}

#[test]
fn log_cosh_with_sample_weights() {
    let value = scalar_loss(
        &LogCosh::new(),
        (&LABELS, &[2, 2]),
        (&PREDICTIONS, &[2, 2]),
        Some((&[0.8, 0.2], &[2])),
    );
    assert!(approx_eq(value, 0.087, 1e-3), "got {}", value);
}

#[test]
fn log_cosh_scalar_weight_scales_the_result() {
    let unweighted = scalar_loss(
        &LogCosh::new(),
        (&LABELS, &[2, 2]),
        (&PREDICTIONS, &[2, 2]),
        None,
    );
    let mut graph = GraphEngine::new();
    let l = variable(&mut graph, &LABELS, &[2, 2]);
    let p = variable(&mut graph, &PREDICTIONS, &[2, 2]);
    let w = graph.create_variable(Tensor::scalar(2.0));
    let result = LogCosh::new().forward(&mut graph, l, p, Some(w)).unwrap();
    let weighted = graph.evaluate(result).unwrap().first().unwrap();
    assert!(approx_eq(weighted, unweighted * 2.0, 1e-9));
}

#[test]
fn log_cosh_approaches_abs_minus_log_two_for_large_errors() {
    let value = scalar_loss(&LogCosh::new(), (&[0.0], &[1]), (&[10.0], &[1]), None);
    let asymptote = 10.0 - 2.0f64.ln();
    assert!(approx_eq(value, asymptote, 1e-6), "got {}", value);

    // the naive formulation would overflow exp(800)
    let huge = scalar_loss(&LogCosh::new(), (&[0.0], &[1]), (&[800.0], &[1]), None);
    assert!(huge.is_finite());
    assert!(approx_eq(huge, 800.0 - 2.0f64.ln(), 1e-6), "got {}", huge);
}

#[test]
fn log_cosh_propagates_nan() {
    let value = scalar_loss(
        &LogCosh::new(),
        (&[f64::NAN, 0.0], &[2]),
        (&[1.0, 1.0], &[2]),
        None,
    );
    assert!(value.is_nan());
}

#[test]
fn loss_objects_are_reusable() {
    let loss = LogCosh::new();
    let first = scalar_loss(&loss, (&LABELS, &[2, 2]), (&PREDICTIONS, &[2, 2]), None);
    let second = scalar_loss(&loss, (&LABELS, &[2, 2]), (&PREDICTIONS, &[2, 2]), None);
    assert_eq!(first, second);
}

#[test]
fn mean_squared_error_values() {
    let labels = [0.0, 1.0, 0.0, 0.0];
    let predictions = [1.0, 1.0, 1.0, 0.0];
    let auto = scalar_loss(
        &MeanSquaredError::new(),
        (&labels, &[2, 2]),
        (&predictions, &[2, 2]),
        None,
    );
    assert!(approx_eq(auto, 0.5, 1e-9));

    let sum = scalar_loss(
        &MeanSquaredError::with_reduction(Reduction::Sum),
        (&labels, &[2, 2]),
        (&predictions, &[2, 2]),
        None,
    );
    assert!(approx_eq(sum, 1.0, 1e-9));

    let weighted = scalar_loss(
        &MeanSquaredError::new(),
        (&labels, &[2, 2]),
        (&predictions, &[2, 2]),
        Some((&[0.7, 0.3], &[2])),
    );
    assert!(approx_eq(weighted, 0.25, 1e-9));
}

#[test]
fn mean_absolute_error_values() {
    let labels = [0.0, 1.0, 0.0, 0.0];
    let predictions = [1.0, 1.0, 1.0, 0.0];
    let auto = scalar_loss(
        &MeanAbsoluteError::new(),
        (&labels, &[2, 2]),
        (&predictions, &[2, 2]),
        None,
    );
    assert!(approx_eq(auto, 0.5, 1e-9));
}

#[test]
fn mean_absolute_percentage_error_values() {
    let value = scalar_loss(
        &MeanAbsolutePercentageError::new(),
        (&[2.0, 1.0, 2.0, 3.0], &[2, 2]),
        (&[4.0, 7.0, 8.0, 1.0], &[2, 2]),
        None,
    );
    // per-example [350, 183.33]
    assert!(approx_eq(value, 266.6667, 1e-3), "got {}", value);
}

#[test]
fn mean_squared_logarithmic_error_values() {
    let value = scalar_loss(
        &MeanSquaredLogarithmicError::new(),
        (&LABELS, &[2, 2]),
        (&PREDICTIONS, &[2, 2]),
        None,
    );
    assert!(approx_eq(value, 0.12011, 1e-4), "got {}", value);
}

#[test]
fn huber_values() {
    let labels = [0.0, 1.0, 0.0, 0.0];
    let predictions = [0.6, 0.4, 0.4, 0.6];
    let auto = scalar_loss(
        &Huber::new(),
        (&labels, &[2, 2]),
        (&predictions, &[2, 2]),
        None,
    );
    assert!(approx_eq(auto, 0.155, 1e-6), "got {}", auto);

    // errors beyond delta are penalized linearly
    let outlier = scalar_loss(&Huber::new(), (&[0.0], &[1]), (&[10.0], &[1]), None);
    assert!(approx_eq(outlier, 0.5 + 1.0 * (10.0 - 1.0), 1e-9), "got {}", outlier);
}

#[test]
fn huber_rejects_non_positive_delta() {
    let mut graph = GraphEngine::<f64>::new();
    let l = variable(&mut graph, &[0.0], &[1]);
    let p = variable(&mut graph, &[1.0], &[1]);
    let loss = Huber::with_delta(0.0, Reduction::Auto);
    let err = loss.forward(&mut graph, l, p, None).unwrap_err();
    assert!(matches!(err, LossGraphError::InvalidArgument(_)));
}

#[test]
fn hinge_values() {
    let labels = [0.0, 1.0, 0.0, 0.0];
    let predictions = [0.6, 0.4, 0.4, 0.6];
    let value = scalar_loss(
        &Hinge::new(),
        (&labels, &[2, 2]),
        (&predictions, &[2, 2]),
        None,
    );
    assert!(approx_eq(value, 1.3, 1e-6), "got {}", value);

    // equivalent signed labels produce the same loss
    let signed = [-1.0, 1.0, -1.0, -1.0];
    let same = scalar_loss(
        &Hinge::new(),
        (&signed, &[2, 2]),
        (&predictions, &[2, 2]),
        None,
    );
    assert!(approx_eq(same, 1.3, 1e-6), "got {}", same);
}

#[test]
fn squared_hinge_values() {
    let labels = [0.0, 1.0, 0.0, 0.0];
    let predictions = [0.6, 0.4, 0.4, 0.6];
    let value = scalar_loss(
        &SquaredHinge::new(),
        (&labels, &[2, 2]),
        (&predictions, &[2, 2]),
        None,
    );
    assert!(approx_eq(value, 1.86, 1e-6), "got {}", value);
}

#[test]
fn categorical_hinge_values() {
    let labels = [0.0, 1.0, 0.0, 0.0];
    let predictions = [0.6, 0.4, 0.4, 0.6];
    let value = scalar_loss(
        &CategoricalHinge::new(),
        (&labels, &[2, 2]),
        (&predictions, &[2, 2]),
        None,
    );
    assert!(approx_eq(value, 1.4, 1e-6), "got {}", value);
}

#[test]
fn poisson_values() {
    let value = scalar_loss(
        &Poisson::new(),
        (&LABELS, &[2, 2]),
        (&PREDICTIONS, &[2, 2]),
        None,
    );
    assert!(approx_eq(value, 0.5, 1e-5), "got {}", value);
}

#[test]
fn kl_divergence_values() {
    let labels = [0.0, 1.0, 0.0, 0.0];
    let predictions = [0.6, 0.4, 0.4, 0.6];
    let value = scalar_loss(
        &KLDivergence::new(),
        (&labels, &[2, 2]),
        (&predictions, &[2, 2]),
        None,
    );
    assert!(approx_eq(value, 0.458, 1e-3), "got {}", value);
}

#[test]
fn cosine_similarity_values() {
    let labels = [0.0, 1.0, 1.0, 1.0];
    let predictions = [1.0, 0.0, 1.0, 1.0];
    let value = scalar_loss(
        &CosineSimilarity::new(),
        (&labels, &[2, 2]),
        (&predictions, &[2, 2]),
        None,
    );
    assert!(approx_eq(value, -0.5, 1e-9), "got {}", value);
}

#[test]
fn binary_crossentropy_probabilities() {
    let labels = [0.0, 1.0, 0.0, 0.0];
    let predictions = [0.6, 0.4, 0.4, 0.6];
    let value = scalar_loss(
        &BinaryCrossentropy::new(),
        (&labels, &[2, 2]),
        (&predictions, &[2, 2]),
        None,
    );
    assert!(approx_eq(value, 0.81492, 1e-4), "got {}", value);
}

#[test]
fn binary_crossentropy_from_logits() {
    let labels = [0.0, 1.0, 0.0, 0.0];
    let logits = [2.0, 1.0, -1.0, -2.0];
    let loss = BinaryCrossentropy::with_options(true, 0.0, Reduction::Auto);
    let value = scalar_loss(&loss, (&labels, &[2, 2]), (&logits, &[2, 2]), None);
    assert!(approx_eq(value, 0.720095, 1e-5), "got {}", value);

    // stable for logits far outside the sigmoid's useful range
    let extreme = scalar_loss(&loss, (&[1.0], &[1]), (&[-1000.0], &[1]), None);
    assert!(extreme.is_finite());
    assert!(approx_eq(extreme, 1000.0, 1e-6), "got {}", extreme);
}

#[test]
fn binary_crossentropy_label_smoothing() {
    let loss = BinaryCrossentropy::with_options(false, 0.2, Reduction::Auto);
    let value = scalar_loss(&loss, (&[1.0], &[1]), (&[0.8], &[1]), None);
    // smoothed label 0.9: -(0.9 ln 0.8 + 0.1 ln 0.2)
    assert!(approx_eq(value, 0.361773, 1e-5), "got {}", value);
}

#[test]
fn label_smoothing_outside_unit_interval_is_rejected() {
    let mut graph = GraphEngine::<f64>::new();
    let l = variable(&mut graph, &[1.0], &[1]);
    let p = variable(&mut graph, &[0.5], &[1]);
    let loss = BinaryCrossentropy::with_options(false, 1.5, Reduction::Auto);
    let err = loss.forward(&mut graph, l, p, None).unwrap_err();
    assert!(matches!(err, LossGraphError::InvalidArgument(_)));
}

#[test]
fn categorical_crossentropy_probabilities() {
    let labels = [1.0, 0.0, 0.0, 0.0, 0.0, 1.0];
    let predictions = [0.9, 0.05, 0.05, 0.5, 0.89, 0.6];
    let value = scalar_loss(
        &CategoricalCrossentropy::new(),
        (&labels, &[2, 3]),
        (&predictions, &[2, 3]),
        None,
    );
    assert!(approx_eq(value, 0.652154, 1e-4), "got {}", value);
}

#[test]
fn categorical_crossentropy_from_logits() {
    let labels = [1.0, 0.0, 0.0, 0.0, 0.0, 1.0];
    let logits = [2.0, 1.0, 0.1, 0.5, 1.5, 2.5];
    let loss = CategoricalCrossentropy::with_options(true, 0.0, Reduction::Auto);
    let value = scalar_loss(&loss, (&labels, &[2, 3]), (&logits, &[2, 3]), None);
    assert!(approx_eq(value, 0.41239, 1e-4), "got {}", value);
}

#[test]
fn reduction_parses_known_names_only() {
    assert_eq!(Reduction::from_str("auto").unwrap(), Reduction::Auto);
    assert_eq!(Reduction::from_str("NONE").unwrap(), Reduction::None);
    assert_eq!(Reduction::from_str("Sum").unwrap(), Reduction::Sum);
    assert_eq!(
        Reduction::from_str("sum_over_batch_size").unwrap(),
        Reduction::SumOverBatchSize
    );

    let err = Reduction::from_str("median").unwrap_err();
    assert_eq!(
        err,
        LossGraphError::UnsupportedReduction("median".to_string())
    );
}

#[test]
fn unrecognized_reduction_fails_before_any_graph_is_built() {
    // a loss configured from text fails at parse time, with no engine
    let parsed: Result<Reduction, _> = "sum_over_batchsize".parse();
    assert!(parsed.is_err());
}

#[test]
fn auto_resolves_to_sum_over_batch_size() {
    assert_eq!(Reduction::Auto.resolved(), Reduction::SumOverBatchSize);
    assert_eq!(Reduction::Sum.resolved(), Reduction::Sum);
    let auto = scalar_loss(
        &LogCosh::with_reduction(Reduction::SumOverBatchSize),
        (&LABELS, &[2, 2]),
        (&PREDICTIONS, &[2, 2]),
        None,
    );
    assert!(approx_eq(auto, 0.108, 1e-3));
}

#[test]
fn none_reduction_preserves_element_count() {
    let mut graph = GraphEngine::new();
    let labels = graph.create_variable(Tensor::<f64>::randn(&[5, 3]));
    let predictions = graph.create_variable(Tensor::<f64>::randn(&[5, 3]));
    let loss = MeanSquaredError::with_reduction(Reduction::None);
    let result = loss.forward(&mut graph, labels, predictions, None).unwrap();
    assert_eq!(graph.shape(result).unwrap(), &[5]);
}

#[test]
fn sum_reduction_matches_summed_per_example_losses() {
    let mut graph = GraphEngine::new();
    let l = variable(&mut graph, &LABELS, &[2, 2]);
    let p = variable(&mut graph, &PREDICTIONS, &[2, 2]);

    let none = LogCosh::with_reduction(Reduction::None)
        .forward(&mut graph, l, p, None)
        .unwrap();
    let per_example = graph.evaluate(none).unwrap().to_vec();
    let manual: f64 = per_example.iter().sum();

    let sum = scalar_loss(
        &LogCosh::with_reduction(Reduction::Sum),
        (&LABELS, &[2, 2]),
        (&PREDICTIONS, &[2, 2]),
        None,
    );
    assert!(approx_eq(sum, manual, 1e-12));
}

#[test]
fn incompatible_labels_and_predictions_fail_at_construction() {
    let mut graph = GraphEngine::<f64>::new();
    let l = variable(&mut graph, &[0.0; 6], &[2, 3]);
    let p = variable(&mut graph, &[0.0; 4], &[4]);
    let err = LogCosh::new().forward(&mut graph, l, p, None).unwrap_err();
    assert!(matches!(err, LossGraphError::BroadcastError { .. }));
    // nothing was evaluated: the failure is a build-time rejection
    assert_eq!(graph.num_evaluated_nodes(), 2);
}

#[test]
fn incompatible_weights_fail_at_construction() {
    let mut graph = GraphEngine::<f64>::new();
    let l = variable(&mut graph, &LABELS, &[2, 2]);
    let p = variable(&mut graph, &PREDICTIONS, &[2, 2]);
    let w = variable(&mut graph, &[1.0, 1.0, 1.0], &[3]);
    let err = LogCosh::new().forward(&mut graph, l, p, Some(w)).unwrap_err();
    assert!(matches!(err, LossGraphError::ShapeMismatch { .. }));
}

#[test]
fn weights_may_not_expand_the_loss_shape() {
    let mut graph = GraphEngine::<f64>::new();
    let l = variable(&mut graph, &LABELS, &[2, 2]);
    let p = variable(&mut graph, &PREDICTIONS, &[2, 2]);
    // broadcastable against [2], but would expand it to [2, 2]
    let w = variable(&mut graph, &[1.0; 4], &[2, 2]);
    let err = LogCosh::new().forward(&mut graph, l, p, Some(w)).unwrap_err();
    assert!(matches!(err, LossGraphError::ShapeMismatch { .. }));
}

#[test]
fn loss_names_default_to_the_type_name() {
    assert_eq!(LogCosh::new().name(), "LogCosh");
    assert_eq!(MeanSquaredError::new().name(), "MeanSquaredError");
    assert_eq!(Huber::new().name(), "Huber");
    assert_eq!(
        LogCosh::named("training_loss", Reduction::Sum).name(),
        "training_loss"
    );
}

#[test]
fn forward_returns_a_deferred_handle() {
    let mut graph = GraphEngine::new();
    let l = variable(&mut graph, &LABELS, &[2, 2]);
    let p = variable(&mut graph, &PREDICTIONS, &[2, 2]);
    let result = LogCosh::new().forward(&mut graph, l, p, None).unwrap();

    assert!(!graph.is_evaluated(result));
    assert_eq!(graph.shape(result).unwrap(), &[] as &[usize]);
}
