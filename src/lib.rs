//! # lossgraph
//!
//! Loss functions as deferred computations over a CPU tensor graph.
//!
//! A loss object binds a name and a [`losses::Reduction`] policy to one
//! elementwise error formula. Invoking it records operations in a
//! [`graph::GraphEngine`] and returns an opaque node handle; nothing is
//! computed until the handle is evaluated. Shape validation does not
//! wait for evaluation: incompatible labels, predictions, or sample
//! weights are rejected while the graph is being built.
//!
//! ## Features
//!
//! - Regression losses: MSE, MAE, MAPE, MSLE, log-cosh, Huber
//! - Classification losses: hinge family, Poisson, KL divergence,
//!   cosine similarity, binary/categorical cross-entropy
//! - Weighted reduction with broadcastable sample weights
//! - Numerically stable formulations (softplus-based log-cosh,
//!   logit cross-entropy, max-shifted log-softmax)
//! - Lazy or eager graph evaluation, tensors via `ndarray`
//!
//! ```
//! use lossgraph::Tensor;
//! use lossgraph::graph::GraphEngine;
//! use lossgraph::losses::{Loss, MeanSquaredError};
//!
//! let mut graph = GraphEngine::<f64>::new();
//! let labels = graph.create_variable(Tensor::from_vec(vec![1.0, 2.0, 3.0], &[3]).unwrap());
//! let predictions = graph.create_variable(Tensor::from_vec(vec![1.5, 2.0, 2.5], &[3]).unwrap());
//!
//! let mse = MeanSquaredError::new();
//! let result = mse.forward(&mut graph, labels, predictions, None).unwrap();
//! let value = graph.evaluate(result).unwrap().first().unwrap();
//! assert!((value - (0.25 + 0.0 + 0.25) / 3.0).abs() < 1e-12);
//! ```

pub mod backend;
pub mod error;
pub mod graph;
pub mod losses;
pub mod ops;

// Re-export the types almost every caller touches.
pub use backend::{GraphFloat, Tensor};
pub use error::LossGraphError;
pub use graph::{GraphEngine, NodeId};
pub use losses::{Loss, Reduction};
