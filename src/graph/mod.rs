pub mod engine;


pub use engine::{EvaluationMode, GraphEngine, Node, NodeId, NodeState};
