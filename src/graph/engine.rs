use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::trace;

use crate::backend::{GraphFloat, Tensor};
use crate::error::LossGraphError;
use crate::ops::Operator;

/// Atomic auto-incrementing id for all nodes.
static NODE_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Opaque handle to a node owned by a [`GraphEngine`]. This is the
/// "deferred result" the public API hands out: holding a `NodeId` does
/// not imply the value has been computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

impl NodeId {
    pub fn new() -> Self {
        let id = NODE_COUNTER.fetch_add(1, Ordering::SeqCst);
        Self(id)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

/// When operations actually run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationMode {
    /// Record operations and run them on demand. The default: a loss
    /// invocation returns an unexecuted handle.
    Lazy,
    /// Run each operation as soon as it is applied.
    Eager,
}

#[derive(Debug)]
pub enum NodeState<T>
where
    T: GraphFloat,
{
    /// Input node with a materialized tensor.
    Leaf(Tensor<T>),

    /// Recorded but not evaluated yet.
    Pending {
        op: Box<dyn Operator<T>>,
        inputs: Vec<NodeId>,
    },

    /// Evaluated and cached.
    Evaluated {
        tensor: Tensor<T>,
        op: Option<Box<dyn Operator<T>>>,
        inputs: Vec<NodeId>,
    },
}

/// A node in the computation graph. The shape is known at construction
/// time for every state, so shape validation never waits for data.
#[derive(Debug)]
pub struct Node<T>
where
    T: GraphFloat,
{
    pub id: NodeId,
    pub shape: Vec<usize>,
    pub state: NodeState<T>,
}

impl<T> Node<T>
where
    T: GraphFloat,
{
    pub fn new_leaf(tensor: Tensor<T>) -> Self {
        Self {
            id: NodeId::new(),
            shape: tensor.shape().to_vec(),
            state: NodeState::Leaf(tensor),
        }
    }

    pub fn new_pending(op: Box<dyn Operator<T>>, inputs: Vec<NodeId>, shape: Vec<usize>) -> Self {
        Self {
            id: NodeId::new(),
            shape,
            state: NodeState::Pending { op, inputs },
        }
    }

    pub fn new_evaluated(
        tensor: Tensor<T>,
        op: Option<Box<dyn Operator<T>>>,
        inputs: Vec<NodeId>,
    ) -> Self {
        Self {
            id: NodeId::new(),
            shape: tensor.shape().to_vec(),
            state: NodeState::Evaluated { tensor, op, inputs },
        }
    }

    pub fn get_tensor(&self) -> Option<&Tensor<T>> {
        match &self.state {
            NodeState::Leaf(tensor) => Some(tensor),
            NodeState::Evaluated { tensor, .. } => Some(tensor),
            NodeState::Pending { .. } => None,
        }
    }

    pub fn is_evaluated(&self) -> bool {
        !matches!(self.state, NodeState::Pending { .. })
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.state, NodeState::Leaf(_))
    }
}

/// The computation graph engine: owns every node, applies operators,
/// and materializes results on demand.
#[derive(Debug)]
pub struct GraphEngine<T>
where
    T: GraphFloat,
{
    nodes: HashMap<NodeId, Node<T>>,
    evaluation_mode: EvaluationMode,
}

impl<T> Default for GraphEngine<T>
where
    T: GraphFloat,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> GraphEngine<T>
where
    T: GraphFloat,
{
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            evaluation_mode: EvaluationMode::Lazy,
        }
    }

    pub fn set_evaluation_mode(&mut self, mode: EvaluationMode) {
        self.evaluation_mode = mode;
    }

    pub fn evaluation_mode(&self) -> EvaluationMode {
        self.evaluation_mode
    }

    pub fn lazy_mode(&mut self) {
        self.evaluation_mode = EvaluationMode::Lazy;
    }

    pub fn eager_mode(&mut self) {
        self.evaluation_mode = EvaluationMode::Eager;
    }

    /// Creates a leaf node from a materialized tensor.
    pub fn create_variable(&mut self, tensor: Tensor<T>) -> NodeId {
        let node = Node::new_leaf(tensor);
        let id = node.id;
        self.nodes.insert(id, node);
        id
    }

    pub fn get_node(&self, node_id: NodeId) -> Option<&Node<T>> {
        self.nodes.get(&node_id)
    }

    pub fn get_tensor(&self, node_id: NodeId) -> Option<&Tensor<T>> {
        self.nodes.get(&node_id)?.get_tensor()
    }

    /// Shape of a node, known whether or not it has been evaluated.
    pub fn shape(&self, node_id: NodeId) -> Result<&[usize], LossGraphError> {
        self.nodes
            .get(&node_id)
            .map(|node| node.shape.as_slice())
            .ok_or(LossGraphError::NodeNotFound(node_id.0))
    }

    pub fn is_evaluated(&self, node_id: NodeId) -> bool {
        self.nodes
            .get(&node_id)
            .is_some_and(|node| node.is_evaluated())
    }

    fn validate_inputs(
        &self,
        op: &dyn Operator<T>,
        input_ids: &[NodeId],
    ) -> Result<(), LossGraphError> {
        for &input_id in input_ids {
            if !self.nodes.contains_key(&input_id) {
                return Err(LossGraphError::NodeNotFound(input_id.0));
            }
        }
        if input_ids.len() != op.num_inputs() {
            return Err(LossGraphError::InvalidInputCount {
                operation: op.name(),
                expected: op.num_inputs(),
                actual: input_ids.len(),
            });
        }
        Ok(())
    }

    /// Applies an operator, returning the handle of the result node.
    ///
    /// Input arity and shape compatibility are validated here in both
    /// evaluation modes; an incompatible graph can never be recorded.
    pub fn apply_operation(
        &mut self,
        op: Box<dyn Operator<T>>,
        input_ids: Vec<NodeId>,
    ) -> Result<NodeId, LossGraphError> {
        self.validate_inputs(op.as_ref(), &input_ids)?;

        let input_shapes: Vec<&[usize]> = input_ids
            .iter()
            .map(|&id| self.nodes[&id].shape.as_slice())
            .collect();
        let shape = op.infer_shape(&input_shapes)?;

        trace!("apply {} -> shape {:?}", op.name(), shape);

        match self.evaluation_mode {
            EvaluationMode::Lazy => {
                let node = Node::new_pending(op, input_ids, shape);
                let id = node.id;
                self.nodes.insert(id, node);
                Ok(id)
            }
            EvaluationMode::Eager => {
                for &input_id in &input_ids {
                    self.evaluate_node(input_id)?;
                }
                let input_tensors = self.collect_tensors(&input_ids)?;
                let result = op.compute(&input_tensors)?;
                let node = Node::new_evaluated(result, Some(op), input_ids);
                let id = node.id;
                self.nodes.insert(id, node);
                Ok(id)
            }
        }
    }

    /// Materializes a node, recursively evaluating pending inputs, and
    /// returns the cached tensor.
    pub fn evaluate(&mut self, node_id: NodeId) -> Result<&Tensor<T>, LossGraphError> {
        self.evaluate_node(node_id)?;
        self.get_tensor(node_id)
            .ok_or(LossGraphError::NodeNotFound(node_id.0))
    }

    fn evaluate_node(&mut self, node_id: NodeId) -> Result<(), LossGraphError> {
        if self.is_evaluated(node_id) {
            return Ok(());
        }

        let (op, input_ids) = {
            let node = self
                .nodes
                .get(&node_id)
                .ok_or(LossGraphError::NodeNotFound(node_id.0))?;
            match &node.state {
                NodeState::Pending { op, inputs } => (op.clone_op(), inputs.clone()),
                _ => return Ok(()),
            }
        };

        for &input_id in &input_ids {
            self.evaluate_node(input_id)?;
        }

        let input_tensors = self.collect_tensors(&input_ids)?;
        let result = op.compute(&input_tensors)?;
        trace!("evaluated {} as {}", op.name(), node_id);

        if let Some(node) = self.nodes.get_mut(&node_id) {
            node.state = NodeState::Evaluated {
                tensor: result,
                op: Some(op),
                inputs: input_ids,
            };
        }

        Ok(())
    }

    fn collect_tensors(&self, input_ids: &[NodeId]) -> Result<Vec<&Tensor<T>>, LossGraphError> {
        input_ids
            .iter()
            .map(|&input_id| {
                self.get_tensor(input_id)
                    .ok_or(LossGraphError::NodeNotFound(input_id.0))
            })
            .collect()
    }

    // Graph statistics.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_evaluated_nodes(&self) -> usize {
        self.nodes.values().filter(|node| node.is_evaluated()).count()
    }

    pub fn num_pending_nodes(&self) -> usize {
        self.nodes.values().filter(|node| !node.is_evaluated()).count()
    }
}
