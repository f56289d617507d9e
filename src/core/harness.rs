use std::collections::HashMap;

use faer::prelude::*;

use crate::{
    NetworkError, Result,
    core::{Node, NodeId, Token, process},
};

/// Feeds samples to the input nodes and collects the output nodes' values.
#[derive(Debug, Clone)]
pub struct Harness {
    inputs: Col<f64>,
    input_slots: HashMap<NodeId, usize>,
    outputs: Vec<NodeId>,
    generation: u64,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    pub fn new() -> Self {
        Self {
            inputs: Col::zeros(0),
            input_slots: HashMap::new(),
            outputs: Vec::new(),
            generation: 0,
        }
    }

    pub fn register_input_node(&mut self, node: NodeId) {
        let slot = self.input_slots.len();
        self.input_slots.insert(node, slot);
        self.inputs = Col::zeros(slot + 1);
    }

    pub fn register_output_node(&mut self, node: NodeId) {
        self.outputs.push(node);
    }

    pub fn n_inputs(&self) -> usize {
        self.input_slots.len()
    }

    pub fn outputs(&self) -> &[NodeId] {
        &self.outputs
    }

    /// Latest input vector.
    pub fn inputs(&self) -> ColRef<'_, f64> {
        self.inputs.as_ref()
    }

    /// Token of the most recent run, `None` before the first one.
    pub fn last_token(&self) -> Option<Token> {
        (self.generation != 0).then_some(Token::Run(self.generation))
    }

    pub fn input_value(&self, node: NodeId, nodes: &[Node]) -> Result<f64> {
        let Some(&slot) = self.input_slots.get(&node) else {
            let name = nodes.get(node.0).map_or_else(|| node.to_string(), Node::label);
            return Err(NetworkError::UnregisteredInputNode { node: name });
        };
        Ok(self.inputs[slot])
    }

    /// Loads `sample` into the inputs and evaluates every output node with a fresh token.
    pub fn run(&mut self, nodes: &mut [Node], sample: ColRef<f64>) -> Result<Col<f64>> {
        if sample.nrows() != self.n_inputs() {
            return Err(NetworkError::ShapeMismatch {
                expected: self.n_inputs(),
                actual: sample.nrows(),
            });
        }
        self.inputs = Col::from_fn(sample.nrows(), |i| sample[i]);
        self.generation += 1;
        let token = Token::Run(self.generation);
        let mut outputs = Col::zeros(self.outputs.len());
        for (k, &node) in self.outputs.iter().enumerate() {
            outputs[k] = process(nodes, &*self, node, token)?;
        }
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        DynActivationFunction,
        activation_functions::Identity,
        core::{NodeIndex, NodeKind, register_parent},
    };

    fn summing_graph() -> (Vec<Node>, Harness) {
        let phi = DynActivationFunction::new(Identity);
        let mut nodes = vec![
            Node::new(NodeKind::Input, Some(NodeIndex::new(0, 0)), phi),
            Node::new(NodeKind::Input, Some(NodeIndex::new(0, 1)), phi),
            Node::new(NodeKind::Output, Some(NodeIndex::new(1, 0)), phi),
        ];
        register_parent(&mut nodes, NodeId(2), NodeId(0), 1.0);
        register_parent(&mut nodes, NodeId(2), NodeId(1), 2.0);
        let mut harness = Harness::new();
        harness.register_input_node(NodeId(0));
        harness.register_input_node(NodeId(1));
        harness.register_output_node(NodeId(2));
        (nodes, harness)
    }

    #[test]
    fn run_evaluates_outputs() {
        let (mut nodes, mut harness) = summing_graph();
        let outputs = harness.run(&mut nodes, ColRef::from_slice(&[3.0, 4.0])).unwrap();
        assert_eq!(outputs.nrows(), 1);
        assert_eq!(outputs[0], 11.0);
        assert_eq!(harness.last_token(), Some(Token::Run(1)));
    }

    #[test]
    fn run_rejects_wrong_shape_without_mutation() {
        let (mut nodes, mut harness) = summing_graph();
        harness.run(&mut nodes, ColRef::from_slice(&[1.0, 1.0])).unwrap();
        let err = harness
            .run(&mut nodes, ColRef::from_slice(&[1.0, 2.0, 3.0]))
            .unwrap_err();
        assert!(matches!(
            err,
            NetworkError::ShapeMismatch {
                expected: 2,
                actual: 3
            }
        ));
        assert_eq!(harness.inputs()[0], 1.0);
        assert_eq!(harness.inputs()[1], 1.0);
        assert_eq!(harness.last_token(), Some(Token::Run(1)));
        assert_eq!(nodes[2].value(), 3.0);
    }

    #[test]
    fn unregistered_input_node_is_reported() {
        let (nodes, harness) = summing_graph();
        let err = harness.input_value(NodeId(2), &nodes).unwrap_err();
        match err {
            NetworkError::UnregisteredInputNode { node } => assert_eq!(node, "1.1"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
