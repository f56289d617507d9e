use std::iter;

use faer::prelude::*;

use crate::{
    NetworkError, Result,
    core::{Node, NodeId, NodeKind, settled},
};

/// Per-node error terms of one back-propagation step. `None` means "not resolved".
#[derive(Debug, Clone)]
pub struct ErrorBuffer {
    errors: Vec<Option<f64>>,
}

impl ErrorBuffer {
    pub fn create(n_nodes: usize) -> Self {
        Self {
            errors: vec![None; n_nodes],
        }
    }

    pub fn clear(&mut self) {
        self.errors.fill(None);
    }

    pub fn get(&self, id: NodeId) -> Option<f64> {
        self.errors.get(id.0).copied().flatten()
    }

    pub fn n_resolved(&self) -> usize {
        self.errors.iter().filter(|e| e.is_some()).count()
    }
}

/// Sets each output node's error to `predicted - desired`.
///
/// Returns the squared error over all outputs.
pub fn output_errors(
    nodes: &[Node],
    outputs: &[NodeId],
    desired: ColRef<f64>,
    errors: &mut ErrorBuffer,
) -> f64 {
    debug_assert_eq!(outputs.len(), desired.nrows());
    let mut squared_error = 0.0f64;
    for (k, &id) in outputs.iter().enumerate() {
        let e = nodes[id.0].a - desired[k];
        errors.errors[id.0] = Some(e);
        squared_error += e * e;
    }
    squared_error
}

/// Resolves the error of every hidden node from the errors of its children.
///
/// `order` must be a topological order of `nodes`. Walking it backwards guarantees that all
/// children of a node are resolved before the node itself.
pub fn hidden_errors(nodes: &[Node], order: &[NodeId], errors: &mut ErrorBuffer) -> Result<()> {
    for &id in order.iter().rev() {
        let node = &nodes[id.0];
        if node.kind != NodeKind::Hidden {
            continue;
        }
        let Some(phi_deriv_z) = node.phi.deriv(node.z) else {
            return Err(NetworkError::NonDifferentiableActivation {
                node: node.label(),
                function: node.phi.name(),
            });
        };
        let mut downstream = 0.0f64;
        for link in &node.children {
            let Some(child_error) = errors.errors[link.node.0] else {
                return Err(NetworkError::TopologyInvariant {
                    node: nodes[link.node.0].label(),
                });
            };
            downstream += child_error * nodes[link.node.0].weights[link.slot];
        }
        errors.errors[id.0] = Some(phi_deriv_z * downstream);
    }
    Ok(())
}

/// `w <- w - eta * a_parent * error` for every node with a resolved error.
///
/// Parent outputs are the settled values of the forward pass that produced the errors.
pub fn apply_errors(nodes: &mut [Node], errors: &ErrorBuffer, eta: f64) {
    for i in 0..nodes.len() {
        let Some(error) = errors.errors[i] else {
            continue;
        };
        for slot in 0..nodes[i].inputs.len() {
            let a_parent = settled(nodes, nodes[i].inputs[slot]);
            nodes[i].weights[slot] -= eta * a_parent * error;
        }
    }
}

/// Perceptron delta rule: `w_i <- w_i + delta * x_i`.
///
/// A constant `1.0` is prepended to `features` when the weights carry one extra entry for the
/// bias input.
pub fn delta_rule(weights: &mut [f64], features: &[f64], delta: f64) {
    let bias_input = (weights.len() == features.len() + 1).then_some(1.0);
    let inputs = bias_input.into_iter().chain(features.iter().copied());
    for (w, x) in iter::zip(weights, inputs) {
        *w += delta * x;
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::{
        DynActivationFunction,
        activation_functions::{Identity, Sigmoid, Step},
        core::{Harness, NodeIndex, register_parent},
    };

    /// input(0) -> hidden(1) -> output(3), input(0) -> output(3), hidden(1) -> hidden(2) -> output(3)
    fn skip_graph(hidden_phi: DynActivationFunction) -> (Vec<Node>, Harness, Vec<NodeId>) {
        let identity = DynActivationFunction::new(Identity);
        let mut nodes = vec![
            Node::new(NodeKind::Input, Some(NodeIndex::new(0, 0)), identity),
            Node::new(NodeKind::Hidden, Some(NodeIndex::new(1, 0)), hidden_phi),
            Node::new(NodeKind::Hidden, Some(NodeIndex::new(2, 0)), hidden_phi),
            Node::new(NodeKind::Output, Some(NodeIndex::new(3, 0)), identity),
        ];
        register_parent(&mut nodes, NodeId(1), NodeId(0), 0.5);
        register_parent(&mut nodes, NodeId(2), NodeId(1), -1.0);
        register_parent(&mut nodes, NodeId(3), NodeId(1), 2.0);
        register_parent(&mut nodes, NodeId(3), NodeId(2), 1.5);
        register_parent(&mut nodes, NodeId(3), NodeId(0), 0.25);
        let mut harness = Harness::new();
        harness.register_input_node(NodeId(0));
        harness.register_output_node(NodeId(3));
        let order = crate::core::topological_order(&nodes, "skip").unwrap();
        (nodes, harness, order)
    }

    #[test]
    fn errors_follow_children_outside_the_next_layer() {
        let sigmoid = DynActivationFunction::new(Sigmoid);
        let (mut nodes, mut harness, order) = skip_graph(sigmoid);
        let outputs = harness.run(&mut nodes, ColRef::from_slice(&[1.0])).unwrap();
        let mut errors = ErrorBuffer::create(nodes.len());
        let squared = output_errors(&nodes, &[NodeId(3)], ColRef::from_slice(&[0.0]), &mut errors);
        assert_abs_diff_eq!(squared, outputs[0] * outputs[0]);
        hidden_errors(&nodes, &order, &mut errors).unwrap();

        let e_out = outputs[0];
        let d = |z: f64| sigmoid.deriv(z).unwrap();
        let e2 = d(nodes[2].z) * e_out * 1.5;
        let e1 = d(nodes[1].z) * (e_out * 2.0 + e2 * -1.0);
        assert_abs_diff_eq!(errors.get(NodeId(2)).unwrap(), e2, epsilon = 1e-12);
        assert_abs_diff_eq!(errors.get(NodeId(1)).unwrap(), e1, epsilon = 1e-12);
        assert!(errors.get(NodeId(0)).is_none());
        assert_eq!(errors.n_resolved(), 3);
    }

    #[test]
    fn weight_update_uses_settled_activations() {
        let sigmoid = DynActivationFunction::new(Sigmoid);
        let (mut nodes, mut harness, order) = skip_graph(sigmoid);
        harness.run(&mut nodes, ColRef::from_slice(&[1.0])).unwrap();
        let mut errors = ErrorBuffer::create(nodes.len());
        output_errors(&nodes, &[NodeId(3)], ColRef::from_slice(&[1.0]), &mut errors);
        hidden_errors(&nodes, &order, &mut errors).unwrap();

        let before = nodes[3].weights.clone();
        let a1 = nodes[1].a;
        let e3 = errors.get(NodeId(3)).unwrap();
        apply_errors(&mut nodes, &errors, 0.1);
        assert_abs_diff_eq!(nodes[3].weights[0], before[0] - 0.1 * a1 * e3, epsilon = 1e-12);
        assert_abs_diff_eq!(nodes[3].weights[2], before[2] - 0.1 * 1.0 * e3, epsilon = 1e-12);
        // Activations are not recomputed by the update.
        assert_eq!(nodes[1].a, a1);
    }

    #[test]
    fn non_differentiable_hidden_node_is_rejected() {
        let step = DynActivationFunction::new(Step);
        let (mut nodes, mut harness, order) = skip_graph(step);
        harness.run(&mut nodes, ColRef::from_slice(&[1.0])).unwrap();
        let mut errors = ErrorBuffer::create(nodes.len());
        output_errors(&nodes, &[NodeId(3)], ColRef::from_slice(&[0.0]), &mut errors);
        match hidden_errors(&nodes, &order, &mut errors).unwrap_err() {
            NetworkError::NonDifferentiableActivation { node, function } => {
                assert_eq!(node, "2.1");
                assert_eq!(function, "step");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn delta_rule_aligns_bias_input() {
        let mut weights = [0.0, 0.0, 0.0];
        delta_rule(&mut weights, &[2.0, -1.0], 0.5);
        assert_eq!(weights, [0.5, 1.0, -0.5]);

        let mut weights = [1.0, 1.0];
        delta_rule(&mut weights, &[2.0, -1.0], -1.0);
        assert_eq!(weights, [-1.0, 2.0]);
    }
}
