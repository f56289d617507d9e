use std::collections::VecDeque;

use crate::{
    NetworkError, Result,
    core::{Harness, Node, NodeId, NodeKind, Token, node::Evaluation},
};

/// Returns the output of `id` for the run identified by `token`.
///
/// Every node caches its output together with the token it was computed for, so a node shared
/// by several paths is evaluated once per run. [`Token::Bypass`] returns the cached output
/// without evaluating anything.
pub fn process(nodes: &mut [Node], harness: &Harness, id: NodeId, token: Token) -> Result<f64> {
    let generation = match token {
        Token::Bypass => return Ok(settled(nodes, id)),
        Token::Run(generation) => generation,
    };
    let node = &mut nodes[id.0];
    match node.evaluation {
        Evaluation::Done(g) if g == generation => return Ok(node.a),
        Evaluation::InProgress(g) if g == generation => {
            return Err(NetworkError::TopologyInvariant { node: node.label() });
        }
        _ => (),
    }
    let z = match node.kind {
        NodeKind::Bias { value } => {
            node.a = value;
            node.evaluation = Evaluation::Done(generation);
            return Ok(value);
        }
        NodeKind::Input => harness.input_value(id, nodes)?,
        NodeKind::Hidden | NodeKind::Output => {
            node.evaluation = Evaluation::InProgress(generation);
            let mut z = 0.0f64;
            for slot in 0..nodes[id.0].inputs.len() {
                let parent = nodes[id.0].inputs[slot];
                let x = process(nodes, harness, parent, token)?;
                z += nodes[id.0].weights[slot] * x;
            }
            z
        }
    };
    let node = &mut nodes[id.0];
    node.z = z;
    node.a = node.phi.apply(z);
    node.evaluation = Evaluation::Done(generation);
    Ok(node.a)
}

/// Output of `id` as left by the last completed evaluation.
pub fn settled(nodes: &[Node], id: NodeId) -> f64 {
    nodes[id.0].a
}

/// Orders all nodes so that every node comes after each of its parents.
///
/// Ties are broken by arena order, which keeps the order deterministic. Fails with
/// [`NetworkError::CyclicTopology`] naming a node on a cycle.
pub fn topological_order(nodes: &[Node], origin: &str) -> Result<Vec<NodeId>> {
    let mut n_pending_parents: Vec<usize> = nodes.iter().map(|node| node.inputs.len()).collect();
    let mut ready: VecDeque<NodeId> = n_pending_parents
        .iter()
        .enumerate()
        .filter(|&(_, &n)| n == 0)
        .map(|(i, _)| NodeId(i))
        .collect();
    let mut order = Vec::with_capacity(nodes.len());
    while let Some(id) = ready.pop_front() {
        order.push(id);
        for link in &nodes[id.0].children {
            let n = &mut n_pending_parents[link.node.0];
            *n -= 1;
            if *n == 0 {
                ready.push_back(link.node);
            }
        }
    }
    if order.len() != nodes.len() {
        let stuck = n_pending_parents
            .iter()
            .position(|&n| n != 0)
            .map_or_else(String::new, |i| nodes[i].label());
        return Err(NetworkError::CyclicTopology {
            origin: origin.to_owned(),
            node: stuck,
        });
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use faer::prelude::*;

    use super::*;
    use crate::{
        ActivationFunction, DynActivationFunction,
        activation_functions::Identity,
        core::{NodeIndex, register_parent},
    };

    thread_local! {
        static COUNTED_CALLS: Cell<usize> = const { Cell::new(0) };
    }

    struct Counted;
    impl ActivationFunction for Counted {
        const NAME: &'static str = "counted";
        const DERIV: Option<fn(f64) -> f64> = None;

        fn apply(x: f64) -> f64 {
            COUNTED_CALLS.set(COUNTED_CALLS.get() + 1);
            x
        }
    }

    /// input -> shared -> {left, right} -> output
    fn diamond() -> (Vec<Node>, Harness) {
        let identity = DynActivationFunction::new(Identity);
        let counted = DynActivationFunction::new(Counted);
        let mut nodes = vec![
            Node::new(NodeKind::Input, Some(NodeIndex::new(0, 0)), identity),
            Node::new(NodeKind::Hidden, Some(NodeIndex::new(1, 0)), counted),
            Node::new(NodeKind::Hidden, Some(NodeIndex::new(2, 0)), identity),
            Node::new(NodeKind::Hidden, Some(NodeIndex::new(2, 1)), identity),
            Node::new(NodeKind::Output, Some(NodeIndex::new(3, 0)), identity),
        ];
        register_parent(&mut nodes, NodeId(1), NodeId(0), 2.0);
        register_parent(&mut nodes, NodeId(2), NodeId(1), 1.0);
        register_parent(&mut nodes, NodeId(3), NodeId(1), -1.0);
        register_parent(&mut nodes, NodeId(4), NodeId(2), 3.0);
        register_parent(&mut nodes, NodeId(4), NodeId(3), 0.5);
        let mut harness = Harness::new();
        harness.register_input_node(NodeId(0));
        harness.register_output_node(NodeId(4));
        (nodes, harness)
    }

    #[test]
    fn shared_ancestor_is_evaluated_once_per_run() {
        let (mut nodes, mut harness) = diamond();
        let before = COUNTED_CALLS.get();
        let outputs = harness.run(&mut nodes, ColRef::from_slice(&[1.0])).unwrap();
        // shared = 2, left = 2, right = -2, output = 6 - 1
        assert_eq!(outputs[0], 5.0);
        assert_eq!(COUNTED_CALLS.get() - before, 1);
    }

    #[test]
    fn same_token_returns_cached_value() {
        let (mut nodes, mut harness) = diamond();
        harness.run(&mut nodes, ColRef::from_slice(&[1.0])).unwrap();
        let token = harness.last_token().unwrap();
        nodes[4].weights[0] = 100.0;
        assert_eq!(process(&mut nodes, &harness, NodeId(4), token).unwrap(), 5.0);
        assert_eq!(process(&mut nodes, &harness, NodeId(4), Token::Bypass).unwrap(), 5.0);
        let outputs = harness.run(&mut nodes, ColRef::from_slice(&[1.0])).unwrap();
        assert_eq!(outputs[0], 199.0);
    }

    #[test]
    fn bias_ignores_token() {
        let phi = DynActivationFunction::new(Identity);
        let mut nodes = vec![Node::new(NodeKind::Bias { value: 1.0 }, None, phi)];
        let harness = Harness::new();
        assert_eq!(process(&mut nodes, &harness, NodeId(0), Token::Run(7)).unwrap(), 1.0);
        assert_eq!(process(&mut nodes, &harness, NodeId(0), Token::Bypass).unwrap(), 1.0);
    }

    #[test]
    fn evaluation_cycle_is_an_invariant_violation() {
        let phi = DynActivationFunction::new(Identity);
        let mut nodes = vec![
            Node::new(NodeKind::Hidden, Some(NodeIndex::new(1, 0)), phi),
            Node::new(NodeKind::Output, Some(NodeIndex::new(2, 0)), phi),
        ];
        register_parent(&mut nodes, NodeId(0), NodeId(1), 1.0);
        register_parent(&mut nodes, NodeId(1), NodeId(0), 1.0);
        let harness = Harness::new();
        let err = process(&mut nodes, &harness, NodeId(1), Token::Run(1)).unwrap_err();
        assert!(matches!(err, NetworkError::TopologyInvariant { .. }));
    }

    #[test]
    fn topological_order_respects_parents() {
        let (nodes, _) = diamond();
        let order = topological_order(&nodes, "diamond").unwrap();
        let position = |id: NodeId| order.iter().position(|&o| o == id).unwrap();
        for (i, node) in nodes.iter().enumerate() {
            for &parent in node.inputs() {
                assert!(position(parent) < position(NodeId(i)));
            }
        }
        assert_eq!(order.len(), nodes.len());
    }

    #[test]
    fn topological_order_rejects_cycles() {
        let phi = DynActivationFunction::new(Identity);
        let mut nodes = vec![
            Node::new(NodeKind::Input, Some(NodeIndex::new(0, 0)), phi),
            Node::new(NodeKind::Hidden, Some(NodeIndex::new(1, 0)), phi),
            Node::new(NodeKind::Hidden, Some(NodeIndex::new(1, 1)), phi),
        ];
        register_parent(&mut nodes, NodeId(1), NodeId(0), 0.0);
        register_parent(&mut nodes, NodeId(1), NodeId(2), 0.0);
        register_parent(&mut nodes, NodeId(2), NodeId(1), 0.0);
        match topological_order(&nodes, "loop.network").unwrap_err() {
            NetworkError::CyclicTopology { origin, node } => {
                assert_eq!(origin, "loop.network");
                assert_eq!(node, "1.1");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
