use std::{collections::HashMap, path::Path};

use faer::prelude::*;
use log::debug;
use rand::{Rng, distr::uniform::SampleRange};

use crate::{
    DynActivationFunction, NetworkError, Result, Topology, TopologyDescription,
    activation_functions::{Identity, Sigmoid, Step},
    core::{
        Harness, Node, NodeId, NodeIndex, NodeKind, Token, process, register_parent,
        topological_order,
    },
};

/// Construction options shared by both construction paths.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkConfig {
    pub input_phi: DynActivationFunction,
    pub hidden_phi: DynActivationFunction,
    pub output_phi: DynActivationFunction,
    /// Whether every non-input node gets the bias node as an extra, first parent.
    pub bias: bool,
    /// Constant output of the bias node.
    pub bias_value: f64,
    /// Initial weight of every bias edge.
    pub bias_weight: f64,
    /// Labels of the output nodes, positionally. Defaults to `"0"`, `"1"`, ...
    ///
    /// Perceptrons ignore this and always use `"0"` and `"1"`.
    pub labels: Option<Vec<String>>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            input_phi: DynActivationFunction::new(Sigmoid),
            hidden_phi: DynActivationFunction::new(Sigmoid),
            output_phi: DynActivationFunction::new(Sigmoid),
            bias: false,
            bias_value: 1.0,
            bias_weight: 0.0,
            labels: None,
        }
    }
}

impl NetworkConfig {
    pub fn with_bias(mut self, bias: bool) -> Self {
        self.bias = bias;
        self
    }

    pub fn with_labels<S: Into<String>>(mut self, labels: impl IntoIterator<Item = S>) -> Self {
        self.labels = Some(labels.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_activations(
        mut self,
        input_phi: impl Into<DynActivationFunction>,
        hidden_phi: impl Into<DynActivationFunction>,
        output_phi: impl Into<DynActivationFunction>,
    ) -> Self {
        self.input_phi = input_phi.into();
        self.hidden_phi = hidden_phi.into();
        self.output_phi = output_phi.into();
        self
    }
}

/// Which prediction and training rule a network uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Softmax over the outputs, trained by back-propagation.
    Classifier,
    /// Single thresholded output, trained by the perceptron delta rule.
    Perceptron,
}

pub struct Network {
    nodes: Vec<Node>,
    harness: Harness,
    layers: Vec<Vec<NodeId>>,
    indices: HashMap<NodeIndex, NodeId>,
    bias: Option<NodeId>,
    labels: Vec<String>,
    variant: Variant,
    /// Every node after all of its parents.
    order: Vec<NodeId>,
}

impl Network {
    /// Builds a fully connected network: every node of layer `i > 0` gets one parent edge to
    /// every node of layer `i - 1`.
    pub fn fully_connected(
        n_inputs: usize,
        n_hidden: &[usize],
        n_outputs: usize,
        config: &NetworkConfig,
    ) -> Result<Self> {
        let topology = Topology::layered(n_inputs, n_hidden, n_outputs);
        let mut network = Self::with_nodes(&topology, config, "fully connected")?;
        for u in 1..network.layers.len() {
            for k in 0..network.layers[u].len() {
                let child = network.layers[u][k];
                for g in 0..network.layers[u - 1].len() {
                    let parent = network.layers[u - 1][g];
                    register_parent(&mut network.nodes, child, parent, 0.0);
                }
            }
        }
        network.order = topological_order(&network.nodes, "fully connected")?;
        debug!(
            "built fully connected network {:?}, bias: {}",
            topology.layer_sizes(),
            network.bias.is_some()
        );
        Ok(network)
    }

    /// Builds a network with the adjacency of `description`.
    ///
    /// Fails with [`NetworkError::CyclicTopology`] if the description has a dependency cycle.
    pub fn from_description(description: &TopologyDescription, config: &NetworkConfig) -> Result<Self> {
        let mut network =
            Self::with_nodes(description.topology(), config, description.origin())?;
        for (node, parents) in description.connections() {
            let child = network.indices[node];
            for parent in parents {
                let parent = network.indices[parent];
                register_parent(&mut network.nodes, child, parent, 0.0);
            }
        }
        network.order = topological_order(&network.nodes, description.origin())?;
        // Trial run; every node is reachable only through acyclic paths at this point.
        let zeros = Col::<f64>::zeros(network.n_inputs());
        network.forward(zeros.as_ref())?;
        debug!(
            "built network from {:?}, layers {:?}",
            description.origin(),
            description.topology().layer_sizes()
        );
        Ok(network)
    }

    /// Reads a `.network` description file and builds the network it describes.
    pub fn from_file(path: impl AsRef<Path>, config: &NetworkConfig) -> Result<Self> {
        let description = TopologyDescription::read(path)?;
        Self::from_description(&description, config)
    }

    /// A single-layer perceptron with a bias input: identity on the inputs, a step on its only
    /// output, labels `"0"` and `"1"`.
    pub fn perceptron(n_inputs: usize) -> Result<Self> {
        Self::perceptron_with(n_inputs, true)
    }

    pub fn perceptron_with(n_inputs: usize, bias: bool) -> Result<Self> {
        let config = NetworkConfig {
            input_phi: DynActivationFunction::new(Identity),
            output_phi: DynActivationFunction::new(Step),
            bias,
            ..NetworkConfig::default()
        };
        let mut network = Self::fully_connected(n_inputs, &[], 1, &config)?;
        network.variant = Variant::Perceptron;
        network.labels = vec!["0".to_owned(), "1".to_owned()];
        Ok(network)
    }

    /// Creates the nodes of every layer, registers inputs and outputs with the harness and
    /// connects the bias node. Leaves all other edges to the caller.
    fn with_nodes(topology: &Topology, config: &NetworkConfig, origin: &str) -> Result<Self> {
        let n_nodes = topology.validate(origin)?;
        let too_many_nodes = |_| NetworkError::malformed_topology(origin, "too many nodes");
        let mut nodes: Vec<Node> = Vec::new();
        nodes
            .try_reserve_exact(n_nodes.saturating_add(1))
            .map_err(too_many_nodes)?;
        let mut indices: HashMap<NodeIndex, NodeId> = HashMap::new();
        indices.try_reserve(n_nodes).map_err(too_many_nodes)?;
        let n_layers = topology.n_layers();
        let n_outputs = topology.n_outputs();
        let labels = match &config.labels {
            Some(labels) if labels.len() == n_outputs => labels.clone(),
            Some(labels) => {
                return Err(NetworkError::ShapeMismatch {
                    expected: n_outputs,
                    actual: labels.len(),
                });
            }
            None => (0..n_outputs).map(|k| k.to_string()).collect(),
        };
        let mut harness = Harness::new();
        let bias = config.bias.then(|| {
            nodes.push(Node::new(
                NodeKind::Bias {
                    value: config.bias_value,
                },
                None,
                DynActivationFunction::new(Identity),
            ));
            NodeId(nodes.len() - 1)
        });
        let mut layers = Vec::with_capacity(n_layers);
        for (u, &size) in topology.layer_sizes().iter().enumerate() {
            let (kind, phi) = match u {
                0 => (NodeKind::Input, config.input_phi),
                u if u + 1 == n_layers => (NodeKind::Output, config.output_phi),
                _ => (NodeKind::Hidden, config.hidden_phi),
            };
            let mut layer = Vec::with_capacity(size);
            for k in 0..size {
                let index = NodeIndex::new(u, k);
                let id = NodeId(nodes.len());
                nodes.push(Node::new(kind, Some(index), phi));
                match kind {
                    NodeKind::Input => harness.register_input_node(id),
                    NodeKind::Output => harness.register_output_node(id),
                    _ => (),
                }
                if let Some(bias) = bias.filter(|_| kind != NodeKind::Input) {
                    register_parent(&mut nodes, id, bias, config.bias_weight);
                }
                indices.insert(index, id);
                layer.push(id);
            }
            layers.push(layer);
        }
        Ok(Self {
            nodes,
            harness,
            layers,
            indices,
            bias,
            labels,
            variant: Variant::Classifier,
            order: Vec::new(),
        })
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn n_inputs(&self) -> usize {
        self.harness.n_inputs()
    }

    pub fn n_outputs(&self) -> usize {
        self.harness.outputs().len()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn harness(&self) -> &Harness {
        &self.harness
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn bias(&self) -> Option<NodeId> {
        self.bias
    }

    /// Layers, input layer first. The bias node belongs to no layer.
    pub fn layers(&self) -> &[Vec<NodeId>] {
        &self.layers
    }

    pub fn input_layer(&self) -> &[NodeId] {
        &self.layers[0]
    }

    pub fn hidden_layers(&self) -> &[Vec<NodeId>] {
        &self.layers[1..self.layers.len() - 1]
    }

    pub fn output_layer(&self) -> &[NodeId] {
        &self.layers[self.layers.len() - 1]
    }

    pub fn node_id(&self, index: NodeIndex) -> Option<NodeId> {
        self.indices.get(&index).copied()
    }

    /// Topological order of all nodes, computed once at construction.
    pub fn order(&self) -> &[NodeId] {
        &self.order
    }

    /// Raw values of the output nodes for `input`.
    pub fn forward(&mut self, input: ColRef<f64>) -> Result<Col<f64>> {
        self.harness.run(&mut self.nodes, input)
    }

    /// Evaluates one node, see [`process`].
    pub fn process(&mut self, id: NodeId, token: Token) -> Result<f64> {
        process(&mut self.nodes, &self.harness, id, token)
    }

    /// Runs `input` through the network and returns the predicted label.
    ///
    /// A classifier picks the label with the highest softmax score, the first one on ties. A
    /// perceptron returns `"1"` for a positive output and `"0"` otherwise.
    pub fn run(&mut self, input: &[f64]) -> Result<&str> {
        let outputs = self.forward(ColRef::from_slice(input))?;
        let k = match self.variant {
            Variant::Perceptron => usize::from(outputs[0] > 0.0),
            Variant::Classifier => argmax(softmax(outputs.as_ref()).as_ref()),
        };
        Ok(self.labels[k].as_str())
    }

    /// Weights of `id`, aligned with its parents in registration order.
    pub fn weights(&self, id: NodeId) -> &[f64] {
        &self.nodes[id.0].weights
    }

    pub fn set_weights(&mut self, id: NodeId, weights: &[f64]) -> Result<()> {
        let node = &mut self.nodes[id.0];
        if node.weights.len() != weights.len() {
            return Err(NetworkError::ShapeMismatch {
                expected: node.weights.len(),
                actual: weights.len(),
            });
        }
        node.weights.copy_from_slice(weights);
        Ok(())
    }

    pub(crate) fn weights_mut(&mut self, id: NodeId) -> &mut [f64] {
        &mut self.nodes[id.0].weights
    }

    pub(crate) fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    pub fn n_weights(&self) -> usize {
        self.nodes.iter().map(|node| node.weights.len()).sum()
    }

    pub fn randomize_weights(&mut self, range: impl SampleRange<f64> + Clone) {
        let mut rng = rand::rng();
        for node in &mut self.nodes {
            for w in &mut node.weights {
                *w = rng.random_range(range.clone());
            }
        }
    }
}

/// Numerically stable softmax.
pub fn softmax(z: ColRef<f64>) -> Col<f64> {
    let max = z.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exp = Col::<f64>::from_fn(z.nrows(), |k| (z[k] - max).exp());
    let sum: f64 = exp.as_ref().iter().sum();
    Col::from_fn(z.nrows(), |k| exp[k] / sum)
}

/// Index of the largest value, the first one on ties.
fn argmax(values: ColRef<f64>) -> usize {
    let mut best = 0;
    for k in 1..values.nrows() {
        if values[k] > values[best] {
            best = k;
        }
    }
    best
}
