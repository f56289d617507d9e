use std::{fmt, str::FromStr};

use derive_more::{Display, Into};

use crate::DynActivationFunction;

/// Handle of a node inside its network's node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Into)]
#[display("#{_0}")]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn get(self) -> usize {
        self.0
    }
}

/// Textual identity of a layered node, written `"<layer>.<position>"` with a one-indexed position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex {
    /// Layer number, `0` being the input layer.
    pub layer: usize,
    /// Zero-indexed position inside the layer.
    pub position: usize,
}

impl NodeIndex {
    pub fn new(layer: usize, position: usize) -> Self {
        Self { layer, position }
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}", self.layer, self.position + 1)
    }
}

impl FromStr for NodeIndex {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (layer, position) = s
            .split_once('.')
            .ok_or_else(|| format!("node index {s:?} is not of the form <layer>.<position>"))?;
        let layer: usize = layer
            .parse()
            .map_err(|_| format!("invalid layer in node index {s:?}"))?;
        let position: usize = position
            .parse()
            .map_err(|_| format!("invalid position in node index {s:?}"))?;
        match position.checked_sub(1) {
            Some(position) => Ok(Self { layer, position }),
            None => Err(format!("positions are one-indexed, got {s:?}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeKind {
    /// Reads its value from the harness.
    Input,
    Hidden,
    Output,
    /// Always outputs `value`.
    Bias { value: f64 },
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Input => "InputNode",
            NodeKind::Hidden => "HiddenNode",
            NodeKind::Output => "OutputNode",
            NodeKind::Bias { .. } => "BiasNode",
        }
    }
}

/// Memoization key passed down a forward pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// Generation minted by the harness for one run.
    Run(u64),
    /// Returns the last computed value without evaluating anything.
    Bypass,
}

/// Back-reference from a parent to one of its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    pub node: NodeId,
    /// Position of the parent in the child's input list.
    pub slot: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Evaluation {
    Stale,
    InProgress(u64),
    Done(u64),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) index: Option<NodeIndex>,
    pub(crate) phi: DynActivationFunction,
    pub(crate) inputs: Vec<NodeId>,
    pub(crate) weights: Vec<f64>,
    pub(crate) children: Vec<Link>,
    /// Weighted input sum of the last evaluation.
    pub(crate) z: f64,
    /// Output of the last evaluation.
    pub(crate) a: f64,
    pub(crate) evaluation: Evaluation,
}

impl Node {
    pub(crate) fn new(kind: NodeKind, index: Option<NodeIndex>, phi: DynActivationFunction) -> Self {
        let a = match kind {
            NodeKind::Bias { value } => value,
            _ => 0.0,
        };
        Self {
            kind,
            index,
            phi,
            inputs: Vec::new(),
            weights: Vec::new(),
            children: Vec::new(),
            z: 0.0,
            a,
            evaluation: Evaluation::Stale,
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// `None` for the bias node.
    pub fn index(&self) -> Option<NodeIndex> {
        self.index
    }

    pub fn phi(&self) -> DynActivationFunction {
        self.phi
    }

    /// Parents, in registration order.
    pub fn inputs(&self) -> &[NodeId] {
        &self.inputs
    }

    /// Weights, aligned with [`Node::inputs`].
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn children(&self) -> &[Link] {
        &self.children
    }

    pub fn weighted_input(&self) -> f64 {
        self.z
    }

    /// Output of the last evaluation.
    pub fn value(&self) -> f64 {
        self.a
    }

    /// Name used in error messages and pretty printing.
    pub fn label(&self) -> String {
        match self.index {
            Some(index) => index.to_string(),
            None => "bias".to_owned(),
        }
    }
}

/// Appends `parent` to `child`'s inputs with the given initial weight and records the back-reference.
pub(crate) fn register_parent(nodes: &mut [Node], child: NodeId, parent: NodeId, weight: f64) {
    let slot = {
        let child_node = &mut nodes[child.0];
        child_node.inputs.push(parent);
        child_node.weights.push(weight);
        child_node.inputs.len() - 1
    };
    nodes[parent.0].children.push(Link { node: child, slot });
}
