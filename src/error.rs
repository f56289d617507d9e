use std::io;

use derive_more::{Display, Error};

/// The result type used across the crate.
pub type Result<T> = std::result::Result<T, NetworkError>;

/// Everything that can go wrong while building, running or training a network.
#[derive(Debug, Display, Error)]
pub enum NetworkError {
    #[display("incorrect number of inputs: expected {expected}, received {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[display("{node} is not a registered input node with this harness")]
    UnregisteredInputNode { node: String },

    #[display("topology {origin:?} contains a dependency cycle through node {node}")]
    CyclicTopology { origin: String, node: String },

    #[display("error reading topology {origin:?}: {reason}")]
    MalformedTopology { origin: String, reason: String },

    #[display("node {node} uses the non-differentiable activation function {function:?}")]
    NonDifferentiableActivation { node: String, function: &'static str },

    #[display("label {label:?} is not one of the network's valid labels")]
    UnknownLabel { label: String },

    #[display("malformed sample on line {line}: {reason}")]
    MalformedSample { line: usize, reason: String },

    /// A cycle met while evaluating a network whose topology was already validated.
    #[display("evaluation of node {node} re-entered itself")]
    TopologyInvariant { node: String },

    #[display("weight snapshot holds {actual} values, network has {expected}")]
    SnapshotMismatch { expected: usize, actual: usize },

    #[display("{_0}")]
    Io(#[error(source)] io::Error),
}

impl From<io::Error> for NetworkError {
    fn from(error: io::Error) -> Self {
        Self::Io(error)
    }
}

impl NetworkError {
    pub(crate) fn malformed_topology(origin: &str, reason: impl Into<String>) -> Self {
        Self::MalformedTopology {
            origin: origin.to_owned(),
            reason: reason.into(),
        }
    }
}
