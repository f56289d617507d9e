//! `.network` topology descriptions.
//!
//! A description fixes the layer sizes and the parents of every node, but not the weights:
//!
//! ```text
//! % comment lines start with '%'
//! 2 3 1
//! 1.1: 0.1 0.2
//! 1.2: 0.1
//! 1.3: 0.2
//! 2.1: 1.1 1.2 1.3 0.1
//! ```
//!
//! The first record lists N >= 2 layer sizes, input layer first and output layer last. Every
//! following record reads `<node>: <parent> <parent> ...`, where a node index `x.y` is the
//! zero-indexed layer `x` and the one-indexed position `y` inside it. Parents may come from any
//! layer as long as the resulting graph has no cycle.

use std::{fs, path::Path};

use log::debug;

use crate::{NetworkError, Result, core::NodeIndex};

/// File extension a description file must carry.
pub const EXTENSION: &str = "network";

const COMMENT_MARKER: char = '%';

/// Layer sizes of a network, input layer first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    layer_sizes: Vec<usize>,
}

impl Topology {
    pub fn new(layer_sizes: Vec<usize>) -> Self {
        Self { layer_sizes }
    }

    /// Builds the sizes of a regular network.
    pub fn layered(n_inputs: usize, n_hidden: &[usize], n_outputs: usize) -> Self {
        let mut layer_sizes = Vec::with_capacity(n_hidden.len() + 2);
        layer_sizes.push(n_inputs);
        layer_sizes.extend_from_slice(n_hidden);
        layer_sizes.push(n_outputs);
        Self { layer_sizes }
    }

    pub fn layer_sizes(&self) -> &[usize] {
        &self.layer_sizes
    }

    pub fn n_layers(&self) -> usize {
        self.layer_sizes.len()
    }

    pub fn n_inputs(&self) -> usize {
        self.layer_sizes.first().copied().unwrap_or(0)
    }

    pub fn n_outputs(&self) -> usize {
        self.layer_sizes.last().copied().unwrap_or(0)
    }

    /// Total number of nodes, `None` if it does not fit a `usize`.
    pub fn n_nodes(&self) -> Option<usize> {
        self.layer_sizes
            .iter()
            .try_fold(0usize, |total, &size| total.checked_add(size))
    }

    /// Checks that a network can be built with these sizes and returns its node count.
    ///
    /// There must be at least two layers, the input and output layers must not be empty and the
    /// node count must not overflow.
    pub fn validate(&self, origin: &str) -> Result<usize> {
        if self.n_layers() < 2 {
            return Err(NetworkError::malformed_topology(origin, "not enough layers specified"));
        }
        if self.n_inputs() == 0 {
            return Err(NetworkError::malformed_topology(origin, "input layer is empty"));
        }
        if self.n_outputs() == 0 {
            return Err(NetworkError::malformed_topology(origin, "output layer is empty"));
        }
        self.n_nodes()
            .ok_or_else(|| NetworkError::malformed_topology(origin, "too many nodes"))
    }

    pub fn contains(&self, index: NodeIndex) -> bool {
        self.layer_sizes
            .get(index.layer)
            .is_some_and(|&size| index.position < size)
    }
}

/// A parsed topology description: layer sizes plus explicit parents per node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyDescription {
    origin: String,
    topology: Topology,
    connections: Vec<(NodeIndex, Vec<NodeIndex>)>,
}

impl TopologyDescription {
    /// Reads a description file. The file name must end in `.network`.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let origin = path.display().to_string();
        if path.extension().is_none_or(|extension| extension != EXTENSION) {
            return Err(NetworkError::malformed_topology(
                &origin,
                format!("not a .{EXTENSION} file"),
            ));
        }
        let text = fs::read_to_string(path)?;
        Self::parse(&text, origin)
    }

    /// Parses a description. `origin` names the description in errors.
    pub fn parse(text: &str, origin: impl Into<String>) -> Result<Self> {
        let origin = origin.into();
        let mut records = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with(COMMENT_MARKER));

        let Some(sizes_line) = records.next() else {
            return Err(NetworkError::malformed_topology(&origin, "missing layer sizes"));
        };
        let layer_sizes = sizes_line
            .split_whitespace()
            .map(str::parse::<usize>)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| NetworkError::malformed_topology(&origin, format!("layer sizes: {e}")))?;
        let topology = Topology::new(layer_sizes);
        topology.validate(&origin)?;

        let lookup = |token: &str| -> Result<NodeIndex> {
            let index: NodeIndex = token
                .parse()
                .map_err(|reason: String| NetworkError::malformed_topology(&origin, reason))?;
            if !topology.contains(index) {
                return Err(NetworkError::malformed_topology(
                    &origin,
                    format!("node {token} not requested"),
                ));
            }
            Ok(index)
        };

        let mut connections = Vec::new();
        for record in records {
            let Some((node, parents)) = record.split_once(':') else {
                return Err(NetworkError::malformed_topology(
                    &origin,
                    format!("expected `<node>: <parents>`, got {record:?}"),
                ));
            };
            let node = lookup(node.trim())?;
            if node.layer == 0 {
                return Err(NetworkError::malformed_topology(
                    &origin,
                    format!("input node {node} cannot have parents"),
                ));
            }
            let parents = parents
                .split_whitespace()
                .map(lookup)
                .collect::<Result<Vec<_>>>()?;
            connections.push((node, parents));
        }
        debug!(
            "parsed topology {origin:?}: layers {:?}, {} connection records",
            topology.layer_sizes(),
            connections.len()
        );
        Ok(Self {
            origin,
            topology,
            connections,
        })
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// `(node, parents)` records in file order.
    pub fn connections(&self) -> &[(NodeIndex, Vec<NodeIndex>)] {
        &self.connections
    }
}
