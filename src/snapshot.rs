//! Dumping and loading the weights of a network.
//!
//! A snapshot is the concatenation of every node's weight vector in node creation order. It
//! does not describe the topology, so it can only be loaded into a network built the same way.
//! Byte snapshots use native endianness.

use std::{fs, mem::size_of, path::Path};

use log::debug;

use crate::{Network, NetworkError, Result};

impl Network {
    pub fn weights_flat(&self) -> Vec<f64> {
        let mut flat = Vec::with_capacity(self.n_weights());
        for node in self.nodes() {
            flat.extend_from_slice(node.weights());
        }
        flat
    }

    /// Replaces all weights. Nothing changes if `flat` has the wrong length.
    pub fn load_weights_flat(&mut self, flat: &[f64]) -> Result<()> {
        let expected = self.n_weights();
        if flat.len() != expected {
            return Err(NetworkError::SnapshotMismatch {
                expected,
                actual: flat.len(),
            });
        }
        let mut rest = flat;
        for node in self.nodes_mut() {
            let (head, tail) = rest.split_at(node.weights.len());
            node.weights.copy_from_slice(head);
            rest = tail;
        }
        Ok(())
    }

    pub fn weights_to_bytes(&self) -> Vec<u8> {
        bytemuck::cast_slice::<f64, u8>(&self.weights_flat()).to_vec()
    }

    pub fn load_weights_from_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() % size_of::<f64>() != 0 {
            return Err(NetworkError::SnapshotMismatch {
                expected: self.n_weights(),
                actual: bytes.len().div_ceil(size_of::<f64>()),
            });
        }
        let flat: Vec<f64> = bytemuck::pod_collect_to_vec(bytes);
        self.load_weights_flat(&flat)
    }

    pub fn save_weights(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.weights_to_bytes())?;
        debug!("saved {} weights to {}", self.n_weights(), path.display());
        Ok(())
    }

    pub fn load_weights(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        self.load_weights_from_bytes(&bytes)?;
        debug!("loaded {} weights from {}", self.n_weights(), path.display());
        Ok(())
    }
}
