//! Core parts of the algorithms without abstraction.

pub mod harness;
pub mod node;

mod back_propagation;
mod forward;

pub use back_propagation::*;
pub use forward::*;
pub use harness::Harness;
pub use node::{Link, Node, NodeId, NodeIndex, NodeKind, Token};

pub(crate) use node::register_parent;
