pub use faer;

pub mod core;
pub mod samples;
pub mod schedule;
pub mod topology;

mod activation;
mod error;
mod gym;
mod nn;
mod pretty_print;
mod snapshot;

pub use activation::*;
pub use error::*;
pub use gym::*;
pub use nn::*;
pub use pretty_print::*;
pub use samples::{Sample, parse_samples, read_samples};
pub use schedule::LearningRate;
pub use topology::{Topology, TopologyDescription};
