//! Builds a network from a `.network` description and trains it on a sample file.

use std::{error::Error, path::PathBuf};

use clap::Parser;
use log::info;
use neural_nets::{
    Network, NetworkConfig, activation_functions, read_samples, schedule::InverseTime, train,
    validate,
};

#[derive(Parser, Debug)]
#[command(about = "Train a network with an explicit topology")]
struct Args {
    #[arg(long, default_value = "demos/layouts/skip.network")]
    layout: PathBuf,

    /// One sample per line: features followed by a label
    #[arg(long, default_value = "demos/data/xor.txt")]
    samples: PathBuf,

    /// Activation of the hidden nodes
    #[arg(long, default_value = "tanh")]
    hidden: String,

    #[arg(long, default_value_t = 2000)]
    epochs: usize,

    /// Initial rate of the inverse time schedule
    #[arg(long, default_value_t = 1.0)]
    rate: f64,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();

    let hidden_phi = activation_functions::by_name(&args.hidden)
        .ok_or_else(|| format!("unknown activation function {:?}", args.hidden))?;
    let config = NetworkConfig {
        hidden_phi,
        bias: true,
        ..NetworkConfig::default()
    };
    let mut network = Network::from_file(&args.layout, &config)?;
    network.randomize_weights(-1.0..1.0);
    info!("loaded {}", args.layout.display());

    let samples = read_samples(&args.samples)?;
    let schedule = InverseTime::with_exponent(args.rate, 0.25);
    let mut last = None;
    for _ in 0..args.epochs {
        last = Some(train(&mut network, &samples, &schedule)?);
    }
    if let Some(summary) = last {
        println!("{summary} Final loss {:.6}.", summary.loss);
    }
    println!("{}", validate(&mut network, &samples)?);
    println!("{}", network.node_details());
    Ok(())
}
