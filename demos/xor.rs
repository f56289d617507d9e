//! Learns XOR with one hidden layer by back-propagation.

use std::{error::Error, path::PathBuf};

use clap::Parser;
use neural_nets::{
    Gym, Network, NetworkConfig, Sample, TrainingOptions, activation_functions::Identity,
    activation_functions::Sigmoid, schedule::Constant,
};

#[derive(Parser, Debug)]
#[command(about = "Train a small network on XOR")]
struct Args {
    #[arg(long, default_value_t = 5000)]
    epochs: usize,

    #[arg(long, default_value_t = 0.5)]
    rate: f64,

    #[arg(long, default_value_t = 4)]
    hidden: usize,

    /// Squared error at or below which a sample is not trained on
    #[arg(long, default_value_t = 0.0)]
    error_threshold: f64,

    /// Dump the trained weights to this file
    #[arg(long)]
    save: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();

    let config = NetworkConfig::default()
        .with_activations(Identity, Sigmoid, Sigmoid)
        .with_bias(true);
    let mut network = Network::fully_connected(2, &[args.hidden], 2, &config)?;
    network.randomize_weights(-1.0..1.0);

    let samples = [
        Sample::new(vec![0.0, 0.0], "0"),
        Sample::new(vec![0.0, 1.0], "1"),
        Sample::new(vec![1.0, 0.0], "1"),
        Sample::new(vec![1.0, 1.0], "0"),
    ];
    let options = TrainingOptions {
        error_threshold: args.error_threshold,
    };
    let schedule = Constant(args.rate);
    let mut gym = Gym::with_options(&mut network, options);
    let n_logs = 10;
    for epoch in 0..args.epochs {
        let summary = gym.train(&samples, &schedule)?;
        if epoch % (args.epochs / n_logs).max(1) == 0 || epoch + 1 == args.epochs {
            println!("epoch {epoch}: loss {:.6}, {} updates", summary.loss, summary.updates);
        }
    }
    println!("{}", gym.validate(&samples)?);

    for sample in &samples {
        let label = network.run(&sample.features)?;
        println!("{:?} -> {label}", sample.features);
    }
    println!("{network}");
    println!("{}", network.node_details());
    if let Some(path) = &args.save {
        network.save_weights(path)?;
        println!("weights saved to {}", path.display());
    }
    Ok(())
}
