//! Trains a two-input perceptron to tell whether a point lies above the line `y = x`.

use std::error::Error;

use clap::Parser;
use neural_nets::{Network, Sample, schedule::Constant, train, validate};
use rand::Rng;

#[derive(Parser, Debug)]
#[command(about = "Train a perceptron on points above and below y = x")]
struct Args {
    /// Number of passes over the training set
    #[arg(long, default_value_t = 500)]
    epochs: usize,

    /// Samples in each of the training and validation sets
    #[arg(long, default_value_t = 200)]
    samples: usize,

    /// Constant learning rate
    #[arg(long, default_value_t = 0.1)]
    rate: f64,
}

fn generate(rng: &mut impl Rng, n: usize) -> Vec<Sample> {
    (0..n)
        .map(|_| {
            let x = rng.random_range(-10.0..10.0);
            let y = rng.random_range(-10.0..10.0);
            let label = if y > x { "1" } else { "0" };
            Sample::new(vec![x, y], label)
        })
        .collect()
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut rng = rand::rng();
    let training = generate(&mut rng, args.samples);
    let held_out = generate(&mut rng, args.samples);

    let mut perceptron = Network::perceptron(2)?;
    let schedule = Constant(args.rate);
    for epoch in 1..=args.epochs {
        let summary = train(&mut perceptron, &training, &schedule)?;
        if epoch == 1 || epoch == args.epochs {
            println!("epoch {epoch}: {summary}");
        }
    }
    println!("{}", validate(&mut perceptron, &held_out)?);
    println!("{:?}", perceptron.node_details());
    Ok(())
}
