use derive_more::Display;
use faer::prelude::*;
use log::{debug, info, trace, warn};

use crate::{
    Network, NetworkError, Result, Variant,
    core::{ErrorBuffer, apply_errors, delta_rule, hidden_errors, output_errors},
    samples::Sample,
    schedule::LearningRate,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingOptions {
    /// Back-propagation skips a sample whose squared error is at or below this value.
    pub error_threshold: f64,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            error_threshold: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Display)]
#[display("Training complete: {samples} samples, {updates} updates.")]
pub struct TrainingSummary {
    pub samples: usize,
    pub updates: usize,
    /// Squared error summed over the pass.
    pub loss: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Display)]
#[display("Validation complete: {samples} samples, {correct} correct, {accuracy}% accuracy.")]
pub struct ValidationSummary {
    pub samples: usize,
    pub correct: usize,
    /// Percentage of correct predictions, `0.0` for an empty pass.
    pub accuracy: f64,
}

/// Trains a network one sample at a time.
///
/// A perceptron is trained by the delta rule, every other network by back-propagation. Any
/// error aborts the pass; the weights keep the updates of the samples before it.
pub struct Gym<'a> {
    network: &'a mut Network,
    options: TrainingOptions,
    errors: Option<ErrorBuffer>,
}

impl<'a> Gym<'a> {
    pub fn new(network: &'a mut Network) -> Self {
        Self::with_options(network, TrainingOptions::default())
    }

    pub fn with_options(network: &'a mut Network, options: TrainingOptions) -> Self {
        Self {
            network,
            options,
            errors: None,
        }
    }

    pub fn options(&self) -> &TrainingOptions {
        &self.options
    }

    pub fn network(&mut self) -> &mut Network {
        self.network
    }

    /// One pass over `samples`. The time index handed to `schedule` starts at 1.
    pub fn train(
        &mut self,
        samples: &[Sample],
        schedule: &impl LearningRate,
    ) -> Result<TrainingSummary> {
        if samples.is_empty() {
            warn!("training pass without samples");
        }
        let summary = match self.network.variant() {
            Variant::Perceptron => self.train_perceptron(samples, schedule)?,
            Variant::Classifier => self.train_back_propagation(samples, schedule)?,
        };
        info!("{summary}");
        Ok(summary)
    }

    fn train_perceptron(
        &mut self,
        samples: &[Sample],
        schedule: &impl LearningRate,
    ) -> Result<TrainingSummary> {
        let output = self.network.output_layer()[0];
        let mut updates = 0usize;
        let mut loss = 0.0f64;
        for (i, sample) in samples.iter().enumerate() {
            let t = i + 1;
            let label = sample.numeric_label(t)?;
            let prediction = self.network.forward(ColRef::from_slice(&sample.features))?[0];
            let delta = schedule.rate(t) * (label - prediction);
            delta_rule(self.network.weights_mut(output), &sample.features, delta);
            loss += (label - prediction) * (label - prediction);
            if delta != 0.0 {
                updates += 1;
            }
            trace!("sample {t}: predicted {prediction}, label {label}, delta {delta}");
        }
        Ok(TrainingSummary {
            samples: samples.len(),
            updates,
            loss,
        })
    }

    fn train_back_propagation(
        &mut self,
        samples: &[Sample],
        schedule: &impl LearningRate,
    ) -> Result<TrainingSummary> {
        let n_nodes = self.network.nodes().len();
        let errors = self
            .errors
            .get_or_insert_with(|| ErrorBuffer::create(n_nodes));
        let threshold = self.options.error_threshold;
        let mut updates = 0usize;
        let mut loss = 0.0f64;
        for (i, sample) in samples.iter().enumerate() {
            let t = i + 1;
            let eta = schedule.rate(t);
            let squared_error = back_propagate(self.network, errors, sample, eta, threshold)?;
            loss += squared_error;
            if squared_error > threshold {
                updates += 1;
            }
            trace!("sample {t}: squared error {squared_error}, eta {eta}");
        }
        debug!("back-propagation pass: loss {loss}");
        Ok(TrainingSummary {
            samples: samples.len(),
            updates,
            loss,
        })
    }

    /// Counts the samples whose predicted label equals their label.
    pub fn validate(&mut self, samples: &[Sample]) -> Result<ValidationSummary> {
        if samples.is_empty() {
            warn!("validation pass without samples");
        }
        let mut correct = 0usize;
        for sample in samples {
            if self.network.run(&sample.features)? == sample.label {
                correct += 1;
            }
        }
        let accuracy = match samples.len() {
            0 => 0.0,
            n => correct as f64 * 100.0 / n as f64,
        };
        let summary = ValidationSummary {
            samples: samples.len(),
            correct,
            accuracy,
        };
        info!("{summary}");
        Ok(summary)
    }
}

/// One back-propagation step. Returns the squared error of the sample; the weights are left
/// untouched when it is at or below `threshold`.
fn back_propagate(
    network: &mut Network,
    errors: &mut ErrorBuffer,
    sample: &Sample,
    eta: f64,
    threshold: f64,
) -> Result<f64> {
    network.forward(ColRef::from_slice(&sample.features))?;
    let Some(target) = network.labels().iter().position(|label| *label == sample.label) else {
        return Err(NetworkError::UnknownLabel {
            label: sample.label.clone(),
        });
    };
    let desired = Col::<f64>::from_fn(network.n_outputs(), |k| if k == target { 1.0 } else { 0.0 });
    errors.clear();
    let squared_error = output_errors(
        network.nodes(),
        network.harness().outputs(),
        desired.as_ref(),
        errors,
    );
    if squared_error <= threshold {
        return Ok(squared_error);
    }
    hidden_errors(network.nodes(), network.order(), errors)?;
    apply_errors(network.nodes_mut(), errors, eta);
    Ok(squared_error)
}

/// A single training pass with default options.
pub fn train(
    network: &mut Network,
    samples: &[Sample],
    schedule: &impl LearningRate,
) -> Result<TrainingSummary> {
    Gym::new(network).train(samples, schedule)
}

pub fn validate(network: &mut Network, samples: &[Sample]) -> Result<ValidationSummary> {
    Gym::new(network).validate(samples)
}
