//! Labeled samples, one per line: whitespace-delimited numeric features followed by a label.
//!
//! ```text
//! 0.4 -1.2 5.2 red
//! ```

use std::{fs, path::Path};

use log::debug;
use rayon::prelude::*;

use crate::{NetworkError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub features: Vec<f64>,
    pub label: String,
}

impl Sample {
    pub fn new(features: Vec<f64>, label: impl Into<String>) -> Self {
        Self {
            features,
            label: label.into(),
        }
    }

    /// Label read as a number, as the perceptron rule requires.
    pub(crate) fn numeric_label(&self, line: usize) -> Result<f64> {
        self.label.parse().map_err(|_| NetworkError::MalformedSample {
            line,
            reason: format!("label {:?} is not a number", self.label),
        })
    }
}

/// Parses one sample. `line` is the one-indexed line number reported on error.
pub fn parse_line(text: &str, line: usize) -> Result<Sample> {
    let mut tokens: Vec<&str> = text.split_whitespace().collect();
    let Some(label) = tokens.pop() else {
        return Err(NetworkError::MalformedSample {
            line,
            reason: "empty line".to_owned(),
        });
    };
    let features = tokens
        .into_iter()
        .map(|token| {
            token.parse::<f64>().map_err(|e| NetworkError::MalformedSample {
                line,
                reason: format!("feature {token:?}: {e}"),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Sample::new(features, label))
}

/// Parses every non-blank line of `text`, in order.
pub fn parse_samples(text: &str) -> Result<Vec<Sample>> {
    let lines: Vec<&str> = text.lines().collect();
    lines
        .par_iter()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| parse_line(line, i + 1))
        .collect()
}

pub fn read_samples(path: impl AsRef<Path>) -> Result<Vec<Sample>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let samples = parse_samples(&text)?;
    debug!("read {} samples from {}", samples.len(), path.display());
    Ok(samples)
}
