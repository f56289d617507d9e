//! Learning rate schedules: functions of the time index `t`, the number of samples seen so far
//! in the current pass starting at 1.

use rand::Rng;

pub trait LearningRate {
    fn rate(&self, t: usize) -> f64;
}

impl<F: Fn(usize) -> f64> LearningRate for F {
    fn rate(&self, t: usize) -> f64 {
        self(t)
    }
}

/// The same rate regardless of `t`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constant(pub f64);

impl LearningRate for Constant {
    fn rate(&self, _: usize) -> f64 {
        self.0
    }
}

/// `rate / t^k`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InverseTime {
    pub rate: f64,
    pub k: f64,
}

impl InverseTime {
    pub fn new(rate: f64) -> Self {
        Self { rate, k: 1.0 }
    }

    pub fn with_exponent(rate: f64, k: f64) -> Self {
        Self { rate, k }
    }
}

impl LearningRate for InverseTime {
    fn rate(&self, t: usize) -> f64 {
        self.rate / (t as f64).powf(self.k)
    }
}

/// Drawn uniformly from `[0, rate / t)` on every call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RandomInverseTime {
    pub rate: f64,
}

impl RandomInverseTime {
    pub fn new(rate: f64) -> Self {
        Self { rate }
    }
}

impl LearningRate for RandomInverseTime {
    fn rate(&self, t: usize) -> f64 {
        rand::rng().random::<f64>() * self.rate / t as f64
    }
}

/// `initial * base^t`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Exponential {
    pub initial: f64,
    pub base: f64,
}

impl Exponential {
    /// Decays from `1.0` by `base` per sample.
    pub fn new(base: f64) -> Self {
        Self { initial: 1.0, base }
    }
}

impl LearningRate for Exponential {
    fn rate(&self, t: usize) -> f64 {
        self.initial * self.base.powf(t as f64)
    }
}
