use std::fmt::{self, Debug};

/// Type-erased activation function, as stored on every node.
#[derive(Clone, Copy)]
pub struct DynActivationFunction {
    name: &'static str,
    apply: fn(f64) -> f64,
    deriv: Option<fn(f64) -> f64>,
}

impl Debug for DynActivationFunction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        Debug::fmt(self.name, f)
    }
}

impl PartialEq for DynActivationFunction {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl DynActivationFunction {
    pub fn new<Phi: ActivationFunction>(_: Phi) -> Self {
        Self {
            name: Phi::NAME,
            apply: Phi::apply,
            deriv: Phi::DERIV,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn apply(&self, x: f64) -> f64 {
        (self.apply)(x)
    }

    /// Returns `None` if the function is not differentiable.
    pub fn deriv(&self, x: f64) -> Option<f64> {
        self.deriv.map(|deriv| deriv(x))
    }

    pub fn is_differentiable(&self) -> bool {
        self.deriv.is_some()
    }
}

impl<Phi: ActivationFunction> From<Phi> for DynActivationFunction {
    fn from(phi: Phi) -> Self {
        Self::new(phi)
    }
}

pub trait ActivationFunction: Send + Sync + 'static {
    const NAME: &'static str;

    /// Derivative of `apply`, or `None` for non-differentiable functions.
    const DERIV: Option<fn(f64) -> f64>;

    fn apply(x: f64) -> f64;
}

pub mod activation_functions {
    use std::f64::consts::PI;

    use super::{ActivationFunction, DynActivationFunction};

    fn identity_deriv(_: f64) -> f64 {
        1.0
    }

    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct Identity;
    impl ActivationFunction for Identity {
        const NAME: &'static str = "identity";
        const DERIV: Option<fn(f64) -> f64> = Some(identity_deriv);

        fn apply(x: f64) -> f64 {
            x
        }
    }

    /// Zero-one step: `1` for strictly positive input, `0` otherwise.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct Step;
    impl ActivationFunction for Step {
        const NAME: &'static str = "step";
        const DERIV: Option<fn(f64) -> f64> = None;

        fn apply(x: f64) -> f64 {
            if x > 0.0 { 1.0 } else { 0.0 }
        }
    }

    fn sigmoid(x: f64) -> f64 {
        1.0 / (1.0 + f64::exp(-x))
    }

    fn sigmoid_deriv(x: f64) -> f64 {
        sigmoid(x) * (1.0 - sigmoid(x))
    }

    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct Sigmoid;
    impl ActivationFunction for Sigmoid {
        const NAME: &'static str = "sigmoid";
        const DERIV: Option<fn(f64) -> f64> = Some(sigmoid_deriv);

        fn apply(x: f64) -> f64 {
            sigmoid(x)
        }
    }

    fn tanh_deriv(x: f64) -> f64 {
        1.0 - f64::tanh(x).powi(2)
    }

    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct Tanh;
    impl ActivationFunction for Tanh {
        const NAME: &'static str = "tanh";
        const DERIV: Option<fn(f64) -> f64> = Some(tanh_deriv);

        fn apply(x: f64) -> f64 {
            f64::tanh(x)
        }
    }

    fn arctan_deriv(x: f64) -> f64 {
        1.0 / (PI * (1.0 + x * x))
    }

    /// Arctangent squashed into `(0, 1)`.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct Arctan;
    impl ActivationFunction for Arctan {
        const NAME: &'static str = "arctan";
        const DERIV: Option<fn(f64) -> f64> = Some(arctan_deriv);

        fn apply(x: f64) -> f64 {
            f64::atan(x) / PI + 0.5
        }
    }

    /// Every function of the catalog.
    pub fn catalog() -> [DynActivationFunction; 5] {
        [
            DynActivationFunction::new(Identity),
            DynActivationFunction::new(Step),
            DynActivationFunction::new(Sigmoid),
            DynActivationFunction::new(Tanh),
            DynActivationFunction::new(Arctan),
        ]
    }

    pub fn by_name(name: &str) -> Option<DynActivationFunction> {
        catalog().into_iter().find(|phi| phi.name() == name)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::{activation_functions::*, *};

    #[test]
    fn step_is_not_differentiable() {
        let step = DynActivationFunction::new(Step);
        assert_eq!(step.apply(0.0), 0.0);
        assert_eq!(step.apply(1e-9), 1.0);
        assert_eq!(step.apply(-3.0), 0.0);
        assert!(step.deriv(0.5).is_none());
        assert!(!step.is_differentiable());
    }

    #[test]
    fn derivatives_match_finite_differences() {
        let h = 1e-6;
        for phi in [
            DynActivationFunction::new(Identity),
            DynActivationFunction::new(Sigmoid),
            DynActivationFunction::new(Tanh),
            DynActivationFunction::new(Arctan),
        ] {
            for x in [-2.0, -0.3, 0.0, 0.7, 3.0] {
                let numeric = (phi.apply(x + h) - phi.apply(x - h)) / (2.0 * h);
                let analytic = phi.deriv(x).unwrap();
                assert_abs_diff_eq!(numeric, analytic, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn squashing_functions_at_zero() {
        assert_abs_diff_eq!(DynActivationFunction::new(Sigmoid).apply(0.0), 0.5);
        assert_abs_diff_eq!(DynActivationFunction::new(Arctan).apply(0.0), 0.5);
        assert_abs_diff_eq!(DynActivationFunction::new(Tanh).apply(0.0), 0.0);
    }

    #[test]
    fn lookup_by_name() {
        assert_eq!(by_name("arctan").map(|phi| phi.name()), Some("arctan"));
        assert_eq!(by_name("step"), Some(DynActivationFunction::new(Step)));
        assert!(by_name("relu").is_none());
    }
}
