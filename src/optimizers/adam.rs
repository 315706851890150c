//! Adam (Adaptive Moment Estimation) optimizer
//!
//! Combines a momentum-style first moment with an RMSProp-style second moment:
//!
//! ```text
//! m = β1 * m + (1 - β1) * gradient
//! v = β2 * v + (1 - β2) * gradient²
//! parameter = parameter - learning_rate * m / sqrt(v + ε)
//! ```
//!
//! No bias correction is applied, so early steps are smaller than in textbook Adam.

use ndarray::{Array2, ArrayViewMut2, Zip};

use crate::optimizers::MOMENT_EPSILON;
use crate::params::{Family, LayerShape, ParameterSet};

/// Adam state: decay rates plus first and second moment arrays per parameter array.
#[derive(Debug, Clone)]
pub struct Adam {
    beta1: f64,
    beta2: f64,
    /// First moment estimates (momentum)
    first: ParameterSet,
    /// Second moment estimates (uncentered variance)
    second: ParameterSet,
}

impl Adam {
    pub fn new(beta1: f64, beta2: f64, shapes: &[LayerShape]) -> Self {
        Self {
            beta1,
            beta2,
            first: ParameterSet::zeros(shapes),
            second: ParameterSet::zeros(shapes),
        }
    }

    pub fn beta1(&self) -> f64 {
        self.beta1
    }

    pub fn beta2(&self) -> f64 {
        self.beta2
    }

    pub fn first_moment(&self) -> &ParameterSet {
        &self.first
    }

    pub fn second_moment(&self) -> &ParameterSet {
        &self.second
    }

    pub fn reset(&mut self) {
        self.first.fill_zero();
        self.second.fill_zero();
    }

    pub fn update(
        &mut self,
        learning_rate: f64,
        family: Family,
        layer: usize,
        parameter: ArrayViewMut2<f64>,
        gradient: &Array2<f64>,
    ) {
        let (beta1, beta2) = (self.beta1, self.beta2);
        let first = &mut self.first.family_mut(family)[layer];
        let second = &mut self.second.family_mut(family)[layer];
        Zip::from(parameter)
            .and(first)
            .and(second)
            .and(gradient)
            .for_each(|p, m, v, &g| {
                *m = beta1 * *m + (1.0 - beta1) * g;
                *v = beta2 * *v + (1.0 - beta2) * g * g;
                *p -= learning_rate * *m / (*v + MOMENT_EPSILON).sqrt();
            });
    }
}
