//! RMSProp optimizer
//!
//! Scales each step by a running root-mean-square of past gradients:
//!
//! ```text
//! v = decay * v + (1 - decay) * gradient²
//! parameter = parameter - learning_rate * gradient / sqrt(v + ε)
//! ```

use ndarray::{Array2, ArrayViewMut2, Zip};

use crate::optimizers::MOMENT_EPSILON;
use crate::params::{Family, LayerShape, ParameterSet};

/// RMSProp state: decay factor and one squared-gradient average per parameter array.
#[derive(Debug, Clone)]
pub struct RmsProp {
    decay: f64,
    mean_square: ParameterSet,
}

impl RmsProp {
    pub fn new(decay: f64, shapes: &[LayerShape]) -> Self {
        Self {
            decay,
            mean_square: ParameterSet::zeros(shapes),
        }
    }

    pub fn mean_square(&self) -> &ParameterSet {
        &self.mean_square
    }

    pub fn reset(&mut self) {
        self.mean_square.fill_zero();
    }

    pub fn update(
        &mut self,
        learning_rate: f64,
        family: Family,
        layer: usize,
        parameter: ArrayViewMut2<f64>,
        gradient: &Array2<f64>,
    ) {
        let decay = self.decay;
        let mean_square = &mut self.mean_square.family_mut(family)[layer];
        Zip::from(parameter)
            .and(mean_square)
            .and(gradient)
            .for_each(|p, v, &g| {
                *v = decay * *v + (1.0 - decay) * g * g;
                *p -= learning_rate * g / (*v + MOMENT_EPSILON).sqrt();
            });
    }
}
