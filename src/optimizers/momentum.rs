//! Gradient descent with momentum
//!
//! Keeps an exponentially decayed average of past gradients (the velocity) per
//! parameter array:
//!
//! ```text
//! v = decay * v + (1 - decay) * gradient
//! parameter = parameter - learning_rate * v
//! ```

use ndarray::{Array2, ArrayViewMut2, Zip};

use crate::params::{Family, LayerShape, ParameterSet};

/// Momentum state: the decay factor and one velocity array per parameter array.
#[derive(Debug, Clone)]
pub struct Momentum {
    decay: f64,
    velocity: ParameterSet,
}

impl Momentum {
    /// Zero velocity for every layer in `shapes`.
    pub fn new(decay: f64, shapes: &[LayerShape]) -> Self {
        Self {
            decay,
            velocity: ParameterSet::zeros(shapes),
        }
    }

    pub fn velocity(&self) -> &ParameterSet {
        &self.velocity
    }

    pub fn reset(&mut self) {
        self.velocity.fill_zero();
    }

    /// Updates the velocity of `(family, layer)` and applies it to `parameter`.
    pub fn update(
        &mut self,
        learning_rate: f64,
        family: Family,
        layer: usize,
        parameter: ArrayViewMut2<f64>,
        gradient: &Array2<f64>,
    ) {
        let decay = self.decay;
        let velocity = &mut self.velocity.family_mut(family)[layer];
        Zip::from(parameter)
            .and(velocity)
            .and(gradient)
            .for_each(|p, v, &g| {
                *v = decay * *v + (1.0 - decay) * g;
                *p -= learning_rate * *v;
            });
    }
}
