//! Normalized fully-connected layer
//!
//! A normalized layer applies a bias-free linear map, standardizes each output
//! feature over the batch, then rescales with learned `gamma`/`beta` and applies ReLU:
//!
//! ```text
//! h   = a · W
//! b   = (h - mean(h)) / (std(h) + 1e-8)
//! out = relu(b * gammaᵀ + betaᵀ)
//! ```
//!
//! Statistics always come from the current batch; there is no running estimate and no
//! separate inference mode.
//!
//! The output layer is a different capability: it emits `h` unchanged, and the value
//! cached as `b` is `h` itself rather than the standardized value. The backward pass
//! depends on that, so the distinction is carried explicitly by [`LayerKind`].

use ndarray::{Array2, ArrayViewMut2, Axis};

use crate::error::{NetworkError, Result};
use crate::params::Family;
use crate::utils::{relu_inplace, SimpleRng};

/// Added to the batch standard deviation before dividing.
pub const STD_EPSILON: f64 = 1e-8;

/// Whether a layer is a hidden layer or the linear output layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    /// Standardize, scale/shift, ReLU.
    Hidden,
    /// Emit the linear output unchanged.
    Output,
}

/// Per-feature batch statistics of a layer's linear output, each `1 × units`.
///
/// `std` already includes [`STD_EPSILON`].
#[derive(Debug, Clone, PartialEq)]
pub struct Standardization {
    pub mean: Array2<f64>,
    pub std: Array2<f64>,
}

impl Standardization {
    /// Mean and population standard deviation (plus epsilon) along the batch axis.
    pub fn of_batch(h: &Array2<f64>) -> Result<Self> {
        let mean = h
            .mean_axis(Axis(0))
            .ok_or_else(|| NetworkError::shape("cannot standardize an empty batch"))?
            .insert_axis(Axis(0));
        let std = (h.std_axis(Axis(0), 0.0) + STD_EPSILON).insert_axis(Axis(0));
        Ok(Self { mean, std })
    }

    pub fn units(&self) -> usize {
        self.mean.ncols()
    }
}

/// Values cached by a forward pass through one layer.
#[derive(Debug, Clone)]
pub struct LayerCache {
    /// Layer input `a` (`m × inputs`).
    pub input: Array2<f64>,
    /// Linear output `h = a · W` (`m × units`).
    pub linear: Array2<f64>,
    /// Batch statistics of `linear`.
    pub statistics: Standardization,
    /// Standardized `b` for hidden layers; equal to `linear` for the output layer.
    pub standardized: Array2<f64>,
    /// Emitted activation (`m × units`).
    pub output: Array2<f64>,
}

/// Linear map followed by batch standardization, learned scale/shift and ReLU.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedLayer {
    kind: LayerKind,
    weights: Array2<f64>,
    gamma: Array2<f64>,
    beta: Array2<f64>,
}

impl NormalizedLayer {
    /// Builds a layer from explicit parameters.
    ///
    /// `weights` is `inputs × units`; `gamma` and `beta` must both be `units × 1`.
    pub fn new(
        kind: LayerKind,
        weights: Array2<f64>,
        gamma: Array2<f64>,
        beta: Array2<f64>,
    ) -> Result<Self> {
        let units = weights.ncols();
        if weights.nrows() == 0 || units == 0 {
            return Err(NetworkError::shape(format!(
                "weight matrix must be non-empty, got {:?}",
                weights.dim()
            )));
        }
        for (name, column) in [("gamma", &gamma), ("beta", &beta)] {
            if column.dim() != (units, 1) {
                return Err(NetworkError::shape(format!(
                    "{} must be {}x1 to match the weight columns, got {:?}",
                    name,
                    units,
                    column.dim()
                )));
            }
        }
        Ok(Self {
            kind,
            weights,
            gamma,
            beta,
        })
    }

    pub fn hidden(weights: Array2<f64>, gamma: Array2<f64>, beta: Array2<f64>) -> Result<Self> {
        Self::new(LayerKind::Hidden, weights, gamma, beta)
    }

    pub fn output(weights: Array2<f64>, gamma: Array2<f64>, beta: Array2<f64>) -> Result<Self> {
        Self::new(LayerKind::Output, weights, gamma, beta)
    }

    /// Layer with every parameter drawn independently from U[-1, 1].
    ///
    /// Draw order is weights, then gamma, then beta, each row-major.
    pub fn random(kind: LayerKind, inputs: usize, units: usize, rng: &mut SimpleRng) -> Self {
        let weights = rng.uniform_array(inputs, units, -1.0, 1.0);
        let gamma = rng.uniform_array(units, 1, -1.0, 1.0);
        let beta = rng.uniform_array(units, 1, -1.0, 1.0);
        Self {
            kind,
            weights,
            gamma,
            beta,
        }
    }

    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    pub fn is_output(&self) -> bool {
        self.kind == LayerKind::Output
    }

    pub fn input_size(&self) -> usize {
        self.weights.nrows()
    }

    pub fn units(&self) -> usize {
        self.weights.ncols()
    }

    /// Weights plus gamma plus beta.
    pub fn parameter_count(&self) -> usize {
        self.weights.len() + self.gamma.len() + self.beta.len()
    }

    pub fn weights(&self) -> &Array2<f64> {
        &self.weights
    }

    pub fn gamma(&self) -> &Array2<f64> {
        &self.gamma
    }

    pub fn beta(&self) -> &Array2<f64> {
        &self.beta
    }

    pub fn parameter(&self, family: Family) -> &Array2<f64> {
        match family {
            Family::Weights => &self.weights,
            Family::Gammas => &self.gamma,
            Family::Betas => &self.beta,
        }
    }

    /// Element-wise mutable view for optimizers. The view cannot change the array's shape.
    pub fn parameter_mut(&mut self, family: Family) -> ArrayViewMut2<'_, f64> {
        match family {
            Family::Weights => self.weights.view_mut(),
            Family::Gammas => self.gamma.view_mut(),
            Family::Betas => self.beta.view_mut(),
        }
    }

    /// Forward pass using statistics of the current batch.
    pub fn forward(&self, input: &Array2<f64>) -> Result<LayerCache> {
        let linear = self.linear(input)?;
        let statistics = Standardization::of_batch(&linear)?;
        Ok(self.finish(input, linear, statistics))
    }

    /// Forward pass with externally supplied statistics instead of batch statistics.
    pub fn forward_with_statistics(
        &self,
        input: &Array2<f64>,
        statistics: &Standardization,
    ) -> Result<LayerCache> {
        if statistics.units() != self.units() || statistics.std.dim() != statistics.mean.dim() {
            return Err(NetworkError::shape(format!(
                "statistics cover {} features, layer has {} units",
                statistics.units(),
                self.units()
            )));
        }
        let linear = self.linear(input)?;
        Ok(self.finish(input, linear, statistics.clone()))
    }

    fn linear(&self, input: &Array2<f64>) -> Result<Array2<f64>> {
        if input.ncols() != self.input_size() {
            return Err(NetworkError::shape(format!(
                "layer expects {} input features, got {}",
                self.input_size(),
                input.ncols()
            )));
        }
        if input.nrows() == 0 {
            return Err(NetworkError::shape("batch must contain at least one row"));
        }
        Ok(input.dot(&self.weights))
    }

    fn finish(
        &self,
        input: &Array2<f64>,
        linear: Array2<f64>,
        statistics: Standardization,
    ) -> LayerCache {
        match self.kind {
            LayerKind::Hidden => {
                let standardized = (&linear - &statistics.mean) / &statistics.std;
                let mut output = &standardized * &self.gamma.t() + &self.beta.t();
                relu_inplace(&mut output);
                LayerCache {
                    input: input.clone(),
                    linear,
                    statistics,
                    standardized,
                    output,
                }
            }
            LayerKind::Output => LayerCache {
                input: input.clone(),
                standardized: linear.clone(),
                output: linear.clone(),
                linear,
                statistics,
            },
        }
    }
}
