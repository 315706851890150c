//! Loss functions and metrics
//!
//! The training objective is mean squared error plus an L2 penalty over every
//! parameter (weights, gammas and betas). RMSE is reported on held-out data.

use ndarray::Array2;

use crate::error::{NetworkError, Result};
use crate::layers::NormalizedLayer;
use crate::params::Family;

/// Base loss selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Loss {
    MeanSquaredError,
    /// Placeholder for a classification head; evaluating it fails.
    CrossEntropy,
}

impl Loss {
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "mse" | "mean_squared_error" => Ok(Loss::MeanSquaredError),
            "cross_entropy" | "crossentropy" => Ok(Loss::CrossEntropy),
            _ => Err(NetworkError::config(format!("unknown loss '{}'", name))),
        }
    }

    pub fn evaluate(&self, y: &Array2<f64>, y_hat: &Array2<f64>) -> Result<f64> {
        match self {
            Loss::MeanSquaredError => mean_squared_error(y, y_hat),
            Loss::CrossEntropy => cross_entropy(y, y_hat),
        }
    }
}

fn check_same_shape(y: &Array2<f64>, y_hat: &Array2<f64>) -> Result<()> {
    if y.dim() != y_hat.dim() {
        return Err(NetworkError::shape(format!(
            "targets are {:?} but predictions are {:?}",
            y.dim(),
            y_hat.dim()
        )));
    }
    if y.is_empty() {
        return Err(NetworkError::shape("cannot compute a loss over zero samples"));
    }
    Ok(())
}

/// `mean((y - y_hat)²)`.
pub fn mean_squared_error(y: &Array2<f64>, y_hat: &Array2<f64>) -> Result<f64> {
    check_same_shape(y, y_hat)?;
    let sum: f64 = y
        .iter()
        .zip(y_hat.iter())
        .map(|(a, b)| (a - b) * (a - b))
        .sum();
    Ok(sum / y.len() as f64)
}

/// Sum of squares of every weight, gamma and beta in every layer.
pub fn l2_regularization(layers: &[NormalizedLayer]) -> f64 {
    layers
        .iter()
        .flat_map(|layer| Family::ALL.map(|family| layer.parameter(family)))
        .map(|array| array.iter().map(|v| v * v).sum::<f64>())
        .sum()
}

/// `mean_squared_error + lambda * l2_regularization`.
pub fn composite_loss(
    y: &Array2<f64>,
    y_hat: &Array2<f64>,
    layers: &[NormalizedLayer],
    lambda: f64,
) -> Result<f64> {
    Ok(mean_squared_error(y, y_hat)? + lambda * l2_regularization(layers))
}

/// Square root of the mean squared error.
pub fn root_mean_squared_error(y: &Array2<f64>, y_hat: &Array2<f64>) -> Result<f64> {
    Ok(mean_squared_error(y, y_hat)?.sqrt())
}

/// Classification loss; the network only has a regression head.
pub fn cross_entropy(_y: &Array2<f64>, _y_hat: &Array2<f64>) -> Result<f64> {
    Err(NetworkError::NotImplemented(
        "cross-entropy loss requires a classification head",
    ))
}
