//! Activation functions for the hidden layers
//!
//! Hidden layers use ReLU; the output layer is linear.

use ndarray::Array2;

/// ReLU applied element-wise, returning a new array.
pub fn relu(x: &Array2<f64>) -> Array2<f64> {
    x.mapv(|v| v.max(0.0))
}

/// ReLU applied in place.
pub fn relu_inplace(x: &mut Array2<f64>) {
    x.mapv_inplace(|v| v.max(0.0));
}

/// ReLU derivative mask: 1.0 where `x > 0`, otherwise 0.0.
///
/// Since `relu(z) > 0` exactly when `z > 0`, the mask can be taken from either the
/// pre-activation or the emitted activation.
pub fn relu_mask(x: &Array2<f64>) -> Array2<f64> {
    x.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 })
}
