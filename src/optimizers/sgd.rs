//! Plain gradient descent
//!
//! Stateless update: `parameter = parameter - learning_rate * gradient`

use ndarray::{Array2, ArrayViewMut2, Zip};

/// Applies one gradient-descent update in place.
///
/// `parameter` and `gradient` must have the same shape.
pub fn gradient_descent(
    learning_rate: f64,
    parameter: ArrayViewMut2<f64>,
    gradient: &Array2<f64>,
) {
    Zip::from(parameter)
        .and(gradient)
        .for_each(|p, &g| *p -= learning_rate * g);
}
