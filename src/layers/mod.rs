//! Layer types for the regression network
//!
//! The network is a stack of [`NormalizedLayer`]s: hidden layers standardize, rescale and
//! apply ReLU, while the single output layer is linear.

pub mod normalized;

pub use normalized::{LayerCache, LayerKind, NormalizedLayer, Standardization, STD_EPSILON};
