//! Rust Neural Regression Library
//!
//! A small feedforward regression network trained with mini-batch gradient methods.
//! Every layer computes `h = a·W`, standardizes `h` with its batch mean and standard
//! deviation, applies a learnable scale and shift, then ReLU. The last layer is linear
//! and emits one value per row.
//!
//! # Modules
//!
//! - `params`: topology and parameter sets shared by gradients and optimizer state
//! - `layers`: the normalized layer and its forward caches
//! - `network`: layer stack with forward and backward passes
//! - `optimizers`: gradient descent, momentum, RMSProp and Adam
//! - `loss`: MSE, L2 penalty, RMSE
//! - `data`: CSV loading and feature scaling
//! - `training`: mini-batch loop and prediction output
//! - `config`: JSON training configuration
//! - `utils`: seeded RNG and activations

pub mod config;
pub mod data;
pub mod error;
pub mod layers;
pub mod loss;
pub mod network;
pub mod optimizers;
pub mod params;
pub mod training;
pub mod utils;

pub use error::{NetworkError, Result};
pub use network::Network;
pub use optimizers::{Optimizer, OptimizerKind};
pub use params::{Gradients, ParameterSet, Topology};
