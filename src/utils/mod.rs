//! Shared utilities: seeded RNG and activation helpers.

pub mod activations;
pub mod rng;

pub use activations::{relu, relu_inplace, relu_mask};
pub use rng::SimpleRng;
