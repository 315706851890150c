//! Training configuration
//!
//! Hyperparameters and data locations are read from a JSON file. Every field has a
//! default, so a config only needs to name what it changes.
//!
//! # Example
//!
//! ```json
//! {
//!   "num_layers": 1,
//!   "num_units": 64,
//!   "optimizer": "rmsprop",
//!   "decay": 0.999,
//!   "learning_rate": 0.005,
//!   "batch_size": 256,
//!   "max_epochs": 150,
//!   "train_path": "data/train.csv",
//!   "dev_path": "data/dev.csv",
//!   "test_path": "data/test.csv"
//! }
//! ```

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{NetworkError, Result};
use crate::optimizers::OptimizerKind;
use crate::params::{Topology, NUM_FEATURES};

/// Hyperparameters and file locations for one training run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Number of hidden layers (at least 1)
    pub num_layers: usize,
    /// Units per hidden layer (at least 1)
    pub num_units: usize,
    /// Width of the raw input
    pub input_features: usize,
    pub learning_rate: f64,
    /// L2 regularization coefficient
    pub lambda: f64,
    pub batch_size: usize,
    pub max_epochs: usize,
    /// "sgd", "momentum", "rmsprop" or "adam"
    pub optimizer: String,
    /// Decay for momentum and RMSProp
    pub decay: f64,
    pub beta1: f64,
    pub beta2: f64,
    /// Seed for parameter initialization and shuffling
    pub seed: u64,
    pub train_path: Option<String>,
    pub dev_path: Option<String>,
    pub test_path: Option<String>,
    pub predictions_path: String,
    pub loss_history_path: Option<String>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            num_layers: 4,
            num_units: 100,
            input_features: NUM_FEATURES,
            learning_rate: 0.002,
            lambda: 0.0,
            batch_size: 64,
            max_epochs: 200,
            optimizer: "adam".to_string(),
            decay: 0.9,
            beta1: 0.9,
            beta2: 0.999,
            seed: 42,
            train_path: None,
            dev_path: None,
            test_path: None,
            predictions_path: "predictions.csv".to_string(),
            loss_history_path: None,
        }
    }
}

impl TrainingConfig {
    /// Network topology described by this config.
    pub fn topology(&self) -> Result<Topology> {
        Topology::new(self.input_features, self.num_layers, self.num_units)
    }

    /// Optimizer rule described by this config.
    pub fn optimizer_kind(&self) -> Result<OptimizerKind> {
        OptimizerKind::from_name(&self.optimizer, self.decay, self.beta1, self.beta2)
    }
}

/// Loads a training configuration from a JSON file and validates it.
///
/// # Examples
///
/// ```no_run
/// use rust_neural_regression::config::load_config;
///
/// let cfg = load_config("config/adam.json").unwrap();
/// assert_eq!(cfg.optimizer, "adam");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<TrainingConfig> {
    let contents = fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parses and validates a JSON configuration string.
pub fn parse_config(contents: &str) -> Result<TrainingConfig> {
    let config: TrainingConfig = serde_json::from_str(contents)?;
    validate_config(&config)?;
    Ok(config)
}

/// Rejects values the network or optimizer would refuse later.
pub fn validate_config(config: &TrainingConfig) -> Result<()> {
    config.topology()?;
    config.optimizer_kind()?;

    if !(config.learning_rate > 0.0 && config.learning_rate.is_finite()) {
        return Err(NetworkError::config("learning_rate must be positive"));
    }
    if !(config.lambda >= 0.0 && config.lambda.is_finite()) {
        return Err(NetworkError::config("lambda must be non-negative"));
    }
    if config.batch_size == 0 {
        return Err(NetworkError::config("batch_size must be at least 1"));
    }
    for (name, value) in [
        ("decay", config.decay),
        ("beta1", config.beta1),
        ("beta2", config.beta2),
    ] {
        if !(0.0..1.0).contains(&value) {
            return Err(NetworkError::config(format!(
                "{} must be in [0, 1), got {}",
                name, value
            )));
        }
    }
    Ok(())
}
