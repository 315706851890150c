use std::env;
use std::time::Instant;

use rust_neural_regression::config::{load_config, TrainingConfig};
use rust_neural_regression::data::{load_features, Dataset, FeatureScaler};
use rust_neural_regression::error::{NetworkError, Result};
use rust_neural_regression::network::Network;
use rust_neural_regression::optimizers::Optimizer;
use rust_neural_regression::training::{
    train, write_loss_history, write_predictions, NeverStop, TrainSettings,
};
use rust_neural_regression::utils::SimpleRng;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// Usage: regression_train [config.json]
// Without an argument the built-in defaults are used with data under ./data.
fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    let config = match env::args().nth(1) {
        Some(path) => load_config(&path)?,
        None => TrainingConfig {
            train_path: Some("./data/train.csv".to_string()),
            dev_path: Some("./data/dev.csv".to_string()),
            test_path: Some("./data/test.csv".to_string()),
            ..TrainingConfig::default()
        },
    };
    let program_start = Instant::now();

    let train_path = config
        .train_path
        .as_deref()
        .ok_or_else(|| NetworkError::Config("train_path is required".to_string()))?;
    let raw_train = Dataset::load_labeled(train_path)?;
    let mut scaler = FeatureScaler::new();
    let train_data = Dataset::new(scaler.fit_transform(&raw_train.features)?, raw_train.targets)?;

    let dev_data = match config.dev_path.as_deref() {
        Some(path) => {
            let raw = Dataset::load_labeled(path)?;
            Some(Dataset::new(scaler.transform(&raw.features)?, raw.targets)?)
        }
        None => None,
    };

    let topology = config.topology()?;
    let mut rng = SimpleRng::new(config.seed);
    let mut net = Network::with_topology(&topology, &mut rng);
    let mut optimizer = Optimizer::new(config.learning_rate, config.optimizer_kind()?)?;
    optimizer.init(&topology)?;
    info!(
        layers = net.layer_count(),
        parameters = net.parameter_count(),
        optimizer = optimizer.kind().name(),
        "network ready"
    );

    let settings = TrainSettings {
        lambda: config.lambda,
        batch_size: config.batch_size,
        max_epochs: config.max_epochs,
    };
    let report = train(
        &mut net,
        &mut optimizer,
        &train_data,
        dev_data.as_ref(),
        &settings,
        &mut rng,
        &mut NeverStop,
    )?;

    if let Some(rmse) = report.dev_rmse {
        info!(rmse, "final dev RMSE");
    }
    if let Some(path) = config.loss_history_path.as_deref() {
        write_loss_history(path, &report.epochs)?;
    }

    if let Some(path) = config.test_path.as_deref() {
        let test_features = scaler.transform(&load_features(path)?)?;
        let predictions = net.predict(&test_features)?;
        write_predictions(&config.predictions_path, &predictions)?;
    }

    info!(
        seconds = program_start.elapsed().as_secs_f64(),
        "total program time"
    );
    Ok(())
}
