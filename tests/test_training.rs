// End-to-end tests for the training loop: CSV in, predictions and loss history out.

use ndarray::{Array2, Axis};
use rust_neural_regression::data::{load_features, Dataset, FeatureScaler};
use rust_neural_regression::network::Network;
use rust_neural_regression::optimizers::{Optimizer, OptimizerKind};
use rust_neural_regression::params::Topology;
use rust_neural_regression::loss::root_mean_squared_error;
use rust_neural_regression::training::{
    train, write_loss_history, write_predictions, NeverStop, TrainSettings, TrainingReport,
};
use rust_neural_regression::utils::SimpleRng;
use std::fmt::Write as _;
use std::fs;
use tempfile::tempdir;

const FEATURES: usize = 4;

fn synthetic(rows: usize, seed: u64) -> (Array2<f64>, Array2<f64>) {
    let mut rng = SimpleRng::new(seed);
    let x = rng.uniform_array(rows, FEATURES, -2.0, 2.0);
    let y = x
        .map_axis(Axis(1), |row| 1990.0 + 3.0 * row[0] - 2.0 * row[1] + row[2] * row[3])
        .insert_axis(Axis(1));
    (x, y)
}

fn to_csv(x: &Array2<f64>, y: Option<&Array2<f64>>) -> String {
    let mut out = String::new();
    let mut header: Vec<String> = (1..=FEATURES).map(|i| format!("f{}", i)).collect();
    if y.is_some() {
        header.insert(0, "year".to_string());
    }
    writeln!(out, "{}", header.join(",")).unwrap();
    for (i, row) in x.outer_iter().enumerate() {
        let mut fields: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        if let Some(y) = y {
            fields.insert(0, y[[i, 0]].to_string());
        }
        writeln!(out, "{}", fields.join(",")).unwrap();
    }
    out
}

fn run(
    seed: u64,
    kind: OptimizerKind,
    lr: f64,
    train_data: &Dataset,
    dev: &Dataset,
) -> TrainingReport {
    let topology = Topology::new(FEATURES, 1, 8).unwrap();
    let mut rng = SimpleRng::new(seed);
    let mut net = Network::with_topology(&topology, &mut rng);
    let mut optimizer = Optimizer::new(lr, kind).unwrap();
    optimizer.init(&topology).unwrap();
    let settings = TrainSettings {
        lambda: 0.0,
        batch_size: 16,
        max_epochs: 40,
    };
    train(
        &mut net,
        &mut optimizer,
        train_data,
        Some(dev),
        &settings,
        &mut rng,
        &mut NeverStop,
    )
    .unwrap()
}

#[test]
fn test_training_reduces_epoch_loss() {
    let (x, y) = synthetic(64, 1);
    let (dev_x, dev_y) = synthetic(32, 2);
    let train_data = Dataset::new(x, y).unwrap();
    let dev = Dataset::new(dev_x, dev_y).unwrap();

    let report = run(
        3,
        OptimizerKind::Adam {
            beta1: 0.9,
            beta2: 0.999,
        },
        0.02,
        &train_data,
        &dev,
    );

    assert_eq!(report.epochs.len(), 40);
    assert_eq!(report.epochs[0].epoch, 1);
    let first = report.epochs[0].loss;
    let last = report.final_loss().unwrap();
    assert!(last < first, "epoch loss went from {} to {}", first, last);

    let rmse = report.dev_rmse.unwrap();
    assert!(rmse.is_finite() && rmse >= 0.0);
}

#[test]
fn test_training_is_deterministic_for_a_seed() {
    let (x, y) = synthetic(48, 5);
    let (dev_x, dev_y) = synthetic(16, 6);
    let train_data = Dataset::new(x, y).unwrap();
    let dev = Dataset::new(dev_x, dev_y).unwrap();
    let kind = OptimizerKind::Adam {
        beta1: 0.9,
        beta2: 0.999,
    };

    let a = run(9, kind, 0.01, &train_data, &dev);
    let b = run(9, kind, 0.01, &train_data, &dev);

    let losses = |r: &TrainingReport| r.epochs.iter().map(|e| e.loss).collect::<Vec<_>>();
    assert_eq!(losses(&a), losses(&b));
    assert_eq!(a.dev_rmse, b.dev_rmse);
}

#[test]
fn test_dev_rmse_matches_single_pass_prediction() {
    let (x, y) = synthetic(60, 13);
    let (dev_x, dev_y) = synthetic(40, 14);
    let train_data = Dataset::new(x, y).unwrap();
    let dev = Dataset::new(dev_x, dev_y).unwrap();

    let topology = Topology::new(FEATURES, 2, 6).unwrap();
    let mut rng = SimpleRng::new(15);
    let mut net = Network::with_topology(&topology, &mut rng);
    let mut optimizer = Optimizer::new(0.01, OptimizerKind::Momentum { decay: 0.9 }).unwrap();
    optimizer.init(&topology).unwrap();
    let settings = TrainSettings {
        lambda: 0.0,
        batch_size: 16,
        max_epochs: 5,
    };
    let report = train(
        &mut net,
        &mut optimizer,
        &train_data,
        Some(&dev),
        &settings,
        &mut rng,
        &mut NeverStop,
    )
    .unwrap();

    let whole = net.predict(&dev.features).unwrap();
    let expected = root_mean_squared_error(&dev.targets, &whole).unwrap();
    assert_eq!(report.dev_rmse, Some(expected));
}

#[test]
fn test_pipeline_from_csv_files() {
    let dir = tempdir().unwrap();
    let (x, y) = synthetic(40, 10);
    let (dev_x, dev_y) = synthetic(12, 11);
    let (test_x, _) = synthetic(7, 12);
    fs::write(dir.path().join("train.csv"), to_csv(&x, Some(&y))).unwrap();
    fs::write(dir.path().join("dev.csv"), to_csv(&dev_x, Some(&dev_y))).unwrap();
    fs::write(dir.path().join("test.csv"), to_csv(&test_x, None)).unwrap();

    let raw_train = Dataset::load_labeled(dir.path().join("train.csv")).unwrap();
    assert_eq!(raw_train.num_features(), FEATURES);
    let mut scaler = FeatureScaler::new();
    let scaled = scaler.fit_transform(&raw_train.features).unwrap();
    let train_data = Dataset::new(scaled, raw_train.targets).unwrap();
    let raw_dev = Dataset::load_labeled(dir.path().join("dev.csv")).unwrap();
    let dev = Dataset::new(scaler.transform(&raw_dev.features).unwrap(), raw_dev.targets).unwrap();

    let topology = Topology::new(FEATURES, 2, 5).unwrap();
    let mut rng = SimpleRng::new(4);
    let mut net = Network::with_topology(&topology, &mut rng);
    let mut optimizer = Optimizer::new(0.01, OptimizerKind::RmsProp { decay: 0.9 }).unwrap();
    optimizer.init(&topology).unwrap();
    let settings = TrainSettings {
        lambda: 0.001,
        batch_size: 8,
        max_epochs: 3,
    };
    let report = train(
        &mut net,
        &mut optimizer,
        &train_data,
        Some(&dev),
        &settings,
        &mut rng,
        &mut NeverStop,
    )
    .unwrap();

    let test_features = scaler
        .transform(&load_features(dir.path().join("test.csv")).unwrap())
        .unwrap();
    let predictions = net.predict(&test_features).unwrap();
    assert_eq!(predictions.dim(), (7, 1));

    let predictions_path = dir.path().join("predictions.csv");
    write_predictions(&predictions_path, &predictions).unwrap();
    let written = fs::read_to_string(&predictions_path).unwrap();
    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(lines.len(), 8);
    assert_eq!(lines[0], "Id,Predictions");
    assert!(lines[1].starts_with("1,"));
    assert!(lines[7].starts_with("7,"));
    let first: f64 = lines[1].split(',').nth(1).unwrap().parse().unwrap();
    assert_eq!(first, predictions[[0, 0]]);

    let history_path = dir.path().join("loss.csv");
    write_loss_history(&history_path, &report.epochs).unwrap();
    let history = fs::read_to_string(&history_path).unwrap();
    let lines: Vec<&str> = history.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "epoch,loss,seconds");
    assert!(lines[3].starts_with("3,"));
}
