//! Mini-batch training loop and prediction output
//!
//! Each epoch shuffles the training rows, then runs forward, backward and an optimizer
//! step per batch. The reported epoch loss is the sum of the per-batch composite losses.

use ndarray::{Array2, Axis};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

use crate::data::Dataset;
use crate::error::{NetworkError, Result};
use crate::loss::{composite_loss, root_mean_squared_error};
use crate::network::Network;
use crate::optimizers::Optimizer;
use crate::utils::SimpleRng;

/// Loop settings that do not belong to the network or the optimizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainSettings {
    pub lambda: f64,
    pub batch_size: usize,
    pub max_epochs: usize,
}

/// Loss and wall time of one finished epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochReport {
    /// 1-based epoch number
    pub epoch: usize,
    pub loss: f64,
    pub seconds: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    pub epochs: Vec<EpochReport>,
    /// RMSE on the dev split after the last epoch, when one was given.
    pub dev_rmse: Option<f64>,
}

impl TrainingReport {
    pub fn final_loss(&self) -> Option<f64> {
        self.epochs.last().map(|report| report.loss)
    }
}

/// Decides after each epoch whether training ends early.
pub trait EarlyStopping {
    fn should_stop(&mut self, report: &EpochReport) -> bool;
}

/// Runs every epoch.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverStop;

impl EarlyStopping for NeverStop {
    fn should_stop(&mut self, _report: &EpochReport) -> bool {
        false
    }
}

/// Trains `net` on `train` and evaluates RMSE on `dev` afterwards.
///
/// The optimizer must already be initialized for the network's topology.
pub fn train(
    net: &mut Network,
    optimizer: &mut Optimizer,
    train: &Dataset,
    dev: Option<&Dataset>,
    settings: &TrainSettings,
    rng: &mut SimpleRng,
    stopping: &mut dyn EarlyStopping,
) -> Result<TrainingReport> {
    if settings.batch_size == 0 {
        return Err(NetworkError::config("batch_size must be at least 1"));
    }
    if train.is_empty() {
        return Err(NetworkError::shape("training set is empty"));
    }

    let m = train.len();
    let mut order: Vec<usize> = (0..m).collect();
    let mut epochs = Vec::with_capacity(settings.max_epochs);

    info!(
        samples = m,
        batch_size = settings.batch_size,
        max_epochs = settings.max_epochs,
        optimizer = optimizer.kind().name(),
        "starting training"
    );

    for epoch in 1..=settings.max_epochs {
        let start = Instant::now();
        rng.shuffle_usize(&mut order);

        let mut epoch_loss = 0.0;
        for (batch, rows) in order.chunks(settings.batch_size).enumerate() {
            let input = train.features.select(Axis(0), rows);
            let target = train.targets.select(Axis(0), rows);

            let pred = net.forward(&input)?;
            let grads = net.backward(&input, &target, settings.lambda)?;
            optimizer.step(net.layers_mut(), &grads)?;

            let batch_loss = composite_loss(&target, &pred, net.layers(), settings.lambda)?;
            debug!(epoch, batch, loss = batch_loss, "batch done");
            epoch_loss += batch_loss;
        }

        let report = EpochReport {
            epoch,
            loss: epoch_loss,
            seconds: start.elapsed().as_secs_f64(),
        };
        info!(epoch, loss = report.loss, seconds = report.seconds, "epoch done");
        epochs.push(report);

        if stopping.should_stop(&report) {
            info!(epoch, "stopping early");
            break;
        }
    }

    let dev_rmse = match dev {
        Some(dev) => {
            let pred = net.predict(&dev.features)?;
            let rmse = root_mean_squared_error(&dev.targets, &pred)?;
            info!(rmse, "dev evaluation");
            Some(rmse)
        }
        None => None,
    };

    Ok(TrainingReport { epochs, dev_rmse })
}

/// Writes predictions as `Id,Predictions` rows, ids starting at 1.
pub fn write_predictions(path: impl AsRef<Path>, predictions: &Array2<f64>) -> Result<()> {
    if predictions.ncols() != 1 {
        return Err(NetworkError::shape(format!(
            "predictions must have one column, got {}",
            predictions.ncols()
        )));
    }
    let mut writer = csv::Writer::from_path(path.as_ref())?;
    writer.write_record(["Id", "Predictions"])?;
    for (i, value) in predictions.column(0).iter().enumerate() {
        writer.write_record([(i + 1).to_string(), value.to_string()])?;
    }
    writer.flush()?;
    info!(path = %path.as_ref().display(), rows = predictions.nrows(), "wrote predictions");
    Ok(())
}

/// Writes one `epoch,loss,seconds` line per epoch.
pub fn write_loss_history(path: impl AsRef<Path>, epochs: &[EpochReport]) -> Result<()> {
    let mut file = BufWriter::new(File::create(path.as_ref())?);
    writeln!(file, "epoch,loss,seconds")?;
    for report in epochs {
        writeln!(file, "{},{},{}", report.epoch, report.loss, report.seconds)?;
    }
    file.flush()?;
    Ok(())
}
