//! CSV datasets and feature scaling
//!
//! Labeled files carry the target in the first column and the features after it.
//! Unlabeled files (the test split) carry features only. Both start with a header row.

use csv::ReaderBuilder;
use ndarray::{Array2, Axis};
use std::fs::File;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{NetworkError, Result};

/// Features and targets of one labeled split.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    /// `m × d` feature matrix
    pub features: Array2<f64>,
    /// `m × 1` target column
    pub targets: Array2<f64>,
}

impl Dataset {
    pub fn new(features: Array2<f64>, targets: Array2<f64>) -> Result<Self> {
        if targets.ncols() != 1 || targets.nrows() != features.nrows() {
            return Err(NetworkError::shape(format!(
                "targets are {:?} for {} feature rows",
                targets.dim(),
                features.nrows()
            )));
        }
        Ok(Self { features, targets })
    }

    /// Reads a CSV whose first column is the target.
    pub fn load_labeled(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let table = read_table(path)?;
        if table.ncols() < 2 {
            return Err(NetworkError::shape(format!(
                "{} needs a target column and at least one feature column",
                path.display()
            )));
        }
        let targets = table.slice(ndarray::s![.., 0..1]).to_owned();
        let features = table.slice(ndarray::s![.., 1..]).to_owned();
        info!(
            path = %path.display(),
            rows = features.nrows(),
            features = features.ncols(),
            "loaded labeled dataset"
        );
        Self::new(features, targets)
    }

    pub fn len(&self) -> usize {
        self.features.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.features.nrows() == 0
    }

    pub fn num_features(&self) -> usize {
        self.features.ncols()
    }
}

/// Reads a feature-only CSV.
pub fn load_features(path: impl AsRef<Path>) -> Result<Array2<f64>> {
    let path = path.as_ref();
    let table = read_table(path)?;
    info!(
        path = %path.display(),
        rows = table.nrows(),
        features = table.ncols(),
        "loaded feature matrix"
    );
    Ok(table)
}

fn read_table(path: &Path) -> Result<Array2<f64>> {
    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(file);

    let mut values = Vec::new();
    let mut columns: Option<usize> = None;
    let mut rows = 0;
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        match columns {
            None => columns = Some(record.len()),
            Some(expected) if expected != record.len() => {
                return Err(NetworkError::shape(format!(
                    "row {} of {} has {} fields, expected {}",
                    row + 1,
                    path.display(),
                    record.len(),
                    expected
                )));
            }
            Some(_) => {}
        }
        for (column, field) in record.iter().enumerate() {
            let value: f64 = field.trim().parse().map_err(|_| {
                NetworkError::Parse(format!(
                    "{}: row {}, column {}: '{}' is not a number",
                    path.display(),
                    row + 1,
                    column + 1,
                    field
                ))
            })?;
            values.push(value);
        }
        rows += 1;
    }

    let columns = columns.unwrap_or(0);
    Array2::from_shape_vec((rows, columns), values)
        .map_err(|e| NetworkError::shape(format!("{}: {}", path.display(), e)))
}

/// Per-column standardization fitted on the training features.
///
/// Uses the sample standard deviation. Columns with zero spread are only centered.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureScaler {
    mean: Option<Array2<f64>>,
    std: Option<Array2<f64>>,
}

impl FeatureScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fitted(&self) -> bool {
        self.mean.is_some()
    }

    /// `1 × d` column means, once fitted.
    pub fn mean(&self) -> Option<&Array2<f64>> {
        self.mean.as_ref()
    }

    /// `1 × d` column divisors, once fitted.
    pub fn std(&self) -> Option<&Array2<f64>> {
        self.std.as_ref()
    }

    pub fn fit(&mut self, features: &Array2<f64>) -> Result<()> {
        if features.nrows() < 2 {
            return Err(NetworkError::shape(
                "fitting a scaler needs at least two rows",
            ));
        }
        let mean = features.sum_axis(Axis(0)) / features.nrows() as f64;
        let mut std = features.std_axis(Axis(0), 1.0);

        let mut constant = 0;
        std.mapv_inplace(|s| {
            if s > 0.0 {
                s
            } else {
                constant += 1;
                1.0
            }
        });
        if constant > 0 {
            warn!(columns = constant, "constant feature columns are centered only");
        }

        self.mean = Some(mean.insert_axis(Axis(0)));
        self.std = Some(std.insert_axis(Axis(0)));
        Ok(())
    }

    pub fn transform(&self, features: &Array2<f64>) -> Result<Array2<f64>> {
        let (mean, std) = match (&self.mean, &self.std) {
            (Some(mean), Some(std)) => (mean, std),
            _ => return Err(NetworkError::state("scaler used before fit")),
        };
        if features.ncols() != mean.ncols() {
            return Err(NetworkError::shape(format!(
                "scaler was fitted on {} columns, got {}",
                mean.ncols(),
                features.ncols()
            )));
        }
        Ok((features - mean) / std)
    }

    pub fn fit_transform(&mut self, features: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(features)?;
        self.transform(features)
    }
}
