//! Feedforward regression network
//!
//! A [`Network`] is an ordered stack of hidden [`NormalizedLayer`]s followed by one linear
//! output layer with a single unit. `forward` caches every intermediate value it needs,
//! and `backward` walks the stack in reverse to produce weight, gamma and beta gradients.
//!
//! The backward pass treats each layer's batch mean and standard deviation as constants.
//! It is not full batch-normalization backpropagation, and the gradients it produces
//! match finite differences only when the batch statistics are held fixed (see
//! [`Network::predict_with_statistics`]).
//!
//! # Example
//!
//! ```ignore
//! let mut rng = SimpleRng::new(42);
//! let mut net = Network::new(2, 64, &mut rng)?;
//! let pred = net.forward(&batch_input)?;
//! let grads = net.backward(&batch_input, &batch_target, 0.0)?;
//! optimizer.step(net.layers_mut(), &grads)?;
//! ```

use ndarray::{Array2, Axis};

use crate::error::{NetworkError, Result};
use crate::layers::{LayerCache, LayerKind, NormalizedLayer, Standardization};
use crate::params::{Gradients, LayerShape, Topology};
use crate::utils::{relu_mask, SimpleRng};

/// Stack of normalized layers ending in a linear scalar output.
#[derive(Debug, Clone)]
pub struct Network {
    layers: Vec<NormalizedLayer>,
    // Single slot, overwritten by every forward call.
    cache: Option<Vec<LayerCache>>,
}

impl Network {
    /// Network over the 90-feature input with `num_hidden_layers` hidden layers of
    /// `units_per_hidden_layer` units each.
    pub fn new(
        num_hidden_layers: usize,
        units_per_hidden_layer: usize,
        rng: &mut SimpleRng,
    ) -> Result<Self> {
        let topology = Topology::with_default_features(num_hidden_layers, units_per_hidden_layer)?;
        Ok(Self::with_topology(&topology, rng))
    }

    /// Randomly initialized network for an already validated topology.
    ///
    /// Parameters are drawn layer by layer, input layer first.
    pub fn with_topology(topology: &Topology, rng: &mut SimpleRng) -> Self {
        let shapes = topology.layer_shapes();
        let last = shapes.len() - 1;
        let layers = shapes
            .iter()
            .enumerate()
            .map(|(i, shape)| {
                let kind = if i == last {
                    LayerKind::Output
                } else {
                    LayerKind::Hidden
                };
                NormalizedLayer::random(kind, shape.inputs, shape.units, rng)
            })
            .collect();

        Self {
            layers,
            cache: None,
        }
    }

    /// Network from explicit layers.
    ///
    /// All layers but the last must be hidden, the last must be an output layer with a
    /// single unit, and widths must chain. A lone output layer is a plain linear model.
    pub fn from_layers(layers: Vec<NormalizedLayer>) -> Result<Self> {
        let output = layers
            .last()
            .ok_or_else(|| NetworkError::config("a network needs at least one layer"))?;
        if !output.is_output() || output.units() != 1 {
            return Err(NetworkError::config(
                "the last layer must be an output layer with exactly one unit",
            ));
        }
        if let Some(position) = layers[..layers.len() - 1]
            .iter()
            .position(|layer| layer.is_output())
        {
            return Err(NetworkError::config(format!(
                "layer {} is an output layer but is not last",
                position
            )));
        }
        for (i, pair) in layers.windows(2).enumerate() {
            if pair[0].units() != pair[1].input_size() {
                return Err(NetworkError::config(format!(
                    "layer {} emits {} units but layer {} expects {} inputs",
                    i,
                    pair[0].units(),
                    i + 1,
                    pair[1].input_size()
                )));
            }
        }

        Ok(Self {
            layers,
            cache: None,
        })
    }

    pub fn layers(&self) -> &[NormalizedLayer] {
        &self.layers
    }

    /// Mutable layer access for optimizer steps. Parameters are only reachable through
    /// fixed-shape views, so layer shapes cannot change.
    pub fn layers_mut(&mut self) -> &mut [NormalizedLayer] {
        &mut self.layers
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn input_size(&self) -> usize {
        self.layers[0].input_size()
    }

    pub fn layer_shapes(&self) -> Vec<LayerShape> {
        self.layers
            .iter()
            .map(|layer| LayerShape {
                inputs: layer.input_size(),
                units: layer.units(),
            })
            .collect()
    }

    pub fn parameter_count(&self) -> usize {
        self.layers.iter().map(NormalizedLayer::parameter_count).sum()
    }

    /// Runs every layer on `x` (`m × inputs`) and returns the `m × 1` prediction.
    ///
    /// Overwrites the cache used by [`Network::backward`]. On error the previous cache
    /// is discarded.
    pub fn forward(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.cache = None;
        let caches = self.run(x, None)?;
        let prediction = caches
            .last()
            .map(|cache| cache.output.clone())
            .ok_or_else(|| NetworkError::state("network has no layers"))?;
        self.cache = Some(caches);
        Ok(prediction)
    }

    /// Same computation as [`Network::forward`] without touching the cache.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        Self::prediction(self.run(x, None)?)
    }

    /// Evaluates the network with fixed per-layer statistics instead of batch statistics.
    pub fn predict_with_statistics(
        &self,
        x: &Array2<f64>,
        statistics: &[Standardization],
    ) -> Result<Array2<f64>> {
        if statistics.len() != self.layers.len() {
            return Err(NetworkError::shape(format!(
                "got statistics for {} layers, network has {}",
                statistics.len(),
                self.layers.len()
            )));
        }
        Self::prediction(self.run(x, Some(statistics))?)
    }

    /// Statistics recorded by the most recent forward pass, input layer first.
    pub fn batch_statistics(&self) -> Option<Vec<Standardization>> {
        self.cache.as_ref().map(|caches| {
            caches
                .iter()
                .map(|cache| cache.statistics.clone())
                .collect()
        })
    }

    /// Whether a forward pass has populated the cache.
    pub fn has_cache(&self) -> bool {
        self.cache.is_some()
    }

    fn run(
        &self,
        x: &Array2<f64>,
        statistics: Option<&[Standardization]>,
    ) -> Result<Vec<LayerCache>> {
        let mut caches: Vec<LayerCache> = Vec::with_capacity(self.layers.len());
        for (i, layer) in self.layers.iter().enumerate() {
            let input = caches.last().map_or(x, |previous| &previous.output);
            let cache = match statistics {
                Some(frozen) => layer.forward_with_statistics(input, &frozen[i])?,
                None => layer.forward(input)?,
            };
            caches.push(cache);
        }
        Ok(caches)
    }

    fn prediction(caches: Vec<LayerCache>) -> Result<Array2<f64>> {
        caches
            .into_iter()
            .last()
            .map(|cache| cache.output)
            .ok_or_else(|| NetworkError::state("network has no layers"))
    }

    /// Gradients of the loss with respect to every parameter, input layer first.
    ///
    /// Requires a forward pass on a batch of the same shape as `x`. `y` must be `m × 1`.
    /// `lambda` adds `lambda * W` to each weight gradient.
    pub fn backward(&self, x: &Array2<f64>, y: &Array2<f64>, lambda: f64) -> Result<Gradients> {
        if y.ncols() != 1 {
            return Err(NetworkError::shape(format!(
                "targets must have exactly one column, got {}",
                y.ncols()
            )));
        }
        if y.nrows() != x.nrows() {
            return Err(NetworkError::shape(format!(
                "{} targets for {} input rows",
                y.nrows(),
                x.nrows()
            )));
        }
        let caches = self
            .cache
            .as_ref()
            .ok_or_else(|| NetworkError::state("backward called before forward"))?;
        if caches[0].input.dim() != x.dim() {
            return Err(NetworkError::state(format!(
                "cached forward pass was over a {:?} batch, backward got {:?}",
                caches[0].input.dim(),
                x.dim()
            )));
        }

        let count = self.layers.len();
        let m = x.nrows() as f64;
        let mut weights = Vec::with_capacity(count);
        let mut gammas = Vec::with_capacity(count);
        let mut betas = Vec::with_capacity(count);

        // Derivative of the squared error with respect to the prediction.
        let d_pred = &caches[count - 1].output - y;
        let mut d_h = d_pred.clone();
        let mut d_b = d_pred;

        for i in (0..count).rev() {
            let layer = &self.layers[i];
            let cache = &caches[i];

            if i + 1 < count {
                let above = &self.layers[i + 1];
                let d_a = d_h.dot(&above.weights().t());
                d_b = d_a * relu_mask(&cache.output);
                d_h = &d_b * &(&layer.gamma().t() / &cache.statistics.std);
            }

            let d_w = cache.input.t().dot(&d_h) / m + layer.weights() * lambda;
            let d_gamma = ((&d_b * &cache.standardized).sum_axis(Axis(0)) / m).insert_axis(Axis(1));
            let d_beta = (d_b.sum_axis(Axis(0)) / m).insert_axis(Axis(1));

            weights.push(d_w);
            gammas.push(d_gamma);
            betas.push(d_beta);
        }

        weights.reverse();
        gammas.reverse();
        betas.reverse();

        Ok(Gradients {
            weights,
            gammas,
            betas,
        })
    }
}
