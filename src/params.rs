//! Parameter families, layer shapes and per-layer array bundles
//!
//! Every layer owns three parameter arrays: the weight matrix, the scale column
//! (gamma) and the shift column (beta). Gradients and optimizer accumulators mirror
//! that structure exactly, so they share the [`ParameterSet`] container.

use ndarray::Array2;

use crate::error::{NetworkError, Result};

/// Number of raw input features in the regression dataset.
pub const NUM_FEATURES: usize = 90;

/// One of the three parameter arrays every layer owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Weights,
    Gammas,
    Betas,
}

impl Family {
    pub const ALL: [Family; 3] = [Family::Weights, Family::Gammas, Family::Betas];

    pub fn name(self) -> &'static str {
        match self {
            Family::Weights => "weights",
            Family::Gammas => "gammas",
            Family::Betas => "betas",
        }
    }
}

/// Input width and unit count of a single layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerShape {
    pub inputs: usize,
    pub units: usize,
}

impl LayerShape {
    /// Shape of the array holding `family` for a layer of this size.
    pub fn dim(&self, family: Family) -> (usize, usize) {
        match family {
            Family::Weights => (self.inputs, self.units),
            Family::Gammas | Family::Betas => (self.units, 1),
        }
    }
}

/// Hidden-layer configuration of a network: input width, hidden depth and width.
///
/// The output layer (`units → 1`) is implied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Topology {
    input_features: usize,
    hidden_layers: usize,
    units: usize,
}

impl Topology {
    /// Validated topology; every count must be at least one.
    pub fn new(input_features: usize, hidden_layers: usize, units: usize) -> Result<Self> {
        if input_features < 1 {
            return Err(NetworkError::config("input feature count must be at least 1"));
        }
        if hidden_layers < 1 {
            return Err(NetworkError::config(format!(
                "number of hidden layers must be at least 1, got {}",
                hidden_layers
            )));
        }
        if units < 1 {
            return Err(NetworkError::config(format!(
                "units per hidden layer must be at least 1, got {}",
                units
            )));
        }
        Ok(Self {
            input_features,
            hidden_layers,
            units,
        })
    }

    /// Topology over the default 90-feature input.
    pub fn with_default_features(hidden_layers: usize, units: usize) -> Result<Self> {
        Self::new(NUM_FEATURES, hidden_layers, units)
    }

    pub fn input_features(&self) -> usize {
        self.input_features
    }

    pub fn hidden_layers(&self) -> usize {
        self.hidden_layers
    }

    pub fn units(&self) -> usize {
        self.units
    }

    /// Total layer count including the output layer.
    pub fn layer_count(&self) -> usize {
        self.hidden_layers + 1
    }

    /// Shapes of every layer, input layer first, output layer last.
    pub fn layer_shapes(&self) -> Vec<LayerShape> {
        let mut shapes = Vec::with_capacity(self.layer_count());
        for i in 0..self.hidden_layers {
            let inputs = if i == 0 { self.input_features } else { self.units };
            shapes.push(LayerShape {
                inputs,
                units: self.units,
            });
        }
        shapes.push(LayerShape {
            inputs: self.units,
            units: 1,
        });
        shapes
    }
}

/// Three index-aligned lists of arrays (weights, gammas, betas), input layer first.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSet {
    pub weights: Vec<Array2<f64>>,
    pub gammas: Vec<Array2<f64>>,
    pub betas: Vec<Array2<f64>>,
}

/// Gradient bundle returned by the backward pass.
pub type Gradients = ParameterSet;

impl ParameterSet {
    /// All-zero arrays matching the given layer shapes.
    pub fn zeros(shapes: &[LayerShape]) -> Self {
        let build = |family: Family| -> Vec<Array2<f64>> {
            shapes
                .iter()
                .map(|shape| Array2::zeros(shape.dim(family)))
                .collect()
        };
        Self {
            weights: build(Family::Weights),
            gammas: build(Family::Gammas),
            betas: build(Family::Betas),
        }
    }

    /// Number of layers, provided all three families agree.
    pub fn layer_count(&self) -> Result<usize> {
        let count = self.weights.len();
        if self.gammas.len() != count || self.betas.len() != count {
            return Err(NetworkError::shape(format!(
                "parameter families disagree on layer count: {} weights, {} gammas, {} betas",
                self.weights.len(),
                self.gammas.len(),
                self.betas.len()
            )));
        }
        Ok(count)
    }

    pub fn family(&self, family: Family) -> &[Array2<f64>] {
        match family {
            Family::Weights => &self.weights,
            Family::Gammas => &self.gammas,
            Family::Betas => &self.betas,
        }
    }

    pub fn family_mut(&mut self, family: Family) -> &mut [Array2<f64>] {
        match family {
            Family::Weights => &mut self.weights,
            Family::Gammas => &mut self.gammas,
            Family::Betas => &mut self.betas,
        }
    }

    /// Sets every element of every array to zero, keeping shapes.
    pub fn fill_zero(&mut self) {
        for family in Family::ALL {
            for array in self.family_mut(family) {
                array.fill(0.0);
            }
        }
    }

    /// Sum of squares of every element across all arrays.
    pub fn sum_of_squares(&self) -> f64 {
        Family::ALL
            .iter()
            .flat_map(|&family| self.family(family).iter())
            .map(|array| array.iter().map(|v| v * v).sum::<f64>())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topology_rejects_zero_counts() {
        assert!(matches!(
            Topology::new(90, 0, 10),
            Err(NetworkError::Config(_))
        ));
        assert!(matches!(
            Topology::new(90, 2, 0),
            Err(NetworkError::Config(_))
        ));
        assert!(matches!(Topology::new(0, 2, 5), Err(NetworkError::Config(_))));
    }

    #[test]
    fn test_layer_shapes_chain() {
        let topology = Topology::with_default_features(3, 16).unwrap();
        let shapes = topology.layer_shapes();

        assert_eq!(shapes.len(), 4);
        assert_eq!(shapes[0], LayerShape { inputs: 90, units: 16 });
        assert_eq!(shapes[1], LayerShape { inputs: 16, units: 16 });
        assert_eq!(shapes[2], LayerShape { inputs: 16, units: 16 });
        assert_eq!(shapes[3], LayerShape { inputs: 16, units: 1 });
        for pair in shapes.windows(2) {
            assert_eq!(pair[0].units, pair[1].inputs);
        }
    }

    #[test]
    fn test_zeros_match_shapes() {
        let shapes = Topology::new(5, 1, 3).unwrap().layer_shapes();
        let set = ParameterSet::zeros(&shapes);

        assert_eq!(set.layer_count().unwrap(), 2);
        assert_eq!(set.weights[0].dim(), (5, 3));
        assert_eq!(set.gammas[0].dim(), (3, 1));
        assert_eq!(set.betas[1].dim(), (1, 1));
        assert_eq!(set.sum_of_squares(), 0.0);
    }

    #[test]
    fn test_layer_count_detects_mismatch() {
        let shapes = Topology::new(5, 2, 3).unwrap().layer_shapes();
        let mut set = ParameterSet::zeros(&shapes);
        set.betas.pop();
        assert!(matches!(set.layer_count(), Err(NetworkError::Shape(_))));
    }

    #[test]
    fn test_sum_of_squares_and_fill_zero() {
        let shapes = [LayerShape { inputs: 2, units: 1 }];
        let mut set = ParameterSet::zeros(&shapes);
        set.weights[0].fill(2.0);
        set.gammas[0].fill(1.0);
        set.betas[0].fill(-3.0);

        // 2 * 4 + 1 + 9
        assert_eq!(set.sum_of_squares(), 18.0);

        set.fill_zero();
        assert_eq!(set.sum_of_squares(), 0.0);
        assert_eq!(set.weights[0].dim(), (2, 1));
    }
}
