//! Optimizers for the normalized regression network
//!
//! An [`Optimizer`] applies one update rule, fixed at construction, uniformly to the
//! weights, gammas and betas of every layer. The rule and its accumulator state form a
//! single tagged union, so a momentum optimizer can only ever hold velocity arrays and
//! an Adam optimizer always holds both moment sets.
//!
//! # Available update rules
//!
//! - Plain gradient descent (stateless, usable without `init`)
//! - Momentum
//! - RMSProp
//! - Adam (without bias correction)
//!
//! # Example
//!
//! ```ignore
//! use rust_neural_regression::optimizers::{Optimizer, OptimizerKind};
//!
//! let mut optimizer = Optimizer::new(0.002, OptimizerKind::Adam { beta1: 0.9, beta2: 0.999 })?;
//! optimizer.init(&topology)?;
//!
//! net.forward(&batch_input)?;
//! let grads = net.backward(&batch_input, &batch_target, lambda)?;
//! optimizer.step(net.layers_mut(), &grads)?;
//! ```

pub mod adam;
pub mod momentum;
pub mod rmsprop;
pub mod sgd;

pub use adam::Adam;
pub use momentum::Momentum;
pub use rmsprop::RmsProp;
pub use sgd::gradient_descent;

use ndarray::{Array2, ArrayViewMut2};
use tracing::debug;

use crate::error::{NetworkError, Result};
use crate::layers::NormalizedLayer;
use crate::params::{Family, Gradients, LayerShape, ParameterSet, Topology};

/// Added under the square root of second-moment estimates.
pub const MOMENT_EPSILON: f64 = 1e-8;

/// Update rule and its hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OptimizerKind {
    GradientDescent,
    Momentum { decay: f64 },
    RmsProp { decay: f64 },
    Adam { beta1: f64, beta2: f64 },
}

impl OptimizerKind {
    /// Parses an optimizer name, taking the hyperparameters the chosen rule needs.
    ///
    /// Accepted names (case-insensitive): `sgd`/`gd`, `momentum`/`sgdmomentum`,
    /// `rmsprop`, `adam`.
    pub fn from_name(name: &str, decay: f64, beta1: f64, beta2: f64) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "sgd" | "gd" | "gradient_descent" => Ok(OptimizerKind::GradientDescent),
            "momentum" | "sgdmomentum" | "sgd_momentum" => Ok(OptimizerKind::Momentum { decay }),
            "rmsprop" => Ok(OptimizerKind::RmsProp { decay }),
            "adam" => Ok(OptimizerKind::Adam { beta1, beta2 }),
            _ => Err(NetworkError::config(format!(
                "unknown optimizer '{}'; expected one of: sgd, momentum, rmsprop, adam",
                name
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OptimizerKind::GradientDescent => "sgd",
            OptimizerKind::Momentum { .. } => "momentum",
            OptimizerKind::RmsProp { .. } => "rmsprop",
            OptimizerKind::Adam { .. } => "adam",
        }
    }

    /// Whether the rule keeps accumulators and therefore needs `init`.
    pub fn is_stateful(&self) -> bool {
        !matches!(self, OptimizerKind::GradientDescent)
    }

    fn validate(&self) -> Result<()> {
        let rates = match *self {
            OptimizerKind::GradientDescent => vec![],
            OptimizerKind::Momentum { decay } | OptimizerKind::RmsProp { decay } => {
                vec![("decay", decay)]
            }
            OptimizerKind::Adam { beta1, beta2 } => vec![("beta1", beta1), ("beta2", beta2)],
        };
        for (name, value) in rates {
            if !(0.0..1.0).contains(&value) {
                return Err(NetworkError::config(format!(
                    "{} must be in [0, 1), got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Rule together with its accumulators.
#[derive(Debug, Clone)]
enum RuleState {
    GradientDescent,
    Momentum(Momentum),
    RmsProp(RmsProp),
    Adam(Adam),
}

impl RuleState {
    fn build(kind: OptimizerKind, shapes: &[LayerShape]) -> Self {
        match kind {
            OptimizerKind::GradientDescent => RuleState::GradientDescent,
            OptimizerKind::Momentum { decay } => RuleState::Momentum(Momentum::new(decay, shapes)),
            OptimizerKind::RmsProp { decay } => RuleState::RmsProp(RmsProp::new(decay, shapes)),
            OptimizerKind::Adam { beta1, beta2 } => {
                RuleState::Adam(Adam::new(beta1, beta2, shapes))
            }
        }
    }

    fn accumulators(&self) -> Vec<&ParameterSet> {
        match self {
            RuleState::GradientDescent => Vec::new(),
            RuleState::Momentum(state) => vec![state.velocity()],
            RuleState::RmsProp(state) => vec![state.mean_square()],
            RuleState::Adam(state) => vec![state.first_moment(), state.second_moment()],
        }
    }

    fn reset(&mut self) {
        match self {
            RuleState::GradientDescent => {}
            RuleState::Momentum(state) => state.reset(),
            RuleState::RmsProp(state) => state.reset(),
            RuleState::Adam(state) => state.reset(),
        }
    }

    fn update(
        &mut self,
        learning_rate: f64,
        family: Family,
        layer: usize,
        parameter: ArrayViewMut2<f64>,
        gradient: &Array2<f64>,
    ) {
        match self {
            RuleState::GradientDescent => gradient_descent(learning_rate, parameter, gradient),
            RuleState::Momentum(state) => {
                state.update(learning_rate, family, layer, parameter, gradient)
            }
            RuleState::RmsProp(state) => {
                state.update(learning_rate, family, layer, parameter, gradient)
            }
            RuleState::Adam(state) => {
                state.update(learning_rate, family, layer, parameter, gradient)
            }
        }
    }
}

/// Mini-batch optimizer over the three parameter families of a network.
#[derive(Debug, Clone)]
pub struct Optimizer {
    learning_rate: f64,
    kind: OptimizerKind,
    // Layer shapes recorded by `init`; `None` for an uninitialized optimizer.
    shapes: Option<Vec<LayerShape>>,
    state: Option<RuleState>,
    steps: usize,
}

impl Optimizer {
    /// Creates an optimizer. Stateful kinds must be initialized with [`Optimizer::init`]
    /// before the first step.
    ///
    /// Fails if the learning rate is not positive or a decay rate is outside `[0, 1)`.
    pub fn new(learning_rate: f64, kind: OptimizerKind) -> Result<Self> {
        validate_learning_rate(learning_rate)?;
        kind.validate()?;
        let state = if kind.is_stateful() {
            None
        } else {
            Some(RuleState::GradientDescent)
        };
        Ok(Self {
            learning_rate,
            kind,
            shapes: None,
            state,
            steps: 0,
        })
    }

    /// Allocates zeroed accumulators for `topology`, replacing any previous state.
    pub fn init(&mut self, topology: &Topology) -> Result<()> {
        self.init_with_shapes(&topology.layer_shapes())
    }

    /// Allocates zeroed accumulators for explicit layer shapes (for example
    /// [`crate::network::Network::layer_shapes`]).
    pub fn init_with_shapes(&mut self, shapes: &[LayerShape]) -> Result<()> {
        if shapes.is_empty() {
            return Err(NetworkError::config(
                "cannot initialize an optimizer for zero layers",
            ));
        }
        self.state = Some(RuleState::build(self.kind, shapes));
        self.shapes = Some(shapes.to_vec());
        self.steps = 0;
        debug!(
            optimizer = self.kind.name(),
            layers = shapes.len(),
            "optimizer initialized"
        );
        Ok(())
    }

    pub fn kind(&self) -> OptimizerKind {
        self.kind
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn set_learning_rate(&mut self, learning_rate: f64) -> Result<()> {
        validate_learning_rate(learning_rate)?;
        self.learning_rate = learning_rate;
        Ok(())
    }

    /// Layer count recorded by `init`.
    pub fn layer_count(&self) -> Option<usize> {
        self.shapes.as_ref().map(Vec::len)
    }

    /// Whether `step` can run.
    pub fn is_ready(&self) -> bool {
        self.state.is_some()
    }

    /// Number of successful steps since construction or the last `init`.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Accumulator sets held by the rule: none for gradient descent, one for
    /// momentum and RMSProp, two (first then second moment) for Adam.
    pub fn accumulators(&self) -> Vec<&ParameterSet> {
        self.state
            .as_ref()
            .map(RuleState::accumulators)
            .unwrap_or_default()
    }

    /// Zeroes every accumulator, keeping shapes and hyperparameters.
    pub fn reset(&mut self) {
        if let Some(state) = self.state.as_mut() {
            state.reset();
        }
        self.steps = 0;
    }

    /// Applies one update to the weights, gammas and betas of every layer.
    ///
    /// `gradients` must be index-aligned with `layers`. Every check runs before the
    /// first parameter is touched, so a failed step changes nothing.
    pub fn step(&mut self, layers: &mut [NormalizedLayer], gradients: &Gradients) -> Result<()> {
        self.check(layers, gradients)?;

        let learning_rate = self.learning_rate;
        let state = self
            .state
            .as_mut()
            .ok_or_else(|| NetworkError::state("optimizer used before init"))?;
        for (index, layer) in layers.iter_mut().enumerate() {
            for family in Family::ALL {
                let gradient = &gradients.family(family)[index];
                state.update(
                    learning_rate,
                    family,
                    index,
                    layer.parameter_mut(family),
                    gradient,
                );
            }
        }
        self.steps += 1;
        Ok(())
    }

    fn check(&self, layers: &[NormalizedLayer], gradients: &Gradients) -> Result<()> {
        let state = self.state.as_ref().ok_or_else(|| {
            NetworkError::state(format!(
                "{} optimizer must be initialized before step",
                self.kind.name()
            ))
        })?;

        let gradient_layers = gradients.layer_count()?;
        if gradient_layers != layers.len() {
            return Err(NetworkError::shape(format!(
                "gradients cover {} layers, parameters cover {}",
                gradient_layers,
                layers.len()
            )));
        }

        if let Some(shapes) = &self.shapes {
            if shapes.len() != layers.len() {
                return Err(NetworkError::config(format!(
                    "optimizer was initialized for {} layers, network has {}",
                    shapes.len(),
                    layers.len()
                )));
            }
            for (index, (layer, shape)) in layers.iter().zip(shapes).enumerate() {
                let actual = LayerShape {
                    inputs: layer.input_size(),
                    units: layer.units(),
                };
                if actual != *shape {
                    return Err(NetworkError::config(format!(
                        "layer {} is {}x{} but the optimizer was initialized for {}x{}",
                        index, actual.inputs, actual.units, shape.inputs, shape.units
                    )));
                }
            }
        }

        let accumulators = state.accumulators();
        for (index, layer) in layers.iter().enumerate() {
            for family in Family::ALL {
                let parameter = layer.parameter(family);
                let gradient = &gradients.family(family)[index];
                if gradient.dim() != parameter.dim() {
                    return Err(NetworkError::shape(format!(
                        "layer {} {} gradient is {:?}, parameter is {:?}",
                        index,
                        family.name(),
                        gradient.dim(),
                        parameter.dim()
                    )));
                }
                for set in &accumulators {
                    let accumulator = &set.family(family)[index];
                    if accumulator.dim() != parameter.dim() {
                        return Err(NetworkError::config(format!(
                            "layer {} {} accumulator is {:?}, parameter is {:?}",
                            index,
                            family.name(),
                            accumulator.dim(),
                            parameter.dim()
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

fn validate_learning_rate(learning_rate: f64) -> Result<()> {
    if !(learning_rate > 0.0 && learning_rate.is_finite()) {
        return Err(NetworkError::config(format!(
            "learning rate must be positive and finite, got {}",
            learning_rate
        )));
    }
    Ok(())
}
