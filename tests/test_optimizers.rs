// Tests for the optimizer update rules applied to whole networks.

use ndarray::Array2;
use rust_neural_regression::layers::NormalizedLayer;
use rust_neural_regression::loss::mean_squared_error;
use rust_neural_regression::network::Network;
use rust_neural_regression::optimizers::{Optimizer, OptimizerKind};
use rust_neural_regression::params::{Family, ParameterSet, Topology};
use rust_neural_regression::utils::SimpleRng;
use rust_neural_regression::NetworkError;

fn all_kinds() -> Vec<OptimizerKind> {
    vec![
        OptimizerKind::GradientDescent,
        OptimizerKind::Momentum { decay: 0.9 },
        OptimizerKind::RmsProp { decay: 0.999 },
        OptimizerKind::Adam {
            beta1: 0.9,
            beta2: 0.999,
        },
    ]
}

fn ready_optimizer(kind: OptimizerKind, lr: f64, topology: &Topology) -> Optimizer {
    let mut optimizer = Optimizer::new(lr, kind).unwrap();
    optimizer.init(topology).unwrap();
    optimizer
}

// ============================================================================
// Monotonicity of plain gradient descent
// ============================================================================

#[test]
fn test_gradient_descent_loss_never_increases_on_linear_model() {
    let mut rng = SimpleRng::new(8);
    let output = NormalizedLayer::output(
        rng.uniform_array(3, 1, -1.0, 1.0),
        Array2::ones((1, 1)),
        Array2::zeros((1, 1)),
    )
    .unwrap();
    let mut net = Network::from_layers(vec![output]).unwrap();
    let x = rng.uniform_array(8, 3, -1.0, 1.0);
    let y = rng.uniform_array(8, 1, -3.0, 3.0);

    // The Hessian of 0.5 * MSE is xᵀx / m, whose largest eigenvalue is at most 3 here.
    let mut optimizer = Optimizer::new(0.1, OptimizerKind::GradientDescent).unwrap();

    let mut previous = mean_squared_error(&y, &net.forward(&x).unwrap()).unwrap();
    for step in 0..200 {
        let grads = net.backward(&x, &y, 0.0).unwrap();
        optimizer.step(net.layers_mut(), &grads).unwrap();
        let current = mean_squared_error(&y, &net.forward(&x).unwrap()).unwrap();
        assert!(
            current <= previous + 1e-12,
            "loss rose at step {}: {} -> {}",
            step,
            previous,
            current
        );
        previous = current;
    }
}

#[test]
fn test_every_rule_reduces_loss_on_a_fixed_batch() {
    let topology = Topology::new(4, 1, 6).unwrap();
    for kind in all_kinds() {
        // Without bias correction the first adaptive steps are much larger than lr.
        let lr = match kind {
            OptimizerKind::RmsProp { .. } => 0.0005,
            OptimizerKind::Adam { .. } => 0.001,
            _ => 0.01,
        };
        let mut rng = SimpleRng::new(21);
        let mut net = Network::with_topology(&topology, &mut rng);
        let x = rng.uniform_array(16, 4, -1.0, 1.0);
        let y = rng.uniform_array(16, 1, -1.0, 1.0);
        let mut optimizer = ready_optimizer(kind, lr, &topology);

        let initial = mean_squared_error(&y, &net.forward(&x).unwrap()).unwrap();
        for _ in 0..100 {
            net.forward(&x).unwrap();
            let grads = net.backward(&x, &y, 0.0).unwrap();
            optimizer.step(net.layers_mut(), &grads).unwrap();
        }
        let last = mean_squared_error(&y, &net.forward(&x).unwrap()).unwrap();
        assert!(last < initial, "{}: {} -> {}", kind.name(), initial, last);
    }
}

// ============================================================================
// Shape invariants
// ============================================================================

#[test]
fn test_parameter_shapes_survive_many_steps() {
    let topology = Topology::new(90, 3, 7).unwrap();
    for kind in all_kinds() {
        let mut rng = SimpleRng::new(4);
        let mut net = Network::with_topology(&topology, &mut rng);
        let shapes = net.layer_shapes();
        let mut optimizer = ready_optimizer(kind, 0.005, &topology);

        for _ in 0..10 {
            let x = rng.uniform_array(5, 90, -1.0, 1.0);
            let y = rng.uniform_array(5, 1, -1.0, 1.0);
            net.forward(&x).unwrap();
            let grads = net.backward(&x, &y, 0.001).unwrap();
            optimizer.step(net.layers_mut(), &grads).unwrap();
        }

        assert_eq!(net.layer_shapes(), shapes);
        for (layer, shape) in net.layers().iter().zip(&shapes) {
            for family in Family::ALL {
                assert_eq!(layer.parameter(family).dim(), shape.dim(family));
            }
        }
        for set in optimizer.accumulators() {
            assert_eq!(set.layer_count().unwrap(), shapes.len());
        }
        assert_eq!(optimizer.steps(), 10);
    }
}

// ============================================================================
// Zero gradients
// ============================================================================

#[test]
fn test_adam_with_zero_gradients_leaves_parameters_unchanged() {
    let topology = Topology::new(90, 2, 5).unwrap();
    let mut rng = SimpleRng::new(42);
    let mut net = Network::with_topology(&topology, &mut rng);
    let before = net.layers().to_vec();

    let mut optimizer = ready_optimizer(
        OptimizerKind::Adam {
            beta1: 0.9,
            beta2: 0.999,
        },
        0.1,
        &topology,
    );
    let zeros = ParameterSet::zeros(&topology.layer_shapes());
    for _ in 0..3 {
        optimizer.step(net.layers_mut(), &zeros).unwrap();
    }

    assert_eq!(net.layers(), &before[..]);
}

// ============================================================================
// Misuse
// ============================================================================

#[test]
fn test_optimizer_for_other_topology_is_rejected() {
    let topology = Topology::new(90, 2, 5).unwrap();
    let mut rng = SimpleRng::new(42);
    let mut net = Network::with_topology(&topology, &mut rng);
    let before = net.layers().to_vec();

    let other = Topology::new(90, 4, 5).unwrap();
    let mut optimizer = ready_optimizer(OptimizerKind::Momentum { decay: 0.9 }, 0.1, &other);
    let grads = ParameterSet::zeros(&topology.layer_shapes());

    assert!(matches!(
        optimizer.step(net.layers_mut(), &grads),
        Err(NetworkError::Config(_))
    ));
    assert_eq!(net.layers(), &before[..]);
}

#[test]
fn test_unknown_optimizer_name() {
    assert!(matches!(
        OptimizerKind::from_name("nesterov", 0.9, 0.9, 0.999),
        Err(NetworkError::Config(_))
    ));
}
