//! Fully-connected feedforward neural networks trained with mini-batch
//! stochastic gradient descent, optionally with momentum and L2
//! regularization.
//!
//! ```
//! use backprop_nn::{argmax_matches, ActivationFunction, CostFunction, Network, Sample, TrainingOptions};
//!
//! let mut training = vec![
//! 	Sample::one_hot(vec![0.0, 1.0], 0, 2),
//! 	Sample::one_hot(vec![1.0, 0.0], 1, 2),
//! ];
//! let test = training.clone();
//!
//! let mut network = Network::new(&[2, 4, 2], ActivationFunction::SIGMOID, CostFunction::CROSS_ENTROPY).unwrap();
//! let options = TrainingOptions { epochs: 5, mini_batch_size: 2, eta: 0.5, lambda: 0.0, momentum: 0.3 };
//! network.momentum_sgd(&options, &mut training, &test, argmax_matches, &mut std::io::sink()).unwrap();
//!
//! assert_eq!(network.calculate(&[0.0, 1.0]).unwrap().len(), 2);
//! ```

pub mod activation;
pub mod cost;
pub mod error;
pub mod network;
pub mod node;
pub mod sample;
pub mod utils;

mod persist;

pub use activation::ActivationFunction;
pub use cost::CostFunction;
pub use error::{NetworkError, Result};
pub use network::Network;
pub use node::Node;
pub use sample::Sample;
pub use utils::{argmax, argmax_matches, TrainingOptions, WeightInitializer};
