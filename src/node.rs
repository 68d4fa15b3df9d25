#[cfg(feature = "rayon")]
use std::ops::AddAssign;

use rand::{Rng, RngCore};
use rand_distr::StandardNormal;

use crate::utils::normal_vec;

/// One neuron together with the scratch state training needs.
///
/// Input-layer nodes have no incoming weights and only ever use `a`.
///
/// `z`, `a`, `error` and `weights_nabla` belong to the last sample run
/// through this network.  Mini-batches accumulated on the rayon pool
/// backpropagate into copies, so after such a batch these fields still hold
/// their values from before it; only the accumulated nablas, the velocities
/// and the parameters are updated.
#[derive(Debug, Clone, Default)]
pub struct Node {
	pub bias: f64,
	pub weights: Vec<f64>,

	/// weighted input of the last feedforward
	pub z: f64,
	/// activation of the last feedforward
	pub a: f64,

	/// `∂C/∂z` of the last backpropagated sample, which is also its bias nabla
	pub error: f64,
	pub weights_nabla: Vec<f64>,

	pub acc_bias_nabla: f64,
	pub acc_weights_nabla: Vec<f64>,

	pub bias_velocity: f64,
	pub weights_velocity: Vec<f64>,
}
impl Node {
	/// A node with `input_count` zeroed weights and zeroed state.
	pub fn new(input_count: usize) -> Self {
		Self::with_params(0.0, vec![0.0; input_count])
	}

	/// A node with known parameters and zeroed state.
	pub fn with_params(bias: f64, weights: Vec<f64>) -> Self {
		let len = weights.len();
		Self {
			bias,
			weights,
			weights_nabla: vec![0.0; len],
			acc_weights_nabla: vec![0.0; len],
			weights_velocity: vec![0.0; len],
			..Self::default()
		}
	}

	/// Bias drawn from N(0, 1), weights from N(0, `weight_std_dev`).
	pub fn random(input_count: usize, weight_std_dev: f64, rng: &mut dyn RngCore) -> Self {
		let bias = rng.sample(StandardNormal);
		let weights = normal_vec(rng, input_count, weight_std_dev);
		Self::with_params(bias, weights)
	}

	pub fn input_count(&self) -> usize {
		self.weights.len()
	}

	/// `bias + Σ inputs[k] * weights[k]`
	pub(crate) fn weighted_sum(&self, inputs: impl Iterator<Item = f64>) -> f64 {
		inputs.zip(self.weights.iter())
			.fold(self.bias, |z, (a, w)| z + a * w)
	}

	/// Sets `error` and derives the per-sample weight nablas from the
	/// activations feeding into this node.
	pub(crate) fn set_error(&mut self, error: f64, inputs: impl Iterator<Item = f64>) {
		self.error = error;
		self.weights_nabla.iter_mut()
			.zip(inputs)
			.for_each(|(nabla, a)| *nabla = error * a);
	}

	/// Adds the nablas of the last backpropagated sample to the batch sums.
	pub(crate) fn accumulate_nablas(&mut self) {
		self.acc_bias_nabla += self.error;
		self.acc_weights_nabla.iter_mut()
			.zip(self.weights_nabla.iter())
			.for_each(|(acc, n)| *acc += n);
	}

	pub fn reset_accumulated_nablas(&mut self) {
		self.acc_bias_nabla = 0.0;
		self.acc_weights_nabla.iter_mut().for_each(|n| *n = 0.0);
	}

	pub fn reset_velocities(&mut self) {
		self.bias_velocity = 0.0;
		self.weights_velocity.iter_mut().for_each(|v| *v = 0.0);
	}

	/// `velocity = momentum * velocity - eta_scaled * acc_nabla`, then
	/// `bias += bias_velocity` and `weight = decay * weight + weight_velocity`.
	pub(crate) fn apply_momentum(&mut self, eta_scaled: f64, weight_decay: f64, momentum: f64) {
		self.bias_velocity = momentum * self.bias_velocity - eta_scaled * self.acc_bias_nabla;
		self.bias += self.bias_velocity;
		for ((w, v), acc) in self.weights.iter_mut()
			.zip(self.weights_velocity.iter_mut())
			.zip(self.acc_weights_nabla.iter())
		{
			*v = momentum * *v - eta_scaled * acc;
			*w = weight_decay * *w + *v;
		}
	}

	/// Plain gradient step: `param -= acc_nabla * eta_scaled`.
	pub(crate) fn apply_gradient(&mut self, eta_scaled: f64) {
		self.bias -= self.acc_bias_nabla * eta_scaled;
		self.weights.iter_mut()
			.zip(self.acc_weights_nabla.iter())
			.for_each(|(w, acc)| *w -= acc * eta_scaled);
	}
}

/// Gradient of one node summed over some samples; the unit of the
/// parallel reduction over a mini-batch.
#[cfg(feature = "rayon")]
#[derive(Debug, Clone)]
pub(crate) struct NodeNabla {
	pub bias: f64,
	pub weights: Vec<f64>,
}
#[cfg(feature = "rayon")]
impl NodeNabla {
	pub fn zero(input_count: usize) -> Self {
		Self { bias: 0.0, weights: vec![0.0; input_count] }
	}
}
#[cfg(feature = "rayon")]
impl AddAssign<&Self> for NodeNabla {
	fn add_assign(&mut self, other: &Self) {
		self.bias += other.bias;
		self.weights.iter_mut()
			.zip(other.weights.iter())
			.for_each(|(a, b)| *a += b);
	}
}
#[cfg(feature = "rayon")]
impl AddAssign<&Node> for NodeNabla {
	fn add_assign(&mut self, node: &Node) {
		self.bias += node.error;
		self.weights.iter_mut()
			.zip(node.weights_nabla.iter())
			.for_each(|(a, b)| *a += b);
	}
}
