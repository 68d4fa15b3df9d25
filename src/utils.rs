use rand::{Rng, RngCore};
use rand_distr::StandardNormal;

/// Draws `len` values from a Gaussian with mean 0 and the given standard
/// deviation.
pub fn normal_vec(rng: &mut dyn RngCore, len: usize, std_dev: f64) -> Vec<f64> {
	(0..len)
		.map(|_| rng.sample::<f64, _>(StandardNormal) * std_dev)
		.collect()
}

#[derive(Clone, Copy)]
pub struct WeightInitializer {
	_std_dev: fn(fan_in: usize) -> f64,
}
impl WeightInitializer {
	/// Initialize each weight using a Gaussian distribution with mean 0
	/// and standard deviation 1 over the square root of the number of
	/// weights connecting to the same neuron.  Biases always use a
	/// standard deviation of 1.
	///
	/// Input-layer nodes get neither weights nor biases, since biases are
	/// only ever used in computing the outputs from later layers.
	pub const DEFAULT: WeightInitializer = WeightInitializer {
		_std_dev: |fan_in| 1.0 / (fan_in as f64).sqrt(),
	};

	/// Initialize the weights using a Gaussian distribution with mean 0
	/// and standard deviation 1.  Saturates hidden neurons much more
	/// easily than ``DEFAULT`` and is kept for comparison.
	pub const LARGE: WeightInitializer = WeightInitializer {
		_std_dev: |_| 1.0,
	};

	#[inline]
	pub fn std_dev(&self, fan_in: usize) -> f64 {
		(self._std_dev)(fan_in)
	}
}
impl Default for WeightInitializer {
	fn default() -> Self {
		Self::DEFAULT
	}
}

/// Hyperparameters for a training run.
#[derive(Clone, Debug)]
pub struct TrainingOptions {
	pub epochs: usize,
	pub mini_batch_size: usize,
	/// learning rate
	pub eta: f64,
	/// L2 regularization parameter
	pub lambda: f64,
	/// momentum coefficient, 0 disables momentum
	pub momentum: f64,
}
impl Default for TrainingOptions {
	fn default() -> Self {
		Self {
			epochs: 30,
			mini_batch_size: 10,
			eta: 0.1,
			lambda: 0.0,
			momentum: 0.0,
		}
	}
}

/// Index of the largest element; the first one wins on ties.
pub fn argmax(values: &[f64]) -> Option<usize> {
	values.iter().enumerate()
		.fold(None, |best: Option<(usize, f64)>, (i, &v)| match best {
			Some((_, b)) if b >= v => best,
			_ => Some((i, v)),
		})
		.map(|(i, _)| i)
}

/// Comparison predicate for classifiers: the expected and actual outputs
/// agree when their largest entries sit at the same index.
pub fn argmax_matches(expected: &[f64], actual: &[f64]) -> bool {
	match (argmax(expected), argmax(actual)) {
		(Some(e), Some(a)) => e == a,
		_ => false,
	}
}
