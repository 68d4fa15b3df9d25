use std::fmt;

/// A neuron nonlinearity together with its derivative.
///
/// Both functions take the weighted input `z`, so the derivative never
/// needs the activation to be recomputed first.
#[derive(Clone, Copy)]
pub struct ActivationFunction {
	pub name: &'static str,
	pub _f: fn(z: f64) -> f64,
	pub _prime: fn(z: f64) -> f64,
}
impl ActivationFunction {
	/// The logistic function, evaluated on whichever branch keeps `exp`
	/// from overflowing.
	pub const SIGMOID: ActivationFunction = ActivationFunction {
		name: "sigmoid",
		_f: sigmoid,
		_prime: sigmoid_prime,
	};
	/// `0.5 * z / (1 + |z|) + 0.5`, a sigmoid-shaped curve without `exp`.
	pub const FAST_SIGMOID: ActivationFunction = ActivationFunction {
		name: "fast-sigmoid",
		_f: |z| 0.5 * z / (1.0 + z.abs()) + 0.5,
		_prime: |z| {
			let denom = z.abs() + 1.0;
			0.5 / (denom * denom)
		},
	};
	/// Hyperbolic tangent rescaled into (0, 1), so it can be paired with
	/// the cross-entropy cost like the sigmoid.
	pub const TANH: ActivationFunction = ActivationFunction {
		name: "tanh",
		_f: |z| 0.5 * z.tanh() + 0.5,
		_prime: |z| {
			let sech = 1.0 / z.cosh();
			sech * sech / 2.0
		},
	};

	#[inline]
	pub fn f(&self, z: f64) -> f64 {
		(self._f)(z)
	}
	#[inline]
	pub fn prime(&self, z: f64) -> f64 {
		(self._prime)(z)
	}
}
impl Default for ActivationFunction {
	fn default() -> Self {
		Self::SIGMOID
	}
}
impl fmt::Debug for ActivationFunction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "ActivationFunction({})", self.name)
	}
}

pub fn sigmoid(z: f64) -> f64 {
	if z > 0.0 {
		1.0 / (1.0 + (-z).exp())
	} else {
		1.0 - 1.0 / (1.0 + z.exp())
	}
}

pub fn sigmoid_prime(z: f64) -> f64 {
	let exp = (-z.abs()).exp();
	exp / ((1.0 + exp) * (1.0 + exp))
}
