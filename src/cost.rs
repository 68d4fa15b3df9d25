use std::fmt;

use crate::activation::ActivationFunction;

/// Pointwise cost of one output node and the error `δ = ∂C/∂z` it induces.
///
/// `z` is the weighted input of the output node, `a` its activation and `y`
/// the expected activation.
#[derive(Clone, Copy)]
pub struct CostFunction {
	pub name: &'static str,
	pub _f: fn(a: f64, y: f64) -> f64,
	pub _delta: fn(z: f64, a: f64, y: f64, af: &ActivationFunction) -> f64,
}
impl CostFunction {
	/// `0.5 * (a - y)^2`
	pub const QUADRATIC: CostFunction = CostFunction {
		name: "quadratic",
		_f: |a, y| 0.5 * (a - y) * (a - y),
		_delta: |z, a, y, af| (a - y) * af.prime(z),
	};
	/// `-y ln(a) - (1 - y) ln(1 - a)`.
	///
	/// The delta is `a - y`: the `σ'(z)` factor cancels analytically, which
	/// only holds for sigmoid-shaped activations.
	pub const CROSS_ENTROPY: CostFunction = CostFunction {
		name: "cross-entropy",
		_f: |a, y| -y * finite_ln(a) - (1.0 - y) * finite_ln(1.0 - a),
		_delta: |_z, a, y, _af| a - y,
	};

	#[inline]
	pub fn f(&self, a: f64, y: f64) -> f64 {
		(self._f)(a, y)
	}
	#[inline]
	pub fn delta(&self, z: f64, a: f64, y: f64, af: &ActivationFunction) -> f64 {
		(self._delta)(z, a, y, af)
	}
}
impl Default for CostFunction {
	fn default() -> Self {
		Self::CROSS_ENTROPY
	}
}
impl fmt::Debug for CostFunction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "CostFunction({})", self.name)
	}
}

/// `ln(x)`, except that `ln(0)` is replaced by the smallest positive normal
/// so a saturated output never yields an infinite or NaN cost.
fn finite_ln(x: f64) -> f64 {
	if x == 0.0 {
		f64::MIN_POSITIVE
	} else {
		x.ln()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::activation::sigmoid;

	#[test]
	fn quadratic_delta_uses_activation_derivative() {
		let af = ActivationFunction::SIGMOID;
		let z = 0.7;
		let a = sigmoid(z);
		let delta = CostFunction::QUADRATIC.delta(z, a, 1.0, &af);
		assert_eq!(delta, (a - 1.0) * af.prime(z));
		assert_eq!(CostFunction::QUADRATIC.f(0.25, 0.75), 0.125);
	}

	#[test]
	fn cross_entropy_never_reaches_infinity() {
		let ce = CostFunction::CROSS_ENTROPY;
		for (a, y) in [(0.0, 1.0), (1.0, 0.0), (0.0, 0.0), (1.0, 1.0)] {
			assert!(ce.f(a, y).is_finite(), "a = {a}, y = {y}");
		}
		assert!(ce.f(0.0, 1.0).abs() < 1e-300);
		assert!(ce.f(1.0, 0.0).abs() < 1e-300);
		assert_eq!(ce.f(1.0, 1.0), 0.0);

		// tiny but nonzero activations keep their true logarithm
		let tiny = 1e-310;
		assert_eq!(ce.f(tiny, 1.0), -tiny.ln());
	}

	#[test]
	fn cross_entropy_delta_matches_derivative_through_sigmoid() {
		let ce = CostFunction::CROSS_ENTROPY;
		let af = ActivationFunction::SIGMOID;
		let (z, y, h) = (-0.4, 1.0, 1e-6);
		let numeric = (ce.f(sigmoid(z + h), y) - ce.f(sigmoid(z - h), y)) / (2.0 * h);
		assert!((ce.delta(z, sigmoid(z), y, &af) - numeric).abs() < 1e-6);
	}
}
