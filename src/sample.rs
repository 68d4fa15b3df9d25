/// An input vector and the output the network is expected to produce for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
	pub inputs: Vec<f64>,
	pub expected_outputs: Vec<f64>,
}
impl Sample {
	pub fn new(inputs: Vec<f64>, expected_outputs: Vec<f64>) -> Self {
		Self { inputs, expected_outputs }
	}

	/// A sample whose expected output is the one-hot encoding of `label`
	/// over `classes` outputs.
	pub fn one_hot(inputs: Vec<f64>, label: usize, classes: usize) -> Self {
		let mut expected_outputs = vec![0.0; classes];
		if let Some(y) = expected_outputs.get_mut(label) {
			*y = 1.0;
		}
		Self { inputs, expected_outputs }
	}

	/// A sample that asks the network to reproduce its own input, as used
	/// to train autoencoders.
	pub fn autoencoder(data: Vec<f64>) -> Self {
		Self { expected_outputs: data.clone(), inputs: data }
	}
}
