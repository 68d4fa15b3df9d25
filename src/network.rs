// Stochastic gradient descent for a fully-connected feedforward network,
// with optional momentum and L2 regularization.  Every node carries its own
// forward state and gradient scratch space, so a training run allocates
// nothing per sample.

use std::io::Write;

use chrono::Local;
use log::{debug, info};
use rand::{seq::SliceRandom, RngCore};

#[cfg(feature = "rayon")]
use crate::node::NodeNabla;
use crate::{
	activation::ActivationFunction,
	cost::CostFunction,
	error::{NetworkError, Result},
	node::Node,
	sample::Sample,
	utils::{TrainingOptions, WeightInitializer},
};

/// Mini-batches at least this large have their gradients accumulated on
/// the rayon pool; smaller ones are not worth cloning the network for.
#[cfg(feature = "rayon")]
const PARALLEL_BATCH_LEN: usize = 32;

#[derive(Debug, Clone)]
pub struct Network {
	/// ``layers[x][y]`` is node ``y`` of layer ``x``.  Layer 0 is the
	/// input layer and has no parameters.
	pub(crate) layers: Vec<Vec<Node>>,
	af: ActivationFunction,
	cf: CostFunction,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Descent {
	Plain,
	Momentum,
}

impl Network {
	/// The list ``shape`` contains the number of neurons in the respective
	/// layers of the network.  For example, if the list was [2, 3, 1]
	/// then it would be a three-layer network, with the first layer
	/// containing 2 neurons, the second layer 3 neurons, and the
	/// third layer 1 neuron.  The weights for the network
	/// are initialized randomly, using
	/// ``WeightInitializer::DEFAULT`` (see docstring for that method).
	/// The biases for the network are initialized randomly, using
	/// a Gaussian distribution with mean 0, and variance 1.
	pub fn new(shape: &[usize], af: ActivationFunction, cf: CostFunction) -> Result<Self> {
		Self::with_initializer(shape, af, cf, WeightInitializer::DEFAULT, &mut rand::rng())
	}

	/// Like ``new``, with an explicit weight initializer and random source.
	pub fn with_initializer(
		shape: &[usize],
		af: ActivationFunction,
		cf: CostFunction,
		wi: WeightInitializer,
		rng: &mut dyn RngCore,
	) -> Result<Self> {
		if shape.len() < 2 {
			return Err(NetworkError::InvalidConfiguration("a network needs an input and an output layer"));
		}
		if shape.contains(&0) {
			return Err(NetworkError::InvalidConfiguration("layers cannot be empty"));
		}

		let mut layers = Vec::with_capacity(shape.len());
		layers.push((0..shape[0]).map(|_| Node::new(0)).collect());
		for w in shape.windows(2) {
			let fan_in = w[0];
			let std_dev = wi.std_dev(fan_in);
			layers.push((0..w[1]).map(|_| Node::random(fan_in, std_dev, rng)).collect());
		}
		debug!("created network {:?} ({}, {})", shape, af.name, cf.name);
		Ok(Self { layers, af, cf })
	}

	/// Builds a network from already-initialized nodes.  Every node of a
	/// layer must have one weight per node of the previous layer; the
	/// scratch vectors are resized to match.
	pub fn from_layers(mut layers: Vec<Vec<Node>>, af: ActivationFunction, cf: CostFunction) -> Result<Self> {
		if layers.len() < 2 {
			return Err(NetworkError::InvalidConfiguration("a network needs an input and an output layer"));
		}
		if layers.iter().any(|layer| layer.is_empty()) {
			return Err(NetworkError::InvalidConfiguration("layers cannot be empty"));
		}
		for node in layers[0].iter_mut() {
			*node = Node::new(0);
		}
		for x in 1..layers.len() {
			let expected = layers[x - 1].len();
			for node in layers[x].iter_mut() {
				if node.weights.len() != expected {
					return Err(NetworkError::DimensionMismatch {
						what: "node weights",
						got: node.weights.len(),
						expected,
					});
				}
				node.weights_nabla.resize(expected, 0.0);
				node.acc_weights_nabla.resize(expected, 0.0);
				node.weights_velocity.resize(expected, 0.0);
			}
		}
		Ok(Self { layers, af, cf })
	}

	pub fn shape(&self) -> Vec<usize> {
		self.layers.iter().map(Vec::len).collect()
	}

	pub fn input_len(&self) -> usize {
		self.layers[0].len()
	}

	pub fn output_len(&self) -> usize {
		self.layers[self.layers.len() - 1].len()
	}

	pub fn layers(&self) -> &[Vec<Node>] {
		&self.layers
	}

	pub fn node(&self, layer: usize, index: usize) -> Option<&Node> {
		self.layers.get(layer)?.get(index)
	}

	/// Mutable access to a node's parameters.  Layer sizes stay fixed, so
	/// callers must not change the length of ``weights``.
	pub fn node_mut(&mut self, layer: usize, index: usize) -> Option<&mut Node> {
		self.layers.get_mut(layer)?.get_mut(index)
	}

	pub fn activation_function(&self) -> ActivationFunction {
		self.af
	}

	pub fn cost_function(&self) -> CostFunction {
		self.cf
	}

	/// Compute ``z`` and ``a`` of every node for the given inputs, layer by
	/// layer from the input layer forward.
	pub fn feedforward(&mut self, inputs: &[f64]) -> Result<()> {
		check_len("inputs", inputs.len(), self.input_len())?;
		self.feed(inputs);
		Ok(())
	}

	fn feed(&mut self, inputs: &[f64]) {
		for (node, &x) in self.layers[0].iter_mut().zip(inputs) {
			node.a = x;
		}
		let af = self.af;
		for x in 1..self.layers.len() {
			let (before, rest) = self.layers.split_at_mut(x);
			let prev = &before[x - 1];
			for node in rest[0].iter_mut() {
				node.z = node.weighted_sum(prev.iter().map(|n| n.a));
				node.a = af.f(node.z);
			}
		}
	}

	/// Return the output of the network if ``inputs`` is input.
	pub fn calculate(&mut self, inputs: &[f64]) -> Result<Vec<f64>> {
		self.feedforward(inputs)?;
		Ok(self.outputs())
	}

	fn outputs(&self) -> Vec<f64> {
		self.layers[self.layers.len() - 1].iter().map(|n| n.a).collect()
	}

	/// Store the gradient of the cost function C_x for ``sample`` in the
	/// nodes: ``error`` is the bias nabla and ``weights_nabla`` the
	/// nabla of every incoming weight.
	pub fn backpropagation(&mut self, sample: &Sample) -> Result<()> {
		self.check_sample(sample)?;
		self.backprop(sample);
		Ok(())
	}

	fn backprop(&mut self, sample: &Sample) {
		self.feed(&sample.inputs);
		let (af, cf) = (self.af, self.cf);
		let last = self.layers.len() - 1;

		// output layer, where the cost function defines the error
		{
			let (before, output) = self.layers.split_at_mut(last);
			let prev = &before[last - 1];
			for (node, &y) in output[0].iter_mut().zip(&sample.expected_outputs) {
				let error = cf.delta(node.z, node.a, y, &af);
				node.set_error(error, prev.iter().map(|n| n.a));
			}
		}

		// every hidden layer depends on the error of the layer after it
		for x in (1..last).rev() {
			let (upto, after) = self.layers.split_at_mut(x + 1);
			let (before, current) = upto.split_at_mut(x);
			let prev = &before[x - 1];
			let next = &after[0];
			for (y, node) in current[0].iter_mut().enumerate() {
				let back: f64 = next.iter()
					.map(|to| to.weights[y] * to.error)
					.sum();
				let error = af.prime(node.z) * back;
				node.set_error(error, prev.iter().map(|n| n.a));
			}
		}
	}

	fn parameter_nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
		self.layers.iter_mut().skip(1).flatten()
	}

	pub fn reset_accumulated_nablas(&mut self) {
		self.parameter_nodes_mut().for_each(Node::reset_accumulated_nablas);
	}

	pub fn reset_velocities(&mut self) {
		self.parameter_nodes_mut().for_each(Node::reset_velocities);
	}

	/// Sum the nablas of every sample of ``mini_batch`` into the nodes'
	/// accumulators.
	fn accumulate_nablas(&mut self, mini_batch: &[Sample]) {
		#[cfg(feature = "rayon")]
		{
			if mini_batch.len() >= PARALLEL_BATCH_LEN {
				self.accumulate_nablas_parallel(mini_batch);
				return;
			}
		}
		self.accumulate_nablas_serial(mini_batch);
	}

	fn accumulate_nablas_serial(&mut self, mini_batch: &[Sample]) {
		self.reset_accumulated_nablas();
		for sample in mini_batch {
			self.backprop(sample);
			self.parameter_nodes_mut().for_each(Node::accumulate_nablas);
		}
	}

	/// Each rayon job backpropagates into its own copy of the network and
	/// sums into its own nablas; the partial sums are reduced at the end.
	#[cfg(feature = "rayon")]
	fn accumulate_nablas_parallel(&mut self, mini_batch: &[Sample]) {
		use rayon::prelude::*;

		let this: &Network = self;
		let sums = mini_batch.par_iter()
			.fold(
				|| (this.clone(), this.zero_nablas()),
				|(mut scratch, mut sums), sample| {
					scratch.backprop(sample);
					sums.iter_mut().zip(scratch.layers.iter().skip(1))
						.for_each(|(sum, layer)| {
							sum.iter_mut().zip(layer).for_each(|(s, node)| *s += node);
						});
					(scratch, sums)
				},
			)
			.map(|(_, sums)| sums)
			.reduce(
				|| this.zero_nablas(),
				|mut left, right| {
					left.iter_mut().zip(right.iter())
						.for_each(|(l, r)| l.iter_mut().zip(r).for_each(|(l, r)| *l += r));
					left
				},
			);

		for (layer, sums) in self.layers.iter_mut().skip(1).zip(sums) {
			for (node, sum) in layer.iter_mut().zip(sums) {
				node.acc_bias_nabla = sum.bias;
				node.acc_weights_nabla = sum.weights;
			}
		}
	}

	/// zeroed nablas for every non-input layer
	#[cfg(feature = "rayon")]
	fn zero_nablas(&self) -> Vec<Vec<NodeNabla>> {
		self.layers.iter().skip(1)
			.map(|layer| layer.iter().map(|n| NodeNabla::zero(n.input_count())).collect())
			.collect()
	}

	/// Update the network's weights and biases by applying plain
	/// gradient descent using backpropagation to a single mini batch.
	/// ``eta`` is the learning rate.
	pub fn update_mini_batch(&mut self, mini_batch: &[Sample], eta: f64) -> Result<()> {
		self.check_batch(mini_batch)?;
		self.plain_step(mini_batch, eta);
		Ok(())
	}

	/// Update the network's weights and biases through the momentum
	/// velocities for a single mini batch.  ``weight_decay`` is the
	/// L2 shrink factor ``1 - eta * lambda / n`` and ``momentum`` the
	/// momentum coefficient.  Velocities carry over from the previous
	/// call; see ``reset_velocities``.
	pub fn momentum_update_mini_batch(
		&mut self,
		mini_batch: &[Sample],
		eta: f64,
		weight_decay: f64,
		momentum: f64,
	) -> Result<()> {
		self.check_batch(mini_batch)?;
		self.momentum_step(mini_batch, eta, weight_decay, momentum);
		Ok(())
	}

	fn plain_step(&mut self, mini_batch: &[Sample], eta: f64) {
		self.accumulate_nablas(mini_batch);
		let eta_scaled = eta / mini_batch.len() as f64;
		self.parameter_nodes_mut().for_each(|node| node.apply_gradient(eta_scaled));
	}

	fn momentum_step(&mut self, mini_batch: &[Sample], eta: f64, weight_decay: f64, momentum: f64) {
		self.accumulate_nablas(mini_batch);
		let eta_scaled = eta / mini_batch.len() as f64;
		self.parameter_nodes_mut()
			.for_each(|node| node.apply_momentum(eta_scaled, weight_decay, momentum));
	}

	fn sgd_epoch(&mut self, training_data: &mut [Sample], options: &TrainingOptions, rng: &mut dyn RngCore) {
		training_data.shuffle(rng);
		for mini_batch in training_data.chunks(options.mini_batch_size) {
			self.plain_step(mini_batch, options.eta);
		}
	}

	fn momentum_sgd_epoch(&mut self, training_data: &mut [Sample], options: &TrainingOptions, rng: &mut dyn RngCore) {
		self.reset_velocities();
		training_data.shuffle(rng);

		let weight_decay = 1.0 - options.eta * options.lambda / training_data.len() as f64;
		for mini_batch in training_data.chunks(options.mini_batch_size) {
			self.momentum_step(mini_batch, options.eta, weight_decay, options.momentum);
		}
	}

	/// Train the neural network using plain mini-batch stochastic
	/// gradient descent.  ``training_data`` is shuffled in place before
	/// every epoch.  Accuracy (through ``compare``) and cost on
	/// ``test_data`` are written to ``out`` before training and after
	/// every epoch; an empty ``test_data`` disables the report.
	/// ``options.lambda`` only enters the reported cost, and
	/// ``options.momentum`` is ignored.
	pub fn sgd<F, W>(
		&mut self,
		options: &TrainingOptions,
		training_data: &mut [Sample],
		test_data: &[Sample],
		compare: F,
		out: &mut W,
	) -> Result<()>
	where
		F: Fn(&[f64], &[f64]) -> bool,
		W: Write + ?Sized,
	{
		self.sgd_with_rng(options, training_data, test_data, compare, out, &mut rand::rng())
	}

	pub fn sgd_with_rng<F, W>(
		&mut self,
		options: &TrainingOptions,
		training_data: &mut [Sample],
		test_data: &[Sample],
		compare: F,
		out: &mut W,
		rng: &mut dyn RngCore,
	) -> Result<()>
	where
		F: Fn(&[f64], &[f64]) -> bool,
		W: Write + ?Sized,
	{
		self.train(Descent::Plain, options, training_data, test_data, &compare, out, rng)
	}

	/// Train the neural network using mini-batch stochastic gradient
	/// descent with momentum and L2 regularization.  Velocities start at
	/// zero at the beginning of every epoch, and the weight decay factor
	/// ``1 - eta * lambda / n`` uses the size ``n`` of the whole training
	/// set.  Reporting works as in ``sgd``.
	pub fn momentum_sgd<F, W>(
		&mut self,
		options: &TrainingOptions,
		training_data: &mut [Sample],
		test_data: &[Sample],
		compare: F,
		out: &mut W,
	) -> Result<()>
	where
		F: Fn(&[f64], &[f64]) -> bool,
		W: Write + ?Sized,
	{
		self.momentum_sgd_with_rng(options, training_data, test_data, compare, out, &mut rand::rng())
	}

	pub fn momentum_sgd_with_rng<F, W>(
		&mut self,
		options: &TrainingOptions,
		training_data: &mut [Sample],
		test_data: &[Sample],
		compare: F,
		out: &mut W,
		rng: &mut dyn RngCore,
	) -> Result<()>
	where
		F: Fn(&[f64], &[f64]) -> bool,
		W: Write + ?Sized,
	{
		self.train(Descent::Momentum, options, training_data, test_data, &compare, out, rng)
	}

	#[allow(clippy::too_many_arguments)]
	fn train<W: Write + ?Sized>(
		&mut self,
		descent: Descent,
		options: &TrainingOptions,
		training_data: &mut [Sample],
		test_data: &[Sample],
		compare: &dyn Fn(&[f64], &[f64]) -> bool,
		out: &mut W,
		rng: &mut dyn RngCore,
	) -> Result<()> {
		if options.mini_batch_size == 0 {
			return Err(NetworkError::InvalidConfiguration("mini-batch size must be positive"));
		}
		if training_data.is_empty() {
			return Err(NetworkError::InvalidConfiguration("training set is empty"));
		}
		for sample in training_data.iter().chain(test_data) {
			self.check_sample(sample)?;
		}

		info!("training with {} samples, {} test samples ({:?}, {:?})",
			training_data.len(), test_data.len(), descent, options);
		self.report(out, "Before", test_data, compare, options.lambda)?;

		for epoch in 0..options.epochs {
			let t = Local::now();
			match descent {
				Descent::Plain => self.sgd_epoch(training_data, options, rng),
				Descent::Momentum => self.momentum_sgd_epoch(training_data, options, rng),
			}
			let elapsed = (Local::now() - t).num_milliseconds() as f64 / 1000.0;
			debug!("epoch {} took {:.1}s", epoch + 1, elapsed);

			self.report(out, &format!("Epoch {}", epoch + 1), test_data, compare, options.lambda)?;
		}
		Ok(())
	}

	fn report<W: Write + ?Sized>(
		&mut self,
		out: &mut W,
		label: &str,
		test_data: &[Sample],
		compare: &dyn Fn(&[f64], &[f64]) -> bool,
		lambda: f64,
	) -> Result<()> {
		if test_data.is_empty() {
			return Ok(());
		}
		let correct = self.evaluate(test_data, compare)?;
		let cost = self.cost(test_data, lambda)?;
		let line = format!("{} - Accuracy: {} / {} - Cost: {}", label, correct, test_data.len(), cost);
		info!("{}", line);
		writeln!(out, "{}", line)?;
		Ok(())
	}

	/// Return the number of test inputs for which ``compare(expected,
	/// actual)`` holds, ``actual`` being the network's output.
	pub fn evaluate<F>(&mut self, test_data: &[Sample], compare: F) -> Result<usize>
	where
		F: Fn(&[f64], &[f64]) -> bool,
	{
		let mut correct = 0;
		for sample in test_data {
			self.check_sample(sample)?;
			self.feed(&sample.inputs);
			let actual = self.outputs();
			if compare(&sample.expected_outputs[..], &actual[..]) {
				correct += 1;
			}
		}
		Ok(correct)
	}

	/// Return the total cost for ``samples``: the summed cost of every
	/// output node, plus ``0.5 * lambda * Σ w²`` once, all divided by the
	/// number of samples.
	pub fn cost(&mut self, samples: &[Sample], lambda: f64) -> Result<f64> {
		if samples.is_empty() {
			return Err(NetworkError::InvalidConfiguration("cannot compute the cost of an empty dataset"));
		}
		let cf = self.cf;
		let mut cost = 0.0;
		for sample in samples {
			self.check_sample(sample)?;
			self.feed(&sample.inputs);
			cost += self.layers[self.layers.len() - 1].iter()
				.zip(&sample.expected_outputs)
				.map(|(node, &y)| cf.f(node.a, y))
				.sum::<f64>();
		}
		let squared_weights: f64 = self.layers.iter().skip(1).flatten()
			.flat_map(|node| node.weights.iter())
			.map(|w| w * w)
			.sum();
		Ok((cost + 0.5 * lambda * squared_weights) / samples.len() as f64)
	}

	fn check_batch(&self, mini_batch: &[Sample]) -> Result<()> {
		if mini_batch.is_empty() {
			return Err(NetworkError::InvalidConfiguration("mini-batch is empty"));
		}
		mini_batch.iter().try_for_each(|s| self.check_sample(s))
	}

	fn check_sample(&self, sample: &Sample) -> Result<()> {
		check_len("sample inputs", sample.inputs.len(), self.input_len())?;
		check_len("sample expected outputs", sample.expected_outputs.len(), self.output_len())
	}
}

fn check_len(what: &'static str, got: usize, expected: usize) -> Result<()> {
	if got != expected {
		return Err(NetworkError::DimensionMismatch { what, got, expected });
	}
	Ok(())
}
