use std::io;

use rand::{rngs::StdRng, Rng, SeedableRng};

use backprop_nn::{
	argmax_matches, ActivationFunction, CostFunction, Network, NetworkError, Sample, TrainingOptions,
	WeightInitializer,
};

const CENTERS: [(f64, f64); 4] = [(0.15, 0.15), (0.85, 0.15), (0.15, 0.85), (0.85, 0.85)];

/// points scattered around the four corners of the unit square, one class
/// per corner
fn corners(rng: &mut StdRng, per_class: usize) -> Vec<Sample> {
	let mut samples = Vec::with_capacity(per_class * CENTERS.len());
	for _ in 0..per_class {
		for (label, &(cx, cy)) in CENTERS.iter().enumerate() {
			let x = cx + rng.random_range(-0.1..0.1);
			let y = cy + rng.random_range(-0.1..0.1);
			samples.push(Sample::one_hot(vec![x, y], label, CENTERS.len()));
		}
	}
	samples
}

fn seeded_network(shape: &[usize], rng: &mut StdRng) -> Network {
	Network::with_initializer(
		shape,
		ActivationFunction::SIGMOID,
		CostFunction::CROSS_ENTROPY,
		WeightInitializer::DEFAULT,
		rng,
	)
	.unwrap()
}

#[test]
fn training_lowers_the_cost() {
	let options = TrainingOptions { epochs: 20, mini_batch_size: 4, eta: 0.5, lambda: 0.0, momentum: 0.5 };
	let mut improved = 0;
	for seed in 0..10 {
		let mut rng = StdRng::seed_from_u64(seed);
		let mut training = corners(&mut rng, 10);
		let test = corners(&mut rng, 5);
		let mut net = seeded_network(&[2, 8, 4], &mut rng);

		let before = net.cost(&test, 0.0).unwrap();
		net.momentum_sgd_with_rng(&options, &mut training, &[], argmax_matches, &mut io::sink(), &mut rng)
			.unwrap();
		let after = net.cost(&test, 0.0).unwrap();
		if after < before {
			improved += 1;
		}
	}
	assert!(improved >= 9, "cost went down for only {} of 10 seeds", improved);
}

#[test]
fn plain_sgd_learns_the_corners() {
	let mut rng = StdRng::seed_from_u64(42);
	let mut training = corners(&mut rng, 25);
	let test = corners(&mut rng, 10);
	let mut net = seeded_network(&[2, 8, 4], &mut rng);

	let options = TrainingOptions { epochs: 60, mini_batch_size: 5, eta: 2.0, ..TrainingOptions::default() };
	let before = net.cost(&test, 0.0).unwrap();
	net.sgd_with_rng(&options, &mut training, &[], argmax_matches, &mut io::sink(), &mut rng).unwrap();

	assert!(net.cost(&test, 0.0).unwrap() < before);
	assert!(net.evaluate(&test, argmax_matches).unwrap() >= 30);
}

#[test]
fn saved_network_computes_the_same_outputs() {
	let mut rng = StdRng::seed_from_u64(7);
	let mut training = corners(&mut rng, 5);
	let mut net = seeded_network(&[2, 5, 3, 4], &mut rng);
	let options = TrainingOptions { epochs: 2, mini_batch_size: 3, eta: 0.3, lambda: 1.0, momentum: 0.2 };
	net.momentum_sgd_with_rng(&options, &mut training, &[], argmax_matches, &mut io::sink(), &mut rng)
		.unwrap();

	let mut buf = Vec::new();
	net.write_to(&mut buf).unwrap();
	let mut copy = Network::read_from(&buf[..], ActivationFunction::SIGMOID, CostFunction::CROSS_ENTROPY).unwrap();

	for probe in [[0.0, 0.0], [0.3, 0.9], [1.0, -2.5], [123.0, 0.001]] {
		let a = net.calculate(&probe).unwrap();
		let b = copy.calculate(&probe).unwrap();
		assert_eq!(a.len(), b.len());
		for (x, y) in a.iter().zip(&b) {
			assert_eq!(x.to_bits(), y.to_bits());
		}
	}
}

#[test]
fn loaded_network_keeps_training() {
	let mut rng = StdRng::seed_from_u64(3);
	let mut training = corners(&mut rng, 10);
	let test = corners(&mut rng, 5);
	let mut net = seeded_network(&[2, 6, 4], &mut rng);
	let options = TrainingOptions { epochs: 5, mini_batch_size: 4, eta: 0.5, lambda: 0.0, momentum: 0.3 };
	net.momentum_sgd_with_rng(&options, &mut training, &[], argmax_matches, &mut io::sink(), &mut rng)
		.unwrap();

	let text = net.to_string();
	let mut loaded = Network::parse(&text, ActivationFunction::SIGMOID, CostFunction::CROSS_ENTROPY).unwrap();
	assert_eq!(loaded.shape(), vec![2, 6, 4]);

	let mut out = Vec::new();
	loaded.momentum_sgd_with_rng(&options, &mut training, &test, argmax_matches, &mut out, &mut rng).unwrap();
	let report = String::from_utf8(out).unwrap();
	assert_eq!(report.lines().count(), options.epochs + 1);
	assert!(report.lines().all(|l| l.contains(" / 20 - Cost: ")));
}

#[test]
fn autoencoder_learns_to_reproduce_its_input() {
	let mut rng = StdRng::seed_from_u64(11);
	let patterns: Vec<Sample> = (0..4)
		.map(|k| Sample::autoencoder((0..4).map(|i| if i == k { 0.9 } else { 0.1 }).collect()))
		.collect();
	let mut training: Vec<Sample> = patterns.iter().cycle().take(40).cloned().collect();
	let mut net = seeded_network(&[4, 3, 4], &mut rng);

	let before = net.cost(&patterns, 0.0).unwrap();
	let options = TrainingOptions { epochs: 40, mini_batch_size: 4, eta: 1.0, lambda: 0.0, momentum: 0.5 };
	let mut out = Vec::new();
	net.momentum_sgd_with_rng(&options, &mut training, &patterns, argmax_matches, &mut out, &mut rng)
		.unwrap();

	assert!(net.cost(&patterns, 0.0).unwrap() < before);
	assert_eq!(String::from_utf8(out).unwrap().lines().count(), options.epochs + 1);
}

#[test]
fn truncated_file_is_rejected() {
	let mut rng = StdRng::seed_from_u64(1);
	let net = seeded_network(&[3, 2, 2], &mut rng);
	let text = net.to_string();
	let cut = &text[..text.len() / 2];
	let res = Network::parse(cut.trim_end(), ActivationFunction::SIGMOID, CostFunction::CROSS_ENTROPY);
	assert!(matches!(res, Err(NetworkError::CorruptFormat(_))));
}

#[test]
fn dimension_errors_surface_through_training() {
	let mut rng = StdRng::seed_from_u64(5);
	let mut net = seeded_network(&[2, 3, 4], &mut rng);
	let mut training = corners(&mut rng, 2);
	let test = vec![Sample::one_hot(vec![0.5, 0.5], 1, 3)];
	let res = net.sgd(&TrainingOptions::default(), &mut training, &test, argmax_matches, &mut io::sink());
	match res {
		Err(NetworkError::DimensionMismatch { got: 3, expected: 4, .. }) => {}
		other => panic!("unexpected {:?}", other),
	}
}
