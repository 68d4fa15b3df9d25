mod dataset;
mod report;

use std::{
	fmt::Display,
	fs::File,
	io::{self, BufReader, BufWriter},
	path::PathBuf,
	str::FromStr,
};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use log::info;

use backprop_nn::{argmax_matches, ActivationFunction, CostFunction, Network, TrainingOptions};
use report::WrongAnswers;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Descent {
	/// plain mini-batch SGD
	Sgd,
	/// SGD with momentum and L2 weight decay
	Momentum,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Activation {
	Sigmoid,
	FastSigmoid,
	Tanh,
}
impl From<Activation> for ActivationFunction {
	fn from(a: Activation) -> Self {
		match a {
			Activation::Sigmoid => ActivationFunction::SIGMOID,
			Activation::FastSigmoid => ActivationFunction::FAST_SIGMOID,
			Activation::Tanh => ActivationFunction::TANH,
		}
	}
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Cost {
	Quadratic,
	CrossEntropy,
}
impl From<Cost> for CostFunction {
	fn from(c: Cost) -> Self {
		match c {
			Cost::Quadratic => CostFunction::QUADRATIC,
			Cost::CrossEntropy => CostFunction::CROSS_ENTROPY,
		}
	}
}

/// One training run on the same network.  ``EPOCHS:BATCH:ETA:LAMBDA``
/// trains with plain SGD, ``EPOCHS:BATCH:ETA:LAMBDA:MOMENTUM`` with momentum.
#[derive(Debug, Clone)]
struct Phase {
	descent: Descent,
	options: TrainingOptions,
}

fn parse_phase(s: &str) -> Result<Phase, String> {
	let fields: Vec<&str> = s.split(':').collect();
	if !(4..=5).contains(&fields.len()) {
		return Err(format!("expected EPOCHS:BATCH:ETA:LAMBDA[:MOMENTUM], got {:?}", s));
	}
	let (descent, momentum) = match fields.get(4) {
		Some(m) => (Descent::Momentum, field(m, "momentum")?),
		None => (Descent::Sgd, 0.0),
	};
	let options = TrainingOptions {
		epochs: field(fields[0], "epochs")?,
		mini_batch_size: field(fields[1], "mini-batch size")?,
		eta: field(fields[2], "eta")?,
		lambda: field(fields[3], "lambda")?,
		momentum,
	};
	Ok(Phase { descent, options })
}

fn field<T>(text: &str, what: &str) -> Result<T, String>
where
	T: FromStr,
	T::Err: Display,
{
	text.parse().map_err(|e| format!("invalid {} {:?}: {}", what, text, e))
}

/// Trains a feedforward network on the MNIST handwritten digits
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
	/// Folder with the uncompressed MNIST idx files
	#[arg(long, default_value = "data")]
	data: PathBuf,
	/// Sizes of the hidden layers, comma separated
	#[arg(long, value_delimiter = ',', default_value = "100")]
	hidden: Vec<usize>,
	#[arg(long, value_enum, default_value_t = Descent::Momentum)]
	descent: Descent,
	#[arg(long, value_enum, default_value_t = Activation::Sigmoid)]
	activation: Activation,
	#[arg(long, value_enum, default_value_t = Cost::CrossEntropy)]
	cost: Cost,
	#[arg(long, default_value_t = 30)]
	epochs: usize,
	#[arg(long, default_value_t = 10)]
	mini_batch_size: usize,
	/// Learning rate
	#[arg(long, default_value_t = 0.1)]
	eta: f64,
	/// L2 regularization parameter
	#[arg(long, default_value_t = 5.0)]
	lambda: f64,
	/// Momentum coefficient
	#[arg(long, default_value_t = 0.3)]
	momentum: f64,
	#[arg(long, default_value_t = 60_000)]
	training_len: u32,
	#[arg(long, default_value_t = 10_000)]
	test_len: u32,
	/// Continue training a network saved earlier; its file defines the topology
	#[arg(long)]
	load: Option<PathBuf>,
	/// Where to save the trained network
	#[arg(long)]
	save: Option<PathBuf>,
	/// Training phase EPOCHS:BATCH:ETA:LAMBDA[:MOMENTUM], repeatable; the
	/// phases run in order on the same network and replace the single run
	/// described by the other training flags
	#[arg(long = "phase", value_parser = parse_phase)]
	phases: Vec<Phase>,
	/// Print every misclassified test digit after training
	#[arg(long)]
	dump_wrong: bool,
}

fn main() -> anyhow::Result<()> {
	env_logger::init();
	let args = Args::parse();

	let data = dataset::import_images(&args.data, args.training_len, args.test_len)?;
	let (af, cf) = (args.activation.into(), args.cost.into());

	let mut network = match &args.load {
		Some(path) => {
			let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
			let network = Network::read_from(BufReader::new(file), af, cf)
				.with_context(|| format!("reading {}", path.display()))?;
			info!("loaded network {:?} from {}", network.shape(), path.display());
			network
		}
		None => {
			let mut shape = vec![data.input_len()];
			shape.extend(&args.hidden);
			shape.push(data.output_len());
			Network::new(&shape, af, cf)?
		}
	};

	let phases = if args.phases.is_empty() {
		vec![Phase {
			descent: args.descent,
			options: TrainingOptions {
				epochs: args.epochs,
				mini_batch_size: args.mini_batch_size,
				eta: args.eta,
				lambda: args.lambda,
				momentum: args.momentum,
			},
		}]
	} else {
		args.phases.clone()
	};
	let mut training_data = data.training_data;
	let test_data = data.test_data;
	println!("Training {:?} with {} images...", network.shape(), training_data.len());

	{
		let mut out = io::stdout().lock();
		for (i, Phase { descent, options }) in phases.iter().enumerate() {
			info!("phase {} of {}: {:?} {:?}", i + 1, phases.len(), descent, options);
			match descent {
				Descent::Sgd => network.sgd(options, &mut training_data, &test_data, argmax_matches, &mut out)?,
				Descent::Momentum => network.momentum_sgd(options, &mut training_data, &test_data, argmax_matches, &mut out)?,
			}
		}
	}

	if args.dump_wrong {
		WrongAnswers::collect(&mut network, &test_data)?.dump();
	}

	if let Some(path) = &args.save {
		let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
		network.write_to(&mut BufWriter::new(file))?;
		info!("saved network to {}", path.display());
	}

	println!("Training finished.");
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn phase_without_momentum_is_plain_sgd() {
		let phase = parse_phase("25:15:0.07:5.0").unwrap();
		assert!(matches!(phase.descent, Descent::Sgd));
		assert_eq!(phase.options.epochs, 25);
		assert_eq!(phase.options.mini_batch_size, 15);
		assert_eq!(phase.options.eta, 0.07);
		assert_eq!(phase.options.lambda, 5.0);
	}

	#[test]
	fn phase_with_momentum() {
		let phase = parse_phase("2:10:0.15:4.0:0.8").unwrap();
		assert!(matches!(phase.descent, Descent::Momentum));
		assert_eq!(phase.options.momentum, 0.8);
	}

	#[test]
	fn malformed_phases_are_rejected() {
		for text in ["", "2:10:0.1", "2:10:0.1:4:0.5:1", "x:10:0.1:4", "2:10:fast:4"] {
			assert!(parse_phase(text).is_err(), "{:?}", text);
		}
	}

	#[test]
	fn phases_are_collected_in_order() {
		let args = Args::try_parse_from([
			"backprop-nn", "--phase", "2:10:0.15:4.0:0.8", "--phase", "25:15:0.07:5.0",
		])
		.unwrap();
		assert_eq!(args.phases.len(), 2);
		assert!(matches!(args.phases[0].descent, Descent::Momentum));
		assert!(matches!(args.phases[1].descent, Descent::Sgd));
	}
}
