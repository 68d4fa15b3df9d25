// Text format: whitespace separated tokens
//
//   layer_count input_layer_size
//   layer_size (bias weight_count weight...)...     once per later layer
//
// Floats are written in their shortest round-trip form, so reading a
// written network restores every parameter bit for bit.

use std::{
	fmt,
	io::{self, Read, Write},
	str::{FromStr, SplitWhitespace},
};

use log::debug;

use crate::{
	activation::ActivationFunction,
	cost::CostFunction,
	error::{NetworkError, Result},
	network::Network,
	node::Node,
};

impl fmt::Display for Network {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		writeln!(f, "{} {}", self.layers.len(), self.layers[0].len())?;
		for layer in self.layers.iter().skip(1) {
			write!(f, "{}", layer.len())?;
			for node in layer {
				write!(f, " {} {}", node.bias, node.weights.len())?;
				for w in &node.weights {
					write!(f, " {}", w)?;
				}
			}
			writeln!(f)?;
		}
		Ok(())
	}
}

impl Network {
	pub fn write_to<W: Write + ?Sized>(&self, out: &mut W) -> Result<()> {
		write!(out, "{}", self)?;
		out.flush()?;
		debug!("wrote network {:?}", self.shape());
		Ok(())
	}

	/// Read a network written by ``write_to``.  The topology comes
	/// entirely from the stream; ``af`` and ``cf`` are not persisted and
	/// must be supplied.  Anything after the last node is ignored.
	pub fn read_from<R: Read>(mut reader: R, af: ActivationFunction, cf: CostFunction) -> Result<Self> {
		let mut text = String::new();
		reader.read_to_string(&mut text).map_err(|e| match e.kind() {
			io::ErrorKind::InvalidData => NetworkError::CorruptFormat("stream is not valid UTF-8".to_string()),
			_ => NetworkError::Io(e),
		})?;
		Self::parse(&text, af, cf)
	}

	pub fn parse(text: &str, af: ActivationFunction, cf: CostFunction) -> Result<Self> {
		let mut tokens = Tokens(text.split_whitespace());

		let layer_count: usize = tokens.take("layer count")?;
		if layer_count < 2 {
			return Err(NetworkError::CorruptFormat(format!("layer count {} is below 2", layer_count)));
		}
		let input_len: usize = tokens.take("input layer size")?;
		if input_len == 0 {
			return Err(NetworkError::CorruptFormat("input layer is empty".to_string()));
		}

		// the input layer is only allocated once the weights feeding from it
		// have been read, so a size token alone never sizes an allocation
		let mut layers: Vec<Vec<Node>> = vec![Vec::new()];
		let mut prev_len = input_len;
		for x in 1..layer_count {
			let len: usize = tokens.take("layer size")?;
			if len == 0 {
				return Err(NetworkError::CorruptFormat(format!("layer {} is empty", x)));
			}

			let mut layer = Vec::new();
			for y in 0..len {
				let bias: f64 = tokens.take("bias")?;
				let weight_count: usize = tokens.take("weight count")?;
				if weight_count != prev_len {
					return Err(NetworkError::CorruptFormat(format!(
						"node ({}, {}) has {} weights, previous layer has {} nodes",
						x, y, weight_count, prev_len
					)));
				}
				let weights = (0..weight_count)
					.map(|_| tokens.take("weight"))
					.collect::<Result<Vec<f64>>>()?;
				layer.push(Node::with_params(bias, weights));
			}
			prev_len = layer.len();
			layers.push(layer);
		}
		layers[0] = (0..input_len).map(|_| Node::new(0)).collect();

		let network = Network::from_layers(layers, af, cf)?;
		debug!("read network {:?}", network.shape());
		Ok(network)
	}
}

struct Tokens<'a>(SplitWhitespace<'a>);
impl Tokens<'_> {
	fn take<T: FromStr>(&mut self, what: &str) -> Result<T> {
		let token = self.0.next()
			.ok_or_else(|| NetworkError::CorruptFormat(format!("missing {}", what)))?;
		token.parse()
			.map_err(|_| NetworkError::CorruptFormat(format!("invalid {} {:?}", what, token)))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn net() -> Network {
		let layers = vec![
			vec![Node::new(0), Node::new(0)],
			vec![Node::with_params(0.1, vec![0.5, -0.3])],
			vec![Node::with_params(-2.0, vec![1e-20]), Node::with_params(0.0, vec![1.0 / 3.0])],
		];
		Network::from_layers(layers, ActivationFunction::SIGMOID, CostFunction::QUADRATIC).unwrap()
	}

	fn read(text: &str) -> Result<Network> {
		Network::parse(text, ActivationFunction::SIGMOID, CostFunction::QUADRATIC)
	}

	#[test]
	fn writes_layers_in_order() {
		let text = net().to_string();
		let tokens: Vec<&str> = text.split_whitespace().collect();
		assert_eq!(&tokens[..8], &["3", "2", "1", "0.1", "2", "0.5", "-0.3", "2"]);
		assert_eq!(text.lines().count(), 3);
	}

	#[test]
	fn parameters_survive_round_trip() {
		let original = net();
		let mut buf = Vec::new();
		original.write_to(&mut buf).unwrap();
		let copy = Network::read_from(&buf[..], ActivationFunction::SIGMOID, CostFunction::QUADRATIC).unwrap();

		assert_eq!(copy.shape(), original.shape());
		for (a, b) in original.layers().iter().flatten().zip(copy.layers().iter().flatten()) {
			assert_eq!(a.bias.to_bits(), b.bias.to_bits());
			assert_eq!(a.weights, b.weights);
			assert_eq!(b.weights_velocity.len(), b.weights.len());
		}
	}

	#[test]
	fn topology_comes_from_the_stream() {
		let net = read("2 3\n1 0.5 3 1 2 3\n").unwrap();
		assert_eq!(net.shape(), vec![3, 1]);
		assert_eq!(net.layers()[1][0].weights, vec![1.0, 2.0, 3.0]);
	}

	#[test]
	fn corrupt_streams_are_rejected() {
		for text in [
			"",
			"3",
			"1 4",
			"2 0",
			"2 2 1 0.5 2 1.0",
			"2 2 1 0.5 3 1 2 3",
			"2 2 1 abc 2 1 2",
			"2 2 0",
			"-2 2",
			"2 99999999999999999",
			"2 1000000000",
			"2 99999999999999999 1 0.5 99999999999999999 1",
			"2 2 99999999999999999 0.5 2 1 2",
			"3 2 1 0.5 2 1 2 4000000000 0.1 1 1",
		] {
			assert!(matches!(read(text), Err(NetworkError::CorruptFormat(_))), "{:?}", text);
		}
	}

	#[test]
	fn invalid_utf8_is_a_format_error() {
		let bytes: &[u8] = &[0x32, 0x20, 0xff, 0xfe];
		let res = Network::read_from(bytes, ActivationFunction::SIGMOID, CostFunction::QUADRATIC);
		assert!(matches!(res, Err(NetworkError::CorruptFormat(_))));
	}
}
