use std::{fmt, io};

/// Errors produced by the network when it is fed invalid shapes,
/// hyperparameters or persisted data.
#[derive(Debug)]
pub enum NetworkError {
	/// A sample or input vector does not fit the network topology.
	DimensionMismatch {
		/// What was being checked (e.g. "inputs", "expected outputs").
		what: &'static str,
		/// Observed length.
		got: usize,
		/// Length required by the topology.
		expected: usize,
	},

	/// A persisted network could not be parsed.
	CorruptFormat(String),

	/// Hyperparameters or topology make training impossible.
	InvalidConfiguration(&'static str),

	/// Writing progress or persisting the network failed.
	Io(io::Error),
}

impl fmt::Display for NetworkError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			NetworkError::DimensionMismatch { what, got, expected } => {
				write!(f, "dimension mismatch for {what}: got {got}, expected {expected}")
			}
			NetworkError::CorruptFormat(msg) => write!(f, "corrupt network format: {msg}"),
			NetworkError::InvalidConfiguration(msg) => write!(f, "invalid configuration: {msg}"),
			NetworkError::Io(e) => write!(f, "io error: {e}"),
		}
	}
}

impl std::error::Error for NetworkError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			NetworkError::Io(e) => Some(e),
			_ => None,
		}
	}
}

impl From<io::Error> for NetworkError {
	fn from(e: io::Error) -> Self {
		NetworkError::Io(e)
	}
}

pub type Result<T> = std::result::Result<T, NetworkError>;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn display_names_the_mismatch() {
		let e = NetworkError::DimensionMismatch { what: "inputs", got: 3, expected: 2 };
		assert_eq!(e.to_string(), "dimension mismatch for inputs: got 3, expected 2");
	}

	#[test]
	fn io_errors_keep_their_source() {
		let e: NetworkError = io::Error::other("sink closed").into();
		assert!(std::error::Error::source(&e).is_some());
		assert!(e.to_string().contains("sink closed"));
	}
}
