use std::path::Path;

use anyhow::{bail, ensure, Context};
use log::info;
use mnist::{Mnist, MnistBuilder};

use backprop_nn::Sample;

const IMAGE_LEN: usize = 28 * 28;
const CLASSES: usize = 10;

const FILES: [&str; 4] = [
	"train-images-idx3-ubyte",
	"train-labels-idx1-ubyte",
	"t10k-images-idx3-ubyte",
	"t10k-labels-idx1-ubyte",
];

pub struct Data {
	pub training_data: Vec<Sample>,
	pub test_data: Vec<Sample>,
}
impl Data {
	pub fn input_len(&self) -> usize {
		IMAGE_LEN
	}
	pub fn output_len(&self) -> usize {
		CLASSES
	}
}

/// Loads the uncompressed MNIST idx files found in ``dir``.  Pixels are
/// scaled into [0, 1) and labels one-hot encoded.
pub fn import_images(dir: &Path, training_len: u32, test_len: u32) -> anyhow::Result<Data> {
	ensure!(training_len <= 60_000, "MNIST has only 60000 training images");
	ensure!(test_len <= 10_000, "MNIST has only 10000 test images");
	for file in FILES {
		let path = dir.join(file);
		ensure!(path.is_file(), "missing MNIST file {}", path.display());
	}
	let Some(base_path) = dir.to_str() else {
		bail!("MNIST path {} is not valid UTF-8", dir.display());
	};

	let Mnist { trn_img, trn_lbl, tst_img, tst_lbl, .. } = MnistBuilder::new()
		.base_path(base_path)
		.label_format_digit()
		.training_set_length(training_len)
		.validation_set_length(0)
		.test_set_length(test_len)
		.finalize();

	let training_data = samples(&trn_img, &trn_lbl).context("training set")?;
	let test_data = samples(&tst_img, &tst_lbl).context("test set")?;
	info!("loaded {} training and {} test images", training_data.len(), test_data.len());
	Ok(Data { training_data, test_data })
}

fn samples(images: &[u8], labels: &[u8]) -> anyhow::Result<Vec<Sample>> {
	ensure!(images.len() == labels.len() * IMAGE_LEN,
		"{} pixels do not fit {} labels", images.len(), labels.len());
	Ok(images.chunks(IMAGE_LEN)
		.zip(labels)
		.map(|(pixels, &label)| {
			let inputs = pixels.iter().map(|&p| p as f64 / 256.0).collect();
			Sample::one_hot(inputs, label as usize, CLASSES)
		})
		.collect())
}
