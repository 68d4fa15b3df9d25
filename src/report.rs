use log::warn;
use make_it_braille::BrailleImg;

use backprop_nn::{argmax, Network, Sample};

const IMAGE_WIDTH: usize = 28;

/// (pixels, label, guess)
type WrongAnswer<'a> = (&'a [f64], usize, usize);

pub struct WrongAnswers<'a> {
	answers: Vec<WrongAnswer<'a>>,
}
impl<'a> WrongAnswers<'a> {
	/// Runs every test sample through the network and keeps those whose
	/// strongest output is not the expected one.
	pub fn collect(network: &mut Network, test_data: &'a [Sample]) -> backprop_nn::Result<Self> {
		let mut answers = Vec::new();
		for sample in test_data {
			let actual = network.calculate(&sample.inputs)?;
			if let (Some(label), Some(guess)) = (argmax(&sample.expected_outputs), argmax(&actual)) {
				if label != guess {
					answers.push((&sample.inputs[..], label, guess));
				}
			}
		}
		Ok(Self { answers })
	}

	pub fn dump(&self) {
		self.answers.chunks(5).for_each(dump_wrong_chunk);
		println!("Wrong guesses: {}", self.answers.len());
	}
}

fn dump_wrong_chunk(chunk: &[WrongAnswer<'_>]) {
	let mut img = BrailleImg::new((IMAGE_WIDTH * chunk.len()) as u32, IMAGE_WIDTH as u32);
	let mut labels: String = String::new();
	let mut guesses: String = String::new();
	chunk.iter().enumerate().for_each(|(i, (pixels, label, guess))| {
		draw_image(&mut img, pixels, (i * IMAGE_WIDTH) as u32, 0);
		labels.push_str(&format!(" Label: {:?}      ", label));
		guesses.push_str(&format!("(Guess: {:?})     ", guess));
	});
	println!("{}", img.as_str(false, true));
	println!("{}", labels);
	println!("{}", guesses);
}

fn draw_image(img: &mut BrailleImg, pixels: &[f64], x: u32, y: u32) {
	pixels.chunks(IMAGE_WIDTH).enumerate().for_each(|(y1, rows)| {
		rows.iter().enumerate().for_each(|(x1, val)| {
			if img.set_dot(x + x1 as u32, y + y1 as u32, *val > 0.5).is_err() {
				warn!("dot ({}, {}) is outside the image", x + x1 as u32, y + y1 as u32);
			}
		});
	});
}
