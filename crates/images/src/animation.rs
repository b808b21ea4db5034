use crate::{Animation, AnimationFrame, DecodeLimits, Disposal, Error, Result};

use std::io::Cursor;

use gif::{ColorOutput, DecodeOptions};
use image::{Rgba, RgbaImage};
use tracing::trace;

/// Decodes every frame of a gif, compositing each one onto the logical screen.
///
/// The disposal of a frame is applied *after* it has been captured, so the canvas the
/// next frame is drawn over is the one a viewer would see.
///
/// Every frame holds a full copy of the logical screen, so the screen size is checked
/// before the canvas is allocated and each new frame is counted against the budget of
/// `limits`.
pub fn decode(bytes: &[u8], limits: &DecodeLimits) -> Result<Animation> {
	let mut options = DecodeOptions::new();
	options.set_color_output(ColorOutput::RGBA);

	let mut decoder = options.read_info(Cursor::new(bytes))?;

	let width = u32::from(decoder.width());
	let height = u32::from(decoder.height());
	let repeat = decoder.repeat();

	limits.check_dimensions(width, height)?;

	let mut canvas = RgbaImage::new(width, height);
	let mut frames = Vec::new();

	while let Some(frame) = decoder.read_next_frame()? {
		limits.check_frames(width, height, frames.len() + 1)?;

		let rect = FrameRect {
			left: u32::from(frame.left),
			top: u32::from(frame.top),
			width: u32::from(frame.width),
			height: u32::from(frame.height),
		};
		let disposal = frame.dispose;
		let delay = frame.delay;

		let restore = matches!(disposal, Disposal::Previous).then(|| canvas.clone());

		composite(&mut canvas, &rect, &frame.buffer);

		frames.push(AnimationFrame {
			image: canvas.clone(),
			delay,
			disposal,
		});

		match disposal {
			Disposal::Background => clear(&mut canvas, &rect),
			Disposal::Previous => {
				if let Some(previous) = restore {
					canvas = previous;
				}
			}
			Disposal::Any | Disposal::Keep => {}
		}
	}

	if frames.is_empty() {
		return Err(Error::EmptyAnimation);
	}

	trace!(width, height, frames = frames.len(), "Decoded gif animation");

	Ok(Animation {
		width,
		height,
		repeat,
		frames,
	})
}

struct FrameRect {
	left: u32,
	top: u32,
	width: u32,
	height: u32,
}

impl FrameRect {
	fn pixels(&self, canvas: &RgbaImage) -> impl Iterator<Item = (u32, u32)> + '_ {
		let (canvas_width, canvas_height) = canvas.dimensions();
		let right = (self.left + self.width).min(canvas_width);
		let bottom = (self.top + self.height).min(canvas_height);

		(self.top..bottom).flat_map(move |y| (self.left..right).map(move |x| (x, y)))
	}
}

#[allow(clippy::as_conversions)]
fn composite(canvas: &mut RgbaImage, rect: &FrameRect, buffer: &[u8]) {
	let positions = rect.pixels(canvas).collect::<Vec<_>>();

	for (x, y) in positions {
		let offset = (((y - rect.top) * rect.width + (x - rect.left)) * 4) as usize;

		if let Some(px) = buffer.get(offset..offset + 4) {
			// Transparent pixels let whatever is underneath show through
			if px[3] != 0 {
				canvas.put_pixel(x, y, Rgba([px[0], px[1], px[2], px[3]]));
			}
		}
	}
}

fn clear(canvas: &mut RgbaImage, rect: &FrameRect) {
	let positions = rect.pixels(canvas).collect::<Vec<_>>();

	for (x, y) in positions {
		canvas.put_pixel(x, y, Rgba([0, 0, 0, 0]));
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	use std::borrow::Cow;

	use gif::{Encoder, Frame, Repeat};

	/// 4x4 screen, red full frame followed by a 2x2 blue patch in the bottom right corner
	fn two_frame_gif(first_disposal: Disposal) -> Vec<u8> {
		let palette = [255, 0, 0, 0, 0, 255];
		let mut bytes = Vec::new();
		{
			let mut encoder = Encoder::new(&mut bytes, 4, 4, &palette).unwrap();
			encoder.set_repeat(Repeat::Infinite).unwrap();

			encoder
				.write_frame(&Frame {
					width: 4,
					height: 4,
					delay: 10,
					dispose: first_disposal,
					buffer: Cow::Owned(vec![0; 16]),
					..Frame::default()
				})
				.unwrap();

			encoder
				.write_frame(&Frame {
					left: 2,
					top: 2,
					width: 2,
					height: 2,
					delay: 20,
					dispose: Disposal::Keep,
					buffer: Cow::Owned(vec![1; 4]),
					..Frame::default()
				})
				.unwrap();
		}
		bytes
	}

	/// `frames` 1x1 frames on a `width`x`height` screen
	fn sparse_gif(width: u16, height: u16, frames: usize) -> Vec<u8> {
		let mut bytes = Vec::new();
		{
			let mut encoder = Encoder::new(&mut bytes, width, height, &[0, 0, 0]).unwrap();
			for _ in 0..frames {
				encoder
					.write_frame(&Frame {
						width: 1,
						height: 1,
						buffer: Cow::Owned(vec![0]),
						..Frame::default()
					})
					.unwrap();
			}
		}
		bytes
	}

	#[test]
	fn keeps_frames_delays_and_disposal() {
		let animation = decode(&two_frame_gif(Disposal::Keep), &DecodeLimits::DEFAULT).unwrap();

		assert_eq!((animation.width, animation.height), (4, 4));
		assert_eq!(animation.repeat, Repeat::Infinite);
		assert_eq!(animation.frames.len(), 2);
		assert_eq!(animation.frames[0].delay, 10);
		assert_eq!(animation.frames[1].delay, 20);
		assert_eq!(animation.frames[0].disposal, Disposal::Keep);

		let second = &animation.frames[1].image;
		assert_eq!(second.dimensions(), (4, 4));
		assert_eq!(second.get_pixel(0, 0), &Rgba([255, 0, 0, 255]));
		assert_eq!(second.get_pixel(3, 3), &Rgba([0, 0, 255, 255]));
	}

	#[test]
	fn background_disposal_clears_the_previous_frame() {
		let animation =
			decode(&two_frame_gif(Disposal::Background), &DecodeLimits::DEFAULT).unwrap();

		let second = &animation.frames[1].image;
		assert_eq!(second.get_pixel(0, 0), &Rgba([0, 0, 0, 0]));
		assert_eq!(second.get_pixel(3, 3), &Rgba([0, 0, 255, 255]));
		assert_eq!(animation.frames[0].disposal, Disposal::Background);
	}

	#[test]
	fn truncated_data_is_an_error() {
		let bytes = two_frame_gif(Disposal::Keep);
		assert!(decode(&bytes[..10], &DecodeLimits::DEFAULT).is_err());
	}

	#[test]
	fn screens_over_the_limit_are_rejected_before_decoding_frames() {
		let limits = DecodeLimits {
			max_width: 1000,
			max_height: 1000,
			..DecodeLimits::DEFAULT
		};

		assert!(matches!(
			decode(&sparse_gif(2000, 10, 1), &limits),
			Err(Error::ImageTooLarge { width: 2000, height: 10, .. })
		));
	}

	#[test]
	fn tiny_frames_on_a_large_screen_count_against_the_budget() {
		// 100 frames of a 2000x2000 screen would need 1.6 GB once composited
		let bytes = sparse_gif(2000, 2000, 100);
		assert!(bytes.len() < 4096);

		let limits = DecodeLimits {
			max_decoded_bytes: 64 * 1024 * 1024,
			..DecodeLimits::DEFAULT
		};

		// 16 MB per frame, the fifth one goes over
		assert!(matches!(
			decode(&bytes, &limits),
			Err(Error::DecodedTooLarge { frames: 5, max, .. }) if max == 64 * 1024 * 1024
		));
	}

	#[test]
	fn animations_within_the_budget_decode() {
		let animation = decode(&sparse_gif(20, 20, 30), &DecodeLimits::DEFAULT).unwrap();
		assert_eq!(animation.frames.len(), 30);
	}
}
