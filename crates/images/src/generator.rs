use crate::{Animation, AnimationFrame, DecodedImage, Processor, Result, ThumbnailType};

use image::DynamicImage;
use tracing::trace;

/// Scales a decoded image to the target size.
///
/// Only gif output can carry an animation, every other type gets the first frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generator {
	Simple,
	Gif,
}

impl Generator {
	#[must_use]
	pub const fn for_type(thumbnail_type: ThumbnailType) -> Self {
		match thumbnail_type {
			ThumbnailType::Gif => Self::Gif,
			ThumbnailType::Png | ThumbnailType::Jpg => Self::Simple,
		}
	}

	pub fn generate(
		&self,
		(width, height): (u32, u32),
		processor: Processor,
		img: DecodedImage,
	) -> Result<DecodedImage> {
		match (self, img) {
			(Self::Gif, DecodedImage::Animation(animation)) => {
				resize_animation(animation, width, height, processor).map(DecodedImage::Animation)
			}
			(_, img) => processor
				.process(&img.into_still()?, width, height)
				.map(DecodedImage::Still),
		}
	}
}

/// Every frame goes through the same strategy, so they all end up with the same
/// dimensions, which become the new logical screen.
fn resize_animation(
	animation: Animation,
	width: u32,
	height: u32,
	processor: Processor,
) -> Result<Animation> {
	let Animation {
		width: src_width,
		height: src_height,
		repeat,
		frames,
	} = animation;

	let frames = frames
		.into_iter()
		.map(|frame| {
			processor
				.process(&DynamicImage::ImageRgba8(frame.image), width, height)
				.map(|resized| AnimationFrame {
					image: resized.into_rgba8(),
					delay: frame.delay,
					disposal: frame.disposal,
				})
		})
		.collect::<Result<Vec<_>>>()?;

	let (new_width, new_height) = frames
		.first()
		.map_or((width, height), |frame| frame.image.dimensions());

	trace!(
		src_width,
		src_height,
		new_width,
		new_height,
		frames = frames.len(),
		"Resized animation"
	);

	Ok(Animation {
		width: new_width,
		height: new_height,
		repeat,
		frames,
	})
}
