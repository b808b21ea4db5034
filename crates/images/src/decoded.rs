use image::{DynamicImage, GenericImageView, RgbaImage};

pub use gif::{DisposalMethod as Disposal, Repeat};

/// In-memory result of decoding a source file, and of scaling one.
///
/// Lives only for the duration of a single generation, it's never persisted as is.
#[derive(Debug, Clone)]
pub enum DecodedImage {
	Still(DynamicImage),
	Animation(Animation),
}

impl DecodedImage {
	#[must_use]
	pub fn dimensions(&self) -> (u32, u32) {
		match self {
			Self::Still(img) => img.dimensions(),
			Self::Animation(animation) => (animation.width, animation.height),
		}
	}

	/// Collapses an animation into its first frame, stills are returned untouched
	pub fn into_still(self) -> crate::Result<DynamicImage> {
		match self {
			Self::Still(img) => Ok(img),
			Self::Animation(animation) => animation
				.frames
				.into_iter()
				.next()
				.map(|frame| DynamicImage::ImageRgba8(frame.image))
				.ok_or(crate::Error::EmptyAnimation),
		}
	}
}

/// A sequence of frames, each one already composited onto the full logical screen
#[derive(Debug, Clone)]
pub struct Animation {
	pub width: u32,
	pub height: u32,
	pub repeat: Repeat,
	pub frames: Vec<AnimationFrame>,
}

#[derive(Debug, Clone)]
pub struct AnimationFrame {
	pub image: RgbaImage,
	/// Frame delay in units of 10ms
	pub delay: u16,
	pub disposal: Disposal,
}
