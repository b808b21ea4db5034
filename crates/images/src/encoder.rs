use crate::{
	consts::{GIF_QUANTIZE_SAMPLE_FACTOR, JPEG_QUALITY},
	Animation, AnimationFrame, DecodedImage, Error, Repeat, Result,
};

use std::{borrow::Cow, fmt, io::Cursor, str::FromStr};

use color_quant::NeuQuant;
use image::{
	imageops::{dither, index_colors},
	DynamicImage, ImageOutputFormat, RgbaImage,
};
use tracing::trace;

/// Output format of a thumbnail, also used as the cache key extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThumbnailType {
	Png,
	Jpg,
	Gif,
}

impl ThumbnailType {
	#[must_use]
	pub const fn extension(&self) -> &'static str {
		match self {
			Self::Png => "png",
			Self::Jpg => "jpg",
			Self::Gif => "gif",
		}
	}

	#[must_use]
	pub const fn mime_type(&self) -> &'static str {
		Encoder::for_type(*self).mime_type()
	}
}

impl FromStr for ThumbnailType {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		let requested = s.trim().to_ascii_lowercase();

		[Encoder::Png, Encoder::Jpeg, Encoder::Gif]
			.into_iter()
			.find(|encoder| encoder.types().contains(&requested.as_str()))
			.map(Encoder::thumbnail_type)
			.ok_or_else(|| Error::UnsupportedType(s.to_string()))
	}
}

impl fmt::Display for ThumbnailType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.extension())
	}
}

/// Serializes a generated image into the bytes stored as the artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoder {
	Png,
	Jpeg,
	Gif,
}

impl Encoder {
	#[must_use]
	pub const fn for_type(thumbnail_type: ThumbnailType) -> Self {
		match thumbnail_type {
			ThumbnailType::Png => Self::Png,
			ThumbnailType::Jpg => Self::Jpeg,
			ThumbnailType::Gif => Self::Gif,
		}
	}

	const fn thumbnail_type(self) -> ThumbnailType {
		match self {
			Self::Png => ThumbnailType::Png,
			Self::Jpeg => ThumbnailType::Jpg,
			Self::Gif => ThumbnailType::Gif,
		}
	}

	/// Requested type names this encoder produces output for
	#[must_use]
	pub const fn types(&self) -> &'static [&'static str] {
		match self {
			Self::Png => &["png", "ggs", "ggp"],
			Self::Jpeg => &["jpg", "jpeg", "heic", "webp"],
			Self::Gif => &["gif"],
		}
	}

	#[must_use]
	pub const fn mime_type(&self) -> &'static str {
		match self {
			Self::Png => "image/png",
			Self::Jpeg => "image/jpeg",
			Self::Gif => "image/gif",
		}
	}

	pub fn encode(&self, img: DecodedImage) -> Result<Vec<u8>> {
		let mut bytes = Vec::new();

		match self {
			Self::Png => img
				.into_still()?
				.write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)?,

			Self::Jpeg => DynamicImage::ImageRgb8(img.into_still()?.to_rgb8())
				.write_to(
					&mut Cursor::new(&mut bytes),
					ImageOutputFormat::Jpeg(JPEG_QUALITY),
				)?,

			Self::Gif => {
				let animation = match img {
					DecodedImage::Animation(animation) => animation,
					DecodedImage::Still(still) => Animation::single_frame(still.to_rgba8()),
				};
				bytes = encode_gif(&animation, bytes)?;
			}
		}

		trace!(encoder = ?self, size = bytes.len(), "Encoded thumbnail");

		Ok(bytes)
	}
}

impl Animation {
	fn single_frame(image: RgbaImage) -> Self {
		Self {
			width: image.width(),
			height: image.height(),
			repeat: Repeat::Finite(0),
			frames: vec![AnimationFrame {
				image,
				delay: 0,
				disposal: crate::Disposal::Keep,
			}],
		}
	}
}

fn encode_gif(animation: &Animation, bytes: Vec<u8>) -> Result<Vec<u8>> {
	let too_large = || Error::AnimationTooLarge {
		width: animation.width,
		height: animation.height,
	};

	let width = u16::try_from(animation.width).map_err(|_| too_large())?;
	let height = u16::try_from(animation.height).map_err(|_| too_large())?;

	let mut encoder = gif::Encoder::new(bytes, width, height, &[])?;
	// a zero loop count is written as "loop forever", so play-once gifs carry no extension
	if animation.repeat != Repeat::Finite(0) {
		encoder.set_repeat(animation.repeat)?;
	}

	for frame in &animation.frames {
		let frame_width = u16::try_from(frame.image.width()).map_err(|_| too_large())?;
		let frame_height = u16::try_from(frame.image.height()).map_err(|_| too_large())?;

		let (palette, indices, transparent) = quantize(&frame.image);

		encoder.write_frame(&gif::Frame {
			width: frame_width,
			height: frame_height,
			delay: frame.delay,
			dispose: frame.disposal,
			transparent,
			palette: Some(palette),
			buffer: Cow::Owned(indices),
			..gif::Frame::default()
		})?;
	}

	Ok(encoder.into_inner()?)
}

/// Reduces a frame to at most 256 colours, error diffusing (Floyd-Steinberg) the
/// difference, returning the rgb palette, the per pixel indices and the transparent
/// palette entry, if any.
fn quantize(frame: &RgbaImage) -> (Vec<u8>, Vec<u8>, Option<u8>) {
	let quantizer = NeuQuant::new(GIF_QUANTIZE_SAMPLE_FACTOR, 256, frame.as_raw());

	let mut dithered = frame.clone();
	dither(&mut dithered, &quantizer);
	let indices = index_colors(&dithered, &quantizer).into_raw();

	let rgba = quantizer.color_map_rgba();
	let transparent = rgba
		.chunks_exact(4)
		.position(|entry| entry[3] < 128)
		.and_then(|index| u8::try_from(index).ok());
	let palette = rgba
		.chunks_exact(4)
		.flat_map(|entry| entry[..3].iter().copied())
		.collect();

	(palette, indices, transparent)
}
