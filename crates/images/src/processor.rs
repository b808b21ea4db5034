use crate::{Error, Result};

use std::{fmt, str::FromStr};

use image::{imageops::FilterType, DynamicImage, GenericImageView};

/// Strategy used to bring an image to the target dimensions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Processor {
	/// Keeps the aspect ratio, the result fits within the box
	Fit,
	/// Forces the exact box, distorting the image if needed
	Resize,
	/// Crops the centre of the image to the box aspect ratio, then resizes
	Fill,
	/// Same as `Fill`, but with a faster sampling filter
	#[default]
	Thumbnail,
}

impl Processor {
	#[must_use]
	pub const fn as_str(&self) -> &'static str {
		match self {
			Self::Fit => "fit",
			Self::Resize => "resize",
			Self::Fill => "fill",
			Self::Thumbnail => "thumbnail",
		}
	}

	/// Parses a processing characteristic as sent by clients, where an empty string
	/// means "use the default" and yields `None`.
	pub fn from_characteristic(characteristic: &str) -> Result<Option<Self>> {
		let characteristic = characteristic.trim();
		if characteristic.is_empty() {
			Ok(None)
		} else {
			characteristic.parse().map(Some)
		}
	}

	pub fn process(&self, img: &DynamicImage, width: u32, height: u32) -> Result<DynamicImage> {
		if width == 0 || height == 0 {
			return Err(Error::InvalidDimensions { width, height });
		}

		Ok(match self {
			Self::Fit => img.resize(width, height, FilterType::Lanczos3),
			Self::Resize => img.resize_exact(width, height, FilterType::Lanczos3),
			Self::Fill => img.resize_to_fill(width, height, FilterType::Lanczos3),
			Self::Thumbnail => {
				let (x, y, crop_width, crop_height) = centered_crop(img.dimensions(), width, height);
				img.crop_imm(x, y, crop_width, crop_height)
					.thumbnail_exact(width, height)
			}
		})
	}
}

impl FromStr for Processor {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		match s.trim().to_ascii_lowercase().as_str() {
			"fit" => Ok(Self::Fit),
			"resize" => Ok(Self::Resize),
			"fill" => Ok(Self::Fill),
			"thumbnail" => Ok(Self::Thumbnail),
			_ => Err(Error::UnknownProcessor(s.to_string())),
		}
	}
}

impl fmt::Display for Processor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Largest centred region of the source with the aspect ratio of the target box,
/// as `(x, y, width, height)`
fn centered_crop(
	(src_width, src_height): (u32, u32),
	width: u32,
	height: u32,
) -> (u32, u32, u32, u32) {
	let (src_w, src_h) = (u64::from(src_width), u64::from(src_height));
	let (w, h) = (u64::from(width), u64::from(height));

	if src_w * h > src_h * w {
		let crop_width = u32::try_from((src_h * w / h).max(1)).unwrap_or(src_width);
		((src_width - crop_width) / 2, 0, crop_width, src_height)
	} else {
		let crop_height = u32::try_from((src_w * h / w).max(1)).unwrap_or(src_height);
		(0, (src_height - crop_height) / 2, src_width, crop_height)
	}
}
