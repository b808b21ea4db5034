use std::io::Cursor;

use exif::{In, Tag};
use image::DynamicImage;

/// EXIF orientation of a raster image, see the `Orientation` tag (0x0112).
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Orientation {
	#[default]
	Normal,
	CW90,
	CW180,
	CW270,
	MirroredVertical,
	MirroredHorizontal,
	MirroredHorizontalAnd90CW,
	MirroredHorizontalAnd270CW,
}

impl Orientation {
	/// Sources the orientation straight from the encoded bytes.
	///
	/// Not all images have exif data, and not all containers can carry it, so any
	/// failure here just means there's nothing to correct.
	#[must_use]
	pub fn from_slice(bytes: &[u8]) -> Option<Self> {
		let exif = exif::Reader::new()
			.read_from_container(&mut Cursor::new(bytes))
			.ok()?;

		exif.get_field(Tag::Orientation, In::PRIMARY)?
			.value
			.get_uint(0)
			.map(Into::into)
	}

	/// Rotates and/or flips the image so it is displayed upright
	#[must_use]
	pub fn correct_thumbnail(&self, img: DynamicImage) -> DynamicImage {
		match self {
			Self::Normal => img,
			Self::CW180 => img.rotate180(),
			Self::CW270 => img.rotate270(),
			Self::CW90 => img.rotate90(),
			Self::MirroredHorizontal => img.fliph(),
			Self::MirroredVertical => img.flipv(),
			Self::MirroredHorizontalAnd90CW => img.fliph().rotate90(),
			Self::MirroredHorizontalAnd270CW => img.fliph().rotate270(),
		}
	}
}

impl From<u32> for Orientation {
	fn from(value: u32) -> Self {
		match value {
			2 => Self::MirroredHorizontal,
			3 => Self::CW180,
			4 => Self::MirroredVertical,
			5 => Self::MirroredHorizontalAnd270CW,
			6 => Self::CW90,
			7 => Self::MirroredHorizontalAnd90CW,
			8 => Self::CW270,
			_ => Self::Normal,
		}
	}
}
