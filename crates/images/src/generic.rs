use crate::{orientation::Orientation, DecodeLimits, Result};

use std::io::Cursor;

use image::{
	io::{Limits, Reader},
	DynamicImage,
};
use tracing::trace;

/// Decodes any raster format the `image` crate can sniff from the bytes themselves,
/// then corrects the rotation/flip based on the *available* exif data.
///
/// The dimensions are read from the header first, so sources over `limits` are
/// rejected without decoding a single pixel.
pub fn decode(bytes: &[u8], limits: &DecodeLimits) -> Result<DynamicImage> {
	let (width, height) = Reader::new(Cursor::new(bytes))
		.with_guessed_format()?
		.into_dimensions()?;
	limits.check_dimensions(width, height)?;

	let mut image_limits = Limits::default();
	image_limits.max_image_width = Some(limits.max_width);
	image_limits.max_image_height = Some(limits.max_height);
	image_limits.max_alloc = Some(limits.max_decoded_bytes);

	let mut reader = Reader::new(Cursor::new(bytes)).with_guessed_format()?;
	reader.limits(image_limits);
	let img = reader.decode()?;

	Ok(match Orientation::from_slice(bytes) {
		Some(orientation) => {
			trace!(?orientation, "Correcting image orientation");
			orientation.correct_thumbnail(img)
		}
		None => img,
	})
}
