use crate::{Error, Result};

/// Resource guards the decoders enforce while turning bytes into pixels, so an
/// oversized source is rejected before its frames are allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeLimits {
	pub max_width: u32,
	pub max_height: u32,
	/// Cap on the memory held by all decoded frames of a single source together
	pub max_decoded_bytes: u64,
}

impl DecodeLimits {
	pub const DEFAULT: Self = Self {
		max_width: 7680,
		max_height: 7680,
		max_decoded_bytes: 512 * 1024 * 1024,
	};

	pub(crate) fn check_dimensions(&self, width: u32, height: u32) -> Result<()> {
		if width > self.max_width || height > self.max_height {
			return Err(Error::ImageTooLarge {
				width,
				height,
				max_width: self.max_width,
				max_height: self.max_height,
			});
		}

		Ok(())
	}

	/// Fails once `frames` full RGBA frames of `width`x`height` go over the budget
	pub(crate) fn check_frames(&self, width: u32, height: u32, frames: usize) -> Result<()> {
		let bytes = (u64::from(width) * u64::from(height) * 4)
			.saturating_mul(u64::try_from(frames).unwrap_or(u64::MAX));

		if bytes > self.max_decoded_bytes {
			return Err(Error::DecodedTooLarge {
				frames,
				bytes,
				max: self.max_decoded_bytes,
			});
		}

		Ok(())
	}
}

impl Default for DecodeLimits {
	fn default() -> Self {
		Self::DEFAULT
	}
}
