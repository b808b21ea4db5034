use crate::{Error, Result};

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Dimensions of a thumbnail, parsed from and displayed as `<width>x<height>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
	pub width: u32,
	pub height: u32,
}

impl Resolution {
	#[must_use]
	pub const fn new(width: u32, height: u32) -> Self {
		Self { width, height }
	}

	/// Same as [`Resolution::new`], but refuses empty rectangles
	pub fn non_empty(width: u32, height: u32) -> Result<Self> {
		if width == 0 || height == 0 {
			return Err(Error::InvalidResolution(format!("{width}x{height}")));
		}

		Ok(Self { width, height })
	}

	#[must_use]
	pub const fn is_landscape(&self) -> bool {
		self.width > self.height
	}

	#[must_use]
	pub fn area(&self) -> u64 {
		u64::from(self.width) * u64::from(self.height)
	}

	/// Scales down to fit inside `bounds`, keeping the aspect ratio. Resolutions that
	/// already fit are returned as is.
	#[must_use]
	pub fn fit_within(self, bounds: Self) -> Self {
		if self.width <= bounds.width && self.height <= bounds.height {
			return self;
		}

		let (width, height) = (u64::from(self.width), u64::from(self.height));
		let (max_width, max_height) = (u64::from(bounds.width), u64::from(bounds.height));

		let scaled = |side: u64, num: u64, den: u64| {
			u32::try_from(side * num / den.max(1))
				.unwrap_or(u32::MAX)
				.max(1)
		};

		if width * max_height >= height * max_width {
			Self::new(bounds.width, scaled(height, max_width, width))
		} else {
			Self::new(scaled(width, max_height, height), bounds.height)
		}
	}

	/// Width for landscape orientations, height otherwise
	const fn dominant(&self, landscape: bool) -> u32 {
		if landscape {
			self.width
		} else {
			self.height
		}
	}
}

impl FromStr for Resolution {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		let invalid = || Error::InvalidResolution(s.to_string());

		let (width, height) = s
			.trim()
			.split_once(['x', 'X'])
			.ok_or_else(invalid)?;

		Self::non_empty(
			width.trim().parse().map_err(|_| invalid())?,
			height.trim().parse().map_err(|_| invalid())?,
		)
		.map_err(|_| invalid())
	}
}

impl fmt::Display for Resolution {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}x{}", self.width, self.height)
	}
}

/// The catalog of sizes thumbnails are generated at, ascending by area
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolutions(Vec<Resolution>);

impl Resolutions {
	pub fn new(resolutions: impl IntoIterator<Item = Resolution>) -> Self {
		let mut resolutions = resolutions.into_iter().collect::<Vec<_>>();
		resolutions.sort_by_key(Resolution::area);
		Self(resolutions)
	}

	pub fn parse<S: AsRef<str>>(resolutions: impl IntoIterator<Item = S>) -> Result<Self> {
		resolutions
			.into_iter()
			.map(|resolution| resolution.as_ref().parse())
			.collect::<Result<Vec<_>>>()
			.map(Self::new)
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = &Resolution> {
		self.0.iter()
	}

	/// Picks the catalog entry best suited for a thumbnail of `requested` size of a
	/// source of `source` size.
	///
	/// Only the dominant dimension is compared: the width for landscape sources, the
	/// height otherwise. Images are never scaled up, so a source smaller than the
	/// request is returned as is. Otherwise the smallest entry at least as large as the
	/// request wins, falling back to the largest entry. An empty catalog echoes the
	/// request back.
	#[must_use]
	pub fn closest_match(&self, requested: Resolution, source: Resolution) -> Resolution {
		let landscape = source.is_landscape();
		let requested_len = requested.dominant(landscape);

		if source.dominant(landscape) < requested_len {
			return source;
		}

		let Some(largest) = self.0.last() else {
			return requested;
		};

		self.0
			.iter()
			.filter(|candidate| candidate.dominant(landscape) >= requested_len)
			.min_by_key(|candidate| candidate.dominant(landscape) - requested_len)
			.copied()
			.unwrap_or(*largest)
	}
}
