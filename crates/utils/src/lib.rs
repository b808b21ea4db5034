#![warn(
	clippy::all,
	clippy::pedantic,
	clippy::correctness,
	clippy::perf,
	clippy::style,
	clippy::suspicious,
	clippy::complexity,
	clippy::nursery,
	clippy::unwrap_used,
	unused_qualifications,
	rust_2018_idioms,
	clippy::expect_used,
	trivial_casts,
	trivial_numeric_casts,
	unused_allocation,
	clippy::as_conversions,
	clippy::dbg_macro
)]
#![forbid(unsafe_code)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

pub mod error;

/// Splits an opaque content fingerprint into `[2 chars, 2 chars, rest]` directory
/// segments, the layout every artifact path is built from.
///
/// Fingerprints shorter than 5 characters don't have enough material for the three
/// levels, so `None` is returned and the caller decides how to reject them.
#[must_use]
pub fn shard_segments(checksum: &str) -> Option<[&str; 3]> {
	if checksum.len() < 5 || !checksum.is_char_boundary(2) || !checksum.is_char_boundary(4) {
		return None;
	}

	Some([&checksum[..2], &checksum[2..4], &checksum[4..]])
}
