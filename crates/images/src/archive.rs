use crate::{generic, DecodeLimits, Error, Result};

use std::io::{Cursor, Read};

use image::DynamicImage;
use zip::{result::ZipError, ZipArchive};

/// Opens a zip based document and decodes the png preview stored at `preview_path`.
///
/// The entry is inflated up to the decoded bytes budget at most.
pub fn decode(
	bytes: &[u8],
	preview_path: &'static str,
	limits: &DecodeLimits,
) -> Result<DynamicImage> {
	let mut archive = ZipArchive::new(Cursor::new(bytes))?;

	let mut entry = archive.by_name(preview_path).map_err(|e| match e {
		ZipError::FileNotFound => Error::MissingArchiveEntry(preview_path),
		e => e.into(),
	})?;

	let mut data = Vec::new();
	(&mut entry)
		.take(limits.max_decoded_bytes)
		.read_to_end(&mut data)?;

	generic::decode(&data, limits)
}
