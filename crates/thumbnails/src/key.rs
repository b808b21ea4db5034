use crate::{Error, Resolution, Result};

use std::{borrow::Cow, fmt, path::PathBuf, str::FromStr};

use tn_images::{Processor, ThumbnailType};
use tn_utils::shard_segments;

/// Storage path of an artifact: `ab/c1/23…/<width>x<height>[-<processor>].<ext>`.
///
/// Only ever made of ascii alphanumerics and `-_.x/~`, so it can be joined onto a
/// directory without escaping it. Checksums with any other character are stored
/// as `~` followed by the hex of their bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
	/// The processor is left out of the key when the request didn't name one, so
	/// `fill` and the default strategy never share an artifact.
	pub fn new(
		checksum: &str,
		resolution: Resolution,
		thumbnail_type: ThumbnailType,
		processor: Option<Processor>,
	) -> Result<Self> {
		if checksum.is_empty() {
			return Err(Error::InvalidChecksum(checksum.to_string()));
		}

		let encoded = encode_checksum(checksum);
		let [first, second, rest] =
			shard_segments(&encoded).ok_or_else(|| Error::InvalidChecksum(checksum.to_string()))?;

		let processor = processor.map_or_else(String::new, |processor| format!("-{processor}"));

		Ok(Self(format!(
			"{first}/{second}/{rest}/{resolution}{processor}.{}",
			thumbnail_type.extension()
		)))
	}

	/// Validates a key that went through an untrusted channel, like a transfer token
	pub fn parse(key: &str) -> Result<Self> {
		let invalid = || Error::InvalidCacheKey(key.to_string());

		let segments = key.split('/').collect::<Vec<_>>();
		let &[first, second, rest, file_name] = segments.as_slice() else {
			return Err(invalid());
		};

		let first = first.strip_prefix('~').unwrap_or(first);
		if [first, second, rest]
			.iter()
			.any(|segment| segment.is_empty() || !segment.chars().all(is_key_char))
		{
			return Err(invalid());
		}

		let (stem, extension) = file_name.rsplit_once('.').ok_or_else(invalid)?;
		if stem.is_empty()
			|| !stem.chars().all(is_key_char)
			|| extension.parse::<ThumbnailType>().is_err()
		{
			return Err(invalid());
		}

		Ok(Self(key.to_string()))
	}

	#[must_use]
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Relative path of the artifact below the store root
	#[must_use]
	pub fn to_path(&self) -> PathBuf {
		self.0.split('/').collect()
	}

	#[must_use]
	pub fn thumbnail_type(&self) -> Option<ThumbnailType> {
		self.0
			.rsplit_once('.')
			.and_then(|(_, extension)| extension.parse().ok())
	}
}

fn is_key_char(c: char) -> bool {
	c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// `~` never shows up in a checksum kept as is, so two checksums can't end up
/// sharing a key
fn encode_checksum(checksum: &str) -> Cow<'_, str> {
	if checksum.chars().all(is_key_char) {
		Cow::Borrowed(checksum)
	} else {
		Cow::Owned(format!("~{}", hex::encode(checksum)))
	}
}

impl FromStr for CacheKey {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		Self::parse(s)
	}
}

impl fmt::Display for CacheKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn key(checksum: &str, processor: Option<Processor>) -> Result<CacheKey> {
		CacheKey::new(
			checksum,
			Resolution::new(32, 32),
			ThumbnailType::Png,
			processor,
		)
	}

	#[test]
	fn shards_the_checksum() {
		assert_eq!(key("abc123", None).unwrap().as_str(), "ab/c1/23/32x32.png");
		assert_eq!(
			CacheKey::new(
				"0123456789abcdef",
				Resolution::new(1920, 1080),
				ThumbnailType::Jpg,
				Some(Processor::Fit),
			)
			.unwrap()
			.as_str(),
			"01/23/456789abcdef/1920x1080-fit.jpg"
		);
	}

	#[test]
	fn is_idempotent() {
		assert_eq!(key("abc123", None).unwrap(), key("abc123", None).unwrap());
	}

	#[test]
	fn processor_distinguishes_keys() {
		let default = key("abc123", None).unwrap();
		let fill = key("abc123", Some(Processor::Fill)).unwrap();
		let thumbnail = key("abc123", Some(Processor::Thumbnail)).unwrap();

		assert_ne!(default, fill);
		assert_ne!(default, thumbnail);
		assert_eq!(fill.as_str(), "ab/c1/23/32x32-fill.png");
	}

	#[test]
	fn rejects_unusable_checksums() {
		for checksum in ["", "abcd", "ab-c"] {
			assert!(
				matches!(key(checksum, None), Err(Error::InvalidChecksum(_))),
				"{checksum}"
			);
		}
	}

	#[test]
	fn escapes_checksums_with_other_characters() {
		assert_eq!(
			key("sha1:abc", None).unwrap().as_str(),
			"~7/36/861313a616263/32x32.png"
		);
		assert_eq!(
			key("../../etc", None).unwrap().as_str(),
			"~2/e2/e2f2e2e2f657463/32x32.png"
		);
		assert_eq!(
			key("\"33a6-5e1f\"", None).unwrap().as_str(),
			"~2/23/33361362d3565316622/32x32.png"
		);
		assert_eq!(key("abcdé", None).unwrap().as_str(), "~6/16/26364c3a9/32x32.png");
	}

	#[test]
	fn escaped_checksums_never_collide() {
		// "~..." written out by hand is itself escaped, so it can't alias an encoded key
		let escaped = key("a/bcd", None).unwrap();
		let lookalike = key(&format!("~{}", hex::encode("a/bcd")), None).unwrap();
		let plain = key(&hex::encode("a/bcd"), None).unwrap();

		assert_ne!(escaped, lookalike);
		assert_ne!(escaped, plain);
		assert_ne!(lookalike, plain);
	}

	#[test]
	fn escaped_keys_stay_on_the_path() {
		for checksum in ["sha1:abc", "../../etc", "ab/cd/ef", "ab\\cdef", "W/\"x y\""] {
			let built = key(checksum, None).unwrap();
			assert_eq!(CacheKey::parse(built.as_str()).unwrap(), built, "{checksum}");
			assert!(
				built
					.to_path()
					.components()
					.all(|component| matches!(component, std::path::Component::Normal(_))),
				"{checksum}"
			);
		}
	}

	#[test]
	fn parses_keys_it_built() {
		let built = key("abc123", Some(Processor::Resize)).unwrap();
		assert_eq!(CacheKey::parse(built.as_str()).unwrap(), built);
		assert_eq!(built.thumbnail_type(), Some(ThumbnailType::Png));
		assert_eq!(built.to_path(), PathBuf::from("ab/c1/23/32x32-resize.png"));
	}

	#[test]
	fn rejects_foreign_keys() {
		for invalid in [
			"",
			"ab/c1/23.png",
			"/ab/c1/23/32x32.png",
			"ab/../23/32x32.png",
			"ab/c1/23/32x32.exe",
			"ab/c1/23/.png",
			"ab/c1/23/32x32.png/extra",
			"ab/c1/23/..png",
			"a~/c1/23/32x32.png",
			"ab/~1/23/32x32.png",
			"~/c1/23/32x32.png",
		] {
			assert!(
				matches!(CacheKey::parse(invalid), Err(Error::InvalidCacheKey(_))),
				"{invalid}"
			);
		}
	}
}
