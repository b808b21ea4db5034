use crate::{Error, Result};

use std::io::Cursor;

use lofty::{
	file::TaggedFileExt,
	picture::{Picture, PictureType},
	probe::Probe,
};
use tracing::trace;

/// Cover art pulled out of an audio file's tags
#[derive(Debug)]
pub struct EmbeddedPicture {
	pub mime_type: Option<String>,
	pub data: Vec<u8>,
}

/// Reads the tags of a flac, mp3 or ogg file and returns its cover picture.
///
/// The front cover wins when the file carries several pictures, otherwise the first
/// one found in any tag is used.
pub fn extract_picture(bytes: &[u8]) -> Result<EmbeddedPicture> {
	let tagged_file = Probe::new(Cursor::new(bytes))
		.guess_file_type()?
		.read()?;

	let pictures = tagged_file
		.tags()
		.iter()
		.flat_map(|tag| tag.pictures())
		.collect::<Vec<_>>();

	let picture = pictures
		.iter()
		.find(|picture| picture.pic_type() == PictureType::CoverFront)
		.or_else(|| pictures.first())
		.ok_or(Error::NoEmbeddedPicture)?;

	trace!(pictures = pictures.len(), "Found embedded picture");

	Ok(to_embedded(picture))
}

fn to_embedded(picture: &Picture) -> EmbeddedPicture {
	EmbeddedPicture {
		mime_type: picture.mime_type().map(|mime| mime.as_str().to_owned()),
		data: picture.data().to_vec(),
	}
}

/// A flac stream with no audio frames, carrying `pictures` as picture blocks
#[cfg(test)]
pub(crate) fn flac_with_pictures(pictures: &[Picture]) -> Vec<u8> {
	use lofty::picture::PictureInformation;

	const STREAMINFO: u8 = 0;
	const PICTURE: u8 = 6;
	const LAST_BLOCK: u8 = 0x80;

	fn block(bytes: &mut Vec<u8>, ty: u8, last: bool, content: &[u8]) {
		bytes.push(if last { ty | LAST_BLOCK } else { ty });
		#[allow(clippy::unwrap_used)]
		let len = u32::try_from(content.len()).unwrap().to_be_bytes();
		bytes.extend_from_slice(&len[1..]);
		bytes.extend_from_slice(content);
	}

	// 4096 sample blocks, 44.1kHz, stereo, 16 bits per sample, 0 samples
	let mut stream_info = [0; 34];
	stream_info[..4].copy_from_slice(&[0x10, 0x00, 0x10, 0x00]);
	stream_info[10..14].copy_from_slice(&((44_100_u32 << 12) | (1 << 9) | (15 << 4)).to_be_bytes());

	let mut bytes = b"fLaC".to_vec();
	block(&mut bytes, STREAMINFO, pictures.is_empty(), &stream_info);

	for (i, picture) in pictures.iter().enumerate() {
		block(
			&mut bytes,
			PICTURE,
			i + 1 == pictures.len(),
			&picture.as_flac_bytes(PictureInformation::default(), false),
		);
	}

	bytes
}
