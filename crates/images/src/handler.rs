use crate::{
	animation, archive, audio,
	consts::{
		AUDIO_MIME_TYPES, GGP_MIME_TYPE, GGP_PREVIEW_PATH, GGS_MIME_TYPE, GGS_PREVIEW_PATH,
		GIF_MIME_TYPE, RASTER_MIME_TYPES, TEXT_MIME_TYPE,
	},
	generic,
	text::{FontMap, FontSet, TextRenderer},
	DecodeLimits, DecodedImage, Error, Result,
};

use image::DynamicImage;
use once_cell::sync::OnceCell;
use tracing::{debug, trace};

/// Lowercases a MIME type and strips its parameters, `Text/Plain; charset=utf-8`
/// becomes `text/plain`.
#[must_use]
pub fn normalize_mime_type(mime_type: &str) -> String {
	mime_type
		.split(';')
		.next()
		.unwrap_or_default()
		.trim()
		.to_ascii_lowercase()
}

/// Turns the bytes of a source file into an image, picked from the file's MIME type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoder {
	Text,
	/// Zip based document holding a png preview at the given path
	Embedded(&'static str),
	Gif,
	Audio,
	Generic,
}

impl Decoder {
	#[must_use]
	pub fn for_type(mime_type: &str) -> Self {
		match normalize_mime_type(mime_type).as_str() {
			TEXT_MIME_TYPE => Self::Text,
			GGS_MIME_TYPE => Self::Embedded(GGS_PREVIEW_PATH),
			GGP_MIME_TYPE => Self::Embedded(GGP_PREVIEW_PATH),
			GIF_MIME_TYPE => Self::Gif,
			mime if AUDIO_MIME_TYPES.contains(&mime) => Self::Audio,
			_ => Self::Generic,
		}
	}

	/// Decoder for cover art found inside an audio file. Pictures without a MIME type
	/// are left to the generic decoder to sniff.
	fn for_embedded_picture(mime_type: Option<&str>) -> Result<Self> {
		let Some(mime_type) = mime_type else {
			return Ok(Self::Generic);
		};

		match normalize_mime_type(mime_type).as_str() {
			GIF_MIME_TYPE => Ok(Self::Gif),
			mime if RASTER_MIME_TYPES.contains(&mime) => Ok(Self::Generic),
			_ => Err(Error::UnsupportedEmbeddedPicture(mime_type.to_string())),
		}
	}
}

/// Every known decoder, along with the state the text renderer needs and the limits
/// each decoder enforces.
///
/// Fonts are only loaded the first time a text file is decoded.
pub struct Decoders {
	font_map: Option<FontMap>,
	text_renderer: OnceCell<TextRenderer>,
	limits: DecodeLimits,
}

impl Default for Decoders {
	fn default() -> Self {
		Self::new(None)
	}
}

impl Decoders {
	#[must_use]
	pub const fn new(font_map: Option<FontMap>) -> Self {
		Self {
			font_map,
			text_renderer: OnceCell::new(),
			limits: DecodeLimits::DEFAULT,
		}
	}

	/// Renders text with already loaded fonts instead of a font map
	#[must_use]
	pub fn with_text_renderer(text_renderer: TextRenderer) -> Self {
		Self {
			font_map: None,
			text_renderer: OnceCell::with_value(text_renderer),
			limits: DecodeLimits::DEFAULT,
		}
	}

	#[must_use]
	pub fn with_limits(mut self, limits: DecodeLimits) -> Self {
		self.limits = limits;
		self
	}

	#[must_use]
	pub const fn limits(&self) -> &DecodeLimits {
		&self.limits
	}

	/// Whether sources of this MIME type can be turned into a thumbnail
	#[must_use]
	pub fn is_supported(mime_type: &str) -> bool {
		let mime_type = normalize_mime_type(mime_type);
		match Decoder::for_type(&mime_type) {
			Decoder::Generic => RASTER_MIME_TYPES.contains(&mime_type.as_str()),
			_ => true,
		}
	}

	pub fn decode(&self, mime_type: &str, bytes: &[u8]) -> Result<DecodedImage> {
		let decoder = Decoder::for_type(mime_type);
		trace!(mime_type, ?decoder, size = bytes.len(), "Decoding source");

		self.decode_with(decoder, bytes)
	}

	fn decode_with(&self, decoder: Decoder, bytes: &[u8]) -> Result<DecodedImage> {
		match decoder {
			Decoder::Text => {
				let text = String::from_utf8_lossy(bytes);
				let image = self.text_renderer()?.render(&text);
				Ok(DecodedImage::Still(DynamicImage::ImageRgba8(image)))
			}
			Decoder::Embedded(preview_path) => {
				archive::decode(bytes, preview_path, &self.limits).map(DecodedImage::Still)
			}
			Decoder::Gif => animation::decode(bytes, &self.limits).map(DecodedImage::Animation),
			Decoder::Audio => {
				let picture = audio::extract_picture(bytes)?;
				let decoder = Decoder::for_embedded_picture(picture.mime_type.as_deref())?;
				self.decode_with(decoder, &picture.data)
			}
			Decoder::Generic => generic::decode(bytes, &self.limits).map(DecodedImage::Still),
		}
	}

	fn text_renderer(&self) -> Result<&TextRenderer> {
		self.text_renderer.get_or_try_init(|| {
			debug!("Loading fonts for the text renderer");
			FontSet::load(self.font_map.as_ref()).map(TextRenderer::new)
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{audio::flac_with_pictures, text::test_fonts};

	use std::io::{Cursor, Write};

	use image::{ImageOutputFormat, RgbImage};
	use lofty::picture::{MimeType, Picture, PictureType};
	use zip::{write::SimpleFileOptions, ZipWriter};

	fn png(width: u32, height: u32) -> Vec<u8> {
		let mut bytes = Vec::new();
		DynamicImage::ImageRgb8(RgbImage::new(width, height))
			.write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
			.unwrap();
		bytes
	}

	#[test]
	fn normalizes_mime_types() {
		assert_eq!(normalize_mime_type("Text/Plain; charset=utf-8"), "text/plain");
		assert_eq!(normalize_mime_type("  IMAGE/GIF "), "image/gif");
		assert_eq!(normalize_mime_type(""), "");
	}

	#[test]
	fn dispatches_on_mime_type() {
		let cases = [
			("text/plain", Decoder::Text),
			("text/plain; charset=utf-8", Decoder::Text),
			(
				"application/vnd.geogebra.slides",
				Decoder::Embedded("_slide0/geogebra_thumbnail.png"),
			),
			(
				"application/vnd.geogebra.pinboard",
				Decoder::Embedded("_board0/geogebra_thumbnail.png"),
			),
			("image/gif", Decoder::Gif),
			("audio/flac", Decoder::Audio),
			("audio/mpeg", Decoder::Audio),
			("audio/ogg", Decoder::Audio),
			("image/png", Decoder::Generic),
			("application/octet-stream", Decoder::Generic),
		];

		for (mime_type, expected) in cases {
			assert_eq!(Decoder::for_type(mime_type), expected, "{mime_type}");
		}
	}

	#[test]
	fn embedded_picture_types() {
		assert_eq!(Decoder::for_embedded_picture(None).unwrap(), Decoder::Generic);
		assert_eq!(
			Decoder::for_embedded_picture(Some("image/jpeg")).unwrap(),
			Decoder::Generic
		);
		assert_eq!(
			Decoder::for_embedded_picture(Some("image/gif")).unwrap(),
			Decoder::Gif
		);
		assert!(matches!(
			Decoder::for_embedded_picture(Some("image/x-unknown")),
			Err(Error::UnsupportedEmbeddedPicture(mime)) if mime == "image/x-unknown"
		));
	}

	#[test]
	fn supported_types() {
		assert!(Decoders::is_supported("image/png"));
		assert!(Decoders::is_supported("IMAGE/JPEG"));
		assert!(Decoders::is_supported("text/plain; charset=utf-8"));
		assert!(Decoders::is_supported("audio/ogg"));
		assert!(Decoders::is_supported(GGS_MIME_TYPE));
		assert!(!Decoders::is_supported("application/pdf"));
		assert!(!Decoders::is_supported(""));
	}

	#[test]
	fn decodes_raster_images() {
		let decoded = Decoders::default().decode("image/png", &png(9, 5)).unwrap();
		assert!(matches!(decoded, DecodedImage::Still(_)));
		assert_eq!(decoded.dimensions(), (9, 5));
	}

	#[test]
	fn decodes_embedded_previews() {
		let mut archive = ZipWriter::new(Cursor::new(Vec::new()));
		archive
			.start_file(GGP_PREVIEW_PATH, SimpleFileOptions::default())
			.unwrap();
		archive.write_all(&png(6, 3)).unwrap();
		let bytes = archive.finish().unwrap().into_inner();

		let decoded = Decoders::default().decode(GGP_MIME_TYPE, &bytes).unwrap();
		assert_eq!(decoded.dimensions(), (6, 3));

		// the slides preview lives elsewhere in the archive
		assert!(matches!(
			Decoders::default().decode(GGS_MIME_TYPE, &bytes),
			Err(Error::MissingArchiveEntry(GGS_PREVIEW_PATH))
		));
	}

	#[test]
	fn corrupt_input_is_a_decode_error() {
		let decoders = Decoders::default();
		assert!(decoders.decode("image/png", b"not a png").is_err());
		assert!(decoders.decode("image/gif", b"GIF89a").is_err());
		assert!(decoders.decode("audio/flac", b"fLaC").is_err());
		assert!(decoders.decode(GGS_MIME_TYPE, b"PK").is_err());
	}

	#[test]
	fn renders_text_files() {
		let decoders = Decoders::with_text_renderer(TextRenderer::new(test_fonts()));

		let decoded = decoders
			.decode("text/plain; charset=utf-8", "hello 世界".as_bytes())
			.unwrap();
		assert_eq!(
			decoded.dimensions(),
			(crate::TEXT_CANVAS_WIDTH, crate::TEXT_CANVAS_HEIGHT)
		);
	}

	#[test]
	fn text_ignores_invalid_utf8() {
		let decoders = Decoders::with_text_renderer(TextRenderer::new(test_fonts()));

		assert!(decoders.decode("text/plain", b"ok \xff\xfe bytes").is_ok());
	}

	fn cover(mime_type: Option<MimeType>, data: Vec<u8>) -> Picture {
		Picture::new_unchecked(PictureType::CoverFront, mime_type, None, data)
	}

	#[test]
	fn decodes_audio_cover_art() {
		let bytes = flac_with_pictures(&[cover(Some(MimeType::Png), png(7, 4))]);

		let decoded = Decoders::default().decode("audio/flac", &bytes).unwrap();
		assert!(matches!(decoded, DecodedImage::Still(_)));
		assert_eq!(decoded.dimensions(), (7, 4));
	}

	#[test]
	fn audio_cover_art_without_a_type_is_sniffed() {
		let bytes = flac_with_pictures(&[cover(None, png(3, 8))]);

		let decoded = Decoders::default().decode("audio/x-flac", &bytes).unwrap();
		assert_eq!(decoded.dimensions(), (3, 8));
	}

	#[test]
	fn audio_cover_art_is_dispatched_on_its_own_type() {
		let mut gif = Vec::new();
		{
			let mut encoder = gif::Encoder::new(&mut gif, 5, 6, &[0, 0, 0]).unwrap();
			encoder
				.write_frame(&gif::Frame {
					width: 5,
					height: 6,
					buffer: std::borrow::Cow::Owned(vec![0; 30]),
					..gif::Frame::default()
				})
				.unwrap();
		}
		let bytes = flac_with_pictures(&[cover(Some(MimeType::Gif), gif)]);

		let decoded = Decoders::default().decode("audio/flac", &bytes).unwrap();
		assert!(matches!(decoded, DecodedImage::Animation(_)));
		assert_eq!(decoded.dimensions(), (5, 6));
	}

	#[test]
	fn audio_cover_art_of_an_unknown_type_is_rejected() {
		let bytes = flac_with_pictures(&[cover(
			Some(MimeType::Unknown("image/x-pict".to_string())),
			png(2, 2),
		)]);

		assert!(matches!(
			Decoders::default().decode("audio/flac", &bytes),
			Err(Error::UnsupportedEmbeddedPicture(mime)) if mime == "image/x-pict"
		));
	}

	#[test]
	fn audio_without_cover_art_is_rejected() {
		assert!(matches!(
			Decoders::default().decode("audio/flac", &flac_with_pictures(&[])),
			Err(Error::NoEmbeddedPicture)
		));
	}

	#[test]
	fn limits_apply_to_every_decoder() {
		let decoders = Decoders::default().with_limits(DecodeLimits {
			max_width: 4,
			max_height: 4,
			..DecodeLimits::DEFAULT
		});

		assert!(matches!(
			decoders.decode("image/png", &png(5, 1)),
			Err(Error::ImageTooLarge { width: 5, .. })
		));

		let bytes = flac_with_pictures(&[cover(Some(MimeType::Png), png(1, 9))]);
		assert!(matches!(
			decoders.decode("audio/flac", &bytes),
			Err(Error::ImageTooLarge { height: 9, .. })
		));
	}
}
