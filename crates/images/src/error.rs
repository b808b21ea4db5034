use tn_utils::error::FileIOError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
	#[error("error while loading the image (via the `image` crate): {0}")]
	Image(#[from] image::ImageError),
	#[error("there was an i/o error: {0}")]
	Io(#[from] std::io::Error),
	#[error(transparent)]
	FileIO(#[from] FileIOError),
	#[error("error while decoding a gif: {0}")]
	GifDecoding(#[from] gif::DecodingError),
	#[error("error while encoding a gif: {0}")]
	GifEncoding(#[from] gif::EncodingError),
	#[error("error while reading the archive: {0}")]
	Zip(#[from] zip::result::ZipError),
	#[error("error while reading audio tags: {0}")]
	AudioTags(#[from] lofty::error::LoftyError),

	#[error("the archive has no preview image at <path='{0}'>")]
	MissingArchiveEntry(&'static str),
	#[error("the audio file has no embedded picture")]
	NoEmbeddedPicture,
	#[error("the embedded picture type is unsupported <mime_type='{0}'>")]
	UnsupportedEmbeddedPicture(String),
	#[error("the animation contains no frames")]
	EmptyAnimation,
	#[error(
		"the image is too large <width='{width}', height='{height}', max_width='{max_width}', max_height='{max_height}'>"
	)]
	ImageTooLarge {
		width: u32,
		height: u32,
		max_width: u32,
		max_height: u32,
	},
	#[error("decoded frames exceed the memory budget <frames='{frames}', bytes='{bytes}', max='{max}'>")]
	DecodedTooLarge { frames: usize, bytes: u64, max: u64 },
	#[error("the animation is too large to be encoded as a gif <width='{width}', height='{height}'>")]
	AnimationTooLarge { width: u32, height: u32 },
	#[error("invalid target dimensions <width='{width}', height='{height}'>")]
	InvalidDimensions { width: u32, height: u32 },

	#[error("the thumbnail type is unsupported <type='{0}'>")]
	UnsupportedType(String),
	#[error("unknown processor <name='{0}'>")]
	UnknownProcessor(String),

	#[error("invalid font file: {0}")]
	InvalidFont(#[from] ab_glyph::InvalidFont),
	#[error("error while parsing the font map: {0}")]
	FontMap(#[from] serde_json::Error),
	#[error("no font is available to render text")]
	NoFont,
}

impl Error {
	/// The source is over one of the configured limits rather than broken
	#[must_use]
	pub const fn is_over_limit(&self) -> bool {
		matches!(
			self,
			Self::ImageTooLarge { .. }
				| Self::DecodedTooLarge { .. }
				| Self::AnimationTooLarge { .. }
				| Self::Image(image::ImageError::Limits(_))
		)
	}

	/// Failures of the local setup, like missing or broken fonts, which no source
	/// could have caused
	#[must_use]
	pub const fn is_environment(&self) -> bool {
		matches!(
			self,
			Self::NoFont | Self::InvalidFont(_) | Self::FontMap(_) | Self::FileIO(_)
		)
	}

	/// Target parameters that can't be honored, whatever the source
	#[must_use]
	pub const fn is_invalid_request(&self) -> bool {
		matches!(
			self,
			Self::InvalidDimensions { .. } | Self::UnsupportedType(_) | Self::UnknownProcessor(_)
		)
	}
}
