use crate::CacheKey;

use axum::{
	http::StatusCode,
	response::{IntoResponse, Response},
};
use tn_utils::error::FileIOError;
use tracing::error;

pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of every failure, callers react on this rather than on
/// the exact variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
	/// Malformed or unsupported request, never worth retrying
	BadInput,
	/// The source exceeds the configured byte or pixel limits
	TooLarge,
	/// The source bytes couldn't be turned into a thumbnail
	Decode,
	/// Artifact store, source i/o or local setup failure
	Storage,
	/// Missing, expired or forged transfer token
	Token,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
	// Bad input
	#[error("invalid resolution <resolution='{0}'>")]
	InvalidResolution(String),
	#[error("unsupported thumbnail type <type='{0}'>")]
	UnsupportedThumbnailType(String),
	#[error("unknown processing characteristic <processor='{0}'>")]
	UnknownProcessor(String),
	#[error("a checksum of the source file is required")]
	MissingChecksum,
	#[error("invalid checksum <checksum='{0}'>")]
	InvalidChecksum(String),
	#[error("no decoder for the source type <mime_type='{0}'>")]
	UnsupportedMimeType(String),
	#[error("invalid source locator <locator='{0}'>")]
	InvalidLocator(String),
	#[error("invalid cache key <key='{0}'>")]
	InvalidCacheKey(String),
	#[error("invalid configuration: {0}")]
	Config(String),

	// Oversized input
	#[error("source is too large <size='{size}', max='{max}'>")]
	SourceTooLarge { size: u64, max: u64 },
	#[error(
		"image is too large <width='{width}', height='{height}', max_width='{max_width}', max_height='{max_height}'>"
	)]
	ImageTooLarge {
		width: u32,
		height: u32,
		max_width: u32,
		max_height: u32,
	},

	// Decoding
	#[error(transparent)]
	Images(#[from] tn_images::Error),
	#[error("panicked while generating the thumbnail: {0}")]
	GenerationPanicked(String),

	// Storage
	#[error("thumbnail not found <key='{0}'>")]
	NotFound(CacheKey),
	#[error(transparent)]
	FileIO(#[from] FileIOError),
	#[error("i/o error while reading the source: {0}")]
	SourceIo(#[from] std::io::Error),
	#[error("error while fetching the source: {0}")]
	Http(#[from] reqwest::Error),
	#[error("blocking task failed: {0}")]
	BlockingTask(#[from] tokio::task::JoinError),

	// Transfer tokens
	#[error("missing transfer token")]
	MissingToken,
	#[error("invalid transfer token: {0}")]
	Token(#[from] jsonwebtoken::errors::Error),
	#[error("transfer token expired <expired_at='{expired_at}'>")]
	TokenExpired { expired_at: i64 },
	#[error("transfer token carries an invalid key")]
	InvalidTokenClaims,
}

impl Error {
	#[must_use]
	pub const fn kind(&self) -> ErrorKind {
		match self {
			Self::InvalidResolution(_)
			| Self::UnsupportedThumbnailType(_)
			| Self::UnknownProcessor(_)
			| Self::MissingChecksum
			| Self::InvalidChecksum(_)
			| Self::UnsupportedMimeType(_)
			| Self::InvalidLocator(_)
			| Self::InvalidCacheKey(_)
			| Self::Config(_) => ErrorKind::BadInput,

			Self::Images(e) if e.is_invalid_request() => ErrorKind::BadInput,

			Self::SourceTooLarge { .. } | Self::ImageTooLarge { .. } => ErrorKind::TooLarge,
			Self::Images(e) if e.is_over_limit() => ErrorKind::TooLarge,

			Self::Images(e) if e.is_environment() => ErrorKind::Storage,

			Self::Images(_) | Self::GenerationPanicked(_) => ErrorKind::Decode,

			Self::NotFound(_)
			| Self::FileIO(_)
			| Self::SourceIo(_)
			| Self::Http(_)
			| Self::BlockingTask(_) => ErrorKind::Storage,

			Self::MissingToken
			| Self::Token(_)
			| Self::TokenExpired { .. }
			| Self::InvalidTokenClaims => ErrorKind::Token,
		}
	}
}

impl IntoResponse for Error {
	fn into_response(self) -> Response {
		let status = match (&self, self.kind()) {
			(Self::NotFound(_), _) => StatusCode::NOT_FOUND,
			(_, ErrorKind::BadInput) => StatusCode::BAD_REQUEST,
			(_, ErrorKind::TooLarge) => StatusCode::FORBIDDEN,
			(_, ErrorKind::Decode) => StatusCode::UNPROCESSABLE_ENTITY,
			(_, ErrorKind::Storage) => StatusCode::INTERNAL_SERVER_ERROR,
			(_, ErrorKind::Token) => StatusCode::UNAUTHORIZED,
		};

		if status.is_server_error() {
			error!(?self, "Failed to handle thumbnail request");
		}

		(status, self.to_string()).into_response()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn kinds_map_to_statuses() {
		let cases = [
			(Error::MissingChecksum, StatusCode::BAD_REQUEST),
			(
				Error::SourceTooLarge { size: 10, max: 5 },
				StatusCode::FORBIDDEN,
			),
			(
				Error::Images(tn_images::Error::EmptyAnimation),
				StatusCode::UNPROCESSABLE_ENTITY,
			),
			(
				Error::SourceIo(std::io::Error::other("boom")),
				StatusCode::INTERNAL_SERVER_ERROR,
			),
			(Error::MissingToken, StatusCode::UNAUTHORIZED),
			(
				Error::Images(tn_images::Error::NoFont),
				StatusCode::INTERNAL_SERVER_ERROR,
			),
			(
				Error::Images(tn_images::Error::DecodedTooLarge {
					frames: 100,
					bytes: 1_600_000_000,
					max: 512 * 1024 * 1024,
				}),
				StatusCode::FORBIDDEN,
			),
			(
				Error::Images(tn_images::Error::AnimationTooLarge {
					width: 70_000,
					height: 1,
				}),
				StatusCode::FORBIDDEN,
			),
			(
				Error::Images(tn_images::Error::ImageTooLarge {
					width: 9000,
					height: 10,
					max_width: 7680,
					max_height: 7680,
				}),
				StatusCode::FORBIDDEN,
			),
			(
				Error::Images(tn_images::Error::InvalidDimensions {
					width: 0,
					height: 16,
				}),
				StatusCode::BAD_REQUEST,
			),
		];

		for (error, status) in cases {
			assert_eq!(error.into_response().status(), status);
		}
	}

	#[test]
	fn image_errors_are_split_by_cause() {
		assert_eq!(
			Error::from(tn_images::Error::NoEmbeddedPicture).kind(),
			ErrorKind::Decode
		);
		assert_eq!(
			Error::from(tn_images::Error::EmptyAnimation).kind(),
			ErrorKind::Decode
		);
		assert_eq!(
			Error::from(tn_images::Error::UnsupportedEmbeddedPicture("image/x-pict".into()))
				.kind(),
			ErrorKind::Decode
		);
		assert_eq!(
			Error::TokenExpired { expired_at: 0 }.kind(),
			ErrorKind::Token
		);
	}
}
