use crate::{Error, Manager, Request, Resolution, Result, TransferTokens};

use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tn_images::{Decoders, Processor, ThumbnailType};
use tracing::{debug, info_span, warn, Instrument};

/// A client asking for the thumbnail of a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
	/// Where the source lives, handed as is to the configured source
	pub locator: String,
	#[serde(default)]
	pub auth: Option<String>,
	#[serde(default)]
	pub checksum: Option<String>,
	pub mime_type: String,
	pub width: u32,
	pub height: u32,
	#[serde(default)]
	pub source_width: Option<u32>,
	#[serde(default)]
	pub source_height: Option<u32>,
	#[serde(rename = "type")]
	pub thumbnail_type: String,
	/// Processing characteristic, empty for the default one
	#[serde(default)]
	pub processor: String,
}

impl ResolveRequest {
	/// Validates everything the client sent, failing before any work is done
	pub fn into_request(self) -> Result<Request> {
		let checksum = self
			.checksum
			.filter(|checksum| !checksum.is_empty())
			.ok_or(Error::MissingChecksum)?;

		if !Decoders::is_supported(&self.mime_type) {
			return Err(Error::UnsupportedMimeType(self.mime_type));
		}

		let thumbnail_type = self
			.thumbnail_type
			.parse::<ThumbnailType>()
			.map_err(|_| Error::UnsupportedThumbnailType(self.thumbnail_type.clone()))?;

		let processor = Processor::from_characteristic(&self.processor)
			.map_err(|_| Error::UnknownProcessor(self.processor.clone()))?;

		let source_size = match (self.source_width, self.source_height) {
			(Some(width), Some(height)) => Some(Resolution::non_empty(width, height)?),
			_ => None,
		};

		Ok(Request {
			checksum,
			resolution: Resolution::non_empty(self.width, self.height)?,
			source_size,
			thumbnail_type,
			processor,
			mime_type: self.mime_type,
			locator: self.locator,
			auth: self.auth,
		})
	}
}

/// Where and how to download a resolved thumbnail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveResponse {
	pub data_endpoint: String,
	pub transfer_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
	pub bytes: Vec<u8>,
	pub content_type: &'static str,
}

/// The two calls exposed to clients: resolving a thumbnail, which generates it if
/// needed, and downloading it with the token the first call returned.
#[async_trait]
pub trait Thumbnails: Send + Sync + 'static {
	async fn resolve(&self, request: ResolveRequest) -> Result<ResolveResponse>;

	async fn serve(&self, transfer_token: &str) -> Result<Artifact>;
}

pub struct ThumbnailService {
	manager: Manager,
	tokens: TransferTokens,
	data_endpoint: String,
}

impl ThumbnailService {
	pub fn new(manager: Manager, tokens: TransferTokens, data_endpoint: impl Into<String>) -> Self {
		Self {
			manager,
			tokens,
			data_endpoint: data_endpoint.into(),
		}
	}

	#[must_use]
	pub const fn manager(&self) -> &Manager {
		&self.manager
	}
}

#[async_trait]
impl Thumbnails for ThumbnailService {
	async fn resolve(&self, request: ResolveRequest) -> Result<ResolveResponse> {
		let request = request.into_request()?;

		let key = self.manager.get_thumbnail(&request).await?;

		Ok(ResolveResponse {
			data_endpoint: self.data_endpoint.clone(),
			transfer_token: self.tokens.issue(&key)?,
		})
	}

	async fn serve(&self, transfer_token: &str) -> Result<Artifact> {
		// nothing touches the store before the token is proven valid
		let key = self.tokens.verify(transfer_token)?;

		let content_type = key
			.thumbnail_type()
			.map_or("application/octet-stream", |thumbnail_type| {
				thumbnail_type.mime_type()
			});

		Ok(Artifact {
			bytes: self.manager.store().read(&key).await?,
			content_type,
		})
	}
}

/// Wraps a [`Thumbnails`] implementation, opening a span for every call and
/// logging how long it took and how it ended.
pub struct Instrumented<S> {
	inner: S,
}

impl<S: Thumbnails> Instrumented<S> {
	pub const fn new(inner: S) -> Self {
		Self { inner }
	}

	pub fn into_inner(self) -> S {
		self.inner
	}
}

fn record<T>(operation: &'static str, start: Instant, res: &Result<T>) {
	let elapsed = start.elapsed();

	match res {
		Ok(_) => debug!(operation, ?elapsed, "Request succeeded"),
		Err(e) => warn!(operation, ?elapsed, kind = ?e.kind(), %e, "Request failed"),
	}
}

#[async_trait]
impl<S: Thumbnails> Thumbnails for Instrumented<S> {
	async fn resolve(&self, request: ResolveRequest) -> Result<ResolveResponse> {
		let span = info_span!(
			"resolve",
			checksum = ?request.checksum,
			mime_type = %request.mime_type,
			width = request.width,
			height = request.height,
			thumbnail_type = %request.thumbnail_type,
		);

		async move {
			let start = Instant::now();
			let res = self.inner.resolve(request).await;
			record("resolve", start, &res);
			res
		}
		.instrument(span)
		.await
	}

	async fn serve(&self, transfer_token: &str) -> Result<Artifact> {
		async move {
			let start = Instant::now();
			let res = self.inner.serve(transfer_token).await;
			record("serve", start, &res);
			res
		}
		.instrument(info_span!("serve"))
		.await
	}
}
