use crate::{Error, Result};

use std::{
	io,
	path::{Component, Path, PathBuf},
	pin::Pin,
};

use async_trait::async_trait;
use futures::TryStreamExt;
use tn_utils::error::FileIOError;
use tokio::{
	fs::File,
	io::{AsyncRead, AsyncReadExt},
};
use tokio_util::io::StreamReader;
use tracing::{instrument, trace};

/// Header carrying the caller's credentials to the content service
pub const ACCESS_TOKEN_HEADER: &str = "X-Access-Token";

/// Bytes of an original file, as handed out by a [`Source`]
pub struct SourceStream {
	/// Size announced by the source, checked before anything is read
	pub content_length: Option<u64>,
	pub body: Pin<Box<dyn AsyncRead + Send>>,
}

impl SourceStream {
	/// Reads the whole body, refusing sources larger than `max_size` bytes without
	/// downloading them
	pub async fn read_limited(self, max_size: u64) -> Result<Vec<u8>> {
		if let Some(size) = self.content_length.filter(|size| *size > max_size) {
			return Err(Error::SourceTooLarge {
				size,
				max: max_size,
			});
		}

		let mut bytes = Vec::new();
		self.body
			.take(max_size.saturating_add(1))
			.read_to_end(&mut bytes)
			.await?;

		let size = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
		if size > max_size {
			return Err(Error::SourceTooLarge {
				size,
				max: max_size,
			});
		}

		Ok(bytes)
	}
}

/// Where the original files come from
#[async_trait]
pub trait Source: Send + Sync + 'static {
	async fn fetch(&self, locator: &str, auth: Option<&str>) -> Result<SourceStream>;
}

/// Downloads files over http, `locator` being the file's url
#[derive(Debug, Clone, Default)]
pub struct HttpSource {
	client: reqwest::Client,
}

impl HttpSource {
	#[must_use]
	pub const fn new(client: reqwest::Client) -> Self {
		Self { client }
	}
}

#[async_trait]
impl Source for HttpSource {
	#[instrument(skip_all, fields(%locator))]
	async fn fetch(&self, locator: &str, auth: Option<&str>) -> Result<SourceStream> {
		let mut request = self.client.get(locator);
		if let Some(token) = auth {
			request = request.header(ACCESS_TOKEN_HEADER, token);
		}

		let response = request.send().await?.error_for_status()?;
		let content_length = response.content_length();

		trace!(?content_length, "Fetching source");

		Ok(SourceStream {
			content_length,
			body: Box::pin(StreamReader::new(
				response.bytes_stream().map_err(io::Error::other),
			)),
		})
	}
}

/// Serves files from a local directory, `locator` being a path relative to it
#[derive(Debug, Clone)]
pub struct FileSystemSource {
	root: PathBuf,
}

impl FileSystemSource {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into() }
	}

	fn resolve(&self, locator: &str) -> Result<PathBuf> {
		let relative = Path::new(locator);

		if locator.is_empty()
			|| !relative
				.components()
				.all(|component| matches!(component, Component::Normal(_)))
		{
			return Err(Error::InvalidLocator(locator.to_string()));
		}

		Ok(self.root.join(relative))
	}
}

#[async_trait]
impl Source for FileSystemSource {
	async fn fetch(&self, locator: &str, _auth: Option<&str>) -> Result<SourceStream> {
		let path = self.resolve(locator)?;

		let file = File::open(&path)
			.await
			.map_err(|e| FileIOError::from((&path, e)))?;
		let metadata = file
			.metadata()
			.await
			.map_err(|e| FileIOError::from((&path, e)))?;

		Ok(SourceStream {
			content_length: Some(metadata.len()),
			body: Box::pin(file),
		})
	}
}
