use crate::{ArtifactStore, CacheKey, Error, Resolution, Resolutions, Result, Source};

use std::{
	collections::HashMap,
	panic::{self, AssertUnwindSafe},
	sync::{Arc, Mutex, PoisonError, Weak},
	time::Instant,
};

use tn_images::{DecodeLimits, Decoders, Encoder, Generator, Processor, ThumbnailType};
use tokio::{sync::oneshot, task::spawn_blocking};
use tracing::{debug, error, instrument, trace};

/// Default cap on the size of source files, 50 MiB
pub const DEFAULT_MAX_INPUT_SIZE: u64 = 50 * 1024 * 1024;

/// Default cap on the width and height of decoded sources
pub const DEFAULT_MAX_INPUT_DIMENSION: u32 = 7680;

/// Default cap on the memory all decoded frames of a source may take together, 512 MiB
pub const DEFAULT_MAX_DECODED_SIZE: u64 = 512 * 1024 * 1024;

/// Resource guards applied to every source before a thumbnail is generated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
	pub max_input_width: u32,
	pub max_input_height: u32,
	pub max_input_size: u64,
	pub max_decoded_size: u64,
}

impl Limits {
	/// The part of the limits the decoders enforce themselves
	#[must_use]
	pub const fn decode_limits(&self) -> DecodeLimits {
		DecodeLimits {
			max_width: self.max_input_width,
			max_height: self.max_input_height,
			max_decoded_bytes: self.max_decoded_size,
		}
	}

	fn check_dimensions(&self, Resolution { width, height }: Resolution) -> Result<()> {
		if width > self.max_input_width || height > self.max_input_height {
			return Err(Error::ImageTooLarge {
				width,
				height,
				max_width: self.max_input_width,
				max_height: self.max_input_height,
			});
		}

		Ok(())
	}
}

impl Default for Limits {
	fn default() -> Self {
		Self {
			max_input_width: DEFAULT_MAX_INPUT_DIMENSION,
			max_input_height: DEFAULT_MAX_INPUT_DIMENSION,
			max_input_size: DEFAULT_MAX_INPUT_SIZE,
			max_decoded_size: DEFAULT_MAX_DECODED_SIZE,
		}
	}
}

/// Everything that determines a thumbnail, plus what's needed to fetch and decode
/// its source on a cache miss
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
	pub checksum: String,
	pub resolution: Resolution,
	/// Natural dimensions of the source when already known; the requested
	/// resolution stands in for them otherwise
	pub source_size: Option<Resolution>,
	pub thumbnail_type: ThumbnailType,
	/// `None` when the caller didn't ask for a specific strategy
	pub processor: Option<Processor>,
	pub mime_type: String,
	pub locator: String,
	pub auth: Option<String>,
}

/// Resolves thumbnail requests to artifacts, generating them on cache misses
pub struct Manager {
	resolutions: Resolutions,
	store: Arc<dyn ArtifactStore>,
	source: Arc<dyn Source>,
	decoders: Arc<Decoders>,
	limits: Limits,
	generation_locks: Option<Mutex<HashMap<CacheKey, Weak<tokio::sync::Mutex<()>>>>>,
}

impl Manager {
	/// The decoders are made to enforce `limits`, replacing whatever limits they had
	pub fn new(
		resolutions: Resolutions,
		store: Arc<dyn ArtifactStore>,
		source: Arc<dyn Source>,
		decoders: Decoders,
		limits: Limits,
	) -> Self {
		Self {
			resolutions,
			store,
			source,
			decoders: Arc::new(decoders.with_limits(limits.decode_limits())),
			limits,
			generation_locks: None,
		}
	}

	/// Serializes concurrent cache misses for the same key, so only the first one
	/// generates the artifact and the others find it in the store.
	///
	/// Without it, concurrent misses all generate the same artifact and the store
	/// keeps whichever write lands first.
	#[must_use]
	pub fn with_generation_lock(mut self) -> Self {
		self.generation_locks = Some(Mutex::default());
		self
	}

	#[must_use]
	pub const fn resolutions(&self) -> &Resolutions {
		&self.resolutions
	}

	#[must_use]
	pub fn store(&self) -> &Arc<dyn ArtifactStore> {
		&self.store
	}

	/// The catalog resolution a request maps to, and the key of its artifact.
	///
	/// A claimed source size over the input limits is refused here, before anything
	/// is fetched.
	pub fn target(&self, request: &Request) -> Result<(Resolution, CacheKey)> {
		if let Some(source_size) = request.source_size {
			self.limits.check_dimensions(source_size)?;
		}

		let resolution = self.resolutions.closest_match(
			request.resolution,
			request.source_size.unwrap_or(request.resolution),
		);

		let key = CacheKey::new(
			&request.checksum,
			resolution,
			request.thumbnail_type,
			request.processor,
		)?;

		Ok((resolution, key))
	}

	/// Returns the key of the artifact for `request`, generating and storing it first
	/// if the store doesn't have it yet.
	#[instrument(
		skip_all,
		fields(
			checksum = %request.checksum,
			resolution = %request.resolution,
			thumbnail_type = %request.thumbnail_type,
		)
	)]
	pub async fn get_thumbnail(&self, request: &Request) -> Result<CacheKey> {
		let (resolution, key) = self.target(request)?;

		if self.store.exists(&key).await? {
			trace!(%key, "Thumbnail cache hit");
			return Ok(key);
		}

		let _guard = match self.generation_lock(&key) {
			Some(lock) => {
				let guard = lock.lock_owned().await;
				// whoever held the lock before us may have stored it already
				if self.store.exists(&key).await? {
					trace!(%key, "Thumbnail generated while waiting for the lock");
					return Ok(key);
				}
				Some(guard)
			}
			None => None,
		};

		trace!(%key, "Thumbnail cache miss, generating");
		let start = Instant::now();

		let bytes = self
			.source
			.fetch(&request.locator, request.auth.as_deref())
			.await?
			.read_limited(self.limits.max_input_size)
			.await?;

		let thumbnail = self.generate(request, resolution, bytes).await?;

		self.store.write(&key, thumbnail).await?;

		debug!(%key, elapsed = ?start.elapsed(), "Generated thumbnail");

		Ok(key)
	}

	async fn generate(
		&self,
		request: &Request,
		resolution: Resolution,
		bytes: Vec<u8>,
	) -> Result<Vec<u8>> {
		let (tx, rx) = oneshot::channel();

		let job = GenerationJob {
			decoders: Arc::clone(&self.decoders),
			limits: self.limits,
			mime_type: request.mime_type.clone(),
			resolution,
			thumbnail_type: request.thumbnail_type,
			processor: request.processor.unwrap_or_default(),
			bytes,
		};

		// Using channel instead of waiting the JoinHandle as for some reason
		// the JoinHandle can take some extra time to complete
		let handle = spawn_blocking(move || {
			// Handling error on receiver side
			let _ = tx.send(
				panic::catch_unwind(AssertUnwindSafe(|| job.run())).unwrap_or_else(|_| {
					Err(Error::GenerationPanicked(
						"Internal panic on third party crate".to_string(),
					))
				}),
			);
		});

		if let Ok(res) = rx.await {
			res
		} else {
			error!("Failed to generate thumbnail");
			Err(Error::GenerationPanicked(handle.await.map_or_else(
				|e| e.to_string(),
				|()| "generation task dropped its result".to_string(),
			)))
		}
	}

	fn generation_lock(&self, key: &CacheKey) -> Option<Arc<tokio::sync::Mutex<()>>> {
		let mut locks = self
			.generation_locks
			.as_ref()?
			.lock()
			.unwrap_or_else(PoisonError::into_inner);

		locks.retain(|_, lock| lock.strong_count() > 0);

		if let Some(lock) = locks.get(key).and_then(Weak::upgrade) {
			return Some(lock);
		}

		let lock = Arc::new(tokio::sync::Mutex::new(()));
		locks.insert(key.clone(), Arc::downgrade(&lock));
		Some(lock)
	}
}

/// The CPU bound part of a generation, run on the blocking pool
struct GenerationJob {
	decoders: Arc<Decoders>,
	limits: Limits,
	mime_type: String,
	resolution: Resolution,
	thumbnail_type: ThumbnailType,
	processor: Processor,
	bytes: Vec<u8>,
}

impl GenerationJob {
	fn run(self) -> Result<Vec<u8>> {
		let decoded = self.decoders.decode(&self.mime_type, &self.bytes)?;

		let (width, height) = decoded.dimensions();
		self.limits.check_dimensions(Resolution::new(width, height))?;

		// The target was picked from the source size the caller claimed, the decoded
		// image has the final say so it's never scaled up
		let target = self.resolution.fit_within(Resolution::new(width, height));
		if target != self.resolution {
			debug!(
				requested = %self.resolution,
				%target,
				"Target is larger than the decoded source, scaling down"
			);
		}

		let generated = Generator::for_type(self.thumbnail_type).generate(
			(target.width, target.height),
			self.processor,
			decoded,
		)?;

		Encoder::for_type(self.thumbnail_type)
			.encode(generated)
			.map_err(Into::into)
	}
}
