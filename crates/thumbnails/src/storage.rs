use crate::{CacheKey, Error, Result};

use std::{
	io::{self, Write},
	path::{Path, PathBuf},
};

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tn_utils::error::FileIOError;
use tokio::{fs, task::spawn_blocking};
use tracing::{error, instrument, trace};

/// Where encoded thumbnails live.
///
/// Artifacts are write-once: there is no update nor delete, and writing a key that
/// already exists is a successful no-op.
#[async_trait]
pub trait ArtifactStore: Send + Sync + 'static {
	async fn exists(&self, key: &CacheKey) -> Result<bool>;

	/// Fails with [`Error::NotFound`] for keys that were never written
	async fn read(&self, key: &CacheKey) -> Result<Vec<u8>>;

	async fn write(&self, key: &CacheKey, bytes: Vec<u8>) -> Result<()>;
}

/// Keeps artifacts as plain files below a root directory, one file per key
#[derive(Debug, Clone)]
pub struct FileSystemStore {
	root: PathBuf,
}

impl FileSystemStore {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into() }
	}

	/// This does not check if the artifact exists, it just returns the path that it
	/// would exist at
	#[must_use]
	pub fn path_for(&self, key: &CacheKey) -> PathBuf {
		self.root.join(key.to_path())
	}
}

#[async_trait]
impl ArtifactStore for FileSystemStore {
	async fn exists(&self, key: &CacheKey) -> Result<bool> {
		let path = self.path_for(key);

		match fs::metadata(&path).await {
			Ok(_) => Ok(true),
			Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
			Err(e) => Err(FileIOError::from((path, e)).into()),
		}
	}

	async fn read(&self, key: &CacheKey) -> Result<Vec<u8>> {
		let path = self.path_for(key);

		fs::read(&path).await.map_err(|e| {
			if e.kind() == io::ErrorKind::NotFound {
				Error::NotFound(key.clone())
			} else {
				FileIOError::from((path, e)).into()
			}
		})
	}

	#[instrument(skip_all, fields(%key, size = bytes.len()))]
	async fn write(&self, key: &CacheKey, bytes: Vec<u8>) -> Result<()> {
		if self.exists(key).await? {
			trace!("Skipping write because the artifact already exists");
			return Ok(());
		}

		let path = self.path_for(key);

		let Some(shard_dir) = path.parent().map(Path::to_path_buf) else {
			error!("Failed to get parent directory for sharding parent directory");
			return Err(Error::InvalidCacheKey(key.to_string()));
		};

		fs::create_dir_all(&shard_dir)
			.await
			.map_err(|e| FileIOError::from((&shard_dir, e, "creating shard directory")))?;

		trace!("Created shard directory and writing artifact to disk");

		spawn_blocking(move || persist(&shard_dir, &path, &bytes)).await?
	}
}

/// Writes into a temporary file next to the destination, then moves it into place
/// unless another writer got there first. Readers never see a partial artifact.
fn persist(shard_dir: &Path, path: &Path, bytes: &[u8]) -> Result<()> {
	let mut temp_file = NamedTempFile::new_in(shard_dir)
		.map_err(|e| FileIOError::from((shard_dir, e, "creating temporary artifact")))?;

	temp_file
		.write_all(bytes)
		.and_then(|()| temp_file.as_file().sync_all())
		.map_err(|e| FileIOError::from((temp_file.path(), e, "writing temporary artifact")))?;

	match temp_file.persist_noclobber(path) {
		Ok(_) => {
			trace!("Wrote artifact to disk");
			Ok(())
		}
		Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
			trace!("Concurrent writer already stored the artifact");
			Ok(())
		}
		Err(e) => Err(FileIOError::from((path, e.error, "moving artifact into place")).into()),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::Resolution;

	use std::sync::Arc;

	use tempfile::tempdir;
	use tn_images::ThumbnailType;
	use tracing_test::traced_test;

	fn key(checksum: &str) -> CacheKey {
		CacheKey::new(checksum, Resolution::new(32, 32), ThumbnailType::Png, None).unwrap()
	}

	#[tokio::test]
	#[traced_test]
	async fn write_then_read() {
		let dir = tempdir().unwrap();
		let store = FileSystemStore::new(dir.path());
		let key = key("abc123");

		assert!(!store.exists(&key).await.unwrap());

		store.write(&key, b"thumbnail".to_vec()).await.unwrap();

		assert!(store.exists(&key).await.unwrap());
		assert_eq!(store.read(&key).await.unwrap(), b"thumbnail");
		assert!(dir.path().join("ab/c1/23/32x32.png").is_file());
	}

	#[tokio::test]
	#[traced_test]
	async fn unwritten_keys_are_not_found() {
		let dir = tempdir().unwrap();
		let store = FileSystemStore::new(dir.path());

		assert!(matches!(
			store.read(&key("fedcba")).await,
			Err(Error::NotFound(k)) if k == key("fedcba")
		));
	}

	#[tokio::test]
	#[traced_test]
	async fn artifacts_are_write_once() {
		let dir = tempdir().unwrap();
		let store = FileSystemStore::new(dir.path());
		let key = key("abc123");

		store.write(&key, b"first".to_vec()).await.unwrap();
		store.write(&key, b"second".to_vec()).await.unwrap();

		assert_eq!(store.read(&key).await.unwrap(), b"first");
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	#[traced_test]
	async fn concurrent_writes_keep_a_single_payload() {
		let dir = tempdir().unwrap();
		let store = Arc::new(FileSystemStore::new(dir.path()));
		let key = key("abc123");

		// distinct sizes too, so a mix of two payloads can't pass for either
		let payloads = (0..16_u8)
			.map(|i| vec![i; 4096 + usize::from(i) * 512])
			.collect::<Vec<_>>();

		let writers = payloads
			.iter()
			.cloned()
			.map(|payload| {
				let store = Arc::clone(&store);
				let key = key.clone();
				tokio::spawn(async move { store.write(&key, payload).await })
			})
			.collect::<Vec<_>>();

		for writer in writers {
			writer.await.unwrap().unwrap();
		}

		let stored = store.read(&key).await.unwrap();
		assert!(payloads.contains(&stored));

		let shard_dir = store.path_for(&key).parent().unwrap().to_path_buf();
		let entries = std::fs::read_dir(shard_dir)
			.unwrap()
			.map(|entry| entry.unwrap().file_name())
			.collect::<Vec<_>>();
		assert_eq!(entries, ["32x32.png"]);
	}

	#[test]
	fn losing_a_race_is_not_an_error() {
		let dir = tempdir().unwrap();
		let path = dir.path().join("artifact.png");

		persist(dir.path(), &path, b"winner").unwrap();
		persist(dir.path(), &path, b"loser").unwrap();

		assert_eq!(std::fs::read(&path).unwrap(), b"winner");
		// the losing temp file is cleaned up
		assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
	}
}
