use crate::{
	Error, FileSystemSource, FileSystemStore, HttpSource, Limits, Manager, Resolutions, Result,
	Source, ThumbnailService, TransferTokens, DEFAULT_MAX_DECODED_SIZE,
	DEFAULT_MAX_INPUT_DIMENSION, DEFAULT_MAX_INPUT_SIZE,
};

use std::{
	env, fs,
	path::{Path, PathBuf},
	sync::Arc,
	time::Duration,
};

use serde::{Deserialize, Serialize};
use tn_images::{text::FontMap, Decoders};
use tn_utils::error::FileIOError;
use tracing::{debug, info};

pub const DEFAULT_RESOLUTIONS: [&str; 7] = [
	"16x16",
	"32x32",
	"64x64",
	"128x128",
	"1920x1080",
	"3840x2160",
	"7680x4320",
];

/// Settings of the thumbnail service, read from a JSON file. Every field is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
	pub resolutions: Vec<String>,
	pub max_input_width: u32,
	pub max_input_height: u32,
	/// In bytes
	pub max_input_size: u64,
	/// In bytes, summed over every decoded frame of a source
	pub max_decoded_size: u64,
	pub storage_root: PathBuf,
	/// Serve sources from this directory instead of downloading them over http
	pub source_root: Option<PathBuf>,
	pub transfer_secret: String,
	pub transfer_token_ttl_secs: u64,
	pub data_endpoint: String,
	pub font_map_path: Option<PathBuf>,
	pub generation_lock: bool,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			resolutions: DEFAULT_RESOLUTIONS.iter().map(ToString::to_string).collect(),
			max_input_width: DEFAULT_MAX_INPUT_DIMENSION,
			max_input_height: DEFAULT_MAX_INPUT_DIMENSION,
			max_input_size: DEFAULT_MAX_INPUT_SIZE,
			max_decoded_size: DEFAULT_MAX_DECODED_SIZE,
			storage_root: env::temp_dir().join("thumbnails"),
			source_root: None,
			transfer_secret: String::new(),
			transfer_token_ttl_secs: 60,
			data_endpoint: "http://127.0.0.1:9186/data".to_string(),
			font_map_path: None,
			generation_lock: false,
		}
	}
}

impl Config {
	pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let bytes = fs::read(path).map_err(|e| FileIOError::from((path, e)))?;

		serde_json::from_slice(&bytes)
			.map_err(|e| Error::Config(format!("failed to parse <path='{}'>: {e}", path.display())))
	}

	#[must_use]
	pub const fn limits(&self) -> Limits {
		Limits {
			max_input_width: self.max_input_width,
			max_input_height: self.max_input_height,
			max_input_size: self.max_input_size,
			max_decoded_size: self.max_decoded_size,
		}
	}

	/// Wires the store, source, decoders and token signer described by this config
	pub fn build_service(&self) -> Result<ThumbnailService> {
		let resolutions = Resolutions::parse(&self.resolutions)?;

		let font_map = self
			.font_map_path
			.as_ref()
			.map(FontMap::from_path)
			.transpose()?;

		let source: Arc<dyn Source> = match &self.source_root {
			Some(root) => Arc::new(FileSystemSource::new(root)),
			None => Arc::new(HttpSource::default()),
		};

		let mut manager = Manager::new(
			resolutions,
			Arc::new(FileSystemStore::new(&self.storage_root)),
			source,
			Decoders::new(font_map),
			self.limits(),
		);

		if self.generation_lock {
			debug!("Serializing concurrent generations of the same thumbnail");
			manager = manager.with_generation_lock();
		}

		let tokens = TransferTokens::new(
			self.transfer_secret.as_bytes(),
			Duration::from_secs(self.transfer_token_ttl_secs),
		)?;

		info!(
			storage_root = %self.storage_root.display(),
			resolutions = self.resolutions.len(),
			"Thumbnail service configured"
		);

		Ok(ThumbnailService::new(
			manager,
			tokens,
			self.data_endpoint.clone(),
		))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::Resolution;

	use tempfile::tempdir;

	#[test]
	fn fields_default_individually() {
		let dir = tempdir().unwrap();
		let path = dir.path().join("config.json");
		fs::write(
			&path,
			r#"{ "resolutions": ["10x10", "20x20"], "transferSecret": "s3cr3t", "generationLock": true }"#,
		)
		.unwrap();

		let config = Config::from_path(&path).unwrap();
		assert_eq!(config.resolutions, ["10x10", "20x20"]);
		assert_eq!(config.transfer_secret, "s3cr3t");
		assert!(config.generation_lock);
		assert_eq!(config.max_input_width, 7680);
		assert_eq!(config.max_input_size, 50 * 1024 * 1024);
		assert_eq!(config.max_decoded_size, 512 * 1024 * 1024);
		assert_eq!(config.transfer_token_ttl_secs, 60);
	}

	#[test]
	fn default_catalog_is_valid() {
		let resolutions = Resolutions::parse(&Config::default().resolutions).unwrap();
		assert_eq!(resolutions.iter().count(), 7);
		assert_eq!(resolutions.iter().last(), Some(&Resolution::new(7680, 4320)));
	}

	#[test]
	fn invalid_files_are_config_errors() {
		let dir = tempdir().unwrap();
		let path = dir.path().join("config.json");
		fs::write(&path, "{ nope").unwrap();

		assert!(matches!(Config::from_path(&path), Err(Error::Config(_))));
		assert!(matches!(
			Config::from_path(dir.path().join("missing.json")),
			Err(Error::FileIO(_))
		));
	}

	#[test]
	fn building_requires_a_secret() {
		let dir = tempdir().unwrap();
		let config = Config {
			storage_root: dir.path().to_path_buf(),
			..Config::default()
		};

		assert!(matches!(config.build_service(), Err(Error::Config(_))));

		let config = Config {
			transfer_secret: "secret".to_string(),
			..config
		};
		assert!(config.build_service().is_ok());
	}

	#[test]
	fn building_rejects_bad_resolutions() {
		let config = Config {
			resolutions: vec!["big".to_string()],
			transfer_secret: "secret".to_string(),
			..Config::default()
		};

		assert!(matches!(
			config.build_service(),
			Err(Error::InvalidResolution(_))
		));
	}
}
