use crate::{Error, Result};

use std::{
	collections::HashMap,
	fs,
	path::{Path, PathBuf},
};

use ab_glyph::{FontArc, FontVec};
use resvg::usvg::fontdb;
use serde::Deserialize;
use tn_utils::error::FileIOError;
use tracing::{debug, trace, warn};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FontMapFile {
	#[serde(default)]
	font_map: HashMap<String, String>,
	#[serde(default)]
	default_font: Option<String>,
}

/// Which font file to use for each script, as read from a JSON file like
///
/// ```json
/// {
///   "fontMap": { "Han": "fonts/NotoSansCJK.ttc", "Arabic": "fonts/NotoSansArabic.ttf" },
///   "defaultFont": "fonts/NotoSans-Regular.ttf"
/// }
/// ```
///
/// Relative paths are resolved against the directory holding the map file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FontMap {
	pub default_font: Option<PathBuf>,
	pub by_script: HashMap<String, PathBuf>,
}

impl FontMap {
	pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let bytes = fs::read(path).map_err(|e| FileIOError::from((path, e)))?;

		Self::from_slice(&bytes, path.parent().unwrap_or_else(|| Path::new("")))
	}

	pub fn from_slice(bytes: &[u8], base_dir: &Path) -> Result<Self> {
		let FontMapFile {
			font_map,
			default_font,
		} = serde_json::from_slice(bytes)?;

		let resolve = |file: String| {
			let file = PathBuf::from(file);
			if file.is_absolute() {
				file
			} else {
				base_dir.join(file)
			}
		};

		Ok(Self {
			default_font: default_font.map(resolve),
			by_script: font_map
				.into_iter()
				.map(|(script, file)| (script, resolve(file)))
				.collect(),
		})
	}
}

/// Loaded faces, one per configured script plus a default one
#[derive(Clone)]
pub struct FontSet {
	default: FontArc,
	by_script: HashMap<String, FontArc>,
}

impl FontSet {
	/// Loads every face listed in `font_map`.
	///
	/// Without a default font in the map, a sans-serif face is picked among the system
	/// fonts. Fails with [`Error::NoFont`] if none can be found.
	pub fn load(font_map: Option<&FontMap>) -> Result<Self> {
		let by_script = font_map
			.map(|map| {
				map.by_script
					.iter()
					.map(|(script, path)| Ok((script.clone(), load_font(path)?)))
					.collect::<Result<HashMap<_, _>>>()
			})
			.transpose()?
			.unwrap_or_default();

		let default = match font_map.and_then(|map| map.default_font.as_deref()) {
			Some(path) => load_font(path)?,
			None => system_font().ok_or(Error::NoFont)?,
		};

		debug!(scripts = by_script.len(), "Loaded fonts for text rendering");

		Ok(Self { default, by_script })
	}

	#[must_use]
	pub fn new(default: FontArc) -> Self {
		Self {
			default,
			by_script: HashMap::new(),
		}
	}

	#[must_use]
	pub fn with_script_font(mut self, script: impl Into<String>, font: FontArc) -> Self {
		self.by_script.insert(script.into(), font);
		self
	}

	/// Face for `script`, falling back to the default one
	#[must_use]
	pub fn for_script(&self, script: &str) -> &FontArc {
		self.by_script.get(script).unwrap_or(&self.default)
	}
}

fn load_font(path: &Path) -> Result<FontArc> {
	trace!(path = %path.display(), "Loading font");

	let data = fs::read(path).map_err(|e| FileIOError::from((path, e)))?;

	Ok(FontArc::new(FontVec::try_from_vec(data)?))
}

fn system_font() -> Option<FontArc> {
	let mut db = fontdb::Database::new();
	db.load_system_fonts();

	let id = db
		.query(&fontdb::Query {
			families: &[fontdb::Family::SansSerif],
			..fontdb::Query::default()
		})
		.or_else(|| db.faces().next().map(|face| face.id))?;

	db.with_face_data(id, |data, index| {
		FontVec::try_from_vec_and_index(data.to_vec(), index)
			.map_err(|e| warn!(?e, "Failed to parse system font"))
			.ok()
	})
	.flatten()
	.map(FontArc::new)
}
