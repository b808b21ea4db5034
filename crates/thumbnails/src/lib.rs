#![warn(
	clippy::all,
	clippy::pedantic,
	clippy::correctness,
	clippy::perf,
	clippy::style,
	clippy::suspicious,
	clippy::complexity,
	clippy::nursery,
	clippy::unwrap_used,
	unused_qualifications,
	rust_2018_idioms,
	clippy::expect_used,
	trivial_casts,
	trivial_numeric_casts,
	unused_allocation,
	clippy::as_conversions,
	clippy::dbg_macro
)]
#![forbid(unsafe_code)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

//! Generation and caching of thumbnails.
//!
//! A [`Manager`] maps requests onto a catalog of [`Resolutions`] and a [`CacheKey`],
//! and only fetches, decodes and encodes the source when the [`ArtifactStore`] doesn't
//! have that key yet. The [`ThumbnailService`] puts the manager behind a resolve call,
//! returning a [`TransferTokens`] signed token, and a data call redeeming it.

mod config;
mod error;
pub mod http;
mod key;
mod manager;
mod resolution;
mod service;
mod source;
mod storage;
mod token;

pub use config::{Config, DEFAULT_RESOLUTIONS};
pub use error::{Error, ErrorKind, Result};
pub use key::CacheKey;
pub use manager::{
	Limits, Manager, Request, DEFAULT_MAX_DECODED_SIZE, DEFAULT_MAX_INPUT_DIMENSION,
	DEFAULT_MAX_INPUT_SIZE,
};
pub use resolution::{Resolution, Resolutions};
pub use service::{
	Artifact, Instrumented, ResolveRequest, ResolveResponse, ThumbnailService, Thumbnails,
};
pub use source::{FileSystemSource, HttpSource, Source, SourceStream, ACCESS_TOKEN_HEADER};
pub use storage::{ArtifactStore, FileSystemStore};
pub use token::{TransferClaims, TransferTokens};
