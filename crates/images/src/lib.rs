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

//! Decoding, resizing and encoding of preview images.
//!
//! Source bytes go through a [`Decoder`] picked from their MIME type, the resulting
//! [`DecodedImage`] is scaled by a [`Generator`] and finally serialized by an [`Encoder`].

mod animation;
mod archive;
mod audio;
mod consts;
mod decoded;
mod encoder;
mod error;
mod generator;
mod generic;
mod handler;
mod limits;
mod orientation;
mod processor;
pub mod text;

pub use consts::{GGP_MIME_TYPE, GGS_MIME_TYPE, TEXT_CANVAS_HEIGHT, TEXT_CANVAS_WIDTH};
pub use decoded::{Animation, AnimationFrame, DecodedImage, Disposal, Repeat};
pub use encoder::{Encoder, ThumbnailType};
pub use error::{Error, Result};
pub use generator::Generator;
pub use handler::{normalize_mime_type, Decoder, Decoders};
pub use limits::DecodeLimits;
pub use image::DynamicImage;
pub use orientation::Orientation;
pub use processor::Processor;
