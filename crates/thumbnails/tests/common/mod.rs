#![allow(dead_code)]

use tn_thumbnails::{
	FileSystemStore, Limits, Manager, Resolutions, Result, Source, SourceStream, ThumbnailService,
	TransferTokens,
};

use std::{
	borrow::Cow,
	io::Cursor,
	path::Path,
	sync::{
		atomic::{AtomicUsize, Ordering},
		Arc,
	},
	time::Duration,
};

use async_trait::async_trait;
use image::{DynamicImage, ImageOutputFormat, Rgba, RgbaImage};
use tn_images::Decoders;
use tokio::sync::Barrier;

pub const SECRET: &[u8] = b"integration secret";
pub const DATA_ENDPOINT: &str = "http://thumbnails.test/data";

/// Serves the same bytes for every locator and counts how often it was asked to
pub struct CountingSource {
	bytes: Vec<u8>,
	fetches: AtomicUsize,
	barrier: Option<Barrier>,
}

impl CountingSource {
	pub fn new(bytes: Vec<u8>) -> Arc<Self> {
		Arc::new(Self {
			bytes,
			fetches: AtomicUsize::new(0),
			barrier: None,
		})
	}

	/// Every fetch waits until `fetchers` of them are in flight
	pub fn gated(bytes: Vec<u8>, fetchers: usize) -> Arc<Self> {
		Arc::new(Self {
			bytes,
			fetches: AtomicUsize::new(0),
			barrier: Some(Barrier::new(fetchers)),
		})
	}

	pub fn fetches(&self) -> usize {
		self.fetches.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl Source for CountingSource {
	async fn fetch(&self, _locator: &str, _auth: Option<&str>) -> Result<SourceStream> {
		self.fetches.fetch_add(1, Ordering::SeqCst);

		if let Some(barrier) = &self.barrier {
			barrier.wait().await;
		}

		Ok(SourceStream {
			content_length: u64::try_from(self.bytes.len()).ok(),
			body: Box::pin(Cursor::new(self.bytes.clone())),
		})
	}
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
	let image = RgbaImage::from_fn(width, height, |x, y| {
		Rgba([u8::try_from(x % 256).unwrap(), u8::try_from(y % 256).unwrap(), 128, 255])
	});

	let mut bytes = Vec::new();
	DynamicImage::ImageRgba8(image)
		.write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
		.unwrap();
	bytes
}

/// `frames` full screen frames of different shades of grey
pub fn gif(width: u16, height: u16, frames: u8) -> Vec<u8> {
	let mut bytes = Vec::new();
	{
		let mut encoder = gif::Encoder::new(&mut bytes, width, height, &[]).unwrap();
		encoder.set_repeat(gif::Repeat::Infinite).unwrap();

		for i in 0..frames {
			let shade = i.wrapping_mul(40);
			encoder
				.write_frame(&gif::Frame {
					width,
					height,
					delay: 4,
					palette: Some(vec![shade, shade, shade]),
					buffer: Cow::Owned(vec![0; usize::from(width) * usize::from(height)]),
					..gif::Frame::default()
				})
				.unwrap();
		}
	}
	bytes
}

pub fn catalog() -> Resolutions {
	Resolutions::parse(["16x16", "32x32", "64x64", "128x128", "1920x1080"]).unwrap()
}

pub fn manager(root: &Path, source: Arc<dyn Source>) -> Manager {
	Manager::new(
		catalog(),
		Arc::new(FileSystemStore::new(root)),
		source,
		Decoders::default(),
		Limits::default(),
	)
}

pub fn service(root: &Path, source: Arc<dyn Source>) -> ThumbnailService {
	ThumbnailService::new(
		manager(root, source),
		TransferTokens::new(SECRET, Duration::from_secs(60)).unwrap(),
		DATA_ENDPOINT,
	)
}
