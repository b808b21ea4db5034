/// MIME type of a GeoGebra slides archive, whose preview lives at [`GGS_PREVIEW_PATH`]
pub const GGS_MIME_TYPE: &str = "application/vnd.geogebra.slides";

/// MIME type of a GeoGebra pinboard archive, whose preview lives at [`GGP_PREVIEW_PATH`]
pub const GGP_MIME_TYPE: &str = "application/vnd.geogebra.pinboard";

pub(crate) const GGS_PREVIEW_PATH: &str = "_slide0/geogebra_thumbnail.png";
pub(crate) const GGP_PREVIEW_PATH: &str = "_board0/geogebra_thumbnail.png";

pub(crate) const TEXT_MIME_TYPE: &str = "text/plain";
pub(crate) const GIF_MIME_TYPE: &str = "image/gif";

pub(crate) const AUDIO_MIME_TYPES: [&str; 5] = [
	"audio/flac",
	"audio/x-flac",
	"audio/mpeg",
	"audio/mp3",
	"audio/ogg",
];

/// Raster types the generic decoder understands, used for embedded pictures
pub(crate) const RASTER_MIME_TYPES: [&str; 8] = [
	"image/png",
	"image/jpeg",
	"image/jpg",
	"image/bmp",
	"image/x-ms-bmp",
	"image/tiff",
	"image/webp",
	"image/x-icon",
];

/// Width of the canvas plain text is rendered onto
pub const TEXT_CANVAS_WIDTH: u32 = 640;

/// Height of the canvas plain text is rendered onto
pub const TEXT_CANVAS_HEIGHT: u32 = 480;

/// Space left blank around the rendered text, in pixels
pub(crate) const TEXT_MARGIN: f32 = 10.0;

/// 12pt at 72 dpi
pub(crate) const TEXT_FONT_SIZE: f32 = 12.0;

pub(crate) const TEXT_LINE_SPACING: f32 = 1.5;

/// This is the quality that we encode jpeg thumbnails at, between 1 and 100
pub(crate) const JPEG_QUALITY: u8 = 80;

/// NeuQuant sampling factor: 1 is the slowest and best, 30 the fastest
pub(crate) const GIF_QUANTIZE_SAMPLE_FACTOR: i32 = 10;
