use super::{AnalysisOpts, FontSet, TextAnalyzer};
use crate::consts::{
	TEXT_CANVAS_HEIGHT, TEXT_CANVAS_WIDTH, TEXT_FONT_SIZE, TEXT_LINE_SPACING, TEXT_MARGIN,
};

use ab_glyph::{point, Font, FontArc, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};
use tracing::trace;

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Draws plain text onto a fixed size white canvas.
///
/// Each line is split by script so every run is drawn with the face configured for it,
/// and a line is as tall as the tallest face drawn on it. Text wraps at whitespace (or
/// mid word, if a single word doesn't fit a line), and whatever doesn't fit the canvas
/// vertically is dropped.
pub struct TextRenderer {
	fonts: FontSet,
	analyzer: TextAnalyzer,
	opts: AnalysisOpts,
}

impl TextRenderer {
	#[must_use]
	pub fn new(fonts: FontSet) -> Self {
		Self {
			fonts,
			analyzer: TextAnalyzer::default(),
			opts: AnalysisOpts::japanese(),
		}
	}

	#[must_use]
	pub fn render(&self, text: &str) -> RgbaImage {
		let mut canvas = Canvas::new();

		'lines: for line in text.lines() {
			let mut analysis = self.analyzer.analyze(line, &self.opts);
			analysis.merge_common(&self.opts.merge_map);

			for range in &analysis.script_ranges {
				let font = self.fonts.for_script(range.target_script);

				for word in analysis.slice(range).split_inclusive(char::is_whitespace) {
					if !canvas.draw_word(font, word) {
						break 'lines;
					}
				}
			}

			if !canvas.new_line() {
				break;
			}
		}

		trace!(chars = text.len(), "Rendered text");

		canvas.image
	}
}

struct Canvas {
	image: RgbaImage,
	scale: PxScale,
	x: f32,
	baseline: f32,
	/// Advance of the tallest face drawn on the current line so far, 0 while empty
	line_height: f32,
	max_x: f32,
	max_y: f32,
}

impl Canvas {
	#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
	fn new() -> Self {
		Self {
			image: RgbaImage::from_pixel(TEXT_CANVAS_WIDTH, TEXT_CANVAS_HEIGHT, BACKGROUND),
			scale: PxScale::from(TEXT_FONT_SIZE),
			x: TEXT_MARGIN,
			baseline: TEXT_MARGIN + TEXT_FONT_SIZE,
			line_height: 0.0,
			max_x: TEXT_CANVAS_WIDTH as f32 - TEXT_MARGIN,
			max_y: TEXT_CANVAS_HEIGHT as f32 - TEXT_MARGIN,
		}
	}

	/// Moves to the start of the next line, false once the canvas is full
	fn new_line(&mut self) -> bool {
		let advance = if self.line_height > 0.0 {
			self.line_height
		} else {
			TEXT_FONT_SIZE * TEXT_LINE_SPACING
		};

		self.x = TEXT_MARGIN;
		self.line_height = 0.0;
		self.baseline += advance;
		self.baseline <= self.max_y
	}

	fn draw_word(&mut self, font: &FontArc, word: &str) -> bool {
		let scaled = font.as_scaled(self.scale);
		let line_height = (scaled.height() + scaled.line_gap()) * TEXT_LINE_SPACING;

		let width = word
			.chars()
			.filter(|c| !c.is_whitespace())
			.map(|c| scaled.h_advance(font.glyph_id(c)))
			.sum::<f32>();

		if self.x > TEXT_MARGIN && self.x + width > self.max_x && !self.new_line() {
			return false;
		}

		for c in word.chars() {
			if c.is_whitespace() {
				self.x += scaled.h_advance(font.glyph_id(' '));
				continue;
			}

			let glyph_id = font.glyph_id(c);
			let advance = scaled.h_advance(glyph_id);

			if self.x + advance > self.max_x && self.x > TEXT_MARGIN && !self.new_line() {
				return false;
			}

			self.line_height = self.line_height.max(line_height);

			let glyph = glyph_id.with_scale_and_position(self.scale, point(self.x, self.baseline));
			if let Some(outlined) = font.outline_glyph(glyph) {
				let bounds = outlined.px_bounds();
				outlined.draw(|gx, gy, coverage| {
					self.darken(bounds.min.x, bounds.min.y, gx, gy, coverage);
				});
			}

			self.x += advance;
		}

		true
	}

	#[allow(
		clippy::cast_possible_truncation,
		clippy::cast_sign_loss,
		clippy::as_conversions
	)]
	fn darken(&mut self, min_x: f32, min_y: f32, gx: u32, gy: u32, coverage: f32) {
		let x = min_x as i64 + i64::from(gx);
		let y = min_y as i64 + i64::from(gy);

		let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
			return;
		};

		if let Some(pixel) = self.image.get_pixel_mut_checked(x, y) {
			let keep = 1.0 - coverage.clamp(0.0, 1.0);
			for channel in &mut pixel.0[..3] {
				*channel = (f32::from(*channel) * keep).round() as u8;
			}
		}
	}
}
