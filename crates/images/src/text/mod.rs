//! Plain text previews: script analysis, font selection and rasterization.

mod analyzer;
mod fonts;
mod renderer;

pub use analyzer::{
	AnalysisOpts, MergeMap, ScriptRange, TextAnalysis, TextAnalyzer, COMMON_SCRIPT,
	DEFAULT_SCRIPTS, INHERITED_SCRIPT, UNKNOWN_SCRIPT,
};
pub use fonts::{FontMap, FontSet};
pub use renderer::TextRenderer;

/// Tuffy, a public domain face bundled with the tests so text layout doesn't depend
/// on the fonts installed on the machine
#[cfg(test)]
pub(crate) fn test_fonts() -> FontSet {
	#[allow(clippy::unwrap_used)]
	let font =
		ab_glyph::FontArc::try_from_slice(include_bytes!("../../tests/fonts/Tuffy.ttf")).unwrap();

	FontSet::new(font)
}
