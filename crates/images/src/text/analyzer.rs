//! Splits a string into ranges of the same Unicode script.
//!
//! Fonts rarely cover every script, so the renderer needs to know which parts of a
//! line should be drawn with which face. Punctuation, spaces and emoji belong to the
//! `Common` script and combining marks to `Inherited`; those get folded into their
//! neighbours by [`TextAnalysis::merge_common`] so they are drawn with the same face as
//! the text around them.

use std::{collections::HashMap, mem};

use unicode_script::{Script, UnicodeScript};

/// Tag used for characters whose script isn't in the analyzer's list
pub const UNKNOWN_SCRIPT: &str = "_unknown";

pub const COMMON_SCRIPT: &str = "Common";
pub const INHERITED_SCRIPT: &str = "Inherited";

/// Default list of scripts to be analyzed within a string.
///
/// Characters of scripts that aren't present in the list are tagged as
/// [`UNKNOWN_SCRIPT`].
pub const DEFAULT_SCRIPTS: [Script; 9] = [
	Script::Arabic,
	Script::Common,
	Script::Devanagari,
	Script::Han,
	Script::Hangul,
	Script::Hiragana,
	Script::Inherited,
	Script::Katakana,
	Script::Latin,
];

/// Positions in the preference list that are never reordered
const STABLE_PREFERENCES: usize = 4;

/// Rules folding a `(previous, current)` pair of scripts into a single one.
///
/// Mainly used for japanese, which mixes "Han", "Hiragana" and "Katakana" in the same
/// piece of text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeMap {
	rules: HashMap<(&'static str, &'static str), &'static str>,
}

impl MergeMap {
	#[must_use]
	pub fn japanese() -> Self {
		let rules = [
			(("Han", "Hiragana"), "Hiragana"),
			(("Han", "Katakana"), "Katakana"),
			(("Hiragana", "Han"), "Hiragana"),
			(("Hiragana", "Katakana"), "Hiragana"),
			(("Katakana", "Han"), "Katakana"),
			(("Katakana", "Hiragana"), "Hiragana"),
		];

		Self {
			rules: rules.into_iter().collect(),
		}
	}

	#[must_use]
	pub fn get(&self, previous: &str, current: &str) -> Option<&'static str> {
		self.rules.get(&(previous, current)).copied()
	}
}

#[derive(Debug, Clone, Default)]
pub struct AnalysisOpts {
	pub use_merge_map: bool,
	pub merge_map: MergeMap,
}

impl AnalysisOpts {
	#[must_use]
	pub fn japanese() -> Self {
		Self {
			use_merge_map: true,
			merge_map: MergeMap::japanese(),
		}
	}

	fn merge_value(&self, previous: &str, current: &str) -> Option<&'static str> {
		if self.use_merge_map {
			self.merge_map.get(previous, current)
		} else {
			None
		}
	}
}

/// A run of text sharing the same script.
///
/// `low` and `high` are byte offsets into the analyzed text, both inclusive. `spaces`
/// holds the byte offsets of the whitespace found inside the range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRange {
	pub low: usize,
	pub high: usize,
	pub spaces: Vec<usize>,
	pub target_script: &'static str,
	pub rune_count: usize,
}

impl ScriptRange {
	const fn starting_at(low: usize, target_script: &'static str) -> Self {
		Self {
			low,
			high: low,
			spaces: Vec::new(),
			target_script,
			rune_count: 0,
		}
	}

	fn absorb(&mut self, other: Self) {
		self.high = other.high;
		self.spaces.extend(other.spaces);
		self.rune_count += other.rune_count;
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextAnalysis<'text> {
	pub script_ranges: Vec<ScriptRange>,
	pub rune_count: HashMap<&'static str, usize>,
	pub text: &'text str,
}

impl<'text> TextAnalysis<'text> {
	fn empty(text: &'text str) -> Self {
		Self {
			script_ranges: Vec::new(),
			rune_count: HashMap::new(),
			text,
		}
	}

	/// The slice of the analyzed text covered by `range`
	#[must_use]
	pub fn slice(&self, range: &ScriptRange) -> &'text str {
		self.text.get(range.low..=range.high).unwrap_or_default()
	}

	/// Folds `Common` and `Inherited` ranges into their neighbours and coalesces
	/// adjacent ranges that end up with the same script.
	///
	/// A common range is absorbed by the previous range; if the text starts with one,
	/// it takes the script of the range that follows. `merge_map` is applied once more
	/// since absorbing common ranges can leave e.g. "Han" next to "Katakana". Use an
	/// empty [`MergeMap`] to skip that.
	///
	/// Afterwards no two adjacent ranges share a script, and the counters for common
	/// scripts (and any zeroed counter) are dropped.
	pub fn merge_common(&mut self, merge_map: &MergeMap) {
		let mut ranges = mem::take(&mut self.script_ranges).into_iter();

		let Some(mut previous) = ranges.next() else {
			return;
		};

		let mut final_ranges = Vec::new();

		for range in ranges {
			if previous.target_script == range.target_script {
				previous.absorb(range);
			} else if is_common(range.target_script) {
				self.transfer(range.target_script, previous.target_script, range.rune_count);
				previous.absorb(range);
			} else if is_common(previous.target_script) {
				self.transfer(
					previous.target_script,
					range.target_script,
					previous.rune_count,
				);
				previous.target_script = range.target_script;
				previous.absorb(range);
			} else if let Some(merged) = merge_map.get(previous.target_script, range.target_script)
			{
				if range.target_script == merged {
					// the previous range has changed its target script
					self.transfer(previous.target_script, merged, previous.rune_count);
				} else {
					// the new range is absorbed
					self.transfer(range.target_script, previous.target_script, range.rune_count);
				}
				previous.target_script = merged;
				previous.absorb(range);
			} else {
				final_ranges.push(mem::replace(&mut previous, range));
			}
		}

		final_ranges.push(previous);
		self.script_ranges = final_ranges;

		self.rune_count.remove(COMMON_SCRIPT);
		self.rune_count.remove(INHERITED_SCRIPT);
		self.rune_count.retain(|_, count| *count != 0);
	}

	fn transfer(&mut self, from: &'static str, to: &'static str, count: usize) {
		if let Some(from_count) = self.rune_count.get_mut(from) {
			*from_count = from_count.saturating_sub(count);
		}
		*self.rune_count.entry(to).or_default() += count;
	}
}

fn is_common(script: &str) -> bool {
	script == COMMON_SCRIPT || script == INHERITED_SCRIPT
}

/// Analyzes strings against a list of known scripts.
#[derive(Debug, Clone)]
pub struct TextAnalyzer {
	scripts: Vec<Script>,
}

impl Default for TextAnalyzer {
	fn default() -> Self {
		Self::new(DEFAULT_SCRIPTS)
	}
}

impl TextAnalyzer {
	pub fn new(scripts: impl Into<Vec<Script>>) -> Self {
		Self {
			scripts: scripts.into(),
		}
	}

	/// Splits `text` into script ranges.
	///
	/// With a merge map enabled in `opts`, transitions listed there extend the current
	/// range (adjusting its script) instead of starting a new one.
	#[must_use]
	pub fn analyze<'text>(&self, text: &'text str, opts: &AnalysisOpts) -> TextAnalysis<'text> {
		let mut analysis = TextAnalysis::empty(text);
		let mut preferences = ScriptPreferences::new(&self.scripts);

		let mut chars = text.char_indices();
		let Some((_, first)) = chars.next() else {
			return analysis;
		};

		let mut last_range = ScriptRange::starting_at(0, preferences.script_for(first));
		if first.is_whitespace() {
			last_range.spaces.push(0);
		}

		let mut rune_count = 1;
		for (index, c) in chars {
			let script = preferences.script_for(c);
			let is_whitespace = c.is_whitespace();

			if script != last_range.target_script {
				if let Some(merged) = opts.merge_value(last_range.target_script, script) {
					last_range.target_script = merged;
					if is_whitespace {
						last_range.spaces.push(index);
					}
					rune_count += 1;
					continue;
				}

				last_range.high = index - 1;
				last_range.rune_count = rune_count;
				*analysis
					.rune_count
					.entry(last_range.target_script)
					.or_default() += rune_count;
				analysis.script_ranges.push(mem::replace(
					&mut last_range,
					ScriptRange::starting_at(index, script),
				));
				rune_count = 0;
			}

			rune_count += 1;
			if is_whitespace {
				last_range.spaces.push(index);
			}
		}

		last_range.high = text.len() - 1;
		last_range.rune_count = rune_count;
		*analysis
			.rune_count
			.entry(last_range.target_script)
			.or_default() += rune_count;
		analysis.script_ranges.push(last_range);

		analysis
	}
}

/// Preference ordered script list, owned by a single analysis.
///
/// Scripts matched past the first few slots are moved to the front, as more chars of
/// the same script are likely to follow.
struct ScriptPreferences {
	order: Vec<Script>,
}

impl ScriptPreferences {
	fn new(scripts: &[Script]) -> Self {
		Self {
			order: scripts.to_vec(),
		}
	}

	fn script_for(&mut self, c: char) -> &'static str {
		let script = c.script();

		match self.order.iter().position(|known| *known == script) {
			Some(index) => {
				if index >= STABLE_PREFERENCES {
					let promoted = self.order.remove(index);
					self.order.insert(0, promoted);
				}
				script.full_name()
			}
			None => UNKNOWN_SCRIPT,
		}
	}
}
