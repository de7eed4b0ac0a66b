//! Script and direction itemization.
//!
//! Splits text into maximal runs of one bidi level and one script. Runs are
//! in logical order and cover the text without gaps; positions are
//! character indices.

mod bidi;
mod script;

use std::ops::Range;

pub use unicode_script::Script;

pub use self::bidi::{detect_base_direction, is_rtl_char};
pub(crate) use self::bidi::resolve_direction;
pub use self::script::script_tag;
use crate::error::{TextError, TextResult};
use crate::types::Direction;

/// A caller-supplied direction for a range of text.
///
/// The range is resolved as a direction-stable isolate: text inside keeps
/// the requested direction no matter what surrounds it. Useful for URLs,
/// file paths and e-mail addresses embedded in right-to-left text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BidiOverride {
    /// Start character index.
    pub start: usize,
    /// End character index (exclusive).
    pub end: usize,
    /// Direction of the range. `Auto` uses the range's own first strong
    /// character; `Inherited` uses the paragraph direction.
    pub direction: Direction,
}

impl BidiOverride {
    /// Create a new override.
    pub fn new(range: Range<usize>, direction: Direction) -> Self {
        Self {
            start: range.start,
            end: range.end,
            direction,
        }
    }
}

/// A maximal run of uniform level and script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    /// Start character index.
    pub start: usize,
    /// End character index (exclusive).
    pub end: usize,
    /// Resolved embedding level.
    pub level: u8,
    /// Resolved script.
    pub script: Script,
}

impl Run {
    /// Direction implied by the run's level.
    pub fn direction(&self) -> Direction {
        Direction::from_level(self.level)
    }

    /// Whether the run is right-to-left.
    pub fn is_rtl(&self) -> bool {
        self.level % 2 == 1
    }

    /// The run's character range.
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Result of itemizing a paragraph.
#[derive(Debug, Clone, PartialEq)]
pub struct Itemization {
    /// Resolved paragraph direction (`Ltr` or `Rtl`).
    pub direction: Direction,
    /// Paragraph embedding level.
    pub base_level: u8,
    /// Embedding level per character.
    pub levels: Vec<u8>,
    /// Runs in logical order.
    pub runs: Vec<Run>,
}

/// Check overrides against the text length and each other.
///
/// Returns them sorted by start. Empty ranges are dropped.
pub(crate) fn validate_overrides(overrides: &[BidiOverride], len: usize) -> TextResult<Vec<BidiOverride>> {
    let mut sorted: Vec<BidiOverride> = overrides.iter().filter(|o| o.start != o.end).cloned().collect();
    sorted.sort_by_key(|o| o.start);
    let mut prev_end = 0;
    for ov in &sorted {
        if ov.start > ov.end || ov.end > len || ov.start < prev_end {
            return Err(TextError::OverlappingRanges {
                start: ov.start,
                end: ov.end,
            });
        }
        prev_end = ov.end;
    }
    Ok(sorted)
}

/// Itemize a paragraph.
///
/// `direction` is the paragraph direction; `Auto` and `Inherited` resolve
/// from the first strong character, defaulting to left-to-right. Fails with
/// [`TextError::OverlappingRanges`] when overrides overlap or fall outside
/// the text.
///
/// # Example
///
/// ```
/// use horizon_lattice_text::Direction;
/// use horizon_lattice_text::itemize::{Script, itemize};
///
/// let items = itemize("abc אבג", Direction::Auto, &[]).unwrap();
/// assert_eq!(items.direction, Direction::Ltr);
/// assert_eq!(items.runs.len(), 2);
/// assert_eq!(items.runs[1].range(), 4..7);
/// assert_eq!(items.runs[1].script, Script::Hebrew);
/// assert!(items.runs[1].is_rtl());
/// ```
pub fn itemize(text: &str, direction: Direction, overrides: &[BidiOverride]) -> TextResult<Itemization> {
    let overrides = validate_overrides(overrides, text.chars().count())?;
    Ok(itemize_validated(text, direction, &overrides))
}

/// Itemize with overrides already checked by [`validate_overrides`].
pub(crate) fn itemize_validated(text: &str, direction: Direction, overrides: &[BidiOverride]) -> Itemization {
    let chars: Vec<char> = text.chars().collect();
    let direction = resolve_direction(direction, text);
    let base_level = u8::from(direction.is_rtl());
    let mut levels = bidi::resolve_levels(text, base_level);

    if !overrides.is_empty() {
        let mut byte_offsets: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
        byte_offsets.push(text.len());
        bidi::apply_overrides(text, &byte_offsets, direction, overrides, &mut levels);
    }

    let scripts = script::resolve_scripts(&chars);
    let runs = split_runs(&levels, &scripts);
    tracing::trace!(
        target: "horizon_lattice_text::itemize",
        chars = chars.len(),
        runs = runs.len(),
        ?direction,
        "itemized paragraph"
    );
    Itemization {
        direction,
        base_level,
        levels,
        runs,
    }
}

fn split_runs(levels: &[u8], scripts: &[Script]) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    for (i, (&level, &script)) in levels.iter().zip(scripts).enumerate() {
        match runs.last_mut() {
            Some(run) if run.level == level && run.script == script => run.end = i + 1,
            _ => runs.push(Run {
                start: i,
                end: i + 1,
                level,
                script,
            }),
        }
    }
    runs
}
