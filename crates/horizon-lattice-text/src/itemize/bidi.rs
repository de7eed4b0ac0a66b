//! Bidi level resolution.
//!
//! Levels come from `unicode-bidi` (UAX #9). This module adds base
//! direction detection and caller overrides on top of it.

use unicode_bidi::{BidiClass, BidiInfo, Level, bidi_class};

use super::BidiOverride;
use crate::types::Direction;

/// Detect the base direction of text from its first strong character.
///
/// Implements rules P2 and P3 of UAX #9: characters between an isolate
/// initiator and its matching PDI are skipped. Returns `None` when the text
/// has no strong character outside isolates.
///
/// # Example
///
/// ```
/// use horizon_lattice_text::Direction;
/// use horizon_lattice_text::itemize::detect_base_direction;
///
/// assert_eq!(detect_base_direction("Hello"), Some(Direction::Ltr));
/// assert_eq!(detect_base_direction("שלום"), Some(Direction::Rtl));
/// assert_eq!(detect_base_direction("123!"), None);
/// // The isolated Hebrew word does not count.
/// assert_eq!(detect_base_direction("\u{2067}שלום\u{2069} ok"), Some(Direction::Ltr));
/// ```
pub fn detect_base_direction(text: &str) -> Option<Direction> {
    let mut isolate_depth = 0usize;
    for c in text.chars() {
        match bidi_class(c) {
            BidiClass::LRI | BidiClass::RLI | BidiClass::FSI => isolate_depth += 1,
            BidiClass::PDI => isolate_depth = isolate_depth.saturating_sub(1),
            BidiClass::L if isolate_depth == 0 => return Some(Direction::Ltr),
            BidiClass::R | BidiClass::AL if isolate_depth == 0 => return Some(Direction::Rtl),
            _ => {}
        }
    }
    None
}

/// Check if a character is a strong right-to-left character.
pub fn is_rtl_char(c: char) -> bool {
    matches!(bidi_class(c), BidiClass::R | BidiClass::AL)
}

/// Resolve a paragraph direction to a concrete one.
pub(crate) fn resolve_direction(direction: Direction, text: &str) -> Direction {
    match direction {
        Direction::Ltr | Direction::Rtl => direction,
        Direction::Auto | Direction::Inherited => detect_base_direction(text).unwrap_or(Direction::Ltr),
    }
}

/// Embedding levels per character with the paragraph level forced.
pub(crate) fn resolve_levels(text: &str, paragraph_level: u8) -> Vec<u8> {
    if text.is_empty() {
        return Vec::new();
    }
    let level = Level::new(paragraph_level).unwrap_or_else(|_| Level::ltr());
    let info = BidiInfo::new(text, Some(level));
    text.char_indices()
        .map(|(byte, _)| info.levels[byte].number())
        .collect()
}

/// Paragraph level an override range is resolved at.
///
/// Overrides behave like isolates: the range gets the lowest level above
/// the paragraph's that has the requested direction, so it neither leaks
/// into nor absorbs its surroundings.
fn override_level(paragraph: Direction, requested: Direction) -> u8 {
    match (paragraph.is_rtl(), requested.is_rtl()) {
        (false, false) => 0,
        (false, true) => 1,
        (true, false) => 2,
        (true, true) => 1,
    }
}

/// Replace levels inside override ranges.
///
/// `byte_offsets` maps character index to byte offset and has one extra
/// entry for the end of the text. Overrides must already be validated.
pub(crate) fn apply_overrides(
    text: &str,
    byte_offsets: &[usize],
    paragraph: Direction,
    overrides: &[BidiOverride],
    levels: &mut [u8],
) {
    for ov in overrides {
        let slice = &text[byte_offsets[ov.start]..byte_offsets[ov.end]];
        let requested = match ov.direction {
            Direction::Ltr | Direction::Rtl => ov.direction,
            Direction::Auto => detect_base_direction(slice).unwrap_or(paragraph),
            Direction::Inherited => paragraph,
        };
        let sub = resolve_levels(slice, override_level(paragraph, requested));
        levels[ov.start..ov.end].copy_from_slice(&sub);
        tracing::trace!(
            target: "horizon_lattice_text::itemize",
            start = ov.start,
            end = ov.end,
            ?requested,
            "applied bidi override"
        );
    }
}
