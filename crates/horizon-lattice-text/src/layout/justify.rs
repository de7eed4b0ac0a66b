//! Justification: stretching or shrinking a line to a target width.

use std::ops::Range;

use bitflags::bitflags;

use super::{WIDTH_EPSILON, cluster_infos};
use crate::font::FontCache;
use crate::handle::FontId;
use crate::shaping::classify::TATWEEL;
use crate::shaping::{Glyph, GlyphFlags, total_width};
use crate::types::{SizeKey, Vec2};

bitflags! {
    /// Justification policy.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct JustificationFlags: u16 {
        /// Insert elongation glyphs between connected clusters.
        const KASHIDA = 1 << 0;
        /// Stretch or shrink word separators.
        const WORD_BOUND = 1 << 1;
        /// Ignore whitespace at the line edges and give it zero advance.
        const TRIM_EDGE_SPACES = 1 << 2;
        /// Only adjust content after the last tab.
        const AFTER_LAST_TAB = 1 << 3;
        /// Justify only the text kept by overrun trimming, leaving room for
        /// the ellipsis.
        const CONSTRAIN_ELLIPSIS = 1 << 4;
        /// Do not justify the last line of a paragraph.
        const SKIP_LAST_LINE = 1 << 5;
        /// Do not justify the last line of a paragraph when it ends with
        /// visible characters.
        const SKIP_LAST_LINE_WITH_VISIBLE_CHARS = 1 << 6;
        /// Always justify text that fits on a single line.
        const DO_NOT_SKIP_SINGLE_LINE = 1 << 7;
    }
}

impl Default for JustificationFlags {
    fn default() -> Self {
        Self::KASHIDA | Self::WORD_BOUND
    }
}

/// Overrun state justification must respect under `CONSTRAIN_ELLIPSIS`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct EllipsisConstraint {
    /// Character position where displayed text stops.
    pub trim_pos: usize,
    /// Width of the ellipsis drawn after it.
    pub ellipsis_width: f32,
}

/// A planned elongation insertion.
struct KashidaSlot {
    /// Glyph index the elongation is inserted before.
    at: usize,
    font: FontId,
    index: u32,
    advance: f32,
    repeat: u8,
}

/// Adjust `glyphs` so the line measures `width`, returning the new width.
///
/// Elongations are placed first when `KASHIDA` is set and the line must
/// grow; word separators take whatever remains. Shrinking only touches
/// separators and stops at the minimum width (separators at zero): if
/// `width` is below it the line is left unchanged. A line with no
/// insertion points is left unchanged too.
pub(crate) fn fit_to_width(
    glyphs: &mut Vec<Glyph>,
    cache: &FontCache,
    width: f32,
    flags: JustificationFlags,
    constraint: Option<EllipsisConstraint>,
) -> f32 {
    let before = total_width(glyphs.iter());
    let constraint = constraint.filter(|_| flags.contains(JustificationFlags::CONSTRAIN_ELLIPSIS));
    let limit = constraint.map_or(glyphs.len(), |c| {
        glyphs
            .iter()
            .position(|g| g.start >= c.trim_pos)
            .unwrap_or(glyphs.len())
    });
    let target = width - constraint.map_or(0.0, |c| c.ellipsis_width);

    let (lo, hi) = if flags.contains(JustificationFlags::TRIM_EDGE_SPACES) {
        edge_bounds(&glyphs[..limit])
    } else {
        (0, limit)
    };
    let edge_width = total_width(glyphs[..lo].iter().chain(&glyphs[hi..limit]));
    let mut delta = target - total_width(&glyphs[lo..hi]);
    if delta.abs() <= WIDTH_EPSILON && edge_width == 0.0 {
        return before;
    }

    let first = if flags.contains(JustificationFlags::AFTER_LAST_TAB) {
        glyphs[lo..hi]
            .iter()
            .rposition(|g| g.flags.contains(GlyphFlags::TAB))
            .map_or(lo, |i| lo + i + 1)
    } else {
        lo
    };

    let spaces = if flags.contains(JustificationFlags::WORD_BOUND) {
        space_slots(glyphs, first..hi)
    } else {
        Vec::new()
    };
    let mut kashidas = if flags.contains(JustificationFlags::KASHIDA) && delta > WIDTH_EPSILON {
        kashida_slots(glyphs, cache, first..hi)
    } else {
        Vec::new()
    };
    if spaces.is_empty() && kashidas.is_empty() {
        tracing::debug!(
            target: "horizon_lattice_text::layout",
            width,
            "no justification opportunities, line left unchanged"
        );
        return before;
    }
    let space_total: f32 = spaces.iter().map(|&i| glyphs[i].advance).sum();
    if delta < -(space_total + WIDTH_EPSILON) {
        tracing::debug!(
            target: "horizon_lattice_text::layout",
            width,
            minimum = before - edge_width - space_total,
            "target below minimum width, line left unchanged"
        );
        return before;
    }

    for i in (0..lo).chain(hi..limit) {
        glyphs[i].advance = 0.0;
    }

    if !kashidas.is_empty() {
        let share = delta / kashidas.len() as f32;
        for slot in &mut kashidas {
            if spaces.is_empty() {
                // Nothing else absorbs the remainder: each slot covers its
                // whole share with narrowed elongations.
                slot.repeat = (share / slot.advance).ceil().clamp(1.0, f32::from(u8::MAX)) as u8;
                slot.advance = share / f32::from(slot.repeat);
            } else {
                slot.repeat = (share / slot.advance).floor().clamp(0.0, f32::from(u8::MAX)) as u8;
            }
            delta -= slot.advance * f32::from(slot.repeat);
        }
    }

    if !spaces.is_empty() {
        if delta > 0.0 {
            let share = delta / spaces.len() as f32;
            for &i in &spaces {
                glyphs[i].advance += share;
            }
        } else if space_total > 0.0 {
            let scale = ((space_total + delta) / space_total).max(0.0);
            for &i in &spaces {
                glyphs[i].advance *= scale;
            }
        }
    }

    for slot in kashidas.iter().rev().filter(|s| s.repeat > 0) {
        let host = &glyphs[slot.at];
        let elongation = Glyph {
            start: host.start,
            end: host.end,
            count: 1,
            repeat: slot.repeat,
            flags: (host.flags & GlyphFlags::RTL)
                | GlyphFlags::VIRTUAL
                | GlyphFlags::ELONGATION
                | GlyphFlags::VALID,
            offset: Vec2::ZERO,
            advance: slot.advance,
            font: Some(slot.font),
            font_size: host.font_size,
            index: slot.index,
            span: host.span,
            level: host.level,
        };
        if let Err(err) = cache.render_glyph(slot.font, SizeKey::new(host.font_size), slot.index) {
            tracing::warn!(target: "horizon_lattice_text::layout", %err, "elongation glyph could not be rendered");
        }
        glyphs.insert(slot.at, elongation);
    }

    let after = total_width(glyphs.iter());
    tracing::trace!(
        target: "horizon_lattice_text::layout",
        before,
        after,
        spaces = spaces.len(),
        kashidas = kashidas.len(),
        "justified line"
    );
    after
}

/// Glyph bounds of a line without its leading and trailing whitespace.
fn edge_bounds(glyphs: &[Glyph]) -> (usize, usize) {
    let trimmable = |g: &Glyph| g.is_space() && !g.flags.contains(GlyphFlags::TAB);
    let lo = glyphs.iter().position(|g| !trimmable(g)).unwrap_or(glyphs.len());
    let hi = glyphs.iter().rposition(|g| !trimmable(g)).map_or(lo, |i| i + 1);
    (lo, hi.max(lo))
}

/// Last glyph of every adjustable separator cluster within `range`.
fn space_slots(glyphs: &[Glyph], range: Range<usize>) -> Vec<usize> {
    cluster_infos(glyphs, false)
        .into_iter()
        .filter(|c| c.first >= range.start && c.last <= range.end)
        .filter(|c| c.is_space() && !c.has(GlyphFlags::TAB) && !c.has(GlyphFlags::BREAK_HARD))
        .map(|c| c.last - 1)
        .collect()
}

/// Clusters within `range` that may take an elongation before them, with
/// the elongation glyph of their font.
fn kashida_slots(glyphs: &[Glyph], cache: &FontCache, range: Range<usize>) -> Vec<KashidaSlot> {
    cluster_infos(glyphs, false)
        .into_iter()
        .filter(|c| c.first >= range.start && c.last <= range.end)
        .filter(|c| c.has(GlyphFlags::SAFE_TO_INSERT_TATWEEL))
        .filter_map(|c| {
            let host = &glyphs[c.first];
            let font = host.font?;
            let size = SizeKey::new(host.font_size);
            let index = cache.glyph_index(font, size, TATWEEL, None);
            if index == 0 {
                return None;
            }
            let advance = cache.glyph_advance(font, size, index).ok()?.x;
            (advance > 0.0).then_some(KashidaSlot {
                at: c.first,
                font,
                index,
                advance,
                repeat: 0,
            })
        })
        .collect()
}

/// Decide which lines of a paragraph layout to justify.
///
/// The last line of a paragraph is the final line or any line followed by a
/// hard break. Precedence, strongest first: `DO_NOT_SKIP_SINGLE_LINE` (for
/// text that is a single line), `SKIP_LAST_LINE_WITH_VISIBLE_CHARS` (skip
/// only when the line ends with a visible character), then `SKIP_LAST_LINE`.
pub fn justified_lines(lines: &[Range<usize>], glyphs: &[Glyph], flags: JustificationFlags) -> Vec<bool> {
    if lines.len() == 1 && flags.contains(JustificationFlags::DO_NOT_SKIP_SINGLE_LINE) {
        return vec![true];
    }
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let next = lines.get(i + 1).map_or(usize::MAX, |l| l.start);
            let paragraph_end = i + 1 == lines.len()
                || glyphs
                    .iter()
                    .any(|g| g.start >= line.start && g.start < next && g.flags.contains(GlyphFlags::BREAK_HARD));
            if !paragraph_end {
                return true;
            }
            if flags.contains(JustificationFlags::SKIP_LAST_LINE_WITH_VISIBLE_CHARS) {
                let ends_visible = glyphs
                    .iter()
                    .rev()
                    .find(|g| !g.is_virtual() && g.start >= line.start && g.end <= line.end)
                    .is_some_and(|g| !g.is_space());
                !ends_visible
            } else {
                !flags.contains(JustificationFlags::SKIP_LAST_LINE)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shaping::test_support::line;

    fn fit(glyphs: &mut Vec<Glyph>, width: f32, flags: JustificationFlags) -> f32 {
        fit_to_width(glyphs, &FontCache::with_defaults(), width, flags, None)
    }

    #[test]
    fn test_expand_spaces() {
        let mut glyphs = line("ab cd", 10.0);
        let width = fit(&mut glyphs, 70.0, JustificationFlags::WORD_BOUND);
        assert!((width - 70.0).abs() < WIDTH_EPSILON);
        assert_eq!(glyphs[2].advance, 30.0);
    }

    #[test]
    fn test_shrink_spaces_proportionally() {
        let mut glyphs = line("ab cd ef", 10.0);
        let width = fit(&mut glyphs, 75.0, JustificationFlags::WORD_BOUND);
        assert!((width - 75.0).abs() < WIDTH_EPSILON);
        assert_eq!(glyphs[2].advance, 7.5);
        assert_eq!(glyphs[5].advance, 7.5);
    }

    #[test]
    fn test_below_minimum_width_is_unchanged() {
        let mut glyphs = line("ab cd ef", 10.0);
        let width = fit(&mut glyphs, 50.0, JustificationFlags::WORD_BOUND);
        assert_eq!(width, 80.0);
        assert_eq!(glyphs, line("ab cd ef", 10.0));
    }

    #[test]
    fn test_no_insertion_points_is_noop() {
        let mut glyphs = line("abcd", 10.0);
        assert_eq!(fit(&mut glyphs, 100.0, JustificationFlags::default()), 40.0);
        assert_eq!(glyphs.len(), 4);
    }

    #[test]
    fn test_kashida_without_joined_text_falls_back_to_spaces() {
        let mut glyphs = line("ab cd", 10.0);
        let width = fit(&mut glyphs, 60.0, JustificationFlags::default());
        assert!((width - 60.0).abs() < WIDTH_EPSILON);
        assert!(glyphs.iter().all(|g| !g.is_virtual()));
    }

    #[test]
    fn test_trim_edge_spaces() {
        let mut glyphs = line(" ab cd ", 10.0);
        let flags = JustificationFlags::WORD_BOUND | JustificationFlags::TRIM_EDGE_SPACES;
        let width = fit(&mut glyphs, 60.0, flags);
        assert!((width - 60.0).abs() < WIDTH_EPSILON);
        assert_eq!(glyphs[0].advance, 0.0);
        assert_eq!(glyphs[6].advance, 0.0);
        assert_eq!(glyphs[3].advance, 20.0);
    }

    #[test]
    fn test_after_last_tab() {
        let mut glyphs = line("a b\tc d", 10.0);
        let flags = JustificationFlags::WORD_BOUND | JustificationFlags::AFTER_LAST_TAB;
        fit(&mut glyphs, 80.0, flags);
        assert_eq!(glyphs[1].advance, 10.0);
        assert_eq!(glyphs[5].advance, 20.0);
    }

    #[test]
    fn test_constrain_ellipsis() {
        let mut glyphs = line("a b c d", 10.0);
        let flags = JustificationFlags::WORD_BOUND | JustificationFlags::CONSTRAIN_ELLIPSIS;
        let constraint = EllipsisConstraint {
            trim_pos: 5,
            ellipsis_width: 10.0,
        };
        fit_to_width(&mut glyphs, &FontCache::with_defaults(), 80.0, flags, Some(constraint));
        assert_eq!(glyphs[1].advance, 20.0);
        assert_eq!(glyphs[3].advance, 20.0);
        assert_eq!(glyphs[5].advance, 10.0);
    }

    #[test]
    fn test_skip_last_line() {
        let glyphs = line("aa bb cc", 10.0);
        let lines = [0..3, 3..6, 6..8];
        assert_eq!(
            justified_lines(&lines, &glyphs, JustificationFlags::SKIP_LAST_LINE),
            vec![true, true, false]
        );
        assert_eq!(
            justified_lines(&lines, &glyphs, JustificationFlags::WORD_BOUND),
            vec![true, true, true]
        );
    }

    #[test]
    fn test_hard_break_ends_paragraph() {
        let glyphs = line("aa\nbb cc", 10.0);
        let lines = [0..3, 3..6, 6..8];
        assert_eq!(
            justified_lines(&lines, &glyphs, JustificationFlags::SKIP_LAST_LINE),
            vec![false, true, false]
        );
    }

    #[test]
    fn test_skip_with_visible_chars_takes_precedence() {
        let glyphs = line("aa bb ", 10.0);
        let flags = JustificationFlags::SKIP_LAST_LINE | JustificationFlags::SKIP_LAST_LINE_WITH_VISIBLE_CHARS;
        // The last line ends with whitespace, so it is justified.
        assert_eq!(justified_lines(&[0..3, 3..6], &glyphs, flags), vec![true, true]);
        assert_eq!(justified_lines(&[0..3, 3..5], &glyphs, flags), vec![true, false]);
    }

    #[test]
    fn test_single_line_override() {
        let glyphs = line("aa bb", 10.0);
        let flags = JustificationFlags::SKIP_LAST_LINE | JustificationFlags::DO_NOT_SKIP_SINGLE_LINE;
        assert_eq!(justified_lines(&[0..5], &glyphs, flags), vec![true]);
        assert_eq!(
            justified_lines(&[0..5], &glyphs, JustificationFlags::SKIP_LAST_LINE),
            vec![false]
        );
    }
}
