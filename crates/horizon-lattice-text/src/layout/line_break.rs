//! Greedy line breaking.

use std::ops::Range;

use bitflags::bitflags;

use super::{ClusterInfo, WIDTH_EPSILON, cluster_infos};
use crate::shaping::{Glyph, GlyphFlags};

bitflags! {
    /// Line breaking policy.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct LineBreakFlags: u16 {
        /// Break at hard breaks (line feeds, paragraph separators).
        const MANDATORY = 1 << 0;
        /// Break at word boundaries.
        const WORD_BOUND = 1 << 1;
        /// Break at any unconnected grapheme boundary.
        const GRAPHEME_BOUND = 1 << 2;
        /// Break at graphemes only when a line has no word boundary.
        const ADAPTIVE = 1 << 3;
        /// Drop whitespace at the start of each line.
        const TRIM_START_EDGE_SPACES = 1 << 4;
        /// Drop whitespace at the end of each line.
        const TRIM_END_EDGE_SPACES = 1 << 5;
        /// Drop whitespace at both edges.
        const TRIM_EDGE_SPACES = Self::TRIM_START_EDGE_SPACES.bits() | Self::TRIM_END_EDGE_SPACES.bits();
    }
}

impl Default for LineBreakFlags {
    fn default() -> Self {
        Self::MANDATORY | Self::WORD_BOUND
    }
}

/// Break shaped text into lines no wider than `width`.
///
/// Returns character ranges in logical order. Whitespace hangs past the
/// line end and never causes a break. A cluster wider than the line that
/// cannot be broken overflows. Without trimming the ranges partition the
/// text.
pub fn line_breaks(glyphs: &[Glyph], width: f32, flags: LineBreakFlags) -> Vec<Range<usize>> {
    line_breaks_adv(glyphs, &[width], false, flags)
}

/// Break shaped text into lines of varying width.
///
/// Line `n` uses `widths[n]`. When the widths run out, the last one repeats;
/// with `once` set the remaining text becomes a single final line instead.
pub fn line_breaks_adv(glyphs: &[Glyph], widths: &[f32], once: bool, flags: LineBreakFlags) -> Vec<Range<usize>> {
    let infos = cluster_infos(glyphs, true);
    if infos.is_empty() {
        return Vec::new();
    }
    let limit_for = |line: usize| {
        widths
            .get(line)
            .or(widths.last())
            .copied()
            .unwrap_or(f32::INFINITY)
    };
    let grapheme_ok = flags.intersects(LineBreakFlags::GRAPHEME_BOUND | LineBreakFlags::ADAPTIVE);

    let mut lines: Vec<Range<usize>> = Vec::new();
    let mut line_start = 0;
    let mut width = 0.0f32;
    let mut word_break: Option<(usize, f32)> = None;
    let mut grapheme_break: Option<(usize, f32)> = None;

    let mut k = 0;
    while k < infos.len() {
        if once && lines.len() >= widths.len() {
            break;
        }
        let cluster = &infos[k];

        if flags.contains(LineBreakFlags::MANDATORY) && cluster.has(GlyphFlags::BREAK_HARD) {
            lines.push(line_start..k + 1);
            line_start = k + 1;
            width = 0.0;
            word_break = None;
            grapheme_break = None;
            k += 1;
            continue;
        }

        let limit = limit_for(lines.len());
        if !cluster.is_space() && k > line_start && width + cluster.advance > limit + WIDTH_EPSILON {
            let here = (!cluster.has(GlyphFlags::CONNECTED)).then_some((k, width));
            let candidate = word_break
                .filter(|_| flags.contains(LineBreakFlags::WORD_BOUND))
                .or_else(|| if grapheme_ok { here.or(grapheme_break) } else { None });
            if let Some((at, at_width)) = candidate {
                lines.push(line_start..at);
                line_start = at;
                width -= at_width;
                word_break = None;
                grapheme_break = None;
                continue;
            }
        }

        if k > line_start && !cluster.has(GlyphFlags::CONNECTED) {
            grapheme_break = Some((k, width));
        }
        width += cluster.advance;
        if cluster.has(GlyphFlags::BREAK_SOFT) {
            word_break = Some((k + 1, width));
        }
        k += 1;
    }
    if line_start < infos.len() {
        lines.push(line_start..infos.len());
    }

    tracing::trace!(
        target: "horizon_lattice_text::layout",
        clusters = infos.len(),
        lines = lines.len(),
        "broke lines"
    );
    lines
        .into_iter()
        .map(|line| to_char_range(&infos, line, flags))
        .collect()
}

/// Convert a cluster index range to a character range, trimming edges.
fn to_char_range(infos: &[ClusterInfo], line: Range<usize>, flags: LineBreakFlags) -> Range<usize> {
    let origin = infos[line.start].start;
    let (mut a, mut b) = (line.start, line.end);
    let trimmable = |c: &ClusterInfo| c.is_space() && !c.has(GlyphFlags::TAB);
    if flags.contains(LineBreakFlags::TRIM_START_EDGE_SPACES) {
        while a < b && trimmable(&infos[a]) && !infos[a].has(GlyphFlags::BREAK_HARD) {
            a += 1;
        }
    }
    if flags.contains(LineBreakFlags::TRIM_END_EDGE_SPACES) {
        while b > a && trimmable(&infos[b - 1]) {
            b -= 1;
        }
    }
    if a == b {
        let pos = if a < infos.len() { infos[a].start } else { origin };
        return pos.max(origin)..pos.max(origin);
    }
    infos[a].start..infos[b - 1].end
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shaping::test_support::line;

    #[test]
    fn test_width_fitting_two_words() {
        let glyphs = line("one two three", 10.0);
        let flags = LineBreakFlags::default() | LineBreakFlags::TRIM_EDGE_SPACES;
        assert_eq!(line_breaks(&glyphs, 70.0, flags), vec![0..7, 8..13]);
        assert_eq!(line_breaks(&glyphs, 70.0, LineBreakFlags::default()), vec![0..8, 8..13]);
    }

    #[test]
    fn test_wide_budget_gives_one_line() {
        let glyphs = line("Hello", 10.0);
        assert_eq!(line_breaks(&glyphs, 1000.0, LineBreakFlags::default()), vec![0..5]);
    }

    #[test]
    fn test_hard_breaks() {
        let glyphs = line("ab\ncd", 10.0);
        assert_eq!(line_breaks(&glyphs, 1000.0, LineBreakFlags::default()), vec![0..3, 3..5]);
        assert_eq!(line_breaks(&glyphs, 1000.0, LineBreakFlags::WORD_BOUND), vec![0..5]);
    }

    #[test]
    fn test_unbreakable_word_overflows() {
        let glyphs = line("abcdefgh", 10.0);
        assert_eq!(line_breaks(&glyphs, 35.0, LineBreakFlags::default()), vec![0..8]);
    }

    #[test]
    fn test_adaptive_breaks_long_word_at_graphemes() {
        let glyphs = line("abcdefgh", 10.0);
        let flags = LineBreakFlags::default() | LineBreakFlags::ADAPTIVE;
        assert_eq!(line_breaks(&glyphs, 35.0, flags), vec![0..3, 3..6, 6..8]);
    }

    #[test]
    fn test_narrow_width_never_loops() {
        let glyphs = line("ab cd", 10.0);
        let flags = LineBreakFlags::default() | LineBreakFlags::GRAPHEME_BOUND;
        let lines = line_breaks(&glyphs, 1.0, flags);
        assert_eq!(lines, vec![0..1, 1..3, 3..4, 4..5]);
    }

    #[test]
    fn test_connected_clusters_are_not_split() {
        let mut glyphs = line("abcd", 10.0);
        glyphs[2].flags |= GlyphFlags::CONNECTED;
        glyphs[3].flags |= GlyphFlags::CONNECTED;
        let flags = LineBreakFlags::GRAPHEME_BOUND;
        assert_eq!(line_breaks(&glyphs, 25.0, flags), vec![0..1, 1..4]);
    }

    #[test]
    fn test_spaces_hang() {
        let glyphs = line("ab    ", 10.0);
        assert_eq!(line_breaks(&glyphs, 20.0, LineBreakFlags::default()), vec![0..6]);
    }

    #[test]
    fn test_multiple_widths_repeat_last() {
        let glyphs = line("aa bb cc dd", 10.0);
        let lines = line_breaks_adv(&glyphs, &[30.0, 60.0], false, LineBreakFlags::default());
        assert_eq!(lines, vec![0..3, 3..9, 9..11]);
    }

    #[test]
    fn test_once_puts_rest_on_final_line() {
        let glyphs = line("aa bb cc dd", 10.0);
        let lines = line_breaks_adv(&glyphs, &[30.0], true, LineBreakFlags::default());
        assert_eq!(lines, vec![0..3, 3..11]);
    }

    #[test]
    fn test_ranges_partition_text() {
        let text = "the quick brown fox\njumps over the lazy dog";
        let glyphs = line(text, 7.0);
        let lines = line_breaks(&glyphs, 50.0, LineBreakFlags::default() | LineBreakFlags::ADAPTIVE);
        let mut pos = 0;
        for l in &lines {
            assert_eq!(l.start, pos);
            pos = l.end;
        }
        assert_eq!(pos, text.chars().count());
    }

    #[test]
    fn test_blank_line_trims_to_empty() {
        let glyphs = line("a\n\nb", 10.0);
        let flags = LineBreakFlags::default() | LineBreakFlags::TRIM_EDGE_SPACES;
        assert_eq!(line_breaks(&glyphs, 100.0, flags), vec![0..1, 2..2, 3..4]);
    }
}
