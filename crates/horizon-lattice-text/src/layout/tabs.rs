//! Tab stop alignment.

use super::WIDTH_EPSILON;
use crate::font::FontCache;
use crate::shaping::{Glyph, GlyphFlags, clusters, space_advance};

/// Set the advance of every tab so the following cluster starts at the next
/// tab stop at or after the tab's position.
///
/// `order` is the visual order of `glyphs`. Positions are measured from the
/// line start: the left edge, or the right edge when `rtl` is set. Only
/// the first glyph of a tab cluster carries its advance. A tab
/// already past the last stop advances by `minimal`, or by a space of its
/// font when `minimal` is `None`.
pub(crate) fn tab_align(
    glyphs: &mut [Glyph],
    order: &[usize],
    stops: &[f32],
    minimal: Option<f32>,
    cache: &FontCache,
    rtl: bool,
) {
    let mut head = vec![false; glyphs.len()];
    for range in clusters(glyphs) {
        head[range.start] = glyphs[range.start].flags.contains(GlyphFlags::TAB);
    }
    let walk: Vec<usize> = if rtl {
        order.iter().rev().copied().collect()
    } else {
        order.to_vec()
    };

    let mut x = 0.0f32;
    let mut tabs = 0usize;
    for i in walk {
        let glyph = &mut glyphs[i];
        if head[i] {
            let advance = stops
                .iter()
                .find(|&&stop| stop + WIDTH_EPSILON >= x)
                .map(|&stop| (stop - x).max(0.0))
                .unwrap_or_else(|| minimal.unwrap_or_else(|| space_advance(cache, glyph.font, glyph.font_size)));
            glyph.advance = advance;
            tabs += 1;
        }
        x += glyph.total_advance();
    }
    tracing::trace!(target: "horizon_lattice_text::layout", tabs, stops = stops.len(), "aligned tabs");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shaping::test_support::line;

    fn align(glyphs: &mut [Glyph], stops: &[f32], minimal: Option<f32>, rtl: bool) {
        let order: Vec<usize> = (0..glyphs.len()).collect();
        tab_align(glyphs, &order, stops, minimal, &FontCache::with_defaults(), rtl);
    }

    #[test]
    fn test_tab_reaches_next_stop() {
        let mut glyphs = line("a\tb", 10.0);
        align(&mut glyphs, &[32.0, 64.0], None, false);
        assert_eq!(glyphs[1].advance, 22.0);
    }

    #[test]
    fn test_second_tab_uses_following_stop() {
        let mut glyphs = line("a\tbcdef\tg", 10.0);
        align(&mut glyphs, &[32.0, 100.0], None, false);
        assert_eq!(glyphs[1].advance, 22.0);
        // 'bcdef' ends at 82, so the next tab runs to 100.
        assert_eq!(glyphs[7].advance, 18.0);
    }

    #[test]
    fn test_past_last_stop_uses_minimal_advance() {
        let mut glyphs = line("abcdefg\tb", 10.0);
        align(&mut glyphs, &[32.0], Some(8.0), false);
        assert_eq!(glyphs[7].advance, 8.0);

        let mut glyphs = line("abcdefg\tb", 10.0);
        align(&mut glyphs, &[32.0], None, false);
        // No font: a quarter of the 16px size.
        assert_eq!(glyphs[7].advance, 4.0);
    }

    #[test]
    fn test_rtl_measures_from_right() {
        // Logical "ab\tc" laid out right to left.
        let mut glyphs = line("ab\tc", 10.0);
        let order = vec![3, 2, 1, 0];
        tab_align(&mut glyphs, &order, &[32.0], None, &FontCache::with_defaults(), true);
        assert_eq!(glyphs[2].advance, 12.0);
    }
}
