//! Shaped glyph records.

use std::ops::Range;

use bitflags::bitflags;

use crate::handle::FontId;
use crate::types::Vec2;

bitflags! {
    /// Per-glyph metadata attached by the shaper.
    ///
    /// Flags describe the whole cluster: every glyph of a cluster carries
    /// the same classification flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct GlyphFlags: u32 {
        /// The glyph was found in a font. Missing (tofu) glyphs lack it.
        const VALID = 1 << 0;
        /// The glyph belongs to a right-to-left run.
        const RTL = 1 << 1;
        /// Inserted by layout, not produced from source text.
        const VIRTUAL = 1 << 2;
        /// Whitespace.
        const SPACE = 1 << 3;
        /// A mandatory line break follows this cluster.
        const BREAK_HARD = 1 << 4;
        /// A line break is allowed after this cluster.
        const BREAK_SOFT = 1 << 5;
        /// Horizontal tab.
        const TAB = 1 << 6;
        /// Elongation (kashida) inserted for justification.
        const ELONGATION = 1 << 7;
        /// Punctuation.
        const PUNCTUATION = 1 << 8;
        /// Underscore.
        const UNDERSCORE = 1 << 9;
        /// Cursively joined to the previous cluster. Breaking before it is
        /// not safe.
        const CONNECTED = 1 << 10;
        /// An elongation glyph may be inserted before this cluster.
        const SAFE_TO_INSERT_TATWEEL = 1 << 11;
        /// Placeholder for an inline object.
        const EMBEDDED_OBJECT = 1 << 12;
        /// Soft hyphen.
        const SOFT_HYPHEN = 1 << 13;
    }
}

/// One positioned glyph.
///
/// `start..end` is the cluster's character range in the buffer. Glyphs of
/// one cluster are adjacent and share the range.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    /// First character of the cluster.
    pub start: usize,
    /// One past the last character of the cluster.
    pub end: usize,
    /// Number of glyphs in the cluster.
    pub count: u16,
    /// How many times the glyph is drawn (elongation glyphs repeat).
    pub repeat: u8,
    /// Classification flags.
    pub flags: GlyphFlags,
    /// Offset from the pen position, y down.
    pub offset: Vec2,
    /// Advance of a single repetition along the line.
    pub advance: f32,
    /// Font the glyph came from; `None` for inline objects and for missing
    /// glyphs of spans without fonts.
    pub font: Option<FontId>,
    /// Pixel size of the glyph.
    pub font_size: u32,
    /// Glyph index within the font. `0` for missing glyphs and inline
    /// objects.
    pub index: u32,
    /// Index of the source span.
    pub span: usize,
    /// Bidi embedding level.
    pub level: u8,
}

impl Glyph {
    /// Whether the glyph was found in a font.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.flags.contains(GlyphFlags::VALID)
    }

    /// Whether the glyph is a tofu placeholder.
    #[inline]
    pub fn is_missing(&self) -> bool {
        !self.is_valid()
    }

    /// Whether the glyph belongs to a right-to-left run.
    #[inline]
    pub fn is_rtl(&self) -> bool {
        self.flags.contains(GlyphFlags::RTL)
    }

    /// Whether layout inserted the glyph.
    #[inline]
    pub fn is_virtual(&self) -> bool {
        self.flags.contains(GlyphFlags::VIRTUAL)
    }

    /// Whether the glyph is whitespace.
    #[inline]
    pub fn is_space(&self) -> bool {
        self.flags.contains(GlyphFlags::SPACE)
    }

    /// Total advance, counting repetitions.
    #[inline]
    pub fn total_advance(&self) -> f32 {
        self.advance * f32::from(self.repeat)
    }

    /// The cluster's character range.
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Index ranges of consecutive glyphs forming one cluster.
pub fn clusters(glyphs: &[Glyph]) -> impl Iterator<Item = Range<usize>> + '_ {
    let mut i = 0;
    std::iter::from_fn(move || {
        let first = glyphs.get(i)?;
        let start = i;
        while glyphs
            .get(i)
            .is_some_and(|g| g.start == first.start && g.end == first.end)
        {
            i += 1;
        }
        Some(start..i)
    })
}

/// Sum of total advances.
pub fn total_width<'a>(glyphs: impl IntoIterator<Item = &'a Glyph>) -> f32 {
    glyphs.into_iter().map(Glyph::total_advance).sum()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// A valid one-glyph cluster covering `start..start + 1`.
    pub fn glyph(start: usize, advance: f32, flags: GlyphFlags) -> Glyph {
        Glyph {
            start,
            end: start + 1,
            count: 1,
            repeat: 1,
            flags: flags | GlyphFlags::VALID,
            offset: Vec2::ZERO,
            advance,
            font: None,
            font_size: 16,
            index: 1,
            span: 0,
            level: 0,
        }
    }

    /// Glyphs for `text` with `advance` each. Spaces get `SPACE` and a soft
    /// break; `\n` gets a hard break.
    pub fn line(text: &str, advance: f32) -> Vec<Glyph> {
        text.chars()
            .enumerate()
            .map(|(i, c)| match c {
                ' ' => glyph(i, advance, GlyphFlags::SPACE | GlyphFlags::BREAK_SOFT),
                '\n' => glyph(i, 0.0, GlyphFlags::SPACE | GlyphFlags::BREAK_HARD),
                '\t' => glyph(i, advance, GlyphFlags::SPACE | GlyphFlags::TAB),
                _ => glyph(i, advance, GlyphFlags::empty()),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::glyph;
    use super::*;

    #[test]
    fn test_clusters_group_shared_ranges() {
        let glyphs = vec![
            glyph(0, 5.0, GlyphFlags::empty()),
            glyph(1, 5.0, GlyphFlags::empty()),
            glyph(1, 0.0, GlyphFlags::empty()),
            glyph(2, 5.0, GlyphFlags::empty()),
        ];
        let groups: Vec<_> = clusters(&glyphs).collect();
        assert_eq!(groups, vec![0..1, 1..3, 3..4]);
    }

    #[test]
    fn test_total_advance_counts_repeats() {
        let mut g = glyph(0, 3.0, GlyphFlags::ELONGATION);
        g.repeat = 4;
        assert_eq!(g.total_advance(), 12.0);
        assert_eq!(total_width([&g, &g]), 24.0);
    }

    #[test]
    fn test_missing_glyph() {
        let mut g = glyph(0, 3.0, GlyphFlags::empty());
        assert!(g.is_valid());
        g.flags.remove(GlyphFlags::VALID);
        assert!(g.is_missing());
    }
}
