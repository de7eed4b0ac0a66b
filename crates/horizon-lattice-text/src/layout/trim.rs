//! Overrun trimming. The result is a display projection; the shaped glyphs
//! are never modified.

use bitflags::bitflags;

use super::{WIDTH_EPSILON, cluster_infos};
use crate::font::FontCache;
use crate::shaping::{Glyph, GlyphFlags, total_width};
use crate::types::{SizeKey, Vec2};

bitflags! {
    /// Overrun policy.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct OverrunFlags: u16 {
        /// Trim text that does not fit.
        const TRIM = 1 << 0;
        /// Trim at word boundaries only.
        const TRIM_WORD_ONLY = 1 << 1;
        /// Draw an ellipsis where text was trimmed.
        const ADD_ELLIPSIS = 1 << 2;
        /// Draw the ellipsis even when the text fits, and even when the
        /// ellipsis alone is wider than the budget.
        const ENFORCE_ELLIPSIS = 1 << 3;
        /// Measure the justified advances, elongations included.
        const JUSTIFICATION_AWARE = 1 << 4;
    }
}

/// Result of overrun trimming.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrimState {
    /// Character position where displayed text stops, `None` when nothing
    /// is trimmed.
    pub trim_pos: Option<usize>,
    /// Logical glyph index the ellipsis is drawn at (the number of kept
    /// glyphs), `None` without an ellipsis.
    pub ellipsis_pos: Option<usize>,
    /// Glyphs of the ellipsis.
    pub ellipsis_glyphs: Vec<Glyph>,
}

impl TrimState {
    /// Whether display stops before the end of the text or adds an
    /// ellipsis.
    pub fn is_trimmed(&self) -> bool {
        self.trim_pos.is_some() || self.ellipsis_pos.is_some()
    }

    /// Width of the ellipsis.
    pub fn ellipsis_width(&self) -> f32 {
        total_width(&self.ellipsis_glyphs)
    }
}

/// Compute the overrun projection of a line for `width`.
///
/// Keeps the longest prefix of clusters that fits together with the
/// ellipsis, then drops trailing whitespace from it.
pub(crate) fn overrun_trim(
    glyphs: &[Glyph],
    cache: &FontCache,
    ellipsis_char: char,
    width: f32,
    flags: OverrunFlags,
) -> TrimState {
    if !flags.contains(OverrunFlags::TRIM) || glyphs.is_empty() {
        return TrimState::default();
    }
    let aware = flags.contains(OverrunFlags::JUSTIFICATION_AWARE);
    let enforce = flags.contains(OverrunFlags::ENFORCE_ELLIPSIS);
    let infos = cluster_infos(glyphs, aware);
    let total: f32 = infos.iter().map(|c| c.advance).sum();

    let mut ellipsis = if flags.contains(OverrunFlags::ADD_ELLIPSIS) {
        ellipsis_glyphs(glyphs, cache, ellipsis_char)
    } else {
        Vec::new()
    };
    let fits = total <= width + WIDTH_EPSILON;
    if fits && !(enforce && !ellipsis.is_empty()) {
        return TrimState::default();
    }
    if total_width(&ellipsis) > width + WIDTH_EPSILON && !enforce {
        ellipsis.clear();
    }
    let budget = width - total_width(&ellipsis);

    let word_only = flags.contains(OverrunFlags::TRIM_WORD_ONLY);
    let mut kept = 0;
    let mut acc = 0.0;
    for (i, cluster) in infos.iter().enumerate() {
        acc += cluster.advance;
        if acc > budget + WIDTH_EPSILON {
            break;
        }
        let boundary = i + 1 == infos.len() || cluster.is_space() || cluster.has(GlyphFlags::BREAK_SOFT);
        if !word_only || boundary {
            kept = i + 1;
        }
    }
    while kept > 0 && infos[kept - 1].is_space() {
        kept -= 1;
    }

    let (trim_pos, glyph_pos) = match infos.get(kept) {
        Some(c) => (c.start, c.first),
        None => (infos.last().map_or(0, |c| c.end), glyphs.len()),
    };
    let level = kept
        .checked_sub(1)
        .map_or(glyphs[0].level, |k| glyphs[infos[k].first].level);
    for g in &mut ellipsis {
        g.start = trim_pos;
        g.end = trim_pos;
        g.level = level;
    }

    tracing::trace!(
        target: "horizon_lattice_text::layout",
        width,
        trim_pos,
        kept,
        ellipsis = !ellipsis.is_empty(),
        "trimmed overrun"
    );
    TrimState {
        trim_pos: (kept < infos.len()).then_some(trim_pos),
        ellipsis_pos: (!ellipsis.is_empty()).then_some(glyph_pos),
        ellipsis_glyphs: ellipsis,
    }
}

/// Ellipsis glyphs in the font of the last glyph that has one.
///
/// Uses `ellipsis_char` when the font maps it and three full stops
/// otherwise. Empty when neither is available.
fn ellipsis_glyphs(glyphs: &[Glyph], cache: &FontCache, ellipsis_char: char) -> Vec<Glyph> {
    let Some((source, font)) = glyphs.iter().rev().find_map(|g| g.font.map(|f| (g, f))) else {
        return Vec::new();
    };
    let size = SizeKey::new(source.font_size);
    let (index, repeat) = match cache.glyph_index(font, size, ellipsis_char, None) {
        0 => (cache.glyph_index(font, size, '.', None), 3),
        index => (index, 1),
    };
    if index == 0 {
        tracing::debug!(target: "horizon_lattice_text::layout", ?font, "font has no ellipsis glyph");
        return Vec::new();
    }
    let Ok(advance) = cache.glyph_advance(font, size, index) else {
        return Vec::new();
    };
    if let Err(err) = cache.render_glyph(font, size, index) {
        tracing::warn!(target: "horizon_lattice_text::layout", %err, "ellipsis glyph could not be rendered");
    }
    let glyph = Glyph {
        start: 0,
        end: 0,
        count: repeat,
        repeat: 1,
        flags: GlyphFlags::VIRTUAL | GlyphFlags::VALID | (source.flags & GlyphFlags::RTL),
        offset: Vec2::ZERO,
        advance: advance.x,
        font: Some(font),
        font_size: source.font_size,
        index,
        span: source.span,
        level: source.level,
    };
    vec![glyph; usize::from(repeat)]
}
