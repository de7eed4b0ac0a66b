//! Run shaping with font fallback.
//!
//! Each itemizer run is intersected with the buffer's spans. Every piece is
//! shaped with the first font of its span's fallback chain that covers it;
//! graphemes a font cannot cover are handed to the next font, and graphemes
//! nobody covers become missing (tofu) glyphs. The result is a logical
//! glyph sequence plus a visual permutation of it.

pub mod classify;
mod glyph;

use unicode_segmentation::UnicodeSegmentation;

pub use self::glyph::{Glyph, GlyphFlags, clusters, total_width};
#[cfg(test)]
pub(crate) use self::glyph::test_support;
use crate::buffer::span::{InlineObject, Span};
use crate::font::{FontCache, RunDirection, ShapeParams, ShapingFont};
use crate::handle::FontId;
use crate::itemize::{Itemization, Run, script_tag};
use crate::types::{ObjectKey, Orientation, SizeKey, Spacing, Vec2};

/// Buffer-level settings that affect shaping.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ShapeOptions<'a> {
    pub orientation: Orientation,
    pub preserve_invalid: bool,
    pub preserve_control: bool,
    pub custom_punctuation: Option<&'a [char]>,
    pub spacing: Spacing,
}

/// Everything needed to shape one buffer.
pub(crate) struct ShapeRequest<'a> {
    pub cache: &'a FontCache,
    pub text: &'a str,
    pub chars: &'a [char],
    pub spans: &'a [Span],
    pub objects: &'a [InlineObject],
    pub itemization: &'a Itemization,
    pub options: ShapeOptions<'a>,
}

impl ShapeRequest<'_> {
    fn vertical(&self) -> bool {
        self.options.orientation == Orientation::Vertical
    }
}

/// The intersection of one run and one span.
struct Segment<'a> {
    span_index: usize,
    span: &'a Span,
    run: &'a Run,
}

impl Segment<'_> {
    fn size(&self) -> SizeKey {
        SizeKey::new(self.span.style.size)
    }
}

/// Shape a buffer. Glyphs are returned in logical order.
pub(crate) fn shape(req: &ShapeRequest<'_>) -> Vec<Glyph> {
    let mut out = Vec::with_capacity(req.chars.len());
    for run in &req.itemization.runs {
        for (span_index, span) in req.spans.iter().enumerate() {
            let start = run.start.max(span.start);
            let end = run.end.min(span.end);
            if start >= end {
                continue;
            }
            let segment = Segment {
                span_index,
                span,
                run,
            };
            match span.object {
                Some(key) => push_object(req, &segment, key, start, end, &mut out),
                None => shape_with_fallback(req, &segment, start, end, 0, &mut out),
            }
        }
    }
    classify_clusters(req, &mut out);
    tracing::trace!(
        target: "horizon_lattice_text::shaping",
        chars = req.chars.len(),
        glyphs = out.len(),
        runs = req.itemization.runs.len(),
        "shaped buffer"
    );
    out
}

fn push_object(
    req: &ShapeRequest<'_>,
    segment: &Segment<'_>,
    key: ObjectKey,
    start: usize,
    end: usize,
    out: &mut Vec<Glyph>,
) {
    let advance = req
        .objects
        .iter()
        .find(|o| o.key == key)
        .filter(|o| o.start == start)
        .map_or(0.0, |o| o.advance(req.vertical()));
    out.push(Glyph {
        start,
        end,
        count: 1,
        repeat: 1,
        flags: GlyphFlags::EMBEDDED_OBJECT | GlyphFlags::VALID,
        offset: Vec2::ZERO,
        advance,
        font: None,
        font_size: segment.span.style.size,
        index: 0,
        span: segment.span_index,
        level: segment.run.level,
    });
}

/// Whether a font may be used for a segment at all.
fn font_usable(cache: &FontCache, font: FontId, segment: &Segment<'_>) -> bool {
    if let Some(language) = &segment.span.style.language {
        if !cache.is_language_supported(font, language).unwrap_or(false) {
            return false;
        }
    }
    cache
        .is_script_supported(font, segment.run.script.short_name())
        .unwrap_or(false)
}

fn shape_with_fallback(
    req: &ShapeRequest<'_>,
    segment: &Segment<'_>,
    start: usize,
    end: usize,
    font_index: usize,
    out: &mut Vec<Glyph>,
) {
    let Some(&font) = segment.span.style.fonts.get(font_index) else {
        push_missing(req, segment, start, end, out);
        return;
    };
    let shaping_font = if font_usable(req.cache, font, segment) {
        req.cache.shaping_font(font, segment.size()).ok()
    } else {
        None
    };
    let Some(shaping_font) = shaping_font else {
        tracing::trace!(target: "horizon_lattice_text::shaping", ?font, "font unusable, trying next");
        shape_with_fallback(req, segment, start, end, font_index + 1, out);
        return;
    };

    let covers = |c: char| shaping_font.face.glyph_index(c, None) != 0;
    for (piece_start, piece_end, covered) in coverage(req.chars, start, end, covers) {
        if covered {
            shape_piece(req, segment, piece_start, piece_end, font, &shaping_font, out);
        } else {
            tracing::debug!(
                target: "horizon_lattice_text::shaping",
                ?font,
                start = piece_start,
                end = piece_end,
                "falling back for uncovered text"
            );
            shape_with_fallback(req, segment, piece_start, piece_end, font_index + 1, out);
        }
    }
}

/// Split `start..end` into grapheme-aligned pieces that are fully covered
/// or not covered by a font.
fn coverage(
    chars: &[char],
    start: usize,
    end: usize,
    covers: impl Fn(char) -> bool,
) -> Vec<(usize, usize, bool)> {
    let text: String = chars[start..end].iter().collect();
    let mut pieces: Vec<(usize, usize, bool)> = Vec::new();
    let mut pos = start;
    for grapheme in text.graphemes(true) {
        let len = grapheme.chars().count();
        let covered = grapheme
            .chars()
            .all(|c| classify::is_coverage_ignorable(c) || covers(c));
        match pieces.last_mut() {
            Some(last) if last.2 == covered => last.1 = pos + len,
            _ => pieces.push((pos, pos + len, covered)),
        }
        pos += len;
    }
    pieces
}

fn shape_piece(
    req: &ShapeRequest<'_>,
    segment: &Segment<'_>,
    start: usize,
    end: usize,
    font: FontId,
    shaping_font: &ShapingFont,
    out: &mut Vec<Glyph>,
) {
    let text: String = req.chars[start..end].iter().collect();
    let mut char_at_byte = vec![0usize; text.len() + 1];
    for (ci, (byte, _)) in text.char_indices().enumerate() {
        char_at_byte[byte] = ci;
    }
    char_at_byte[text.len()] = end - start;

    let style = &segment.span.style;
    let direction = if req.vertical() {
        RunDirection::TopToBottom
    } else if segment.run.is_rtl() {
        RunDirection::RightToLeft
    } else {
        RunDirection::LeftToRight
    };
    let params = ShapeParams {
        direction,
        script: Some(script_tag(segment.run.script)),
        language: style.language.as_deref(),
        features: &style.features,
        variations: &shaping_font.variations,
    };
    let raw = shaping_font.face.shape(&text, &params);
    if raw.is_empty() {
        push_missing(req, segment, start, end, out);
        return;
    }

    let ppu = shaping_font.px_per_unit(style.size);
    let first = out.len();
    let mut i = 0;
    while i < raw.len() {
        let cluster = raw[i].cluster;
        let mut j = i;
        while j < raw.len() && raw[j].cluster == cluster {
            j += 1;
        }
        let cluster_start = if i == 0 {
            start
        } else {
            start + char_at_byte.get(cluster).copied().unwrap_or(0)
        };
        let cluster_end = raw
            .get(j)
            .map_or(end, |next| start + char_at_byte.get(next.cluster).copied().unwrap_or(end - start));
        let count = u16::try_from(j - i).unwrap_or(u16::MAX);
        for r in &raw[i..j] {
            let flags = if r.glyph != 0 {
                GlyphFlags::VALID
            } else {
                GlyphFlags::empty()
            };
            out.push(Glyph {
                start: cluster_start,
                end: cluster_end.max(cluster_start),
                count,
                repeat: 1,
                flags,
                offset: Vec2::new(r.x_offset * ppu, -r.y_offset * ppu),
                advance: r.advance * ppu,
                font: Some(font),
                font_size: style.size,
                index: r.glyph,
                span: segment.span_index,
                level: segment.run.level,
            });
        }
        i = j;
    }

    apply_kerning_overrides(&mut out[first..], shaping_font, segment.run.is_rtl());

    let size = segment.size();
    for glyph in &out[first..] {
        if glyph.index != 0 {
            if let Err(err) = req.cache.render_glyph(font, size, glyph.index) {
                tracing::warn!(
                    target: "horizon_lattice_text::shaping",
                    ?font,
                    glyph = glyph.index,
                    %err,
                    "glyph could not be rendered"
                );
            }
        }
    }
}

/// Apply caller kerning overrides to the left glyph of each visual pair.
///
/// An override replaces the face's own kerning for the pair, which the
/// shaped advance already includes.
fn apply_kerning_overrides(glyphs: &mut [Glyph], font: &ShapingFont, rtl: bool) {
    if font.kerning.is_empty() {
        return;
    }
    for i in 1..glyphs.len() {
        let (left, right) = if rtl { (i, i - 1) } else { (i - 1, i) };
        let pair = (glyphs[left].index, glyphs[right].index);
        if let Some(k) = font.kerning.get(&pair) {
            let face = font.face.kerning(pair.0, pair.1) * font.px_per_unit(glyphs[left].font_size);
            glyphs[left].advance += k.x - face;
        }
    }
}

fn push_missing(req: &ShapeRequest<'_>, segment: &Segment<'_>, start: usize, end: usize, out: &mut Vec<Glyph>) {
    let style = &segment.span.style;
    let first_font = style.fonts.first().copied();
    let size = segment.size();
    let notdef = first_font
        .and_then(|f| req.cache.glyph_advance(f, size, 0).ok())
        .map_or(0.0, |v| v.x);

    tracing::warn!(
        target: "horizon_lattice_text::shaping",
        start,
        end,
        "no font in the fallback chain covers the text"
    );
    let text: String = req.chars[start..end].iter().collect();
    let mut pos = start;
    for grapheme in text.graphemes(true) {
        let len = grapheme.chars().count();
        let c = grapheme.chars().next().unwrap_or(' ');
        let advance = if req.options.preserve_invalid {
            classify::hex_box_advance(c, style.size as f32)
        } else {
            notdef
        };
        out.push(Glyph {
            start: pos,
            end: pos + len,
            count: 1,
            repeat: 1,
            flags: GlyphFlags::empty(),
            offset: Vec2::ZERO,
            advance,
            font: first_font,
            font_size: style.size,
            index: 0,
            span: segment.span_index,
            level: segment.run.level,
        });
        pos += len;
    }
}

/// Advance of a space in `font`, falling back to a quarter em.
pub(crate) fn space_advance(cache: &FontCache, font: Option<FontId>, pixel_size: u32) -> f32 {
    let size = SizeKey::new(pixel_size);
    font.and_then(|f| {
        let glyph = cache.glyph_index(f, size, ' ', None);
        cache.glyph_advance(f, size, glyph).ok()
    })
    .map_or(pixel_size as f32 * 0.25, |v| v.x)
}

/// Flags for a cluster starting with `c`, and the advance that replaces the
/// shaped one for tabs and controls.
fn classify_char(req: &ShapeRequest<'_>, c: char, font: Option<FontId>, font_size: u32) -> (GlyphFlags, Option<f32>) {
    if c == '\t' {
        let advance = space_advance(req.cache, font, font_size);
        (GlyphFlags::TAB | GlyphFlags::SPACE | GlyphFlags::VALID, Some(advance))
    } else if classify::is_hard_break(c) {
        (GlyphFlags::BREAK_HARD | GlyphFlags::SPACE | GlyphFlags::VALID, Some(0.0))
    } else if classify::is_other_control(c) {
        let advance = if req.options.preserve_control {
            classify::hex_box_advance(c, font_size as f32)
        } else {
            0.0
        };
        (GlyphFlags::VALID, Some(advance))
    } else if classify::is_space(c) {
        (GlyphFlags::SPACE, None)
    } else if c == '_' {
        (GlyphFlags::UNDERSCORE | GlyphFlags::PUNCTUATION, None)
    } else if c == '\u{00AD}' {
        (GlyphFlags::SOFT_HYPHEN, None)
    } else if classify::is_punctuation_in(c, req.options.custom_punctuation) {
        (GlyphFlags::PUNCTUATION, None)
    } else {
        (GlyphFlags::empty(), None)
    }
}

/// Attach classification flags and spacing to every cluster.
fn classify_clusters(req: &ShapeRequest<'_>, glyphs: &mut [Glyph]) {
    let len = req.chars.len();
    let mut soft = vec![false; len + 1];
    let mut hard = vec![false; len + 1];
    for (pos, mandatory) in classify::break_opportunities(req.text) {
        if mandatory {
            hard[pos] = true;
        } else {
            soft[pos] = true;
        }
    }

    let ranges: Vec<_> = clusters(glyphs).collect();
    let mut prev_joining = classify::Joining::None;
    for range in ranges {
        let (start, end, level, font, font_size) = {
            let g = &glyphs[range.start];
            (g.start, g.end, g.level, g.font, g.font_size)
        };
        let cluster_chars = &req.chars[start..end];
        let c = cluster_chars.first().copied().unwrap_or(' ');
        let embedded = glyphs[range.start].flags.contains(GlyphFlags::EMBEDDED_OBJECT);

        let (mut flags, replace_advance) = if embedded {
            (GlyphFlags::empty(), None)
        } else {
            classify_char(req, c, font, font_size)
        };

        if level % 2 == 1 {
            flags |= GlyphFlags::RTL;
        }
        if soft[end] {
            flags |= GlyphFlags::BREAK_SOFT;
        }
        if hard[end] {
            flags |= GlyphFlags::BREAK_HARD;
        }
        // CR LF is a single mandatory break, taken after the LF.
        if cluster_chars.last() == Some(&'\r') && req.chars.get(end) == Some(&'\n') {
            flags.remove(GlyphFlags::BREAK_HARD);
        }

        let joining = if embedded {
            classify::Joining::None
        } else {
            classify::cluster_joining(cluster_chars)
        };
        if classify::joins(prev_joining, joining) {
            flags |= GlyphFlags::CONNECTED | GlyphFlags::SAFE_TO_INSERT_TATWEEL;
        }
        prev_joining = joining;

        let is_break = flags.contains(GlyphFlags::BREAK_HARD);
        let is_plain_space = flags.contains(GlyphFlags::SPACE) && !flags.contains(GlyphFlags::TAB) && !is_break;
        for (k, glyph) in glyphs[range.clone()].iter_mut().enumerate() {
            glyph.flags |= flags;
            if let Some(advance) = replace_advance {
                glyph.advance = if k == 0 { advance } else { 0.0 };
                glyph.offset = Vec2::ZERO;
            }
        }
        if let Some(last) = glyphs[range].last_mut() {
            if !is_break && !embedded {
                last.advance += req.options.spacing.glyph;
            }
            if is_plain_space {
                last.advance += req.options.spacing.space;
            }
        }
    }
}

/// Visual order of a glyph sequence as a permutation of its indices.
///
/// Applies UAX #9 rules L1 (trailing whitespace, whitespace before hard
/// breaks and tabs go to the paragraph level) and L2 (reverse every maximal
/// sequence at or above each odd level, from the highest level down).
pub(crate) fn visual_order(glyphs: &[Glyph], base_level: u8) -> Vec<usize> {
    let mut levels: Vec<u8> = glyphs.iter().map(|g| g.level).collect();
    let mut trailing = true;
    for i in (0..glyphs.len()).rev() {
        let g = &glyphs[i];
        if g.flags.intersects(GlyphFlags::BREAK_HARD | GlyphFlags::TAB) && g.is_space() {
            levels[i] = base_level;
            trailing = true;
        } else if trailing && g.is_space() {
            levels[i] = base_level;
        } else {
            trailing = false;
        }
    }

    let mut order: Vec<usize> = (0..glyphs.len()).collect();
    let Some(&max) = levels.iter().max() else {
        return order;
    };
    let Some(min_odd) = levels.iter().copied().filter(|l| l % 2 == 1).min() else {
        return order;
    };
    for level in (min_odd..=max).rev() {
        let mut i = 0;
        while i < order.len() {
            if levels[order[i]] >= level {
                let mut j = i;
                while j < order.len() && levels[order[j]] >= level {
                    j += 1;
                }
                order[i..j].reverse();
                i = j;
            } else {
                i += 1;
            }
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::test_support::{glyph, line};
    use super::*;

    fn with_levels(text: &str, levels: &[u8]) -> Vec<Glyph> {
        let mut glyphs = line(text, 10.0);
        for (g, &l) in glyphs.iter_mut().zip(levels) {
            g.level = l;
        }
        glyphs
    }

    #[test]
    fn test_visual_order_ltr_is_identity() {
        let glyphs = line("abc", 10.0);
        assert_eq!(visual_order(&glyphs, 0), vec![0, 1, 2]);
    }

    #[test]
    fn test_visual_order_reverses_rtl_run_only() {
        let glyphs = with_levels("ab xyz", &[0, 0, 0, 1, 1, 1]);
        assert_eq!(visual_order(&glyphs, 0), vec![0, 1, 2, 5, 4, 3]);
    }

    #[test]
    fn test_visual_order_nested_levels() {
        // RTL paragraph with an embedded LTR number.
        let glyphs = with_levels("ab12cd", &[1, 1, 2, 2, 1, 1]);
        assert_eq!(visual_order(&glyphs, 1), vec![5, 4, 2, 3, 1, 0]);
    }

    #[test]
    fn test_trailing_space_goes_to_paragraph_level() {
        let glyphs = with_levels("ab ", &[1, 1, 1]);
        // The trailing space stays at the logical end, which is the visual
        // right edge in an LTR paragraph.
        assert_eq!(visual_order(&glyphs, 0), vec![1, 0, 2]);
    }

    #[test]
    fn test_coverage_pieces() {
        let chars: Vec<char> = "ab\u{0301}c".chars().collect();
        let pieces = coverage(&chars, 0, chars.len(), |c| c != 'b');
        // 'b' and its combining accent form one uncovered grapheme.
        assert_eq!(pieces, vec![(0, 1, true), (1, 3, false), (3, 4, true)]);
    }

    #[test]
    fn test_coverage_ignores_joiners() {
        let chars: Vec<char> = "a\u{200D}b".chars().collect();
        let pieces = coverage(&chars, 0, chars.len(), |c| c != '\u{200D}');
        assert_eq!(pieces, vec![(0, 3, true)]);
    }

    #[test]
    fn test_kerning_override_replaces_face_kerning() {
        use std::collections::HashMap;
        use std::sync::Arc;

        #[derive(Debug)]
        struct NoFace;
        impl crate::font::FontFace for NoFace {
            fn metrics(&self, _: &[crate::types::Variation]) -> crate::font::FaceMetrics {
                crate::font::FaceMetrics {
                    units_per_em: 1000,
                    ascent: 800.0,
                    descent: 200.0,
                    line_gap: 0.0,
                    underline_position: -100.0,
                    underline_thickness: 50.0,
                }
            }
            fn glyph_index(&self, _: char, _: Option<char>) -> u32 {
                0
            }
            fn char_for_glyph(&self, _: u32) -> Option<char> {
                None
            }
            fn supported_chars(&self) -> Vec<char> {
                Vec::new()
            }
            fn glyph_advance(&self, _: u32, _: &[crate::types::Variation]) -> f32 {
                0.0
            }
            fn kerning(&self, left: u32, right: u32) -> f32 {
                if (left, right) == (1, 2) { -100.0 } else { 0.0 }
            }
            fn shape(&self, _: &str, _: &ShapeParams<'_>) -> Vec<crate::font::RawGlyph> {
                Vec::new()
            }
            fn supported_features(&self) -> Vec<[u8; 4]> {
                Vec::new()
            }
            fn supported_variations(&self) -> Vec<crate::types::VariationAxis> {
                Vec::new()
            }
        }

        let mut kerning = HashMap::new();
        kerning.insert((1, 2), Vec2::new(-5.0, 0.0));
        let font = ShapingFont {
            face: Arc::new(NoFace),
            variations: Vec::new(),
            units_per_em: 1000.0,
            metrics: Default::default(),
            kerning,
        };
        // Shaped advances already carry the face's -2px for the pair.
        let mut glyphs = vec![glyph(0, 10.0, GlyphFlags::empty()), glyph(1, 12.0, GlyphFlags::empty())];
        for g in &mut glyphs {
            g.font_size = 20;
        }
        glyphs[0].index = 1;
        glyphs[1].index = 2;
        apply_kerning_overrides(&mut glyphs, &font, false);
        assert_eq!(glyphs[0].advance, 7.0);
        assert_eq!(glyphs[1].advance, 12.0);

        // Right to left, the left glyph of the visual pair is the later one.
        let mut rtl = vec![glyph(0, 12.0, GlyphFlags::empty()), glyph(1, 10.0, GlyphFlags::empty())];
        for g in &mut rtl {
            g.font_size = 20;
        }
        rtl[0].index = 2;
        rtl[1].index = 1;
        apply_kerning_overrides(&mut rtl, &font, true);
        assert_eq!(rtl[1].advance, 7.0);
        assert_eq!(rtl[0].advance, 12.0);
    }
}
