//! Source text and shaped results of a buffer.
//!
//! Both halves live behind `Arc`s so substring views share them with their
//! parent. Mutation goes through `Arc::make_mut`, so a parent that keeps
//! changing after handing out a substring copies its data once instead of
//! changing the view underneath.

use std::collections::BTreeSet;
use std::ops::Range;

use super::span::{InlineObject, Span};
use crate::font::FontCache;
use crate::handle::FontId;
use crate::itemize::Run;
use crate::shaping::{Glyph, GlyphFlags, total_width, visual_order};
use crate::types::{Direction, InlineVerticalAlign, ObjectKey, Orientation, Rect, SizeKey, Spacing};

/// Text, spans and objects appended to a buffer.
#[derive(Debug, Clone, Default)]
pub(crate) struct TextData {
    pub text: String,
    pub chars: Vec<char>,
    pub spans: Vec<Span>,
    pub objects: Vec<InlineObject>,
}

impl TextData {
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn push_str(&mut self, text: &str) {
        self.text.push_str(text);
        self.chars.extend(text.chars());
    }

    pub fn object(&self, key: ObjectKey) -> Option<&InlineObject> {
        self.objects.iter().find(|o| o.key == key)
    }
}

/// Line extents in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct LineMetrics {
    pub ascent: f32,
    pub descent: f32,
    pub width: f32,
    pub underline_position: f32,
    pub underline_thickness: f32,
}

impl LineMetrics {
    pub fn height(&self) -> f32 {
        self.ascent + self.descent
    }
}

/// The shaped state of a buffer or substring view.
#[derive(Debug, Clone)]
pub(crate) struct ShapedContent {
    /// Glyphs in logical order.
    pub glyphs: Vec<Glyph>,
    /// Visual order as indices into `glyphs`.
    pub visual: Vec<usize>,
    pub runs: Vec<Run>,
    /// Resolved paragraph direction.
    pub direction: Direction,
    pub base_level: u8,
    pub metrics: LineMetrics,
}

impl ShapedContent {
    /// Recompute visual order and metrics after glyphs changed.
    pub fn refresh(&mut self, data: &TextData, cache: &FontCache, orientation: Orientation, spacing: Spacing) {
        self.visual = visual_order(&self.glyphs, self.base_level);
        self.metrics = measure(&self.glyphs, data, cache, orientation, spacing);
    }

    /// Pen position of a glyph along the line, in visual order.
    pub fn pen_position(&self, glyph: usize) -> Option<f32> {
        let mut pos = 0.0;
        for &i in &self.visual {
            if i == glyph {
                return Some(pos);
            }
            pos += self.glyphs[i].total_advance();
        }
        None
    }

    /// Restrict to the clusters that start inside `range`.
    ///
    /// Levels are kept, so the view reorders like a line of its parent.
    pub fn view(
        &self,
        range: Range<usize>,
        data: &TextData,
        cache: &FontCache,
        orientation: Orientation,
        spacing: Spacing,
    ) -> Self {
        let glyphs: Vec<Glyph> = self
            .glyphs
            .iter()
            .filter(|g| g.start >= range.start && g.start < range.end)
            .cloned()
            .collect();
        let runs = self
            .runs
            .iter()
            .filter_map(|run| {
                let start = run.start.max(range.start);
                let end = run.end.min(range.end);
                (start < end).then(|| Run {
                    start,
                    end,
                    ..run.clone()
                })
            })
            .collect();
        let mut view = Self {
            glyphs,
            visual: Vec::new(),
            runs,
            direction: self.direction,
            base_level: self.base_level,
            metrics: LineMetrics::default(),
        };
        view.refresh(data, cache, orientation, spacing);
        view
    }
}

/// Measure a line: font extents of every glyph, grown to fit inline
/// objects, plus extra spacing.
pub(crate) fn measure(
    glyphs: &[Glyph],
    data: &TextData,
    cache: &FontCache,
    orientation: Orientation,
    spacing: Spacing,
) -> LineMetrics {
    let mut m = LineMetrics {
        width: total_width(glyphs),
        ..LineMetrics::default()
    };

    let sizes: BTreeSet<(FontId, u32)> = glyphs
        .iter()
        .filter_map(|g| g.font.map(|f| (f, g.font_size)))
        .collect();
    for (font, size) in sizes {
        match cache.size_metrics(font, SizeKey::new(size)) {
            Ok(sm) => {
                m.ascent = m.ascent.max(sm.ascent);
                m.descent = m.descent.max(sm.descent);
                m.underline_position = m.underline_position.max(sm.underline_position);
                m.underline_thickness = m.underline_thickness.max(sm.underline_thickness);
            }
            Err(err) => {
                tracing::debug!(target: "horizon_lattice_text::buffer", ?font, %err, "no metrics for font");
            }
        }
    }

    let vertical = orientation == Orientation::Vertical;
    for glyph in glyphs.iter().filter(|g| g.flags.contains(GlyphFlags::EMBEDDED_OBJECT)) {
        let Some(object) = data.objects.iter().find(|o| o.start == glyph.start) else {
            continue;
        };
        let cross = object.cross_size(vertical);
        match object.align {
            InlineVerticalAlign::Baseline => m.ascent = m.ascent.max(cross),
            InlineVerticalAlign::Top => m.descent = m.descent.max(cross - m.ascent),
            InlineVerticalAlign::Bottom => m.ascent = m.ascent.max(cross - m.descent),
            InlineVerticalAlign::Middle => {
                let mid = (m.ascent - m.descent) / 2.0;
                let half = cross / 2.0;
                m.ascent = m.ascent.max(mid + half);
                m.descent = m.descent.max(half - mid);
            }
        }
    }

    m.ascent += spacing.top;
    m.descent += spacing.bottom;
    m
}

/// Box of an inline object at pen position `pen`.
///
/// Coordinates put the line's top edge at zero and the baseline at the
/// ascent. In vertical orientation the axes swap.
pub(crate) fn object_box(object: &InlineObject, pen: f32, metrics: &LineMetrics, orientation: Orientation) -> Rect {
    let vertical = orientation == Orientation::Vertical;
    let along = object.advance(vertical);
    let cross = object.cross_size(vertical);
    let top = match object.align {
        InlineVerticalAlign::Baseline => metrics.ascent - cross,
        InlineVerticalAlign::Top => 0.0,
        InlineVerticalAlign::Middle => metrics.ascent - (metrics.ascent - metrics.descent) / 2.0 - cross / 2.0,
        InlineVerticalAlign::Bottom => metrics.height() - cross,
    };
    if vertical {
        Rect::new(top, pen, cross, along)
    } else {
        Rect::new(pen, top, along, cross)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shaping::test_support::glyph;
    use crate::types::Vec2;

    fn object(align: InlineVerticalAlign) -> InlineObject {
        InlineObject {
            key: ObjectKey(1),
            start: 0,
            end: 1,
            size: Vec2::new(20.0, 30.0),
            align,
        }
    }

    fn object_data(align: InlineVerticalAlign) -> (TextData, Vec<Glyph>) {
        let data = TextData {
            objects: vec![object(align)],
            ..TextData::default()
        };
        let glyphs = vec![glyph(0, 20.0, GlyphFlags::EMBEDDED_OBJECT)];
        (data, glyphs)
    }

    #[test]
    fn test_baseline_object_sets_ascent() {
        let (data, glyphs) = object_data(InlineVerticalAlign::Baseline);
        let cache = FontCache::with_defaults();
        let m = measure(&glyphs, &data, &cache, Orientation::Horizontal, Spacing::default());
        assert_eq!(m.ascent, 30.0);
        assert_eq!(m.descent, 0.0);
        assert_eq!(m.width, 20.0);
    }

    #[test]
    fn test_middle_object_splits_around_center() {
        let (data, glyphs) = object_data(InlineVerticalAlign::Middle);
        let cache = FontCache::with_defaults();
        let spacing = Spacing {
            top: 2.0,
            bottom: 1.0,
            ..Spacing::default()
        };
        let m = measure(&glyphs, &data, &cache, Orientation::Horizontal, spacing);
        assert_eq!(m.ascent, 17.0);
        assert_eq!(m.descent, 16.0);
    }

    #[test]
    fn test_object_box_alignments() {
        let metrics = LineMetrics {
            ascent: 40.0,
            descent: 10.0,
            ..LineMetrics::default()
        };
        let o = object(InlineVerticalAlign::Baseline);
        assert_eq!(
            object_box(&o, 5.0, &metrics, Orientation::Horizontal),
            Rect::new(5.0, 10.0, 20.0, 30.0)
        );
        let o = object(InlineVerticalAlign::Bottom);
        assert_eq!(object_box(&o, 0.0, &metrics, Orientation::Horizontal).y, 20.0);
        let o = object(InlineVerticalAlign::Top);
        assert_eq!(
            object_box(&o, 7.0, &metrics, Orientation::Vertical),
            Rect::new(0.0, 7.0, 20.0, 30.0)
        );
    }

    #[test]
    fn test_view_keeps_clusters_starting_inside() {
        let glyphs: Vec<Glyph> = (0..6).map(|i| glyph(i, 10.0, GlyphFlags::empty())).collect();
        let content = ShapedContent {
            visual: (0..6).collect(),
            glyphs,
            runs: vec![Run {
                start: 0,
                end: 6,
                level: 0,
                script: crate::itemize::Script::Latin,
            }],
            direction: Direction::Ltr,
            base_level: 0,
            metrics: LineMetrics::default(),
        };
        let cache = FontCache::with_defaults();
        let view = content.view(2..4, &TextData::default(), &cache, Orientation::Horizontal, Spacing::default());
        assert_eq!(view.glyphs.len(), 2);
        assert_eq!(view.runs[0].range(), 2..4);
        assert_eq!(view.metrics.width, 20.0);
        assert_eq!(view.pen_position(1), Some(10.0));
    }
}
