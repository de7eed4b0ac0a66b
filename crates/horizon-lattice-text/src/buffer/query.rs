//! Queries over a shaped buffer.
//!
//! Every query shapes the buffer first if needed. Positions along the line
//! are measured from the left edge (top edge in vertical orientation);
//! boxes put the line's top at zero and the baseline at the ascent.

use std::ops::Range;
use std::sync::Arc;

use super::ShapedTextBuffer;
use super::content::{LineMetrics, ShapedContent, object_box};
use crate::error::{TextError, TextResult};
use crate::layout::{
    self, EllipsisConstraint, JustificationFlags, LineBreakFlags, OverrunFlags, TrimState, WIDTH_EPSILON,
    cluster_infos,
};
use crate::shaping::{Glyph, GlyphFlags};
use crate::types::{Direction, ObjectKey, Orientation, Rect, Vec2};

/// One caret: a zero-width box at a cluster edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Caret {
    /// Caret box.
    pub rect: Rect,
    /// Direction of the cluster the caret is attached to.
    pub direction: Direction,
}

/// Carets for a text position.
///
/// At a direction boundary the position touches two clusters that are
/// visually apart: `leading` is at the start edge of the cluster that begins
/// at the position, `trailing` at the end edge of the cluster that ends
/// there.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Carets {
    pub leading: Option<Caret>,
    pub trailing: Option<Caret>,
}

/// A cluster placed along the line.
#[derive(Debug, Clone, Copy)]
struct PlacedCluster {
    start: usize,
    end: usize,
    from: f32,
    to: f32,
    rtl: bool,
}

impl PlacedCluster {
    /// Line position of a character offset inside the cluster.
    fn edge_at(&self, pos: usize) -> f32 {
        let len = self.end.saturating_sub(self.start).max(1) as f32;
        let fraction = pos.saturating_sub(self.start) as f32 / len;
        let width = self.to - self.from;
        if self.rtl {
            self.to - fraction * width
        } else {
            self.from + fraction * width
        }
    }
}

/// Clusters in visual order with their extents.
fn placed_clusters(content: &ShapedContent) -> Vec<PlacedCluster> {
    let mut out: Vec<PlacedCluster> = Vec::new();
    let mut pen = 0.0;
    for &i in &content.visual {
        let g = &content.glyphs[i];
        let next = pen + g.total_advance();
        match out.last_mut() {
            Some(c) if c.start == g.start && c.end == g.end => c.to = next,
            _ => out.push(PlacedCluster {
                start: g.start,
                end: g.end,
                from: pen,
                to: next,
                rtl: g.level % 2 == 1,
            }),
        }
        pen = next;
    }
    out
}

impl ShapedTextBuffer {
    /// Separators used by [`word_breaks`](Self::word_breaks) by default.
    pub const WORD_SEPARATORS: GlyphFlags = GlyphFlags::SPACE.union(GlyphFlags::PUNCTUATION);

    // -------------------------------------------------------------------------
    // Glyphs and metrics
    // -------------------------------------------------------------------------

    /// Glyphs in visual (paint) order.
    pub fn glyphs(&mut self) -> Vec<Glyph> {
        let content = self.content();
        content.visual.iter().map(|&i| content.glyphs[i].clone()).collect()
    }

    /// Glyphs in logical order.
    pub fn glyphs_logical(&mut self) -> Vec<Glyph> {
        self.content().glyphs.clone()
    }

    /// Number of shaped glyphs, including elongations inserted by
    /// justification.
    pub fn glyph_count(&mut self) -> usize {
        self.content().glyphs.len()
    }

    /// Bounding size: advance by line height, swapped in vertical
    /// orientation.
    pub fn size(&mut self) -> Vec2 {
        let m = self.content().metrics;
        match self.orientation {
            Orientation::Horizontal => Vec2::new(m.width, m.height()),
            Orientation::Vertical => Vec2::new(m.height(), m.width),
        }
    }

    /// Total advance along the line.
    pub fn width(&mut self) -> f32 {
        self.content().metrics.width
    }

    /// Largest ascent among the fonts and inline objects used, in pixels.
    pub fn ascent(&mut self) -> f32 {
        self.content().metrics.ascent
    }

    /// Largest descent among the fonts and inline objects used, in pixels.
    pub fn descent(&mut self) -> f32 {
        self.content().metrics.descent
    }

    /// Underline offset from the baseline, the largest among the fonts used.
    pub fn underline_position(&mut self) -> f32 {
        self.content().metrics.underline_position
    }

    /// Underline stroke thickness.
    pub fn underline_thickness(&mut self) -> f32 {
        self.content().metrics.underline_thickness
    }

    // -------------------------------------------------------------------------
    // Direction and runs
    // -------------------------------------------------------------------------

    /// Resolved paragraph direction, `Ltr` or `Rtl`.
    pub fn inferred_direction(&mut self) -> Direction {
        self.content().direction
    }

    /// Number of bidi/script runs.
    pub fn run_count(&mut self) -> usize {
        self.content().runs.len()
    }

    /// Character range of a run.
    pub fn run_range(&mut self, index: usize) -> Option<Range<usize>> {
        self.content().runs.get(index).map(|r| r.range())
    }

    /// Direction of a run.
    pub fn run_direction(&mut self, index: usize) -> Option<Direction> {
        self.content().runs.get(index).map(|r| r.direction())
    }

    /// The direction covering most characters of `start..end`. Ties go to
    /// left-to-right; an empty range reports the paragraph direction.
    pub fn dominant_direction_in_range(&mut self, start: usize, end: usize) -> Direction {
        let content = self.content();
        let (start, end) = (start.min(end), start.max(end));
        let (mut ltr, mut rtl) = (0usize, 0usize);
        for run in &content.runs {
            let overlap = run.end.min(end).saturating_sub(run.start.max(start));
            if run.is_rtl() {
                rtl += overlap;
            } else {
                ltr += overlap;
            }
        }
        match (ltr, rtl) {
            (0, 0) => content.direction,
            (l, r) if r > l => Direction::Rtl,
            _ => Direction::Ltr,
        }
    }

    // -------------------------------------------------------------------------
    // Hit testing and carets
    // -------------------------------------------------------------------------

    /// Character position of the cluster boundary nearest to `coord`.
    pub fn hit_test_position(&mut self, coord: f32) -> usize {
        let content = self.content();
        let clusters = placed_clusters(&content);
        let (Some(first), Some(last)) = (clusters.first(), clusters.last()) else {
            return self.range().start;
        };
        if coord <= first.from {
            return if first.rtl { first.end } else { first.start };
        }
        for c in &clusters {
            if coord < c.to {
                let left_half = coord < (c.from + c.to) / 2.0;
                return if left_half != c.rtl { c.start } else { c.end };
            }
        }
        if last.rtl { last.start } else { last.end }
    }

    /// Start of the cluster under `coord`, `None` outside the text.
    pub fn hit_test_grapheme(&mut self, coord: f32) -> Option<usize> {
        let content = self.content();
        placed_clusters(&content)
            .iter()
            .find(|c| c.from <= coord && coord < c.to)
            .map(|c| c.start)
    }

    /// Carets for a text position.
    pub fn carets(&mut self, pos: usize) -> Carets {
        let content = self.content();
        let clusters = placed_clusters(&content);
        let metrics = content.metrics;
        let mut carets = Carets::default();
        for c in &clusters {
            let direction = if c.rtl { Direction::Rtl } else { Direction::Ltr };
            if carets.leading.is_none() && c.start <= pos && pos < c.end {
                let edge = c.edge_at(pos);
                carets.leading = Some(Caret {
                    rect: self.line_rect(edge, edge, &metrics),
                    direction,
                });
            }
            if carets.trailing.is_none() && c.end == pos {
                let edge = c.edge_at(pos);
                carets.trailing = Some(Caret {
                    rect: self.line_rect(edge, edge, &metrics),
                    direction,
                });
            }
        }
        if clusters.is_empty() {
            carets.leading = Some(Caret {
                rect: self.line_rect(0.0, 0.0, &metrics),
                direction: content.direction,
            });
        }
        carets
    }

    /// Boxes covering `start..end`, merged where they touch.
    pub fn selection_rects(&mut self, start: usize, end: usize) -> Vec<Rect> {
        let content = self.content();
        let (start, end) = (start.min(end), start.max(end));
        let mut extents: Vec<(f32, f32)> = Vec::new();
        for c in placed_clusters(&content) {
            let (s, e) = (c.start.max(start), c.end.min(end));
            if s >= e {
                continue;
            }
            let (a, b) = (c.edge_at(s), c.edge_at(e));
            let (from, to) = (a.min(b), a.max(b));
            match extents.last_mut() {
                Some(last) if (last.1 - from).abs() <= WIDTH_EPSILON => last.1 = to,
                _ => extents.push((from, to)),
            }
        }
        extents
            .into_iter()
            .map(|(from, to)| self.line_rect(from, to, &content.metrics))
            .collect()
    }

    fn line_rect(&self, from: f32, to: f32, metrics: &LineMetrics) -> Rect {
        match self.orientation {
            Orientation::Horizontal => Rect::new(from, 0.0, to - from, metrics.height()),
            Orientation::Vertical => Rect::new(0.0, from, metrics.height(), to - from),
        }
    }

    // -------------------------------------------------------------------------
    // Words and graphemes
    // -------------------------------------------------------------------------

    /// Word ranges: maximal runs of clusters without any of the
    /// `separators` flags. Clusters with any `skip` flag are ignored.
    pub fn word_breaks(&mut self, separators: GlyphFlags, skip: GlyphFlags) -> Vec<Range<usize>> {
        let content = self.content();
        let mut words = Vec::new();
        let mut current: Option<Range<usize>> = None;
        for cluster in cluster_infos(&content.glyphs, false) {
            if cluster.flags.intersects(skip) {
                continue;
            }
            if cluster.flags.intersects(separators) {
                words.extend(current.take());
                continue;
            }
            match &mut current {
                Some(word) => word.end = cluster.end,
                None => current = Some(cluster.start..cluster.end),
            }
        }
        words.extend(current);
        words
    }

    /// Character range of the cluster containing `pos`.
    pub fn grapheme_bounds(&mut self, pos: usize) -> Option<Range<usize>> {
        self.content()
            .glyphs
            .iter()
            .find(|g| g.start <= pos && pos < g.end)
            .map(Glyph::range)
    }

    /// Position after the cluster containing `pos`.
    pub fn next_grapheme_pos(&mut self, pos: usize) -> usize {
        let end = self.range().end;
        if pos >= end {
            return end;
        }
        self.grapheme_bounds(pos).map_or(pos + 1, |r| r.end)
    }

    /// Start of the cluster before `pos`.
    pub fn prev_grapheme_pos(&mut self, pos: usize) -> usize {
        let start = self.range().start;
        if pos <= start {
            return start;
        }
        let pos = pos.min(self.range().end);
        self.grapheme_bounds(pos - 1).map_or(pos - 1, |r| r.start)
    }

    // -------------------------------------------------------------------------
    // Layout
    // -------------------------------------------------------------------------

    /// Break into lines no wider than `width`.
    pub fn line_breaks(&mut self, width: f32, flags: LineBreakFlags) -> Vec<Range<usize>> {
        layout::line_breaks(&self.content().glyphs, width, flags)
    }

    /// Break into lines of the given widths.
    pub fn line_breaks_adv(&mut self, widths: &[f32], once: bool, flags: LineBreakFlags) -> Vec<Range<usize>> {
        layout::line_breaks_adv(&self.content().glyphs, widths, once, flags)
    }

    /// Justify to `width`, returning the resulting width.
    ///
    /// With [`JustificationFlags::CONSTRAIN_ELLIPSIS`] and an active overrun
    /// trim, only the kept text is justified, leaving room for the ellipsis.
    pub fn fit_to_width(&mut self, width: f32, flags: JustificationFlags) -> f32 {
        let constraint = self.trim.trim_pos.map(|trim_pos| EllipsisConstraint {
            trim_pos,
            ellipsis_width: self.trim.ellipsis_width(),
        });
        let cache = Arc::clone(&self.cache);
        let data = Arc::clone(&self.data);
        let (orientation, spacing) = (self.orientation, self.spacing);
        let content = self.content_mut();
        let result = layout::fit_to_width(&mut content.glyphs, &cache, width, flags, constraint);
        content.refresh(&data, &cache, orientation, spacing);
        result
    }

    /// Align tabs to `stops`.
    pub fn tab_align(&mut self, stops: &[f32]) {
        let cache = Arc::clone(&self.cache);
        let data = Arc::clone(&self.data);
        let minimal = cache.config().tab_minimal_advance;
        let (orientation, spacing) = (self.orientation, self.spacing);
        let content = self.content_mut();
        let order = content.visual.clone();
        let rtl = content.direction.is_rtl();
        layout::tab_align(&mut content.glyphs, &order, stops, minimal, &cache, rtl);
        content.refresh(&data, &cache, orientation, spacing);
    }

    /// Compute the overrun projection for `width`. Stored glyphs are not
    /// changed; the result stays available through
    /// [`trim_state`](Self::trim_state) until the buffer changes.
    pub fn overrun_trim(&mut self, width: f32, flags: OverrunFlags) -> &TrimState {
        let content = self.content();
        let ellipsis = self.cache.config().ellipsis;
        self.trim = layout::overrun_trim(&content.glyphs, &self.cache, ellipsis, width, flags);
        &self.trim
    }

    /// The last overrun projection.
    pub fn trim_state(&self) -> &TrimState {
        &self.trim
    }

    /// Character position where display stops, if trimmed.
    pub fn trim_pos(&self) -> Option<usize> {
        self.trim.trim_pos
    }

    /// Logical glyph index where the ellipsis is drawn.
    pub fn ellipsis_pos(&self) -> Option<usize> {
        self.trim.ellipsis_pos
    }

    /// Ellipsis glyphs recorded by the last overrun trim, drawn after the
    /// kept text. Empty when no ellipsis was added.
    pub fn ellipsis_glyphs(&self) -> &[Glyph] {
        &self.trim.ellipsis_glyphs
    }

    // -------------------------------------------------------------------------
    // Inline objects
    // -------------------------------------------------------------------------

    /// Keys of the objects inside the buffer.
    pub fn objects(&self) -> Vec<ObjectKey> {
        let range = self.range();
        self.data
            .objects
            .iter()
            .filter(|o| o.start >= range.start && o.start < range.end)
            .map(|o| o.key)
            .collect()
    }

    /// Placeholder range of an object.
    pub fn object_range(&self, key: ObjectKey) -> TextResult<Range<usize>> {
        self.data
            .object(key)
            .map(|o| o.start..o.end)
            .ok_or(TextError::UnknownObject(key))
    }

    /// Visual index of an object's glyph.
    pub fn object_glyph(&mut self, key: ObjectKey) -> TextResult<usize> {
        let start = self.object_range(key)?.start;
        let content = self.content();
        content
            .visual
            .iter()
            .position(|&i| is_object_glyph(&content.glyphs[i], start))
            .ok_or(TextError::UnknownObject(key))
    }

    /// Box reserved for an object.
    pub fn object_rect(&mut self, key: ObjectKey) -> TextResult<Rect> {
        let object = self.data.object(key).cloned().ok_or(TextError::UnknownObject(key))?;
        let content = self.content();
        let pen = content
            .glyphs
            .iter()
            .position(|g| is_object_glyph(g, object.start))
            .and_then(|i| content.pen_position(i))
            .ok_or(TextError::UnknownObject(key))?;
        Ok(object_box(&object, pen, &content.metrics, self.orientation))
    }
}

fn is_object_glyph(glyph: &Glyph, start: usize) -> bool {
    glyph.start == start && glyph.flags.contains(GlyphFlags::EMBEDDED_OBJECT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::TextStyle;
    use crate::font::FontCache;
    use crate::types::InlineVerticalAlign;

    /// A buffer of inline objects only, so tests need no font data.
    fn boxes(widths: &[f32]) -> ShapedTextBuffer {
        let mut b = ShapedTextBuffer::new(Arc::new(FontCache::with_defaults()));
        for (i, &w) in widths.iter().enumerate() {
            b.add_object(ObjectKey(i as u64), Vec2::new(w, 10.0), InlineVerticalAlign::Baseline, 1)
                .unwrap();
        }
        b
    }

    #[test]
    fn test_size_and_metrics() {
        let mut b = boxes(&[10.0, 20.0]);
        assert_eq!(b.size(), Vec2::new(30.0, 10.0));
        assert_eq!(b.glyph_count(), 2);
        b.set_orientation(Orientation::Vertical);
        // Vertical objects advance by their height and widen the line by
        // their width.
        assert_eq!(b.size(), Vec2::new(20.0, 20.0));
    }

    #[test]
    fn test_hit_test_nearest_boundary() {
        let mut b = boxes(&[10.0, 20.0]);
        assert_eq!(b.hit_test_position(-5.0), 0);
        assert_eq!(b.hit_test_position(4.0), 0);
        assert_eq!(b.hit_test_position(6.0), 1);
        assert_eq!(b.hit_test_position(21.0), 2);
        assert_eq!(b.hit_test_position(100.0), 2);
        assert_eq!(b.hit_test_grapheme(15.0), Some(1));
        assert_eq!(b.hit_test_grapheme(31.0), None);
    }

    #[test]
    fn test_carets_and_selection() {
        let mut b = boxes(&[10.0, 20.0, 5.0]);
        let carets = b.carets(1);
        assert_eq!(carets.leading.map(|c| c.rect.x), Some(10.0));
        assert_eq!(carets.trailing.map(|c| c.rect.x), Some(10.0));
        assert_eq!(b.carets(0).trailing, None);

        let rects = b.selection_rects(0, 2);
        assert_eq!(rects, vec![Rect::new(0.0, 0.0, 30.0, 10.0)]);
    }

    #[test]
    fn test_objects() {
        let mut b = boxes(&[10.0, 20.0]);
        assert_eq!(b.objects(), vec![ObjectKey(0), ObjectKey(1)]);
        assert_eq!(b.object_range(ObjectKey(1)).unwrap(), 1..2);
        assert_eq!(b.object_glyph(ObjectKey(1)).unwrap(), 1);
        assert_eq!(b.object_rect(ObjectKey(1)).unwrap(), Rect::new(10.0, 0.0, 20.0, 10.0));
        assert_eq!(b.object_rect(ObjectKey(5)), Err(TextError::UnknownObject(ObjectKey(5))));
    }

    #[test]
    fn test_grapheme_navigation() {
        let mut b = boxes(&[1.0, 1.0, 1.0]);
        assert_eq!(b.next_grapheme_pos(0), 1);
        assert_eq!(b.next_grapheme_pos(3), 3);
        assert_eq!(b.prev_grapheme_pos(2), 1);
        assert_eq!(b.prev_grapheme_pos(0), 0);
        assert_eq!(b.grapheme_bounds(2), Some(2..3));
        assert_eq!(b.grapheme_bounds(3), None);
    }

    #[test]
    fn test_runs_and_direction() {
        let mut b = ShapedTextBuffer::new(Arc::new(FontCache::with_defaults()));
        b.add_string("abc אבג", TextStyle::default()).unwrap();
        assert_eq!(b.inferred_direction(), Direction::Ltr);
        assert_eq!(b.run_count(), 2);
        assert_eq!(b.run_range(1), Some(4..7));
        assert_eq!(b.run_direction(1), Some(Direction::Rtl));
        assert_eq!(b.dominant_direction_in_range(3, 7), Direction::Rtl);
        assert_eq!(b.dominant_direction_in_range(0, 7), Direction::Ltr);
    }

    #[test]
    fn test_word_breaks_without_fonts() {
        let mut b = ShapedTextBuffer::new(Arc::new(FontCache::with_defaults()));
        b.add_string("one, two three", TextStyle::default()).unwrap();
        let words = b.word_breaks(ShapedTextBuffer::WORD_SEPARATORS, GlyphFlags::VIRTUAL);
        assert_eq!(words, vec![0..3, 5..8, 9..14]);
    }
}
