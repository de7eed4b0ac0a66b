//! Shaped text buffers.
//!
//! A [`ShapedTextBuffer`] collects styled text and inline objects, shapes
//! them on demand and answers layout queries over the result. Any change to
//! content or settings drops the shaped state; the next query shapes again.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use horizon_lattice_text::{FontCache, ShapedTextBuffer, TextStyle};
//!
//! let cache = Arc::new(FontCache::with_defaults());
//! let font = cache.create_font();
//! cache.set_data(font, std::fs::read("DejaVuSans.ttf").unwrap()).unwrap();
//!
//! let mut buffer = ShapedTextBuffer::new(cache);
//! buffer.add_string("Hello, world", TextStyle::new(vec![font], 16)).unwrap();
//! println!("{} x {}", buffer.width(), buffer.ascent() + buffer.descent());
//! ```

mod content;
mod query;
pub mod span;

use std::ops::Range;
use std::sync::Arc;

pub use self::query::{Caret, Carets};
pub use self::span::{InlineObject, Span, TextStyle};
use self::content::{ShapedContent, TextData, measure};
use crate::error::{TextError, TextResult};
use crate::font::FontCache;
use crate::itemize::{BidiOverride, itemize_validated, validate_overrides};
use crate::layout::TrimState;
use crate::shaping::classify::OBJECT_REPLACEMENT;
use crate::shaping::{self, ShapeOptions, ShapeRequest, visual_order};
use crate::types::{Direction, InlineVerticalAlign, ObjectKey, Orientation, Spacing, Vec2};

/// A read-only window onto another buffer's shaped content.
#[derive(Debug, Clone)]
struct Substring {
    parent: Arc<ShapedContent>,
    range: Range<usize>,
}

/// Styled text plus its lazily computed shaping.
#[derive(Debug, Clone)]
pub struct ShapedTextBuffer {
    cache: Arc<FontCache>,
    direction: Direction,
    orientation: Orientation,
    custom_punctuation: Option<Vec<char>>,
    bidi_overrides: Vec<BidiOverride>,
    preserve_invalid: bool,
    preserve_control: bool,
    spacing: Spacing,
    data: Arc<TextData>,
    substring: Option<Substring>,
    content: Option<Arc<ShapedContent>>,
    trim: TrimState,
}

static_assertions::assert_impl_all!(ShapedTextBuffer: Send);

impl ShapedTextBuffer {
    /// Create an empty buffer with automatic direction.
    pub fn new(cache: Arc<FontCache>) -> Self {
        Self::with_direction(cache, Direction::Auto, Orientation::Horizontal)
    }

    /// Create an empty buffer.
    pub fn with_direction(cache: Arc<FontCache>, direction: Direction, orientation: Orientation) -> Self {
        Self {
            cache,
            direction,
            orientation,
            custom_punctuation: None,
            bidi_overrides: Vec::new(),
            preserve_invalid: true,
            preserve_control: false,
            spacing: Spacing::default(),
            data: Arc::new(TextData::default()),
            substring: None,
            content: None,
            trim: TrimState::default(),
        }
    }

    /// The font cache glyphs are shaped and rendered with.
    pub fn font_cache(&self) -> &Arc<FontCache> {
        &self.cache
    }

    // -------------------------------------------------------------------------
    // Settings
    // -------------------------------------------------------------------------

    /// Requested paragraph direction.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Set the paragraph direction.
    pub fn set_direction(&mut self, direction: Direction) {
        if self.direction != direction {
            self.direction = direction;
            self.invalidate();
        }
    }

    /// Text flow orientation.
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Set the text flow orientation.
    pub fn set_orientation(&mut self, orientation: Orientation) {
        if self.orientation != orientation {
            self.orientation = orientation;
            self.invalidate();
        }
    }

    /// Direction overrides currently applied.
    pub fn bidi_overrides(&self) -> &[BidiOverride] {
        &self.bidi_overrides
    }

    /// Replace the direction overrides.
    ///
    /// Fails with [`TextError::OverlappingRanges`] when ranges overlap or
    /// extend past the text; the previous overrides stay in place.
    pub fn set_bidi_override(&mut self, overrides: &[BidiOverride]) -> TextResult<()> {
        self.bidi_overrides = validate_overrides(overrides, self.data.len())?;
        self.invalidate();
        Ok(())
    }

    /// Caller-defined punctuation, if any.
    pub fn custom_punctuation(&self) -> Option<&[char]> {
        self.custom_punctuation.as_deref()
    }

    /// Replace the punctuation set used for word breaks. `None` restores the
    /// default set.
    pub fn set_custom_punctuation(&mut self, punctuation: Option<&str>) {
        self.custom_punctuation = punctuation.map(|p| p.chars().collect());
        self.invalidate();
    }

    /// Whether uncovered characters render as hex-code boxes.
    pub fn preserve_invalid(&self) -> bool {
        self.preserve_invalid
    }

    pub fn set_preserve_invalid(&mut self, enabled: bool) {
        if self.preserve_invalid != enabled {
            self.preserve_invalid = enabled;
            self.invalidate();
        }
    }

    /// Whether control characters keep a visible box.
    pub fn preserve_control(&self) -> bool {
        self.preserve_control
    }

    pub fn set_preserve_control(&mut self, enabled: bool) {
        if self.preserve_control != enabled {
            self.preserve_control = enabled;
            self.invalidate();
        }
    }

    /// Extra spacing.
    pub fn spacing(&self) -> Spacing {
        self.spacing
    }

    /// Set extra spacing applied after shaping.
    pub fn set_spacing(&mut self, spacing: Spacing) {
        if self.spacing != spacing {
            self.spacing = spacing;
            self.invalidate();
        }
    }

    // -------------------------------------------------------------------------
    // Content
    // -------------------------------------------------------------------------

    /// Append styled text.
    ///
    /// Fails with [`TextError::ReadOnlyBuffer`] on substring views. Empty
    /// text is accepted and adds nothing.
    pub fn add_string(&mut self, text: &str, style: TextStyle) -> TextResult<()> {
        self.check_writable()?;
        if text.is_empty() {
            return Ok(());
        }
        let data = Arc::make_mut(&mut self.data);
        let start = data.len();
        data.push_str(text);
        data.spans.push(Span {
            start,
            end: data.len(),
            style,
            object: None,
        });
        tracing::trace!(target: "horizon_lattice_text::buffer", start, len = data.len() - start, "appended text");
        self.invalidate();
        Ok(())
    }

    /// Append an inline object occupying `length` placeholder characters.
    ///
    /// Fails with [`TextError::ReadOnlyBuffer`] on substring views and with
    /// [`TextError::DuplicateObjectKey`] when `key` is taken.
    pub fn add_object(
        &mut self,
        key: ObjectKey,
        size: Vec2,
        align: InlineVerticalAlign,
        length: usize,
    ) -> TextResult<()> {
        self.check_writable()?;
        if self.data.object(key).is_some() {
            return Err(TextError::DuplicateObjectKey(key));
        }
        let data = Arc::make_mut(&mut self.data);
        let length = length.max(1);
        let start = data.len();
        let style = data
            .spans
            .last()
            .map(|s| TextStyle {
                size: s.style.size,
                ..TextStyle::default()
            })
            .unwrap_or_default();
        data.push_str(&std::iter::repeat_n(OBJECT_REPLACEMENT, length).collect::<String>());
        let end = data.len();
        data.spans.push(Span {
            start,
            end,
            style,
            object: Some(key),
        });
        data.objects.push(InlineObject {
            key,
            start,
            end,
            size,
            align,
        });
        tracing::trace!(target: "horizon_lattice_text::buffer", ?key, start, end, "appended inline object");
        self.invalidate();
        Ok(())
    }

    /// Change an object's size and alignment without shaping again.
    pub fn resize_object(&mut self, key: ObjectKey, size: Vec2, align: InlineVerticalAlign) -> TextResult<()> {
        self.check_writable()?;
        let data = Arc::make_mut(&mut self.data);
        let object = data
            .objects
            .iter_mut()
            .find(|o| o.key == key)
            .ok_or(TextError::UnknownObject(key))?;
        object.size = size;
        object.align = align;
        let object = object.clone();

        self.trim = TrimState::default();
        if let Some(content) = self.content.as_mut() {
            let vertical = self.orientation == Orientation::Vertical;
            let content = Arc::make_mut(content);
            for glyph in content.glyphs.iter_mut().filter(|g| g.start == object.start) {
                glyph.advance = object.advance(vertical);
            }
            content.metrics = measure(&content.glyphs, &self.data, &self.cache, self.orientation, self.spacing);
        }
        Ok(())
    }

    /// Remove all text, objects and overrides. A substring view becomes an
    /// empty, writable buffer.
    pub fn clear(&mut self) {
        self.data = Arc::new(TextData::default());
        self.bidi_overrides.clear();
        self.substring = None;
        self.invalidate();
    }

    /// A read-only view of `len` characters starting at `start`.
    ///
    /// The range is clamped to this buffer's range. The view shares the
    /// shaped glyphs and keeps their bidi levels, so it reorders like a line
    /// cut from this buffer.
    pub fn substr(&mut self, start: usize, len: usize) -> ShapedTextBuffer {
        let parent = self.content();
        let own = self.range();
        let start = start.clamp(own.start, own.end);
        let end = start.saturating_add(len).min(own.end);
        let mut view = Self {
            cache: Arc::clone(&self.cache),
            direction: Direction::Inherited,
            orientation: self.orientation,
            custom_punctuation: self.custom_punctuation.clone(),
            bidi_overrides: Vec::new(),
            preserve_invalid: self.preserve_invalid,
            preserve_control: self.preserve_control,
            spacing: self.spacing,
            data: Arc::clone(&self.data),
            substring: Some(Substring {
                parent,
                range: start..end,
            }),
            content: None,
            trim: TrimState::default(),
        };
        view.shape();
        view
    }

    /// Whether this buffer is a substring view.
    pub fn is_read_only(&self) -> bool {
        self.substring.is_some()
    }

    /// Character range covered by the buffer. Substring views keep their
    /// parent's positions.
    pub fn range(&self) -> Range<usize> {
        match &self.substring {
            Some(sub) => sub.range.clone(),
            None => 0..self.data.len(),
        }
    }

    /// Number of characters.
    pub fn len(&self) -> usize {
        self.range().len()
    }

    /// Whether the buffer holds no characters.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The buffer's text.
    pub fn text(&self) -> String {
        self.data.chars[self.range()].iter().collect()
    }

    /// Spans overlapping the buffer.
    pub fn spans(&self) -> impl Iterator<Item = &Span> {
        let range = self.range();
        self.data
            .spans
            .iter()
            .filter(move |s| s.start < range.end && s.end > range.start)
    }

    /// Number of spans overlapping the buffer.
    pub fn span_count(&self) -> usize {
        self.spans().count()
    }

    /// Caller data attached to a span.
    pub fn span_meta(&self, index: usize) -> Option<u64> {
        self.spans().nth(index).and_then(|s| s.style.meta)
    }

    // -------------------------------------------------------------------------
    // Shaping
    // -------------------------------------------------------------------------

    /// Shape the buffer. Does nothing when the buffer is already shaped.
    ///
    /// Always succeeds: text no font covers becomes missing glyphs.
    pub fn shape(&mut self) -> bool {
        self.content();
        true
    }

    /// Whether shaped results are current.
    pub fn is_shaped(&self) -> bool {
        self.content.is_some()
    }

    fn check_writable(&self) -> TextResult<()> {
        if self.is_read_only() {
            return Err(TextError::ReadOnlyBuffer);
        }
        Ok(())
    }

    fn invalidate(&mut self) {
        self.content = None;
        self.trim = TrimState::default();
    }

    /// Shaped content, shaping first when needed.
    pub(crate) fn content(&mut self) -> Arc<ShapedContent> {
        let content = match self.content.take() {
            Some(content) => content,
            None => Arc::new(self.build()),
        };
        Arc::clone(self.content.insert(content))
    }

    /// Shaped content for in-place adjustment.
    pub(crate) fn content_mut(&mut self) -> &mut ShapedContent {
        let content = match self.content.take() {
            Some(content) => content,
            None => Arc::new(self.build()),
        };
        Arc::make_mut(self.content.insert(content))
    }

    fn build(&self) -> ShapedContent {
        if let Some(sub) = &self.substring {
            return sub
                .parent
                .view(sub.range.clone(), &self.data, &self.cache, self.orientation, self.spacing);
        }

        let data = &self.data;
        let overrides = validate_overrides(&self.bidi_overrides, data.len()).unwrap_or_else(|err| {
            tracing::warn!(target: "horizon_lattice_text::buffer", %err, "ignoring stale bidi overrides");
            Vec::new()
        });
        let itemization = itemize_validated(&data.text, self.direction, &overrides);
        let request = ShapeRequest {
            cache: &self.cache,
            text: &data.text,
            chars: &data.chars,
            spans: &data.spans,
            objects: &data.objects,
            itemization: &itemization,
            options: ShapeOptions {
                orientation: self.orientation,
                preserve_invalid: self.preserve_invalid,
                preserve_control: self.preserve_control,
                custom_punctuation: self.custom_punctuation.as_deref(),
                spacing: self.spacing,
            },
        };
        let glyphs = shaping::shape(&request);
        let visual = visual_order(&glyphs, itemization.base_level);
        let metrics = measure(&glyphs, data, &self.cache, self.orientation, self.spacing);
        tracing::debug!(
            target: "horizon_lattice_text::buffer",
            chars = data.len(),
            glyphs = glyphs.len(),
            runs = itemization.runs.len(),
            width = metrics.width,
            "shaped buffer"
        );
        ShapedContent {
            glyphs,
            visual,
            runs: itemization.runs,
            direction: itemization.direction,
            base_level: itemization.base_level,
            metrics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer() -> ShapedTextBuffer {
        ShapedTextBuffer::new(Arc::new(FontCache::with_defaults()))
    }

    #[test]
    fn test_append_and_ranges() {
        let mut b = buffer();
        b.add_string("abc", TextStyle::default().with_meta(7)).unwrap();
        b.add_object(ObjectKey(1), Vec2::new(10.0, 10.0), InlineVerticalAlign::Baseline, 2)
            .unwrap();
        b.add_string("", TextStyle::default()).unwrap();
        assert_eq!(b.len(), 5);
        assert_eq!(b.span_count(), 2);
        assert_eq!(b.span_meta(0), Some(7));
        assert_eq!(b.text(), "abc\u{FFFC}\u{FFFC}");
    }

    #[test]
    fn test_duplicate_object_key() {
        let mut b = buffer();
        let size = Vec2::new(4.0, 4.0);
        b.add_object(ObjectKey(9), size, InlineVerticalAlign::Top, 1).unwrap();
        assert_eq!(
            b.add_object(ObjectKey(9), size, InlineVerticalAlign::Top, 1),
            Err(TextError::DuplicateObjectKey(ObjectKey(9)))
        );
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn test_shape_is_cached_until_changed() {
        let mut b = buffer();
        b.add_string("abc", TextStyle::default()).unwrap();
        assert!(!b.is_shaped());
        assert!(b.shape());
        let first = b.content();
        assert!(b.shape());
        assert!(Arc::ptr_eq(&first, &b.content()));
        b.set_preserve_control(true);
        assert!(!b.is_shaped());
    }

    #[test]
    fn test_substring_is_read_only() {
        let mut b = buffer();
        b.add_string("hello world", TextStyle::default()).unwrap();
        let mut sub = b.substr(6, 5);
        assert!(sub.is_read_only());
        assert_eq!(sub.range(), 6..11);
        assert_eq!(sub.text(), "world");
        assert_eq!(sub.add_string("x", TextStyle::default()), Err(TextError::ReadOnlyBuffer));

        // The parent keeps changing without affecting the view.
        b.add_string("!", TextStyle::default()).unwrap();
        assert_eq!(sub.text(), "world");
        sub.clear();
        assert!(!sub.is_read_only());
        assert!(sub.is_empty());
    }

    #[test]
    fn test_substring_range_is_clamped() {
        let mut b = buffer();
        b.add_string("abc", TextStyle::default()).unwrap();
        assert_eq!(b.substr(2, 10).range(), 2..3);
        assert_eq!(b.substr(10, 1).range(), 3..3);
    }

    #[test]
    fn test_bidi_override_validation() {
        let mut b = buffer();
        b.add_string("abcdef", TextStyle::default()).unwrap();
        let bad = [
            BidiOverride::new(0..3, Direction::Rtl),
            BidiOverride::new(2..4, Direction::Ltr),
        ];
        assert!(matches!(
            b.set_bidi_override(&bad),
            Err(TextError::OverlappingRanges { .. })
        ));
        assert!(b.bidi_overrides().is_empty());
        b.set_bidi_override(&[BidiOverride::new(1..3, Direction::Rtl)]).unwrap();
        assert_eq!(b.bidi_overrides().len(), 1);
    }

    #[test]
    fn test_resize_object_keeps_shaping() {
        let mut b = buffer();
        b.add_object(ObjectKey(3), Vec2::new(10.0, 5.0), InlineVerticalAlign::Baseline, 1)
            .unwrap();
        b.shape();
        let before = b.content();
        b.resize_object(ObjectKey(3), Vec2::new(25.0, 8.0), InlineVerticalAlign::Baseline)
            .unwrap();
        assert!(b.is_shaped());
        assert_eq!(b.content().glyphs.len(), before.glyphs.len());
        assert_eq!(b.content().metrics.width, 25.0);
        assert_eq!(b.content().metrics.ascent, 8.0);
        assert_eq!(
            b.resize_object(ObjectKey(4), Vec2::ZERO, InlineVerticalAlign::Top),
            Err(TextError::UnknownObject(ObjectKey(4)))
        );
    }
}
