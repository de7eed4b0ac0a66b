//! Spans and inline objects of a shaped text buffer.

use crate::handle::FontId;
use crate::types::{FontFeature, InlineVerticalAlign, ObjectKey, Vec2};

/// Font and language settings for a run of appended text.
///
/// # Example
///
/// ```
/// use horizon_lattice_text::{FontFeature, FontId, TextStyle};
///
/// let style = TextStyle::new(vec![FontId::default()], 16)
///     .with_language("en")
///     .with_feature(FontFeature::NO_LIGATURES)
///     .with_meta(42);
/// assert_eq!(style.size, 16);
/// assert_eq!(style.meta, Some(42));
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextStyle {
    /// Font fallback chain, most preferred first.
    pub fonts: Vec<FontId>,
    /// Pixel size.
    pub size: u32,
    /// OpenType feature overrides.
    pub features: Vec<FontFeature>,
    /// BCP 47 language tag.
    pub language: Option<String>,
    /// Opaque caller data, returned by span queries.
    pub meta: Option<u64>,
}

impl TextStyle {
    /// Create a style with a fallback chain and pixel size.
    pub fn new(fonts: impl Into<Vec<FontId>>, size: u32) -> Self {
        Self {
            fonts: fonts.into(),
            size,
            ..Self::default()
        }
    }

    /// Append a fallback font.
    pub fn with_fallback(mut self, font: FontId) -> Self {
        self.fonts.push(font);
        self
    }

    /// Add a feature override.
    pub fn with_feature(mut self, feature: FontFeature) -> Self {
        self.features.push(feature);
        self
    }

    /// Set the language.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Attach caller data.
    pub fn with_meta(mut self, meta: u64) -> Self {
        self.meta = Some(meta);
        self
    }
}

/// A contiguous range of buffer text sharing one style.
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    /// Start character index.
    pub start: usize,
    /// End character index (exclusive).
    pub end: usize,
    /// Style of the range.
    pub style: TextStyle,
    /// Set when the span is an inline object placeholder.
    pub object: Option<ObjectKey>,
}

impl Span {
    /// Number of characters in the span.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the span holds no characters.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A box reserved inside the text for caller-drawn content.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineObject {
    /// Caller-chosen key, unique within the buffer.
    pub key: ObjectKey,
    /// Start character index of the placeholder.
    pub start: usize,
    /// End character index of the placeholder (exclusive).
    pub end: usize,
    /// Reserved width and height.
    pub size: Vec2,
    /// Vertical alignment against the line.
    pub align: InlineVerticalAlign,
}

impl InlineObject {
    /// Extent of the object along the line.
    pub(crate) fn advance(&self, vertical: bool) -> f32 {
        if vertical { self.size.y } else { self.size.x }
    }

    /// Extent across the line.
    pub(crate) fn cross_size(&self, vertical: bool) -> f32 {
        if vertical { self.size.x } else { self.size.y }
    }
}
