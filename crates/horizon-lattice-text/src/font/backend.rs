//! Pluggable font face backend.
//!
//! The cache never parses font files itself. A [`FaceLoader`] turns source
//! bytes into a [`FontFace`], which answers character mapping and metric
//! queries and shapes runs of text. [`OpenTypeLoader`](super::OpenTypeLoader)
//! is the default implementation.

use std::fmt;
use std::sync::Arc;

use crate::error::TextResult;
use crate::types::{FontFeature, Variation, VariationAxis};

/// Face-wide metrics in font units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceMetrics {
    /// Units per em.
    pub units_per_em: u16,
    /// Distance from baseline to the top of the line (positive).
    pub ascent: f32,
    /// Distance from baseline to the bottom of the line (positive).
    pub descent: f32,
    /// Recommended gap between lines.
    pub line_gap: f32,
    /// Underline position (negative is below the baseline).
    pub underline_position: f32,
    /// Underline thickness.
    pub underline_thickness: f32,
}

/// Shaping direction for a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunDirection {
    /// Left to right.
    LeftToRight,
    /// Right to left.
    RightToLeft,
    /// Top to bottom (vertical text).
    TopToBottom,
}

/// Parameters for shaping one run with one face.
#[derive(Debug, Clone, Copy)]
pub struct ShapeParams<'a> {
    /// Run direction.
    pub direction: RunDirection,
    /// ISO 15924 script tag, e.g. `*b"Arab"`.
    pub script: Option<[u8; 4]>,
    /// BCP 47 language tag.
    pub language: Option<&'a str>,
    /// OpenType feature overrides.
    pub features: &'a [FontFeature],
    /// Variation coordinates.
    pub variations: &'a [Variation],
}

/// One glyph produced by shaping, in font units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawGlyph {
    /// Glyph index (0 is `.notdef`).
    pub glyph: u32,
    /// Byte offset of the cluster start in the shaped text.
    pub cluster: usize,
    /// Advance along the run direction.
    pub advance: f32,
    /// Offset from the pen position.
    pub x_offset: f32,
    /// Offset from the baseline.
    pub y_offset: f32,
}

/// A parsed font face.
///
/// Implementations must be deterministic: identical inputs produce identical
/// outputs, which is what makes the cache's memoization sound.
pub trait FontFace: Send + Sync + fmt::Debug {
    /// Face metrics at the given variation coordinates.
    fn metrics(&self, variations: &[Variation]) -> FaceMetrics;

    /// Map a character (with an optional variation selector) to a glyph.
    /// Returns `0` when the character is not mapped.
    fn glyph_index(&self, c: char, variation_selector: Option<char>) -> u32;

    /// Reverse-map a glyph to the first character that produces it.
    fn char_for_glyph(&self, glyph: u32) -> Option<char>;

    /// All characters the face maps to a glyph.
    fn supported_chars(&self) -> Vec<char>;

    /// Horizontal advance of a glyph.
    fn glyph_advance(&self, glyph: u32, variations: &[Variation]) -> f32;

    /// Pair kerning from the face's own tables.
    fn kerning(&self, left: u32, right: u32) -> f32;

    /// Shape a run. Glyphs come back in logical order: clusters are
    /// non-decreasing regardless of direction.
    fn shape(&self, text: &str, params: &ShapeParams<'_>) -> Vec<RawGlyph>;

    /// OpenType feature tags the face declares.
    fn supported_features(&self) -> Vec<[u8; 4]>;

    /// Variation axes the face declares.
    fn supported_variations(&self) -> Vec<VariationAxis>;
}

/// Parses font source bytes into faces.
pub trait FaceLoader: Send + Sync + fmt::Debug {
    /// Load face `face_index` of a font collection (0 for single fonts).
    ///
    /// Fails with [`TextError::MalformedFontData`](crate::TextError::MalformedFontData)
    /// when the bytes cannot be parsed.
    fn load(&self, data: Arc<[u8]>, face_index: u32) -> TextResult<Arc<dyn FontFace>>;
}
