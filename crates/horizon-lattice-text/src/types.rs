//! Common value types shared by the font cache, shaper and layout engine.

use std::hash::{Hash, Hasher};

/// Paragraph or run direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    /// Resolve from the first strong directional character.
    #[default]
    Auto,
    /// Left-to-right.
    Ltr,
    /// Right-to-left.
    Rtl,
    /// Take the direction of the enclosing context.
    ///
    /// Substrings inherit their parent's resolved direction. A top-level
    /// buffer has no context and resolves like [`Direction::Auto`].
    Inherited,
}

impl Direction {
    /// Whether this is an explicit right-to-left direction.
    pub fn is_rtl(self) -> bool {
        matches!(self, Direction::Rtl)
    }

    /// Direction implied by a bidi embedding level.
    pub fn from_level(level: u8) -> Self {
        if level % 2 == 1 {
            Direction::Rtl
        } else {
            Direction::Ltr
        }
    }
}

/// Text flow orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Orientation {
    /// Lines run left to right (or right to left).
    #[default]
    Horizontal,
    /// Lines run top to bottom.
    Vertical,
}

/// Outline hinting applied by the rasterizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Hinting {
    /// No hinting.
    None,
    /// Vertical-only hinting.
    #[default]
    Light,
    /// Full hinting.
    Normal,
}

/// Antialiasing mode used when rasterizing glyphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Antialiasing {
    /// Monochrome coverage (thresholded alpha).
    None,
    /// 8-bit grayscale coverage.
    #[default]
    Gray,
    /// Subpixel (LCD) coverage, one channel per subpixel.
    Lcd,
}

/// An OpenType font feature setting.
///
/// # Example
///
/// ```
/// use horizon_lattice_text::FontFeature;
///
/// let no_liga = FontFeature::new(*b"liga", 0);
/// assert!(!no_liga.is_enabled());
/// assert_eq!(FontFeature::KERNING.tag_str(), "kern");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FontFeature {
    /// The 4-character OpenType feature tag.
    pub tag: [u8; 4],
    /// The feature value (0 = disabled, 1 = enabled, or higher for alternates).
    pub value: u32,
}

impl FontFeature {
    /// Standard ligatures (liga).
    pub const LIGATURES: Self = Self::new(*b"liga", 1);
    /// Disable standard ligatures.
    pub const NO_LIGATURES: Self = Self::new(*b"liga", 0);
    /// Kerning (kern).
    pub const KERNING: Self = Self::new(*b"kern", 1);
    /// Disable kerning.
    pub const NO_KERNING: Self = Self::new(*b"kern", 0);
    /// Contextual alternates (calt).
    pub const CONTEXTUAL_ALTERNATES: Self = Self::new(*b"calt", 1);
    /// Tabular figures (tnum).
    pub const TABULAR_FIGURES: Self = Self::new(*b"tnum", 1);

    /// Create a new font feature with the given tag and value.
    pub const fn new(tag: [u8; 4], value: u32) -> Self {
        Self { tag, value }
    }

    /// Create a font feature from a string tag.
    ///
    /// The tag must be exactly 4 ASCII characters.
    pub fn from_tag_str(tag: &str, value: u32) -> Option<Self> {
        let bytes: [u8; 4] = tag.as_bytes().try_into().ok()?;
        bytes.is_ascii().then_some(Self::new(bytes, value))
    }

    /// Get the feature tag as a string.
    pub fn tag_str(&self) -> &str {
        std::str::from_utf8(&self.tag).unwrap_or("????")
    }

    /// Check if this feature is enabled (value > 0).
    pub fn is_enabled(&self) -> bool {
        self.value > 0
    }
}

/// A variable font axis coordinate in design units (e.g. `wght` = 700).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Variation {
    /// Axis tag.
    pub tag: [u8; 4],
    /// Axis value in design units.
    pub value: f32,
}

impl Variation {
    /// Create a new variation coordinate.
    pub const fn new(tag: [u8; 4], value: f32) -> Self {
        Self { tag, value }
    }
}

impl Eq for Variation {}

impl Hash for Variation {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.tag.hash(state);
        self.value.to_bits().hash(state);
    }
}

/// Description of a variation axis exposed by a font.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariationAxis {
    /// Axis tag.
    pub tag: [u8; 4],
    /// Minimum value.
    pub min: f32,
    /// Default value.
    pub default: f32,
    /// Maximum value.
    pub max: f32,
}

/// A 2D affine transform applied to glyph outlines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform2D {
    /// X scale.
    pub xx: f32,
    /// Y shear contribution to x.
    pub xy: f32,
    /// X shear contribution to y.
    pub yx: f32,
    /// Y scale.
    pub yy: f32,
    /// X translation.
    pub x: f32,
    /// Y translation.
    pub y: f32,
}

impl Transform2D {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        xx: 1.0,
        xy: 0.0,
        yx: 0.0,
        yy: 1.0,
        x: 0.0,
        y: 0.0,
    };

    /// A horizontal shear, used for synthetic oblique faces.
    pub fn skew_x(factor: f32) -> Self {
        Self {
            xy: factor,
            ..Self::IDENTITY
        }
    }

    /// Whether this transform leaves outlines unchanged.
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

impl Default for Transform2D {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Eq for Transform2D {}

impl Hash for Transform2D {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for v in [self.xx, self.xy, self.yx, self.yy, self.x, self.y] {
            v.to_bits().hash(state);
        }
    }
}

/// A 2D vector in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    /// X component.
    pub x: f32,
    /// Y component.
    pub y: f32,
}

impl Vec2 {
    /// The zero vector.
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Create a new vector.
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle in pixels, y pointing down.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
}

impl Rect {
    /// Create a new rectangle.
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge.
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Bottom edge.
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Whether the rectangle covers no area.
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Check if a point lies inside the rectangle.
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }

    /// Check if two rectangles share any area.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

/// Vertical alignment of an inline object relative to the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InlineVerticalAlign {
    /// Bottom edge sits on the baseline.
    #[default]
    Baseline,
    /// Top edge aligns with the line's ascent.
    Top,
    /// Centered between ascent and descent.
    Middle,
    /// Bottom edge aligns with the line's descent.
    Bottom,
}

/// Identifies one size cache within a font.
///
/// `outline_size` is the stroke width used for outlined text; plain text
/// uses `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SizeKey {
    /// Pixel size.
    pub pixel_size: u32,
    /// Outline size.
    pub outline_size: u32,
}

impl SizeKey {
    /// A size key for plain (non-outlined) text.
    pub const fn new(pixel_size: u32) -> Self {
        Self {
            pixel_size,
            outline_size: 0,
        }
    }

    /// A size key for outlined text.
    pub const fn outlined(pixel_size: u32, outline_size: u32) -> Self {
        Self {
            pixel_size,
            outline_size,
        }
    }
}

/// Caller-chosen key identifying an inline object within a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey(pub u64);

impl From<u64> for ObjectKey {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Extra spacing applied to a shaped buffer, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Spacing {
    /// Added after every grapheme cluster.
    pub glyph: f32,
    /// Added after every whitespace cluster.
    pub space: f32,
    /// Added above the line (increases ascent).
    pub top: f32,
    /// Added below the line (increases descent).
    pub bottom: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_from_tag_str() {
        let f = FontFeature::from_tag_str("smcp", 1).unwrap();
        assert_eq!(f.tag, *b"smcp");
        assert!(FontFeature::from_tag_str("toolong", 1).is_none());
        assert!(FontFeature::from_tag_str("ab", 1).is_none());
    }

    #[test]
    fn test_direction_from_level() {
        assert_eq!(Direction::from_level(0), Direction::Ltr);
        assert_eq!(Direction::from_level(1), Direction::Rtl);
        assert_eq!(Direction::from_level(2), Direction::Ltr);
    }

    #[test]
    fn test_rect_queries() {
        let r = Rect::new(10.0, 0.0, 20.0, 5.0);
        assert_eq!(r.right(), 30.0);
        assert!(r.contains(Vec2::new(10.0, 1.0)));
        assert!(!r.contains(Vec2::new(30.0, 1.0)));
        assert!(r.intersects(&Rect::new(29.0, 4.0, 5.0, 5.0)));
        assert!(!r.intersects(&Rect::new(30.0, 0.0, 5.0, 5.0)));
    }

    #[test]
    fn test_transform_identity() {
        assert!(Transform2D::default().is_identity());
        assert!(!Transform2D::skew_x(0.2).is_identity());
    }
}
