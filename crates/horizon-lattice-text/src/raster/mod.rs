//! Glyph rasterization interface.
//!
//! The engine does not rasterize outlines itself. A [`Rasterizer`] receives
//! the font bytes plus everything that affects the bitmap and returns pixel
//! data; the [`bridge`] packs the result into texture pages of the owning
//! size cache. [`SwashRasterizer`] is the default implementation.
//!
//! Rasterizers must be deterministic for identical requests, since results
//! are memoized per glyph and size.

pub(crate) mod bridge;
mod swash_raster;

use std::fmt;

use thiserror::Error;

use crate::types::{Antialiasing, Hinting, Transform2D, Variation};

pub use self::swash_raster::SwashRasterizer;

/// Pixel layout of a rasterized glyph or texture page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PixelFormat {
    /// Single-channel 8-bit coverage.
    #[default]
    Alpha,
    /// Subpixel coverage, 4 bytes per pixel (RGB coverage plus padding).
    SubpixelRgba,
    /// Premultiplied color (bitmap or layered color glyphs).
    ColorRgba,
    /// Multichannel signed distance field, 4 bytes per pixel.
    Msdf,
}

impl PixelFormat {
    /// Get the number of bytes per pixel for this format.
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Alpha => 1,
            PixelFormat::SubpixelRgba | PixelFormat::ColorRgba | PixelFormat::Msdf => 4,
        }
    }

    /// Format requested for an antialiasing mode.
    pub fn for_antialiasing(antialiasing: Antialiasing) -> Self {
        match antialiasing {
            Antialiasing::None | Antialiasing::Gray => PixelFormat::Alpha,
            Antialiasing::Lcd => PixelFormat::SubpixelRgba,
        }
    }
}

/// MSDF generation parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MsdfParams {
    /// Distance range in pixels.
    pub pixel_range: u32,
}

/// Everything that determines a glyph bitmap.
#[derive(Debug, Clone, Copy)]
pub struct RasterRequest<'a> {
    /// Font source bytes.
    pub data: &'a [u8],
    /// Face index within a collection.
    pub face_index: u32,
    /// Glyph index.
    pub glyph: u32,
    /// Rasterization size in pixels (oversampling already applied).
    pub pixel_size: f32,
    /// Outline stroke width in pixels, 0 for filled glyphs.
    pub outline_size: f32,
    /// Hinting mode.
    pub hinting: Hinting,
    /// Antialiasing mode.
    pub antialiasing: Antialiasing,
    /// Outline transform.
    pub transform: Transform2D,
    /// Embolden strength, as a fraction of the pixel size.
    pub embolden: f32,
    /// Variation coordinates.
    pub variations: &'a [Variation],
    /// Requested pixel format.
    pub format: PixelFormat,
    /// MSDF parameters when `format` is [`PixelFormat::Msdf`].
    pub msdf: Option<MsdfParams>,
}

/// A rasterized glyph bitmap.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterizedGlyph {
    /// Pixel data, row-major, in `format`.
    pub data: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Horizontal bearing: bitmap left edge relative to the pen position.
    pub offset_x: i32,
    /// Vertical bearing: bitmap top edge above the baseline.
    pub offset_y: i32,
    /// Horizontal advance in pixels at the rasterization size.
    pub advance: f32,
    /// Pixel format of `data`.
    pub format: PixelFormat,
}

impl RasterizedGlyph {
    /// Whether the glyph has no visible pixels (e.g. a space).
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Convert alpha coverage to RGBA (white with alpha), for renderers that
    /// use a single RGBA atlas. Other formats are returned unchanged.
    pub fn to_rgba(&self) -> Vec<u8> {
        match self.format {
            PixelFormat::Alpha => self
                .data
                .iter()
                .flat_map(|&alpha| [255, 255, 255, alpha])
                .collect(),
            _ => self.data.clone(),
        }
    }
}

/// Errors reported by a rasterizer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RasterError {
    /// The font bytes could not be opened.
    #[error("rasterizer could not open the font")]
    InvalidFont,

    /// The rasterizer does not produce the requested format.
    #[error("pixel format {0:?} is not supported by this rasterizer")]
    UnsupportedFormat(PixelFormat),

    /// The glyph could not be rendered.
    #[error("glyph {0} could not be rendered")]
    GlyphFailed(u32),
}

/// Produces glyph bitmaps from font data.
pub trait Rasterizer: Send + Sync + fmt::Debug {
    /// Rasterize one glyph.
    fn rasterize(&self, request: &RasterRequest<'_>) -> Result<RasterizedGlyph, RasterError>;
}
