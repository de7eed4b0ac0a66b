//! Per-size glyph caches.

use std::collections::HashMap;

use super::backend::FaceMetrics;
use super::texture::TexturePage;
use crate::types::{Rect, SizeKey, Vec2};

/// A glyph that has been rendered at one size.
///
/// Offsets and sizes are in display pixels (oversampling removed). The UV
/// rectangle is in texture page pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedGlyph {
    /// Glyph index.
    pub glyph: u32,
    /// Advance reported by the rasterizer.
    pub advance: Vec2,
    /// Top-left of the bitmap relative to the pen position, y down.
    pub offset: Vec2,
    /// Bitmap size in display pixels.
    pub size: Vec2,
    /// Index of the texture page holding the bitmap; `None` for blank glyphs.
    pub texture: Option<usize>,
    /// Location of the bitmap within its page.
    pub uv_rect: Rect,
}

/// Line metrics of a font at one size, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SizeMetrics {
    /// Distance from baseline to the top of the line.
    pub ascent: f32,
    /// Distance from baseline to the bottom of the line.
    pub descent: f32,
    /// Underline position below the baseline (positive is down).
    pub underline_position: f32,
    /// Underline thickness.
    pub underline_thickness: f32,
    /// Bitmap scale for fixed-size fonts, 1.0 otherwise.
    pub scale: f32,
}

/// A size metric that can be overridden per size cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SizeMetric {
    /// [`SizeMetrics::ascent`].
    Ascent,
    /// [`SizeMetrics::descent`].
    Descent,
    /// [`SizeMetrics::underline_position`].
    UnderlinePosition,
    /// [`SizeMetrics::underline_thickness`].
    UnderlineThickness,
    /// [`SizeMetrics::scale`].
    Scale,
}

#[derive(Debug)]
pub(crate) struct SizeCache {
    pub key: SizeKey,
    computed: SizeMetrics,
    overrides: HashMap<SizeMetric, f32>,
    pub glyphs: HashMap<u32, CachedGlyph>,
    pub kerning: HashMap<(u32, u32), Vec2>,
    pub textures: Vec<TexturePage>,
}

impl SizeCache {
    pub fn new(key: SizeKey, face: &FaceMetrics, fixed_size: u32) -> Self {
        let pixel = key.pixel_size as f32;
        let upem = f32::from(face.units_per_em.max(1));
        let px = pixel / upem;
        let scale = if fixed_size > 0 {
            pixel / fixed_size as f32
        } else {
            1.0
        };
        let computed = SizeMetrics {
            ascent: face.ascent * px,
            descent: face.descent * px,
            underline_position: -face.underline_position * px,
            underline_thickness: face.underline_thickness * px,
            scale,
        };
        tracing::debug!(
            target: "horizon_lattice_text::font",
            pixel_size = key.pixel_size,
            outline_size = key.outline_size,
            "created size cache"
        );
        Self {
            key,
            computed,
            overrides: HashMap::new(),
            glyphs: HashMap::new(),
            kerning: HashMap::new(),
            textures: Vec::new(),
        }
    }

    /// Metrics with overrides applied.
    pub fn metrics(&self) -> SizeMetrics {
        let get = |m: SizeMetric, v: f32| self.overrides.get(&m).copied().unwrap_or(v);
        SizeMetrics {
            ascent: get(SizeMetric::Ascent, self.computed.ascent),
            descent: get(SizeMetric::Descent, self.computed.descent),
            underline_position: get(SizeMetric::UnderlinePosition, self.computed.underline_position),
            underline_thickness: get(SizeMetric::UnderlineThickness, self.computed.underline_thickness),
            scale: get(SizeMetric::Scale, self.computed.scale),
        }
    }

    pub fn set_metric(&mut self, metric: SizeMetric, value: f32) {
        self.overrides.insert(metric, value);
    }

    /// Drop rendered glyphs together with the pages holding their bitmaps.
    pub fn clear_glyphs(&mut self) {
        self.glyphs.clear();
        self.textures.clear();
    }
}
