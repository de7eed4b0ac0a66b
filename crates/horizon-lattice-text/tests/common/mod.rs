//! Shared fixtures for the integration tests.
//!
//! Fonts are plain-text descriptors such as
//! `TESTFONT;upem=1000;advance=500;ranges=0020-007E,2026;liga=fi`
//! (a range may be a single code point), parsed by
//! [`TestLoader`]. Every mapped character uses its code point as glyph
//! index and every glyph has the same advance, so widths are easy to
//! predict: at 20px a 500-unit advance is 10px.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use horizon_lattice_text::font::{FaceLoader, FaceMetrics, FontFace, RawGlyph, ShapeParams};
use horizon_lattice_text::{
    FontCache, FontId, PixelFormat, RasterError, RasterRequest, RasterizedGlyph, Rasterizer, TextEngineConfig,
    TextError, TextResult, Variation, VariationAxis,
};

/// Glyph index of the `fi` ligature.
pub const LIGATURE_GLYPH: u32 = 0xF_0000;

/// Pixel size used by the fixtures: one glyph advance is 10px.
pub const SIZE: u32 = 20;

/// Latin, Hebrew, Arabic and the ellipsis.
pub const FULL_FONT: &str = "TESTFONT;upem=1000;advance=500;ranges=0020-007E,05D0-05EA,0600-06FF,2026-2026;liga=fi";

/// Latin only.
pub const LATIN_FONT: &str = "TESTFONT;upem=1000;advance=500;ranges=0020-007E";

/// Hebrew only, with wider glyphs.
pub const HEBREW_FONT: &str = "TESTFONT;upem=1000;advance=600;ranges=0020-0020,05D0-05EA";

#[derive(Debug)]
pub struct TestFace {
    upem: u16,
    advance: f32,
    ranges: Vec<(u32, u32)>,
    ligature: Option<(char, char)>,
}

impl TestFace {
    fn parse(text: &str) -> Option<Self> {
        let mut fields = text.split(';');
        if fields.next()? != "TESTFONT" {
            return None;
        }
        let mut face = TestFace {
            upem: 1000,
            advance: 500.0,
            ranges: Vec::new(),
            ligature: None,
        };
        for field in fields {
            let (key, value) = field.split_once('=')?;
            match key {
                "upem" => face.upem = value.parse().ok()?,
                "advance" => face.advance = value.parse().ok()?,
                "ranges" => {
                    for range in value.split(',') {
                        let (lo, hi) = range.split_once('-').unwrap_or((range, range));
                        let lo = u32::from_str_radix(lo, 16).ok()?;
                        let hi = u32::from_str_radix(hi, 16).ok()?;
                        face.ranges.push((lo, hi));
                    }
                }
                "liga" => {
                    let mut chars = value.chars();
                    face.ligature = Some((chars.next()?, chars.next()?));
                }
                _ => return None,
            }
        }
        Some(face)
    }

    fn maps(&self, c: char) -> bool {
        let cp = u32::from(c);
        self.ranges.iter().any(|&(lo, hi)| (lo..=hi).contains(&cp))
    }
}

impl FontFace for TestFace {
    fn metrics(&self, _variations: &[Variation]) -> FaceMetrics {
        FaceMetrics {
            units_per_em: self.upem,
            ascent: 800.0,
            descent: 200.0,
            line_gap: 0.0,
            underline_position: -100.0,
            underline_thickness: 50.0,
        }
    }

    fn glyph_index(&self, c: char, _variation_selector: Option<char>) -> u32 {
        if self.maps(c) { u32::from(c) } else { 0 }
    }

    fn char_for_glyph(&self, glyph: u32) -> Option<char> {
        char::from_u32(glyph).filter(|&c| self.maps(c))
    }

    fn supported_chars(&self) -> Vec<char> {
        self.ranges
            .iter()
            .flat_map(|&(lo, hi)| (lo..=hi).filter_map(char::from_u32))
            .collect()
    }

    fn glyph_advance(&self, _glyph: u32, _variations: &[Variation]) -> f32 {
        self.advance
    }

    fn kerning(&self, _left: u32, _right: u32) -> f32 {
        0.0
    }

    fn shape(&self, text: &str, params: &ShapeParams<'_>) -> Vec<RawGlyph> {
        let ligatures = !params.features.iter().any(|f| &f.tag == b"liga" && !f.is_enabled());
        let chars: Vec<(usize, char)> = text.char_indices().collect();
        let mut out = Vec::with_capacity(chars.len());
        let mut i = 0;
        while i < chars.len() {
            let (byte, c) = chars[i];
            let joined = ligatures
                && self
                    .ligature
                    .is_some_and(|(a, b)| c == a && chars.get(i + 1).is_some_and(|&(_, n)| n == b));
            let glyph = if joined { LIGATURE_GLYPH } else { self.glyph_index(c, None) };
            out.push(RawGlyph {
                glyph,
                cluster: byte,
                advance: self.advance,
                x_offset: 0.0,
                y_offset: 0.0,
            });
            i += if joined { 2 } else { 1 };
        }
        out
    }

    fn supported_features(&self) -> Vec<[u8; 4]> {
        if self.ligature.is_some() { vec![*b"liga"] } else { Vec::new() }
    }

    fn supported_variations(&self) -> Vec<VariationAxis> {
        Vec::new()
    }
}

/// Parses [`TestFace`] descriptors.
#[derive(Debug, Default)]
pub struct TestLoader;

impl FaceLoader for TestLoader {
    fn load(&self, data: Arc<[u8]>, _face_index: u32) -> TextResult<Arc<dyn FontFace>> {
        let text = std::str::from_utf8(&data).map_err(|e| TextError::MalformedFontData(e.to_string()))?;
        let face = TestFace::parse(text).ok_or_else(|| TextError::MalformedFontData("not a test font".into()))?;
        Ok(Arc::new(face))
    }
}

/// A rasterizer that counts its calls and records the last request.
///
/// Bitmaps are 4x6 blocks; spaces come back empty.
#[derive(Debug, Default)]
pub struct CountingRasterizer {
    calls: AtomicUsize,
    last: Mutex<Option<(u32, f32, PixelFormat)>>,
}

impl CountingRasterizer {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Glyph, pixel size and format of the last request.
    pub fn last(&self) -> Option<(u32, f32, PixelFormat)> {
        *self.last.lock()
    }
}

impl Rasterizer for CountingRasterizer {
    fn rasterize(&self, request: &RasterRequest<'_>) -> Result<RasterizedGlyph, RasterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock() = Some((request.glyph, request.pixel_size, request.format));
        let (width, height) = if request.glyph == u32::from(' ') { (0, 0) } else { (4, 6) };
        Ok(RasterizedGlyph {
            data: vec![255; (width * height) as usize * request.format.bytes_per_pixel()],
            width,
            height,
            offset_x: 0,
            offset_y: height as i32,
            advance: request.pixel_size / 2.0,
            format: request.format,
        })
    }
}

/// A font cache backed by the test loader and a counting rasterizer.
pub fn cache() -> (Arc<FontCache>, Arc<CountingRasterizer>) {
    cache_with(TextEngineConfig::default())
}

pub fn cache_with(config: TextEngineConfig) -> (Arc<FontCache>, Arc<CountingRasterizer>) {
    let rasterizer = Arc::new(CountingRasterizer::default());
    let cache = Arc::new(FontCache::new(config, Arc::new(TestLoader), rasterizer.clone()));
    (cache, rasterizer)
}

/// Create a font from a descriptor.
pub fn font(cache: &FontCache, descriptor: &str) -> FontId {
    let id = cache.create_font();
    cache
        .set_data(id, descriptor.as_bytes().to_vec())
        .expect("test font descriptor parses");
    id
}

/// Install a test log subscriber once per test binary.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}
