//! Render-on-demand: rasterize a glyph and pack it into a size cache.
//!
//! Callers hold the owning font's write lock while calling
//! [`render_into`], after re-checking that the glyph is still missing. That
//! is what guarantees one rasterization per glyph and size.

use super::{MsdfParams, PixelFormat, RasterError, RasterRequest, Rasterizer};
use crate::font::settings::FontSettings;
use crate::font::size_cache::{CachedGlyph, SizeCache};
use crate::font::texture::{GLYPH_PADDING, TexturePage};
use crate::types::{Rect, Vec2};

/// Inputs shared by every glyph rendered for one font and size.
pub(crate) struct RenderJob<'a> {
    pub data: &'a [u8],
    pub settings: &'a FontSettings,
    pub global_oversampling: f32,
    pub page_size: u32,
}

impl RenderJob<'_> {
    /// Rasterization size and pixel format for a display size.
    fn raster_target(&self, pixel_size: f32) -> (f32, PixelFormat, Option<MsdfParams>) {
        let settings = self.settings;
        if settings.msdf {
            let params = MsdfParams {
                pixel_range: settings.msdf_pixel_range,
            };
            return (settings.msdf_size as f32, PixelFormat::Msdf, Some(params));
        }
        let format = PixelFormat::for_antialiasing(settings.antialiasing);
        if settings.fixed_size > 0 {
            return (settings.fixed_size as f32, format, None);
        }
        let oversampling = settings.oversampling.unwrap_or(self.global_oversampling);
        (pixel_size * oversampling, format, None)
    }
}

/// Rasterize `glyph` and register it in `cache`.
pub(crate) fn render_into(
    cache: &mut SizeCache,
    rasterizer: &dyn Rasterizer,
    job: &RenderJob<'_>,
    glyph: u32,
) -> Result<CachedGlyph, RasterError> {
    let pixel_size = cache.key.pixel_size as f32;
    let (raster_size, format, msdf) = job.raster_target(pixel_size);
    let scale = if raster_size > 0.0 {
        pixel_size / raster_size
    } else {
        1.0
    };

    let request = RasterRequest {
        data: job.data,
        face_index: job.settings.face_index,
        glyph,
        pixel_size: raster_size,
        outline_size: cache.key.outline_size as f32 / scale,
        hinting: job.settings.hinting,
        antialiasing: job.settings.antialiasing,
        transform: job.settings.transform,
        embolden: job.settings.embolden,
        variations: &job.settings.variations,
        format,
        msdf,
    };
    let bitmap = rasterizer.rasterize(&request)?;

    let mut cached = CachedGlyph {
        glyph,
        advance: Vec2::new(bitmap.advance * scale, 0.0),
        offset: Vec2::new(bitmap.offset_x as f32 * scale, -bitmap.offset_y as f32 * scale),
        size: Vec2::new(bitmap.width as f32 * scale, bitmap.height as f32 * scale),
        texture: None,
        uv_rect: Rect::default(),
    };

    if !bitmap.is_empty() {
        let page_index = allocate(cache, job.page_size, glyph, &bitmap)?;
        let page = &mut cache.textures[page_index.0];
        let (x, y) = page_index.1;
        page.blit(x, y, &bitmap);
        cached.texture = Some(page_index.0);
        cached.uv_rect = TexturePage::uv_rect(x, y, bitmap.width, bitmap.height);
    }

    tracing::trace!(
        target: "horizon_lattice_text::raster",
        glyph,
        pixel_size = cache.key.pixel_size,
        texture = ?cached.texture,
        "rendered glyph"
    );
    cache.glyphs.insert(glyph, cached.clone());
    Ok(cached)
}

/// Find room for a bitmap, opening a new page when every page of the
/// matching format is full. Oversized glyphs get a page of their own.
fn allocate(
    cache: &mut SizeCache,
    page_size: u32,
    glyph: u32,
    bitmap: &super::RasterizedGlyph,
) -> Result<(usize, (u32, u32)), RasterError> {
    for (index, page) in cache.textures.iter_mut().enumerate() {
        if page.format() != bitmap.format {
            continue;
        }
        if let Some(pos) = page.try_allocate(bitmap.width, bitmap.height) {
            return Ok((index, pos));
        }
    }

    let needed = bitmap.width.max(bitmap.height).saturating_add(GLYPH_PADDING);
    let size = needed
        .checked_next_power_of_two()
        .ok_or(RasterError::GlyphFailed(glyph))?
        .max(page_size);
    let mut page = TexturePage::new(size, size, bitmap.format);
    let pos = page
        .try_allocate(bitmap.width, bitmap.height)
        .ok_or(RasterError::GlyphFailed(glyph))?;
    cache.textures.push(page);
    tracing::debug!(
        target: "horizon_lattice_text::raster",
        pixel_size = cache.key.pixel_size,
        page = cache.textures.len() - 1,
        size,
        format = ?bitmap.format,
        "allocated texture page"
    );
    Ok((cache.textures.len() - 1, pos))
}
