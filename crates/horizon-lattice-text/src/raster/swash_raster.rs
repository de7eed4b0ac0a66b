//! Default rasterizer backed by the `swash` scaler.

use parking_lot::Mutex;
use swash::scale::image::Content;
use swash::scale::{Render, ScaleContext, Source, StrikeWith};
use swash::zeno::{Format, Stroke, Transform};
use swash::{FontRef, Setting};

use super::{PixelFormat, RasterError, RasterRequest, RasterizedGlyph, Rasterizer};
use crate::types::{Antialiasing, Hinting};

/// Rasterizes outlines, bitmap strikes and color glyphs with `swash`.
///
/// The scale context holds reusable buffers and is not `Sync`, so it sits
/// behind a mutex. MSDF output is not supported.
pub struct SwashRasterizer {
    context: Mutex<ScaleContext>,
}

impl SwashRasterizer {
    /// Create a new rasterizer.
    pub fn new() -> Self {
        Self {
            context: Mutex::new(ScaleContext::new()),
        }
    }
}

impl Default for SwashRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SwashRasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwashRasterizer").finish_non_exhaustive()
    }
}

impl Rasterizer for SwashRasterizer {
    fn rasterize(&self, request: &RasterRequest<'_>) -> Result<RasterizedGlyph, RasterError> {
        if request.format == PixelFormat::Msdf {
            return Err(RasterError::UnsupportedFormat(PixelFormat::Msdf));
        }
        let font = FontRef::from_index(request.data, request.face_index as usize)
            .ok_or(RasterError::InvalidFont)?;
        let glyph_id = u16::try_from(request.glyph).map_err(|_| RasterError::GlyphFailed(request.glyph))?;

        let variations: Vec<Setting<f32>> = request
            .variations
            .iter()
            .map(|v| Setting {
                tag: swash::tag_from_bytes(&v.tag),
                value: v.value,
            })
            .collect();

        let format = match request.format {
            PixelFormat::SubpixelRgba => Format::Subpixel,
            _ => Format::Alpha,
        };
        let sources = [
            Source::ColorOutline(0),
            Source::ColorBitmap(StrikeWith::BestFit),
            Source::Outline,
            Source::Bitmap(StrikeWith::BestFit),
        ];

        let image = {
            let mut context = self.context.lock();
            let mut scaler = context
                .builder(font)
                .size(request.pixel_size)
                .hint(request.hinting != Hinting::None)
                .variations(variations.iter().copied())
                .build();

            let mut render = Render::new(&sources);
            render.format(format);
            if request.embolden > 0.0 {
                render.embolden(request.embolden * request.pixel_size);
            }
            if !request.transform.is_identity() {
                let t = request.transform;
                render.transform(Some(Transform {
                    xx: t.xx,
                    xy: t.xy,
                    yx: t.yx,
                    yy: t.yy,
                    x: t.x,
                    y: t.y,
                }));
            }
            if request.outline_size > 0.0 {
                render.style(Stroke::new(request.outline_size));
            }
            render.render(&mut scaler, glyph_id)
        }
        .ok_or(RasterError::GlyphFailed(request.glyph))?;

        let advance = font
            .glyph_metrics(&[])
            .scale(request.pixel_size)
            .advance_width(glyph_id);

        let (format, mut data) = match image.content {
            Content::Mask => (PixelFormat::Alpha, image.data),
            Content::SubpixelMask => (PixelFormat::SubpixelRgba, image.data),
            Content::Color => (PixelFormat::ColorRgba, image.data),
        };
        if request.antialiasing == Antialiasing::None && format == PixelFormat::Alpha {
            for px in &mut data {
                *px = if *px >= 128 { 255 } else { 0 };
            }
        }

        Ok(RasterizedGlyph {
            data,
            width: image.placement.width,
            height: image.placement.height,
            offset_x: image.placement.left,
            offset_y: image.placement.top,
            advance,
            format,
        })
    }
}
