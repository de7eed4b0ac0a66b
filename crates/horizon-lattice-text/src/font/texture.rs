//! CPU-side texture pages holding packed glyph bitmaps.
//!
//! Pages use append-only shelf packing: each glyph goes on the shelf whose
//! height wastes the least space, and a new shelf is opened below the last
//! one when none fits. Allocations are never moved or reclaimed
//! individually, so a UV rectangle stays valid until its page is cleared.

use crate::raster::{PixelFormat, RasterizedGlyph};
use crate::types::Rect;

/// Padding between glyph allocations to prevent texture bleeding.
pub(crate) const GLYPH_PADDING: u32 = 1;

/// A shelf (horizontal row) in a page.
#[derive(Debug, Clone)]
struct Shelf {
    /// Y position of this shelf in the page.
    y: u32,
    /// Height of this shelf, padding included.
    height: u32,
    /// X position for the next allocation.
    cursor_x: u32,
}

impl Shelf {
    fn try_allocate(&mut self, padded_width: u32, padded_height: u32, page_width: u32) -> Option<(u32, u32)> {
        if padded_height > self.height || self.cursor_x + padded_width > page_width {
            return None;
        }
        let x = self.cursor_x;
        self.cursor_x += padded_width;
        Some((x, self.y))
    }
}

/// A 2D raster surface holding glyph bitmaps.
///
/// The pixel layout is given by [`format`](Self::format); a renderer uploads
/// [`data`](Self::data) as-is.
#[derive(Debug, Clone)]
pub struct TexturePage {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
    shelves: Vec<Shelf>,
    next_shelf_y: u32,
    glyph_count: usize,
    /// Bumped on every write so renderers can detect stale uploads.
    version: u64,
}

impl TexturePage {
    /// Create an empty page.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        let len = width as usize * height as usize * format.bytes_per_pixel();
        Self {
            width,
            height,
            format,
            data: vec![0; len],
            shelves: Vec::new(),
            next_shelf_y: 0,
            glyph_count: 0,
            version: 0,
        }
    }

    /// Page width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Page height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel format of the page.
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Raw pixel data, row-major.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Number of glyphs packed into the page.
    pub fn glyph_count(&self) -> usize {
        self.glyph_count
    }

    /// Modification counter.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Fraction of the page covered by shelves.
    pub fn usage(&self) -> f32 {
        let total = self.width as f32 * self.height as f32;
        if total == 0.0 {
            return 0.0;
        }
        let used: f32 = self
            .shelves
            .iter()
            .map(|s| s.cursor_x as f32 * s.height as f32)
            .sum();
        used / total
    }

    /// Reserve a `width` x `height` region. Returns its top-left corner.
    pub(crate) fn try_allocate(&mut self, width: u32, height: u32) -> Option<(u32, u32)> {
        let padded_width = width + GLYPH_PADDING;
        let padded_height = height + GLYPH_PADDING;
        if padded_width > self.width || padded_height > self.height {
            return None;
        }

        // Best fit by height among existing shelves.
        let best = self
            .shelves
            .iter()
            .enumerate()
            .filter(|(_, s)| padded_height <= s.height && self.width - s.cursor_x >= padded_width)
            .min_by_key(|(_, s)| s.height - padded_height)
            .map(|(idx, _)| idx);

        if let Some(idx) = best {
            return self.shelves[idx].try_allocate(padded_width, padded_height, self.width);
        }

        if self.next_shelf_y + padded_height <= self.height {
            let mut shelf = Shelf {
                y: self.next_shelf_y,
                height: padded_height,
                cursor_x: 0,
            };
            let result = shelf.try_allocate(padded_width, padded_height, self.width);
            self.next_shelf_y += padded_height;
            self.shelves.push(shelf);
            return result;
        }

        None
    }

    /// Copy a glyph bitmap into the page at `(x, y)`.
    ///
    /// The glyph must have this page's format and fit inside the page.
    pub(crate) fn blit(&mut self, x: u32, y: u32, glyph: &RasterizedGlyph) {
        let bpp = self.format.bytes_per_pixel();
        let row_len = glyph.width as usize * bpp;
        for row in 0..glyph.height as usize {
            let src_start = row * row_len;
            let Some(src) = glyph.data.get(src_start..src_start + row_len) else {
                break;
            };
            let dst_start = ((y as usize + row) * self.width as usize + x as usize) * bpp;
            if let Some(dst) = self.data.get_mut(dst_start..dst_start + row_len) {
                dst.copy_from_slice(src);
            }
        }
        self.glyph_count += 1;
        self.version += 1;
    }

    /// Rectangle of an allocation in page pixels.
    pub(crate) fn uv_rect(x: u32, y: u32, width: u32, height: u32) -> Rect {
        Rect::new(x as f32, y as f32, width as f32, height as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glyph(width: u32, height: u32, fill: u8) -> RasterizedGlyph {
        RasterizedGlyph {
            data: vec![fill; (width * height) as usize],
            width,
            height,
            offset_x: 0,
            offset_y: 0,
            advance: 0.0,
            format: PixelFormat::Alpha,
        }
    }

    #[test]
    fn test_allocations_never_overlap() {
        let mut page = TexturePage::new(64, 64, PixelFormat::Alpha);
        let mut rects = Vec::new();
        for (w, h) in [(10, 12), (7, 7), (20, 12), (5, 30), (9, 9), (31, 4)] {
            let (x, y) = page.try_allocate(w, h).unwrap();
            rects.push(TexturePage::uv_rect(x, y, w, h));
        }
        for (i, a) in rects.iter().enumerate() {
            for b in &rects[i + 1..] {
                assert!(!a.intersects(b), "{a:?} overlaps {b:?}");
            }
        }
    }

    #[test]
    fn test_best_fit_reuses_shelf() {
        let mut page = TexturePage::new(64, 64, PixelFormat::Alpha);
        assert_eq!(page.try_allocate(10, 10), Some((0, 0)));
        assert_eq!(page.try_allocate(10, 20), Some((0, 11)));
        // Fits on the first shelf with less waste than the second.
        assert_eq!(page.try_allocate(10, 8), Some((11, 0)));
    }

    #[test]
    fn test_full_page_rejects() {
        let mut page = TexturePage::new(16, 16, PixelFormat::Alpha);
        assert!(page.try_allocate(15, 15).is_some());
        assert!(page.try_allocate(2, 2).is_none());
        assert!(page.try_allocate(16, 1).is_none());
    }

    #[test]
    fn test_blit_copies_rows() {
        let mut page = TexturePage::new(8, 8, PixelFormat::Alpha);
        let (x, y) = page.try_allocate(2, 2).unwrap();
        page.blit(x, y, &glyph(2, 2, 200));
        assert_eq!(page.data()[0], 200);
        assert_eq!(page.data()[1], 200);
        assert_eq!(page.data()[2], 0);
        assert_eq!(page.data()[8], 200);
        assert_eq!(page.glyph_count(), 1);
        assert_eq!(page.version(), 1);
    }
}
