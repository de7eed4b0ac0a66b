//! Engine-wide configuration.

use crate::types::{Antialiasing, Hinting};

/// Default texture page edge length in pixels.
pub const DEFAULT_TEXTURE_PAGE_SIZE: u32 = 256;

/// Minimum texture page edge length in pixels.
pub const MIN_TEXTURE_PAGE_SIZE: u32 = 64;

/// Maximum texture page edge length in pixels.
pub const MAX_TEXTURE_PAGE_SIZE: u32 = 4096;

/// Configuration for a [`FontCache`](crate::FontCache).
///
/// Values here are the defaults new fonts start from. Global oversampling
/// can be changed later through
/// [`FontCache::set_global_oversampling`](crate::FontCache::set_global_oversampling),
/// which takes the same lock as other cache mutations.
///
/// # Example
///
/// ```
/// use horizon_lattice_text::{Hinting, TextEngineConfig};
///
/// let config = TextEngineConfig::new()
///     .texture_page_size(512)
///     .hinting(Hinting::None)
///     .global_oversampling(2.0);
/// assert_eq!(config.texture_page_size, 512);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TextEngineConfig {
    /// Edge length of newly allocated texture pages.
    pub texture_page_size: u32,
    /// Oversampling factor for fonts that do not set their own.
    pub global_oversampling: f32,
    /// Hinting for newly created fonts.
    pub hinting: Hinting,
    /// Antialiasing for newly created fonts.
    pub antialiasing: Antialiasing,
    /// MSDF distance range in pixels for fonts that enable MSDF.
    pub msdf_pixel_range: u32,
    /// MSDF source glyph size in pixels.
    pub msdf_size: u32,
    /// Character used for overrun ellipsis.
    pub ellipsis: char,
    /// Advance given to a tab past the last tab stop. `None` uses the
    /// width of a space in the tab's font.
    pub tab_minimal_advance: Option<f32>,
}

impl Default for TextEngineConfig {
    fn default() -> Self {
        Self {
            texture_page_size: DEFAULT_TEXTURE_PAGE_SIZE,
            global_oversampling: 1.0,
            hinting: Hinting::default(),
            antialiasing: Antialiasing::default(),
            msdf_pixel_range: 16,
            msdf_size: 48,
            ellipsis: '\u{2026}',
            tab_minimal_advance: None,
        }
    }
}

impl TextEngineConfig {
    /// Create a new configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the texture page size, clamped to the supported range.
    pub fn texture_page_size(mut self, size: u32) -> Self {
        self.texture_page_size = size.clamp(MIN_TEXTURE_PAGE_SIZE, MAX_TEXTURE_PAGE_SIZE);
        self
    }

    /// Set the global oversampling factor. Non-positive values reset it to 1.
    pub fn global_oversampling(mut self, factor: f32) -> Self {
        self.global_oversampling = sanitize_oversampling(factor);
        self
    }

    /// Set the default hinting mode.
    pub fn hinting(mut self, hinting: Hinting) -> Self {
        self.hinting = hinting;
        self
    }

    /// Set the default antialiasing mode.
    pub fn antialiasing(mut self, antialiasing: Antialiasing) -> Self {
        self.antialiasing = antialiasing;
        self
    }

    /// Set the default MSDF range and source size.
    pub fn msdf(mut self, pixel_range: u32, size: u32) -> Self {
        self.msdf_pixel_range = pixel_range.max(1);
        self.msdf_size = size.max(1);
        self
    }

    /// Set the ellipsis character.
    pub fn ellipsis(mut self, ellipsis: char) -> Self {
        self.ellipsis = ellipsis;
        self
    }

    /// Set a fixed advance for tabs past the last tab stop.
    pub fn tab_minimal_advance(mut self, advance: f32) -> Self {
        self.tab_minimal_advance = Some(advance.max(0.0));
        self
    }
}

pub(crate) fn sanitize_oversampling(factor: f32) -> f32 {
    if factor.is_finite() && factor > 0.0 {
        factor
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_is_clamped() {
        assert_eq!(TextEngineConfig::new().texture_page_size(1).texture_page_size, 64);
        assert_eq!(
            TextEngineConfig::new().texture_page_size(100_000).texture_page_size,
            4096
        );
    }

    #[test]
    fn test_bad_oversampling_resets() {
        assert_eq!(TextEngineConfig::new().global_oversampling(-3.0).global_oversampling, 1.0);
        assert_eq!(
            TextEngineConfig::new().global_oversampling(f32::NAN).global_oversampling,
            1.0
        );
    }
}
