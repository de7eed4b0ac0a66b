//! Per-font configuration.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::config::TextEngineConfig;
use crate::types::{Antialiasing, Hinting, Transform2D, Variation};

/// Rendering configuration of a font.
#[derive(Debug, Clone, PartialEq)]
pub struct FontSettings {
    /// Face index within a font collection.
    pub face_index: u32,
    /// Variation coordinates.
    pub variations: Vec<Variation>,
    /// Synthetic bold strength, as a fraction of the pixel size.
    pub embolden: f32,
    /// Outline transform.
    pub transform: Transform2D,
    /// Hinting mode.
    pub hinting: Hinting,
    /// Antialiasing mode.
    pub antialiasing: Antialiasing,
    /// Oversampling factor; `None` follows the cache-wide setting.
    pub oversampling: Option<f32>,
    /// Render glyphs as multichannel signed distance fields.
    pub msdf: bool,
    /// MSDF distance range in pixels.
    pub msdf_pixel_range: u32,
    /// MSDF source glyph size in pixels.
    pub msdf_size: u32,
    /// Rasterize at this size and scale, for bitmap-strike fonts. 0 disables.
    pub fixed_size: u32,
    pub(crate) language_support: HashMap<String, bool>,
    pub(crate) script_support: HashMap<String, bool>,
}

impl FontSettings {
    pub(crate) fn from_config(config: &TextEngineConfig) -> Self {
        Self {
            face_index: 0,
            variations: Vec::new(),
            embolden: 0.0,
            transform: Transform2D::IDENTITY,
            hinting: config.hinting,
            antialiasing: config.antialiasing,
            oversampling: None,
            msdf: false,
            msdf_pixel_range: config.msdf_pixel_range,
            msdf_size: config.msdf_size,
            fixed_size: 0,
            language_support: HashMap::new(),
            script_support: HashMap::new(),
        }
    }
}

/// Settings a linked variation overrides on top of its parent.
///
/// `None` fields inherit the parent's value. A linked variation with an empty
/// overlay renders identically to its parent and shares its glyphs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub(crate) struct Overlay {
    pub variations: Option<Vec<Variation>>,
    pub embolden: Option<u32>,
    pub transform: Option<Transform2D>,
}

impl Overlay {
    /// Cache variant key. `0` means "same glyphs as the parent".
    pub fn variant(&self) -> u64 {
        if *self == Overlay::default() {
            return 0;
        }
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish().max(1)
    }

    pub fn embolden(&self) -> Option<f32> {
        self.embolden.map(f32::from_bits)
    }

    pub fn set_embolden(&mut self, strength: f32) {
        self.embolden = Some(strength.to_bits());
    }

    /// Apply the overlay to the parent's settings.
    pub fn apply(&self, mut settings: FontSettings) -> FontSettings {
        if let Some(variations) = &self.variations {
            settings.variations = variations.clone();
        }
        if let Some(embolden) = self.embolden() {
            settings.embolden = embolden;
        }
        if let Some(transform) = self.transform {
            settings.transform = transform;
        }
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_overlay_shares_parent_variant() {
        assert_eq!(Overlay::default().variant(), 0);
    }

    #[test]
    fn test_overlay_variant_tracks_content() {
        let mut a = Overlay::default();
        a.variations = Some(vec![Variation::new(*b"wght", 700.0)]);
        let mut b = a.clone();
        assert_eq!(a.variant(), b.variant());
        assert_ne!(a.variant(), 0);
        b.set_embolden(0.5);
        assert_ne!(a.variant(), b.variant());
    }

    #[test]
    fn test_overlay_applies_only_set_fields() {
        let base = FontSettings::from_config(&TextEngineConfig::default());
        let mut overlay = Overlay::default();
        overlay.transform = Some(Transform2D::skew_x(0.25));
        let applied = overlay.apply(base.clone());
        assert_eq!(applied.transform, Transform2D::skew_x(0.25));
        assert_eq!(applied.variations, base.variations);
        assert_eq!(applied.embolden, base.embolden);
    }
}
