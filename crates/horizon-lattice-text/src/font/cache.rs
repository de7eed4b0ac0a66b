//! The font cache: font handles, configuration and per-size glyph caches.
//!
//! # Locking
//!
//! The handle table sits behind one `RwLock` and every font owns another
//! around its state. Locks are always taken table first, and the table lock
//! is released as soon as the font's `Arc` has been cloned out, so work on
//! one font never blocks lookups of another.
//!
//! Glyph lookups take the font's read lock. First-time rasterization and
//! size cache creation release it, take the write lock and check again
//! before doing any work, so two threads racing on the same missing glyph
//! rasterize it once and both observe the same record.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use super::backend::{FaceLoader, FaceMetrics, FontFace};
use super::opentype::OpenTypeLoader;
use super::settings::{FontSettings, Overlay};
use super::size_cache::{CachedGlyph, SizeCache, SizeMetric, SizeMetrics};
use super::texture::TexturePage;
use crate::config::{TextEngineConfig, sanitize_oversampling};
use crate::error::{TextError, TextResult};
use crate::handle::{FontId, HandleTable};
use crate::raster::bridge::{self, RenderJob};
use crate::raster::{Rasterizer, SwashRasterizer};
use crate::types::{Antialiasing, Hinting, SizeKey, Transform2D, Variation, VariationAxis, Vec2};

static_assertions::assert_impl_all!(FontCache: Send, Sync);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheSlot {
    size: SizeKey,
    variant: u64,
}

struct FontState {
    settings: FontSettings,
    data: Option<Arc<[u8]>>,
    face: Option<Arc<dyn FontFace>>,
    sizes: HashMap<CacheSlot, SizeCache>,
}

impl FontState {
    fn clear_all_sizes(&mut self) {
        self.sizes.clear();
    }

    fn clear_all_glyphs(&mut self) {
        for cache in self.sizes.values_mut() {
            cache.clear_glyphs();
        }
    }

    fn clear_variant(&mut self, variant: u64) {
        if variant != 0 {
            self.sizes.retain(|slot, _| slot.variant != variant);
        }
    }
}

struct BaseFont {
    state: RwLock<FontState>,
}

struct LinkedFont {
    parent: FontId,
    base: Weak<BaseFont>,
    overlay: RwLock<Overlay>,
}

enum FontEntry {
    Base(Arc<BaseFont>),
    Linked(LinkedFont),
}

/// A font resolved to the storage that holds its glyphs.
struct Resolved {
    base: Arc<BaseFont>,
    overlay: Option<Overlay>,
}

impl Resolved {
    fn variant(&self) -> u64 {
        self.overlay.as_ref().map_or(0, Overlay::variant)
    }

    fn slot(&self, size: SizeKey) -> CacheSlot {
        CacheSlot {
            size,
            variant: self.variant(),
        }
    }

    fn settings(&self, state: &FontState) -> FontSettings {
        match &self.overlay {
            Some(overlay) => overlay.apply(state.settings.clone()),
            None => state.settings.clone(),
        }
    }

    fn variations<'a>(&'a self, state: &'a FontState) -> &'a [Variation] {
        self.overlay
            .as_ref()
            .and_then(|o| o.variations.as_deref())
            .unwrap_or(&state.settings.variations)
    }
}

/// Everything the shaper needs from one font at one size.
#[derive(Clone)]
pub(crate) struct ShapingFont {
    pub face: Arc<dyn FontFace>,
    pub variations: Vec<Variation>,
    pub units_per_em: f32,
    pub metrics: SizeMetrics,
    pub kerning: HashMap<(u32, u32), Vec2>,
}

impl ShapingFont {
    /// Pixels per font unit.
    pub fn px_per_unit(&self, pixel_size: u32) -> f32 {
        pixel_size as f32 / self.units_per_em.max(1.0)
    }
}

fn ensure_size<'a>(
    sizes: &'a mut HashMap<CacheSlot, SizeCache>,
    face: &Option<Arc<dyn FontFace>>,
    variations: &[Variation],
    fixed_size: u32,
    slot: CacheSlot,
) -> TextResult<&'a mut SizeCache> {
    let face = face.as_ref().ok_or(TextError::NoFontData)?;
    Ok(sizes
        .entry(slot)
        .or_insert_with(|| SizeCache::new(slot.size, &face.metrics(variations), fixed_size)))
}

/// Font handle table plus per-font glyph caches.
///
/// # Example
///
/// ```no_run
/// use horizon_lattice_text::{FontCache, SizeKey};
///
/// let cache = FontCache::with_defaults();
/// let font = cache.create_font();
/// cache.set_data(font, std::fs::read("DejaVuSans.ttf").unwrap()).unwrap();
///
/// let size = SizeKey::new(16);
/// let glyph = cache.glyph_index(font, size, 'A', None);
/// let rendered = cache.render_glyph(font, size, glyph).unwrap();
/// println!("glyph {glyph} lives on page {:?}", rendered.texture);
/// ```
pub struct FontCache {
    config: TextEngineConfig,
    global_oversampling: RwLock<f32>,
    loader: Arc<dyn FaceLoader>,
    rasterizer: Arc<dyn Rasterizer>,
    fonts: RwLock<HandleTable<FontId, Arc<FontEntry>>>,
}

impl std::fmt::Debug for FontCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontCache")
            .field("fonts", &self.fonts.read().len())
            .field("loader", &self.loader)
            .field("rasterizer", &self.rasterizer)
            .finish()
    }
}

impl FontCache {
    /// Create a cache with explicit backends.
    pub fn new(
        config: TextEngineConfig,
        loader: Arc<dyn FaceLoader>,
        rasterizer: Arc<dyn Rasterizer>,
    ) -> Self {
        Self {
            global_oversampling: RwLock::new(config.global_oversampling),
            config,
            loader,
            rasterizer,
            fonts: RwLock::new(HandleTable::new("font")),
        }
    }

    /// Create a cache using the OpenType loader and the swash rasterizer.
    pub fn with_defaults() -> Self {
        Self::new(
            TextEngineConfig::default(),
            Arc::new(OpenTypeLoader),
            Arc::new(SwashRasterizer::new()),
        )
    }

    /// The configuration the cache was created with.
    pub fn config(&self) -> &TextEngineConfig {
        &self.config
    }

    // -------------------------------------------------------------------------
    // Handles
    // -------------------------------------------------------------------------

    /// Create an empty font. It has no glyphs until [`set_data`](Self::set_data).
    pub fn create_font(&self) -> FontId {
        let state = FontState {
            settings: FontSettings::from_config(&self.config),
            data: None,
            face: None,
            sizes: HashMap::new(),
        };
        let entry = FontEntry::Base(Arc::new(BaseFont {
            state: RwLock::new(state),
        }));
        let id = self.fonts.write().insert(Arc::new(entry));
        tracing::debug!(target: "horizon_lattice_text::font", ?id, "created font");
        id
    }

    /// Create a linked variation of `parent`.
    ///
    /// The variation shares the parent's data, size caches and glyphs, and
    /// can override variation coordinates, embolden and transform. Linking
    /// to a linked variation links to its parent and copies its overrides.
    pub fn create_linked_variation(&self, parent: FontId) -> TextResult<FontId> {
        let mut fonts = self.fonts.write();
        let (parent, base, overlay) = match &**fonts.get(parent)? {
            FontEntry::Base(base) => (parent, Arc::downgrade(base), Overlay::default()),
            FontEntry::Linked(linked) => (linked.parent, linked.base.clone(), linked.overlay.read().clone()),
        };
        let id = fonts.insert(Arc::new(FontEntry::Linked(LinkedFont {
            parent,
            base,
            overlay: RwLock::new(overlay),
        })));
        tracing::debug!(target: "horizon_lattice_text::font", ?id, ?parent, "created linked variation");
        Ok(id)
    }

    /// Free a font.
    ///
    /// Fails with [`TextError::LinkedVariationsAlive`] while linked
    /// variations of the font exist.
    pub fn free_font(&self, id: FontId) -> TextResult<()> {
        let mut fonts = self.fonts.write();
        if let FontEntry::Base(_) = &**fonts.get(id)? {
            let count = fonts
                .iter()
                .filter(|(_, e)| matches!(&***e, FontEntry::Linked(l) if l.parent == id))
                .count();
            if count > 0 {
                return Err(TextError::LinkedVariationsAlive { count });
            }
        }
        fonts.remove(id)?;
        tracing::debug!(target: "horizon_lattice_text::font", ?id, "freed font");
        Ok(())
    }

    /// Whether the handle refers to a live font.
    pub fn is_valid(&self, id: FontId) -> bool {
        self.fonts.read().contains(id)
    }

    /// Parent of a linked variation, `None` for ordinary fonts.
    pub fn linked_parent(&self, id: FontId) -> TextResult<Option<FontId>> {
        Ok(match &**self.fonts.read().get(id)? {
            FontEntry::Base(_) => None,
            FontEntry::Linked(linked) => Some(linked.parent),
        })
    }

    fn entry(&self, id: FontId) -> TextResult<Arc<FontEntry>> {
        self.fonts.read().get(id).cloned()
    }

    fn resolve(&self, id: FontId) -> TextResult<Resolved> {
        match &*self.entry(id)? {
            FontEntry::Base(base) => Ok(Resolved {
                base: base.clone(),
                overlay: None,
            }),
            FontEntry::Linked(linked) => Ok(Resolved {
                base: linked
                    .base
                    .upgrade()
                    .ok_or(TextError::InvalidHandle { kind: "font" })?,
                overlay: Some(linked.overlay.read().clone()),
            }),
        }
    }

    /// Run `f` on the font's state under its write lock.
    fn update<R>(&self, id: FontId, f: impl FnOnce(&mut FontState) -> R) -> TextResult<R> {
        let resolved = self.resolve(id)?;
        let mut state = resolved.base.state.write();
        Ok(f(&mut state))
    }

    fn read<R>(&self, id: FontId, f: impl FnOnce(&Resolved, &FontState) -> R) -> TextResult<R> {
        let resolved = self.resolve(id)?;
        let state = resolved.base.state.read();
        Ok(f(&resolved, &state))
    }

    /// Change a linked variation's overlay, or the base setting otherwise.
    fn update_overlayable(
        &self,
        id: FontId,
        apply_overlay: impl FnOnce(&mut Overlay),
        apply_base: impl FnOnce(&mut FontState),
    ) -> TextResult<()> {
        match &*self.entry(id)? {
            FontEntry::Base(base) => {
                apply_base(&mut base.state.write());
            }
            FontEntry::Linked(linked) => {
                let base = linked
                    .base
                    .upgrade()
                    .ok_or(TextError::InvalidHandle { kind: "font" })?;
                let mut overlay = linked.overlay.write();
                let old_variant = overlay.variant();
                apply_overlay(&mut overlay);
                if overlay.variant() != old_variant {
                    base.state.write().clear_variant(old_variant);
                }
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Source data and configuration
    // -------------------------------------------------------------------------

    /// Replace the font's source bytes.
    ///
    /// All size caches are dropped. Malformed data is rejected and the font
    /// keeps its previous data. On a linked variation this replaces the
    /// parent's data.
    pub fn set_data(&self, id: FontId, data: impl Into<Arc<[u8]>>) -> TextResult<()> {
        let data = data.into();
        let resolved = self.resolve(id)?;
        let face_index = resolved.base.state.read().settings.face_index;
        let face = self.loader.load(data.clone(), face_index).inspect_err(|err| {
            tracing::warn!(target: "horizon_lattice_text::font", ?id, %err, "rejected font data");
        })?;
        let mut state = resolved.base.state.write();
        state.data = Some(data);
        state.face = Some(face);
        state.clear_all_sizes();
        tracing::debug!(target: "horizon_lattice_text::font", ?id, "set font data");
        Ok(())
    }

    /// Whether the font has source data.
    pub fn has_data(&self, id: FontId) -> TextResult<bool> {
        self.read(id, |_, s| s.face.is_some())
    }

    /// Select a face of a font collection. Reloads the face when data is set.
    pub fn set_face_index(&self, id: FontId, face_index: u32) -> TextResult<()> {
        let resolved = self.resolve(id)?;
        let data = resolved.base.state.read().data.clone();
        let face = match data {
            Some(data) => Some(self.loader.load(data, face_index)?),
            None => None,
        };
        let mut state = resolved.base.state.write();
        state.settings.face_index = face_index;
        if face.is_some() {
            state.face = face;
        }
        state.clear_all_sizes();
        Ok(())
    }

    /// Face index within the collection.
    pub fn face_index(&self, id: FontId) -> TextResult<u32> {
        self.read(id, |_, s| s.settings.face_index)
    }

    /// Set variation coordinates. Drops size caches, since line metrics
    /// depend on them.
    pub fn set_variation_coordinates(&self, id: FontId, variations: Vec<Variation>) -> TextResult<()> {
        self.update_overlayable(
            id,
            |o| o.variations = Some(variations.clone()),
            |s| {
                s.settings.variations = variations.clone();
                s.clear_all_sizes();
            },
        )
    }

    /// Effective variation coordinates.
    pub fn variation_coordinates(&self, id: FontId) -> TextResult<Vec<Variation>> {
        self.read(id, |r, s| r.variations(s).to_vec())
    }

    /// Set synthetic bold strength. Drops rendered glyphs.
    pub fn set_embolden(&self, id: FontId, strength: f32) -> TextResult<()> {
        self.update_overlayable(
            id,
            |o| o.set_embolden(strength),
            |s| {
                s.settings.embolden = strength;
                s.clear_all_glyphs();
            },
        )
    }

    /// Effective embolden strength.
    pub fn embolden(&self, id: FontId) -> TextResult<f32> {
        self.read(id, |r, s| r.settings(s).embolden)
    }

    /// Set the outline transform. Drops rendered glyphs.
    pub fn set_transform(&self, id: FontId, transform: Transform2D) -> TextResult<()> {
        self.update_overlayable(
            id,
            |o| o.transform = Some(transform),
            |s| {
                s.settings.transform = transform;
                s.clear_all_glyphs();
            },
        )
    }

    /// Effective outline transform.
    pub fn transform(&self, id: FontId) -> TextResult<Transform2D> {
        self.read(id, |r, s| r.settings(s).transform)
    }

    /// Set the hinting mode. Drops rendered glyphs.
    pub fn set_hinting(&self, id: FontId, hinting: Hinting) -> TextResult<()> {
        self.update(id, |s| {
            if s.settings.hinting != hinting {
                s.settings.hinting = hinting;
                s.clear_all_glyphs();
            }
        })
    }

    /// Hinting mode.
    pub fn hinting(&self, id: FontId) -> TextResult<Hinting> {
        self.read(id, |_, s| s.settings.hinting)
    }

    /// Set the antialiasing mode. Drops rendered glyphs.
    pub fn set_antialiasing(&self, id: FontId, antialiasing: Antialiasing) -> TextResult<()> {
        self.update(id, |s| {
            if s.settings.antialiasing != antialiasing {
                s.settings.antialiasing = antialiasing;
                s.clear_all_glyphs();
            }
        })
    }

    /// Antialiasing mode.
    pub fn antialiasing(&self, id: FontId) -> TextResult<Antialiasing> {
        self.read(id, |_, s| s.settings.antialiasing)
    }

    /// Set a per-font oversampling factor, or `None` to follow the global
    /// factor. Drops rendered glyphs.
    pub fn set_oversampling(&self, id: FontId, oversampling: Option<f32>) -> TextResult<()> {
        let oversampling = oversampling.map(sanitize_oversampling);
        self.update(id, |s| {
            if s.settings.oversampling != oversampling {
                s.settings.oversampling = oversampling;
                s.clear_all_glyphs();
            }
        })
    }

    /// Per-font oversampling factor.
    pub fn oversampling(&self, id: FontId) -> TextResult<Option<f32>> {
        self.read(id, |_, s| s.settings.oversampling)
    }

    /// Enable or disable MSDF rendering. Drops rendered glyphs.
    pub fn set_msdf(&self, id: FontId, enabled: bool) -> TextResult<()> {
        self.update(id, |s| {
            if s.settings.msdf != enabled {
                s.settings.msdf = enabled;
                s.clear_all_glyphs();
            }
        })
    }

    /// Whether MSDF rendering is enabled.
    pub fn is_msdf(&self, id: FontId) -> TextResult<bool> {
        self.read(id, |_, s| s.settings.msdf)
    }

    /// Set MSDF distance range and source size. Drops rendered glyphs.
    pub fn set_msdf_params(&self, id: FontId, pixel_range: u32, size: u32) -> TextResult<()> {
        self.update(id, |s| {
            s.settings.msdf_pixel_range = pixel_range.max(1);
            s.settings.msdf_size = size.max(1);
            s.clear_all_glyphs();
        })
    }

    /// MSDF distance range and source size.
    pub fn msdf_params(&self, id: FontId) -> TextResult<(u32, u32)> {
        self.read(id, |_, s| (s.settings.msdf_pixel_range, s.settings.msdf_size))
    }

    /// Rasterize at a fixed size and scale bitmaps to the requested size.
    /// `0` disables. Drops size caches.
    pub fn set_fixed_size(&self, id: FontId, fixed_size: u32) -> TextResult<()> {
        self.update(id, |s| {
            s.settings.fixed_size = fixed_size;
            s.clear_all_sizes();
        })
    }

    /// Fixed rasterization size, `0` when disabled.
    pub fn fixed_size(&self, id: FontId) -> TextResult<u32> {
        self.read(id, |_, s| s.settings.fixed_size)
    }

    /// Change the oversampling factor used by fonts without their own.
    ///
    /// Glyphs of those fonts are dropped and re-rendered on next use.
    pub fn set_global_oversampling(&self, factor: f32) {
        let factor = sanitize_oversampling(factor);
        {
            let mut global = self.global_oversampling.write();
            if *global == factor {
                return;
            }
            *global = factor;
        }
        let fonts = self.fonts.read();
        for (_, entry) in fonts.iter() {
            if let FontEntry::Base(base) = &**entry {
                let mut state = base.state.write();
                if state.settings.oversampling.is_none() {
                    state.clear_all_glyphs();
                }
            }
        }
        tracing::debug!(target: "horizon_lattice_text::font", factor, "changed global oversampling");
    }

    /// Oversampling factor used by fonts without their own.
    pub fn global_oversampling(&self) -> f32 {
        *self.global_oversampling.read()
    }

    // -------------------------------------------------------------------------
    // Language and script support overrides
    // -------------------------------------------------------------------------

    /// Force the font to be considered (un)suitable for a language during
    /// fallback.
    pub fn set_language_support_override(&self, id: FontId, language: &str, supported: bool) -> TextResult<()> {
        self.update(id, |s| {
            s.settings.language_support.insert(language.to_owned(), supported);
        })
    }

    /// Remove a language support override.
    pub fn remove_language_support_override(&self, id: FontId, language: &str) -> TextResult<()> {
        self.update(id, |s| {
            s.settings.language_support.remove(language);
        })
    }

    /// Languages with an override.
    pub fn language_support_overrides(&self, id: FontId) -> TextResult<Vec<String>> {
        self.read(id, |_, s| {
            let mut langs: Vec<String> = s.settings.language_support.keys().cloned().collect();
            langs.sort();
            langs
        })
    }

    /// Whether the font may be used for `language`. Defaults to `true`.
    pub fn is_language_supported(&self, id: FontId, language: &str) -> TextResult<bool> {
        self.read(id, |_, s| s.settings.language_support.get(language).copied().unwrap_or(true))
    }

    /// Force the font to be considered (un)suitable for an ISO 15924 script.
    pub fn set_script_support_override(&self, id: FontId, script: &str, supported: bool) -> TextResult<()> {
        self.update(id, |s| {
            s.settings.script_support.insert(script.to_owned(), supported);
        })
    }

    /// Remove a script support override.
    pub fn remove_script_support_override(&self, id: FontId, script: &str) -> TextResult<()> {
        self.update(id, |s| {
            s.settings.script_support.remove(script);
        })
    }

    /// Scripts with an override.
    pub fn script_support_overrides(&self, id: FontId) -> TextResult<Vec<String>> {
        self.read(id, |_, s| {
            let mut scripts: Vec<String> = s.settings.script_support.keys().cloned().collect();
            scripts.sort();
            scripts
        })
    }

    /// Whether the font may be used for `script`. Defaults to `true`.
    pub fn is_script_supported(&self, id: FontId, script: &str) -> TextResult<bool> {
        self.read(id, |_, s| s.settings.script_support.get(script).copied().unwrap_or(true))
    }

    // -------------------------------------------------------------------------
    // Character mapping and face queries
    // -------------------------------------------------------------------------

    /// Map a character to a glyph index.
    ///
    /// Never fails: unknown handles, fonts without data and unmapped
    /// characters all yield `0`, which callers render as a replacement box.
    pub fn glyph_index(&self, id: FontId, _size: SizeKey, c: char, variation_selector: Option<char>) -> u32 {
        self.read(id, |_, s| {
            s.face
                .as_ref()
                .map_or(0, |face| face.glyph_index(c, variation_selector))
        })
        .unwrap_or(0)
    }

    /// Reverse-map a glyph index to a character.
    pub fn char_for_glyph(&self, id: FontId, _size: SizeKey, glyph: u32) -> TextResult<Option<char>> {
        self.read(id, |_, s| s.face.as_ref().and_then(|f| f.char_for_glyph(glyph)))
    }

    /// Whether the font maps `c` to a glyph.
    pub fn has_char(&self, id: FontId, c: char) -> TextResult<bool> {
        self.read(id, |_, s| s.face.as_ref().is_some_and(|f| f.glyph_index(c, None) != 0))
    }

    /// Every character the font maps.
    pub fn supported_chars(&self, id: FontId) -> TextResult<Vec<char>> {
        self.read(id, |_, s| s.face.as_ref().map(|f| f.supported_chars()).unwrap_or_default())
    }

    /// OpenType features declared by the font.
    pub fn supported_features(&self, id: FontId) -> TextResult<Vec<[u8; 4]>> {
        self.read(id, |_, s| s.face.as_ref().map(|f| f.supported_features()).unwrap_or_default())
    }

    /// Variation axes declared by the font.
    pub fn supported_variations(&self, id: FontId) -> TextResult<Vec<VariationAxis>> {
        self.read(id, |_, s| s.face.as_ref().map(|f| f.supported_variations()).unwrap_or_default())
    }

    /// Face-wide metrics in font units.
    pub fn face_metrics(&self, id: FontId) -> TextResult<FaceMetrics> {
        self.read(id, |r, s| s.face.as_ref().map(|f| f.metrics(r.variations(s))))?
            .ok_or(TextError::NoFontData)
    }

    /// Advance of a glyph in pixels, without rasterizing it.
    pub fn glyph_advance(&self, id: FontId, size: SizeKey, glyph: u32) -> TextResult<Vec2> {
        self.read(id, |r, s| {
            let face = s.face.as_ref().ok_or(TextError::NoFontData)?;
            let variations = r.variations(s);
            let upem = f32::from(face.metrics(variations).units_per_em.max(1));
            let advance = face.glyph_advance(glyph, variations) * size.pixel_size as f32 / upem;
            Ok(Vec2::new(advance, 0.0))
        })?
    }

    // -------------------------------------------------------------------------
    // Size caches
    // -------------------------------------------------------------------------

    fn with_size<R>(&self, id: FontId, size: SizeKey, f: impl FnOnce(&mut SizeCache) -> R) -> TextResult<R> {
        let resolved = self.resolve(id)?;
        let slot = resolved.slot(size);
        let mut guard = resolved.base.state.write();
        let state = &mut *guard;
        let variations = resolved.variations(state).to_vec();
        let cache = ensure_size(
            &mut state.sizes,
            &state.face,
            &variations,
            state.settings.fixed_size,
            slot,
        )?;
        Ok(f(cache))
    }

    fn with_existing_size<R>(
        &self,
        id: FontId,
        size: SizeKey,
        f: impl FnOnce(&mut SizeCache) -> R,
    ) -> TextResult<Option<R>> {
        let resolved = self.resolve(id)?;
        let slot = resolved.slot(size);
        let mut state = resolved.base.state.write();
        Ok(state.sizes.get_mut(&slot).map(f))
    }

    /// Sizes with a live cache for this font (or linked variation).
    pub fn size_cache_list(&self, id: FontId) -> TextResult<Vec<SizeKey>> {
        self.read(id, |r, s| {
            let variant = r.variant();
            let mut sizes: Vec<SizeKey> = s
                .sizes
                .keys()
                .filter(|slot| slot.variant == variant)
                .map(|slot| slot.size)
                .collect();
            sizes.sort();
            sizes
        })
    }

    /// Drop every size cache of the font.
    pub fn clear_size_cache(&self, id: FontId) -> TextResult<()> {
        let variant = self.resolve(id)?.variant();
        self.update(id, |s| s.sizes.retain(|slot, _| slot.variant != variant))?;
        tracing::debug!(target: "horizon_lattice_text::font", ?id, "cleared size caches");
        Ok(())
    }

    /// Drop one size cache.
    pub fn remove_size_cache(&self, id: FontId, size: SizeKey) -> TextResult<()> {
        let slot = self.resolve(id)?.slot(size);
        self.update(id, |s| {
            s.sizes.remove(&slot);
        })
    }

    /// Line metrics at a size, creating the size cache if needed.
    pub fn size_metrics(&self, id: FontId, size: SizeKey) -> TextResult<SizeMetrics> {
        let resolved = self.resolve(id)?;
        let slot = resolved.slot(size);
        {
            let state = resolved.base.state.read();
            if let Some(cache) = state.sizes.get(&slot) {
                return Ok(cache.metrics());
            }
        }
        self.with_size(id, size, |c| c.metrics())
    }

    /// Override one line metric at a size.
    pub fn set_size_metric(&self, id: FontId, size: SizeKey, metric: SizeMetric, value: f32) -> TextResult<()> {
        self.with_size(id, size, |c| c.set_metric(metric, value))
    }

    // -------------------------------------------------------------------------
    // Glyphs and textures
    // -------------------------------------------------------------------------

    /// Render a glyph at a size, or return the existing record.
    ///
    /// Idempotent: the rasterizer runs at most once per glyph and size, even
    /// when several threads ask for the same glyph at the same time.
    pub fn render_glyph(&self, id: FontId, size: SizeKey, glyph: u32) -> TextResult<CachedGlyph> {
        let resolved = self.resolve(id)?;
        let slot = resolved.slot(size);
        {
            let state = resolved.base.state.read();
            if let Some(cached) = state.sizes.get(&slot).and_then(|c| c.glyphs.get(&glyph)) {
                return Ok(cached.clone());
            }
        }

        let mut guard = resolved.base.state.write();
        let state = &mut *guard;
        let settings = resolved.settings(state);
        let data = state.data.clone().ok_or(TextError::NoFontData)?;
        let cache = ensure_size(
            &mut state.sizes,
            &state.face,
            &settings.variations,
            settings.fixed_size,
            slot,
        )?;
        // Another thread may have rendered it between the two locks.
        if let Some(cached) = cache.glyphs.get(&glyph) {
            return Ok(cached.clone());
        }

        let job = RenderJob {
            data: &data,
            settings: &settings,
            global_oversampling: *self.global_oversampling.read(),
            page_size: self.config.texture_page_size,
        };
        bridge::render_into(cache, &*self.rasterizer, &job, glyph).map_err(|err| {
            tracing::warn!(target: "horizon_lattice_text::raster", ?id, glyph, %err, "rasterization failed");
            TextError::from(err)
        })
    }

    /// Render every mapped character in `start..=end`.
    pub fn render_range(&self, id: FontId, size: SizeKey, start: char, end: char) -> TextResult<()> {
        for c in start..=end {
            let glyph = self.glyph_index(id, size, c, None);
            if glyph != 0 {
                self.render_glyph(id, size, glyph)?;
            }
        }
        Ok(())
    }

    /// The rendered record of a glyph, if it has been rendered.
    pub fn cached_glyph(&self, id: FontId, size: SizeKey, glyph: u32) -> TextResult<Option<CachedGlyph>> {
        let slot = self.resolve(id)?.slot(size);
        self.read(id, |_, s| s.sizes.get(&slot).and_then(|c| c.glyphs.get(&glyph).cloned()))
    }

    /// Glyph indices rendered at a size.
    pub fn glyph_list(&self, id: FontId, size: SizeKey) -> TextResult<Vec<u32>> {
        let slot = self.resolve(id)?.slot(size);
        self.read(id, |_, s| {
            let mut glyphs: Vec<u32> = s
                .sizes
                .get(&slot)
                .map(|c| c.glyphs.keys().copied().collect())
                .unwrap_or_default();
            glyphs.sort_unstable();
            glyphs
        })
    }

    /// Forget one rendered glyph. Its texture space is not reclaimed.
    pub fn remove_glyph(&self, id: FontId, size: SizeKey, glyph: u32) -> TextResult<()> {
        self.with_existing_size(id, size, |c| {
            c.glyphs.remove(&glyph);
        })
        .map(|_| ())
    }

    /// Drop rendered glyphs (and their pages) at a size.
    pub fn clear_glyphs(&self, id: FontId, size: SizeKey) -> TextResult<()> {
        self.with_existing_size(id, size, SizeCache::clear_glyphs).map(|_| ())
    }

    /// Drop texture pages at a size. Glyph records pointing into them go too.
    pub fn clear_textures(&self, id: FontId, size: SizeKey) -> TextResult<()> {
        self.with_existing_size(id, size, |c| {
            c.textures.clear();
            c.glyphs.clear();
        })
        .map(|_| ())
    }

    /// Number of texture pages at a size.
    pub fn texture_count(&self, id: FontId, size: SizeKey) -> TextResult<usize> {
        let slot = self.resolve(id)?.slot(size);
        self.read(id, |_, s| s.sizes.get(&slot).map_or(0, |c| c.textures.len()))
    }

    /// A copy of one texture page.
    pub fn texture_page(&self, id: FontId, size: SizeKey, index: usize) -> TextResult<Option<TexturePage>> {
        let slot = self.resolve(id)?.slot(size);
        self.read(id, |_, s| s.sizes.get(&slot).and_then(|c| c.textures.get(index).cloned()))
    }

    // -------------------------------------------------------------------------
    // Kerning overrides
    // -------------------------------------------------------------------------

    /// Override kerning for a glyph pair at a size. The override replaces
    /// the face's own kerning for the pair when text is shaped.
    pub fn set_kerning(&self, id: FontId, size: SizeKey, pair: (u32, u32), kerning: Vec2) -> TextResult<()> {
        self.with_size(id, size, |c| {
            c.kerning.insert(pair, kerning);
        })
    }

    /// Kerning for a glyph pair: the override if any, else the face's own.
    pub fn kerning(&self, id: FontId, size: SizeKey, pair: (u32, u32)) -> TextResult<Vec2> {
        let slot = self.resolve(id)?.slot(size);
        self.read(id, |r, s| {
            if let Some(k) = s.sizes.get(&slot).and_then(|c| c.kerning.get(&pair)) {
                return Ok(*k);
            }
            let face = s.face.as_ref().ok_or(TextError::NoFontData)?;
            let upem = f32::from(face.metrics(r.variations(s)).units_per_em.max(1));
            let k = face.kerning(pair.0, pair.1) * size.pixel_size as f32 / upem;
            Ok(Vec2::new(k, 0.0))
        })?
    }

    /// Remove a kerning override.
    pub fn remove_kerning(&self, id: FontId, size: SizeKey, pair: (u32, u32)) -> TextResult<()> {
        self.with_existing_size(id, size, |c| {
            c.kerning.remove(&pair);
        })
        .map(|_| ())
    }

    /// Glyph pairs with a kerning override.
    pub fn kerning_list(&self, id: FontId, size: SizeKey) -> TextResult<Vec<(u32, u32)>> {
        let slot = self.resolve(id)?.slot(size);
        self.read(id, |_, s| {
            let mut pairs: Vec<(u32, u32)> = s
                .sizes
                .get(&slot)
                .map(|c| c.kerning.keys().copied().collect())
                .unwrap_or_default();
            pairs.sort_unstable();
            pairs
        })
    }

    /// Remove every kerning override at a size.
    pub fn clear_kerning_map(&self, id: FontId, size: SizeKey) -> TextResult<()> {
        self.with_existing_size(id, size, |c| c.kerning.clear()).map(|_| ())
    }

    // -------------------------------------------------------------------------
    // Shaping support
    // -------------------------------------------------------------------------

    pub(crate) fn shaping_font(&self, id: FontId, size: SizeKey) -> TextResult<ShapingFont> {
        let resolved = self.resolve(id)?;
        let slot = resolved.slot(size);
        {
            let state = resolved.base.state.read();
            if let (Some(face), Some(cache)) = (&state.face, state.sizes.get(&slot)) {
                let variations = resolved.variations(&state).to_vec();
                return Ok(ShapingFont {
                    face: face.clone(),
                    units_per_em: f32::from(face.metrics(&variations).units_per_em),
                    variations,
                    metrics: cache.metrics(),
                    kerning: cache.kerning.clone(),
                });
            }
        }
        let metrics = self.with_size(id, size, |c| (c.metrics(), c.kerning.clone()))?;
        self.read(id, |r, s| {
            let face = s.face.clone().ok_or(TextError::NoFontData)?;
            let variations = r.variations(s).to_vec();
            Ok(ShapingFont {
                units_per_em: f32::from(face.metrics(&variations).units_per_em),
                face,
                variations,
                metrics: metrics.0,
                kerning: metrics.1,
            })
        })?
    }
}
