//! Fonts: handles, per-size glyph caches and texture pages.
//!
//! A [`FontCache`] owns every font. Each font holds its source bytes, a
//! parsed [`FontFace`] and one size cache per [`SizeKey`](crate::SizeKey),
//! created on first use. Glyphs are rasterized on demand through a
//! [`Rasterizer`](crate::raster::Rasterizer) and packed into
//! [`TexturePage`]s.

pub mod backend;
mod cache;
mod opentype;
pub(crate) mod settings;
pub(crate) mod size_cache;
pub(crate) mod texture;

pub use backend::{FaceLoader, FaceMetrics, FontFace, RawGlyph, RunDirection, ShapeParams};
pub use cache::FontCache;
pub(crate) use cache::ShapingFont;
pub use opentype::{OpenTypeFace, OpenTypeLoader};
pub use settings::FontSettings;
pub use size_cache::{CachedGlyph, SizeMetric, SizeMetrics};
pub use texture::TexturePage;
