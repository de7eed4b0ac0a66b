//! Text shaping and layout engine for Horizon Lattice.
//!
//! This crate turns Unicode strings plus font references into positioned,
//! renderable glyph runs. It covers bidirectional text, complex-script
//! shaping with font fallback, line breaking, justification, overrun
//! trimming, tab stops, inline objects, hit-testing and a per-font glyph
//! cache that rasterizes into texture pages.
//!
//! # Getting Started
//!
//! Fonts live in a [`FontCache`]. Load font bytes into a handle and ask for
//! glyphs at a [`SizeKey`]:
//!
//! ```no_run
//! use horizon_lattice_text::{FontCache, SizeKey};
//!
//! let cache = FontCache::with_defaults();
//! let font = cache.create_font();
//! cache.set_data(font, std::fs::read("DejaVuSans.ttf").unwrap()).unwrap();
//!
//! let glyph = cache.glyph_index(font, SizeKey::new(16), 'A', None);
//! let rendered = cache.render_glyph(font, SizeKey::new(16), glyph).unwrap();
//! println!("{}x{}", rendered.uv_rect.width, rendered.uv_rect.height);
//! ```
//!
//! # Shaping Text
//!
//! A [`ShapedTextBuffer`] collects styled spans and shapes them on first
//! query:
//!
//! ```no_run
//! use std::sync::Arc;
//! use horizon_lattice_text::{FontCache, LineBreakFlags, ShapedTextBuffer, TextStyle};
//!
//! let cache = Arc::new(FontCache::with_defaults());
//! let font = cache.create_font();
//! cache.set_data(font, std::fs::read("DejaVuSans.ttf").unwrap()).unwrap();
//!
//! let mut buffer = ShapedTextBuffer::new(cache);
//! buffer.add_string("The quick brown fox", TextStyle::new(vec![font], 16)).unwrap();
//! for line in buffer.line_breaks(120.0, LineBreakFlags::default()) {
//!     println!("line {line:?}");
//! }
//! ```
//!
//! Applications that want an engine-agnostic, handle-based interface use the
//! [`TextServer`] trait; [`AdvancedTextServer`] implements it.
//!
//! # Logging
//!
//! The crate logs through `tracing`. See [`logging::targets`] for the
//! target names.

mod config;
mod error;
mod handle;
mod server;
mod types;

pub mod buffer;
pub mod font;
pub mod itemize;
pub mod layout;
pub mod logging;
pub mod raster;
pub mod shaping;

pub use config::{DEFAULT_TEXTURE_PAGE_SIZE, MAX_TEXTURE_PAGE_SIZE, MIN_TEXTURE_PAGE_SIZE, TextEngineConfig};
pub use error::{TextError, TextResult};
pub use handle::{BufferId, FontId, HandleTable};
pub use server::{AdvancedTextServer, ServerFeatures, TextServer};
pub use types::{
    Antialiasing, Direction, FontFeature, Hinting, InlineVerticalAlign, ObjectKey, Orientation, Rect, SizeKey,
    Spacing, Transform2D, Variation, VariationAxis, Vec2,
};

// Fonts
pub use font::{CachedGlyph, FaceLoader, FontCache, FontFace, OpenTypeLoader, SizeMetric, SizeMetrics, TexturePage};

// Rasterization
pub use raster::{PixelFormat, RasterError, RasterRequest, RasterizedGlyph, Rasterizer, SwashRasterizer};

// Itemization
pub use itemize::{BidiOverride, Run};

// Shaping and layout
pub use layout::{JustificationFlags, LineBreakFlags, OverrunFlags, TrimState};
pub use shaping::{Glyph, GlyphFlags};

// Buffers
pub use buffer::{Caret, Carets, InlineObject, ShapedTextBuffer, Span, TextStyle};
