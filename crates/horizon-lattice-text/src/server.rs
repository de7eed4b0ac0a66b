//! Text server: the handle-based facade over fonts and shaped text.
//!
//! Callers that want to swap engines depend on the [`TextServer`] trait and
//! pick an implementation once at startup. [`AdvancedTextServer`] is the
//! full engine: bidi, complex shaping, kashida justification and all font
//! rasterization modes.
//!
//! Buffers are addressed by [`BufferId`]. Each buffer sits behind its own
//! mutex, so different threads can work on different buffers at once.
//!
//! # Example
//!
//! ```no_run
//! use horizon_lattice_text::{
//!     AdvancedTextServer, Direction, LineBreakFlags, Orientation, TextEngineConfig, TextServer,
//!     TextStyle,
//! };
//!
//! let server = AdvancedTextServer::new(TextEngineConfig::default());
//! let font = server.font_cache().create_font();
//! server
//!     .font_cache()
//!     .set_data(font, std::fs::read("DejaVuSans.ttf").unwrap())
//!     .unwrap();
//!
//! let text = server.create_shaped_text(Direction::Auto, Orientation::Horizontal);
//! server
//!     .shaped_text_add_string(text, "Hello, world", TextStyle::new(vec![font], 16))
//!     .unwrap();
//! let lines = server
//!     .shaped_text_line_breaks(text, 80.0, LineBreakFlags::default())
//!     .unwrap();
//! println!("{} lines", lines.len());
//! server.free_shaped_text(text).unwrap();
//! ```

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use bitflags::bitflags;
use parking_lot::{Mutex, RwLock};

use crate::buffer::{Carets, ShapedTextBuffer, TextStyle};
use crate::config::TextEngineConfig;
use crate::error::TextResult;
use crate::font::{FaceLoader, FontCache};
use crate::handle::{BufferId, HandleTable};
use crate::layout::{JustificationFlags, LineBreakFlags, OverrunFlags, TrimState};
use crate::raster::Rasterizer;
use crate::shaping::Glyph;
use crate::types::{Direction, InlineVerticalAlign, ObjectKey, Orientation, Rect, Vec2};

bitflags! {
    /// Capabilities a text server implementation provides.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ServerFeatures: u32 {
        /// Single-direction, single-script layout.
        const SIMPLE_LAYOUT = 1 << 0;
        /// Bidirectional layout.
        const BIDI_LAYOUT = 1 << 1;
        /// Vertical orientation.
        const VERTICAL_LAYOUT = 1 << 2;
        /// OpenType shaping (ligatures, marks, contextual forms).
        const SHAPING = 1 << 3;
        /// Justification by kashida insertion.
        const KASHIDA_JUSTIFICATION = 1 << 4;
        /// Line, word and grapheme break iteration.
        const BREAK_ITERATORS = 1 << 5;
        /// Bitmap font rendering.
        const FONT_BITMAP = 1 << 6;
        /// Outline font rendering at any size.
        const FONT_DYNAMIC = 1 << 7;
        /// Multichannel signed distance field rendering.
        const FONT_MSDF = 1 << 8;
        /// Variable font axes.
        const FONT_VARIABLE = 1 << 9;
    }
}

/// The interface every text engine implements.
///
/// Only the handle lifecycle and [`shaped_text`](Self::shaped_text) are
/// required. The remaining operations have default implementations that
/// lock the buffer and forward to [`ShapedTextBuffer`].
///
/// Every method taking a [`BufferId`] fails with
/// [`TextError::InvalidHandle`](crate::TextError::InvalidHandle) when the
/// handle is unknown or freed.
pub trait TextServer: Send + Sync + fmt::Debug {
    /// Human-readable engine name.
    fn name(&self) -> &str;

    /// Capabilities of this engine.
    fn features(&self) -> ServerFeatures;

    /// Whether the engine provides all of `features`.
    fn has_feature(&self, features: ServerFeatures) -> bool {
        self.features().contains(features)
    }

    /// The font cache backing this server.
    fn font_cache(&self) -> &Arc<FontCache>;

    // -------------------------------------------------------------------------
    // Handle lifecycle
    // -------------------------------------------------------------------------

    /// Create an empty shaped text buffer.
    fn create_shaped_text(&self, direction: Direction, orientation: Orientation) -> BufferId;

    /// Free a buffer. Substrings taken from it stay usable.
    fn free_shaped_text(&self, id: BufferId) -> TextResult<()>;

    /// Whether `id` names a live buffer.
    fn is_valid_shaped_text(&self, id: BufferId) -> bool;

    /// The buffer behind a handle.
    fn shaped_text(&self, id: BufferId) -> TextResult<Arc<Mutex<ShapedTextBuffer>>>;

    /// Create a read-only substring buffer of `len` characters at `start`.
    fn shaped_text_substr(&self, id: BufferId, start: usize, len: usize) -> TextResult<BufferId>;

    /// The buffer a substring was taken from, `None` for ordinary buffers
    /// and for substrings whose parent has been freed.
    fn shaped_text_parent(&self, id: BufferId) -> TextResult<Option<BufferId>>;

    // -------------------------------------------------------------------------
    // Content
    // -------------------------------------------------------------------------

    /// Append styled text.
    fn shaped_text_add_string(&self, id: BufferId, text: &str, style: TextStyle) -> TextResult<()> {
        self.shaped_text(id)?.lock().add_string(text, style)
    }

    /// Append an inline object.
    fn shaped_text_add_object(
        &self,
        id: BufferId,
        key: ObjectKey,
        size: Vec2,
        align: InlineVerticalAlign,
        length: usize,
    ) -> TextResult<()> {
        self.shaped_text(id)?.lock().add_object(key, size, align, length)
    }

    /// Resize an inline object without reshaping.
    fn shaped_text_resize_object(
        &self,
        id: BufferId,
        key: ObjectKey,
        size: Vec2,
        align: InlineVerticalAlign,
    ) -> TextResult<()> {
        self.shaped_text(id)?.lock().resize_object(key, size, align)
    }

    /// Remove all content. A substring becomes an ordinary empty buffer.
    fn shaped_text_clear(&self, id: BufferId) -> TextResult<()> {
        self.shaped_text(id)?.lock().clear();
        Ok(())
    }

    /// Shape the buffer. Returns `false` when there was nothing to do.
    fn shaped_text_shape(&self, id: BufferId) -> TextResult<bool> {
        Ok(self.shaped_text(id)?.lock().shape())
    }

    /// Whether the buffer is shaped and unchanged since.
    fn shaped_text_is_ready(&self, id: BufferId) -> TextResult<bool> {
        Ok(self.shaped_text(id)?.lock().is_shaped())
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Glyphs in visual order.
    fn shaped_text_glyphs(&self, id: BufferId) -> TextResult<Vec<Glyph>> {
        Ok(self.shaped_text(id)?.lock().glyphs())
    }

    /// Width and height of the line.
    fn shaped_text_size(&self, id: BufferId) -> TextResult<Vec2> {
        Ok(self.shaped_text(id)?.lock().size())
    }

    /// Paragraph direction after resolving `Auto`.
    fn shaped_text_direction(&self, id: BufferId) -> TextResult<Direction> {
        Ok(self.shaped_text(id)?.lock().inferred_direction())
    }

    /// Character position closest to `coord` along the line.
    fn shaped_text_hit_test_position(&self, id: BufferId, coord: f32) -> TextResult<usize> {
        Ok(self.shaped_text(id)?.lock().hit_test_position(coord))
    }

    /// Caret rectangles at a character position.
    fn shaped_text_carets(&self, id: BufferId, pos: usize) -> TextResult<Carets> {
        Ok(self.shaped_text(id)?.lock().carets(pos))
    }

    /// Selection rectangles covering `[start, end)`.
    fn shaped_text_selection(&self, id: BufferId, start: usize, end: usize) -> TextResult<Vec<Rect>> {
        Ok(self.shaped_text(id)?.lock().selection_rects(start, end))
    }

    /// Line ranges for a single width.
    fn shaped_text_line_breaks(
        &self,
        id: BufferId,
        width: f32,
        flags: LineBreakFlags,
    ) -> TextResult<Vec<Range<usize>>> {
        Ok(self.shaped_text(id)?.lock().line_breaks(width, flags))
    }

    /// Line ranges for a sequence of widths.
    fn shaped_text_line_breaks_adv(
        &self,
        id: BufferId,
        widths: &[f32],
        once: bool,
        flags: LineBreakFlags,
    ) -> TextResult<Vec<Range<usize>>> {
        Ok(self.shaped_text(id)?.lock().line_breaks_adv(widths, once, flags))
    }

    /// Justify the buffer to `width`. Returns the resulting width.
    fn shaped_text_fit_to_width(&self, id: BufferId, width: f32, flags: JustificationFlags) -> TextResult<f32> {
        Ok(self.shaped_text(id)?.lock().fit_to_width(width, flags))
    }

    /// Align tabs to the given stops.
    fn shaped_text_tab_align(&self, id: BufferId, stops: &[f32]) -> TextResult<()> {
        self.shaped_text(id)?.lock().tab_align(stops);
        Ok(())
    }

    /// Compute the overrun projection for `width`.
    fn shaped_text_overrun_trim(&self, id: BufferId, width: f32, flags: OverrunFlags) -> TextResult<TrimState> {
        Ok(self.shaped_text(id)?.lock().overrun_trim(width, flags).clone())
    }

    /// Box of an inline object.
    fn shaped_text_object_rect(&self, id: BufferId, key: ObjectKey) -> TextResult<Rect> {
        self.shaped_text(id)?.lock().object_rect(key)
    }
}

#[derive(Debug)]
struct BufferEntry {
    buffer: Arc<Mutex<ShapedTextBuffer>>,
    parent: Option<BufferId>,
}

/// The full-featured text engine.
#[derive(Debug)]
pub struct AdvancedTextServer {
    cache: Arc<FontCache>,
    buffers: RwLock<HandleTable<BufferId, BufferEntry>>,
}

static_assertions::assert_impl_all!(AdvancedTextServer: Send, Sync);

impl AdvancedTextServer {
    /// Engine name reported by [`TextServer::name`].
    pub const NAME: &'static str = "advanced";

    /// Create a server with the default font loader and rasterizer.
    pub fn new(config: TextEngineConfig) -> Self {
        Self::with_cache(Arc::new(FontCache::new(
            config,
            Arc::new(crate::font::OpenTypeLoader),
            Arc::new(crate::raster::SwashRasterizer::new()),
        )))
    }

    /// Create a server with explicit font backends.
    pub fn with_backends(
        config: TextEngineConfig,
        loader: Arc<dyn FaceLoader>,
        rasterizer: Arc<dyn Rasterizer>,
    ) -> Self {
        Self::with_cache(Arc::new(FontCache::new(config, loader, rasterizer)))
    }

    /// Create a server over an existing font cache.
    pub fn with_cache(cache: Arc<FontCache>) -> Self {
        tracing::debug!(target: "horizon_lattice_text::server", name = Self::NAME, "text server created");
        Self {
            cache,
            buffers: RwLock::new(HandleTable::new("shaped text")),
        }
    }

    /// Number of live buffers.
    pub fn shaped_text_count(&self) -> usize {
        self.buffers.read().len()
    }

    fn insert(&self, buffer: ShapedTextBuffer, parent: Option<BufferId>) -> BufferId {
        self.buffers.write().insert(BufferEntry {
            buffer: Arc::new(Mutex::new(buffer)),
            parent,
        })
    }
}

impl Default for AdvancedTextServer {
    fn default() -> Self {
        Self::new(TextEngineConfig::default())
    }
}

impl TextServer for AdvancedTextServer {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn features(&self) -> ServerFeatures {
        ServerFeatures::all()
    }

    fn font_cache(&self) -> &Arc<FontCache> {
        &self.cache
    }

    fn create_shaped_text(&self, direction: Direction, orientation: Orientation) -> BufferId {
        let buffer = ShapedTextBuffer::with_direction(Arc::clone(&self.cache), direction, orientation);
        let id = self.insert(buffer, None);
        tracing::debug!(target: "horizon_lattice_text::server", ?id, ?direction, ?orientation, "shaped text created");
        id
    }

    fn free_shaped_text(&self, id: BufferId) -> TextResult<()> {
        self.buffers.write().remove(id)?;
        tracing::debug!(target: "horizon_lattice_text::server", ?id, "shaped text freed");
        Ok(())
    }

    fn is_valid_shaped_text(&self, id: BufferId) -> bool {
        self.buffers.read().contains(id)
    }

    fn shaped_text(&self, id: BufferId) -> TextResult<Arc<Mutex<ShapedTextBuffer>>> {
        self.buffers.read().get(id).map(|e| Arc::clone(&e.buffer))
    }

    fn shaped_text_substr(&self, id: BufferId, start: usize, len: usize) -> TextResult<BufferId> {
        // The table lock is released before the buffer lock is taken.
        let view = self.shaped_text(id)?.lock().substr(start, len);
        let range = view.range();
        let sub = self.insert(view, Some(id));
        tracing::debug!(target: "horizon_lattice_text::server", parent = ?id, ?sub, ?range, "substring created");
        Ok(sub)
    }

    fn shaped_text_parent(&self, id: BufferId) -> TextResult<Option<BufferId>> {
        let buffers = self.buffers.read();
        let entry = buffers.get(id)?;
        let parent = entry.parent.filter(|&p| buffers.contains(p));
        if parent.is_some() && !entry.buffer.lock().is_read_only() {
            // Cleared substrings are ordinary buffers.
            return Ok(None);
        }
        Ok(parent)
    }

    fn shaped_text_clear(&self, id: BufferId) -> TextResult<()> {
        let mut buffers = self.buffers.write();
        let entry = buffers.get_mut(id)?;
        entry.buffer.lock().clear();
        entry.parent = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TextError;

    fn server() -> AdvancedTextServer {
        AdvancedTextServer::default()
    }

    fn object_text(server: &AdvancedTextServer) -> BufferId {
        let id = server.create_shaped_text(Direction::Ltr, Orientation::Horizontal);
        for key in 1..=3 {
            server
                .shaped_text_add_object(
                    id,
                    ObjectKey(key),
                    Vec2::new(10.0, 10.0),
                    InlineVerticalAlign::Baseline,
                    1,
                )
                .unwrap();
        }
        id
    }

    #[test]
    fn test_reports_all_features() {
        let server = server();
        assert_eq!(server.name(), "advanced");
        assert!(server.has_feature(ServerFeatures::BIDI_LAYOUT | ServerFeatures::KASHIDA_JUSTIFICATION));
    }

    #[test]
    fn test_freed_handle_is_rejected() {
        let server = server();
        let id = server.create_shaped_text(Direction::Auto, Orientation::Horizontal);
        assert!(server.is_valid_shaped_text(id));
        server.free_shaped_text(id).unwrap();
        assert!(!server.is_valid_shaped_text(id));
        assert_eq!(
            server.shaped_text_size(id).unwrap_err(),
            TextError::InvalidHandle { kind: "shaped text" }
        );
        assert!(server.free_shaped_text(id).is_err());
    }

    #[test]
    fn test_queries_forward_to_buffer() {
        let server = server();
        let id = object_text(&server);
        assert!(!server.shaped_text_is_ready(id).unwrap());
        assert!(server.shaped_text_shape(id).unwrap());
        assert!(server.shaped_text_is_ready(id).unwrap());
        assert!(server.shaped_text_shape(id).unwrap());
        assert_eq!(server.shaped_text_size(id).unwrap(), Vec2::new(30.0, 10.0));
        assert_eq!(
            server.shaped_text_line_breaks(id, 15.0, LineBreakFlags::GRAPHEME_BOUND).unwrap(),
            vec![0..1, 1..2, 2..3]
        );
        assert_eq!(
            server.shaped_text_object_rect(id, ObjectKey(2)).unwrap(),
            Rect::new(10.0, 0.0, 10.0, 10.0)
        );
    }

    #[test]
    fn test_substring_tracks_parent() {
        let server = server();
        let parent = object_text(&server);
        let sub = server.shaped_text_substr(parent, 1, 2).unwrap();
        assert_eq!(server.shaped_text_parent(sub).unwrap(), Some(parent));
        assert_eq!(server.shaped_text_parent(parent).unwrap(), None);
        assert_eq!(server.shaped_text_size(sub).unwrap().x, 20.0);
        assert_eq!(
            server
                .shaped_text_add_string(sub, "x", TextStyle::default())
                .unwrap_err(),
            TextError::ReadOnlyBuffer
        );

        server.free_shaped_text(parent).unwrap();
        assert_eq!(server.shaped_text_parent(sub).unwrap(), None);
        assert_eq!(server.shaped_text_size(sub).unwrap().x, 20.0);
    }

    #[test]
    fn test_clear_detaches_substring() {
        let server = server();
        let parent = object_text(&server);
        let sub = server.shaped_text_substr(parent, 0, 1).unwrap();
        server.shaped_text_clear(sub).unwrap();
        assert_eq!(server.shaped_text_parent(sub).unwrap(), None);
        server.shaped_text_add_object(
            sub,
            ObjectKey(9),
            Vec2::new(4.0, 4.0),
            InlineVerticalAlign::Top,
            1,
        )
        .unwrap();
        assert_eq!(server.shaped_text_size(sub).unwrap().x, 4.0);
        assert_eq!(server.shaped_text_count(), 2);
    }

    #[test]
    fn test_trait_object_dispatch() {
        let server: Box<dyn TextServer> = Box::new(server());
        let id = server.create_shaped_text(Direction::Rtl, Orientation::Horizontal);
        assert_eq!(server.shaped_text_direction(id).unwrap(), Direction::Rtl);
        assert_eq!(server.shaped_text_overrun_trim(id, 10.0, OverrunFlags::TRIM).unwrap(), TrimState::default());
    }
}
