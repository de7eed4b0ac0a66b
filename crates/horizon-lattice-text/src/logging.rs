//! Logging targets for the text engine.
//!
//! The engine is instrumented with the `tracing` crate. Install any
//! subscriber to see its output:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("horizon_lattice_text::font=debug")
//!     .init();
//! ```
//!
//! Hot paths (glyph lookups, per-run shaping) log at `trace`, lifecycle
//! events (font and buffer creation, cache eviction) at `debug`, and content
//! degradations such as missing glyphs or failed rasterization at `warn`.

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Crate-wide target.
    pub const TEXT: &str = "horizon_lattice_text";
    /// Font cache and size caches.
    pub const FONT: &str = "horizon_lattice_text::font";
    /// Rasterizer bridge and texture pages.
    pub const RASTER: &str = "horizon_lattice_text::raster";
    /// Script and direction itemization.
    pub const ITEMIZE: &str = "horizon_lattice_text::itemize";
    /// Run shaping and font fallback.
    pub const SHAPING: &str = "horizon_lattice_text::shaping";
    /// Line breaking, justification, trimming and tabs.
    pub const LAYOUT: &str = "horizon_lattice_text::layout";
    /// Shaped text buffers and queries.
    pub const BUFFER: &str = "horizon_lattice_text::buffer";
    /// Text server facade.
    pub const SERVER: &str = "horizon_lattice_text::server";
}
