//! Error types for the text crate.

use thiserror::Error;

use crate::raster::RasterError;
use crate::types::ObjectKey;

/// Errors that can occur during font, shaping and layout operations.
///
/// Content-level problems (unmapped characters, lines that cannot be broken
/// narrowly enough) are never reported here. They degrade to missing glyphs
/// or overflowing lines and are visible through glyph flags instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TextError {
    /// The handle is unknown or refers to a freed resource.
    #[error("invalid or freed {kind} handle")]
    InvalidHandle {
        /// The kind of resource the handle was expected to name.
        kind: &'static str,
    },

    /// Font source bytes could not be parsed.
    #[error("malformed font data: {0}")]
    MalformedFontData(String),

    /// The font has no source data yet.
    #[error("font has no source data")]
    NoFontData,

    /// Ranges overlap each other or fall outside the text.
    #[error("overlapping or out-of-bounds range {start}..{end}")]
    OverlappingRanges {
        /// Start of the offending range.
        start: usize,
        /// End of the offending range.
        end: usize,
    },

    /// The buffer is a substring view and cannot be modified.
    #[error("buffer is a read-only substring view")]
    ReadOnlyBuffer,

    /// An inline object with this key already exists in the buffer.
    #[error("inline object key {0:?} is already in use")]
    DuplicateObjectKey(ObjectKey),

    /// No inline object with this key exists in the buffer.
    #[error("unknown inline object key {0:?}")]
    UnknownObject(ObjectKey),

    /// The font still has linked variations referring to it.
    #[error("font still has {count} linked variation(s)")]
    LinkedVariationsAlive {
        /// Number of live linked variations.
        count: usize,
    },

    /// Glyph rasterization failed.
    #[error("rasterization failed: {0}")]
    Raster(#[from] RasterError),
}

/// Result type for text operations.
pub type TextResult<T> = Result<T, TextError>;
