//! Layout over shaped glyphs: line breaking, justification, overrun
//! trimming and tab alignment.
//!
//! Everything here works on an already shaped logical glyph sequence and
//! never re-shapes.

mod justify;
mod line_break;
mod tabs;
mod trim;

use crate::shaping::{Glyph, GlyphFlags, clusters};

pub use self::justify::{JustificationFlags, justified_lines};
pub(crate) use self::justify::{EllipsisConstraint, fit_to_width};
pub use self::line_break::{LineBreakFlags, line_breaks, line_breaks_adv};
pub(crate) use self::tabs::tab_align;
pub use self::trim::{OverrunFlags, TrimState};
pub(crate) use self::trim::overrun_trim;

/// Tolerance for width comparisons, in pixels.
pub const WIDTH_EPSILON: f32 = 1e-3;

/// One cluster summarized for layout.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ClusterInfo {
    /// Index of the first glyph.
    pub first: usize,
    /// One past the last glyph.
    pub last: usize,
    pub start: usize,
    pub end: usize,
    pub advance: f32,
    pub flags: GlyphFlags,
}

impl ClusterInfo {
    pub fn has(&self, flag: GlyphFlags) -> bool {
        self.flags.contains(flag)
    }

    /// Whitespace that hangs past the line end.
    pub fn is_space(&self) -> bool {
        self.has(GlyphFlags::SPACE)
    }

    pub fn is_visible(&self) -> bool {
        !self.is_space()
    }
}

/// Summarize the clusters of a logical glyph sequence.
///
/// Flags are taken from the first non-virtual glyph of the cluster, so
/// inserted elongations do not change a cluster's classification.
pub(crate) fn cluster_infos(glyphs: &[Glyph], include_virtual: bool) -> Vec<ClusterInfo> {
    clusters(glyphs)
        .map(|range| {
            let members = &glyphs[range.clone()];
            let head = members
                .iter()
                .find(|g| !g.is_virtual())
                .unwrap_or(&members[0]);
            let advance = members
                .iter()
                .filter(|g| include_virtual || !g.is_virtual())
                .map(Glyph::total_advance)
                .sum();
            ClusterInfo {
                first: range.start,
                last: range.end,
                start: head.start,
                end: head.end,
                advance,
                flags: head.flags,
            }
        })
        .collect()
}
