//! OpenType face backend built on `ttf-parser` and `rustybuzz`.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use rustybuzz::{Direction as HbDirection, Feature, Language as HbLanguage, Script, UnicodeBuffer};
use ttf_parser::{Face, GlyphId, Tag};

use super::backend::{FaceLoader, FaceMetrics, FontFace, RawGlyph, RunDirection, ShapeParams};
use crate::error::{TextError, TextResult};
use crate::types::{Variation, VariationAxis};

/// Loads TrueType/OpenType fonts and collections.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenTypeLoader;

impl FaceLoader for OpenTypeLoader {
    fn load(&self, data: Arc<[u8]>, face_index: u32) -> TextResult<Arc<dyn FontFace>> {
        Face::parse(&data, face_index).map_err(|e| TextError::MalformedFontData(e.to_string()))?;
        Ok(Arc::new(OpenTypeFace { data, face_index }))
    }
}

/// A face backed by shared font bytes.
///
/// `ttf-parser` faces borrow their data, so the face is re-parsed on each
/// call. Parsing only reads the table directory.
pub struct OpenTypeFace {
    data: Arc<[u8]>,
    face_index: u32,
}

impl fmt::Debug for OpenTypeFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenTypeFace")
            .field("bytes", &self.data.len())
            .field("face_index", &self.face_index)
            .finish()
    }
}

impl OpenTypeFace {
    fn face(&self) -> Option<Face<'_>> {
        Face::parse(&self.data, self.face_index).ok()
    }

    fn varied_face(&self, variations: &[Variation]) -> Option<Face<'_>> {
        let mut face = self.face()?;
        for v in variations {
            // Unknown axes are ignored.
            let _ = face.set_variation(Tag::from_bytes(&v.tag), v.value);
        }
        Some(face)
    }
}

fn glyph_id(glyph: u32) -> GlyphId {
    GlyphId(u16::try_from(glyph).unwrap_or(0))
}

impl FontFace for OpenTypeFace {
    fn metrics(&self, variations: &[Variation]) -> FaceMetrics {
        let Some(face) = self.varied_face(variations) else {
            return FaceMetrics {
                units_per_em: 1000,
                ascent: 800.0,
                descent: 200.0,
                line_gap: 0.0,
                underline_position: -100.0,
                underline_thickness: 50.0,
            };
        };
        let upem = face.units_per_em();
        let (underline_position, underline_thickness) = match face.underline_metrics() {
            Some(m) => (m.position as f32, m.thickness as f32),
            None => (-(upem as f32) / 10.0, upem as f32 / 20.0),
        };
        FaceMetrics {
            units_per_em: upem,
            ascent: face.ascender() as f32,
            descent: -(face.descender() as f32),
            line_gap: face.line_gap() as f32,
            underline_position,
            underline_thickness,
        }
    }

    fn glyph_index(&self, c: char, variation_selector: Option<char>) -> u32 {
        let Some(face) = self.face() else {
            return 0;
        };
        variation_selector
            .and_then(|vs| face.glyph_variation_index(c, vs))
            .or_else(|| face.glyph_index(c))
            .map(|g| g.0 as u32)
            .unwrap_or(0)
    }

    fn char_for_glyph(&self, glyph: u32) -> Option<char> {
        let face = self.face()?;
        let cmap = face.tables().cmap?;
        let target = glyph_id(glyph);
        let mut found = None;
        for subtable in cmap.subtables {
            if !subtable.is_unicode() {
                continue;
            }
            subtable.codepoints(|cp| {
                if found.is_none() && subtable.glyph_index(cp) == Some(target) {
                    found = char::from_u32(cp);
                }
            });
            if found.is_some() {
                break;
            }
        }
        found
    }

    fn supported_chars(&self) -> Vec<char> {
        let Some(face) = self.face() else {
            return Vec::new();
        };
        let Some(cmap) = face.tables().cmap else {
            return Vec::new();
        };
        let mut chars = Vec::new();
        for subtable in cmap.subtables {
            if !subtable.is_unicode() {
                continue;
            }
            subtable.codepoints(|cp| {
                if subtable.glyph_index(cp).is_some_and(|g| g.0 != 0) {
                    if let Some(c) = char::from_u32(cp) {
                        chars.push(c);
                    }
                }
            });
        }
        chars.sort_unstable();
        chars.dedup();
        chars
    }

    fn glyph_advance(&self, glyph: u32, variations: &[Variation]) -> f32 {
        self.varied_face(variations)
            .and_then(|face| face.glyph_hor_advance(glyph_id(glyph)))
            .map(f32::from)
            .unwrap_or(0.0)
    }

    fn kerning(&self, left: u32, right: u32) -> f32 {
        let Some(face) = self.face() else {
            return 0.0;
        };
        let Some(kern) = face.tables().kern else {
            return 0.0;
        };
        for subtable in kern.subtables {
            if !subtable.horizontal || subtable.variable {
                continue;
            }
            if let Some(value) = subtable.glyphs_kerning(glyph_id(left), glyph_id(right)) {
                return value as f32;
            }
        }
        0.0
    }

    fn shape(&self, text: &str, params: &ShapeParams<'_>) -> Vec<RawGlyph> {
        let Some(mut face) = rustybuzz::Face::from_slice(&self.data, self.face_index) else {
            return Vec::new();
        };
        if !params.variations.is_empty() {
            let variations: Vec<rustybuzz::Variation> = params
                .variations
                .iter()
                .map(|v| rustybuzz::Variation {
                    tag: Tag::from_bytes(&v.tag),
                    value: v.value,
                })
                .collect();
            face.set_variations(&variations);
        }

        let mut buffer = UnicodeBuffer::new();
        buffer.push_str(text);
        buffer.set_direction(match params.direction {
            RunDirection::LeftToRight => HbDirection::LeftToRight,
            RunDirection::RightToLeft => HbDirection::RightToLeft,
            RunDirection::TopToBottom => HbDirection::TopToBottom,
        });
        if let Some(script) = params
            .script
            .and_then(|tag| Script::from_iso15924_tag(Tag::from_bytes(&tag)))
        {
            buffer.set_script(script);
        }
        if let Some(language) = params.language.and_then(|l| HbLanguage::from_str(l).ok()) {
            buffer.set_language(language);
        }

        let features: Vec<Feature> = params
            .features
            .iter()
            .map(|f| Feature::new(Tag::from_bytes(&f.tag), f.value, ..))
            .collect();

        let output = rustybuzz::shape(&face, &features, buffer);
        let vertical = params.direction == RunDirection::TopToBottom;
        let mut glyphs: Vec<RawGlyph> = output
            .glyph_infos()
            .iter()
            .zip(output.glyph_positions())
            .map(|(info, pos)| RawGlyph {
                glyph: info.glyph_id,
                cluster: info.cluster as usize,
                advance: if vertical {
                    -pos.y_advance as f32
                } else {
                    pos.x_advance as f32
                },
                x_offset: pos.x_offset as f32,
                y_offset: pos.y_offset as f32,
            })
            .collect();

        // HarfBuzz emits right-to-left runs in visual order.
        if params.direction == RunDirection::RightToLeft {
            glyphs.reverse();
        }
        glyphs
    }

    fn supported_features(&self) -> Vec<[u8; 4]> {
        let Some(face) = self.face() else {
            return Vec::new();
        };
        let tables = face.tables();
        let mut tags = Vec::new();
        for table in [tables.gsub, tables.gpos].into_iter().flatten() {
            for feature in table.features {
                tags.push(feature.tag.to_bytes());
            }
        }
        tags.sort_unstable();
        tags.dedup();
        tags
    }

    fn supported_variations(&self) -> Vec<VariationAxis> {
        let Some(face) = self.face() else {
            return Vec::new();
        };
        face.variation_axes()
            .into_iter()
            .map(|axis| VariationAxis {
                tag: axis.tag.to_bytes(),
                min: axis.min_value,
                default: axis.def_value,
                max: axis.max_value,
            })
            .collect()
    }
}
