//! Character classification used to flag shaped clusters.

use unicode_linebreak::{BreakOpportunity, linebreaks};

/// Arabic tatweel, inserted for kashida justification.
pub const TATWEEL: char = '\u{0640}';

/// Object replacement character, used as inline object placeholder text.
pub const OBJECT_REPLACEMENT: char = '\u{FFFC}';

/// Whether a character forces a line break after it.
pub fn is_hard_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\u{000B}' | '\u{000C}' | '\u{0085}' | '\u{2028}' | '\u{2029}'
    )
}

/// Whether a character is whitespace for breaking and justification.
pub fn is_space(c: char) -> bool {
    c.is_whitespace()
}

/// Whether a character is a control character other than tab and line
/// breaks.
pub fn is_other_control(c: char) -> bool {
    c.is_control() && c != '\t' && !is_hard_break(c)
}

/// Default punctuation set: ASCII punctuation, general punctuation, CJK
/// punctuation and the common Arabic marks.
pub fn is_punctuation(c: char) -> bool {
    c.is_ascii_punctuation()
        || matches!(
            c,
            '\u{00A1}'
                | '\u{00A7}'
                | '\u{00AB}'
                | '\u{00B6}'
                | '\u{00B7}'
                | '\u{00BB}'
                | '\u{00BF}'
                | '\u{060C}'
                | '\u{061B}'
                | '\u{061F}'
                | '\u{06D4}'
                | '\u{2010}'..='\u{2027}'
                | '\u{2030}'..='\u{205E}'
                | '\u{3001}'..='\u{3003}'
                | '\u{3008}'..='\u{3011}'
                | '\u{3014}'..='\u{301F}'
                | '\u{FF01}'..='\u{FF0F}'
                | '\u{FF1A}'..='\u{FF20}'
        )
}

/// Punctuation test honoring a caller-defined set.
pub(crate) fn is_punctuation_in(c: char, custom: Option<&[char]>) -> bool {
    match custom {
        Some(set) => set.contains(&c),
        None => is_punctuation(c),
    }
}

/// Characters that never need a glyph of their own when testing font
/// coverage.
pub(crate) fn is_coverage_ignorable(c: char) -> bool {
    c.is_control()
        || matches!(
            c,
            '\u{200C}' | '\u{200D}' | '\u{FE00}'..='\u{FE0F}' | '\u{E0100}'..='\u{E01EF}'
        )
}

/// Whether a character is a variation selector.
pub(crate) fn is_variation_selector(c: char) -> bool {
    matches!(c, '\u{FE00}'..='\u{FE0F}' | '\u{E0100}'..='\u{E01EF}')
}

/// Cursive joining behaviour of Arabic-script characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Joining {
    /// Joins on both sides.
    Dual,
    /// Joins only to the preceding letter (alef, dal, ra, waw...).
    Right,
    /// Joins both neighbours without a letter form of its own (tatweel).
    Causing,
    /// Marks that do not affect joining.
    Transparent,
    /// Does not join.
    None,
}

/// Joining type of a character.
pub fn joining(c: char) -> Joining {
    match c {
        '\u{0622}'..='\u{0625}'
        | '\u{0627}'
        | '\u{0629}'
        | '\u{062F}'..='\u{0632}'
        | '\u{0648}'
        | '\u{0671}'..='\u{0673}'
        | '\u{0675}'..='\u{0677}'
        | '\u{0688}'..='\u{0699}'
        | '\u{06C0}'
        | '\u{06C3}'..='\u{06CB}'
        | '\u{06CD}'
        | '\u{06CF}'
        | '\u{06D2}'..='\u{06D3}' => Joining::Right,
        '\u{0626}'
        | '\u{0628}'
        | '\u{062A}'..='\u{062E}'
        | '\u{0633}'..='\u{063F}'
        | '\u{0641}'..='\u{0647}'
        | '\u{0649}'..='\u{064A}'
        | '\u{066E}'..='\u{066F}'
        | '\u{0678}'..='\u{0687}'
        | '\u{069A}'..='\u{06BF}'
        | '\u{06C1}'..='\u{06C2}'
        | '\u{06CC}'
        | '\u{06CE}'
        | '\u{06D0}'..='\u{06D1}'
        | '\u{06FA}'..='\u{06FC}'
        | '\u{06FF}' => Joining::Dual,
        TATWEEL | '\u{200D}' => Joining::Causing,
        '\u{064B}'..='\u{065F}' | '\u{0670}' | '\u{06D6}'..='\u{06ED}' => Joining::Transparent,
        _ => Joining::None,
    }
}

/// Joining type of a cluster: its first non-transparent character.
pub(crate) fn cluster_joining(chars: &[char]) -> Joining {
    chars
        .iter()
        .map(|&c| joining(c))
        .find(|j| *j != Joining::Transparent)
        .unwrap_or(Joining::None)
}

/// Whether a cluster of type `prev` joins the cluster of type `next` that
/// follows it in logical order.
pub(crate) fn joins(prev: Joining, next: Joining) -> bool {
    matches!(prev, Joining::Dual | Joining::Causing)
        && matches!(next, Joining::Dual | Joining::Right | Joining::Causing)
}

/// Width of a hex-code replacement box for `c` at `pixel_size`.
///
/// The box shows the code point's hex digits in two rows.
pub fn hex_box_advance(c: char, pixel_size: f32) -> f32 {
    let columns = if u32::from(c) > 0xFFFF { 3.0 } else { 2.0 };
    (columns * 0.5 + 0.25) * pixel_size
}

/// Line break opportunities as character positions.
///
/// Each entry is the position a line may start at and whether the break
/// is mandatory. The end of text is not included.
pub(crate) fn break_opportunities(text: &str) -> Vec<(usize, bool)> {
    let mut result = Vec::new();
    let mut chars_seen = 0;
    let mut bytes_seen = 0;
    let mut iter = text.char_indices();
    for (byte, opportunity) in linebreaks(text) {
        if byte >= text.len() {
            break;
        }
        while bytes_seen < byte {
            match iter.next() {
                Some((_, c)) => {
                    bytes_seen += c.len_utf8();
                    chars_seen += 1;
                }
                None => break,
            }
        }
        result.push((chars_seen, opportunity == BreakOpportunity::Mandatory));
    }
    result
}
