//! Script assignment.

use unicode_script::{Script, UnicodeScript};

/// Whether a script is neutral and takes the script of its neighbours.
pub(crate) fn is_neutral(script: Script) -> bool {
    matches!(script, Script::Common | Script::Inherited | Script::Unknown)
}

/// Resolve a script per character.
///
/// Neutral characters (spaces, digits, punctuation, combining marks) take
/// the script of the preceding character. Leading neutrals take the first
/// real script that follows; text with no real script stays `Common`.
pub(crate) fn resolve_scripts(chars: &[char]) -> Vec<Script> {
    let mut scripts: Vec<Script> = chars.iter().map(|c| c.script()).collect();

    let mut current = None;
    for script in scripts.iter_mut() {
        if is_neutral(*script) {
            if let Some(prev) = current {
                *script = prev;
            }
        } else {
            current = Some(*script);
        }
    }

    if let Some(first) = scripts.iter().position(|s| !is_neutral(*s)) {
        let real = scripts[first];
        for script in &mut scripts[..first] {
            *script = real;
        }
    } else {
        scripts.fill(Script::Common);
    }
    scripts
}

/// ISO 15924 tag of a script, as passed to the shaper.
pub fn script_tag(script: Script) -> [u8; 4] {
    let mut tag = [b' '; 4];
    for (slot, byte) in tag.iter_mut().zip(script.short_name().bytes()) {
        *slot = byte;
    }
    tag
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn test_neutrals_follow_previous() {
        let scripts = resolve_scripts(&chars("ab 12 אב"));
        assert_eq!(scripts[2], Script::Latin);
        assert_eq!(scripts[4], Script::Latin);
        assert_eq!(scripts[6], Script::Hebrew);
    }

    #[test]
    fn test_leading_neutrals_take_next() {
        let scripts = resolve_scripts(&chars("\"מה"));
        assert_eq!(scripts[0], Script::Hebrew);
    }

    #[test]
    fn test_all_neutral_is_common() {
        assert!(resolve_scripts(&chars("12 !")).iter().all(|s| *s == Script::Common));
    }

    #[test]
    fn test_script_tag() {
        assert_eq!(script_tag(Script::Arabic), *b"Arab");
        assert_eq!(script_tag(Script::Latin), *b"Latn");
    }
}
