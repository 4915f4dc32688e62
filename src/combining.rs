//! Accent synthesis.
//!
//! A combining set holds one glyph per diacritic. Each live letter of an
//! upper- or lowercase set is paired with every accent whose composition
//! exists in Unicode, and the accent's strokes are placed above the
//! letter's. The results are flagged [`CharFlags::SYSTEM`] so they are never
//! written to the user file; they are rebuilt on every load.

use unicode_normalization::char::compose;

use crate::character::{CharFlags, Character, Identity};
use crate::charset::{CharSetType, CharacterSet};
use crate::geometry::Point;

/// Gap between the top of the letter and the bottom of the accent.
const ACCENT_GAP: i32 = 2;

/// Accent glyph symbols and the combining marks they stand for.
const ACCENT_MARKS: [(char, char); 6] = [
    ('\\', '\u{0300}'),
    ('/', '\u{0301}'),
    ('^', '\u{0302}'),
    ('~', '\u{0303}'),
    ('"', '\u{0308}'),
    ('o', '\u{030A}'),
];

/// The combining mark an accent glyph stands for. Combining marks map to
/// themselves.
pub fn combining_mark(symbol: char) -> Option<char> {
    ACCENT_MARKS
        .iter()
        .find(|&&(glyph, mark)| glyph == symbol || mark == symbol)
        .map(|&(_, mark)| mark)
}

/// Whether accents are synthesized for sets of this type.
pub fn accepts_combining(kind: CharSetType) -> bool {
    kind.intersects(CharSetType::UPPER | CharSetType::LOWER)
}

/// Build `composed` from the strokes of `base` and `accent`.
///
/// The accent is centred over the letter, or placed just right of it when
/// flagged [`CharFlags::COMBINE_RIGHT`]. A multi-stroke `i` loses its dot.
pub fn combine(base: &Character, accent: &Character, composed: char) -> Character {
    let mut out = Character::with_symbol(composed);
    out.set_flags(CharFlags::SYSTEM);

    let mut base_strokes = base.strokes();
    if base.symbol() == Some('i') && base_strokes.len() > 1 {
        base_strokes = &base_strokes[..base_strokes.len() - 1];
    }
    for stroke in base_strokes {
        out.add_stroke(stroke.clone());
    }

    let (Some(brect), Some(arect)) = (out.bounding_rect(), accent.bounding_rect()) else {
        return out;
    };
    let dx = if accent.test_flag(CharFlags::COMBINE_RIGHT) {
        brect.left - arect.left + brect.width() + ACCENT_GAP
    } else {
        brect.left - arect.left + (brect.width() - arect.width()) / 2
    };
    let dy = brect.top - ACCENT_GAP - arect.bottom;
    let offset = Point::new(dx, dy);
    for stroke in accent.strokes() {
        let mut placed = stroke.clone();
        placed.set_start_point(stroke.start_point() + offset);
        out.add_stroke(placed);
    }
    out
}

/// Add synthesized accented characters to `set`. Returns how many were added.
///
/// Does nothing unless the set is typed upper- or lowercase.
pub fn add_combined(set: &mut CharacterSet, accents: &CharacterSet) -> usize {
    if !accepts_combining(set.kind()) {
        return 0;
    }
    let mut combined = Vec::new();
    for base in set.iter().filter(|c| !c.is_deleted()) {
        let Identity::Symbol(letter) = base.identity() else {
            continue;
        };
        for accent in accents.iter().filter(|c| !c.is_deleted()) {
            let Some(mark) = accent.symbol().and_then(combining_mark) else {
                continue;
            };
            if let Some(composed) = compose(letter, mark) {
                combined.push(combine(base, accent, composed));
            }
        }
    }
    let added = combined.len();
    for ch in combined {
        set.push(ch);
    }
    tracing::debug!(set = set.title(), added, "synthesized accented characters");
    added
}
