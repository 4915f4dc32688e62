//! Trainable characters: an identity plus one or more strokes.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rect};
use crate::stroke::{MatchOptions, NO_MATCH, REFERENCE_CANVAS_HEIGHT, Stroke};

/// Horizontal drift between stroke centres tolerated before penalizing.
const DRIFT_TOLERANCE_X: i64 = 6;
/// Vertical drift between stroke centres tolerated before penalizing.
const DRIFT_TOLERANCE_Y: i64 = 5;
/// Drift beyond the tolerance that rules a pair out entirely.
const MAX_DRIFT: i64 = 10;
const DRIFT_WEIGHT: u64 = 6;

bitflags! {
    /// Per-character state bits, stored as one byte on disk.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CharFlags: u8 {
        /// Shipped with the system template file. Disabled, never deleted.
        const SYSTEM = 0x01;
        /// Soft-disabled system character.
        const DELETED = 0x02;
        /// Accent glyph aligned to the right of its base when combining.
        const COMBINE_RIGHT = 0x04;
        /// Legacy payload marker; only ever read, never written.
        const DATA = 0x08;
    }
}

/// Control keys a character can stand for instead of a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpecialKey {
    Escape,
    Tab,
    Backspace,
    Return,
    Caps,
    Shortcut,
    CapsLock,
    Punctuation,
    Symbol,
    NextWord,
    WordPopup,
    SymbolPopup,
    ModePopup,
}

impl SpecialKey {
    pub const ALL: [SpecialKey; 13] = [
        Self::Escape,
        Self::Tab,
        Self::Backspace,
        Self::Return,
        Self::Caps,
        Self::Shortcut,
        Self::CapsLock,
        Self::Punctuation,
        Self::Symbol,
        Self::NextWord,
        Self::WordPopup,
        Self::SymbolPopup,
        Self::ModePopup,
    ];

    /// Key code used by input-method consumers.
    pub fn code(self) -> u32 {
        match self {
            Self::Escape => 0x0100_0000,
            Self::Tab => 0x0100_0001,
            Self::Backspace => 0x0100_0003,
            Self::Return => 0x0100_0004,
            other => other.legacy_code(),
        }
    }

    /// 16-bit code stored in the high half of a character's identity word.
    pub fn legacy_code(self) -> u32 {
        match self {
            Self::Escape => 0x1000,
            Self::Tab => 0x1001,
            Self::Backspace => 0x1003,
            Self::Return => 0x1004,
            Self::Caps => 0x4001,
            Self::Shortcut => 0x4002,
            Self::CapsLock => 0x4003,
            Self::Punctuation => 0x4004,
            Self::Symbol => 0x4005,
            Self::NextWord => 0x4007,
            Self::WordPopup => 0x4008,
            Self::SymbolPopup => 0x4009,
            Self::ModePopup => 0x400A,
        }
    }

    /// Fixed display label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Escape => "[Esc]",
            Self::Tab => "[Tab]",
            Self::Backspace => "[BackSpace]",
            Self::Return => "[Return]",
            Self::Caps => "[Uppercase]",
            Self::Shortcut => "[Shortcut]",
            Self::CapsLock => "[Caps Lock]",
            Self::Punctuation => "[Punctuation]",
            Self::Symbol => "[Symbol]",
            Self::NextWord => "[Next Word]",
            Self::WordPopup => "[Word Menu]",
            Self::SymbolPopup => "[Symbol Menu]",
            Self::ModePopup => "[Mode Menu]",
        }
    }

    /// Control character produced by text-editing keys.
    pub fn text_char(self) -> Option<char> {
        match self {
            Self::Escape => Some('\u{1b}'),
            Self::Tab => Some('\t'),
            Self::Backspace => Some('\u{08}'),
            Self::Return => Some('\r'),
            _ => None,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.code() == code)
    }

    pub fn from_legacy_code(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.legacy_code() == code)
    }
}

/// What a character stands for. Symbol and control key are exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Identity {
    #[default]
    None,
    Symbol(char),
    Control(SpecialKey),
}

/// One trainable glyph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Character {
    identity: Identity,
    flags: CharFlags,
    strokes: Vec<Stroke>,
}

impl Character {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_symbol(symbol: char) -> Self {
        Self {
            identity: Identity::Symbol(symbol),
            ..Self::default()
        }
    }

    pub fn with_key(key: SpecialKey) -> Self {
        Self {
            identity: Identity::Control(key),
            ..Self::default()
        }
    }

    pub fn identity(&self) -> Identity {
        self.identity
    }

    pub fn set_identity(&mut self, identity: Identity) {
        self.identity = identity;
    }

    /// Represent `symbol`, clearing any control key.
    pub fn set_symbol(&mut self, symbol: char) {
        self.identity = Identity::Symbol(symbol);
    }

    /// Represent `key`, clearing any symbol.
    pub fn set_key(&mut self, key: SpecialKey) {
        self.identity = Identity::Control(key);
    }

    /// The text this character produces, if any.
    pub fn symbol(&self) -> Option<char> {
        match self.identity {
            Identity::None => None,
            Identity::Symbol(c) => Some(c),
            Identity::Control(k) => k.text_char(),
        }
    }

    pub fn key(&self) -> Option<SpecialKey> {
        match self.identity {
            Identity::Control(k) => Some(k),
            _ => None,
        }
    }

    /// Display name: the symbol itself or the control key's label.
    pub fn name(&self) -> String {
        match self.identity {
            Identity::None => String::new(),
            Identity::Symbol(c) => c.to_string(),
            Identity::Control(k) => k.label().to_string(),
        }
    }

    pub fn flags(&self) -> CharFlags {
        self.flags
    }

    pub fn set_flags(&mut self, flags: CharFlags) {
        self.flags = flags;
    }

    pub fn set_flag(&mut self, flag: CharFlags) {
        self.flags.insert(flag);
    }

    pub fn clear_flag(&mut self, flag: CharFlags) {
        self.flags.remove(flag);
    }

    pub fn test_flag(&self, flag: CharFlags) -> bool {
        self.flags.contains(flag)
    }

    pub fn is_system(&self) -> bool {
        self.test_flag(CharFlags::SYSTEM)
    }

    pub fn is_deleted(&self) -> bool {
        self.test_flag(CharFlags::DELETED)
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn strokes_mut(&mut self) -> &mut [Stroke] {
        &mut self.strokes
    }

    pub fn add_stroke(&mut self, stroke: Stroke) {
        self.strokes.push(stroke);
    }

    pub fn stroke_count(&self) -> usize {
        self.strokes.len()
    }

    /// Link count of stroke `n`, or 0 if there is no such stroke.
    pub fn stroke_len(&self, n: usize) -> usize {
        self.strokes.get(n).map_or(0, Stroke::len)
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    /// Start of the first stroke.
    pub fn starting_point(&self) -> Option<Point> {
        self.strokes.first().map(Stroke::start_point)
    }

    /// Union of every stroke's bounds. Coordinates may be negative since
    /// templates are stored relative to where drawing began.
    pub fn bounding_rect(&self) -> Option<Rect> {
        self.strokes
            .iter()
            .map(Stroke::bounding_rect)
            .reduce(Rect::union)
    }

    /// Reset identity, flags and strokes.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Error between this character and `template` with default options.
    pub fn match_char(&self, template: &Character) -> u32 {
        self.match_with(template, &MatchOptions::default())
    }

    /// Error between this character and `template`; lower is better.
    ///
    /// Strokes are compared pairwise over the common prefix only. The worst
    /// stroke error is kept and a squared drift penalty is added for strokes
    /// whose centres move relative to the first stroke. Returns `u32::MAX`
    /// when either side has no strokes or the drift is hopeless.
    ///
    /// The candidate's drift is scaled to the reference height twice while
    /// the template's is not scaled at all. Stored templates depend on this
    /// weighting, so it is kept as is.
    pub fn match_with(&self, template: &Character, opts: &MatchOptions) -> u32 {
        let (Some(first), Some(template_first)) = (self.strokes.first(), template.strokes.first())
        else {
            return u32::MAX;
        };

        let mut err = first.match_with(template_first, opts);
        let mut max_err = err;
        let mut drift = 0u64;
        let origin = first.bounding_rect().center();
        let template_origin = template_first.bounding_rect().center();

        for (stroke, other) in self.strokes.iter().zip(&template.strokes).skip(1) {
            if err >= NO_MATCH {
                break;
            }
            let height = stroke.canvas_height();
            let p1 = (stroke.bounding_rect().center() - origin)
                .scaled(REFERENCE_CANVAS_HEIGHT, height)
                .scaled(REFERENCE_CANVAS_HEIGHT, height);
            let p2 = other.bounding_rect().center() - template_origin;

            let dx = ((i64::from(p1.x) - i64::from(p2.x)).abs() - DRIFT_TOLERANCE_X).max(0);
            let dy = ((i64::from(p1.y) - i64::from(p2.y)).abs() - DRIFT_TOLERANCE_Y).max(0);
            if dx > MAX_DRIFT || dy > MAX_DRIFT {
                return u32::MAX;
            }
            drift += (dx * dx + dy * dy) as u64;

            err = stroke.match_with(other, opts);
            max_err = max_err.max(err);
        }

        let penalty = drift.saturating_mul(drift).saturating_mul(DRIFT_WEIGHT);
        u32::try_from(u64::from(max_err).saturating_add(penalty)).unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stroke(points: &[(i32, i32)]) -> Stroke {
        let pts: Vec<Point> = points.iter().map(|&(x, y)| Point::new(x, y)).collect();
        Stroke::from_points(&pts)
    }

    fn character(symbol: char, strokes: &[&[(i32, i32)]]) -> Character {
        let mut ch = Character::with_symbol(symbol);
        for s in strokes {
            ch.add_stroke(stroke(s));
        }
        ch
    }

    #[test]
    fn symbol_and_key_are_exclusive() {
        let mut ch = Character::with_symbol('a');
        assert_eq!(ch.symbol(), Some('a'));
        assert_eq!(ch.key(), None);

        ch.set_key(SpecialKey::Return);
        assert_eq!(ch.key(), Some(SpecialKey::Return));
        assert_eq!(ch.symbol(), Some('\r'));
        assert_eq!(ch.identity(), Identity::Control(SpecialKey::Return));

        ch.set_symbol('b');
        assert_eq!(ch.key(), None);
    }

    #[test]
    fn names_use_key_labels() {
        assert_eq!(Character::with_symbol('x').name(), "x");
        assert_eq!(Character::with_key(SpecialKey::Backspace).name(), "[BackSpace]");
        assert_eq!(Character::with_key(SpecialKey::CapsLock).name(), "[Caps Lock]");
        assert_eq!(Character::with_key(SpecialKey::WordPopup).name(), "[Word Menu]");
        assert_eq!(Character::new().name(), "");
    }

    #[test]
    fn key_codes_round_trip() {
        for key in SpecialKey::ALL {
            assert_eq!(SpecialKey::from_code(key.code()), Some(key));
            assert_eq!(SpecialKey::from_legacy_code(key.legacy_code()), Some(key));
            assert!(key.legacy_code() <= 0xFFFF);
        }
        assert_eq!(SpecialKey::Caps.code(), 0x4001);
        assert_eq!(SpecialKey::Escape.code(), 0x0100_0000);
        assert_eq!(SpecialKey::from_code(0x4006), None);
    }

    #[test]
    fn flags_toggle() {
        let mut ch = Character::new();
        ch.set_flag(CharFlags::SYSTEM);
        ch.set_flag(CharFlags::DELETED);
        assert!(ch.is_system() && ch.is_deleted());
        ch.clear_flag(CharFlags::DELETED);
        assert!(!ch.is_deleted());
        assert_eq!(ch.flags().bits(), 0x01);
    }

    #[test]
    fn stroke_queries() {
        let ch = character('t', &[&[(0, 0), (0, 10)], &[(-4, 3), (4, 3)]]);
        assert_eq!(ch.stroke_count(), 2);
        assert_eq!(ch.stroke_len(0), 10);
        assert_eq!(ch.stroke_len(1), 8);
        assert_eq!(ch.stroke_len(5), 0);
        assert_eq!(ch.starting_point(), Some(Point::new(0, 0)));
        assert_eq!(
            ch.bounding_rect(),
            Some(Rect { left: -4, top: 0, right: 4, bottom: 10 })
        );
        assert_eq!(Character::new().bounding_rect(), None);
    }

    #[test]
    fn identical_characters_score_low() {
        let t = character('t', &[&[(0, 0), (0, 20)], &[(-8, 6), (8, 6)]]);
        assert_eq!(t.match_char(&t.clone()), 6);
    }

    #[test]
    fn empty_characters_never_match() {
        let t = character('t', &[&[(0, 0), (0, 20)]]);
        assert_eq!(Character::new().match_char(&t), u32::MAX);
        assert_eq!(t.match_char(&Character::new()), u32::MAX);
    }

    #[test]
    fn drift_is_penalized_quadratically() {
        // Second stroke centres sit 20 and 8 units right of the first: 12 - 6 = 6.
        let cand = character('x', &[&[(0, 0), (20, 0)], &[(30, 0), (30, 20)]]);
        let tmpl = character('x', &[&[(0, 0), (20, 0)], &[(18, 0), (18, 20)]]);
        assert_eq!(cand.match_char(&tmpl), 6 + 36 * 36 * 6);
    }

    #[test]
    fn hopeless_drift_is_rejected() {
        let cand = character('x', &[&[(0, 0), (20, 0)], &[(40, 0), (40, 20)]]);
        let tmpl = character('x', &[&[(0, 0), (20, 0)], &[(18, 0), (18, 20)]]);
        assert_eq!(cand.match_char(&tmpl), u32::MAX);
    }

    #[test]
    fn far_drift_on_a_small_canvas_saturates() {
        let mut cand = character('x', &[&[(0, 0), (20, 0)]]);
        let mut far = Stroke::from_points(&[Point::new(0, 0), Point::new(0, 20)]);
        far.set_start_point(Point::new(crate::stroke::MAX_COORDINATE, 0));
        cand.add_stroke(far);
        for s in cand.strokes_mut() {
            s.set_canvas_height(1);
        }
        let tmpl = character('x', &[&[(0, 0), (20, 0)], &[(10, 0), (10, 20)]]);
        assert_eq!(cand.match_char(&tmpl), u32::MAX);
    }

    #[test]
    fn only_the_common_prefix_is_compared() {
        let one = character('i', &[&[(0, 0), (0, 20)]]);
        let two = character('i', &[&[(0, 0), (0, 20)], &[(30, -40), (31, -40)]]);
        let first_only = one.strokes()[0].match_stroke(&two.strokes()[0]);
        assert_eq!(one.match_char(&two), first_only);
        assert_eq!(two.match_char(&one), first_only);
    }

    #[test]
    fn candidate_drift_is_scaled_twice() {
        // Candidate on a 150 canvas: drift 40 becomes 20 then 10, which
        // lines up exactly with the template's unscaled drift of 10.
        let mut cand = character('=', &[&[(0, 0), (20, 0)], &[(0, 40), (20, 40)]]);
        for s in cand.strokes_mut() {
            s.set_canvas_height(150);
        }
        let tmpl = character('=', &[&[(0, 0), (20, 0)], &[(0, 10), (20, 10)]]);

        let worst = cand.strokes()[0]
            .match_stroke(&tmpl.strokes()[0])
            .max(cand.strokes()[1].match_stroke(&tmpl.strokes()[1]));
        assert_eq!(cand.match_char(&tmpl), worst);
    }

    #[test]
    fn rejected_first_stroke_stops_the_walk() {
        let cand = character('x', &[&[(0, 0), (0, 20)], &[(200, 0), (200, 20)]]);
        let tmpl = character('x', &[&[(0, 0), (20, 0)], &[(0, 0), (0, 20)]]);
        // The first pair is rejected, so the far-off second stroke is never
        // checked for drift.
        assert_eq!(cand.match_char(&tmpl), NO_MATCH);
    }
}
