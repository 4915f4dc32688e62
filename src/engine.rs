//! Recognizer facade: top-level API for an input method.
//!
//! The `Recognizer` owns a [`Profile`], turns pointer events into strokes,
//! groups strokes into characters by timing, and ranks the result against
//! the profile's character sets. Timestamps are supplied by the caller so
//! the grouping policy stays deterministic.

use std::time::Duration;

use crate::character::{Character, Identity, SpecialKey};
use crate::charset::CharMatch;
use crate::geometry::Point;
use crate::profile::{CaseStyle, Profile, SetId};
use crate::stroke::{REFERENCE_CANVAS_HEIGHT, Stroke};

/// Capture state: `Idle → Collecting → Idle`.
#[derive(Debug, Clone, Default)]
enum Capture {
    #[default]
    Idle,
    Collecting { stroke: Stroke, down_at: Duration },
}

/// A ranked template together with the set it came from.
#[derive(Debug, Clone, Copy)]
pub struct SetMatch<'a> {
    pub set: &'a SetId,
    pub error: u32,
    pub character: &'a Character,
}

/// Handwriting recognizer bound to one profile.
#[derive(Debug)]
pub struct Recognizer {
    profile: Profile,
    canvas_height: i32,
    capture: Capture,
    strokes: Vec<Stroke>,
    last_pen_up: Option<Duration>,
    caps: bool,
}

impl Recognizer {
    /// Create a recognizer, loading the profile's character sets.
    pub fn new(mut profile: Profile) -> Self {
        profile.ensure_loaded();
        tracing::info!(
            profile = %profile.identifier(),
            sets = profile.sets().len(),
            style = ?profile.style(),
            "initializing recognizer"
        );
        Self {
            profile,
            canvas_height: REFERENCE_CANVAS_HEIGHT,
            capture: Capture::Idle,
            strokes: Vec::new(),
            last_pen_up: None,
            caps: false,
        }
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn profile_mut(&mut self) -> &mut Profile {
        &mut self.profile
    }

    /// Height of the input surface; strokes are normalized against it.
    pub fn set_canvas_height(&mut self, height: i32) {
        self.canvas_height = height.max(1);
    }

    /// Whether uppercase is active under [`CaseStyle::ToggleCases`].
    pub fn caps(&self) -> bool {
        self.caps
    }

    pub fn set_caps(&mut self, caps: bool) {
        self.caps = caps;
    }

    // -----------------------------------------------------------------------
    // Capture
    // -----------------------------------------------------------------------

    /// Start a stroke at `p`.
    ///
    /// If the strokes collected so far already form a complete character
    /// at `at`, that character is returned and a new one begins.
    pub fn pen_down(&mut self, p: Point, at: Duration) -> Option<Character> {
        let finished = if self.is_character_complete(at) {
            self.take_character()
        } else {
            None
        };
        let mut stroke = Stroke::new();
        stroke.set_canvas_height(self.canvas_height);
        stroke.begin_input(p);
        self.capture = Capture::Collecting { stroke, down_at: at };
        finished
    }

    /// Feed a pointer sample. Returns `false` when the stroke is full or
    /// no stroke is in progress.
    pub fn pen_move(&mut self, p: Point) -> bool {
        match &mut self.capture {
            Capture::Collecting { stroke, .. } => stroke.add_point(p),
            Capture::Idle => false,
        }
    }

    /// Finish the current stroke. Returns `false` if there was none or it
    /// was discarded as too brief.
    pub fn pen_up(&mut self, at: Duration) -> bool {
        let Capture::Collecting { mut stroke, down_at } = std::mem::take(&mut self.capture) else {
            return false;
        };
        stroke.end_input();

        let held = at.saturating_sub(down_at);
        if self.profile.can_ignore_stroke() && held < self.profile.ignore_stroke_timeout() {
            tracing::debug!(held_ms = held.as_millis() as u64, "ignoring brief stroke");
            return false;
        }
        self.strokes.push(stroke);
        self.last_pen_up = Some(at);
        true
    }

    pub fn is_collecting(&self) -> bool {
        matches!(self.capture, Capture::Collecting { .. })
    }

    /// Strokes of the character being written.
    pub fn pending_strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    /// Whether the pending strokes form a complete character at `now`:
    /// the multi-stroke timeout has passed since the last pen-up, or no
    /// loaded template has more strokes.
    pub fn is_character_complete(&self, now: Duration) -> bool {
        if self.is_collecting() || self.strokes.is_empty() {
            return false;
        }
        if self.strokes.len() >= self.max_strokes() {
            return true;
        }
        self.last_pen_up
            .is_some_and(|up| now.saturating_sub(up) >= self.profile.multi_stroke_timeout())
    }

    /// Build a character from the pending strokes and start afresh.
    pub fn take_character(&mut self) -> Option<Character> {
        if self.strokes.is_empty() {
            return None;
        }
        let mut ch = Character::new();
        for stroke in self.strokes.drain(..) {
            ch.add_stroke(stroke);
        }
        self.last_pen_up = None;
        Some(ch)
    }

    /// Drop any pending strokes and any stroke in progress.
    pub fn reset(&mut self) {
        self.capture = Capture::Idle;
        self.strokes.clear();
        self.last_pen_up = None;
    }

    fn max_strokes(&self) -> usize {
        self.active_sets()
            .map(|(_, set)| set.max_strokes())
            .max()
            .unwrap_or(0)
            .max(1)
    }

    // -----------------------------------------------------------------------
    // Recognition
    // -----------------------------------------------------------------------

    /// Sets consulted by [`recognize_all`](Self::recognize_all). Under
    /// [`CaseStyle::ToggleCases`] only the active case participates.
    pub fn active_sets(&self) -> impl Iterator<Item = &(SetId, crate::charset::CharacterSet)> {
        let toggle = self.profile.style() == CaseStyle::ToggleCases;
        let caps = self.caps;
        self.profile.sets().iter().filter(move |(id, _)| match id {
            SetId::Uppercase => !toggle || caps,
            SetId::Lowercase => !toggle || !caps,
            _ => true,
        })
    }

    /// Rank `ch` against one set.
    pub fn recognize(&self, ch: &Character, set: &SetId) -> Vec<CharMatch<'_>> {
        self.profile
            .char_set(set)
            .map(|s| s.match_with(ch, self.profile.match_options()))
            .unwrap_or_default()
    }

    /// Rank `ch` against every active set, best first.
    pub fn recognize_all(&self, ch: &Character) -> Vec<SetMatch<'_>> {
        let opts = self.profile.match_options();
        let mut all: Vec<SetMatch<'_>> = self
            .active_sets()
            .flat_map(|(id, set)| {
                set.match_with(ch, opts).into_iter().map(move |m| SetMatch {
                    set: id,
                    error: m.error,
                    character: m.character,
                })
            })
            .collect();
        all.sort_by_key(|m| m.error);
        tracing::debug!(
            strokes = ch.stroke_count(),
            candidates = all.len(),
            best = %all.first().map(|m| m.character.name()).unwrap_or_default(),
            "recognized character"
        );
        all
    }

    /// Apply the side effects of a recognized character on the recognizer
    /// itself: the caps gestures flip the active case.
    pub fn apply(&mut self, identity: Identity) {
        if let Identity::Control(SpecialKey::Caps | SpecialKey::CapsLock) = identity {
            self.caps = !self.caps;
        }
    }

    /// Summary of the profile and loaded sets.
    pub fn info(&self) -> RecognizerInfo {
        RecognizerInfo {
            identifier: self.profile.identifier().to_string(),
            name: self.profile.name().to_string(),
            style: self.profile.style(),
            multi_stroke_timeout: self.profile.multi_stroke_timeout(),
            ignore_stroke_timeout: self.profile.ignore_stroke_timeout(),
            canvas_position: self.profile.match_options().canvas_position,
            sets: self
                .profile
                .sets()
                .iter()
                .map(|(id, set)| SetInfo {
                    id: id.to_string(),
                    title: set.title().to_string(),
                    characters: set.len(),
                    max_strokes: set.max_strokes(),
                })
                .collect(),
        }
    }
}

/// Per-set line of [`RecognizerInfo`].
#[derive(Debug, Clone)]
pub struct SetInfo {
    pub id: String,
    pub title: String,
    pub characters: usize,
    pub max_strokes: usize,
}

/// Profile and set summary.
#[derive(Debug, Clone)]
pub struct RecognizerInfo {
    pub identifier: String,
    pub name: String,
    pub style: CaseStyle,
    pub multi_stroke_timeout: Duration,
    pub ignore_stroke_timeout: Duration,
    pub canvas_position: bool,
    pub sets: Vec<SetInfo>,
}

impl std::fmt::Display for RecognizerInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "penmatch profile {} ({})", self.identifier, self.name)?;
        writeln!(f, "  style:          {:?}", self.style)?;
        writeln!(f, "  multi timeout:  {} ms", self.multi_stroke_timeout.as_millis())?;
        writeln!(f, "  ignore timeout: {} ms", self.ignore_stroke_timeout.as_millis())?;
        writeln!(f, "  position:       {}", self.canvas_position)?;
        for set in &self.sets {
            writeln!(
                f,
                "  {:<12} {:<8} {:>4} chars, up to {} strokes",
                set.id, set.title, set.characters, set.max_strokes
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charset::CharacterSet;
    use crate::paths::HandwritingPaths;
    use crate::profile::ProfileConfig;
    use std::path::Path;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn recognizer(config: &str) -> Recognizer {
        let cfg = ProfileConfig::parse(config, Path::new("test.toml")).unwrap();
        let paths = HandwritingPaths::rooted(Path::new("/nonexistent-penmatch"));
        Recognizer::new(crate::profile::Profile::from_config("test", cfg, paths))
    }

    fn draw(r: &mut Recognizer, points: &[(i32, i32)], down: u64, up: u64) -> bool {
        let (first, rest) = points.split_first().unwrap();
        r.pen_down(Point::new(first.0, first.1), ms(down));
        for &(x, y) in rest {
            r.pen_move(Point::new(x, y));
        }
        r.pen_up(ms(up))
    }

    fn with_two_stroke_template(r: &mut Recognizer) {
        let mut t = Character::with_symbol('t');
        t.add_stroke(Stroke::from_points(&[Point::new(0, 0), Point::new(0, 20)]));
        t.add_stroke(Stroke::from_points(&[Point::new(-8, 6), Point::new(8, 6)]));
        r.profile_mut()
            .char_set_mut(&SetId::Lowercase)
            .unwrap()
            .push(t);
    }

    #[test]
    fn strokes_group_until_the_timeout() {
        let mut r = recognizer("[Lowercase]\nData = \"lower.qpt\"\n");
        with_two_stroke_template(&mut r);
        assert!(draw(&mut r, &[(0, 0), (0, 20)], 0, 300));
        assert!(!r.is_character_complete(ms(700)));
        assert!(r.is_character_complete(ms(800)));

        let done = r.pen_down(Point::new(0, 0), ms(900)).unwrap();
        assert_eq!(done.stroke_count(), 1);
        assert!(r.pending_strokes().is_empty());
    }

    #[test]
    fn stroke_limit_completes_early() {
        let mut r = recognizer("[Lowercase]\nData = \"lower.qpt\"\n");
        with_two_stroke_template(&mut r);
        assert!(draw(&mut r, &[(0, 0), (0, 20)], 0, 300));
        assert!(r.pen_down(Point::new(-8, 6), ms(400)).is_none());
        r.pen_move(Point::new(8, 6));
        assert!(r.pen_up(ms(600)));
        assert!(r.is_character_complete(ms(601)));
        assert_eq!(r.take_character().unwrap().stroke_count(), 2);
    }

    #[test]
    fn timeout_completes_the_character() {
        let mut r = recognizer("[Settings]\nMultiTimeout = 400\n[Lowercase]\nData = \"lower.qpt\"\n");
        with_two_stroke_template(&mut r);
        assert!(draw(&mut r, &[(0, 0), (0, 20)], 0, 100));
        assert!(!r.is_character_complete(ms(499)));
        assert!(r.is_character_complete(ms(500)));
        let ch = r.take_character().unwrap();
        assert_eq!(ch.stroke_count(), 1);
        assert!(r.take_character().is_none());
    }

    #[test]
    fn single_stroke_limit_completes_without_templates() {
        let mut r = recognizer("[Settings]\nMultiTimeout = 400\n");
        assert!(draw(&mut r, &[(0, 0), (0, 20)], 0, 100));
        assert!(r.is_character_complete(ms(101)));
    }

    #[test]
    fn brief_strokes_are_ignored_only_when_allowed() {
        let mut strict = recognizer("[Handwriting]\nCanIgnoreStroke = true\n");
        assert!(!draw(&mut strict, &[(0, 0), (3, 3)], 0, 50));
        assert!(strict.pending_strokes().is_empty());
        assert!(draw(&mut strict, &[(0, 0), (3, 3)], 100, 400));

        let mut lax = recognizer("");
        assert!(draw(&mut lax, &[(0, 0), (3, 3)], 0, 50));
    }

    #[test]
    fn pen_events_without_a_stroke_are_rejected() {
        let mut r = recognizer("");
        assert!(!r.pen_move(Point::new(1, 1)));
        assert!(!r.pen_up(ms(10)));
        assert!(!r.is_collecting());
    }

    #[test]
    fn canvas_height_reaches_captured_strokes() {
        let mut r = recognizer("");
        r.set_canvas_height(150);
        draw(&mut r, &[(0, 0), (0, 30)], 0, 300);
        assert_eq!(r.pending_strokes()[0].canvas_height(), 150);
    }

    #[test]
    fn toggle_cases_filters_letter_sets() {
        let mut r = recognizer(
            "[Settings]\nStyle = \"ToggleCases\"\n[Uppercase]\nData = \"u.qpt\"\n[Lowercase]\nData = \"l.qpt\"\n[Numeric]\nData = \"n.qpt\"\n",
        );
        let active: Vec<SetId> = r.active_sets().map(|(id, _)| id.clone()).collect();
        assert_eq!(active, vec![SetId::Lowercase, SetId::Numeric]);

        r.apply(Identity::Control(SpecialKey::Caps));
        let active: Vec<SetId> = r.active_sets().map(|(id, _)| id.clone()).collect();
        assert_eq!(active, vec![SetId::Uppercase, SetId::Numeric]);
    }

    #[test]
    fn recognize_all_merges_sets() {
        let mut r = recognizer("[Lowercase]\nData = \"l.qpt\"\n[Numeric]\nData = \"n.qpt\"\n");
        let line = Stroke::from_points(&[Point::new(0, 0), Point::new(0, 20)]);
        let mut l = Character::with_symbol('l');
        l.add_stroke(line.clone());
        let mut one = Character::with_symbol('1');
        one.add_stroke(Stroke::from_points(&[Point::new(0, 0), Point::new(1, 20)]));

        let set: &mut CharacterSet = r.profile_mut().char_set_mut(&SetId::Lowercase).unwrap();
        set.push(l);
        r.profile_mut()
            .char_set_mut(&SetId::Numeric)
            .unwrap()
            .push(one);

        let mut input = Character::new();
        input.add_stroke(line);
        let ranked = r.recognize_all(&input);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].character.symbol(), Some('l'));
        assert_eq!(ranked[0].set, &SetId::Lowercase);
        assert_eq!(ranked[0].error, 6);
        assert!(ranked[1].error >= ranked[0].error);

        assert_eq!(r.recognize(&input, &SetId::Numeric).len(), 1);
        assert!(r.recognize(&input, &SetId::Symbol).is_empty());
    }
}
