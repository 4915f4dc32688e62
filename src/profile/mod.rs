//! Handwriting profiles: named bundles of character sets plus tuning.
//!
//! A profile is read from a TOML file (see [`config`]). Its character sets
//! are not touched until [`Profile::ensure_loaded`] is called; read
//! accessors never load anything and report an unloaded profile as having
//! no sets.

pub mod config;
pub mod error;
pub mod settings;

use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::charset::CharacterSet;
use crate::combining;
use crate::paths::HandwritingPaths;
use crate::stroke::MatchOptions;

pub use config::{CaseStyle, ProfileConfig, SetSection};
pub use error::{ProfileError, ProfileResult};
pub use settings::{UserSettings, UserTuning};

/// Slot a character set fills in a profile.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SetId {
    Uppercase,
    Lowercase,
    Numeric,
    Punctuation,
    Symbol,
    Shortcut,
    Custom(String),
}

impl SetId {
    /// The fixed slots, in load order.
    pub const FIXED: [SetId; 6] = [
        SetId::Uppercase,
        SetId::Lowercase,
        SetId::Numeric,
        SetId::Punctuation,
        SetId::Symbol,
        SetId::Shortcut,
    ];

    /// Parse a table name. Anything that is not a fixed slot is custom.
    pub fn from_key(key: &str) -> Self {
        match key {
            "Uppercase" => Self::Uppercase,
            "Lowercase" => Self::Lowercase,
            "Numeric" => Self::Numeric,
            "Punctuation" => Self::Punctuation,
            "Symbol" => Self::Symbol,
            "Shortcut" => Self::Shortcut,
            other => Self::Custom(other.to_string()),
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Self::Uppercase => "Uppercase",
            Self::Lowercase => "Lowercase",
            Self::Numeric => "Numeric",
            Self::Punctuation => "Punctuation",
            Self::Symbol => "Symbol",
            Self::Shortcut => "Shortcut",
            Self::Custom(id) => id,
        }
    }
}

impl fmt::Display for SetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Whether a profile's character sets have been read from disk.
#[derive(Debug, Clone, Default)]
pub enum SetsState {
    #[default]
    NotLoaded,
    Loaded(Vec<(SetId, CharacterSet)>),
}

/// A complete recognition configuration.
#[derive(Debug, Clone)]
pub struct Profile {
    identifier: String,
    name: String,
    description: String,
    can_select_style: bool,
    can_ignore_stroke: bool,
    style: CaseStyle,
    multi_stroke_timeout: Duration,
    ignore_stroke_timeout: Duration,
    match_options: MatchOptions,
    slots: Vec<(SetId, SetSection)>,
    combining: Option<SetSection>,
    paths: HandwritingPaths,
    sets: SetsState,
}

impl Profile {
    /// A profile with built-in defaults and no sets.
    pub fn with_defaults(identifier: impl Into<String>, paths: HandwritingPaths) -> Self {
        let identifier = identifier.into();
        Self::from_config(&identifier, ProfileConfig::default(), paths)
    }

    /// Read a profile, failing on any configuration error.
    ///
    /// Every name in `customSets` must have its own table.
    pub fn load(path: &Path, paths: HandwritingPaths) -> ProfileResult<Self> {
        let config = ProfileConfig::load(path)?;
        if let Some(id) = config
            .handwriting
            .custom_sets
            .iter()
            .find(|id| !config.sets.contains_key(id.as_str()))
        {
            return Err(ProfileError::MissingSet { id: id.clone() });
        }
        let profile = Self::from_config(&identifier_of(path), config, paths);
        tracing::debug!(
            profile = %profile.identifier,
            slots = profile.slots.len(),
            "loaded profile"
        );
        Ok(profile)
    }

    /// Read a profile, falling back to defaults when the file is missing
    /// or malformed.
    pub fn open(path: &Path, paths: HandwritingPaths) -> Self {
        match ProfileConfig::load(path) {
            Ok(config) => Self::from_config(&identifier_of(path), config, paths),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "using default profile");
                Self::with_defaults(identifier_of(path), paths)
            }
        }
    }

    /// Build from a parsed config. Declared custom sets without a table
    /// are skipped with a warning.
    pub fn from_config(identifier: &str, config: ProfileConfig, paths: HandwritingPaths) -> Self {
        let mut slots = Vec::new();
        for id in SetId::FIXED {
            if let Some(section) = config.sets.get(id.key()) {
                slots.push((id, section.clone()));
            }
        }
        for custom in &config.handwriting.custom_sets {
            match config.sets.get(custom) {
                Some(section) => slots.push((SetId::from_key(custom), section.clone())),
                None => tracing::warn!(profile = identifier, set = %custom, "declared set has no table"),
            }
        }
        for key in config.sets.keys() {
            if matches!(SetId::from_key(key), SetId::Custom(_))
                && !config.handwriting.custom_sets.contains(key)
            {
                tracing::debug!(profile = identifier, set = %key, "ignoring undeclared set table");
            }
        }

        let settings = config.settings;
        Self {
            identifier: identifier.to_string(),
            name: config.handwriting.name,
            description: config.handwriting.description,
            can_select_style: config.handwriting.can_select_style,
            can_ignore_stroke: config.handwriting.can_ignore_stroke,
            style: settings.style,
            multi_stroke_timeout: Duration::from_millis(settings.multi_timeout),
            ignore_stroke_timeout: Duration::from_millis(settings.ignore_timeout),
            match_options: MatchOptions {
                canvas_position: settings.canvas_position,
            },
            slots,
            combining: config.combining,
            paths,
            sets: SetsState::NotLoaded,
        }
    }

    // -----------------------------------------------------------------------
    // Identity and capabilities
    // -----------------------------------------------------------------------

    /// Base name of the profile file; keys the user settings store.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn can_select_style(&self) -> bool {
        self.can_select_style
    }

    pub fn can_ignore_stroke(&self) -> bool {
        self.can_ignore_stroke
    }

    // -----------------------------------------------------------------------
    // Tuning
    // -----------------------------------------------------------------------

    pub fn style(&self) -> CaseStyle {
        self.style
    }

    pub fn set_style(&mut self, style: CaseStyle) -> ProfileResult<()> {
        if !self.can_select_style {
            return Err(self.locked("the case style", "CanSelectStyle"));
        }
        self.style = style;
        Ok(())
    }

    /// Longest pause between strokes of one character.
    pub fn multi_stroke_timeout(&self) -> Duration {
        self.multi_stroke_timeout
    }

    pub fn set_multi_stroke_timeout(&mut self, timeout: Duration) {
        self.multi_stroke_timeout = timeout;
    }

    /// Strokes with a shorter pen-down time are discarded when allowed.
    pub fn ignore_stroke_timeout(&self) -> Duration {
        self.ignore_stroke_timeout
    }

    pub fn set_ignore_stroke_timeout(&mut self, timeout: Duration) -> ProfileResult<()> {
        if !self.can_ignore_stroke {
            return Err(self.locked("the ignore-stroke timeout", "CanIgnoreStroke"));
        }
        self.ignore_stroke_timeout = timeout;
        Ok(())
    }

    pub fn match_options(&self) -> &MatchOptions {
        &self.match_options
    }

    pub fn set_match_options(&mut self, opts: MatchOptions) {
        self.match_options = opts;
    }

    fn locked(&self, setting: &'static str, capability: &'static str) -> ProfileError {
        ProfileError::Locked {
            profile: self.identifier.clone(),
            setting,
            capability,
        }
    }

    /// Apply this profile's stored user overrides. Overrides the profile
    /// does not permit are skipped.
    pub fn apply_user_settings(&mut self, settings: &UserSettings) {
        let Some(tuning) = settings.get(&self.identifier) else {
            return;
        };
        if let Some(ms) = tuning.multi_timeout {
            self.set_multi_stroke_timeout(Duration::from_millis(ms));
        }
        if let Some(style) = tuning.style {
            if let Err(e) = self.set_style(style) {
                tracing::debug!(error = %e, "style override skipped");
            }
        }
        if let Some(ms) = tuning.ignore_timeout {
            if let Err(e) = self.set_ignore_stroke_timeout(Duration::from_millis(ms)) {
                tracing::debug!(error = %e, "ignore timeout override skipped");
            }
        }
    }

    // -----------------------------------------------------------------------
    // Character sets
    // -----------------------------------------------------------------------

    /// Declared slots in load order.
    pub fn slots(&self) -> impl Iterator<Item = &SetId> {
        self.slots.iter().map(|(id, _)| id)
    }

    pub fn combining_section(&self) -> Option<&SetSection> {
        self.combining.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.sets, SetsState::Loaded(_))
    }

    pub fn sets_state(&self) -> &SetsState {
        &self.sets
    }

    /// Load every declared set unless already loaded, then synthesize
    /// accented characters into the letter sets.
    pub fn ensure_loaded(&mut self) {
        if self.is_loaded() {
            return;
        }
        let mut sets = Vec::with_capacity(self.slots.len());
        for (id, section) in &self.slots {
            let mut set = CharacterSet::with_paths(section.data.as_str(), &self.paths);
            if !set.load() {
                tracing::warn!(profile = %self.identifier, set = %id, file = %section.data, "character set not loaded");
            }
            if let Some(title) = &section.title {
                set.set_title(title.as_str());
            }
            if let Some(description) = &section.description {
                set.set_description(description.as_str());
            }
            sets.push((id.clone(), set));
        }

        if let Some(section) = &self.combining {
            let mut accents = CharacterSet::with_paths(section.data.as_str(), &self.paths);
            if accents.load() {
                for (_, set) in &mut sets {
                    combining::add_combined(set, &accents);
                }
            } else {
                tracing::warn!(profile = %self.identifier, file = %section.data, "combining set not loaded");
            }
        }
        self.sets = SetsState::Loaded(sets);
    }

    /// Drop loaded sets; the next [`ensure_loaded`](Self::ensure_loaded)
    /// reads them again.
    pub fn unload(&mut self) {
        self.sets = SetsState::NotLoaded;
    }

    /// Loaded sets, or nothing before [`ensure_loaded`](Self::ensure_loaded).
    pub fn sets(&self) -> &[(SetId, CharacterSet)] {
        match &self.sets {
            SetsState::Loaded(sets) => sets,
            SetsState::NotLoaded => &[],
        }
    }

    pub fn char_set(&self, id: &SetId) -> Option<&CharacterSet> {
        self.sets()
            .iter()
            .find(|(slot, _)| slot == id)
            .map(|(_, set)| set)
    }

    pub fn char_set_mut(&mut self, id: &SetId) -> Option<&mut CharacterSet> {
        match &mut self.sets {
            SetsState::Loaded(sets) => sets
                .iter_mut()
                .find(|(slot, _)| slot == id)
                .map(|(_, set)| set),
            SetsState::NotLoaded => None,
        }
    }

    /// Persist user templates of every loaded set.
    pub fn save_sets(&self) -> crate::error::PenResult<()> {
        for (_, set) in self.sets() {
            set.save()?;
        }
        Ok(())
    }
}

fn identifier_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
