//! Per-user tuning overrides.
//!
//! Stored as one TOML table per profile identifier. Only the values a user
//! may change are kept; whether a value is applied still depends on the
//! profile's capability flags.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::Profile;
use super::config::CaseStyle;
use super::error::{ProfileError, ProfileResult};

/// Overrides for one profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserTuning {
    #[serde(rename = "Style", default, skip_serializing_if = "Option::is_none")]
    pub style: Option<CaseStyle>,
    /// Milliseconds.
    #[serde(rename = "MultiTimeout", default, skip_serializing_if = "Option::is_none")]
    pub multi_timeout: Option<u64>,
    /// Milliseconds.
    #[serde(rename = "IgnoreTimeout", default, skip_serializing_if = "Option::is_none")]
    pub ignore_timeout: Option<u64>,
}

/// Every profile's overrides, keyed by profile identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserSettings {
    profiles: BTreeMap<String, UserTuning>,
}

impl UserSettings {
    /// Load from `path`. A missing file yields empty settings.
    pub fn load(path: &Path) -> ProfileResult<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(ProfileError::ConfigRead {
                    path: path.display().to_string(),
                    source: e,
                });
            }
        };
        toml::from_str(&content).map_err(|e| ProfileError::ConfigParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Save to `path`, creating the parent directory.
    pub fn save(&self, path: &Path) -> ProfileResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ProfileError::ConfigParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ProfileError::ConfigWrite {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ProfileError::ConfigWrite {
            path: path.display().to_string(),
            source: e,
        })
    }

    pub fn get(&self, identifier: &str) -> Option<&UserTuning> {
        self.profiles.get(identifier)
    }

    pub fn set(&mut self, identifier: impl Into<String>, tuning: UserTuning) {
        self.profiles.insert(identifier.into(), tuning);
    }

    pub fn remove(&mut self, identifier: &str) -> Option<UserTuning> {
        self.profiles.remove(identifier)
    }

    /// Capture the user-adjustable tuning of `profile`.
    pub fn record(&mut self, profile: &Profile) {
        let tuning = UserTuning {
            style: profile.can_select_style().then(|| profile.style()),
            multi_timeout: Some(profile.multi_stroke_timeout().as_millis() as u64),
            ignore_timeout: profile
                .can_ignore_stroke()
                .then(|| profile.ignore_stroke_timeout().as_millis() as u64),
        };
        self.set(profile.identifier(), tuning);
    }
}
