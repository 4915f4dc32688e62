//! Profile file layout.
//!
//! ```toml
//! [Handwriting]
//! Name = "Default"
//! Description = "Letters, digits and punctuation"
//! CanSelectStyle = true
//! CanIgnoreStroke = true
//! customSets = ["Greek"]
//!
//! [Settings]
//! Style = "ToggleCases"
//! MultiTimeout = 500
//! IgnoreTimeout = 200
//! CanvasPosition = true
//!
//! [Uppercase]
//! Data = "asciiupper.qpt"
//!
//! [Greek]
//! Data = "greek.qpt"
//! Title = "αβγ"
//!
//! [Combining]
//! Data = "Combining.qpt"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::{ProfileError, ProfileResult};

/// How upper- and lowercase sets are offered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaseStyle {
    /// Both cases are recognized at once.
    #[default]
    BothCases,
    /// One case at a time, switched by the caps gesture.
    ToggleCases,
}

/// A whole profile file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileConfig {
    #[serde(rename = "Handwriting", default)]
    pub handwriting: HandwritingSection,
    #[serde(rename = "Settings", default)]
    pub settings: SettingsSection,
    #[serde(rename = "Combining", default, skip_serializing_if = "Option::is_none")]
    pub combining: Option<SetSection>,
    /// Every other table, keyed by set id.
    #[serde(flatten)]
    pub sets: BTreeMap<String, SetSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HandwritingSection {
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Description", default)]
    pub description: String,
    #[serde(rename = "CanSelectStyle", default)]
    pub can_select_style: bool,
    #[serde(rename = "CanIgnoreStroke", default)]
    pub can_ignore_stroke: bool,
    #[serde(rename = "customSets", default)]
    pub custom_sets: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsSection {
    #[serde(rename = "Style", default)]
    pub style: CaseStyle,
    /// Milliseconds.
    #[serde(rename = "MultiTimeout", default = "default_multi_timeout")]
    pub multi_timeout: u64,
    /// Milliseconds.
    #[serde(rename = "IgnoreTimeout", default = "default_ignore_timeout")]
    pub ignore_timeout: u64,
    #[serde(rename = "CanvasPosition", default = "default_canvas_position")]
    pub canvas_position: bool,
}

pub(crate) fn default_multi_timeout() -> u64 {
    500
}
pub(crate) fn default_ignore_timeout() -> u64 {
    200
}
fn default_canvas_position() -> bool {
    true
}

impl Default for SettingsSection {
    fn default() -> Self {
        Self {
            style: CaseStyle::default(),
            multi_timeout: default_multi_timeout(),
            ignore_timeout: default_ignore_timeout(),
            canvas_position: default_canvas_position(),
        }
    }
}

/// One character set slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetSection {
    /// File name, resolved against the system and user template directories.
    #[serde(rename = "Data")]
    pub data: String,
    #[serde(rename = "Title", default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "Description", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ProfileConfig {
    pub fn parse(content: &str, path: &Path) -> ProfileResult<Self> {
        toml::from_str(content).map_err(|e| ProfileError::ConfigParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> ProfileResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ProfileError::ConfigRead {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::parse(&content, path)
    }

    /// Save to a TOML file.
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
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[Handwriting]
Name = "Default"
Description = "Letters and digits"
CanSelectStyle = true
customSets = ["Greek"]

[Settings]
Style = "ToggleCases"
MultiTimeout = 650

[Uppercase]
Data = "asciiupper.qpt"

[Numeric]
Data = "numeric.qpt"
Title = "123"

[Greek]
Data = "greek.qpt"

[Combining]
Data = "Combining.qpt"
"#;

    #[test]
    fn parses_sections_and_set_tables() {
        let cfg = ProfileConfig::parse(SAMPLE, Path::new("default.toml")).unwrap();
        assert_eq!(cfg.handwriting.name, "Default");
        assert!(cfg.handwriting.can_select_style);
        assert!(!cfg.handwriting.can_ignore_stroke);
        assert_eq!(cfg.handwriting.custom_sets, vec!["Greek".to_string()]);
        assert_eq!(cfg.settings.style, CaseStyle::ToggleCases);
        assert_eq!(cfg.settings.multi_timeout, 650);
        assert_eq!(cfg.settings.ignore_timeout, 200);
        assert!(cfg.settings.canvas_position);
        assert_eq!(cfg.combining.as_ref().map(|c| c.data.as_str()), Some("Combining.qpt"));
        assert_eq!(
            cfg.sets.keys().cloned().collect::<Vec<_>>(),
            vec!["Greek", "Numeric", "Uppercase"]
        );
        assert_eq!(cfg.sets["Numeric"].title.as_deref(), Some("123"));
    }

    #[test]
    fn empty_file_uses_defaults() {
        let cfg = ProfileConfig::parse("", Path::new("empty.toml")).unwrap();
        assert_eq!(cfg.settings.style, CaseStyle::BothCases);
        assert_eq!(cfg.settings.multi_timeout, 500);
        assert!(cfg.sets.is_empty());
    }

    #[test]
    fn set_table_without_data_is_an_error() {
        let err = ProfileConfig::parse("[Uppercase]\nTitle = \"ABC\"\n", Path::new("bad.toml"))
            .unwrap_err();
        assert!(matches!(err, ProfileError::ConfigParse { .. }));
    }

    #[test]
    fn save_and_reload() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("profiles").join("mine.toml");
        let cfg = ProfileConfig::parse(SAMPLE, &path).unwrap();
        cfg.save(&path).unwrap();

        let back = ProfileConfig::load(&path).unwrap();
        assert_eq!(back.sets, cfg.sets);
        assert_eq!(back.combining, cfg.combining);
        assert_eq!(back.settings.multi_timeout, 650);
    }
}
