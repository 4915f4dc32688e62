//! Rich diagnostic error types for profiles and user settings.

use miette::Diagnostic;
use thiserror::Error;

/// Errors from profile and settings operations.
#[derive(Debug, Error, Diagnostic)]
pub enum ProfileError {
    #[error("failed to read profile config: {path}")]
    #[diagnostic(
        code(pen::profile::config_read),
        help("Ensure the profile file exists and is readable.")
    )]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse profile config: {path}: {message}")]
    #[diagnostic(
        code(pen::profile::config_parse),
        help(
            "Check the TOML syntax. A profile needs a [Handwriting] table and one \
             table with a `Data` key per character set."
        )
    )]
    ConfigParse { path: String, message: String },

    #[error("failed to write config: {path}")]
    #[diagnostic(
        code(pen::profile::config_write),
        help("Ensure you have write permissions to the config directory.")
    )]
    ConfigWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("custom set \"{id}\" is declared but has no table")]
    #[diagnostic(
        code(pen::profile::missing_set),
        help("Add a [{id}] table with a `Data` key, or remove \"{id}\" from `customSets`.")
    )]
    MissingSet { id: String },

    #[error("profile \"{profile}\" does not allow changing {setting}")]
    #[diagnostic(
        code(pen::profile::locked),
        help("Set `{capability} = true` in the profile's [Handwriting] table to allow this.")
    )]
    Locked {
        profile: String,
        setting: &'static str,
        capability: &'static str,
    },
}

pub type ProfileResult<T> = std::result::Result<T, ProfileError>;
