//! XDG-compliant path resolution for penmatch.
//!
//! System templates are read-only and shipped with the installation; user
//! templates and settings live under the XDG data and config directories.

use std::path::{Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;

/// Environment variable overriding the system template directory.
pub const SYSTEM_DIR_ENV: &str = "PENMATCH_SYSTEM_DIR";

const DEFAULT_SYSTEM_DIR: &str = "/usr/share/penmatch/templates";

/// Errors from path resolution.
#[derive(Debug, Error, Diagnostic)]
pub enum PathError {
    #[error("cannot determine home directory")]
    #[diagnostic(
        code(pen::paths::no_home),
        help("Set the HOME environment variable or ensure a valid user profile exists.")
    )]
    NoHome,

    #[error("failed to create directory: {path}")]
    #[diagnostic(
        code(pen::paths::create_dir),
        help("Check that the parent directory exists and you have write permissions.")
    )]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type PathResult<T> = std::result::Result<T, PathError>;

/// Directories templates and settings are read from and written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandwritingPaths {
    /// Read-only system templates: `$PENMATCH_SYSTEM_DIR` or `/usr/share/penmatch/templates`.
    pub system_dir: PathBuf,
    /// User overrides: `$XDG_DATA_HOME/penmatch/templates/`.
    pub user_dir: PathBuf,
    /// `$XDG_CONFIG_HOME/penmatch/`
    pub config_dir: PathBuf,
}

impl HandwritingPaths {
    /// Resolve directories from environment variables with standard fallbacks.
    pub fn resolve() -> PathResult<Self> {
        let home = std::env::var("HOME")
            .map(PathBuf::from)
            .map_err(|_| PathError::NoHome)?;

        let system_dir = std::env::var(SYSTEM_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_SYSTEM_DIR));

        let user_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home.join(".local/share"))
            .join("penmatch")
            .join("templates");

        let config_dir = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home.join(".config"))
            .join("penmatch");

        Ok(Self {
            system_dir,
            user_dir,
            config_dir,
        })
    }

    /// Paths rooted at an explicit base, for tests and portable installs.
    ///
    /// Layout: `<base>/system`, `<base>/user`, `<base>/config`.
    pub fn rooted(base: &Path) -> Self {
        Self {
            system_dir: base.join("system"),
            user_dir: base.join("user"),
            config_dir: base.join("config"),
        }
    }

    /// Create the writable directories. Idempotent.
    pub fn ensure_dirs(&self) -> PathResult<()> {
        for dir in [&self.user_dir, &self.config_dir] {
            std::fs::create_dir_all(dir).map_err(|e| PathError::CreateDir {
                path: dir.display().to_string(),
                source: e,
            })?;
        }
        Ok(())
    }

    /// Per-user tuning overrides.
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.toml")
    }

    /// Resolve a profile reference: absolute paths are kept, bare names are
    /// looked up in the system directory.
    pub fn profile_file(&self, name: &str) -> PathBuf {
        let path = Path::new(name);
        if path.is_absolute() || path.exists() {
            return path.to_path_buf();
        }
        let file = if path.extension().is_some() {
            name.to_string()
        } else {
            format!("{name}.toml")
        };
        self.system_dir.join(file)
    }
}
