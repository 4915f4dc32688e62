//! Rich diagnostic error types for the penmatch engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains so users know exactly what
//! went wrong and how to fix it. Matching itself never fails; only file and
//! configuration handling produce errors.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::paths::PathError;
use crate::profile::ProfileError;

/// Top-level error type for the penmatch engine.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum PenError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    CharSet(#[from] CharSetError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Profile(#[from] ProfileError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Path(#[from] PathError),
}

// ---------------------------------------------------------------------------
// Codec errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum CodecError {
    #[error("unexpected end of data at byte {offset}: needed {needed} more bytes")]
    #[diagnostic(
        code(pen::codec::eof),
        help(
            "The record is truncated. The file was probably cut short while \
             being written; restore it from a backup or retrain the set."
        )
    )]
    UnexpectedEof { offset: usize, needed: usize },

    #[error("invalid UTF-16 string at byte {offset}")]
    #[diagnostic(
        code(pen::codec::string),
        help("Strings are stored as a 32-bit byte length followed by UTF-16BE code units.")
    )]
    InvalidString { offset: usize },

    #[error("identity word {word:#010x} does not hold a valid symbol")]
    #[diagnostic(
        code(pen::codec::symbol),
        help("The low 16 bits of a character record must be a valid UTF-16 code unit.")
    )]
    InvalidSymbol { word: u32 },

    #[error("symbol {symbol:?} cannot be stored in a 16-bit identity word")]
    #[diagnostic(
        code(pen::codec::symbol_range),
        help("Only characters from the Basic Multilingual Plane can be trained.")
    )]
    SymbolOutOfRange { symbol: char },

    #[error("stroke declares {count} links, more than the limit of {max}")]
    #[diagnostic(
        code(pen::codec::links),
        help("The record is corrupt or was not written by a compatible version.")
    )]
    TooManyLinks { count: usize, max: usize },

    #[error("stroke starts at ({x}, {y}), outside the coordinate limit of {max}")]
    #[diagnostic(
        code(pen::codec::coordinate),
        help("The record is corrupt; start points are canvas positions and stay well below the limit.")
    )]
    CoordinateOutOfRange { x: i32, y: i32, max: i32 },

    #[error("unrecognized set file header: {version:?}")]
    #[diagnostic(
        code(pen::codec::version),
        help("Character set files start with a version string such as \"QPT 1.1\".")
    )]
    BadVersion { version: String },
}

pub type CodecResult<T> = std::result::Result<T, CodecError>;

// ---------------------------------------------------------------------------
// Character set errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum CharSetError {
    #[error("I/O error on {}: {source}", path.display())]
    #[diagnostic(
        code(pen::charset::io),
        help(
            "A filesystem operation failed. Check that the template directory exists, \
             has correct permissions, and that the disk is not full."
        )
    )]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed character set file {}", path.display())]
    #[diagnostic(
        code(pen::charset::malformed),
        help("The file could not be decoded. Remove the user copy to fall back to the system templates.")
    )]
    Malformed {
        path: PathBuf,
        #[source]
        source: CodecError,
    },

    #[error("cannot encode character set for {}", path.display())]
    #[diagnostic(
        code(pen::charset::encode),
        help("A character in the set cannot be represented in the file format. Remove it and save again.")
    )]
    Encode {
        path: PathBuf,
        #[source]
        source: CodecError,
    },

    #[error("character set has no file name")]
    #[diagnostic(
        code(pen::charset::no_filename),
        help("Call `set_filename()` before loading or saving the set.")
    )]
    NoFilename,

    #[error("failed to replace {} with the new copy", path.display())]
    #[diagnostic(
        code(pen::charset::rename),
        help("The temporary `.new` file was removed. Check permissions on the user template directory.")
    )]
    Rename {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type CharSetResult<T> = std::result::Result<T, CharSetError>;

/// Convenience alias for functions returning penmatch results.
pub type PenResult<T> = std::result::Result<T, PenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_error_converts_to_pen_error() {
        let err = CodecError::UnexpectedEof {
            offset: 12,
            needed: 4,
        };
        let pen: PenError = err.into();
        assert!(matches!(pen, PenError::Codec(CodecError::UnexpectedEof { .. })));
    }

    #[test]
    fn charset_error_keeps_its_source() {
        let err = CharSetError::Malformed {
            path: PathBuf::from("/tmp/abc.qpt"),
            source: CodecError::InvalidString { offset: 8 },
        };
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("invalid UTF-16 string at byte 8"));
    }

    #[test]
    fn error_display_messages_are_descriptive() {
        let err = CodecError::TooManyLinks {
            count: 5000,
            max: 2000,
        };
        let msg = format!("{err}");
        assert!(msg.contains("5000"));
        assert!(msg.contains("2000"));
    }
}
