//! Character set file layout.
//!
//! ```text
//! set := version:string title:string description:string [type:i8] character*
//! ```
//!
//! The type byte is present from version 1.1 on. Older files carry the
//! classification in their title (`abc`, `ABC`, `123`) or, for the combining
//! set, in the file name. Characters follow until end of file.

use std::path::Path;

use crate::character::Character;
use crate::codec::{ByteReader, ByteWriter, decode_character, encode_character};
use crate::error::{CodecError, CodecResult};

use super::CharSetType;

/// Version string written by [`encode_set`].
pub const CURRENT_VERSION: &str = "QPT 1.1";

/// Decoded contents of one set file.
#[derive(Debug, Default)]
pub struct SetFile {
    pub title: String,
    pub description: String,
    pub kind: CharSetType,
    pub chars: Vec<Character>,
    /// Set when a character record failed to decode. Records before it
    /// are kept in `chars`.
    pub error: Option<CodecError>,
}

/// Whether a version string announces the type byte (`QPT major.minor`
/// with `major >= 1 && minor > 0`).
fn has_type_byte(version: &str) -> bool {
    let major = version
        .get(4..5)
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(0);
    let minor = version
        .get(6..)
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(0);
    major >= 1 && minor > 0
}

fn infer_kind(title: &str, filename: &str) -> CharSetType {
    match title {
        "abc" => CharSetType::LOWER,
        "ABC" => CharSetType::UPPER,
        "123" => CharSetType::NUMERIC,
        _ if Path::new(filename).file_stem().is_some_and(|s| s == "Combining") => {
            CharSetType::COMBINING
        }
        _ => CharSetType::empty(),
    }
}

/// Decode a whole set file. `filename` is only used to classify pre-1.1
/// combining sets.
///
/// Header errors fail the decode; a bad character record stops reading
/// and is reported through [`SetFile::error`].
pub fn decode_set(bytes: &[u8], filename: &str) -> CodecResult<SetFile> {
    let mut r = ByteReader::new(bytes);
    let version = r.read_string()?.ok_or_else(|| CodecError::BadVersion {
        version: String::new(),
    })?;
    let title = r.read_string()?.unwrap_or_default();
    let description = r.read_string()?.unwrap_or_default();
    let kind = if has_type_byte(&version) {
        CharSetType::from_bits_retain(r.read_i8()? as u8)
    } else {
        infer_kind(&title, filename)
    };

    let mut set = SetFile {
        title,
        description,
        kind,
        ..SetFile::default()
    };
    while !r.is_at_end() {
        match decode_character(&mut r) {
            Ok(ch) => set.chars.push(ch),
            Err(e) => {
                set.error = Some(e);
                break;
            }
        }
    }
    Ok(set)
}

/// Encode a set file in the current version.
pub fn encode_set<'a>(
    title: &str,
    description: &str,
    kind: CharSetType,
    chars: impl IntoIterator<Item = &'a Character>,
) -> CodecResult<Vec<u8>> {
    let mut w = ByteWriter::new();
    w.write_string(Some(CURRENT_VERSION));
    w.write_string(Some(title));
    w.write_string(Some(description));
    w.write_i8(kind.bits() as i8);
    for ch in chars {
        encode_character(ch, &mut w)?;
    }
    Ok(w.into_inner())
}
