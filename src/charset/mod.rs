//! Character sets: ordered template collections with ranked matching.
//!
//! A set is backed by two files with the same name: a read-only system file
//! and a user file in the user template directory. Loading reads the system
//! file and overlays the user file; saving only ever writes the user file.
//! System templates are never removed, only flagged [`CharFlags::DELETED`]
//! so they can be restored later.

pub mod file;

use std::path::{Path, PathBuf};

use bitflags::bitflags;

use crate::character::{CharFlags, Character, Identity};
use crate::error::{CharSetError, CharSetResult, CodecError};
use crate::paths::HandwritingPaths;
use crate::stroke::MatchOptions;

pub use file::{CURRENT_VERSION, SetFile, decode_set, encode_set};

/// Errors above this are not reported as matches.
pub const MATCH_THRESHOLD: u32 = 200_000;

bitflags! {
    /// Classification of a set's contents. Stored as one byte on disk.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CharSetType: u8 {
        const LOWER = 0x01;
        const UPPER = 0x02;
        const COMBINING = 0x04;
        const NUMERIC = 0x08;
        const PUNCTUATION = 0x10;
        const SYMBOL = 0x20;
        const SHORTCUT = 0x40;
    }
}

/// One ranked template.
#[derive(Debug, Clone, Copy)]
pub struct CharMatch<'a> {
    pub error: u32,
    pub character: &'a Character,
}

/// An ordered, persistable collection of characters.
#[derive(Debug, Clone)]
pub struct CharacterSet {
    title: String,
    description: String,
    kind: CharSetType,
    max_strokes: usize,
    chars: Vec<Character>,
    filename: String,
    system_dir: PathBuf,
    user_dir: PathBuf,
}

impl Default for CharacterSet {
    fn default() -> Self {
        Self::new()
    }
}

impl CharacterSet {
    pub fn new() -> Self {
        Self {
            title: "abc".to_string(),
            description: "Unnamed".to_string(),
            kind: CharSetType::empty(),
            max_strokes: 0,
            chars: Vec::new(),
            filename: String::new(),
            system_dir: PathBuf::new(),
            user_dir: PathBuf::new(),
        }
    }

    /// An empty set bound to `filename` in the given directories.
    pub fn with_paths(filename: impl Into<String>, paths: &HandwritingPaths) -> Self {
        let mut set = Self::new();
        set.filename = filename.into();
        set.set_directories(&paths.system_dir, &paths.user_dir);
        set
    }

    // -----------------------------------------------------------------------
    // Metadata
    // -----------------------------------------------------------------------

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn kind(&self) -> CharSetType {
        self.kind
    }

    pub fn set_kind(&mut self, kind: CharSetType) {
        self.kind = kind;
    }

    /// Highest stroke count of any character ever added. May exceed the
    /// current maximum after removals.
    pub fn max_strokes(&self) -> usize {
        self.max_strokes
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn set_filename(&mut self, filename: impl Into<String>) {
        self.filename = filename.into();
    }

    pub fn set_directories(&mut self, system_dir: impl Into<PathBuf>, user_dir: impl Into<PathBuf>) {
        self.system_dir = system_dir.into();
        self.user_dir = user_dir.into();
    }

    pub fn system_path(&self) -> Option<PathBuf> {
        (!self.filename.is_empty()).then(|| self.system_dir.join(&self.filename))
    }

    pub fn user_path(&self) -> Option<PathBuf> {
        (!self.filename.is_empty()).then(|| self.user_dir.join(&self.filename))
    }

    // -----------------------------------------------------------------------
    // Access
    // -----------------------------------------------------------------------

    pub fn characters(&self) -> &[Character] {
        &self.chars
    }

    pub fn get(&self, index: usize) -> Option<&Character> {
        self.chars.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Character> {
        self.chars.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Character> {
        self.chars.iter()
    }

    /// Index of the first character with `identity`.
    pub fn position(&self, identity: Identity) -> Option<usize> {
        self.chars.iter().position(|c| c.identity() == identity)
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    pub fn push(&mut self, ch: Character) {
        self.max_strokes = self.max_strokes.max(ch.stroke_count());
        self.chars.push(ch);
    }

    pub fn remove(&mut self, index: usize) -> Option<Character> {
        (index < self.chars.len()).then(|| self.chars.remove(index))
    }

    /// Move the character at `index` one place toward the front, so it
    /// wins ties in [`match_char`](Self::match_char) sooner.
    ///
    /// Older template editors used the opposite convention, where "up"
    /// meant toward the end of the list. Callers porting ordering code
    /// from them must swap the two calls.
    pub fn move_up(&mut self, index: usize) -> bool {
        if index == 0 || index >= self.chars.len() {
            return false;
        }
        self.chars.swap(index, index - 1);
        true
    }

    /// Move the character at `index` one place toward the back. See
    /// [`move_up`](Self::move_up) for the direction convention.
    pub fn move_down(&mut self, index: usize) -> bool {
        if index + 1 >= self.chars.len() {
            return false;
        }
        self.chars.swap(index, index + 1);
        true
    }

    /// Drop every character. The stroke maximum is kept.
    pub fn clear(&mut self) {
        self.chars.clear();
    }

    /// Flag every system character with the same identity as `ch` deleted.
    /// User characters are left alone.
    pub fn mark_deleted(&mut self, ch: &Character) {
        let identity = ch.identity();
        for c in &mut self.chars {
            if c.identity() == identity && c.is_system() {
                c.set_flag(CharFlags::DELETED);
            }
        }
    }

    /// Add a user-trained template.
    ///
    /// Live system templates with the same identity are copied as user
    /// templates and the originals are soft-deleted, so the user's
    /// training overrides the system's without losing it.
    pub fn add_user_char(&mut self, mut ch: Character) {
        let identity = ch.identity();
        let mut copies = Vec::new();
        for c in &mut self.chars {
            if c.identity() == identity && c.is_system() && !c.is_deleted() {
                let mut copy = c.clone();
                copy.clear_flag(CharFlags::SYSTEM);
                copies.push(copy);
                c.set_flag(CharFlags::DELETED);
            }
        }
        for copy in copies {
            self.push(copy);
        }
        ch.clear_flag(CharFlags::SYSTEM | CharFlags::DELETED);
        self.push(ch);
    }

    /// Remove the template at `index`: system templates are soft-deleted,
    /// user templates are dropped.
    pub fn remove_char(&mut self, index: usize) -> bool {
        let Some(ch) = self.chars.get_mut(index) else {
            return false;
        };
        if ch.is_system() {
            ch.set_flag(CharFlags::DELETED);
        } else {
            self.chars.remove(index);
        }
        true
    }

    /// Drop every user template with `identity`, keeping system ones.
    pub fn remove_user_chars(&mut self, identity: Identity) -> usize {
        let before = self.chars.len();
        self.chars
            .retain(|c| c.identity() != identity || c.is_system());
        before - self.chars.len()
    }

    /// Return `identity` to its system templates: deleted system templates
    /// are re-enabled and user templates are dropped. Does nothing when
    /// no system template exists for the identity.
    pub fn restore(&mut self, identity: Identity) -> bool {
        if !self
            .chars
            .iter()
            .any(|c| c.identity() == identity && c.is_system())
        {
            return false;
        }
        self.remove_user_chars(identity);
        for c in &mut self.chars {
            if c.identity() == identity {
                c.clear_flag(CharFlags::DELETED);
            }
        }
        true
    }

    // -----------------------------------------------------------------------
    // Matching
    // -----------------------------------------------------------------------

    /// Rank every live template against `input` with default options.
    pub fn match_char(&self, input: &Character) -> Vec<CharMatch<'_>> {
        self.match_with(input, &MatchOptions::default())
    }

    /// Rank every live template against `input`, best first.
    ///
    /// Templates with fewer strokes than the input are skipped. A template
    /// with more strokes is penalized threefold. Only the best entry per
    /// identity and stroke count is kept.
    pub fn match_with(&self, input: &Character, opts: &MatchOptions) -> Vec<CharMatch<'_>> {
        let mut matches: Vec<CharMatch<'_>> = Vec::new();
        for tmpl in &self.chars {
            if tmpl.is_deleted() || input.stroke_count() > tmpl.stroke_count() {
                continue;
            }
            let mut error = input.match_with(tmpl, opts);
            if error > MATCH_THRESHOLD {
                continue;
            }
            if tmpl.stroke_count() != input.stroke_count() {
                error = (error * 3).min(MATCH_THRESHOLD);
            }

            let existing = matches.iter_mut().find(|m| {
                m.character.identity() == tmpl.identity()
                    && m.character.stroke_count() == tmpl.stroke_count()
            });
            match existing {
                Some(m) => m.error = m.error.min(error),
                None => matches.push(CharMatch {
                    error,
                    character: tmpl,
                }),
            }
        }
        matches.sort_by_key(|m| m.error);
        matches
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Bind to `filename` and [`load`](Self::load).
    pub fn load_file(&mut self, filename: impl Into<String>) -> bool {
        self.filename = filename.into();
        self.load()
    }

    /// Read the system file, then overlay the user file.
    ///
    /// Every user record soft-deletes the system templates it overrides.
    /// Stroke-less deleted user records only carry that deletion. Failures
    /// are logged and leave whatever was read. Returns `true` if at least
    /// one file was read completely.
    pub fn load(&mut self) -> bool {
        self.clear();
        let (Some(system), Some(user)) = (self.system_path(), self.user_path()) else {
            tracing::warn!("character set has no file name, nothing to load");
            return false;
        };

        let mut ok = false;
        for (path, is_user) in [(system, false), (user, true)] {
            let file = match self.read_file(&path) {
                Ok(Some(file)) => file,
                Ok(None) => {
                    tracing::debug!(path = %path.display(), "no character set file");
                    continue;
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "cannot load character set");
                    continue;
                }
            };
            let count = file.chars.len();
            match self.apply_file(file, is_user) {
                Some(e) => {
                    tracing::warn!(path = %path.display(), error = %e, read = count, "character set truncated");
                }
                None => {
                    tracing::debug!(path = %path.display(), chars = count, user = is_user, "loaded character set");
                    ok = true;
                }
            }
        }
        ok
    }

    /// Strict variant of [`load`](Self::load): an unreadable or malformed
    /// file is an error instead of a warning. Records read before the
    /// failure stay in the set. Missing files are not an error; returns
    /// whether any file was found.
    pub fn try_load(&mut self) -> CharSetResult<bool> {
        self.clear();
        let system = self.system_path().ok_or(CharSetError::NoFilename)?;
        let user = self.user_path().ok_or(CharSetError::NoFilename)?;

        let mut found = false;
        for (path, is_user) in [(system, false), (user, true)] {
            let Some(file) = self.read_file(&path)? else {
                continue;
            };
            found = true;
            if let Some(source) = self.apply_file(file, is_user) {
                return Err(CharSetError::Malformed { path, source });
            }
        }
        Ok(found)
    }

    /// Read and decode one backing file. `None` if it does not exist.
    fn read_file(&self, path: &Path) -> CharSetResult<Option<SetFile>> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(CharSetError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        decode_set(&bytes, &self.filename)
            .map(Some)
            .map_err(|source| CharSetError::Malformed {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Merge a decoded file into the set and hand back its record error.
    fn apply_file(&mut self, file: SetFile, is_user: bool) -> Option<CodecError> {
        self.title = file.title;
        self.description = file.description;
        self.kind = file.kind;
        for mut ch in file.chars {
            if is_user {
                self.mark_deleted(&ch);
                if ch.is_deleted() && ch.is_empty() {
                    continue;
                }
            } else {
                ch.set_flag(CharFlags::SYSTEM);
            }
            self.push(ch);
        }
        file.error
    }

    /// Records that belong in the user file: every user template plus a
    /// tombstone for each deleted system identity with no user replacement.
    fn user_records(&self) -> Vec<Character> {
        let mut records: Vec<Character> =
            self.chars.iter().filter(|c| !c.is_system()).cloned().collect();
        let mut tombstoned: Vec<Identity> = Vec::new();
        for c in &self.chars {
            let identity = c.identity();
            if !(c.is_system() && c.is_deleted()) || tombstoned.contains(&identity) {
                continue;
            }
            if self
                .chars
                .iter()
                .any(|u| !u.is_system() && u.identity() == identity)
            {
                continue;
            }
            let mut tombstone = Character::new();
            tombstone.set_identity(identity);
            tombstone.set_flags(CharFlags::DELETED);
            records.push(tombstone);
            tombstoned.push(identity);
        }
        records
    }

    /// Write the user file through a `.new` temporary and a rename.
    /// The system file is never written.
    pub fn save(&self) -> CharSetResult<()> {
        let path = self.user_path().ok_or(CharSetError::NoFilename)?;
        let records = self.user_records();
        let bytes = encode_set(&self.title, &self.description, self.kind, &records).map_err(
            |source| CharSetError::Encode {
                path: path.clone(),
                source,
            },
        )?;

        std::fs::create_dir_all(&self.user_dir).map_err(|source| CharSetError::Io {
            path: self.user_dir.clone(),
            source,
        })?;
        let mut tmp = path.clone().into_os_string();
        tmp.push(".new");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, &bytes).map_err(|source| CharSetError::Io {
            path: tmp.clone(),
            source,
        })?;
        if let Err(source) = std::fs::rename(&tmp, &path) {
            tracing::warn!(from = %tmp.display(), to = %path.display(), error = %source, "rename failed");
            let _ = std::fs::remove_file(&tmp);
            return Err(CharSetError::Rename { path, source });
        }
        tracing::debug!(path = %path.display(), records = records.len(), "saved character set");
        Ok(())
    }
}

impl<'a> IntoIterator for &'a CharacterSet {
    type Item = &'a Character;
    type IntoIter = std::slice::Iter<'a, Character>;

    fn into_iter(self) -> Self::IntoIter {
        self.chars.iter()
    }
}
