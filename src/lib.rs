// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # penmatch
//!
//! Online handwriting recognition for pen and touch input methods.
//! Strokes are captured as chain codes, summarized by fixed-length
//! signatures, and ranked against trainable template sets.
//!
//! ## Architecture
//!
//! - **Strokes** (`stroke`): chain-code capture, geometry, stroke matching
//! - **Signatures** (`signature`): tangent, angle and distance profiles
//! - **Characters** (`character`): multi-stroke templates and their matching
//! - **Character sets** (`charset`): ranked lookup, system/user overlay, `.qpt` files
//! - **Profiles** (`profile`): which sets to use and how strokes are grouped
//! - **Recognizer** (`engine`): pointer events in, ranked candidates out
//!
//! ## Library usage
//!
//! ```no_run
//! use penmatch::engine::Recognizer;
//! use penmatch::paths::HandwritingPaths;
//! use penmatch::profile::Profile;
//!
//! let paths = HandwritingPaths::resolve().unwrap();
//! let profile = Profile::load(&paths.profile_file("default"), paths.clone()).unwrap();
//! let recognizer = Recognizer::new(profile);
//! println!("{}", recognizer.info());
//! ```

pub mod character;
pub mod charset;
pub mod codec;
pub mod combining;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod paths;
pub mod profile;
pub mod signature;
pub mod stroke;
