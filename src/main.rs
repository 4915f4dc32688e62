//! penmatch CLI: online handwriting recognition.

use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use serde_json::json;

use penmatch::character::{Character, Identity};
use penmatch::charset::decode_set;
use penmatch::engine::Recognizer;
use penmatch::geometry::Point;
use penmatch::paths::HandwritingPaths;
use penmatch::profile::{CaseStyle, Profile, SetId, UserSettings};
use penmatch::stroke::Stroke;

#[derive(Parser)]
#[command(name = "penmatch", version, about = "Online handwriting recognition")]
struct Cli {
    /// Profile name (looked up in the system directory) or path to a profile file.
    #[arg(long, global = true, default_value = "default")]
    profile: String,

    /// Directory holding the system templates and profiles.
    #[arg(long, global = true)]
    system_dir: Option<PathBuf>,

    /// Directory holding user-trained templates.
    #[arg(long, global = true)]
    user_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the profile and its character sets.
    Info,

    /// Decode a character set file and print it as JSON.
    Dump {
        /// Path to a `.qpt` set file.
        file: PathBuf,
    },

    /// Recognize a character drawn as JSON strokes: `[[[x, y], ...], ...]`.
    Recognize {
        /// Stroke file; reads stdin when omitted.
        #[arg(long)]
        input: Option<PathBuf>,

        /// Only match against this set (e.g. "Lowercase").
        #[arg(long)]
        set: Option<String>,

        /// Number of candidates to print.
        #[arg(long, default_value = "5")]
        top: usize,

        /// Height of the surface the strokes were drawn on.
        #[arg(long)]
        canvas_height: Option<i32>,
    },

    /// Train a template for a symbol from JSON strokes and save it.
    Learn {
        /// Set to add the template to.
        #[arg(long)]
        set: String,

        /// Symbol the strokes stand for.
        #[arg(long)]
        symbol: char,

        /// Stroke file; reads stdin when omitted.
        #[arg(long)]
        input: Option<PathBuf>,
    },

    /// Drop user templates for a symbol and re-enable the system ones.
    Forget {
        #[arg(long)]
        set: String,

        #[arg(long)]
        symbol: char,
    },

    /// Change the user tuning of the profile.
    Tune {
        /// "BothCases" or "ToggleCases".
        #[arg(long)]
        style: Option<String>,

        /// Milliseconds to wait for further strokes of a character.
        #[arg(long)]
        multi_timeout: Option<u64>,

        /// Strokes held for less than this many milliseconds are ignored.
        #[arg(long)]
        ignore_timeout: Option<u64>,
    },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut paths = HandwritingPaths::resolve()?;
    if let Some(dir) = cli.system_dir.clone() {
        paths.system_dir = dir;
    }
    if let Some(dir) = cli.user_dir.clone() {
        paths.user_dir = dir;
    }

    match cli.command {
        Commands::Info => {
            let recognizer = Recognizer::new(open_profile(&cli.profile, &paths)?);
            println!("{}", recognizer.info());
        }

        Commands::Dump { file } => {
            let bytes = std::fs::read(&file).into_diagnostic()?;
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let set = decode_set(&bytes, &name)?;
            if let Some(err) = &set.error {
                tracing::warn!(file = %file.display(), error = %err, "set file truncated");
            }
            let chars: Vec<_> = set.chars.iter().map(character_json).collect();
            let out = json!({
                "title": set.title,
                "description": set.description,
                "type": set.kind.bits(),
                "characters": chars,
            });
            println!("{}", serde_json::to_string_pretty(&out).into_diagnostic()?);
        }

        Commands::Recognize {
            input,
            set,
            top,
            canvas_height,
        } => {
            let recognizer = Recognizer::new(open_profile(&cli.profile, &paths)?);
            let ch = read_character(input.as_ref(), canvas_height)?;
            if ch.is_empty() {
                miette::bail!("no strokes in input");
            }

            let ranked: Vec<_> = match set {
                Some(key) => {
                    let id = SetId::from_key(&key);
                    if recognizer.profile().char_set(&id).is_none() {
                        miette::bail!("profile has no set \"{key}\"");
                    }
                    recognizer
                        .recognize(&ch, &id)
                        .into_iter()
                        .take(top)
                        .map(|m| {
                            json!({
                                "set": id.to_string(),
                                "name": m.character.name(),
                                "error": m.error,
                            })
                        })
                        .collect()
                }
                None => recognizer
                    .recognize_all(&ch)
                    .into_iter()
                    .take(top)
                    .map(|m| {
                        json!({
                            "set": m.set.to_string(),
                            "name": m.character.name(),
                            "error": m.error,
                        })
                    })
                    .collect(),
            };
            println!("{}", serde_json::to_string_pretty(&ranked).into_diagnostic()?);
        }

        Commands::Learn { set, symbol, input } => {
            let mut profile = open_profile(&cli.profile, &paths)?;
            profile.ensure_loaded();
            let mut ch = read_character(input.as_ref(), None)?;
            if ch.is_empty() {
                miette::bail!("no strokes in input");
            }
            ch.set_symbol(symbol);

            let id = SetId::from_key(&set);
            let Some(target) = profile.char_set_mut(&id) else {
                miette::bail!("profile has no set \"{set}\"");
            };
            target.add_user_char(ch);
            target.save()?;
            println!("Learned '{symbol}' in {id}");
        }

        Commands::Forget { set, symbol } => {
            let mut profile = open_profile(&cli.profile, &paths)?;
            profile.ensure_loaded();
            let id = SetId::from_key(&set);
            let Some(target) = profile.char_set_mut(&id) else {
                miette::bail!("profile has no set \"{set}\"");
            };
            let identity = Identity::Symbol(symbol);
            if !target.restore(identity) {
                target.remove_user_chars(identity);
            }
            target.save()?;
            println!("Restored '{symbol}' in {id}");
        }

        Commands::Tune {
            style,
            multi_timeout,
            ignore_timeout,
        } => {
            let mut profile = open_profile(&cli.profile, &paths)?;
            if let Some(style) = style {
                let style = match style.as_str() {
                    "BothCases" => CaseStyle::BothCases,
                    "ToggleCases" => CaseStyle::ToggleCases,
                    other => miette::bail!("unknown style \"{other}\""),
                };
                profile.set_style(style)?;
            }
            if let Some(ms) = multi_timeout {
                profile.set_multi_stroke_timeout(Duration::from_millis(ms));
            }
            if let Some(ms) = ignore_timeout {
                profile.set_ignore_stroke_timeout(Duration::from_millis(ms))?;
            }

            let file = paths.settings_file();
            let mut settings = UserSettings::load(&file)?;
            settings.record(&profile);
            settings.save(&file)?;
            println!("Saved tuning for {} to {}", profile.identifier(), file.display());
        }
    }

    Ok(())
}

/// Load the named profile and apply the user's tuning. A missing profile
/// file yields an empty default profile.
fn open_profile(name: &str, paths: &HandwritingPaths) -> Result<Profile> {
    let path = paths.profile_file(name);
    let mut profile = if path.exists() {
        Profile::load(&path, paths.clone())?
    } else {
        tracing::warn!(path = %path.display(), "profile not found, using defaults");
        Profile::with_defaults(name, paths.clone())
    };
    let settings = UserSettings::load(&paths.settings_file())?;
    profile.apply_user_settings(&settings);
    Ok(profile)
}

fn read_character(input: Option<&PathBuf>, canvas_height: Option<i32>) -> Result<Character> {
    let content = match input {
        Some(path) => std::fs::read_to_string(path).into_diagnostic()?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .into_diagnostic()?;
            buf
        }
    };
    let strokes: Vec<Vec<[i32; 2]>> = serde_json::from_str(&content).into_diagnostic()?;

    let mut ch = Character::new();
    for points in strokes.iter().filter(|s| !s.is_empty()) {
        let points: Vec<Point> = points.iter().map(|&[x, y]| Point::new(x, y)).collect();
        let mut stroke = Stroke::from_points(&points);
        if let Some(height) = canvas_height {
            stroke.set_canvas_height(height);
        }
        ch.add_stroke(stroke);
    }
    Ok(ch)
}

fn character_json(ch: &Character) -> serde_json::Value {
    let strokes: Vec<Vec<[i32; 2]>> = ch
        .strokes()
        .iter()
        .map(|s| s.points().map(|p| [p.x, p.y]).collect())
        .collect();
    json!({
        "name": ch.name(),
        "identity": ch.identity(),
        "flags": ch.flags().bits(),
        "strokes": strokes,
    })
}
