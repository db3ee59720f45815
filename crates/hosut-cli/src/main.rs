//! `hosut` — terminal front end for the hosut lesson viewer.
//!
//! # Usage
//!
//! ```
//! hosut --catalog pharmacy.json lessons
//! hosut show 3
//! hosut play 3 1 --watch
//! ```
//!
//! Settings come from `hosut.toml` (or `--config`), then `HOSUT_*`
//! environment variables, then flags. Nested keys use a double underscore,
//! e.g. `HOSUT_PROGRESS__MAX_INLINE_LEN=2000`.

mod catalog;
mod player;
mod render;

use std::{
  io,
  path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use catalog::CatalogSource;
use clap::{Parser, Subcommand};
use hosut_core::{
  Error as CoreError, ProgressRepository, ProgressTracker, RepositoryConfig,
  catalog::Catalog,
  session::LessonSession,
};
use hosut_store_sqlite::SqliteJar;
use player::TerminalPlayer;
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "hosut", version, about = "Browse lessons and track clip progress")]
struct Args {
  /// Path to a TOML config file.
  #[arg(short, long, value_name = "FILE", default_value = "hosut.toml")]
  config: PathBuf,

  /// Catalog location: a file path or an http(s) URL.
  #[arg(long, env = "HOSUT_CATALOG")]
  catalog: Option<String>,

  /// SQLite file holding progress entries.
  #[arg(long, env = "HOSUT_STORE_PATH")]
  store: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List lessons with their progress status.
  Lessons,
  /// Open a lesson: record the visit and list its clips.
  Show { lesson: String },
  /// Record a visit without listing anything.
  Visit { lesson: String },
  /// Start a clip (numbered from 1).
  Play {
    lesson: String,
    clip:   usize,
    /// Let every clip play to its end, advancing automatically.
    #[arg(long)]
    watch:  bool,
  },
  /// Print the stored progress document as JSON.
  Progress,
  /// Forget all stored progress.
  Reset,
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Debug)]
#[serde(default)]
struct Settings {
  catalog:    String,
  store_path: PathBuf,
  progress:   RepositoryConfig,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      catalog:    "pharmacy.json".to_owned(),
      store_path: PathBuf::from("~/.local/share/hosut/progress.db"),
      progress:   RepositoryConfig::default(),
    }
  }
}

fn load_settings(args: &Args) -> Result<Settings> {
  let mut settings: Settings = config::Config::builder()
    .add_source(config::File::from(args.config.clone()).required(false))
    .add_source(config::Environment::with_prefix("HOSUT").separator("__"))
    .build()
    .context("failed to read config file")?
    .try_deserialize()
    .context("failed to deserialise settings")?;

  // Flags override config file and environment.
  if let Some(catalog) = &args.catalog {
    settings.catalog = catalog.clone();
  }
  if let Some(store) = &args.store {
    settings.store_path = store.clone();
  }
  settings.store_path = expand_tilde(&settings.store_path);
  settings.progress.validate().context("invalid [progress] settings")?;
  Ok(settings)
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  // Logs go to stderr so command output stays clean.
  tracing_subscriber::fmt()
    .with_writer(io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();
  let settings = load_settings(&args)?;

  if let Some(dir) = settings.store_path.parent() {
    std::fs::create_dir_all(dir)
      .with_context(|| format!("failed to create {}", dir.display()))?;
  }
  let jar = SqliteJar::open(&settings.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", settings.store_path))?;
  let tracker = ProgressTracker::new(ProgressRepository::with_config(jar, settings.progress));

  match args.command {
    Command::Lessons => {
      let catalog = CatalogSource::parse(&settings.catalog).load().await?;
      list_lessons(&tracker, &catalog).await;
    }
    Command::Show { lesson } => {
      let catalog = CatalogSource::parse(&settings.catalog).load().await?;
      let lesson = find_lesson(&catalog, &lesson)?;
      let session = LessonSession::open(&tracker, lesson, TerminalPlayer::new(io::stdout())).await;
      print_lesson(&session, None).await;
    }
    Command::Visit { lesson } => {
      let catalog = CatalogSource::parse(&settings.catalog).load().await?;
      let lesson = find_lesson(&catalog, &lesson)?;
      tracker.mark_lesson_visited(&lesson.lesson_id).await;
    }
    Command::Play { lesson, clip, watch } => {
      let catalog = CatalogSource::parse(&settings.catalog).load().await?;
      let lesson = find_lesson(&catalog, &lesson)?;
      let mut session =
        LessonSession::open(&tracker, lesson, TerminalPlayer::new(io::stdout())).await;
      play(&mut session, clip, watch).await?;
      print_lesson(&session, session.current()).await;
    }
    Command::Progress => {
      let progress = tracker.load().await;
      println!("{}", serde_json::to_string_pretty(&progress)?);
    }
    Command::Reset => {
      let removed = tracker
        .repository()
        .store()
        .clear()
        .await
        .context("failed to clear progress")?;
      tracing::info!(removed, "progress cleared");
    }
  }

  Ok(())
}

// ─── Commands ─────────────────────────────────────────────────────────────────

type Session<'t> = LessonSession<'t, SqliteJar, TerminalPlayer<io::Stdout>>;

fn find_lesson(catalog: &Catalog, id: &str) -> Result<hosut_core::catalog::Lesson> {
  catalog
    .lesson(id)
    .cloned()
    .context("Lesson not found. Run `hosut lessons` to see the course.")
}

async fn list_lessons(tracker: &ProgressTracker<SqliteJar>, catalog: &Catalog) {
  for lesson in &catalog.lessons {
    let status = tracker
      .lesson_status(&lesson.lesson_id, lesson.total_clips())
      .await;
    println!("{}", render::lesson_row(lesson, status));
  }
}

async fn play(session: &mut Session<'_>, clip: usize, watch: bool) -> Result<()> {
  let index = clip.checked_sub(1).context("clips are numbered from 1")?;
  match session.play_clip_at(index).await {
    Ok(()) => {}
    Err(e @ CoreError::InvalidMediaUrl { .. }) => {
      tracing::warn!(error = %e, "refusing to play clip");
      eprintln!("This clip has an invalid or missing MP4 URL.");
      return Ok(());
    }
    Err(e) => return Err(e.into()),
  }

  if watch {
    // Stand-in for the player's `ended` event after each clip.
    loop {
      match session.handle_ended().await {
        Ok(Some(_)) => continue,
        Ok(None) => break,
        Err(e @ CoreError::InvalidMediaUrl { .. }) => {
          tracing::warn!(error = %e, "stopping at clip with bad media");
          eprintln!("This clip has an invalid or missing MP4 URL.");
          break;
        }
        Err(e) => return Err(e.into()),
      }
    }
  }
  Ok(())
}

async fn print_lesson(session: &Session<'_>, active: Option<usize>) {
  let lesson = session.lesson();
  println!("{}\n", render::lesson_header(lesson));
  let states = session.clip_states().await;
  for (i, (clip, state)) in lesson.clips.iter().zip(states).enumerate() {
    println!("{}", render::clip_row(i, clip, state, active == Some(i)));
  }
  println!("\n{}", render::status_line(session.status().await));
}
