use std::fmt;
use std::sync::Arc;

use bootcamp_core::model::{InstructorId, LessonProgress, LevelId, QuizScore};
use chrono::{DateTime, Utc};
use storage::catalog::{InMemoryCatalog, LessonCatalog};
use storage::repository::{Storage, StorageError};
use storage::sqlite::{DEFAULT_DATABASE_URL, normalize_sqlite_url, prepare_sqlite_file};

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    catalog_path: Option<String>,
    instructor: InstructorId,
    level: Option<LevelId>,
    score: QuizScore,
    leave_last: bool,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingInstructor,
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidInstructor { raw: String },
    InvalidLevel { raw: String },
    InvalidScore { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingInstructor => write!(f, "--instructor is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidInstructor { raw } => write!(f, "invalid --instructor value: {raw}"),
            ArgsError::InvalidLevel { raw } => write!(f, "invalid --level value: {raw}"),
            ArgsError::InvalidScore { raw } => write!(f, "invalid --score value (0-100): {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    /// `Ok(None)` means help was requested.
    fn parse(argv: impl IntoIterator<Item = String>) -> Result<Option<Self>, ArgsError> {
        let mut db_url = normalize_sqlite_url(
            &std::env::var("BOOTCAMP_DB_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.into()),
        );
        let mut catalog_path = std::env::var("BOOTCAMP_CATALOG").ok();
        let mut instructor = None;
        let mut level = None;
        let mut score = QuizScore::PERFECT;
        let mut leave_last = false;
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = argv.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(&value);
                }
                "--catalog" => {
                    catalog_path = Some(require_value(&mut args, "--catalog")?);
                }
                "--instructor" => {
                    let value = require_value(&mut args, "--instructor")?;
                    let parsed = InstructorId::new(value.clone())
                        .map_err(|_| ArgsError::InvalidInstructor { raw: value })?;
                    instructor = Some(parsed);
                }
                "--level" => {
                    let value = require_value(&mut args, "--level")?;
                    let parsed = LevelId::new(value.clone())
                        .map_err(|_| ArgsError::InvalidLevel { raw: value })?;
                    level = Some(parsed);
                }
                "--score" => {
                    let value = require_value(&mut args, "--score")?;
                    score = value
                        .parse::<u32>()
                        .ok()
                        .and_then(|v| QuizScore::new(v).ok())
                        .ok_or_else(|| ArgsError::InvalidScore { raw: value.clone() })?;
                }
                "--leave-last" => leave_last = true,
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => return Ok(None),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Some(Self {
            db_url,
            catalog_path,
            instructor: instructor.ok_or(ArgsError::MissingInstructor)?,
            level,
            score,
            leave_last,
            now,
        }))
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- --instructor <id> [options]");
    eprintln!();
    eprintln!("Marks catalog lessons as completed for an instructor.");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL or path (default: {DEFAULT_DATABASE_URL})");
    eprintln!("  --catalog <path>          JSON catalog (default: built-in sample)");
    eprintln!("  --instructor <id>         Instructor whose lessons are completed");
    eprintln!("  --level <id>              Only complete this level (default: every level)");
    eprintln!("  --score <0-100>           Quiz score to record (default: 100)");
    eprintln!("  --leave-last              Skip the final lesson of the last seeded level");
    eprintln!("  --now <rfc3339>           Fixed completion time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  BOOTCAMP_DB_URL, BOOTCAMP_CATALOG");
}

/// Completed-lesson and level counts written by [`seed_progress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Seeded {
    lessons: usize,
    levels: usize,
}

async fn seed_progress(
    storage: &Storage,
    args: &Args,
    now: DateTime<Utc>,
) -> Result<Seeded, StorageError> {
    let levels = match &args.level {
        Some(level) => vec![level.clone()],
        None => storage.catalog.levels(&args.instructor).await?,
    };

    let mut lessons_seeded = 0_usize;
    for (idx, level) in levels.iter().enumerate() {
        let mut lessons = storage.catalog.lessons(&args.instructor, level).await?;
        if args.leave_last && idx + 1 == levels.len() {
            lessons.pop();
        }
        for lesson in &lessons {
            let record = LessonProgress::completed(lesson.id().clone(), args.score, now);
            storage
                .progress
                .upsert_lesson_progress(&args.instructor, level, &record)
                .await?;
            lessons_seeded += 1;
        }
    }

    Ok(Seeded {
        lessons: lessons_seeded,
        levels: levels.len(),
    })
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = match &args.catalog_path {
        Some(path) => InMemoryCatalog::from_json_file(path)?,
        None => InMemoryCatalog::sample(),
    };
    prepare_sqlite_file(&args.db_url)?;
    let storage = Storage::sqlite(&args.db_url, Arc::new(catalog)).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    let seeded = seed_progress(&storage, &args, now).await?;

    println!(
        "Seeded {} completed lessons across {} levels for {} into {}",
        seeded.lessons, seeded.levels, args.instructor, args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    let args = match Args::parse(std::env::args().skip(1)) {
        Ok(Some(args)) => args,
        Ok(None) => {
            print_usage();
            return;
        }
        Err(err) => {
            eprintln!("{err}");
            print_usage();
            std::process::exit(2);
        }
    };

    if let Err(err) = run(args).await {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
