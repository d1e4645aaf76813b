use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bootcamp_core::model::{InstructorId, LessonId, LevelId, QuizScore};
use services::{
    Clock, ControllerConfig, LessonTarget, NextAction, ProgressController, ProgressStore,
};
use storage::catalog::InMemoryCatalog;
use storage::repository::Storage;
use storage::sqlite::{DEFAULT_DATABASE_URL, normalize_sqlite_url, prepare_sqlite_file};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use ui::LessonPageVm;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFlag { flag: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidDbUrl { raw: String },
    InvalidId { flag: &'static str, raw: String },
    InvalidScore { raw: String },
    InvalidDelay { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { flag } => write!(f, "{flag} is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidId { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidScore { raw } => write!(f, "invalid --score value (0-100): {raw}"),
            ArgsError::InvalidDelay { raw } => {
                write!(f, "invalid BOOTCAMP_ADVANCE_DELAY_MS value: {raw}")
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

fn parse_id<T: std::str::FromStr>(flag: &'static str, raw: String) -> Result<T, ArgsError> {
    raw.parse().map_err(|_| ArgsError::InvalidId { flag, raw })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Lesson,
    Complete,
    Stats,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "lesson" => Some(Self::Lesson),
            "complete" => Some(Self::Complete),
            "stats" => Some(Self::Stats),
            _ => None,
        }
    }

    fn needs_lesson(self) -> bool {
        matches!(self, Self::Lesson | Self::Complete)
    }
}

#[derive(Debug)]
struct Args {
    command: Command,
    db_url: String,
    catalog_path: Option<String>,
    advance_delay: Duration,
    instructor: InstructorId,
    level: Option<LevelId>,
    lesson: Option<LessonId>,
    score: QuizScore,
}

impl Args {
    fn parse(argv: impl IntoIterator<Item = String>) -> Result<Option<Self>, ArgsError> {
        let mut args = argv.into_iter();
        let command = match args.next() {
            None => return Ok(None),
            Some(first) if first == "--help" || first == "-h" => return Ok(None),
            Some(first) => Command::from_arg(&first).ok_or(ArgsError::UnknownCommand(first))?,
        };

        let mut db_url = normalize_sqlite_url(
            &std::env::var("BOOTCAMP_DB_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.into()),
        );
        let mut catalog_path = std::env::var("BOOTCAMP_CATALOG").ok();
        let advance_delay = match std::env::var("BOOTCAMP_ADVANCE_DELAY_MS") {
            Ok(raw) => raw
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| ArgsError::InvalidDelay { raw })?,
            Err(_) => ControllerConfig::default().advance_delay,
        };
        let mut instructor = None;
        let mut level = None;
        let mut lesson = None;
        let mut score = QuizScore::PERFECT;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(&value);
                }
                "--catalog" => catalog_path = Some(require_value(&mut args, "--catalog")?),
                "--instructor" => {
                    let value = require_value(&mut args, "--instructor")?;
                    instructor = Some(parse_id("--instructor", value)?);
                }
                "--level" => {
                    let value = require_value(&mut args, "--level")?;
                    level = Some(parse_id("--level", value)?);
                }
                "--lesson" => {
                    let value = require_value(&mut args, "--lesson")?;
                    lesson = Some(parse_id("--lesson", value)?);
                }
                "--score" => {
                    let value = require_value(&mut args, "--score")?;
                    score = value
                        .parse::<u32>()
                        .ok()
                        .and_then(|v| QuizScore::new(v).ok())
                        .ok_or(ArgsError::InvalidScore { raw: value })?;
                }
                "--help" | "-h" => return Ok(None),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        if command.needs_lesson() {
            if level.is_none() {
                return Err(ArgsError::MissingFlag { flag: "--level" });
            }
            if lesson.is_none() {
                return Err(ArgsError::MissingFlag { flag: "--lesson" });
            }
        }

        Ok(Some(Self {
            command,
            db_url,
            catalog_path,
            advance_delay,
            instructor: instructor.ok_or(ArgsError::MissingFlag {
                flag: "--instructor",
            })?,
            level,
            lesson,
            score,
        }))
    }

    fn target(&self) -> Option<LessonTarget> {
        Some(LessonTarget {
            instructor: self.instructor.clone(),
            level: self.level.clone()?,
            lesson: self.lesson.clone()?,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- lesson   --instructor <id> --level <id> --lesson <id>");
    eprintln!("  cargo run -p app -- complete --instructor <id> --level <id> --lesson <id> [--score <0-100>]");
    eprintln!("  cargo run -p app -- stats    --instructor <id>");
    eprintln!();
    eprintln!("Common options:");
    eprintln!("  --db <sqlite_url>    (default: {DEFAULT_DATABASE_URL})");
    eprintln!("  --catalog <path>     JSON catalog (default: built-in sample)");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  BOOTCAMP_DB_URL, BOOTCAMP_CATALOG, BOOTCAMP_ADVANCE_DELAY_MS, RUST_LOG");
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn print_page(vm: &LessonPageVm) {
    let Some(lesson) = vm.lesson() else {
        return;
    };
    println!("{}", lesson.title());
    if !lesson.description().is_empty() {
        println!("  {}", lesson.description());
    }
    println!("  video: {}", lesson.video_url());
    println!("  quiz:  {} question(s)", lesson.quiz().len());
    println!();
    for entry in vm.sidebar() {
        let marker = if entry.current { '>' } else { ' ' };
        let check = if entry.completed { 'x' } else { ' ' };
        println!("{marker} [{check}] {} ({})", entry.title, entry.lesson_id);
    }
    if let Some(stats) = vm.stats() {
        println!();
        println!(
            "Level progress: {}/{} ({}%)",
            stats.completed(),
            stats.total(),
            stats.percentage()
        );
    }
}

async fn open_page(
    controller: ProgressController,
    target: LessonTarget,
) -> Result<LessonPageVm, Box<dyn std::error::Error>> {
    let mut vm = LessonPageVm::new(controller, target);
    vm.load().await?;
    if vm.is_not_found() {
        let target = vm.target();
        return Err(format!(
            "lesson not found: {}/{}/{}",
            target.instructor, target.level, target.lesson
        )
        .into());
    }
    Ok(vm)
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = match &args.catalog_path {
        Some(path) => InMemoryCatalog::from_json_file(path)?,
        None => InMemoryCatalog::sample(),
    };
    prepare_sqlite_file(&args.db_url)?;
    let storage = Storage::sqlite(&args.db_url, Arc::new(catalog)).await?;
    debug!(db = %args.db_url, command = ?args.command, "storage ready");

    let store = ProgressStore::from_storage(Clock::default(), &storage);
    let controller = ProgressController::new(store.clone(), Arc::clone(&storage.catalog))
        .with_config(ControllerConfig {
            advance_delay: args.advance_delay,
        });

    match args.command {
        Command::Stats => {
            let stats = store.stats(&args.instructor).await?;
            println!(
                "{}: {}/{} lessons ({}%)",
                args.instructor,
                stats.completed(),
                stats.total(),
                stats.percentage()
            );
            if stats.is_complete() {
                println!("Bootcamp complete. Final code unlocked.");
            }
        }
        Command::Lesson => {
            let target = args.target().ok_or("missing lesson target")?;
            let vm = open_page(controller, target).await?;
            print_page(&vm);
        }
        Command::Complete => {
            let target = args.target().ok_or("missing lesson target")?;
            let mut vm = open_page(controller, target).await?;
            vm.begin_quiz()?;
            let action = vm.submit_quiz(args.score).await?.clone();
            print_page(&vm);
            println!();
            match action {
                NextAction::NavigateToLesson { target, after } => {
                    println!(
                        "Next lesson {} in {} ms",
                        target.lesson,
                        after.as_millis()
                    );
                    if let Some(nav) = vm.take_navigation() {
                        if let Some(route) = nav.wait().await {
                            println!("-> {route}");
                        }
                    }
                }
                NextAction::UnlockFinalCode(instructor) => {
                    println!("Bootcamp complete for {instructor}. Final code unlocked.");
                    if let Ok(home) = vm.finish_final_code() {
                        println!("-> {home}");
                    }
                }
                NextAction::None => println!("Level complete."),
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();

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

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn parses_complete_command() {
        let args = Args::parse(argv(&[
            "complete",
            "--db",
            "sqlite://tmp/test.sqlite3",
            "--instructor",
            "alex",
            "--level",
            "beginner",
            "--lesson",
            "lesson-1",
            "--score",
            "80",
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(args.command, Command::Complete);
        assert_eq!(args.db_url, "sqlite://tmp/test.sqlite3");
        assert_eq!(args.score.value(), 80);
        let target = args.target().unwrap();
        assert_eq!(target.lesson.as_str(), "lesson-1");
    }

    #[test]
    fn lesson_commands_require_level_and_lesson() {
        let err = Args::parse(argv(&["lesson", "--instructor", "alex"])).unwrap_err();
        assert!(matches!(err, ArgsError::MissingFlag { flag: "--level" }));

        let args = Args::parse(argv(&["stats", "--instructor", "alex"]))
            .unwrap()
            .unwrap();
        assert!(args.target().is_none());
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(
            Args::parse(argv(&["grade"])),
            Err(ArgsError::UnknownCommand(_))
        ));
        assert!(matches!(
            Args::parse(argv(&["stats", "--instructor", "alex", "--score", "101"])),
            Err(ArgsError::InvalidScore { .. })
        ));
        assert!(matches!(
            Args::parse(argv(&["stats", "--instructor", "a b"])),
            Err(ArgsError::InvalidId { .. })
        ));
        assert!(matches!(
            Args::parse(argv(&["stats"])),
            Err(ArgsError::MissingFlag {
                flag: "--instructor"
            })
        ));
    }

    #[test]
    fn relative_db_path_is_made_absolute() {
        let args = Args::parse(argv(&["stats", "--instructor", "alex", "--db", "data/x.sqlite3"]))
            .unwrap()
            .unwrap();
        assert!(args.db_url.starts_with("sqlite:///"));
        assert!(args.db_url.ends_with("data/x.sqlite3"));
    }

    #[test]
    fn help_and_empty_print_usage() {
        assert!(Args::parse(argv(&[])).unwrap().is_none());
        assert!(Args::parse(argv(&["-h"])).unwrap().is_none());
        assert!(
            Args::parse(argv(&["stats", "--help"]))
                .unwrap()
                .is_none()
        );
    }
}
