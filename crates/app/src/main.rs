use std::fmt;

use edutube_core::Clock;
use edutube_core::model::{Course, CourseId, Lesson, LessonId};
use services::ProgressTracker;
use storage::ProgressStore;
use tracing_subscriber::{EnvFilter, fmt as tracing_fmt};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidPercent { raw: String },
    MissingLesson,
    EmptyLessonList,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidPercent { raw } => write!(f, "invalid --percent value: {raw}"),
            ArgsError::MissingLesson => write!(f, "--lesson is required"),
            ArgsError::EmptyLessonList => write!(f, "--lessons must name at least one lesson"),
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

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- show     [--db <sqlite_url>] [--course-id <id>] [--lessons <id,id,...>]");
    eprintln!("  cargo run -p app -- watch    --lesson <id> --percent <0-100> [--db ...] [--course-id ...] [--lessons ...]");
    eprintln!("  cargo run -p app -- complete --lesson <id> [--db ...] [--course-id ...] [--lessons ...]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite:dev.sqlite3");
    eprintln!("  --course-id rust-101");
    eprintln!("  --lessons l1,l2,l3,l4");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  EDUTUBE_DB_URL, EDUTUBE_COURSE_ID");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Show,
    Watch,
    Complete,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "show" => Some(Self::Show),
            "watch" => Some(Self::Watch),
            "complete" => Some(Self::Complete),
            _ => None,
        }
    }
}

struct Args {
    db_url: String,
    course_id: CourseId,
    lesson_ids: Vec<LessonId>,
    lesson: Option<LessonId>,
    percent: Option<u8>,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("EDUTUBE_DB_URL")
            .ok()
            .unwrap_or_else(|| "sqlite:dev.sqlite3".into());
        let mut course_id = std::env::var("EDUTUBE_COURSE_ID")
            .ok()
            .map_or_else(|| CourseId::new("rust-101"), CourseId::new);
        let mut lesson_ids: Vec<LessonId> = ["l1", "l2", "l3", "l4"]
            .iter()
            .map(|id| LessonId::new(*id))
            .collect();
        let mut lesson = None;
        let mut percent = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => db_url = require_value(args, "--db")?,
                "--course-id" => course_id = CourseId::new(require_value(args, "--course-id")?),
                "--lessons" => {
                    let raw = require_value(args, "--lessons")?;
                    lesson_ids = raw
                        .split(',')
                        .map(str::trim)
                        .filter(|id| !id.is_empty())
                        .map(LessonId::new)
                        .collect();
                    if lesson_ids.is_empty() {
                        return Err(ArgsError::EmptyLessonList);
                    }
                }
                "--lesson" => lesson = Some(LessonId::new(require_value(args, "--lesson")?)),
                "--percent" => {
                    let raw = require_value(args, "--percent")?;
                    let parsed: u8 = raw
                        .parse()
                        .map_err(|_| ArgsError::InvalidPercent { raw: raw.clone() })?;
                    percent = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            course_id,
            lesson_ids,
            lesson,
            percent,
        })
    }

    fn build_course(&self) -> Result<Course, Box<dyn std::error::Error>> {
        let lessons = self
            .lesson_ids
            .iter()
            .map(|id| Lesson::new(id.clone(), format!("Lesson {id}"), 0))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Course::new(
            self.course_id.clone(),
            format!("Course {}", self.course_id),
            lessons,
        )?)
    }
}

async fn build_tracker(args: &Args) -> Result<ProgressTracker, Box<dyn std::error::Error>> {
    let course = args.build_course()?;
    let store = ProgressStore::sqlite(&args.db_url).await?;
    Ok(ProgressTracker::new(Clock::default(), course, store).await)
}

fn print_derived(tracker: &ProgressTracker) {
    let derived = tracker.derived();
    println!(
        "course {}: {}% ({}/{} lessons completed){}",
        tracker.course().id(),
        derived.percent,
        derived.completed_count,
        tracker.course().total_lessons(),
        if derived.is_completed { " - completed" } else { "" },
    );
    match derived.next_lesson_id {
        Some(next) => println!("next lesson: {next}"),
        None => println!("no lessons remaining"),
    }
}

async fn run_show(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let tracker = build_tracker(&args).await?;
    print_derived(&tracker);

    let record = tracker.record().await;
    for lesson in tracker.course().lessons() {
        let watched = record.watch_percent(lesson.id()).unwrap_or(0);
        let status = if record.is_lesson_completed(lesson.id()) {
            "done"
        } else if watched > 0 {
            "in progress"
        } else {
            "not started"
        };
        println!("  {:<12} {:>3}%  {status}", lesson.id().to_string(), watched);
    }
    Ok(())
}

async fn run_watch(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let lesson = args.lesson.clone().ok_or(ArgsError::MissingLesson)?;
    let percent = args.percent.ok_or(ArgsError::MissingValue { flag: "--percent" })?;

    let tracker = build_tracker(&args).await?;
    tracker.update_watch_progress(&lesson, percent).await?;
    print_derived(&tracker);
    Ok(())
}

async fn run_complete(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let lesson = args.lesson.clone().ok_or(ArgsError::MissingLesson)?;

    let tracker = build_tracker(&args).await?;
    tracker.mark_lesson_complete(&lesson).await?;
    print_derived(&tracker);
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut raw = std::env::args().skip(1);
    let Some(first) = raw.next() else {
        print_usage();
        std::process::exit(2);
    };

    let Some(command) = Command::from_arg(&first) else {
        eprintln!("unknown subcommand: {first}");
        print_usage();
        std::process::exit(2);
    };

    let args = match Args::parse(&mut raw) {
        Ok(args) => args,
        Err(err) => {
            eprintln!("{err}");
            print_usage();
            std::process::exit(2);
        }
    };

    let result = match command {
        Command::Show => run_show(args).await,
        Command::Watch => run_watch(args).await,
        Command::Complete => run_complete(args).await,
    };

    if let Err(err) = result {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
