//! Seeds a demo progress record so the app has something to show against a
//! fresh database.

use edutube_core::Clock;
use edutube_core::model::{CourseId, CourseProgressRecord, LessonId};
use storage::ProgressStore;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
}

impl std::fmt::Display for ArgsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
        }
    }
}

impl std::error::Error for ArgsError {}

struct Args {
    db_url: String,
    course_id: CourseId,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>       SQLite URL (default: sqlite:dev.sqlite3)");
    eprintln!("  --course-id <id>        Course id to seed (default: rust-101)");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  EDUTUBE_DB_URL, EDUTUBE_COURSE_ID");
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("EDUTUBE_DB_URL")
            .ok()
            .unwrap_or_else(|| "sqlite:dev.sqlite3".into());
        let mut course_id = std::env::var("EDUTUBE_COURSE_ID")
            .ok()
            .map_or_else(|| CourseId::new("rust-101"), CourseId::new);

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => db_url = require_value(args, "--db")?,
                "--course-id" => course_id = CourseId::new(require_value(args, "--course-id")?),
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self { db_url, course_id })
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let store = ProgressStore::sqlite(&args.db_url).await?;
    let clock = Clock::default();

    let mut record = CourseProgressRecord::empty();
    record.mark_complete(&LessonId::new("l1"), clock.now());
    record.record_watch(&LessonId::new("l2"), 95, clock.now())?;
    record.record_watch(&LessonId::new("l3"), 60, clock.now())?;

    store.save(&args.course_id, &record).await?;

    println!(
        "seeded progress for course {} ({} completed, {} watched)",
        args.course_id,
        record.completed_lessons().len(),
        record.watch_progress().len()
    );
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let mut raw = std::env::args().skip(1);
    let args = match Args::parse(&mut raw) {
        Ok(args) => args,
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
