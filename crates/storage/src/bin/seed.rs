use std::fmt;

use chrono::{DateTime, Duration, Utc};
use quiz_core::TextParser;
use quiz_core::model::{AnswerMap, BatchDraft, BatchSource, NewQuizHistory, score_percentage};
use storage::repository::Storage;

const SAMPLE_TEXT: &str = "\
What is the capital of France?
A. Paris
B. London
C. Berlin

Which planet is the largest in the solar system?
A. Mars
B. Jupiter
C. Venus

What gas do plants absorb from the air?
A. Carbon dioxide
B. Oxygen
C. Nitrogen
";

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    title: String,
    histories: u32,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidHistories { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidHistories { raw } => write!(f, "invalid --histories value: {raw}"),
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
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://quiz.sqlite3".into());
        let mut title =
            std::env::var("SEED_BATCH_TITLE").unwrap_or_else(|_| "General knowledge".into());
        let mut histories = std::env::var("SEED_HISTORIES")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(3);
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--title" => {
                    title = require_value(&mut args, "--title")?;
                }
                "--histories" => {
                    let value = require_value(&mut args, "--histories")?;
                    histories = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidHistories { raw: value.clone() })?;
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
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
            title,
            histories,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite://quiz.sqlite3)");
    eprintln!("  --title <text>            Title of the seeded batch (default: General knowledge)");
    eprintln!("  --histories <n>           Number of quiz attempts to append (default: 3)");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  DATABASE_URL, SEED_BATCH_TITLE, SEED_HISTORIES");
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    let questions = TextParser::new()
        .parse(SAMPLE_TEXT)
        .into_iter()
        .map(quiz_core::model::QuestionDraft::validate)
        .collect::<Result<Vec<_>, _>>()?;
    let batch = BatchDraft::new(&args.title, BatchSource::TextInput, SAMPLE_TEXT).validate(now)?;
    let (batch, questions) = storage.batches.create_batch(batch, questions).await?;

    // fix the placeholder answers the parser leaves behind
    for (question, answer) in questions.iter().zip(["Paris", "Jupiter", "Carbon dioxide"]) {
        storage
            .batches
            .update_correct_answer(question.id, answer)
            .await?;
    }

    let total = batch.question_count();
    for i in 0..args.histories {
        let correct = total.saturating_sub(i % (total + 1));
        let mut answers = AnswerMap::new();
        answers.insert(0, "Paris".to_owned());
        let record = NewQuizHistory::new(
            batch.id(),
            batch.title(),
            total,
            correct,
            score_percentage(correct, total),
            u64::from(30 + i * 15),
            answers,
        )?;
        let taken_at = now - Duration::days(i64::from(i));
        let _ = storage.histories.append_history(record, taken_at).await?;
    }

    println!(
        "Seeded batch {} with {} questions and {} quiz attempts into {}",
        batch.id(),
        total,
        args.histories,
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
