use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use storage::repository::Storage;
use vocab_core::model::{DEFAULT_EASE, WordDraft, WordProgress};

const SAMPLES: [(&str, &str); 12] = [
    ("Hallo", "Hello"),
    ("Danke", "Thank you"),
    ("Bitte", "Please"),
    ("Tschüss", "Bye"),
    ("Guten Morgen", "Good morning"),
    ("Gute Nacht", "Good night"),
    ("Wasser", "Water"),
    ("Brot", "Bread"),
    ("Haus", "House"),
    ("Buch", "Book"),
    ("Freund", "Friend"),
    ("Zeit", "Time"),
];

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    words: u32,
    select: bool,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidWords { raw: String },
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidWords { raw } => write!(f, "invalid --words value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
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
            std::env::var("VOCAB_DB_URL").unwrap_or_else(|_| "sqlite:vocab.sqlite3".into());
        let mut words = std::env::var("VOCAB_SEED_WORDS")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(8);
        let mut select = true;
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
                "--words" => {
                    let value = require_value(&mut args, "--words")?;
                    words = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidWords { raw: value.clone() })?;
                }
                "--no-select" => select = false,
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
            words,
            select,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:vocab.sqlite3)");
    eprintln!("  --words <n>               Sample words to insert, at most 12 (default: 8)");
    eprintln!("  --no-select               Insert words without creating progress records");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  VOCAB_DB_URL, VOCAB_SEED_WORDS");
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    let existing: HashSet<String> = storage
        .words
        .list_words(u32::MAX)
        .await?
        .into_iter()
        .map(|w| w.source)
        .collect();

    let mut inserted = 0_u32;
    let mut selected = 0_u32;
    for (source, target) in SAMPLES.iter().take(args.words as usize) {
        if existing.contains(*source) {
            continue;
        }
        let word = storage
            .words
            .insert_word(&WordDraft::new(*source, *target).validate(now)?)
            .await?;
        inserted += 1;

        if args.select {
            storage
                .progress
                .insert_pair(&WordProgress::new_pair(word.id, DEFAULT_EASE, now))
                .await?;
            selected += 1;
        }
    }

    println!(
        "Seeded {inserted} words ({selected} selected for study) into {}",
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
