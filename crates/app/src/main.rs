use std::fmt;
use std::io::{self, BufRead, Write};

use services::{AppServices, Clock, StudySessionLoop, load_config};
use tracing_subscriber::EnvFilter;
use vocab_core::StudyConfig;
use vocab_core::model::{Direction, ProgressKey, Quality, WordId, WordWithProgress};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingArg { command: &'static str, name: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidDbUrl { raw: String },
    InvalidDirection { raw: String },
    InvalidNumber { flag: &'static str, raw: String },
    InvalidWordId { raw: String },
    InvalidQuality { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingArg { command, name } => write!(f, "{command} requires <{name}>"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown command: {cmd}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidDirection { raw } => {
                write!(f, "invalid --direction value (expected s2t or t2s): {raw}")
            }
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidWordId { raw } => write!(f, "invalid word id: {raw}"),
            ArgsError::InvalidQuality { raw } => {
                write!(f, "invalid quality (expected 1-3 or hard/medium/easy): {raw}")
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

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- <command> [options]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  queue                      Show the next words to study");
    eprintln!("  counts                     Show new/learning/review/overdue/mastered counts");
    eprintln!("  study                      Study interactively until the queue is empty");
    eprintln!("  add <source> <target>      Add a word and select it for study");
    eprintln!("  select <word_id>           Select a word in both directions");
    eprintln!("  deselect <word_id>         Stop studying a word, keeping its progress");
    eprintln!("  remove <word_id>           Delete a word and its progress");
    eprintln!("  answer <word_id> <quality> Record an answer (1|2|3 or hard|medium|easy)");
    eprintln!("  reset <word_id>            Restart a word's learning phase");
    eprintln!("  master <word_id>           Mark a word as mastered");
    eprintln!("  unmaster <word_id>         Clear the mastered flag");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>          SQLite URL (default: sqlite:vocab.sqlite3)");
    eprintln!("  --direction <s2t|t2s>      Study direction (default: s2t)");
    eprintln!("  --config <path>            JSON study configuration");
    eprintln!("  --limit <n>                Words shown by `queue` (default: 20)");
    eprintln!("  --shuffle-seed <n>         Shuffle new words with a fixed seed");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  VOCAB_DB_URL, VOCAB_CONFIG, RUST_LOG");
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Queue,
    Counts,
    Study,
    Add { source: String, target: String },
    Select(WordId),
    Deselect(WordId),
    Remove(WordId),
    Answer { word_id: WordId, quality: Quality },
    Reset(WordId),
    Master { word_id: WordId, mastered: bool },
}

#[derive(Debug)]
struct Args {
    command: Command,
    db_url: String,
    direction: Direction,
    config_path: Option<String>,
    limit: usize,
    shuffle_seed: Option<u64>,
}

fn parse_word_id(raw: String) -> Result<WordId, ArgsError> {
    raw.parse().map_err(|_| ArgsError::InvalidWordId { raw })
}

fn positional(
    values: &mut impl Iterator<Item = String>,
    command: &'static str,
    name: &'static str,
) -> Result<String, ArgsError> {
    values.next().ok_or(ArgsError::MissingArg { command, name })
}

impl Command {
    fn parse(name: &str, values: Vec<String>) -> Result<Self, ArgsError> {
        let mut values = values.into_iter();
        let command = match name {
            "queue" => Self::Queue,
            "counts" => Self::Counts,
            "study" => Self::Study,
            "add" => Self::Add {
                source: positional(&mut values, "add", "source")?,
                target: positional(&mut values, "add", "target")?,
            },
            "select" => Self::Select(parse_word_id(positional(&mut values, "select", "word_id")?)?),
            "deselect" => {
                Self::Deselect(parse_word_id(positional(&mut values, "deselect", "word_id")?)?)
            }
            "remove" => Self::Remove(parse_word_id(positional(&mut values, "remove", "word_id")?)?),
            "answer" => {
                let word_id = parse_word_id(positional(&mut values, "answer", "word_id")?)?;
                let raw = positional(&mut values, "answer", "quality")?;
                let quality =
                    Quality::parse(&raw).map_err(|_| ArgsError::InvalidQuality { raw })?;
                Self::Answer { word_id, quality }
            }
            "reset" => Self::Reset(parse_word_id(positional(&mut values, "reset", "word_id")?)?),
            "master" | "unmaster" => Self::Master {
                word_id: parse_word_id(positional(&mut values, "master", "word_id")?)?,
                mastered: name == "master",
            },
            other => return Err(ArgsError::UnknownCommand(other.to_string())),
        };
        if let Some(extra) = values.next() {
            return Err(ArgsError::UnknownArg(extra));
        }
        Ok(command)
    }
}

impl Args {
    fn parse(argv: impl IntoIterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("VOCAB_DB_URL")
            .ok()
            .map_or_else(|| normalize_sqlite_url("sqlite:vocab.sqlite3".into()), normalize_sqlite_url);
        let mut config_path = std::env::var("VOCAB_CONFIG").ok();
        let mut direction = Direction::SourceToTarget;
        let mut limit = 20;
        let mut shuffle_seed = None;
        let mut positionals = Vec::new();

        let mut args = argv.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--direction" => {
                    let value = require_value(&mut args, "--direction")?;
                    direction = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidDirection { raw: value.clone() })?;
                }
                "--config" => config_path = Some(require_value(&mut args, "--config")?),
                "--limit" => {
                    let value = require_value(&mut args, "--limit")?;
                    limit = value.parse().map_err(|_| ArgsError::InvalidNumber {
                        flag: "--limit",
                        raw: value.clone(),
                    })?;
                }
                "--shuffle-seed" => {
                    let value = require_value(&mut args, "--shuffle-seed")?;
                    shuffle_seed = Some(value.parse().map_err(|_| ArgsError::InvalidNumber {
                        flag: "--shuffle-seed",
                        raw: value.clone(),
                    })?);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ if arg.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ => positionals.push(arg),
            }
        }

        let mut positionals = positionals.into_iter();
        let name = positionals.next().unwrap_or_else(|| "queue".to_string());
        let command = Command::parse(&name, positionals.collect())?;

        Ok(Self {
            command,
            db_url,
            direction,
            config_path,
            limit,
            shuffle_seed,
        })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn print_word(item: &WordWithProgress) {
    let p = &item.progress;
    println!(
        "{:>5}  {:<24} {:<9} reps={} interval={:.1}d ease={:.2} due={}",
        item.word.id,
        item.prompt(),
        format!("{:?}", p.stage()).to_lowercase(),
        p.repetitions,
        p.interval_days,
        p.ease_factor,
        p.next_review_at.format("%Y-%m-%d %H:%M")
    );
}

fn read_line(prompt: &str) -> io::Result<Option<String>> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

async fn study(
    session_loop: &StudySessionLoop,
    direction: Direction,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = session_loop.start_session(direction).await?;

    while let Some(current) = session.current().cloned() {
        println!();
        println!("{}", current.prompt());
        if read_line("  (enter to reveal, q to stop) ")?.as_deref() == Some("q") {
            break;
        }
        println!("  → {}", current.answer());

        let quality = loop {
            let Some(raw) = read_line("  1=hard 2=medium 3=easy: ")? else {
                return Ok(());
            };
            match Quality::parse(&raw) {
                Ok(quality) => break quality,
                Err(err) => eprintln!("  {err}"),
            }
        };

        session_loop.answer_current(&mut session, quality).await?;
        let progress = session.progress();
        println!(
            "  answered {} ({} words), {} left",
            progress.answered, progress.distinct_studied, progress.remaining
        );
    }

    let summary = session.summary();
    println!();
    println!(
        "Session: {} answers, {} words, {} hard / {} medium / {} easy, {} graduated, {} mastered",
        summary.total_answers,
        summary.distinct_words,
        summary.hard,
        summary.medium,
        summary.easy,
        summary.graduated,
        summary.newly_mastered
    );
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse(std::env::args().skip(1)).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let config = match &args.config_path {
        Some(path) => load_config(path)?,
        None => StudyConfig::default(),
    };

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    prepare_sqlite_file(&args.db_url)?;
    let app = AppServices::new_sqlite(&args.db_url, config, Clock::system()).await?;
    let progress = app.progress();
    let direction = args.direction;

    match args.command {
        Command::Queue => {
            let queue = app.queue().get_queue(direction, args.limit).await?;
            if queue.is_empty() {
                println!("Nothing to study in {direction} right now.");
            }
            for item in &queue {
                print_word(item);
            }
        }
        Command::Counts => {
            let counts = app.queue().get_counts(direction).await?;
            let snapshot = app.queue().build_queue(direction).await?;
            println!(
                "{direction}: new={} learning={} review={} overdue={} mastered={}",
                counts.new, counts.learning, counts.review, counts.overdue, counts.mastered
            );
            println!(
                "studied today: {} / {}",
                snapshot.studied_today(),
                app.config().daily_goal
            );
        }
        Command::Study => {
            let session_loop = match args.shuffle_seed {
                Some(seed) => app.session_loop().as_ref().clone().with_new_word_shuffle(seed),
                None => app.session_loop().as_ref().clone(),
            };
            study(&session_loop, direction).await?;
        }
        Command::Add { source, target } => {
            let (word, _) = progress.add_word(&source, &target).await?;
            println!("Added word {}: {} → {}", word.id, word.source, word.target);
        }
        Command::Select(word_id) => {
            progress.select_word(word_id).await?;
            println!("Selected word {word_id}");
        }
        Command::Deselect(word_id) => {
            progress.deselect_word(word_id).await?;
            println!("Deselected word {word_id}");
        }
        Command::Remove(word_id) => {
            progress.remove_word(word_id).await?;
            println!("Removed word {word_id}");
        }
        Command::Answer { word_id, quality } => {
            let key = ProgressKey::new(word_id, direction);
            let updated = progress.update_progress(key, quality).await?;
            println!(
                "{key}: next review {} (interval {:.1}d, ease {:.2}{})",
                updated.next_review_at.format("%Y-%m-%d %H:%M"),
                updated.interval_days,
                updated.ease_factor,
                if updated.is_mastered { ", mastered" } else { "" }
            );
        }
        Command::Reset(word_id) => {
            let key = ProgressKey::new(word_id, direction);
            progress.reset_progress(key).await?;
            println!("Reset {key}");
        }
        Command::Master { word_id, mastered } => {
            let key = ProgressKey::new(word_id, direction);
            progress.mark_mastered(key, mastered).await?;
            println!("{key}: mastered={mastered}");
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
