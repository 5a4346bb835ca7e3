use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use quiz_core::model::{Choice, QuestionId, Role, SessionId};
use serde::Serialize;
use services::{Clock, GameService, QuestionCatalog, SeededRandom};
use storage::repository::Storage;
use tracing_subscriber::EnvFilter;

const DEFAULT_DB_URL: &str = "sqlite://quiz.sqlite3";

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingArgument { name: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    Invalid { name: &'static str, raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingArgument { name } => write!(f, "missing <{name}>"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::Invalid { name, raw } => write!(f, "invalid <{name}> value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
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
    eprintln!("  app start <name> <front|back|mobile>");
    eprintln!("  app resume <name>");
    eprintln!("  app show <session_id>");
    eprintln!("  app answer <session_id> <question_id> <A|B|C|D>");
    eprintln!("  app perk-front <session_id> [--shown <question_id>]");
    eprintln!("  app perk-back <session_id>");
    eprintln!("  app perk-mobile <session_id> [--shown <question_id>]");
    eprintln!("  app scores");
    eprintln!("  app history <name>");
    eprintln!("  app seed");
    eprintln!();
    eprintln!("Options (any command):");
    eprintln!("  --db <sqlite_url>   default {DEFAULT_DB_URL}");
    eprintln!("  --seed <u64>        deterministic question selection");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DB_URL, QUIZ_SEED, RUST_LOG");
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Start { name: String, role: Role },
    Resume { name: String },
    Show { session: SessionId },
    Answer {
        session: SessionId,
        question: QuestionId,
        choice: Choice,
    },
    PerkFront {
        session: SessionId,
        shown: Option<QuestionId>,
    },
    PerkBack { session: SessionId },
    PerkMobile {
        session: SessionId,
        shown: Option<QuestionId>,
    },
    Scores,
    History { name: String },
    Seed,
}

#[derive(Debug)]
struct Args {
    db_url: String,
    seed: Option<u64>,
    command: Command,
}

fn positional<T: FromStr>(
    values: &mut impl Iterator<Item = String>,
    name: &'static str,
) -> Result<T, ArgsError> {
    let raw = values.next().ok_or(ArgsError::MissingArgument { name })?;
    raw.parse().map_err(|_| ArgsError::Invalid { name, raw })
}

impl Args {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = normalize_sqlite_url(
            std::env::var("QUIZ_DB_URL").unwrap_or_else(|_| DEFAULT_DB_URL.to_string()),
        );
        let mut seed = std::env::var("QUIZ_SEED")
            .ok()
            .and_then(|value| value.parse::<u64>().ok());
        let mut shown = None;
        let mut positionals = Vec::new();

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--seed" => {
                    let raw = require_value(&mut args, "--seed")?;
                    let parsed = raw
                        .parse()
                        .map_err(|_| ArgsError::Invalid { name: "seed", raw })?;
                    seed = Some(parsed);
                }
                "--shown" => {
                    let raw = require_value(&mut args, "--shown")?;
                    let parsed = raw
                        .parse()
                        .map_err(|_| ArgsError::Invalid { name: "question_id", raw })?;
                    shown = Some(parsed);
                }
                flag if flag.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ => positionals.push(arg),
            }
        }

        let mut values = positionals.into_iter();
        let name = values.next().ok_or(ArgsError::MissingArgument { name: "command" })?;
        let command = match name.as_str() {
            "start" => Command::Start {
                name: positional(&mut values, "name")?,
                role: positional(&mut values, "role")?,
            },
            "resume" => Command::Resume {
                name: positional(&mut values, "name")?,
            },
            "show" => Command::Show {
                session: positional(&mut values, "session_id")?,
            },
            "answer" => Command::Answer {
                session: positional(&mut values, "session_id")?,
                question: positional(&mut values, "question_id")?,
                choice: positional(&mut values, "choice")?,
            },
            "perk-front" => Command::PerkFront {
                session: positional(&mut values, "session_id")?,
                shown,
            },
            "perk-back" => Command::PerkBack {
                session: positional(&mut values, "session_id")?,
            },
            "perk-mobile" => Command::PerkMobile {
                session: positional(&mut values, "session_id")?,
                shown,
            },
            "scores" => Command::Scores,
            "history" => Command::History {
                name: positional(&mut values, "name")?,
            },
            "seed" => Command::Seed,
            _ => return Err(ArgsError::UnknownCommand(name)),
        };
        if let Some(extra) = values.next() {
            return Err(ArgsError::UnknownArg(extra));
        }

        Ok(Self {
            db_url,
            seed,
            command,
        })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:" {
        return trimmed.to_string();
    }

    let rest = trimmed
        .strip_prefix("sqlite://")
        .or_else(|| trimmed.strip_prefix("sqlite:"))
        .unwrap_or(trimmed);
    if rest.starts_with("file:") {
        return format!("sqlite:{rest}");
    }
    let (path_str, query) = match rest.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (rest, None),
    };

    let path = std::path::Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    match query {
        Some(query) => format!("sqlite://{}?{query}", absolute.display()),
        None => format!("sqlite://{}", absolute.display()),
    }
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" || db_url.starts_with("sqlite:file:") {
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

fn print_json(value: &impl Serialize) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    if argv.is_empty() || argv.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let args = Args::parse(argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Open + migrate SQLite in the binary glue; services stay storage-agnostic.
    prepare_sqlite_file(&args.db_url)?;
    let storage = Storage::sqlite(&args.db_url).await?;
    tracing::debug!(db = %args.db_url, "storage ready");

    if args.command == Command::Seed {
        let inserted = QuestionCatalog::ensure_seeded(storage.questions.as_ref()).await?;
        print_json(&serde_json::json!({ "inserted": inserted }))?;
        return Ok(());
    }

    let catalog = QuestionCatalog::load_seeded(storage.questions.as_ref()).await?;
    let mut game = GameService::from_storage(Clock::default_clock(), Arc::new(catalog), &storage);
    if let Some(seed) = args.seed {
        game = game.with_random(Arc::new(SeededRandom::new(seed)));
    }

    match args.command {
        Command::Start { name, role } => print_json(&game.start_new_game(&name, role).await?),
        Command::Resume { name } => print_json(&game.resume_last_game(&name).await?),
        Command::Show { session } => print_json(&game.build_snapshot(session).await?),
        Command::Answer {
            session,
            question,
            choice,
        } => print_json(&game.submit_answer(session, question, choice).await?),
        Command::PerkFront { session, shown } => {
            print_json(&game.use_front_perk(session, shown).await?)
        }
        Command::PerkBack { session } => print_json(&game.use_back_perk(session).await?),
        Command::PerkMobile { session, shown } => {
            print_json(&game.use_mobile_perk(session, shown).await?)
        }
        Command::Scores => print_json(&game.list_scores().await?),
        Command::History { name } => print_json(&game.list_history(&name).await?),
        Command::Seed => Ok(()),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
