use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::{json, Value};
use shelfbase_core::{
    Backend, Collection, Database, FieldKind, Filter, Key, Payload, RecordId, Schema,
    ShelfConfig, ShelfError,
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "shelfbase")]
#[command(about = "shelfbase CLI - manage validated book and todo collections")]
#[command(version)]
struct Cli {
    /// Config file (default: $SHELFBASE_CONFIG, then ./shelfbase.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    target: Target,
}

#[derive(Subcommand)]
enum Target {
    /// Book catalogue
    Books {
        #[command(subcommand)]
        action: Action,
    },
    /// Todo items
    Todos {
        #[command(subcommand)]
        action: Action,
    },
}

#[derive(Subcommand)]
enum Action {
    /// Create a record from a JSON object
    Create {
        /// e.g. '{"title": "Emma", "author": "Jane Austen"}'
        json: String,
    },
    /// List records, optionally filtered by one declared lookup
    List {
        /// Exact match, FIELD=VALUE
        #[arg(long, value_name = "FIELD=VALUE", conflicts_with_all = ["text", "range"])]
        exact: Option<String>,
        /// Text match in the field's declared mode, FIELD=VALUE
        #[arg(long, value_name = "FIELD=VALUE", conflicts_with = "range")]
        text: Option<String>,
        /// Inclusive numeric range, FIELD=LOW..HIGH
        #[arg(long, value_name = "FIELD=LOW..HIGH")]
        range: Option<String>,
    },
    /// Fetch exactly one record
    Get(KeyArgs),
    /// Partially update exactly one record
    Update {
        #[command(flatten)]
        key: KeyArgs,
        /// Fields to change; null clears an optional field
        json: String,
    },
    /// Delete exactly one record and print it
    Delete(KeyArgs),
    /// Load the starter books into an empty catalogue
    Seed,
}

#[derive(Args)]
struct KeyArgs {
    /// Record identity
    #[arg(long, conflicts_with_all = ["key", "title", "author"])]
    id: Option<String>,
    /// Alternate point key, FIELD=VALUE
    #[arg(long, value_name = "FIELD=VALUE", conflicts_with_all = ["title", "author"])]
    key: Option<String>,
    /// Composite key: title component
    #[arg(long, requires = "author")]
    title: Option<String>,
    /// Composite key: author component
    #[arg(long, requires = "title")]
    author: Option<String>,
}

impl KeyArgs {
    fn to_key(&self, schema: &Schema) -> Result<Key> {
        if let Some(id) = &self.id {
            return Ok(Key::Id(RecordId::parse(id)));
        }
        if let Some(pair) = &self.key {
            let (field, raw) = split_pair(pair)?;
            return Ok(Key::Alternate {
                field: field.to_string(),
                value: parse_value(schema, field, raw)?,
            });
        }
        match (&self.title, &self.author) {
            (Some(title), Some(author)) => Ok(Key::composite([title.as_str(), author.as_str()])),
            _ => bail!("one of --id, --key or --title/--author is required"),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_path = ShelfConfig::resolve_path(cli.config.as_deref());
    let (config, found) = if config_path.exists() {
        match ShelfConfig::load(&config_path) {
            Ok(config) => (config, true),
            Err(err) => {
                eprintln!("error: {}", err);
                return ExitCode::from(1);
            }
        }
    } else {
        (ShelfConfig::default(), false)
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    if found {
        info!(path = %config_path.display(), "loaded config");
    } else {
        warn!(path = %config_path.display(), "config file not found, using defaults");
    }

    match run(cli.target, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::from(exit_code(&err))
        }
    }
}

fn open_database(config: &ShelfConfig) -> Result<Database> {
    let db = Database::open(config).context("Failed to open database")?;
    if config.should_seed() {
        db.seed_books().context("Failed to seed books")?;
    }
    Ok(db)
}

fn run(target: Target, config: &ShelfConfig) -> Result<()> {
    let db = open_database(config)?;

    let (collection, action) = match target {
        Target::Books { action } => (db.books(), action),
        Target::Todos { action } => (db.todos(), action),
    };

    match action {
        Action::Create { json } => print_json(&collection.create(&parse_payload(&json)?)?)?,
        Action::List { exact, text, range } => {
            let filter = parse_filter(collection.schema(), exact, text, range)?;
            print_json(&collection.list(filter.as_ref())?)?;
        }
        Action::Get(key) => print_json(&collection.get(&key.to_key(collection.schema())?)?)?,
        Action::Update { key, json } => {
            let key = key.to_key(collection.schema())?;
            print_json(&collection.update(&key, &parse_payload(&json)?)?)?;
        }
        Action::Delete(key) => {
            print_json(&collection.delete(&key.to_key(collection.schema())?)?)?
        }
        Action::Seed => seed(&db, collection)?,
    }

    db.flush().context("Failed to flush database")
}

fn seed(db: &Database, collection: &Collection<Backend>) -> Result<()> {
    if collection.name() != db.books().name() {
        bail!("no starter data for '{}'", collection.name());
    }
    let inserted = db.seed_books()?;
    print_json(&json!({ "inserted": inserted }))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", out);
    Ok(())
}

// ========== ARGUMENT PARSING ==========

fn parse_payload(raw: &str) -> Result<Payload> {
    let value: Value =
        serde_json::from_str(raw).with_context(|| format!("Invalid JSON payload: {}", raw))?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(anyhow!("payload must be a JSON object, got {}", other)),
    }
}

fn split_pair(pair: &str) -> Result<(&str, &str)> {
    pair.split_once('=')
        .ok_or_else(|| anyhow!("expected FIELD=VALUE, got '{}'", pair))
}

/// Text fields take the raw string; other kinds are read as JSON
fn parse_value(schema: &Schema, field: &str, raw: &str) -> Result<Value> {
    match schema.spec(field).map(|spec| &spec.kind) {
        Some(FieldKind::Text { .. }) | None => Ok(Value::String(raw.to_string())),
        Some(_) => serde_json::from_str(raw)
            .with_context(|| format!("Invalid value for '{}': {}", field, raw)),
    }
}

fn parse_range(raw: &str) -> Result<(f64, f64)> {
    let (low, high) = raw
        .split_once("..")
        .ok_or_else(|| anyhow!("expected LOW..HIGH, got '{}'", raw))?;
    let bound = |s: &str| {
        s.trim()
            .parse::<f64>()
            .with_context(|| format!("Invalid range bound: '{}'", s))
    };
    Ok((bound(low)?, bound(high)?))
}

fn parse_filter(
    schema: &Schema,
    exact: Option<String>,
    text: Option<String>,
    range: Option<String>,
) -> Result<Option<Filter>> {
    if let Some(pair) = exact {
        let (field, raw) = split_pair(&pair)?;
        return Ok(Some(Filter::exact(field, parse_value(schema, field, raw)?)));
    }
    if let Some(pair) = text {
        let (field, needle) = split_pair(&pair)?;
        return Ok(Some(Filter::text(field, needle)));
    }
    if let Some(pair) = range {
        let (field, raw) = split_pair(&pair)?;
        let (low, high) = parse_range(raw)?;
        return Ok(Some(Filter::range(field, low, high)));
    }
    Ok(None)
}

// ========== ERROR REPORTING ==========

/// NotFound -> 4, rejected input -> 2, anything else -> 1
fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<ShelfError>() {
        Some(ShelfError::NotFound(_)) => 4,
        Some(ShelfError::InvalidInput(_)) | Some(ShelfError::AmbiguousKey { .. }) => 2,
        _ => 1,
    }
}

fn report(err: &anyhow::Error) {
    match err.downcast_ref::<ShelfError>() {
        Some(ShelfError::InvalidInput(errors)) => {
            let body = json!({ "error": "invalid_input", "violations": errors });
            match serde_json::to_string_pretty(&body) {
                Ok(out) => eprintln!("{}", out),
                Err(_) => eprintln!("error: {:#}", err),
            }
        }
        Some(ShelfError::NotFound(what)) => {
            debug!("not found: {}", what);
            eprintln!("error: not found: {}", what);
        }
        _ => eprintln!("error: {:#}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelfbase_core::{Book, IdStrategy, Todo};

    #[test]
    fn test_parse_value_by_field_kind() {
        let schema = Book::schema(IdStrategy::Uuid);
        assert_eq!(parse_value(&schema, "title", "1984").unwrap(), json!("1984"));
        assert_eq!(parse_value(&schema, "published_year", "1949").unwrap(), json!(1949));
        assert_eq!(parse_value(&schema, "rating", "4.5").unwrap(), json!(4.5));
        assert!(parse_value(&schema, "rating", "high").is_err());
    }

    #[test]
    fn test_parse_range() {
        assert_eq!(parse_range("1.5..4").unwrap(), (1.5, 4.0));
        assert!(parse_range("4").is_err());
        assert!(parse_range("a..b").is_err());
    }

    #[test]
    fn test_parse_payload_requires_object() {
        assert!(parse_payload(r#"{"title": "x"}"#).is_ok());
        assert!(parse_payload("[1, 2]").is_err());
        assert!(parse_payload("not json").is_err());
    }

    #[test]
    fn test_key_args() {
        let schema = Book::schema(IdStrategy::Uuid);
        let args = KeyArgs {
            id: None,
            key: None,
            title: Some("1984".to_string()),
            author: Some("George Orwell".to_string()),
        };
        assert_eq!(
            args.to_key(&schema).unwrap(),
            Key::composite(["1984", "George Orwell"])
        );

        let args = KeyArgs {
            id: Some("3".to_string()),
            key: None,
            title: None,
            author: None,
        };
        assert_eq!(
            args.to_key(&Todo::schema(IdStrategy::Sequential)).unwrap(),
            Key::Id(RecordId::Int(3))
        );
    }

    #[test]
    fn test_exit_codes() {
        let not_found = anyhow::Error::new(ShelfError::NotFound("x".into()));
        assert_eq!(exit_code(&not_found), 4);

        let ambiguous = anyhow::Error::new(ShelfError::AmbiguousKey {
            key: "k".into(),
            matches: 2,
        })
        .context("while updating");
        assert_eq!(exit_code(&ambiguous), 2);

        assert_eq!(exit_code(&anyhow!("boom")), 1);
    }

    #[test]
    fn test_default_config_starts_with_starter_books() {
        let db = open_database(&ShelfConfig::default()).unwrap();
        assert_eq!(db.books().count(), 5);
        let book = db
            .books()
            .get(&Key::composite(["1984", "George Orwell"]))
            .unwrap();
        assert_eq!(book.get_str("author"), Some("George Orwell"));
    }

    #[test]
    fn test_cli_parses_composite_delete() {
        let cli = Cli::try_parse_from([
            "shelfbase", "books", "delete", "--title", "1984", "--author", "George Orwell",
        ])
        .unwrap();
        assert!(matches!(
            cli.target,
            Target::Books {
                action: Action::Delete(_)
            }
        ));
        assert!(Cli::try_parse_from(["shelfbase", "books", "delete", "--title", "1984"]).is_err());
    }
}
