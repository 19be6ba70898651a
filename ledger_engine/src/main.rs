//! Ledger engine CLI.
//!
//! Operates on a local SQLite ledger plus a JSON catalog dump. Each
//! subcommand maps to one engine operation and prints its result as JSON.

use clap::{Parser, Subcommand};
use ledger_engine::{
    bulk_import, catalog_file::FileCatalog, database, duplicates, ledger, price_history,
    valuation, CollectionKind, Currency, LedgerError, UserContext, Variant,
};
use rusqlite::Connection;
use std::path::PathBuf;

/// Collectible-card inventory ledger
#[derive(Parser, Debug)]
#[command(name = "ledger_engine")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the SQLite database file
    #[arg(short, long, default_value_t = default_db_path())]
    database: String,

    /// User identity to operate as
    #[arg(long, default_value = "guest")]
    user: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Initialize the database schema and exit
    Init,
    /// Create a collection
    CreateCollection {
        #[arg(long)]
        name: String,
        /// "manual" or "automatic"
        #[arg(long, default_value = "manual")]
        kind: String,
        /// Opaque filter descriptor for automatic collections
        #[arg(long)]
        filter: Option<String>,
    },
    /// List the user's collections
    ListCollections,
    /// Delete a collection and all of its ledger rows
    DeleteCollection {
        #[arg(long)]
        collection: i64,
    },
    /// Write an absolute quantity for (collection, card, variant)
    Upsert {
        #[arg(long)]
        collection: i64,
        #[arg(long)]
        card: String,
        #[arg(long, default_value = "normal")]
        variant: String,
        #[arg(long)]
        quantity: i64,
        /// New notes text; omit to keep the stored value
        #[arg(long)]
        notes: Option<String>,
        /// Clear the stored notes
        #[arg(long, default_value_t = false, conflicts_with = "notes")]
        clear_notes: bool,
    },
    /// Validate a batch of entries against a catalog set
    ImportValidate {
        /// JSON catalog dump
        #[arg(long)]
        catalog: PathBuf,
        #[arg(long)]
        set: String,
        /// JSON file: array of {rawText, parsedNumber, quantity}
        #[arg(long)]
        entries: PathBuf,
    },
    /// Commit validated items into a collection
    ImportCommit {
        #[arg(long)]
        collection: i64,
        /// JSON file: array of {cardId, variant, quantity}
        #[arg(long)]
        items: PathBuf,
    },
    /// Report holdings above a duplicate threshold
    Duplicates {
        #[arg(long)]
        catalog: PathBuf,
        #[arg(long)]
        collection: i64,
        #[arg(long)]
        threshold: Option<i64>,
    },
    /// Valuate all of the user's holdings
    Valuate {
        #[arg(long)]
        catalog: PathBuf,
        /// "USD" or "EUR"
        #[arg(long, default_value = "USD")]
        currency: String,
    },
    /// Price history for a card
    History {
        #[arg(long)]
        catalog: PathBuf,
        #[arg(long)]
        card: String,
    },
    /// Record a real price observation for a card
    RecordPrice {
        #[arg(long)]
        card: String,
        /// Observation date, YYYY-MM-DD
        #[arg(long)]
        date: String,
        #[arg(long)]
        price: f64,
        #[arg(long)]
        source: String,
    },
}

/// Returns the default database path: ~/.local/share/ledger_engine/ledger.db
fn default_db_path() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ledger_engine")
        .join("ledger.db")
        .to_string_lossy()
        .to_string()
}

fn parse_variant(tag: &str) -> Result<Variant, LedgerError> {
    Variant::parse(tag)
        .ok_or_else(|| LedgerError::Validation(format!("unknown variant: {}", tag)))
}

fn parse_currency(tag: &str) -> Result<Currency, LedgerError> {
    Currency::parse(tag)
        .ok_or_else(|| LedgerError::Validation(format!("unknown currency: {}", tag)))
}

fn load_json<T: serde::de::DeserializeOwned>(path: &PathBuf) -> Result<T, LedgerError> {
    let data = std::fs::read_to_string(path)
        .map_err(|e| LedgerError::Validation(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&data)
        .map_err(|e| LedgerError::Validation(format!("{}: {}", path.display(), e)))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), LedgerError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|e| LedgerError::Validation(e.to_string()))?;
    println!("{}", rendered);
    Ok(())
}

fn run(conn: &mut Connection, ctx: &UserContext, command: Command) -> Result<(), LedgerError> {
    match command {
        Command::Init => {
            // Schema is initialized on startup; nothing further to do
            log::info!("Schema ready");
            Ok(())
        }
        Command::CreateCollection { name, kind, filter } => {
            let kind = CollectionKind::parse(&kind)
                .ok_or_else(|| LedgerError::Validation(format!("unknown kind: {}", kind)))?;
            let collection =
                ledger::create_collection(conn, ctx, &name, kind, filter.as_deref())?;
            print_json(&collection)
        }
        Command::ListCollections => {
            let collections = ledger::list_collections(conn, ctx)?;
            print_json(&collections)
        }
        Command::DeleteCollection { collection } => {
            ledger::delete_collection(conn, collection)?;
            log::info!("Deleted collection {}", collection);
            Ok(())
        }
        Command::Upsert {
            collection,
            card,
            variant,
            quantity,
            notes,
            clear_notes,
        } => {
            let variant = parse_variant(&variant)?;
            let notes = if clear_notes {
                Some(None)
            } else {
                notes.as_deref().map(Some)
            };
            let outcome = ledger::upsert(conn, collection, &card, variant, quantity, notes)?;
            print_json(&outcome)
        }
        Command::ImportValidate {
            catalog,
            set,
            entries,
        } => {
            let catalog = FileCatalog::load(&catalog)?;
            let entries: Vec<bulk_import::ImportEntry> = load_json(&entries)?;
            let results = bulk_import::validate_batch(&catalog, &set, &entries)?;
            print_json(&results)
        }
        Command::ImportCommit { collection, items } => {
            let items: Vec<bulk_import::CommitItem> = load_json(&items)?;
            let inserted = bulk_import::commit_batch(conn, collection, &items)?;
            log::info!("Inserted {} row(s)", inserted);
            Ok(())
        }
        Command::Duplicates {
            catalog,
            collection,
            threshold,
        } => {
            let catalog = FileCatalog::load(&catalog)?;
            let groups = duplicates::find_duplicates(conn, &catalog, collection, threshold)?;
            print_json(&groups)
        }
        Command::Valuate { catalog, currency } => {
            let catalog = FileCatalog::load(&catalog)?;
            let currency = parse_currency(&currency)?;
            let report = valuation::valuate_portfolio(conn, &catalog, ctx, currency)?;
            print_json(&report)
        }
        Command::History { catalog, card } => {
            let catalog = FileCatalog::load(&catalog)?;
            let points = price_history::card_price_history(conn, &catalog, &card)?;
            print_json(&points)
        }
        Command::RecordPrice {
            card,
            date,
            price,
            source,
        } => {
            database::record_price_point(conn, &card, &date, price, &source)?;
            log::info!("Recorded {} {} for {} ({})", price, date, card, source);
            Ok(())
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let db_path = PathBuf::from(&args.database);

    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        if !parent.exists() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                log::error!("Failed to create database directory: {}", e);
                std::process::exit(1);
            }
        }
    }

    let mut conn = match Connection::open(&db_path) {
        Ok(conn) => conn,
        Err(e) => {
            log::error!("Failed to open database {}: {}", db_path.display(), e);
            std::process::exit(1);
        }
    };

    if let Err(e) = database::init_schema(&conn) {
        log::error!("Failed to initialize database schema: {}", e);
        std::process::exit(1);
    }

    let ctx = UserContext::new(args.user);

    if let Err(e) = run(&mut conn, &ctx, args.command) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
