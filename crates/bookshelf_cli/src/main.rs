//! Bookshelf command-line entry point.
//!
//! # Responsibility
//! - Map subcommands onto `bookshelf_core` service calls.
//! - Resolve settings from the config file, environment, and flags.
//!
//! # Invariants
//! - Each command opens its own connection and drops it on return.
//! - Failures print the full cause chain and exit non-zero; nothing panics.

mod table;

use anyhow::{bail, Context, Result};
use bookshelf_core::db::Connection;
use bookshelf_core::{
    init_logging, open_db, validate_rating, Book, BookId, BookListQuery, BookPatch,
    BookService, CatalogConfig, FieldUpdate, SearchField, SortField, SqliteBookRepository,
    UpdateOutcome,
};
use clap::builder::NonEmptyStringValueParser;
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{error, info};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "bookshelf", version)]
#[command(about = "Keep a personal catalog of books", long_about = None)]
struct Cli {
    /// TOML settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database file (overrides the config file)
    #[arg(long, global = true, env = "BOOKSHELF_DB")]
    db: Option<PathBuf>,

    /// Directory for rolling log files; logging is off when unset
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// trace|debug|info|warn|error
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Optional book fields shared by `add` and `edit`.
#[derive(Args, Debug, Default)]
struct BookFields {
    #[arg(long, value_parser = NonEmptyStringValueParser::new())]
    author: Option<String>,

    #[arg(long)]
    year: Option<i64>,

    #[arg(long, value_parser = NonEmptyStringValueParser::new())]
    genre: Option<String>,

    /// Whole number from 1 to 5
    #[arg(long, value_parser = parse_rating)]
    rating: Option<i64>,

    #[arg(long, value_parser = NonEmptyStringValueParser::new())]
    notes: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Add a book
    Add {
        #[arg(value_parser = NonEmptyStringValueParser::new())]
        title: String,

        #[command(flatten)]
        fields: BookFields,
    },

    /// Show one book
    Show { id: BookId },

    /// List books
    List {
        /// Column to sort by: id|title|author|year|genre|rating
        #[arg(long, value_parser = parse_sort_field)]
        sort: Option<SortField>,

        /// Sort in descending order
        #[arg(long)]
        desc: bool,

        /// Maximum number of books to show
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        limit: Option<u32>,
    },

    /// Search title, author, and genre for a keyword
    Search {
        #[arg(value_parser = NonEmptyStringValueParser::new())]
        keyword: String,

        /// Restrict to title|author|genre; other names search every field
        #[arg(long)]
        field: Option<String>,
    },

    /// Change selected fields of a book
    Edit {
        id: BookId,

        #[arg(long, value_parser = NonEmptyStringValueParser::new())]
        title: Option<String>,

        #[command(flatten)]
        fields: BookFields,

        /// Remove a stored value (repeatable)
        #[arg(long, value_enum)]
        clear: Vec<ClearableField>,
    },

    /// Delete a book
    Delete { id: BookId },

    /// Write every book to a CSV file
    Export {
        /// Target file (defaults to the configured export path)
        path: Option<PathBuf>,
    },

    /// Add books from a CSV file
    Import {
        path: PathBuf,

        /// Treat the first row as data instead of a header
        #[arg(long)]
        no_header: bool,
    },

    /// Show totals, average rating, and books per genre
    Stats,
}

/// Optional fields `edit --clear` may remove. `title` is required and absent.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ClearableField {
    Author,
    Year,
    Genre,
    Rating,
    Notes,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_command module=cli status=error");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(&cli)?;
    start_logging(&config);

    match cli.command {
        Commands::Add { title, fields } => {
            let book = Book {
                author: fields.author,
                year: fields.year,
                genre: fields.genre,
                rating: fields.rating,
                notes: fields.notes,
                ..Book::new(title)
            };
            let id = with_service(&config, |service| Ok(service.add_book(&book)?))?;
            println!("Book added with ID {id}.");
        }
        Commands::Show { id } => {
            let book = with_service(&config, |service| Ok(service.get_book(id)?))?;
            match book {
                Some(book) => print!("{}", table::render_table(&[book])),
                None => bail!("book {id} not found"),
            }
        }
        Commands::List { sort, desc, limit } => {
            let query = BookListQuery {
                sort_by: sort,
                descending: desc,
                limit,
            };
            let books = with_service(&config, |service| Ok(service.list_books(&query)?))?;
            print!("{}", table::render_table(&books));
        }
        Commands::Search { keyword, field } => {
            let field = field.as_deref().and_then(SearchField::from_name);
            let books =
                with_service(&config, |service| Ok(service.search_books(&keyword, field)?))?;
            print!("{}", table::render_table(&books));
        }
        Commands::Edit {
            id,
            title,
            fields,
            clear,
        } => {
            let patch = build_patch(title, fields, &clear)?;
            let outcome = with_service(&config, |service| Ok(service.edit_book(id, &patch)?))?;
            match outcome {
                UpdateOutcome::Updated => println!("Book updated."),
                UpdateOutcome::NothingToUpdate => println!("Nothing updated."),
            }
        }
        Commands::Delete { id } => {
            let removed = with_service(&config, |service| {
                let Some(book) = service.get_book(id)? else {
                    return Ok(None);
                };
                service.remove_book(id)?;
                Ok(Some(book))
            })?;
            match removed {
                Some(book) => println!(
                    "Deleted: [{id}] {} by {}",
                    book.title,
                    book.author.as_deref().unwrap_or("unknown author")
                ),
                None => bail!("book {id} not found"),
            }
        }
        Commands::Export { path } => {
            let path = path.unwrap_or_else(|| config.export_path.clone());
            let count = with_service(&config, |service| {
                service
                    .export_csv(&path)
                    .with_context(|| format!("failed to export to `{}`", path.display()))
            })?;
            println!("Exported {count} rows to {}", path.display());
        }
        Commands::Import { path, no_header } => {
            let report = with_service(&config, |service| {
                service
                    .import_csv(&path, !no_header)
                    .with_context(|| format!("failed to import `{}`", path.display()))
            })?;
            println!(
                "Imported {} rows from {} ({} skipped)",
                report.imported,
                path.display(),
                report.skipped
            );
        }
        Commands::Stats => {
            let stats = with_service(&config, |service| {
                service.summarize().context("failed to compute statistics")
            })?;
            print!("{}", table::render_stats(&stats));
        }
    }

    Ok(())
}

/// Config file first, then `--db`/`BOOKSHELF_DB` and the logging flags.
fn resolve_config(cli: &Cli) -> Result<CatalogConfig> {
    let mut config = match &cli.config {
        Some(path) => CatalogConfig::load(path)
            .with_context(|| format!("failed to load config `{}`", path.display()))?,
        None => CatalogConfig::default(),
    };

    if let Some(db) = &cli.db {
        config = config.with_db_path(db);
    }
    if let Some(dir) = &cli.log_dir {
        config.log_dir = Some(dir.clone());
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    Ok(config)
}

/// Logging failures are reported but never stop the command.
fn start_logging(config: &CatalogConfig) {
    let Some(dir) = &config.log_dir else {
        return;
    };

    let dir = if dir.is_absolute() {
        dir.clone()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(dir),
            Err(err) => {
                eprintln!("warning: logging disabled: {err}");
                return;
            }
        }
    };

    match init_logging(&config.log_level, &dir) {
        Ok(()) => info!(
            "event=cli_start module=cli status=ok version={}",
            env!("CARGO_PKG_VERSION")
        ),
        Err(err) => eprintln!("warning: logging disabled: {:#}", anyhow::Error::new(err)),
    }
}

fn open_catalog(path: &Path) -> Result<Connection> {
    open_db(path).with_context(|| format!("failed to open database `{}`", path.display()))
}

/// Runs `op` against a service bound to a fresh connection.
fn with_service<T>(
    config: &CatalogConfig,
    op: impl FnOnce(&BookService<SqliteBookRepository<'_>>) -> Result<T>,
) -> Result<T> {
    let conn = open_catalog(&config.db_path)?;
    let service = BookService::new(SqliteBookRepository::try_new(&conn)?);
    op(&service)
}

fn build_patch(
    title: Option<String>,
    fields: BookFields,
    clear: &[ClearableField],
) -> Result<BookPatch> {
    let mut patch = BookPatch {
        title: FieldUpdate::from_option(title),
        author: FieldUpdate::from_option(fields.author),
        year: FieldUpdate::from_option(fields.year),
        genre: FieldUpdate::from_option(fields.genre),
        rating: FieldUpdate::from_option(fields.rating),
        notes: FieldUpdate::from_option(fields.notes),
    };

    for field in clear {
        let already_set = match field {
            ClearableField::Author => mark_cleared(&mut patch.author),
            ClearableField::Year => mark_cleared(&mut patch.year),
            ClearableField::Genre => mark_cleared(&mut patch.genre),
            ClearableField::Rating => mark_cleared(&mut patch.rating),
            ClearableField::Notes => mark_cleared(&mut patch.notes),
        };
        if already_set {
            let name = field
                .to_possible_value()
                .map(|value| value.get_name().to_string())
                .unwrap_or_default();
            bail!("`{name}` cannot be both set and cleared");
        }
    }
    Ok(patch)
}

/// Returns whether the slot already carried a value.
fn mark_cleared<T>(slot: &mut FieldUpdate<T>) -> bool {
    matches!(std::mem::replace(slot, FieldUpdate::Clear), FieldUpdate::Set(_))
}

fn parse_rating(raw: &str) -> Result<i64, String> {
    let rating: i64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("`{raw}` is not a whole number"))?;
    validate_rating(rating).map_err(|err| err.to_string())
}

fn parse_sort_field(raw: &str) -> Result<SortField, String> {
    raw.parse().map_err(|err: bookshelf_core::ValidationError| err.to_string())
}
