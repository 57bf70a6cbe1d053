use std::io;
use std::path::PathBuf;

use anyhow::{bail, Result};
use booktimer::alert::TerminalNotifier;
use booktimer::clock::SystemClock;
use booktimer::config::{default_config_path, Config};
use booktimer::countdown::DurationInput;
use booktimer::display;
use booktimer::prompt::{AssumeYes, Confirmer, StdinConfirmer};
use booktimer::runner::{self, Events};
use booktimer::store::BookStore;
use booktimer::transfer::default_export_file_name;
use booktimer::{logging, App, BookFilter, BookId, NewBook, StatusFilter, TrackerError};
use chrono::{Local, NaiveDate, NaiveTime, Utc};
use clap::{Args, Parser, Subcommand};

/// Stopwatch, countdown and reading-time tracker for your books
#[derive(Parser)]
#[command(name = "booktimer")]
#[command(version)]
#[command(about = "Stopwatch, countdown and reading-time tracker for your books", long_about = None)]
struct Cli {
    /// Directory holding the book store (overrides the config file)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Config file to use instead of the platform default
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Answer yes to every confirmation
    #[arg(short, long, global = true)]
    yes: bool,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the stopwatch
    Stopwatch,
    /// Run a countdown timer
    Countdown {
        #[arg(short = 'H', long, default_value = "0")]
        hours: String,
        #[arg(short, long, default_value = "0")]
        minutes: String,
        #[arg(short, long, default_value = "0")]
        seconds: String,
    },
    /// Time a reading session on a book; lists readable books without an id
    Read { id: Option<BookId> },
    /// Add a book to the library
    Add {
        title: String,
        #[arg(short, long, default_value = "")]
        author: String,
        /// Local date reading started (YYYY-MM-DD)
        #[arg(long)]
        start_date: Option<NaiveDate>,
        /// Local time reading started (HH:MM:SS), midnight when omitted
        #[arg(long, requires = "start_date")]
        start_time: Option<NaiveTime>,
    },
    /// Change a book's title or author
    Edit {
        id: BookId,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        author: Option<String>,
    },
    /// Delete a book after confirming twice
    Delete { id: BookId },
    /// Mark a book as finished, now unless a date and time are given
    Finish {
        id: BookId,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        time: Option<NaiveTime>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// List books, newest first
    List {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Show a book and its sessions
    Show { id: BookId },
    /// Library totals
    Stats,
    /// Write every book to a JSON export file
    Export { path: Option<PathBuf> },
    /// Replace the library with the books in an export file
    Import { path: PathBuf },
    /// Set the author of several books at once
    BulkAuthor {
        author: String,
        #[command(flatten)]
        targets: Targets,
    },
    /// Delete several books at once
    BulkDelete {
        #[command(flatten)]
        targets: Targets,
    },
}

#[derive(Args)]
struct FilterArgs {
    /// Case-insensitive match on title or author
    #[arg(short, long)]
    search: Option<String>,
    /// all, reading or finished
    #[arg(long, default_value = "all")]
    status: StatusFilter,
}

impl FilterArgs {
    fn to_filter(&self) -> BookFilter {
        BookFilter::new(self.search.as_deref(), self.status)
    }
}

#[derive(Args)]
struct Targets {
    /// Comma-separated book ids
    #[arg(long, value_delimiter = ',')]
    ids: Vec<BookId>,
    /// Every book matching --search/--status
    #[arg(long, conflicts_with = "ids")]
    all: bool,
    #[command(flatten)]
    filter: FilterArgs,
}

impl Command {
    fn is_interactive(&self) -> bool {
        matches!(self, Command::Stopwatch | Command::Countdown { .. } | Command::Read { id: Some(_) })
    }
}

/// Ask once whether to show notifications and remember the answer
fn resolve_notifications(config: &mut Config, config_path: Option<&PathBuf>) -> Result<bool> {
    if let Some(enabled) = config.notifications {
        return Ok(enabled);
    }
    let enabled = StdinConfirmer.confirm("Show notifications for timer and reading events?");
    config.notifications = Some(enabled);
    if let Some(path) = config_path {
        config.save_to(path)?;
    }
    Ok(enabled)
}

/// Enter selection mode with the requested books checked, and show them
fn select_targets(app: &mut App, targets: &Targets) -> Result<()> {
    app.toggle_selection_mode();
    if targets.all {
        app.set_filter(targets.filter.to_filter());
        app.select_all();
    } else if targets.ids.is_empty() {
        bail!("pass --ids or --all to choose books");
    } else {
        for id in &targets.ids {
            app.select(*id, true);
        }
    }
    display::display_book_list(&app.view(), Some(app.selection()));
    println!();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config_path = cli.config.clone().or_else(default_config_path);
    let mut config = match &config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::default(),
    };
    let data_dir = config.data_dir(cli.data_dir.as_deref())?;

    let notifications = if cli.command.is_interactive() {
        resolve_notifications(&mut config, config_path.as_ref())?
    } else {
        false
    };
    let notifier = TerminalNotifier::new(notifications, config.alarm);
    let mut app = App::open(
        BookStore::in_dir(&data_dir),
        Box::new(SystemClock::new()),
        Box::new(notifier),
    )?;

    let mut confirmer: Box<dyn Confirmer> = if cli.yes {
        Box::new(AssumeYes)
    } else {
        Box::new(StdinConfirmer)
    };

    match cli.command {
        Command::Stopwatch => {
            let events = Events::new();
            events.attach_terminal()?;
            runner::run_stopwatch(&mut app, &events, &mut io::stdout())?;
            display::display_laps(app.stopwatch().laps());
        }
        Command::Countdown { hours, minutes, seconds } => {
            let events = Events::new();
            events.attach_terminal()?;
            let input = DurationInput::parse(&hours, &minutes, &seconds);
            runner::run_countdown(&mut app, input, &events, &mut io::stdout())?;
        }
        Command::Read { id: Some(id) } => {
            let events = Events::new();
            events.attach_terminal()?;
            runner::run_reading(&mut app, id, &events, &mut io::stdout())?;
        }
        Command::Read { id: None } => {
            display::display_book_list(&app.library().reading_candidates(), None);
        }
        Command::Add {
            title,
            author,
            start_date,
            start_time,
        } => {
            let id = app.add_book(NewBook {
                title,
                author,
                start_date,
                start_time,
            })?;
            println!("Added book {}", id);
        }
        Command::Edit { id, title, author } => {
            let Some(book) = app.library().book(id) else {
                return Err(TrackerError::BookNotFound(id).into());
            };
            let title = title.unwrap_or_else(|| book.title.clone());
            let author = author.unwrap_or_else(|| book.author.clone());
            app.edit_book(id, &title, &author)?;
            println!("Updated book {}", id);
        }
        Command::Delete { id } => {
            if app.delete_book(id, confirmer.as_mut())? {
                println!("Deleted book {}", id);
            } else {
                println!("Nothing deleted");
            }
        }
        Command::Finish {
            id,
            date,
            time,
            notes,
        } => {
            let (date, time) = match (date, time) {
                (None, None) => {
                    let now = Local::now();
                    (Some(now.date_naive()), Some(now.time()))
                }
                given => given,
            };
            app.finish_book(id, date, time, notes.as_deref())?;
            println!("Marked book {} as finished", id);
        }
        Command::List { filter } => {
            app.set_filter(filter.to_filter());
            display::display_book_list(&app.view(), None);
        }
        Command::Show { id } => match app.library().book(id) {
            Some(book) => display::display_book_details(book),
            None => return Err(TrackerError::BookNotFound(id).into()),
        },
        Command::Stats => display::display_stats(&app.stats()),
        Command::Export { path } => {
            let path = path.unwrap_or_else(|| PathBuf::from(default_export_file_name(Utc::now())));
            let count = app.export(&path)?;
            println!("Exported {} books to {}", count, path.display());
        }
        Command::Import { path } => match app.import(&path, confirmer.as_mut())? {
            Some(count) => println!("Imported {} books", count),
            None => println!("Import cancelled"),
        },
        Command::BulkAuthor { author, targets } => {
            select_targets(&mut app, &targets)?;
            let changed = app.bulk_edit_author(&author)?;
            println!("Updated {} books", changed);
        }
        Command::BulkDelete { targets } => {
            select_targets(&mut app, &targets)?;
            match app.bulk_delete(confirmer.as_mut())? {
                Some(count) => println!("Deleted {} books", count),
                None => println!("Nothing deleted"),
            }
        }
    }

    Ok(())
}
