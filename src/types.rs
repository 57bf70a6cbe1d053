use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Sessions at or under this many milliseconds are never recorded
pub const MIN_SESSION_MS: u64 = 5_000;

/// Identifier of a book, derived from its creation time in epoch milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(pub u64);

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BookId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(BookId)
            .map_err(|_| format!("'{}' is not a book id", s))
    }
}

/// One recorded stretch of reading time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// When the session was recorded
    pub date: DateTime<Utc>,
    /// Active reading time in milliseconds
    pub duration: u64,
    /// Wall clock at session start, epoch milliseconds
    pub start_time: i64,
    /// Wall clock at finish, epoch milliseconds
    pub end_time: i64,
}

/// A book in the library together with its reading history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: BookId,
    pub title: String,
    #[serde(default)]
    pub author: String,
    /// Accumulated reading time in milliseconds
    #[serde(default)]
    pub total_time: u64,
    #[serde(default)]
    pub sessions: Vec<Session>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub start_date_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finish_date_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub is_finished: bool,
}

impl Book {
    /// Case-insensitive title comparison used for uniqueness checks
    pub fn has_title(&self, title: &str) -> bool {
        self.title.to_lowercase() == title.trim().to_lowercase()
    }

    /// Case-insensitive substring match on title or author
    pub fn matches(&self, needle_lower: &str) -> bool {
        self.title.to_lowercase().contains(needle_lower)
            || self.author.to_lowercase().contains(needle_lower)
    }

    /// Append a finished session and account for its time
    pub fn record_session(&mut self, session: Session) {
        self.total_time += session.duration;
        self.sessions.push(session);
    }

    /// Sessions ordered newest first, numbered from the oldest (1-based)
    pub fn sessions_newest_first(&self) -> Vec<(usize, &Session)> {
        let mut numbered: Vec<(usize, &Session)> = self
            .sessions
            .iter()
            .enumerate()
            .map(|(i, s)| (i + 1, s))
            .collect();
        numbered.sort_by(|a, b| b.1.date.cmp(&a.1.date).then(b.0.cmp(&a.0)));
        numbered
    }
}

/// Stopwatch lap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lap {
    pub number: usize,
    /// Elapsed milliseconds when the lap was taken
    pub time: u64,
}

/// Status part of a library filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Reading,
    Finished,
}

impl StatusFilter {
    pub fn admits(&self, book: &Book) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Reading => !book.is_finished,
            StatusFilter::Finished => book.is_finished,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "reading" => Ok(StatusFilter::Reading),
            "finished" => Ok(StatusFilter::Finished),
            other => Err(format!(
                "unknown status '{}' (expected all, reading or finished)",
                other
            )),
        }
    }
}

/// Search term plus status, as applied to the library view
#[derive(Debug, Clone, Default)]
pub struct BookFilter {
    pub search: Option<String>,
    pub status: StatusFilter,
}

impl BookFilter {
    pub fn new(search: Option<&str>, status: StatusFilter) -> Self {
        Self {
            search: search.map(|s| s.to_string()),
            status,
        }
    }

    pub fn admits(&self, book: &Book) -> bool {
        if !self.status.admits(book) {
            return false;
        }
        match self.search.as_deref().map(|s| s.trim().to_lowercase()) {
            Some(needle) if !needle.is_empty() => book.matches(&needle),
            _ => true,
        }
    }
}

/// Aggregate figures over the whole library
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LibraryStats {
    pub total_books: usize,
    pub total_time: u64,
    pub total_sessions: usize,
}

/// Interpret a local date and optional local time as a UTC instant
///
/// The time defaults to midnight. Nonexistent local times (DST gaps) fall
/// back to reading the wall time as UTC.
pub fn local_to_utc(date: NaiveDate, time: Option<NaiveTime>) -> DateTime<Utc> {
    let naive = NaiveDateTime::new(date, time.unwrap_or(NaiveTime::MIN));
    match Local.from_local_datetime(&naive).earliest() {
        Some(local) => local.with_timezone(&Utc),
        None => Utc.from_utc_datetime(&naive),
    }
}
