use chrono::{DateTime, Utc};

use crate::error::TrackerError;
use crate::library::Library;
use crate::types::{BookId, Session, MIN_SESSION_MS};

/// Where the reading tracker currently is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadingState {
    Idle,
    Active {
        book: BookId,
        session_start: DateTime<Utc>,
        accumulated: u64,
        resumed_at: u64,
    },
    Paused {
        book: BookId,
        session_start: DateTime<Utc>,
        accumulated: u64,
    },
}

/// What `select_and_start` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new session began with the counter at zero
    Started,
    /// The paused session for the same book continues
    Resumed,
    /// Already running for this book; nothing changed
    AlreadyRunning,
}

/// What `finish` did with the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishOutcome {
    Recorded { book: BookId, session: Session },
    /// Too short to keep; nothing was written
    TooShort { book: BookId, duration: u64 },
}

/// Per-book reading session timer
///
/// Active time is accumulated from the monotonic clock, so pausing and
/// resuming the same book any number of times adds up to one session.
#[derive(Debug, Clone)]
pub struct ReadingTracker {
    state: ReadingState,
}

impl Default for ReadingTracker {
    fn default() -> Self {
        Self {
            state: ReadingState::Idle,
        }
    }
}

impl ReadingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ReadingState {
        &self.state
    }

    pub fn current_book(&self) -> Option<BookId> {
        match self.state {
            ReadingState::Idle => None,
            ReadingState::Active { book, .. } | ReadingState::Paused { book, .. } => Some(book),
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, ReadingState::Active { .. })
    }

    /// Live session counter in milliseconds
    pub fn current_session_time(&self, now: u64) -> u64 {
        match self.state {
            ReadingState::Idle => 0,
            ReadingState::Paused { accumulated, .. } => accumulated,
            ReadingState::Active {
                accumulated,
                resumed_at,
                ..
            } => accumulated + now.saturating_sub(resumed_at),
        }
    }

    /// Begin or resume reading `id`
    ///
    /// Finished and unknown books are refused, as is any book other than the
    /// one whose session is already in progress.
    pub fn select_and_start(
        &mut self,
        library: &Library,
        id: BookId,
        now: u64,
        wall: DateTime<Utc>,
    ) -> Result<StartOutcome, TrackerError> {
        let book = library.book(id).ok_or(TrackerError::BookNotFound(id))?;
        if book.is_finished {
            return Err(TrackerError::BookFinished(book.title.clone()));
        }

        match self.state {
            ReadingState::Idle => {
                self.state = ReadingState::Active {
                    book: id,
                    session_start: wall,
                    accumulated: 0,
                    resumed_at: now,
                };
                Ok(StartOutcome::Started)
            }
            ReadingState::Paused {
                book,
                session_start,
                accumulated,
            } if book == id => {
                self.state = ReadingState::Active {
                    book,
                    session_start,
                    accumulated,
                    resumed_at: now,
                };
                Ok(StartOutcome::Resumed)
            }
            ReadingState::Active { book, .. } if book == id => Ok(StartOutcome::AlreadyRunning),
            ReadingState::Active { book, .. } | ReadingState::Paused { book, .. } => {
                Err(TrackerError::SessionInProgress(book))
            }
        }
    }

    /// Stop the counter, keeping the session resumable. False when not running.
    pub fn pause(&mut self, now: u64) -> bool {
        if let ReadingState::Active {
            book,
            session_start,
            accumulated,
            resumed_at,
        } = self.state
        {
            self.state = ReadingState::Paused {
                book,
                session_start,
                accumulated: accumulated + now.saturating_sub(resumed_at),
            };
            return true;
        }
        false
    }

    /// End the session, recording it on the book when long enough
    ///
    /// The counter is floored to whole seconds and must exceed five seconds
    /// to be kept. The tracker is back to idle afterwards regardless of the
    /// outcome.
    pub fn finish(
        &mut self,
        library: &mut Library,
        now: u64,
        wall: DateTime<Utc>,
    ) -> Result<FinishOutcome, TrackerError> {
        self.pause(now);
        let (book, session_start, accumulated) = match std::mem::replace(&mut self.state, ReadingState::Idle) {
            ReadingState::Idle => return Err(TrackerError::NoActiveSession),
            ReadingState::Paused {
                book,
                session_start,
                accumulated,
            }
            | ReadingState::Active {
                book,
                session_start,
                accumulated,
                ..
            } => (book, session_start, accumulated),
        };

        let duration = accumulated / 1_000 * 1_000;
        if duration <= MIN_SESSION_MS {
            return Ok(FinishOutcome::TooShort { book, duration });
        }

        let session = Session {
            date: wall,
            duration,
            start_time: session_start.timestamp_millis(),
            end_time: wall.timestamp_millis(),
        };
        library.record_session(book, session.clone())?;
        Ok(FinishOutcome::Recorded { book, session })
    }

    /// Drop the session without recording anything
    pub fn discard(&mut self) -> Option<BookId> {
        let book = self.current_book();
        self.state = ReadingState::Idle;
        book
    }
}
