use thiserror::Error;

use crate::types::BookId;

/// Failures raised by the library, the widgets and the reading tracker.
///
/// Every variant is raised before any state is touched, so callers can
/// report it and carry on with the collection exactly as it was.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrackerError {
    #[error("book title must not be empty")]
    EmptyTitle,

    #[error("a book titled \"{0}\" already exists")]
    DuplicateTitle(String),

    #[error("no book with id {0}")]
    BookNotFound(BookId),

    #[error("\"{0}\" is already finished and cannot be read")]
    BookFinished(String),

    #[error("\"{0}\" has already been marked as finished")]
    AlreadyFinished(String),

    #[error("a finish date and time are both required")]
    MissingFinishDate,

    #[error("no reading session is in progress")]
    NoActiveSession,

    #[error("a reading session for book {0} is still in progress")]
    SessionInProgress(BookId),

    #[error("set a countdown duration first")]
    ZeroDuration,

    #[error("no books are selected")]
    EmptySelection,

    #[error("invalid import file: {0}")]
    InvalidImport(String),
}
