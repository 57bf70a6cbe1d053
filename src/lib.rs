pub mod types;
pub mod error;
pub mod clock;
pub mod scheduler;
pub mod stopwatch;
pub mod countdown;
pub mod reading;
pub mod selection;
pub mod prompt;
pub mod library;
pub mod display;
pub mod store;
pub mod transfer;
pub mod alert;
pub mod config;
pub mod logging;
pub mod app;
pub mod runner;

// Re-export commonly used types
pub use app::App;
pub use error::TrackerError;
pub use library::{Library, NewBook};
pub use types::{Book, BookFilter, BookId, Session, StatusFilter};
