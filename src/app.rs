use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime};

use crate::alert::Notifier;
use crate::clock::Clock;
use crate::countdown::{Countdown, CountdownPause, CountdownTick, DurationInput};
use crate::display::{format_countdown, format_minutes_seconds};
use crate::error::TrackerError;
use crate::library::{Library, NewBook};
use crate::prompt::Confirmer;
use crate::reading::{FinishOutcome, ReadingTracker, StartOutcome};
use crate::selection::Selection;
use crate::stopwatch::Stopwatch;
use crate::store::BookStore;
use crate::transfer;
use crate::types::{Book, BookFilter, BookId, Lap, LibraryStats};

/// Application state: the three widgets, the library and its store
///
/// All mutation goes through here so the store is rewritten after every
/// change to the collection.
pub struct App {
    clock: Box<dyn Clock>,
    notifier: Box<dyn Notifier>,
    store: BookStore,
    library: Library,
    stopwatch: Stopwatch,
    countdown: Countdown,
    reading: ReadingTracker,
    selection: Selection,
    filter: BookFilter,
}

impl App {
    /// Load the library from `store`
    pub fn open(store: BookStore, clock: Box<dyn Clock>, notifier: Box<dyn Notifier>) -> Result<Self> {
        let books = store.load()?;
        Ok(Self {
            clock,
            notifier,
            store,
            library: Library::from_books(books),
            stopwatch: Stopwatch::new(),
            countdown: Countdown::new(),
            reading: ReadingTracker::new(),
            selection: Selection::new(),
            filter: BookFilter::default(),
        })
    }

    fn persist(&self) -> Result<()> {
        self.store
            .save(self.library.books())
            .context("Failed to save the library")
    }

    /// Save the library, putting `before` back if the write fails
    ///
    /// Memory never runs ahead of disk, so a failed save leaves the
    /// operation undone rather than half done.
    fn persist_or_revert(&mut self, before: Library) -> Result<()> {
        if let Err(e) = self.persist() {
            tracing::warn!("save failed, reverting in-memory change: {:#}", e);
            self.library = before;
            return Err(e);
        }
        Ok(())
    }

    fn now_ms(&self) -> u64 {
        self.clock.monotonic_ms()
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn stopwatch(&self) -> &Stopwatch {
        &self.stopwatch
    }

    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    pub fn reading(&self) -> &ReadingTracker {
        &self.reading
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    // Stopwatch

    pub fn stopwatch_start(&mut self) -> bool {
        let now = self.now_ms();
        self.stopwatch.start(now)
    }

    pub fn stopwatch_pause(&mut self) -> bool {
        let now = self.now_ms();
        self.stopwatch.pause(now)
    }

    pub fn stopwatch_reset(&mut self) {
        self.stopwatch.reset();
    }

    pub fn stopwatch_lap(&mut self) -> Option<Lap> {
        let now = self.now_ms();
        self.stopwatch.lap(now)
    }

    pub fn stopwatch_tick(&mut self) -> u64 {
        let now = self.now_ms();
        self.stopwatch.tick(now)
    }

    // Countdown

    pub fn countdown_configure(&mut self, input: DurationInput) -> bool {
        self.countdown.configure(input)
    }

    pub fn countdown_start(&mut self) -> Result<bool, TrackerError> {
        let now = self.now_ms();
        self.countdown.start(now)
    }

    /// Pause the countdown; a pause landing after zero finishes the run
    pub fn countdown_pause(&mut self) -> CountdownPause {
        let now = self.now_ms();
        let pause = self.countdown.pause(now);
        if pause == CountdownPause::Finished {
            self.countdown_finished();
        }
        pause
    }

    pub fn countdown_reset(&mut self) {
        self.countdown.reset();
    }

    /// Advance the countdown, sounding the alarm when it reaches zero
    pub fn countdown_tick(&mut self) -> CountdownTick {
        let now = self.now_ms();
        let tick = self.countdown.tick(now);
        if tick == CountdownTick::Finished {
            self.countdown_finished();
        }
        tick
    }

    fn countdown_finished(&mut self) {
        tracing::info!("countdown finished");
        self.notifier.alarm();
        self.notifier.notify("Time's up!", "The countdown has finished");
        self.notifier.flash(&format_countdown(0));
    }

    // Reading sessions

    pub fn reading_time(&self) -> u64 {
        self.reading.current_session_time(self.now_ms())
    }

    pub fn start_reading(&mut self, id: BookId) -> Result<StartOutcome> {
        let (now, wall) = (self.now_ms(), self.clock.now());
        let outcome = self.reading.select_and_start(&self.library, id, now, wall)?;
        if let (StartOutcome::Started, Some(book)) = (outcome, self.library.book(id)) {
            tracing::debug!(book = %id, "reading session started");
            let body = format!("Started reading \"{}\"", book.title);
            self.notifier.notify("Reading started", &body);
        }
        Ok(outcome)
    }

    pub fn pause_reading(&mut self) -> bool {
        let now = self.now_ms();
        let paused = self.reading.pause(now);
        if paused {
            self.notifier.notify("Reading paused", "The session timer is paused");
        }
        paused
    }

    /// End the current session, saving it when it is long enough
    pub fn finish_reading(&mut self) -> Result<FinishOutcome> {
        let (now, wall) = (self.now_ms(), self.clock.now());
        let (library, reading) = (self.library.clone(), self.reading.clone());
        let outcome = self.reading.finish(&mut self.library, now, wall)?;

        match &outcome {
            FinishOutcome::Recorded { book, session } => {
                if let Err(e) = self.persist_or_revert(library) {
                    // Keep the session open so finishing can be retried
                    self.reading = reading;
                    return Err(e);
                }
                tracing::info!(book = %book, duration = session.duration, "session recorded");
                let title = self.library.book(*book).map(|b| b.title.as_str()).unwrap_or_default();
                let body = format!("Saved {} for \"{}\"", format_minutes_seconds(session.duration), title);
                self.notifier.notify("Session saved", &body);
            }
            FinishOutcome::TooShort { book, duration } => {
                tracing::debug!(book = %book, duration, "session too short to record");
                self.notifier
                    .notify("Session too short", "Read for more than 5 seconds to save a session");
            }
        }
        Ok(outcome)
    }

    pub fn discard_reading(&mut self) -> Option<BookId> {
        self.reading.discard()
    }

    // Library

    pub fn add_book(&mut self, new: NewBook) -> Result<BookId> {
        let now = self.clock.now();
        let before = self.library.clone();
        let id = self.library.add_book(new, now)?;
        self.persist_or_revert(before)?;
        if let Some(book) = self.library.book(id) {
            let body = format!("Added \"{}\"", book.title);
            self.notifier.notify("Book added", &body);
        }
        Ok(id)
    }

    pub fn edit_book(&mut self, id: BookId, title: &str, author: &str) -> Result<()> {
        let before = self.library.clone();
        self.library.edit_book(id, title, author)?;
        self.persist_or_revert(before)
    }

    /// Double-confirmed delete; an open session on the book is dropped with it
    pub fn delete_book(&mut self, id: BookId, confirmer: &mut dyn Confirmer) -> Result<bool> {
        let title = self.library.book(id).map(|b| b.title.clone()).unwrap_or_default();
        let before = self.library.clone();
        if !self.library.delete_book(id, confirmer)? {
            return Ok(false);
        }
        self.persist_or_revert(before)?;
        if self.reading.current_book() == Some(id) {
            self.reading.discard();
        }
        self.notifier.notify("Book deleted", &format!("Deleted \"{}\"", title));
        Ok(true)
    }

    /// Mark a book finished. Not allowed while a session on it is open.
    pub fn finish_book(
        &mut self,
        id: BookId,
        date: Option<NaiveDate>,
        time: Option<NaiveTime>,
        notes: Option<&str>,
    ) -> Result<()> {
        if self.reading.current_book() == Some(id) {
            return Err(TrackerError::SessionInProgress(id).into());
        }
        let before = self.library.clone();
        self.library.finish_book(id, date, time, notes)?;
        self.persist_or_revert(before)?;
        if let Some(book) = self.library.book(id) {
            let body = format!("Finished \"{}\"", book.title);
            self.notifier.notify("Book finished", &body);
        }
        Ok(())
    }

    pub fn set_filter(&mut self, filter: BookFilter) {
        self.filter = filter;
    }

    /// Books under the current filter, newest first
    pub fn view(&self) -> Vec<&Book> {
        self.library.filter(&self.filter)
    }

    pub fn stats(&self) -> LibraryStats {
        self.library.stats()
    }

    // Bulk selection

    pub fn toggle_selection_mode(&mut self) -> bool {
        self.selection.toggle_mode()
    }

    pub fn select(&mut self, id: BookId, checked: bool) {
        self.selection.set(id, checked);
    }

    /// Add everything in the current view to the selection
    pub fn select_all(&mut self) {
        let ids: Vec<BookId> = self.view().iter().map(|b| b.id).collect();
        self.selection.select_all(ids);
    }

    pub fn deselect_all(&mut self) {
        self.selection.clear();
    }

    pub fn bulk_edit_author(&mut self, author: &str) -> Result<usize> {
        let before = self.library.clone();
        let changed = self.library.bulk_edit_author(&self.selection, author)?;
        if changed > 0 {
            self.persist_or_revert(before)?;
            self.notifier
                .notify("Books updated", &format!("Updated {} books", changed));
        }
        self.selection.exit();
        Ok(changed)
    }

    /// Double-confirmed delete of the selection. `Ok(None)` when declined.
    pub fn bulk_delete(&mut self, confirmer: &mut dyn Confirmer) -> Result<Option<usize>> {
        let before = self.library.clone();
        let Some(deleted) = self.library.bulk_delete(&self.selection, confirmer)? else {
            return Ok(None);
        };
        self.persist_or_revert(before)?;
        if let Some(current) = self.reading.current_book() {
            if self.selection.contains(current) {
                self.reading.discard();
            }
        }
        self.notifier
            .notify("Books deleted", &format!("Deleted {} books", deleted));
        self.selection.exit();
        Ok(Some(deleted))
    }

    // Import / export

    pub fn export(&mut self, path: &Path) -> Result<usize> {
        let count = self.library.len();
        transfer::export_to(path, self.library.books(), self.clock.now())?;
        self.notifier
            .notify("Export complete", &format!("Exported {} books", count));
        Ok(count)
    }

    /// Replace the whole library with the books in an export file
    ///
    /// Returns `Ok(None)` when the confirmation is declined.
    pub fn import(&mut self, path: &Path, confirmer: &mut dyn Confirmer) -> Result<Option<usize>> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read import file {}", path.display()))?;
        let mut books = transfer::parse_import(&text)?;

        let message = format!(
            "Import {} books? This replaces all {} books currently in the library.",
            books.len(),
            self.library.len()
        );
        if !confirmer.confirm(&message) {
            return Ok(None);
        }

        let base = self.clock.now().timestamp_millis().max(0) as u64;
        transfer::reassign_ids(&mut books, base);
        let count = books.len();
        let before = self.library.clone();
        self.library.replace_all(books);
        self.persist_or_revert(before)?;
        // Old ids are gone
        self.reading.discard();
        self.selection.exit();

        tracing::info!(count, path = %path.display(), "imported books");
        self.notifier
            .notify("Import complete", &format!("Imported {} books", count));
        Ok(Some(count))
    }
}
