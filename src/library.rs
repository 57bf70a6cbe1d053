use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::display::format_hms;
use crate::error::TrackerError;
use crate::prompt::Confirmer;
use crate::selection::Selection;
use crate::types::{local_to_utc, Book, BookFilter, BookId, LibraryStats, Session};

/// Input for a new library entry
#[derive(Debug, Clone, Default)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub start_date: Option<NaiveDate>,
    /// Only used together with `start_date`
    pub start_time: Option<NaiveTime>,
}

impl NewBook {
    pub fn titled(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Self::default()
        }
    }

    pub fn by(mut self, author: &str) -> Self {
        self.author = author.to_string();
        self
    }
}

/// The book collection and every operation that changes it
///
/// Operations validate first and only then mutate, so a returned error means
/// the collection is untouched. Persisting is the caller's job.
#[derive(Debug, Default, Clone)]
pub struct Library {
    books: Vec<Book>,
}

impl Library {
    pub fn from_books(books: Vec<Book>) -> Self {
        Self { books }
    }

    pub fn books(&self) -> &[Book] {
        &self.books
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    pub fn book(&self, id: BookId) -> Option<&Book> {
        self.books.iter().find(|b| b.id == id)
    }

    fn book_mut(&mut self, id: BookId) -> Result<&mut Book, TrackerError> {
        self.books
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or(TrackerError::BookNotFound(id))
    }

    /// Swap in a whole new collection
    pub fn replace_all(&mut self, books: Vec<Book>) {
        self.books = books;
    }

    /// Creation time in epoch ms, bumped past every existing id
    fn next_id(&self, now: DateTime<Utc>) -> BookId {
        let stamp = now.timestamp_millis().max(0) as u64;
        let after_last = self.books.iter().map(|b| b.id.0 + 1).max().unwrap_or(0);
        BookId(stamp.max(after_last))
    }

    fn title_taken(&self, title: &str, except: Option<BookId>) -> bool {
        self.books
            .iter()
            .any(|b| Some(b.id) != except && b.has_title(title))
    }

    pub fn add_book(&mut self, new: NewBook, now: DateTime<Utc>) -> Result<BookId, TrackerError> {
        let title = new.title.trim();
        if title.is_empty() {
            return Err(TrackerError::EmptyTitle);
        }
        if self.title_taken(title, None) {
            return Err(TrackerError::DuplicateTitle(title.to_string()));
        }

        let id = self.next_id(now);
        self.books.push(Book {
            id,
            title: title.to_string(),
            author: new.author.trim().to_string(),
            total_time: 0,
            sessions: Vec::new(),
            created_at: now,
            start_date_time: new.start_date.map(|d| local_to_utc(d, new.start_time)),
            finish_date_time: None,
            notes: None,
            is_finished: false,
        });
        Ok(id)
    }

    pub fn edit_book(&mut self, id: BookId, title: &str, author: &str) -> Result<(), TrackerError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(TrackerError::EmptyTitle);
        }
        if self.title_taken(title, Some(id)) {
            return Err(TrackerError::DuplicateTitle(title.to_string()));
        }

        let book = self.book_mut(id)?;
        book.title = title.to_string();
        book.author = author.trim().to_string();
        Ok(())
    }

    /// Delete one book after two confirmations
    ///
    /// Returns `Ok(false)` when either confirmation is declined.
    pub fn delete_book(&mut self, id: BookId, confirmer: &mut dyn Confirmer) -> Result<bool, TrackerError> {
        let book = self.book(id).ok_or(TrackerError::BookNotFound(id))?;

        let first = format!(
            "Delete this book?\n\n  Title:    \"{}\"\n  Author:   {}\n  Time:     {}\n  Sessions: {}\n\nThis cannot be undone.",
            book.title,
            if book.author.is_empty() { "(none)" } else { book.author.as_str() },
            format_hms(book.total_time),
            book.sessions.len(),
        );
        if !confirmer.confirm(&first) {
            return Ok(false);
        }
        let second = format!("Confirm deleting \"{}\" permanently.", book.title);
        if !confirmer.confirm(&second) {
            return Ok(false);
        }

        self.remove(&[id]);
        Ok(true)
    }

    /// Unconditionally drop the given ids, returning how many were present
    pub fn remove(&mut self, ids: &[BookId]) -> usize {
        let before = self.books.len();
        self.books.retain(|b| !ids.contains(&b.id));
        before - self.books.len()
    }

    /// Mark a book finished. One way: a finished book stays finished.
    pub fn finish_book(
        &mut self,
        id: BookId,
        date: Option<NaiveDate>,
        time: Option<NaiveTime>,
        notes: Option<&str>,
    ) -> Result<(), TrackerError> {
        let (Some(date), Some(time)) = (date, time) else {
            return Err(TrackerError::MissingFinishDate);
        };
        let book = self.book_mut(id)?;
        if book.is_finished {
            return Err(TrackerError::AlreadyFinished(book.title.clone()));
        }

        book.finish_date_time = Some(local_to_utc(date, Some(time)));
        book.notes = notes
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        book.is_finished = true;
        Ok(())
    }

    pub fn record_session(&mut self, id: BookId, session: Session) -> Result<(), TrackerError> {
        self.book_mut(id)?.record_session(session);
        Ok(())
    }

    /// Books matching the filter, newest first
    pub fn filter(&self, filter: &BookFilter) -> Vec<&Book> {
        let mut view: Vec<&Book> = self.books.iter().filter(|b| filter.admits(b)).collect();
        view.sort_by(|a, b| b.id.cmp(&a.id));
        view
    }

    /// Books that can be picked for a reading session, in library order
    pub fn reading_candidates(&self) -> Vec<&Book> {
        self.books.iter().filter(|b| !b.is_finished).collect()
    }

    pub fn stats(&self) -> LibraryStats {
        LibraryStats {
            total_books: self.books.len(),
            total_time: self.books.iter().map(|b| b.total_time).sum(),
            total_sessions: self.books.iter().map(|b| b.sessions.len()).sum(),
        }
    }

    /// Set one author on every selected book that still exists
    ///
    /// A selection with no surviving book is `EmptySelection`, as for
    /// `bulk_delete`. A blank author changes nothing. Returns the number of
    /// books changed.
    pub fn bulk_edit_author(&mut self, selection: &Selection, author: &str) -> Result<usize, TrackerError> {
        let mut targets: Vec<&mut Book> = self.books.iter_mut().filter(|b| selection.contains(b.id)).collect();
        if targets.is_empty() {
            return Err(TrackerError::EmptySelection);
        }
        let author = author.trim();
        if author.is_empty() {
            return Ok(0);
        }

        for book in targets.iter_mut() {
            book.author = author.to_string();
        }
        Ok(targets.len())
    }

    /// Delete every selected book after two confirmations
    ///
    /// Returns `Ok(None)` when declined, otherwise the number deleted.
    pub fn bulk_delete(
        &mut self,
        selection: &Selection,
        confirmer: &mut dyn Confirmer,
    ) -> Result<Option<usize>, TrackerError> {
        let targets: Vec<&Book> = self.books.iter().filter(|b| selection.contains(b.id)).collect();
        if targets.is_empty() {
            return Err(TrackerError::EmptySelection);
        }

        let count = targets.len();
        let total_time: u64 = targets.iter().map(|b| b.total_time).sum();
        let total_sessions: usize = targets.iter().map(|b| b.sessions.len()).sum();

        let first = format!(
            "Delete the selected books?\n\n  Books:    {}\n  Time:     {}\n  Sessions: {}\n\nThis cannot be undone.",
            count,
            format_hms(total_time),
            total_sessions,
        );
        if !confirmer.confirm(&first) {
            return Ok(None);
        }
        if !confirmer.confirm(&format!("Confirm deleting {} books permanently.", count)) {
            return Ok(None);
        }

        let ids: Vec<BookId> = selection.ids().collect();
        Ok(Some(self.remove(&ids)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::ScriptedConfirmer;
    use crate::types::StatusFilter;
    use chrono::{Duration, Local, Timelike};

    fn at(offset_ms: i64) -> DateTime<Utc> {
        let base: DateTime<Utc> = "2025-01-13T14:00:00Z".parse().unwrap();
        base + Duration::milliseconds(offset_ms)
    }

    fn sample() -> (Library, BookId, BookId, BookId) {
        let mut lib = Library::default();
        let dune = lib.add_book(NewBook::titled("Dune").by("Frank Herbert"), at(0)).unwrap();
        let emma = lib.add_book(NewBook::titled("Emma").by("Jane Austen"), at(1_000)).unwrap();
        let messiah = lib
            .add_book(NewBook::titled("Dune Messiah").by("Frank Herbert"), at(2_000))
            .unwrap();
        (lib, dune, emma, messiah)
    }

    #[test]
    fn test_add_book_defaults() {
        let mut lib = Library::default();
        let id = lib
            .add_book(NewBook::titled("  Dune  ").by(" Frank Herbert "), at(0))
            .unwrap();

        let book = lib.book(id).unwrap();
        assert_eq!(id, BookId(at(0).timestamp_millis() as u64));
        assert_eq!(book.title, "Dune");
        assert_eq!(book.author, "Frank Herbert");
        assert_eq!(book.total_time, 0);
        assert!(book.sessions.is_empty());
        assert!(!book.is_finished);
        assert_eq!(book.start_date_time, None);
    }

    #[test]
    fn test_add_book_rejects_empty_and_duplicate_titles() {
        let mut lib = Library::default();
        lib.add_book(NewBook::titled("Dune"), at(0)).unwrap();

        assert_eq!(lib.add_book(NewBook::titled("   "), at(1)), Err(TrackerError::EmptyTitle));
        assert_eq!(
            lib.add_book(NewBook::titled("dune"), at(2)),
            Err(TrackerError::DuplicateTitle("dune".to_string()))
        );
        assert_eq!(lib.len(), 1);
    }

    #[test]
    fn test_ids_unique_within_same_millisecond() {
        let mut lib = Library::default();
        let a = lib.add_book(NewBook::titled("A"), at(0)).unwrap();
        let b = lib.add_book(NewBook::titled("B"), at(0)).unwrap();
        assert_eq!(b.0, a.0 + 1);
    }

    #[test]
    fn test_start_date_defaults_to_midnight() {
        let mut lib = Library::default();
        let mut new = NewBook::titled("Dune");
        new.start_date = NaiveDate::from_ymd_opt(2025, 1, 2);
        new.start_time = None;
        let id = lib.add_book(new, at(0)).unwrap();

        let local = lib.book(id).unwrap().start_date_time.unwrap().with_timezone(&Local);
        assert_eq!(local.date_naive(), NaiveDate::from_ymd_opt(2025, 1, 2).unwrap());
        assert_eq!(local.hour(), 0);
        assert_eq!(local.minute(), 0);
    }

    #[test]
    fn test_edit_book() {
        let (mut lib, dune, emma, _) = sample();

        assert_eq!(
            lib.edit_book(emma, "DUNE", "x"),
            Err(TrackerError::DuplicateTitle("DUNE".to_string()))
        );
        assert_eq!(lib.edit_book(emma, "", "x"), Err(TrackerError::EmptyTitle));
        assert_eq!(lib.book(emma).unwrap().title, "Emma");

        // Re-casing its own title is fine
        lib.edit_book(dune, "DUNE", "F. Herbert").unwrap();
        let book = lib.book(dune).unwrap();
        assert_eq!(book.title, "DUNE");
        assert_eq!(book.author, "F. Herbert");

        assert_eq!(
            lib.edit_book(BookId(3), "Whatever", ""),
            Err(TrackerError::BookNotFound(BookId(3)))
        );
    }

    #[test]
    fn test_delete_requires_both_confirmations() {
        let test_cases = vec![
            (vec![false], false),
            (vec![true, false], false),
            (vec![true, true], true),
        ];

        for (answers, deleted) in test_cases {
            let (mut lib, dune, emma, messiah) = sample();
            let mut confirmer = ScriptedConfirmer::new(&answers);

            assert_eq!(lib.delete_book(emma, &mut confirmer), Ok(deleted));
            assert_eq!(lib.book(emma).is_none(), deleted, "answers {:?}", answers);
            assert!(lib.book(dune).is_some());
            assert!(lib.book(messiah).is_some());
            assert_eq!(lib.len(), if deleted { 2 } else { 3 });
        }
    }

    #[test]
    fn test_delete_prompt_describes_book() {
        let (mut lib, dune, _, _) = sample();
        let mut confirmer = ScriptedConfirmer::new(&[false]);
        lib.delete_book(dune, &mut confirmer).unwrap();
        assert!(confirmer.asked[0].contains("\"Dune\""));
        assert!(confirmer.asked[0].contains("Frank Herbert"));
        assert!(confirmer.asked[0].contains("00:00:00"));
    }

    #[test]
    fn test_finish_book() {
        let (mut lib, dune, _, _) = sample();
        let date = NaiveDate::from_ymd_opt(2025, 2, 1);
        let time = NaiveTime::from_hms_opt(22, 15, 0);

        assert_eq!(lib.finish_book(dune, date, None, None), Err(TrackerError::MissingFinishDate));
        assert_eq!(lib.finish_book(dune, None, time, None), Err(TrackerError::MissingFinishDate));
        assert!(!lib.book(dune).unwrap().is_finished);

        lib.finish_book(dune, date, time, Some("  loved it ")).unwrap();
        let book = lib.book(dune).unwrap();
        assert!(book.is_finished);
        assert_eq!(book.notes.as_deref(), Some("loved it"));
        let local = book.finish_date_time.unwrap().with_timezone(&Local);
        assert_eq!(local.hour(), 22);
        assert_eq!(local.minute(), 15);

        assert_eq!(
            lib.finish_book(dune, date, time, None),
            Err(TrackerError::AlreadyFinished("Dune".to_string()))
        );
    }

    #[test]
    fn test_blank_notes_stored_as_none() {
        let (mut lib, dune, _, _) = sample();
        lib.finish_book(
            dune,
            NaiveDate::from_ymd_opt(2025, 2, 1),
            NaiveTime::from_hms_opt(8, 0, 0),
            Some("   "),
        )
        .unwrap();
        assert_eq!(lib.book(dune).unwrap().notes, None);
    }

    #[test]
    fn test_filter_newest_first() {
        let (mut lib, dune, emma, messiah) = sample();
        lib.finish_book(
            messiah,
            NaiveDate::from_ymd_opt(2025, 2, 1),
            NaiveTime::from_hms_opt(8, 0, 0),
            None,
        )
        .unwrap();

        let ids = |view: Vec<&Book>| view.iter().map(|b| b.id).collect::<Vec<_>>();

        assert_eq!(ids(lib.filter(&BookFilter::default())), vec![messiah, emma, dune]);
        assert_eq!(
            ids(lib.filter(&BookFilter::new(Some("dune"), StatusFilter::Reading))),
            vec![dune]
        );
        assert_eq!(
            ids(lib.filter(&BookFilter::new(Some("HERBERT"), StatusFilter::All))),
            vec![messiah, dune]
        );
        assert_eq!(ids(lib.reading_candidates()), vec![dune, emma]);
    }

    #[test]
    fn test_stats() {
        let (mut lib, dune, emma, _) = sample();
        for (id, duration) in [(dune, 60_000u64), (dune, 30_000), (emma, 3_600_000)] {
            lib.record_session(
                id,
                Session {
                    date: at(10_000),
                    duration,
                    start_time: 0,
                    end_time: 0,
                },
            )
            .unwrap();
        }

        let stats = lib.stats();
        assert_eq!(stats.total_books, 3);
        assert_eq!(stats.total_time, 3_690_000);
        assert_eq!(stats.total_sessions, 3);
    }

    #[test]
    fn test_bulk_edit_author() {
        let (mut lib, dune, emma, messiah) = sample();
        let mut sel = Selection::new();
        sel.toggle_mode();

        assert_eq!(lib.bulk_edit_author(&sel, "Anon"), Err(TrackerError::EmptySelection));

        sel.set(dune, true);
        sel.set(emma, true);
        sel.set(BookId(42), true); // already gone
        assert_eq!(lib.bulk_edit_author(&sel, "  "), Ok(0));
        assert_eq!(lib.bulk_edit_author(&sel, " Anon "), Ok(2));

        assert_eq!(lib.book(dune).unwrap().author, "Anon");
        assert_eq!(lib.book(emma).unwrap().author, "Anon");
        assert_eq!(lib.book(messiah).unwrap().author, "Frank Herbert");

        // Only deleted ids left behind
        let mut stale = Selection::new();
        stale.toggle_mode();
        stale.set(BookId(42), true);
        assert_eq!(lib.bulk_edit_author(&stale, "Anon"), Err(TrackerError::EmptySelection));
        assert_eq!(lib.bulk_edit_author(&stale, "  "), Err(TrackerError::EmptySelection));
        let mut none = ScriptedConfirmer::new(&[]);
        assert_eq!(lib.bulk_delete(&stale, &mut none), Err(TrackerError::EmptySelection));
    }

    #[test]
    fn test_bulk_delete() {
        let (mut lib, dune, emma, messiah) = sample();
        let mut sel = Selection::new();
        sel.toggle_mode();
        sel.select_all(
            lib.filter(&BookFilter::new(Some("dune"), StatusFilter::All))
                .iter()
                .map(|b| b.id),
        );

        let mut declined = ScriptedConfirmer::new(&[true, false]);
        assert_eq!(lib.bulk_delete(&sel, &mut declined), Ok(None));
        assert_eq!(lib.len(), 3);
        assert!(declined.asked[0].contains("Books:    2"));

        let mut confirmed = ScriptedConfirmer::new(&[true, true]);
        assert_eq!(lib.bulk_delete(&sel, &mut confirmed), Ok(Some(2)));
        assert!(lib.book(dune).is_none());
        assert!(lib.book(messiah).is_none());
        assert!(lib.book(emma).is_some());

        assert_eq!(
            lib.bulk_delete(&sel, &mut confirmed),
            Err(TrackerError::EmptySelection),
            "Selection only names deleted books"
        );
    }
}
