use std::path::Path;
use std::rc::Rc;

use booktimer::alert::{Alert, RecordingNotifier};
use booktimer::clock::ManualClock;
use booktimer::countdown::{CountdownPause, CountdownTick, DurationInput};
use booktimer::prompt::ScriptedConfirmer;
use booktimer::reading::FinishOutcome;
use booktimer::store::BookStore;
use booktimer::{App, BookFilter, NewBook, StatusFilter, TrackerError};
use tempfile::TempDir;

struct Fixture {
    app: App,
    clock: Rc<ManualClock>,
    alerts: RecordingNotifier,
    dir: TempDir,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().expect("temp dir");
    let clock = Rc::new(ManualClock::new("2025-01-21T18:00:00Z".parse().unwrap()));
    let alerts = RecordingNotifier::new();
    let app = App::open(
        BookStore::in_dir(dir.path()),
        Box::new(clock.clone()),
        Box::new(alerts.clone()),
    )
    .expect("open app");
    Fixture {
        app,
        clock,
        alerts,
        dir,
    }
}

fn import_sample(f: &mut Fixture) {
    let mut yes = ScriptedConfirmer::new(&[true]);
    let count = f
        .app
        .import(Path::new("test_data/library_export.json"), &mut yes)
        .expect("Failed to import library_export.json");
    assert_eq!(count, Some(3));
}

#[test]
fn test_stopwatch_only_advances_while_running() {
    let mut f = fixture();
    let mut last = f.app.stopwatch_tick();

    f.clock.advance(500);
    assert_eq!(f.app.stopwatch_tick(), 0, "Idle stopwatch must not move");

    f.app.stopwatch_start();
    for step in [10, 10, 250, 3_600_000] {
        f.clock.advance(step);
        let elapsed = f.app.stopwatch_tick();
        assert!(elapsed >= last);
        last = elapsed;
    }
    assert_eq!(last, 3_600_270);

    f.app.stopwatch_pause();
    f.clock.advance(10_000);
    assert_eq!(f.app.stopwatch_tick(), last, "Paused stopwatch must not move");
}

#[test]
fn test_laps_only_while_running() {
    let mut f = fixture();
    assert_eq!(f.app.stopwatch_lap(), None);
    assert!(f.app.stopwatch().laps().is_empty());

    f.app.stopwatch_start();
    f.clock.advance(1_500);
    let first = f.app.stopwatch_lap().expect("lap while running");
    f.clock.advance(1_500);
    let second = f.app.stopwatch_lap().expect("lap while running");
    assert_eq!((first.number, first.time), (1, 1_500));
    assert_eq!((second.number, second.time), (2, 3_000));

    f.app.stopwatch_pause();
    assert_eq!(f.app.stopwatch_lap(), None);
    assert_eq!(f.app.stopwatch().laps().len(), 2);
}

#[test]
fn test_countdown_finishes_exactly_once() {
    let mut f = fixture();
    f.app.countdown_configure(DurationInput::parse("0", "0", "12"));
    assert_eq!(f.app.countdown_start(), Ok(true));

    let mut finishes = 0;
    let mut warned = false;
    for _ in 0..20 {
        f.clock.advance(1_000);
        match f.app.countdown_tick() {
            CountdownTick::Finished => finishes += 1,
            CountdownTick::Running { warning, .. } => warned |= warning,
            CountdownTick::Idle => {}
        }
        assert!(f.app.countdown().remaining() <= 12_000);
    }

    assert_eq!(finishes, 1);
    assert!(warned, "Last ten seconds are a warning");
    assert_eq!(f.app.countdown().remaining(), 0);
    assert!(!f.app.countdown().inputs_locked());
    assert_eq!(
        f.alerts.alerts().iter().filter(|a| **a == Alert::Alarm).count(),
        1
    );
}

#[test]
fn test_pause_past_zero_still_finishes_once() {
    let mut f = fixture();
    f.app.countdown_configure(DurationInput::parse("0", "0", "3"));
    assert_eq!(f.app.countdown_start(), Ok(true));

    f.clock.advance(2_000);
    assert!(matches!(f.app.countdown_tick(), CountdownTick::Running { .. }));

    // Zero passes between ticks and the pause lands first
    f.clock.advance(1_400);
    assert_eq!(f.app.countdown_pause(), CountdownPause::Finished);
    assert_eq!(f.app.countdown().remaining(), 0);
    assert!(!f.app.countdown().is_running());

    let mut finishes = 0;
    for _ in 0..5 {
        f.clock.advance(1_000);
        if f.app.countdown_tick() == CountdownTick::Finished {
            finishes += 1;
        }
    }
    assert_eq!(finishes, 0, "The pause already finished the run");
    assert_eq!(f.app.countdown_pause(), CountdownPause::NotRunning);

    let alerts = f.alerts.alerts();
    assert_eq!(alerts.iter().filter(|a| **a == Alert::Alarm).count(), 1);
    assert_eq!(
        alerts.iter().filter(|a| matches!(a, Alert::Notification { .. })).count(),
        1
    );
    assert!(alerts.contains(&Alert::Flash("00:00".to_string())));
}

#[test]
fn test_zero_countdown_is_rejected() {
    let mut f = fixture();
    f.app.countdown_configure(DurationInput::parse("", "x", "0"));
    assert_eq!(f.app.countdown_start(), Err(TrackerError::ZeroDuration));
    assert!(!f.app.countdown().is_running());
}

#[test]
fn test_session_threshold() {
    let test_cases = vec![(5_000u64, false), (5_999, false), (6_000, true), (754_321, true)];

    for (reading_ms, recorded) in test_cases {
        let mut f = fixture();
        let id = f.app.add_book(NewBook::titled("Dune")).unwrap();
        f.app.start_reading(id).unwrap();
        f.clock.advance(reading_ms);

        let outcome = f.app.finish_reading().unwrap();
        let book = f.app.library().book(id).unwrap();
        let floored = reading_ms / 1_000 * 1_000;

        if recorded {
            assert!(matches!(outcome, FinishOutcome::Recorded { .. }), "{} ms", reading_ms);
            assert_eq!(book.total_time, floored);
            assert_eq!(book.sessions.len(), 1);
        } else {
            assert!(matches!(outcome, FinishOutcome::TooShort { .. }), "{} ms", reading_ms);
            assert_eq!(book.total_time, 0);
            assert!(book.sessions.is_empty());
        }
    }
}

#[test]
fn test_total_time_accumulates_across_sessions() {
    let mut f = fixture();
    let id = f.app.add_book(NewBook::titled("Dune")).unwrap();

    for minutes in [10u64, 25, 5] {
        f.app.start_reading(id).unwrap();
        f.clock.advance(minutes * 30_000);
        f.app.pause_reading();
        f.clock.advance(60_000); // paused time does not count
        f.app.start_reading(id).unwrap();
        f.clock.advance(minutes * 30_000);
        f.app.finish_reading().unwrap();
    }

    let book = f.app.library().book(id).unwrap();
    assert_eq!(book.total_time, 40 * 60_000);
    assert_eq!(book.total_time, book.sessions.iter().map(|s| s.duration).sum::<u64>());
}

#[test]
fn test_duplicate_title_rejected() {
    let mut f = fixture();
    f.app.add_book(NewBook::titled("Dune")).unwrap();
    let err = f.app.add_book(NewBook::titled("dune")).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<TrackerError>(),
        Some(TrackerError::DuplicateTitle(_))
    ));
    assert_eq!(f.app.library().len(), 1);
}

#[test]
fn test_delete_needs_both_confirmations() {
    let mut f = fixture();
    import_sample(&mut f);
    let target = f.app.library().books()[2].id;

    let mut once = ScriptedConfirmer::new(&[true, false]);
    assert!(!f.app.delete_book(target, &mut once).unwrap());
    assert_eq!(f.app.library().len(), 3);

    let mut twice = ScriptedConfirmer::new(&[true, true]);
    assert!(f.app.delete_book(target, &mut twice).unwrap());
    assert_eq!(f.app.library().len(), 2);
    assert!(f.app.library().book(target).is_none());
}

#[test]
fn test_export_import_preserves_content() {
    let mut f = fixture();
    import_sample(&mut f);
    let before: Vec<_> = f.app.library().books().to_vec();

    let export_path = f.dir.path().join("books.json");
    f.app.export(&export_path).unwrap();

    f.clock.advance(5_000);
    let mut yes = ScriptedConfirmer::new(&[true]);
    assert_eq!(f.app.import(&export_path, &mut yes).unwrap(), Some(3));

    let after = f.app.library().books();
    assert_eq!(after.len(), before.len());
    for (old, new) in before.iter().zip(after) {
        assert_ne!(old.id, new.id);
        assert_eq!(old.title, new.title);
        assert_eq!(old.author, new.author);
        assert_eq!(old.total_time, new.total_time);
        assert_eq!(old.sessions, new.sessions);
    }
}

#[test]
fn test_import_persists_to_store() {
    let mut f = fixture();
    import_sample(&mut f);

    let reloaded = BookStore::in_dir(f.dir.path()).load().unwrap();
    assert_eq!(reloaded.len(), 3);
    assert_eq!(reloaded[1].notes.as_deref(), Some("Shorter than the first one"));
    assert!(reloaded[1].is_finished);
}

#[test]
fn test_invalid_imports_rejected() {
    for fixture_file in ["test_data/no_books_array.json", "test_data/truncated.json"] {
        let mut f = fixture();
        f.app.add_book(NewBook::titled("Keep me")).unwrap();

        let mut yes = ScriptedConfirmer::new(&[true]);
        let err = f.app.import(Path::new(fixture_file), &mut yes).unwrap_err();
        assert!(
            matches!(err.downcast_ref::<TrackerError>(), Some(TrackerError::InvalidImport(_))),
            "{} gave {:#}",
            fixture_file,
            err
        );
        assert_eq!(f.app.library().len(), 1);
    }
}

#[test]
fn test_filter_reading_books_by_search() {
    let mut f = fixture();
    import_sample(&mut f);

    f.app.set_filter(BookFilter::new(Some("dune"), StatusFilter::Reading));
    let view = f.app.view();
    assert_eq!(view.len(), 1);
    assert_eq!(view[0].title, "Dune");

    f.app.set_filter(BookFilter::new(Some("HERBERT"), StatusFilter::All));
    assert_eq!(f.app.view().len(), 2);

    f.app.set_filter(BookFilter::new(Some("austen"), StatusFilter::Finished));
    assert!(f.app.view().is_empty());
}

#[test]
fn test_stats_after_import() {
    let mut f = fixture();
    import_sample(&mut f);
    let stats = f.app.stats();
    assert_eq!(stats.total_books, 3);
    assert_eq!(stats.total_time, 5_110_000);
    assert_eq!(stats.total_sessions, 3);
}
