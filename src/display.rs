use chrono::{DateTime, Local, Utc};

use crate::selection::Selection;
use crate::types::{Book, Lap, LibraryStats};

/// ANSI color constants for terminal output
pub mod colors {
    pub const CYAN: &str = "\x1B[36m";
    pub const GREEN: &str = "\x1B[32m";
    pub const YELLOW: &str = "\x1B[33m";
    pub const RED: &str = "\x1B[31m";
    pub const BLUE: &str = "\x1B[34m";
    pub const DIM: &str = "\x1B[2m";
    pub const REVERSE: &str = "\x1B[7m";
    pub const RESET: &str = "\x1B[0m";
}

/// Get the terminal width in columns, defaulting to 80 if detection fails
pub fn get_terminal_width() -> u16 {
    #[cfg(unix)]
    {
        use libc::{ioctl, isatty, winsize, STDOUT_FILENO, TIOCGWINSZ};
        use std::mem;

        if unsafe { isatty(STDOUT_FILENO) } == 0 {
            return 80;
        }

        let mut size: winsize = unsafe { mem::zeroed() };

        if unsafe { ioctl(STDOUT_FILENO, TIOCGWINSZ, &mut size) } == 0 && size.ws_col > 0 {
            size.ws_col
        } else {
            80
        }
    }

    #[cfg(not(unix))]
    {
        80
    }
}

fn split_hms(ms: u64) -> (u64, u64, u64) {
    let total_seconds = ms / 1_000;
    (total_seconds / 3_600, (total_seconds % 3_600) / 60, total_seconds % 60)
}

/// Always `HH:MM:SS`; used for reading and library times
pub fn format_hms(ms: u64) -> String {
    let (h, m, s) = split_hms(ms);
    format!("{:02}:{:02}:{:02}", h, m, s)
}

/// `HH:MM:SS` from one hour on, `MM:SS:CC` (centiseconds) below
pub fn format_stopwatch(ms: u64) -> String {
    let (h, m, s) = split_hms(ms);
    if h > 0 {
        format!("{:02}:{:02}:{:02}", h, m, s)
    } else {
        format!("{:02}:{:02}:{:02}", m, s, (ms % 1_000) / 10)
    }
}

/// `HH:MM:SS` from one hour on, `MM:SS` below
pub fn format_countdown(ms: u64) -> String {
    let (h, m, s) = split_hms(ms);
    if h > 0 {
        format!("{:02}:{:02}:{:02}", h, m, s)
    } else {
        format!("{:02}:{:02}", m, s)
    }
}

/// Session length as `m:ss`, used when a session is saved
pub fn format_minutes_seconds(ms: u64) -> String {
    let minutes = ms / 60_000;
    let seconds = (ms % 60_000) / 1_000;
    format!("{}:{:02}", minutes, seconds)
}

/// Format a timestamp as local date and time (e.g., "2025-01-13 14:05")
pub fn format_local(timestamp: DateTime<Utc>) -> String {
    let local_time: DateTime<Local> = timestamp.with_timezone(&Local);
    local_time.format("%Y-%m-%d %H:%M").to_string()
}

/// Countdown text, red while in the warning window
pub fn format_countdown_colored(ms: u64, warning: bool) -> String {
    let text = format_countdown(ms);
    if warning {
        format!("{}{}{}", colors::RED, text, colors::RESET)
    } else {
        text
    }
}

/// Text progress bar for a fraction in `0.0..=1.0`
pub fn progress_bar(fraction: Option<f64>, width: usize) -> String {
    let fraction = fraction.unwrap_or(0.0).clamp(0.0, 1.0);
    let filled = (width as f64 * fraction).round() as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

fn status_badge(book: &Book) -> String {
    if book.is_finished {
        format!("{}finished{}", colors::GREEN, colors::RESET)
    } else {
        format!("{}reading{}", colors::BLUE, colors::RESET)
    }
}

/// Render one library row
///
/// The title is truncated so the time and session columns stay right-aligned
/// to the terminal width.
pub fn book_row(book: &Book, selection: Option<&Selection>, terminal_width: usize) -> String {
    let marker = match selection {
        Some(sel) if sel.is_active() => {
            if sel.contains(book.id) {
                "[x] "
            } else {
                "[ ] "
            }
        }
        _ => "",
    };

    let name = if book.author.is_empty() {
        book.title.clone()
    } else {
        format!("{} by {}", book.title, book.author)
    };
    let id_str = format!("{} ", book.id);
    let right = format!(
        "{}  {:>3} sessions  ",
        format_hms(book.total_time),
        book.sessions.len()
    );
    // "finished" is the longer badge; keep the column width stable
    let badge_len = "finished".len();

    let min_spacing = 2;
    let fixed = marker.len() + id_str.len() + right.len() + badge_len + min_spacing;
    let max_name_len = terminal_width.saturating_sub(fixed);

    let name = if name.chars().count() > max_name_len && max_name_len > 3 {
        let cut: String = name.chars().take(max_name_len - 3).collect();
        format!("{}...", cut)
    } else {
        name
    };

    let used = fixed + name.chars().count();
    let padding = " ".repeat(terminal_width.saturating_sub(used) + min_spacing);

    format!(
        "{}{}{}{}{}{}{}{}",
        marker,
        colors::DIM,
        id_str,
        colors::RESET,
        name,
        padding,
        right,
        status_badge(book)
    )
}

/// Lines of the library view, with selection markers and a count while
/// selecting
pub fn book_list_lines(books: &[&Book], selection: Option<&Selection>, terminal_width: usize) -> Vec<String> {
    if books.is_empty() {
        return vec!["No books match the current filter".to_string()];
    }

    let mut lines: Vec<String> = books
        .iter()
        .map(|book| book_row(book, selection, terminal_width))
        .collect();
    if let Some(sel) = selection.filter(|s| s.is_active()) {
        lines.push(String::new());
        lines.push(format!("{} selected", sel.len()));
    }
    lines
}

/// Print the filtered library view
pub fn display_book_list(books: &[&Book], selection: Option<&Selection>) {
    let terminal_width = get_terminal_width() as usize;
    for line in book_list_lines(books, selection, terminal_width) {
        println!("{}", line);
    }
}

/// Print one book with its reading period and session history
pub fn display_book_details(book: &Book) {
    println!("{}{}{}", colors::CYAN, book.title, colors::RESET);
    let terminal_width = get_terminal_width() as usize;
    let separator = "─".repeat(terminal_width.min(80));
    println!("{}{}{}", colors::DIM, separator, colors::RESET);

    println!(
        "Author:     {}",
        if book.author.is_empty() { "(none)" } else { book.author.as_str() }
    );
    println!("Total time: {}", format_hms(book.total_time));
    println!("Sessions:   {}", book.sessions.len());
    if let Some(start) = book.start_date_time {
        println!("Started:    {}", format_local(start));
    }
    match (book.is_finished, book.finish_date_time) {
        (true, Some(finished)) => {
            println!("Finished:   {}", format_local(finished));
            if let Some(notes) = &book.notes {
                println!("Notes:      {}", notes);
            }
        }
        _ => println!("Status:     {}", status_badge(book)),
    }

    println!();
    if book.sessions.is_empty() {
        println!("No reading sessions yet");
        return;
    }
    for (number, session) in book.sessions_newest_first() {
        println!(
            "  #{:<3} {}  {}",
            number,
            format_local(session.date),
            format_hms(session.duration)
        );
    }
}

pub fn display_stats(stats: &LibraryStats) {
    println!("Books:    {}", stats.total_books);
    println!("Hours:    {}", stats.total_time / 3_600_000);
    println!("Sessions: {}", stats.total_sessions);
}

pub fn display_laps(laps: &[Lap]) {
    // Newest lap on top
    for lap in laps.iter().rev() {
        println!("  Lap {:<3} {}", lap.number, format_stopwatch(lap.time));
    }
}
