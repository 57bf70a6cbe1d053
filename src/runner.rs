//! Interactive terminal loops for the three widgets.
//!
//! Each loop blocks on one event channel. Ticker threads, the stdin reader
//! and the Ctrl-C handler only post events; all state changes happen here on
//! the calling thread.

use std::io::{self, BufRead, Write};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread;

use anyhow::{Context, Result};

use crate::app::App;
use crate::countdown::{CountdownPause, CountdownTick, DurationInput};
use crate::display::{colors, format_countdown, format_countdown_colored, format_hms, format_stopwatch, progress_bar};
use crate::reading::{FinishOutcome, ReadingState};
use crate::scheduler::{TickerSlot, SECOND_TICK, STOPWATCH_TICK};
use crate::types::BookId;

const PROGRESS_WIDTH: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Widget {
    Stopwatch,
    Countdown,
    Reading,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Tick(Widget),
    Input(String),
    InputClosed,
    Interrupt,
}

/// The loop's inbox
pub struct Events {
    tx: Sender<Event>,
    rx: Receiver<Event>,
}

impl Default for Events {
    fn default() -> Self {
        let (tx, rx) = channel();
        Self { tx, rx }
    }
}

impl Events {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sender(&self) -> Sender<Event> {
        self.tx.clone()
    }

    /// Feed stdin lines and Ctrl-C into the channel
    ///
    /// The Ctrl-C handler can only be installed once per process.
    pub fn attach_terminal(&self) -> Result<()> {
        let tx = self.tx.clone();
        ctrlc::set_handler(move || {
            let _ = tx.send(Event::Interrupt);
        })
        .context("Error setting Ctrl-C handler")?;

        let tx = self.tx.clone();
        thread::Builder::new()
            .name("stdin".into())
            .spawn(move || {
                for line in io::stdin().lock().lines() {
                    match line {
                        Ok(line) => {
                            if tx.send(Event::Input(line)).is_err() {
                                return;
                            }
                        }
                        Err(e) => {
                            tracing::debug!("stdin read failed: {}", e);
                            break;
                        }
                    }
                }
                let _ = tx.send(Event::InputClosed);
            })
            .context("Failed to start the input reader")?;
        Ok(())
    }

    fn next(&self) -> Event {
        // We hold a sender ourselves, so this only fails if that changes
        self.rx.recv().unwrap_or(Event::InputClosed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopwatchCommand {
    StartPause,
    Lap,
    Reset,
    Quit,
}

impl StopwatchCommand {
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_lowercase().as_str() {
            "" | "s" => Some(Self::StartPause),
            "l" => Some(Self::Lap),
            "r" => Some(Self::Reset),
            "q" => Some(Self::Quit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownCommand {
    StartPause,
    Reset,
    /// `set H M S`
    Set(DurationInput),
    Quit,
}

impl CountdownCommand {
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim().to_lowercase();
        let mut words = line.split_whitespace();
        match words.next() {
            None | Some("s") => Some(Self::StartPause),
            Some("r") => Some(Self::Reset),
            Some("q") => Some(Self::Quit),
            Some("set") => {
                let h = words.next().unwrap_or("");
                let m = words.next().unwrap_or("");
                let s = words.next().unwrap_or("");
                Some(Self::Set(DurationInput::parse(h, m, s)))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadingCommand {
    PauseResume,
    Finish,
    Discard,
    Quit,
}

impl ReadingCommand {
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_lowercase().as_str() {
            "p" | "" => Some(Self::PauseResume),
            "f" => Some(Self::Finish),
            "d" => Some(Self::Discard),
            "q" => Some(Self::Quit),
            _ => None,
        }
    }
}

fn redraw(out: &mut dyn Write, line: &str) -> Result<()> {
    write!(out, "\r\x1B[2K{}", line)?;
    out.flush()?;
    Ok(())
}

fn message(out: &mut dyn Write, text: &str) -> Result<()> {
    writeln!(out, "\r\x1B[2K{}", text)?;
    Ok(())
}

fn paused_suffix(running: bool) -> String {
    if running {
        String::new()
    } else {
        format!("  {}(paused){}", colors::DIM, colors::RESET)
    }
}

fn stopwatch_line(app: &App) -> String {
    let sw = app.stopwatch();
    format!("{}{}", format_stopwatch(sw.elapsed()), paused_suffix(sw.is_running()))
}

/// Run the stopwatch until quit
pub fn run_stopwatch(app: &mut App, events: &Events, out: &mut dyn Write) -> Result<()> {
    let tx = events.sender();
    let mut ticker = TickerSlot::default();
    message(out, "enter: start/pause   l: lap   r: reset   q: quit")?;
    redraw(out, &stopwatch_line(app))?;

    loop {
        match events.next() {
            Event::Tick(Widget::Stopwatch) => {
                app.stopwatch_tick();
            }
            Event::Tick(_) => continue,
            Event::Input(line) => match StopwatchCommand::parse(&line) {
                Some(StopwatchCommand::StartPause) => {
                    if app.stopwatch().is_running() {
                        app.stopwatch_pause();
                        ticker.stop();
                    } else {
                        app.stopwatch_start();
                        ticker.ensure(STOPWATCH_TICK, &tx, Event::Tick(Widget::Stopwatch));
                    }
                }
                Some(StopwatchCommand::Lap) => {
                    if let Some(lap) = app.stopwatch_lap() {
                        message(out, &format!("Lap {:<3} {}", lap.number, format_stopwatch(lap.time)))?;
                    }
                }
                Some(StopwatchCommand::Reset) => {
                    ticker.stop();
                    app.stopwatch_reset();
                }
                Some(StopwatchCommand::Quit) => break,
                None => message(out, &format!("Unknown command: {}", line.trim()))?,
            },
            Event::InputClosed | Event::Interrupt => break,
        }
        redraw(out, &stopwatch_line(app))?;
    }

    ticker.stop();
    app.stopwatch_pause();
    message(out, &format!("\nStopped at {}", format_stopwatch(app.stopwatch().elapsed())))?;
    Ok(())
}

fn countdown_line(app: &App) -> String {
    let cd = app.countdown();
    format!(
        "{}  {}{}",
        format_countdown_colored(cd.display_ms(), cd.is_warning()),
        progress_bar(cd.progress(), PROGRESS_WIDTH),
        paused_suffix(cd.is_running() || cd.remaining() == 0)
    )
}

fn times_up(out: &mut dyn Write) -> Result<()> {
    redraw(out, &format_countdown(0))?;
    message(out, "")?;
    message(out, "Time's up!")
}

/// Run the countdown until quit, starting from `input`
pub fn run_countdown(app: &mut App, input: DurationInput, events: &Events, out: &mut dyn Write) -> Result<()> {
    let tx = events.sender();
    let mut ticker = TickerSlot::default();
    app.countdown_configure(input);
    message(out, "enter: start/pause   r: reset   set H M S: duration   q: quit")?;
    redraw(out, &countdown_line(app))?;

    loop {
        match events.next() {
            Event::Tick(Widget::Countdown) => {
                if app.countdown_tick() == CountdownTick::Finished {
                    ticker.stop();
                    times_up(out)?;
                    continue;
                }
            }
            Event::Tick(_) => continue,
            Event::Input(line) => match CountdownCommand::parse(&line) {
                Some(CountdownCommand::StartPause) => {
                    if app.countdown().is_running() {
                        ticker.stop();
                        if app.countdown_pause() == CountdownPause::Finished {
                            times_up(out)?;
                            continue;
                        }
                    } else {
                        match app.countdown_start() {
                            Ok(_) => ticker.ensure(SECOND_TICK, &tx, Event::Tick(Widget::Countdown)),
                            Err(e) => message(out, &e.to_string())?,
                        }
                    }
                }
                Some(CountdownCommand::Reset) => {
                    ticker.stop();
                    app.countdown_reset();
                }
                Some(CountdownCommand::Set(input)) => {
                    if !app.countdown_configure(input) {
                        message(out, "Pause the countdown before changing its duration")?;
                    }
                }
                Some(CountdownCommand::Quit) => break,
                None => message(out, &format!("Unknown command: {}", line.trim()))?,
            },
            Event::InputClosed | Event::Interrupt => break,
        }
        redraw(out, &countdown_line(app))?;
    }

    ticker.stop();
    message(out, "")?;
    Ok(())
}

fn reading_line(app: &App, id: BookId) -> String {
    let title = app.library().book(id).map(|b| b.title.as_str()).unwrap_or("?");
    let suffix = match app.reading().state() {
        ReadingState::Active { .. } => String::new(),
        ReadingState::Paused { .. } => paused_suffix(false),
        ReadingState::Idle => format!("  {}(no session){}", colors::DIM, colors::RESET),
    };
    format!(
        "{}{}{}  {}{}",
        colors::CYAN,
        title,
        colors::RESET,
        format_hms(app.reading_time()),
        suffix
    )
}

fn report_finish(app: &mut App, out: &mut dyn Write) -> Result<()> {
    match app.finish_reading() {
        Ok(FinishOutcome::Recorded { session, .. }) => {
            message(out, &format!("Saved session of {}", format_hms(session.duration)))
        }
        Ok(FinishOutcome::TooShort { .. }) => {
            message(out, "Session too short to save (more than 5 seconds needed)")
        }
        Err(e) => message(out, &format!("{:#}", e)),
    }
}

/// Track a reading session on `id` until quit. Quitting saves the session.
pub fn run_reading(app: &mut App, id: BookId, events: &Events, out: &mut dyn Write) -> Result<()> {
    let tx = events.sender();
    let mut ticker = TickerSlot::default();
    app.start_reading(id)?;
    ticker.ensure(SECOND_TICK, &tx, Event::Tick(Widget::Reading));
    message(out, "p: pause/resume   f: finish   d: discard   q: finish and quit")?;
    redraw(out, &reading_line(app, id))?;

    loop {
        match events.next() {
            Event::Tick(Widget::Reading) => {}
            Event::Tick(_) => continue,
            Event::Input(line) => match ReadingCommand::parse(&line) {
                Some(ReadingCommand::PauseResume) => {
                    if app.reading().is_running() {
                        app.pause_reading();
                        ticker.stop();
                    } else {
                        match app.start_reading(id) {
                            Ok(_) => ticker.ensure(SECOND_TICK, &tx, Event::Tick(Widget::Reading)),
                            Err(e) => message(out, &format!("{:#}", e))?,
                        }
                    }
                }
                Some(ReadingCommand::Finish) => {
                    ticker.stop();
                    report_finish(app, out)?;
                }
                Some(ReadingCommand::Discard) => {
                    ticker.stop();
                    if app.discard_reading().is_some() {
                        message(out, "Session discarded")?;
                    }
                }
                Some(ReadingCommand::Quit) => break,
                None => message(out, &format!("Unknown command: {}", line.trim()))?,
            },
            Event::InputClosed | Event::Interrupt => break,
        }
        redraw(out, &reading_line(app, id))?;
    }

    ticker.stop();
    message(out, "")?;
    if app.reading().current_book().is_some() {
        report_finish(app, out)?;
    }
    Ok(())
}
