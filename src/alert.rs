use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;
use std::thread;
use std::time::Duration;

use crate::display::colors;

const ALARM_BURSTS: usize = 3;
const ALARM_GAP: Duration = Duration::from_millis(600);
const FLASH_FRAMES: usize = 6;
const FLASH_GAP: Duration = Duration::from_millis(200);

/// Best-effort user alerts. Implementations never fail the caller.
pub trait Notifier {
    fn notify(&mut self, title: &str, body: &str);
    fn alarm(&mut self);
    fn flash(&mut self, display: &str);
}

/// Alerts rendered on the terminal's stderr
#[derive(Debug, Clone)]
pub struct TerminalNotifier {
    notifications: bool,
    alarm: bool,
}

impl TerminalNotifier {
    pub fn new(notifications: bool, alarm: bool) -> Self {
        Self { notifications, alarm }
    }
}

impl Notifier for TerminalNotifier {
    fn notify(&mut self, title: &str, body: &str) {
        if !self.notifications {
            return;
        }
        if let Err(e) = writeln!(
            io::stderr(),
            "\n{}{}{}: {}",
            colors::YELLOW,
            title,
            colors::RESET,
            body
        ) {
            tracing::debug!("notification failed: {}", e);
        }
    }

    fn alarm(&mut self) {
        if !self.alarm {
            return;
        }
        // Bells ring in the background so the flash runs alongside them
        let spawned = thread::Builder::new().name("alarm".into()).spawn(|| {
            for burst in 0..ALARM_BURSTS {
                if burst > 0 {
                    thread::sleep(ALARM_GAP);
                }
                let mut err = io::stderr();
                if let Err(e) = err.write_all(b"\x07").and_then(|_| err.flush()) {
                    tracing::debug!("alarm failed: {}", e);
                    break;
                }
            }
        });
        if let Err(e) = spawned {
            tracing::debug!("could not start alarm thread: {}", e);
        }
    }

    fn flash(&mut self, display: &str) {
        let mut out = io::stdout();
        for frame in 0..FLASH_FRAMES {
            let style = if frame % 2 == 0 { colors::REVERSE } else { colors::RESET };
            if let Err(e) = write!(out, "\r{}{}{}", style, display, colors::RESET).and_then(|_| out.flush()) {
                tracing::debug!("flash failed: {}", e);
                return;
            }
            thread::sleep(FLASH_GAP);
        }
    }
}

/// What a `RecordingNotifier` saw
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Alert {
    Notification { title: String, body: String },
    Alarm,
    Flash(String),
}

/// Keeps alerts in memory; clones share the same log
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    log: Rc<RefCell<Vec<Alert>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.log.borrow().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&mut self, title: &str, body: &str) {
        self.log.borrow_mut().push(Alert::Notification {
            title: title.to_string(),
            body: body.to_string(),
        });
    }

    fn alarm(&mut self) {
        self.log.borrow_mut().push(Alert::Alarm);
    }

    fn flash(&mut self, display: &str) {
        self.log.borrow_mut().push(Alert::Flash(display.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_notifier_shares_log() {
        let recorder = RecordingNotifier::new();
        let mut boxed: Box<dyn Notifier> = Box::new(recorder.clone());

        boxed.alarm();
        boxed.notify("Timer", "Time's up!");
        boxed.flash("00:00");

        assert_eq!(
            recorder.alerts(),
            vec![
                Alert::Alarm,
                Alert::Notification {
                    title: "Timer".to_string(),
                    body: "Time's up!".to_string()
                },
                Alert::Flash("00:00".to_string()),
            ]
        );
    }

    #[test]
    fn test_disabled_terminal_notifier_is_silent() {
        // Nothing to observe beyond not panicking or blocking
        let mut notifier = TerminalNotifier::new(false, false);
        notifier.notify("Timer", "done");
        notifier.alarm();
    }
}
