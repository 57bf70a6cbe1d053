use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Stopwatch refresh period
pub const STOPWATCH_TICK: Duration = Duration::from_millis(10);
/// Countdown and reading refresh period
pub const SECOND_TICK: Duration = Duration::from_secs(1);

/// Cancellable repeating task
///
/// Sends a copy of `event` down the channel once per period until cancelled,
/// dropped, or the receiver goes away. It only signals; whoever receives the
/// event reads the clock and updates state.
///
/// Cancelling does not wait for the worker thread, which exits after its
/// current sleep. A tick already in flight may still arrive, so receivers
/// must tolerate ticks for a widget that is no longer running.
pub struct Ticker {
    running: Arc<AtomicBool>,
}

impl Ticker {
    pub fn spawn<E>(period: Duration, tx: Sender<E>, event: E) -> Self
    where
        E: Clone + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let r = running.clone();

        thread::spawn(move || {
            while r.load(Ordering::SeqCst) {
                thread::sleep(period);
                if !r.load(Ordering::SeqCst) {
                    break;
                }
                if tx.send(event.clone()).is_err() {
                    break;
                }
            }
        });

        Self { running }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn cancel(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// At most one live ticker per widget
#[derive(Default)]
pub struct TickerSlot {
    ticker: Option<Ticker>,
}

impl TickerSlot {
    /// Start ticking unless already ticking
    pub fn ensure<E>(&mut self, period: Duration, tx: &Sender<E>, event: E)
    where
        E: Clone + Send + 'static,
    {
        if self.is_active() {
            return;
        }
        self.ticker = Some(Ticker::spawn(period, tx.clone(), event));
    }

    pub fn stop(&mut self) {
        if let Some(mut ticker) = self.ticker.take() {
            ticker.cancel();
        }
    }

    pub fn is_active(&self) -> bool {
        self.ticker.as_ref().map(|t| t.is_running()).unwrap_or(false)
    }
}
