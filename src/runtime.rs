use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CtEvent, KeyEvent, MouseEvent};

use crate::error::{ClassifierError, WordSourceError};
use crate::round::RoundId;

/// Unified event type consumed by the app runner
#[derive(Debug)]
pub enum GameEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Resize(u16, u16),
    /// Nothing arrived within the frame interval
    Idle,
    Tick {
        round: RoundId,
    },
    WordFetched {
        round: RoundId,
        result: Result<String, WordSourceError>,
    },
    PredictionDone {
        round: RoundId,
        result: Result<String, ClassifierError>,
    },
    AdvanceDue {
        round: RoundId,
    },
}

/// Source of game events (terminal input, clock ticks, async completions)
pub trait GameEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<GameEvent, RecvTimeoutError>;
}

/// Production event source: one channel fed by the terminal reader thread,
/// the round clock and the worker threads
pub struct ChannelEventSource {
    rx: Receiver<GameEvent>,
}

impl ChannelEventSource {
    pub fn channel() -> (Self, Sender<GameEvent>) {
        let (tx, rx) = mpsc::channel();
        (Self { rx }, tx)
    }
}

impl GameEventSource for ChannelEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<GameEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Forwards crossterm key, mouse and resize events into the game channel
pub fn spawn_terminal_reader(tx: Sender<GameEvent>) {
    thread::spawn(move || loop {
        let evt = match event::read() {
            Ok(CtEvent::Key(key)) => GameEvent::Key(key),
            Ok(CtEvent::Mouse(mouse)) => GameEvent::Mouse(mouse),
            Ok(CtEvent::Resize(w, h)) => GameEvent::Resize(w, h),
            Ok(_) => continue,
            Err(err) => {
                tracing::error!(%err, "terminal input closed");
                break;
            }
        };
        if tx.send(evt).is_err() {
            break;
        }
    });
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Runner that advances the application one event at a time
pub struct Runner<E: GameEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: GameEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// Blocks up to one frame interval and returns the next event, or Idle on timeout
    pub fn step(&self) -> GameEvent {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => GameEvent::Idle,
        }
    }
}

/// Per-round countdown clock.
///
/// Sends `Tick { round }` on a fixed schedule measured from start, so a slow
/// consumer never shifts later ticks. Stops on `cancel`, on drop, or when the
/// receiver is gone.
#[derive(Debug)]
pub struct Clock {
    round: RoundId,
    cancelled: Arc<AtomicBool>,
}

impl Clock {
    pub fn start(tx: Sender<GameEvent>, interval: Duration, round: RoundId) -> Self {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);

        thread::spawn(move || {
            let mut deadline = Instant::now() + interval;
            loop {
                thread::sleep(deadline.saturating_duration_since(Instant::now()));
                if flag.load(Ordering::SeqCst) {
                    break;
                }
                if tx.send(GameEvent::Tick { round }).is_err() {
                    break;
                }
                deadline += interval;
            }
        });

        Self { round, cancelled }
    }

    pub fn round(&self) -> RoundId {
        self.round
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

impl Drop for Clock {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Posts `AdvanceDue` once `after` has elapsed
pub fn schedule_advance(tx: Sender<GameEvent>, round: RoundId, after: Duration) {
    thread::spawn(move || {
        thread::sleep(after);
        let _ = tx.send(GameEvent::AdvanceDue { round });
    });
}
