//! The tick driver and the single-threaded cooperative concurrency model it
//! runs under.
//!
//! Two independent periodic callbacks drive the engine: a tick driver and an
//! update flusher, sharing one execution context with no locking — mutual
//! exclusion is structural, since only one callback runs at a time. This crate
//! has no event loop or timer service of its own to install callbacks into, so
//! [`Driver`] inverts that: it holds the due-time bookkeeping and the host
//! calls [`Driver::pump`] from whatever loop it already runs (a game-style
//! tick, an async interval, a test's manual stepping). Every call runs to
//! completion before returning, so two pumps can never interleave.

use std::time::{Duration, Instant};

use crate::engine::Engine;
use crate::message::UpdateMessage;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DriverMode {
    Stopped,
    Normal,
    Fast,
}

/// Wraps an [`Engine`], adding the wall-clock bookkeeping for two independent
/// periodic callbacks: the tick driver and the update flusher.
/// `start`/`startFast`/`stop` are mutually exclusive — installing one mode
/// always cancels whichever mode was running before.
pub struct Driver {
    engine: Engine,
    mode: DriverMode,
    last_tick_at: Option<Instant>,
    last_flush_at: Option<Instant>,
}

impl Driver {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine,
            mode: DriverMode::Stopped,
            last_tick_at: None,
            last_flush_at: None,
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    pub fn mode(&self) -> DriverMode {
        self.mode
    }

    /// Installs the normal tick driver, cancelling any other mode.
    pub fn start(&mut self) {
        tracing::debug!("driver: start (normal)");
        self.mode = DriverMode::Normal;
        self.last_tick_at = None;
    }

    /// Installs the fast (event-exhausting) tick driver, cancelling any other
    /// mode.
    pub fn start_fast(&mut self) {
        tracing::debug!("driver: start (fast)");
        self.mode = DriverMode::Fast;
        self.last_tick_at = None;
    }

    /// Cancels the current driver. In-flight drains (there are none, since
    /// `pump` never suspends mid-drain) would complete regardless.
    pub fn stop(&mut self) {
        tracing::debug!("driver: stop");
        self.mode = DriverMode::Stopped;
    }

    /// Drives one slice of wall-clock time: advances the tick driver if its
    /// interval has elapsed, then flushes the update batcher if its
    /// (independent) interval has elapsed. Returns the flushed message, if
    /// one was due.
    pub fn pump(&mut self, now: Instant) -> Option<UpdateMessage> {
        self.pump_ticks(now);
        self.pump_flush(now)
    }

    fn due(last: Option<Instant>, now: Instant, interval: Duration) -> bool {
        last.map_or(true, |t| now.duration_since(t) >= interval)
    }

    fn pump_ticks(&mut self, now: Instant) {
        match self.mode {
            DriverMode::Stopped => {}
            DriverMode::Normal => {
                if Self::due(self.last_tick_at, now, self.engine.config().normal_interval) {
                    self.engine.update_gates();
                    self.last_tick_at = Some(now);
                }
            }
            DriverMode::Fast => {
                // Fires every 10ms, then drains events for up to
                // `fast_burst_budget` of real elapsed time, not simulated time.
                if Self::due(self.last_tick_at, now, Duration::from_millis(10)) {
                    let budget = self.engine.config().fast_burst_budget;
                    let burst_start = Instant::now();
                    while self.engine.has_pending_events() {
                        if Instant::now().duration_since(burst_start) >= budget {
                            break;
                        }
                        if !self.engine.update_gates_next() {
                            break;
                        }
                    }
                    self.last_tick_at = Some(now);
                }
            }
        }
    }

    fn pump_flush(&mut self, now: Instant) -> Option<UpdateMessage> {
        if Self::due(self.last_flush_at, now, self.engine.config().flush_interval) {
            self.last_flush_at = Some(now);
            Some(self.engine.flush())
        } else {
            None
        }
    }

    #[cfg(feature = "serde")]
    pub fn dispatch_command(&mut self, command: crate::command::Command) -> Result<(), crate::error::EngineError> {
        use crate::command::Command;
        match command {
            Command::Start => {
                self.start();
                Ok(())
            }
            Command::StartFast => {
                self.start_fast();
                Ok(())
            }
            Command::Stop => {
                self.stop();
                Ok(())
            }
            other => self.engine.dispatch_command(other),
        }
    }
}
