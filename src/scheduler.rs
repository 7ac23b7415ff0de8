//! Periodic code refresh and countdown.
//!
//! A [`RefreshScheduler`] owns at most one tick task. Every second the task
//! derives the current time step, requests a code for it, and publishes the
//! result together with the countdown. Requests are tagged with their step
//! and tick number. A result is dropped if a later tick has moved to a new
//! step, or if a result from a later tick has already been published.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::Result;
use crate::secret::Secret;
use crate::totp::{time_step, Code, TimeStep, TotpEngine, PERIOD_SECS};
use crate::uri::OtpConfig;

const TICK: Duration = Duration::from_secs(1);

/// Shown before the first code arrives.
pub const PENDING_MARKER: &str = "------";
/// Shown for a tick whose computation failed.
pub const ERROR_MARKER: &str = "ERROR";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CodeState {
    #[default]
    Pending,
    Ready(Code),
    Error,
}

impl CodeState {
    pub fn code(&self) -> Option<&Code> {
        match self {
            CodeState::Ready(code) => Some(code),
            _ => None,
        }
    }
}

impl fmt::Display for CodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodeState::Pending => f.write_str(PENDING_MARKER),
            CodeState::Ready(code) => f.write_str(code.as_str()),
            CodeState::Error => f.write_str(ERROR_MARKER),
        }
    }
}

/// Seconds left in the current period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Countdown {
    /// In `1..=30`
    pub remaining_seconds: u64,
    /// `remaining_seconds / 30`, in `(0, 1]`
    pub fraction: f64,
}

impl Countdown {
    pub fn at(unix_millis: u64) -> Self {
        let remaining_seconds = PERIOD_SECS - (unix_millis / 1000) % PERIOD_SECS;
        Countdown {
            remaining_seconds,
            fraction: remaining_seconds as f64 / PERIOD_SECS as f64,
        }
    }
}

impl Default for Countdown {
    fn default() -> Self {
        Countdown {
            remaining_seconds: PERIOD_SECS,
            fraction: 1.0,
        }
    }
}

/// What a renderer should currently show.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DisplayState {
    pub code: CodeState,
    pub countdown: Countdown,
    /// Step the code belongs to; `None` until the first tick lands.
    pub step: Option<TimeStep>,
}

struct Timer {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

pub struct RefreshScheduler {
    engine: TotpEngine,
    clock: Arc<dyn Clock>,
    state: Arc<watch::Sender<DisplayState>>,
    timer: Option<Timer>,
}

impl RefreshScheduler {
    pub fn new(engine: TotpEngine, clock: impl Clock + 'static) -> Self {
        let (state, _) = watch::channel(DisplayState::default());
        RefreshScheduler {
            engine,
            clock: Arc::new(clock),
            state: Arc::new(state),
            timer: None,
        }
    }

    /// Begin refreshing codes for `config`, replacing any active refresh.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&mut self, config: &OtpConfig) {
        self.stop();

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(
            self.engine.clone(),
            Arc::clone(&self.clock),
            config.secret.clone(),
            Arc::clone(&self.state),
            cancel.clone(),
        ));

        info!(label = %config.label, issuer = %config.issuer, "refresh started");
        self.timer = Some(Timer { handle, cancel });
    }

    /// Halt refreshing. Results still in flight are discarded.
    pub fn stop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel.cancel();
            timer.handle.abort();
            info!("refresh stopped");
        }
        self.state.send_replace(DisplayState::default());
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    pub fn current(&self) -> DisplayState {
        self.state.borrow().clone()
    }

    pub fn current_code(&self) -> CodeState {
        self.state.borrow().code.clone()
    }

    /// Receiver notified on every published state.
    pub fn subscribe(&self) -> watch::Receiver<DisplayState> {
        self.state.subscribe()
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel.cancel();
            timer.handle.abort();
        }
    }
}

struct TickResult {
    seq: u64,
    step: TimeStep,
    countdown: Countdown,
    code: Result<Code>,
}

async fn compute_tick(engine: TotpEngine, secret: String, seq: u64, now: u64) -> TickResult {
    let code = match Secret::from_base32(&secret) {
        Ok(secret) => engine.compute_at(&secret, now).await,
        Err(e) => Err(e),
    };
    TickResult {
        seq,
        step: time_step(now),
        countdown: Countdown::at(now),
        code,
    }
}

async fn run(
    engine: TotpEngine,
    clock: Arc<dyn Clock>,
    secret: String,
    state: Arc<watch::Sender<DisplayState>>,
    cancel: CancellationToken,
) {
    let mut interval = time::interval(TICK);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut in_flight = FuturesUnordered::new();
    let mut latest_step: Option<TimeStep> = None;
    let mut ticks: u64 = 0;
    let mut last_applied: Option<u64> = None;

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            _ = interval.tick() => {
                let now = clock.now_millis();
                latest_step = Some(time_step(now));
                ticks += 1;
                in_flight.push(compute_tick(engine.clone(), secret.clone(), ticks, now));
            }

            Some(tick) = in_flight.next(), if !in_flight.is_empty() => {
                if Some(tick.step) != latest_step {
                    debug!(step = tick.step, latest = ?latest_step, "discarding stale code");
                    continue;
                }
                if last_applied.is_some_and(|applied| tick.seq <= applied) {
                    debug!(tick = tick.seq, applied = ?last_applied, "discarding overtaken tick");
                    continue;
                }
                last_applied = Some(tick.seq);

                let code = match tick.code {
                    Ok(code) => CodeState::Ready(code),
                    Err(e) => {
                        warn!(step = tick.step, "code refresh failed: {}", e);
                        CodeState::Error
                    }
                };

                state.send_replace(DisplayState {
                    code,
                    countdown: tick.countdown,
                    step: Some(tick.step),
                });
            }
        }
    }

    debug!(pending = in_flight.len(), "tick task finished");
}
