//! Poll loop.
//!
//! `ChatWatcher` owns a message source, the seen-set, the listener registry
//! and an optional end-of-cycle callback. Each tick lists the source, keeps
//! the messages not seen before (marking them in the same step), dispatches
//! them in source order and then runs the callback.
//!
//! Ticks run on one dedicated worker thread driven by a crossbeam ticker, so
//! two ticks never overlap. `stop` only prevents future ticks; a tick in
//! progress runs to completion. Delivery is at-most-once: a message whose
//! extraction or responses fail is still marked seen. A panicking response
//! fails its tick like any other error.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, select, tick, Receiver, Sender};
use tracing::{debug, error, info, warn};

use crate::config::WatcherConfig;
use crate::detail::MessageDetail;
use crate::error::{ChatError, ChatResult, ResponseError};
use crate::fragment::ChatMessage;
use crate::listener::{ListenerId, Registry};
use crate::source::{MessageSource, SeenSet};
use crate::trigger::{Trigger, TriggerSpec};

/// Outcome of one poll cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    /// When the cycle started.
    pub started_at: DateTime<Utc>,
    /// Messages taken from the source and dispatched.
    pub messages: usize,
    /// Responses invoked across all messages.
    pub responses: usize,
}

type LoopCallback = Box<dyn FnMut(&TickReport) + Send>;

struct WatcherState<S> {
    source: S,
    seen: SeenSet,
    registry: Registry,
    each_loop: Option<LoopCallback>,
}

impl<S: MessageSource> WatcherState<S> {
    fn tick(&mut self) -> ChatResult<TickReport> {
        let started_at = Utc::now();
        let visible = self.source.visible()?;
        let fresh = self.seen.take_unseen(visible);

        let mut report = TickReport {
            started_at,
            messages: 0,
            responses: 0,
        };
        for message in &fresh {
            report.messages += 1;
            report.responses += self.registry.dispatch(message)?;
        }

        if let Some(callback) = self.each_loop.as_mut() {
            callback(&report);
        }
        Ok(report)
    }
}

struct Worker {
    stop_tx: Sender<()>,
    join: JoinHandle<()>,
}

/// Periodically polls a `MessageSource` and dispatches new messages.
pub struct ChatWatcher<S: MessageSource + 'static> {
    state: Arc<Mutex<WatcherState<S>>>,
    interval: Duration,
    worker: Option<Worker>,
    failed_ticks: Arc<AtomicU64>,
}

// Seen ids are marked before any response runs, so the state stays usable
// after a panic unwound through it.
fn lock_state<S>(state: &Mutex<WatcherState<S>>) -> MutexGuard<'_, WatcherState<S>> {
    state.lock().unwrap_or_else(|poisoned| {
        warn!("recovering watcher state after a panic");
        let guard = poisoned.into_inner();
        state.clear_poison();
        guard
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

fn run_tick<S: MessageSource>(state: &Mutex<WatcherState<S>>) -> ChatResult<TickReport> {
    let mut guard = lock_state(state);
    panic::catch_unwind(AssertUnwindSafe(|| guard.tick())).unwrap_or_else(|payload| {
        Err(ChatError::internal(format!(
            "tick panicked: {}",
            panic_message(&*payload)
        )))
    })
}

fn check_interval(interval: Duration) -> ChatResult<()> {
    if interval.is_zero() {
        return Err(ChatError::config("tick interval must be greater than zero"));
    }
    Ok(())
}

impl<S: MessageSource + 'static> ChatWatcher<S> {
    /// Default time between ticks.
    pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(1000);

    /// Creates a stopped watcher with the default tick interval.
    pub fn new(source: S) -> Self {
        Self {
            state: Arc::new(Mutex::new(WatcherState {
                source,
                seen: SeenSet::new(),
                registry: Registry::new(),
                each_loop: None,
            })),
            interval: Self::DEFAULT_TICK_INTERVAL,
            worker: None,
            failed_ticks: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Creates a stopped watcher using the tick interval from `config`.
    pub fn from_config(source: S, config: &WatcherConfig) -> ChatResult<Self> {
        config.validate()?;
        let mut watcher = Self::new(source);
        watcher.interval = config.tick_interval();
        Ok(watcher)
    }

    /// Registers a listener. Returns `None` when the trigger is `NoMessages`.
    pub fn add_listener<F>(&self, trigger: Trigger, response: F) -> ChatResult<Option<ListenerId>>
    where
        F: Fn(&MessageDetail, &ChatMessage) -> Result<(), ResponseError> + Send + Sync + 'static,
    {
        Ok(lock_state(&self.state).registry.register(trigger, response))
    }

    /// Registers a named listener.
    pub fn add_named_listener<F>(
        &self,
        name: impl Into<String>,
        trigger: Trigger,
        response: F,
    ) -> ChatResult<Option<ListenerId>>
    where
        F: Fn(&MessageDetail, &ChatMessage) -> Result<(), ResponseError> + Send + Sync + 'static,
    {
        Ok(lock_state(&self.state).registry.register_named(name, trigger, response))
    }

    /// Compiles `spec` and registers it.
    pub fn add_spec_listener<F>(&self, spec: &TriggerSpec, response: F) -> ChatResult<Option<ListenerId>>
    where
        F: Fn(&MessageDetail, &ChatMessage) -> Result<(), ResponseError> + Send + Sync + 'static,
    {
        lock_state(&self.state).registry.register_spec(spec, response)
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> ChatResult<usize> {
        Ok(lock_state(&self.state).registry.len())
    }

    /// Number of distinct messages handed to dispatch so far.
    pub fn seen_count(&self) -> ChatResult<usize> {
        Ok(lock_state(&self.state).seen.len())
    }

    /// Sets the callback run at the end of every successful cycle.
    pub fn set_each_loop_callback<F>(&self, callback: F) -> ChatResult<()>
    where
        F: FnMut(&TickReport) + Send + 'static,
    {
        lock_state(&self.state).each_loop = Some(Box::new(callback));
        Ok(())
    }

    /// Runs one cycle on the calling thread. A panicking response is
    /// reported as `ChatError::Internal`.
    pub fn poll_once(&self) -> ChatResult<TickReport> {
        run_tick(&self.state)
    }

    /// Current time between ticks.
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        self.interval
    }

    /// True while the background worker is alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.join.is_finished())
    }

    /// Ticks run in the background whose cycle failed.
    #[must_use]
    pub fn failed_ticks(&self) -> u64 {
        self.failed_ticks.load(Ordering::Relaxed)
    }

    /// Starts ticking in the background.
    ///
    /// Returns `Ok(false)` without starting when already running, or when no
    /// listener is registered yet. In the latter case listeners added later
    /// do not start the loop; call `start` again.
    pub fn start(&mut self) -> ChatResult<bool> {
        if self.is_running() {
            return Ok(false);
        }
        if lock_state(&self.state).registry.is_empty() {
            debug!("not starting watcher: no listeners registered");
            return Ok(false);
        }
        // Reap a worker that exited on its own.
        self.stop();

        let (stop_tx, stop_rx) = bounded::<()>(1);
        let state = Arc::clone(&self.state);
        let failed_ticks = Arc::clone(&self.failed_ticks);
        let interval = self.interval;
        let join = thread::Builder::new()
            .name("chatreact-watcher".to_string())
            .spawn(move || worker_loop(state, interval, stop_rx, failed_ticks))
            .map_err(|e| ChatError::internal(format!("failed to spawn watcher worker: {e}")))?;

        self.worker = Some(Worker { stop_tx, join });
        info!(interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX), "watcher started");
        Ok(true)
    }

    /// Stops future ticks and waits for a tick in progress to finish.
    /// Returns true if a worker was running.
    pub fn stop(&mut self) -> bool {
        let Some(worker) = self.worker.take() else {
            return false;
        };
        let _ = worker.stop_tx.send(());
        if worker.join.join().is_err() {
            error!("watcher worker panicked");
        }
        info!("watcher stopped");
        true
    }

    /// Changes the tick interval, restarting the loop if it is running.
    pub fn set_tick_interval(&mut self, interval: Duration) -> ChatResult<()> {
        check_interval(interval)?;
        self.interval = interval;
        if self.is_running() {
            self.stop();
            self.start()?;
        }
        Ok(())
    }
}

impl<S: MessageSource + 'static> Drop for ChatWatcher<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop<S: MessageSource>(
    state: Arc<Mutex<WatcherState<S>>>,
    interval: Duration,
    stop_rx: Receiver<()>,
    failed_ticks: Arc<AtomicU64>,
) {
    let ticker = tick(interval);
    loop {
        select! {
            // A message or a dropped sender both mean stop.
            recv(stop_rx) -> _ => break,
            recv(ticker) -> _ => {
                match run_tick(&state) {
                    Ok(report) if report.messages > 0 => {
                        debug!(messages = report.messages, responses = report.responses, "tick dispatched");
                    }
                    Ok(_) => {}
                    Err(err) => {
                        failed_ticks.fetch_add(1, Ordering::Relaxed);
                        error!(error = %err, "watcher tick failed");
                    }
                }
            }
        }
    }
}
