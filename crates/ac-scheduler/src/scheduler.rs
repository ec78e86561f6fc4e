//! The change-coalescing commit scheduler.
//!
//! [`CommitScheduler`] is a single task that owns the pending [`ChangeSet`]
//! and both timers. Everything that can affect them arrives as a message and
//! is handled by one `select!` loop, so a flush and an event insertion can
//! never interleave.
//!
//! # State Machine
//!
//! ```text
//!            relevant event
//!   ┌──────┐ (arm max-wait, arm debounce) ┌──────────────┐
//!   │ Idle │ ───────────────────────────► │ Accumulating │ ◄─┐ relevant event
//!   └──────┘                              └──────────────┘ ──┘ (re-arm debounce)
//!      ▲                                         │
//!      └──────── debounce │ max-wait │ shutdown ─┘
//!                  (drain set, disarm both timers, flush)
//! ```
//!
//! # Loop Priorities
//!
//! The loop is biased: shutdown first, then max-wait, then debounce, then
//! events, then adapter errors. Adapter errors are only logged, at `warn`
//! when watching can continue and at `error` otherwise. When max-wait and a new event become ready at
//! the same instant, the batch is flushed first and the event starts the next
//! batch.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use ac_core::ScheduleConfig;
use ac_watcher::{ChangeEvent, FileFilter, WatchError};
use camino::Utf8PathBuf;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::changeset::{Batch, ChangeSet};
use crate::timer::{Timer, expire};

/// Why a batch was flushed. Used for logging only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushReason {
    /// No relevant change for one debounce interval.
    Debounce,
    /// The batch reached its maximum age.
    MaxWait {
        /// The configured bound.
        limit: Duration,
    },
    /// A shutdown was requested.
    Shutdown,
    /// The event source stopped delivering events.
    SourceClosed,
}

impl fmt::Display for FlushReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Debounce => f.write_str("debounce complete"),
            Self::MaxWait { limit } => write!(f, "max-wait reached ({}s)", limit.as_secs()),
            Self::Shutdown => f.write_str("flush on exit"),
            Self::SourceClosed => f.write_str("event source closed"),
        }
    }
}

/// Receives flushed batches.
///
/// The scheduler awaits each flush to completion before handling the next
/// message, so implementations never run concurrently with themselves.
pub trait Flush: Send {
    /// Handles one batch. Failures are the implementation's to report.
    fn flush(&mut self, batch: Batch, reason: FlushReason) -> impl Future<Output = ()> + Send;
}

/// The scheduling state, free of any I/O.
///
/// Idle means the change set is empty and both timers are disarmed.
#[derive(Debug)]
pub struct SchedulerState {
    pending: ChangeSet,
    debounce: Timer,
    max_wait: Option<Timer>,
}

impl SchedulerState {
    /// Creates an idle state. `max_wait` of `None` disables the bound.
    #[must_use]
    pub fn new(interval: Duration, max_wait: Option<Duration>) -> Self {
        Self {
            pending: ChangeSet::new(),
            debounce: Timer::new(interval),
            max_wait: max_wait.map(Timer::new),
        }
    }

    /// Creates an idle state from configuration.
    #[must_use]
    pub fn from_config(config: &ScheduleConfig) -> Self {
        Self::new(config.interval(), config.max_wait())
    }

    /// Records a relevant change observed at `now`.
    ///
    /// Re-arms the debounce timer. Arms the max-wait timer only when this
    /// change started a new batch. Returns `true` in that case.
    pub fn record(&mut self, path: Utf8PathBuf, now: Instant) -> bool {
        let started = self.pending.insert(path);
        if started {
            if let Some(max_wait) = &mut self.max_wait {
                max_wait.arm(now);
            }
        }
        self.debounce.arm(now);
        started
    }

    /// Drains the pending set and disarms both timers.
    pub fn take_batch(&mut self) -> Batch {
        self.debounce.disarm();
        if let Some(max_wait) = &mut self.max_wait {
            max_wait.disarm();
        }
        self.pending.drain()
    }

    /// Returns when the debounce timer fires, if armed.
    #[must_use]
    pub const fn debounce_deadline(&self) -> Option<Instant> {
        self.debounce.deadline()
    }

    /// Returns when the max-wait timer fires, if armed.
    #[must_use]
    pub fn max_wait_deadline(&self) -> Option<Instant> {
        self.max_wait.as_ref().and_then(Timer::deadline)
    }

    /// Returns the configured max-wait bound, if enabled.
    #[must_use]
    pub fn max_wait_limit(&self) -> Option<Duration> {
        self.max_wait.as_ref().map(Timer::duration)
    }

    /// Returns the pending changes.
    #[must_use]
    pub const fn pending(&self) -> &ChangeSet {
        &self.pending
    }

    /// Returns `true` when nothing is pending and no timer is armed.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
            && !self.debounce.is_armed()
            && !self.max_wait.as_ref().is_some_and(Timer::is_armed)
    }
}

/// Coalesces change events into flushes.
#[derive(Debug)]
pub struct CommitScheduler<F, S> {
    state: SchedulerState,
    filter: F,
    sink: S,
}

impl<F, S> CommitScheduler<F, S>
where
    F: FileFilter,
    S: Flush,
{
    /// Creates a scheduler that passes batches of files accepted by `filter`
    /// to `sink`.
    #[must_use]
    pub fn new(config: &ScheduleConfig, filter: F, sink: S) -> Self {
        Self {
            state: SchedulerState::from_config(config),
            filter,
            sink,
        }
    }

    /// Returns the scheduling state.
    #[must_use]
    pub const fn state(&self) -> &SchedulerState {
        &self.state
    }

    /// Runs the loop until `shutdown` is cancelled or the event channel
    /// closes. Either way, pending changes get one final flush.
    ///
    /// Returns the sink so callers can inspect it after the loop.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<ChangeEvent>,
        mut errors: mpsc::Receiver<WatchError>,
        shutdown: CancellationToken,
    ) -> S {
        let mut errors_open = true;
        info!(
            interval_secs = self.state.debounce.duration().as_secs(),
            max_wait_secs = self.state.max_wait_limit().map(|d| d.as_secs()),
            "Scheduler started"
        );

        loop {
            tokio::select! {
                biased;

                () = shutdown.cancelled() => {
                    events.close();
                    self.final_flush(FlushReason::Shutdown).await;
                    break;
                }

                () = expire(self.state.max_wait_deadline()) => {
                    let limit = self.state.max_wait_limit().unwrap_or_default();
                    self.flush_pending(FlushReason::MaxWait { limit }).await;
                }

                () = expire(self.state.debounce_deadline()) => {
                    self.flush_pending(FlushReason::Debounce).await;
                }

                event = events.recv() => match event {
                    Some(event) => self.accept(event),
                    None => {
                        warn!("Event source closed");
                        self.final_flush(FlushReason::SourceClosed).await;
                        break;
                    }
                },

                error = errors.recv(), if errors_open => match error {
                    Some(error) if error.is_recoverable() => warn!(error = %error, "Watcher error"),
                    Some(error) => tracing::error!(error = %error, "Watcher failed"),
                    None => {
                        debug!("Watcher error channel closed");
                        errors_open = false;
                    }
                },
            }
        }

        info!("Scheduler stopped");
        self.sink
    }

    fn accept(&mut self, event: ChangeEvent) {
        if !event.is_relevant() {
            trace!(path = %event.path, kind = ?event.kind, "Ignoring change kind");
            return;
        }
        if !self.filter.should_process(&event.path) {
            trace!(path = %event.path, "Ignoring filtered path");
            return;
        }

        debug!(path = %event.path, kind = ?event.kind, "Change recorded");
        if self.state.record(event.path, Instant::now()) {
            debug!("Batch started");
        }
    }

    /// Timer-driven flush; skips the sink when nothing is pending.
    async fn flush_pending(&mut self, reason: FlushReason) {
        let batch = self.state.take_batch();
        if batch.is_empty() {
            return;
        }
        self.sink.flush(batch, reason).await;
    }

    /// Terminal flush; the sink is called even for an empty batch.
    async fn final_flush(&mut self, reason: FlushReason) {
        let batch = self.state.take_batch();
        info!(reason = %reason, pending = batch.len(), "Final flush");
        self.sink.flush(batch, reason).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use ac_core::ExtensionSet;
    use ac_watcher::{ChangeKind, ExtensionFilter};
    use parking_lot::Mutex;
    use tokio::task::JoinHandle;
    use tokio::time::sleep;

    #[derive(Debug, Clone)]
    struct Flushed {
        at: Duration,
        reason: FlushReason,
        batch: Batch,
    }

    impl Flushed {
        fn names(&self) -> Vec<&str> {
            self.batch.file_names().collect()
        }
    }

    /// Records every flush with its offset from the recorder's creation,
    /// then takes `delay` to complete it.
    #[derive(Debug, Clone)]
    struct Recorder {
        start: Instant,
        delay: Duration,
        flushes: Arc<Mutex<Vec<Flushed>>>,
    }

    impl Recorder {
        fn new() -> Self {
            Self::slow(Duration::ZERO)
        }

        fn slow(delay: Duration) -> Self {
            Self {
                start: Instant::now(),
                delay,
                flushes: Arc::default(),
            }
        }

        fn flushes(&self) -> Vec<Flushed> {
            self.flushes.lock().clone()
        }

        fn non_empty(&self) -> Vec<Flushed> {
            self.flushes()
                .into_iter()
                .filter(|f| !f.batch.is_empty())
                .collect()
        }
    }

    impl Flush for Recorder {
        async fn flush(&mut self, batch: Batch, reason: FlushReason) {
            self.flushes.lock().push(Flushed {
                at: self.start.elapsed(),
                reason,
                batch,
            });
            if !self.delay.is_zero() {
                sleep(self.delay).await;
            }
        }
    }

    struct Harness {
        events: mpsc::Sender<ChangeEvent>,
        errors: mpsc::Sender<WatchError>,
        shutdown: CancellationToken,
        recorder: Recorder,
        handle: JoinHandle<Recorder>,
    }

    impl Harness {
        fn spawn(interval_secs: u64, max_wait_secs: i64) -> Self {
            Self::spawn_with(interval_secs, max_wait_secs, Recorder::new())
        }

        fn spawn_with(interval_secs: u64, max_wait_secs: i64, recorder: Recorder) -> Self {
            let config = ScheduleConfig {
                interval_secs,
                max_wait_secs,
            };
            let filter = ExtensionFilter::new(ExtensionSet::parse(".asp"));
            let scheduler = CommitScheduler::new(&config, filter, recorder.clone());

            let (events, event_rx) = mpsc::channel(64);
            let (errors, error_rx) = mpsc::channel(64);
            let shutdown = CancellationToken::new();
            let handle = tokio::spawn(scheduler.run(event_rx, error_rx, shutdown.clone()));

            Self {
                events,
                errors,
                shutdown,
                recorder,
                handle,
            }
        }

        async fn change(&self, name: &str, kind: ChangeKind) {
            let path = Utf8PathBuf::from(format!("/www/{name}"));
            self.events.send(ChangeEvent::new(path, kind)).await.unwrap();
        }

        async fn write(&self, name: &str) {
            self.change(name, ChangeKind::Write).await;
        }

        async fn stop(self) -> Recorder {
            self.shutdown.cancel();
            self.handle.await.unwrap()
        }
    }

    fn assert_near(actual: Duration, expected_secs: u64) {
        let expected = Duration::from_secs(expected_secs);
        assert!(
            actual >= expected && actual < expected + Duration::from_millis(100),
            "flushed at {actual:?}, expected about {expected:?}"
        );
    }

    #[test]
    fn test_record_arms_max_wait_once_per_batch() {
        let start = Instant::now();
        let mut state = SchedulerState::new(Duration::from_secs(2), Some(Duration::from_secs(5)));
        assert!(state.is_idle());

        assert!(state.record("/www/a.asp".into(), start));
        let later = start + Duration::from_secs(1);
        assert!(!state.record("/www/b.asp".into(), later));

        assert_eq!(state.max_wait_deadline(), Some(start + Duration::from_secs(5)));
        assert_eq!(state.debounce_deadline(), Some(later + Duration::from_secs(2)));
    }

    #[test]
    fn test_take_batch_returns_to_idle() {
        let now = Instant::now();
        let mut state = SchedulerState::new(Duration::from_secs(2), Some(Duration::from_secs(5)));
        state.record("/www/a.asp".into(), now);
        state.record("/www/a.asp".into(), now);

        let batch = state.take_batch();

        assert_eq!(batch.len(), 1);
        assert!(state.is_idle());
        assert!(state.debounce_deadline().is_none());
        assert!(state.max_wait_deadline().is_none());
    }

    #[test]
    fn test_max_wait_disabled() {
        let config = ScheduleConfig {
            interval_secs: 2,
            max_wait_secs: -1,
        };
        let mut state = SchedulerState::from_config(&config);

        state.record("/www/a.asp".into(), Instant::now());

        assert!(state.max_wait_deadline().is_none());
        assert!(state.max_wait_limit().is_none());
        assert!(state.debounce_deadline().is_some());
    }

    #[test]
    fn test_huge_bounds_do_not_overflow() {
        let config = ScheduleConfig {
            interval_secs: u64::MAX,
            max_wait_secs: i64::MAX,
        };
        let now = Instant::now();
        let mut state = SchedulerState::from_config(&config);

        assert!(state.record("/www/a.asp".into(), now));

        assert!(state.debounce_deadline().is_some_and(|d| d > now));
        assert!(state.max_wait_deadline().is_some_and(|d| d > now));
    }

    #[test]
    fn test_flush_reason_display() {
        assert_eq!(FlushReason::Debounce.to_string(), "debounce complete");
        assert_eq!(
            FlushReason::MaxWait {
                limit: Duration::from_secs(900)
            }
            .to_string(),
            "max-wait reached (900s)"
        );
        assert_eq!(FlushReason::Shutdown.to_string(), "flush on exit");
        assert_eq!(FlushReason::SourceClosed.to_string(), "event source closed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_coalesces_into_one_flush() {
        let harness = Harness::spawn(2, 100);

        harness.write("a.asp").await;
        sleep(Duration::from_secs(1)).await;
        harness.write("b.asp").await;
        sleep(Duration::from_secs(10)).await;

        let recorder = harness.stop().await;
        let flushed = recorder.non_empty();
        assert_eq!(flushed.len(), 1);
        assert_eq!(flushed[0].reason, FlushReason::Debounce);
        assert_eq!(flushed[0].names(), ["a.asp", "b.asp"]);
        assert_near(flushed[0].at, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sustained_activity_flushes_at_max_wait() {
        let harness = Harness::spawn(2, 5);

        for i in 0..=20 {
            harness.write(&format!("c{i}.asp")).await;
            sleep(Duration::from_secs(1)).await;
        }

        let recorder = harness.stop().await;
        let flushed = recorder.non_empty();
        let first = &flushed[0];
        assert_eq!(
            first.reason,
            FlushReason::MaxWait {
                limit: Duration::from_secs(5)
            }
        );
        assert_near(first.at, 5);
        for i in 0..5 {
            assert!(first.names().contains(&format!("c{i}.asp").as_str()));
        }
        assert!(!first.names().contains(&"c6.asp"));

        // The next event started a new batch rather than being lost.
        assert!(flushed.len() > 1);
        assert!(flushed[1].names().contains(&"c6.asp"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_flushes_pending_once() {
        let harness = Harness::spawn(2, 100);

        harness.write("d.asp").await;
        sleep(Duration::from_millis(100)).await;

        let recorder = harness.stop().await;
        let flushed = recorder.flushes();
        assert_eq!(flushed.len(), 1);
        assert_eq!(flushed[0].reason, FlushReason::Shutdown);
        assert_eq!(flushed[0].names(), ["d.asp"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_flushes_even_when_idle() {
        let harness = Harness::spawn(2, 100);

        let recorder = harness.stop().await;
        let flushed = recorder.flushes();
        assert_eq!(flushed.len(), 1);
        assert!(flushed[0].batch.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_source_closed_flushes_pending() {
        let Harness {
            events,
            errors: _errors,
            shutdown: _shutdown,
            recorder,
            handle,
        } = Harness::spawn(2, 100);

        events
            .send(ChangeEvent::new("/www/e.asp".into(), ChangeKind::Create))
            .await
            .unwrap();
        drop(events);
        handle.await.unwrap();

        let flushed = recorder.flushes();
        assert_eq!(flushed.len(), 1);
        assert_eq!(flushed[0].reason, FlushReason::SourceClosed);
        assert_eq!(flushed[0].names(), ["e.asp"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicates_collapse() {
        let harness = Harness::spawn(2, 100);

        for _ in 0..5 {
            harness.write("a.asp").await;
        }
        harness.change("a.asp", ChangeKind::Rename).await;
        sleep(Duration::from_secs(5)).await;

        let recorder = harness.stop().await;
        let flushed = recorder.non_empty();
        assert_eq!(flushed.len(), 1);
        assert_eq!(flushed[0].names(), ["a.asp"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_irrelevant_changes_are_ignored() {
        let harness = Harness::spawn(2, 100);

        harness.change("gone.asp", ChangeKind::Remove).await;
        harness.write("site.css").await;
        harness.write("README").await;
        sleep(Duration::from_secs(10)).await;

        let recorder = harness.stop().await;
        assert!(recorder.non_empty().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_uppercase_extension_is_relevant() {
        let harness = Harness::spawn(2, 100);

        harness.write("Default.ASP").await;
        sleep(Duration::from_secs(5)).await;

        let recorder = harness.stop().await;
        assert_eq!(recorder.non_empty()[0].names(), ["Default.ASP"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_watcher_errors_do_not_stop_loop() {
        let harness = Harness::spawn(2, 100);

        harness.errors.send(WatchError::NonUtf8Path("/www/\u{fffd}.asp".into())).await.unwrap();
        harness.errors.send(WatchError::LoopFailed).await.unwrap();
        harness.write("a.asp").await;
        sleep(Duration::from_secs(5)).await;

        let recorder = harness.stop().await;
        assert_eq!(recorder.non_empty().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_error_channel_does_not_stop_loop() {
        let Harness {
            events,
            errors,
            shutdown,
            recorder,
            handle,
        } = Harness::spawn(2, 100);

        drop(errors);
        events
            .send(ChangeEvent::new("/www/a.asp".into(), ChangeKind::Write))
            .await
            .unwrap();
        sleep(Duration::from_secs(5)).await;
        shutdown.cancel();
        handle.await.unwrap();

        let flushed = recorder.non_empty();
        assert_eq!(flushed.len(), 1);
        assert_eq!(flushed[0].reason, FlushReason::Debounce);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_flush_while_debounce_keeps_moving_without_max_wait() {
        let harness = Harness::spawn(2, 0);

        for i in 0..10 {
            harness.write(&format!("f{i}.asp")).await;
            sleep(Duration::from_secs(1)).await;
        }
        assert!(harness.recorder.non_empty().is_empty());

        sleep(Duration::from_secs(5)).await;
        let recorder = harness.stop().await;
        let flushed = recorder.non_empty();
        assert_eq!(flushed.len(), 1);
        assert_eq!(flushed[0].batch.len(), 10);
        assert_near(flushed[0].at, 11);
    }

    #[tokio::test(start_paused = true)]
    async fn test_event_during_flush_starts_next_batch() {
        // Flushes take 3s; a.asp flushes at 2s and completes at 5s.
        let harness = Harness::spawn_with(2, 5, Recorder::slow(Duration::from_secs(3)));

        harness.write("a.asp").await;
        sleep(Duration::from_secs(3)).await;
        // Sent while the first flush is still running.
        harness.write("b.asp").await;
        sleep(Duration::from_secs(3)).await;
        for name in ["c.asp", "d.asp", "e.asp", "f.asp"] {
            harness.write(name).await;
            sleep(Duration::from_secs(1)).await;
        }
        sleep(Duration::from_secs(2)).await;

        let recorder = harness.stop().await;
        let flushed = recorder.non_empty();
        assert_eq!(flushed.len(), 2);

        assert_eq!(flushed[0].reason, FlushReason::Debounce);
        assert_near(flushed[0].at, 2);
        assert_eq!(flushed[0].names(), ["a.asp"]);

        // b.asp was taken in at 5s, once the first flush returned, and its
        // batch hit max-wait 5s later.
        assert_eq!(
            flushed[1].reason,
            FlushReason::MaxWait {
                limit: Duration::from_secs(5)
            }
        );
        assert_near(flushed[1].at, 10);
        assert_eq!(flushed[1].names(), ["b.asp", "c.asp", "d.asp", "e.asp", "f.asp"]);
    }
}
