//! Periodic guide refresh and cleanup.
//!
//! # How It Works
//!
//! 1. The scheduler runs as a background task
//! 2. On start it refreshes once, then every `refresh_interval_secs`
//! 3. Every `cleanup_interval_secs` stale events are pruned from the store
//! 4. After each refresh, timer links are recomputed if a timer source is set
//! 5. Each cycle's [`RefreshReport`] is sent over an mpsc channel
//!
//! Backend calls are synchronous and run on the blocking thread pool.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{debug, error, info, warn};
use thiserror::Error;
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::time::interval;

use crate::source::{EpgSource, TimerSource};
use crate::store::{CycleKind, RefreshReport, StoreHandle};

/// Capacity of the report channel.
const REPORT_CHANNEL_CAPACITY: usize = 16;

/// Refresh scheduler configuration.
#[derive(Debug, Clone)]
pub struct RefreshSchedulerConfig {
    /// Interval between refresh cycles (seconds).
    pub refresh_interval_secs: u64,
    /// Interval between cleanup cycles (seconds).
    pub cleanup_interval_secs: u64,
}

impl Default for RefreshSchedulerConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 300, // Every 5 minutes
            cleanup_interval_secs: 600, // Every 10 minutes
        }
    }
}

/// Refresh scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Scheduler is running.
    Running,
    /// Scheduler is paused.
    Paused,
    /// Scheduler is stopped.
    Stopped,
}

/// Scheduler errors.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The blocking refresh task panicked or was cancelled.
    #[error("Refresh task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Scheduler was stopped.
    #[error("Scheduler stopped")]
    Stopped,
}

/// Background worker driving refresh and cleanup cycles.
pub struct RefreshScheduler {
    /// Store to refresh.
    store: StoreHandle,
    /// Program data backend.
    source: Arc<dyn EpgSource>,
    /// Timer list used to relink events after a refresh.
    timers: Option<Arc<dyn TimerSource>>,
    /// Configuration.
    config: RefreshSchedulerConfig,
    /// Current state.
    state: Arc<Mutex<SchedulerState>>,
    /// Wakes the run loop on stop.
    shutdown: Notify,
    /// Cycle reports.
    reports: mpsc::Sender<RefreshReport>,
}

impl RefreshScheduler {
    /// Create a scheduler and the receiving end of its report channel.
    pub fn new(
        store: StoreHandle,
        source: Arc<dyn EpgSource>,
        config: RefreshSchedulerConfig,
    ) -> (Self, mpsc::Receiver<RefreshReport>) {
        let (reports, rx) = mpsc::channel(REPORT_CHANNEL_CAPACITY);
        let scheduler = Self {
            store,
            source,
            timers: None,
            config,
            state: Arc::new(Mutex::new(SchedulerState::Running)),
            shutdown: Notify::new(),
            reports,
        };
        (scheduler, rx)
    }

    /// Relink timers from this source after every refresh.
    pub fn with_timers(mut self, timers: Arc<dyn TimerSource>) -> Self {
        self.timers = Some(timers);
        self
    }

    /// Start the scheduler as a background task.
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(&self) {
        info!(
            "RefreshScheduler: Starting with refresh every {}s, cleanup every {}s",
            self.config.refresh_interval_secs, self.config.cleanup_interval_secs
        );

        // The first tick of each interval completes immediately.
        let mut refresh_interval =
            interval(Duration::from_secs(self.config.refresh_interval_secs.max(1)));
        let mut cleanup_interval =
            interval(Duration::from_secs(self.config.cleanup_interval_secs.max(1)));

        loop {
            let kind = tokio::select! {
                _ = refresh_interval.tick() => CycleKind::Refresh,
                _ = cleanup_interval.tick() => CycleKind::Cleanup,
                _ = self.shutdown.notified() => {
                    info!("RefreshScheduler: Stopped");
                    break;
                }
            };

            let state = *self.state.lock().await;
            match state {
                SchedulerState::Stopped => {
                    info!("RefreshScheduler: Stopped");
                    break;
                }
                SchedulerState::Paused => {
                    debug!("RefreshScheduler: Paused, skipping {:?}", kind);
                    continue;
                }
                SchedulerState::Running => {}
            }

            let result = match kind {
                CycleKind::Refresh => self.run_refresh().await,
                CycleKind::Cleanup => self.run_cleanup().await,
            };
            if let Err(e) = result {
                error!("RefreshScheduler: {:?} cycle failed: {}", kind, e);
            }
        }
    }

    /// Run one refresh cycle off the async runtime and publish its report.
    async fn run_refresh(&self) -> Result<RefreshReport, SchedulerError> {
        let store = Arc::clone(&self.store);
        let source = Arc::clone(&self.source);
        let timers = self.timers.clone();

        let report = tokio::task::spawn_blocking(move || {
            let report = store.refresh_cycle(source.as_ref(), Utc::now());
            if let Some(timers) = timers {
                store.relink_timers(&timers.timers());
            }
            report
        })
        .await?;

        self.publish(report.clone());
        Ok(report)
    }

    async fn run_cleanup(&self) -> Result<RefreshReport, SchedulerError> {
        let store = Arc::clone(&self.store);
        let removed = tokio::task::spawn_blocking(move || store.cleanup(Utc::now())).await?;

        let report = RefreshReport {
            kind: CycleKind::Cleanup,
            removed,
            ..Default::default()
        };
        self.publish(report.clone());
        Ok(report)
    }

    fn publish(&self, report: RefreshReport) {
        if let Err(e) = self.reports.try_send(report) {
            warn!("RefreshScheduler: Dropping cycle report: {}", e);
        }
    }

    /// Pause the scheduler.
    pub async fn pause(&self) {
        let mut state = self.state.lock().await;
        if *state == SchedulerState::Running {
            *state = SchedulerState::Paused;
            info!("RefreshScheduler: Paused");
        }
    }

    /// Resume the scheduler.
    pub async fn resume(&self) {
        let mut state = self.state.lock().await;
        if *state == SchedulerState::Paused {
            *state = SchedulerState::Running;
            info!("RefreshScheduler: Resumed");
        }
    }

    /// Stop the scheduler.
    pub async fn stop(&self) {
        let mut state = self.state.lock().await;
        *state = SchedulerState::Stopped;
        self.shutdown.notify_one();
        info!("RefreshScheduler: Stop requested");
    }

    /// Get current state.
    pub async fn state(&self) -> SchedulerState {
        *self.state.lock().await
    }

    /// Trigger a refresh outside the schedule.
    pub async fn trigger_refresh(&self) -> Result<RefreshReport, SchedulerError> {
        if self.state().await == SchedulerState::Stopped {
            return Err(SchedulerError::Stopped);
        }
        info!("RefreshScheduler: Manual refresh triggered");
        self.run_refresh().await
    }

    /// Trigger a cleanup outside the schedule.
    pub async fn trigger_cleanup(&self) -> Result<RefreshReport, SchedulerError> {
        if self.state().await == SchedulerState::Stopped {
            return Err(SchedulerError::Stopped);
        }
        self.run_cleanup().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::ChannelList;
    use crate::store::EpgStore;
    use chrono::{DateTime, Duration as ChronoDuration};
    use tvguide_types::{Channel, ChannelId, FetchError, ProgramRecord, Timer, TimerId};

    /// Serves one program running now on backend channel 11; everything else fails.
    struct NowSource;

    impl EpgSource for NowSource {
        fn fetch_epg(
            &self,
            channel_number: u32,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> Result<Vec<ProgramRecord>, FetchError> {
            if channel_number != 11 {
                return Err(FetchError::NoSuchChannel(channel_number));
            }
            let now = Utc::now();
            let start = now - ChronoDuration::minutes(10);
            Ok(vec![ProgramRecord::new(start, now + ChronoDuration::minutes(50), "Live")
                .with_broadcast_id(1)])
        }
    }

    struct OneTimer;

    impl TimerSource for OneTimer {
        fn timers(&self) -> Vec<Timer> {
            let now = Utc::now();
            vec![Timer::new(3, 1, now - ChronoDuration::minutes(5), now + ChronoDuration::minutes(5))]
        }
    }

    fn store() -> StoreHandle {
        let store = EpgStore::default();
        store.set_channels(ChannelList::new(vec![
            Channel::new(1, 11, "One"),
            Channel::new(2, 12, "Two"),
        ]));
        Arc::new(store)
    }

    #[test]
    fn test_scheduler_config_default() {
        let config = RefreshSchedulerConfig::default();
        assert_eq!(config.refresh_interval_secs, 300);
        assert_eq!(config.cleanup_interval_secs, 600);
    }

    #[tokio::test]
    async fn test_trigger_refresh_reports() {
        let store = store();
        let (scheduler, mut rx) = RefreshScheduler::new(
            Arc::clone(&store),
            Arc::new(NowSource),
            RefreshSchedulerConfig::default(),
        );
        let scheduler = scheduler.with_timers(Arc::new(OneTimer));

        let report = scheduler.trigger_refresh().await.unwrap();
        assert_eq!(report.kind, CycleKind::Refresh);
        assert_eq!(report.channels_total, 2);
        assert_eq!(report.channels_failed, 1);
        assert_eq!(report.inserted, 1);

        let published = rx.recv().await.unwrap();
        assert_eq!(published, report);

        let schedule = store.get_schedule(ChannelId(1), false);
        assert_eq!(schedule.tags()[0].timer, Some(TimerId(3)));
    }

    #[tokio::test]
    async fn test_pause_resume_stop() {
        let (scheduler, _rx) = RefreshScheduler::new(
            store(),
            Arc::new(NowSource),
            RefreshSchedulerConfig::default(),
        );

        assert_eq!(scheduler.state().await, SchedulerState::Running);
        scheduler.pause().await;
        assert_eq!(scheduler.state().await, SchedulerState::Paused);
        scheduler.resume().await;
        assert_eq!(scheduler.state().await, SchedulerState::Running);
        scheduler.stop().await;
        assert_eq!(scheduler.state().await, SchedulerState::Stopped);

        // Resume does not restart a stopped scheduler.
        scheduler.resume().await;
        assert_eq!(scheduler.state().await, SchedulerState::Stopped);
        assert!(matches!(
            scheduler.trigger_refresh().await,
            Err(SchedulerError::Stopped)
        ));
    }

    #[tokio::test]
    async fn test_start_refreshes_immediately_and_stops() {
        let store = store();
        let (scheduler, mut rx) = RefreshScheduler::new(
            Arc::clone(&store),
            Arc::new(NowSource),
            RefreshSchedulerConfig {
                refresh_interval_secs: 3600,
                cleanup_interval_secs: 3600,
            },
        );
        let scheduler = Arc::new(scheduler);
        let handle = Arc::clone(&scheduler).start();

        let mut kinds = Vec::new();
        for _ in 0..2 {
            let report = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .unwrap()
                .unwrap();
            kinds.push(report.kind);
        }
        assert!(kinds.contains(&CycleKind::Refresh));
        assert!(kinds.contains(&CycleKind::Cleanup));
        assert_eq!(store.get_schedule(ChannelId(1), false).len(), 1);

        scheduler.stop().await;
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_cleanup_keeps_live_event() {
        let store = store();
        let (scheduler, _rx) = RefreshScheduler::new(
            Arc::clone(&store),
            Arc::new(NowSource),
            RefreshSchedulerConfig::default(),
        );
        scheduler.trigger_refresh().await.unwrap();

        let report = scheduler.trigger_cleanup().await.unwrap();
        assert_eq!(report.kind, CycleKind::Cleanup);
        assert_eq!(report.removed, 0);
        assert_eq!(store.read().event_count(), 1);
    }
}
