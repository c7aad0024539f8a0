//! Concurrent program guide store.
//!
//! [`EpgStore`] owns every channel schedule. One background worker writes
//! (refresh, cleanup, timer relinking); UI and search callers read through
//! [`EpgStore::read`], which returns a consistent snapshot for as long as the
//! read section is held.

mod lock;
mod schedule;

pub use lock::{ReadSection, SectionLock, WriteSection};
pub use schedule::{ChannelSchedule, UpsertOutcome};

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use parking_lot::Mutex;
use tvguide_types::{
    Channel, ChannelId, EpgError, FetchError, FetchErrorCode, ProgramRecord, Timer,
};

use crate::channels::{ChannelList, RenumberReport};
use crate::source::EpgSource;

/// Store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Grace period after an event ends before it may be pruned.
    pub linger_time: Duration,
    /// How far ahead a refresh requests data.
    pub days_to_display: i64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            linger_time: Duration::minutes(60),
            days_to_display: 3,
        }
    }
}

/// Data guarded by the store lock.
#[derive(Debug, Default)]
pub struct StoreData {
    channels: ChannelList,
    schedules: HashMap<ChannelId, ScheduleRef>,
}

impl StoreData {
    pub fn channels(&self) -> &ChannelList {
        &self.channels
    }

    pub fn schedule(&self, channel_id: ChannelId) -> Option<&ChannelSchedule> {
        self.schedules.get(&channel_id).map(|s| s.as_ref())
    }

    /// Resolve a channel's schedule by id.
    pub fn schedule_for(&self, channel: &Channel) -> Option<&ChannelSchedule> {
        self.schedule(channel.id)
    }

    pub fn schedules(&self) -> impl Iterator<Item = &ChannelSchedule> {
        self.schedules.values().map(|s| s.as_ref())
    }

    /// Total number of stored events.
    pub fn event_count(&self) -> usize {
        self.schedules.values().map(|s| s.len()).sum()
    }
}

/// Shared handle to one channel's schedule.
///
/// Writers copy a schedule before mutating it while a handle is outstanding,
/// so a handle never changes under its holder.
pub type ScheduleRef = Arc<ChannelSchedule>;

/// Consistent view of the store for the lifetime of the read section.
pub type StoreSnapshot<'a> = ReadSection<'a, StoreData>;

/// Counters for a batch of upserts on one channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertStats {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Records refused for violating `start < end`.
    pub rejected: usize,
}

/// What a worker cycle did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CycleKind {
    #[default]
    Refresh,
    Cleanup,
}

/// Summary of one refresh or cleanup cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub kind: CycleKind,
    pub channels_total: usize,
    pub channels_failed: usize,
    pub inserted: usize,
    pub updated: usize,
    pub removed: usize,
    /// Per-channel failure codes for this cycle.
    pub failures: Vec<(ChannelId, FetchErrorCode)>,
}

/// The program guide store.
pub struct EpgStore {
    data: SectionLock<StoreData>,
    config: StoreConfig,

    /// Error from the most recent fetch per channel.
    fetch_errors: Mutex<HashMap<ChannelId, FetchError>>,
}

impl EpgStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            data: SectionLock::new(StoreData::default()),
            config,
            fetch_errors: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Enter a read section.
    pub fn read(&self) -> StoreSnapshot<'_> {
        self.data.read()
    }

    /// Number of read sections currently open.
    pub fn read_depth(&self) -> usize {
        self.data.read_depth()
    }

    /// Write counter; changes whenever schedule or channel data may have changed.
    pub fn generation(&self) -> u64 {
        self.data.generation()
    }

    /// Replace the channel list. The list is renumbered first.
    pub fn set_channels(&self, mut channels: ChannelList) -> RenumberReport {
        let report = channels.renumber_and_check();
        info!(
            "Channel list updated: {} visible, {} hidden, {} dropped",
            report.visible,
            report.hidden,
            report.dropped.len()
        );
        self.data.write().channels = channels;
        report
    }

    /// Copy of the current channel list.
    pub fn channels(&self) -> ChannelList {
        self.read().channels.clone()
    }

    /// Get a channel's schedule, optionally registering an empty one.
    ///
    /// Never fails: a channel without data yields an empty schedule.
    pub fn get_schedule(&self, channel_id: ChannelId, create_if_missing: bool) -> ScheduleRef {
        if let Some(schedule) = self.read().schedules.get(&channel_id) {
            return Arc::clone(schedule);
        }
        if !create_if_missing {
            return Arc::new(ChannelSchedule::new(channel_id));
        }

        Arc::clone(
            self.data
                .write()
                .schedules
                .entry(channel_id)
                .or_insert_with(|| Arc::new(ChannelSchedule::new(channel_id))),
        )
    }

    pub fn schedule_for(&self, channel: &Channel) -> ScheduleRef {
        self.get_schedule(channel.id, false)
    }

    /// Insert or update one event.
    pub fn upsert(
        &self,
        channel_id: ChannelId,
        record: ProgramRecord,
    ) -> Result<UpsertOutcome, EpgError> {
        let mut data = self.data.write();
        let schedule = data
            .schedules
            .entry(channel_id)
            .or_insert_with(|| Arc::new(ChannelSchedule::new(channel_id)));
        Arc::make_mut(schedule).upsert(record)
    }

    /// Insert or update a batch of events in a single write section.
    ///
    /// Invalid records are logged and skipped.
    pub fn upsert_batch(&self, channel_id: ChannelId, records: Vec<ProgramRecord>) -> UpsertStats {
        let mut stats = UpsertStats::default();
        let mut data = self.data.write();
        let schedule = Arc::make_mut(
            data.schedules
                .entry(channel_id)
                .or_insert_with(|| Arc::new(ChannelSchedule::new(channel_id))),
        );

        for record in records {
            match schedule.upsert(record) {
                Ok(UpsertOutcome::Inserted) => stats.inserted += 1,
                Ok(UpsertOutcome::Updated) => stats.updated += 1,
                Ok(UpsertOutcome::Unchanged) => stats.unchanged += 1,
                Err(e) => {
                    warn!("Channel {}: rejecting event: {}", channel_id, e);
                    stats.rejected += 1;
                }
            }
        }
        stats
    }

    /// Prune stale events from the front of every schedule.
    pub fn cleanup(&self, now: DateTime<Utc>) -> usize {
        let linger = self.config.linger_time;
        let mut data = self.data.write();
        let removed: usize = data
            .schedules
            .values_mut()
            .map(|s| Arc::make_mut(s).prune_front(now, linger))
            .sum();
        debug!("Cleanup removed {} stale events", removed);
        removed
    }

    /// Fetch `[now - linger, now + days]` for every known channel and merge it in.
    ///
    /// The backend is called outside any lock. A failing channel keeps its
    /// previous schedule and does not affect the others.
    pub fn refresh_cycle(&self, source: &dyn EpgSource, now: DateTime<Utc>) -> RefreshReport {
        let start = now - self.config.linger_time;
        let end = now + Duration::days(self.config.days_to_display);

        let targets: Vec<(ChannelId, u32)> = self
            .read()
            .channels
            .iter()
            .map(|c| (c.id, c.backend_number))
            .collect();

        info!(
            "Refresh cycle started: {} channels, window {} .. {}",
            targets.len(),
            start,
            end
        );

        let mut report = RefreshReport {
            kind: CycleKind::Refresh,
            channels_total: targets.len(),
            ..Default::default()
        };

        for (channel_id, backend_number) in targets {
            match source.fetch_epg(backend_number, start, end) {
                Ok(records) => {
                    let stats = self.upsert_batch(channel_id, records);
                    report.inserted += stats.inserted;
                    report.updated += stats.updated;
                    self.fetch_errors.lock().remove(&channel_id);
                }
                Err(e) => {
                    warn!(
                        "Channel {} (backend {}): fetch failed: {}",
                        channel_id, backend_number, e
                    );
                    report.channels_failed += 1;
                    report.failures.push((channel_id, e.code()));
                    self.fetch_errors.lock().insert(channel_id, e);
                }
            }
        }

        info!(
            "Refresh cycle finished: {} inserted, {} updated, {}/{} channels failed",
            report.inserted, report.updated, report.channels_failed, report.channels_total
        );
        report
    }

    /// The error recorded for a channel by the most recent refresh, if it failed.
    pub fn last_fetch_error(&self, channel_id: ChannelId) -> Option<FetchError> {
        self.fetch_errors.lock().get(&channel_id).cloned()
    }

    /// Recompute timer links after the timer list changed.
    ///
    /// Every link is cleared, then each timer is linked to the event on its
    /// channel whose window contains the timer's midpoint. Returns the number
    /// of links made.
    pub fn relink_timers(&self, timers: &[Timer]) -> usize {
        let mut data = self.data.write();
        for schedule in data.schedules.values_mut() {
            Arc::make_mut(schedule).clear_timer_links();
        }

        let mut linked = 0;
        for timer in timers {
            let Some(channel_id) = data.channels.by_number(timer.channel_number).map(|c| c.id)
            else {
                debug!(
                    "Timer {:?} references unknown channel number {}",
                    timer.id, timer.channel_number
                );
                continue;
            };
            if let Some(schedule) = data.schedules.get_mut(&channel_id) {
                if Arc::make_mut(schedule).link_timer(timer.midpoint(), timer.id) {
                    linked += 1;
                }
            }
        }
        debug!("Linked {} of {} timers", linked, timers.len());
        linked
    }

    /// Drop all schedule data. Channels are kept.
    pub fn clear(&self) {
        let mut data = self.data.write();
        data.schedules.clear();
        self.fetch_errors.lock().clear();
        info!("Program guide cleared");
    }
}

impl Default for EpgStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

/// Shared handle to the store.
pub type StoreHandle = Arc<EpgStore>;
