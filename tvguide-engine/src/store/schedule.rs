//! Per-channel program schedule, ordered by start time.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tvguide_types::{ChannelId, EpgError, ProgramKey, ProgramRecord, ProgramTag, TimerId};

/// Result of inserting or updating one program record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// A new event was added.
    Inserted,
    /// An existing event (same identity key) was changed.
    Updated,
    /// An existing event already carried identical data.
    Unchanged,
}

/// Ordered sequence of program events for one channel.
///
/// Events are unique by [`ProgramKey`] and kept sorted by start time.
/// Tags are shared as `Arc` so readers (guide grid, search results) can
/// hold them past the read section; writers copy on write.
#[derive(Debug, Clone)]
pub struct ChannelSchedule {
    channel_id: ChannelId,
    tags: Vec<Arc<ProgramTag>>,
}

impl ChannelSchedule {
    /// Create an empty schedule.
    pub fn new(channel_id: ChannelId) -> Self {
        Self {
            channel_id,
            tags: Vec::new(),
        }
    }

    pub fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// All events in start order.
    pub fn tags(&self) -> &[Arc<ProgramTag>] {
        &self.tags
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ProgramTag>> {
        self.tags.iter()
    }

    /// Find the position of the event with the given identity key.
    pub fn position_of(&self, key: &ProgramKey) -> Option<usize> {
        match *key {
            ProgramKey::Broadcast { broadcast_id, .. } => {
                self.tags.iter().position(|t| t.broadcast_id == broadcast_id)
            }
            ProgramKey::Start { start, .. } => {
                // Tags are sorted by start, so only the run of equal starts needs checking.
                let first = self.tags.partition_point(|t| t.start < start);
                self.tags[first..]
                    .iter()
                    .take_while(|t| t.start == start)
                    .position(|t| t.broadcast_id == 0)
                    .map(|offset| first + offset)
            }
        }
    }

    /// Insert or update an event by identity key, keeping start order.
    pub fn upsert(&mut self, record: ProgramRecord) -> Result<UpsertOutcome, EpgError> {
        record.validate()?;
        let key = ProgramKey::for_record(self.channel_id, &record);

        match self.position_of(&key) {
            Some(idx) => {
                let start_changed = self.tags[idx].start != record.start;
                if !self.tags[idx].differs_from(&record) {
                    return Ok(UpsertOutcome::Unchanged);
                }
                Arc::make_mut(&mut self.tags[idx]).update_from(record)?;

                if start_changed {
                    let tag = self.tags.remove(idx);
                    self.insert_ordered(tag);
                }
                Ok(UpsertOutcome::Updated)
            }
            None => {
                let tag = ProgramTag::from_record(self.channel_id, record)?;
                self.insert_ordered(Arc::new(tag));
                Ok(UpsertOutcome::Inserted)
            }
        }
    }

    fn insert_ordered(&mut self, tag: Arc<ProgramTag>) {
        let idx = self.tags.partition_point(|t| t.start <= tag.start);
        self.tags.insert(idx, tag);
    }

    /// Remove stale events from the front of the schedule.
    ///
    /// An event is stale when `end + linger < now` and no timer references it.
    /// The scan stops at the first event that is not stale.
    pub fn prune_front(&mut self, now: DateTime<Utc>, linger: Duration) -> usize {
        let stale = self
            .tags
            .iter()
            .take_while(|t| t.end + linger < now && t.timer.is_none())
            .count();
        self.tags.drain(..stale);
        stale
    }

    /// The event running at `at`, if any.
    pub fn active_at(&self, at: DateTime<Utc>) -> Option<&Arc<ProgramTag>> {
        let upper = self.tags.partition_point(|t| t.start <= at);
        self.tags[..upper].iter().rev().find(|t| t.contains(at))
    }

    /// The first event starting after `at`.
    pub fn next_after(&self, at: DateTime<Utc>) -> Option<&Arc<ProgramTag>> {
        let idx = self.tags.partition_point(|t| t.start <= at);
        self.tags.get(idx)
    }

    /// Events overlapping `[start, end)`.
    pub fn overlapping(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> impl Iterator<Item = &Arc<ProgramTag>> {
        self.tags
            .iter()
            .skip_while(move |t| t.end <= start)
            .take_while(move |t| t.start < end)
            .filter(move |t| t.end > start)
    }

    /// Drop every timer link. Returns the number of links cleared.
    pub(crate) fn clear_timer_links(&mut self) -> usize {
        let mut cleared = 0;
        for tag in self.tags.iter_mut().filter(|t| t.timer.is_some()) {
            Arc::make_mut(tag).timer = None;
            cleared += 1;
        }
        cleared
    }

    /// Link the event running at `at` to a timer. Returns false if none runs then.
    pub(crate) fn link_timer(&mut self, at: DateTime<Utc>, timer: TimerId) -> bool {
        let upper = self.tags.partition_point(|t| t.start <= at);
        match self.tags[..upper].iter_mut().rev().find(|t| t.contains(at)) {
            Some(tag) => {
                Arc::make_mut(tag).timer = Some(timer);
                true
            }
            None => false,
        }
    }
}
