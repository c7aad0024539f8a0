//! Cross-channel program search.
//!
//! A query runs in strict order, each pass consuming the survivors of the
//! previous one:
//!
//! 1. Predicate filter (all configured predicates must pass)
//! 2. Timer dedup (optional)
//! 3. Recording dedup (optional)
//! 4. Repeat dedup (optional)
//!
//! Every result is then annotated with the timer whose midpoint falls inside
//! the event. The annotation is computed per query and never stored.

mod dedup;
mod predicate;

pub use dedup::{remove_recorded, remove_repeats, remove_timed};

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use log::debug;
use serde::{Deserialize, Serialize};
use tvguide_types::{Channel, ProgramTag, Recording, Timer};

use crate::store::EpgStore;

/// Which channels a query covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelSelection {
    #[default]
    Any,
    AnyTv,
    AnyRadio,
    /// A single channel by display number.
    Number(u32),
}

impl ChannelSelection {
    pub fn accepts(&self, channel: &Channel) -> bool {
        match *self {
            ChannelSelection::Any => true,
            ChannelSelection::AnyTv => !channel.is_radio,
            ChannelSelection::AnyRadio => channel.is_radio,
            ChannelSelection::Number(number) => channel.number == number,
        }
    }
}

/// Search criteria. The default matches every event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchFilter {
    /// Substring searched in the title.
    pub search_text: Option<String>,
    pub case_sensitive: bool,
    /// Also search plot and plot outline.
    pub search_description: bool,

    /// Exact genre type code.
    pub genre_type: Option<u8>,
    /// Let events with a genre outside the known range through the genre check.
    pub include_unknown_genres: bool,

    pub min_duration_mins: Option<u32>,
    pub max_duration_mins: Option<u32>,

    pub channel: ChannelSelection,
    pub group_id: Option<u32>,
    /// Exclude encrypted events and encrypted channels.
    pub free_to_air_only: bool,

    /// Time-of-day window (hour:minute, UTC), independent of the date range.
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,

    /// Date range (UTC), independent of the time-of-day window.
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,

    pub ignore_present_timers: bool,
    pub ignore_present_recordings: bool,
    pub prevent_repeats: bool,
}

impl SearchFilter {
    /// Filter matching titles containing `text`, case-insensitive.
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            search_text: Some(text.into()),
            ..Default::default()
        }
    }

    /// Run the query against a consistent snapshot of the store.
    pub fn search(
        &self,
        store: &EpgStore,
        timers: &[Timer],
        recordings: &[Recording],
    ) -> Vec<SearchResult> {
        let mut results = Vec::new();
        {
            let snapshot = store.read();
            for channel in snapshot.channels().visible() {
                if !self.accepts_channel(channel) {
                    continue;
                }
                let Some(schedule) = snapshot.schedule_for(channel) else {
                    continue;
                };
                results.extend(
                    schedule
                        .iter()
                        .filter(|tag| self.accepts_event(tag, channel))
                        .map(|tag| SearchResult::new(Arc::clone(tag), channel)),
                );
            }
        }
        results.sort_by(|a, b| {
            a.channel_number
                .cmp(&b.channel_number)
                .then(a.tag.start.cmp(&b.tag.start))
        });
        let matched = results.len();

        if self.ignore_present_timers {
            remove_timed(&mut results, timers);
        }
        if self.ignore_present_recordings {
            remove_recorded(&mut results, recordings);
        }
        if self.prevent_repeats {
            remove_repeats(&mut results);
        }

        for result in &mut results {
            result.timer = correlate_timer(&result.tag, result.channel_number, timers);
        }

        debug!(
            "Search matched {} events, {} after dedup",
            matched,
            results.len()
        );
        results
    }
}

/// One search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub tag: Arc<ProgramTag>,
    /// Display number of the event's channel.
    pub channel_number: u32,
    pub channel_name: String,
    /// Timer whose midpoint falls inside the event.
    pub timer: Option<Timer>,
}

impl SearchResult {
    pub fn new(tag: Arc<ProgramTag>, channel: &Channel) -> Self {
        Self {
            tag,
            channel_number: channel.number,
            channel_name: channel.name.clone(),
            timer: None,
        }
    }
}

/// Find the timer on `channel_number` whose midpoint lies in `[start, end)`.
pub fn correlate_timer(tag: &ProgramTag, channel_number: u32, timers: &[Timer]) -> Option<Timer> {
    timers
        .iter()
        .find(|t| t.channel_number == channel_number && tag.contains(t.midpoint()))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::ChannelList;
    use chrono::{DateTime, TimeZone, Utc};
    use tvguide_types::{ChannelId, ProgramRecord};

    fn at(day: u32, hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, min, 0).unwrap()
    }

    fn radio(mut channel: Channel) -> Channel {
        channel.is_radio = true;
        channel
    }

    fn store() -> EpgStore {
        let store = EpgStore::default();
        store.set_channels(ChannelList::new(vec![
            Channel::new(1, 11, "One"),
            Channel::new(2, 12, "Two"),
            radio(Channel::new(3, 13, "Radio")),
        ]));

        let one = [
            ProgramRecord::new(at(1, 18, 0), at(1, 18, 30), "News").with_genre(0x20, 0),
            ProgramRecord::new(at(1, 20, 0), at(1, 22, 0), "Feature Film")
                .with_plot("Heist", "A long heist story")
                .with_genre(0x10, 0),
            ProgramRecord::new(at(2, 20, 0), at(2, 22, 0), "Feature Film")
                .with_plot("Heist", "A long heist story")
                .with_genre(0x10, 0),
        ];
        for record in one {
            store.upsert(ChannelId(1), record).unwrap();
        }

        let two = [
            ProgramRecord::new(at(1, 19, 0), at(1, 19, 45), "Quiz").with_genre(0xF3, 0),
            ProgramRecord::new(at(1, 21, 0), at(1, 22, 0), "Late News").with_genre(0x20, 0),
        ];
        for record in two {
            store.upsert(ChannelId(2), record).unwrap();
        }

        store
            .upsert(
                ChannelId(3),
                ProgramRecord::new(at(1, 18, 0), at(1, 20, 0), "Jazz Hour").with_genre(0x40, 0),
            )
            .unwrap();
        store
    }

    fn titles(results: &[SearchResult]) -> Vec<&str> {
        results.iter().map(|r| r.tag.title.as_str()).collect()
    }

    #[test]
    fn test_default_filter_matches_all_ordered() {
        let results = SearchFilter::default().search(&store(), &[], &[]);
        assert_eq!(
            titles(&results),
            vec!["News", "Feature Film", "Feature Film", "Quiz", "Late News", "Jazz Hour"]
        );
    }

    #[test]
    fn test_text_search() {
        let store = store();
        let results = SearchFilter::with_text("news").search(&store, &[], &[]);
        assert_eq!(titles(&results), vec!["News", "Late News"]);

        let filter = SearchFilter {
            case_sensitive: true,
            ..SearchFilter::with_text("news")
        };
        assert!(filter.search(&store, &[], &[]).is_empty());

        let filter = SearchFilter {
            search_description: true,
            ..SearchFilter::with_text("heist")
        };
        assert_eq!(filter.search(&store, &[], &[]).len(), 2);
    }

    #[test]
    fn test_channel_selection() {
        let store = store();
        let radio_only = SearchFilter {
            channel: ChannelSelection::AnyRadio,
            ..Default::default()
        };
        assert_eq!(titles(&radio_only.search(&store, &[], &[])), vec!["Jazz Hour"]);

        let second = SearchFilter {
            channel: ChannelSelection::Number(2),
            ..Default::default()
        };
        assert_eq!(titles(&second.search(&store, &[], &[])), vec!["Quiz", "Late News"]);

        let tv = SearchFilter {
            channel: ChannelSelection::AnyTv,
            ..Default::default()
        };
        assert_eq!(tv.search(&store, &[], &[]).len(), 5);
    }

    #[test]
    fn test_duration_bounds() {
        let store = store();
        let filter = SearchFilter {
            min_duration_mins: Some(30),
            max_duration_mins: Some(60),
            ..Default::default()
        };
        let results = filter.search(&store, &[], &[]);
        assert_eq!(titles(&results), vec!["News", "Quiz", "Late News"]);
        for result in &results {
            let secs = result.tag.duration_secs();
            assert!((30 * 60..=60 * 60).contains(&secs));
        }
    }

    #[test]
    fn test_full_pipeline_with_timer_and_recording() {
        let store = store();
        // Covers "Late News" on display number 2.
        let timers = vec![Timer::new(1, 2, at(1, 20, 58), at(1, 22, 2))];
        // Midpoint inside the first film, but does not cover it.
        let partial = Timer::new(2, 1, at(1, 20, 30), at(1, 21, 0));
        let recordings = vec![Recording::new("Quiz", "", "")];

        let filter = SearchFilter {
            ignore_present_timers: true,
            ignore_present_recordings: true,
            prevent_repeats: true,
            ..Default::default()
        };
        let mut all_timers = timers.clone();
        all_timers.push(partial.clone());
        let results = filter.search(&store, &all_timers, &recordings);

        assert_eq!(titles(&results), vec!["News", "Feature Film", "Jazz Hour"]);
        // The surviving film carries the timer correlated by midpoint.
        assert_eq!(results[1].timer.as_ref(), Some(&partial));
        assert!(results[0].timer.is_none());
    }

    #[test]
    fn test_correlate_timer_requires_same_channel() {
        let store = store();
        let timers = vec![Timer::new(5, 2, at(1, 18, 0), at(1, 18, 30))];
        let results = SearchFilter::with_text("News").search(&store, &timers, &[]);
        assert!(results.iter().all(|r| r.timer.is_none()));
    }
}
