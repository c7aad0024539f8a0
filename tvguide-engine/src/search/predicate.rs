//! Predicate checks for [`SearchFilter`].

use chrono::{DateTime, Timelike, Utc};
use tvguide_types::genre::is_known_genre;
use tvguide_types::{Channel, ProgramTag};

use super::SearchFilter;

impl SearchFilter {
    /// Channel-level predicates: selection, group and free-to-air.
    pub(crate) fn accepts_channel(&self, channel: &Channel) -> bool {
        if !self.channel.accepts(channel) {
            return false;
        }
        if let Some(group_id) = self.group_id {
            if channel.group_id != group_id {
                return false;
            }
        }
        !(self.free_to_air_only && channel.is_encrypted)
    }

    /// Event-level predicates. All configured checks must pass.
    pub(crate) fn accepts_event(&self, tag: &ProgramTag, channel: &Channel) -> bool {
        self.accepts_channel(channel)
            && self.matches_text(tag)
            && self.matches_genre(tag)
            && self.matches_duration(tag)
            && !(self.free_to_air_only && tag.encrypted)
            && self.matches_time_of_day(tag)
            && self.matches_date_range(tag)
    }

    fn matches_text(&self, tag: &ProgramTag) -> bool {
        let needle = match self.search_text.as_deref() {
            Some(text) if !text.is_empty() => text,
            _ => return true,
        };

        let contains = |haystack: &str| {
            if self.case_sensitive {
                haystack.contains(needle)
            } else {
                haystack.to_lowercase().contains(&needle.to_lowercase())
            }
        };

        contains(&tag.title)
            || (self.search_description && (contains(&tag.plot_outline) || contains(&tag.plot)))
    }

    fn matches_genre(&self, tag: &ProgramTag) -> bool {
        match self.genre_type {
            None => true,
            Some(wanted) => {
                tag.genre_type == wanted
                    || (self.include_unknown_genres && !is_known_genre(tag.genre_type))
            }
        }
    }

    fn matches_duration(&self, tag: &ProgramTag) -> bool {
        let secs = tag.duration_secs();
        if let Some(min) = self.min_duration_mins {
            if secs < i64::from(min) * 60 {
                return false;
            }
        }
        if let Some(max) = self.max_duration_mins {
            if secs > i64::from(max) * 60 {
                return false;
            }
        }
        true
    }

    fn matches_time_of_day(&self, tag: &ProgramTag) -> bool {
        if let Some(from) = self.start_time {
            if hour_minute(tag.start) < (from.hour(), from.minute()) {
                return false;
            }
        }
        if let Some(to) = self.end_time {
            if hour_minute(tag.end) > (to.hour(), to.minute()) {
                return false;
            }
        }
        true
    }

    fn matches_date_range(&self, tag: &ProgramTag) -> bool {
        if let Some(from) = self.start_date {
            if tag.start.date_naive() < from {
                return false;
            }
        }
        if let Some(to) = self.end_date {
            if tag.end.date_naive() > to {
                return false;
            }
        }
        true
    }
}

fn hour_minute(at: DateTime<Utc>) -> (u32, u32) {
    (at.hour(), at.minute())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime, TimeZone};
    use tvguide_types::{ChannelId, ProgramRecord};

    fn tag(start: (u32, u32, u32), end: (u32, u32, u32)) -> ProgramTag {
        let start = Utc.with_ymd_and_hms(2024, 3, start.0, start.1, start.2, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 3, end.0, end.1, end.2, 0).unwrap();
        ProgramTag::from_record(ChannelId(1), ProgramRecord::new(start, end, "Show")).unwrap()
    }

    fn channel() -> Channel {
        let mut channel = Channel::new(1, 11, "One");
        channel.number = 1;
        channel
    }

    #[test]
    fn test_genre_unknown_escape() {
        let mut quiz = tag((1, 19, 0), (1, 20, 0));
        quiz.genre_type = 0xF3;

        let mut filter = SearchFilter {
            genre_type: Some(0x10),
            ..Default::default()
        };
        assert!(!filter.accepts_event(&quiz, &channel()));

        filter.include_unknown_genres = true;
        assert!(filter.accepts_event(&quiz, &channel()));

        // Known genres never pass through the escape.
        let mut news = tag((1, 19, 0), (1, 20, 0));
        news.genre_type = 0x20;
        assert!(!filter.accepts_event(&news, &channel()));
    }

    #[test]
    fn test_time_of_day_ignores_date() {
        let filter = SearchFilter {
            start_time: NaiveTime::from_hms_opt(20, 0, 0),
            end_time: NaiveTime::from_hms_opt(23, 0, 0),
            ..Default::default()
        };
        assert!(filter.accepts_event(&tag((1, 20, 0), (1, 22, 0)), &channel()));
        assert!(filter.accepts_event(&tag((5, 20, 15), (5, 23, 0)), &channel()));
        assert!(!filter.accepts_event(&tag((1, 19, 59), (1, 22, 0)), &channel()));
        assert!(!filter.accepts_event(&tag((1, 22, 30), (1, 23, 30)), &channel()));
    }

    #[test]
    fn test_date_range_ignores_time() {
        let filter = SearchFilter {
            start_date: NaiveDate::from_ymd_opt(2024, 3, 2),
            end_date: NaiveDate::from_ymd_opt(2024, 3, 3),
            ..Default::default()
        };
        assert!(filter.accepts_event(&tag((2, 0, 0), (2, 1, 0)), &channel()));
        assert!(filter.accepts_event(&tag((3, 23, 0), (3, 23, 59)), &channel()));
        assert!(!filter.accepts_event(&tag((1, 23, 0), (2, 1, 0)), &channel()));
        assert!(!filter.accepts_event(&tag((3, 23, 0), (4, 1, 0)), &channel()));
    }

    #[test]
    fn test_free_to_air() {
        let filter = SearchFilter {
            free_to_air_only: true,
            ..Default::default()
        };
        let mut scrambled = tag((1, 19, 0), (1, 20, 0));
        assert!(filter.accepts_event(&scrambled, &channel()));
        scrambled.encrypted = true;
        assert!(!filter.accepts_event(&scrambled, &channel()));

        let mut pay = channel();
        pay.is_encrypted = true;
        assert!(!filter.accepts_channel(&pay));
    }

    #[test]
    fn test_group_filter() {
        let filter = SearchFilter {
            group_id: Some(4),
            ..Default::default()
        };
        let mut grouped = channel();
        assert!(!filter.accepts_channel(&grouped));
        grouped.group_id = 4;
        assert!(filter.accepts_channel(&grouped));
    }
}
