//! Value types for channels, program events, timers and recordings.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EpgError;
use crate::genre::GenreType;

/// Storage identity of a channel. Stable across renumbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub u32);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity of a timer as assigned by the timer collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimerId(pub u32);

/// A TV or radio channel as known to the frontend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// Storage id.
    pub id: ChannelId,
    /// Number assigned by the backend (0 = missing).
    #[serde(default)]
    pub backend_number: u32,
    /// Display number, dense 1..N over visible channels (0 = hidden / not numbered).
    #[serde(default)]
    pub number: u32,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Channel group.
    #[serde(default)]
    pub group_id: u32,
    /// Radio service instead of TV.
    #[serde(default)]
    pub is_radio: bool,
    /// Hidden from the guide.
    #[serde(default)]
    pub is_hidden: bool,
    /// Scrambled service (not free-to-air).
    #[serde(default)]
    pub is_encrypted: bool,
    /// Channel logo reference.
    #[serde(default)]
    pub icon: Option<String>,
}

impl Channel {
    /// Create a new visible TV channel with minimal required fields.
    pub fn new(id: u32, backend_number: u32, name: impl Into<String>) -> Self {
        Self {
            id: ChannelId(id),
            backend_number,
            number: 0,
            name: name.into(),
            group_id: 0,
            is_radio: false,
            is_hidden: false,
            is_encrypted: false,
            icon: None,
        }
    }

    /// Returns true if the channel takes part in the guide.
    pub fn is_visible(&self) -> bool {
        !self.is_hidden
    }
}

/// A program event as delivered by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramRecord {
    /// Unique broadcast id (0 = absent).
    #[serde(default)]
    pub broadcast_id: u32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub title: String,
    /// Short description.
    #[serde(default)]
    pub plot_outline: String,
    /// Long description.
    #[serde(default)]
    pub plot: String,
    #[serde(default)]
    pub genre_type: u8,
    #[serde(default)]
    pub genre_sub_type: u8,
    #[serde(default)]
    pub encrypted: bool,
    #[serde(default)]
    pub icon: Option<String>,
}

impl ProgramRecord {
    /// Create a record with minimal required fields.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, title: impl Into<String>) -> Self {
        Self {
            broadcast_id: 0,
            start,
            end,
            title: title.into(),
            plot_outline: String::new(),
            plot: String::new(),
            genre_type: 0,
            genre_sub_type: 0,
            encrypted: false,
            icon: None,
        }
    }

    pub fn with_broadcast_id(mut self, broadcast_id: u32) -> Self {
        self.broadcast_id = broadcast_id;
        self
    }

    pub fn with_plot(mut self, plot_outline: impl Into<String>, plot: impl Into<String>) -> Self {
        self.plot_outline = plot_outline.into();
        self.plot = plot.into();
        self
    }

    pub fn with_genre(mut self, genre_type: u8, genre_sub_type: u8) -> Self {
        self.genre_type = genre_type;
        self.genre_sub_type = genre_sub_type;
        self
    }

    /// Check the `start < end` invariant.
    pub fn validate(&self) -> Result<(), EpgError> {
        if self.start < self.end {
            Ok(())
        } else {
            Err(EpgError::InvalidWindow {
                start: self.start,
                end: self.end,
            })
        }
    }
}

/// Identity key of a program event inside a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramKey {
    /// Keyed by the backend's unique broadcast id.
    Broadcast { channel_id: ChannelId, broadcast_id: u32 },
    /// No broadcast id; keyed by start time.
    Start {
        channel_id: ChannelId,
        start: DateTime<Utc>,
    },
}

impl ProgramKey {
    /// Generate the identity key for a record on a channel.
    pub fn for_record(channel_id: ChannelId, record: &ProgramRecord) -> Self {
        Self::new(channel_id, record.broadcast_id, record.start)
    }

    fn new(channel_id: ChannelId, broadcast_id: u32, start: DateTime<Utc>) -> Self {
        if broadcast_id != 0 {
            ProgramKey::Broadcast {
                channel_id,
                broadcast_id,
            }
        } else {
            ProgramKey::Start { channel_id, start }
        }
    }
}

/// A program event stored in a channel schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramTag {
    /// Owning channel (replaces a back-pointer to the schedule).
    pub channel_id: ChannelId,
    pub broadcast_id: u32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub title: String,
    pub plot_outline: String,
    pub plot: String,
    pub genre_type: u8,
    pub genre_sub_type: u8,
    pub encrypted: bool,
    pub icon: Option<String>,
    /// Timer correlated with this event, if any.
    pub timer: Option<TimerId>,
}

impl ProgramTag {
    /// Build a tag from a backend record, enforcing `start < end`.
    pub fn from_record(channel_id: ChannelId, record: ProgramRecord) -> Result<Self, EpgError> {
        record.validate()?;
        Ok(Self {
            channel_id,
            broadcast_id: record.broadcast_id,
            start: record.start,
            end: record.end,
            title: record.title,
            plot_outline: record.plot_outline,
            plot: record.plot,
            genre_type: record.genre_type,
            genre_sub_type: record.genre_sub_type,
            encrypted: record.encrypted,
            icon: record.icon,
            timer: None,
        })
    }

    pub fn key(&self) -> ProgramKey {
        ProgramKey::new(self.channel_id, self.broadcast_id, self.start)
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn duration_secs(&self) -> i64 {
        self.duration().num_seconds()
    }

    /// Returns true if `at` falls within `[start, end)`.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }

    pub fn genre(&self) -> GenreType {
        GenreType::from_code(self.genre_type)
    }

    /// Returns true if both events carry the same title, plot and plot outline.
    pub fn same_content(&self, other: &ProgramTag) -> bool {
        self.title == other.title && self.plot == other.plot && self.plot_outline == other.plot_outline
    }

    /// Returns true if the record carries data this tag does not.
    pub fn differs_from(&self, record: &ProgramRecord) -> bool {
        self.start != record.start
            || self.end != record.end
            || self.title != record.title
            || self.plot_outline != record.plot_outline
            || self.plot != record.plot
            || self.genre_type != record.genre_type
            || self.genre_sub_type != record.genre_sub_type
            || self.encrypted != record.encrypted
            || self.icon != record.icon
    }

    /// Overwrite the descriptive fields from a newer record.
    ///
    /// Returns true if anything changed. The timer link is kept.
    pub fn update_from(&mut self, record: ProgramRecord) -> Result<bool, EpgError> {
        record.validate()?;
        let changed = self.differs_from(&record);

        if changed {
            self.broadcast_id = record.broadcast_id;
            self.start = record.start;
            self.end = record.end;
            self.title = record.title;
            self.plot_outline = record.plot_outline;
            self.plot = record.plot;
            self.genre_type = record.genre_type;
            self.genre_sub_type = record.genre_sub_type;
            self.encrypted = record.encrypted;
            self.icon = record.icon;
        }
        Ok(changed)
    }
}

/// A scheduled recording request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timer {
    pub id: TimerId,
    /// Display number of the channel to record.
    pub channel_number: u32,
    pub start: DateTime<Utc>,
    pub stop: DateTime<Utc>,
    #[serde(default)]
    pub title: String,
}

impl Timer {
    pub fn new(id: u32, channel_number: u32, start: DateTime<Utc>, stop: DateTime<Utc>) -> Self {
        Self {
            id: TimerId(id),
            channel_number,
            start,
            stop,
            title: String::new(),
        }
    }

    /// Temporal midpoint of the timer window.
    pub fn midpoint(&self) -> DateTime<Utc> {
        self.start + (self.stop - self.start) / 2
    }

    /// Returns true if the timer window fully covers the event.
    pub fn covers(&self, tag: &ProgramTag) -> bool {
        self.start <= tag.start && tag.end <= self.stop
    }
}

/// A completed or in-progress recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recording {
    pub title: String,
    #[serde(default)]
    pub plot_outline: String,
    #[serde(default)]
    pub plot: String,
    #[serde(default)]
    pub channel_name: Option<String>,
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
}

impl Recording {
    pub fn new(
        title: impl Into<String>,
        plot_outline: impl Into<String>,
        plot: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            plot_outline: plot_outline.into(),
            plot: plot.into(),
            channel_name: None,
            start: None,
        }
    }

    /// Returns true if the recording carries the same title, short and long description.
    pub fn matches(&self, tag: &ProgramTag) -> bool {
        self.title == tag.title && self.plot_outline == tag.plot_outline && self.plot == tag.plot
    }
}
