//! Backend collaborators: program data, timers and recordings.
//!
//! The guide engine never talks to a tuner directly. It pulls program data
//! through [`EpgSource`] and reads the recording subsystem through
//! [`TimerSource`] / [`RecordingSource`]. [`JsonFileSource`] implements all
//! three over a JSON fixture file.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use tvguide_types::{Channel, FetchError, ProgramRecord, Recording, Timer};

/// Supplier of program records for one channel and time range.
///
/// Calls are synchronous; the refresh worker runs them off the async runtime.
pub trait EpgSource: Send + Sync {
    /// Fetch all events of `channel_number` overlapping `[start, end)`.
    fn fetch_epg(
        &self,
        channel_number: u32,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ProgramRecord>, FetchError>;
}

/// Read-only view of active timers.
pub trait TimerSource: Send + Sync {
    fn timers(&self) -> Vec<Timer>;
}

/// Read-only view of completed or in-progress recordings.
pub trait RecordingSource: Send + Sync {
    fn recordings(&self) -> Vec<Recording>;
}

/// Error loading a fixture file.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Failed to read fixture: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse fixture: {0}")]
    Parse(#[from] serde_json::Error),
}

/// On-disk layout of a fixture file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub channels: Vec<Channel>,
    /// Program records keyed by backend channel number.
    #[serde(default)]
    pub programs: HashMap<u32, Vec<ProgramRecord>>,
    #[serde(default)]
    pub timers: Vec<Timer>,
    #[serde(default)]
    pub recordings: Vec<Recording>,
    /// Backend channel numbers whose fetch fails as unavailable.
    #[serde(default)]
    pub unavailable: Vec<u32>,
}

/// Fixture-backed backend.
#[derive(Debug, Clone, Default)]
pub struct JsonFileSource {
    fixture: Fixture,
}

impl JsonFileSource {
    pub fn new(fixture: Fixture) -> Self {
        Self { fixture }
    }

    /// Load a fixture from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, SourceError> {
        let fixture: Fixture = serde_json::from_str(content)?;
        debug!(
            "Loaded fixture: {} channels, {} program lists, {} timers, {} recordings",
            fixture.channels.len(),
            fixture.programs.len(),
            fixture.timers.len(),
            fixture.recordings.len()
        );
        Ok(Self { fixture })
    }

    /// Channels advertised by the backend.
    pub fn channels(&self) -> &[Channel] {
        &self.fixture.channels
    }
}

impl EpgSource for JsonFileSource {
    fn fetch_epg(
        &self,
        channel_number: u32,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ProgramRecord>, FetchError> {
        if self.fixture.unavailable.contains(&channel_number) {
            return Err(FetchError::Unavailable(format!(
                "channel {} is offline",
                channel_number
            )));
        }

        let records = self
            .fixture
            .programs
            .get(&channel_number)
            .ok_or(FetchError::NoSuchChannel(channel_number))?;

        Ok(records
            .iter()
            .filter(|r| r.start < end && r.end > start)
            .cloned()
            .collect())
    }
}

impl TimerSource for JsonFileSource {
    fn timers(&self) -> Vec<Timer> {
        self.fixture.timers.clone()
    }
}

impl RecordingSource for JsonFileSource {
    fn recordings(&self) -> Vec<Recording> {
        self.fixture.recordings.clone()
    }
}
