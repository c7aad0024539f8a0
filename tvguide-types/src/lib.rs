//! Shared data types for the tvguide program guide engine.
//!
//! This crate defines the value types exchanged between the guide engine
//! and its collaborators (backend, timer list, recording list):
//!
//! - [`Channel`]: A TV or radio channel with storage id and display number
//! - [`ProgramRecord`]: A program event as delivered by the backend
//! - [`ProgramTag`]: A program event stored in a channel schedule
//! - [`Timer`] / [`Recording`]: Read-only views of the recording subsystem
//! - [`genre`]: DVB content-nibble genre classification
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use tvguide_types::{ChannelId, ProgramKey, ProgramRecord, ProgramTag};
//!
//! let start = Utc.with_ymd_and_hms(2024, 3, 1, 20, 0, 0).unwrap();
//! let end = Utc.with_ymd_and_hms(2024, 3, 1, 20, 30, 0).unwrap();
//! let record = ProgramRecord::new(start, end, "Evening News").with_broadcast_id(1001);
//!
//! let tag = ProgramTag::from_record(ChannelId(1), record).unwrap();
//! assert_eq!(tag.duration_secs(), 1800);
//! assert_eq!(
//!     tag.key(),
//!     ProgramKey::Broadcast { channel_id: ChannelId(1), broadcast_id: 1001 }
//! );
//! ```

pub mod error;
pub mod genre;
pub mod types;

pub use error::{EpgError, FetchError, FetchErrorCode};
pub use genre::GenreType;
pub use types::{
    Channel, ChannelId, ProgramKey, ProgramRecord, ProgramTag, Recording, Timer, TimerId,
};
