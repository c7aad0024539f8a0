//! Electronic program guide engine.
//!
//! - [`store`]: concurrent per-channel schedule store with refresh and cleanup cycles
//! - [`grid`]: guide grid index and cursor / scroll navigation
//! - [`search`]: multi-predicate search with timer, recording and repeat dedup
//! - [`scheduler`]: background worker driving store refresh and cleanup
//! - [`source`]: backend, timer and recording collaborators

pub mod channels;
pub mod config;
pub mod grid;
pub mod logging;
pub mod scheduler;
pub mod search;
pub mod source;
pub mod store;

pub use channels::{ChannelList, RenumberReport};
pub use config::{ConfigError, EngineConfig};
pub use grid::{GridConfig, GridIndex, GridNavigator, GuideFrame, GuideRenderer};
pub use scheduler::{RefreshScheduler, RefreshSchedulerConfig};
pub use search::{SearchFilter, SearchResult};
pub use source::{EpgSource, JsonFileSource, RecordingSource, TimerSource};
pub use store::{EpgStore, RefreshReport, ScheduleRef, StoreConfig, StoreHandle};
