//! Scheduled task management for the guide engine.
//!
//! This module provides:
//! - [`RefreshScheduler`]: Periodic guide refresh and cleanup worker

pub mod refresh_scheduler;

pub use refresh_scheduler::{
    RefreshScheduler, RefreshSchedulerConfig, SchedulerError, SchedulerState,
};
pub use crate::store::{CycleKind, RefreshReport};
