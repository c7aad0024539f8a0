//! Guide grid: windowed channel × time-block index and paged navigation.
//!
//! - [`GridIndex`]: dense matrix of program references built from one store snapshot
//! - [`GridNavigator`]: cursor / scroll state machine driven by key presses
//! - [`ScrollAnimator`]: per-tick scroll interpolation
//! - [`GuideFrame`] / [`GuideRenderer`]: per-frame output for the renderer

mod frame;
mod index;
mod navigator;
mod scroll;

pub use frame::{GuideFrame, GuideRenderer, ItemKind, NavigationState, TextRenderer, VisibleItem};
pub use index::{GridIndex, GridItem, GridRow, GridWindow};
pub use navigator::{GridNavigator, SHORT_GAP};
pub use scroll::ScrollAnimator;

/// Grid geometry and behaviour.
#[derive(Debug, Clone, PartialEq)]
pub struct GridConfig {
    /// Time covered by one block.
    pub minutes_per_block: u32,
    pub blocks_per_page: usize,
    pub channels_per_page: usize,
    /// Pixel width of the programme area.
    pub visible_width: f32,
    /// Pixel height of one channel row.
    pub channel_height: f32,
    pub scroll_duration_ms: u32,
    /// Up/down wrap around the channel list.
    pub wraparound: bool,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            minutes_per_block: 5,
            blocks_per_page: 24,
            channels_per_page: 8,
            visible_width: 1200.0,
            channel_height: 60.0,
            scroll_duration_ms: 200,
            wraparound: true,
        }
    }
}
