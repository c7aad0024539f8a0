//! Per-frame output handed to the rendering collaborator.

use std::fmt::Write;
use std::sync::Arc;

use serde::Serialize;
use tvguide_types::ProgramTag;

/// Cursor and scroll state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NavigationState {
    pub channel_offset: usize,
    pub channel_cursor: usize,
    pub block_offset: usize,
    pub block_cursor: usize,
    /// Effective page size (limited by the grid size).
    pub channels_per_page: usize,
    pub blocks_per_page: usize,
    /// Interpolated vertical scroll position in pixels.
    pub channel_scroll_px: f32,
    /// Interpolated horizontal scroll position in pixels.
    pub block_scroll_px: f32,
    pub wraparound: bool,
}

/// What a visible item shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "program", rename_all = "snake_case")]
pub enum ItemKind {
    Program(Arc<ProgramTag>),
    Gap,
}

/// An item overlapping the current page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisibleItem {
    /// Row on the page.
    pub row: usize,
    /// Absolute channel index.
    pub channel_index: usize,
    pub channel_number: u32,
    /// Start block relative to the page; negative if the item began earlier.
    pub block: isize,
    /// Width in blocks.
    pub width: usize,
    pub focused: bool,
    pub kind: ItemKind,
}

impl VisibleItem {
    pub fn title(&self) -> Option<&str> {
        match &self.kind {
            ItemKind::Program(tag) => Some(&tag.title),
            ItemKind::Gap => None,
        }
    }
}

/// Everything needed to draw the guide once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuideFrame {
    pub state: NavigationState,
    pub items: Vec<VisibleItem>,
    /// Diagnostic counters for an overlay.
    pub debug: String,
}

/// Consumer of guide frames.
pub trait GuideRenderer {
    fn render(&mut self, frame: &GuideFrame);
}

/// Renders frames as fixed-width text, one line per channel row.
#[derive(Debug, Default)]
pub struct TextRenderer {
    /// Characters per block.
    pub cell_width: usize,
    output: String,
}

impl TextRenderer {
    pub fn new(cell_width: usize) -> Self {
        Self {
            cell_width: cell_width.max(1),
            output: String::new(),
        }
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }
}

impl GuideRenderer for TextRenderer {
    fn render(&mut self, frame: &GuideFrame) {
        let bpp = frame.state.blocks_per_page as isize;
        let cell = self.cell_width.max(1);

        for row in 0..frame.state.channels_per_page {
            let mut items = frame.items.iter().filter(|i| i.row == row).peekable();
            let Some(first) = items.peek() else {
                continue;
            };
            let _ = write!(self.output, "{:>4} |", first.channel_number);

            for item in items {
                let start = item.block.max(0);
                let end = (item.block + item.width as isize).min(bpp);
                let chars = ((end - start).max(0) as usize * cell).saturating_sub(1);
                let label = item.title().unwrap_or("");
                let text: String = label.chars().chain(std::iter::repeat(' ')).take(chars).collect();
                if item.focused {
                    let _ = write!(self.output, "{}", text.to_uppercase());
                } else {
                    let _ = write!(self.output, "{}", text);
                }
                self.output.push('|');
            }
            self.output.push('\n');
        }
        let _ = writeln!(self.output, "{}", frame.debug);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tvguide_types::{ChannelId, ProgramRecord};

    fn frame() -> GuideFrame {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 20, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 3, 1, 20, 30, 0).unwrap();
        let tag = ProgramTag::from_record(ChannelId(1), ProgramRecord::new(start, end, "News"))
            .unwrap();

        GuideFrame {
            state: NavigationState {
                channel_offset: 0,
                channel_cursor: 0,
                block_offset: 0,
                block_cursor: 0,
                channels_per_page: 1,
                blocks_per_page: 4,
                channel_scroll_px: 0.0,
                block_scroll_px: 0.0,
                wraparound: true,
            },
            items: vec![
                VisibleItem {
                    row: 0,
                    channel_index: 0,
                    channel_number: 1,
                    block: -1,
                    width: 3,
                    focused: true,
                    kind: ItemKind::Program(Arc::new(tag)),
                },
                VisibleItem {
                    row: 0,
                    channel_index: 0,
                    channel_number: 1,
                    block: 2,
                    width: 2,
                    focused: false,
                    kind: ItemKind::Gap,
                },
            ],
            debug: "debug".into(),
        }
    }

    #[test]
    fn test_text_renderer() {
        let mut renderer = TextRenderer::new(4);
        renderer.render(&frame());
        let output = renderer.take_output();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines, vec!["   1 |NEWS   |       |", "debug"]);
        assert!(renderer.output().is_empty());
    }

    #[test]
    fn test_frame_serializes() {
        let json = serde_json::to_value(frame()).unwrap();
        assert_eq!(json["items"][0]["kind"]["kind"], "program");
        assert_eq!(json["items"][0]["kind"]["program"]["title"], "News");
        assert_eq!(json["items"][1]["kind"]["kind"], "gap");
    }
}
