//! Cursor and scroll state machine over a [`GridIndex`].

use std::sync::Arc;

use chrono::{DateTime, Duration, Timelike, Utc};
use log::debug;
use tvguide_types::{EpgError, ProgramTag};

use super::frame::{GuideFrame, ItemKind, NavigationState, VisibleItem};
use super::index::{GridIndex, GridItem, GridWindow};
use super::scroll::ScrollAnimator;
use super::GridConfig;
use crate::store::EpgStore;

/// Right-hand neighbours this close (in blocks) win over the left item when
/// switching rows.
pub const SHORT_GAP: usize = 5;

/// Paged guide navigation.
///
/// The state is exactly `(channel_offset, channel_cursor, block_offset,
/// block_cursor)`. The selected item is whichever item of the selected row
/// covers `block_offset + block_cursor`.
pub struct GridNavigator {
    config: GridConfig,
    index: GridIndex,

    /// Requested window, snapped to the half hour.
    window: Option<(DateTime<Utc>, DateTime<Utc>)>,

    /// Store generation the index was built from.
    built_generation: Option<u64>,
    dirty: bool,

    channel_offset: usize,
    channel_cursor: usize,
    block_offset: usize,
    block_cursor: usize,

    channel_scroll: ScrollAnimator,
    block_scroll: ScrollAnimator,
}

impl GridNavigator {
    pub fn new(config: GridConfig) -> Self {
        let placeholder = GridWindow::new(DateTime::<Utc>::MIN_UTC, DateTime::<Utc>::MIN_UTC, 1);
        Self {
            channel_scroll: ScrollAnimator::new(config.scroll_duration_ms),
            block_scroll: ScrollAnimator::new(config.scroll_duration_ms),
            config,
            index: GridIndex::empty(placeholder),
            window: None,
            built_generation: None,
            dirty: true,
            channel_offset: 0,
            channel_cursor: 0,
            block_offset: 0,
            block_cursor: 0,
        }
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn index(&self) -> &GridIndex {
        &self.index
    }

    /// Set the time window. Both ends snap down to the half hour.
    pub fn set_window(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), EpgError> {
        let start = snap_half_hour(start);
        let end = snap_half_hour(end);
        if start >= end {
            return Err(EpgError::InvalidWindow { start, end });
        }
        debug!("Guide window set: {} .. {}", start, end);
        self.window = Some((start, end));
        self.dirty = true;
        Ok(())
    }

    /// Change the page layout; the grid is rebuilt on the next refresh.
    pub fn set_page_layout(
        &mut self,
        channels_per_page: usize,
        blocks_per_page: usize,
        visible_width: f32,
    ) {
        self.config.channels_per_page = channels_per_page.max(1);
        self.config.blocks_per_page = blocks_per_page.max(1);
        self.config.visible_width = visible_width;
        self.dirty = true;
    }

    /// True if the window, layout or store contents changed since the last build.
    pub fn needs_rebuild(&self, store: &EpgStore) -> bool {
        self.dirty || self.built_generation != Some(store.generation())
    }

    /// Rebuild if needed. Returns true if the grid was rebuilt.
    pub fn refresh(&mut self, store: &EpgStore) -> bool {
        if !self.needs_rebuild(store) {
            return false;
        }
        self.rebuild(store);
        true
    }

    /// Rebuild the index from one consistent store snapshot and clamp the cursor.
    pub fn rebuild(&mut self, store: &EpgStore) {
        let generation = store.generation();
        self.index = match self.window {
            Some((start, end)) => GridIndex::build_from_store(
                store,
                GridWindow::new(start, end, self.config.minutes_per_block),
            ),
            None => GridIndex::empty(*self.index.window()),
        };
        self.built_generation = Some(generation);
        self.dirty = false;
        self.clamp_state();
    }

    fn clamp_state(&mut self) {
        let cpp = self.channels_per_page();
        let bpp = self.blocks_per_page();
        let channels = self.index.channel_count();
        let blocks = self.index.blocks();

        self.channel_offset = self.channel_offset.min(channels.saturating_sub(cpp));
        self.channel_cursor = self.channel_cursor.min(cpp.saturating_sub(1));
        self.block_offset = self.block_offset.min(blocks.saturating_sub(bpp));
        self.block_cursor = self.block_cursor.min(bpp.saturating_sub(1));

        self.channel_scroll
            .jump_to(self.channel_offset as f32 * self.config.channel_height);
        self.block_scroll
            .jump_to(self.block_offset as f32 * self.block_size());
    }

    /// Rows on one page, limited by the number of channels.
    pub fn channels_per_page(&self) -> usize {
        self.config.channels_per_page.min(self.index.channel_count())
    }

    /// Blocks on one page, limited by the number of blocks.
    pub fn blocks_per_page(&self) -> usize {
        self.config.blocks_per_page.min(self.index.blocks())
    }

    /// Pixel width of one block.
    pub fn block_size(&self) -> f32 {
        self.config.visible_width / self.config.blocks_per_page.max(1) as f32
    }

    fn selected_row(&self) -> usize {
        self.channel_offset + self.channel_cursor
    }

    pub fn selected_channel_index(&self) -> usize {
        self.selected_row()
    }

    /// Absolute block under the cursor.
    pub fn selected_block(&self) -> usize {
        self.block_offset + self.block_cursor
    }

    fn current_item(&self) -> Option<(usize, &GridItem)> {
        let row = self.index.row(self.selected_row())?;
        let idx = row.item_index_at(self.selected_block())?;
        row.item(idx).map(|item| (idx, item))
    }

    /// The selected item, gap or program.
    pub fn selected_item(&self) -> Option<&GridItem> {
        self.current_item().map(|(_, item)| item)
    }

    /// The selected program, if the cursor is not on a gap.
    pub fn selected_program(&self) -> Option<Arc<ProgramTag>> {
        self.selected_item().and_then(|item| item.tag.clone())
    }

    /// Relative cursor position that lands on `item` within the current page.
    fn cursor_for(&self, item_start: usize) -> usize {
        let cursor = item_start.max(self.block_offset) - self.block_offset;
        cursor.min(self.blocks_per_page().saturating_sub(1))
    }

    fn scroll_to_channel_offset(&mut self, offset: usize) {
        let size = self.config.channel_height;
        let range = (self.config.channels_per_page / 4).max(1) as f32;
        self.channel_offset = offset;
        self.channel_scroll.scroll_to(offset as f32 * size, size * range);
    }

    fn scroll_to_block_offset(&mut self, offset: usize) {
        let offset = offset.min(self.index.blocks().saturating_sub(self.blocks_per_page()));
        let size = self.block_size();
        let range = self.config.blocks_per_page.max(1) as f32;
        self.block_offset = offset;
        self.block_scroll.scroll_to(offset as f32 * size, size * range);
    }

    /// Pick the item of `row` to land on when moving vertically.
    ///
    /// The candidate is the item under the cursor. A right-hand neighbour
    /// starting within [`SHORT_GAP`] blocks wins if it is not farther than the
    /// candidate's own start and still fits on the page.
    pub fn closest_item(&self, row: usize) -> Option<usize> {
        self.closest_item_from(row, self.current_end())
    }

    /// End block of the selected item.
    fn current_end(&self) -> Option<usize> {
        self.current_item().map(|(_, item)| item.end_block())
    }

    /// [`closest_item`](Self::closest_item) relative to an item that ended at
    /// `prev_end`, captured before the channel offset moved.
    fn closest_item_from(&self, row: usize, prev_end: Option<usize>) -> Option<usize> {
        let target = self.index.row(row)?;
        let abs = self.selected_block();
        let idx = target.item_index_at(abs)?;
        let candidate = target.item(idx)?;

        if candidate.start_block == abs || prev_end == Some(candidate.end_block()) {
            return Some(idx);
        }

        let left = abs - candidate.start_block.min(abs);
        let right = target
            .item(idx + 1)
            .map(|next| next.start_block - abs)
            .unwrap_or(usize::MAX);

        if right <= SHORT_GAP && right <= left && self.block_cursor + right < self.blocks_per_page() {
            Some(idx + 1)
        } else {
            Some(idx)
        }
    }

    /// Move the selection to `cursor` on the current page.
    ///
    /// `prev_end` is the end block of the item selected before the move.
    fn set_channel(&mut self, cursor: usize, prev_end: Option<usize>) {
        let row = self.channel_offset + cursor;
        let at_edge = self.selected_block() == 0
            || prev_end.map_or(true, |end| end == self.index.blocks());

        let item_idx = if at_edge {
            self.index
                .row(row)
                .and_then(|r| r.item_index_at(self.selected_block()))
        } else {
            self.closest_item_from(row, prev_end)
        };

        self.channel_cursor = cursor;
        if let Some(start) = item_idx
            .and_then(|i| self.index.row(row).and_then(|r| r.item(i)))
            .map(|item| item.start_block)
        {
            self.block_cursor = self.cursor_for(start);
        }
    }

    pub fn on_up(&mut self) -> bool {
        let channels = self.index.channel_count();
        if channels == 0 {
            return false;
        }
        let prev_end = self.current_end();

        if self.channel_cursor > 0 {
            self.set_channel(self.channel_cursor - 1, prev_end);
        } else if self.channel_offset > 0 {
            self.scroll_to_channel_offset(self.channel_offset - 1);
            self.set_channel(0, prev_end);
        } else if self.config.wraparound {
            let offset = channels - self.channels_per_page();
            self.scroll_to_channel_offset(offset);
            self.set_channel(channels - offset - 1, prev_end);
        } else {
            return false;
        }
        true
    }

    pub fn on_down(&mut self) -> bool {
        let channels = self.index.channel_count();
        if channels == 0 {
            return false;
        }
        let prev_end = self.current_end();

        if self.selected_row() + 1 < channels {
            if self.channel_cursor + 1 < self.channels_per_page() {
                self.set_channel(self.channel_cursor + 1, prev_end);
            } else {
                self.scroll_to_channel_offset(self.channel_offset + 1);
                self.set_channel(self.channels_per_page() - 1, prev_end);
            }
        } else if self.config.wraparound {
            self.scroll_to_channel_offset(0);
            self.set_channel(0, prev_end);
        } else {
            return false;
        }
        true
    }

    pub fn on_right(&mut self) -> bool {
        let bpp = self.blocks_per_page();
        let blocks = self.index.blocks();
        let bo = self.block_offset;
        let page_end = bo + bpp;

        let Some(row) = self.index.row(self.selected_row()) else {
            return false;
        };
        let Some((idx, item)) = row
            .item_index_at(self.selected_block())
            .and_then(|i| row.item(i).map(|item| (i, item)))
        else {
            return false;
        };

        // Not at the page edge: select the next item directly.
        if item.end_block() < page_end {
            let Some(next) = row.item(idx + 1) else {
                return false;
            };
            self.block_cursor = self.cursor_for(next.start_block);
            return true;
        }

        if page_end >= blocks {
            return false;
        }

        // The item runs past the page, or its neighbour starts on the edge.
        let target = if item.end_block() > page_end {
            item
        } else {
            match row.item(idx + 1) {
                Some(next) => next,
                None => return false,
            }
        };
        let (start, end, width) = (target.start_block, target.end_block(), target.width);

        let new_offset = if width <= bpp {
            end - bpp
        } else {
            (bo + bpp).min(end - bpp)
        };
        self.scroll_to_block_offset(new_offset);
        self.block_cursor = self.cursor_for(start);
        true
    }

    pub fn on_left(&mut self) -> bool {
        let bpp = self.blocks_per_page();
        let bo = self.block_offset;

        let Some(row) = self.index.row(self.selected_row()) else {
            return false;
        };
        let Some((idx, item)) = row
            .item_index_at(self.selected_block())
            .and_then(|i| row.item(i).map(|item| (i, item)))
        else {
            return false;
        };

        // Not at the page edge: select the previous item directly.
        if item.start_block > bo {
            let Some(prev) = idx.checked_sub(1).and_then(|i| row.item(i)) else {
                return false;
            };
            self.block_cursor = self.cursor_for(prev.start_block);
            return true;
        }

        let target = if item.start_block < bo {
            item
        } else {
            if bo == 0 {
                return false;
            }
            match idx.checked_sub(1).and_then(|i| row.item(i)) {
                Some(prev) => prev,
                None => return false,
            }
        };
        let (start, width) = (target.start_block, target.width);

        let new_offset = if width <= bpp {
            start
        } else {
            bo.saturating_sub(bpp).max(start)
        };
        self.scroll_to_block_offset(new_offset);
        self.block_cursor = self.cursor_for(start);
        true
    }

    /// Scroll channels by `amount` rows, clamped.
    pub fn channel_scroll(&mut self, amount: isize) {
        let max = self
            .index
            .channel_count()
            .saturating_sub(self.channels_per_page());
        let offset = (self.channel_offset as isize + amount).clamp(0, max as isize) as usize;
        self.scroll_to_channel_offset(offset);
    }

    pub fn page_up(&mut self) {
        if self.channel_offset == 0 {
            let prev_end = self.current_end();
            self.set_channel(0, prev_end);
        } else {
            self.channel_scroll(-(self.channels_per_page() as isize));
        }
    }

    pub fn page_down(&mut self) {
        let channels = self.index.channel_count();
        if channels == 0 {
            return;
        }
        let cpp = self.channels_per_page();
        if self.channel_offset == channels - cpp {
            let prev_end = self.current_end();
            self.set_channel(channels - self.channel_offset - 1, prev_end);
        } else {
            self.channel_scroll(cpp as isize);
        }
    }

    /// Select a channel row by absolute index, scrolling as needed.
    pub fn select_channel(&mut self, index: usize) {
        let channels = self.index.channel_count();
        if index >= channels {
            return;
        }
        let cpp = self.channels_per_page();
        let prev_end = self.current_end();

        if index >= self.channel_offset && index < self.channel_offset + cpp {
            self.set_channel(index - self.channel_offset, prev_end);
        } else if index < cpp {
            self.scroll_to_channel_offset(0);
            self.set_channel(index, prev_end);
        } else if index < channels - cpp {
            self.scroll_to_channel_offset(index + 1 - cpp);
            self.set_channel(cpp - 1, prev_end);
        } else {
            self.scroll_to_channel_offset(channels - cpp);
            self.set_channel(index - (channels - cpp), prev_end);
        }
    }

    /// Scroll horizontally by `amount` blocks, clamped.
    pub fn programmes_scroll(&mut self, amount: isize) {
        let offset = (self.block_offset as isize + amount).max(0) as usize;
        self.scroll_to_block_offset(offset);
    }

    /// Skip forward or back by whole hours.
    pub fn skip_hours(&mut self, hours: i64) {
        let blocks = hours * 60 / i64::from(self.config.minutes_per_block.max(1));
        self.programmes_scroll(blocks as isize);
    }

    pub fn go_to_begin(&mut self) {
        self.scroll_to_block_offset(0);
        self.block_cursor = 0;
    }

    /// Scroll to the last program of the selected row and select it.
    pub fn go_to_end(&mut self) {
        let bpp = self.blocks_per_page();
        let blocks = self.index.blocks();

        let last = self
            .index
            .row(self.selected_row())
            .and_then(|row| row.last_program())
            .map(|item| (item.start_block, item.end_block(), item.width));

        let (offset, cursor_block) = match last {
            Some((start, _, width)) if width > bpp => (start, start),
            Some((start, end, _)) => (end.saturating_sub(bpp), start),
            None => (blocks.saturating_sub(bpp), blocks.saturating_sub(1)),
        };
        self.scroll_to_block_offset(offset);
        self.block_cursor = self.cursor_for(cursor_block);
    }

    /// Scroll so the page starts half an hour before `now`.
    pub fn go_to_now(&mut self, now: DateTime<Utc>) {
        let start = self.index.window().start;
        let minutes = (now - start - Duration::minutes(30)).num_minutes().max(0);
        let offset = minutes / i64::from(self.config.minutes_per_block.max(1));
        self.scroll_to_block_offset(offset as usize);
    }

    /// Advance both scroll animations.
    pub fn tick(&mut self, now_ms: u64) {
        self.channel_scroll.tick(now_ms);
        self.block_scroll.tick(now_ms);
    }

    pub fn is_scrolling(&self) -> bool {
        self.channel_scroll.is_animating() || self.block_scroll.is_animating()
    }

    /// Number of channel pages.
    pub fn page_count(&self) -> usize {
        let cpp = self.config.channels_per_page.max(1);
        (self.index.channel_count() + cpp - 1) / cpp
    }

    /// One-based page of the selected channel.
    pub fn current_page(&self) -> usize {
        1 + self.selected_row() / self.config.channels_per_page.max(1)
    }

    /// One-based position of the selected channel.
    pub fn position(&self) -> usize {
        1 + self.selected_row()
    }

    pub fn state(&self) -> NavigationState {
        NavigationState {
            channel_offset: self.channel_offset,
            channel_cursor: self.channel_cursor,
            block_offset: self.block_offset,
            block_cursor: self.block_cursor,
            channels_per_page: self.channels_per_page(),
            blocks_per_page: self.blocks_per_page(),
            channel_scroll_px: self.channel_scroll.position(),
            block_scroll_px: self.block_scroll.position(),
            wraparound: self.config.wraparound,
        }
    }

    /// Everything the renderer needs for one frame.
    pub fn frame(&self) -> GuideFrame {
        let state = self.state();
        let page_start = self.block_offset;
        let page_end = page_start + state.blocks_per_page;
        let selected_row = self.selected_row();
        let selected_block = self.selected_block();

        let mut items = Vec::new();
        for page_row in 0..state.channels_per_page {
            let channel_index = self.channel_offset + page_row;
            let Some(row) = self.index.rows().get(channel_index) else {
                break;
            };
            for item in row.items() {
                if item.end_block() <= page_start || item.start_block >= page_end {
                    continue;
                }
                items.push(VisibleItem {
                    row: page_row,
                    channel_index,
                    channel_number: row.channel().number,
                    block: item.start_block as isize - page_start as isize,
                    width: item.width,
                    focused: channel_index == selected_row && item.contains_block(selected_block),
                    kind: match &item.tag {
                        Some(tag) => ItemKind::Program(Arc::clone(tag)),
                        None => ItemKind::Gap,
                    },
                });
            }
        }

        let debug = format!(
            "Channel: {}/{} (offset {}, cursor {}) Block: {}/{} (offset {}, cursor {})",
            self.position(),
            self.index.channel_count(),
            self.channel_offset,
            self.channel_cursor,
            selected_block,
            self.index.blocks(),
            self.block_offset,
            self.block_cursor
        );

        GuideFrame {
            state,
            items,
            debug,
        }
    }
}

fn snap_half_hour(at: DateTime<Utc>) -> DateTime<Utc> {
    let minute = if at.minute() >= 30 { 30 } else { 0 };
    at.with_minute(minute)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tvguide_types::{Channel, ChannelId, ProgramRecord};

    fn at(hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, min, 0).unwrap()
    }

    /// Block `b` of a window starting at 18:00 with 5-minute blocks.
    fn block(b: u32) -> DateTime<Utc> {
        at(18, 0) + Duration::minutes(i64::from(b) * 5)
    }

    fn config(channels_per_page: usize, blocks_per_page: usize) -> GridConfig {
        GridConfig {
            minutes_per_block: 5,
            blocks_per_page,
            channels_per_page,
            visible_width: blocks_per_page as f32 * 10.0,
            channel_height: 40.0,
            scroll_duration_ms: 0,
            wraparound: true,
        }
    }

    /// Store with one row per entry; each row is a list of `(start, end, title)` in blocks.
    fn store(rows: &[&[(u32, u32, &str)]]) -> EpgStore {
        let store = EpgStore::default();
        let channels = (0..rows.len() as u32)
            .map(|i| Channel::new(i + 1, i + 100, format!("Ch {}", i + 1)))
            .collect();
        store.set_channels(channels);
        for (i, programs) in rows.iter().enumerate() {
            for &(s, e, title) in programs.iter() {
                store
                    .upsert(
                        ChannelId(i as u32 + 1),
                        ProgramRecord::new(block(s), block(e), title),
                    )
                    .unwrap();
            }
        }
        store
    }

    /// Navigator over a 3-hour window (36 blocks).
    fn navigator(store: &EpgStore, cpp: usize, bpp: usize) -> GridNavigator {
        let mut nav = GridNavigator::new(config(cpp, bpp));
        nav.set_window(at(18, 0), at(21, 0)).unwrap();
        assert!(nav.refresh(store));
        nav
    }

    fn title(nav: &GridNavigator) -> Option<String> {
        nav.selected_program().map(|t| t.title.clone())
    }

    #[test]
    fn test_right_moves_within_page() {
        let store = store(&[&[(0, 2, "A"), (2, 4, "B"), (4, 36, "C")]]);
        let mut nav = navigator(&store, 4, 6);

        assert_eq!(title(&nav).as_deref(), Some("A"));
        assert!(nav.on_right());
        assert_eq!(title(&nav).as_deref(), Some("B"));
        assert_eq!(nav.state().block_cursor, 2);
        assert!(nav.on_right());
        assert_eq!(title(&nav).as_deref(), Some("C"));
        assert_eq!(nav.state().block_offset, 0);
    }

    #[test]
    fn test_right_at_page_edge_scrolls_one_page() {
        // A fills the page up to its last block, where the wide item B starts.
        let store = store(&[&[(0, 5, "A"), (5, 20, "B"), (20, 36, "C")]]);
        let mut nav = navigator(&store, 4, 6);

        assert!(nav.on_right());
        assert_eq!(nav.state().block_cursor, 5);
        let before = nav.selected_program().unwrap();

        assert!(nav.on_right());
        assert_eq!(nav.state().block_offset, 6);
        let after = nav.selected_program().unwrap();
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(nav.state().block_cursor, 0);
    }

    #[test]
    fn test_right_reveals_narrow_item() {
        // B sits on the page edge and is narrower than a page.
        let store = store(&[&[(0, 6, "A"), (6, 9, "B"), (9, 36, "C")]]);
        let mut nav = navigator(&store, 4, 6);

        assert!(nav.on_right());
        assert_eq!(title(&nav).as_deref(), Some("B"));
        assert_eq!(nav.state().block_offset, 3);
        assert_eq!(nav.state().block_cursor, 3);
    }

    #[test]
    fn test_right_stops_at_grid_end() {
        let store = store(&[&[(0, 36, "Marathon")]]);
        let mut nav = navigator(&store, 4, 6);
        nav.programmes_scroll(100);
        assert_eq!(nav.state().block_offset, 30);
        assert!(!nav.on_right());
    }

    #[test]
    fn test_go_to_end_selects_last_program() {
        let store = store(&[&[(0, 10, "A"), (10, 14, "B")]]);
        let mut nav = navigator(&store, 4, 6);
        nav.go_to_end();
        assert_eq!(nav.state().block_offset, 8);
        assert_eq!(nav.state().block_cursor, 2);
        assert_eq!(title(&nav).as_deref(), Some("B"));

        // A last program wider than a page is shown from its start.
        let store = self::store(&[&[(0, 4, "A"), (4, 36, "Marathon")]]);
        let mut nav = navigator(&store, 4, 6);
        nav.go_to_end();
        assert_eq!(nav.state().block_offset, 4);
        assert_eq!(title(&nav).as_deref(), Some("Marathon"));
    }

    #[test]
    fn test_left_mirrors_right() {
        let store = store(&[&[(0, 5, "A"), (5, 20, "B"), (20, 36, "C")]]);
        let mut nav = navigator(&store, 4, 6);

        assert!(nav.on_right());
        assert!(nav.on_right());
        assert_eq!(nav.state().block_offset, 6);

        // B started before the page: scroll back at most one page.
        assert!(nav.on_left());
        assert_eq!(nav.state().block_offset, 5);
        assert_eq!(title(&nav).as_deref(), Some("B"));

        // B now starts on the page edge: select A, narrow, scroll to its start.
        assert!(nav.on_left());
        assert_eq!(nav.state().block_offset, 0);
        assert_eq!(title(&nav).as_deref(), Some("A"));
        assert_eq!(nav.state().block_cursor, 0);

        assert!(!nav.on_left());
    }

    #[test]
    fn test_up_down_wraparound() {
        let row: &[(u32, u32, &str)] = &[(0, 36, "X")];
        let rows = vec![row; 5];
        let store = store(&rows);
        let mut nav = navigator(&store, 3, 6);

        assert!(nav.on_down());
        assert!(nav.on_down());
        assert_eq!(nav.selected_channel_index(), 2);
        assert!(nav.on_down());
        assert_eq!(nav.state().channel_offset, 1);
        assert_eq!(nav.state().channel_cursor, 2);
        assert!(nav.on_down());
        assert_eq!(nav.selected_channel_index(), 4);

        // Wrap to the top.
        assert!(nav.on_down());
        assert_eq!(nav.selected_channel_index(), 0);
        assert_eq!(nav.state().channel_offset, 0);

        // Wrap to the bottom.
        assert!(nav.on_up());
        assert_eq!(nav.selected_channel_index(), 4);
        assert_eq!(nav.state().channel_offset, 2);
        assert_eq!(nav.state().channel_cursor, 2);
    }

    #[test]
    fn test_no_wraparound() {
        let store = store(&[&[(0, 36, "X")], &[(0, 36, "Y")]]);
        let mut nav = GridNavigator::new(GridConfig {
            wraparound: false,
            ..config(4, 6)
        });
        nav.set_window(at(18, 0), at(21, 0)).unwrap();
        nav.refresh(&store);

        assert!(!nav.on_up());
        assert!(nav.on_down());
        assert!(!nav.on_down());
        assert_eq!(title(&nav).as_deref(), Some("Y"));
    }

    #[test]
    fn test_closest_item_prefers_near_right_neighbour() {
        let store = store(&[
            &[(0, 3, "A"), (3, 12, "B"), (12, 36, "C")],
            &[(0, 4, "D"), (4, 36, "E")],
            &[(0, 1, "F"), (1, 36, "G")],
        ]);
        let mut nav = navigator(&store, 3, 12);

        assert!(nav.on_right());
        assert_eq!(title(&nav).as_deref(), Some("B"));

        // Row 1 at block 3: D started 3 blocks back, E starts 1 block ahead.
        assert!(nav.on_down());
        assert_eq!(title(&nav).as_deref(), Some("E"));
        assert_eq!(nav.state().block_cursor, 4);

        // E runs to the end of the grid, so the item under the cursor wins.
        assert!(nav.on_down());
        assert_eq!(title(&nav).as_deref(), Some("G"));
        assert_eq!(nav.state().block_cursor, 1);
    }

    #[test]
    fn test_closest_item_same_when_channel_list_scrolls() {
        let rows: &[&[(u32, u32, &str)]] = &[
            &[(0, 3, "A"), (3, 12, "B"), (12, 36, "C")],
            &[(0, 4, "D"), (4, 36, "E")],
        ];
        let store = store(rows);

        for cpp in [1, 3] {
            let mut nav = navigator(&store, cpp, 12);
            assert!(nav.on_right());
            assert!(nav.on_down());
            assert_eq!(title(&nav).as_deref(), Some("E"), "channels_per_page {}", cpp);
            assert_eq!(nav.selected_channel_index(), 1);
            assert_eq!(nav.state().block_cursor, 4);
        }

        // Scrolling back up lands on the same item as before.
        let mut nav = navigator(&store, 1, 12);
        assert!(nav.on_right());
        assert!(nav.on_down());
        assert!(nav.on_up());
        assert_eq!(nav.state().channel_offset, 0);
        assert_eq!(title(&nav).as_deref(), Some("B"));
    }

    #[test]
    fn test_empty_row_never_panics() {
        let store = store(&[&[(0, 12, "A"), (12, 36, "B")], &[]]);
        let mut nav = navigator(&store, 4, 6);

        assert!(nav.on_right());
        assert!(nav.on_down());
        assert!(nav.selected_program().is_none());
        assert!(nav.selected_item().unwrap().is_gap());
        assert_eq!(nav.closest_item(1), Some(0));
        assert_eq!(nav.closest_item(42), Some(0));

        // Gaps are navigable items too.
        assert!(nav.on_right());
        assert_eq!(nav.state().block_offset, 12);
        assert!(nav.on_left());
        assert_eq!(nav.state().block_offset, 6);
    }

    #[test]
    fn test_empty_store() {
        let store = EpgStore::default();
        let mut nav = navigator(&store, 4, 6);
        assert!(!nav.on_up());
        assert!(!nav.on_down());
        assert!(!nav.on_left());
        assert!(!nav.on_right());
        nav.page_down();
        nav.go_to_end();
        assert!(nav.frame().items.is_empty());
    }

    #[test]
    fn test_short_grid_shrinks_page() {
        let store = store(&[&[(0, 2, "A"), (2, 4, "B")]]);
        let mut nav = GridNavigator::new(config(4, 24));
        nav.set_window(at(18, 0), at(18, 30)).unwrap();
        nav.refresh(&store);

        assert_eq!(nav.blocks_per_page(), 6);
        assert!(nav.on_right());
        assert!(nav.on_right());
        assert!(nav.selected_item().unwrap().is_gap());
        assert!(!nav.on_right());
    }

    #[test]
    fn test_select_channel_and_pages() {
        let row: &[(u32, u32, &str)] = &[(0, 36, "X")];
        let rows = vec![row; 10];
        let store = store(&rows);
        let mut nav = navigator(&store, 4, 6);

        assert_eq!(nav.page_count(), 3);
        nav.select_channel(9);
        assert_eq!(nav.selected_channel_index(), 9);
        assert_eq!(nav.state().channel_offset, 6);
        assert_eq!(nav.current_page(), 3);

        nav.select_channel(5);
        assert_eq!(nav.selected_channel_index(), 5);
        nav.select_channel(1);
        assert_eq!(nav.state().channel_offset, 0);
        assert_eq!(nav.position(), 2);

        nav.page_down();
        assert_eq!(nav.state().channel_offset, 4);
        nav.page_down();
        nav.page_down();
        assert_eq!(nav.state().channel_offset, 6);
        assert_eq!(nav.selected_channel_index(), 9);
        nav.page_up();
        assert_eq!(nav.state().channel_offset, 2);
    }

    #[test]
    fn test_go_to_now_and_begin() {
        let store = store(&[&[(0, 36, "X")]]);
        let mut nav = navigator(&store, 4, 6);

        nav.go_to_now(at(19, 30));
        assert_eq!(nav.state().block_offset, 12);
        nav.go_to_now(at(23, 0));
        assert_eq!(nav.state().block_offset, 30);
        nav.go_to_begin();
        assert_eq!(nav.state().block_offset, 0);
        assert_eq!(nav.selected_block(), 0);
    }

    #[test]
    fn test_window_snaps_and_validates() {
        let store = store(&[&[(0, 36, "X")]]);
        let mut nav = GridNavigator::new(config(4, 6));
        nav.set_window(at(18, 17), at(20, 45)).unwrap();
        nav.refresh(&store);
        assert_eq!(nav.index().window().start, at(18, 0));
        assert_eq!(nav.index().window().end, at(20, 30));
        assert_eq!(nav.index().blocks(), 30);

        assert!(nav.set_window(at(18, 10), at(18, 20)).is_err());
    }

    #[test]
    fn test_rebuild_on_store_change() {
        let store = store(&[&[(0, 36, "X")]]);
        let mut nav = navigator(&store, 4, 6);
        assert!(!nav.refresh(&store));

        store
            .upsert(ChannelId(1), ProgramRecord::new(block(0), block(36), "Y"))
            .unwrap();
        assert!(nav.needs_rebuild(&store));
        assert!(nav.refresh(&store));
        assert_eq!(title(&nav).as_deref(), Some("Y"));
    }

    #[test]
    fn test_frame_marks_focus() {
        let store = store(&[&[(0, 3, "A"), (3, 36, "B")], &[(0, 36, "C")]]);
        let mut nav = navigator(&store, 4, 6);
        nav.on_right();

        let frame = nav.frame();
        assert_eq!(frame.items.len(), 3);
        let focused: Vec<_> = frame.items.iter().filter(|i| i.focused).collect();
        assert_eq!(focused.len(), 1);
        assert!(matches!(&focused[0].kind, ItemKind::Program(tag) if tag.title == "B"));
        assert!(frame.debug.contains("Block: 3/36"));
    }

    #[test]
    fn test_scroll_animates_with_duration() {
        let row: &[(u32, u32, &str)] = &[(0, 36, "X")];
        let rows = vec![row; 6];
        let store = store(&rows);
        let mut nav = GridNavigator::new(GridConfig {
            scroll_duration_ms: 100,
            ..config(2, 6)
        });
        nav.set_window(at(18, 0), at(21, 0)).unwrap();
        nav.refresh(&store);

        nav.tick(0);
        nav.on_down();
        nav.on_down();
        assert!(nav.is_scrolling());
        nav.tick(50);
        assert!((nav.state().channel_scroll_px - 20.0).abs() < 0.01);
        nav.tick(200);
        assert!(!nav.is_scrolling());
        assert_eq!(nav.state().channel_scroll_px, 40.0);
    }
}
