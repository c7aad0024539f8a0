//! Channel × time-block index over a bounded guide window.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use log::debug;
use tvguide_types::{Channel, ProgramTag};

use crate::store::{ChannelSchedule, EpgStore, StoreData};

/// A run of contiguous cells sharing one program (or one gap).
#[derive(Debug, Clone)]
pub struct GridItem {
    /// First block of the run (absolute, from the window start).
    pub start_block: usize,
    /// Run length in blocks.
    pub width: usize,
    /// The program, or `None` for a gap.
    pub tag: Option<Arc<ProgramTag>>,
}

impl GridItem {
    /// One past the last block of the run.
    pub fn end_block(&self) -> usize {
        self.start_block + self.width
    }

    pub fn is_gap(&self) -> bool {
        self.tag.is_none()
    }

    pub fn contains_block(&self, block: usize) -> bool {
        self.start_block <= block && block < self.end_block()
    }
}

/// One channel row of the grid.
#[derive(Debug, Clone)]
pub struct GridRow {
    channel: Channel,
    cells: Vec<Option<Arc<ProgramTag>>>,
    items: Vec<GridItem>,
    /// Item index for every block.
    cell_item: Vec<usize>,
}

impl GridRow {
    fn build(channel: &Channel, schedule: Option<&ChannelSchedule>, window: &GridWindow) -> Self {
        let tags = schedule.map(|s| s.tags()).unwrap_or(&[]);

        // Single forward cursor: tags are ordered by start.
        let mut cursor = tags.partition_point(|t| t.end <= window.start);
        let mut cells = Vec::with_capacity(window.blocks);
        for block in 0..window.blocks {
            let at = window.block_time(block);
            while cursor < tags.len() && tags[cursor].end <= at {
                cursor += 1;
            }
            cells.push(tags.get(cursor).filter(|t| t.start <= at).cloned());
        }

        let mut items: Vec<GridItem> = Vec::new();
        let mut cell_item = Vec::with_capacity(cells.len());
        for (block, cell) in cells.iter().enumerate() {
            match items.last_mut() {
                Some(last) if same_cell(&last.tag, cell) => last.width += 1,
                _ => items.push(GridItem {
                    start_block: block,
                    width: 1,
                    tag: cell.clone(),
                }),
            }
            cell_item.push(items.len() - 1);
        }

        Self {
            channel: channel.clone(),
            cells,
            items,
            cell_item,
        }
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn items(&self) -> &[GridItem] {
        &self.items
    }

    pub fn item(&self, index: usize) -> Option<&GridItem> {
        self.items.get(index)
    }

    /// Program in a cell. Out-of-range blocks clamp to the last block.
    pub fn cell(&self, block: usize) -> Option<&Arc<ProgramTag>> {
        let last = self.cells.len().checked_sub(1)?;
        self.cells[block.min(last)].as_ref()
    }

    /// Index of the item covering a block. Out-of-range blocks clamp.
    pub fn item_index_at(&self, block: usize) -> Option<usize> {
        let last = self.cell_item.len().checked_sub(1)?;
        Some(self.cell_item[block.min(last)])
    }

    /// The item covering a block. Out-of-range blocks clamp.
    pub fn item_at(&self, block: usize) -> Option<&GridItem> {
        self.item_index_at(block).map(|i| &self.items[i])
    }

    /// The last item in the row that holds a program.
    pub fn last_program(&self) -> Option<&GridItem> {
        self.items.iter().rev().find(|i| !i.is_gap())
    }
}

fn same_cell(a: &Option<Arc<ProgramTag>>, b: &Option<Arc<ProgramTag>>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        _ => false,
    }
}

/// Time geometry of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub block_duration: Duration,
    pub blocks: usize,
}

impl GridWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, minutes_per_block: u32) -> Self {
        let block_duration = Duration::minutes(i64::from(minutes_per_block.max(1)));
        let span = (end - start).num_minutes().max(0);
        let blocks = (span / block_duration.num_minutes()) as usize;
        Self {
            start,
            end,
            block_duration,
            blocks,
        }
    }

    /// Start time of a block.
    pub fn block_time(&self, block: usize) -> DateTime<Utc> {
        self.start + self.block_duration * block as i32
    }

    /// Block containing `at`, clamped into the window.
    pub fn block_at(&self, at: DateTime<Utc>) -> usize {
        if at <= self.start || self.blocks == 0 {
            return 0;
        }
        let minutes = (at - self.start).num_minutes();
        let block = (minutes / self.block_duration.num_minutes()) as usize;
        block.min(self.blocks - 1)
    }
}

/// Dense channel × block matrix of program references.
#[derive(Debug, Clone)]
pub struct GridIndex {
    window: GridWindow,
    rows: Vec<GridRow>,
}

impl GridIndex {
    /// An index with no rows and no blocks.
    pub fn empty(window: GridWindow) -> Self {
        Self {
            window: GridWindow { blocks: 0, ..window },
            rows: Vec::new(),
        }
    }

    /// Build from a snapshot. The caller holds the read section for the whole walk.
    pub fn build(data: &StoreData, window: GridWindow) -> Self {
        let rows = data
            .channels()
            .visible()
            .map(|channel| GridRow::build(channel, data.schedule_for(channel), &window))
            .collect();
        Self { window, rows }
    }

    /// Build under a single read section of the store.
    pub fn build_from_store(store: &EpgStore, window: GridWindow) -> Self {
        let started = Instant::now();
        let index = {
            let snapshot = store.read();
            Self::build(&snapshot, window)
        };
        debug!(
            "Grid built: {} channels x {} blocks in {:?}",
            index.rows.len(),
            index.window.blocks,
            started.elapsed()
        );
        index
    }

    pub fn window(&self) -> &GridWindow {
        &self.window
    }

    pub fn blocks(&self) -> usize {
        self.window.blocks
    }

    pub fn channel_count(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[GridRow] {
        &self.rows
    }

    /// A row by index. Out-of-range indices clamp to the last row.
    pub fn row(&self, index: usize) -> Option<&GridRow> {
        let last = self.rows.len().checked_sub(1)?;
        self.rows.get(index.min(last))
    }
}
