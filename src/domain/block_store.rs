use crate::domain::error::ScheduleError;
use crate::domain::grid::GridIndex;
use crate::domain::models::{Block, BlockDraft, BlockPatch, StaleBlock, next_block_id};
use std::ops::Range;

/// Blocks of one day. Every mutation keeps the absolute slot ranges of all
/// blocks pairwise disjoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockStore {
    grid: GridIndex,
    blocks: Vec<Block>,
}

impl BlockStore {
    pub fn new(grid: GridIndex) -> Self {
        Self {
            grid,
            blocks: Vec::new(),
        }
    }

    /// Rebuilds a store from persisted blocks, keeping their ids. Blocks that
    /// do not fit the current grid, or collide with a block restored before
    /// them, come back as [`StaleBlock`]s instead of being inserted.
    pub fn restore(grid: GridIndex, blocks: Vec<Block>) -> (Self, Vec<StaleBlock>) {
        let mut store = Self::new(grid);
        let mut stale = Vec::new();

        for block in blocks {
            let range = match store
                .grid
                .block_range(block.hour, block.start_minute, block.duration_minutes)
            {
                Ok(range) => range,
                Err(reason) => {
                    stale.push(StaleBlock { block, reason });
                    continue;
                }
            };
            if store.find_overlaps(range.start, range.end, None) {
                stale.push(StaleBlock {
                    block,
                    reason: ScheduleError::Conflict {
                        start: range.start,
                        end: range.end,
                    },
                });
                continue;
            }
            store.blocks.push(block);
        }

        (store, stale)
    }

    pub fn grid(&self) -> &GridIndex {
        &self.grid
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Block> {
        self.blocks.iter().find(|block| block.id == id)
    }

    pub fn into_blocks(self) -> Vec<Block> {
        self.blocks
    }

    /// Blocks ordered by their position on the grid.
    pub fn sorted(&self) -> Vec<Block> {
        let mut blocks = self.blocks.clone();
        blocks.sort_by_key(|block| {
            self.range_of(block)
                .map(|range| range.start)
                .unwrap_or(usize::MAX)
        });
        blocks
    }

    pub fn add(&mut self, draft: BlockDraft) -> Result<Block, ScheduleError> {
        let range = self
            .grid
            .block_range(draft.hour, draft.start_minute, draft.duration_minutes)?;
        if self.find_overlaps(range.start, range.end, None) {
            return Err(ScheduleError::Conflict {
                start: range.start,
                end: range.end,
            });
        }

        let block = draft.into_block(next_block_id());
        self.blocks.push(block.clone());
        Ok(block)
    }

    pub fn update(&mut self, id: &str, patch: BlockPatch) -> Result<Block, ScheduleError> {
        let block = self
            .blocks
            .iter_mut()
            .find(|block| block.id == id)
            .ok_or_else(|| ScheduleError::NotFound(id.to_string()))?;
        if let Some(content) = patch.content {
            block.content = content;
        }
        if let Some(color_id) = patch.color_id {
            block.color_id = color_id;
        }
        Ok(block.clone())
    }

    pub fn reschedule(
        &mut self,
        id: &str,
        new_hour: u32,
        new_start_minute: u32,
    ) -> Result<Block, ScheduleError> {
        let duration_minutes = self
            .get(id)
            .map(|block| block.duration_minutes)
            .ok_or_else(|| ScheduleError::NotFound(id.to_string()))?;
        let range = self
            .grid
            .block_range(new_hour, new_start_minute, duration_minutes)?;
        if self.find_overlaps(range.start, range.end, Some(id)) {
            return Err(ScheduleError::Conflict {
                start: range.start,
                end: range.end,
            });
        }

        let block = self
            .blocks
            .iter_mut()
            .find(|block| block.id == id)
            .ok_or_else(|| ScheduleError::NotFound(id.to_string()))?;
        block.hour = new_hour;
        block.start_minute = new_start_minute;
        Ok(block.clone())
    }

    /// Removing an id that is not present is a no-op.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.blocks.len();
        self.blocks.retain(|block| block.id != id);
        self.blocks.len() != before
    }

    pub fn find_at(&self, hour: u32, sub_slot: u32) -> Option<&Block> {
        let slot = self.grid.to_absolute(hour, sub_slot)?;
        self.find_at_slot(slot)
    }

    pub fn find_at_slot(&self, slot: usize) -> Option<&Block> {
        self.blocks.iter().find(|block| {
            self.range_of(block)
                .map(|range| range.contains(&slot))
                .unwrap_or(false)
        })
    }

    /// `[s1, e1)` and `[s2, e2)` overlap iff `s1 < e2 && s2 < e1`.
    pub fn find_overlaps(&self, start: usize, end_exclusive: usize, exclude_id: Option<&str>) -> bool {
        self.blocks
            .iter()
            .filter(|block| exclude_id != Some(block.id.as_str()))
            .filter_map(|block| self.range_of(block))
            .any(|range| start < range.end && range.start < end_exclusive)
    }

    pub fn range_of(&self, block: &Block) -> Option<Range<usize>> {
        self.grid
            .block_range(block.hour, block.start_minute, block.duration_minutes)
            .ok()
    }
}
