use crate::domain::block_store::BlockStore;
use crate::domain::error::ScheduleError;
use crate::domain::grid::GridIndex;
use crate::domain::models::{Block, BlockDraft, BlockPatch};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelMode {
    /// Inclusive absolute slot range picked by a drag.
    Creating { start: usize, end: usize },
    Editing { block_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragState {
    Idle,
    Selecting { anchor: usize, current: usize },
    PendingLabel { mode: LabelMode, prefill: String },
}

/// What a gesture step did, for whichever layer renders the grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragTransition {
    Ignored,
    SelectionStarted { anchor: usize },
    SelectionMoved { start: usize, end: usize },
    LabelRequested { start: usize, end: usize },
    EditRequested { block_id: String, prefill: String },
    Created(Block),
    Updated(Block),
    Removed { block_id: String },
    Discarded,
}

impl DragTransition {
    /// The store changed and the day should be persisted.
    pub fn is_commit(&self) -> bool {
        matches!(self, Self::Created(_) | Self::Updated(_) | Self::Removed { .. })
    }
}

/// Turns pointer events into committed blocks. Nothing reaches the store
/// before a non-blank label is submitted.
#[derive(Debug, Clone)]
pub struct DragController {
    grid: GridIndex,
    state: DragState,
    selected_color: String,
}

impl DragController {
    pub fn new(grid: GridIndex) -> Self {
        let selected_color = grid.config().default_color().to_string();
        Self {
            grid,
            state: DragState::Idle,
            selected_color,
        }
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == DragState::Idle
    }

    pub fn selected_color(&self) -> &str {
        &self.selected_color
    }

    pub fn select_color(&mut self, color_id: &str) -> Result<(), ScheduleError> {
        if !self.grid.config().has_color(color_id) {
            return Err(ScheduleError::UnknownColor(color_id.to_string()));
        }
        self.selected_color = color_id.to_string();
        Ok(())
    }

    /// Inclusive preview range while selecting or awaiting a label for a new block.
    pub fn selection(&self) -> Option<(usize, usize)> {
        match &self.state {
            DragState::Selecting { anchor, current } => Some(ordered(*anchor, *current)),
            DragState::PendingLabel {
                mode: LabelMode::Creating { start, end },
                ..
            } => Some((*start, *end)),
            _ => None,
        }
    }

    pub fn pointer_down(&mut self, store: &BlockStore, slot: usize) -> DragTransition {
        self.state = DragState::Idle;
        if slot >= self.grid.total_slots() {
            return DragTransition::Ignored;
        }

        if let Some(block) = store.find_at_slot(slot) {
            let block_id = block.id.clone();
            let prefill = block.content.clone();
            self.state = DragState::PendingLabel {
                mode: LabelMode::Editing {
                    block_id: block_id.clone(),
                },
                prefill: prefill.clone(),
            };
            return DragTransition::EditRequested { block_id, prefill };
        }

        self.state = DragState::Selecting {
            anchor: slot,
            current: slot,
        };
        DragTransition::SelectionStarted { anchor: slot }
    }

    pub fn pointer_enter(&mut self, slot: usize) -> DragTransition {
        if slot >= self.grid.total_slots() {
            return DragTransition::Ignored;
        }
        let DragState::Selecting { anchor, current } = &mut self.state else {
            return DragTransition::Ignored;
        };
        *current = slot;
        let (start, end) = ordered(*anchor, slot);
        DragTransition::SelectionMoved { start, end }
    }

    pub fn pointer_up(&mut self, store: &BlockStore) -> Result<DragTransition, ScheduleError> {
        let DragState::Selecting { anchor, current } = self.state else {
            return Ok(DragTransition::Ignored);
        };
        let (start, end) = ordered(anchor, current);

        if store.find_overlaps(start, end + 1, None) {
            self.state = DragState::Idle;
            return Err(ScheduleError::Overlap { start, end });
        }

        self.state = DragState::PendingLabel {
            mode: LabelMode::Creating { start, end },
            prefill: String::new(),
        };
        Ok(DragTransition::LabelRequested { start, end })
    }

    pub fn submit(
        &mut self,
        store: &mut BlockStore,
        text: &str,
    ) -> Result<DragTransition, ScheduleError> {
        let state = std::mem::replace(&mut self.state, DragState::Idle);
        let DragState::PendingLabel { mode, .. } = state else {
            return Ok(DragTransition::Ignored);
        };

        let label = text.trim();
        if label.is_empty() {
            return Ok(DragTransition::Discarded);
        }

        match mode {
            LabelMode::Editing { block_id } => {
                let block = store.update(&block_id, BlockPatch::content(label))?;
                Ok(DragTransition::Updated(block))
            }
            LabelMode::Creating { start, end } => {
                let (hour, start_minute, duration_minutes) = self
                    .grid
                    .range_position(start, end + 1)
                    .ok_or(ScheduleError::PastEndOfDay {
                        end: end + 1,
                        total: self.grid.total_slots(),
                    })?;
                let block = store.add(BlockDraft::new(
                    hour,
                    start_minute,
                    duration_minutes,
                    label,
                    self.selected_color.clone(),
                ))?;
                Ok(DragTransition::Created(block))
            }
        }
    }

    pub fn cancel(&mut self) -> DragTransition {
        if self.is_idle() {
            return DragTransition::Ignored;
        }
        self.state = DragState::Idle;
        DragTransition::Discarded
    }

    /// Secondary action (right click) on a block deletes it directly; the
    /// gesture state is left as it is.
    pub fn secondary_action(&mut self, store: &mut BlockStore, slot: usize) -> DragTransition {
        let Some(block_id) = store.find_at_slot(slot).map(|block| block.id.clone()) else {
            return DragTransition::Ignored;
        };
        if store.remove(&block_id) {
            DragTransition::Removed { block_id }
        } else {
            DragTransition::Ignored
        }
    }
}

fn ordered(left: usize, right: usize) -> (usize, usize) {
    (left.min(right), left.max(right))
}
