use crate::domain::error::ScheduleError;
use crate::domain::models::GridConfig;
use std::ops::Range;

/// Integer mapping between `(hour, sub_slot)` cells and absolute slot
/// positions across the configured day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridIndex {
    config: GridConfig,
}

impl GridIndex {
    pub fn new(config: GridConfig) -> Result<Self, ScheduleError> {
        config.validate().map_err(ScheduleError::InvalidConfig)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn quantum_minutes(&self) -> u32 {
        self.config.quantum_minutes
    }

    pub fn slots_per_hour(&self) -> usize {
        self.config.slots_per_hour() as usize
    }

    pub fn total_slots(&self) -> usize {
        self.config.hour_sequence.len() * self.slots_per_hour()
    }

    pub fn contains_hour(&self, hour: u32) -> bool {
        self.config.hour_sequence.contains(&hour)
    }

    pub fn to_absolute(&self, hour: u32, sub_slot: u32) -> Option<usize> {
        if sub_slot as usize >= self.slots_per_hour() {
            return None;
        }
        let position = self
            .config
            .hour_sequence
            .iter()
            .position(|candidate| *candidate == hour)?;
        Some(position * self.slots_per_hour() + sub_slot as usize)
    }

    pub fn from_absolute(&self, index: usize) -> Option<(u32, u32)> {
        if index >= self.total_slots() {
            return None;
        }
        let hour = self.config.hour_sequence[index / self.slots_per_hour()];
        Some((hour, (index % self.slots_per_hour()) as u32))
    }

    /// Absolute `[start, end)` range covered by a block placed at
    /// `hour:start_minute` lasting `duration_minutes`.
    pub fn block_range(
        &self,
        hour: u32,
        start_minute: u32,
        duration_minutes: u32,
    ) -> Result<Range<usize>, ScheduleError> {
        let quantum = self.quantum_minutes();
        if start_minute >= 60 || start_minute % quantum != 0 {
            return Err(ScheduleError::Misaligned(format!(
                "start minute {start_minute} is not on the {quantum}-minute grid"
            )));
        }
        if duration_minutes == 0 || duration_minutes % quantum != 0 {
            return Err(ScheduleError::Misaligned(format!(
                "duration {duration_minutes} is not a positive multiple of {quantum} minutes"
            )));
        }

        let start = self
            .to_absolute(hour, start_minute / quantum)
            .ok_or(ScheduleError::OutOfRange { hour })?;
        let end = start + (duration_minutes / quantum) as usize;
        if end > self.total_slots() {
            return Err(ScheduleError::PastEndOfDay {
                end,
                total: self.total_slots(),
            });
        }
        Ok(start..end)
    }

    /// Inverse of [`GridIndex::block_range`]: `(hour, start_minute, duration_minutes)`.
    pub fn range_position(&self, start: usize, end: usize) -> Option<(u32, u32, u32)> {
        if end <= start || end > self.total_slots() {
            return None;
        }
        let (hour, sub_slot) = self.from_absolute(start)?;
        let quantum = self.quantum_minutes();
        Some((hour, sub_slot * quantum, (end - start) as u32 * quantum))
    }
}
