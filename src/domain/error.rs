use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("slots {start}..{end} conflict with an existing block")]
    Conflict { start: usize, end: usize },
    #[error("selection {start}..={end} overlaps an existing event")]
    Overlap { start: usize, end: usize },
    #[error("block not found: {0}")]
    NotFound(String),
    #[error("hour {hour} is outside the configured day")]
    OutOfRange { hour: u32 },
    #[error("range ending at slot {end} runs past the last slot {total}")]
    PastEndOfDay { end: usize, total: usize },
    #[error("{0}")]
    Misaligned(String),
    #[error("unknown color: {0}")]
    UnknownColor(String),
    #[error("invalid grid config: {0}")]
    InvalidConfig(String),
}

impl ScheduleError {
    /// True for the out-of-grid family (hour missing or range overflowing the day).
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, Self::OutOfRange { .. } | Self::PastEndOfDay { .. })
    }
}
