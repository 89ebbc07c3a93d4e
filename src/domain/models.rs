use crate::domain::error::ScheduleError;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

const MINUTES_PER_HOUR: u32 = 60;
const MINUTES_PER_DAY: u32 = 24 * MINUTES_PER_HOUR;
const DEFAULT_ACCOUNT_ID: &str = "default";
const DEFAULT_GUEST_ID: &str = "guest";

static NEXT_BLOCK_ID: AtomicU64 = AtomicU64::new(1);

pub fn next_block_id() -> String {
    let sequence = NEXT_BLOCK_ID.fetch_add(1, Ordering::Relaxed);
    format!("blk-{}-{sequence}", Utc::now().timestamp_micros())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColorOption {
    pub id: String,
    pub color: String,
    pub label: String,
}

impl ColorOption {
    fn new(id: &str, color: &str, label: &str) -> Self {
        Self {
            id: id.to_string(),
            color: color.to_string(),
            label: label.to_string(),
        }
    }
}

/// Shape of a planning day: slot granularity, visible hours and the color
/// palette blocks may use.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GridConfig {
    pub quantum_minutes: u32,
    pub hour_sequence: Vec<u32>,
    pub color_palette: Vec<ColorOption>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            quantum_minutes: 10,
            hour_sequence: (4..=12).collect(),
            color_palette: default_palette(),
        }
    }
}

impl GridConfig {
    pub fn new(quantum_minutes: u32, hour_sequence: Vec<u32>) -> Result<Self, ScheduleError> {
        let config = Self {
            quantum_minutes,
            hour_sequence,
            color_palette: default_palette(),
        };
        config.validate().map_err(ScheduleError::InvalidConfig)?;
        Ok(config)
    }

    pub fn with_palette(mut self, color_palette: Vec<ColorOption>) -> Result<Self, ScheduleError> {
        self.color_palette = color_palette;
        self.validate().map_err(ScheduleError::InvalidConfig)?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.quantum_minutes == 0 || MINUTES_PER_HOUR % self.quantum_minutes != 0 {
            return Err(format!(
                "grid.quantum_minutes must divide 60 (got {})",
                self.quantum_minutes
            ));
        }
        if self.hour_sequence.is_empty() {
            return Err("grid.hour_sequence must not be empty".to_string());
        }
        let mut seen = HashSet::new();
        for hour in &self.hour_sequence {
            if *hour > 23 {
                return Err(format!("grid.hour_sequence contains invalid hour {hour}"));
            }
            if !seen.insert(*hour) {
                return Err(format!("grid.hour_sequence contains duplicate hour {hour}"));
            }
        }
        if self.color_palette.is_empty() {
            return Err("grid.color_palette must not be empty".to_string());
        }
        let mut ids = HashSet::new();
        for option in &self.color_palette {
            validate_non_empty(&option.id, "grid.color_palette[].id")?;
            if !ids.insert(option.id.as_str()) {
                return Err(format!("grid.color_palette has duplicate id {}", option.id));
            }
        }
        Ok(())
    }

    pub fn slots_per_hour(&self) -> u32 {
        MINUTES_PER_HOUR / self.quantum_minutes
    }

    pub fn default_color(&self) -> &str {
        self.color_palette
            .first()
            .map(|option| option.id.as_str())
            .unwrap_or("blue")
    }

    pub fn has_color(&self, color_id: &str) -> bool {
        self.color_palette.iter().any(|option| option.id == color_id)
    }
}

fn default_palette() -> Vec<ColorOption> {
    vec![
        ColorOption::new("blue", "#3b82f6", "Blue"),
        ColorOption::new("green", "#22c55e", "Green"),
        ColorOption::new("yellow", "#eab308", "Yellow"),
        ColorOption::new("purple", "#a855f7", "Purple"),
        ColorOption::new("pink", "#ec4899", "Pink"),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub id: String,
    pub hour: u32,
    pub start_minute: u32,
    pub duration_minutes: u32,
    pub content: String,
    pub color_id: String,
}

impl Block {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "block.id")?;
        validate_non_empty(&self.color_id, "block.color_id")?;
        if self.hour > 23 {
            return Err("block.hour must be within 0..=23".to_string());
        }
        if self.start_minute >= MINUTES_PER_HOUR {
            return Err("block.start_minute must be within 0..60".to_string());
        }
        if self.duration_minutes == 0 {
            return Err("block.duration_minutes must be > 0".to_string());
        }
        Ok(())
    }

    pub fn start_minute_of_day(&self) -> u32 {
        self.hour * MINUTES_PER_HOUR + self.start_minute
    }

    pub fn end_minute_of_day(&self) -> u32 {
        (self.start_minute_of_day() + self.duration_minutes) % MINUTES_PER_DAY
    }

    /// Header label shown on a rendered block, e.g. `09:10 - 09:40`.
    pub fn time_label(&self) -> String {
        format!(
            "{} - {}",
            format_hhmm(self.start_minute_of_day()),
            format_hhmm(self.end_minute_of_day())
        )
    }

    /// Same placement, content and color; ids are ignored.
    pub fn same_schedule(&self, other: &Block) -> bool {
        self.hour == other.hour
            && self.start_minute == other.start_minute
            && self.duration_minutes == other.duration_minutes
            && self.content == other.content
            && self.color_id == other.color_id
    }
}

/// A block that has not been placed in a store yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDraft {
    pub hour: u32,
    pub start_minute: u32,
    pub duration_minutes: u32,
    pub content: String,
    pub color_id: String,
}

impl BlockDraft {
    pub fn new(
        hour: u32,
        start_minute: u32,
        duration_minutes: u32,
        content: impl Into<String>,
        color_id: impl Into<String>,
    ) -> Self {
        Self {
            hour,
            start_minute,
            duration_minutes,
            content: content.into(),
            color_id: color_id.into(),
        }
    }

    pub(crate) fn into_block(self, id: String) -> Block {
        Block {
            id,
            hour: self.hour,
            start_minute: self.start_minute,
            duration_minutes: self.duration_minutes,
            content: self.content,
            color_id: self.color_id,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockPatch {
    pub content: Option<String>,
    pub color_id: Option<String>,
}

impl BlockPatch {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            color_id: None,
        }
    }

    pub fn color(color_id: impl Into<String>) -> Self {
        Self {
            content: None,
            color_id: Some(color_id.into()),
        }
    }
}

/// One occupied cell in the legacy per-slot format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SegmentRecord {
    pub hour: u32,
    pub segment: u32,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub color: Option<String>,
}

impl SegmentRecord {
    pub fn is_empty_cell(&self) -> bool {
        self.color.is_none() && self.content.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MainTask {
    pub text: String,
    pub completed: bool,
}

/// Day-level fields the scheduling core carries through untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DayMetadata {
    #[serde(default)]
    pub main_tasks: Vec<MainTask>,
    #[serde(default)]
    pub freeform_notes: String,
    #[serde(default)]
    pub day_marked_complete: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlannerData {
    pub metadata: DayMetadata,
    pub blocks: Vec<Block>,
    /// Segment rows off the current grid, written back as they were read.
    pub unplaced_segments: Vec<SegmentRecord>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlanShape {
    Segments,
    Blocks,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "shape", content = "rows", rename_all = "snake_case")]
pub enum PersistedPlan {
    Segments(Vec<SegmentRecord>),
    Blocks(Vec<Block>),
}

impl PersistedPlan {
    pub fn shape(&self) -> PlanShape {
        match self {
            Self::Segments(_) => PlanShape::Segments,
            Self::Blocks(_) => PlanShape::Blocks,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Segments(rows) => rows.is_empty(),
            Self::Blocks(rows) => rows.is_empty(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredDay {
    pub plan: PersistedPlan,
    #[serde(default)]
    pub metadata: DayMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OwnerKey {
    Account(String),
    Guest(String),
}

impl OwnerKey {
    pub fn account(id: &str) -> Self {
        Self::Account(normalize_owner_id(id, DEFAULT_ACCOUNT_ID))
    }

    pub fn guest(id: &str) -> Self {
        Self::Guest(normalize_owner_id(id, DEFAULT_GUEST_ID))
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Account(id) | Self::Guest(id) => id,
        }
    }

    pub fn is_guest(&self) -> bool {
        matches!(self, Self::Guest(_))
    }

    pub fn storage_key(&self) -> String {
        match self {
            Self::Account(id) => format!("account:{id}"),
            Self::Guest(id) => format!("guest:{id}"),
        }
    }
}

/// A loaded block that no longer fits the current grid or collides with
/// another loaded block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleBlock {
    pub block: Block,
    pub reason: ScheduleError,
}

pub fn parse_date_key(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| format!("date '{value}' must be YYYY-MM-DD"))
}

fn normalize_owner_id(id: &str, fallback: &str) -> String {
    let normalized = id.trim();
    if normalized.is_empty() {
        fallback.to_string()
    } else {
        normalized.to_string()
    }
}

fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}

fn format_hhmm(minute_of_day: u32) -> String {
    format!("{:02}:{:02}", minute_of_day / 60, minute_of_day % 60)
}
