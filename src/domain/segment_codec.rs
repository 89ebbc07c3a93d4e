use crate::domain::grid::GridIndex;
use crate::domain::models::{Block, SegmentRecord, next_block_id};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeReport {
    pub blocks: Vec<Block>,
    /// Records whose cell does not exist on the current grid.
    pub unplaced: Vec<SegmentRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodeReport {
    pub segments: Vec<SegmentRecord>,
    pub dropped_slots: usize,
    /// Blocks that could not be placed on the grid at all.
    pub unplaced_block_ids: Vec<String>,
}

/// Converts between per-slot segment records and contiguous blocks.
///
/// Decoding groups cells by `(content, color)` and merges each group's
/// consecutive slots into one block. Distinct events that share both label
/// and color and sit in touching slots are therefore indistinguishable from a
/// single event.
#[derive(Debug, Clone)]
pub struct SegmentCodec {
    grid: GridIndex,
}

impl SegmentCodec {
    pub fn new(grid: GridIndex) -> Self {
        Self { grid }
    }

    pub fn grid(&self) -> &GridIndex {
        &self.grid
    }

    pub fn decode(&self, segments: &[SegmentRecord]) -> Vec<Block> {
        self.decode_with_report(segments).blocks
    }

    pub fn decode_with_report(&self, segments: &[SegmentRecord]) -> DecodeReport {
        let mut group_order: Vec<(String, Option<String>)> = Vec::new();
        let mut groups: HashMap<(String, Option<String>), BTreeSet<usize>> = HashMap::new();
        let mut unplaced = Vec::new();

        for record in segments {
            if record.is_empty_cell() {
                continue;
            }
            let Some(slot) = self.grid.to_absolute(record.hour, record.segment) else {
                unplaced.push(record.clone());
                continue;
            };
            let key = (record.content.clone(), record.color.clone());
            groups
                .entry(key.clone())
                .or_insert_with(|| {
                    group_order.push(key);
                    BTreeSet::new()
                })
                .insert(slot);
        }

        let mut runs: Vec<(usize, usize, &str, &str)> = Vec::new();
        for key in &group_order {
            let Some(slots) = groups.get(key) else {
                continue;
            };
            let content = key.0.as_str();
            let color = key.1.as_deref().unwrap_or(self.grid.config().default_color());

            let mut running: Option<(usize, usize)> = None;
            for slot in slots.iter().copied() {
                running = match running {
                    Some((start, end)) if slot == end => Some((start, end + 1)),
                    Some((start, end)) => {
                        runs.push((start, end, content, color));
                        Some((slot, slot + 1))
                    }
                    None => Some((slot, slot + 1)),
                };
            }
            if let Some((start, end)) = running {
                runs.push((start, end, content, color));
            }
        }
        runs.sort_by_key(|run| run.0);

        let blocks = runs
            .into_iter()
            .filter_map(|(start, end, content, color)| {
                let (hour, start_minute, duration_minutes) = self.grid.range_position(start, end)?;
                Some(Block {
                    id: next_block_id(),
                    hour,
                    start_minute,
                    duration_minutes,
                    content: content.to_string(),
                    color_id: color.to_string(),
                })
            })
            .collect();

        DecodeReport { blocks, unplaced }
    }

    pub fn encode(&self, blocks: &[Block]) -> Vec<SegmentRecord> {
        self.encode_with_report(blocks).segments
    }

    pub fn encode_with_report(&self, blocks: &[Block]) -> EncodeReport {
        let quantum = self.grid.quantum_minutes();
        let mut report = EncodeReport::default();

        for block in blocks {
            let slots = (block.duration_minutes / quantum) as usize;
            let start = if block.start_minute % quantum == 0 {
                self.grid.to_absolute(block.hour, block.start_minute / quantum)
            } else {
                None
            };
            let Some(start) = start.filter(|_| block.duration_minutes % quantum == 0 && slots > 0)
            else {
                report.dropped_slots += slots.max(1);
                report.unplaced_block_ids.push(block.id.clone());
                continue;
            };

            for offset in 0..slots {
                match self.grid.from_absolute(start + offset) {
                    Some((hour, segment)) => report.segments.push(SegmentRecord {
                        hour,
                        segment,
                        content: block.content.clone(),
                        color: Some(block.color_id.clone()),
                    }),
                    None => report.dropped_slots += 1,
                }
            }
        }

        report
    }
}
