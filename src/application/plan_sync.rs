use crate::domain::block_store::BlockStore;
use crate::domain::grid::GridIndex;
use crate::domain::models::{
    Block, DayMetadata, OwnerKey, PersistedPlan, PlanShape, PlannerData, SegmentRecord,
    StaleBlock, StoredDay, next_block_id,
};
use crate::domain::segment_codec::SegmentCodec;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::plan_store::PlanStore;
use chrono::NaiveDate;
use log::{error, info, warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;

type DayKey = (OwnerKey, NaiveDate);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedPlan {
    pub store: BlockStore,
    pub metadata: DayMetadata,
    pub stale: Vec<StaleBlock>,
    /// Segment rows whose cell no longer exists on the grid.
    pub unplaced_segments: Vec<SegmentRecord>,
    /// Shape the day was stored in; `None` for a day never saved.
    pub shape: Option<PlanShape>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    pub shape: PlanShape,
    pub dropped_slots: usize,
    pub unplaced_block_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved(SaveReport),
    /// A newer save for the same day was requested before this one ran.
    Superseded,
}

#[derive(Debug)]
pub struct SaveHandle {
    inner: JoinHandle<Result<SaveOutcome, InfraError>>,
}

impl SaveHandle {
    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }

    pub async fn wait(self) -> Result<SaveOutcome, InfraError> {
        self.inner
            .await
            .map_err(|error| InfraError::Store(format!("save task failed: {error}")))?
    }
}

/// Loads and persists whole days through a [`PlanStore`], converting between
/// segment rows and blocks as the store requires.
pub struct PlanSyncService<S>
where
    S: PlanStore + 'static,
{
    store: Arc<S>,
    codec: SegmentCodec,
    save_debounce: Duration,
    generations: Arc<Mutex<SaveGenerations>>,
    write_lock: Arc<tokio::sync::Mutex<()>>,
}

impl<S> PlanSyncService<S>
where
    S: PlanStore + 'static,
{
    pub fn new(store: Arc<S>, grid: GridIndex, save_debounce: Duration) -> Self {
        Self {
            store,
            codec: SegmentCodec::new(grid),
            save_debounce,
            generations: Arc::new(Mutex::new(SaveGenerations::default())),
            write_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn grid(&self) -> &GridIndex {
        self.codec.grid()
    }

    pub fn save_debounce(&self) -> Duration {
        self.save_debounce
    }

    pub async fn load(&self, owner: &OwnerKey, date: NaiveDate) -> Result<LoadedPlan, InfraError> {
        let Some(day) = self.store.fetch_day(owner, date).await? else {
            return Ok(LoadedPlan {
                store: BlockStore::new(self.grid().clone()),
                metadata: DayMetadata::default(),
                stale: Vec::new(),
                unplaced_segments: Vec::new(),
                shape: None,
            });
        };

        let shape = day.plan.shape();
        let (blocks, unplaced_segments) = match day.plan {
            PersistedPlan::Segments(segments) => {
                let report = self.codec.decode_with_report(&segments);
                (report.blocks, report.unplaced)
            }
            PersistedPlan::Blocks(blocks) => (blocks, Vec::new()),
        };
        if !unplaced_segments.is_empty() {
            warn!(
                "event=plan_load owner={} date={date} unplaced_segments={}",
                owner.storage_key(),
                unplaced_segments.len()
            );
        }

        let (store, stale) = BlockStore::restore(self.grid().clone(), blocks);
        if !stale.is_empty() {
            warn!(
                "event=plan_load owner={} date={date} stale_blocks={}",
                owner.storage_key(),
                stale.len()
            );
        }

        Ok(LoadedPlan {
            store,
            metadata: day.metadata,
            stale,
            unplaced_segments,
            shape: Some(shape),
        })
    }

    /// Writes the whole day now. Any debounced save still pending for the
    /// same day is superseded.
    pub async fn save(
        &self,
        owner: &OwnerKey,
        date: NaiveDate,
        data: PlannerData,
    ) -> Result<SaveReport, InfraError> {
        let key = (owner.clone(), date);
        let generation = bump_generation(&self.generations, &key)?;
        let _write = self.write_lock.lock().await;
        let result = persist(self.store.as_ref(), &self.codec, owner, date, data).await;
        retire_generation(&self.generations, &key, generation)?;
        result
    }

    /// Schedules a whole-day write after the debounce delay. When another save
    /// for the same day is requested before the delay elapses, this one
    /// resolves to [`SaveOutcome::Superseded`] without writing.
    pub fn schedule_save(
        &self,
        owner: &OwnerKey,
        date: NaiveDate,
        data: PlannerData,
    ) -> Result<SaveHandle, InfraError> {
        let key = (owner.clone(), date);
        let generation = bump_generation(&self.generations, &key)?;

        let inner = tokio::spawn(run_scheduled_save(
            Arc::clone(&self.store),
            self.codec.clone(),
            Arc::clone(&self.generations),
            Arc::clone(&self.write_lock),
            self.save_debounce,
            (key, generation),
            data,
        ));

        Ok(SaveHandle { inner })
    }

    pub async fn list_dates(&self, owner: &OwnerKey) -> Result<Vec<NaiveDate>, InfraError> {
        self.store.list_dates(owner).await
    }

    #[cfg(test)]
    fn tracked_days(&self) -> usize {
        lock_generations(&self.generations)
            .map(|generations| generations.latest.len())
            .unwrap_or(0)
    }
}

async fn run_scheduled_save<S>(
    store: Arc<S>,
    codec: SegmentCodec,
    generations: Arc<Mutex<SaveGenerations>>,
    write_lock: Arc<tokio::sync::Mutex<()>>,
    debounce: Duration,
    (key, generation): (DayKey, u64),
    data: PlannerData,
) -> Result<SaveOutcome, InfraError>
where
    S: PlanStore + 'static,
{
    sleep(debounce).await;
    let _write = write_lock.lock().await;
    if current_generation(&generations, &key)? != generation {
        return Ok(SaveOutcome::Superseded);
    }
    let result = persist(store.as_ref(), &codec, &key.0, key.1, data).await;
    retire_generation(&generations, &key, generation)?;
    Ok(SaveOutcome::Saved(result?))
}

/// Save generations per day. Numbers come from one counter, so a day whose
/// entry was retired never hands out a generation an older task still holds.
#[derive(Debug, Default)]
struct SaveGenerations {
    next: u64,
    latest: HashMap<DayKey, u64>,
}

fn lock_generations(
    generations: &Mutex<SaveGenerations>,
) -> Result<MutexGuard<'_, SaveGenerations>, InfraError> {
    generations
        .lock()
        .map_err(|error| InfraError::Store(format!("save generation lock poisoned: {error}")))
}

fn bump_generation(generations: &Mutex<SaveGenerations>, key: &DayKey) -> Result<u64, InfraError> {
    let mut generations = lock_generations(generations)?;
    generations.next += 1;
    let generation = generations.next;
    generations.latest.insert(key.clone(), generation);
    Ok(generation)
}

fn current_generation(generations: &Mutex<SaveGenerations>, key: &DayKey) -> Result<u64, InfraError> {
    let generations = lock_generations(generations)?;
    Ok(generations.latest.get(key).copied().unwrap_or(0))
}

/// Forgets the day once its newest save has run.
fn retire_generation(
    generations: &Mutex<SaveGenerations>,
    key: &DayKey,
    generation: u64,
) -> Result<(), InfraError> {
    let mut generations = lock_generations(generations)?;
    if generations.latest.get(key) == Some(&generation) {
        generations.latest.remove(key);
    }
    Ok(())
}

async fn persist<S>(
    store: &S,
    codec: &SegmentCodec,
    owner: &OwnerKey,
    date: NaiveDate,
    data: PlannerData,
) -> Result<SaveReport, InfraError>
where
    S: PlanStore + ?Sized,
{
    let shape = store.preferred_shape();
    let (plan, dropped_slots, unplaced_block_ids) = match shape {
        PlanShape::Segments => {
            let report = codec.encode_with_report(&data.blocks);
            let mut segments = report.segments;
            segments.extend(data.unplaced_segments);
            (
                PersistedPlan::Segments(segments),
                report.dropped_slots,
                report.unplaced_block_ids,
            )
        }
        PlanShape::Blocks => {
            let mut blocks = data.blocks;
            blocks.extend(
                data.unplaced_segments
                    .iter()
                    .map(|segment| segment_as_block(codec.grid(), segment)),
            );
            (
                PersistedPlan::Blocks(sorted_by_position(codec.grid(), blocks)),
                0,
                Vec::new(),
            )
        }
    };
    if dropped_slots > 0 {
        warn!(
            "event=plan_save owner={} date={date} dropped_slots={dropped_slots} unplaced_blocks={}",
            owner.storage_key(),
            unplaced_block_ids.len()
        );
    }

    let day = StoredDay {
        plan,
        metadata: data.metadata,
    };
    if let Err(save_error) = store.replace_day(owner, date, day).await {
        error!(
            "event=plan_save owner={} date={date} status=error error={save_error}",
            owner.storage_key()
        );
        return Err(save_error);
    }

    info!("event=plan_save owner={} date={date} status=ok", owner.storage_key());
    Ok(SaveReport {
        shape,
        dropped_slots,
        unplaced_block_ids,
    })
}

/// A carried segment row as a one-slot block, so block-shaped stores keep it
/// and the next load reports it as stale.
fn segment_as_block(grid: &GridIndex, segment: &SegmentRecord) -> Block {
    let quantum = grid.quantum_minutes();
    Block {
        id: next_block_id(),
        hour: segment.hour,
        start_minute: segment.segment * quantum,
        duration_minutes: quantum,
        content: segment.content.clone(),
        color_id: segment
            .color
            .clone()
            .unwrap_or_else(|| grid.config().default_color().to_string()),
    }
}

/// Grid order; blocks that are off the grid keep their relative order at the end.
fn sorted_by_position(grid: &GridIndex, mut blocks: Vec<Block>) -> Vec<Block> {
    let quantum = grid.quantum_minutes();
    blocks.sort_by_key(|block| {
        let slot = grid.to_absolute(block.hour, block.start_minute / quantum);
        (slot.is_none(), slot)
    });
    blocks
}
