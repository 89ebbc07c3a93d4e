use crate::domain::models::{
    DayMetadata, MainTask, OwnerKey, PersistedPlan, PlanShape, SegmentRecord, StoredDay,
};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::plan_store::{PlanStore, run_blocking};
use crate::infrastructure::storage::open_database;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use std::path::{Path, PathBuf};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Relational store for signed-in owners: one `daily_plans` row per day and
/// one `time_blocks` row per occupied slot.
#[derive(Debug, Clone)]
pub struct SqlitePlanStore {
    db_path: PathBuf,
}

impl SqlitePlanStore {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    fn connect(&self) -> Result<Connection, InfraError> {
        open_database(&self.db_path)
    }

    fn read_day(&self, owner: &OwnerKey, date: NaiveDate) -> Result<Option<StoredDay>, InfraError> {
        let connection = self.connect()?;
        let plan_row: Option<(i64, String, String, bool)> = connection
            .query_row(
                "SELECT id, main_tasks, freeform_notes, completed
                 FROM daily_plans WHERE owner_id = ?1 AND date = ?2",
                params![owner.storage_key(), date.format(DATE_FORMAT).to_string()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;

        let Some((plan_id, main_tasks_raw, freeform_notes, completed)) = plan_row else {
            return Ok(None);
        };
        let main_tasks: Vec<MainTask> = serde_json::from_str(&main_tasks_raw)?;

        let mut statement = connection.prepare(
            "SELECT hour, segment, content, color FROM time_blocks
             WHERE daily_plan_id = ?1 ORDER BY id",
        )?;
        let segments = statement
            .query_map(params![plan_id], |row| {
                Ok(SegmentRecord {
                    hour: row.get(0)?,
                    segment: row.get(1)?,
                    content: row.get(2)?,
                    color: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(StoredDay {
            plan: PersistedPlan::Segments(segments),
            metadata: DayMetadata {
                main_tasks,
                freeform_notes,
                day_marked_complete: completed,
            },
        }))
    }

    fn write_day(&self, owner: &OwnerKey, date: NaiveDate, day: &StoredDay) -> Result<(), InfraError> {
        let PersistedPlan::Segments(segments) = &day.plan else {
            return Err(InfraError::Store(
                "sqlite plan store only persists segment rows".to_string(),
            ));
        };

        let mut connection = self.connect()?;
        let transaction = connection.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let main_tasks = serde_json::to_string(&day.metadata.main_tasks)?;
        let plan_id: i64 = transaction.query_row(
            "INSERT INTO daily_plans (owner_id, date, main_tasks, freeform_notes, completed, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(owner_id, date) DO UPDATE SET
               main_tasks = excluded.main_tasks,
               freeform_notes = excluded.freeform_notes,
               completed = excluded.completed,
               updated_at = excluded.updated_at
             RETURNING id",
            params![
                owner.storage_key(),
                date.format(DATE_FORMAT).to_string(),
                main_tasks,
                day.metadata.freeform_notes,
                day.metadata.day_marked_complete,
                Utc::now().to_rfc3339()
            ],
            |row| row.get(0),
        )?;

        transaction.execute(
            "DELETE FROM time_blocks WHERE daily_plan_id = ?1",
            params![plan_id],
        )?;
        {
            let mut insert = transaction.prepare(
                "INSERT INTO time_blocks (daily_plan_id, hour, segment, content, color)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for segment in segments.iter().filter(|segment| !segment.is_empty_cell()) {
                insert.execute(params![
                    plan_id,
                    segment.hour,
                    segment.segment,
                    segment.content,
                    segment.color
                ])?;
            }
        }
        transaction.commit()?;
        Ok(())
    }

    fn read_dates(&self, owner: &OwnerKey) -> Result<Vec<NaiveDate>, InfraError> {
        let connection = self.connect()?;
        let mut statement = connection
            .prepare("SELECT date FROM daily_plans WHERE owner_id = ?1 ORDER BY date")?;
        let raw_dates = statement
            .query_map(params![owner.storage_key()], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        raw_dates
            .into_iter()
            .map(|raw| {
                NaiveDate::parse_from_str(&raw, DATE_FORMAT).map_err(|error| {
                    InfraError::Store(format!("invalid daily_plans.date '{raw}': {error}"))
                })
            })
            .collect()
    }
}

#[async_trait]
impl PlanStore for SqlitePlanStore {
    fn preferred_shape(&self) -> PlanShape {
        PlanShape::Segments
    }

    async fn fetch_day(
        &self,
        owner: &OwnerKey,
        date: NaiveDate,
    ) -> Result<Option<StoredDay>, InfraError> {
        let store = self.clone();
        let owner = owner.clone();
        run_blocking(move || store.read_day(&owner, date)).await
    }

    async fn replace_day(
        &self,
        owner: &OwnerKey,
        date: NaiveDate,
        day: StoredDay,
    ) -> Result<(), InfraError> {
        let store = self.clone();
        let owner = owner.clone();
        run_blocking(move || store.write_day(&owner, date, &day)).await
    }

    async fn list_dates(&self, owner: &OwnerKey) -> Result<Vec<NaiveDate>, InfraError> {
        let store = self.clone();
        let owner = owner.clone();
        run_blocking(move || store.read_dates(&owner)).await
    }
}
