use crate::domain::models::{OwnerKey, PlanShape, StoredDay};
use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Mutex;

/// Day-keyed persistence backing the planner. Whether the owner is signed in
/// or a guest decides which implementation is wired in; the planner itself
/// only sees this trait.
#[async_trait]
pub trait PlanStore: Send + Sync {
    /// Row shape this backend writes.
    fn preferred_shape(&self) -> PlanShape;

    async fn fetch_day(
        &self,
        owner: &OwnerKey,
        date: NaiveDate,
    ) -> Result<Option<StoredDay>, InfraError>;

    /// Replaces everything stored for the day with `day`.
    async fn replace_day(
        &self,
        owner: &OwnerKey,
        date: NaiveDate,
        day: StoredDay,
    ) -> Result<(), InfraError>;

    /// Dates that have a saved plan, ascending.
    async fn list_dates(&self, owner: &OwnerKey) -> Result<Vec<NaiveDate>, InfraError>;
}

/// Runs blocking store I/O on tokio's blocking pool so the async worker keeps
/// serving gestures while a day is read or written.
pub(crate) async fn run_blocking<T, F>(work: F) -> Result<T, InfraError>
where
    F: FnOnce() -> Result<T, InfraError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|error| InfraError::Store(format!("blocking store task failed: {error}")))?
}

#[derive(Debug)]
pub struct InMemoryPlanStore {
    shape: PlanShape,
    days: Mutex<HashMap<(OwnerKey, NaiveDate), StoredDay>>,
}

impl InMemoryPlanStore {
    pub fn new(shape: PlanShape) -> Self {
        Self {
            shape,
            days: Mutex::new(HashMap::new()),
        }
    }

    pub fn insert(&self, owner: &OwnerKey, date: NaiveDate, day: StoredDay) -> Result<(), InfraError> {
        let mut days = self.lock()?;
        days.insert((owner.clone(), date), day);
        Ok(())
    }

    pub fn get(&self, owner: &OwnerKey, date: NaiveDate) -> Result<Option<StoredDay>, InfraError> {
        let days = self.lock()?;
        Ok(days.get(&(owner.clone(), date)).cloned())
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<(OwnerKey, NaiveDate), StoredDay>>, InfraError> {
        self.days
            .lock()
            .map_err(|error| InfraError::Store(format!("plan store lock poisoned: {error}")))
    }
}

impl Default for InMemoryPlanStore {
    fn default() -> Self {
        Self::new(PlanShape::Blocks)
    }
}

#[async_trait]
impl PlanStore for InMemoryPlanStore {
    fn preferred_shape(&self) -> PlanShape {
        self.shape
    }

    async fn fetch_day(
        &self,
        owner: &OwnerKey,
        date: NaiveDate,
    ) -> Result<Option<StoredDay>, InfraError> {
        self.get(owner, date)
    }

    async fn replace_day(
        &self,
        owner: &OwnerKey,
        date: NaiveDate,
        day: StoredDay,
    ) -> Result<(), InfraError> {
        self.insert(owner, date, day)
    }

    async fn list_dates(&self, owner: &OwnerKey) -> Result<Vec<NaiveDate>, InfraError> {
        let days = self.lock()?;
        let mut dates = days
            .keys()
            .filter(|(candidate, _)| candidate == owner)
            .map(|(_, date)| *date)
            .collect::<Vec<_>>();
        dates.sort_unstable();
        Ok(dates)
    }
}
