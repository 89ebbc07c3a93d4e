use crate::domain::models::{OwnerKey, PlanShape, StoredDay, parse_date_key};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::plan_store::{PlanStore, run_blocking};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const FILE_PREFIX: &str = "guest_planner_";
const FILE_SUFFIX: &str = ".json";

/// Device-local store for guests: one pretty-printed JSON document per day
/// under `<root>/<owner>/guest_planner_<YYYY-MM-DD>.json`.
#[derive(Debug, Clone)]
pub struct GuestFilePlanStore {
    root: PathBuf,
}

impl GuestFilePlanStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn owner_dir(&self, owner: &OwnerKey) -> PathBuf {
        let safe_id = urlencoding::encode(owner.id());
        let kind = if owner.is_guest() { "guest" } else { "account" };
        self.root.join(format!("{kind}-{safe_id}"))
    }

    pub fn day_path(&self, owner: &OwnerKey, date: NaiveDate) -> PathBuf {
        self.owner_dir(owner).join(format!(
            "{FILE_PREFIX}{}{FILE_SUFFIX}",
            date.format("%Y-%m-%d")
        ))
    }

    fn read_day(&self, owner: &OwnerKey, date: NaiveDate) -> Result<Option<StoredDay>, InfraError> {
        let path = self.day_path(owner, date);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(error.into()),
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn write_day(&self, owner: &OwnerKey, date: NaiveDate, day: &StoredDay) -> Result<(), InfraError> {
        let dir = self.owner_dir(owner);
        fs::create_dir_all(&dir)?;
        let path = self.day_path(owner, date);
        let staging = path.with_extension("json.tmp");
        let formatted = serde_json::to_string_pretty(day)?;
        fs::write(&staging, format!("{formatted}\n"))?;
        fs::rename(&staging, &path)?;
        Ok(())
    }

    fn read_dates(&self, owner: &OwnerKey) -> Result<Vec<NaiveDate>, InfraError> {
        let entries = match fs::read_dir(self.owner_dir(owner)) {
            Ok(entries) => entries,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(error.into()),
        };

        let mut dates = Vec::new();
        for entry in entries {
            let name = entry?.file_name();
            let Some(date) = name
                .to_str()
                .and_then(|name| name.strip_prefix(FILE_PREFIX))
                .and_then(|rest| rest.strip_suffix(FILE_SUFFIX))
                .and_then(|key| parse_date_key(key).ok())
            else {
                continue;
            };
            dates.push(date);
        }
        dates.sort_unstable();
        Ok(dates)
    }
}

#[async_trait]
impl PlanStore for GuestFilePlanStore {
    fn preferred_shape(&self) -> PlanShape {
        PlanShape::Blocks
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
