use crate::application::bootstrap::{BootstrapResult, bootstrap_workspace};
use crate::application::plan_sync::PlanSyncService;
use crate::application::planner::DayPlanner;
use crate::domain::grid::GridIndex;
use crate::domain::models::OwnerKey;
use crate::infrastructure::command_log::CommandLog;
use crate::infrastructure::config::{load_grid_config, load_save_debounce, read_guest_id};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::guest_store::GuestFilePlanStore;
use crate::infrastructure::plan_store::PlanStore;
use crate::infrastructure::sqlite_plan_store::SqlitePlanStore;
use chrono::NaiveDate;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// A bootstrapped planner directory with its grid and save settings loaded.
/// Guests get the device-local file store, accounts the SQLite store.
pub struct Workspace {
    paths: BootstrapResult,
    grid: GridIndex,
    save_debounce: Duration,
    guest_id: String,
    log: Arc<CommandLog>,
}

impl Workspace {
    pub fn open(workspace_root: &Path) -> Result<Self, InfraError> {
        let paths = bootstrap_workspace(workspace_root)?;
        let grid = GridIndex::new(load_grid_config(&paths.config_dir)?)?;
        let save_debounce = load_save_debounce(&paths.config_dir)?;
        let guest_id = read_guest_id(&paths.config_dir)?;
        let log = Arc::new(CommandLog::new(&paths.logs_dir));
        log.info(
            "bootstrap",
            &format!(
                "workspace={} quantum_minutes={} hours={}",
                paths.workspace_root.display(),
                grid.quantum_minutes(),
                grid.config().hour_sequence.len()
            ),
        );

        Ok(Self {
            paths,
            grid,
            save_debounce,
            guest_id,
            log,
        })
    }

    pub fn paths(&self) -> &BootstrapResult {
        &self.paths
    }

    pub fn grid(&self) -> &GridIndex {
        &self.grid
    }

    pub fn save_debounce(&self) -> Duration {
        self.save_debounce
    }

    pub fn command_log(&self) -> &Arc<CommandLog> {
        &self.log
    }

    pub fn guest_owner(&self) -> OwnerKey {
        OwnerKey::guest(&self.guest_id)
    }

    pub fn guest_store(&self) -> GuestFilePlanStore {
        GuestFilePlanStore::new(&self.paths.guest_dir)
    }

    pub fn account_store(&self) -> SqlitePlanStore {
        SqlitePlanStore::new(&self.paths.database_path)
    }

    pub async fn guest_planner(
        &self,
        date: NaiveDate,
    ) -> Result<DayPlanner<GuestFilePlanStore>, InfraError> {
        self.planner(self.guest_store(), self.guest_owner(), date).await
    }

    pub async fn account_planner(
        &self,
        account_id: &str,
        date: NaiveDate,
    ) -> Result<DayPlanner<SqlitePlanStore>, InfraError> {
        self.planner(self.account_store(), OwnerKey::account(account_id), date)
            .await
    }

    async fn planner<S>(
        &self,
        store: S,
        owner: OwnerKey,
        date: NaiveDate,
    ) -> Result<DayPlanner<S>, InfraError>
    where
        S: PlanStore + 'static,
    {
        let sync = PlanSyncService::new(Arc::new(store), self.grid.clone(), self.save_debounce);
        DayPlanner::open(sync, Arc::clone(&self.log), owner, date).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT_TEMP_WORKSPACE: AtomicUsize = AtomicUsize::new(0);

    struct TempWorkspace {
        path: PathBuf,
    }

    impl TempWorkspace {
        fn new() -> Self {
            let sequence = NEXT_TEMP_WORKSPACE.fetch_add(1, Ordering::Relaxed);
            let path = std::env::temp_dir().join(format!(
                "dayblocks-workspace-tests-{}-{}",
                std::process::id(),
                sequence
            ));
            fs::create_dir_all(&path).expect("create temp workspace");
            Self { path }
        }
    }

    impl Drop for TempWorkspace {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.path);
        }
    }

    #[test]
    fn open_loads_default_settings() {
        let temp = TempWorkspace::new();
        let workspace = Workspace::open(&temp.path).expect("open workspace");

        assert_eq!(workspace.grid().total_slots(), 54);
        assert_eq!(workspace.save_debounce(), Duration::from_millis(100));
        assert_eq!(workspace.guest_owner(), OwnerKey::guest("guest"));
        assert!(workspace.command_log().path().is_file());
    }

    #[test]
    fn open_rejects_an_invalid_grid() {
        let temp = TempWorkspace::new();
        let config_dir = temp.path.join("config");
        fs::create_dir_all(&config_dir).expect("create config dir");
        fs::write(
            config_dir.join("grid.json"),
            r##"{"schema":1,"quantumMinutes":10,"hourSequence":[9,9],"colorPalette":[{"id":"blue","color":"#00f","label":"Blue"}]}"##,
        )
        .expect("write grid.json");

        assert!(matches!(
            Workspace::open(&temp.path),
            Err(InfraError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn saved_dates_are_listed_per_owner() {
        let temp = TempWorkspace::new();
        let workspace = Workspace::open(&temp.path).expect("open workspace");
        let monday = NaiveDate::from_ymd_opt(2026, 2, 16).expect("date");

        let mut planner = workspace.guest_planner(monday).await.expect("open planner");
        planner.set_freeform_notes("plan the week").expect("notes");
        planner.flush().await.expect("flush");

        let guest_dates = workspace
            .guest_store()
            .list_dates(&workspace.guest_owner())
            .await
            .expect("guest dates");
        let account_dates = workspace
            .account_store()
            .list_dates(&OwnerKey::account("u-1"))
            .await
            .expect("account dates");
        assert_eq!(guest_dates, vec![monday]);
        assert!(account_dates.is_empty());
    }
}
