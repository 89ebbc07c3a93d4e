use crate::application::plan_sync::{PlanSyncService, SaveHandle, SaveOutcome};
use crate::domain::block_store::BlockStore;
use crate::domain::drag::{DragController, DragState, DragTransition};
use crate::domain::error::ScheduleError;
use crate::domain::models::{
    Block, DayMetadata, MainTask, OwnerKey, PlannerData, SegmentRecord, StaleBlock,
};
use crate::infrastructure::command_log::CommandLog;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::plan_store::PlanStore;
use chrono::NaiveDate;
use std::sync::Arc;

/// One open day: the block store, the drag gesture and the day's metadata.
/// Every committed change schedules a debounced whole-day save, so mutating
/// methods must be called from inside a tokio runtime.
pub struct DayPlanner<S>
where
    S: PlanStore + 'static,
{
    sync: PlanSyncService<S>,
    log: Arc<CommandLog>,
    owner: OwnerKey,
    date: NaiveDate,
    store: BlockStore,
    drag: DragController,
    metadata: DayMetadata,
    stale: Vec<StaleBlock>,
    unplaced_segments: Vec<SegmentRecord>,
    pending_save: Option<SaveHandle>,
}

impl<S> DayPlanner<S>
where
    S: PlanStore + 'static,
{
    pub async fn open(
        sync: PlanSyncService<S>,
        log: Arc<CommandLog>,
        owner: OwnerKey,
        date: NaiveDate,
    ) -> Result<Self, InfraError> {
        let grid = sync.grid().clone();
        let mut planner = Self {
            store: BlockStore::new(grid.clone()),
            drag: DragController::new(grid),
            sync,
            log,
            owner,
            date,
            metadata: DayMetadata::default(),
            stale: Vec::new(),
            unplaced_segments: Vec::new(),
            pending_save: None,
        };
        planner.load(date).await?;
        Ok(planner)
    }

    /// Flushes the current day, drops any gesture in progress and loads `date`.
    pub async fn open_day(&mut self, date: NaiveDate) -> Result<(), InfraError> {
        self.flush().await?;
        self.drag.cancel();
        self.load(date).await
    }

    async fn load(&mut self, date: NaiveDate) -> Result<(), InfraError> {
        let loaded = match self.sync.load(&self.owner, date).await {
            Ok(loaded) => loaded,
            Err(error) => return Err(self.fail("open_day", error)),
        };
        self.date = date;
        self.store = loaded.store;
        self.metadata = loaded.metadata;
        self.stale = loaded.stale;
        self.unplaced_segments = loaded.unplaced_segments;
        self.log.info(
            "open_day",
            &format!(
                "opened date={date} owner={} blocks={} stale={} unplaced_segments={}",
                self.owner.storage_key(),
                self.store.len(),
                self.stale.len(),
                self.unplaced_segments.len()
            ),
        );
        Ok(())
    }

    pub fn owner(&self) -> &OwnerKey {
        &self.owner
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Blocks ordered by position on the grid.
    pub fn blocks(&self) -> Vec<Block> {
        self.store.sorted()
    }

    pub fn block_store(&self) -> &BlockStore {
        &self.store
    }

    pub fn metadata(&self) -> &DayMetadata {
        &self.metadata
    }

    pub fn stale_blocks(&self) -> &[StaleBlock] {
        &self.stale
    }

    /// Stored segment rows whose cell is not on the current grid.
    pub fn unplaced_segments(&self) -> &[SegmentRecord] {
        &self.unplaced_segments
    }

    pub fn drag_state(&self) -> &DragState {
        self.drag.state()
    }

    pub fn selection(&self) -> Option<(usize, usize)> {
        self.drag.selection()
    }

    pub fn selected_color(&self) -> &str {
        self.drag.selected_color()
    }

    pub fn select_color(&mut self, color_id: &str) -> Result<(), InfraError> {
        self.drag
            .select_color(color_id)
            .map_err(|error| self.fail("select_color", error.into()))?;
        self.log.info("select_color", &format!("selected color_id={color_id}"));
        Ok(())
    }

    pub fn pointer_down(&mut self, slot: usize) -> DragTransition {
        self.drag.pointer_down(&self.store, slot)
    }

    pub fn pointer_enter(&mut self, slot: usize) -> DragTransition {
        self.drag.pointer_enter(slot)
    }

    pub fn pointer_up(&mut self) -> Result<DragTransition, InfraError> {
        match self.drag.pointer_up(&self.store) {
            Ok(transition) => Ok(transition),
            Err(error) => Err(self.fail("pointer_up", error.into())),
        }
    }

    /// Submits the label typed for the pending selection or edit. A blank
    /// label discards it.
    pub fn submit_label(&mut self, text: &str) -> Result<DragTransition, InfraError> {
        let transition = match self.drag.submit(&mut self.store, text) {
            Ok(transition) => transition,
            Err(error) => return Err(self.fail("submit_label", error.into())),
        };
        match &transition {
            DragTransition::Created(block) => self.log.info(
                "submit_label",
                &format!("created block_id={} at {}", block.id, block.time_label()),
            ),
            DragTransition::Updated(block) => self
                .log
                .info("submit_label", &format!("relabeled block_id={}", block.id)),
            DragTransition::Discarded => self.log.info("submit_label", "discarded blank label"),
            _ => {}
        }
        if transition.is_commit() {
            self.schedule_save("submit_label")?;
        }
        Ok(transition)
    }

    pub fn cancel_label(&mut self) -> DragTransition {
        self.drag.cancel()
    }

    /// Right click: deletes the block under `slot`.
    pub fn secondary_action(&mut self, slot: usize) -> Result<DragTransition, InfraError> {
        let transition = self.drag.secondary_action(&mut self.store, slot);
        if let DragTransition::Removed { block_id } = &transition {
            self.log
                .info("secondary_action", &format!("deleted block_id={block_id}"));
            self.schedule_save("secondary_action")?;
        }
        Ok(transition)
    }

    pub fn reschedule_block(
        &mut self,
        block_id: &str,
        hour: u32,
        start_minute: u32,
    ) -> Result<Block, InfraError> {
        let block = match self.store.reschedule(block_id, hour, start_minute) {
            Ok(block) => block,
            Err(error) => return Err(self.fail("reschedule_block", error.into())),
        };
        self.log.info(
            "reschedule_block",
            &format!("moved block_id={block_id} to {}", block.time_label()),
        );
        self.schedule_save("reschedule_block")?;
        Ok(block)
    }

    /// Removes whichever block covers `(hour, sub_slot)`. Returns the removed
    /// id, or `None` when the cell was already empty.
    pub fn remove_at(&mut self, hour: u32, sub_slot: u32) -> Result<Option<String>, InfraError> {
        let Some(block_id) = self.store.find_at(hour, sub_slot).map(|block| block.id.clone())
        else {
            return Ok(None);
        };
        self.store.remove(&block_id);
        self.log
            .info("remove_at", &format!("deleted block_id={block_id}"));
        self.schedule_save("remove_at")?;
        Ok(Some(block_id))
    }

    /// Drops stale blocks and unplaced segment rows; until then both are kept
    /// in every save. Returns how many were dropped.
    pub fn discard_stale_blocks(&mut self) -> Result<usize, InfraError> {
        let discarded = self.stale.len() + self.unplaced_segments.len();
        if discarded == 0 {
            return Ok(0);
        }
        self.log.info(
            "discard_stale_blocks",
            &format!(
                "discarded stale_blocks={} unplaced_segments={}",
                self.stale.len(),
                self.unplaced_segments.len()
            ),
        );
        self.stale.clear();
        self.unplaced_segments.clear();
        self.schedule_save("discard_stale_blocks")?;
        Ok(discarded)
    }

    pub fn add_main_task(&mut self) -> Result<usize, InfraError> {
        self.metadata.main_tasks.push(MainTask::default());
        let index = self.metadata.main_tasks.len() - 1;
        self.log.info("add_main_task", &format!("added main task index={index}"));
        self.schedule_save("add_main_task")?;
        Ok(index)
    }

    pub fn set_main_task_text(&mut self, index: usize, text: &str) -> Result<(), InfraError> {
        let task = self.main_task_mut("set_main_task_text", index)?;
        task.text = text.to_string();
        self.log
            .info("set_main_task_text", &format!("updated main task index={index}"));
        self.schedule_save("set_main_task_text")
    }

    pub fn toggle_main_task(&mut self, index: usize) -> Result<bool, InfraError> {
        let task = self.main_task_mut("toggle_main_task", index)?;
        task.completed = !task.completed;
        let completed = task.completed;
        self.log.info(
            "toggle_main_task",
            &format!("main task index={index} completed={completed}"),
        );
        self.schedule_save("toggle_main_task")?;
        Ok(completed)
    }

    pub fn set_freeform_notes(&mut self, text: &str) -> Result<(), InfraError> {
        self.metadata.freeform_notes = text.to_string();
        self.log.info(
            "set_freeform_notes",
            &format!("updated notes chars={}", text.chars().count()),
        );
        self.schedule_save("set_freeform_notes")
    }

    pub fn toggle_day_complete(&mut self) -> Result<bool, InfraError> {
        self.metadata.day_marked_complete = !self.metadata.day_marked_complete;
        let complete = self.metadata.day_marked_complete;
        self.log
            .info("toggle_day_complete", &format!("day complete={complete}"));
        self.schedule_save("toggle_day_complete")?;
        Ok(complete)
    }

    /// Waits for the pending save, if any.
    pub async fn flush(&mut self) -> Result<Option<SaveOutcome>, InfraError> {
        let Some(handle) = self.pending_save.take() else {
            return Ok(None);
        };
        match handle.wait().await {
            Ok(outcome) => {
                if let SaveOutcome::Saved(report) = &outcome {
                    if report.dropped_slots > 0 {
                        self.log.warn(
                            "save_day",
                            &format!(
                                "date={} dropped_slots={} unplaced_blocks={}",
                                self.date,
                                report.dropped_slots,
                                report.unplaced_block_ids.join(",")
                            ),
                        );
                    } else {
                        self.log.info("save_day", &format!("saved date={}", self.date));
                    }
                }
                Ok(Some(outcome))
            }
            Err(error) => Err(self.fail("save_day", error)),
        }
    }

    pub fn snapshot(&self) -> PlannerData {
        let mut blocks = self.store.sorted();
        blocks.extend(self.stale.iter().map(|stale| stale.block.clone()));
        PlannerData {
            metadata: self.metadata.clone(),
            blocks,
            unplaced_segments: self.unplaced_segments.clone(),
        }
    }

    fn schedule_save(&mut self, command: &str) -> Result<(), InfraError> {
        match self.sync.schedule_save(&self.owner, self.date, self.snapshot()) {
            Ok(handle) => {
                self.pending_save = Some(handle);
                Ok(())
            }
            Err(error) => Err(self.fail(command, error)),
        }
    }

    fn main_task_mut(&mut self, command: &str, index: usize) -> Result<&mut MainTask, InfraError> {
        if index >= self.metadata.main_tasks.len() {
            let error = ScheduleError::NotFound(format!("main task {index}"));
            return Err(self.fail(command, error.into()));
        }
        Ok(&mut self.metadata.main_tasks[index])
    }

    fn fail(&self, command: &str, error: InfraError) -> InfraError {
        self.log.command_error(command, &error);
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::workspace::Workspace;
    use crate::domain::drag::LabelMode;
    use crate::domain::models::{GridConfig, PersistedPlan, SegmentRecord, StoredDay};
    use crate::infrastructure::config::save_grid_config;
    use crate::infrastructure::sqlite_plan_store::SqlitePlanStore;
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
                "dayblocks-planner-tests-{}-{}",
                std::process::id(),
                sequence
            ));
            fs::create_dir_all(&path).expect("create temp workspace");
            Self { path }
        }

        fn workspace(&self) -> Workspace {
            Workspace::open(&self.path).expect("open workspace")
        }
    }

    impl Drop for TempWorkspace {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.path);
        }
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, day).expect("valid date")
    }

    // Default grid: hours 4..=12 at 10 minutes, so 09:00 is slot 30.
    const NINE_AM: usize = 30;

    fn drag_create<S: PlanStore + 'static>(
        planner: &mut DayPlanner<S>,
        from: usize,
        to: usize,
        label: &str,
    ) -> Block {
        planner.pointer_down(from);
        planner.pointer_enter(to);
        planner.pointer_up().expect("pointer up");
        match planner.submit_label(label).expect("submit label") {
            DragTransition::Created(block) => block,
            other => panic!("expected created block, got {other:?}"),
        }
    }

    async fn stored_rows(
        store: &SqlitePlanStore,
        owner: &OwnerKey,
        day: NaiveDate,
    ) -> Vec<SegmentRecord> {
        match store.fetch_day(owner, day).await.expect("fetch") {
            Some(StoredDay {
                plan: PersistedPlan::Segments(segments),
                ..
            }) => segments,
            other => panic!("expected segment rows, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn drag_created_block_survives_reopen_for_guest() {
        let temp = TempWorkspace::new();
        let workspace = temp.workspace();
        let mut planner = workspace.guest_planner(date(16)).await.expect("open planner");

        let block = drag_create(&mut planner, NINE_AM + 2, NINE_AM, "  Deep work ");
        assert_eq!((block.hour, block.start_minute, block.duration_minutes), (9, 0, 30));
        assert_eq!(block.content, "Deep work");
        assert_eq!(block.time_label(), "09:00 - 09:30");
        assert!(matches!(
            planner.flush().await.expect("flush"),
            Some(SaveOutcome::Saved(_))
        ));

        let reopened = workspace.guest_planner(date(16)).await.expect("reopen");
        assert_eq!(reopened.blocks(), vec![block]);
    }

    #[tokio::test]
    async fn account_days_are_stored_as_segments_and_merged_on_load() {
        let temp = TempWorkspace::new();
        let workspace = temp.workspace();
        let mut planner = workspace
            .account_planner("u-42", date(16))
            .await
            .expect("open planner");

        drag_create(&mut planner, NINE_AM, NINE_AM + 1, "Standup");
        drag_create(&mut planner, NINE_AM + 3, NINE_AM + 3, "Email");
        planner.flush().await.expect("flush");

        let store = SqlitePlanStore::new(&workspace.paths().database_path);
        let stored = store
            .fetch_day(&OwnerKey::account("u-42"), date(16))
            .await
            .expect("fetch")
            .expect("day saved");
        let PersistedPlan::Segments(segments) = stored.plan else {
            panic!("expected segment rows");
        };
        assert_eq!(segments.len(), 3);

        let reopened = workspace
            .account_planner("u-42", date(16))
            .await
            .expect("reopen");
        let schedule = reopened
            .blocks()
            .into_iter()
            .map(|block| (block.hour, block.start_minute, block.duration_minutes, block.content))
            .collect::<Vec<_>>();
        assert_eq!(
            schedule,
            vec![
                (9, 0, 20, "Standup".to_string()),
                (9, 30, 10, "Email".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn blank_label_discards_selection_without_saving() {
        let temp = TempWorkspace::new();
        let workspace = temp.workspace();
        let mut planner = workspace.guest_planner(date(16)).await.expect("open planner");

        planner.pointer_down(NINE_AM);
        planner.pointer_up().expect("pointer up");
        assert_eq!(
            planner.submit_label("   ").expect("submit"),
            DragTransition::Discarded
        );

        assert!(planner.blocks().is_empty());
        assert_eq!(planner.flush().await.expect("flush"), None);
        assert_eq!(planner.drag_state(), &DragState::Idle);
    }

    #[tokio::test]
    async fn overlapping_drag_is_rejected_and_resets_gesture() {
        let temp = TempWorkspace::new();
        let workspace = temp.workspace();
        let mut planner = workspace.guest_planner(date(16)).await.expect("open planner");
        drag_create(&mut planner, NINE_AM, NINE_AM + 2, "Meeting");

        planner.pointer_down(NINE_AM + 4);
        planner.pointer_enter(NINE_AM + 1);
        let result = planner.pointer_up();

        assert!(matches!(
            result,
            Err(InfraError::Schedule(ScheduleError::Overlap { .. }))
        ));
        assert_eq!(planner.drag_state(), &DragState::Idle);
        assert_eq!(planner.blocks().len(), 1);
    }

    #[tokio::test]
    async fn clicking_a_block_relabels_it_in_place() {
        let temp = TempWorkspace::new();
        let workspace = temp.workspace();
        let mut planner = workspace.guest_planner(date(16)).await.expect("open planner");
        let created = drag_create(&mut planner, NINE_AM, NINE_AM + 1, "Draft");

        let transition = planner.pointer_down(NINE_AM + 1);
        assert_eq!(
            transition,
            DragTransition::EditRequested {
                block_id: created.id.clone(),
                prefill: "Draft".to_string()
            }
        );
        assert!(matches!(
            planner.drag_state(),
            DragState::PendingLabel {
                mode: LabelMode::Editing { .. },
                ..
            }
        ));
        let updated = planner.submit_label("Final").expect("submit");

        let DragTransition::Updated(block) = updated else {
            panic!("expected update");
        };
        assert_eq!(block.id, created.id);
        assert_eq!(block.content, "Final");
    }

    #[tokio::test]
    async fn remove_and_reschedule_keep_store_consistent() {
        let temp = TempWorkspace::new();
        let workspace = temp.workspace();
        let mut planner = workspace.guest_planner(date(16)).await.expect("open planner");
        let first = drag_create(&mut planner, NINE_AM, NINE_AM + 2, "First");
        let second = drag_create(&mut planner, NINE_AM + 6, NINE_AM + 6, "Second");

        let conflict = planner.reschedule_block(&second.id, 9, 10);
        assert!(matches!(
            conflict,
            Err(InfraError::Schedule(ScheduleError::Conflict { .. }))
        ));
        let moved = planner.reschedule_block(&second.id, 11, 0).expect("reschedule");
        assert_eq!((moved.hour, moved.start_minute, moved.duration_minutes), (11, 0, 10));

        assert_eq!(planner.remove_at(9, 1).expect("remove"), Some(first.id));
        assert_eq!(planner.remove_at(9, 1).expect("remove again"), None);
        assert!(matches!(
            planner.secondary_action(NINE_AM + 12).expect("right click"),
            DragTransition::Removed { .. }
        ));
        assert!(planner.blocks().is_empty());
    }

    #[tokio::test]
    async fn metadata_edits_are_persisted() {
        let temp = TempWorkspace::new();
        let workspace = temp.workspace();
        let mut planner = workspace.guest_planner(date(16)).await.expect("open planner");

        let index = planner.add_main_task().expect("add task");
        planner
            .set_main_task_text(index, "Finish the proposal")
            .expect("set text");
        assert!(planner.toggle_main_task(index).expect("toggle"));
        planner.set_freeform_notes("buy milk").expect("notes");
        assert!(planner.toggle_day_complete().expect("complete"));
        assert!(matches!(
            planner.toggle_main_task(5),
            Err(InfraError::Schedule(ScheduleError::NotFound(_)))
        ));
        planner.flush().await.expect("flush");

        let reopened = workspace.guest_planner(date(16)).await.expect("reopen");
        assert_eq!(
            reopened.metadata(),
            &DayMetadata {
                main_tasks: vec![MainTask {
                    text: "Finish the proposal".to_string(),
                    completed: true,
                }],
                freeform_notes: "buy milk".to_string(),
                day_marked_complete: true,
            }
        );
    }

    #[tokio::test]
    async fn open_day_flushes_and_discards_gesture() {
        let temp = TempWorkspace::new();
        let workspace = temp.workspace();
        let mut planner = workspace.guest_planner(date(16)).await.expect("open planner");
        drag_create(&mut planner, NINE_AM, NINE_AM, "Monday");
        planner.pointer_down(NINE_AM + 6);

        planner.open_day(date(17)).await.expect("open tuesday");

        assert_eq!(planner.date(), date(17));
        assert!(planner.blocks().is_empty());
        assert_eq!(planner.drag_state(), &DragState::Idle);
        assert_eq!(
            workspace
                .guest_planner(date(16))
                .await
                .expect("reopen monday")
                .blocks()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn stale_blocks_are_kept_until_discarded() {
        let temp = TempWorkspace::new();
        let workspace = temp.workspace();
        let mut planner = workspace.guest_planner(date(16)).await.expect("open planner");
        drag_create(&mut planner, NINE_AM, NINE_AM, "Early");
        planner.flush().await.expect("flush");

        let narrowed = GridConfig::new(10, (10..=12).collect()).expect("grid");
        save_grid_config(&workspace.paths().config_dir, &narrowed).expect("save grid");
        let workspace = temp.workspace();

        let mut planner = workspace.guest_planner(date(16)).await.expect("reopen");
        assert!(planner.blocks().is_empty());
        assert_eq!(planner.stale_blocks().len(), 1);
        assert!(planner.stale_blocks()[0].reason.is_out_of_range());

        planner.set_freeform_notes("still here").expect("notes");
        planner.flush().await.expect("flush");
        let planner_again = workspace.guest_planner(date(16)).await.expect("reopen again");
        assert_eq!(planner_again.stale_blocks().len(), 1);

        let mut planner = planner_again;
        assert_eq!(planner.discard_stale_blocks().expect("discard"), 1);
        planner.flush().await.expect("flush");
        assert!(
            workspace
                .guest_planner(date(16))
                .await
                .expect("final reopen")
                .stale_blocks()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn unplaced_segment_rows_are_kept_until_discarded_for_accounts() {
        let temp = TempWorkspace::new();
        let workspace = temp.workspace();
        let owner = OwnerKey::account("u-7");
        let mut planner = workspace
            .account_planner("u-7", date(16))
            .await
            .expect("open planner");
        drag_create(&mut planner, NINE_AM, NINE_AM, "Early");
        planner.flush().await.expect("flush");

        let narrowed = GridConfig::new(10, (10..=12).collect()).expect("grid");
        save_grid_config(&workspace.paths().config_dir, &narrowed).expect("save grid");
        let workspace = temp.workspace();
        let store = SqlitePlanStore::new(&workspace.paths().database_path);

        let mut planner = workspace
            .account_planner("u-7", date(16))
            .await
            .expect("reopen");
        assert!(planner.blocks().is_empty());
        assert_eq!(planner.unplaced_segments().len(), 1);
        assert_eq!(planner.unplaced_segments()[0].hour, 9);

        planner.set_freeform_notes("still here").expect("notes");
        planner.flush().await.expect("flush");
        let rows = stored_rows(&store, &owner, date(16)).await;
        assert_eq!(rows.len(), 1);
        assert_eq!((rows[0].hour, rows[0].segment, rows[0].content.as_str()), (9, 0, "Early"));

        let mut planner = workspace
            .account_planner("u-7", date(16))
            .await
            .expect("reopen again");
        assert_eq!(planner.metadata().freeform_notes, "still here");
        assert_eq!(planner.unplaced_segments().len(), 1);
        assert_eq!(planner.discard_stale_blocks().expect("discard"), 1);
        assert!(planner.unplaced_segments().is_empty());
        planner.flush().await.expect("flush");
        assert!(stored_rows(&store, &owner, date(16)).await.is_empty());
    }

    #[tokio::test]
    async fn unknown_color_is_rejected_and_logged() {
        let temp = TempWorkspace::new();
        let workspace = temp.workspace();
        let mut planner = workspace.guest_planner(date(16)).await.expect("open planner");

        planner.select_color("green").expect("palette color");
        let created = drag_create(&mut planner, NINE_AM, NINE_AM, "Walk");
        assert_eq!(created.color_id, "green");
        assert!(matches!(
            planner.select_color("magenta"),
            Err(InfraError::Schedule(ScheduleError::UnknownColor(_)))
        ));

        let log = fs::read_to_string(workspace.paths().logs_dir.join("commands.log"))
            .expect("read log");
        assert!(log.lines().any(|line| line.contains("\"command\":\"select_color\"")
            && line.contains("\"level\":\"error\"")));
    }

    #[tokio::test]
    async fn legacy_segment_rows_in_guest_store_are_decoded() {
        let temp = TempWorkspace::new();
        let workspace = temp.workspace();
        let guest = workspace.guest_store();
        let owner = workspace.guest_owner();
        guest
            .replace_day(&owner, date(18), StoredDay {
                plan: PersistedPlan::Segments(vec![
                    SegmentRecord {
                        hour: 7,
                        segment: 0,
                        content: "Run".to_string(),
                        color: None,
                    },
                    SegmentRecord {
                        hour: 7,
                        segment: 1,
                        content: "Run".to_string(),
                        color: None,
                    },
                ]),
                metadata: DayMetadata::default(),
            })
            .await
            .expect("seed legacy day");

        let planner = workspace.guest_planner(date(18)).await.expect("open planner");

        let blocks = planner.blocks();
        assert_eq!(blocks.len(), 1);
        assert_eq!((blocks[0].hour, blocks[0].duration_minutes), (7, 20));
        assert_eq!(blocks[0].color_id, "blue");
    }
}
