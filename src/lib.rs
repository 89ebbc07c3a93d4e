pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::plan_sync::{LoadedPlan, PlanSyncService, SaveHandle, SaveOutcome, SaveReport};
pub use application::planner::DayPlanner;
pub use application::workspace::Workspace;
pub use domain::block_store::BlockStore;
pub use domain::drag::{DragController, DragState, DragTransition, LabelMode};
pub use domain::error::ScheduleError;
pub use domain::grid::GridIndex;
pub use domain::models::{
    Block, BlockDraft, BlockPatch, DayMetadata, GridConfig, MainTask, OwnerKey, PersistedPlan,
    PlanShape, PlannerData, SegmentRecord, StaleBlock, StoredDay,
};
pub use domain::segment_codec::{DecodeReport, EncodeReport, SegmentCodec};
pub use infrastructure::error::InfraError;
pub use infrastructure::guest_store::GuestFilePlanStore;
pub use infrastructure::plan_store::{InMemoryPlanStore, PlanStore};
pub use infrastructure::sqlite_plan_store::SqlitePlanStore;
