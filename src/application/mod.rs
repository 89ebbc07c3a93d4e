pub mod bootstrap;
pub mod plan_sync;
pub mod planner;
pub mod workspace;
