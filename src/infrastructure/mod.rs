pub mod command_log;
pub mod config;
pub mod error;
pub mod guest_store;
pub mod plan_store;
pub mod sqlite_plan_store;
pub mod storage;
