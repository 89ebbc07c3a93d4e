use crate::infrastructure::config::{ensure_default_configs, load_configs};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::storage::initialize_database;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct BootstrapResult {
    pub workspace_root: PathBuf,
    pub config_dir: PathBuf,
    pub guest_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub database_path: PathBuf,
}

pub fn bootstrap_workspace(workspace_root: &Path) -> Result<BootstrapResult, InfraError> {
    let config_dir = workspace_root.join("config");
    let state_dir = workspace_root.join("state");
    let guest_dir = state_dir.join("guest");
    let logs_dir = workspace_root.join("logs");
    let database_path = state_dir.join("planner.sqlite");

    fs::create_dir_all(&config_dir)?;
    fs::create_dir_all(&guest_dir)?;
    fs::create_dir_all(&logs_dir)?;

    ensure_default_configs(&config_dir)?;
    let _ = load_configs(&config_dir)?;
    initialize_database(&database_path)?;

    Ok(BootstrapResult {
        workspace_root: workspace_root.to_path_buf(),
        config_dir,
        guest_dir,
        logs_dir,
        database_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT_TEMP_ROOT: AtomicUsize = AtomicUsize::new(0);

    #[test]
    fn bootstrap_creates_layout_and_is_repeatable() {
        let sequence = NEXT_TEMP_ROOT.fetch_add(1, Ordering::Relaxed);
        let root = std::env::temp_dir().join(format!(
            "dayblocks-bootstrap-tests-{}-{}",
            std::process::id(),
            sequence
        ));

        let first = bootstrap_workspace(&root).expect("first bootstrap");
        let second = bootstrap_workspace(&root).expect("second bootstrap");

        assert!(first.config_dir.join("app.json").is_file());
        assert!(first.config_dir.join("grid.json").is_file());
        assert!(first.guest_dir.is_dir());
        assert!(first.logs_dir.is_dir());
        assert!(first.database_path.is_file());
        assert_eq!(first.database_path, second.database_path);

        let _ = fs::remove_dir_all(&root);
    }
}
