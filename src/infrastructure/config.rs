use crate::domain::models::{ColorOption, GridConfig};
use crate::infrastructure::error::InfraError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

const APP_JSON: &str = "app.json";
const GRID_JSON: &str = "grid.json";
const DEFAULT_GUEST_ID: &str = "guest";
const DEFAULT_SAVE_DEBOUNCE_MS: u64 = 100;

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigBundle {
    pub app: serde_json::Value,
    pub grid: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
struct GridFile {
    schema: u8,
    quantum_minutes: u32,
    hour_sequence: Vec<u32>,
    color_palette: Vec<ColorOption>,
    #[serde(default = "default_save_debounce_ms")]
    save_debounce_ms: u64,
}

fn default_save_debounce_ms() -> u64 {
    DEFAULT_SAVE_DEBOUNCE_MS
}

fn default_files() -> HashMap<&'static str, serde_json::Value> {
    let grid = GridConfig::default();
    HashMap::from([
        (
            APP_JSON,
            serde_json::json!({
                "schema": 1,
                "appName": "Day Blocks",
                "guestId": DEFAULT_GUEST_ID
            }),
        ),
        (
            GRID_JSON,
            serde_json::json!({
                "schema": 1,
                "quantumMinutes": grid.quantum_minutes,
                "hourSequence": grid.hour_sequence,
                "colorPalette": grid.color_palette,
                "saveDebounceMs": DEFAULT_SAVE_DEBOUNCE_MS
            }),
        ),
    ])
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    for (name, value) in default_files() {
        let path = config_dir.join(name);
        if !path.exists() {
            let formatted = serde_json::to_string_pretty(&value)?;
            fs::write(path, format!("{formatted}\n"))?;
        }
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != 1 {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

pub fn load_configs(config_dir: &Path) -> Result<ConfigBundle, InfraError> {
    Ok(ConfigBundle {
        app: read_config(&config_dir.join(APP_JSON))?,
        grid: read_config(&config_dir.join(GRID_JSON))?,
    })
}

fn read_grid_file(config_dir: &Path) -> Result<GridFile, InfraError> {
    let path = config_dir.join(GRID_JSON);
    let value = read_config(&path)?;
    serde_json::from_value(value).map_err(|error| {
        InfraError::InvalidConfig(format!("invalid grid settings in {}: {error}", path.display()))
    })
}

pub fn load_grid_config(config_dir: &Path) -> Result<GridConfig, InfraError> {
    let file = read_grid_file(config_dir)?;
    let grid = GridConfig {
        quantum_minutes: file.quantum_minutes,
        hour_sequence: file.hour_sequence,
        color_palette: file.color_palette,
    };
    grid.validate().map_err(InfraError::InvalidConfig)?;
    Ok(grid)
}

pub fn load_save_debounce(config_dir: &Path) -> Result<Duration, InfraError> {
    Ok(Duration::from_millis(read_grid_file(config_dir)?.save_debounce_ms))
}

/// Persists a grid chosen by the settings screen; the debounce setting is kept.
pub fn save_grid_config(config_dir: &Path, grid: &GridConfig) -> Result<(), InfraError> {
    grid.validate().map_err(InfraError::InvalidConfig)?;
    let save_debounce_ms = match read_grid_file(config_dir) {
        Ok(existing) => existing.save_debounce_ms,
        Err(InfraError::Io(_)) => DEFAULT_SAVE_DEBOUNCE_MS,
        Err(error) => return Err(error),
    };

    let file = GridFile {
        schema: 1,
        quantum_minutes: grid.quantum_minutes,
        hour_sequence: grid.hour_sequence.clone(),
        color_palette: grid.color_palette.clone(),
        save_debounce_ms,
    };
    let formatted = serde_json::to_string_pretty(&file)?;
    fs::write(config_dir.join(GRID_JSON), format!("{formatted}\n"))?;
    Ok(())
}

pub fn read_guest_id(config_dir: &Path) -> Result<String, InfraError> {
    let app = read_config(&config_dir.join(APP_JSON))?;
    let guest_id = app
        .get("guestId")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_GUEST_ID);
    Ok(guest_id.to_string())
}
