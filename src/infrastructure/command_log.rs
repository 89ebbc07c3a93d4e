use chrono::Utc;
use log::{error, info, warn};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const COMMAND_LOG_FILE: &str = "commands.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Append-only JSON-lines log of planner commands, one object per line with
/// `timestamp`, `level`, `command` and `message`. Entries are mirrored to the
/// `log` facade.
#[derive(Debug)]
pub struct CommandLog {
    path: PathBuf,
    guard: Mutex<()>,
}

impl CommandLog {
    pub fn new(logs_dir: &Path) -> Self {
        Self {
            path: logs_dir.join(COMMAND_LOG_FILE),
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn info(&self, command: &str, message: &str) {
        info!("command={command} {message}");
        self.append(LogLevel::Info, command, message);
    }

    pub fn warn(&self, command: &str, message: &str) {
        warn!("command={command} {message}");
        self.append(LogLevel::Warn, command, message);
    }

    pub fn error(&self, command: &str, message: &str) {
        error!("command={command} {message}");
        self.append(LogLevel::Error, command, message);
    }

    /// Logs `error` against `command` and hands back its display text.
    pub fn command_error(&self, command: &str, error: &impl std::fmt::Display) -> String {
        let message = error.to_string();
        self.error(command, &message);
        message
    }

    fn append(&self, level: LogLevel, command: &str, message: &str) {
        let Ok(_guard) = self.guard.lock() else {
            return;
        };
        let payload = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "level": level.as_str(),
            "command": command,
            "message": message,
        });

        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(file, "{payload}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT_TEMP_LOG_DIR: AtomicUsize = AtomicUsize::new(0);

    struct TempLogDir {
        path: PathBuf,
    }

    impl TempLogDir {
        fn new() -> Self {
            let sequence = NEXT_TEMP_LOG_DIR.fetch_add(1, Ordering::Relaxed);
            let path = std::env::temp_dir().join(format!(
                "dayblocks-log-tests-{}-{}",
                std::process::id(),
                sequence
            ));
            fs::create_dir_all(&path).expect("create temp log dir");
            Self { path }
        }
    }

    impl Drop for TempLogDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.path);
        }
    }

    #[test]
    fn entries_are_appended_as_json_lines() {
        let dir = TempLogDir::new();
        let log = CommandLog::new(&dir.path);

        log.info("add_block", "created block_id=blk-1");
        let message = log.command_error("save_day", &"disk full");

        assert_eq!(message, "disk full");
        let raw = fs::read_to_string(log.path()).expect("read log");
        let lines = raw
            .lines()
            .map(|line| serde_json::from_str::<serde_json::Value>(line).expect("json line"))
            .collect::<Vec<_>>();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["level"], "info");
        assert_eq!(lines[0]["command"], "add_block");
        assert_eq!(lines[1]["level"], "error");
        assert_eq!(lines[1]["message"], "disk full");
        assert!(lines[1]["timestamp"].as_str().is_some());
    }

    #[test]
    fn missing_log_dir_is_tolerated() {
        let log = CommandLog::new(Path::new("/nonexistent/dayblocks/logs"));
        log.warn("open_day", "no log dir");
    }
}
