//! Store handle for Charter's on-disk state.
//!
//! A Store is the `.charter/` directory of a governed repository. Every
//! database, event log and config file the workflow touches is resolved
//! relative to its root.

use crate::core::error::CharterError;
use std::fs;
use std::path::{Path, PathBuf};

pub const STORE_DIR_NAME: &str = ".charter";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const NOTIFY_LOG_NAME: &str = "amendment.events.jsonl";

/// Store handle representing a Charter state workspace.
#[derive(Debug, Clone)]
pub struct Store {
    /// Absolute path to the `.charter` directory
    pub root: PathBuf,
}

impl Store {
    /// Create `<dir>/.charter` if missing and return a handle to it.
    pub fn init(dir: &Path) -> Result<Self, CharterError> {
        let root = dir.join(STORE_DIR_NAME);
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Walk up from `start_dir` to the nearest ancestor holding a `.charter` directory.
    pub fn discover(start_dir: &Path) -> Result<Self, CharterError> {
        let mut current_dir = PathBuf::from(start_dir);
        loop {
            let candidate = current_dir.join(STORE_DIR_NAME);
            if candidate.is_dir() {
                return Ok(Self { root: candidate });
            }
            if !current_dir.pop() {
                return Err(CharterError::ConfigError(format!(
                    "'{}' directory not found in current or parent directories. Run `charter init` first.",
                    STORE_DIR_NAME
                )));
            }
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE_NAME)
    }

    pub fn notify_log_path(&self) -> PathBuf {
        self.root.join(NOTIFY_LOG_NAME)
    }
}
