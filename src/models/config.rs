use super::directory::{DirectorySpec, default_directories};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

/// Core configuration from appcore.yaml
///
/// Every field has a default, so a missing or partial file still produces a
/// usable configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Base directory under exclusive application ownership
    pub base_dir: Utf8PathBuf,

    /// Preference file, relative to `base_dir` unless absolute
    pub preferences_file: Utf8PathBuf,

    /// Root of removable/external storage; `None` when not present
    pub external_storage_dir: Option<Utf8PathBuf>,

    /// Working directories created at startup, in order
    pub directories: Vec<DirectorySpec>,

    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log directory, relative to `base_dir` unless absolute
    pub dir: Utf8PathBuf,

    /// File name prefix for the rotating log files
    pub prefix: String,

    pub debug_mode: bool,

    /// Also log to the console with ANSI colors
    pub console: bool,

    /// Write the file log as JSON lines
    pub json: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            base_dir: Utf8PathBuf::from("appcore-data"),
            preferences_file: Utf8PathBuf::from("preferences.yaml"),
            external_storage_dir: None,
            directories: default_directories(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: Utf8PathBuf::from("log"),
            prefix: "appcore".to_string(),
            debug_mode: false,
            console: true,
            json: false,
        }
    }
}

impl CoreConfig {
    /// Create a default configuration rooted at `base_dir`
    pub fn with_base_dir(base_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Self::default()
        }
    }

    pub fn preferences_path(&self) -> Utf8PathBuf {
        self.under_base(&self.preferences_file)
    }

    pub fn log_dir(&self) -> Utf8PathBuf {
        self.under_base(&self.logging.dir)
    }

    fn under_base(&self, path: &Utf8Path) -> Utf8PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}
