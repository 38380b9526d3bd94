use std::{sync::OnceLock, time::Duration};

use camino::{Utf8Path, Utf8PathBuf};
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{bug_msg, ConfigError};

pub type SharedConfig = RwLock<Config>;

// this is usually initialized by the app itself
pub static CONFIG: OnceLock<SharedConfig> = OnceLock::new();

/// The name of the config file inside the data directory.
pub const CONFIG_FILE_NAME: &str = "pinboard.toml";

#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the pin database and image blobs live.
    pub data_dir: Utf8PathBuf,

    /// Author stamped onto every new pin.
    pub author: String,

    /// The board new pins are placed on.
    pub board: String,

    /// Tags a freshly opened composer starts out with.
    pub default_tags: Vec<String>,

    /// Images larger than this are compressed before upload.
    pub max_upload_bytes: usize,

    /// How long any single backend call may take. Zero disables the limit.
    pub backend_timeout_secs: u64,

    /// Re-apply the search text after each refresh instead of clearing it.
    pub keep_filter_on_refresh: bool,

    /// Where users should report bugs.
    pub bug_report_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: Utf8PathBuf::from("pinboard_data"),
            author: String::from("pinboard"),
            board: String::from("default"),
            default_tags: vec![String::from("Default"), String::from("Pin")],
            max_upload_bytes: 1024 * 1024,
            backend_timeout_secs: 30,
            keep_filter_on_refresh: false,
            bug_report_url: String::from("https://github.com/pinboard-rs/pinboard/issues"),
        }
    }
}

impl Config {
    pub fn new(data_dir: Utf8PathBuf) -> Self {
        Self {
            data_dir,
            ..Default::default()
        }
    }

    /// Attempts to read a previous `Config` from disk.
    ///
    /// Missing fields fall back to their defaults.
    pub async fn from_disk(data_dir: &Utf8Path) -> Result<Self, ConfigError> {
        let s = tokio::fs::read_to_string(data_dir.join(CONFIG_FILE_NAME))
            .await
            .map_err(ConfigError::ReadFailed)?;

        let s: Self = toml::from_str(s.as_str()).map_err(ConfigError::ParseFailed)?;

        // the file has to describe the folder it came from
        if s.data_dir.as_path() != data_dir {
            tracing::error!(
                "loaded config from disk, but its data dir (`{}`) isn't `{data_dir}`.",
                s.data_dir
            );
            return Err(ConfigError::PathMismatch);
        }

        Ok(s)
    }

    /// Use this once, before anything reads the config, to install it.
    ///
    /// Otherwise, the first read installs [`Config::default`].
    pub async fn init_config(config: Config) {
        if CONFIG.set(RwLock::new(config)).is_err() {
            tracing::error!(
                "attempted to init the config, but the config is already running. {}",
                bug_msg().await
            )
        }
    }

    /// Grabs the config for reading.
    ///
    /// Note that while you're reading the config, others cannot write to it.
    /// DO NOT HOLD ONTO IT FOR A LONG TIME.
    pub async fn read() -> RwLockReadGuard<'static, Config> {
        Self::shared().read().await
    }

    pub async fn write() -> RwLockWriteGuard<'static, Config> {
        Self::shared().write().await
    }

    /// Path to the pin database file.
    pub fn database_path(&self) -> Utf8PathBuf {
        self.data_dir.join("pinboard.sqlite")
    }

    /// Folder holding one blob per pin.
    pub fn blobs_dir(&self) -> Utf8PathBuf {
        self.data_dir.join("blobs")
    }

    /// The backend timeout, if there is one.
    pub fn backend_timeout(&self) -> Option<Duration> {
        (self.backend_timeout_secs > 0).then(|| Duration::from_secs(self.backend_timeout_secs))
    }

    fn shared() -> &'static SharedConfig {
        CONFIG.get_or_init(|| RwLock::new(Config::default()))
    }
}
