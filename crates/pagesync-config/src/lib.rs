use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

/// Empirically tuned thresholds for the synchronization engine.
///
/// None of these values are contracts; they control how aggressively the
/// engine debounces, how long its guard cooldowns last, and how the
/// progressive renderer batches pages. Every field has a default so a partial
/// config file only overrides what it names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncTuning {
    /// How long after the last keystroke outbound sync stays suppressed.
    pub typing_cooldown_ms: u64,
    /// Window after a programmatic scroll during which observed scroll events
    /// on that view are treated as our own echo rather than user input.
    pub scroll_cooldown_ms: u64,
    /// Window after session construction during which observed scroll events
    /// are attributed to initial layout settling, not the user.
    pub mount_warmup_ms: u64,
    /// Debounce for editor-driven sync while the user is idle.
    pub debounce_idle_ms: u64,
    /// Debounce for editor-driven sync while the user is typing.
    pub debounce_typing_ms: u64,
    /// Lighter debounce used in two-way mode.
    pub two_way_debounce_ms: u64,
    /// Delay between installing a fresh source map and re-syncing the preview,
    /// giving rasterization a chance to catch up.
    pub rasterize_settle_ms: u64,
    /// Container resize deltas smaller than this are treated as layout noise.
    pub resize_threshold_px: f64,
    /// Number of pages rasterized up front before viewport prioritisation.
    pub initial_page_batch: usize,
    /// Pages above/below the viewport included in the viewport batch.
    pub viewport_buffer_pages: u32,
    /// Chunk size for low-priority background rasterization.
    pub background_chunk_pages: usize,
}

impl Default for SyncTuning {
    fn default() -> Self {
        Self {
            typing_cooldown_ms: 1500,
            scroll_cooldown_ms: 200,
            mount_warmup_ms: 400,
            debounce_idle_ms: 100,
            debounce_typing_ms: 350,
            two_way_debounce_ms: 50,
            rasterize_settle_ms: 150,
            resize_threshold_px: 4.0,
            initial_page_batch: 3,
            viewport_buffer_pages: 2,
            background_chunk_pages: 4,
        }
    }
}

impl SyncTuning {
    pub fn typing_cooldown(&self) -> Duration {
        Duration::from_millis(self.typing_cooldown_ms)
    }

    pub fn scroll_cooldown(&self) -> Duration {
        Duration::from_millis(self.scroll_cooldown_ms)
    }

    pub fn mount_warmup(&self) -> Duration {
        Duration::from_millis(self.mount_warmup_ms)
    }

    pub fn debounce_idle(&self) -> Duration {
        Duration::from_millis(self.debounce_idle_ms)
    }

    pub fn debounce_typing(&self) -> Duration {
        Duration::from_millis(self.debounce_typing_ms)
    }

    pub fn two_way_debounce(&self) -> Duration {
        Duration::from_millis(self.two_way_debounce_ms)
    }

    pub fn rasterize_settle(&self) -> Duration {
        Duration::from_millis(self.rasterize_settle_ms)
    }

    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let config: SyncTuning =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/pagesync");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }
}
