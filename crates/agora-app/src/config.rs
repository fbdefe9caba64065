//! Application configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the app can start with zero
//! configuration for local development.

use std::path::PathBuf;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory holding the SQLite database file. When unset the store
    /// resolves the platform data directory itself.
    /// Env: `AGORA_DATA_DIR`
    /// Default: none (platform directory)
    pub data_dir: Option<PathBuf>,

    /// Whether to populate an empty store with demo data on startup.
    /// Env: `AGORA_SEED_DEMO` (true/false)
    /// Default: `false`
    pub seed_demo: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            seed_demo: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var("AGORA_DATA_DIR") {
            if dir.is_empty() {
                tracing::warn!("Empty AGORA_DATA_DIR, using platform directory");
            } else {
                config.data_dir = Some(PathBuf::from(dir));
            }
        }

        if let Ok(val) = std::env::var("AGORA_SEED_DEMO") {
            config.seed_demo = val != "false" && val != "0";
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}
