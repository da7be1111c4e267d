use std::{
    fs,
    path::{Path, PathBuf},
    sync::{LazyLock, PoisonError, RwLock},
};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ConfigError, Result};

pub const DEFAULT_BATCH_SIZE: usize = 1000;
pub const DEFAULT_PER_PAGE: u64 = 20;
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

/// Application's configuration
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Path to the SQLite database.
    pub database_path: Option<String>,

    /// Rows fetched per batch when scanning a table.
    /// Default: 1000
    pub batch_size: Option<usize>,

    /// Records per page for paginated listings.
    /// Default: 20
    pub per_page: Option<u64>,

    /// How long a connection waits on a locked database, in milliseconds.
    /// Default: 5000
    pub busy_timeout_ms: Option<u64>,
}

pub static CONFIG: LazyLock<RwLock<Option<Config>>> = LazyLock::new(|| RwLock::new(None));

pub static CONFIG_PATH: LazyLock<RwLock<PathBuf>> = LazyLock::new(|| {
    RwLock::new(match std::env::var("RECORDKIT_CONFIG") {
        Ok(path_str) => PathBuf::from(path_str),
        Err(_) => PathBuf::from("recordkit.toml"),
    })
});

/// Loads the configuration from [`CONFIG_PATH`] into [`CONFIG`].
pub fn init() -> Result<()> {
    let config = Config::new()?;
    let mut global_config = CONFIG.write().unwrap_or_else(PoisonError::into_inner);
    *global_config = Some(config);
    Ok(())
}

/// Points later [`init`] calls at `path`.
pub fn set_config_path<P: Into<PathBuf>>(path: P) {
    let mut config_path = CONFIG_PATH.write().unwrap_or_else(PoisonError::into_inner);
    *config_path = path.into();
}

/// The process-wide configuration, resolved defaults if [`init`] never ran.
pub fn get_config() -> Config {
    {
        let config_guard = CONFIG.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(config) = config_guard.as_ref() {
            return config.clone();
        }
    }

    let mut config_guard = CONFIG.write().unwrap_or_else(PoisonError::into_inner);
    config_guard.get_or_insert_with(Config::resolved_default).clone()
}

impl Config {
    fn resolved_default() -> Self {
        Self {
            database_path: None,
            batch_size: Some(DEFAULT_BATCH_SIZE),
            per_page: Some(DEFAULT_PER_PAGE),
            busy_timeout_ms: Some(DEFAULT_BUSY_TIMEOUT_MS),
        }
    }

    /// Creates a new configuration by loading it from the configuration file.
    /// If the configuration file is not found, it uses the default configuration.
    pub fn new() -> Result<Self> {
        let config_path = CONFIG_PATH
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .to_path_buf();
        Self::load(config_path)
    }

    /// Reads and resolves the configuration at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let mut config = match fs::read_to_string(path) {
            Ok(content) => {
                debug!("loading configuration from {}", path.display());
                toml::from_str(&content)?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(err) => return Err(ConfigError::IoError(err)),
        };

        config.resolve()?;

        Ok(config)
    }

    /// Fills unset values with defaults and rejects invalid ones.
    pub fn resolve(&mut self) -> Result<()> {
        let batch_size = *self.batch_size.get_or_insert(DEFAULT_BATCH_SIZE);
        if batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "batch_size",
                reason: "must be greater than 0".into(),
            });
        }

        let per_page = *self.per_page.get_or_insert(DEFAULT_PER_PAGE);
        if per_page == 0 {
            return Err(ConfigError::InvalidValue {
                key: "per_page",
                reason: "must be greater than 0".into(),
            });
        }

        self.busy_timeout_ms.get_or_insert(DEFAULT_BUSY_TIMEOUT_MS);

        if self.database_path.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::InvalidValue {
                key: "database_path",
                reason: "must not be empty".into(),
            });
        }

        Ok(())
    }

    pub fn get_database_path(&self) -> Result<PathBuf> {
        self.database_path
            .as_ref()
            .map(PathBuf::from)
            .ok_or(ConfigError::MissingDatabase)
    }

    pub fn get_batch_size(&self) -> usize {
        self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE)
    }

    pub fn get_per_page(&self) -> u64 {
        self.per_page.unwrap_or(DEFAULT_PER_PAGE)
    }

    pub fn get_busy_timeout_ms(&self) -> u64 {
        self.busy_timeout_ms.unwrap_or(DEFAULT_BUSY_TIMEOUT_MS)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let serialized = self.to_toml()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serialized)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}
