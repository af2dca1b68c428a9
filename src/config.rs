use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::duration::deserialize_duration;

pub const MONZO_API_BASE: &str = "https://api.monzo.com";
pub const STARLING_API_BASE: &str = "https://api.starlingbank.com";

/// Default aggregation tick (1 second).
fn default_tick_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_lookback_months() -> u32 {
    12
}

/// Sync loop and aggregation tick configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// How often the supervisor recomputes aggregates while a session is
    /// active.
    #[serde(
        default = "default_tick_interval",
        deserialize_with = "deserialize_duration"
    )]
    pub tick_interval: Duration,

    /// Length of the sync window in calendar months. The window start is
    /// truncated to the first day of the month.
    #[serde(default = "default_lookback_months")]
    pub lookback_months: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            tick_interval: default_tick_interval(),
            lookback_months: default_lookback_months(),
        }
    }
}

fn default_server_url() -> String {
    "http://localhost:8000".to_string()
}

/// Where the OAuth-backed credential server lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    #[serde(default = "default_server_url")]
    pub server_url: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
        }
    }
}

/// Provider API base URLs. Overridable for sandboxes and tests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub monzo_base_url: String,
    pub starling_base_url: String,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            monzo_base_url: MONZO_API_BASE.to_string(),
            starling_base_url: STARLING_API_BASE.to_string(),
        }
    }
}

fn default_merchant_marker() -> String {
    "tfl.gov.uk".to_string()
}

/// Which transactions count as transit spend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Matched case-insensitively against the transaction description.
    #[serde(default = "default_merchant_marker")]
    pub merchant_marker: String,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            merchant_marker: default_merchant_marker(),
        }
    }
}

/// Default zone pair used for the travelcard comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FaresConfig {
    pub from_zone: u8,
    pub to_zone: u8,
}

impl Default for FaresConfig {
    fn default() -> Self {
        Self {
            from_zone: 1,
            to_zone: 3,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to data directory. If relative, resolved from config file location.
    /// If not specified, defaults to the config file's directory.
    pub data_dir: Option<PathBuf>,

    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub credentials: CredentialsConfig,

    #[serde(default)]
    pub providers: ProvidersConfig,

    #[serde(default)]
    pub filter: FilterConfig,

    #[serde(default)]
    pub fares: FaresConfig,
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load config from a file, or return default config if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Resolve the data directory path.
    ///
    /// If `data_dir` is set and relative, it's resolved relative to `config_dir`.
    /// If `data_dir` is not set, returns `config_dir`.
    pub fn resolve_data_dir(&self, config_dir: &Path) -> PathBuf {
        match &self.data_dir {
            Some(data_dir) if data_dir.is_absolute() => data_dir.clone(),
            Some(data_dir) => config_dir.join(data_dir),
            None => config_dir.to_path_buf(),
        }
    }

    fn resolve(self, config_dir: &Path) -> ResolvedConfig {
        let data_dir = self.resolve_data_dir(config_dir);
        ResolvedConfig {
            data_dir,
            sync: self.sync,
            credentials: self.credentials,
            providers: self.providers,
            filter: self.filter,
            fares: self.fares,
        }
    }
}

/// Loaded configuration with resolved paths.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The resolved data directory path.
    pub data_dir: PathBuf,
    pub sync: SyncConfig,
    pub credentials: CredentialsConfig,
    pub providers: ProvidersConfig,
    pub filter: FilterConfig,
    pub fares: FaresConfig,
}

/// Returns the default config file path.
///
/// Resolution order:
/// 1. `./transitbook.toml` if it exists in current directory
/// 2. `~/.local/share/transitbook/transitbook.toml` (XDG data directory)
pub fn default_config_path() -> PathBuf {
    let local_config = PathBuf::from("transitbook.toml");
    if local_config.exists() {
        return local_config;
    }

    if let Some(data_dir) = dirs::data_dir() {
        return data_dir.join("transitbook").join("transitbook.toml");
    }

    local_config
}

impl ResolvedConfig {
    /// Load and resolve config from a file path.
    ///
    /// The data directory is resolved relative to the config file's parent directory.
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_path = config_path
            .canonicalize()
            .with_context(|| format!("Config file not found: {}", config_path.display()))?;

        let config_dir = config_path
            .parent()
            .context("Config file has no parent directory")?;

        Ok(Config::load(&config_path)?.resolve(config_dir))
    }

    /// Load config, falling back to defaults if the file doesn't exist.
    ///
    /// If the config file doesn't exist, uses the config file's intended
    /// parent directory as the data directory.
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            return Self::load(config_path);
        }

        let config_path = if config_path.is_relative() {
            std::env::current_dir()
                .context("Failed to get current directory")?
                .join(config_path)
        } else {
            config_path.to_path_buf()
        };

        let config_dir = config_path
            .parent()
            .context("Config path has no parent directory")?;

        Ok(Config::default().resolve(config_dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_default_data_dir_is_config_dir() {
        let config = Config::default();
        let config_dir = Path::new("/home/user/travel");
        assert_eq!(
            config.resolve_data_dir(config_dir),
            PathBuf::from("/home/user/travel")
        );
    }

    #[test]
    fn test_relative_data_dir() {
        let config = Config {
            data_dir: Some(PathBuf::from("data")),
            ..Default::default()
        };
        assert_eq!(
            config.resolve_data_dir(Path::new("/home/user/travel")),
            PathBuf::from("/home/user/travel/data")
        );
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.sync.tick_interval, Duration::from_secs(1));
        assert_eq!(config.sync.lookback_months, 12);
        assert_eq!(config.filter.merchant_marker, "tfl.gov.uk");
        assert_eq!(config.providers.monzo_base_url, MONZO_API_BASE);
        assert_eq!(config.fares.from_zone, 1);
        assert_eq!(config.fares.to_zone, 3);
    }

    #[test]
    fn test_load_empty_config() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("transitbook.toml");
        std::fs::File::create(&config_path)?;

        let config = Config::load(&config_path)?;
        assert_eq!(config.data_dir, None);
        assert_eq!(config.credentials.server_url, "http://localhost:8000");

        Ok(())
    }

    #[test]
    fn test_load_sync_and_provider_sections() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("transitbook.toml");

        let mut file = std::fs::File::create(&config_path)?;
        writeln!(file, "[sync]")?;
        writeln!(file, "tick_interval = \"250ms\"")?;
        writeln!(file, "lookback_months = 6")?;
        writeln!(file, "[providers]")?;
        writeln!(file, "monzo_base_url = \"http://127.0.0.1:9000\"")?;
        writeln!(file, "[fares]")?;
        writeln!(file, "from_zone = 2")?;
        writeln!(file, "to_zone = 4")?;

        let config = Config::load(&config_path)?;
        assert_eq!(config.sync.tick_interval, Duration::from_millis(250));
        assert_eq!(config.sync.lookback_months, 6);
        assert_eq!(config.providers.monzo_base_url, "http://127.0.0.1:9000");
        assert_eq!(config.providers.starling_base_url, STARLING_API_BASE);
        assert_eq!(config.fares.from_zone, 2);
        assert_eq!(config.fares.to_zone, 4);

        Ok(())
    }

    #[test]
    fn test_invalid_tick_interval_is_rejected() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("transitbook.toml");

        let mut file = std::fs::File::create(&config_path)?;
        writeln!(file, "[sync]")?;
        writeln!(file, "tick_interval = \"soon\"")?;

        assert!(Config::load(&config_path).is_err());
        Ok(())
    }

    #[test]
    fn test_resolved_config_load_or_default_missing_file() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("transitbook.toml");

        let resolved = ResolvedConfig::load_or_default(&config_path)?;
        assert_eq!(resolved.data_dir, dir.path());
        assert_eq!(resolved.filter.merchant_marker, "tfl.gov.uk");

        Ok(())
    }

    #[test]
    fn test_resolved_config_resolves_relative_data_dir() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("transitbook.toml");

        let mut file = std::fs::File::create(&config_path)?;
        writeln!(file, "data_dir = \"./data\"")?;

        let resolved = ResolvedConfig::load(&config_path)?;
        assert_eq!(resolved.data_dir, dir.path().canonicalize()?.join("data"));

        Ok(())
    }
}
