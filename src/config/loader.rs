//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (~/.config/cardforge/config.toml)
//! 3. Project config (.cardforge/config.toml)
//! 4. Environment variables (CARDFORGE_* prefix, `__` between levels)

use directories::BaseDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::Config;
use crate::types::{ForgeError, Result};

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain using Figment:
    /// defaults → global → project → env vars
    pub fn load() -> Result<Config> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(&global_path));
        }

        let project_path = Self::project_config_path();
        if project_path.exists() {
            debug!("Loading project config from: {}", project_path.display());
            figment = figment.merge(Toml::file(&project_path));
        }

        // e.g. CARDFORGE_LLM__MODEL -> llm.model
        figment = figment.merge(Env::prefixed("CARDFORGE_").split("__"));

        Self::extract(figment)
    }

    /// Load configuration from a specific file only
    pub fn load_from_file(path: &Path) -> Result<Config> {
        Self::extract(
            Figment::new()
                .merge(Serialized::defaults(Config::default()))
                .merge(Toml::file(path)),
        )
    }

    fn extract(figment: Figment) -> Result<Config> {
        let config: Config = figment
            .extract()
            .map_err(|e| ForgeError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Get path to global config directory (~/.config/cardforge/)
    pub fn global_dir() -> Option<PathBuf> {
        BaseDirs::new().map(|dirs| dirs.config_dir().join("cardforge"))
    }

    /// Get path to global config file
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join("config.toml"))
    }

    /// Get path to project config file
    pub fn project_config_path() -> PathBuf {
        Self::project_dir().join("config.toml")
    }

    /// Get project data directory
    pub fn project_dir() -> PathBuf {
        PathBuf::from(".cardforge")
    }

    /// Config file locations in resolution order; `None` when the global
    /// directory cannot be determined
    pub fn config_paths() -> Vec<(&'static str, Option<PathBuf>)> {
        vec![
            ("Global", Self::global_config_path()),
            ("Project", Some(Self::project_config_path())),
        ]
    }

    /// Serialize a resolved config as TOML, or pretty JSON
    pub fn render(config: &Config, as_json: bool) -> Result<String> {
        if as_json {
            return Ok(serde_json::to_string_pretty(config)?);
        }
        toml::to_string_pretty(config).map_err(|e| ForgeError::Config(e.to_string()))
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Write the default config into `dir/config.toml`
    pub fn init_at(dir: &Path, force: bool) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;

        let config_path = dir.join("config.toml");
        if !config_path.exists() || force {
            fs::write(&config_path, Self::default_config())?;
            info!("Created config: {}", config_path.display());
        } else {
            info!("Config exists: {}", config_path.display());
        }

        Ok(config_path)
    }

    /// Initialize global configuration
    pub fn init_global(force: bool) -> Result<PathBuf> {
        let global_dir = Self::global_dir().ok_or_else(|| {
            ForgeError::Config("Cannot determine global config directory".to_string())
        })?;
        Self::init_at(&global_dir, force)
    }

    /// Initialize project configuration
    pub fn init_project(force: bool) -> Result<PathBuf> {
        Self::init_at(&Self::project_dir(), force)
    }

    /// Generate default config content (TOML)
    fn default_config() -> String {
        r#"# cardforge Configuration
# Project settings in .cardforge/config.toml override the global file.

version = "1.0"

# External LLM CLI
[llm]
command = "claude"
args = ["-p", "--output-format", "json"]
model = "claude-sonnet-4-5-20250929"
timeout_secs = 300

# Admission control (session_concurrency must stay below global_concurrency)
[gateway]
global_concurrency = 3
session_concurrency = 2
low_memory_mb = 300
sample_interval_secs = 30

# Pipeline tuning
[generation]
chunk_size = 5
min_chunk_chars = 500
max_cards = 30
min_recommend = 10
per_unit_target = 4
min_target = 10
pass_threshold = 0.8
max_review_rounds = 3
max_retries = 3
retry_delays_secs = [2, 5, 10]

# Alerts (uncomment to post to a Slack-compatible webhook)
[notify]
environment = "dev"
# webhook_url = "https://hooks.slack.com/services/..."
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_file_roundtrips() {
        let temp_dir = TempDir::new().unwrap();
        let path = ConfigLoader::init_at(temp_dir.path(), false).unwrap();

        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.gateway.global_concurrency, 3);
        assert_eq!(config.generation.retry_delays_secs, vec![2, 5, 10]);
        assert!(config.notify.webhook_url.is_none());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(
            &path,
            "[generation]\nchunk_size = 8\n\n[llm]\ntimeout_secs = 60\n",
        )
        .unwrap();

        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.generation.chunk_size, 8);
        assert_eq!(config.llm.timeout_secs, 60);
        assert_eq!(config.generation.max_cards, 30);
    }

    #[test]
    fn test_invalid_file_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[gateway]\nglobal_concurrency = 2\nsession_concurrency = 2\n").unwrap();

        let err = ConfigLoader::load_from_file(&path).unwrap_err();
        assert!(matches!(err, ForgeError::Config(_)));
    }

    #[test]
    fn test_render_reloads_as_same_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        let config = Config::default();
        fs::write(&path, ConfigLoader::render(&config, false).unwrap()).unwrap();

        let reloaded = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(reloaded.generation.max_cards, config.generation.max_cards);
        assert_eq!(reloaded.llm.args, config.llm.args);

        let json: serde_json::Value =
            serde_json::from_str(&ConfigLoader::render(&config, true).unwrap()).unwrap();
        assert_eq!(json["gateway"]["session_concurrency"], 2);
    }

    #[test]
    fn test_config_paths_order() {
        let paths = ConfigLoader::config_paths();
        assert_eq!(paths[0].0, "Global");
        assert_eq!(
            paths[1].1.as_deref(),
            Some(Path::new(".cardforge/config.toml"))
        );
    }

    #[test]
    fn test_init_does_not_overwrite_without_force() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "version = \"custom\"\n").unwrap();

        ConfigLoader::init_at(temp_dir.path(), false).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "version = \"custom\"\n");

        ConfigLoader::init_at(temp_dir.path(), true).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("[generation]"));
    }
}
