//! Configuration file management for regimen.
//!
//! Provides a TOML-based config file at `~/.config/regimen/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use regimen_core::catalog::Catalog;
use regimen_core::generate::{DEFAULT_SUGGESTION_TIMEOUT, GenerationConfig, PlanGenerator};
use regimen_core::suggest::CommandSuggester;
use regimen_db::config::DbConfig;
use regimen_db::store::Store;

pub const DATABASE_URL_ENV: &str = "REGIMEN_DATABASE_URL";
pub const CATALOG_PATH_ENV: &str = "REGIMEN_CATALOG_PATH";
pub const SUGGESTER_TIMEOUT_ENV: &str = "REGIMEN_SUGGESTER_TIMEOUT_SECS";

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub database: DatabaseSection,
    #[serde(default)]
    pub generation: GenerationSection,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GenerationSection {
    /// Exercise library TOML; the built-in library is used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_path: Option<PathBuf>,
    /// Command line of an external content-suggestion provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggester_command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggester_timeout_secs: Option<u64>,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the regimen config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/regimen` or `~/.config/regimen`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("regimen");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("regimen")
}

/// Return the path to the regimen config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse a config file. Returns an error if it does not exist.
pub fn load_config_from(path: &Path) -> Result<ConfigFile> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    toml::from_str(&contents).context("failed to parse config file")
}

pub fn load_config() -> Result<ConfigFile> {
    load_config_from(&config_path())
}

/// Serialize and write a config file, creating parent dirs as needed.
pub fn save_config_to(path: &Path, config: &ConfigFile) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create config directory {}", dir.display()))?;
    }
    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    // The database URL may carry credentials.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

pub fn save_config(config: &ConfigFile) -> Result<()> {
    save_config_to(&config_path(), config)
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct RegimenConfig {
    pub db_config: DbConfig,
    pub catalog_path: Option<PathBuf>,
    pub suggester_command: Option<String>,
    pub suggestion_timeout: Duration,
}

impl RegimenConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - DB URL: `cli_db_url` > `REGIMEN_DATABASE_URL` > `database.url` > `DbConfig::DEFAULT_URL`
    /// - Catalog: `cli_catalog` > `REGIMEN_CATALOG_PATH` > `generation.catalog_path` > built-in
    /// - Suggestion timeout: `REGIMEN_SUGGESTER_TIMEOUT_SECS` > `generation.suggester_timeout_secs` > 10 s
    pub fn resolve(cli_db_url: Option<&str>, cli_catalog: Option<&Path>) -> Result<Self> {
        let file_config = load_config().ok();
        Self::resolve_with(cli_db_url, cli_catalog, file_config.as_ref())
    }

    fn resolve_with(
        cli_db_url: Option<&str>,
        cli_catalog: Option<&Path>,
        file_config: Option<&ConfigFile>,
    ) -> Result<Self> {
        let db_url = if let Some(url) = cli_db_url {
            url.to_string()
        } else if let Ok(url) = std::env::var(DATABASE_URL_ENV) {
            url
        } else if let Some(cfg) = file_config.filter(|c| !c.database.url.is_empty()) {
            cfg.database.url.clone()
        } else {
            DbConfig::DEFAULT_URL.to_string()
        };

        let generation = file_config.map(|c| &c.generation);

        let catalog_path = if let Some(path) = cli_catalog {
            Some(path.to_path_buf())
        } else if let Ok(path) = std::env::var(CATALOG_PATH_ENV) {
            Some(PathBuf::from(path))
        } else {
            generation.and_then(|g| g.catalog_path.clone())
        };

        let suggestion_timeout = if let Ok(secs) = std::env::var(SUGGESTER_TIMEOUT_ENV) {
            let secs: u64 = secs
                .parse()
                .with_context(|| format!("{SUGGESTER_TIMEOUT_ENV} must be a whole number of seconds"))?;
            Duration::from_secs(secs)
        } else if let Some(secs) = generation.and_then(|g| g.suggester_timeout_secs) {
            Duration::from_secs(secs)
        } else {
            DEFAULT_SUGGESTION_TIMEOUT
        };

        Ok(Self {
            db_config: DbConfig::new(db_url),
            catalog_path,
            suggester_command: generation
                .and_then(|g| g.suggester_command.clone())
                .filter(|c| !c.trim().is_empty()),
            suggestion_timeout,
        })
    }

    /// The configured exercise library, or the built-in one.
    pub fn load_catalog(&self) -> Result<Catalog> {
        match &self.catalog_path {
            Some(path) => Catalog::from_path(path)
                .with_context(|| format!("failed to load exercise library {}", path.display())),
            None => Ok(Catalog::builtin()),
        }
    }

    /// A generator over `store` with the configured catalog and provider.
    pub fn build_generator(&self, store: Arc<dyn Store>) -> Result<PlanGenerator> {
        let catalog = self.load_catalog()?;
        info!(
            catalog_version = catalog.version(),
            exercises = catalog.len(),
            "exercise library loaded"
        );
        let mut generator = PlanGenerator::new(store, Arc::new(catalog)).with_config(
            GenerationConfig {
                suggestion_timeout: self.suggestion_timeout,
            },
        );
        if let Some(suggester) = self
            .suggester_command
            .as_deref()
            .and_then(CommandSuggester::from_command_line)
        {
            info!(program = suggester.program(), "content suggestions enabled");
            generator = generator.with_suggester(Arc::new(suggester));
        }
        Ok(generator)
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
