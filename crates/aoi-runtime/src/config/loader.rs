//! Configuration loader using figment.
//!
//! # Configuration Priority (lowest to highest)
//!
//! 1. Built-in defaults
//! 2. Programmatic base values ([`ConfigLoader::merge`])
//! 3. Main config file (`aoi.toml`)
//! 4. Profile-specific config file (`aoi.{profile}.toml`)
//! 5. Environment variables (`AOI_*`)
//! 6. Raw secret variables (`GATEWAY_TOKEN`, `BANNED_TAGS`, ...)
//!
//! # Environment Variable Mapping
//!
//! Prefixed variables use `__` as the nesting separator:
//!
//! - `AOI_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//! - `AOI_CONNECTION__BACKOFF_UNIT_MS=250` → `connection.backoff_unit_ms = 250`
//!
//! The secrets listed in [`SECRET_KEYS`] are read under their bare names and
//! land in `[credentials]`:
//!
//! - `GATEWAY_TOKEN=xxx` → `credentials.gateway_token = "xxx"`
//!
//! # Feature Flags
//!
//! - `toml-config` *(default)*: enables `aoi.toml` / `config.toml` files
//!
//! # Example
//!
//! ```rust,ignore
//! use aoi_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .profile("production")
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(feature = "toml-config")]
use figment::providers::{Format, Toml};
use figment::providers::{Env, Serialized};
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::{AoiConfig, SECRET_KEYS};

/// Configuration profile for environment-specific settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    /// Development profile (default).
    #[default]
    Development,
    /// Production profile.
    Production,
    /// Custom profile name.
    Custom(String),
}

impl Profile {
    /// Returns the profile name as a string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Parses a profile name; unknown names become [`Profile::Custom`].
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Reads `AOI_PROFILE`, defaulting to Development.
    pub fn from_env() -> Self {
        std::env::var("AOI_PROFILE")
            .map(|p| Self::parse(&p))
            .unwrap_or_default()
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration loader with figment-based multi-source support.
pub struct ConfigLoader {
    figment: Figment,
    profile: Profile,
    search_paths: Vec<PathBuf>,
    load_env: bool,
    config_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a new configuration loader with defaults.
    pub fn new() -> Self {
        Self {
            figment: Figment::new(),
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    /// Sets the configuration profile.
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Profile::parse(&profile.into());
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Adds current directory to search paths.
    pub fn with_current_dir(self) -> Self {
        if let Ok(cwd) = std::env::current_dir() {
            self.search_path(cwd)
        } else {
            self
        }
    }

    /// Sets a specific configuration file to load.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Enables loading environment variables (default: true).
    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Merges programmatic base values, overridden by files and environment.
    ///
    /// ```rust,ignore
    /// let config = ConfigLoader::new()
    ///     .merge(AoiConfig {
    ///         connection: ConnectionConfig { backoff_unit_ms: 10 },
    ///         ..Default::default()
    ///     })
    ///     .load()?;
    /// ```
    pub fn merge(mut self, config: AoiConfig) -> Self {
        self.figment = self.figment.merge(Serialized::defaults(config));
        self
    }

    /// Loads and returns the configuration.
    pub fn load(self) -> ConfigResult<AoiConfig> {
        let profile = self.profile.clone();
        let figment = self.build_figment()?;

        let config: AoiConfig = figment.extract().map_err(|e| {
            ConfigError::ParseError(format!("Failed to extract configuration: {e}"))
        })?;

        debug!(
            profile = %profile,
            logging_level = %config.logging.level,
            backoff_unit_ms = config.connection.backoff_unit_ms,
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    fn build_figment(mut self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(AoiConfig::default()));

        let user_figment = std::mem::take(&mut self.figment);
        figment = figment.merge(user_figment);

        if let Some(path) = self.config_file.clone() {
            if path.exists() {
                info!(path = %path.display(), "Loading configuration file");
                figment = Self::merge_config_file(figment, &path)?;
            } else {
                return Err(ConfigError::FileNotFound(path));
            }
        } else {
            figment = self.load_config_files(figment);
        }

        if self.load_env {
            trace!("Loading environment variables with AOI_ prefix");
            figment = figment.merge(
                Env::prefixed("AOI_")
                    .split("__")
                    .map(|key| key.as_str().replace("__", ".").into()),
            );

            trace!(keys = SECRET_KEYS.len(), "Loading secret environment variables");
            figment = Self::merge_secret_env(figment);
        }

        Ok(figment)
    }

    /// Merges the bare secret variables as strings.
    ///
    /// `Env` would parse `0123` or `true` into typed values, so secrets are
    /// read verbatim instead.
    fn merge_secret_env(mut figment: Figment) -> Figment {
        for key in SECRET_KEYS {
            match std::env::var(key) {
                Ok(value) => {
                    let path = format!("credentials.{}", key.to_ascii_lowercase());
                    figment = figment.merge(Serialized::default(&path, value));
                }
                Err(std::env::VarError::NotPresent) => {}
                Err(std::env::VarError::NotUnicode(_)) => {
                    warn!(key, "Ignoring secret variable that is not valid UTF-8");
                }
            }
        }
        figment
    }

    fn merge_config_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            #[cfg(feature = "toml-config")]
            "toml" => Ok(figment.merge(Toml::file(path))),
            _ => Err(ConfigError::ParseError(format!(
                "Unsupported or disabled configuration file format: .{ext}"
            ))),
        }
    }

    fn resolve_search_paths(&self) -> Vec<PathBuf> {
        if self.search_paths.is_empty() {
            let mut paths = Vec::new();
            if let Ok(cwd) = std::env::current_dir() {
                paths.push(cwd);
            }
            if let Some(config_dir) = dirs::config_dir() {
                paths.push(config_dir.join("aoi"));
            }
            paths
        } else {
            self.search_paths.clone()
        }
    }

    /// Searches `search_paths` for `aoi.toml`, then `config.toml`. The first
    /// base file found wins; its profile-specific variant is merged on top.
    #[cfg(feature = "toml-config")]
    fn load_toml_files(&self, mut figment: Figment, search_paths: &[PathBuf]) -> (Figment, bool) {
        for search_path in search_paths {
            for stem in ["aoi", "config"] {
                let base_path = search_path.join(format!("{stem}.toml"));
                if !base_path.exists() {
                    continue;
                }
                info!(path = %base_path.display(), "Loading configuration file");
                figment = figment.merge(Toml::file(&base_path));

                let profile_path =
                    search_path.join(format!("{stem}.{}.toml", self.profile.as_str()));
                if profile_path.exists() {
                    debug!(path = %profile_path.display(), "Loading profile-specific config");
                    figment = figment.merge(Toml::file(&profile_path));
                }
                return (figment, true);
            }
        }
        (figment, false)
    }

    #[allow(unused_mut)]
    fn load_config_files(&self, mut figment: Figment) -> Figment {
        let search_paths = self.resolve_search_paths();
        let mut found = false;

        #[cfg(feature = "toml-config")]
        {
            let (f, ok) = self.load_toml_files(figment, &search_paths);
            figment = f;
            found |= ok;
        }

        if !found {
            warn!(
                searched = search_paths.len(),
                "No configuration file found, using defaults"
            );
        }
        figment
    }
}

/// Loads configuration from the default locations.
pub fn load_config() -> ConfigResult<AoiConfig> {
    ConfigLoader::new().load()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{ConnectionConfig, CredentialsConfig, LogLevel};

    fn empty_dir() -> PathBuf {
        std::env::temp_dir().join("aoi-config-tests-missing-dir")
    }

    #[test]
    fn test_default_config() {
        let config = ConfigLoader::new()
            .search_path(empty_dir())
            .without_env()
            .load()
            .unwrap();

        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.connection.backoff_unit_ms, 1000);
        assert!(config.credentials.gateway_token.is_none());
    }

    #[test]
    fn test_programmatic_values() {
        let config = ConfigLoader::new()
            .search_path(empty_dir())
            .without_env()
            .merge(AoiConfig {
                connection: ConnectionConfig {
                    backoff_unit_ms: 5,
                },
                credentials: CredentialsConfig {
                    gateway_token: Some("abc".into()),
                    ..Default::default()
                },
                ..Default::default()
            })
            .load()
            .unwrap();

        assert_eq!(config.connection.backoff_unit_ms, 5);
        assert_eq!(config.credentials.gateway_token.as_deref(), Some("abc"));
    }

    #[test]
    fn test_missing_explicit_file() {
        let path = empty_dir().join("aoi.toml");
        let err = ConfigLoader::new()
            .file(&path)
            .without_env()
            .load()
            .unwrap_err();

        assert_eq!(err, ConfigError::FileNotFound(path));
    }

    #[test]
    fn test_profile_parse() {
        assert_eq!(Profile::parse("prod"), Profile::Production);
        assert_eq!(Profile::parse("Dev"), Profile::Development);
        assert_eq!(Profile::parse("staging"), Profile::Custom("staging".into()));
    }

    #[test]
    fn test_numeric_secrets_from_env() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("GATEWAY_TOKEN", "1234567890");
            jail.set_env("BANNED_TAGS", "");
            jail.set_env("BANNED_PIXIV_TAGS", "r18");
            jail.set_env("GELBOORU_USER", "123456");
            jail.set_env("PIXIV_PASSWORD", "0042");

            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .load()
                .map_err(|e| e.to_string())?;
            let credentials = &config.credentials;

            assert_eq!(credentials.gateway_token.as_deref(), Some("1234567890"));
            assert_eq!(credentials.gelbooru_user.as_deref(), Some("123456"));
            assert_eq!(credentials.pixiv_password.as_deref(), Some("0042"));
            assert_eq!(credentials.banned_tags.as_deref(), Some(""));

            let secrets = credentials.resolve().map_err(|e| e.to_string())?;
            assert_eq!(secrets.credentials.token(), "1234567890");
            assert!(secrets.banned_tags.is_empty());
            Ok(())
        });
    }

    #[test]
    fn test_prefixed_env_numeric_secret() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("AOI_CREDENTIALS__GELBOORU_USER", "987");
            jail.set_env("AOI_CONNECTION__BACKOFF_UNIT_MS", "250");

            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .load()
                .map_err(|e| e.to_string())?;

            assert_eq!(config.credentials.gelbooru_user.as_deref(), Some("987"));
            assert_eq!(config.connection.backoff_unit_ms, 250);
            Ok(())
        });
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_toml_file_and_profile_override() {
        let dir = std::env::temp_dir().join(format!("aoi-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("aoi.toml"),
            "[logging]\nlevel = \"debug\"\n\n[connection]\nbackoff_unit_ms = 50\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("aoi.staging.toml"),
            "[connection]\nbackoff_unit_ms = 20\n",
        )
        .unwrap();

        let config = ConfigLoader::new()
            .search_path(&dir)
            .profile("staging")
            .without_env()
            .load()
            .unwrap();

        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.connection.backoff_unit_ms, 20);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
