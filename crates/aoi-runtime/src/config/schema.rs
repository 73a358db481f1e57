//! Configuration schema definitions.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use aoi_core::Credentials;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};

use super::error::{ConfigError, ConfigResult};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AoiConfig {
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Gateway connection settings.
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Secrets and content filters, usually taken from the environment.
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Lower-case name, as used in filter directives.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Converts to the equivalent [`tracing::Level`].
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature; falls back to `Full` otherwise.
    Json,
}

/// Where log lines are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanEventConfig {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub enter: bool,
    #[serde(default)]
    pub exit: bool,
    #[serde(default)]
    pub close: bool,
}

/// The `[logging]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    #[serde(default)]
    pub span_events: SpanEventConfig,

    /// Include thread ids in log lines.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include source file and line in log lines.
    #[serde(default)]
    pub file_location: bool,

    /// Log file, used when `output = "file"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,

    /// Daily log files kept when writing to a file.
    #[serde(default = "default_max_files")]
    pub max_files: u32,

    /// Per-module levels, e.g. `aoi_runtime = "debug"`.
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            format: LogFormat::default(),
            output: LogOutput::default(),
            span_events: SpanEventConfig::default(),
            thread_ids: false,
            file_location: false,
            file_path: None,
            max_files: default_max_files(),
            filters: HashMap::new(),
        }
    }
}

fn default_max_files() -> u32 {
    5
}

// =============================================================================
// Connection
// =============================================================================

/// The `[connection]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Length of one backoff time unit in milliseconds.
    ///
    /// Attempt `n` (zero-based) waits `2^(n+1)` units after failing.
    #[serde(default = "default_backoff_unit_ms")]
    pub backoff_unit_ms: u64,
}

impl ConnectionConfig {
    /// Returns one backoff unit as a [`Duration`].
    pub fn backoff_unit(&self) -> Duration {
        Duration::from_millis(self.backoff_unit_ms)
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            backoff_unit_ms: default_backoff_unit_ms(),
        }
    }
}

fn default_backoff_unit_ms() -> u64 {
    1000
}

// =============================================================================
// Credentials
// =============================================================================

/// Environment variables read verbatim (without the `AOI_` prefix) into
/// `[credentials]`, lower-cased.
pub const SECRET_KEYS: &[&str] = &[
    "GATEWAY_TOKEN",
    "BANNED_TAGS",
    "BANNED_PIXIV_TAGS",
    "GELBOORU_USER",
    "GELBOORU_API_KEY",
    "WEATHER_GOV_API",
    "GOOGLE_API_KEY",
    "NASA",
    "ACCUWEATHER",
    "IMGUR",
    "IMGUR_SECRET",
    "PIXIV",
    "PIXIV_PASSWORD",
];

/// The `[credentials]` section.
///
/// Every field is optional at the schema level; [`CredentialsConfig::resolve`]
/// enforces the required ones.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialsConfig {
    #[serde(default, deserialize_with = "scalar_text", skip_serializing_if = "Option::is_none")]
    pub gateway_token: Option<String>,
    /// Comma-separated tags filtered from every content search.
    #[serde(default, deserialize_with = "scalar_text", skip_serializing_if = "Option::is_none")]
    pub banned_tags: Option<String>,
    /// Comma-separated tags additionally filtered from art-platform searches.
    #[serde(default, deserialize_with = "scalar_text", skip_serializing_if = "Option::is_none")]
    pub banned_pixiv_tags: Option<String>,
    #[serde(default, deserialize_with = "scalar_text", skip_serializing_if = "Option::is_none")]
    pub gelbooru_user: Option<String>,
    #[serde(default, deserialize_with = "scalar_text", skip_serializing_if = "Option::is_none")]
    pub gelbooru_api_key: Option<String>,
    #[serde(default, deserialize_with = "scalar_text", skip_serializing_if = "Option::is_none")]
    pub weather_gov_api: Option<String>,
    #[serde(default, deserialize_with = "scalar_text", skip_serializing_if = "Option::is_none")]
    pub google_api_key: Option<String>,
    #[serde(default, deserialize_with = "scalar_text", skip_serializing_if = "Option::is_none")]
    pub nasa: Option<String>,
    #[serde(default, deserialize_with = "scalar_text", skip_serializing_if = "Option::is_none")]
    pub accuweather: Option<String>,
    #[serde(default, deserialize_with = "scalar_text", skip_serializing_if = "Option::is_none")]
    pub imgur: Option<String>,
    #[serde(default, deserialize_with = "scalar_text", skip_serializing_if = "Option::is_none")]
    pub imgur_secret: Option<String>,
    #[serde(default, deserialize_with = "scalar_text", skip_serializing_if = "Option::is_none")]
    pub pixiv: Option<String>,
    #[serde(default, deserialize_with = "scalar_text", skip_serializing_if = "Option::is_none")]
    pub pixiv_password: Option<String>,
}

/// Reads an optional secret, keeping numbers and booleans as their text.
///
/// Secrets such as numeric user ids or PINs arrive typed from environment
/// variables and TOML files alike.
fn scalar_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct ScalarText;

    impl<'de> Visitor<'de> for ScalarText {
        type Value = Option<String>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a string, number or boolean")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
            Ok(Some(v))
        }

        fn visit_char<E: de::Error>(self, v: char) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_i128<E: de::Error>(self, v: i128) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_u128<E: de::Error>(self, v: u128) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D2>(self, deserializer: D2) -> Result<Self::Value, D2::Error>
        where
            D2: Deserializer<'de>,
        {
            deserializer.deserialize_any(self)
        }
    }

    deserializer.deserialize_any(ScalarText)
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

/// Splits a comma-separated tag list, dropping blank items.
pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

impl CredentialsConfig {
    /// Returns the required keys that are absent.
    ///
    /// The token must also be non-blank. An empty tag list is a valid way to
    /// ban nothing.
    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !present(&self.gateway_token) {
            missing.push("GATEWAY_TOKEN");
        }
        if self.banned_tags.is_none() {
            missing.push("BANNED_TAGS");
        }
        if self.banned_pixiv_tags.is_none() {
            missing.push("BANNED_PIXIV_TAGS");
        }
        missing
    }

    /// Returns the optional content-API keys that are absent or blank.
    pub fn missing_optional(&self) -> Vec<&'static str> {
        [
            ("GELBOORU_USER", &self.gelbooru_user),
            ("GELBOORU_API_KEY", &self.gelbooru_api_key),
            ("WEATHER_GOV_API", &self.weather_gov_api),
            ("GOOGLE_API_KEY", &self.google_api_key),
            ("NASA", &self.nasa),
            ("ACCUWEATHER", &self.accuweather),
            ("IMGUR", &self.imgur),
            ("IMGUR_SECRET", &self.imgur_secret),
            ("PIXIV", &self.pixiv),
            ("PIXIV_PASSWORD", &self.pixiv_password),
        ]
        .into_iter()
        .filter(|(_, value)| !present(value))
        .map(|(key, _)| key)
        .collect()
    }

    /// Checks the required keys and produces the startup secrets.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingKeys`] naming every absent required key.
    pub fn resolve(&self) -> ConfigResult<Secrets> {
        let missing = self.missing_required();
        if !missing.is_empty() {
            return Err(ConfigError::MissingKeys { keys: missing });
        }

        let banned_tags = split_tags(self.banned_tags.as_deref().unwrap_or_default());

        let mut banned_art_tags = banned_tags.clone();
        for tag in split_tags(self.banned_pixiv_tags.as_deref().unwrap_or_default()) {
            if !banned_art_tags.contains(&tag) {
                banned_art_tags.push(tag);
            }
        }

        Ok(Secrets {
            credentials: Credentials::new(self.gateway_token.clone().unwrap_or_default()),
            banned_tags,
            banned_art_tags,
        })
    }
}

impl fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut missing = self.missing_required();
        missing.extend(self.missing_optional());
        f.debug_struct("CredentialsConfig")
            .field("missing", &missing)
            .finish_non_exhaustive()
    }
}

/// Secrets checked at startup.
#[derive(Debug, Clone)]
pub struct Secrets {
    /// Gateway login.
    pub credentials: Credentials,
    /// Tags filtered from every content search.
    pub banned_tags: Vec<String>,
    /// Tags filtered from art-platform searches: the union of both lists.
    pub banned_art_tags: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full() -> CredentialsConfig {
        CredentialsConfig {
            gateway_token: Some("token".into()),
            banned_tags: Some("gore, spoilers".into()),
            banned_pixiv_tags: Some("spoilers,r18,".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_resolve_unions_banned_lists() {
        let secrets = full().resolve().unwrap();

        assert_eq!(secrets.credentials.token(), "token");
        assert_eq!(secrets.banned_tags, vec!["gore", "spoilers"]);
        assert_eq!(secrets.banned_art_tags, vec!["gore", "spoilers", "r18"]);
    }

    #[test]
    fn test_resolve_reports_every_missing_key() {
        let config = CredentialsConfig {
            gateway_token: Some("  ".into()),
            ..Default::default()
        };

        assert_eq!(
            config.resolve().unwrap_err(),
            ConfigError::MissingKeys {
                keys: vec!["GATEWAY_TOKEN", "BANNED_TAGS", "BANNED_PIXIV_TAGS"]
            }
        );
    }

    #[test]
    fn test_empty_tag_lists_ban_nothing() {
        let config = CredentialsConfig {
            gateway_token: Some("token".into()),
            banned_tags: Some(String::new()),
            banned_pixiv_tags: Some("r18".into()),
            ..Default::default()
        };

        let secrets = config.resolve().unwrap();
        assert!(secrets.banned_tags.is_empty());
        assert_eq!(secrets.banned_art_tags, vec!["r18"]);
    }

    #[test]
    fn test_scalar_secrets_keep_their_text() {
        let config: CredentialsConfig = serde_json::from_str(
            r#"{"gateway_token": 1234567890, "gelbooru_user": 123456, "pixiv_password": true, "nasa": null}"#,
        )
        .unwrap();

        assert_eq!(config.gateway_token.as_deref(), Some("1234567890"));
        assert_eq!(config.gelbooru_user.as_deref(), Some("123456"));
        assert_eq!(config.pixiv_password.as_deref(), Some("true"));
        assert!(config.nasa.is_none());
    }

    #[test]
    fn test_optional_keys_do_not_block() {
        let config = full();
        assert_eq!(config.missing_optional().len(), 10);
        assert!(config.resolve().is_ok());
    }

    #[test]
    fn test_debug_hides_secrets() {
        let rendered = format!("{:?}", full());
        assert!(!rendered.contains("token\""));
        assert!(!rendered.contains("gore"));
    }

    #[test]
    fn test_backoff_unit() {
        assert_eq!(
            ConnectionConfig::default().backoff_unit(),
            Duration::from_secs(1)
        );
    }
}
