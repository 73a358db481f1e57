//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{AoiConfig, ConnectionConfig, LogOutput, LoggingConfig};

/// Validates the entire configuration.
///
/// Credentials are checked separately by
/// [`CredentialsConfig::resolve`](super::schema::CredentialsConfig::resolve)
/// so that every missing key is reported at once.
pub fn validate_config(config: &AoiConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;
    validate_connection_config(&config.connection)?;
    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::validation(
            "logging.file_path is required when logging.output is \"file\"",
        ));
    }

    for module in logging.filters.keys() {
        if module.trim().is_empty() || module.contains(char::is_whitespace) {
            return Err(ConfigError::validation(format!(
                "Invalid logging filter target: {module:?}"
            )));
        }
    }

    Ok(())
}

fn validate_connection_config(connection: &ConnectionConfig) -> ConfigResult<()> {
    if connection.backoff_unit_ms == 0 {
        return Err(ConfigError::validation(
            "connection.backoff_unit_ms must be greater than 0",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::LogLevel;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&AoiConfig::default()).is_ok());
    }

    #[test]
    fn test_validate_zero_backoff_unit() {
        let mut config = AoiConfig::default();
        config.connection.backoff_unit_ms = 0;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_validate_file_output_without_path() {
        let mut config = AoiConfig::default();
        config.logging.output = LogOutput::File;
        assert!(validate_config(&config).is_err());

        config.logging.file_path = Some("aoi.log".into());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_filter_targets() {
        let mut config = AoiConfig::default();
        config
            .logging
            .filters
            .insert("aoi runtime".into(), LogLevel::Debug);
        assert!(validate_config(&config).is_err());
    }
}
