use super::{types::Config, ConfigError};

const FFMPEG_LOG_LEVELS: &[&str] = &[
    "quiet", "panic", "fatal", "error", "warning", "info", "verbose", "debug", "trace",
];

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Engine ffmpeg path is not empty
/// - Engine log level is one ffmpeg understands
/// - Intake warning threshold is nonzero
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.engine.ffmpeg_path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "engine.ffmpeg_path cannot be empty".to_string(),
        ));
    }

    if !FFMPEG_LOG_LEVELS.contains(&config.engine.ffmpeg_log_level.as_str()) {
        return Err(ConfigError::ValidationError(format!(
            "engine.ffmpeg_log_level must be one of {:?}, got {:?}",
            FFMPEG_LOG_LEVELS, config.engine.ffmpeg_log_level
        )));
    }

    if config.intake.size_warning_mb == 0 {
        return Err(ConfigError::ValidationError(
            "intake.size_warning_mb cannot be 0".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let mut config = Config::default();
        config.server.port = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_unknown_log_level_fails() {
        let mut config = Config::default();
        config.engine.ffmpeg_log_level = "chatty".to_string();
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_zero_warning_threshold_fails() {
        let mut config = Config::default();
        config.intake.size_warning_mb = 0;
        assert!(validate_config(&config).is_err());
    }
}
