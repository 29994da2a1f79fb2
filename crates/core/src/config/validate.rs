use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Output directory is set
/// - No timeout is zero
/// - Loudness target is within the ranges the normalizer accepts
/// - Search asks for at least one result
/// - Spotify page size is within the API limit
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.output.dir.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "output.dir cannot be empty".to_string(),
        ));
    }

    let zero = config.timeouts.zero_fields();
    if !zero.is_empty() {
        return Err(ConfigError::ValidationError(format!(
            "timeouts cannot be 0: {}",
            zero.join(", ")
        )));
    }

    config
        .loudness
        .validate()
        .map_err(|e| ConfigError::ValidationError(format!("loudness: {}", e)))?;

    if config.search.max_results == 0 {
        return Err(ConfigError::ValidationError(
            "search.max_results cannot be 0".to_string(),
        ));
    }

    if !(1..=100).contains(&config.spotify.page_size) {
        return Err(ConfigError::ValidationError(format!(
            "spotify.page_size must be between 1 and 100, got {}",
            config.spotify.page_size
        )));
    }

    Ok(())
}
