use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::{Path, PathBuf};

use super::{types::Config, ConfigError};

/// `<config_dir>/steep/config.toml`, when the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("steep").join("config.toml"))
}

/// Load configuration with environment variable overrides.
///
/// An explicit `path` must exist. Without one, the default location is used
/// if present and the built-in defaults otherwise.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut figment = Figment::new();

    match path {
        Some(path) => {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.display().to_string()));
            }
            figment = figment.merge(Toml::file(path));
        }
        None => {
            if let Some(default) = default_config_path().filter(|p| p.exists()) {
                tracing::debug!(path = %default.display(), "Using default config file");
                figment = figment.merge(Toml::file(default));
            }
        }
    }

    let mut config: Config = figment
        .merge(spotify_credentials_env())
        .merge(Env::prefixed("STEEP_").split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    config.expand_paths();
    Ok(config)
}

/// The conventional unprefixed Spotify credential variables.
fn spotify_credentials_env() -> Env {
    Env::raw().filter_map(|key| {
        if key.as_str().eq_ignore_ascii_case("SPOTIFY_CLIENT_ID") {
            Some("spotify.client_id".into())
        } else if key.as_str().eq_ignore_ascii_case("SPOTIFY_CLIENT_SECRET") {
            Some("spotify.client_secret".into())
        } else {
            None
        }
    })
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    let mut config: Config =
        toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    config.expand_paths();
    Ok(config)
}
