//! Configuration loading: defaults, then an optional TOML file, then
//! environment overrides.

use std::fs;
use std::path::Path;

use crate::config::schema::{AppConfig, Environment, LogFormat};
use crate::config::validation::{normalize_origin, validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value {value:?} for environment variable {key}")]
    InvalidEnv { key: &'static str, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from an optional TOML file and the process environment.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    load_with_env(path, |key| std::env::var(key).ok())
}

/// Same as [`load_config`] with an explicit environment lookup.
pub fn load_with_env<F>(path: Option<&Path>, env: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => AppConfig::default(),
    };

    apply_env(&mut config, env)?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    // Validation guarantees every origin normalizes.
    config.cors.allowed_origins = config
        .cors
        .allowed_origins
        .iter()
        .filter_map(|origin| normalize_origin(origin).ok())
        .collect();

    Ok(config)
}

/// Overlay environment variables onto a configuration.
pub fn apply_env<F>(config: &mut AppConfig, env: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = env("PORT") {
        config.server.port = parse_env("PORT", &port)?;
    }
    if let Some(host) = env("HOST") {
        config.server.host = host;
    }
    if let Some(name) = env("APP_ENV").or_else(|| env("NODE_ENV")) {
        config.environment = Environment::from(name);
    }
    if let Some(origins) = env("ALLOWED_ORIGINS") {
        config.cors.allowed_origins = origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(String::from)
            .collect();
    }
    if let Some(max) = env("RATE_LIMIT_MAX") {
        config.rate_limit.max_requests = parse_env("RATE_LIMIT_MAX", &max)?;
    }
    if let Some(window) = env("RATE_LIMIT_WINDOW_SECS") {
        config.rate_limit.window_secs = parse_env("RATE_LIMIT_WINDOW_SECS", &window)?;
    }
    if let Some(level) = env("LOG_LEVEL") {
        config.observability.log_level = level;
    }
    if let Some(format) = env("LOG_FORMAT") {
        config.observability.log_format = Some(match format.to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" => LogFormat::Pretty,
            _ => {
                return Err(ConfigError::InvalidEnv {
                    key: "LOG_FORMAT",
                    value: format,
                })
            }
        });
    }
    Ok(())
}

fn parse_env<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        key,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = load_with_env(None, env_from(&[])).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.environment, Environment::default());
    }

    #[test]
    fn test_env_overrides() {
        let config = load_with_env(
            None,
            env_from(&[
                ("PORT", "3000"),
                ("NODE_ENV", "production"),
                ("ALLOWED_ORIGINS", "https://a.example/, https://b.example"),
                ("RATE_LIMIT_MAX", "5"),
            ]),
        )
        .unwrap();

        assert_eq!(config.server.port, 3000);
        assert!(config.environment.is_production());
        assert_eq!(
            config.cors.allowed_origins,
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
        assert_eq!(config.rate_limit.max_requests, 5);
    }

    #[test]
    fn test_app_env_wins_over_node_env() {
        let config = load_with_env(
            None,
            env_from(&[("APP_ENV", "development"), ("NODE_ENV", "production")]),
        )
        .unwrap();
        assert!(config.environment.is_development());
    }

    #[test]
    fn test_invalid_port() {
        let err = load_with_env(None, env_from(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { key: "PORT", .. }));
    }

    #[test]
    fn test_invalid_origin_fails_validation() {
        let err = load_with_env(None, env_from(&[("ALLOWED_ORIGINS", "nope")])).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_file_then_env() {
        let path = std::env::temp_dir()
            .join(format!("api-frontdoor-{}.toml", std::process::id()));
        let mut file = fs::File::create(&path).unwrap();
        writeln!(
            file,
            "environment = \"production\"\n[server]\nport = 9000\n[rate_limit]\nmax_requests = 10"
        )
        .unwrap();

        let config = load_with_env(Some(&path), env_from(&[("PORT", "9100")])).unwrap();
        fs::remove_file(&path).unwrap();

        assert!(config.environment.is_production());
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.rate_limit.max_requests, 10);
    }

    #[test]
    fn test_missing_file() {
        let missing = Path::new("/definitely/not/here.toml");
        let err = load_with_env(Some(missing), env_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_oversized_window_rejected() {
        let window = u64::MAX.to_string();
        let env = env_from(&[("RATE_LIMIT_WINDOW_SECS", window.as_str())]);
        let err = load_with_env(None, env).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }
}
