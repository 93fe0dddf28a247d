//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and that every
//! configured CORS origin is a bare `http`/`https` origin. All errors are
//! collected, not just the first.

use url::Url;

use crate::config::schema::AppConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },

    #[error("{field} must be at most {max} seconds")]
    TooLong { field: &'static str, max: u64 },

    #[error("invalid CORS origin {origin:?}: {reason}")]
    InvalidOrigin { origin: String, reason: String },

    #[error("invalid metrics address {0:?}")]
    InvalidMetricsAddress(String),
}

/// Longest accepted window, sweep interval or request timeout.
pub const MAX_INTERVAL_SECS: u64 = 24 * 60 * 60;

/// Validate a loaded configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let positive: [(&'static str, u64); 5] = [
        ("rate_limit.max_requests", u64::from(config.rate_limit.max_requests)),
        ("rate_limit.window_secs", config.rate_limit.window_secs),
        ("rate_limit.sweep_interval_secs", config.rate_limit.sweep_interval_secs),
        ("security.max_body_size", config.security.max_body_size as u64),
        ("timeouts.request_secs", config.timeouts.request_secs),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::NotPositive { field });
        }
    }

    let bounded: [(&'static str, u64); 3] = [
        ("rate_limit.window_secs", config.rate_limit.window_secs),
        ("rate_limit.sweep_interval_secs", config.rate_limit.sweep_interval_secs),
        ("timeouts.request_secs", config.timeouts.request_secs),
    ];
    for (field, value) in bounded {
        if value > MAX_INTERVAL_SECS {
            errors.push(ValidationError::TooLong {
                field,
                max: MAX_INTERVAL_SECS,
            });
        }
    }

    for origin in &config.cors.allowed_origins {
        if let Err(e) = normalize_origin(origin) {
            errors.push(e);
        }
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Reduce a configured origin to the form browsers send in the `Origin` header.
///
/// Lowercases the host, drops a default port and a lone trailing slash.
pub fn normalize_origin(raw: &str) -> Result<String, ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidOrigin {
        origin: raw.to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(raw.trim()).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host"));
    }
    if url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
        return Err(invalid("must not contain a path, query or fragment"));
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(invalid("must not contain credentials"));
    }

    Ok(url.origin().ascii_serialization())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_normalize_origin() {
        assert_eq!(
            normalize_origin("https://Docs.Example.com/").unwrap(),
            "https://docs.example.com"
        );
        assert_eq!(
            normalize_origin("https://example.com:443").unwrap(),
            "https://example.com"
        );
        assert_eq!(
            normalize_origin("http://localhost:3000").unwrap(),
            "http://localhost:3000"
        );
        assert!(normalize_origin("ftp://example.com").is_err());
        assert!(normalize_origin("https://example.com/app").is_err());
        assert!(normalize_origin("example.com").is_err());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = AppConfig::default();
        config.rate_limit.max_requests = 0;
        config.timeouts.request_secs = 0;
        config.cors.allowed_origins = vec!["not a url".into()];

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ValidationError::NotPositive {
            field: "rate_limit.max_requests"
        }));
    }

    #[test]
    fn test_durations_are_bounded() {
        let mut config = AppConfig::default();
        config.rate_limit.window_secs = MAX_INTERVAL_SECS;
        assert!(validate_config(&config).is_ok());

        config.rate_limit.window_secs = u64::MAX;
        config.rate_limit.sweep_interval_secs = MAX_INTERVAL_SECS + 1;
        assert_eq!(
            validate_config(&config).unwrap_err(),
            vec![
                ValidationError::TooLong {
                    field: "rate_limit.window_secs",
                    max: MAX_INTERVAL_SECS
                },
                ValidationError::TooLong {
                    field: "rate_limit.sweep_interval_secs",
                    max: MAX_INTERVAL_SECS
                },
            ]
        );
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = AppConfig::default();
        config.observability.metrics_address = "nowhere".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert_eq!(
            validate_config(&config).unwrap_err(),
            vec![ValidationError::InvalidMetricsAddress("nowhere".into())]
        );
    }
}
