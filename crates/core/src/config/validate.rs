use super::{types::Config, ConfigError};

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(message.into())
}

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Source base URL is a non-empty http(s) URL
/// - Listing path contains the `{page}` placeholder
/// - Page cap, item cap, timeout and retry attempts are not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(invalid("server.port cannot be 0"));
    }

    let base_url = config.source.base_url.trim();
    if base_url.is_empty() {
        return Err(invalid("source.base_url cannot be empty"));
    }
    match url::Url::parse(base_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => {
            return Err(invalid(format!(
                "source.base_url must be http or https, got '{}'",
                url.scheme()
            )))
        }
        Err(e) => return Err(invalid(format!("source.base_url is invalid: {}", e))),
    }
    if !config.source.listing_path.contains("{page}") {
        return Err(invalid("source.listing_path must contain '{page}'"));
    }
    if config.source.timeout_secs == 0 {
        return Err(invalid("source.timeout_secs cannot be 0"));
    }

    if config.sync.max_pages == 0 {
        return Err(invalid("sync.max_pages cannot be 0"));
    }
    if config.sync.max_items == Some(0) {
        return Err(invalid("sync.max_items cannot be 0"));
    }
    if config.sync.retry.max_attempts == 0 {
        return Err(invalid("sync.retry.max_attempts cannot be 0"));
    }
    if config.sync.date_drift_days < 0 {
        return Err(invalid("sync.date_drift_days cannot be negative"));
    }

    if config.catalog.path.as_os_str().is_empty() {
        return Err(invalid("catalog.path cannot be empty"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_invalid(config: &Config, needle: &str) {
        match validate_config(config) {
            Err(ConfigError::ValidationError(msg)) => {
                assert!(msg.contains(needle), "'{}' does not mention '{}'", msg, needle)
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let mut config = Config::default();
        config.server.port = 0;
        assert_invalid(&config, "server.port");
    }

    #[test]
    fn test_validate_base_url() {
        let mut config = Config::default();
        config.source.base_url = "  ".into();
        assert_invalid(&config, "cannot be empty");

        config.source.base_url = "ftp://1337x.to".into();
        assert_invalid(&config, "http or https");

        config.source.base_url = "not a url".into();
        assert_invalid(&config, "is invalid");
    }

    #[test]
    fn test_validate_listing_path_placeholder() {
        let mut config = Config::default();
        config.source.listing_path = "/FitGirl-torrents/".into();
        assert_invalid(&config, "{page}");
    }

    #[test]
    fn test_validate_zero_limits() {
        let mut config = Config::default();
        config.sync.max_pages = 0;
        assert_invalid(&config, "max_pages");

        let mut config = Config::default();
        config.sync.max_items = Some(0);
        assert_invalid(&config, "max_items");

        let mut config = Config::default();
        config.sync.retry.max_attempts = 0;
        assert_invalid(&config, "max_attempts");
    }
}
