//! Source site configuration.

use serde::{Deserialize, Serialize};

/// Where and how pages are fetched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Site root; relative links on listing pages resolve against it.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Listing path template. `{page}` is replaced by the 1-based page number.
    #[serde(default = "default_listing_path")]
    pub listing_path: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u32,
}

fn default_base_url() -> String {
    "https://1337x.to".to_string()
}

fn default_listing_path() -> String {
    "/FitGirl-torrents/{page}/".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string()
}

fn default_timeout_secs() -> u32 {
    30
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            listing_path: default_listing_path(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl SourceConfig {
    /// Absolute URL of listing page `page`.
    pub fn listing_url(&self, page: u32) -> String {
        let path = self.listing_path.replace("{page}", &page.to_string());
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SourceConfig::default();
        assert_eq!(config.base_url, "https://1337x.to");
        assert_eq!(config.timeout_secs, 30);
        assert!(config.user_agent.starts_with("Mozilla/5.0"));
    }

    #[test]
    fn test_listing_url() {
        let config = SourceConfig::default();
        assert_eq!(config.listing_url(3), "https://1337x.to/FitGirl-torrents/3/");

        let config = SourceConfig {
            base_url: "http://localhost:8080/".to_string(),
            listing_path: "list?page={page}".to_string(),
            ..Default::default()
        };
        assert_eq!(config.listing_url(1), "http://localhost:8080/list?page=1");
    }

    #[test]
    fn test_deserialize_partial() {
        let config: SourceConfig = toml::from_str(r#"base_url = "https://mirror.example""#).unwrap();
        assert_eq!(config.base_url, "https://mirror.example");
        assert_eq!(config.listing_path, "/FitGirl-torrents/{page}/");
    }
}
