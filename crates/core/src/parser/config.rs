//! Parser configuration.

use serde::{Deserialize, Serialize};

/// Selectors and image host rules for the listing and detail pages.
///
/// Selector lists are tried in order; the first one that matches anything
/// wins. Invalid selectors are logged and ignored as long as at least one
/// selector in each list compiles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Listing rows. Rows without a release link are ignored.
    #[serde(default = "default_row_selectors")]
    pub row_selectors: Vec<String>,

    /// Release link inside a listing row.
    #[serde(default = "default_link_selectors")]
    pub link_selectors: Vec<String>,

    /// Publish date cell inside a listing row.
    #[serde(default = "default_date_selectors")]
    pub date_selectors: Vec<String>,

    /// Size cell inside a listing row.
    #[serde(default = "default_size_selectors")]
    pub size_selectors: Vec<String>,

    /// Candidate containers of the detail page description.
    #[serde(default = "default_description_selectors")]
    pub description_selectors: Vec<String>,

    /// Hosts a cover image may be served from.
    #[serde(default = "default_cover_hosts")]
    pub cover_hosts: Vec<String>,

    /// Hosts screenshots may be served from.
    #[serde(default = "default_screenshot_hosts")]
    pub screenshot_hosts: Vec<String>,

    /// Image URLs containing any of these are never used.
    #[serde(default = "default_excluded_images")]
    pub excluded_images: Vec<String>,
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn default_row_selectors() -> Vec<String> {
    strings(&["table.table-list tbody tr", "tr"])
}

fn default_link_selectors() -> Vec<String> {
    strings(&["a[href*='/torrent/']"])
}

fn default_date_selectors() -> Vec<String> {
    strings(&["td.coll-date"])
}

fn default_size_selectors() -> Vec<String> {
    strings(&["td.size"])
}

fn default_description_selectors() -> Vec<String> {
    strings(&[
        "div.torrent-detail-page",
        "div.box-info-detail",
        "div.tab-pane.active",
        "div#description",
        "div.description",
    ])
}

fn default_cover_hosts() -> Vec<String> {
    strings(&["imageban.ru", "imgur.com", "postimg.cc", "imgbb.com", "fastpic.ru"])
}

fn default_screenshot_hosts() -> Vec<String> {
    strings(&[
        "riotpixels.net",
        "imgur.com",
        "postimg.cc",
        "imgbb.com",
        "imageban.ru",
        "fastpic.ru",
    ])
}

fn default_excluded_images() -> Vec<String> {
    strings(&["profile-load", "fakes2.jpg", "fitgirl-repacks.site", "limeiptv.to"])
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            row_selectors: default_row_selectors(),
            link_selectors: default_link_selectors(),
            date_selectors: default_date_selectors(),
            size_selectors: default_size_selectors(),
            description_selectors: default_description_selectors(),
            cover_hosts: default_cover_hosts(),
            screenshot_hosts: default_screenshot_hosts(),
            excluded_images: default_excluded_images(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ParserConfig::default();
        assert_eq!(config.link_selectors, vec!["a[href*='/torrent/']"]);
        assert_eq!(config.description_selectors.len(), 5);
        assert!(config.cover_hosts.contains(&"imgur.com".to_string()));
        assert!(config.screenshot_hosts.contains(&"riotpixels.net".to_string()));
        assert!(!config.cover_hosts.contains(&"riotpixels.net".to_string()));
    }

    #[test]
    fn test_partial_override() {
        let toml = r#"
            cover_hosts = ["img.example.com"]
        "#;
        let config: ParserConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.cover_hosts, vec!["img.example.com"]);
        assert_eq!(config.date_selectors, vec!["td.coll-date"]);
    }
}
