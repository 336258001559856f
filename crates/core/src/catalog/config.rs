//! Catalog configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where the catalog document lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Path of the JSON catalog document.
    #[serde(default = "default_path")]
    pub path: PathBuf,
}

fn default_path() -> PathBuf {
    PathBuf::from("releases.json")
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CatalogConfig::default();
        assert_eq!(config.path, PathBuf::from("releases.json"));
    }

    #[test]
    fn test_deserialize() {
        let config: CatalogConfig = toml::from_str(r#"path = "/var/lib/tracker/catalog.json""#).unwrap();
        assert_eq!(config.path, PathBuf::from("/var/lib/tracker/catalog.json"));
    }
}
