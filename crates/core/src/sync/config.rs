//! Sync engine configuration.

use serde::{Deserialize, Serialize};

use crate::fetcher::RetryPolicy;

/// When an already-known listing entry gets its detail page fetched again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecheckPolicy {
    /// Known entries are always classified unchanged.
    Never,
    /// Refetch when the listing title, size or date drifted from the catalog.
    #[default]
    OnDrift,
    /// Refetch every known entry.
    Always,
}

/// Sync engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Listing pages fetched per session at most.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Listing entries handled per session at most. Unlimited when absent.
    #[serde(default)]
    pub max_items: Option<u32>,

    /// Delay between listing page fetches in milliseconds.
    #[serde(default = "default_page_delay")]
    pub page_delay_ms: u64,

    /// Delay between detail page fetches in milliseconds.
    #[serde(default = "default_item_delay")]
    pub item_delay_ms: u64,

    /// Retry policy for listing and detail fetches.
    #[serde(default)]
    pub retry: RetryPolicy,

    /// How long a finished session stays visible before resetting to IDLE.
    #[serde(default = "default_reset_grace")]
    pub reset_grace_ms: u64,

    #[serde(default)]
    pub recheck: RecheckPolicy,

    /// Publish dates this close to the stored one count as unchanged.
    #[serde(default = "default_date_drift_days")]
    pub date_drift_days: i64,

    /// Skip releases whose detail page has no magnet link.
    #[serde(default = "default_true")]
    pub require_magnet_link: bool,

    /// Retry failed detail fetches once more at the end of the session.
    #[serde(default = "default_true")]
    pub retry_deferred: bool,
}

fn default_max_pages() -> u32 {
    100
}

fn default_page_delay() -> u64 {
    2000
}

fn default_item_delay() -> u64 {
    1000
}

fn default_reset_grace() -> u64 {
    5000
}

fn default_date_drift_days() -> i64 {
    2
}

fn default_true() -> bool {
    true
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
            max_items: None,
            page_delay_ms: default_page_delay(),
            item_delay_ms: default_item_delay(),
            retry: RetryPolicy::default(),
            reset_grace_ms: default_reset_grace(),
            recheck: RecheckPolicy::default(),
            date_drift_days: default_date_drift_days(),
            require_magnet_link: true,
            retry_deferred: true,
        }
    }
}

impl SyncConfig {
    /// Sets the page cap.
    pub fn with_max_pages(mut self, max: u32) -> Self {
        self.max_pages = max;
        self
    }

    /// Sets the item cap.
    pub fn with_max_items(mut self, max: u32) -> Self {
        self.max_items = Some(max);
        self
    }

    /// Sets both politeness delays.
    pub fn with_delays(mut self, page_delay_ms: u64, item_delay_ms: u64) -> Self {
        self.page_delay_ms = page_delay_ms;
        self.item_delay_ms = item_delay_ms;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_reset_grace(mut self, ms: u64) -> Self {
        self.reset_grace_ms = ms;
        self
    }

    pub fn with_recheck(mut self, recheck: RecheckPolicy) -> Self {
        self.recheck = recheck;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SyncConfig::default();
        assert_eq!(config.max_pages, 100);
        assert_eq!(config.max_items, None);
        assert_eq!(config.page_delay_ms, 2000);
        assert_eq!(config.item_delay_ms, 1000);
        assert_eq!(config.recheck, RecheckPolicy::OnDrift);
        assert!(config.require_magnet_link);
        assert!(config.retry_deferred);
    }

    #[test]
    fn test_deserialize() {
        let toml = r#"
            max_pages = 5
            max_items = 40
            recheck = "always"

            [retry]
            max_attempts = 5
        "#;

        let config: SyncConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.max_pages, 5);
        assert_eq!(config.max_items, Some(40));
        assert_eq!(config.recheck, RecheckPolicy::Always);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.initial_delay_ms, 1000);
        assert_eq!(config.reset_grace_ms, 5000);
    }

    #[test]
    fn test_builders() {
        let config = SyncConfig::default()
            .with_max_pages(3)
            .with_max_items(10)
            .with_delays(0, 0)
            .with_recheck(RecheckPolicy::Never);
        assert_eq!(config.max_pages, 3);
        assert_eq!(config.max_items, Some(10));
        assert_eq!(config.page_delay_ms, 0);
        assert_eq!(config.recheck, RecheckPolicy::Never);
    }
}
