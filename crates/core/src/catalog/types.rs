//! Types for the release catalog.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Length of the generated short description, in characters.
pub const SHORT_DESCRIPTION_CHARS: usize = 300;

/// User-assigned status of a release.
///
/// Only ever changed by explicit user action; synchronization never touches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReleaseStatus {
    #[default]
    New,
    Downloaded,
    Ignored,
}

impl ReleaseStatus {
    pub const ALL: [ReleaseStatus; 3] = [
        ReleaseStatus::New,
        ReleaseStatus::Downloaded,
        ReleaseStatus::Ignored,
    ];

    /// Lowercase identifier used in query strings and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseStatus::New => "new",
            ReleaseStatus::Downloaded => "downloaded",
            ReleaseStatus::Ignored => "ignored",
        }
    }

    /// Human-readable label for UI consumers.
    pub fn label(&self) -> &'static str {
        match self {
            ReleaseStatus::New => "New",
            ReleaseStatus::Downloaded => "Downloaded",
            ReleaseStatus::Ignored => "Ignored",
        }
    }

    /// Hex colour for UI consumers.
    pub fn color(&self) -> &'static str {
        match self {
            ReleaseStatus::New => "#FFA500",
            ReleaseStatus::Downloaded => "#32CD32",
            ReleaseStatus::Ignored => "#FF6B6B",
        }
    }
}

impl fmt::Display for ReleaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected status string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid status: {0} (expected new, downloaded or ignored)")]
pub struct InvalidStatus(pub String);

impl FromStr for ReleaseStatus {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "new" => Ok(ReleaseStatus::New),
            "downloaded" => Ok(ReleaseStatus::Downloaded),
            "ignored" => Ok(ReleaseStatus::Ignored),
            _ => Err(InvalidStatus(s.to_string())),
        }
    }
}

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Release {
    /// Store-assigned id, never reused.
    pub id: u64,
    /// De-duplication key.
    pub source_url: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub short_description: String,
    /// `None` when the publish date could not be resolved.
    #[serde(default)]
    pub publish_date: Option<NaiveDate>,
    #[serde(default)]
    pub game_release_date: Option<NaiveDate>,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub status: ReleaseStatus,
    #[serde(default)]
    pub magnet_link: Option<String>,
    #[serde(default)]
    pub cover_image_url: Option<String>,
    #[serde(default)]
    pub screenshot_urls: Vec<String>,
    /// Game details (genres, developer, ...) keyed by label.
    #[serde(default)]
    pub additional_data: BTreeMap<String, String>,
    #[serde(default)]
    pub content_hash: String,
    pub last_synced_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Release {
    /// Create a new entry with status NEW from freshly scraped fields.
    pub fn from_scrape(id: u64, source_url: &str, fields: ScrapedFields, now: DateTime<Utc>) -> Self {
        let content_hash = fields.content_hash();
        let mut release = Self {
            id,
            source_url: source_url.to_string(),
            title: String::new(),
            description: String::new(),
            short_description: String::new(),
            publish_date: None,
            game_release_date: None,
            size: String::new(),
            status: ReleaseStatus::New,
            magnet_link: None,
            cover_image_url: None,
            screenshot_urls: Vec::new(),
            additional_data: BTreeMap::new(),
            content_hash: String::new(),
            last_synced_at: now,
            created_at: now,
            updated_at: now,
        };
        release.apply_scrape(fields, content_hash, now);
        release
    }

    /// Overwrite every scrape-derived field. `id`, `status` and `created_at`
    /// are left alone.
    pub fn apply_scrape(&mut self, fields: ScrapedFields, content_hash: String, now: DateTime<Utc>) {
        self.short_description = summarize(&fields.description, SHORT_DESCRIPTION_CHARS);
        self.title = fields.title;
        self.description = fields.description;
        self.publish_date = fields.publish_date;
        self.game_release_date = fields.game_release_date;
        self.size = fields.size;
        self.magnet_link = fields.magnet_link;
        self.cover_image_url = fields.cover_image_url;
        self.screenshot_urls = fields.screenshot_urls;
        self.additional_data = fields.additional_data;
        self.content_hash = content_hash;
        self.last_synced_at = now;
        self.updated_at = now;
    }

    /// The scrape-derived part of this entry, as it would be re-scraped.
    pub fn scraped_fields(&self) -> ScrapedFields {
        ScrapedFields {
            title: self.title.clone(),
            description: self.description.clone(),
            publish_date: self.publish_date,
            game_release_date: self.game_release_date,
            size: self.size.clone(),
            magnet_link: self.magnet_link.clone(),
            cover_image_url: self.cover_image_url.clone(),
            screenshot_urls: self.screenshot_urls.clone(),
            additional_data: self.additional_data.clone(),
        }
    }

    pub fn has_download_links(&self) -> bool {
        self.magnet_link.as_deref().is_some_and(|m| !m.is_empty())
    }
}

/// Scrape-derived fields of a release, as merged from listing and detail pages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrapedFields {
    pub title: String,
    pub description: String,
    pub publish_date: Option<NaiveDate>,
    pub game_release_date: Option<NaiveDate>,
    pub size: String,
    pub magnet_link: Option<String>,
    pub cover_image_url: Option<String>,
    pub screenshot_urls: Vec<String>,
    pub additional_data: BTreeMap<String, String>,
}

impl ScrapedFields {
    /// SHA-256 over every field, hex encoded.
    ///
    /// Fields are framed with their length so adjacent values cannot alias.
    pub fn content_hash(&self) -> String {
        fn feed(hasher: &mut Sha256, value: &str) {
            hasher.update((value.len() as u64).to_le_bytes());
            hasher.update(value.as_bytes());
        }
        fn feed_date(hasher: &mut Sha256, value: Option<NaiveDate>) {
            match value {
                Some(date) => feed(hasher, &date.to_string()),
                None => hasher.update([0xff]),
            }
        }

        let mut hasher = Sha256::new();
        feed(&mut hasher, &self.title);
        feed(&mut hasher, &self.description);
        feed_date(&mut hasher, self.publish_date);
        feed_date(&mut hasher, self.game_release_date);
        feed(&mut hasher, &self.size);
        feed(&mut hasher, self.magnet_link.as_deref().unwrap_or(""));
        feed(&mut hasher, self.cover_image_url.as_deref().unwrap_or(""));
        hasher.update((self.screenshot_urls.len() as u64).to_le_bytes());
        for url in &self.screenshot_urls {
            feed(&mut hasher, url);
        }
        hasher.update((self.additional_data.len() as u64).to_le_bytes());
        for (key, value) in &self.additional_data {
            feed(&mut hasher, key);
            feed(&mut hasher, value);
        }
        format!("{:x}", hasher.finalize())
    }
}

/// First `max_chars` characters of `text`, with `...` appended when cut.
pub fn summarize(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", text[..cut].trim_end()),
        None => text.to_string(),
    }
}

/// What `upsert_from_scrape` did with an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertKind {
    Created,
    Updated,
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertOutcome {
    pub id: u64,
    pub kind: UpsertKind,
}

impl UpsertOutcome {
    pub fn is_new(&self) -> bool {
        self.kind == UpsertKind::Created
    }

    pub fn is_changed(&self) -> bool {
        self.kind == UpsertKind::Updated
    }
}

/// Ordering applied by `list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    DateDesc,
    DateAsc,
    TitleAsc,
    TitleDesc,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "date_desc" => Ok(SortKey::DateDesc),
            "date_asc" => Ok(SortKey::DateAsc),
            "title_asc" => Ok(SortKey::TitleAsc),
            "title_desc" => Ok(SortKey::TitleDesc),
            other => Err(format!("unknown sort key: {}", other)),
        }
    }
}

/// Query for listing the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseQuery {
    /// Case-insensitive substring matched against title and description.
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub status: Option<ReleaseStatus>,
    #[serde(default)]
    pub sort: SortKey,
    /// 1-based page number.
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    50
}

impl Default for ReleaseQuery {
    fn default() -> Self {
        Self {
            search: None,
            status: None,
            sort: SortKey::default(),
            page: default_page(),
            limit: default_limit(),
        }
    }
}

impl ReleaseQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_status(mut self, status: ReleaseStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_sort(mut self, sort: SortKey) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_page(mut self, page: u32, limit: u32) -> Self {
        self.page = page;
        self.limit = limit;
        self
    }

    /// Whether a release passes the search and status filters.
    pub fn matches(&self, release: &Release) -> bool {
        if let Some(status) = self.status {
            if release.status != status {
                return false;
            }
        }
        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let term = term.to_lowercase();
                release.title.to_lowercase().contains(&term)
                    || release.description.to_lowercase().contains(&term)
            }
            _ => true,
        }
    }
}

/// One page of `list` results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleasePage {
    pub items: Vec<Release>,
    /// Entries in the whole catalog.
    pub total: usize,
    /// Entries matching the filters.
    pub filtered_total: usize,
    pub page: u32,
    pub limit: u32,
    pub has_more: bool,
}

/// Catalog statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogStats {
    pub total: usize,
    pub new: usize,
    pub downloaded: usize,
    pub ignored: usize,
    pub with_download_links: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_publish_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub earliest_publish_date: Option<NaiveDate>,
    /// When the last full sync completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sync_at: Option<DateTime<Utc>>,
}

impl CatalogStats {
    pub fn count(&self, status: ReleaseStatus) -> usize {
        match status {
            ReleaseStatus::New => self.new,
            ReleaseStatus::Downloaded => self.downloaded,
            ReleaseStatus::Ignored => self.ignored,
        }
    }
}

/// Errors for catalog operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Release not found: {0}")]
    NotFound(u64),

    #[error("Catalog I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Catalog serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}
