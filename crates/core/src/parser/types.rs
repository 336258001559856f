//! Types produced by the release parser.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::catalog::ScrapedFields;

/// One entry of a listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseSummary {
    /// Absolute URL of the detail page.
    pub source_url: String,
    /// Cleaned title.
    pub title: String,
    /// Publish date text as shown on the listing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_publish_date: Option<String>,
    /// `raw_publish_date` resolved at parse time. `None` when unknown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_date: Option<NaiveDate>,
    /// Size text as shown on the listing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_size: Option<String>,
}

/// Everything extracted from a detail page.
///
/// Absent markup yields empty strings, `None` or empty collections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseDetail {
    pub title: Option<String>,
    pub description: String,
    pub size: String,
    pub magnet_link: Option<String>,
    pub cover_image_url: Option<String>,
    pub screenshot_urls: Vec<String>,
    pub game_release_date: Option<NaiveDate>,
    /// Upload date shown on the detail page.
    pub uploaded: Option<NaiveDate>,
    /// Game details keyed by `genres`, `developer`, `publisher`, ...
    pub additional_data: BTreeMap<String, String>,
}

impl ReleaseDetail {
    /// Combine with the listing entry it was reached from.
    ///
    /// Title, publish date and size come from the listing; the detail page
    /// fills in whatever the listing lacks.
    pub fn into_fields(self, summary: &ReleaseSummary) -> ScrapedFields {
        let title = if summary.title.is_empty() {
            self.title.unwrap_or_default()
        } else {
            summary.title.clone()
        };
        let size = if self.size.is_empty() {
            summary
                .raw_size
                .as_deref()
                .and_then(super::size::normalize_size)
                .unwrap_or_default()
        } else {
            self.size
        };
        ScrapedFields {
            title,
            description: self.description,
            publish_date: summary.publish_date.or(self.uploaded),
            game_release_date: self.game_release_date,
            size,
            magnet_link: self.magnet_link,
            cover_image_url: self.cover_image_url,
            screenshot_urls: self.screenshot_urls,
            additional_data: self.additional_data,
        }
    }
}

/// Errors raised while building a parser or reading a page.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Invalid selector list for {field}: {reason}")]
    InvalidSelector { field: &'static str, reason: String },

    #[error("Invalid base URL '{0}'")]
    InvalidBaseUrl(String),

    #[error("Document is empty")]
    EmptyDocument,

    #[error("Malformed entry: {0}")]
    MalformedEntry(String),
}
