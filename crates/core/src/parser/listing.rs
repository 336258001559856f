//! Listing page parsing.

use chrono::{DateTime, Utc};
use scraper::html::Select;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use super::dates::resolve_listing_date;
use super::text::{clean_title, collapse_whitespace, element_text, own_text};
use super::{ParseError, ReleaseParser, ReleaseSummary};

/// A parsed listing page.
///
/// Owns the document; `summaries()` walks it lazily and can be called any
/// number of times.
pub struct Listing<'p> {
    parser: &'p ReleaseParser,
    document: Html,
    captured_at: DateTime<Utc>,
}

impl<'p> Listing<'p> {
    /// Time the relative publish dates were resolved against.
    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Iterate the page's entries in listing order.
    ///
    /// Malformed entries are logged and skipped.
    pub fn summaries(&self) -> Summaries<'_> {
        let selector = self.parser.row_selectors.iter().find(|selector| {
            self.document
                .select(selector)
                .any(|row| first_match(row, &self.parser.link_selectors).is_some())
        });
        Summaries {
            rows: selector.map(|selector| self.document.select(selector)),
            parser: self.parser,
            captured_at: self.captured_at,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.summaries().next().is_none()
    }
}

impl std::fmt::Debug for Listing<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listing")
            .field("captured_at", &self.captured_at)
            .finish_non_exhaustive()
    }
}

/// Lazy iterator over the entries of a [`Listing`].
pub struct Summaries<'a> {
    rows: Option<Select<'a, 'a>>,
    parser: &'a ReleaseParser,
    captured_at: DateTime<Utc>,
}

impl Iterator for Summaries<'_> {
    type Item = ReleaseSummary;

    fn next(&mut self) -> Option<ReleaseSummary> {
        let rows = self.rows.as_mut()?;
        for row in rows.by_ref() {
            match self.parser.summarize_row(row, self.captured_at) {
                Ok(Some(summary)) => return Some(summary),
                Ok(None) => continue,
                Err(e) => warn!(error = %e, "Skipping malformed listing entry"),
            }
        }
        None
    }
}

pub(super) fn first_match<'a>(element: ElementRef<'a>, selectors: &[Selector]) -> Option<ElementRef<'a>> {
    selectors
        .iter()
        .find_map(|selector| element.select(selector).next())
}

impl ReleaseParser {
    /// Parse a listing page, resolving relative dates against the current time.
    pub fn parse_listing(&self, raw: &str) -> Listing<'_> {
        self.parse_listing_at(raw, Utc::now())
    }

    /// Parse a listing page, resolving relative dates against `now`.
    pub fn parse_listing_at(&self, raw: &str, now: DateTime<Utc>) -> Listing<'_> {
        debug!(bytes = raw.len(), "Parsing listing page");
        Listing {
            parser: self,
            document: Html::parse_document(raw),
            captured_at: now,
        }
    }

    /// `Ok(None)` for rows that are not release entries (headers, ads).
    fn summarize_row(
        &self,
        row: ElementRef<'_>,
        now: DateTime<Utc>,
    ) -> Result<Option<ReleaseSummary>, ParseError> {
        let Some(link) = first_match(row, &self.link_selectors) else {
            return Ok(None);
        };

        let href = link
            .value()
            .attr("href")
            .map(str::trim)
            .filter(|href| !href.is_empty())
            .ok_or_else(|| ParseError::MalformedEntry("release link without href".to_string()))?;
        let source_url = self
            .base_url
            .join(href)
            .map_err(|e| ParseError::MalformedEntry(format!("bad link '{}': {}", href, e)))?;

        let title = clean_title(&element_text(link));
        if title.is_empty() {
            return Err(ParseError::MalformedEntry(format!(
                "empty title for {}",
                source_url
            )));
        }

        let raw_publish_date = first_match(row, &self.date_selectors)
            .map(|cell| collapse_whitespace(&element_text(cell)))
            .filter(|text| !text.is_empty());
        let publish_date = raw_publish_date
            .as_deref()
            .and_then(|raw| resolve_listing_date(raw, now));
        let raw_size = first_match(row, &self.size_selectors)
            .map(own_text)
            .filter(|text| !text.is_empty());

        Ok(Some(ReleaseSummary {
            source_url: source_url.to_string(),
            title,
            raw_publish_date,
            publish_date,
            raw_size,
        }))
    }
}
