//! Release parser.
//!
//! Turns raw listing and detail markup into [`ReleaseSummary`] and
//! [`ReleaseDetail`] values. Parsing is tolerant: malformed listing rows are
//! skipped with a warning and missing detail fields come back empty.

mod config;
pub mod dates;
mod detail;
mod listing;
pub mod size;
mod text;
mod types;

pub use config::ParserConfig;
pub use listing::{Listing, Summaries};
pub use text::{clean_title, collapse_whitespace};
pub use types::*;

use scraper::Selector;
use tracing::warn;
use url::Url;

/// Compiled parser for one source site.
///
/// Cheap to share behind an `Arc`; parsing never mutates it.
pub struct ReleaseParser {
    base_url: Url,
    row_selectors: Vec<Selector>,
    link_selectors: Vec<Selector>,
    date_selectors: Vec<Selector>,
    size_selectors: Vec<Selector>,
    description_selectors: Vec<Selector>,
    page_title: Selector,
    heading: Selector,
    magnet: Selector,
    info_items: Selector,
    cells: Selector,
    strong: Selector,
    images: Selector,
    cover_hosts: Vec<String>,
    screenshot_hosts: Vec<String>,
    excluded_images: Vec<String>,
}

impl ReleaseParser {
    /// Build a parser resolving relative links against `base_url`.
    pub fn new(base_url: &str, config: &ParserConfig) -> Result<Self, ParseError> {
        let base_url =
            Url::parse(base_url).map_err(|_| ParseError::InvalidBaseUrl(base_url.to_string()))?;
        Ok(Self {
            base_url,
            row_selectors: compile_selectors("row_selectors", &config.row_selectors)?,
            link_selectors: compile_selectors("link_selectors", &config.link_selectors)?,
            date_selectors: compile_selectors("date_selectors", &config.date_selectors)?,
            size_selectors: compile_selectors("size_selectors", &config.size_selectors)?,
            description_selectors: compile_selectors(
                "description_selectors",
                &config.description_selectors,
            )?,
            page_title: builtin("title")?,
            heading: builtin("h1")?,
            magnet: builtin("a[href^='magnet:']")?,
            info_items: builtin("ul.list li")?,
            cells: builtin("td")?,
            strong: builtin("strong")?,
            images: builtin("img")?,
            cover_hosts: config.cover_hosts.clone(),
            screenshot_hosts: config.screenshot_hosts.clone(),
            excluded_images: config.excluded_images.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

impl std::fmt::Debug for ReleaseParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseParser")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

/// Compile a selector list, dropping entries that do not parse.
fn compile_selectors(field: &'static str, sources: &[String]) -> Result<Vec<Selector>, ParseError> {
    let mut selectors = Vec::new();
    let mut errors = Vec::new();

    for source in sources {
        match Selector::parse(source) {
            Ok(selector) => selectors.push(selector),
            Err(e) => {
                warn!(field, selector = %source, error = %e, "Failed to compile selector");
                errors.push(format!("'{}': {}", source, e));
            }
        }
    }

    if selectors.is_empty() {
        let reason = if errors.is_empty() {
            "no selectors configured".to_string()
        } else {
            errors.join(", ")
        };
        return Err(ParseError::InvalidSelector { field, reason });
    }

    Ok(selectors)
}

fn builtin(source: &str) -> Result<Selector, ParseError> {
    Selector::parse(source).map_err(|e| ParseError::InvalidSelector {
        field: "builtin",
        reason: format!("'{}': {}", source, e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_with_defaults() {
        let parser = ReleaseParser::new("https://1337x.to", &ParserConfig::default()).unwrap();
        assert_eq!(parser.base_url().as_str(), "https://1337x.to/");
    }

    #[test]
    fn test_invalid_selectors_dropped() {
        let config = ParserConfig {
            row_selectors: vec!["tr[".to_string(), "tr".to_string()],
            ..Default::default()
        };
        let parser = ReleaseParser::new("https://1337x.to", &config).unwrap();
        assert_eq!(parser.row_selectors.len(), 1);
    }

    #[test]
    fn test_all_invalid_selectors_rejected() {
        let config = ParserConfig {
            link_selectors: vec!["a[".to_string()],
            ..Default::default()
        };
        let err = ReleaseParser::new("https://1337x.to", &config).unwrap_err();
        assert!(matches!(err, ParseError::InvalidSelector { field: "link_selectors", .. }));

        let config = ParserConfig {
            date_selectors: vec![],
            ..Default::default()
        };
        assert!(ReleaseParser::new("https://1337x.to", &config).is_err());
    }

    #[test]
    fn test_invalid_base_url() {
        let err = ReleaseParser::new("not a url", &ParserConfig::default()).unwrap_err();
        assert!(matches!(err, ParseError::InvalidBaseUrl(_)));
    }
}
