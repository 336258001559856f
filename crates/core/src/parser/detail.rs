//! Detail page parsing.

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex_lite::Regex;
use scraper::{ElementRef, Html};
use std::collections::BTreeMap;
use tracing::debug;
use url::Url;

use super::dates::{parse_game_date, resolve_listing_date};
use super::size::normalize_size;
use super::text::{block_text, clean_page_title, clean_title, collapse_whitespace, element_text};
use super::{ParseError, ReleaseDetail, ReleaseParser};

/// Game detail labels and the keys they are stored under.
const DETAIL_LABELS: &[(&str, &str)] = &[
    ("Genres/Tags", "genres"),
    ("Developer", "developer"),
    ("Publisher", "publisher"),
    ("Platform", "platform"),
    ("Engine", "engine"),
    ("Steam User Rating", "steam_rating"),
    ("Interface Language", "interface_language"),
    ("Audio Language", "audio_language"),
    ("Crack", "crack"),
];

/// Longest game detail value kept; longer matches are page noise.
const MAX_DETAIL_CHARS: usize = 150;

static LABELLED_SIZE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:Total\s+size|Size)\s*:?\s*(\d+(?:[.,]\d+)?\s*[KMGT]i?B)").unwrap()
});

static EXACT_SIZE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\d+(?:[.,]\d+)?\s*[KMGT]i?B$").unwrap());

static PAGE_SIZE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bSize\s*:\s*(\d+(?:[.,]\d+)?\s*[KMGT]i?B)").unwrap());

static DESCRIPTION_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(?:Game\s+)?Description\s*:?\s*$").unwrap());

static RELEASE_DATE_LABELS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"Release\s+Date",
        r"Released",
        r"Launch\s+Date",
        r"Game\s+Release",
        r"Original\s+Release",
        r"First\s+Released",
    ]
    .iter()
    .map(|label| Regex::new(&format!(r"(?i)\b{}\s*:[ \t]*([^\n]+)", label)).unwrap())
    .collect()
});

static DETAIL_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    DETAIL_LABELS
        .iter()
        .map(|(label, key)| {
            let label = regex_lite::escape(label).replace(' ', r"\s+");
            let pattern = format!(r"(?i)\b{}\s*:[ \t]*([^\n]+)", label);
            (Regex::new(&pattern).unwrap(), *key)
        })
        .collect()
});

/// Any known label followed by a colon; values are cut where one starts.
static NEXT_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:Genres/Tags|Developer|Publisher|Platform|Engine|Steam\s+User\s+Rating|Interface\s+Language|Audio\s+Language|Crack|Release\s+Date|Released|Companies|Languages|Original\s+Size|Repack\s+Size)\s*:",
    )
    .unwrap()
});

fn cut_at_next_label(value: &str) -> &str {
    match NEXT_LABEL.find(value) {
        Some(m) => &value[..m.start()],
        None => value,
    }
}

fn is_image_type(url: &Url, extensions: &[&str]) -> bool {
    let path = url.path().to_ascii_lowercase();
    extensions.iter().any(|ext| path.ends_with(ext))
}

fn host_allowed(url: &Url, hosts: &[String]) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    hosts.iter().any(|allowed| {
        let allowed = allowed.to_ascii_lowercase();
        host == allowed || host.ends_with(&format!(".{}", allowed))
    })
}

/// Game release date from the first recognised label with a parseable value.
fn game_release_date(block: &str) -> Option<NaiveDate> {
    RELEASE_DATE_LABELS.iter().find_map(|pattern| {
        pattern
            .captures_iter(block)
            .filter_map(|caps| caps.get(1))
            .find_map(|value| parse_game_date(cut_at_next_label(value.as_str())))
    })
}

fn game_details(block: &str) -> BTreeMap<String, String> {
    let mut details = BTreeMap::new();
    for (pattern, key) in DETAIL_PATTERNS.iter() {
        let Some(value) = pattern.captures(block).and_then(|caps| caps.get(1)) else {
            continue;
        };
        let value = collapse_whitespace(cut_at_next_label(value.as_str()));
        let value = value.trim_end_matches([',', ';']).trim();
        if !value.is_empty() && value.chars().count() <= MAX_DETAIL_CHARS {
            details.insert(key.to_string(), value.to_string());
        }
    }
    details
}

impl ReleaseParser {
    /// Parse a detail page, resolving relative dates against the current time.
    pub fn parse_detail(&self, raw: &str) -> Result<ReleaseDetail, ParseError> {
        self.parse_detail_at(raw, Utc::now())
    }

    /// Parse a detail page, resolving relative dates against `now`.
    ///
    /// Only a blank document is an error; missing pieces come back empty.
    pub fn parse_detail_at(&self, raw: &str, now: DateTime<Utc>) -> Result<ReleaseDetail, ParseError> {
        if raw.trim().is_empty() {
            return Err(ParseError::EmptyDocument);
        }
        let document = Html::parse_document(raw);
        let root = document.root_element();
        let container = self
            .description_selectors
            .iter()
            .find_map(|selector| document.select(selector).next());
        let scope = container.unwrap_or(root);
        let block = block_text(scope);

        let cover_image_url = self.cover_image(scope);
        let screenshot_urls = self.screenshots(scope, cover_image_url.as_deref());

        let detail = ReleaseDetail {
            title: self.detail_title(&document),
            description: container.map(|c| self.description(c)).unwrap_or_default(),
            size: self.detail_size(&document, root),
            magnet_link: document
                .select(&self.magnet)
                .find_map(|a| a.value().attr("href"))
                .map(|href| href.trim().to_string())
                .filter(|href| !href.is_empty()),
            cover_image_url,
            screenshot_urls,
            game_release_date: game_release_date(&block),
            uploaded: self.uploaded(&document, now),
            additional_data: game_details(&block),
        };
        debug!(
            title = ?detail.title,
            has_magnet = detail.magnet_link.is_some(),
            screenshots = detail.screenshot_urls.len(),
            "Parsed detail page"
        );
        Ok(detail)
    }

    fn detail_title(&self, document: &Html) -> Option<String> {
        let from_title = document
            .select(&self.page_title)
            .next()
            .map(|t| clean_page_title(&element_text(t)))
            .filter(|t| !t.is_empty());
        from_title.or_else(|| {
            document
                .select(&self.heading)
                .next()
                .map(|h| clean_title(&element_text(h)))
                .filter(|t| !t.is_empty())
        })
    }

    fn detail_size(&self, document: &Html, root: ElementRef<'_>) -> String {
        let labelled = document.select(&self.info_items).find_map(|item| {
            let text = element_text(item);
            LABELLED_SIZE
                .captures(&text)
                .and_then(|caps| caps.get(1))
                .and_then(|m| normalize_size(m.as_str()))
        });
        let cell = || {
            document.select(&self.cells).find_map(|cell| {
                let text = element_text(cell);
                EXACT_SIZE
                    .is_match(&text)
                    .then(|| normalize_size(&text))
                    .flatten()
            })
        };
        let page = || {
            let text = block_text(root);
            PAGE_SIZE
                .captures(&text)
                .and_then(|caps| caps.get(1))
                .and_then(|m| normalize_size(m.as_str()))
        };
        labelled.or_else(cell).or_else(page).unwrap_or_default()
    }

    /// Text between the `Description:` label and the next `<strong>`.
    fn description(&self, container: ElementRef<'_>) -> String {
        let Some(label) = container
            .select(&self.strong)
            .find(|strong| DESCRIPTION_LABEL.is_match(&element_text(*strong)))
        else {
            return String::new();
        };

        let mut parts = Vec::new();
        for sibling in label.next_siblings() {
            if let Some(element) = ElementRef::wrap(sibling) {
                if element.value().name() == "strong" {
                    break;
                }
                parts.push(element_text(element));
            } else if let Some(text) = sibling.value().as_text() {
                parts.push(text.to_string());
            }
        }
        collapse_whitespace(&parts.join(" "))
            .trim_start_matches(':')
            .trim()
            .to_string()
    }

    fn uploaded(&self, document: &Html, now: DateTime<Utc>) -> Option<NaiveDate> {
        let label = document
            .select(&self.strong)
            .find(|strong| element_text(*strong).eq_ignore_ascii_case("Date uploaded"))?;
        let value = label
            .next_siblings()
            .find_map(ElementRef::wrap)
            .map(element_text)?;
        resolve_listing_date(&value, now)
    }

    fn image_urls<'a>(&'a self, scope: ElementRef<'a>) -> impl Iterator<Item = Url> + 'a {
        scope.select(&self.images).filter_map(move |img| {
            let attrs = img.value();
            let src = attrs
                .attr("data-original")
                .or_else(|| attrs.attr("data-src"))
                .or_else(|| attrs.attr("src"))?
                .trim();
            if src.is_empty() || src.starts_with("data:") {
                return None;
            }
            let url = self.base_url.join(src).ok()?;
            let excluded = self
                .excluded_images
                .iter()
                .any(|pattern| url.as_str().contains(pattern.as_str()));
            (!excluded).then_some(url)
        })
    }

    fn cover_image(&self, scope: ElementRef<'_>) -> Option<String> {
        self.image_urls(scope)
            .find(|url| !is_image_type(url, &[".svg", ".gif"]) && host_allowed(url, &self.cover_hosts))
            .map(String::from)
    }

    fn screenshots(&self, scope: ElementRef<'_>, cover: Option<&str>) -> Vec<String> {
        let mut urls: Vec<String> = Vec::new();
        for url in self.image_urls(scope) {
            if is_image_type(&url, &[".svg"]) || !host_allowed(&url, &self.screenshot_hosts) {
                continue;
            }
            let url = String::from(url);
            if Some(url.as_str()) != cover && !urls.contains(&url) {
                urls.push(url);
            }
        }
        urls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ParserConfig;
    use crate::testing::fixtures::DetailPage;
    use chrono::TimeZone;

    fn parser() -> ReleaseParser {
        ReleaseParser::new("https://example.org", &ParserConfig::default()).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn full_page() -> DetailPage {
        DetailPage::new("Game X - FitGirl Repack")
            .magnet("magnet:?xt=urn:btih:abc")
            .size("12.3 GB")
            .uploaded("2 days ago")
            .description("A sprawling open-world adventure.")
            .release_date("March 15, 2024 (Steam)")
            .cover("https://i.imgur.com/cover.jpg")
            .screenshot("https://riotpixels.net/shot1.jpg")
            .screenshot("https://riotpixels.net/shot2.jpg")
            .detail("Genres/Tags", "Action, Open-world")
            .detail("Developer", "Studio North")
            .detail("Publisher", "Big Pub")
    }

    #[test]
    fn test_parse_full_detail() {
        let detail = parser().parse_detail_at(&full_page().render(), now()).unwrap();

        assert_eq!(detail.title.as_deref(), Some("Game X"));
        assert_eq!(detail.magnet_link.as_deref(), Some("magnet:?xt=urn:btih:abc"));
        assert_eq!(detail.size, "12.3 GB");
        assert_eq!(detail.uploaded, NaiveDate::from_ymd_opt(2024, 6, 13));
        assert_eq!(detail.description, "A sprawling open-world adventure.");
        assert_eq!(detail.game_release_date, NaiveDate::from_ymd_opt(2024, 3, 15));
        assert_eq!(detail.cover_image_url.as_deref(), Some("https://i.imgur.com/cover.jpg"));
        assert_eq!(
            detail.screenshot_urls,
            vec![
                "https://riotpixels.net/shot1.jpg".to_string(),
                "https://riotpixels.net/shot2.jpg".to_string()
            ]
        );
        assert_eq!(detail.additional_data.get("genres").map(String::as_str), Some("Action, Open-world"));
        assert_eq!(detail.additional_data.get("developer").map(String::as_str), Some("Studio North"));
        assert_eq!(detail.additional_data.get("publisher").map(String::as_str), Some("Big Pub"));
        assert!(!detail.additional_data.contains_key("engine"));
    }

    #[test]
    fn test_missing_fields_are_empty() {
        let html = "<html><head><title>Something</title></head><body><p>nothing here</p></body></html>";
        let detail = parser().parse_detail_at(html, now()).unwrap();

        assert_eq!(detail.title.as_deref(), Some("Something"));
        assert!(detail.description.is_empty());
        assert!(detail.size.is_empty());
        assert!(detail.magnet_link.is_none());
        assert!(detail.cover_image_url.is_none());
        assert!(detail.screenshot_urls.is_empty());
        assert!(detail.game_release_date.is_none());
        assert!(detail.uploaded.is_none());
        assert!(detail.additional_data.is_empty());
    }

    #[test]
    fn test_blank_document_is_error() {
        assert!(matches!(
            parser().parse_detail_at("  \n", now()),
            Err(ParseError::EmptyDocument)
        ));
    }

    #[test]
    fn test_image_filters() {
        let page = DetailPage::new("Game")
            .cover("https://fitgirl-repacks.site/logo.jpg")
            .cover("https://i.imgur.com/anim.gif")
            .cover("https://unknown-host.com/cover.jpg")
            .cover("https://imageban.ru/real.jpg")
            .screenshot("https://imageban.ru/real.jpg")
            .screenshot("https://riotpixels.net/a.jpg")
            .screenshot("https://riotpixels.net/a.jpg")
            .screenshot("https://riotpixels.net/icon.svg")
            .screenshot("https://limeiptv.to/ad.jpg");
        let detail = parser().parse_detail_at(&page.render(), now()).unwrap();

        assert_eq!(detail.cover_image_url.as_deref(), Some("https://imageban.ru/real.jpg"));
        assert_eq!(
            detail.screenshot_urls,
            vec![
                "https://i.imgur.com/anim.gif".to_string(),
                "https://riotpixels.net/a.jpg".to_string()
            ]
        );
    }

    #[test]
    fn test_size_fallbacks() {
        let html = "<html><body><table><tr><td>Files</td><td>4.5 GB</td></tr></table></body></html>";
        assert_eq!(parser().parse_detail_at(html, now()).unwrap().size, "4.5 GB");

        let html = "<html><body><p>Repack Size: 800 MB</p></body></html>";
        assert_eq!(parser().parse_detail_at(html, now()).unwrap().size, "800 MB");
    }

    #[test]
    fn test_game_release_date_labels() {
        assert_eq!(
            game_release_date("Genres: x\nReleased: 2019\n"),
            NaiveDate::from_ymd_opt(2019, 1, 1)
        );
        assert_eq!(
            game_release_date("Release Date: TBA\nLaunch Date: 12 May 2020"),
            NaiveDate::from_ymd_opt(2020, 5, 12)
        );
        assert_eq!(game_release_date("nothing"), None);
    }

    #[test]
    fn test_game_details_cut_at_next_label() {
        let details = game_details("Genres/Tags: Racing Developer: Fast Co\nCrack: none");
        assert_eq!(details.get("genres").map(String::as_str), Some("Racing"));
        assert_eq!(details.get("developer").map(String::as_str), Some("Fast Co"));
        assert_eq!(details.get("crack").map(String::as_str), Some("none"));
    }

    #[test]
    fn test_overlong_detail_dropped() {
        let block = format!("Engine: {}", "x".repeat(200));
        assert!(game_details(&block).is_empty());
    }
}
