//! Text helpers shared by the listing and detail parsers.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use scraper::ElementRef;

static REPACK_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*-?\s*FitGirl\s*Repacks?\s*$").unwrap());

static PAGE_TITLE_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s+Torrent\s*\|.*$").unwrap());

const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "li", "ul", "ol", "tr", "table", "h1", "h2", "h3", "h4", "h5", "h6", "section",
    "article", "blockquote", "pre", "dt", "dd",
];

/// Collapse runs of whitespace into single spaces and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Release title as shown to users: repack suffix removed, whitespace collapsed.
pub fn clean_title(raw: &str) -> String {
    let collapsed = collapse_whitespace(raw);
    REPACK_SUFFIX.replace(&collapsed, "").trim().to_string()
}

/// Release title from a `<title>` such as `Download X Torrent | 1337x`.
pub fn clean_page_title(raw: &str) -> String {
    let collapsed = collapse_whitespace(raw);
    let without_prefix = match collapsed.get(..9) {
        Some(prefix) if prefix.eq_ignore_ascii_case("download ") => &collapsed[9..],
        _ => collapsed.as_str(),
    };
    let without_suffix = PAGE_TITLE_SUFFIX.replace(without_prefix, "");
    clean_title(&without_suffix)
}

/// Concatenated text of the element's direct text children.
pub fn own_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        }
    }
    collapse_whitespace(&out)
}

/// Text of all descendants, collapsed.
pub fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

/// Text of the subtree with one line per block element or `<br>`.
///
/// Whitespace is collapsed within lines and blank lines are dropped.
pub fn block_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    push_block_text(element, &mut raw);
    raw.lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn push_block_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child) = ElementRef::wrap(child) {
            let name = child.value().name();
            if matches!(name, "script" | "style") {
                continue;
            }
            let block = BLOCK_ELEMENTS.contains(&name);
            if block || name == "br" {
                out.push('\n');
            }
            push_block_text(child, out);
            if block {
                out.push('\n');
            }
        }
    }
}
