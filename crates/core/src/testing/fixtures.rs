//! HTML builders shaped like the source site's listing and detail pages.

use std::fmt::Write;

/// One row of a listing page.
#[derive(Debug, Clone)]
pub struct ListingRow {
    pub path: String,
    pub title: String,
    pub date: String,
    pub size: String,
}

impl ListingRow {
    /// Row linking to `/torrent/{id}/game-{id}/`, uploaded today, 10.0 GB.
    pub fn new(id: u32, title: &str) -> Self {
        Self {
            path: format!("/torrent/{}/game-{}/", id, id),
            title: title.to_string(),
            date: "9am".to_string(),
            size: "10.0 GB".to_string(),
        }
    }

    pub fn date(mut self, date: &str) -> Self {
        self.date = date.to_string();
        self
    }

    pub fn size(mut self, size: &str) -> Self {
        self.size = size.to_string();
        self
    }

    pub fn path(mut self, path: &str) -> Self {
        self.path = path.to_string();
        self
    }
}

/// A listing page with the given rows. No rows renders an empty table.
pub fn listing_page(rows: &[ListingRow]) -> String {
    let mut body = String::new();
    for row in rows {
        let _ = write!(
            body,
            r#"<tr>
<td class="coll-1 name"><a href="/sub/10/0/" class="icon"><i class="flaticon-games"></i></a><a href="{path}">{title}</a></td>
<td class="coll-2 seeds">120</td>
<td class="coll-3 leeches">14</td>
<td class="coll-date">{date}</td>
<td class="coll-4 size mob-uploader">{size}<span class="seeds">120</span></td>
<td class="coll-5 uploader"><a href="/user/FitGirl/">FitGirl</a></td>
</tr>
"#,
            path = row.path,
            title = row.title,
            date = row.date,
            size = row.size,
        );
    }
    format!(
        r#"<!DOCTYPE html>
<html><head><title>FitGirl torrents</title></head><body>
<div class="box-info-detail">
<table class="table-list table table-responsive table-striped">
<thead><tr><th class="coll-1 name">name</th><th class="coll-2">se</th><th class="coll-3">le</th><th class="coll-date">time</th><th class="coll-4">size</th><th class="coll-5">uploader</th></tr></thead>
<tbody>
{}</tbody>
</table>
</div>
</body></html>"#,
        body
    )
}

/// Builder for a detail page.
#[derive(Debug, Clone, Default)]
pub struct DetailPage {
    pub title: String,
    pub magnet: Option<String>,
    pub size: Option<String>,
    pub uploaded: Option<String>,
    pub description: Option<String>,
    pub release_date: Option<String>,
    pub covers: Vec<String>,
    pub screenshots: Vec<String>,
    pub details: Vec<(String, String)>,
}

impl DetailPage {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Default::default()
        }
    }

    /// A page with every field a sync needs, sized `size`.
    pub fn complete(title: &str, size: &str) -> Self {
        Self::new(title)
            .magnet(&format!(
                "magnet:?xt=urn:btih:{}",
                title.to_lowercase().replace(' ', "")
            ))
            .size(size)
            .uploaded("9am")
            .description(&format!("{} description.", title))
    }

    pub fn magnet(mut self, magnet: &str) -> Self {
        self.magnet = Some(magnet.to_string());
        self
    }

    pub fn size(mut self, size: &str) -> Self {
        self.size = Some(size.to_string());
        self
    }

    pub fn uploaded(mut self, uploaded: &str) -> Self {
        self.uploaded = Some(uploaded.to_string());
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn release_date(mut self, date: &str) -> Self {
        self.release_date = Some(date.to_string());
        self
    }

    /// Add an image to the cover block. May be called repeatedly.
    pub fn cover(mut self, url: &str) -> Self {
        self.covers.push(url.to_string());
        self
    }

    pub fn screenshot(mut self, url: &str) -> Self {
        self.screenshots.push(url.to_string());
        self
    }

    pub fn detail(mut self, label: &str, value: &str) -> Self {
        self.details.push((label.to_string(), value.to_string()));
        self
    }

    pub fn render(&self) -> String {
        let mut html = String::new();
        let _ = write!(
            html,
            r#"<!DOCTYPE html>
<html><head><title>Download {title} Torrent | 1337x</title></head><body>
<div class="box-info torrent-detail-page">
<div class="box-info-heading"><h1>{title}</h1></div>
"#,
            title = self.title
        );
        if let Some(magnet) = &self.magnet {
            let _ = write!(
                html,
                r#"<ul class="download-links-dontblock"><li><a href="{}">Magnet Download</a></li></ul>
"#,
                magnet
            );
        }
        html.push_str(r#"<ul class="list"><li><strong>Category</strong> <span>Games</span></li>"#);
        if let Some(size) = &self.size {
            let _ = write!(html, "<li><strong>Total size</strong> <span>{}</span></li>", size);
        }
        html.push_str("</ul>\n");
        if let Some(uploaded) = &self.uploaded {
            let _ = write!(
                html,
                r#"<ul class="list"><li><strong>Date uploaded</strong> <span>{}</span></li></ul>
"#,
                uploaded
            );
        }

        html.push_str(r#"<div class="tab-content"><div class="tab-pane active" id="description">"#);
        if !self.covers.is_empty() {
            html.push_str("<p>");
            for cover in &self.covers {
                let _ = write!(html, r#"<img src="{}" alt="cover">"#, cover);
            }
            html.push_str("</p>");
        }
        if !self.details.is_empty() || self.release_date.is_some() {
            html.push_str("<p>");
            for (label, value) in &self.details {
                let _ = write!(html, "<strong>{}:</strong> {}<br>", label, value);
            }
            if let Some(date) = &self.release_date {
                let _ = write!(html, "<strong>Release Date:</strong> {}<br>", date);
            }
            html.push_str("</p>");
        }
        if let Some(description) = &self.description {
            let _ = write!(
                html,
                "<p><strong>Description:</strong> {} <strong>Screenshots (Click to enlarge)</strong></p>",
                description
            );
        }
        if !self.screenshots.is_empty() {
            html.push_str("<p>");
            for shot in &self.screenshots {
                let _ = write!(html, r#"<a href="{0}"><img src="{0}" alt="screenshot"></a>"#, shot);
            }
            html.push_str("</p>");
        }
        html.push_str("</div></div>\n</div>\n</body></html>");
        html
    }
}

/// Shorthand for `page.render()`.
pub fn detail_page(page: &DetailPage) -> String {
    page.render()
}
