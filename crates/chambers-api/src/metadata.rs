//! `<head>` metadata for the public pages: title, description, canonical URL
//! and the Open Graph card.

use chambers_core::images::resolve_image_url;
use chambers_core::text::{escape_html, strip_html, truncate_words};
use chambers_model::{News, TeamMember};
use serde::{Deserialize, Serialize};

pub const DESCRIPTION_MAX_CHARS: usize = 160;
pub const DEFAULT_OG_IMAGE: &str = "/static/og-default.png";

/// Site-wide values every page's metadata is derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteIdentity {
    pub name: String,
    pub base_url: String,
    pub description: String,
}

impl SiteIdentity {
    #[must_use]
    pub fn absolute_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let base = self.base_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub title: String,
    pub description: String,
    pub canonical_url: String,
    pub og_image: String,
    pub og_type: String,
}

/// Fits `raw` into a meta description, ellipsis included.
#[must_use]
pub fn meta_description(raw: &str) -> String {
    truncate_words(&strip_html(raw), DESCRIPTION_MAX_CHARS - 1)
}

#[must_use]
pub fn page_title(site: &SiteIdentity, page: &str) -> String {
    let page = page.trim();
    if page.is_empty() {
        site.name.clone()
    } else {
        format!("{page} | {}", site.name)
    }
}

impl PageMetadata {
    #[must_use]
    pub fn for_page(site: &SiteIdentity, page: &str, description: Option<&str>, path: &str) -> Self {
        let description = description
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or(&site.description);
        Self {
            title: page_title(site, page),
            description: meta_description(description),
            canonical_url: site.absolute_url(path),
            og_image: site.absolute_url(DEFAULT_OG_IMAGE),
            og_type: "website".to_string(),
        }
    }

    #[must_use]
    pub fn for_article(site: &SiteIdentity, news: &News) -> Self {
        let source = if news.excerpt.trim().is_empty() {
            news.content.as_str()
        } else {
            news.excerpt.as_str()
        };
        Self {
            title: page_title(site, &news.title),
            description: meta_description(source),
            canonical_url: site.absolute_url(&format!("/news/{}", news.slug)),
            og_image: site.absolute_url(&resolve_image_url(
                news.image_url.as_deref(),
                DEFAULT_OG_IMAGE,
            )),
            og_type: "article".to_string(),
        }
    }

    #[must_use]
    pub fn for_member(site: &SiteIdentity, member: &TeamMember) -> Self {
        let description = if member.bio.trim().is_empty() {
            format!("{}, {} at {}.", member.name, member.role, site.name)
        } else {
            member.bio.clone()
        };
        Self {
            title: page_title(site, &format!("{} - {}", member.name, member.role)),
            description: meta_description(&description),
            canonical_url: site.absolute_url(&format!("/team/{}", member.slug)),
            og_image: site.absolute_url(&resolve_image_url(
                member.image_url.as_deref(),
                DEFAULT_OG_IMAGE,
            )),
            og_type: "profile".to_string(),
        }
    }

    /// `<title>`, description, canonical link and Open Graph tags, escaped.
    #[must_use]
    pub fn render_head(&self) -> String {
        let title = escape_html(&self.title);
        let description = escape_html(&self.description);
        let canonical = escape_html(&self.canonical_url);
        let image = escape_html(&self.og_image);
        let og_type = escape_html(&self.og_type);
        format!(
            "<title>{title}</title>\n\
             <meta name=\"description\" content=\"{description}\">\n\
             <link rel=\"canonical\" href=\"{canonical}\">\n\
             <meta property=\"og:title\" content=\"{title}\">\n\
             <meta property=\"og:description\" content=\"{description}\">\n\
             <meta property=\"og:url\" content=\"{canonical}\">\n\
             <meta property=\"og:image\" content=\"{image}\">\n\
             <meta property=\"og:type\" content=\"{og_type}\">\n\
             <meta name=\"twitter:card\" content=\"summary_large_image\">"
        )
    }
}
