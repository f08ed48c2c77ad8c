// SPDX-License-Identifier: Apache-2.0

use crate::validation::{check_optional, check_required, ValidationErrors, URL_MAX_LEN};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const TITLE_MAX_LEN: usize = 200;
pub const CONTENT_MAX_LEN: usize = 100_000;
pub const EXCERPT_MAX_LEN: usize = 500;
pub const CATEGORY_MAX_LEN: usize = 64;
pub const AUTHOR_MAX_LEN: usize = 120;
/// Length of excerpts derived from the article body.
pub const DERIVED_EXCERPT_LEN: usize = 220;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct News {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub image_url: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
    pub published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl News {
    /// Date shown on listings: publication date, or creation date for drafts.
    #[must_use]
    pub fn display_date(&self) -> DateTime<Utc> {
        self.published_at.unwrap_or(self.created_at)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewsDraft {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub published: bool,
}

impl NewsDraft {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_required(&mut errors, "title", &self.title, TITLE_MAX_LEN);
        check_required(&mut errors, "content", &self.content, CONTENT_MAX_LEN);
        check_optional(&mut errors, "excerpt", self.excerpt.as_deref(), EXCERPT_MAX_LEN);
        check_optional(&mut errors, "image_url", self.image_url.as_deref(), URL_MAX_LEN);
        check_optional(&mut errors, "author", self.author.as_deref(), AUTHOR_MAX_LEN);
        check_optional(&mut errors, "category", self.category.as_deref(), CATEGORY_MAX_LEN);
        errors.into_result()
    }
}

/// Partial update. For optional columns an empty string clears the value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewsPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub published: Option<bool>,
}

impl NewsPatch {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(title) = &self.title {
            check_required(&mut errors, "title", title, TITLE_MAX_LEN);
        }
        if let Some(content) = &self.content {
            check_required(&mut errors, "content", content, CONTENT_MAX_LEN);
        }
        check_optional(&mut errors, "excerpt", self.excerpt.as_deref(), EXCERPT_MAX_LEN);
        check_optional(&mut errors, "image_url", self.image_url.as_deref(), URL_MAX_LEN);
        check_optional(&mut errors, "author", self.author.as_deref(), AUTHOR_MAX_LEN);
        check_optional(&mut errors, "category", self.category.as_deref(), CATEGORY_MAX_LEN);
        errors.into_result()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> NewsDraft {
        NewsDraft {
            title: "Firm wins appeal".to_string(),
            content: "<p>Body</p>".to_string(),
            excerpt: None,
            image_url: None,
            author: None,
            category: Some("litigation".to_string()),
            published: true,
        }
    }

    #[test]
    fn draft_requires_title_and_content() {
        let mut d = draft();
        d.title = "   ".to_string();
        d.content.clear();
        let err = d.validate().expect_err("empty draft");
        assert!(err.has_field("title"));
        assert!(err.has_field("content"));
    }

    #[test]
    fn draft_rejects_overlong_title() {
        let mut d = draft();
        d.title = "x".repeat(TITLE_MAX_LEN + 1);
        assert!(d.validate().expect_err("long title").has_field("title"));
    }

    #[test]
    fn patch_only_checks_present_fields() {
        let patch = NewsPatch {
            published: Some(false),
            ..NewsPatch::default()
        };
        assert!(patch.validate().is_ok());
        assert!(!patch.is_empty());
        assert!(NewsPatch::default().is_empty());

        let blank_title = NewsPatch {
            title: Some(String::new()),
            ..NewsPatch::default()
        };
        assert!(blank_title.validate().is_err());
    }
}
