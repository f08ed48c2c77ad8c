#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

pub mod contact;
pub mod image;
pub mod news;
pub mod newsletter;
pub mod team;
pub mod validation;

pub use contact::{ContactMessage, ContactStatus, ContactStatusUpdate, ContactSubmission};
pub use image::{is_allowed_mime, ImageBlob, ImageMeta, ImageMime, ALLOWED_IMAGE_MIME_TYPES};
pub use news::{News, NewsDraft, NewsPatch};
pub use newsletter::{NewsletterSignup, NewsletterSubscription, SubscribeOutcome};
pub use team::{TeamMember, TeamMemberDraft, TeamMemberPatch};
pub use validation::{is_valid_email, non_empty, normalize_email, FieldError, ValidationErrors};

pub const CRATE_NAME: &str = "chambers-model";

/// One slice of a listing plus the size of the full result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

impl<T> Page<T> {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
        }
    }
}
