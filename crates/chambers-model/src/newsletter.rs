// SPDX-License-Identifier: Apache-2.0

use crate::validation::{check_email, normalize_email, ValidationErrors};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsletterSubscription {
    pub id: i64,
    pub email: String,
    pub active: bool,
    pub subscribed_at: DateTime<Utc>,
    pub unsubscribed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewsletterSignup {
    pub email: String,
}

impl NewsletterSignup {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_email(&mut errors, "email", &self.email);
        errors.into_result()
    }

    #[must_use]
    pub fn normalized_email(&self) -> String {
        normalize_email(&self.email)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscribeOutcome {
    Created,
    Reactivated,
    AlreadyActive,
}

impl SubscribeOutcome {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Reactivated => "reactivated",
            Self::AlreadyActive => "already_active",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signup_normalizes_email() {
        let signup = NewsletterSignup {
            email: "  News@Firm.LAW ".to_string(),
        };
        assert!(signup.validate().is_ok());
        assert_eq!(signup.normalized_email(), "news@firm.law");
    }

    #[test]
    fn signup_rejects_missing_email() {
        let signup = NewsletterSignup {
            email: String::new(),
        };
        assert!(signup.validate().expect_err("empty").has_field("email"));
    }
}
