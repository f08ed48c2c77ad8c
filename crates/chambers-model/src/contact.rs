// SPDX-License-Identifier: Apache-2.0

use crate::validation::{
    check_email, check_len_range, check_optional, check_phone, check_required, ValidationErrors,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub const CONTACT_NAME_MAX_LEN: usize = 120;
pub const SUBJECT_MAX_LEN: usize = 200;
pub const MESSAGE_MIN_LEN: usize = 10;
pub const MESSAGE_MAX_LEN: usize = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum ContactStatus {
    New,
    Read,
    Archived,
}

impl ContactStatus {
    pub const ALL: [Self; 3] = [Self::New, Self::Read, Self::Archived];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Read => "read",
            Self::Archived => "archived",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, ValidationErrors> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "new" => Ok(Self::New),
            "read" => Ok(Self::Read),
            "archived" => Ok(Self::Archived),
            _ => Err(ValidationErrors::single(
                "status",
                "must be one of new, read, archived",
            )),
        }
    }
}

impl Display for ContactStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactMessage {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub message: String,
    pub status: ContactStatus,
    pub created_at: DateTime<Utc>,
}

/// What the public contact form sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContactSubmission {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    pub message: String,
}

impl ContactSubmission {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_required(&mut errors, "name", &self.name, CONTACT_NAME_MAX_LEN);
        check_email(&mut errors, "email", &self.email);
        check_phone(&mut errors, "phone", self.phone.as_deref());
        check_optional(&mut errors, "subject", self.subject.as_deref(), SUBJECT_MAX_LEN);
        check_len_range(
            &mut errors,
            "message",
            &self.message,
            MESSAGE_MIN_LEN,
            MESSAGE_MAX_LEN,
        );
        errors.into_result()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContactStatusUpdate {
    pub status: ContactStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission() -> ContactSubmission {
        ContactSubmission {
            name: "Jean Martin".to_string(),
            email: "jean@example.com".to_string(),
            phone: Some("+33 1 23 45 67 89".to_string()),
            subject: Some("Lease dispute".to_string()),
            message: "I would like advice on a commercial lease.".to_string(),
        }
    }

    #[test]
    fn valid_submission_passes() {
        assert!(submission().validate().is_ok());
    }

    #[test]
    fn short_message_and_bad_email_are_reported_together() {
        let mut s = submission();
        s.email = "jean".to_string();
        s.message = "hi".to_string();
        let err = s.validate().expect_err("invalid");
        assert!(err.has_field("email"));
        assert!(err.has_field("message"));
        assert_eq!(err.errors().len(), 2);
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!(ContactStatus::parse("READ").expect("read"), ContactStatus::Read);
        assert!(ContactStatus::parse("deleted").is_err());
        for status in ContactStatus::ALL {
            assert_eq!(ContactStatus::parse(status.as_str()).expect("roundtrip"), status);
        }
    }
}
