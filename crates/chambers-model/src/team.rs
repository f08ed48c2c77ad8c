// SPDX-License-Identifier: Apache-2.0

use crate::validation::{
    check_email, check_optional, check_phone, check_required, ValidationErrors, URL_MAX_LEN,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const NAME_MAX_LEN: usize = 120;
pub const ROLE_MAX_LEN: usize = 120;
pub const BIO_MAX_LEN: usize = 10_000;
pub const MAX_SPECIALTIES: usize = 20;
pub const SPECIALTY_MAX_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub role: String,
    pub bio: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub image_url: Option<String>,
    pub linkedin_url: Option<String>,
    pub specialties: Vec<String>,
    pub display_order: i64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TeamMemberDraft {
    pub name: String,
    pub role: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub linkedin_url: Option<String>,
    #[serde(default)]
    pub specialties: Vec<String>,
    #[serde(default)]
    pub display_order: i64,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl TeamMemberDraft {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_required(&mut errors, "name", &self.name, NAME_MAX_LEN);
        check_required(&mut errors, "role", &self.role, ROLE_MAX_LEN);
        check_optional(&mut errors, "bio", Some(&self.bio), BIO_MAX_LEN);
        check_contact_fields(
            &mut errors,
            self.email.as_deref(),
            self.phone.as_deref(),
            self.image_url.as_deref(),
            self.linkedin_url.as_deref(),
        );
        check_specialties(&mut errors, &self.specialties);
        errors.into_result()
    }
}

/// Partial update. For optional columns an empty string clears the value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TeamMemberPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub linkedin_url: Option<String>,
    #[serde(default)]
    pub specialties: Option<Vec<String>>,
    #[serde(default)]
    pub display_order: Option<i64>,
    #[serde(default)]
    pub active: Option<bool>,
}

impl TeamMemberPatch {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(name) = &self.name {
            check_required(&mut errors, "name", name, NAME_MAX_LEN);
        }
        if let Some(role) = &self.role {
            check_required(&mut errors, "role", role, ROLE_MAX_LEN);
        }
        check_optional(&mut errors, "bio", self.bio.as_deref(), BIO_MAX_LEN);
        check_contact_fields(
            &mut errors,
            self.email.as_deref(),
            self.phone.as_deref(),
            self.image_url.as_deref(),
            self.linkedin_url.as_deref(),
        );
        if let Some(specialties) = &self.specialties {
            check_specialties(&mut errors, specialties);
        }
        errors.into_result()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

fn check_contact_fields(
    errors: &mut ValidationErrors,
    email: Option<&str>,
    phone: Option<&str>,
    image_url: Option<&str>,
    linkedin_url: Option<&str>,
) {
    if let Some(email) = email.filter(|e| !e.trim().is_empty()) {
        check_email(errors, "email", email);
    }
    check_phone(errors, "phone", phone);
    check_optional(errors, "image_url", image_url, URL_MAX_LEN);
    if let Some(url) = linkedin_url.map(str::trim).filter(|u| !u.is_empty()) {
        if !url.starts_with("https://") {
            errors.push("linkedin_url", "must start with https://");
        } else if url.len() > URL_MAX_LEN {
            errors.push("linkedin_url", format!("must be at most {URL_MAX_LEN} characters"));
        }
    }
}

fn check_specialties(errors: &mut ValidationErrors, specialties: &[String]) {
    if specialties.len() > MAX_SPECIALTIES {
        errors.push(
            "specialties",
            format!("must list at most {MAX_SPECIALTIES} entries"),
        );
    }
    if specialties
        .iter()
        .any(|s| s.trim().is_empty() || s.trim().chars().count() > SPECIALTY_MAX_LEN)
    {
        errors.push(
            "specialties",
            format!("entries must be 1 to {SPECIALTY_MAX_LEN} characters"),
        );
    }
}

/// Trims entries and drops duplicates while keeping the editor's order.
#[must_use]
pub fn normalize_specialties(raw: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for item in raw {
        let trimmed = item.trim();
        if !trimmed.is_empty() && !out.iter().any(|s| s.eq_ignore_ascii_case(trimmed)) {
            out.push(trimmed.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> TeamMemberDraft {
        TeamMemberDraft {
            name: "Anne Durand".to_string(),
            role: "Partner".to_string(),
            bio: String::new(),
            email: Some("anne@firm.law".to_string()),
            phone: None,
            image_url: None,
            linkedin_url: Some("https://www.linkedin.com/in/anne".to_string()),
            specialties: vec!["Employment".to_string()],
            display_order: 1,
            active: true,
        }
    }

    #[test]
    fn valid_draft_passes() {
        assert!(draft().validate().is_ok());
    }

    #[test]
    fn linkedin_must_be_https() {
        let mut d = draft();
        d.linkedin_url = Some("http://linkedin.com/in/anne".to_string());
        assert!(d.validate().expect_err("http").has_field("linkedin_url"));
    }

    #[test]
    fn blank_email_is_treated_as_absent() {
        let mut d = draft();
        d.email = Some(String::new());
        assert!(d.validate().is_ok());
        d.email = Some("not-an-email".to_string());
        assert!(d.validate().expect_err("bad email").has_field("email"));
    }

    #[test]
    fn specialties_are_bounded_and_normalized() {
        let mut d = draft();
        d.specialties = vec!["x".to_string(); MAX_SPECIALTIES + 1];
        assert!(d.validate().expect_err("too many").has_field("specialties"));

        let normalized = normalize_specialties(&[
            " Tax ".to_string(),
            "tax".to_string(),
            String::new(),
            "M&A".to_string(),
        ]);
        assert_eq!(normalized, vec!["Tax".to_string(), "M&A".to_string()]);
    }
}
