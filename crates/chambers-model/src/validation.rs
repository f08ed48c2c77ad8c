use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub const EMAIL_MAX_LEN: usize = 254;
pub const URL_MAX_LEN: usize = 2048;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldError {
    pub field: String,
    pub reason: String,
}

/// Every problem found in one input, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn single(field: &str, reason: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(field, reason);
        errors
    }

    pub fn push(&mut self, field: &str, reason: impl Into<String>) {
        self.0.push(FieldError {
            field: field.to_string(),
            reason: reason.into(),
        });
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    #[must_use]
    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|e| format!("{}: {}", e.field, e.reason))
            .collect();
        write!(f, "validation failed: {}", parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

pub(crate) fn check_required(errors: &mut ValidationErrors, field: &str, value: &str, max: usize) {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.push(field, "is required");
    } else if trimmed.chars().count() > max {
        errors.push(field, format!("must be at most {max} characters"));
    }
}

pub(crate) fn check_len_range(
    errors: &mut ValidationErrors,
    field: &str,
    value: &str,
    min: usize,
    max: usize,
) {
    let count = value.trim().chars().count();
    if count == 0 {
        errors.push(field, "is required");
    } else if count < min {
        errors.push(field, format!("must be at least {min} characters"));
    } else if count > max {
        errors.push(field, format!("must be at most {max} characters"));
    }
}

pub(crate) fn check_optional(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<&str>,
    max: usize,
) {
    if let Some(v) = value {
        if v.trim().chars().count() > max {
            errors.push(field, format!("must be at most {max} characters"));
        }
    }
}

pub(crate) fn check_email(errors: &mut ValidationErrors, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.push(field, "is required");
    } else if !is_valid_email(value) {
        errors.push(field, "must be a valid email address");
    }
}

pub(crate) fn check_phone(errors: &mut ValidationErrors, field: &str, value: Option<&str>) {
    let Some(v) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return;
    };
    if v.len() > 40 {
        errors.push(field, "must be at most 40 characters");
    } else if !v
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '+' | '(' | ')' | '-' | '.'))
    {
        errors.push(field, "may only contain digits, spaces and + ( ) - .");
    }
}

/// Shape check only: one `@`, a local part, a dotted domain, no whitespace.
#[must_use]
pub fn is_valid_email(raw: &str) -> bool {
    let value = raw.trim();
    if value.is_empty() || value.len() > EMAIL_MAX_LEN {
        return false;
    }
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    !host.is_empty() && !tld.is_empty() && !domain.starts_with('.') && !domain.contains("..")
}

#[must_use]
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

/// Empty strings in optional inputs mean "no value".
#[must_use]
pub fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape_check() {
        assert!(is_valid_email("partner@firm.law"));
        assert!(is_valid_email("  first.last+news@example.co.uk "));
        assert!(!is_valid_email("no-at-sign.example.com"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a@@b.com"));
        assert!(!is_valid_email("a b@c.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("a@.example.com"));
    }

    #[test]
    fn errors_render_all_fields() {
        let mut errors = ValidationErrors::new();
        errors.push("title", "is required");
        errors.push("content", "is required");
        assert_eq!(
            errors.to_string(),
            "validation failed: title: is required; content: is required"
        );
        assert!(errors.has_field("content"));
        assert!(errors.into_result().is_err());
    }

    #[test]
    fn phone_accepts_common_formats() {
        let mut errors = ValidationErrors::new();
        check_phone(&mut errors, "phone", Some("+33 (0)1 23-45.67"));
        assert!(errors.is_empty());
        check_phone(&mut errors, "phone", Some("call me"));
        assert!(errors.has_field("phone"));
    }
}
